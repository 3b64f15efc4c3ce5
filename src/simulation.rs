#[cfg(feature = "debug")]
use crate::debug::take_debug_frame;
use crate::math::Point2d;
use crate::policy::Policy;
use crate::track::Track;
use crate::util::Interval;
use crate::vehicle::{StepError, Utility, Vehicle, VehicleAttributes};
use crate::{VehicleId, VehicleSet};
use rand_distr::Distribution;
use slotmap::SlotMap;
use std::sync::Arc;

/// A fleet of independent vehicles evaluated on a shared track.
///
/// Each vehicle owns its own state and policy; the track is immutable
/// and shared. Stepping skips crashed vehicles, so a run naturally
/// winds down once every vehicle has hit a wall.
pub struct Simulation {
    /// The track shared by all vehicles.
    track: Arc<Track>,
    /// The vehicles being evaluated.
    vehicles: VehicleSet,
    /// The current frame of simulation.
    frame: usize,
    /// Debugging information from the previously simulated frame.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

impl Simulation {
    /// Creates a simulation over the given track.
    pub fn new(track: Arc<Track>) -> Self {
        Self {
            track,
            vehicles: SlotMap::with_key(),
            frame: 0,
            #[cfg(feature = "debug")]
            debug: Default::default(),
        }
    }

    /// Adds a vehicle driven by the given policy.
    pub fn add_vehicle(
        &mut self,
        policy: Box<dyn Policy>,
        attributes: &VehicleAttributes,
    ) -> VehicleId {
        let vehicle = Vehicle::new(self.track.clone(), policy, attributes);
        let id = self.vehicles.insert(vehicle);
        log::debug!("vehicle {:?} admitted at {:?}", id, self.vehicles[id].position());
        id
    }

    /// Removes a vehicle from the simulation.
    pub fn remove_vehicle(&mut self, id: VehicleId) {
        self.vehicles.remove(id);
    }

    /// Steps every vehicle that has not crashed.
    pub fn step(&mut self) -> Result<(), StepError> {
        for (_, vehicle) in &mut self.vehicles {
            if vehicle.has_crashed() {
                continue;
            }
            vehicle.step()?;
        }
        self.frame += 1;

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }

        Ok(())
    }

    /// Runs the simulation up to the given step ceiling, stopping
    /// early once every vehicle has crashed. Returns the number of
    /// steps executed.
    pub fn run(&mut self, max_steps: usize) -> Result<usize, StepError> {
        for step in 0..max_steps {
            if self.vehicles.values().all(|v| v.has_crashed()) {
                return Ok(step);
            }
            self.step()?;
        }
        Ok(max_steps)
    }

    /// Randomly perturbs each vehicle's start position laterally,
    /// sampling the offset from a normal distribution with a mean of 0
    /// and standard deviation of `stddev`, clamped to the corridor's
    /// interior. Restarts every vehicle's run.
    pub fn randomise_starts(&mut self, stddev: f64) {
        let mut rand = rand::thread_rng();
        let distr = rand_distr::Normal::new(0.0, stddev).expect("Invalid standard deviation");
        for vehicle in self.vehicles.values_mut() {
            let start = vehicle.start_position();
            let bounds = vehicle.track().bound_at(start.x);
            let band = Interval::new(bounds.lerp(0.1), bounds.lerp(0.9));
            let y = (start.y + distr.sample(&mut rand)).clamp(band.min, band.max);
            vehicle.set_position(Point2d::new(start.x, y));
        }
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// The track shared by all vehicles.
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }

    /// Gets a mutable reference to the vehicle with the given ID.
    pub fn get_vehicle_mut(&mut self, vehicle_id: VehicleId) -> &mut Vehicle {
        &mut self.vehicles[vehicle_id]
    }

    /// The best-scoring vehicle: furthest x reached, with an earlier
    /// finish breaking ties.
    pub fn best_utility(&self) -> Option<(VehicleId, Utility)> {
        self.vehicles
            .iter()
            .map(|(id, vehicle)| (id, vehicle.utility()))
            .max_by(|(_, a), (_, b)| {
                (a.max_x, -a.finish_step)
                    .partial_cmp(&(b.max_x, -b.finish_step))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Gets the debugging information for the previously simulated
    /// frame as a JSON array.
    #[cfg(feature = "debug")]
    pub fn debug(&mut self) -> serde_json::Value {
        self.debug.clone()
    }
}
