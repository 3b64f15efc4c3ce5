use crate::debug::debug_segment;
use crate::math::{Point2d, Vector2d};
use crate::policy::{DecisionInput, Policy};
use crate::sensor::{default_directions, SensorArray, DEFAULT_MAX_DISTANCE};
use crate::track::Track;
use crate::util::Interval;
use rand::Rng;
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;

/// How far past the track start a vehicle is seeded.
const START_OFFSET: f64 = 1.0;

/// A trajectory whose furthest x is within this margin of the track's
/// end counts as having finished.
const FINISH_MARGIN: f64 = 2.0;

/// A simulated vehicle navigating a [Track].
///
/// Each step senses the surroundings, asks the policy for an
/// acceleration, integrates motion and enforces boundary legality;
/// an illegal move is rolled back so the vehicle is never recorded
/// in an illegal state.
pub struct Vehicle {
    /// The corridor being navigated.
    track: Arc<Track>,
    /// The decision function driving the vehicle.
    policy: Box<dyn Policy>,
    /// The directional distance sensors.
    sensors: SensorArray,
    /// The current position.
    position: Point2d,
    /// The current velocity.
    velocity: Vector2d,
    /// The most recent candidate acceleration.
    acceleration: Vector2d,
    /// Snapshot of the position at the previous step.
    previous_position: Point2d,
    /// Snapshot of the velocity at the previous step.
    previous_velocity: Vector2d,
    /// Per-axis velocity clamp: forward `[0, x]`, lateral `[-y, y]`.
    max_velocity: Vector2d,
    /// Whether an illegal move has ended this run.
    crashed: bool,
    /// Recorded positions, one entry per step plus the initial state.
    pos_history: Vec<Point2d>,
    /// Recorded velocities, aligned with `pos_history`.
    vel_history: Vec<Vector2d>,
    /// Recorded accelerations, aligned with `pos_history`.
    accl_history: Vec<Vector2d>,
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Debug)]
pub struct VehicleAttributes {
    /// Ray directions in the velocity-aligned sensor frame.
    pub sensor_directions: SmallVec<[Vector2d; 4]>,
    /// Per-axis velocity clamp: forward `[0, x]`, lateral `[-y, y]`.
    pub max_velocity: Vector2d,
    /// Sentinel distance reported by sensor rays with no crossing.
    pub max_sensor_distance: f64,
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            sensor_directions: default_directions(),
            max_velocity: Vector2d::new(25.0, 25.0),
            max_sensor_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

/// The result of a single [Vehicle::step].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepOutcome {
    /// Whether the tentative position was legal. An illegal move was
    /// rolled back and left the vehicle crashed.
    pub legal: bool,
}

/// A decision function broke its contract.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum StepError {
    /// A non-finite acceleration would silently corrupt the legality
    /// check, so it is rejected before touching the vehicle state.
    #[error("decision function returned a non-finite acceleration ({x}, {y})")]
    NonFiniteAcceleration { x: f64, y: f64 },
}

/// The scalar trajectory score used to compare policies.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Utility {
    /// The furthest x-position reached.
    pub max_x: f64,
    /// History index of the first entry attaining `max_x`, or -1 if
    /// the vehicle never came within the finish margin of the end.
    pub finish_step: i64,
}

impl Vehicle {
    /// Creates a vehicle at the start of the given track.
    ///
    /// The forward position is seeded just past the track start and
    /// the lateral position uniformly within the corridor's mid-band.
    pub fn new(track: Arc<Track>, policy: Box<dyn Policy>, attributes: &VehicleAttributes) -> Self {
        let position = seed_start(&track);
        let zero = Vector2d::new(0.0, 0.0);
        Self {
            sensors: SensorArray::new(&attributes.sensor_directions, attributes.max_sensor_distance),
            max_velocity: attributes.max_velocity,
            position,
            velocity: zero,
            acceleration: zero,
            previous_position: Point2d::new(0.0, 0.0),
            previous_velocity: zero,
            crashed: false,
            pos_history: vec![position],
            vel_history: vec![zero],
            accl_history: vec![zero],
            track,
            policy,
        }
    }

    /// The current position.
    pub fn position(&self) -> Point2d {
        self.position
    }

    /// The current velocity.
    pub fn velocity(&self) -> Vector2d {
        self.velocity
    }

    /// The most recent candidate acceleration.
    pub fn acceleration(&self) -> Vector2d {
        self.acceleration
    }

    /// The position this run started from.
    pub fn start_position(&self) -> Point2d {
        self.pos_history[0]
    }

    /// The track the vehicle is navigating.
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Whether an illegal move has ended this run. A crashed vehicle
    /// stays put until [reset](Self::reset) or
    /// [set_position](Self::set_position); callers should stop
    /// stepping it.
    pub fn has_crashed(&self) -> bool {
        self.crashed
    }

    /// Places the vehicle at an exact position and restarts its run.
    pub fn set_position(&mut self, position: Point2d) {
        self.position = position;
        self.restart();
    }

    /// Overrides the vehicle's velocity. Mainly useful for staging
    /// scenarios; stepping clamps the velocity before integrating.
    pub fn set_velocity(&mut self, velocity: Vector2d) {
        self.velocity = velocity;
    }

    /// Reseeds the vehicle at the track start and restarts its run.
    pub fn reset(&mut self) {
        self.position = seed_start(&self.track);
        self.restart();
    }

    /// Advances the simulation by one step.
    ///
    /// Senses the surroundings at the current and previous state,
    /// queries the policy, clamps the velocity, integrates the
    /// position, and enforces legality: a legal move banks the
    /// acceleration into the next step's velocity, an illegal one is
    /// rolled back and zeroes both velocity and acceleration.
    pub fn step(&mut self) -> Result<StepOutcome, StepError> {
        let distances = self.sensors.sense(&self.track, self.position, self.velocity);
        let prev_distances =
            self.sensors
                .sense(&self.track, self.previous_position, self.previous_velocity);
        let input = DecisionInput {
            distances,
            velocity: self.velocity,
            prev_distances,
            prev_velocity: self.previous_velocity,
        };

        let accl = self.policy.decide(&input);
        if !accl.x.is_finite() || !accl.y.is_finite() {
            return Err(StepError::NonFiniteAcceleration { x: accl.x, y: accl.y });
        }
        self.acceleration = accl;

        self.previous_position = self.position;
        self.previous_velocity = self.velocity;

        // Clamp before integrating, never after.
        self.velocity.x = self.velocity.x.clamp(0.0, self.max_velocity.x);
        self.velocity.y = self.velocity.y.clamp(-self.max_velocity.y, self.max_velocity.y);
        self.position = self.position + self.velocity;

        let legal = self.track.is_legal(self.position);
        if legal {
            // The acceleration only feeds the next step's velocity.
            self.velocity += self.acceleration;
        } else {
            log::debug!(
                "illegal move to ({:.2}, {:.2}); rolling back",
                self.position.x,
                self.position.y
            );
            self.position = self.previous_position;
            self.velocity = Vector2d::new(0.0, 0.0);
            self.acceleration = Vector2d::new(0.0, 0.0);
            self.crashed = true;
        }
        debug_segment("step", self.previous_position, self.position);

        self.pos_history.push(self.position);
        self.vel_history.push(self.velocity);
        self.accl_history.push(self.acceleration);

        Ok(StepOutcome { legal })
    }

    /// Read-only views of the recorded trajectory, ordered from the
    /// initial state: positions, velocities, accelerations.
    pub fn history(&self) -> (&[Point2d], &[Vector2d], &[Vector2d]) {
        (&self.pos_history, &self.vel_history, &self.accl_history)
    }

    /// Scores the recorded trajectory.
    ///
    /// Returns the furthest x reached and the history index of the
    /// first entry that reached it; the index is -1 unless the
    /// vehicle came within the finish margin of the track's end.
    pub fn utility(&self) -> Utility {
        let mut max_x = f64::NEG_INFINITY;
        let mut step = 0;
        for (i, pos) in self.pos_history.iter().enumerate() {
            if pos.x > max_x {
                max_x = pos.x;
                step = i;
            }
        }
        let finished = max_x >= self.track.length() - FINISH_MARGIN;
        Utility {
            max_x,
            finish_step: if finished { step as i64 } else { -1 },
        }
    }

    /// Restarts the run at the current position.
    fn restart(&mut self) {
        let zero = Vector2d::new(0.0, 0.0);
        self.velocity = zero;
        self.acceleration = zero;
        self.previous_position = Point2d::new(0.0, 0.0);
        self.previous_velocity = zero;
        self.crashed = false;
        self.pos_history.clear();
        self.vel_history.clear();
        self.accl_history.clear();
        self.pos_history.push(self.position);
        self.vel_history.push(zero);
        self.accl_history.push(zero);
    }
}

/// Seeds a start position: just past the track's first sample, with
/// the lateral coordinate drawn uniformly from the corridor's
/// mid-band.
fn seed_start(track: &Track) -> Point2d {
    let mut rng = rand::thread_rng();
    let bounds = track.bound_at(track.xs()[0]);
    let band = Interval::disc(bounds.midpoint(), 0.5 * bounds.midpoint());
    Point2d::new(track.xs()[0] + START_OFFSET, band.lerp(rng.gen::<f64>()))
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    /// The corridor from the stepping scenarios: y in (-5, 5), x in (0, 20).
    fn flat_track() -> Arc<Track> {
        Arc::new(
            Track::from_sequences(
                vec![0.0, 10.0, 20.0],
                vec![-5.0, -5.0, -5.0],
                vec![5.0, 5.0, 5.0],
            )
            .unwrap(),
        )
    }

    fn constant(accl: Vector2d) -> Box<dyn Policy> {
        Box::new(move |_: &DecisionInput| accl)
    }

    #[test]
    fn first_step_banks_acceleration_without_moving() {
        let mut vehicle = Vehicle::new(
            flat_track(),
            constant(Vector2d::new(1.0, 0.0)),
            &VehicleAttributes::default(),
        );
        vehicle.set_position(Point2d::new(1.0, 0.0));

        let outcome = vehicle.step().unwrap();
        assert!(outcome.legal);
        // Velocity was zero, so the position is unchanged this step;
        // the acceleration only arrives in the next step's velocity.
        assert_approx_eq!(vehicle.position().x, 1.0);
        assert_approx_eq!(vehicle.position().y, 0.0);
        assert_approx_eq!(vehicle.velocity().x, 1.0);
        assert_approx_eq!(vehicle.velocity().y, 0.0);

        let (positions, velocities, accelerations) = vehicle.history();
        assert_eq!(positions.len(), 2);
        assert_eq!(velocities.len(), 2);
        assert_eq!(accelerations.len(), 2);
    }

    #[test]
    fn illegal_move_rolls_back_and_zeroes_motion() {
        let mut vehicle = Vehicle::new(
            flat_track(),
            constant(Vector2d::new(1.0, 0.0)),
            &VehicleAttributes::default(),
        );
        vehicle.set_position(Point2d::new(1.0, 4.9));
        vehicle.set_velocity(Vector2d::new(0.0, 10.0));

        let outcome = vehicle.step().unwrap();
        assert!(!outcome.legal);
        assert!(vehicle.has_crashed());
        assert_approx_eq!(vehicle.position().x, 1.0);
        assert_approx_eq!(vehicle.position().y, 4.9);
        assert_approx_eq!(vehicle.velocity().x, 0.0);
        assert_approx_eq!(vehicle.velocity().y, 0.0);
        assert_approx_eq!(vehicle.acceleration().x, 0.0);
        assert_approx_eq!(vehicle.acceleration().y, 0.0);
    }

    #[test]
    fn forward_velocity_is_clamped_before_integration() {
        let track = Arc::new(
            Track::from_sequences(
                vec![0.0, 100.0, 200.0],
                vec![-5.0, -5.0, -5.0],
                vec![5.0, 5.0, 5.0],
            )
            .unwrap(),
        );
        let mut vehicle = Vehicle::new(
            track,
            constant(Vector2d::new(100.0, 0.0)),
            &VehicleAttributes::default(),
        );
        vehicle.set_position(Point2d::new(1.0, 0.0));

        for _ in 0..4 {
            vehicle.step().unwrap();
        }
        let (positions, _, _) = vehicle.history();
        for pair in positions.windows(2) {
            let delta = pair[1] - pair[0];
            assert!(delta.x >= 0.0 && delta.x <= 25.0);
        }
    }

    #[test]
    fn rollback_keeps_every_recorded_position_legal() {
        let mut vehicle = Vehicle::new(
            flat_track(),
            constant(Vector2d::new(0.5, 2.0)),
            &VehicleAttributes::default(),
        );
        for _ in 0..50 {
            vehicle.step().unwrap();
        }
        assert!(vehicle.has_crashed());

        let (positions, _, _) = vehicle.history();
        for (i, pos) in positions.iter().enumerate() {
            let legal = vehicle.track().is_legal(*pos);
            let rolled_back = i > 0 && *pos == positions[i - 1];
            assert!(legal || rolled_back);
        }
    }

    #[test]
    fn finish_step_is_the_first_entry_at_the_maximum() {
        let mut vehicle = Vehicle::new(
            flat_track(),
            constant(Vector2d::new(0.0, 0.0)),
            &VehicleAttributes::default(),
        );
        vehicle.set_position(Point2d::new(9.0, 0.0));
        vehicle.set_velocity(Vector2d::new(10.0, 0.0));

        // 9 -> 19 (legal), 29 would leave the track: rolled back, and the
        // crashed fixed point repeats 19 from then on.
        for _ in 0..4 {
            vehicle.step().unwrap();
        }
        let utility = vehicle.utility();
        assert_approx_eq!(utility.max_x, 19.0);
        assert_eq!(utility.finish_step, 1);
    }

    #[test]
    fn unfinished_run_reports_the_sentinel_step() {
        let mut vehicle = Vehicle::new(
            flat_track(),
            constant(Vector2d::new(0.0, 0.0)),
            &VehicleAttributes::default(),
        );
        vehicle.set_position(Point2d::new(1.0, 0.0));
        for _ in 0..3 {
            vehicle.step().unwrap();
        }
        let utility = vehicle.utility();
        assert_approx_eq!(utility.max_x, 1.0);
        assert_eq!(utility.finish_step, -1);
    }

    #[test]
    fn non_finite_acceleration_is_rejected() {
        let mut vehicle = Vehicle::new(
            flat_track(),
            Box::new(|_: &DecisionInput| Vector2d::new(f64::NAN, 0.0)),
            &VehicleAttributes::default(),
        );
        vehicle.set_position(Point2d::new(1.0, 0.0));
        assert!(matches!(
            vehicle.step(),
            Err(StepError::NonFiniteAcceleration { .. })
        ));
    }

    #[test]
    fn reset_reseeds_within_the_mid_band() {
        let track = Arc::new(
            Track::from_sequences(
                vec![0.0, 10.0, 20.0],
                vec![2.0, 2.0, 2.0],
                vec![6.0, 6.0, 6.0],
            )
            .unwrap(),
        );
        let mut vehicle = Vehicle::new(
            track,
            constant(Vector2d::new(0.0, 0.0)),
            &VehicleAttributes::default(),
        );
        for _ in 0..10 {
            vehicle.reset();
            let start = vehicle.start_position();
            assert_approx_eq!(start.x, 1.0);
            // Uniform over [ (2+6)/4, 3*(2+6)/4 ] = [2, 6].
            assert!(start.y >= 2.0 && start.y <= 6.0);
            let (positions, velocities, accelerations) = vehicle.history();
            assert_eq!(positions.len(), 1);
            assert_eq!(velocities.len(), 1);
            assert_eq!(accelerations.len(), 1);
        }
    }
}
