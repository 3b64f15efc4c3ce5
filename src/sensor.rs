use crate::math::{heading, rot90, Point2d, Vector2d};
use crate::track::Track;
use cgmath::prelude::*;
use once_cell::sync::Lazy;
use smallvec::{smallvec, SmallVec};

/// Distance readings, one per configured ray, in configuration order.
pub type SensorReadings = SmallVec<[f64; 8]>;

/// Distance reported for a ray that found no boundary crossing.
/// Larger than any legal in-track distance, so policies that branch on
/// proximity thresholds can tell it apart from a genuine reading.
pub const DEFAULT_MAX_DISTANCE: f64 = 1000.0;

/// The default ray arrangement: up, down, diagonal-up, diagonal-down,
/// expressed in the vehicle's velocity-aligned frame.
static DEFAULT_DIRECTIONS: Lazy<SmallVec<[Vector2d; 4]>> = Lazy::new(|| {
    smallvec![
        Vector2d::new(0.0, 1.0),
        Vector2d::new(0.0, -1.0),
        Vector2d::new(1.0, 1.0),
        Vector2d::new(1.0, -1.0),
    ]
});

/// A fixed set of directional distance sensors.
///
/// Each direction is a ray in a local frame whose x-axis is aligned
/// with the vehicle's velocity; a reading is the distance from the
/// vehicle to the first track-boundary crossing along the ray.
#[derive(Clone, Debug)]
pub struct SensorArray {
    /// Ray directions in the velocity-aligned frame.
    directions: SmallVec<[Vector2d; 4]>,
    /// Sentinel distance reported when a ray finds no crossing.
    max_dist: f64,
}

impl Default for SensorArray {
    fn default() -> Self {
        Self::new(&DEFAULT_DIRECTIONS, DEFAULT_MAX_DISTANCE)
    }
}

pub(crate) fn default_directions() -> SmallVec<[Vector2d; 4]> {
    DEFAULT_DIRECTIONS.clone()
}

impl SensorArray {
    /// Creates a sensor array from ray directions and a sentinel distance.
    pub fn new(directions: &[Vector2d], max_dist: f64) -> Self {
        Self {
            directions: SmallVec::from_slice(directions),
            max_dist,
        }
    }

    /// The configured ray directions.
    pub fn directions(&self) -> &[Vector2d] {
        &self.directions
    }

    /// The sentinel distance for rays without a crossing.
    pub fn max_distance(&self) -> f64 {
        self.max_dist
    }

    /// Computes a distance reading per configured ray at the given
    /// position and velocity.
    ///
    /// The local frame is rotated so its x-axis points along the
    /// velocity; a zero velocity leaves the rays unrotated.
    pub fn sense(&self, track: &Track, position: Point2d, velocity: Vector2d) -> SensorReadings {
        let forward = heading(velocity);
        let lateral = rot90(forward);
        self.directions
            .iter()
            .map(|dir| {
                // Boundary choice follows the pre-rotation lateral sign.
                let boundary = if dir.y > 0.0 {
                    track.upper_ys()
                } else {
                    track.lower_ys()
                };
                let world_dir = dir.x * forward + dir.y * lateral;
                self.cast(position, world_dir, boundary)
            })
            .collect()
    }

    /// Walks a discretized ray with one probe per track sample and
    /// returns the distance to the first boundary crossing, or the
    /// sentinel when no crossing exists before the ray runs out.
    ///
    /// Probe k is compared against boundary sample k positionally,
    /// not against the boundary interpolated at the probe's x.
    fn cast(&self, position: Point2d, direction: Vector2d, boundary: &[f64]) -> f64 {
        let mut last = sign(position.y - boundary[0]);
        for (k, bound) in boundary.iter().enumerate().skip(1) {
            let probe = position + (k as f64) * direction;
            let next = sign(probe.y - bound);
            if next != last {
                let crossing = position + ((k - 1) as f64) * direction;
                // debug_marker("sensor crossing", crossing);
                return (crossing - position).magnitude();
            }
            last = next;
        }
        self.max_dist
    }
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}
