use crate::math::Vector2d;
use crate::sensor::SensorReadings;
use smallvec::SmallVec;

/// Constant forward thrust applied by [DefaultPolicy].
const FORWARD_THRUST: f64 = 0.1;

/// Sensor distance below which [DefaultPolicy] steers away from a wall.
const PROXIMITY_THRESHOLD: f64 = 200.0;

/// Lateral acceleration bias applied per crowded side.
const STEER_BIAS: f64 = 0.2;

/// Everything a decision function may observe in one step: the current
/// and previous sensor readings and the current and previous velocity.
#[derive(Clone, Debug)]
pub struct DecisionInput {
    /// Sensor readings at the current position and velocity.
    pub distances: SensorReadings,
    /// The current velocity.
    pub velocity: Vector2d,
    /// Sensor readings at the previous step's position and velocity.
    pub prev_distances: SensorReadings,
    /// The previous step's velocity.
    pub prev_velocity: Vector2d,
}

impl DecisionInput {
    /// Flattens the input into a plain parameter vector, ordered as
    /// current readings, current velocity, previous readings, previous
    /// velocity. Useful for policies driven by an optimiser or a
    /// learned parameter set.
    pub fn flatten(&self) -> SmallVec<[f64; 12]> {
        let mut params = SmallVec::new();
        params.extend(self.distances.iter().copied());
        params.push(self.velocity.x);
        params.push(self.velocity.y);
        params.extend(self.prev_distances.iter().copied());
        params.push(self.prev_velocity.x);
        params.push(self.prev_velocity.y);
        params
    }
}

/// A driving decision function: maps one step's observations to an
/// acceleration vector.
///
/// Implementations must be pure and deterministic given their inputs:
/// no hidden state, no mutation of the input. Any
/// `Fn(&DecisionInput) -> Vector2d` closure qualifies.
pub trait Policy {
    fn decide(&self, input: &DecisionInput) -> Vector2d;
}

impl<F> Policy for F
where
    F: Fn(&DecisionInput) -> Vector2d,
{
    fn decide(&self, input: &DecisionInput) -> Vector2d {
        self(input)
    }
}

/// The baseline heuristic policy.
///
/// Applies a mild constant forward thrust and a lateral pull toward the
/// less crowded side, `(1 + d_up)/(1 + d_down) - 1`, plus a fixed bias
/// away from any wall closer than the proximity threshold.
///
/// Readings are paired positionally, matching the default four-ray
/// arrangement: rays 0 and 2 are the upper pair and rays 1 and 3 the
/// lower pair. The pairing is a fixed convention of this policy, not
/// derived from the rotated ray geometry.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPolicy;

impl Policy for DefaultPolicy {
    fn decide(&self, input: &DecisionInput) -> Vector2d {
        let d = &input.distances;
        let mut accl = Vector2d::new(FORWARD_THRUST, 0.0);

        accl.y = (1.0 + d[0]) / (1.0 + d[1]) - 1.0;
        if d[0] < PROXIMITY_THRESHOLD || d[2] < PROXIMITY_THRESHOLD {
            accl.y -= STEER_BIAS;
        }
        if d[1] < PROXIMITY_THRESHOLD || d[3] < PROXIMITY_THRESHOLD {
            accl.y += STEER_BIAS;
        }
        accl
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use smallvec::smallvec;

    fn input(distances: [f64; 4]) -> DecisionInput {
        DecisionInput {
            distances: SensorReadings::from_slice(&distances),
            velocity: Vector2d::new(1.0, 0.0),
            prev_distances: SensorReadings::from_slice(&distances),
            prev_velocity: Vector2d::new(1.0, 0.0),
        }
    }

    #[test]
    fn symmetric_clearance_gives_pure_thrust() {
        let accl = DefaultPolicy.decide(&input([500.0, 500.0, 500.0, 500.0]));
        assert_approx_eq!(accl.x, 0.1);
        assert_approx_eq!(accl.y, 0.0);
    }

    #[test]
    fn close_upper_wall_steers_down() {
        let accl = DefaultPolicy.decide(&input([100.0, 500.0, 500.0, 500.0]));
        assert_approx_eq!(accl.y, 101.0 / 501.0 - 1.0 - 0.2);
    }

    #[test]
    fn close_lower_wall_steers_up() {
        let accl = DefaultPolicy.decide(&input([500.0, 100.0, 500.0, 500.0]));
        assert_approx_eq!(accl.y, 501.0 / 101.0 - 1.0 + 0.2);
    }

    #[test]
    fn both_walls_close_cancels_the_bias() {
        let accl = DefaultPolicy.decide(&input([150.0, 150.0, 500.0, 500.0]));
        assert_approx_eq!(accl.y, 151.0 / 151.0 - 1.0);
    }

    #[test]
    fn closures_satisfy_the_policy_contract() {
        let policy = |input: &DecisionInput| Vector2d::new(0.0, -input.velocity.y);
        let accl = policy.decide(&input([500.0, 500.0, 500.0, 500.0]));
        assert_approx_eq!(accl.y, 0.0);
    }

    #[test]
    fn flatten_preserves_parameter_order() {
        let mut decision = input([1.0, 2.0, 3.0, 4.0]);
        decision.prev_distances = smallvec![5.0, 6.0, 7.0, 8.0];
        decision.velocity = Vector2d::new(9.0, 10.0);
        decision.prev_velocity = Vector2d::new(11.0, 12.0);
        let params = decision.flatten();
        assert_eq!(
            params.as_slice(),
            &[1.0, 2.0, 3.0, 4.0, 9.0, 10.0, 5.0, 6.0, 7.0, 8.0, 11.0, 12.0]
        );
    }
}
