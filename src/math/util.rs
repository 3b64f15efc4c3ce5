use super::Vector2d;
use cgmath::prelude::*;

/// Rotates a vector 90 degrees anticlockwise.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}

/// Normalises a vector, falling back to the positive x-axis
/// when the vector has zero magnitude.
pub fn heading(vec: Vector2d) -> Vector2d {
    if vec.magnitude2() > 0.0 {
        vec.normalize()
    } else {
        Vector2d::new(1.0, 0.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn heading_aligns_with_velocity() {
        let dir = heading(Vector2d::new(3.0, 4.0));
        assert_approx_eq!(dir.x, 0.6);
        assert_approx_eq!(dir.y, 0.8);
    }

    #[test]
    fn heading_of_zero_vector_is_x_axis() {
        let dir = heading(Vector2d::new(0.0, 0.0));
        assert_approx_eq!(dir.x, 1.0);
        assert_approx_eq!(dir.y, 0.0);
    }

    #[test]
    fn rot90_is_anticlockwise() {
        let v = rot90(Vector2d::new(1.0, 0.0));
        assert_approx_eq!(v.x, 0.0);
        assert_approx_eq!(v.y, 1.0);
    }
}
