//! Rotation angle arithmetic in degrees.

/// Signed shortest-arc difference from `left` to `right`, in `[-180, 180]`.
pub fn find_angle_diff(right: f64, left: f64) -> f64 {
    let mut diff = right - left;
    diff = (diff + 180.0).rem_euclid(360.0) - 180.0;
    if diff.abs() > 180.0 {
        diff -= 360.0 * diff.signum();
    }
    diff
}

/// Normalizes an angle into `[0, 360)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let normalized = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Interpolates between two angles along the shortest arc.
pub fn interpolate_angle(left: f64, right: f64, offset: f64) -> f64 {
    normalize_angle(left + find_angle_diff(right, left) * offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortest_arc_crosses_zero() {
        assert_eq!(find_angle_diff(10.0, 350.0), 20.0);
        assert_eq!(find_angle_diff(350.0, 10.0), -20.0);
    }

    #[test]
    fn test_interpolate_wraps_to_zero() {
        let angle = interpolate_angle(350.0, 10.0, 0.5);
        assert!(angle.abs() < 1e-9, "got {angle}");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_angle(-90.0), 270.0);
        assert_eq!(normalize_angle(720.0), 0.0);
        assert_eq!(normalize_angle(45.0), 45.0);
    }
}
