//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Linearly interpolate a value from one range into another, saturating at
/// the ends of the target range when the value lies outside the source range.
///
/// `source_range.0` must be less than `source_range.1`.
pub fn interp<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    if value <= source_range.0 {
        target_range.0
    }
    else if value >= source_range.1 {
        target_range.1
    }
    else {
        lin_map(source_range, target_range, value)
    }
}

/// Limit a value to the range `[min, max]`.
///
/// Unlike `f64::clamp` this never panics, if `min > max` then `min` wins.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Get the signed shortest angular distance from `from_deg` to `to_deg`.
///
/// Inputs are expected to be headings within `[-180, 180]`, so a single
/// correction by a full turn is enough to select the shorter path.
pub fn ang_dist_deg(to_deg: f64, from_deg: f64) -> f64 {
    let dist = to_deg - from_deg;

    if dist.abs() > 180.0 {
        if dist < 0.0 {
            dist + 360.0
        }
        else {
            dist - 360.0
        }
    }
    else {
        dist
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 10f64), 0.0), 5.0);
        assert_eq!(lin_map((-1f64, 1f64), (-20f64, 30f64), 1.0), 30.0);
    }

    #[test]
    fn test_interp() {
        assert_eq!(interp((-1f64, 1f64), (-20f64, 30f64), 0.0), 5.0);
        assert_eq!(interp((-1f64, 1f64), (-20f64, 30f64), -3.0), -20.0);
        assert_eq!(interp((-1f64, 1f64), (-20f64, 30f64), 2.0), 30.0);
        assert_eq!(interp((-1f64, 0f64), (-4f64, 0f64), -0.5), -2.0);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&5f64, &-1.0, &2.0), 2.0);
        assert_eq!(clamp(&-5f64, &-1.0, &2.0), -1.0);
        assert_eq!(clamp(&0.5f64, &-1.0, &2.0), 0.5);
    }

    #[test]
    fn test_ang_dist_deg() {
        assert_eq!(ang_dist_deg(170f64, -170f64), -20.0);
        assert_eq!(ang_dist_deg(-170f64, 170f64), 20.0);
        assert_eq!(ang_dist_deg(90f64, 0f64), 90.0);
        assert_eq!(ang_dist_deg(-90f64, 90f64), -180.0);
        assert_eq!(ang_dist_deg(10f64, -10f64), 20.0);
    }
}
