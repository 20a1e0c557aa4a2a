//! Movement control module
//!
//! Converts a desired pose, remote input or raw thruster values into a demand for each of the
//! eight thrusters.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod pid;
mod state;
mod thruster;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use pid::*;
pub use state::*;
pub use thruster::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Control outputs for each axis, the input to thrust allocation.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AxisControls {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Limit an error to `[min_error, max_error]`.
pub fn bound_error(raw: f64, min_error: f64, max_error: f64) -> f64 {
    if raw < min_error {
        min_error
    }
    else if raw > max_error {
        max_error
    }
    else {
        raw
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bound_error() {
        let samples = [-1e9, -12.5, -3.0, -2.0, 0.0, 1.5, 4.0, 4.0001, 1e9];

        for v in samples.iter() {
            let b = bound_error(*v, -2.0, 4.0);
            assert!(b >= -2.0 && b <= 4.0);

            if *v >= -2.0 && *v <= 4.0 {
                assert_eq!(b, *v);
            }
        }

        assert_eq!(bound_error(-3.0, -2.0, 4.0), -2.0);
        assert_eq!(bound_error(5.0, -2.0, 4.0), 4.0);
    }
}
