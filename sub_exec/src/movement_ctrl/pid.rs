//! Single axis PID controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::AxisParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A proportional-integral-derivative controller for one axis.
///
/// No saturation is applied to the output, the error fed into the controller
/// is expected to already be bounded.
#[derive(Debug, Clone, Default)]
pub struct Pid {
    k_p: f64,
    k_i: f64,
    k_d: f64,

    /// Sample interval.
    ///
    /// Units: seconds
    dt_s: f64,

    integral: f64,
    prev_error: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pid {
    /// Create a new controller from the axis gains and the sample interval.
    pub fn new(axis: &AxisParams, dt_s: f64) -> Self {
        let mut pid = Self::default();
        pid.set_gains(axis.k_p, axis.k_i, axis.k_d, dt_s);
        pid
    }

    /// Replace the gains and sample interval.
    ///
    /// The integral and previous error are reset so that no state carries
    /// over from the old gains.
    pub fn set_gains(&mut self, k_p: f64, k_i: f64, k_d: f64, dt_s: f64) {
        self.k_p = k_p;
        self.k_i = k_i;
        self.k_d = k_d;
        self.dt_s = dt_s;

        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    /// Advance the controller by one sample, returning the control output.
    pub fn control_step(&mut self, error: f64) -> f64 {
        self.integral += error * self.dt_s;

        let derivative = (error - self.prev_error) / self.dt_s;
        self.prev_error = error;

        self.k_p * error + self.k_i * self.integral + self.k_d * derivative
    }

    /// Accumulated integral of the error.
    pub fn integral(&self) -> f64 {
        self.integral
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_control_step() {
        let mut pid = Pid::default();
        pid.set_gains(2.0, 0.5, 0.1, 0.1);

        // p: 2*1, i: 0.5*(1*0.1), d: 0.1*(1-0)/0.1
        let out = pid.control_step(1.0);
        assert!((out - (2.0 + 0.05 + 1.0)).abs() < EPS);

        // p: 2*0.5, i: 0.5*(0.1 + 0.05), d: 0.1*(0.5-1)/0.1
        let out = pid.control_step(0.5);
        assert!((out - (1.0 + 0.075 - 0.5)).abs() < EPS);
        assert!((pid.integral() - 0.15).abs() < EPS);
    }

    #[test]
    fn test_set_gains_resets_state() {
        let mut pid = Pid::default();
        pid.set_gains(1.0, 1.0, 1.0, 0.1);

        for _ in 0..10 {
            pid.control_step(3.0);
        }
        assert!(pid.integral() > 0.0);

        pid.set_gains(4.0, 2.0, 0.5, 0.2);
        assert_eq!(pid.integral(), 0.0);

        // With the state reset a zero error gives a zero output
        assert_eq!(pid.control_step(0.0), 0.0);
    }
}
