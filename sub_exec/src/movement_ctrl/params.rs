//! Parameters structure for MovementCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use comms_if::nav::NUM_THRUSTERS;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Movement control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    /// Sample interval of the PID controllers.
    ///
    /// Units: seconds
    pub dt_s: f64,

    // ---- AXES ----

    pub roll: AxisParams,
    pub pitch: AxisParams,
    pub yaw: AxisParams,

    /// Body frame forward axis
    pub x: AxisParams,

    /// Body frame right axis
    pub y: AxisParams,

    pub depth: AxisParams,

    // ---- LIMITS ----

    pub limits: LimitParams,

    // ---- THRUSTERS ----

    pub thrusters: ThrusterParams,

    pub depth_bias: DepthBiasParams,

    // ---- REMOTE CONTROL ----

    pub remote: RemoteParams,
}

/// Gains and error bounds for a single axis.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AxisParams {
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,

    /// Lower bound of the error fed into the controller.
    pub min_error: f64,

    /// Upper bound of the error fed into the controller.
    pub max_error: f64,
}

/// Hard limits on the desired pose.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitParams {
    /// Units: degrees
    pub max_roll_deg: f64,

    /// Units: degrees
    pub max_pitch_deg: f64,

    /// Units: feet
    pub min_depth: f64,

    /// Units: feet
    pub max_depth: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThrusterParams {
    /// Maximum magnitude of any thrust demand.
    ///
    /// Units: percent
    pub max_thrust_pc: f64,

    /// Multiplicative trim applied to each thruster's demand, indexed by
    /// thruster id - 1.
    pub strength_offsets: [f64; NUM_THRUSTERS],
}

/// Buoyancy compensation applied to the depth thrusters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DepthBiasParams {
    /// Units: percent
    pub bias: f64,

    /// Depth at and below which the bias is applied.
    ///
    /// Units: feet
    pub active_depth: f64,
}

/// Output ranges `[min, max]` that the remote axes are mapped onto.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RemoteParams {
    pub yaw: [f64; 2],
    pub x: [f64; 2],
    pub y: [f64; 2],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a set of movement parameters can be rejected.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("The PID sample interval must be positive and finite, found {0}")]
    InvalidDt(f64),

    #[error("The {0} axis has min_error ({1}) greater than max_error ({2})")]
    InvertedErrorBounds(&'static str, f64, f64),

    #[error("The {0} axis has a non-finite gain or error bound")]
    NonFiniteAxis(&'static str),

    #[error("min_depth ({0}) is greater than max_depth ({1})")]
    InvertedDepthLimits(f64, f64),

    #[error("The {0} limit must not be negative, found {1}")]
    NegativeLimit(&'static str, f64),

    #[error("max_thrust_pc must be within (0, 100], found {0}")]
    InvalidMaxThrust(f64),

    #[error("The strength offset of thruster {0} is not finite")]
    NonFiniteStrength(usize),

    #[error("{0} is not finite")]
    NonFinite(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are usable by the controller.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.dt_s.is_finite() && self.dt_s > 0.0) {
            return Err(ParamsError::InvalidDt(self.dt_s))
        }

        for (name, axis) in self.axes() {
            let vals = [axis.k_p, axis.k_i, axis.k_d, axis.min_error, axis.max_error];
            if vals.iter().any(|v| !v.is_finite()) {
                return Err(ParamsError::NonFiniteAxis(name))
            }

            if axis.min_error > axis.max_error {
                return Err(ParamsError::InvertedErrorBounds(
                    name, axis.min_error, axis.max_error
                ))
            }
        }

        for (name, val) in self.named_values() {
            if !val.is_finite() {
                return Err(ParamsError::NonFinite(name))
            }
        }

        let l = &self.limits;
        if l.max_roll_deg < 0.0 {
            return Err(ParamsError::NegativeLimit("max_roll_deg", l.max_roll_deg))
        }
        if l.max_pitch_deg < 0.0 {
            return Err(ParamsError::NegativeLimit("max_pitch_deg", l.max_pitch_deg))
        }
        if l.min_depth > l.max_depth {
            return Err(ParamsError::InvertedDepthLimits(l.min_depth, l.max_depth))
        }

        let max_thrust = self.thrusters.max_thrust_pc;
        if !(max_thrust > 0.0 && max_thrust <= 100.0) {
            return Err(ParamsError::InvalidMaxThrust(max_thrust))
        }

        for (i, s) in self.thrusters.strength_offsets.iter().enumerate() {
            if !s.is_finite() {
                return Err(ParamsError::NonFiniteStrength(i + 1))
            }
        }

        Ok(())
    }

    /// Named axis parameters in `[roll, pitch, yaw, x, y, depth]` order.
    pub fn axes(&self) -> [(&'static str, AxisParams); 6] {
        [
            ("roll", self.roll),
            ("pitch", self.pitch),
            ("yaw", self.yaw),
            ("x", self.x),
            ("y", self.y),
            ("depth", self.depth),
        ]
    }

    /// Scalar limits, bias and remote ranges with their parameter names.
    fn named_values(&self) -> [(&'static str, f64); 12] {
        let l = &self.limits;
        let r = &self.remote;
        [
            ("limits.max_roll_deg", l.max_roll_deg),
            ("limits.max_pitch_deg", l.max_pitch_deg),
            ("limits.min_depth", l.min_depth),
            ("limits.max_depth", l.max_depth),
            ("depth_bias.bias", self.depth_bias.bias),
            ("depth_bias.active_depth", self.depth_bias.active_depth),
            ("remote.yaw[0]", r.yaw[0]),
            ("remote.yaw[1]", r.yaw[1]),
            ("remote.x[0]", r.x[0]),
            ("remote.x[1]", r.x[1]),
            ("remote.y[0]", r.y[0]),
            ("remote.y[1]", r.y[1]),
        ]
    }
}

// ---------------------------------------------------------------------------
// TEST HELPERS
// ---------------------------------------------------------------------------

/// A simple, valid parameter set: unit proportional gains, wide symmetric
/// error bounds, no trims and no depth bias.
#[cfg(test)]
pub fn test_params() -> Params {
    let axis = AxisParams {
        k_p: 1.0,
        k_i: 0.0,
        k_d: 0.0,
        min_error: -1000.0,
        max_error: 1000.0,
    };

    Params {
        dt_s: 0.1,
        roll: axis,
        pitch: axis,
        yaw: axis,
        x: axis,
        y: axis,
        depth: axis,
        limits: LimitParams {
            max_roll_deg: 30.0,
            max_pitch_deg: 30.0,
            min_depth: 0.0,
            max_depth: 20.0,
        },
        thrusters: ThrusterParams {
            max_thrust_pc: 100.0,
            strength_offsets: [0.0; NUM_THRUSTERS],
        },
        depth_bias: DepthBiasParams {
            bias: 0.0,
            active_depth: 1000.0,
        },
        remote: RemoteParams {
            yaw: [-20.0, 20.0],
            x: [-30.0, 40.0],
            y: [-25.0, 25.0],
        },
    }
}
