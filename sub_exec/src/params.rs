//! # Submarine Executable Parameters
//!
//! This module provide parameters for the submarine executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use comms_if::nav::NUM_THRUSTERS;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Shortest ingestion poll period, the bus client's receive timeout has millisecond resolution.
///
/// Units: seconds
pub const MIN_INGEST_POLL_PERIOD_S: f64 = 0.001;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SubExecParams {

    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Period between navigation status packets.
    ///
    /// Units: seconds
    pub status_period_s: f64,

    /// Receive timeout of the bus client, and the polling period of bus scripts.
    ///
    /// Units: seconds
    pub ingest_poll_period_s: f64,

    /// The device driving the thrusters
    pub actuator: ActuatorParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ActuatorParams {
    /// Pololu Maestro on a serial port
    Maestro {
        port: String,

        baud_rate: u32,

        /// Maestro channel of each thruster, indexed by thruster id - 1.
        channels: [u8; NUM_THRUSTERS],
    },

    /// Simulated actuator, demands are only logged
    Sim,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SubExecParams {
    /// Check the timing parameters are usable.
    pub fn validate(&self) -> Result<(), SubExecParamsError> {
        let periods = [
            ("cycle_period_s", self.cycle_period_s),
            ("status_period_s", self.status_period_s),
            ("ingest_poll_period_s", self.ingest_poll_period_s),
        ];

        for (name, val) in periods {
            if !(val.is_finite() && val > 0.0) {
                return Err(SubExecParamsError::InvalidPeriod(name, val))
            }
        }

        // A zero millisecond timeout would make the bus client spin
        if self.ingest_poll_period_s < MIN_INGEST_POLL_PERIOD_S {
            return Err(SubExecParamsError::PollPeriodTooShort(self.ingest_poll_period_s))
        }

        Ok(())
    }

    /// Receive timeout of the bus client.
    ///
    /// Units: milliseconds
    pub fn ingest_poll_timeout_ms(&self) -> i32 {
        (self.ingest_poll_period_s * 1000.0).round() as i32
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubExecParamsError {
    #[error("{0} must be positive and finite, found {1}")]
    InvalidPeriod(&'static str, f64),

    #[error("ingest_poll_period_s must be at least 0.001 s, found {0}")]
    PollPeriodTooShort(f64),
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn exec_params() -> SubExecParams {
        SubExecParams {
            cycle_period_s: 0.05,
            status_period_s: 0.2,
            ingest_poll_period_s: 0.01,
            actuator: ActuatorParams::Sim,
        }
    }

    #[test]
    fn test_validate() {
        let p = exec_params();
        assert!(p.validate().is_ok());
        assert_eq!(p.ingest_poll_timeout_ms(), 10);

        let mut p = exec_params();
        p.cycle_period_s = 0.0;
        assert!(matches!(
            p.validate(),
            Err(SubExecParamsError::InvalidPeriod("cycle_period_s", _))
        ));

        let mut p = exec_params();
        p.status_period_s = f64::NAN;
        assert!(matches!(
            p.validate(),
            Err(SubExecParamsError::InvalidPeriod("status_period_s", _))
        ));
    }

    #[test]
    fn test_sub_millisecond_poll_period() {
        // Would truncate to a zero millisecond receive timeout
        let mut p = exec_params();
        p.ingest_poll_period_s = 0.0004;
        assert!(matches!(
            p.validate(),
            Err(SubExecParamsError::PollPeriodTooShort(_))
        ));

        p.ingest_poll_period_s = 0.001;
        assert!(p.validate().is_ok());
        assert_eq!(p.ingest_poll_timeout_ms(), 1);
    }

    #[test]
    fn test_params_file() {
        let p: SubExecParams = util::params::load(
            concat!(env!("CARGO_MANIFEST_DIR"), "/../params/sub_exec.toml")
        ).unwrap();
        assert!(p.validate().is_ok());
        assert!(matches!(p.actuator, ActuatorParams::Maestro { baud_rate: 9600, .. }));
    }
}
