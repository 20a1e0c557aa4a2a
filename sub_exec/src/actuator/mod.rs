//! # Actuator module
//!
//! Actuators turn thrust demands into something the thrusters will act on. The [`Maestro`] driver
//! talks to the servo controller on the vehicle, the [`SimActuator`] just remembers the demands.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod maestro;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, trace};

use comms_if::nav::NUM_THRUSTERS;
use crate::params::ActuatorParams;

pub use maestro::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A device which can drive the thrusters.
pub trait Actuator {
    /// Demand a thrust from the thruster at `index` (thruster id - 1).
    ///
    /// `thrust_pc` is within `[-100, 100]`, positive values push along the
    /// thruster's orientation.
    fn set_thrust(&mut self, index: usize, thrust_pc: f64) -> Result<(), ActuatorError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Actuator which records the last demand sent to each thruster.
#[derive(Debug, Default, Clone)]
pub struct SimActuator {
    demands: [f64; NUM_THRUSTERS],
    num_writes: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("There is no thruster with index {0}")]
    InvalidThruster(usize),

    #[error("Could not open the serial port {0}: {1}")]
    OpenError(String, serialport::Error),

    #[error("Could not write to the actuator: {0}")]
    WriteError(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimActuator {
    /// Last demand sent to each thruster.
    pub fn demands(&self) -> [f64; NUM_THRUSTERS] {
        self.demands
    }

    /// Total number of demands received.
    pub fn num_writes(&self) -> u64 {
        self.num_writes
    }
}

impl Actuator for SimActuator {
    fn set_thrust(&mut self, index: usize, thrust_pc: f64) -> Result<(), ActuatorError> {
        let demand = self.demands.get_mut(index)
            .ok_or(ActuatorError::InvalidThruster(index))?;

        *demand = thrust_pc;
        self.num_writes += 1;

        trace!("SimActuator T{} = {:.2} %", index + 1, thrust_pc);

        Ok(())
    }
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn set_thrust(&mut self, index: usize, thrust_pc: f64) -> Result<(), ActuatorError> {
        (**self).set_thrust(index, thrust_pc)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the actuator selected in the exec parameters.
pub fn build(params: &ActuatorParams) -> Result<Box<dyn Actuator + Send>, ActuatorError> {
    match params {
        ActuatorParams::Maestro { port, baud_rate, channels } => {
            let m = Maestro::open(port, *baud_rate, *channels)?;
            info!("Maestro opened on {} at {} baud", port, baud_rate);
            Ok(Box::new(m))
        },
        ActuatorParams::Sim => {
            info!("Using the simulated actuator");
            Ok(Box::new(SimActuator::default()))
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
