//! Pololu Maestro servo controller driver
//!
//! The thruster ESCs are driven by servo pulses from a Maestro, using its compact serial protocol.
//! A pulse of 1500 us is stopped, 1100 us and 1900 us are full reverse and full forward.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::io::Write;
use std::time::Duration;
use serialport::SerialPort;

use comms_if::nav::NUM_THRUSTERS;
use util::maths::clamp;
use super::{Actuator, ActuatorError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Compact protocol set target command byte.
const SET_TARGET_CMD: u8 = 0x84;

/// Pulse width at zero thrust.
///
/// Units: microseconds
const NEUTRAL_PULSE_US: f64 = 1500.0;

/// Change in pulse width between zero and full thrust.
///
/// Units: microseconds
const PULSE_RANGE_US: f64 = 400.0;

/// Serial write timeout.
const WRITE_TIMEOUT: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A Maestro connected through any byte sink.
pub struct Maestro<W: Write> {
    port: W,

    /// Maestro channel of each thruster, indexed by thruster id - 1.
    channels: [u8; NUM_THRUSTERS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Maestro<Box<dyn SerialPort>> {
    /// Open the Maestro on the given serial port.
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        channels: [u8; NUM_THRUSTERS]
    ) -> Result<Self, ActuatorError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|e| ActuatorError::OpenError(port_name.into(), e))?;

        Ok(Self::new(port, channels))
    }
}

impl<W: Write> Maestro<W> {
    pub fn new(port: W, channels: [u8; NUM_THRUSTERS]) -> Self {
        Self {
            port,
            channels
        }
    }

    /// Build the set target command which gives the thrust on the channel.
    pub fn set_target_cmd(channel: u8, thrust_pc: f64) -> [u8; 4] {
        let target = Self::target(thrust_pc);

        [
            SET_TARGET_CMD,
            channel,
            (target & 0x7F) as u8,
            ((target >> 7) & 0x7F) as u8
        ]
    }

    /// Servo target for a thrust, in quarter microseconds.
    pub fn target(thrust_pc: f64) -> u16 {
        let thrust_pc = clamp(&thrust_pc, &-100.0, &100.0);
        let pulse_us = NEUTRAL_PULSE_US + PULSE_RANGE_US * thrust_pc / 100.0;

        (pulse_us * 4.0).round() as u16
    }

    /// The underlying byte sink.
    pub fn port(&self) -> &W {
        &self.port
    }
}

impl<W: Write> Actuator for Maestro<W> {
    fn set_thrust(&mut self, index: usize, thrust_pc: f64) -> Result<(), ActuatorError> {
        let channel = *self.channels.get(index)
            .ok_or(ActuatorError::InvalidThruster(index))?;

        let cmd = Self::set_target_cmd(channel, thrust_pc);

        self.port.write_all(&cmd).map_err(ActuatorError::WriteError)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_target() {
        assert_eq!(Maestro::<Vec<u8>>::target(0.0), 6000);
        assert_eq!(Maestro::<Vec<u8>>::target(100.0), 7600);
        assert_eq!(Maestro::<Vec<u8>>::target(-100.0), 4400);
        assert_eq!(Maestro::<Vec<u8>>::target(50.0), 6800);

        // Out of range demands saturate
        assert_eq!(Maestro::<Vec<u8>>::target(250.0), 7600);
    }

    #[test]
    fn test_write() {
        let mut m = Maestro::new(Vec::new(), [0, 1, 2, 3, 4, 5, 6, 7]);

        m.set_thrust(2, 0.0).unwrap();
        m.set_thrust(5, 100.0).unwrap();

        assert_eq!(
            m.port().as_slice(),
            &[
                0x84, 2, 0x70, 0x2E,
                0x84, 5, 0x30, 0x3B
            ]
        );

        assert!(matches!(
            m.set_thrust(9, 0.0),
            Err(ActuatorError::InvalidThruster(9))
        ));
    }
}
