//! Thruster model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use nalgebra::Vector3;

// Internal
use comms_if::nav::NUM_THRUSTERS;
use util::maths::clamp;
use crate::actuator::Actuator;
use super::ThrusterParams;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Physical layout of the thrusters as `(orientation, location, reversed)`, indexed by id - 1.
///
/// Orientation is the axis the thruster pushes along, location the quadrant it sits in
/// relative to the centre of the vehicle. Both are in the body frame (x forward, y right,
/// z down).
const LAYOUT: [([f64; 3], [f64; 3], bool); NUM_THRUSTERS] = [
    ([0.0, 0.0, 1.0], [1.0, -1.0, 0.0], true),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], true),
    ([0.0, 0.0, 1.0], [1.0, 1.0, 0.0], false),
    ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], false),
    ([0.0, 0.0, 1.0], [-1.0, 1.0, 0.0], true),
    ([0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], true),
    ([0.0, 0.0, 1.0], [-1.0, -1.0, 0.0], false),
    ([1.0, 0.0, 0.0], [0.0, -1.0, 0.0], true),
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single thruster on the vehicle.
#[derive(Debug, Clone)]
pub struct Thruster {
    /// Thruster id, starting from 1
    pub id: usize,

    pub orientation: Vector3<f64>,

    pub location: Vector3<f64>,

    /// Largest magnitude demand that will be sent to the actuator.
    ///
    /// Units: percent
    pub max_thrust_pc: f64,

    /// If true the thruster is mounted backwards, so demands are negated.
    pub reversed: bool,

    /// Multiplicative trim for this thruster.
    pub strength_offset: f64,

    /// Last demand, after limiting and before any reversal.
    last_thrust_pc: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Thruster {
    /// Build all the thrusters on the vehicle.
    pub fn layout(params: &ThrusterParams) -> [Thruster; NUM_THRUSTERS] {
        std::array::from_fn(|i| {
            let (orientation, location, reversed) = LAYOUT[i];

            Thruster {
                id: i + 1,
                orientation: Vector3::from(orientation),
                location: Vector3::from(location),
                max_thrust_pc: params.max_thrust_pc,
                reversed,
                strength_offset: params.strength_offsets[i],
                last_thrust_pc: 0.0
            }
        })
    }

    /// Send a thrust demand to the actuator.
    ///
    /// The demand is limited to the maximum thrust and negated if the thruster is reversed.
    /// Actuator errors are logged, never returned, so a failing thruster cannot stop the others
    /// from being driven.
    pub fn set_thrust<A: Actuator + ?Sized>(&mut self, actuator: &mut A, thrust_pc: f64) {
        let thrust_pc = if thrust_pc.is_finite() {
            clamp(&thrust_pc, &-self.max_thrust_pc, &self.max_thrust_pc)
        }
        else {
            warn!("Non-finite demand for T{}, stopping the thruster", self.id);
            0.0
        };

        self.last_thrust_pc = thrust_pc;

        let demand = match self.reversed {
            true => -thrust_pc,
            false => thrust_pc
        };

        if let Err(e) = actuator.set_thrust(self.id - 1, demand) {
            warn!("Could not set the thrust of T{}: {}", self.id, e);
        }
    }

    /// Last demand after limiting and before any reversal.
    pub fn last_thrust_pc(&self) -> f64 {
        self.last_thrust_pc
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
