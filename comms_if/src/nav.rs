//! # Navigation payload types
//!
//! Axis order for every six element array on the bus is
//! `[roll, pitch, yaw, north, east, depth]`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of thrusters on the vehicle.
pub const NUM_THRUSTERS: usize = 8;

/// Number of controlled degrees of freedom.
pub const NUM_AXES: usize = 6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Attitude and position of the vehicle.
///
/// Position is in the world frame (north/east) with depth positive downwards.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Units: degrees
    pub roll_deg: f64,

    /// Units: degrees
    pub pitch_deg: f64,

    /// Heading, within `[-180, 180]`.
    ///
    /// Units: degrees
    pub yaw_deg: f64,

    /// Units: feet
    pub north_ft: f64,

    /// Units: feet
    pub east_ft: f64,

    /// Units: feet
    pub depth_ft: f64,
}

/// Per-axis control error. Position errors are expressed in the vehicle body
/// frame (x forward, y right).
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorVector {
    pub roll_deg: f64,
    pub pitch_deg: f64,
    pub yaw_deg: f64,
    pub x_ft: f64,
    pub y_ft: f64,
    pub depth_ft: f64,
}

/// A command from the remote (joystick) input.
///
/// The axes are normalised to `[-1, 1]`. For `depth` negative values ascend
/// and positive values descend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemoteCommand {
    pub yaw: f64,
    pub x: f64,
    pub y: f64,
    pub depth: f64,

    /// While set the depth at the moment the flag was raised is held.
    pub hold_depth: bool,

    /// Request that the current position be recorded as a waypoint.
    pub record_waypoint: bool,

    /// Request that the north/east reference frame be zeroed.
    pub zero_position: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Movement modes which can be selected over the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementMode {
    PidTuning,
    ThrusterTest,
    RemoteControl,
    Autonomous,
}

/// The effective operating mode of the navigation controller.
///
/// `Killed` overrides whichever movement mode is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Killed,
    PidTuning,
    ThrusterTest,
    RemoteControl,
    Autonomous,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose {
    /// Build a pose from a bus array.
    pub fn from_array(a: [f64; NUM_AXES]) -> Self {
        Self {
            roll_deg: a[0],
            pitch_deg: a[1],
            yaw_deg: a[2],
            north_ft: a[3],
            east_ft: a[4],
            depth_ft: a[5],
        }
    }

    /// Convert the pose into a bus array.
    pub fn to_array(&self) -> [f64; NUM_AXES] {
        [
            self.roll_deg,
            self.pitch_deg,
            self.yaw_deg,
            self.north_ft,
            self.east_ft,
            self.depth_ft,
        ]
    }
}

impl ErrorVector {
    pub fn to_array(&self) -> [f64; NUM_AXES] {
        [
            self.roll_deg,
            self.pitch_deg,
            self.yaw_deg,
            self.x_ft,
            self.y_ft,
            self.depth_ft,
        ]
    }
}

impl MovementMode {
    /// Get the mode from its bus index.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(MovementMode::PidTuning),
            1 => Some(MovementMode::ThrusterTest),
            2 => Some(MovementMode::RemoteControl),
            3 => Some(MovementMode::Autonomous),
            _ => None,
        }
    }

    /// Get the bus index of this mode.
    pub fn index(&self) -> i64 {
        match self {
            MovementMode::PidTuning => 0,
            MovementMode::ThrusterTest => 1,
            MovementMode::RemoteControl => 2,
            MovementMode::Autonomous => 3,
        }
    }
}

impl Default for MovementMode {
    fn default() -> Self {
        MovementMode::PidTuning
    }
}

impl From<MovementMode> for Mode {
    fn from(m: MovementMode) -> Self {
        match m {
            MovementMode::PidTuning => Mode::PidTuning,
            MovementMode::ThrusterTest => Mode::ThrusterTest,
            MovementMode::RemoteControl => Mode::RemoteControl,
            MovementMode::Autonomous => Mode::Autonomous,
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Killed
    }
}
