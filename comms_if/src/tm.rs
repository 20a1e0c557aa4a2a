//! # Navigation telemetry

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::nav::{ErrorVector, Mode, Pose, NUM_THRUSTERS};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry packet published on the `NAV_STATUS` topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavTm {
    /// Session time at which the packet was produced
    pub time_s: f64,

    /// Effective operating mode
    pub mode: Mode,

    pub current_pose: Pose,

    pub desired_pose: Pose,

    /// Bounded errors from the last pose control step
    pub pos_error: ErrorVector,

    /// Last thrust demanded of each thruster, in percent.
    pub thrusts_pc: [f64; NUM_THRUSTERS],

    /// Seconds since the last sensor data was received, or `None` if no
    /// sensor data has been received yet.
    pub sensor_data_age_s: Option<f64>,

    /// True if the sensor data is older than the configured threshold.
    pub sensor_data_stale: bool,

    /// Number of control cycles executed
    pub num_cycles: u64,

    /// Number of consecutive control cycle overruns
    pub num_consec_cycle_overruns: u64,

    pub waypoint_collection_enabled: bool,

    /// Number of waypoints recorded in the current collection session
    pub num_waypoints: u64,
}
