//! Parameters structure for NavCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the navigation controller.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// File waypoints are written to while collection is enabled. Relative paths are relative to
    /// the software root.
    pub waypoint_file: PathBuf,

    /// Age beyond which the sensor data is reported as stale.
    ///
    /// Units: seconds
    pub sensor_stale_threshold_s: f64,
}
