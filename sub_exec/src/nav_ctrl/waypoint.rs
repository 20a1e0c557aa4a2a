//! Waypoint log
//!
//! While waypoint collection is enabled each recorded waypoint is appended to a headerless CSV
//! file as `sequence_number,north,east,depth`. Rows are written by the archive thread.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::Path;
use serde::Serialize;

use comms_if::nav::Pose;
use util::archive::{ArchiveSender, Archiver, ArchiveError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An open waypoint log.
///
/// The file is closed when the log is dropped.
pub struct WaypointLog {
    archiver: Archiver,
    next_seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Waypoint {
    pub seq: u64,
    pub north_ft: f64,
    pub east_ft: f64,
    pub depth_ft: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WaypointLogError {
    #[error("Could not open the waypoint log: {0}")]
    OpenError(ArchiveError),

    #[error("Could not write waypoint {0}: {1}")]
    WriteError(u64, ArchiveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WaypointLog {
    /// Open a new log, truncating any existing file. Numbering starts from 0.
    pub fn open<P: AsRef<Path>>(
        sender: &ArchiveSender,
        path: P
    ) -> Result<Self, WaypointLogError> {
        let archiver = Archiver::create(sender, path, false)
            .map_err(WaypointLogError::OpenError)?;

        Ok(Self {
            archiver,
            next_seq: 0
        })
    }

    /// Record the position of the pose as the next waypoint.
    pub fn record(&mut self, pose: &Pose) -> Result<Waypoint, WaypointLogError> {
        let wp = Waypoint {
            seq: self.next_seq,
            north_ft: pose.north_ft,
            east_ft: pose.east_ft,
            depth_ft: pose.depth_ft,
        };

        self.archiver.serialise(wp)
            .map_err(|e| WaypointLogError::WriteError(wp.seq, e))?;

        self.next_seq += 1;

        Ok(wp)
    }

    /// Number of waypoints recorded in this log.
    pub fn num_recorded(&self) -> u64 {
        self.next_seq
    }

    pub fn path(&self) -> Option<&Path> {
        self.archiver.path()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use util::archive::spawn_writer;

    #[test]
    fn test_record() {
        let mut path = std::env::temp_dir();
        path.push(format!("sub_waypoint_log_test_{}.csv", std::process::id()));

        let (sender, handle) = spawn_writer(16).unwrap();

        let mut log = WaypointLog::open(&sender, &path).unwrap();

        let pose = Pose { north_ft: 1.5, east_ft: -2.0, depth_ft: 4.25, ..Default::default() };
        assert_eq!(log.record(&pose).unwrap().seq, 0);
        assert_eq!(log.record(&pose).unwrap().seq, 1);
        assert_eq!(log.num_recorded(), 2);
        assert_eq!(log.path(), Some(path.as_path()));
        drop(log);

        // Reopening starts a fresh log
        let mut log = WaypointLog::open(&sender, &path).unwrap();
        assert_eq!(log.record(&Pose::default()).unwrap().seq, 0);
        drop(log);

        drop(sender);
        handle.join().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "0,0.0,0.0,0.0\n");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_rows() {
        let mut path = std::env::temp_dir();
        path.push(format!("sub_waypoint_log_rows_{}.csv", std::process::id()));

        let (sender, handle) = spawn_writer(16).unwrap();

        let mut log = WaypointLog::open(&sender, &path).unwrap();
        let pose = Pose { north_ft: 1.5, east_ft: -2.0, depth_ft: 4.25, ..Default::default() };
        log.record(&pose).unwrap();
        log.record(&pose).unwrap();
        drop(log);

        drop(sender);
        handle.join().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "0,1.5,-2.0,4.25\n1,1.5,-2.0,4.25\n");

        std::fs::remove_file(&path).ok();
    }
}
