//! # Ingestion
//!
//! Hands inbound messages from the ingestion thread (bus client or bus script) to the control
//! loop. Anything needing disk access is resolved here, so the control loop only ever applies
//! ready-made values: `UPDATE_PID_CONFIGS` is turned into a parsed and validated parameter set.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::mpsc::{Receiver, SyncSender, TryRecvError};
use log::{error, info};

use comms_if::msg::NavMsg;
use util::params::{self, LoadError};
use crate::{
    actuator::Actuator,
    movement_ctrl::{self, ParamsError},
    nav_ctrl::{NavCtrl, NavRequest},
    tm_server::{self, Outbound},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Ingestion side of the inbound queue.
pub struct Ingest {
    tx: SyncSender<Inbound>,

    /// Parameter file the movement parameters are reloaded from.
    movement_params_file: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Items passed from the ingestion thread to the control loop.
#[derive(Debug, Clone)]
pub enum Inbound {
    Msg(NavMsg),

    /// Reloaded movement parameters, already validated.
    MovementParams(movement_ctrl::Params),
}

/// State of the inbound queue after a drain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputState {
    Open,

    /// The ingestion thread has finished and everything it sent has been applied.
    Ended,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("The control loop has stopped")]
    ControlStopped,
}

#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("Could not load the movement parameters: {0}")]
    LoadError(LoadError),

    #[error("Invalid movement parameters: {0}")]
    InvalidParams(ParamsError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Ingest {
    pub fn new(tx: SyncSender<Inbound>, movement_params_file: &str) -> Self {
        Self {
            tx,
            movement_params_file: movement_params_file.to_string(),
        }
    }

    /// Pass a message on to the control loop, blocking while the queue is full.
    ///
    /// A parameter reload that fails is logged and nothing is sent, so the controller keeps its
    /// current parameters.
    pub fn forward(&self, msg: NavMsg) -> Result<(), IngestError> {
        let inbound = match msg {
            NavMsg::UpdatePidConfigs => {
                match load_movement_params(&self.movement_params_file) {
                    Ok(p) => {
                        info!("Movement parameters reloaded from \"{}\"", self.movement_params_file);
                        Inbound::MovementParams(p)
                    },
                    Err(e) => {
                        error!("{}, keeping the current ones", e);
                        return Ok(())
                    }
                }
            },
            m => Inbound::Msg(m)
        };

        self.tx.send(inbound)
            .map_err(|_| IngestError::ControlStopped)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Load and validate a movement parameter file.
pub fn load_movement_params(file: &str) -> Result<movement_ctrl::Params, ReloadError> {
    let p: movement_ctrl::Params = params::load(file)
        .map_err(ReloadError::LoadError)?;

    p.validate()
        .map_err(ReloadError::InvalidParams)?;

    Ok(p)
}

/// Apply at most `max` queued items to the controller, passing any requests it raises to `out`.
pub fn drain<A: Actuator>(
    rx: &Receiver<Inbound>,
    nav: &mut NavCtrl<A>,
    out: &SyncSender<Outbound>,
    time_s: f64,
    max: usize
) -> InputState {
    for _ in 0..max {
        match rx.try_recv() {
            Ok(inbound) => {
                if let Some(NavRequest::ZeroPosition) = nav.apply_inbound(inbound, time_s) {
                    tm_server::queue(out, Outbound::ZeroPosition);
                }
            },
            Err(TryRecvError::Empty) => return InputState::Open,
            Err(TryRecvError::Disconnected) => return InputState::Ended
        }
    }

    // The rest is left for the next cycle
    InputState::Open
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc::sync_channel;
    use comms_if::nav::{MovementMode, Pose, RemoteCommand};
    use util::archive::spawn_writer;
    use crate::{actuator::SimActuator, movement_ctrl::test_params, nav_ctrl::Params};

    const PARAMS_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../params/movement_ctrl.toml");

    fn nav(name: &str) -> NavCtrl<SimActuator> {
        let (sender, _) = spawn_writer(16).unwrap();
        let params = Params {
            waypoint_file: std::env::temp_dir()
                .join(format!("ingest_{}_{}.csv", name, std::process::id())),
            sensor_stale_threshold_s: 1.0,
        };

        NavCtrl::new(params, test_params(), SimActuator::default(), sender).unwrap()
    }

    #[test]
    fn test_reload_on_ingestion() {
        let (tx, rx) = sync_channel(4);
        let ingest = Ingest::new(tx, PARAMS_FILE);

        ingest.forward(NavMsg::UpdatePidConfigs).unwrap();
        match rx.try_recv() {
            Ok(Inbound::MovementParams(p)) => {
                assert_eq!(p.dt_s, 0.05);
                assert_eq!(p.thrusters.max_thrust_pc, 80.0);
            },
            other => panic!("Expected movement parameters, got {:?}", other)
        }

        // Other messages pass straight through
        ingest.forward(NavMsg::KillSub(false)).unwrap();
        assert!(matches!(rx.try_recv(), Ok(Inbound::Msg(NavMsg::KillSub(false)))));
    }

    #[test]
    fn test_failed_reload_sends_nothing() {
        let (tx, rx) = sync_channel(4);
        let ingest = Ingest::new(tx, "/nonexistent/movement_ctrl.toml");

        ingest.forward(NavMsg::UpdatePidConfigs).unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        assert!(matches!(
            load_movement_params("/nonexistent/movement_ctrl.toml"),
            Err(ReloadError::LoadError(_))
        ));
    }

    #[test]
    fn test_control_stopped() {
        let (tx, rx) = sync_channel(4);
        let ingest = Ingest::new(tx, PARAMS_FILE);
        drop(rx);

        assert!(matches!(
            ingest.forward(NavMsg::KillSub(true)),
            Err(IngestError::ControlStopped)
        ));
    }

    #[test]
    fn test_reloaded_params_applied_by_drain() {
        let mut nav = nav("reload");
        let (tx, rx) = sync_channel(4);
        let (out_tx, _out_rx) = sync_channel(4);
        let ingest = Ingest::new(tx, PARAMS_FILE);

        ingest.forward(NavMsg::UpdatePidConfigs).unwrap();
        assert_eq!(drain(&rx, &mut nav, &out_tx, 0.0, 8), InputState::Open);
        assert_eq!(nav.movement_ctrl().params().dt_s, 0.05);
    }

    #[test]
    fn test_drain_is_bounded() {
        let mut nav = nav("bounded");
        let (tx, rx) = sync_channel(8);
        let (out_tx, _out_rx) = sync_channel(4);

        for depth in 1..=4 {
            tx.send(Inbound::Msg(NavMsg::DesiredPosition(Pose {
                depth_ft: depth as f64,
                ..Default::default()
            }))).unwrap();
        }

        assert_eq!(drain(&rx, &mut nav, &out_tx, 0.0, 3), InputState::Open);
        assert_eq!(nav.desired_pose().depth_ft, 3.0);

        assert_eq!(drain(&rx, &mut nav, &out_tx, 0.1, 3), InputState::Open);
        assert_eq!(nav.desired_pose().depth_ft, 4.0);
    }

    #[test]
    fn test_drain_after_input_ends() {
        let mut nav = nav("ended");
        let (tx, rx) = sync_channel(8);
        let (out_tx, out_rx) = sync_channel(4);

        tx.send(Inbound::Msg(NavMsg::MovementMode(MovementMode::Autonomous))).unwrap();
        tx.send(Inbound::Msg(NavMsg::RemoteControl(RemoteCommand {
            zero_position: true,
            ..Default::default()
        }))).unwrap();
        drop(tx);

        // Queued items are still applied before the end is reported
        assert_eq!(drain(&rx, &mut nav, &out_tx, 0.0, 8), InputState::Ended);
        assert!(matches!(out_rx.try_recv(), Ok(Outbound::ZeroPosition)));

        nav.apply(NavMsg::KillSub(false), 0.0);
        assert_eq!(nav.mode(), comms_if::nav::Mode::Autonomous);
    }
}
