//! Implementations for the NavCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::path::{Path, PathBuf};
use log::{debug, error, info, warn};
use serde::Serialize;

// Internal
use comms_if::{
    msg::NavMsg,
    nav::{ErrorVector, Mode, MovementMode, Pose, RemoteCommand, NUM_THRUSTERS},
    tm::NavTm,
};
use util::{
    archive::{Archived, ArchiveSender, Archiver, ArchiveError},
    host,
    params::{self, LoadError},
    session::{Session, SessionError},
};
use crate::actuator::Actuator;
use crate::ingest::Inbound;
use crate::movement_ctrl::{self, MovementCtrl, ParamsError};
use super::{Params, WaypointLog};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Navigation controller module state
pub struct NavCtrl<A: Actuator> {
    params: Params,

    /// Resolved path of the waypoint log
    waypoint_path: PathBuf,

    movement_ctrl: MovementCtrl<A>,

    /// Queue of the archive thread, which writes the status archive and waypoint logs.
    archive: ArchiveSender,

    /// Movement mode selected over the bus, which is only effective while not killed.
    selected_mode: MovementMode,

    killed: bool,

    current_pose: Pose,
    desired_pose: Pose,

    /// Last remote command received, used until the next one arrives.
    remote_cmd: RemoteCommand,

    /// Error vector from the last pose control step
    pos_error: ErrorVector,

    /// Open log while waypoint collection is enabled
    waypoint_log: Option<WaypointLog>,

    last_sensor_time_s: Option<f64>,
    sensor_stale: bool,

    num_cycles: u64,

    arch_status: Archiver,
    last_tick_time_s: f64,
}

/// Flattened control state written to the status archive each cycle.
#[derive(Serialize)]
struct StatusRecord {
    time_s: f64,
    mode: Mode,

    current_roll_deg: f64,
    current_pitch_deg: f64,
    current_yaw_deg: f64,
    current_north_ft: f64,
    current_east_ft: f64,
    current_depth_ft: f64,

    desired_roll_deg: f64,
    desired_pitch_deg: f64,
    desired_yaw_deg: f64,
    desired_north_ft: f64,
    desired_east_ft: f64,
    desired_depth_ft: f64,

    error_roll_deg: f64,
    error_pitch_deg: f64,
    error_yaw_deg: f64,
    error_x_ft: f64,
    error_y_ft: f64,
    error_depth_ft: f64,

    t1_pc: f64,
    t2_pc: f64,
    t3_pc: f64,
    t4_pc: f64,
    t5_pc: f64,
    t6_pc: f64,
    t7_pc: f64,
    t8_pc: f64,

    sensor_stale: bool,
    num_cycles: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Requests NavCtrl makes of the rest of the system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavRequest {
    /// Reset the north/east reference frame of the position source.
    ZeroPosition,
}

#[derive(Debug, thiserror::Error)]
pub enum NavCtrlInitError {
    #[error("Failed to load the parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Invalid movement parameters: {0}")]
    MovementParamsError(ParamsError),

    #[error("The sensor stale threshold must be positive and finite, found {0}")]
    InvalidStaleThreshold(f64),

    #[error("The waypoint file is relative but the software root (SUB_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the archive directory: {0}")]
    SessionError(SessionError),

    #[error("Cannot create the status archive: {0}")]
    ArchiveError(ArchiveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<A: Actuator> NavCtrl<A> {
    /// Create a new controller. The controller starts killed with `PidTuning` selected.
    pub fn new(
        params: Params,
        movement_params: movement_ctrl::Params,
        actuator: A,
        archive: ArchiveSender
    ) -> Result<Self, NavCtrlInitError> {
        let threshold = params.sensor_stale_threshold_s;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(NavCtrlInitError::InvalidStaleThreshold(threshold))
        }

        let waypoint_path = resolve_waypoint_path(&params.waypoint_file)?;

        let movement_ctrl = MovementCtrl::new(movement_params, actuator)
            .map_err(NavCtrlInitError::MovementParamsError)?;

        Ok(Self {
            params,
            waypoint_path,
            movement_ctrl,
            archive,
            selected_mode: MovementMode::default(),
            killed: true,
            current_pose: Pose::default(),
            desired_pose: Pose::default(),
            remote_cmd: RemoteCommand::default(),
            pos_error: ErrorVector::default(),
            waypoint_log: None,
            last_sensor_time_s: None,
            sensor_stale: false,
            num_cycles: 0,
            arch_status: Archiver::default(),
            last_tick_time_s: 0.0,
        })
    }

    /// Initialise the controller from parameter files.
    pub fn init(
        nav_params_file: &str,
        movement_params_file: &str,
        actuator: A,
        archive: ArchiveSender
    ) -> Result<Self, NavCtrlInitError> {
        let params: Params = params::load(nav_params_file)
            .map_err(NavCtrlInitError::ParamLoadError)?;
        let movement_params: movement_ctrl::Params = params::load(movement_params_file)
            .map_err(NavCtrlInitError::ParamLoadError)?;

        Self::new(params, movement_params, actuator, archive)
    }

    /// Start archiving the control state into the session.
    pub fn init_archive(&mut self, session: &Session) -> Result<(), NavCtrlInitError> {
        session.arch_subdir("nav_ctrl")
            .map_err(NavCtrlInitError::SessionError)?;

        self.arch_status = Archiver::from_path(session, &self.archive, "nav_ctrl/status.csv")
            .map_err(NavCtrlInitError::ArchiveError)?;

        Ok(())
    }

    /// The effective mode, `Killed` overrides the selected movement mode.
    pub fn mode(&self) -> Mode {
        match self.killed {
            true => Mode::Killed,
            false => self.selected_mode.into()
        }
    }

    /// Apply an item from the inbound queue received at `time_s`.
    pub fn apply_inbound(&mut self, inbound: Inbound, time_s: f64) -> Option<NavRequest> {
        match inbound {
            Inbound::Msg(msg) => self.apply(msg, time_s),
            Inbound::MovementParams(p) => {
                self.reconfigure_movement(p);
                None
            }
        }
    }

    /// Apply an inbound message received at `time_s`.
    ///
    /// Returns a request for the rest of the system if the message raised one.
    pub fn apply(&mut self, msg: NavMsg, time_s: f64) -> Option<NavRequest> {
        match msg {
            NavMsg::RemoteControl(cmd) => {
                self.remote_cmd = cmd;

                if cmd.record_waypoint {
                    self.record_waypoint();
                }

                if cmd.zero_position {
                    info!("Zero position requested");
                    return Some(NavRequest::ZeroPosition)
                }
            },
            NavMsg::MovementMode(m) => {
                if m != self.selected_mode {
                    info!("Movement mode changed from {:?} to {:?}", self.selected_mode, m);
                }
                self.selected_mode = m;
                self.movement_ctrl.clear_depth_hold();

                if self.mode() == Mode::ThrusterTest {
                    self.stop_thrusters();
                }
            },
            // The file is read on ingestion and arrives as `Inbound::MovementParams`
            NavMsg::UpdatePidConfigs => debug!("Movement parameter reload requested"),
            NavMsg::DesiredPosition(p) => self.desired_pose = p,
            NavMsg::EnableWaypointCollection(enable) => self.set_waypoint_collection(enable),
            NavMsg::Thrusts(t) => {
                if self.mode() == Mode::ThrusterTest {
                    let mut thrusts_pc = [0f64; NUM_THRUSTERS];
                    for (dst, src) in thrusts_pc.iter_mut().zip(t.iter()) {
                        *dst = *src as f64;
                    }
                    self.movement_ctrl.simple_thrust(&thrusts_pc);
                }
                else {
                    debug!("Thruster test values dropped in {:?} mode", self.mode());
                }
            },
            NavMsg::SensorData(p) => {
                self.current_pose = p;
                self.last_sensor_time_s = Some(time_s);
            },
            NavMsg::KillSub(kill) => {
                if kill != self.killed {
                    match kill {
                        true => warn!("Sub killed"),
                        false => info!("Sub unkilled, entering {:?} mode", self.selected_mode)
                    }
                }
                self.killed = kill;

                if kill {
                    self.stop_thrusters();
                }
            },
        }

        None
    }

    /// Run one control cycle at `time_s`.
    pub fn tick(&mut self, time_s: f64) {
        self.num_cycles += 1;
        self.last_tick_time_s = time_s;

        self.update_staleness(time_s);

        // The kill check comes first and overrides all other modes
        match self.mode() {
            Mode::Killed => self.stop_thrusters(),
            Mode::PidTuning | Mode::Autonomous => {
                self.pos_error = self.movement_ctrl.advance_move(
                    &self.current_pose,
                    &self.desired_pose
                );
            },
            // Test values are applied as they arrive
            Mode::ThrusterTest => (),
            Mode::RemoteControl => {
                self.movement_ctrl.remote_move(&self.current_pose, &self.remote_cmd);
            },
        }
    }

    /// Build the telemetry packet for `time_s`.
    pub fn tm(&self, time_s: f64, num_consec_cycle_overruns: u64) -> NavTm {
        NavTm {
            time_s,
            mode: self.mode(),
            current_pose: self.current_pose,
            desired_pose: self.desired_pose,
            pos_error: self.pos_error,
            thrusts_pc: self.movement_ctrl.thrusts_pc(),
            sensor_data_age_s: self.sensor_data_age_s(time_s),
            sensor_data_stale: self.sensor_stale,
            num_cycles: self.num_cycles,
            num_consec_cycle_overruns,
            waypoint_collection_enabled: self.waypoint_log.is_some(),
            num_waypoints: self.waypoint_log.as_ref()
                .map(|l| l.num_recorded())
                .unwrap_or(0),
        }
    }

    /// Switch the movement controller to a new parameter set.
    ///
    /// Invalid parameters are rejected and the current ones kept.
    pub fn reconfigure_movement(&mut self, params: movement_ctrl::Params) {
        if let Err(e) = self.movement_ctrl.reconfigure(params) {
            error!("Rejected the reloaded movement parameters: {}", e);
        }
    }

    /// Leave the vehicle safe on exit: killed, thrusters stopped and any waypoint log closed.
    pub fn shutdown(&mut self) {
        if !self.killed {
            warn!("Sub killed for shutdown");
        }
        self.killed = true;
        self.stop_thrusters();
        self.set_waypoint_collection(false);
    }

    pub fn movement_ctrl(&self) -> &MovementCtrl<A> {
        &self.movement_ctrl
    }

    pub fn current_pose(&self) -> &Pose {
        &self.current_pose
    }

    pub fn desired_pose(&self) -> &Pose {
        &self.desired_pose
    }

    pub fn waypoint_path(&self) -> &Path {
        &self.waypoint_path
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    // ---- PRIVATE ----

    fn stop_thrusters(&mut self) {
        self.movement_ctrl.simple_thrust(&[0.0; NUM_THRUSTERS]);
    }

    fn set_waypoint_collection(&mut self, enable: bool) {
        if !enable {
            if let Some(log) = self.waypoint_log.take() {
                info!(
                    "Waypoint collection disabled, {} waypoints recorded",
                    log.num_recorded()
                );
            }
            return
        }

        // Dropping any open log closes it before the file is truncated
        self.waypoint_log = None;

        match WaypointLog::open(&self.archive, &self.waypoint_path) {
            Ok(log) => {
                info!("Waypoint collection enabled, logging to {:?}", self.waypoint_path);
                self.waypoint_log = Some(log);
            },
            Err(e) => error!("Could not enable waypoint collection: {}", e)
        }
    }

    fn record_waypoint(&mut self) {
        let log = match self.waypoint_log {
            Some(ref mut l) => l,
            None => {
                debug!("Waypoint requested while collection is disabled");
                return
            }
        };

        match log.record(&self.current_pose) {
            Ok(wp) => info!(
                "Waypoint {} recorded at ({:.2}, {:.2}, {:.2})",
                wp.seq, wp.north_ft, wp.east_ft, wp.depth_ft
            ),
            Err(e) => error!("{}", e)
        }
    }

    fn sensor_data_age_s(&self, time_s: f64) -> Option<f64> {
        self.last_sensor_time_s.map(|t| time_s - t)
    }

    fn update_staleness(&mut self, time_s: f64) {
        let threshold = self.params.sensor_stale_threshold_s;

        // Without any data the age is measured from the start of the session
        let stale = self.sensor_data_age_s(time_s)
            .map_or(time_s > threshold, |age| age > threshold);

        if stale && !self.sensor_stale {
            warn!("Sensor data is older than {:.2} s", threshold);
        }
        else if !stale && self.sensor_stale {
            info!("Sensor data is fresh again");
        }

        self.sensor_stale = stale;
    }
}

impl<A: Actuator> Archived for NavCtrl<A> {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let c = &self.current_pose;
        let d = &self.desired_pose;
        let e = &self.pos_error;
        let t = self.movement_ctrl.thrusts_pc();

        let record = StatusRecord {
            time_s: self.last_tick_time_s,
            mode: self.mode(),
            current_roll_deg: c.roll_deg,
            current_pitch_deg: c.pitch_deg,
            current_yaw_deg: c.yaw_deg,
            current_north_ft: c.north_ft,
            current_east_ft: c.east_ft,
            current_depth_ft: c.depth_ft,
            desired_roll_deg: d.roll_deg,
            desired_pitch_deg: d.pitch_deg,
            desired_yaw_deg: d.yaw_deg,
            desired_north_ft: d.north_ft,
            desired_east_ft: d.east_ft,
            desired_depth_ft: d.depth_ft,
            error_roll_deg: e.roll_deg,
            error_pitch_deg: e.pitch_deg,
            error_yaw_deg: e.yaw_deg,
            error_x_ft: e.x_ft,
            error_y_ft: e.y_ft,
            error_depth_ft: e.depth_ft,
            t1_pc: t[0],
            t2_pc: t[1],
            t3_pc: t[2],
            t4_pc: t[3],
            t5_pc: t[4],
            t6_pc: t[5],
            t7_pc: t[6],
            t8_pc: t[7],
            sensor_stale: self.sensor_stale,
            num_cycles: self.num_cycles,
        };

        self.arch_status.serialise(record)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Relative waypoint paths are relative to the software root.
fn resolve_waypoint_path(path: &Path) -> Result<PathBuf, NavCtrlInitError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf())
    }

    host::get_sub_sw_root()
        .map(|root| root.join(path))
        .map_err(|_| NavCtrlInitError::SwRootNotSet)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::thread::JoinHandle;
    use util::archive::spawn_writer;
    use crate::actuator::SimActuator;
    use crate::movement_ctrl::test_params;

    /// Controller plus its archive thread, which exits once the controller is dropped.
    fn nav_with_writer(name: &str) -> (NavCtrl<SimActuator>, JoinHandle<()>) {
        let mut waypoint_file = std::env::temp_dir();
        waypoint_file.push(format!("nav_ctrl_{}_{}.csv", name, std::process::id()));

        let params = Params {
            waypoint_file,
            sensor_stale_threshold_s: 1.0,
        };

        let (sender, handle) = spawn_writer(64).unwrap();
        let nav = NavCtrl::new(params, test_params(), SimActuator::default(), sender).unwrap();

        (nav, handle)
    }

    fn nav(name: &str) -> NavCtrl<SimActuator> {
        nav_with_writer(name).0
    }

    /// Drop the controller and wait for its archives to be written.
    fn finish(nav: NavCtrl<SimActuator>, handle: JoinHandle<()>) {
        drop(nav);
        handle.join().unwrap();
    }

    fn moving(nav: &mut NavCtrl<SimActuator>, mode: MovementMode) {
        nav.apply(NavMsg::MovementMode(mode), 0.0);
        nav.apply(NavMsg::KillSub(false), 0.0);
    }

    #[test]
    fn test_starts_killed() {
        let mut nav = nav("starts_killed");
        assert_eq!(nav.mode(), Mode::Killed);

        nav.apply(NavMsg::DesiredPosition(Pose { depth_ft: 5.0, ..Default::default() }), 0.0);
        nav.tick(0.1);
        assert_eq!(nav.movement_ctrl().actuator().demands(), [0.0; NUM_THRUSTERS]);

        nav.apply(NavMsg::KillSub(false), 0.2);
        assert_eq!(nav.mode(), Mode::PidTuning);
    }

    #[test]
    fn test_kill_overrides() {
        let mut nav = nav("kill_overrides");
        moving(&mut nav, MovementMode::Autonomous);

        nav.apply(NavMsg::SensorData(Pose::default()), 0.0);
        nav.apply(NavMsg::DesiredPosition(Pose {
            north_ft: 2.0,
            depth_ft: 5.0,
            yaw_deg: 30.0,
            ..Default::default()
        }), 0.0);
        nav.tick(0.1);
        assert!(nav.movement_ctrl().actuator().demands().iter().any(|d| *d != 0.0));
        assert_eq!(nav.tm(0.1, 0).pos_error.depth_ft, 5.0);

        nav.apply(NavMsg::KillSub(true), 0.15);
        assert_eq!(nav.mode(), Mode::Killed);
        assert_eq!(nav.movement_ctrl().actuator().demands(), [0.0; NUM_THRUSTERS]);

        // Still zero after a remote command and a tick
        nav.apply(NavMsg::RemoteControl(RemoteCommand { x: 1.0, ..Default::default() }), 0.18);
        nav.tick(0.2);
        assert_eq!(nav.movement_ctrl().actuator().demands(), [0.0; NUM_THRUSTERS]);

        // Unkilling returns to the last selected mode
        nav.apply(NavMsg::KillSub(false), 0.3);
        assert_eq!(nav.mode(), Mode::Autonomous);
    }

    #[test]
    fn test_thruster_test() {
        let mut nav = nav("thruster_test");
        let values = [10, -20, 30, -40, 50, -60, 70, -80];

        // Dropped while killed
        nav.apply(NavMsg::MovementMode(MovementMode::ThrusterTest), 0.0);
        nav.apply(NavMsg::Thrusts(values), 0.0);
        assert_eq!(nav.movement_ctrl().thrusts_pc(), [0.0; NUM_THRUSTERS]);

        nav.apply(NavMsg::KillSub(false), 0.0);
        nav.apply(NavMsg::Thrusts(values), 0.0);
        assert_eq!(
            nav.movement_ctrl().thrusts_pc(),
            [10.0, -20.0, 30.0, -40.0, 50.0, -60.0, 70.0, -80.0]
        );

        // The tick leaves the test values in place
        nav.tick(0.1);
        assert_eq!(nav.movement_ctrl().thrusts_pc()[7], -80.0);

        // Dropped outside of thruster test
        nav.apply(NavMsg::MovementMode(MovementMode::RemoteControl), 0.2);
        nav.tick(0.2);
        let remote_thrusts = nav.movement_ctrl().thrusts_pc();
        nav.apply(NavMsg::Thrusts(values), 0.2);
        assert_eq!(nav.movement_ctrl().thrusts_pc(), remote_thrusts);
    }

    #[test]
    fn test_mode_change_clears_depth_hold() {
        let mut nav = nav("depth_hold");
        moving(&mut nav, MovementMode::RemoteControl);

        nav.apply(NavMsg::SensorData(Pose { depth_ft: 12.0, ..Default::default() }), 0.0);
        nav.apply(NavMsg::RemoteControl(RemoteCommand {
            hold_depth: true,
            ..Default::default()
        }), 0.0);
        nav.tick(0.1);
        assert_eq!(nav.movement_ctrl().depth_hold(), Some(12.0));

        nav.apply(NavMsg::MovementMode(MovementMode::RemoteControl), 0.15);
        assert_eq!(nav.movement_ctrl().depth_hold(), None);
    }

    fn record_msg() -> NavMsg {
        NavMsg::RemoteControl(RemoteCommand {
            record_waypoint: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_waypoints() {
        let (mut nav, handle) = nav_with_writer("waypoints");
        let path = nav.waypoint_path().to_path_buf();

        // Ignored while collection is disabled
        nav.apply(record_msg(), 0.0);
        assert!(!nav.tm(0.0, 0).waypoint_collection_enabled);

        nav.apply(NavMsg::EnableWaypointCollection(true), 0.0);
        nav.apply(NavMsg::SensorData(Pose {
            north_ft: 1.0, east_ft: 2.0, depth_ft: 3.0, ..Default::default()
        }), 0.0);
        nav.apply(record_msg(), 0.1);
        nav.apply(record_msg(), 0.2);
        nav.apply(record_msg(), 0.3);

        let tm = nav.tm(0.3, 0);
        assert!(tm.waypoint_collection_enabled);
        assert_eq!(tm.num_waypoints, 3);

        nav.apply(NavMsg::EnableWaypointCollection(false), 0.4);
        assert!(!nav.tm(0.4, 0).waypoint_collection_enabled);

        finish(nav, handle);

        let contents = std::fs::read_to_string(&path).unwrap();
        let seqs: Vec<&str> = contents.lines()
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(seqs, vec!["0", "1", "2"]);
        assert!(contents.starts_with("0,1.0,2.0,3.0\n"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_waypoints_restart() {
        let (mut nav, handle) = nav_with_writer("waypoints_restart");
        let path = nav.waypoint_path().to_path_buf();

        nav.apply(NavMsg::SensorData(Pose {
            north_ft: 1.0, east_ft: 2.0, depth_ft: 3.0, ..Default::default()
        }), 0.0);
        nav.apply(NavMsg::EnableWaypointCollection(true), 0.0);
        nav.apply(record_msg(), 0.1);
        nav.apply(record_msg(), 0.2);

        // A fresh enable truncates the file and restarts the numbering
        nav.apply(NavMsg::EnableWaypointCollection(true), 0.3);
        nav.apply(record_msg(), 0.4);
        assert_eq!(nav.tm(0.4, 0).num_waypoints, 1);

        finish(nav, handle);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "0,1.0,2.0,3.0\n");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_zero_position() {
        let mut nav = nav("zero_position");

        assert_eq!(
            nav.apply(NavMsg::RemoteControl(RemoteCommand::default()), 0.0),
            None
        );
        assert_eq!(
            nav.apply(NavMsg::RemoteControl(RemoteCommand {
                zero_position: true,
                ..Default::default()
            }), 0.0),
            Some(NavRequest::ZeroPosition)
        );
    }

    #[test]
    fn test_sensor_staleness() {
        let mut nav = nav("staleness");

        nav.tick(0.5);
        let tm = nav.tm(0.5, 0);
        assert_eq!(tm.sensor_data_age_s, None);
        assert!(!tm.sensor_data_stale);

        nav.tick(1.5);
        assert!(nav.tm(1.5, 0).sensor_data_stale);

        nav.apply(NavMsg::SensorData(Pose::default()), 2.0);
        nav.tick(2.5);
        let tm = nav.tm(2.5, 0);
        assert_eq!(tm.sensor_data_age_s, Some(0.5));
        assert!(!tm.sensor_data_stale);

        nav.tick(3.5);
        assert!(nav.tm(3.5, 0).sensor_data_stale);
        assert_eq!(nav.tm(3.5, 2).num_consec_cycle_overruns, 2);
        assert_eq!(nav.tm(3.5, 0).num_cycles, 4);
    }

    #[test]
    fn test_reconfigure_movement() {
        let mut nav = nav("reconfigure");
        assert_eq!(nav.movement_ctrl().params().dt_s, 0.1);

        // The request on its own does no file access
        nav.apply(NavMsg::UpdatePidConfigs, 0.0);
        assert_eq!(nav.movement_ctrl().params().dt_s, 0.1);

        let mut p = test_params();
        p.dt_s = 0.05;
        p.thrusters.max_thrust_pc = 80.0;
        assert_eq!(nav.apply_inbound(Inbound::MovementParams(p), 0.0), None);
        assert_eq!(nav.movement_ctrl().params().dt_s, 0.05);
        assert_eq!(nav.movement_ctrl().params().thrusters.max_thrust_pc, 80.0);

        // Invalid parameters leave the current ones in place
        let mut p = test_params();
        p.dt_s = 0.0;
        nav.reconfigure_movement(p);
        assert_eq!(nav.movement_ctrl().params().dt_s, 0.05);
    }

    #[test]
    fn test_shutdown() {
        let (mut nav, handle) = nav_with_writer("shutdown");
        let path = nav.waypoint_path().to_path_buf();
        moving(&mut nav, MovementMode::Autonomous);

        nav.apply(NavMsg::SensorData(Pose::default()), 0.0);
        nav.apply(NavMsg::DesiredPosition(Pose { depth_ft: 5.0, ..Default::default() }), 0.0);
        nav.apply(NavMsg::EnableWaypointCollection(true), 0.0);
        nav.tick(0.1);
        assert!(nav.movement_ctrl().actuator().demands().iter().any(|d| *d != 0.0));

        nav.shutdown();
        assert_eq!(nav.mode(), Mode::Killed);
        assert_eq!(nav.movement_ctrl().actuator().demands(), [0.0; NUM_THRUSTERS]);
        assert!(!nav.tm(0.2, 0).waypoint_collection_enabled);

        // Shutting down an already killed controller is harmless
        nav.shutdown();
        assert_eq!(nav.movement_ctrl().thrusts_pc(), [0.0; NUM_THRUSTERS]);

        finish(nav, handle);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_threshold() {
        let params = Params {
            waypoint_file: std::env::temp_dir().join("unused.csv"),
            sensor_stale_threshold_s: 0.0,
        };

        let (sender, _) = spawn_writer(4).unwrap();
        assert!(matches!(
            NavCtrl::new(params, test_params(), SimActuator::default(), sender),
            Err(NavCtrlInitError::InvalidStaleThreshold(_))
        ));
    }
}
