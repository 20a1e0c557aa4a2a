//! Implementations for the MovementCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use nalgebra::{Rotation2, Vector2};

// Internal
use comms_if::nav::{ErrorVector, Pose, RemoteCommand, NUM_THRUSTERS};
use util::maths::{ang_dist_deg, interp};
use crate::actuator::Actuator;
use super::{bound_error, AxisControls, Params, ParamsError, Pid, Thruster};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Movement control module state
pub struct MovementCtrl<A: Actuator> {
    params: Params,

    roll_pid: Pid,
    pitch_pid: Pid,
    yaw_pid: Pid,
    x_pid: Pid,
    y_pid: Pid,
    depth_pid: Pid,

    thrusters: [Thruster; NUM_THRUSTERS],

    /// Depth latched when the remote hold depth flag was raised, `None` while the flag is low.
    remote_depth_hold: Option<f64>,

    actuator: A,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<A: Actuator> MovementCtrl<A> {
    /// Create a new controller driving the given actuator.
    pub fn new(params: Params, actuator: A) -> Result<Self, ParamsError> {
        params.validate()?;

        let dt_s = params.dt_s;

        Ok(Self {
            roll_pid: Pid::new(&params.roll, dt_s),
            pitch_pid: Pid::new(&params.pitch, dt_s),
            yaw_pid: Pid::new(&params.yaw, dt_s),
            x_pid: Pid::new(&params.x, dt_s),
            y_pid: Pid::new(&params.y, dt_s),
            depth_pid: Pid::new(&params.depth, dt_s),
            thrusters: Thruster::layout(&params.thrusters),
            remote_depth_hold: None,
            params,
            actuator
        })
    }

    /// Apply a new set of parameters.
    ///
    /// All PID gains are replaced (resetting their state) and the thruster trims are updated. If
    /// the parameters are invalid the current ones are kept.
    pub fn reconfigure(&mut self, params: Params) -> Result<(), ParamsError> {
        params.validate()?;

        let dt_s = params.dt_s;
        let pids = [
            (&mut self.roll_pid, params.roll),
            (&mut self.pitch_pid, params.pitch),
            (&mut self.yaw_pid, params.yaw),
            (&mut self.x_pid, params.x),
            (&mut self.y_pid, params.y),
            (&mut self.depth_pid, params.depth),
        ];

        for (pid, axis) in pids {
            pid.set_gains(axis.k_p, axis.k_i, axis.k_d, dt_s);
        }

        for (t, s) in self.thrusters.iter_mut().zip(params.thrusters.strength_offsets.iter()) {
            t.strength_offset = *s;
            t.max_thrust_pc = params.thrusters.max_thrust_pc;
        }

        self.params = params;

        info!("MovementCtrl configuration updated");

        Ok(())
    }

    /// Drive towards the desired pose from the current pose.
    ///
    /// Returns the bounded error of each axis, with the position errors in the body frame.
    pub fn advance_move(&mut self, current: &Pose, desired: &Pose) -> ErrorVector {
        let p = &self.params;
        let mut desired = *desired;

        if desired.roll_deg.abs() > p.limits.max_roll_deg {
            warn!(
                "Desired roll {:.2} deg exceeds the {:.2} deg limit",
                desired.roll_deg, p.limits.max_roll_deg
            );
            desired.roll_deg = p.limits.max_roll_deg.copysign(desired.roll_deg);
        }

        if desired.pitch_deg.abs() > p.limits.max_pitch_deg {
            warn!(
                "Desired pitch {:.2} deg exceeds the {:.2} deg limit",
                desired.pitch_deg, p.limits.max_pitch_deg
            );
            desired.pitch_deg = p.limits.max_pitch_deg.copysign(desired.pitch_deg);
        }

        if desired.depth_ft < p.limits.min_depth {
            warn!(
                "Desired depth {:.2} ft is above the {:.2} ft limit",
                desired.depth_ft, p.limits.min_depth
            );
            desired.depth_ft = p.limits.min_depth;
        }
        else if desired.depth_ft > p.limits.max_depth {
            warn!(
                "Desired depth {:.2} ft is below the {:.2} ft limit",
                desired.depth_ft, p.limits.max_depth
            );
            desired.depth_ft = p.limits.max_depth;
        }

        // Position error is found in the world frame then rotated into the body frame
        let world_err = Vector2::new(
            desired.north_ft - current.north_ft,
            desired.east_ft - current.east_ft
        );
        let body_err = Rotation2::new(-current.yaw_deg.to_radians()) * world_err;

        let error = ErrorVector {
            roll_deg: bound_error(
                desired.roll_deg - current.roll_deg,
                p.roll.min_error, p.roll.max_error
            ),
            pitch_deg: bound_error(
                desired.pitch_deg - current.pitch_deg,
                p.pitch.min_error, p.pitch.max_error
            ),
            yaw_deg: bound_error(
                ang_dist_deg(desired.yaw_deg, current.yaw_deg),
                p.yaw.min_error, p.yaw.max_error
            ),
            x_ft: bound_error(body_err.x, p.x.min_error, p.x.max_error),
            y_ft: bound_error(body_err.y, p.y.min_error, p.y.max_error),
            depth_ft: bound_error(
                desired.depth_ft - current.depth_ft,
                p.depth.min_error, p.depth.max_error
            ),
        };

        let controls = AxisControls {
            roll: self.roll_pid.control_step(error.roll_deg),
            pitch: self.pitch_pid.control_step(error.pitch_deg),
            yaw: self.yaw_pid.control_step(error.yaw_deg),
            x: self.x_pid.control_step(error.x_ft),
            y: self.y_pid.control_step(error.y_ft),
            z: self.depth_pid.control_step(error.depth_ft),
        };

        trace!("advance_move error: {:?}, controls: {:?}", error, controls);

        self.controlled_thrust(&controls, current.depth_ft);

        error
    }

    /// Drive from the remote input.
    ///
    /// Roll and pitch are held level and depth is either held or driven by the trigger. Yaw, x
    /// and y are mapped straight onto control outputs without passing through their PIDs.
    pub fn remote_move(&mut self, current: &Pose, cmd: &RemoteCommand) {
        let p = &self.params;

        let roll_err = bound_error(-current.roll_deg, p.roll.min_error, p.roll.max_error);
        let pitch_err = bound_error(-current.pitch_deg, p.pitch.min_error, p.pitch.max_error);

        let yaw = interp((-1.0, 1.0), (p.remote.yaw[0], p.remote.yaw[1]), cmd.yaw);
        let x = interp((-1.0, 1.0), (p.remote.x[0], p.remote.x[1]), cmd.x);
        let y = interp((-1.0, 1.0), (p.remote.y[0], p.remote.y[1]), cmd.y);

        let depth_err = if cmd.hold_depth {
            let target = match self.remote_depth_hold {
                Some(d) => d,
                None => {
                    info!("Holding depth at {:.2} ft", current.depth_ft);
                    self.remote_depth_hold = Some(current.depth_ft);
                    current.depth_ft
                }
            };

            bound_error(target - current.depth_ft, p.depth.min_error, p.depth.max_error)
        }
        else {
            self.remote_depth_hold = None;

            // The ascend and descend halves of the trigger map onto different error magnitudes
            if cmd.depth <= 0.0 {
                interp((-1.0, 0.0), (p.depth.min_error, 0.0), cmd.depth)
            }
            else {
                interp((0.0, 1.0), (0.0, p.depth.max_error), cmd.depth)
            }
        };

        let controls = AxisControls {
            roll: self.roll_pid.control_step(roll_err),
            pitch: self.pitch_pid.control_step(pitch_err),
            yaw,
            // Forward on the remote is backwards in the body frame
            x: -x,
            y,
            z: self.depth_pid.control_step(depth_err),
        };

        trace!("remote_move controls: {:?}", controls);

        self.controlled_thrust(&controls, current.depth_ft);
    }

    /// Write each value directly to the thruster with the same index.
    pub fn simple_thrust(&mut self, thrusts_pc: &[f64; NUM_THRUSTERS]) {
        for (t, pc) in self.thrusters.iter_mut().zip(thrusts_pc.iter()) {
            t.set_thrust(&mut self.actuator, *pc);
        }
    }

    /// Allocate the axis controls onto the thrusters and send the demands.
    pub fn controlled_thrust(&mut self, controls: &AxisControls, current_depth: f64) {
        let demands = self.allocate(controls, current_depth);

        for (t, pc) in self.thrusters.iter_mut().zip(demands.iter()) {
            t.set_thrust(&mut self.actuator, *pc);
        }
    }

    /// Thrust demands for the controls, including the strength and depth bias corrections.
    pub fn allocate(&self, controls: &AxisControls, current_depth: f64) -> [f64; NUM_THRUSTERS] {
        let base = self.base_allocation(controls);
        let bias = &self.params.depth_bias;
        let bias_active = current_depth >= bias.active_depth;

        std::array::from_fn(|i| {
            let t = &self.thrusters[i];
            let mut thrust = base[i];

            thrust += thrust * t.strength_offset;

            if bias_active {
                thrust += bias.bias * t.orientation.z;
            }

            thrust
        })
    }

    /// Thrust demands from the thruster geometry alone.
    ///
    /// Only the two lateral thrusters contribute to yaw, and the roll and x terms are negated to
    /// match how the thrusters are wired on the vehicle.
    pub fn base_allocation(&self, c: &AxisControls) -> [f64; NUM_THRUSTERS] {
        std::array::from_fn(|i| {
            let o = &self.thrusters[i].orientation;
            let l = &self.thrusters[i].location;

            (-c.roll * o.z * l.y)
                + (c.pitch * o.z * l.x)
                + (c.yaw * o.y * l.x)
                + (-c.x * o.x)
                + (c.y * o.y)
                + (c.z * o.z)
        })
    }

    /// Forget any latched remote hold depth.
    pub fn clear_depth_hold(&mut self) {
        self.remote_depth_hold = None;
    }

    pub fn depth_hold(&self) -> Option<f64> {
        self.remote_depth_hold
    }

    /// Last demand of each thruster, after limiting and before reversal.
    pub fn thrusts_pc(&self) -> [f64; NUM_THRUSTERS] {
        std::array::from_fn(|i| self.thrusters[i].last_thrust_pc())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::actuator::SimActuator;
    use crate::movement_ctrl::test_params;

    const EPS: f64 = 1e-9;

    fn ctrl() -> MovementCtrl<SimActuator> {
        MovementCtrl::new(test_params(), SimActuator::default()).unwrap()
    }

    fn ctrl_with_depth_bounds(min_error: f64, max_error: f64) -> MovementCtrl<SimActuator> {
        let mut params = test_params();
        params.depth.min_error = min_error;
        params.depth.max_error = max_error;
        MovementCtrl::new(params, SimActuator::default()).unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < EPS, "{} != {}", a, b);
    }

    #[test]
    fn test_yaw_wrap() {
        let mut mc = ctrl();

        let current = Pose { yaw_deg: -170.0, ..Default::default() };
        let desired = Pose { yaw_deg: 170.0, ..Default::default() };
        assert_close(mc.advance_move(&current, &desired).yaw_deg, -20.0);

        let current = Pose { yaw_deg: 170.0, ..Default::default() };
        let desired = Pose { yaw_deg: -170.0, ..Default::default() };
        assert_close(mc.advance_move(&current, &desired).yaw_deg, 20.0);
    }

    #[test]
    fn test_body_frame_rotation() {
        let mut mc = ctrl();
        let desired = Pose { north_ft: 3.0, east_ft: 4.0, ..Default::default() };

        let err = mc.advance_move(&Pose::default(), &desired);
        assert_close(err.x_ft, 3.0);
        assert_close(err.y_ft, 4.0);

        let current = Pose { yaw_deg: 90.0, ..Default::default() };
        let desired = Pose { yaw_deg: 90.0, north_ft: 3.0, east_ft: 4.0, ..Default::default() };
        let err = mc.advance_move(&current, &desired);
        assert_close(err.x_ft, 4.0);
        assert_close(err.y_ft, -3.0);
    }

    #[test]
    fn test_desired_limits() {
        let mut mc = ctrl_with_depth_bounds(-2.0, 4.0);

        let desired = Pose {
            roll_deg: 45.0,
            pitch_deg: -50.0,
            depth_ft: 30.0,
            ..Default::default()
        };
        let err = mc.advance_move(&Pose::default(), &desired);
        assert_close(err.roll_deg, 30.0);
        assert_close(err.pitch_deg, -30.0);
        assert_close(err.depth_ft, 4.0);

        // Desired depth is raised to the minimum before the error is found
        let current = Pose { depth_ft: 1.0, ..Default::default() };
        let desired = Pose { depth_ft: -5.0, ..Default::default() };
        assert_close(mc.advance_move(&current, &desired).depth_ft, -1.0);
    }

    #[test]
    fn test_allocation_geometry() {
        let mc = ctrl();

        let t = mc.base_allocation(&AxisControls { z: 10.0, ..Default::default() });
        assert_eq!(t, [10.0, 0.0, 10.0, 0.0, 10.0, 0.0, 10.0, 0.0]);

        let t = mc.base_allocation(&AxisControls { yaw: 5.0, ..Default::default() });
        assert_eq!(t, [0.0, 5.0, 0.0, 0.0, 0.0, -5.0, 0.0, 0.0]);

        let t = mc.base_allocation(&AxisControls { x: 10.0, ..Default::default() });
        assert_eq!(t, [0.0, 0.0, 0.0, -10.0, 0.0, 0.0, 0.0, -10.0]);

        let t = mc.base_allocation(&AxisControls { roll: 2.0, ..Default::default() });
        assert_eq!(t, [2.0, 0.0, -2.0, 0.0, -2.0, 0.0, 2.0, 0.0]);

        let t = mc.base_allocation(&AxisControls { pitch: 3.0, ..Default::default() });
        assert_eq!(t, [3.0, 0.0, 3.0, 0.0, -3.0, 0.0, -3.0, 0.0]);
    }

    #[test]
    fn test_allocation_linearity() {
        let mc = ctrl();

        let a = AxisControls { roll: 1.5, pitch: -2.0, yaw: 0.5, x: 3.0, y: -1.0, z: 4.0 };
        let b = AxisControls { roll: -0.5, pitch: 1.0, yaw: 2.5, x: -1.0, y: 2.0, z: -3.0 };
        let sum = AxisControls {
            roll: a.roll + b.roll,
            pitch: a.pitch + b.pitch,
            yaw: a.yaw + b.yaw,
            x: a.x + b.x,
            y: a.y + b.y,
            z: a.z + b.z,
        };
        let scaled = AxisControls {
            roll: 3.0 * a.roll,
            pitch: 3.0 * a.pitch,
            yaw: 3.0 * a.yaw,
            x: 3.0 * a.x,
            y: 3.0 * a.y,
            z: 3.0 * a.z,
        };

        let ta = mc.base_allocation(&a);
        let tb = mc.base_allocation(&b);
        let tsum = mc.base_allocation(&sum);
        let tscaled = mc.base_allocation(&scaled);

        for i in 0..NUM_THRUSTERS {
            assert_close(tsum[i], ta[i] + tb[i]);
            assert_close(tscaled[i], 3.0 * ta[i]);
        }
    }

    #[test]
    fn test_strength_and_bias() {
        let mut params = test_params();
        params.thrusters.strength_offsets[0] = 0.5;
        params.depth_bias.bias = 5.0;
        params.depth_bias.active_depth = 10.0;
        let mc = MovementCtrl::new(params, SimActuator::default()).unwrap();

        // Strength trim is multiplicative
        let t = mc.allocate(&AxisControls { z: 10.0, ..Default::default() }, 0.0);
        assert_close(t[0], 15.0);
        assert_close(t[2], 10.0);

        // Bias only below the activation depth, only on the depth thrusters
        let zero = AxisControls::default();
        assert_eq!(mc.allocate(&zero, 9.0), [0.0; NUM_THRUSTERS]);
        assert_eq!(
            mc.allocate(&zero, 10.0),
            [5.0, 0.0, 5.0, 0.0, 5.0, 0.0, 5.0, 0.0]
        );
    }

    #[test]
    fn test_remote_depth_hold() {
        let mut mc = ctrl();
        let hold = RemoteCommand { hold_depth: true, ..Default::default() };
        let release = RemoteCommand::default();

        mc.remote_move(&Pose { depth_ft: 12.0, ..Default::default() }, &hold);
        assert_eq!(mc.depth_hold(), Some(12.0));

        // Target doesn't follow the current depth while held
        mc.remote_move(&Pose { depth_ft: 15.0, ..Default::default() }, &hold);
        assert_eq!(mc.depth_hold(), Some(12.0));

        mc.remote_move(&Pose { depth_ft: 15.0, ..Default::default() }, &release);
        assert_eq!(mc.depth_hold(), None);

        mc.remote_move(&Pose { depth_ft: 8.0, ..Default::default() }, &hold);
        assert_eq!(mc.depth_hold(), Some(8.0));
    }

    #[test]
    fn test_remote_mapping() {
        let mut mc = ctrl_with_depth_bounds(-3.0, 6.0);

        // Full forward maps to the top of the x range, negated into the body frame
        mc.remote_move(&Pose::default(), &RemoteCommand { x: 1.0, ..Default::default() });
        let t = mc.thrusts_pc();
        assert_close(t[3], 40.0);
        assert_close(t[7], 40.0);
        assert_close(t[0], 0.0);

        // Ascend and descend halves of the trigger use their own error bound
        mc.remote_move(&Pose::default(), &RemoteCommand { depth: -1.0, ..Default::default() });
        assert_close(mc.thrusts_pc()[0], -3.0);

        let mut mc = ctrl_with_depth_bounds(-3.0, 6.0);
        mc.remote_move(&Pose::default(), &RemoteCommand { depth: 0.5, ..Default::default() });
        assert_close(mc.thrusts_pc()[0], 3.0);

        // Yaw drives only the lateral thrusters, beyond full scale saturates
        let mut mc = ctrl();
        mc.remote_move(&Pose::default(), &RemoteCommand { yaw: 2.0, ..Default::default() });
        let t = mc.thrusts_pc();
        assert_close(t[1], 20.0);
        assert_close(t[5], -20.0);
    }

    #[test]
    fn test_simple_thrust() {
        let mut mc = ctrl();
        mc.simple_thrust(&[10.0, 20.0, 30.0, 40.0, -10.0, -20.0, -30.0, -40.0]);

        // Reversed thrusters (1, 2, 5, 6, 8) are negated on the way to the actuator
        assert_eq!(
            mc.actuator().demands(),
            [-10.0, -20.0, 30.0, 40.0, 10.0, 20.0, -30.0, 40.0]
        );
        assert_eq!(mc.thrusts_pc(), [10.0, 20.0, 30.0, 40.0, -10.0, -20.0, -30.0, -40.0]);
    }

    #[test]
    fn test_reconfigure() {
        let mut mc = ctrl();

        let mut bad = test_params();
        bad.dt_s = 0.0;
        assert!(mc.reconfigure(bad).is_err());
        assert_eq!(mc.params().dt_s, 0.1);

        let mut good = test_params();
        good.thrusters.max_thrust_pc = 50.0;
        assert!(mc.reconfigure(good).is_ok());

        mc.simple_thrust(&[100.0; NUM_THRUSTERS]);
        assert_eq!(mc.thrusts_pc(), [50.0; NUM_THRUSTERS]);
    }
}
