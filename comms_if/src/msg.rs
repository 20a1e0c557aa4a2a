//! # Bus messages
//!
//! Every message on the bus is a topic name and a JSON payload. This module
//! turns inbound (topic, payload) pairs into typed [`NavMsg`]s, and encodes
//! them back for publishers and scripts.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde_json::{json, Value};
use thiserror::Error;

use crate::nav::{MovementMode, Pose, RemoteCommand, NUM_AXES, NUM_THRUSTERS};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

pub const REMOTE_CONTROL_COMMAND: &str = "REMOTE_CONTROL_COMMAND";
pub const MOVEMENT_MODE: &str = "MOVEMENT_MODE";
pub const UPDATE_PID_CONFIGS: &str = "UPDATE_PID_CONFIGS";
pub const DESIRED_POSITION: &str = "DESIRED_POSITION";
pub const ENABLE_WAYPOINT_COLLECTION: &str = "ENABLE_WAYPOINT_COLLECTION";
pub const THRUSTS: &str = "THRUSTS";
pub const SENSOR_DATA: &str = "SENSOR_DATA";
pub const KILL_SUB: &str = "KILL_SUB";

/// Outbound request to zero the north/east reference frame.
pub const ZERO_POSITION: &str = "ZERO_POSITION";

/// Outbound navigation telemetry.
pub const NAV_STATUS: &str = "NAV_STATUS";

/// Largest magnitude of a thruster test value.
pub const MAX_TEST_THRUST_PC: i64 = 100;

/// Number of elements in a remote control command payload.
const REMOTE_CMD_LEN: usize = 7;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An inbound message for the navigation controller.
#[derive(Debug, Clone, PartialEq)]
pub enum NavMsg {
    RemoteControl(RemoteCommand),
    MovementMode(MovementMode),
    UpdatePidConfigs,
    DesiredPosition(Pose),
    EnableWaypointCollection(bool),
    Thrusts([i32; NUM_THRUSTERS]),
    SensorData(Pose),
    KillSub(bool),
}

/// Errors which can occur when parsing a message.
#[derive(Debug, Error)]
pub enum MsgParseError {
    #[error("Unknown topic \"{0}\"")]
    UnknownTopic(String),

    #[error("{0} payload is not valid JSON: {1}")]
    InvalidJson(&'static str, serde_json::Error),

    #[error("{topic} payload should contain {expected} values, found {found}")]
    WrongLength {
        topic: &'static str,
        expected: usize,
        found: usize
    },

    #[error("{0} payload is invalid: {1}")]
    InvalidValue(&'static str, String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NavMsg {

    /// Parse a message from its topic and JSON payload.
    pub fn parse(topic: &str, payload: &str) -> Result<Self, MsgParseError> {
        // The PID update is a trigger, the payload is not inspected at all
        if topic == UPDATE_PID_CONFIGS {
            return Ok(NavMsg::UpdatePidConfigs)
        }

        let topic = known_topic(topic)?;

        let val: Value = serde_json::from_str(payload)
            .map_err(|e| MsgParseError::InvalidJson(topic, e))?;

        match topic {
            REMOTE_CONTROL_COMMAND => {
                let vals = as_array(topic, &val, REMOTE_CMD_LEN)?;
                Ok(NavMsg::RemoteControl(RemoteCommand {
                    yaw: as_float(topic, &vals[0])?,
                    x: as_float(topic, &vals[1])?,
                    y: as_float(topic, &vals[2])?,
                    depth: as_float(topic, &vals[3])?,
                    hold_depth: as_flag(topic, &vals[4])?,
                    record_waypoint: as_flag(topic, &vals[5])?,
                    zero_position: as_flag(topic, &vals[6])?,
                }))
            },
            MOVEMENT_MODE => {
                let index = val.as_i64().ok_or_else(|| MsgParseError::InvalidValue(
                    topic, format!("expected an integer, found {}", val)
                ))?;
                MovementMode::from_index(index)
                    .map(NavMsg::MovementMode)
                    .ok_or_else(|| MsgParseError::InvalidValue(
                        topic, format!("{} is not a valid movement mode", index)
                    ))
            },
            DESIRED_POSITION => Ok(NavMsg::DesiredPosition(as_pose(topic, &val)?)),
            SENSOR_DATA => Ok(NavMsg::SensorData(as_pose(topic, &val)?)),
            ENABLE_WAYPOINT_COLLECTION => Ok(NavMsg::EnableWaypointCollection(
                as_flag(topic, &val)?
            )),
            KILL_SUB => Ok(NavMsg::KillSub(as_flag(topic, &val)?)),
            THRUSTS => {
                let vals = as_array(topic, &val, NUM_THRUSTERS)?;
                let mut thrusts = [0i32; NUM_THRUSTERS];

                for (t, v) in thrusts.iter_mut().zip(vals.iter()) {
                    let pc = v.as_i64().ok_or_else(|| MsgParseError::InvalidValue(
                        topic, format!("expected integer thrusts, found {}", v)
                    ))?;

                    if pc.abs() > MAX_TEST_THRUST_PC {
                        return Err(MsgParseError::InvalidValue(
                            topic, format!("thrust {} is outside [-100, 100]", pc)
                        ))
                    }

                    *t = pc as i32;
                }

                Ok(NavMsg::Thrusts(thrusts))
            },
            _ => Err(MsgParseError::UnknownTopic(topic.into()))
        }
    }

    /// Get the topic this message is published on.
    pub fn topic(&self) -> &'static str {
        match self {
            NavMsg::RemoteControl(_) => REMOTE_CONTROL_COMMAND,
            NavMsg::MovementMode(_) => MOVEMENT_MODE,
            NavMsg::UpdatePidConfigs => UPDATE_PID_CONFIGS,
            NavMsg::DesiredPosition(_) => DESIRED_POSITION,
            NavMsg::EnableWaypointCollection(_) => ENABLE_WAYPOINT_COLLECTION,
            NavMsg::Thrusts(_) => THRUSTS,
            NavMsg::SensorData(_) => SENSOR_DATA,
            NavMsg::KillSub(_) => KILL_SUB,
        }
    }

    /// Encode the payload of this message as a JSON string.
    pub fn payload(&self) -> String {
        let val = match self {
            NavMsg::RemoteControl(c) => json!([
                c.yaw, c.x, c.y, c.depth,
                c.hold_depth, c.record_waypoint, c.zero_position
            ]),
            NavMsg::MovementMode(m) => json!(m.index()),
            NavMsg::UpdatePidConfigs => json!(true),
            NavMsg::DesiredPosition(p) | NavMsg::SensorData(p) => json!(p.to_array()),
            NavMsg::EnableWaypointCollection(b) | NavMsg::KillSub(b) => json!(b),
            NavMsg::Thrusts(t) => json!(t),
        };

        val.to_string()
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Map a topic onto its static name, rejecting unknown topics.
fn known_topic(topic: &str) -> Result<&'static str, MsgParseError> {
    [
        REMOTE_CONTROL_COMMAND,
        MOVEMENT_MODE,
        DESIRED_POSITION,
        ENABLE_WAYPOINT_COLLECTION,
        THRUSTS,
        SENSOR_DATA,
        KILL_SUB,
    ]
        .iter()
        .find(|t| **t == topic)
        .copied()
        .ok_or_else(|| MsgParseError::UnknownTopic(topic.into()))
}

fn as_array<'a>(
    topic: &'static str,
    val: &'a Value,
    expected: usize
) -> Result<&'a Vec<Value>, MsgParseError> {
    let vals = val.as_array().ok_or_else(|| MsgParseError::InvalidValue(
        topic, format!("expected an array, found {}", val)
    ))?;

    if vals.len() != expected {
        return Err(MsgParseError::WrongLength {
            topic,
            expected,
            found: vals.len()
        })
    }

    Ok(vals)
}

fn as_float(topic: &'static str, val: &Value) -> Result<f64, MsgParseError> {
    match val.as_f64() {
        Some(f) if f.is_finite() => Ok(f),
        _ => Err(MsgParseError::InvalidValue(
            topic, format!("expected a finite number, found {}", val)
        ))
    }
}

/// Flags may be sent as booleans or numbers, where any non-zero number is set.
fn as_flag(topic: &'static str, val: &Value) -> Result<bool, MsgParseError> {
    match val {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        _ => Err(MsgParseError::InvalidValue(
            topic, format!("expected a flag, found {}", val)
        ))
    }
}

fn as_pose(topic: &'static str, val: &Value) -> Result<Pose, MsgParseError> {
    let vals = as_array(topic, val, NUM_AXES)?;
    let mut a = [0f64; NUM_AXES];

    for (dst, v) in a.iter_mut().zip(vals.iter()) {
        *dst = as_float(topic, v)?;
    }

    Ok(Pose::from_array(a))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
