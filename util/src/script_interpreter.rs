//! # Bus script interpreter module
//!
//! This module provides an interpreter for bus scripts, allowing navigation messages to be
//! replayed from a file instead of the network. Each line of a script has the form
//!
//! ```text
//! <seconds>: <TOPIC> <json payload>;
//! ```
//!
//! for example `1.5: MOVEMENT_MODE 2;`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::msg::{NavMsg, MsgParseError};
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A message which is scripted to be released at a specific time.
struct ScriptedMsg {
    /// The time the message is supposed to be released at
    exec_time_s: f64,

    msg: NavMsg
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending_msgs` to
/// acquire a list of messages that are now due.
pub struct ScriptInterpreter {
    _script_path: PathBuf,
    msgs: VecDeque<ScriptedMsg>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid message at {0} s: {1}")]
    InvalidMsg(f64, MsgParseError)
}

#[derive(Debug, PartialEq)]
pub enum PendingMsgs {
    None,
    Some(Vec<NavMsg>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let msgs = Self::parse(&script)?;

        Ok(ScriptInterpreter {
            _script_path: path,
            msgs
        })
    }

    /// Parse the contents of a script.
    fn parse(script: &str) -> Result<VecDeque<ScriptedMsg>, ScriptError> {
        let mut queue: VecDeque<ScriptedMsg> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = match RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([A-Z_]+)\s*([^;]*);")
            .multi_line(true)
            .build()
        {
            Ok(r) => r,
            Err(_) => return Err(ScriptError::ScriptEmpty)
        };

        for cap in re.captures_iter(script) {
            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let topic = cap.get(3).map(|m| m.as_str()).unwrap_or("");
            let payload = cap.get(4).map(|m| m.as_str()).unwrap_or("");

            let exec_time_s: f64 = time_str.parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            let msg = NavMsg::parse(topic, payload.trim())
                .map_err(|e| ScriptError::InvalidMsg(exec_time_s, e))?;

            queue.push_back(ScriptedMsg {
                exec_time_s,
                msg
            });
        }

        if queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(queue)
    }

    /// Return the messages which are due at the current session time.
    pub fn get_pending_msgs(&mut self) -> PendingMsgs {
        self.get_pending_at(get_elapsed_seconds())
    }

    /// Return the messages which are due at the given time.
    ///
    /// Messages are released in script order, a message is due once the time has passed its
    /// timestamp.
    pub fn get_pending_at(&mut self, current_time_s: f64) -> PendingMsgs {

        // If the queue is empty the script is over
        if self.msgs.is_empty() {
            return PendingMsgs::EndOfScript
        }

        let mut msg_vec: Vec<NavMsg> = vec![];

        while let Some(front) = self.msgs.front() {
            if front.exec_time_s >= current_time_s {
                break;
            }

            if let Some(m) = self.msgs.pop_front() {
                msg_vec.push(m.msg);
            }
        }

        if msg_vec.len() > 0 {
            PendingMsgs::Some(msg_vec)
        }
        else {
            PendingMsgs::None
        }
    }

    /// Get the number of messages left in the script
    pub fn get_num_msgs(&self) -> usize {
        self.msgs.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.msgs.back() {
            Some(m) => m.exec_time_s,
            None => 0f64
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::nav::MovementMode;

    const SCRIPT: &str = "\
        0.5: KILL_SUB false;\n\
        1.0: MOVEMENT_MODE 2;\n\
        \n\
        1.0: REMOTE_CONTROL_COMMAND [0.0, 0.5, 0.0, 0.0, 1, 0, 0];\n\
        2.5: UPDATE_PID_CONFIGS;\n\
        3: ENABLE_WAYPOINT_COLLECTION true;\n";

    fn interp() -> ScriptInterpreter {
        ScriptInterpreter {
            _script_path: PathBuf::new(),
            msgs: ScriptInterpreter::parse(SCRIPT).unwrap()
        }
    }

    #[test]
    fn test_parse() {
        let si = interp();

        assert_eq!(si.get_num_msgs(), 5);
        assert_eq!(si.get_duration(), 3.0);
    }

    #[test]
    fn test_release_order() {
        let mut si = interp();

        assert_eq!(si.get_pending_at(0.1), PendingMsgs::None);
        assert_eq!(
            si.get_pending_at(0.6),
            PendingMsgs::Some(vec![NavMsg::KillSub(false)])
        );

        match si.get_pending_at(2.0) {
            PendingMsgs::Some(v) => {
                assert_eq!(v.len(), 2);
                assert_eq!(v[0], NavMsg::MovementMode(MovementMode::RemoteControl));
                match &v[1] {
                    NavMsg::RemoteControl(r) => {
                        assert_eq!(r.x, 0.5);
                        assert!(r.hold_depth);
                        assert!(!r.record_waypoint);
                    },
                    _ => panic!("Expected a remote control command")
                }
            },
            _ => panic!("Expected two messages")
        }

        assert_eq!(
            si.get_pending_at(3.5),
            PendingMsgs::Some(vec![
                NavMsg::UpdatePidConfigs,
                NavMsg::EnableWaypointCollection(true)
            ])
        );
        assert_eq!(si.get_pending_at(4.0), PendingMsgs::EndOfScript);
    }

    #[test]
    fn test_invalid_scripts() {
        assert!(matches!(
            ScriptInterpreter::parse("nothing to see here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::parse("1.0: NOT_A_TOPIC 1;"),
            Err(ScriptError::InvalidMsg(_, MsgParseError::UnknownTopic(_)))
        ));
        assert!(matches!(
            ScriptInterpreter::parse("2.0: THRUSTS [1, 2, 3];"),
            Err(ScriptError::InvalidMsg(_, _))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ScriptInterpreter::new("/this/script/does/not/exist.bus"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
