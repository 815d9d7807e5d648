//! # Wire Protocol
//!
//! Line-delimited JSON spoken between [`crate::RemoteSim`] and a simulator
//! server. Each request is one JSON object tagged by `"cmd"`; the server
//! answers every request with exactly one reply tagged by `"status"` before
//! the next request is sent.
//!
//! ```text
//! -> {"cmd":"joint_handle","name":"r1m1"}
//! <- {"status":"ok","result":42}
//! -> {"cmd":"step"}
//! <- {"status":"ok","result":null}
//! -> {"cmd":"object_handle","name":"nope"}
//! <- {"status":"error","message":"object does not exist"}
//! ```

use crate::{CollisionHandle, JointHandle, ObjectHandle, SimError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    Hello { headless: bool },
    LoadScene { path: String },
    JointHandle { name: String },
    CollisionHandle { name: String },
    ObjectHandle { name: String },
    SetPositionTarget { handle: JointHandle, degrees: f32 },
    JointAngle { handle: JointHandle },
    JointVelocity { handle: JointHandle },
    Image { handle: ObjectHandle },
    IsColliding { handle: CollisionHandle },
    StartSimulation { synchronous: bool },
    StopSimulation,
    Step,
    End,
}

impl Request {
    /// Command name as it appears on the wire.
    #[must_use]
    pub fn command(&self) -> &'static str {
        match self {
            Request::Hello { .. } => "hello",
            Request::LoadScene { .. } => "load_scene",
            Request::JointHandle { .. } => "joint_handle",
            Request::CollisionHandle { .. } => "collision_handle",
            Request::ObjectHandle { .. } => "object_handle",
            Request::SetPositionTarget { .. } => "set_position_target",
            Request::JointAngle { .. } => "joint_angle",
            Request::JointVelocity { .. } => "joint_velocity",
            Request::Image { .. } => "image",
            Request::IsColliding { .. } => "is_colliding",
            Request::StartSimulation { .. } => "start_simulation",
            Request::StopSimulation => "stop_simulation",
            Request::Step => "step",
            Request::End => "end",
        }
    }

    /// Name being resolved, for handle lookups.
    #[must_use]
    pub fn lookup_name(&self) -> Option<&str> {
        match self {
            Request::JointHandle { name }
            | Request::CollisionHandle { name }
            | Request::ObjectHandle { name } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Ok {
        #[serde(default)]
        result: Value,
    },
    Error { message: String },
}

impl Reply {
    pub fn ok(result: impl Serialize) -> Result<Self, SimError> {
        Ok(Reply::Ok { result: serde_json::to_value(result)? })
    }

    /// Turns the reply to `request` into its result value.
    ///
    /// A failed lookup becomes [`SimError::UnknownObject`], any other error
    /// reply becomes [`SimError::Remote`].
    pub fn into_result(self, request: &Request) -> Result<Value, SimError> {
        match self {
            Reply::Ok { result } => Ok(result),
            Reply::Error { message } => match request.lookup_name() {
                Some(name) => Err(SimError::UnknownObject(name.to_string())),
                None => Err(SimError::Remote { command: request.command(), message }),
            },
        }
    }
}

/// Serializes a message as a single line, newline included.
pub fn encode_line<T: Serialize>(msg: &T) -> Result<String, SimError> {
    let mut line = serde_json::to_string(msg)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_tagged_by_cmd() {
        let line = encode_line(&Request::SetPositionTarget { handle: JointHandle(3), degrees: -12.5 }).unwrap();
        assert_eq!(line, "{\"cmd\":\"set_position_target\",\"handle\":3,\"degrees\":-12.5}\n");
        let unit = serde_json::to_string(&Request::Step).unwrap();
        assert_eq!(unit, "{\"cmd\":\"step\"}");
    }

    #[test]
    fn command_names_match_serialized_tags() {
        let reqs = [
            Request::Hello { headless: true },
            Request::LoadScene { path: "a.ttt".into() },
            Request::Image { handle: ObjectHandle(1) },
            Request::StartSimulation { synchronous: true },
            Request::StopSimulation,
            Request::End,
        ];
        for req in reqs {
            let value = serde_json::to_value(&req).unwrap();
            assert_eq!(value["cmd"], req.command());
        }
    }

    #[test]
    fn ok_reply_reports_unserializable_results() {
        let mut bad = std::collections::BTreeMap::new();
        bad.insert((1u8, 2u8), 3u8);
        assert!(matches!(Reply::ok(bad), Err(SimError::Json(_))));
        assert_eq!(Reply::ok(2.5).unwrap(), Reply::Ok { result: Value::from(2.5) });
    }

    #[test]
    fn ok_reply_without_result_is_null() {
        let reply: Reply = serde_json::from_str("{\"status\":\"ok\"}").unwrap();
        assert_eq!(reply, Reply::Ok { result: Value::Null });
    }

    #[test]
    fn failed_lookup_names_the_object() {
        let req = Request::CollisionHandle { name: "sword_hit".into() };
        let reply = Reply::Error { message: "not found".into() };
        match reply.into_result(&req) {
            Err(SimError::UnknownObject(name)) => assert_eq!(name, "sword_hit"),
            other => panic!("expected UnknownObject, got {other:?}"),
        }
    }

    #[test]
    fn other_errors_keep_the_command() {
        let reply = Reply::Error { message: "not running".into() };
        match reply.into_result(&Request::Step) {
            Err(SimError::Remote { command, message }) => {
                assert_eq!(command, "step");
                assert_eq!(message, "not running");
            }
            other => panic!("expected Remote, got {other:?}"),
        }
    }
}
