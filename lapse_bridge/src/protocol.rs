//! Wire format of the capture helper: one JSON object per line each way.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lapse_traits::ActuatorStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    CheckConnection,
    Status,
    TakePhoto,
    Connect,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    pub command: Command,
    #[serde(rename = "commandId")]
    pub command_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Response {
    pub success: bool,
    #[serde(rename = "commandId")]
    pub command_id: Option<u64>,
    pub error: Option<String>,
    pub message: Option<String>,
    pub connected: Option<bool>,
    pub status: Option<StatusBody>,
}

/// Status flags as the helper reports them. Values may be JSON booleans or
/// stringified Python booleans (`"True"`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatusBody {
    pub busy: Value,
    pub encoding: Value,
    pub ready: Value,
}

impl StatusBody {
    pub fn to_status(&self) -> ActuatorStatus {
        ActuatorStatus {
            busy: flag(&self.busy),
            encoding: flag(&self.encoding),
            ready: flag(&self.ready),
        }
    }
}

/// Anything that is not a recognizable boolean is unknown.
pub fn flag(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn request_uses_helper_field_names() {
        let r = Request {
            command: Command::TakePhoto,
            command_id: 7,
        };
        assert_eq!(
            serde_json::to_value(&r).expect("serialize"),
            json!({"command": "take_photo", "commandId": 7})
        );
    }

    #[rstest]
    #[case(json!(true), Some(true))]
    #[case(json!("True"), Some(true))]
    #[case(json!("False"), Some(false))]
    #[case(json!(0), Some(false))]
    #[case(json!("None"), None)]
    #[case(json!(null), None)]
    fn flags(#[case] v: Value, #[case] expected: Option<bool>) {
        assert_eq!(flag(&v), expected);
    }

    #[test]
    fn status_response_parses() {
        let r: Response = serde_json::from_value(json!({
            "success": true,
            "commandId": 3,
            "status": {"busy": "False", "encoding": "True", "ready": "True", "group": 1}
        }))
        .expect("parse");
        let st = r.status.expect("status").to_status();
        assert_eq!(st.encoding, Some(true));
        assert!(st.is_busy());
    }
}
