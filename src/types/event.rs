use crate::error::LineError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status carried by one NDJSON progress line.
///
/// Unknown values are kept verbatim so newer backends can introduce
/// statuses without the client rejecting their lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventStatus {
    Step,
    Complete,
    Error,
    Other(String),
}

impl EventStatus {
    pub fn as_str(&self) -> &str {
        match self {
            EventStatus::Step => "step",
            EventStatus::Complete => "complete",
            EventStatus::Error => "error",
            EventStatus::Other(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Complete | EventStatus::Error)
    }
}

impl From<String> for EventStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "step" => EventStatus::Step,
            "complete" => EventStatus::Complete,
            "error" => EventStatus::Error,
            _ => EventStatus::Other(value),
        }
    }
}

impl From<EventStatus> for String {
    fn from(status: EventStatus) -> Self {
        match status {
            EventStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<String>,
}

impl ProgressEvent {
    pub fn step(description: impl Into<String>) -> Self {
        Self {
            status: Some(EventStatus::Step),
            step: Some(description.into()),
            final_result: None,
        }
    }

    pub fn complete(final_result: impl Into<String>) -> Self {
        Self {
            status: Some(EventStatus::Complete),
            step: None,
            final_result: Some(final_result.into()),
        }
    }

    /// Parse one complete NDJSON line.
    ///
    /// Only JSON objects are events. Fields with a missing or non-string
    /// value read as `None` instead of failing the whole line.
    pub fn from_json_line(line: &str) -> Result<Self, LineError> {
        match serde_json::from_str::<Value>(line)? {
            Value::Object(object) => Ok(Self::from_object(&object)),
            other => Err(LineError::NotAnObject {
                kind: json_kind(&other),
            }),
        }
    }

    pub fn from_object(object: &Map<String, Value>) -> Self {
        let string_field = |name: &str| {
            object
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            status: string_field("status").map(EventStatus::from),
            step: string_field("step"),
            final_result: string_field("final_result"),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.as_ref().is_some_and(EventStatus::is_terminal)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
