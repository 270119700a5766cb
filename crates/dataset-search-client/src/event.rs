use std::fmt;

use serde::{Deserialize, Serialize};

use crate::results::ResultSet;

const TOOL_CALL_RESULT: &str = "TOOL_CALL_RESULT";
const RUN_ERROR: &str = "RUN_ERROR";
const LEGACY_ERROR: &str = "error";

/// Discriminant of a decoded stream event (`type` on the wire).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// Result of a backend tool call (search or rerank).
    ToolCallResult,
    /// Terminal failure of the backend's agent run.
    RunError,
    /// Legacy `error` event, reported but not terminal.
    LegacyError,
    /// Any other event type. Forwarded to observers only.
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ToolCallResult => TOOL_CALL_RESULT,
            Self::RunError => RUN_ERROR,
            Self::LegacyError => LEGACY_ERROR,
            Self::Other(other) => other,
        }
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            TOOL_CALL_RESULT => Self::ToolCallResult,
            RUN_ERROR => Self::RunError,
            LEGACY_ERROR => Self::LegacyError,
            _ => Self::Other(value),
        }
    }
}

impl From<EventKind> for String {
    fn from(value: EventKind) -> Self {
        match value {
            EventKind::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event decoded from a `data:` line of the search stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Tool invocation that produced this event.
    #[serde(
        default,
        rename = "tool_call_id",
        alias = "toolCallId",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_call_id: Option<String>,
    /// Error message or serialized result set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        rename = "message_id",
        alias = "messageId",
        skip_serializing_if = "Option::is_none"
    )]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<serde_json::Value>,
    /// Fields this client does not interpret, kept for observers.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StreamEvent {
    /// Creates an event with only a discriminant set.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            tool_call_id: None,
            content: None,
            message_id: None,
            role: None,
            timestamp: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Creates a `TOOL_CALL_RESULT` event carrying a serialized result set.
    pub fn tool_call_result(
        tool_call_id: impl Into<String>,
        results: &ResultSet,
    ) -> Result<Self, serde_json::Error> {
        let mut event = Self::new(EventKind::ToolCallResult);
        event.tool_call_id = Some(tool_call_id.into());
        event.content = Some(results.to_content()?);
        Ok(event)
    }

    /// Creates a `RUN_ERROR` event.
    pub fn run_error(message: Option<&str>) -> Self {
        let mut event = Self::new(EventKind::RunError);
        event.content = message.map(ToOwned::to_owned);
        event
    }

    /// Renders the event as one wire frame (`data: {...}` plus blank line).
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_custom_kinds_round_trip() {
        let kinds = ["TOOL_CALL_RESULT", "RUN_ERROR", "error", "TEXT_MESSAGE_CONTENT"];
        for raw in kinds {
            let kind = EventKind::from(raw.to_string());
            assert_eq!(String::from(kind.clone()), raw);
        }
        assert_eq!(
            EventKind::from("RUN_STARTED".to_string()),
            EventKind::Other("RUN_STARTED".into())
        );
    }

    #[test]
    fn accepts_snake_and_camel_case_ids() {
        let snake: StreamEvent = serde_json::from_str(
            r#"{"type":"TOOL_CALL_RESULT","tool_call_id":"search","content":"{}"}"#,
        )
        .expect("snake");
        let camel: StreamEvent = serde_json::from_str(
            r#"{"type":"TOOL_CALL_RESULT","toolCallId":"search","messageId":"m1","content":"{}"}"#,
        )
        .expect("camel");
        assert_eq!(snake.tool_call_id.as_deref(), Some("search"));
        assert_eq!(camel.tool_call_id.as_deref(), Some("search"));
        assert_eq!(camel.message_id.as_deref(), Some("m1"));
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"STEP_STARTED","stepName":"plan","timestamp":17}"#)
                .expect("event");
        assert_eq!(event.kind, EventKind::Other("STEP_STARTED".into()));
        assert_eq!(event.extra.get("stepName"), Some(&serde_json::json!("plan")));
        assert_eq!(event.timestamp, Some(serde_json::json!(17)));
    }
}
