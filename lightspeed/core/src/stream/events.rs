//! Stream Event Types
//!
//! One [`StreamEvent`] is carried by each `data: ` line of a streaming
//! response, encoded as `{"event": <tag>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::api::types::ToolCallPayload;

/// Token role that marks a tool-execution annotation instead of prose
pub const TOOL_EXECUTION_ROLE: &str = "tool_execution";

/// A typed event from the streaming endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// First event of a response; carries the conversation ID
    Start(StartData),
    /// A piece of assistant text or a tool-execution annotation
    Token(TokenData),
    /// A structured tool call
    ToolCall(ToolCallData),
    /// Last event of a response
    End(EndData),
}

impl StreamEvent {
    /// Event tag as it appears on the wire
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Token(_) => "token",
            Self::ToolCall(_) => "tool_call",
            Self::End(_) => "end",
        }
    }
}

/// Payload of `start`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartData {
    /// Conversation the response belongs to
    pub conversation_id: String,
}

/// Payload of `token`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    /// Sequence number assigned by the service
    pub id: u64,
    /// Role of the token (`tool_execution` marks an annotation)
    pub role: String,
    /// Token text
    pub token: String,
}

impl TokenData {
    /// Whether this token annotates a tool execution
    #[must_use]
    pub fn is_tool_execution(&self) -> bool {
        self.role == TOOL_EXECUTION_ROLE
    }
}

/// Payload of `tool_call`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallData {
    /// Sequence number assigned by the service
    pub id: u64,
    /// Role reported by the service
    pub role: String,
    /// The call itself
    pub token: ToolCallPayload,
}

/// A document the answer referenced
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedDocument {
    /// Document URL
    pub doc_url: String,
    /// Document title
    pub doc_title: String,
}

/// Payload of `end`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EndData {
    /// Documents the answer drew on
    #[serde(default)]
    pub referenced_documents: Vec<ReferencedDocument>,
    /// Truncation marker, passed through untouched
    #[serde(default)]
    pub truncated: Option<serde_json::Value>,
    /// Prompt tokens consumed
    #[serde(default)]
    pub input_tokens: u64,
    /// Completion tokens produced
    #[serde(default)]
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_start() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"event":"start","data":{"conversation_id":"c1"}}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Start(StartData {
                conversation_id: "c1".to_string()
            })
        );
        assert_eq!(event.kind(), "start");
    }

    #[test]
    fn test_parse_tool_execution_token() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"event":"token","data":{"id":3,"role":"tool_execution","token":"knowledge_search"}}"#,
        )
        .unwrap();
        match event {
            StreamEvent::Token(data) => {
                assert!(data.is_tool_execution());
                assert_eq!(data.token, "knowledge_search");
            }
            other => panic!("Expected token, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_end_with_defaults() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"event":"end","data":{"truncated":null}}"#).unwrap();
        assert_eq!(event, StreamEvent::End(EndData::default()));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result = serde_json::from_str::<StreamEvent>(r#"{"event":"ping","data":{}}"#);
        assert!(result.is_err());
    }
}
