//! Wire Types
//!
//! Request and response bodies of the assistant service's REST API.
//! Optional request fields are omitted from the JSON when unset.

use serde::{Deserialize, Serialize};

/// A model advertised by `GET /v1/models`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier (what goes into `QueryRequest::model`)
    pub identifier: String,
    /// Provider-specific metadata
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// API model type (`llm`, `embedding`, ...)
    pub api_model_type: String,
    /// Provider that serves the model
    pub provider_id: String,
    /// Resource name at the provider
    #[serde(default)]
    pub provider_resource_id: String,
    /// Resource type (usually `model`)
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Model type
    #[serde(default)]
    pub model_type: String,
}

impl Model {
    /// Whether this model can answer chat queries
    #[must_use]
    pub fn is_llm(&self) -> bool {
        self.api_model_type == "llm"
    }

    /// Model used when the service cannot list its models
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            identifier: "test-model".to_string(),
            metadata: serde_json::Map::new(),
            api_model_type: "llm".to_string(),
            provider_id: "test".to_string(),
            provider_resource_id: "test-model".to_string(),
            kind: "model".to_string(),
            model_type: "llm".to_string(),
        }
    }
}

/// Body of `GET /v1/models`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ModelsResponse {
    /// Advertised models
    #[serde(default)]
    pub models: Vec<Model>,
}

/// One attachment inside a query
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAttachment {
    /// Service-side classification of the attachment
    pub attachment_type: String,
    /// MIME type of the content
    pub content_type: String,
    /// Content encoded as a data URL
    pub content: String,
}

/// Body of `POST /v1/query` and `POST /v1/streaming_query`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The user's question
    pub query: String,
    /// Conversation to continue (absent = new conversation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Provider to route to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Model to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Disable tool use for this query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_tools: Option<bool>,
    /// System prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Attached files (absent when there are none)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<QueryAttachment>>,
}

impl QueryRequest {
    /// Create a request with just the query text
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Continue an existing conversation
    #[must_use]
    pub fn with_conversation_id(mut self, id: Option<String>) -> Self {
        self.conversation_id = id.filter(|id| !id.is_empty());
        self
    }

    /// Select model and provider
    #[must_use]
    pub fn with_model(mut self, model: Option<String>, provider: Option<String>) -> Self {
        self.model = model.filter(|m| !m.is_empty());
        self.provider = provider.filter(|p| !p.is_empty());
        self
    }

    /// Set the system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    /// Set the no-tools flag
    #[must_use]
    pub fn with_no_tools(mut self, no_tools: Option<bool>) -> Self {
        self.no_tools = no_tools;
        self
    }

    /// Attach files; an empty list leaves the field absent
    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<QueryAttachment>) -> Self {
        self.attachments = if attachments.is_empty() {
            None
        } else {
            Some(attachments)
        };
        self
    }
}

/// Body of a successful `POST /v1/query`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Conversation the answer belongs to
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// The answer
    pub response: String,
}

/// Author of a stored history message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    /// Written by the user
    User,
    /// Written by the assistant
    Assistant,
}

/// One stored message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Message text
    pub content: String,
    /// Author
    #[serde(rename = "type")]
    pub role: HistoryRole,
}

/// One question/answer turn of a stored conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Messages of this turn, in order
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
    /// When the turn started (as sent by the service)
    pub started_at: String,
    /// When the turn completed
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// Body of `GET /v1/conversations/{id}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationResponse {
    /// Conversation ID
    pub conversation_id: String,
    /// Turns in chronological order
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

/// Payload of a `tool_call` stream event: either plain text or a JSON object
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolCallPayload {
    /// Plain text description
    Text(String),
    /// Structured call
    Structured(serde_json::Map<String, serde_json::Value>),
}

impl std::fmt::Display for ToolCallPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Structured(map) => {
                let value = serde_json::Value::Object(map.clone());
                write!(f, "{value}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_query_request_omits_absent_fields() {
        let request = QueryRequest::new("hello")
            .with_conversation_id(Some(String::new()))
            .with_attachments(Vec::new());

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({ "query": "hello" }));
    }

    #[test]
    fn test_query_request_full() {
        let request = QueryRequest::new("hello")
            .with_conversation_id(Some("c1".to_string()))
            .with_model(Some("granite".to_string()), Some("ollama".to_string()))
            .with_system_prompt(Some("Be brief".to_string()))
            .with_attachments(vec![QueryAttachment {
                attachment_type: "log".to_string(),
                content_type: "text/plain".to_string(),
                content: "data:text/plain;base64,aGk=".to_string(),
            }]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["conversation_id"], "c1");
        assert_eq!(json["model"], "granite");
        assert_eq!(json["provider"], "ollama");
        assert_eq!(json["system_prompt"], "Be brief");
        assert_eq!(json["attachments"][0]["content_type"], "text/plain");
        assert!(json.get("no_tools").is_none());
    }

    #[test]
    fn test_models_response_parsing() {
        let body = r#"{
            "models": [
                {
                    "identifier": "granite",
                    "metadata": {},
                    "api_model_type": "llm",
                    "provider_id": "ollama",
                    "provider_resource_id": "granite:8b",
                    "type": "model",
                    "model_type": "llm"
                },
                {
                    "identifier": "minilm",
                    "metadata": {"embedding_dimension": 384},
                    "api_model_type": "embedding",
                    "provider_id": "sentence-transformers",
                    "provider_resource_id": "all-MiniLM-L6-v2",
                    "type": "model",
                    "model_type": "embedding"
                }
            ]
        }"#;

        let parsed: ModelsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.models.len(), 2);
        assert!(parsed.models[0].is_llm());
        assert!(!parsed.models[1].is_llm());
        assert_eq!(parsed.models[0].kind, "model");
    }

    #[test]
    fn test_conversation_response_parsing() {
        let body = r#"{
            "conversation_id": "c1",
            "chat_history": [
                {
                    "messages": [
                        {"content": "What is a pod?", "type": "user"},
                        {"content": "A pod is...", "type": "assistant"}
                    ],
                    "started_at": "2024-01-01T00:00:00Z",
                    "completed_at": "2024-01-01T00:00:05Z"
                }
            ]
        }"#;

        let parsed: ConversationResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.chat_history.len(), 1);
        assert_eq!(parsed.chat_history[0].messages[1].role, HistoryRole::Assistant);
    }

    #[test]
    fn test_tool_call_payload_variants() {
        let text: ToolCallPayload = serde_json::from_str(r#""search_docs""#).unwrap();
        assert_eq!(text, ToolCallPayload::Text("search_docs".to_string()));

        let structured: ToolCallPayload =
            serde_json::from_str(r#"{"tool_name": "search", "arguments": {"q": "pods"}}"#)
                .unwrap();
        assert!(matches!(structured, ToolCallPayload::Structured(_)));
        assert!(structured.to_string().contains("tool_name"));
    }
}
