//! Stream Reducer
//!
//! Folds the events of one streaming response into the running answer and
//! hands every step to a [`StreamSink`].
//!
//! Ordinary tokens are concatenated into the answer; tokens whose role is
//! `tool_execution` are collected separately and never reach the answer
//! text. The sink always receives the *full* answer so far, so applying the
//! same callback twice leaves the same state.

use futures::{Stream, StreamExt};

use super::events::{EndData, StreamEvent, TokenData, ToolCallData};
use crate::api::ApiError;

/// Receiver of reduced stream events
pub trait StreamSink {
    /// The service assigned (or confirmed) the conversation ID
    fn on_start(&mut self, conversation_id: &str);

    /// New answer text arrived; `content` is everything received so far
    fn on_token(&mut self, content: &str, token: &TokenData);

    /// A tool-execution annotation arrived; `tools` holds all of them so far
    fn on_tool_execution(&mut self, tools: &[String], token: &TokenData);

    /// A structured tool call arrived
    fn on_tool_call(&mut self, call: &ToolCallData) {
        tracing::debug!(id = call.id, "Ignoring tool call");
    }

    /// The response finished
    fn on_end(&mut self, content: &str, end: &EndData);
}

/// What a fully consumed stream produced
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamSummary {
    /// Conversation ID from the `start` event
    pub conversation_id: Option<String>,
    /// Concatenated answer text
    pub content: String,
    /// Tool-execution annotations, in arrival order
    pub tool_executions: Vec<String>,
    /// Number of tool calls received
    pub tool_calls: usize,
    /// Metadata of the `end` event (`None` if the body ended without one)
    pub end: Option<EndData>,
}

impl StreamSummary {
    /// Whether the `end` event was received
    #[must_use]
    pub fn completed(&self) -> bool {
        self.end.is_some()
    }
}

/// Accumulates one response
#[derive(Debug, Default)]
pub struct StreamReducer {
    summary: StreamSummary,
    events_seen: u64,
}

impl StreamReducer {
    /// Create a reducer for a new response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer text so far
    #[must_use]
    pub fn content(&self) -> &str {
        &self.summary.content
    }

    /// Tool-execution annotations so far
    #[must_use]
    pub fn tool_executions(&self) -> &[String] {
        &self.summary.tool_executions
    }

    /// Whether the terminal `end` event has been applied
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.summary.completed()
    }

    /// Apply one event
    ///
    /// Events after `end` are logged and ignored.
    pub fn apply<K: StreamSink + ?Sized>(&mut self, event: StreamEvent, sink: &mut K) {
        if self.is_finished() {
            tracing::warn!(event = event.kind(), "Ignoring event after end of stream");
            return;
        }
        self.events_seen += 1;

        match event {
            StreamEvent::Start(data) => {
                tracing::debug!(conversation_id = %data.conversation_id, "Stream started");
                sink.on_start(&data.conversation_id);
                self.summary.conversation_id = Some(data.conversation_id);
            }

            StreamEvent::Token(data) if data.is_tool_execution() => {
                tracing::debug!(tool = %data.token, "Tool execution");
                self.summary.tool_executions.push(data.token.clone());
                sink.on_tool_execution(&self.summary.tool_executions, &data);
            }

            StreamEvent::Token(data) => {
                self.summary.content.push_str(&data.token);
                sink.on_token(&self.summary.content, &data);
            }

            StreamEvent::ToolCall(data) => {
                self.summary.tool_calls += 1;
                sink.on_tool_call(&data);
            }

            StreamEvent::End(data) => {
                tracing::debug!(
                    input_tokens = data.input_tokens,
                    output_tokens = data.output_tokens,
                    documents = data.referenced_documents.len(),
                    events = self.events_seen,
                    "Stream ended"
                );
                sink.on_end(&self.summary.content, &data);
                self.summary.end = Some(data);
            }
        }
    }

    /// Consume an event stream until `end`, the end of the body, or an error
    ///
    /// # Errors
    ///
    /// Returns the first transport error. Events applied before the error
    /// have already reached the sink; nothing is replayed.
    pub async fn drive<S, K>(mut self, events: S, sink: &mut K) -> Result<StreamSummary, ApiError>
    where
        S: Stream<Item = Result<StreamEvent, ApiError>>,
        K: StreamSink + ?Sized,
    {
        let mut events = std::pin::pin!(events);

        while let Some(event) = events.next().await {
            self.apply(event?, sink);
            if self.is_finished() {
                break;
            }
        }

        if !self.is_finished() {
            tracing::warn!(
                events = self.events_seen,
                "Stream body ended without an end event"
            );
        }

        Ok(self.summary)
    }

    /// Finish without consuming further events
    #[must_use]
    pub fn into_summary(self) -> StreamSummary {
        self.summary
    }
}
