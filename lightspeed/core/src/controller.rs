//! Chat Controller - The Headless Chatbot
//!
//! The controller owns the session state and mediates between the user, the
//! assistant service and whatever surface renders the chat:
//! - user actions arrive as method calls (`send`, `attach_file`, ...)
//! - the service is reached through a [`LightspeedApi`]
//! - surfaces are told about every state change through [`ChatUpdate`]s
//!
//! # Design Philosophy
//!
//! One exchange at a time. While a response streams, the send control is
//! disabled and a second `send` is refused; whatever happens, it is enabled
//! again when the exchange ends. A started stream runs until its `end`
//! event, the end of the body, or a transport error. If the caller drops a
//! `send` future before that, the unfinished answer is replaced with the
//! apology and the send control is enabled again.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::api::types::{QueryAttachment, QueryRequest, QueryResponse};
use crate::api::{ApiError, LightspeedApi};
use crate::attachments::{AttachedFile, AttachmentError};
use crate::config::ChatConfig;
use crate::conversations::{history_messages, history_title, ConversationEntry};
use crate::messages::{
    ChatUpdate, Message, MessageActions, MessageId, SourceLink, APOLOGY_MESSAGE,
};
use crate::state::{ChatbotState, DisplayMode};
use crate::stream::{EndData, StreamReducer, StreamSink, StreamSummary, TokenData, ToolCallData};

/// Announcement made when an exchange fails
pub const ERROR_ANNOUNCEMENT: &str =
    "Message from Lightspeed AI: Sorry, I encountered an error processing your request.";

/// Why a send did not complete
#[derive(Debug, Error)]
pub enum SendError {
    /// Another exchange is still in flight
    #[error("A message is already being sent")]
    Busy,

    /// Neither text nor attachments were given
    #[error("Nothing to send")]
    Empty,

    /// Attachments could not be read; nothing was sent
    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    /// The service could not be reached or failed mid-response
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors of conversation management
#[derive(Debug, Error)]
pub enum ConversationError {
    /// The service call failed; local state is unchanged
    #[error("Conversation {conversation_id}: {source}")]
    Api {
        /// Conversation the call was about
        conversation_id: String,
        /// The underlying error
        source: ApiError,
    },
}

/// Send an update to the surface, if one is listening
///
/// Never blocks: a full or closed channel drops the update with a warning.
fn notify(tx: Option<&mpsc::Sender<ChatUpdate>>, update: ChatUpdate) {
    if let Some(tx) = tx {
        if let Err(e) = tx.try_send(update) {
            tracing::warn!("Failed to send update to surface: {}", e);
        }
    }
}

fn announce(state: &mut ChatbotState, tx: Option<&mpsc::Sender<ChatUpdate>>, text: String) {
    state.announcement = Some(text.clone());
    notify(tx, ChatUpdate::Announcement { text });
}

/// Applies one streamed response to the session state
struct ExchangeSink<'a> {
    state: &'a mut ChatbotState,
    tx: Option<&'a mpsc::Sender<ChatUpdate>>,
    bot_id: MessageId,
    query: String,
    had_conversation: bool,
}

impl ExchangeSink<'_> {
    fn finish(&mut self, content: &str, sources: Vec<SourceLink>) {
        let finished = self
            .state
            .replace_message(&self.bot_id, |m| {
                m.content = content.to_string();
                m.loading = false;
                m.actions = Some(MessageActions::for_content(content));
                m.sources = sources;
            })
            .cloned();

        if let Some(message) = finished {
            notify(self.tx, ChatUpdate::MessageFinished { message });
        }
        announce(
            self.state,
            self.tx,
            format!("Message from Lightspeed AI: {content}"),
        );
    }
}

impl StreamSink for ExchangeSink<'_> {
    fn on_start(&mut self, conversation_id: &str) {
        let changed = self.state.current_conversation_id.as_deref() != Some(conversation_id);
        self.state.current_conversation_id = Some(conversation_id.to_string());

        if !self.had_conversation
            && self
                .state
                .conversations
                .insert(ConversationEntry::new(conversation_id, &self.query))
        {
            notify(self.tx, ChatUpdate::ConversationsChanged);
        }
        if changed {
            notify(
                self.tx,
                ChatUpdate::ConversationChanged {
                    conversation_id: Some(conversation_id.to_string()),
                },
            );
        }
    }

    fn on_token(&mut self, content: &str, _token: &TokenData) {
        let updated = self.state.replace_message(&self.bot_id, |m| {
            m.content = content.to_string();
            m.loading = false;
        });

        if updated.is_some() {
            notify(
                self.tx,
                ChatUpdate::MessageContent {
                    message_id: self.bot_id.clone(),
                    content: content.to_string(),
                },
            );
        }
    }

    fn on_tool_execution(&mut self, tools: &[String], token: &TokenData) {
        self.state
            .tool_executions
            .insert(self.bot_id.clone(), tools.to_vec());
        notify(
            self.tx,
            ChatUpdate::ToolExecution {
                message_id: self.bot_id.clone(),
                tool: token.token.clone(),
            },
        );
    }

    fn on_tool_call(&mut self, call: &ToolCallData) {
        self.state
            .tool_calls
            .entry(self.bot_id.clone())
            .or_default()
            .push(call.token.clone());
        notify(
            self.tx,
            ChatUpdate::ToolCall {
                message_id: self.bot_id.clone(),
                payload: call.token.clone(),
            },
        );
    }

    fn on_end(&mut self, content: &str, end: &EndData) {
        let sources = end
            .referenced_documents
            .iter()
            .map(|doc| SourceLink {
                title: doc.doc_title.clone(),
                link: doc.doc_url.clone(),
            })
            .collect();
        self.finish(content, sources);
    }
}

/// Releases the send control when a send ends, including when its future is
/// dropped mid-exchange
struct SendGuard<'a, A: LightspeedApi> {
    controller: &'a mut ChatController<A>,
}

impl<'a, A: LightspeedApi> SendGuard<'a, A> {
    fn new(controller: &'a mut ChatController<A>) -> Self {
        controller.set_send_enabled(false);
        Self { controller }
    }
}

impl<A: LightspeedApi> Drop for SendGuard<'_, A> {
    fn drop(&mut self) {
        if let Some(bot_id) = self.controller.in_flight.take() {
            tracing::warn!(message_id = %bot_id, "Exchange abandoned before completion");
            self.controller.fail_exchange(&bot_id);
        }
        self.controller.set_send_enabled(true);
    }
}

/// The headless chatbot
pub struct ChatController<A: LightspeedApi> {
    /// Configuration
    config: ChatConfig,
    /// Assistant service
    api: Arc<A>,
    /// Session state
    state: ChatbotState,
    /// Channel to the rendering surface
    tx: Option<mpsc::Sender<ChatUpdate>>,
    /// Bot message of the exchange in progress
    in_flight: Option<MessageId>,
}

impl<A: LightspeedApi> ChatController<A> {
    /// Create a controller without a surface
    pub fn new(api: A, config: ChatConfig) -> Self {
        let state = ChatbotState::new(config.attachments.clone());
        Self {
            config,
            api: Arc::new(api),
            state,
            tx: None,
            in_flight: None,
        }
    }

    /// Send updates to `tx`
    #[must_use]
    pub fn with_updates(mut self, tx: mpsc::Sender<ChatUpdate>) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> &ChatbotState {
        &self.state
    }

    /// Effective configuration
    #[must_use]
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The assistant service
    #[must_use]
    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    fn notify(&self, update: ChatUpdate) {
        notify(self.tx.as_ref(), update);
    }

    fn announce(&mut self, text: String) {
        announce(&mut self.state, self.tx.as_ref(), text);
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Show or hide the chatbot
    pub fn toggle_visible(&mut self) -> bool {
        let visible = self.state.toggle_visible();
        self.notify(ChatUpdate::Visibility { visible });
        visible
    }

    /// Change the layout
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.state.set_display_mode(mode);
        self.notify(ChatUpdate::DisplayMode { mode });
    }

    /// Open or close the conversation drawer (resets its search)
    pub fn toggle_drawer(&mut self) -> bool {
        let open = self.state.toggle_drawer();
        self.notify(ChatUpdate::Drawer { open });
        self.notify(ChatUpdate::ConversationsChanged);
        open
    }

    /// Start a new chat
    pub fn new_chat(&mut self) {
        self.state.new_chat();
        tracing::info!("Started new chat");
        self.notify(ChatUpdate::Drawer {
            open: self.state.drawer_open,
        });
        self.notify(ChatUpdate::TranscriptReset { message_count: 0 });
        self.notify(ChatUpdate::ConversationChanged {
            conversation_id: None,
        });
    }

    // =========================================================================
    // Models
    // =========================================================================

    /// Fetch the model list and select the default model
    ///
    /// Never fails: when the service cannot list its models the fallback
    /// model is used.
    pub async fn load_models(&mut self) {
        let models = self.api.load_models().await;
        self.state.set_models(
            models,
            self.config.default_model.clone(),
            self.config.default_provider.clone(),
        );
        tracing::info!(
            model = ?self.state.selected_model,
            provider = ?self.state.selected_provider,
            "Selected model"
        );
    }

    /// Select a model by identifier
    pub fn select_model(&mut self, identifier: &str) -> bool {
        let selected = self.state.select_model(identifier);
        if selected {
            tracing::info!(model = identifier, "Model selected");
        } else {
            tracing::warn!(model = identifier, "Unknown model");
        }
        selected
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    /// Attach a file from disk
    ///
    /// # Errors
    ///
    /// Returns the validation error, which is also shown in the file alert.
    /// The attachment list is unchanged on error.
    pub async fn attach_file(&mut self, path: impl Into<PathBuf>) -> Result<(), AttachmentError> {
        let result = match AttachedFile::from_path(path).await {
            Ok(file) => self.state.attachments.attach(file),
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            tracing::warn!(error = %e, "Attachment rejected");
            let message = e.to_string();
            self.state.set_file_error(message.clone());
            self.notify(ChatUpdate::FileError { message });
        }
        result
    }

    /// Remove the attachment at `index`
    pub fn remove_attachment(&mut self, index: usize) -> Option<AttachedFile> {
        self.state.attachments.remove(index)
    }

    /// Hide the file alert
    pub fn dismiss_file_alert(&mut self) {
        self.state.dismiss_file_alert();
    }

    // =========================================================================
    // Sending
    // =========================================================================

    fn set_send_enabled(&mut self, enabled: bool) {
        self.state.send_enabled = enabled;
        self.notify(ChatUpdate::SendEnabled { enabled });
    }

    fn build_request(&self, text: &str) -> QueryRequest {
        QueryRequest::new(text)
            .with_conversation_id(self.state.current_conversation_id.clone())
            .with_model(
                self.state.selected_model.clone(),
                self.state.selected_provider.clone(),
            )
            .with_system_prompt(Some(self.config.system_prompt.clone()))
            .with_no_tools(self.config.no_tools)
    }

    /// Append the user message and a loading bot placeholder
    fn begin_exchange(&mut self, text: &str) -> MessageId {
        let user = Message::user(text, self.state.attachments.names());
        let bot = Message::bot_placeholder();
        let bot_id = bot.id.clone();

        self.state.push_message(user.clone());
        self.state.push_message(bot.clone());
        self.state.tool_executions.insert(bot_id.clone(), Vec::new());
        self.state.tool_calls.remove(&bot_id);

        self.notify(ChatUpdate::MessageAdded { message: user });
        self.notify(ChatUpdate::MessageAdded { message: bot });
        self.announce(format!(
            "Message from User: {text}. Message from Lightspeed AI is loading."
        ));
        self.in_flight = Some(bot_id.clone());
        bot_id
    }

    /// Replace the bot message with the apology
    fn fail_exchange(&mut self, bot_id: &MessageId) {
        let failed = self
            .state
            .replace_message(bot_id, |m| {
                m.content = APOLOGY_MESSAGE.to_string();
                m.loading = false;
                m.actions = Some(MessageActions::inert());
                m.sources.clear();
            })
            .cloned();

        if let Some(message) = failed {
            self.notify(ChatUpdate::MessageFinished { message });
        }
        self.announce(ERROR_ANNOUNCEMENT.to_string());
    }

    /// Send a message and stream the answer into the transcript
    ///
    /// # Errors
    ///
    /// - [`SendError::Busy`] / [`SendError::Empty`]: nothing changed
    /// - [`SendError::Attachment`]: an attachment could not be read; nothing
    ///   was sent and the transcript is unchanged
    /// - [`SendError::Api`]: the bot message now holds the apology
    pub async fn send(&mut self, text: &str) -> Result<StreamSummary, SendError> {
        if !self.state.send_enabled {
            return Err(SendError::Busy);
        }
        if text.trim().is_empty() && self.state.attachments.is_empty() {
            return Err(SendError::Empty);
        }

        let mut guard = SendGuard::new(self);
        let result = guard.controller.stream_exchange(text).await;
        drop(guard);
        result
    }

    async fn stream_exchange(&mut self, text: &str) -> Result<StreamSummary, SendError> {
        let attachments = self.read_attachments().await?;
        let request = self.build_request(text).with_attachments(attachments);
        let bot_id = self.begin_exchange(text);
        self.state.attachments.clear();

        let had_conversation = self.state.current_conversation_id.is_some();
        let response = self.api.streaming_query(&request).await;
        let result = match response {
            Ok(events) => {
                let mut sink = ExchangeSink {
                    state: &mut self.state,
                    tx: self.tx.as_ref(),
                    bot_id: bot_id.clone(),
                    query: text.to_string(),
                    had_conversation,
                };
                let outcome = StreamReducer::new().drive(events, &mut sink).await;
                if let Ok(ref summary) = outcome {
                    if !summary.completed() {
                        sink.finish(&summary.content, Vec::new());
                    }
                }
                outcome
            }
            Err(e) => Err(e),
        };
        self.in_flight = None;

        match result {
            Ok(summary) => {
                tracing::info!(
                    conversation_id = ?summary.conversation_id,
                    chars = summary.content.len(),
                    tools = summary.tool_executions.len(),
                    "Exchange complete"
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(error = %e, "Exchange failed");
                self.fail_exchange(&bot_id);
                Err(e.into())
            }
        }
    }

    async fn read_attachments(&mut self) -> Result<Vec<QueryAttachment>, SendError> {
        match self.state.attachments.read_all().await {
            Ok(attachments) => Ok(attachments),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read attachments");
                let message = e.to_string();
                self.state.set_file_error(message.clone());
                self.notify(ChatUpdate::FileError { message });
                Err(e.into())
            }
        }
    }

    /// Send a message without streaming (`POST /v1/query`)
    ///
    /// The transcript is updated the same way as for [`ChatController::send`],
    /// in a single step once the full answer has arrived.
    ///
    /// # Errors
    ///
    /// See [`ChatController::send`].
    pub async fn query_once(&mut self, text: &str) -> Result<QueryResponse, SendError> {
        if !self.state.send_enabled {
            return Err(SendError::Busy);
        }
        if text.trim().is_empty() && self.state.attachments.is_empty() {
            return Err(SendError::Empty);
        }

        let mut guard = SendGuard::new(self);
        let result = guard.controller.query_exchange(text).await;
        drop(guard);
        result
    }

    async fn query_exchange(&mut self, text: &str) -> Result<QueryResponse, SendError> {
        let attachments = self.read_attachments().await?;
        let request = self.build_request(text).with_attachments(attachments);
        let bot_id = self.begin_exchange(text);
        self.state.attachments.clear();
        let had_conversation = self.state.current_conversation_id.is_some();

        let response = self.api.query(&request).await;
        self.in_flight = None;
        match response {
            Ok(response) => {
                let mut sink = ExchangeSink {
                    state: &mut self.state,
                    tx: self.tx.as_ref(),
                    bot_id,
                    query: text.to_string(),
                    had_conversation,
                };
                if let Some(ref id) = response.conversation_id {
                    sink.on_start(id);
                }
                sink.finish(&response.response, Vec::new());
                Ok(response)
            }
            Err(e) => {
                tracing::error!(error = %e, "Exchange failed");
                self.fail_exchange(&bot_id);
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    /// Filter the conversation list
    pub fn search_conversations(&mut self, text: &str) -> Vec<ConversationEntry> {
        let found = self.state.search_conversations(text);
        self.notify(ChatUpdate::ConversationsChanged);
        found
    }

    /// Load a stored conversation into the transcript
    ///
    /// # Errors
    ///
    /// On failure the error is announced and the state is left unchanged.
    pub async fn select_conversation(&mut self, conversation_id: &str) -> Result<(), ConversationError> {
        let conversation = match self.api.get_conversation(conversation_id).await {
            Ok(conversation) => conversation,
            Err(source) => {
                tracing::error!(conversation_id, error = %source, "Failed to load conversation");
                self.announce(format!("Failed to load conversation {conversation_id}."));
                return Err(ConversationError::Api {
                    conversation_id: conversation_id.to_string(),
                    source,
                });
            }
        };

        let messages = history_messages(&conversation);
        let message_count = messages.len();
        self.state.reset_transcript(messages);
        self.state.current_conversation_id = Some(conversation.conversation_id.clone());

        if self.state.conversations.get(&conversation.conversation_id).is_none() {
            if let Some(title) = history_title(&conversation) {
                self.state.conversations.insert(ConversationEntry {
                    id: conversation.conversation_id.clone(),
                    text: title,
                });
                self.notify(ChatUpdate::ConversationsChanged);
            }
        }

        tracing::info!(conversation_id, messages = message_count, "Conversation loaded");
        self.notify(ChatUpdate::TranscriptReset { message_count });
        self.notify(ChatUpdate::ConversationChanged {
            conversation_id: Some(conversation.conversation_id),
        });
        Ok(())
    }

    /// Delete a stored conversation
    ///
    /// Deleting the active conversation also clears the transcript.
    ///
    /// # Errors
    ///
    /// On failure the error is announced and the state is left unchanged.
    pub async fn delete_conversation(&mut self, conversation_id: &str) -> Result<(), ConversationError> {
        if let Err(source) = self.api.delete_conversation(conversation_id).await {
            tracing::error!(conversation_id, error = %source, "Failed to delete conversation");
            self.announce(format!("Failed to delete conversation {conversation_id}."));
            return Err(ConversationError::Api {
                conversation_id: conversation_id.to_string(),
                source,
            });
        }

        self.state.conversations.remove(conversation_id);
        self.notify(ChatUpdate::ConversationsChanged);

        if self.state.current_conversation_id.as_deref() == Some(conversation_id) {
            self.state.reset_transcript(Vec::new());
            self.state.current_conversation_id = None;
            self.notify(ChatUpdate::TranscriptReset { message_count: 0 });
            self.notify(ChatUpdate::ConversationChanged {
                conversation_id: None,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{ConversationResponse, Model};
    use crate::api::EventStream;
    use crate::stream::{StartData, StreamEvent};
    use futures::StreamExt;

    // Mock service answering every query with "Hello world!"
    struct MockApi;

    #[async_trait::async_trait]
    impl LightspeedApi for MockApi {
        fn base_url(&self) -> &str {
            "mock://"
        }

        async fn health_check(&self) -> bool {
            true
        }

        async fn list_models(&self) -> Result<Vec<Model>, ApiError> {
            Ok(vec![Model::fallback()])
        }

        async fn query(&self, _request: &QueryRequest) -> Result<QueryResponse, ApiError> {
            Ok(QueryResponse {
                conversation_id: Some("q1".to_string()),
                response: "Hello world!".to_string(),
            })
        }

        async fn streaming_query(&self, _request: &QueryRequest) -> Result<EventStream, ApiError> {
            let events = vec![
                Ok(StreamEvent::Start(StartData {
                    conversation_id: "c1".to_string(),
                })),
                Ok(StreamEvent::Token(TokenData {
                    id: 0,
                    role: "inference".to_string(),
                    token: "Hello ".to_string(),
                })),
                Ok(StreamEvent::Token(TokenData {
                    id: 1,
                    role: "inference".to_string(),
                    token: "world!".to_string(),
                })),
                Ok(StreamEvent::End(EndData::default())),
            ];
            Ok(futures::stream::iter(events).boxed())
        }

        async fn get_conversation(&self, id: &str) -> Result<ConversationResponse, ApiError> {
            Ok(ConversationResponse {
                conversation_id: id.to_string(),
                chat_history: Vec::new(),
            })
        }

        async fn delete_conversation(&self, _id: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_controller_creation() {
        let controller = ChatController::new(MockApi, ChatConfig::default());
        assert!(controller.state().send_enabled);
        assert!(controller.state().messages.is_empty());
        assert!(controller.state().current_conversation_id.is_none());
    }

    #[tokio::test]
    async fn test_send_streams_into_transcript() {
        let (tx, mut rx) = mpsc::channel(100);
        let mut controller = ChatController::new(MockApi, ChatConfig::default()).with_updates(tx);

        let summary = controller.send("hi").await.unwrap();
        assert_eq!(summary.content, "Hello world!");

        let state = controller.state();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].content, "Hello world!");
        assert!(state.messages[1].actions.is_some());
        assert_eq!(state.current_conversation_id.as_deref(), Some("c1"));
        assert!(state.send_enabled);

        let first = rx.recv().await.unwrap();
        assert_eq!(first, ChatUpdate::SendEnabled { enabled: false });
    }

    #[tokio::test]
    async fn test_send_rejects_empty() {
        let mut controller = ChatController::new(MockApi, ChatConfig::default());
        assert!(matches!(controller.send("  ").await, Err(SendError::Empty)));
        assert!(controller.state().messages.is_empty());
    }

    #[tokio::test]
    async fn test_send_rejected_while_busy() {
        let mut controller = ChatController::new(MockApi, ChatConfig::default());
        controller.state.send_enabled = false;
        assert!(matches!(controller.send("hi").await, Err(SendError::Busy)));
        assert!(controller.state().messages.is_empty());
    }

    #[tokio::test]
    async fn test_query_once() {
        let mut controller = ChatController::new(MockApi, ChatConfig::default());
        let response = controller.query_once("hi").await.unwrap();

        assert_eq!(response.response, "Hello world!");
        assert_eq!(controller.state().messages[1].content, "Hello world!");
        assert_eq!(controller.state().current_conversation_id.as_deref(), Some("q1"));
        assert_eq!(controller.state().conversations.len(), 1);
    }

    #[tokio::test]
    async fn test_full_channel_does_not_block() {
        let (tx, _rx) = mpsc::channel(1);
        let mut controller = ChatController::new(MockApi, ChatConfig::default()).with_updates(tx);
        controller.send("hi").await.unwrap();
        assert_eq!(controller.state().messages[1].content, "Hello world!");
    }
}
