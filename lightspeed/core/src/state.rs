//! Chatbot Session State
//!
//! Everything a surface needs to render the chatbot lives in [`ChatbotState`]:
//! visibility, layout, transcript, tool annotations, model selection, the
//! conversation list and pending attachments. The controller owns it and
//! mutates it; surfaces read it or follow the `ChatUpdate` stream.
//!
//! Methods here are synchronous and never touch the network.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::api::types::{Model, ToolCallPayload};
use crate::attachments::AttachmentSet;
use crate::config::AttachmentLimits;
use crate::conversations::{ConversationEntry, ConversationList};
use crate::messages::{Message, MessageId};

/// Placeholder shown in the model menu when no LLM is available
pub const NO_MODELS_LABEL: &str = "No models available";

/// How the chatbot is laid out
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Floating overlay
    #[default]
    Default,
    /// Docked to the side of the window
    Docked,
    /// Fills the window
    Fullscreen,
}

impl DisplayMode {
    /// All modes, in menu order
    pub const ALL: [DisplayMode; 3] = [Self::Default, Self::Docked, Self::Fullscreen];

    /// Menu label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Default => "Overlay",
            Self::Docked => "Dock to window",
            Self::Fullscreen => "Fullscreen",
        }
    }
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" | "overlay" => Ok(Self::Default),
            "docked" | "dock" => Ok(Self::Docked),
            "fullscreen" => Ok(Self::Fullscreen),
            other => Err(format!(
                "unknown display mode '{other}' (expected overlay, docked or fullscreen)"
            )),
        }
    }
}

/// State of one chatbot session
#[derive(Clone, Debug)]
pub struct ChatbotState {
    /// Whether the chatbot is shown
    pub visible: bool,
    /// Current layout
    pub display_mode: DisplayMode,
    /// Whether the conversation drawer is open
    pub drawer_open: bool,
    /// Transcript, oldest first
    pub messages: Vec<Message>,
    /// Selected model identifier
    pub selected_model: Option<String>,
    /// Provider of the selected model
    pub selected_provider: Option<String>,
    /// Models advertised by the service
    pub available_models: Vec<Model>,
    /// Whether the user may send
    pub send_enabled: bool,
    /// Known conversations and the drawer's search filter
    pub conversations: ConversationList,
    /// Latest screen-reader announcement
    pub announcement: Option<String>,
    /// Conversation the transcript belongs to (`None` = new chat)
    pub current_conversation_id: Option<String>,
    /// Tool-execution annotations per bot message
    pub tool_executions: HashMap<MessageId, Vec<String>>,
    /// Structured tool calls per bot message
    pub tool_calls: HashMap<MessageId, Vec<ToolCallPayload>>,
    /// Files attached to the message being composed
    pub attachments: AttachmentSet,
    /// Last attachment error
    pub file_error: Option<String>,
    /// Whether the attachment alert is shown
    pub show_file_alert: bool,
}

impl Default for ChatbotState {
    fn default() -> Self {
        Self::new(AttachmentLimits::default())
    }
}

impl ChatbotState {
    /// Create an empty session
    #[must_use]
    pub fn new(limits: AttachmentLimits) -> Self {
        Self {
            visible: false,
            display_mode: DisplayMode::Default,
            drawer_open: false,
            messages: Vec::new(),
            selected_model: None,
            selected_provider: None,
            available_models: Vec::new(),
            send_enabled: true,
            conversations: ConversationList::new(),
            announcement: None,
            current_conversation_id: None,
            tool_executions: HashMap::new(),
            tool_calls: HashMap::new(),
            attachments: AttachmentSet::new(limits),
            file_error: None,
            show_file_alert: false,
        }
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Show or hide the chatbot, returning the new visibility
    pub fn toggle_visible(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    /// Change the layout
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
    }

    /// Open or close the drawer, returning the new state
    ///
    /// The conversation search filter is reset either way.
    pub fn toggle_drawer(&mut self) -> bool {
        self.drawer_open = !self.drawer_open;
        self.conversations.set_filter("");
        self.drawer_open
    }

    /// Start a new chat
    ///
    /// Toggles the drawer, clears the transcript with its tool annotations,
    /// and forgets the current conversation.
    pub fn new_chat(&mut self) {
        self.toggle_drawer();
        self.reset_transcript(Vec::new());
        self.current_conversation_id = None;
    }

    /// Replace the transcript and drop its tool annotations
    pub fn reset_transcript(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.tool_executions.clear();
        self.tool_calls.clear();
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    /// Set the drawer's search filter and return the matching entries
    pub fn search_conversations(&mut self, text: &str) -> Vec<ConversationEntry> {
        self.conversations.set_filter(text);
        self.conversations
            .visible()
            .into_iter()
            .cloned()
            .collect()
    }

    // =========================================================================
    // Models
    // =========================================================================

    /// Store the advertised models and pick the initial selection
    ///
    /// A `preferred` model wins when given; otherwise the first LLM is
    /// selected. The provider defaults to the chosen model's provider.
    pub fn set_models(
        &mut self,
        models: Vec<Model>,
        preferred: Option<String>,
        preferred_provider: Option<String>,
    ) {
        self.available_models = models;

        if let Some(model) = preferred {
            let provider = preferred_provider.or_else(|| {
                self.available_models
                    .iter()
                    .find(|m| m.identifier == model)
                    .map(|m| m.provider_id.clone())
            });
            self.selected_model = Some(model);
            self.selected_provider = provider;
            return;
        }

        match self.available_models.iter().find(|m| m.is_llm()) {
            Some(model) => {
                self.selected_model = Some(model.identifier.clone());
                self.selected_provider = Some(model.provider_id.clone());
            }
            None => {
                self.selected_model = None;
                self.selected_provider = None;
            }
        }
    }

    /// Models offered in the model menu (LLMs only)
    #[must_use]
    pub fn llm_models(&self) -> Vec<&Model> {
        self.available_models.iter().filter(|m| m.is_llm()).collect()
    }

    /// Select a model by identifier, together with its provider
    ///
    /// Returns `false` and leaves the selection unchanged if the model is
    /// not an advertised LLM.
    pub fn select_model(&mut self, identifier: &str) -> bool {
        let Some(model) = self
            .available_models
            .iter()
            .find(|m| m.is_llm() && m.identifier == identifier)
        else {
            return false;
        };

        self.selected_model = Some(model.identifier.clone());
        self.selected_provider = Some(model.provider_id.clone());
        true
    }

    // =========================================================================
    // Transcript
    // =========================================================================

    /// Append a message
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Look up a message by ID
    #[must_use]
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Update the message with the given ID in place
    ///
    /// Returns the updated message, or `None` if no message has that ID.
    pub fn replace_message<F>(&mut self, id: &MessageId, update: F) -> Option<&Message>
    where
        F: FnOnce(&mut Message),
    {
        let message = self.messages.iter_mut().find(|m| &m.id == id)?;
        update(message);
        Some(message)
    }

    /// Tool executions recorded for a message
    #[must_use]
    pub fn tool_executions_for(&self, id: &MessageId) -> &[String] {
        self.tool_executions.get(id).map_or(&[], Vec::as_slice)
    }

    /// Tool calls recorded for a message
    #[must_use]
    pub fn tool_calls_for(&self, id: &MessageId) -> &[ToolCallPayload] {
        self.tool_calls.get(id).map_or(&[], Vec::as_slice)
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    /// Show an attachment error
    pub fn set_file_error(&mut self, message: impl Into<String>) {
        self.file_error = Some(message.into());
        self.show_file_alert = true;
    }

    /// Hide the attachment alert
    pub fn dismiss_file_alert(&mut self) {
        self.show_file_alert = false;
        self.file_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn model(id: &str, kind: &str, provider: &str) -> Model {
        Model {
            identifier: id.to_string(),
            metadata: serde_json::Map::new(),
            api_model_type: kind.to_string(),
            provider_id: provider.to_string(),
            provider_resource_id: id.to_string(),
            kind: "model".to_string(),
            model_type: kind.to_string(),
        }
    }

    #[test]
    fn test_display_mode_parse_and_labels() {
        assert_eq!("overlay".parse::<DisplayMode>(), Ok(DisplayMode::Default));
        assert_eq!("Docked".parse::<DisplayMode>(), Ok(DisplayMode::Docked));
        assert_eq!("fullscreen".parse::<DisplayMode>(), Ok(DisplayMode::Fullscreen));
        assert!("sideways".parse::<DisplayMode>().is_err());

        let labels: Vec<_> = DisplayMode::ALL.iter().map(DisplayMode::label).collect();
        assert_eq!(labels, vec!["Overlay", "Dock to window", "Fullscreen"]);
    }

    #[test]
    fn test_toggle_drawer_resets_filter() {
        let mut state = ChatbotState::default();
        state.conversations.set_filter("pods");

        assert!(state.toggle_drawer());
        assert_eq!(state.conversations.filter(), "");
        assert!(!state.toggle_drawer());
    }

    #[test]
    fn test_new_chat_clears_transcript() {
        let mut state = ChatbotState::default();
        let bot = Message::bot("answer");
        state
            .tool_executions
            .insert(bot.id.clone(), vec!["search".to_string()]);
        state.push_message(Message::user("question", Vec::new()));
        state.push_message(bot);
        state.current_conversation_id = Some("c1".to_string());

        state.new_chat();

        assert!(state.messages.is_empty());
        assert!(state.tool_executions.is_empty());
        assert!(state.current_conversation_id.is_none());
        assert!(state.drawer_open);
    }

    #[test]
    fn test_default_model_is_first_llm() {
        let mut state = ChatbotState::default();
        state.set_models(
            vec![
                model("embed", "embedding", "ollama"),
                model("granite", "llm", "watsonx"),
                model("llama", "llm", "ollama"),
            ],
            None,
            None,
        );

        assert_eq!(state.selected_model.as_deref(), Some("granite"));
        assert_eq!(state.selected_provider.as_deref(), Some("watsonx"));
        assert_eq!(state.llm_models().len(), 2);
    }

    #[test]
    fn test_preferred_model_wins() {
        let mut state = ChatbotState::default();
        state.set_models(
            vec![model("granite", "llm", "watsonx"), model("llama", "llm", "ollama")],
            Some("llama".to_string()),
            None,
        );
        assert_eq!(state.selected_model.as_deref(), Some("llama"));
        assert_eq!(state.selected_provider.as_deref(), Some("ollama"));
    }

    #[test]
    fn test_no_llm_models() {
        let mut state = ChatbotState::default();
        state.set_models(vec![model("embed", "embedding", "x")], None, None);
        assert!(state.selected_model.is_none());
        assert!(state.llm_models().is_empty());
    }

    #[test]
    fn test_select_model_sets_provider() {
        let mut state = ChatbotState::default();
        state.set_models(
            vec![model("granite", "llm", "watsonx"), model("llama", "llm", "ollama")],
            None,
            None,
        );

        assert!(state.select_model("llama"));
        assert_eq!(state.selected_provider.as_deref(), Some("ollama"));

        assert!(!state.select_model("missing"));
        assert_eq!(state.selected_model.as_deref(), Some("llama"));
    }

    #[test]
    fn test_replace_message_by_id() {
        let mut state = ChatbotState::default();
        let placeholder = Message::bot_placeholder();
        let id = placeholder.id.clone();
        state.push_message(Message::user("q", Vec::new()));
        state.push_message(placeholder);

        let updated = state
            .replace_message(&id, |m| {
                m.content = "partial".to_string();
                m.loading = false;
            })
            .cloned();

        assert_eq!(updated.map(|m| m.content), Some("partial".to_string()));
        assert_eq!(state.messages[0].content, "q");
        assert!(state.replace_message(&MessageId::new(), |_| {}).is_none());
    }

    #[test]
    fn test_file_alert() {
        let mut state = ChatbotState::default();
        state.set_file_error("too big");
        assert!(state.show_file_alert);
        state.dismiss_file_alert();
        assert!(!state.show_file_alert);
        assert!(state.file_error.is_none());
    }

    #[test]
    fn test_search_conversations() {
        let mut state = ChatbotState::default();
        state
            .conversations
            .insert(ConversationEntry::new("c1", "Scaling deployments"));
        state
            .conversations
            .insert(ConversationEntry::new("c2", "Pod networking"));

        let found = state.search_conversations("pod");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c2");
        assert_eq!(state.search_conversations(" ").len(), 2);
    }
}
