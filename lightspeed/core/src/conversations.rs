//! Conversation List
//!
//! Conversations the user has had in this session, newest first, plus the
//! conversion from stored history back into transcript messages.

use crate::api::types::{ConversationResponse, HistoryRole};
use crate::messages::Message;

/// Characters of the first user message kept as the conversation title
pub const TITLE_MAX_CHARS: usize = 50;

/// Entry of the conversation list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationEntry {
    /// Server-issued conversation ID
    pub id: String,
    /// Display text
    pub text: String,
}

impl ConversationEntry {
    /// Create an entry titled after the first user message
    pub fn new(id: impl Into<String>, first_message: &str) -> Self {
        Self {
            id: id.into(),
            text: conversation_title(first_message),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.text.to_lowercase().contains(needle) || self.id.to_lowercase().contains(needle)
    }
}

/// Title for a conversation: the first 50 characters, `...` when cut
#[must_use]
pub fn conversation_title(first_message: &str) -> String {
    let mut chars = first_message.chars();
    let title: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{title}...")
    } else {
        title
    }
}

/// The conversation list and its search filter
#[derive(Clone, Debug, Default)]
pub struct ConversationList {
    entries: Vec<ConversationEntry>,
    filter: String,
}

impl ConversationList {
    /// Create an empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, newest first
    #[must_use]
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by ID
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ConversationEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Add an entry at the top; an existing entry with the same ID is kept
    ///
    /// Returns whether the list changed.
    pub fn insert(&mut self, entry: ConversationEntry) -> bool {
        if self.get(&entry.id).is_some() {
            return false;
        }
        self.entries.insert(0, entry);
        true
    }

    /// Remove an entry by ID
    pub fn remove(&mut self, id: &str) -> Option<ConversationEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Current search filter
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Set the search filter
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    /// Entries matching the current filter
    #[must_use]
    pub fn visible(&self) -> Vec<&ConversationEntry> {
        self.search(&self.filter)
    }

    /// Entries matching `query`
    ///
    /// An empty or whitespace-only query matches everything; otherwise the
    /// match is a case-insensitive substring test on the title or the ID.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&ConversationEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.entries.iter().collect();
        }
        self.entries.iter().filter(|e| e.matches(&needle)).collect()
    }
}

/// Rebuild transcript messages from stored history
///
/// User messages become user messages; assistant messages become finished
/// bot messages with actions.
#[must_use]
pub fn history_messages(conversation: &ConversationResponse) -> Vec<Message> {
    conversation
        .chat_history
        .iter()
        .flat_map(|turn| turn.messages.iter())
        .map(|m| match m.role {
            HistoryRole::User => Message::user(m.content.clone(), Vec::new()),
            HistoryRole::Assistant => Message::bot(m.content.clone()),
        })
        .collect()
}

/// Title for a loaded conversation (its first user message)
#[must_use]
pub fn history_title(conversation: &ConversationResponse) -> Option<String> {
    conversation
        .chat_history
        .iter()
        .flat_map(|turn| turn.messages.iter())
        .find(|m| m.role == HistoryRole::User)
        .map(|m| conversation_title(&m.content))
}
