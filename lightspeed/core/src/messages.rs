//! Transcript Messages
//!
//! The messages shown in the chat transcript, plus the [`ChatUpdate`]
//! notifications the controller sends to whatever surface renders them.
//!
//! # Design Philosophy
//!
//! Surfaces are pure renderers. They hold no chat logic; they redraw from the
//! [`ChatUpdate`] stream or from a snapshot of the controller's state.

use serde::{Deserialize, Serialize};

use crate::api::types::ToolCallPayload;
use crate::state::DisplayMode;

/// Display name for user messages
pub const USER_NAME: &str = "User";

/// Display name for assistant messages
pub const BOT_NAME: &str = "Lightspeed AI";

/// Content placed on the bot message when an exchange fails
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I encountered an error processing your request. Please try again.";

/// Message identifier
///
/// Opaque string built from the creation time and a random component.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    ///
    /// The atomic counter keeps IDs distinct when several are generated in
    /// the same millisecond and the random suffix collides.
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::time::{SystemTime, UNIX_EPOCH};

        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let count = COUNTER.fetch_add(1, Ordering::SeqCst);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let random: u16 = rand::random();
        Self(format!("{timestamp}.{count}{random:04x}"))
    }

    /// Borrow the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// User input
    User,
    /// The assistant
    Bot,
}

impl MessageRole {
    /// Display name shown next to the message
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::User => USER_NAME,
            Self::Bot => BOT_NAME,
        }
    }
}

/// Actions a surface offers on a finished bot message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageActions {
    /// Text placed on the clipboard by the copy action (empty = no-op)
    pub copy_text: String,
    /// Share action enabled
    pub share: bool,
    /// Listen (text-to-speech) action enabled
    pub listen: bool,
}

impl MessageActions {
    /// Actions for a successfully completed response
    pub fn for_content(content: impl Into<String>) -> Self {
        Self {
            copy_text: content.into(),
            share: true,
            listen: true,
        }
    }

    /// Actions attached to a failed response; every action is a no-op
    #[must_use]
    pub fn inert() -> Self {
        Self {
            copy_text: String::new(),
            share: false,
            listen: false,
        }
    }
}

/// A cited source attached to a bot message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    /// Document title
    pub title: String,
    /// Document URL
    pub link: String,
}

/// A message in the transcript
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// Whether the surface should show a loading indicator
    pub loading: bool,
    /// Names of files attached to this message
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Actions available once the message is final
    pub actions: Option<MessageActions>,
    /// Cited sources (empty when the response referenced none)
    #[serde(default)]
    pub sources: Vec<SourceLink>,
}

impl Message {
    /// Create a finalized user message
    pub fn user(content: impl Into<String>, attachments: Vec<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::User,
            content: content.into(),
            loading: false,
            attachments,
            actions: None,
            sources: Vec::new(),
        }
    }

    /// Create an empty, loading bot placeholder
    #[must_use]
    pub fn bot_placeholder() -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::Bot,
            content: String::new(),
            loading: true,
            attachments: Vec::new(),
            actions: None,
            sources: Vec::new(),
        }
    }

    /// Create a finished bot message (used when loading history)
    pub fn bot(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: MessageId::new(),
            role: MessageRole::Bot,
            actions: Some(MessageActions::for_content(content.clone())),
            content,
            loading: false,
            attachments: Vec::new(),
            sources: Vec::new(),
        }
    }
}

/// Notifications from the controller to a rendering surface
///
/// Sent in the order the underlying state changed.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatUpdate {
    /// A message was appended to the transcript
    MessageAdded {
        /// The new message
        message: Message,
    },

    /// A message's content was replaced (streaming)
    MessageContent {
        /// Message being updated
        message_id: MessageId,
        /// Full content so far
        content: String,
    },

    /// A message reached its final form
    MessageFinished {
        /// The finished message
        message: Message,
    },

    /// A tool was executed while producing a message
    ToolExecution {
        /// Bot message the tool annotates
        message_id: MessageId,
        /// Tool description as sent by the service
        tool: String,
    },

    /// A structured tool call arrived for a message
    ToolCall {
        /// Bot message the call belongs to
        message_id: MessageId,
        /// Raw payload
        payload: ToolCallPayload,
    },

    /// The transcript was replaced or cleared
    TranscriptReset {
        /// Number of messages now in the transcript
        message_count: usize,
    },

    /// The active conversation changed
    ConversationChanged {
        /// New conversation ID (`None` = new chat)
        conversation_id: Option<String>,
    },

    /// The conversation list (or its filter) changed
    ConversationsChanged,

    /// Screen-reader style announcement
    Announcement {
        /// Announcement text
        text: String,
    },

    /// An attachment problem to show in the file alert
    FileError {
        /// Error text
        message: String,
    },

    /// The send control was enabled or disabled
    SendEnabled {
        /// Whether sending is allowed
        enabled: bool,
    },

    /// The widget was shown or hidden
    Visibility {
        /// Whether the widget is visible
        visible: bool,
    },

    /// The display mode changed
    DisplayMode {
        /// New display mode
        mode: DisplayMode,
    },

    /// The history drawer was opened or closed
    Drawer {
        /// Whether the drawer is open
        open: bool,
    },
}
