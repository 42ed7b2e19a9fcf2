//! Lightspeed Core - Headless Chat Client for the Lightspeed Assistant
//!
//! This crate holds the whole chat client except the pixels: it talks to the
//! assistant service, folds streamed answers into the transcript, validates
//! and encodes attachments, and keeps the session state (layout, drawer,
//! conversations, model selection) that a surface renders.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Surfaces                              │
//! │     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//! │     │ lightspeed-  │   │     TUI      │   │   Headless   │   │
//! │     │ chat (CLI)   │   │              │   │   / tests    │   │
//! │     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘   │
//! │            └── method calls (up) / ChatUpdate (down) ──┘      │
//! └────────────────────────────┬─────────────────────────────────┘
//!                              │
//! ┌────────────────────────────┼─────────────────────────────────┐
//! │                      LIGHTSPEED CORE                          │
//! │  ┌─────────────────────────┴──────────────────────────────┐  │
//! │  │                    ChatController                       │  │
//! │  │  ┌────────────┐  ┌────────────┐  ┌──────────────────┐  │  │
//! │  │  │ Chatbot    │  │ Stream     │  │ Attachments      │  │  │
//! │  │  │ State      │  │ Reducer    │  │                  │  │  │
//! │  │  └────────────┘  └─────┬──────┘  └──────────────────┘  │  │
//! │  └────────────────────────┼───────────────────────────────┘  │
//! │                   LightspeedApi (reqwest)                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use lightspeed_core::{load_config, ChatController, LightspeedClient};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let client = LightspeedClient::from_config(&config.api)?;
//!     let (tx, mut rx) = mpsc::channel(256);
//!
//!     let mut controller = ChatController::new(client, config).with_updates(tx);
//!     controller.load_models().await;
//!     controller.send("How do I scale a deployment?").await?;
//!
//!     while let Ok(update) = rx.try_recv() {
//!         // Render update
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`api`]: REST client and wire types
//! - [`stream`]: Streaming response decoding and reduction
//! - [`controller`]: The chat controller (send, attachments, conversations)
//! - [`state`]: Session state and UI operations
//! - [`messages`]: Transcript messages and surface updates
//! - [`attachments`]: Attachment validation and encoding
//! - [`conversations`]: Conversation list and history conversion
//! - [`config`]: TOML / environment configuration

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod attachments;
pub mod config;
pub mod controller;
pub mod conversations;
pub mod messages;
pub mod state;
pub mod stream;

// Re-exports for convenience
pub use api::{
    ApiError, ConversationResponse, EventStream, LightspeedApi, LightspeedClient, Model,
    QueryAttachment, QueryRequest, QueryResponse, ToolCallPayload,
};
pub use attachments::{AttachedFile, AttachmentError, AttachmentSet};
pub use controller::{ChatController, ConversationError, SendError};
pub use conversations::{ConversationEntry, ConversationList};
pub use messages::{
    ChatUpdate, Message, MessageActions, MessageId, MessageRole, SourceLink, APOLOGY_MESSAGE,
    BOT_NAME, USER_NAME,
};
pub use state::{ChatbotState, DisplayMode};
pub use stream::{event_stream, StreamEvent, StreamReducer, StreamSink, StreamSummary};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ApiConfig, AttachmentLimits,
    ChatConfig, ChatConfigToml, ConfigError, ConfigOverrides, ConfigSource,
};
