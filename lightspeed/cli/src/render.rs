//! Terminal rendering of chat updates
//!
//! Streamed answers are printed incrementally: each `MessageContent` update
//! carries the full text so far, and only the unseen suffix is written.

use std::collections::HashMap;

use lightspeed_core::attachments::format_size;
use lightspeed_core::state::NO_MODELS_LABEL;
use lightspeed_core::{ChatUpdate, ChatbotState, Message, MessageId, MessageRole, BOT_NAME};
use tokio::io::{AsyncWriteExt, Stdout};

/// Writes chat updates to stdout
pub struct Renderer {
    out: Stdout,
    /// Text already printed per streaming message
    printed: HashMap<MessageId, String>,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            out: tokio::io::stdout(),
            printed: HashMap::new(),
        }
    }

    pub async fn write(&mut self, text: &str) -> std::io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await
    }

    pub async fn line(&mut self, text: &str) -> std::io::Result<()> {
        self.write(&format!("{text}\n")).await
    }

    pub async fn render(&mut self, update: ChatUpdate) -> std::io::Result<()> {
        match update {
            ChatUpdate::MessageAdded { message } => match message.role {
                MessageRole::User if !message.attachments.is_empty() => {
                    self.line(&format!("  [attached: {}]", message.attachments.join(", ")))
                        .await
                }
                MessageRole::User => Ok(()),
                MessageRole::Bot => {
                    self.printed.insert(message.id, String::new());
                    self.write(&format!("\n{BOT_NAME}: ")).await
                }
            },

            ChatUpdate::MessageContent {
                message_id,
                content,
            } => {
                let delta = self.take_delta(&message_id, &content);
                self.write(&delta).await
            }

            ChatUpdate::ToolExecution { tool, .. } => {
                self.write(&format!("\n  [tool] {tool}\n")).await
            }

            ChatUpdate::ToolCall { payload, .. } => {
                tracing::debug!(%payload, "Tool call");
                Ok(())
            }

            ChatUpdate::MessageFinished { message } => self.finish(&message).await,

            ChatUpdate::FileError { message } => self.line(&format!("! {message}")).await,

            ChatUpdate::DisplayMode { mode } => {
                self.line(&format!("Display mode: {}", mode.label())).await
            }

            ChatUpdate::ConversationChanged {
                conversation_id: Some(id),
            } => {
                tracing::debug!(conversation_id = %id, "Conversation changed");
                Ok(())
            }

            ChatUpdate::Announcement { text } => {
                tracing::trace!(%text, "Announcement");
                Ok(())
            }

            ChatUpdate::ConversationChanged { .. }
            | ChatUpdate::ConversationsChanged
            | ChatUpdate::TranscriptReset { .. }
            | ChatUpdate::SendEnabled { .. }
            | ChatUpdate::Visibility { .. }
            | ChatUpdate::Drawer { .. } => Ok(()),
        }
    }

    /// Unprinted part of `content`, or all of it after a line break if the
    /// text no longer extends what was printed
    fn take_delta(&mut self, id: &MessageId, content: &str) -> String {
        let printed = self.printed.entry(id.clone()).or_default();
        let delta = match content.strip_prefix(printed.as_str()) {
            Some(suffix) => suffix.to_string(),
            None => format!("\n{content}"),
        };
        *printed = content.to_string();
        delta
    }

    async fn finish(&mut self, message: &Message) -> std::io::Result<()> {
        let delta = self.take_delta(&message.id, &message.content);
        self.printed.remove(&message.id);
        self.line(&delta).await?;

        if !message.sources.is_empty() {
            self.line("Sources:").await?;
            for source in &message.sources {
                self.line(&format!("  - {} <{}>", source.title, source.link))
                    .await?;
            }
        }
        self.write("\n").await
    }

    /// Print a whole transcript (after loading a conversation)
    pub async fn transcript(&mut self, state: &ChatbotState) -> std::io::Result<()> {
        for message in &state.messages {
            self.line(&format!("{}: {}", message.role.display_name(), message.content))
                .await?;
            for tool in state.tool_executions_for(&message.id) {
                self.line(&format!("  [tool] {tool}")).await?;
            }
        }
        Ok(())
    }

    /// Print the model menu
    pub async fn models(&mut self, state: &ChatbotState) -> std::io::Result<()> {
        let models = state.llm_models();
        if models.is_empty() {
            return self.line(NO_MODELS_LABEL).await;
        }
        for model in models {
            let marker = if state.selected_model.as_deref() == Some(model.identifier.as_str()) {
                "*"
            } else {
                " "
            };
            self.line(&format!(
                "{marker} {} ({})",
                model.identifier, model.provider_id
            ))
            .await?;
        }
        Ok(())
    }

    /// Print the pending attachments
    pub async fn attachments(&mut self, state: &ChatbotState) -> std::io::Result<()> {
        if state.attachments.is_empty() {
            return self.line("No files attached").await;
        }
        let lines: Vec<String> = state
            .attachments
            .files()
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{}. {} ({}, {})", i + 1, f.name, format_size(f.size), f.content_type))
            .collect();
        for line in lines {
            self.line(&line).await?;
        }
        Ok(())
    }
}
