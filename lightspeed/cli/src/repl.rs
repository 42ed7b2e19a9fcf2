//! Interactive chat loop

use std::future::Future;

use anyhow::Result;
use lightspeed_core::{ChatController, ChatUpdate, LightspeedApi};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::commands::{self, Command, HELP};
use crate::render::Renderer;

/// Drive `operation` while rendering the updates it produces
///
/// Updates still queued when the operation finishes are rendered before
/// returning, so output never trails behind the next prompt.
pub async fn run_with_updates<F, T>(
    operation: F,
    rx: &mut mpsc::Receiver<ChatUpdate>,
    renderer: &mut Renderer,
) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::pin!(operation);

    let output = loop {
        tokio::select! {
            output = &mut operation => break output,
            Some(update) = rx.recv() => renderer.render(update).await?,
        }
    };

    while let Ok(update) = rx.try_recv() {
        renderer.render(update).await?;
    }
    Ok(output)
}

/// Run the interactive loop until `/quit`, end of input or Ctrl-C
pub async fn run<A: LightspeedApi>(
    mut controller: ChatController<A>,
    mut rx: mpsc::Receiver<ChatUpdate>,
) -> Result<()> {
    let mut renderer = Renderer::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    renderer
        .line("Lightspeed chat. Type /help for commands, /quit to exit.")
        .await?;
    if let Some(ref model) = controller.state().selected_model {
        renderer.line(&format!("Model: {model}")).await?;
    }

    loop {
        renderer.write("> ").await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                None
            }
        };
        let Some(line) = line else {
            renderer.write("\n").await?;
            break;
        };

        let command = match commands::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                renderer.line(&message).await?;
                continue;
            }
        };

        match command {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => renderer.line(HELP).await?,

            Command::Send(text) => {
                let result =
                    run_with_updates(controller.send(&text), &mut rx, &mut renderer).await?;
                if let Err(e) = result {
                    warn!(error = %e, "Send failed");
                    renderer.line(&format!("! {e}")).await?;
                }
            }

            Command::Attach(path) => {
                let result =
                    run_with_updates(controller.attach_file(path), &mut rx, &mut renderer).await?;
                if result.is_ok() {
                    renderer.attachments(controller.state()).await?;
                }
            }

            Command::Detach(n) => match controller.remove_attachment(n - 1) {
                Some(file) => renderer.line(&format!("Removed {}", file.name)).await?,
                None => renderer.line(&format!("No attachment number {n}")).await?,
            },

            Command::Attachments => renderer.attachments(controller.state()).await?,

            Command::Models => renderer.models(controller.state()).await?,

            Command::Model(id) => {
                if controller.select_model(&id) {
                    renderer.line(&format!("Model: {id}")).await?;
                } else {
                    renderer.line(&format!("Unknown model {id} (see /models)")).await?;
                }
            }

            Command::Mode(mode) => {
                controller.set_display_mode(mode);
                run_with_updates(async {}, &mut rx, &mut renderer).await?;
            }

            Command::History(filter) => {
                let entries = controller.search_conversations(filter.as_deref().unwrap_or(""));
                if entries.is_empty() {
                    renderer.line("No conversations").await?;
                }
                let current = controller.state().current_conversation_id.clone();
                for entry in entries {
                    let marker = if current.as_deref() == Some(entry.id.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    renderer
                        .line(&format!("{marker} {}  {}", entry.id, entry.text))
                        .await?;
                }
                run_with_updates(async {}, &mut rx, &mut renderer).await?;
            }

            Command::Open(id) => {
                let result =
                    run_with_updates(controller.select_conversation(&id), &mut rx, &mut renderer)
                        .await?;
                match result {
                    Ok(()) => renderer.transcript(controller.state()).await?,
                    Err(e) => renderer.line(&format!("! {e}")).await?,
                }
            }

            Command::Delete(id) => {
                let result =
                    run_with_updates(controller.delete_conversation(&id), &mut rx, &mut renderer)
                        .await?;
                match result {
                    Ok(()) => renderer.line(&format!("Deleted {id}")).await?,
                    Err(e) => renderer.line(&format!("! {e}")).await?,
                }
            }

            Command::New => {
                controller.new_chat();
                run_with_updates(async {}, &mut rx, &mut renderer).await?;
                renderer.line("New chat").await?;
            }
        }
    }

    Ok(())
}
