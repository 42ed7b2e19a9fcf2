//! Lightspeed Chat - Terminal Surface for the Lightspeed Assistant
//!
//! A line-oriented client for the assistant service, built on
//! `lightspeed-core`. Answers stream to stdout as they arrive; logs go to
//! stderr.
//!
//! # Usage
//!
//! ```bash
//! # Interactive chat
//! lightspeed-chat
//!
//! # One question, streamed
//! lightspeed-chat ask "Why is my pod in CrashLoopBackOff?" --attach pod.yaml
//!
//! # One question, without streaming
//! lightspeed-chat query "What is a ReplicaSet?"
//!
//! # Conversations
//! lightspeed-chat show 0f1c...
//! lightspeed-chat delete 0f1c...
//!
//! # Another service
//! lightspeed-chat --api-url https://lightspeed.example.com models
//!
//! # Verbose logging
//! RUST_LOG=debug lightspeed-chat
//! ```

mod commands;
mod render;
mod repl;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lightspeed_core::{
    load_config, load_config_from_path, ChatConfig, ChatController, ConfigOverrides,
    LightspeedApi, LightspeedClient,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use render::Renderer;

/// Capacity of the update channel between controller and renderer
const UPDATE_CHANNEL_CAPACITY: usize = 1024;

/// Lightspeed Chat - terminal client for the Lightspeed assistant
#[derive(Parser, Debug)]
#[command(name = "lightspeed-chat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Assistant service URL
    #[arg(long, value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Model to use
    #[arg(short = 'm', long, global = true)]
    model: Option<String>,

    /// Provider of the model
    #[arg(short = 'p', long, global = true)]
    provider: Option<String>,

    /// Ask the service not to use tools
    #[arg(long, global = true)]
    no_tools: bool,

    /// Configuration file path
    #[arg(short = 'c', long, env = "LIGHTSPEED_CONFIG", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "LIGHTSPEED_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Interactive chat (default)
    Chat,

    /// Ask one question and stream the answer
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Attach a file (repeatable)
        #[arg(short = 'a', long = "attach", value_name = "PATH")]
        attachments: Vec<PathBuf>,
    },

    /// Ask one question without streaming
    Query {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// List available models
    Models,

    /// Print a stored conversation
    Show {
        /// Conversation ID
        conversation_id: String,
    },

    /// Delete a stored conversation
    Delete {
        /// Conversation ID
        conversation_id: String,
    },
}

/// Initialize logging with the specified level
///
/// `RUST_LOG` takes precedence when set. Logs go to stderr so they do not
/// interleave with streamed answers on stdout.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "lightspeed_chat={level},lightspeed_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the configuration file, environment and CLI overrides
fn resolve_config(args: &Args) -> Result<ChatConfig> {
    let mut config = match args.config {
        Some(ref path) => load_config_from_path(Some(path.clone())),
        None => load_config(),
    }
    .context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(ref url) = args.api_url {
        overrides = overrides.with_base_url(url.clone());
    }
    if let Some(ref model) = args.model {
        overrides = overrides.with_model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        overrides = overrides.with_provider(provider.clone());
    }
    if args.no_tools {
        overrides = overrides.with_no_tools(true);
    }
    overrides
        .apply(&mut config)
        .context("Invalid command-line option")?;

    info!(
        base_url = %config.api.base_url,
        source = %config.source(),
        "Configuration loaded"
    );
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = resolve_config(&args)?;
    let client =
        LightspeedClient::from_config(&config.api).context("Failed to create HTTP client")?;

    let (tx, mut rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
    let mut controller = ChatController::new(client, config).with_updates(tx);
    let mut renderer = Renderer::new();

    match args.command.unwrap_or(CliCommand::Chat) {
        CliCommand::Chat => {
            if !controller.api().health_check().await {
                warn!(
                    base_url = %controller.api().base_url(),
                    "Assistant service is not reachable"
                );
            }
            controller.load_models().await;
            repl::run(controller, rx).await?;
        }

        CliCommand::Ask {
            question,
            attachments,
        } => {
            controller.load_models().await;
            for path in attachments {
                repl::run_with_updates(controller.attach_file(path), &mut rx, &mut renderer)
                    .await?
                    .context("Failed to attach file")?;
            }
            let question = question.join(" ");
            repl::run_with_updates(controller.send(&question), &mut rx, &mut renderer)
                .await?
                .context("Request failed")?;
        }

        CliCommand::Query { question } => {
            controller.load_models().await;
            let question = question.join(" ");
            let response =
                repl::run_with_updates(controller.query_once(&question), &mut rx, &mut renderer)
                    .await?
                    .context("Request failed")?;
            if let Some(id) = response.conversation_id {
                info!(conversation_id = %id, "Query answered");
            }
        }

        CliCommand::Models => {
            controller.load_models().await;
            renderer.models(controller.state()).await?;
        }

        CliCommand::Show { conversation_id } => {
            controller
                .select_conversation(&conversation_id)
                .await
                .context("Failed to load conversation")?;
            renderer.transcript(controller.state()).await?;
        }

        CliCommand::Delete { conversation_id } => {
            controller
                .delete_conversation(&conversation_id)
                .await
                .context("Failed to delete conversation")?;
            renderer.line(&format!("Deleted {conversation_id}")).await?;
        }
    }

    Ok(())
}
