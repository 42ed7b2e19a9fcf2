//! TOML Configuration File Support
//!
//! Configuration for the chat core, read from
//! `$XDG_CONFIG_HOME/lightspeed/chat.toml` (typically
//! `~/.config/lightspeed/chat.toml`).
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables (`LIGHTSPEED_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8080"
//! timeout_secs = 120
//!
//! [chat]
//! system_prompt = "You are a helpful assistant."
//! default_model = "llama3"
//! default_provider = "ollama"
//! no_tools = false
//!
//! [attachments]
//! max_files = 5
//! max_file_size = 26214400
//! attachment_type = "configuration"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default service URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// System prompt sent when none is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Maximum number of files attached to one message
pub const DEFAULT_MAX_FILES: usize = 5;

/// Maximum size of one attached file (25 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 25 * 1024 * 1024;

/// Attachment type sent with every attachment
pub const DEFAULT_ATTACHMENT_TYPE: &str = "configuration";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[api]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// Service base URL
    pub base_url: Option<String>,

    /// Timeout for non-streaming requests in seconds
    pub timeout_secs: Option<u64>,
}

/// `[chat]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// System prompt sent with every query
    pub system_prompt: Option<String>,

    /// Model to select instead of the first LLM the service lists
    pub default_model: Option<String>,

    /// Provider of `default_model`
    pub default_provider: Option<String>,

    /// Ask the service not to use tools
    pub no_tools: Option<bool>,
}

/// `[attachments]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentsToml {
    /// Maximum files per message
    pub max_files: Option<usize>,

    /// Maximum size per file in bytes
    pub max_file_size: Option<u64>,

    /// Attachment type sent to the service
    pub attachment_type: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfigToml {
    /// API section
    pub api: ApiToml,

    /// Chat section
    pub chat: ChatToml,

    /// Attachments section
    pub attachments: AttachmentsToml,
}

// =============================================================================
// Main Configuration Structs
// =============================================================================

/// Connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Service base URL
    pub base_url: String,
    /// Timeout for requests that return a complete body
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Attachment limits
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentLimits {
    /// Maximum files per message
    pub max_files: usize,
    /// Maximum size per file in bytes
    pub max_file_size: u64,
    /// Attachment type sent to the service
    pub attachment_type: String,
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            attachment_type: DEFAULT_ATTACHMENT_TYPE.to_string(),
        }
    }
}

/// Effective configuration of the chat core
///
/// Use [`load_config`] to build one with proper priority handling.
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Connection settings
    pub api: ApiConfig,

    /// System prompt sent with every query
    pub system_prompt: String,

    /// Preferred model (`None` = first LLM listed by the service)
    pub default_model: Option<String>,

    /// Provider of the preferred model
    pub default_provider: Option<String>,

    /// `no_tools` flag sent with queries (`None` = omitted)
    pub no_tools: Option<bool>,

    /// Attachment limits
    pub attachments: AttachmentLimits,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            default_model: None,
            default_provider: None,
            no_tools: None,
            attachments: AttachmentLimits::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ChatConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values that would make the client unusable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api.base_url must not be empty".to_string(),
            ));
        }
        if self.attachments.max_files == 0 {
            return Err(ConfigError::ValidationError(
                "attachments.max_files must be at least 1".to_string(),
            ));
        }
        if self.attachments.max_file_size == 0 {
            return Err(ConfigError::ValidationError(
                "attachments.max_file_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/lightspeed/chat.toml` or
/// `~/.config/lightspeed/chat.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lightspeed").join("chat.toml"))
}

/// Load configuration from the default path, the environment and defaults
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the resulting configuration is invalid. A missing file is not an error.
pub fn load_config() -> Result<ChatConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if validation fails.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatConfig, ConfigError> {
    load_config_with_env(path, |name| std::env::var(name).ok())
}

/// Load configuration, resolving environment variables through `env`
///
/// # Errors
///
/// See [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ChatConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ChatConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ChatConfigToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ChatConfig, toml: &ChatConfigToml) {
    if let Some(ref url) = toml.api.base_url {
        config.api.base_url = url.clone();
    }
    if let Some(secs) = toml.api.timeout_secs {
        config.api.timeout = Duration::from_secs(secs);
    }

    if let Some(ref prompt) = toml.chat.system_prompt {
        config.system_prompt = prompt.clone();
    }
    if toml.chat.default_model.is_some() {
        config.default_model = toml.chat.default_model.clone();
    }
    if toml.chat.default_provider.is_some() {
        config.default_provider = toml.chat.default_provider.clone();
    }
    if toml.chat.no_tools.is_some() {
        config.no_tools = toml.chat.no_tools;
    }

    if let Some(max) = toml.attachments.max_files {
        config.attachments.max_files = max;
    }
    if let Some(size) = toml.attachments.max_file_size {
        config.attachments.max_file_size = size;
    }
    if let Some(ref kind) = toml.attachments.attachment_type {
        config.attachments.attachment_type = kind.clone();
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut ChatConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env("LIGHTSPEED_API_URL") {
        config.api.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env("LIGHTSPEED_TIMEOUT_SECS") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.api.timeout = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        } else {
            tracing::warn!(value = %timeout, "Ignoring invalid LIGHTSPEED_TIMEOUT_SECS");
        }
    }
    if let Some(model) = env("LIGHTSPEED_MODEL") {
        config.default_model = Some(model);
        config.source = ConfigSource::Env;
    }
    if let Some(provider) = env("LIGHTSPEED_PROVIDER") {
        config.default_provider = Some(provider);
        config.source = ConfigSource::Env;
    }
    if let Some(prompt) = env("LIGHTSPEED_SYSTEM_PROMPT") {
        config.system_prompt = prompt;
        config.source = ConfigSource::Env;
    }
    if let Some(no_tools) = env("LIGHTSPEED_NO_TOOLS") {
        config.no_tools = Some(no_tools != "0" && no_tools.to_lowercase() != "false");
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Base URL override
    pub base_url: Option<String>,

    /// Model override
    pub model: Option<String>,

    /// Provider override
    pub provider: Option<String>,

    /// No-tools override
    pub no_tools: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL override
    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set model override
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Set provider override
    #[must_use]
    pub fn with_provider(mut self, provider: String) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set no-tools override
    #[must_use]
    pub fn with_no_tools(mut self, no_tools: bool) -> Self {
        self.no_tools = Some(no_tools);
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the overridden configuration is invalid.
    pub fn apply(&self, config: &mut ChatConfig) -> Result<(), ConfigError> {
        if self.base_url.is_some()
            || self.model.is_some()
            || self.provider.is_some()
            || self.no_tools.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.base_url {
            config.api.base_url = url.clone();
        }
        if let Some(ref model) = self.model {
            config.default_model = Some(model.clone());
        }
        if let Some(ref provider) = self.provider {
            config.default_provider = Some(provider.clone());
        }
        if self.no_tools.is_some() {
            config.no_tools = self.no_tools;
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
