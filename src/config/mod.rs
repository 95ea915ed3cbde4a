//! Conversation configuration (code, TOML file, or environment).
//!
//! Every constructor validates, so an out-of-range value is reported where
//! the configuration is created rather than in the middle of a turn.

use std::path::Path;
use std::str::FromStr;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkiffError};

pub const DEFAULT_MODEL: &str = "gemini-pro";
pub const DEFAULT_MAX_TOKENS: usize = 8192;
pub const DEFAULT_COMPRESSION_THRESHOLD: f64 = 0.8;
pub const DEFAULT_PRESERVE_RECENT_MESSAGES: usize = 4;
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// Limits and identity of a conversation.
///
/// Built with [`ConversationConfig::builder`] and checked with
/// [`validate`](ConversationConfig::validate), or via [`new`](ConversationConfig::new),
/// [`from_toml_str`](ConversationConfig::from_toml_str),
/// [`load`](ConversationConfig::load) and
/// [`from_env`](ConversationConfig::from_env), which validate for you.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversationConfig {
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    pub model: String,
    #[builder(default = DEFAULT_MAX_TOKENS)]
    pub max_tokens: usize,
    /// Fraction of `max_tokens` at which compression triggers, in `(0, 1]`.
    #[builder(default = DEFAULT_COMPRESSION_THRESHOLD)]
    pub compression_threshold: f64,
    /// Trailing messages never summarized away.
    #[builder(default = DEFAULT_PRESERVE_RECENT_MESSAGES)]
    pub preserve_recent_messages: usize,
    /// Upper bound on model round-trips that request tools within one turn.
    #[builder(default = DEFAULT_MAX_TOOL_ROUNDS)]
    pub max_tool_rounds: usize,
    /// Appended to the system prompt under `# User Context`.
    #[builder(into)]
    pub user_memory: Option<String>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            preserve_recent_messages: DEFAULT_PRESERVE_RECENT_MESSAGES,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            user_memory: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    conversation: ConversationConfig,
}

impl ConversationConfig {
    /// Validated config with default tool rounds and no user memory.
    pub fn new(
        model: impl Into<String>,
        max_tokens: usize,
        compression_threshold: f64,
        preserve_recent_messages: usize,
    ) -> Result<Self> {
        Self::builder()
            .model(model)
            .max_tokens(max_tokens)
            .compression_threshold(compression_threshold)
            .preserve_recent_messages(preserve_recent_messages)
            .build()
            .validate()
    }

    /// Check every limit, returning the config unchanged when valid.
    pub fn validate(self) -> Result<Self> {
        if self.max_tokens == 0 {
            return Err(SkiffError::Configuration(
                "max_tokens must be greater than 0".into(),
            ));
        }
        let t = self.compression_threshold;
        if !t.is_finite() || t <= 0.0 || t > 1.0 {
            return Err(SkiffError::Configuration(format!(
                "compression_threshold must be in (0, 1], got {t}"
            )));
        }
        if self.max_tool_rounds == 0 {
            return Err(SkiffError::Configuration(
                "max_tool_rounds must be at least 1".into(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(SkiffError::Configuration("model must not be empty".into()));
        }
        Ok(self)
    }

    /// Parse a `[conversation]` table. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(source)
            .map_err(|e| SkiffError::Configuration(format!("invalid config file: {e}")))?;
        file.conversation.validate()
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Load from `SKIFF_*` environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(model) = lookup("SKIFF_MODEL") {
            config.model = model;
        }
        if let Some(value) = lookup("SKIFF_MAX_TOKENS") {
            config.max_tokens = parse_var("SKIFF_MAX_TOKENS", &value)?;
        }
        if let Some(value) = lookup("SKIFF_COMPRESSION_THRESHOLD") {
            config.compression_threshold = parse_var("SKIFF_COMPRESSION_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("SKIFF_PRESERVE_RECENT_MESSAGES") {
            config.preserve_recent_messages = parse_var("SKIFF_PRESERVE_RECENT_MESSAGES", &value)?;
        }
        if let Some(value) = lookup("SKIFF_MAX_TOOL_ROUNDS") {
            config.max_tool_rounds = parse_var("SKIFF_MAX_TOOL_ROUNDS", &value)?;
        }
        if let Some(memory) = lookup("SKIFF_USER_MEMORY") {
            config.user_memory = Some(memory);
        }
        config.validate()
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| SkiffError::Configuration(format!("{key}={value:?} is invalid: {e}")))
}
