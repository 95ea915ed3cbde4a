//! Error types for Skiff.

use std::fmt;

use thiserror::Error;

/// A single parameter that failed schema validation.
///
/// `field` is `$` when the parameters as a whole have the wrong shape
/// (for example, an array where an object was expected).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub expected: String,
    pub actual: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// A required field was not supplied.
    pub fn missing(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::new(field, expected, "missing")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}' expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Primary error type for all Skiff operations.
#[derive(Error, Debug)]
pub enum SkiffError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters for tool '{tool}': {error}")]
    ToolValidation {
        tool: String,
        error: ValidationError,
    },

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Tool loop exceeded {max_rounds} rounds")]
    TooManyToolRounds { max_rounds: usize },

    #[error("Conversation is busy: a turn is already in flight")]
    ConversationBusy,

    #[error("Model error: {0}")]
    Model(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Tool,
    Compression,
    Turn,
    Model,
    Serialization,
    Io,
}

impl SkiffError {
    /// Build a tool execution error. Tools return this from their body; the
    /// registry turns it into an error [`ToolResult`](crate::tools::ToolResult).
    pub fn tool_execution(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Build a validation error for `tool`.
    pub fn validation(tool: impl Into<String>, error: ValidationError) -> Self {
        Self::ToolValidation {
            tool: tool.into(),
            error,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::ToolNotFound(_)
            | Self::ToolValidation { .. }
            | Self::ToolExecution { .. }
            | Self::InvalidArgument(_) => ErrorCategory::Tool,
            Self::CompressionFailed(_) => ErrorCategory::Compression,
            Self::TooManyToolRounds { .. } | Self::ConversationBusy => ErrorCategory::Turn,
            Self::Model(_) => ErrorCategory::Model,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Io(_) => ErrorCategory::Io,
        }
    }

    /// Whether this error aborts the current turn.
    ///
    /// Tool-local failures are recovered as tool results and compression
    /// failures are skipped; everything else ends the turn without touching
    /// the conversation.
    pub fn is_turn_fatal(&self) -> bool {
        !matches!(
            self.category(),
            ErrorCategory::Tool | ErrorCategory::Compression
        )
    }

    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Model(_) | Self::ConversationBusy)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SkiffError>;
