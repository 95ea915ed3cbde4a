//! Tool results, confirmation requests and per-call execution options.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Callback receiving progress strings while a tool runs.
pub type ProgressSink = Arc<dyn Fn(String) + Send + Sync>;

/// What the caller needs to decide before a tool with side effects runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfirmationDetails {
    pub title: String,
    /// The tool's own description of what this call will do.
    pub description: String,
    pub tool_name: String,
    pub params: serde_json::Value,
}

/// Outcome of a tool invocation.
///
/// `model_content` goes back to the model; `display_content` is for people.
/// Both are always populated, including for errors and rejections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub model_content: serde_json::Value,
    pub display_content: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<ConfirmationDetails>,
}

impl ToolResult {
    pub fn new(model_content: serde_json::Value, display_content: impl Into<String>) -> Self {
        Self {
            model_content,
            display_content: display_content.into(),
            is_error: false,
            confirmation: None,
        }
    }

    /// Plain text result, identical for model and display.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(serde_json::Value::String(text.clone()), text)
    }

    /// Wrap a JSON value; strings display as-is, anything else as compact JSON.
    pub fn from_value(value: serde_json::Value) -> Self {
        let display = match &value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self::new(value, display)
    }

    /// A failed invocation.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            model_content: serde_json::json!({ "error": message }),
            display_content: format!("Error: {message}"),
            is_error: true,
            confirmation: None,
        }
    }

    /// A pending call that must be confirmed before it runs.
    pub fn confirmation_required(details: ConfirmationDetails) -> Self {
        Self {
            model_content: serde_json::json!({
                "status": "confirmation_required",
                "tool": details.tool_name,
            }),
            display_content: format!("{}: {}", details.title, details.description),
            is_error: false,
            confirmation: Some(details),
        }
    }

    /// A call the user declined. The tool body never ran.
    pub fn rejected(details: &ConfirmationDetails) -> Self {
        let message = format!("Execution of '{}' was rejected by the user", details.tool_name);
        Self {
            model_content: serde_json::json!({ "error": message }),
            display_content: message,
            is_error: true,
            confirmation: None,
        }
    }

    pub fn requires_confirmation(&self) -> bool {
        self.confirmation.is_some()
    }

    /// Content string for the tool message appended to the conversation.
    pub fn model_text(&self) -> String {
        match &self.model_content {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Per-call options for [`ToolRegistry::execute`](super::ToolRegistry::execute).
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    /// The call was already confirmed; skip the confirmation phase.
    pub confirmed: bool,
    pub progress: Option<ProgressSink>,
    pub tool_call_id: Option<String>,
    pub metadata: serde_json::Value,
}

impl ExecuteOptions {
    pub fn confirmed() -> Self {
        Self {
            confirmed: true,
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }
}

impl fmt::Debug for ExecuteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("confirmed", &self.confirmed)
            .field("progress", &self.progress.is_some())
            .field("tool_call_id", &self.tool_call_id)
            .finish()
    }
}
