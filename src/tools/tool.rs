//! Tool trait and closure-based tool wrapper.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::result::{ConfirmationDetails, ProgressSink, ToolResult};
use super::types::ToolParameters;
use crate::error::SkiffError;

#[derive(Default)]
struct ReporterState {
    sink: Option<ProgressSink>,
    closed: bool,
}

/// Forwards progress strings to a sink until the call completes.
///
/// The registry closes the reporter as soon as the tool body returns, so a
/// clone that outlives the call (for example inside a spawned task) can no
/// longer deliver anything. Delivery happens under the same lock that
/// `close` takes, so an update is either delivered before the result or
/// not at all.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    state: Arc<Mutex<ReporterState>>,
}

impl ProgressReporter {
    pub fn new(sink: Option<ProgressSink>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReporterState {
                sink,
                closed: false,
            })),
        }
    }

    // A panicking sink must not silence later updates or block `close`.
    fn lock(&self) -> MutexGuard<'_, ReporterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send a status update. Dropped silently once closed or without a sink.
    ///
    /// The sink must not report through this reporter again.
    pub fn report(&self, message: impl Into<String>) {
        let state = self.lock();
        if state.closed {
            return;
        }
        if let Some(sink) = &state.sink {
            sink(message.into());
        }
    }

    /// Stop delivery. Waits for an update already being delivered.
    pub(crate) fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.sink = None;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ProgressReporter")
            .field("has_sink", &state.sink.is_some())
            .field("closed", &state.closed)
            .finish()
    }
}

/// Context available during tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    /// Additional metadata for the tool.
    pub metadata: serde_json::Value,
    /// Tool call id (if provided by the model).
    pub tool_call_id: Option<String>,
    /// Tool name as requested by the model.
    pub tool_name: Option<String>,
    pub progress: ProgressReporter,
}

/// Core tool trait. Implement to create custom tools.
///
/// Only [`name`](Tool::name), [`description`](Tool::description),
/// [`parameters`](Tool::parameters) and [`execute`](Tool::execute) are
/// required. Tools with side effects override
/// [`should_confirm`](Tool::should_confirm) to ask before running.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable label for UI display. Defaults to [`name`](Tool::name).
    fn display_name(&self) -> &str {
        self.name()
    }

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema parameters.
    fn parameters(&self) -> &ToolParameters;

    /// Whether display output is markdown.
    fn is_output_markdown(&self) -> bool {
        false
    }

    /// One-line description of what a specific call will do.
    fn describe(&self, args: &ToolArguments) -> String {
        format!("{}({})", self.name(), args.raw())
    }

    /// Return details when this call needs user confirmation before running.
    fn should_confirm(&self, _args: &ToolArguments) -> Option<ConfirmationDetails> {
        None
    }

    /// Execute the tool with validated arguments.
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<ToolResult, SkiffError>;
}

/// Type alias for the tool handler function.
type ToolHandler = dyn Fn(
        ToolArguments,
        ToolExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, SkiffError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
pub struct AgentTool {
    name: String,
    display_name: Option<String>,
    description: String,
    parameters: ToolParameters,
    requires_confirmation: bool,
    handler: Arc<ToolHandler>,
}

impl AgentTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, SkiffError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            display_name: None,
            description: description.into(),
            parameters,
            requires_confirmation: false,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Ask for confirmation before every call.
    pub fn with_confirmation(mut self) -> Self {
        self.requires_confirmation = true;
        self
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    fn should_confirm(&self, args: &ToolArguments) -> Option<ConfirmationDetails> {
        self.requires_confirmation.then(|| ConfirmationDetails {
            title: format!("Confirm {}", self.display_name()),
            description: self.describe(args),
            tool_name: self.name.clone(),
            params: args.raw().clone(),
        })
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<ToolResult, SkiffError> {
        let value = (self.handler)(args.clone(), ctx.clone()).await?;
        Ok(ToolResult::from_value(value))
    }
}

impl fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("requires_confirmation", &self.requires_confirmation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_reporter_drops_updates() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let reporter = ProgressReporter::new(Some(Arc::new(move |msg: String| {
            sink_seen.lock().unwrap().push(msg);
        })));

        reporter.report("working");
        reporter.clone().close();
        reporter.report("late");

        assert_eq!(*seen.lock().unwrap(), vec!["working".to_string()]);
        assert!(reporter.is_closed());
    }

    #[tokio::test]
    async fn agent_tool_wraps_closure_output() {
        let tool = AgentTool::new(
            "double",
            "Double a number",
            ToolParameters::object().integer("n", "value", true).build(),
            |args, _ctx| async move {
                let n = args.get_i64("n")?;
                Ok(serde_json::json!(n * 2))
            },
        );

        let result = tool
            .execute(
                &ToolArguments::new(serde_json::json!({ "n": 21 })),
                &ToolExecutionContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.model_content, serde_json::json!(42));
        assert_eq!(result.display_content, "42");
        assert_eq!(tool.display_name(), "double");
    }

    #[test]
    fn confirming_tool_describes_call() {
        let tool = AgentTool::new(
            "rm",
            "Remove a file",
            ToolParameters::object().string("path", "file", true).build(),
            |_args, _ctx| async move { Ok(serde_json::Value::Null) },
        )
        .with_display_name("Remove")
        .with_confirmation();

        let details = tool
            .should_confirm(&ToolArguments::new(serde_json::json!({ "path": "a.txt" })))
            .unwrap();

        assert_eq!(details.title, "Confirm Remove");
        assert!(details.description.contains("a.txt"));
        assert_eq!(details.tool_name, "rm");
    }
}
