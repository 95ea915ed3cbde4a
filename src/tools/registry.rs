//! Name-keyed tool registry with validated, contained dispatch.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};

use super::arguments::ToolArguments;
use super::result::{ExecuteOptions, ToolResult};
use super::schema::ParameterSchema;
use super::tool::{ProgressReporter, Tool, ToolExecutionContext};
use super::types::ToolSpec;
use super::validation::validate_arguments;
use crate::error::{Result, SkiffError};

#[derive(Clone)]
struct RegisteredTool {
    tool: Arc<dyn Tool>,
    schema: ParameterSchema,
}

/// Registered tools in registration order.
///
/// Registering a name that already exists replaces the earlier tool but
/// keeps its position.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    entries: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    ///
    /// Fails with [`SkiffError::Configuration`] for an empty name or a
    /// parameter schema that cannot be parsed.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(SkiffError::Configuration(
                "tool name must not be empty".into(),
            ));
        }
        let schema = ParameterSchema::parse(&tool.parameters().schema).map_err(|e| {
            SkiffError::Configuration(format!("tool '{name}' has an invalid schema: {e}"))
        })?;

        let entry = RegisteredTool { tool, schema };
        match self.index.get(&name) {
            Some(&slot) => {
                warn!(tool = %name, "replacing previously registered tool");
                self.entries[slot] = entry;
            }
            None => {
                debug!(tool = %name, "registered tool");
                self.index.insert(name, self.entries.len());
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Remove a tool by name, returning it if it was registered.
    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        let slot = self.index.remove(name)?;
        let removed = self.entries.remove(slot);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        Some(removed.tool)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| &self.entries[slot].tool)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Specs of all registered tools in registration order.
    ///
    /// The iterator is lazy and can be cloned to walk the list again.
    pub fn list_tools(&self) -> impl Iterator<Item = ToolSpec> + Clone + '_ {
        self.entries
            .iter()
            .map(|entry| ToolSpec::from_tool(entry.tool.as_ref()))
    }

    /// Validate and run a tool.
    ///
    /// Unknown names and schema violations are returned as errors before
    /// anything runs. A tool that asks for confirmation returns a pending
    /// result unless `options.confirmed` is set. Once the body runs, any
    /// failure it produces (including a panic) becomes an error
    /// [`ToolResult`] rather than an `Err`.
    pub async fn execute(
        &self,
        name: &str,
        params: serde_json::Value,
        options: ExecuteOptions,
    ) -> Result<ToolResult> {
        let entry = self
            .index
            .get(name)
            .map(|&slot| &self.entries[slot])
            .ok_or_else(|| SkiffError::ToolNotFound(name.to_string()))?;

        validate_arguments(&params, &entry.schema)
            .map_err(|error| SkiffError::validation(name, error))?;

        let args = ToolArguments::new(params);
        if !options.confirmed {
            if let Some(details) = entry.tool.should_confirm(&args) {
                debug!(tool = %name, "tool call awaiting confirmation");
                return Ok(ToolResult::confirmation_required(details));
            }
        }

        let progress = ProgressReporter::new(options.progress);
        let ctx = ToolExecutionContext {
            metadata: options.metadata,
            tool_call_id: options.tool_call_id,
            tool_name: Some(name.to_string()),
            progress: progress.clone(),
        };

        debug!(tool = %name, call_id = ?ctx.tool_call_id, "executing tool");
        let outcome = AssertUnwindSafe(entry.tool.execute(&args, &ctx))
            .catch_unwind()
            .await;
        progress.close();

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => {
                warn!(tool = %name, error = %error, "tool execution failed");
                ToolResult::error(error.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(tool = %name, panic = %message, "tool panicked");
                ToolResult::error(format!("tool '{name}' panicked: {message}"))
            }
        };
        Ok(result)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.entries.iter().map(|e| e.tool.name()).collect();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
