//! Tool system: schemas, validation, registry and built-in tools.

pub mod arguments;
pub mod builtin;
pub mod registry;
pub mod result;
pub mod schema;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use registry::ToolRegistry;
pub use result::{ConfirmationDetails, ExecuteOptions, ProgressSink, ToolResult};
pub use schema::{ParamType, ParameterSchema};
pub use tool::{AgentTool, ProgressReporter, Tool, ToolExecutionContext};
pub use types::{ParameterBuilder, ToolParameters, ToolSpec};
pub use validation::validate_arguments;
