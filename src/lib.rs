//! Skiff: a minimal agent runtime.
//!
//! Register tools, let a model call them with validated parameters, and keep
//! a long-running conversation inside its token budget by summarizing older
//! history.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use skiff::prelude::*;
//! use skiff::tools::builtin::register_builtin_tools;
//!
//! # async fn example(backend: Arc<dyn ModelBackend>) -> skiff::error::Result<()> {
//! let mut registry = ToolRegistry::new();
//! register_builtin_tools(&mut registry)?;
//!
//! let client = ConversationClient::new(ConversationConfig::from_env()?, backend, registry)?;
//! let outcome = client.send_message("What is 2 + 3 * 4?").await?;
//! println!("{}", outcome.text);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod prelude;
pub mod tools;
pub mod types;
