//! Core types for Skiff.

pub mod message;
pub mod usage;

pub use message::*;
pub use usage::*;
