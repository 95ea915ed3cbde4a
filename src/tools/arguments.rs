//! Typed access to tool call arguments.

use crate::error::SkiffError;

/// Wrapper around validated tool arguments providing typed extraction.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, SkiffError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| SkiffError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, SkiffError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| SkiffError::InvalidArgument(format!("Missing integer argument: {key}")))
    }

    pub fn get_i64_opt(&self, key: &str) -> Option<i64> {
        self.value.get(key).and_then(|v| v.as_i64())
    }

    /// Get a float argument.
    pub fn get_f64(&self, key: &str) -> Result<f64, SkiffError> {
        self.value
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| SkiffError::InvalidArgument(format!("Missing float argument: {key}")))
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, SkiffError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| SkiffError::InvalidArgument(format!("Missing boolean argument: {key}")))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, SkiffError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            SkiffError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}
