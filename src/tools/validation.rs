//! Validate tool call arguments against a parsed parameter schema before execution.

use serde_json::Value;

use super::schema::{json_type_name, ParameterSchema};
use crate::error::ValidationError;

/// Validate tool arguments against a [`ParameterSchema`].
///
/// Checks, in order: the arguments are an object, every required field is
/// present, and every supplied field with a declared type matches it.
/// Returns the first violation found. Fields not named by the schema are
/// accepted.
pub fn validate_arguments(args: &Value, schema: &ParameterSchema) -> Result<(), ValidationError> {
    let Some(obj) = args.as_object() else {
        return Err(ValidationError::new("$", "object", json_type_name(args)));
    };

    for field in schema.required() {
        if !obj.contains_key(field) {
            let expected = schema
                .property_type(field)
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "any".to_string());
            return Err(ValidationError::missing(field.clone(), expected));
        }
    }

    for (key, value) in obj {
        if let Some(expected) = schema.property_type(key) {
            if !expected.matches(value) {
                return Err(ValidationError::new(
                    key.clone(),
                    expected.to_string(),
                    json_type_name(value),
                ));
            }
        }
    }

    Ok(())
}
