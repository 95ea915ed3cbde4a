//! Structural view of a tool's parameter schema.
//!
//! Tools publish a JSON Schema object. The registry parses it once at
//! registration into a [`ParameterSchema`]: the list of required field names
//! and the declared type tag of every property. Anything outside that shape
//! (nested schemas, enums, ranges) is carried through to the model untouched
//! but not enforced here.

use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::{Result, SkiffError};

/// Declared runtime type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    /// Whether `value` satisfies this type tag.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

/// Required fields and per-field type tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSchema {
    required: Vec<String>,
    properties: Vec<(String, ParamType)>,
}

impl ParameterSchema {
    /// Parse a JSON Schema object.
    ///
    /// Rejects a top-level `type` other than `object`, non-object
    /// `properties`, a `required` list that is not an array of strings, and
    /// any property whose `type` is not a known tag. A property without a
    /// `type` is accepted and left unchecked.
    pub fn parse(schema: &Value) -> Result<Self> {
        let obj = schema.as_object().ok_or_else(|| {
            SkiffError::Configuration(format!(
                "parameter schema must be an object, got {}",
                json_type_name(schema)
            ))
        })?;

        if let Some(kind) = obj.get("type") {
            if kind.as_str() != Some("object") {
                return Err(SkiffError::Configuration(format!(
                    "parameter schema type must be 'object', got {kind}"
                )));
            }
        }

        let mut properties = Vec::new();
        if let Some(props) = obj.get("properties") {
            let props = props.as_object().ok_or_else(|| {
                SkiffError::Configuration("'properties' must be an object".into())
            })?;
            for (name, prop) in props {
                let Some(tag) = prop.get("type") else {
                    continue;
                };
                let tag = tag.as_str().ok_or_else(|| {
                    SkiffError::Configuration(format!("property '{name}' has a non-string type"))
                })?;
                let kind = tag.parse::<ParamType>().map_err(|_| {
                    SkiffError::Configuration(format!(
                        "property '{name}' has unknown type '{tag}'"
                    ))
                })?;
                properties.push((name.clone(), kind));
            }
        }

        let mut required = Vec::new();
        if let Some(list) = obj.get("required") {
            let list = list.as_array().ok_or_else(|| {
                SkiffError::Configuration("'required' must be an array".into())
            })?;
            for entry in list {
                let name = entry.as_str().ok_or_else(|| {
                    SkiffError::Configuration("'required' entries must be strings".into())
                })?;
                required.push(name.to_string());
            }
        }

        Ok(Self {
            required,
            properties,
        })
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Declared type of `field`, if it has one.
    pub fn property_type(&self, field: &str) -> Option<ParamType> {
        self.properties
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, kind)| *kind)
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
