//! Schema Validator: structural conformance checks before persistence
//!
//! Shape documents are JSON-Schema-like files. Only the top-level
//! `required` list and the primitive `type` of each entry in `properties`
//! are enforced. Enums, ranges, nested shapes and patterns are left to the
//! callers.

pub mod shapes;

pub use shapes::{causal_graph_shape, episode_shape, install_default_schemas};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::{MemoryError, Result};

/// Parsed shape document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Shape {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyShape>,
}

/// Per-field shape; only `type` is consulted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyShape {
    #[serde(rename = "type", default)]
    pub kind: Option<Value>,
}

impl Shape {
    /// Read a shape document from disk
    pub fn load(path: &Path, kind: &str) -> Result<Self> {
        if !path.is_file() {
            return Err(MemoryError::SchemaMissing {
                path: path.to_path_buf(),
                kind: kind.to_string(),
            });
        }

        let contents = fs::read_to_string(path).map_err(|e| MemoryError::SchemaUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&contents).map_err(|e| MemoryError::SchemaUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Collect every violation of this shape in `data`
    pub fn violations(&self, data: &Value) -> Vec<String> {
        let Some(object) = data.as_object() else {
            return vec![format!("Expected object, got {}", type_name(data))];
        };

        let mut errors = Vec::new();

        for field in &self.required {
            if !object.contains_key(field) {
                errors.push(format!("Missing required field: '{}'", field));
            }
        }

        for (field, property) in &self.properties {
            let Some(value) = object.get(field) else {
                continue;
            };
            let Some(expected) = property.kind.as_ref().and_then(Value::as_str) else {
                continue;
            };

            let matches = match expected {
                "string" => value.is_string() || value.is_null(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                "number" => value.is_number(),
                _ => true,
            };

            if !matches {
                errors.push(format!(
                    "Field '{}' should be {}, got {}",
                    field,
                    expected,
                    type_name(value)
                ));
            }
        }

        errors
    }
}

/// Validate `data` against the shape document at `shape_file`
///
/// Fails with [`MemoryError::SchemaMissing`] when the document is absent,
/// [`MemoryError::Serialization`] when `data` has no JSON form, and
/// [`MemoryError::SchemaViolation`] listing every offending field otherwise.
pub fn validate<T: Serialize>(data: &T, shape_file: &Path, kind: &str) -> Result<()> {
    let shape = Shape::load(shape_file, kind)?;
    let value = serde_json::to_value(data)?;

    let violations = shape.violations(&value);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(MemoryError::SchemaViolation {
            kind: kind.to_string(),
            violations,
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
