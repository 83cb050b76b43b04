//! Schema validation helpers.
//!
//! Validates a configuration `serde_json::Value` against a [`Schema`] before
//! it reaches a resource handler, with one diagnostic per problem.
//!
//! # Example
//!
//! ```
//! use select_provider::schema::{Schema, Attribute};
//! use select_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("order", Attribute::optional_int64());
//!
//! let diagnostics = validate(&schema, &json!({"name": "finance", "order": 2}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "finance", "order": "first"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("order".to_string()));
//! ```

use serde_json::Value;

use crate::convert::{json_type_name, UNKNOWN_SENTINEL};
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

/// Validate a configuration value against a schema.
///
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes must not be configured
/// - Unknown values pass type checks; they are validated once known
/// - Attribute types must match the schema
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return diagnostics,
        other => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", json_type_name(other))),
            );
            return diagnostics;
        },
    };

    for (name, attr) in &schema.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    diagnostics
}

/// Validate a value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(_) if attr.is_computed_only() => {
            diagnostics.push(
                Diagnostic::error(format!("Cannot set computed attribute '{}'", path))
                    .with_detail("This attribute is set by the provider")
                    .with_attribute(path),
            );
        },
        Some(Value::String(s)) if s == UNKNOWN_SENTINEL => {},
        Some(v) => validate_attribute_type(attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let ok = match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => is_int64(value),
        AttributeType::Float64 => value.is_number(),
        AttributeType::Bool => value.is_boolean(),
    };
    if !ok {
        diagnostics.push(type_error(path, type_label(attr_type), value));
    }
}

fn type_label(attr_type: AttributeType) -> &'static str {
    match attr_type {
        AttributeType::String => "string",
        AttributeType::Int64 => "int64",
        AttributeType::Float64 => "float64",
        AttributeType::Bool => "bool",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.as_i64().is_some() || n.as_f64().is_some_and(|f| f.fract() == 0.0 && f.is_finite())
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, value: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, json_type_name(value)))
        .with_attribute(path)
}
