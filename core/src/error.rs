//! Violation records and schema misconfiguration errors.
//!
//! Two very different failure modes live here:
//!
//! - [`ValidationError`] is a *value*: one violation of a field's contract
//!   caused by user input. Validation never fails with it, it returns it.
//! - [`SchemaError`] is an *error*: a schema was built in a way that cannot
//!   be evaluated (for example a numeric bound referencing a string field).
//!   It surfaces through `Err` from every validation entry point.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Kind tag for a missing required value.
pub const REQUIRED: &str = "required";

/// A single violation produced while validating a field.
///
/// `kind` is `"required"` for a missing value, the schema kind (e.g.
/// `"number"`) when coercion failed, and `"<kind>.<rule>"` (e.g.
/// `"number.min"`) when a rule rejected the coerced value.
///
/// # Examples
///
/// ```
/// use chat_command_core::ValidationError;
///
/// let err = ValidationError::required("count");
/// assert_eq!(err.kind, "required");
/// assert_eq!(err.field, "count");
/// assert_eq!(err.to_string(), "`count` is required");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Dotted path of the offending value (`"ids.2"` for an array element).
    pub field: String,
    /// Violation kind tag.
    pub kind: String,
    /// The value that was rejected (`null` when it was missing).
    pub value: Value,
    /// Human-readable message.
    pub message: String,
}

impl ValidationError {
    /// Creates a `required` violation for a missing value.
    pub fn required(field: &str) -> Self {
        Self {
            field: field.to_string(),
            kind: REQUIRED.to_string(),
            value: Value::Null,
            message: format!("`{}` is required", label(field)),
        }
    }

    /// Creates a coercion violation: `raw` could not be read as `kind`.
    pub fn coercion(field: &str, kind: &str, raw: &Value) -> Self {
        Self {
            field: field.to_string(),
            kind: kind.to_string(),
            value: raw.clone(),
            message: format!("`{}` must be a valid {kind}", label(field)),
        }
    }

    /// Creates a rule violation tagged `<kind>.<rule>`.
    pub fn rule(field: &str, kind: &str, rule: &str, value: Value, message: String) -> Self {
        Self {
            field: field.to_string(),
            kind: format!("{kind}.{rule}"),
            value,
            message,
        }
    }

    /// Returns `true` for a missing-value violation.
    pub fn is_required(&self) -> bool {
        self.kind == REQUIRED
    }
}

/// Schema misconfiguration detected while evaluating a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A rule bound references a field whose coerced value has the wrong type.
    #[error("rule `{rule}` on `{field}` expects `{reference}` to be a {expected}, found a {found}")]
    ReferenceType {
        rule: String,
        field: String,
        reference: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A custom rule reported that it cannot be evaluated.
    #[error("rule `{rule}` on `{field}` is misconfigured: {reason}")]
    InvalidRule {
        rule: String,
        field: String,
        reason: String,
    },
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Label used in messages: the field path, or `value` for an anonymous
/// top-level schema.
pub(crate) fn label(field: &str) -> &str {
    if field.is_empty() { "value" } else { field }
}

/// JSON type name of `value`, used in misconfiguration reports.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_required_uses_value_label_for_anonymous_field() {
        let err = ValidationError::required("");
        assert_eq!(err.message, "`value` is required");
        assert!(err.is_required());
    }

    #[test]
    fn test_rule_kind_is_qualified() {
        let err = ValidationError::rule("n", "number", "min", json!(1), "too small".into());
        assert_eq!(err.kind, "number.min");
        assert_eq!(err.to_string(), "too small");
    }

    #[test]
    fn test_violation_serializes_record_fields() {
        let err = ValidationError::coercion("n", "number", &json!("abc"));
        let encoded = serde_json::to_value(&err).unwrap();
        assert_eq!(encoded["field"], "n");
        assert_eq!(encoded["kind"], "number");
        assert_eq!(encoded["value"], "abc");
    }
}
