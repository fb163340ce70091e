//! Validation of a flat argument list against a named schema map.
//!
//! [`Validator::validate`] runs two passes over the fields in declaration
//! order:
//!
//! 1. **Coercion**: each present token is coerced and stored in a
//!    [`ValueStore`]. A missing required field or an uncoercible token ends
//!    the call with that single field's error.
//! 2. **Rules**: every coerced field runs its rule chain against the shared
//!    store, so a rule on `b` can read `a`'s coerced value whatever their
//!    relative order.
//!
//! # Example
//!
//! ```
//! use chat_command_core::*;
//!
//! let schema = SchemaMap::new()
//!     .field("sides", NumberSchema::new().integer().min(2))
//!     .field("count", NumberSchema::new().integer().positive().optional());
//!
//! let outcome = Validator::default().validate(&["20"], &schema).unwrap();
//! let args = outcome.into_result().unwrap();
//! assert_eq!(args.get_i64("sides"), Some(20));
//! assert!(args.get("count").unwrap().is_null());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::schema::{Schema, ValidateOptions};
use crate::store::{StoreEntry, ValueStore};

/// Call-wide validation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Report at most one violation per field.
    pub abort_early: bool,
    /// Return coerced values instead of raw tokens.
    pub coerce: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            abort_early: true,
            coerce: true,
        }
    }
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    schema: Arc<dyn Schema>,
}

/// Ordered field name → schema map describing a command's arguments.
///
/// Tokens are assigned positionally. A map may end with a *rest* field that
/// consumes every remaining token: joined with single spaces for scalar
/// schemas, or as a list for an [`ArraySchema`](crate::ArraySchema).
///
/// # Examples
///
/// ```
/// use chat_command_core::*;
///
/// let schema = SchemaMap::new()
///     .field("user", StringSchema::new())
///     .rest("reason", StringSchema::new().optional());
///
/// let args = Validator::default()
///     .validate(&["bob", "spamming", "links"], &schema)
///     .unwrap()
///     .into_result()
///     .unwrap();
/// assert_eq!(args.get_str("reason"), Some("spamming links"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaMap {
    fields: Vec<Field>,
    rest_index: Option<usize>,
}

impl SchemaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional field.
    pub fn field(self, name: impl Into<String>, schema: impl Schema + 'static) -> Self {
        self.field_shared(name, Arc::new(schema))
    }

    /// Appends a positional field backed by a shared schema.
    pub fn field_shared(mut self, name: impl Into<String>, schema: Arc<dyn Schema>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            schema,
        });
        self
    }

    /// Appends a field consuming every remaining token.
    pub fn rest(mut self, name: impl Into<String>, schema: impl Schema + 'static) -> Self {
        self.rest_index = Some(self.fields.len());
        self.field(name, schema)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Schema>> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.schema)
    }

    /// Name of the rest field, if any.
    pub fn rest_field(&self) -> Option<&str> {
        self.rest_index
            .and_then(|i| self.fields.get(i))
            .map(|f| f.name.as_str())
    }

    /// `false` when a field was declared after the rest field.
    pub fn rest_is_last(&self) -> bool {
        self.rest_index.is_none_or(|i| i + 1 == self.fields.len())
    }

    /// First field name declared more than once.
    pub fn duplicate_field(&self) -> Option<&str> {
        self.fields.iter().enumerate().find_map(|(i, field)| {
            self.fields[..i]
                .iter()
                .any(|earlier| earlier.name == field.name)
                .then_some(field.name.as_str())
        })
    }

    /// Distributes `tokens` over the fields.
    fn assign<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<Option<Value>> {
        let assigned = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                if self.rest_index == Some(index) {
                    let remaining = tokens.get(index..).unwrap_or_default();
                    if remaining.is_empty() {
                        None
                    } else if field.schema.kind() == "array" {
                        Some(Value::Array(
                            remaining
                                .iter()
                                .map(|t| Value::String(t.as_ref().to_string()))
                                .collect(),
                        ))
                    } else {
                        let joined: Vec<&str> = remaining.iter().map(|t| t.as_ref()).collect();
                        Some(Value::String(joined.join(" ")))
                    }
                } else {
                    tokens
                        .get(index)
                        .map(|t| Value::String(t.as_ref().to_string()))
                }
            })
            .collect();

        if self.rest_index.is_none() && tokens.len() > self.fields.len() {
            debug!(
                surplus = tokens.len() - self.fields.len(),
                "Ignoring surplus argument tokens"
            );
        }

        assigned
    }
}

/// Final values keyed by field name.
///
/// Absent optional fields are present with a `null` value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResults {
    values: BTreeMap<String, Value>,
}

impl ValidationResults {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    pub fn get_array(&self, field: &str) -> Option<&Vec<Value>> {
        self.get(field).and_then(Value::as_array)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn insert(&mut self, field: &str, value: Value) {
        self.values.insert(field.to_string(), value);
    }
}

/// Violations keyed by field name. Every listed field has at least one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<ValidationError>>,
}

impl ValidationErrors {
    /// Errors object holding one violation for one field.
    pub fn single(field: &str, error: ValidationError) -> Self {
        let mut errors = Self::default();
        errors.insert(field, vec![error]);
        errors
    }

    pub fn get(&self, field: &str) -> Option<&[ValidationError]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Names of the failing fields.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ValidationError])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Every violation message, field by field.
    pub fn messages(&self) -> Vec<String> {
        self.fields
            .values()
            .flatten()
            .map(|e| e.message.clone())
            .collect()
    }

    fn insert(&mut self, field: &str, errors: Vec<ValidationError>) {
        if !errors.is_empty() {
            self.fields.insert(field.to_string(), errors);
        }
    }
}

/// Result of validating an argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid(ValidationResults),
    Invalid(ValidationErrors),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn into_result(self) -> std::result::Result<ValidationResults, ValidationErrors> {
        match self {
            Self::Valid(results) => Ok(results),
            Self::Invalid(errors) => Err(errors),
        }
    }
}

/// Validates argument tokens against a [`SchemaMap`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    options: ValidatorOptions,
}

impl Validator {
    pub fn new(options: ValidatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ValidatorOptions {
        self.options
    }

    /// Validates raw string tokens, assigned positionally.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`](crate::SchemaError) when a rule is
    /// misconfigured. Invalid input is reported as
    /// [`ValidationOutcome::Invalid`].
    pub fn validate<S: AsRef<str>>(
        &self,
        tokens: &[S],
        schema: &SchemaMap,
    ) -> Result<ValidationOutcome> {
        self.validate_values(schema.assign(tokens), schema)
    }

    /// Validates pre-assigned raw values, one per field in declaration order.
    /// Missing trailing entries count as absent.
    ///
    /// # Errors
    ///
    /// Same as [`Validator::validate`].
    pub fn validate_values(
        &self,
        mut assigned: Vec<Option<Value>>,
        schema: &SchemaMap,
    ) -> Result<ValidationOutcome> {
        assigned.resize(schema.fields.len(), None);

        let mut store = ValueStore::new();
        let mut results = ValidationResults::default();

        for (field, raw) in schema.fields.iter().zip(&assigned) {
            let options = self.field_options(&field.name);
            let Some(raw) = raw else {
                if field.schema.is_optional() {
                    results.insert(&field.name, Value::Null);
                    continue;
                }
                return Ok(ValidationOutcome::Invalid(ValidationErrors::single(
                    &field.name,
                    ValidationError::required(&field.name),
                )));
            };

            match field.schema.coerce(raw, &options) {
                Ok(value) => store.insert(
                    field.name.clone(),
                    StoreEntry {
                        value,
                        kind: field.schema.kind(),
                        raw_value: raw.clone(),
                    },
                ),
                Err(error) => {
                    return Ok(ValidationOutcome::Invalid(ValidationErrors::single(
                        &field.name,
                        error,
                    )));
                }
            }
        }

        let mut errors = ValidationErrors::default();
        for (field, raw) in schema.fields.iter().zip(&assigned) {
            let (Some(raw), Some(entry)) = (raw, store.get(&field.name)) else {
                continue;
            };
            let options = self.field_options(&field.name);
            let outcome = field
                .schema
                .evaluate(entry.value.clone(), raw, &options, &store)?;
            if outcome.pass() {
                results.insert(&field.name, outcome.value);
            } else {
                errors.insert(&field.name, outcome.errors);
            }
        }

        if errors.is_empty() {
            Ok(ValidationOutcome::Valid(results))
        } else {
            Ok(ValidationOutcome::Invalid(errors))
        }
    }

    fn field_options(&self, field: &str) -> ValidateOptions {
        ValidateOptions {
            abort_early: self.options.abort_early,
            coerce: self.options.coerce,
            path: Some(field.to_string()),
            parent: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{ArraySchema, BooleanSchema, Limit, NumberSchema, SchemaBuilder, StringSchema};

    fn collect_all() -> Validator {
        Validator::new(ValidatorOptions {
            abort_early: false,
            coerce: true,
        })
    }

    #[test]
    fn test_missing_required_field_is_single_error() {
        let schema = SchemaMap::new()
            .field("a", NumberSchema::new())
            .field("b", NumberSchema::new());
        let errors = Validator::default()
            .validate(&["1"], &schema)
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("b").unwrap()[0].kind, "required");
    }

    #[test]
    fn test_missing_optional_field_does_not_stop_later_fields() {
        let schema = SchemaMap::new()
            .field("a", NumberSchema::new())
            .field_shared("b", Arc::new(StringSchema::new().optional()))
            .field("c", BooleanSchema::new().optional());
        let args = Validator::default()
            .validate_values(vec![Some(json!("1")), None, Some(json!("yes"))], &schema)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(args.get_i64("a"), Some(1));
        assert_eq!(args.get("b"), Some(&Value::Null));
        assert_eq!(args.get_bool("c"), Some(true));
    }

    #[test]
    fn test_coercion_failure_short_circuits() {
        let schema = SchemaMap::new()
            .field("a", NumberSchema::new())
            .field("b", NumberSchema::new().min(100));
        let errors = collect_all()
            .validate(&["x", "1"], &schema)
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), ["a"]);
        assert_eq!(errors.get("a").unwrap()[0].kind, "number");
    }

    #[test]
    fn test_rule_failures_collected_across_fields() {
        let schema = SchemaMap::new()
            .field("a", NumberSchema::new().min(10).integer())
            .field("b", StringSchema::new().max(1));
        let errors = collect_all()
            .validate(&["1.5", "abc"], &schema)
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(errors.get("a").unwrap().len(), 2);
        assert_eq!(errors.get("b").unwrap().len(), 1);
        assert_eq!(errors.messages().len(), 3);
    }

    #[test]
    fn test_abort_early_limits_each_field_to_one_violation() {
        let schema = SchemaMap::new()
            .field("a", NumberSchema::new().min(10).integer())
            .field("b", StringSchema::new().max(1).pattern(regex::Regex::new("^z").unwrap()));
        let errors = Validator::default()
            .validate(&["1.5", "abc"], &schema)
            .unwrap()
            .into_result()
            .unwrap_err();
        assert!(errors.iter().all(|(_, list)| list.len() == 1));
    }

    #[test]
    fn test_reference_sees_coerced_value_of_earlier_field() {
        let schema = SchemaMap::new()
            .field("a", NumberSchema::new())
            .field(
                "b",
                NumberSchema::new().rule("after_a", |ctx| {
                    let a = ctx.reference("a").map(|entry| entry.value.clone());
                    Ok(a == Some(json!(5)) && ctx.value.as_i64() > Some(5))
                }),
            );
        let outcome = Validator::default().validate(&[" 5 ", "6"], &schema).unwrap();
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_reference_to_later_field_resolves_in_rule_pass() {
        let schema = SchemaMap::new()
            .field("low", NumberSchema::new().less(Limit::reference("high")))
            .field("high", NumberSchema::new());
        assert!(Validator::default().validate(&["1", "2"], &schema).unwrap().is_valid());
        assert!(!Validator::default().validate(&["3", "2"], &schema).unwrap().is_valid());
    }

    #[test]
    fn test_raw_mode_returns_tokens() {
        let schema = SchemaMap::new().field("n", NumberSchema::new());
        let validator = Validator::new(ValidatorOptions {
            abort_early: true,
            coerce: false,
        });
        let args = validator
            .validate(&["007"], &schema)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(args.get("n"), Some(&json!("007")));
    }

    #[test]
    fn test_rest_array_collects_remaining_tokens() {
        let schema = SchemaMap::new()
            .field("op", StringSchema::new())
            .rest("values", ArraySchema::of(NumberSchema::new()).min(1));
        let args = Validator::default()
            .validate(&["sum", "1", "2", "3"], &schema)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(args.get("values"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn test_array_element_errors_are_path_qualified() {
        let schema = SchemaMap::new().rest("ids", ArraySchema::of(NumberSchema::new().positive()));
        let errors = collect_all()
            .validate(&["1", "-2", "-3"], &schema)
            .unwrap()
            .into_result()
            .unwrap_err();
        let fields: Vec<_> = errors.get("ids").unwrap().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["ids.1", "ids.2"]);
    }

    #[test]
    fn test_misconfigured_reference_is_an_error() {
        let schema = SchemaMap::new()
            .field("name", StringSchema::new())
            .field("n", NumberSchema::new().max(Limit::reference("name")));
        let err = Validator::default().validate(&["bob", "3"], &schema).unwrap_err();
        assert!(err.to_string().contains("references `name`"));
    }

    #[test]
    fn test_map_introspection() {
        let schema = SchemaMap::new()
            .field("a", StringSchema::new())
            .rest("b", StringSchema::new())
            .field("a", StringSchema::new());
        assert_eq!(schema.duplicate_field(), Some("a"));
        assert!(!schema.rest_is_last());
        assert_eq!(schema.rest_field(), Some("b"));
        assert_eq!(schema.names().collect::<Vec<_>>(), ["a", "b", "a"]);
    }
}
