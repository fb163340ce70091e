use std::sync::Arc;

use serde_json::Value;

use super::{Schema, SchemaBase, SchemaBuilder, SchemaOutcome, ValidateOptions, run_rules};
use crate::error::Result;
use crate::rule::Rule;
use crate::store::ValueStore;

/// Sequences, optionally validated element by element.
///
/// A string is split on the separator (default `,`) with each piece trimmed
/// and empty pieces dropped, so `"1, 2,3"` becomes `["1", "2", "3"]`.
/// Length rules apply to the sequence itself; every element is then
/// validated against the inner schema with the path `<path>.<index>`.
///
/// # Examples
///
/// ```
/// use chat_command_core::{ArraySchema, NumberSchema, Schema, ValidateOptions, ValueStore};
/// use serde_json::json;
///
/// let schema = ArraySchema::of(NumberSchema::new());
/// let outcome = schema
///     .validate(Some(&json!([1, 2, "x"])), &ValidateOptions::collect_all(), &ValueStore::new())
///     .unwrap();
///
/// assert!(!outcome.pass());
/// assert_eq!(outcome.errors.len(), 1);
/// assert_eq!(outcome.errors[0].field, "2");
/// ```
#[derive(Debug, Clone)]
pub struct ArraySchema {
    base: SchemaBase,
    inner: Option<Arc<dyn Schema>>,
    separator: String,
}

impl Default for ArraySchema {
    fn default() -> Self {
        Self {
            base: SchemaBase::default(),
            inner: None,
            separator: ",".to_string(),
        }
    }
}

impl ArraySchema {
    /// An array whose elements are not checked.
    pub fn new() -> Self {
        Self::default()
    }

    /// An array whose elements must satisfy `inner`.
    pub fn of(inner: impl Schema + 'static) -> Self {
        Self::of_shared(Arc::new(inner))
    }

    /// Like [`ArraySchema::of`], sharing an existing element schema.
    pub fn of_shared(inner: Arc<dyn Schema>) -> Self {
        Self {
            inner: Some(inner),
            ..Self::default()
        }
    }

    pub fn inner(&self) -> Option<&Arc<dyn Schema>> {
        self.inner.as_ref()
    }

    /// Sets the separator used when coercing a string.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Requires at least `len` elements.
    pub fn min(self, len: usize) -> Self {
        self.push(
            "min",
            format!("`{{label}}` must contain at least {len} items"),
            move |items| items.len() >= len,
        )
    }

    /// Allows at most `len` elements.
    pub fn max(self, len: usize) -> Self {
        self.push(
            "max",
            format!("`{{label}}` must contain at most {len} items"),
            move |items| items.len() <= len,
        )
    }

    /// Requires exactly `len` elements.
    pub fn length(self, len: usize) -> Self {
        self.push(
            "length",
            format!("`{{label}}` must contain exactly {len} items"),
            move |items| items.len() == len,
        )
    }

    /// Rejects repeated elements.
    pub fn unique(self) -> Self {
        self.push(
            "unique",
            "`{label}` must not contain duplicates".to_string(),
            |items| {
                items
                    .iter()
                    .enumerate()
                    .all(|(i, item)| !items[..i].contains(item))
            },
        )
    }

    fn push<F>(mut self, name: &str, message: String, check: F) -> Self
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        self.base.push(Rule::new(name, message, move |ctx| {
            Ok(ctx.value.as_array().is_some_and(|items| check(items)))
        }));
        self
    }
}

impl SchemaBuilder for ArraySchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl Schema for ArraySchema {
    fn kind(&self) -> &'static str {
        "array"
    }

    fn base(&self) -> &SchemaBase {
        &self.base
    }

    fn coerce_value(&self, raw: &Value) -> Option<Value> {
        match raw {
            Value::Array(items) => Some(Value::Array(items.clone())),
            Value::String(s) => Some(Value::Array(
                s.split(self.separator.as_str())
                    .map(str::trim)
                    .filter(|piece| !piece.is_empty())
                    .map(|piece| Value::String(piece.to_string()))
                    .collect(),
            )),
            _ => None,
        }
    }

    fn type_check(&self, value: &Value) -> bool {
        value.is_array()
    }

    fn evaluate(
        &self,
        value: Value,
        raw: &Value,
        options: &ValidateOptions,
        store: &ValueStore,
    ) -> Result<SchemaOutcome> {
        let errors = run_rules(self, &value, raw, options, store)?;
        let Some(inner) = self.inner.as_ref().filter(|_| errors.is_empty()) else {
            return Ok(SchemaOutcome::finish(value, raw, errors, options));
        };

        let parent = Arc::new(value);
        let items = parent.as_array().map(Vec::as_slice).unwrap_or_default();
        let mut coerced = Vec::with_capacity(items.len());
        let mut errors = Vec::new();

        for (index, item) in items.iter().enumerate() {
            let outcome = inner.validate(Some(item), &options.child(index, &parent), store)?;
            if !outcome.pass() {
                errors.extend(outcome.errors);
                if options.abort_early {
                    break;
                }
            }
            coerced.push(outcome.value);
        }

        if errors.is_empty() {
            Ok(SchemaOutcome::finish(Value::Array(coerced), raw, errors, options))
        } else {
            let value = Arc::try_unwrap(parent).unwrap_or_else(|shared| (*shared).clone());
            Ok(SchemaOutcome::finish(value, raw, errors, options))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{NumberSchema, StringSchema};

    fn run(schema: &ArraySchema, raw: Value, options: ValidateOptions) -> SchemaOutcome {
        schema.validate(Some(&raw), &options, &ValueStore::new()).unwrap()
    }

    #[test]
    fn test_string_is_split_and_elements_coerced() {
        let schema = ArraySchema::of(NumberSchema::new());
        let outcome = run(&schema, json!("1, 2,,3"), ValidateOptions::default());
        assert!(outcome.pass());
        assert_eq!(outcome.value, json!([1, 2, 3]));
    }

    #[test]
    fn test_custom_separator() {
        let schema = ArraySchema::of(StringSchema::new()).separator("|");
        let outcome = run(&schema, json!("a|b c"), ValidateOptions::default());
        assert_eq!(outcome.value, json!(["a", "b c"]));
    }

    #[test]
    fn test_element_paths_use_prefix() {
        let schema = ArraySchema::of(NumberSchema::new().positive());
        let outcome = run(
            &schema,
            json!([1, -2, -3]),
            ValidateOptions::collect_all().with_path("ids"),
        );
        let fields: Vec<_> = outcome.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["ids.1", "ids.2"]);
    }

    #[test]
    fn test_abort_early_stops_at_first_failing_element() {
        let schema = ArraySchema::of(NumberSchema::new().positive());
        let outcome = run(&schema, json!([1, -2, -3]), ValidateOptions::default());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].field, "1");
    }

    #[test]
    fn test_outer_rules_gate_element_checks() {
        let schema = ArraySchema::of(NumberSchema::new()).max(2);
        let outcome = run(&schema, json!(["x", "y", "z"]), ValidateOptions::collect_all());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, "array.max");
    }

    #[test]
    fn test_unique_rule() {
        let schema = ArraySchema::new().unique();
        assert!(!run(&schema, json!("a,b,a"), ValidateOptions::default()).pass());
        assert!(run(&schema, json!("a,b"), ValidateOptions::default()).pass());
    }

    #[test]
    fn test_inner_rules_see_parent_array() {
        let inner = NumberSchema::new().rule("below_len", |ctx| {
            let len = ctx.parent.and_then(Value::as_array).map_or(0, Vec::len);
            Ok(ctx.value.as_u64().is_some_and(|n| (n as usize) < len))
        });
        let schema = ArraySchema::of(inner);
        assert!(run(&schema, json!([0, 1]), ValidateOptions::default()).pass());
        assert!(!run(&schema, json!([0, 2]), ValidateOptions::default()).pass());
    }

    #[test]
    fn test_elements_share_one_parent() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let inner = NumberSchema::new().rule("record_parent", move |ctx| {
            let address = ctx.parent.map_or(0, |parent| parent as *const Value as usize);
            record.lock().unwrap().push(address);
            Ok(true)
        });
        let schema = ArraySchema::of(inner);
        let outcome = run(&schema, json!([1, 2, 3]), ValidateOptions::default());

        assert!(outcome.pass());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[0] != 0 && seen.iter().all(|address| *address == seen[0]));
    }
}
