//! Named rule predicates and the context they are evaluated in.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, SchemaError, type_name};
use crate::store::{StoreEntry, ValueStore};

type Predicate = dyn Fn(&RuleContext<'_>) -> Result<bool> + Send + Sync;

/// A named predicate over a coerced value.
///
/// The message is a template: `{label}` expands to the field path and
/// `{value}` to the rejected value.
///
/// # Examples
///
/// ```
/// use chat_command_core::Rule;
///
/// let even = Rule::new("even", "`{label}` must be even", |ctx| {
///     Ok(ctx.value.as_i64().is_some_and(|n| n % 2 == 0))
/// });
/// assert_eq!(even.name(), "even");
/// ```
#[derive(Clone)]
pub struct Rule {
    name: String,
    message: String,
    check: Arc<Predicate>,
}

impl Rule {
    pub fn new<F>(name: impl Into<String>, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&RuleContext<'_>) -> Result<bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            message: message.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unexpanded message template.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn set_message(&mut self, message: String) {
        self.message = message;
    }

    /// Evaluates the predicate.
    ///
    /// # Errors
    ///
    /// Propagates the [`SchemaError`] raised by a misconfigured rule.
    pub fn check(&self, ctx: &RuleContext<'_>) -> Result<bool> {
        (self.check)(ctx)
    }

    /// Expands the message template for a violation at `label`.
    pub fn render(&self, label: &str, value: &Value) -> String {
        self.message
            .replace("{label}", label)
            .replace("{value}", &display_value(value))
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Everything a rule can see while it runs.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// The coerced value under test.
    pub value: &'a Value,
    /// The value as it was received.
    pub raw_value: &'a Value,
    /// Path of the field being validated (empty for an anonymous schema).
    pub key: &'a str,
    /// Name of the rule being evaluated.
    pub rule: &'a str,
    /// Containing array when validating an element.
    pub parent: Option<&'a Value>,
    refs: &'a ValueStore,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        value: &'a Value,
        raw_value: &'a Value,
        key: &'a str,
        rule: &'a str,
        parent: Option<&'a Value>,
        refs: &'a ValueStore,
    ) -> Self {
        Self {
            value,
            raw_value,
            key,
            rule,
            parent,
            refs,
        }
    }

    /// Looks up a sibling field's already-coerced entry.
    pub fn reference(&self, key: &str) -> Option<&'a StoreEntry> {
        self.refs.get(key)
    }

    /// Resolves a numeric bound.
    ///
    /// Returns `Ok(None)` when the bound references a field that has no
    /// value in this call (an absent optional field).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ReferenceType`] when the referenced field holds
    /// something other than a number.
    pub fn resolve_number(&self, limit: &Limit) -> Result<Option<f64>> {
        match limit {
            Limit::Value(n) => Ok(Some(*n)),
            Limit::Ref(key) => match self.refs.get(key) {
                None => Ok(None),
                Some(entry) => {
                    entry
                        .value
                        .as_f64()
                        .map(Some)
                        .ok_or_else(|| SchemaError::ReferenceType {
                            rule: self.rule.to_string(),
                            field: self.key.to_string(),
                            reference: key.clone(),
                            expected: "number",
                            found: type_name(&entry.value),
                        })
                }
            },
        }
    }

    /// Builds a misconfiguration error for the current rule.
    pub fn misconfigured(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidRule {
            rule: self.rule.to_string(),
            field: self.key.to_string(),
            reason: reason.into(),
        }
    }
}

/// A numeric rule bound: a literal or a reference to another field.
///
/// # Examples
///
/// ```
/// use chat_command_core::Limit;
///
/// assert_eq!(Limit::from(3).to_string(), "3");
/// assert_eq!(Limit::reference("low").to_string(), "the value of `low`");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Limit {
    Value(f64),
    Ref(String),
}

impl Limit {
    /// Bound that resolves to the coerced value of field `key`.
    pub fn reference(key: impl Into<String>) -> Self {
        Self::Ref(key.into())
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Value(n) => f.write_str(&format_number(*n)),
            Limit::Ref(key) => write!(f, "the value of `{key}`"),
        }
    }
}

impl From<f64> for Limit {
    fn from(n: f64) -> Self {
        Self::Value(n)
    }
}

impl From<i64> for Limit {
    fn from(n: i64) -> Self {
        Self::Value(n as f64)
    }
}

impl From<i32> for Limit {
    fn from(n: i32) -> Self {
        Self::Value(f64::from(n))
    }
}

impl From<u32> for Limit {
    fn from(n: u32) -> Self {
        Self::Value(f64::from(n))
    }
}

/// Formats integral floats without a trailing `.0`.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), format_number),
        other => other.to_string(),
    }
}
