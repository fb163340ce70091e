use serde_json::Value;

use super::{Schema, SchemaBase, SchemaBuilder};
use crate::rule::{Limit, Rule};

/// Finite numeric values.
///
/// Strings are parsed after trimming (`" 42 "` → `42`); integral results
/// are stored as integers. `NaN` and infinities fail coercion.
///
/// Bounds accept a literal or [`Limit::reference`] to compare against
/// another field's coerced value.
///
/// # Examples
///
/// ```
/// use chat_command_core::{Limit, NumberSchema, SchemaMap, Validator};
///
/// let schema = SchemaMap::new()
///     .field("low", NumberSchema::new())
///     .field("high", NumberSchema::new().greater(Limit::reference("low")));
///
/// let outcome = Validator::default().validate(&["3", "10"], &schema).unwrap();
/// assert!(outcome.is_valid());
///
/// let outcome = Validator::default().validate(&["3", "2"], &schema).unwrap();
/// assert!(!outcome.is_valid());
/// ```
#[derive(Debug, Clone, Default)]
pub struct NumberSchema {
    base: SchemaBase,
}

impl NumberSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `value >= limit`.
    pub fn min(self, limit: impl Into<Limit>) -> Self {
        self.compare("min", limit.into(), "at least", |v, b| v >= b)
    }

    /// Requires `value <= limit`.
    pub fn max(self, limit: impl Into<Limit>) -> Self {
        self.compare("max", limit.into(), "at most", |v, b| v <= b)
    }

    /// Requires `value > limit`.
    pub fn greater(self, limit: impl Into<Limit>) -> Self {
        self.compare("greater", limit.into(), "greater than", |v, b| v > b)
    }

    /// Requires `value < limit`.
    pub fn less(self, limit: impl Into<Limit>) -> Self {
        self.compare("less", limit.into(), "less than", |v, b| v < b)
    }

    pub fn integer(self) -> Self {
        self.check("integer", "`{label}` must be a whole number", |v| v.fract() == 0.0)
    }

    pub fn positive(self) -> Self {
        self.check("positive", "`{label}` must be positive", |v| v > 0.0)
    }

    pub fn negative(self) -> Self {
        self.check("negative", "`{label}` must be negative", |v| v < 0.0)
    }

    fn compare(
        mut self,
        name: &str,
        limit: Limit,
        phrase: &str,
        cmp: fn(f64, f64) -> bool,
    ) -> Self {
        let message = format!("`{{label}}` must be {phrase} {limit}");
        self.base.push(Rule::new(name, message, move |ctx| {
            let Some(bound) = ctx.resolve_number(&limit)? else {
                return Ok(true);
            };
            Ok(ctx.value.as_f64().is_some_and(|v| cmp(v, bound)))
        }));
        self
    }

    fn check(mut self, name: &str, message: &str, predicate: fn(f64) -> bool) -> Self {
        self.base.push(Rule::new(name, message, move |ctx| {
            Ok(ctx.value.as_f64().is_some_and(predicate))
        }));
        self
    }
}

/// Stores integral floats as JSON integers so `"42"` coerces to `42`.
pub(crate) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

impl SchemaBuilder for NumberSchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl Schema for NumberSchema {
    fn kind(&self) -> &'static str {
        "number"
    }

    fn base(&self) -> &SchemaBase {
        &self.base
    }

    fn coerce_value(&self, raw: &Value) -> Option<Value> {
        let n = match raw {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        n.is_finite().then(|| number_value(n))
    }

    fn type_check(&self, value: &Value) -> bool {
        value.as_f64().is_some_and(f64::is_finite)
    }
}
