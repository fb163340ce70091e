//! The [`Schema`] contract and its concrete variants.
//!
//! A schema is an immutable description: a kind tag, a coercion hook, a
//! runtime type check and an ordered rule chain. Schemas are built once when
//! a command is defined and shared across every invocation. Each validation
//! call accumulates its violations in a fresh [`SchemaOutcome`], so one schema
//! can serve concurrent calls.
//!
//! Validation runs in four steps:
//!
//! 1. a missing value is either `null` (optional) or a `required` violation;
//! 2. [`Schema::coerce`] converts the raw value (`"42"` → `42`);
//! 3. the coerced value is type-checked;
//! 4. [`Schema::evaluate`] runs the rule chain in declaration order.

mod array;
mod boolean;
mod number;
mod string;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

pub use array::ArraySchema;
pub use boolean::BooleanSchema;
pub use number::NumberSchema;
pub use string::StringSchema;

use crate::error::{Result, ValidationError, label};
use crate::rule::{Rule, RuleContext};
use crate::store::ValueStore;

/// Options for a single validation call.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateOptions {
    /// Stop at the first failing rule (or array element).
    pub abort_early: bool,
    /// Return coerced values instead of raw ones.
    pub coerce: bool,
    /// Dotted path used to attribute violations.
    pub path: Option<String>,
    /// Containing value when validating an array element. Shared by every
    /// element of the array.
    pub parent: Option<Arc<Value>>,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            abort_early: true,
            coerce: true,
            path: None,
            parent: None,
        }
    }
}

impl ValidateOptions {
    /// Options that report every failing rule instead of the first.
    pub fn collect_all() -> Self {
        Self {
            abort_early: false,
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// The path violations are attributed to (empty when anonymous).
    pub fn field(&self) -> &str {
        self.path.as_deref().unwrap_or_default()
    }

    /// Options for element `index` of the array `parent`.
    pub(crate) fn child(&self, index: usize, parent: &Arc<Value>) -> Self {
        let path = match self.path.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}.{index}"),
            _ => index.to_string(),
        };
        Self {
            abort_early: self.abort_early,
            coerce: self.coerce,
            path: Some(path),
            parent: Some(Arc::clone(parent)),
        }
    }
}

/// Result of validating one value against one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaOutcome {
    /// Coerced value in coerce mode, otherwise the raw value.
    pub value: Value,
    /// Violations found in this call.
    pub errors: Vec<ValidationError>,
}

impl SchemaOutcome {
    /// Outcome for an absent optional value.
    pub fn absent() -> Self {
        Self {
            value: Value::Null,
            errors: Vec::new(),
        }
    }

    pub(crate) fn failed(value: Value, error: ValidationError) -> Self {
        Self {
            value,
            errors: vec![error],
        }
    }

    pub(crate) fn finish(
        value: Value,
        raw: &Value,
        errors: Vec<ValidationError>,
        options: &ValidateOptions,
    ) -> Self {
        Self {
            value: if options.coerce { value } else { raw.clone() },
            errors,
        }
    }

    /// `true` when no violation was recorded.
    pub fn pass(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Rule chain and flags shared by every schema variant.
#[derive(Debug, Clone, Default)]
pub struct SchemaBase {
    rules: Vec<Rule>,
    optional: bool,
}

impl SchemaBase {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub(crate) fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }
}

/// A typed value contract.
///
/// Implementors supply the kind tag, coercion and type check; the default
/// methods provide the validation steps on top of them.
pub trait Schema: fmt::Debug + Send + Sync {
    /// Kind tag (`"string"`, `"number"`, ...), used in violation kinds.
    fn kind(&self) -> &'static str;

    fn base(&self) -> &SchemaBase;

    /// Type-specific conversion of a raw value. `None` means the value cannot
    /// be read as this kind.
    fn coerce_value(&self, raw: &Value) -> Option<Value>;

    /// Runtime type predicate the coerced value must satisfy.
    fn type_check(&self, value: &Value) -> bool;

    fn is_optional(&self) -> bool {
        self.base().is_optional()
    }

    fn rules(&self) -> &[Rule] {
        self.base().rules()
    }

    /// Coerces and type-checks `raw`.
    ///
    /// # Errors
    ///
    /// Returns a single violation of kind [`Schema::kind`] on failure.
    fn coerce(
        &self,
        raw: &Value,
        options: &ValidateOptions,
    ) -> std::result::Result<Value, ValidationError> {
        match self.coerce_value(raw) {
            Some(value) if self.type_check(&value) => Ok(value),
            _ => Err(ValidationError::coercion(options.field(), self.kind(), raw)),
        }
    }

    /// Runs the rule chain against an already-coerced value.
    ///
    /// # Errors
    ///
    /// Propagates [`SchemaError`](crate::SchemaError) from misconfigured
    /// rules.
    fn evaluate(
        &self,
        value: Value,
        raw: &Value,
        options: &ValidateOptions,
        store: &ValueStore,
    ) -> Result<SchemaOutcome> {
        let errors = run_rules(self, &value, raw, options, store)?;
        Ok(SchemaOutcome::finish(value, raw, errors, options))
    }

    /// Validates `raw` end to end: presence, coercion, type check, rules.
    ///
    /// `null` counts as absent.
    ///
    /// # Errors
    ///
    /// Propagates [`SchemaError`](crate::SchemaError) from misconfigured
    /// rules. User-input problems are reported in the outcome instead.
    fn validate(
        &self,
        raw: Option<&Value>,
        options: &ValidateOptions,
        store: &ValueStore,
    ) -> Result<SchemaOutcome> {
        let Some(raw) = raw.filter(|value| !value.is_null()) else {
            if self.is_optional() {
                return Ok(SchemaOutcome::absent());
            }
            return Ok(SchemaOutcome::failed(
                Value::Null,
                ValidationError::required(options.field()),
            ));
        };

        match self.coerce(raw, options) {
            Ok(value) => self.evaluate(value, raw, options, store),
            Err(error) => Ok(SchemaOutcome::failed(raw.clone(), error)),
        }
    }
}

/// Evaluates `schema`'s rules in order, honoring `abort_early`.
pub(crate) fn run_rules<S: Schema + ?Sized>(
    schema: &S,
    value: &Value,
    raw: &Value,
    options: &ValidateOptions,
    store: &ValueStore,
) -> Result<Vec<ValidationError>> {
    let mut errors = Vec::new();
    let field = options.field();

    for rule in schema.rules() {
        let ctx = RuleContext::new(
            value,
            raw,
            field,
            rule.name(),
            options.parent.as_deref(),
            store,
        );
        if !rule.check(&ctx)? {
            errors.push(ValidationError::rule(
                field,
                schema.kind(),
                rule.name(),
                value.clone(),
                rule.render(label(field), value),
            ));
            if options.abort_early {
                break;
            }
        }
    }

    Ok(errors)
}

/// Builder methods common to every schema variant.
///
/// # Examples
///
/// ```
/// use chat_command_core::{NumberSchema, Schema, SchemaBuilder, ValidateOptions, ValueStore};
/// use serde_json::json;
///
/// let schema = NumberSchema::new()
///     .rule("even", |ctx| Ok(ctx.value.as_i64().is_some_and(|n| n % 2 == 0)))
///     .message("`{label}` must be even, got {value}");
///
/// let options = ValidateOptions::default().with_path("n");
/// let outcome = schema.validate(Some(&json!("3")), &options, &ValueStore::new()).unwrap();
/// assert_eq!(outcome.errors[0].kind, "number.even");
/// assert_eq!(outcome.errors[0].message, "`n` must be even, got 3");
/// ```
pub trait SchemaBuilder: Sized {
    fn base_mut(&mut self) -> &mut SchemaBase;

    /// Accepts a missing value as `null`.
    fn optional(mut self) -> Self {
        self.base_mut().optional = true;
        self
    }

    /// Appends a custom rule.
    fn rule<F>(mut self, name: &str, check: F) -> Self
    where
        F: Fn(&RuleContext<'_>) -> Result<bool> + Send + Sync + 'static,
    {
        let message = format!("`{{label}}` failed the `{name}` check");
        self.base_mut().push(Rule::new(name, message, check));
        self
    }

    /// Replaces the message template of the most recently added rule.
    fn message(mut self, template: impl Into<String>) -> Self {
        if let Some(rule) = self.base_mut().rules.last_mut() {
            rule.set_message(template.into());
        }
        self
    }
}
