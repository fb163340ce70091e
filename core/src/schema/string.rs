use regex::Regex;
use serde_json::Value;

use super::{Schema, SchemaBase, SchemaBuilder};
use crate::rule::Rule;

/// Text values.
///
/// Numbers and booleans are accepted and rendered as text; arrays and
/// objects are not.
///
/// # Examples
///
/// ```
/// use chat_command_core::{Schema, StringSchema, ValidateOptions, ValueStore};
/// use serde_json::json;
///
/// let schema = StringSchema::new().trim().min(3).one_of(["kick", "ban"]);
/// let options = ValidateOptions::collect_all().with_path("action");
/// let store = ValueStore::new();
///
/// let ok = schema.validate(Some(&json!("  ban ")), &options, &store).unwrap();
/// assert_eq!(ok.value, json!("ban"));
///
/// let bad = schema.validate(Some(&json!("no")), &options, &store).unwrap();
/// let kinds: Vec<_> = bad.errors.iter().map(|e| e.kind.as_str()).collect();
/// assert_eq!(kinds, ["string.min", "string.one_of"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    base: SchemaBase,
    trim: bool,
    lowercase: bool,
}

impl StringSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strips surrounding whitespace during coercion.
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    /// Lowercases during coercion.
    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    /// Requires at least `len` characters.
    pub fn min(self, len: usize) -> Self {
        self.push(
            "min",
            format!("`{{label}}` must be at least {len} characters long"),
            move |s| s.chars().count() >= len,
        )
    }

    /// Allows at most `len` characters.
    pub fn max(self, len: usize) -> Self {
        self.push(
            "max",
            format!("`{{label}}` must be at most {len} characters long"),
            move |s| s.chars().count() <= len,
        )
    }

    /// Requires exactly `len` characters.
    pub fn length(self, len: usize) -> Self {
        self.push(
            "length",
            format!("`{{label}}` must be exactly {len} characters long"),
            move |s| s.chars().count() == len,
        )
    }

    /// Requires a match of `pattern` somewhere in the value.
    pub fn pattern(self, pattern: Regex) -> Self {
        let message = format!("`{{label}}` must match the pattern `{}`", pattern.as_str());
        self.push("pattern", message, move |s| pattern.is_match(s))
    }

    /// Requires the value to equal one of `choices`.
    pub fn one_of<I, S>(self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
        let message = format!("`{{label}}` must be one of: {}", choices.join(", "));
        self.push("one_of", message, move |s| choices.iter().any(|c| c == s))
    }

    fn push<F>(mut self, name: &str, message: String, check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.base.push(Rule::new(name, message, move |ctx| {
            Ok(ctx.value.as_str().is_some_and(&check))
        }));
        self
    }
}

impl SchemaBuilder for StringSchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl Schema for StringSchema {
    fn kind(&self) -> &'static str {
        "string"
    }

    fn base(&self) -> &SchemaBase {
        &self.base
    }

    fn coerce_value(&self, raw: &Value) -> Option<Value> {
        let mut text = match raw {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        if self.trim {
            text = text.trim().to_string();
        }
        if self.lowercase {
            text = text.to_lowercase();
        }
        Some(Value::String(text))
    }

    fn type_check(&self, value: &Value) -> bool {
        value.is_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{ValidateOptions, ValueStore};

    fn run(schema: &StringSchema, raw: Value) -> crate::SchemaOutcome {
        schema
            .validate(
                Some(&raw),
                &ValidateOptions::collect_all().with_path("s"),
                &ValueStore::new(),
            )
            .unwrap()
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let schema = StringSchema::new().max(2);
        assert!(run(&schema, json!("éé")).pass());
        assert!(!run(&schema, json!("ééé")).pass());
    }

    #[test]
    fn test_number_is_rendered_as_text() {
        let outcome = run(&StringSchema::new(), json!(7));
        assert_eq!(outcome.value, json!("7"));
    }

    #[test]
    fn test_array_is_not_a_string() {
        let outcome = run(&StringSchema::new(), json!(["a"]));
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, "string");
    }

    #[test]
    fn test_pattern_and_lowercase() {
        let schema = StringSchema::new()
            .lowercase()
            .pattern(Regex::new(r"^[a-z]+$").unwrap());
        let outcome = run(&schema, json!("HeLLo"));
        assert!(outcome.pass());
        assert_eq!(outcome.value, json!("hello"));
    }

    #[test]
    fn test_collect_all_reports_every_failing_rule() {
        let schema = StringSchema::new().min(5).length(6).one_of(["abcdef"]);
        let outcome = run(&schema, json!("abc"));
        assert_eq!(outcome.errors.len(), 3);
    }
}
