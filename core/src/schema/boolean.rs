use serde_json::Value;

use super::{Schema, SchemaBase, SchemaBuilder};
use crate::rule::Rule;

const TRUE_TOKENS: &[&str] = &["true", "yes", "y", "on", "1"];
const FALSE_TOKENS: &[&str] = &["false", "no", "n", "off", "0"];

/// Yes/no values.
///
/// Accepts JSON booleans, the numbers `1`/`0`, and the tokens `true`,
/// `yes`, `y`, `on`, `1` (and their negatives) in any case.
#[derive(Debug, Clone, Default)]
pub struct BooleanSchema {
    base: SchemaBase,
}

impl BooleanSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the value to be `true`.
    pub fn truthy(self) -> Self {
        self.equals("truthy", true)
    }

    /// Requires the value to be `false`.
    pub fn falsy(self) -> Self {
        self.equals("falsy", false)
    }

    fn equals(mut self, name: &str, expected: bool) -> Self {
        let message = format!("`{{label}}` must be {expected}");
        self.base.push(Rule::new(name, message, move |ctx| {
            Ok(ctx.value.as_bool() == Some(expected))
        }));
        self
    }
}

fn parse_token(token: &str) -> Option<bool> {
    let token = token.trim().to_ascii_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

impl SchemaBuilder for BooleanSchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl Schema for BooleanSchema {
    fn kind(&self) -> &'static str {
        "boolean"
    }

    fn base(&self) -> &SchemaBase {
        &self.base
    }

    fn coerce_value(&self, raw: &Value) -> Option<Value> {
        match raw {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) => parse_token(s).map(Value::Bool),
            Value::Number(n) => match n.as_u64() {
                Some(1) => Some(Value::Bool(true)),
                Some(0) => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }

    fn type_check(&self, value: &Value) -> bool {
        value.is_boolean()
    }
}
