//! Schema-based argument validation for chat-bot commands.
//!
//! This crate turns raw textual arguments into typed values and checks them
//! against composable, rule-based schemas:
//!
//! - [`Schema`]: the contract every variant implements: coercion, a type
//!   check and an ordered rule chain. Variants are [`StringSchema`],
//!   [`NumberSchema`], [`BooleanSchema`] and [`ArraySchema`].
//! - [`Rule`]: a named predicate; its [`RuleContext`] exposes sibling
//!   fields' coerced values for cross-field checks ([`Limit::reference`]).
//! - [`Validator`]: validates a flat token list against a [`SchemaMap`] in
//!   a coercion pass followed by a rule pass.
//!
//! User-input problems come back as [`ValidationError`] values. Only a
//! misconfigured schema produces an `Err` ([`SchemaError`]).
//!
//! # Example
//!
//! ```
//! use chat_command_core::*;
//!
//! let schema = SchemaMap::new()
//!     .field("min", NumberSchema::new().integer())
//!     .field("max", NumberSchema::new().integer().greater(Limit::reference("min")));
//!
//! let validator = Validator::default();
//! let args = validator.validate(&["1", "6"], &schema).unwrap().into_result().unwrap();
//! assert_eq!(args.get_i64("max"), Some(6));
//!
//! let errors = validator.validate(&["6", "1"], &schema).unwrap().into_result().unwrap_err();
//! assert_eq!(errors.get("max").unwrap()[0].kind, "number.greater");
//! ```

mod error;
mod rule;
mod schema;
mod store;
mod validator;

pub use error::{REQUIRED, Result, SchemaError, ValidationError};
pub use rule::{Limit, Rule, RuleContext};
pub use schema::{
    ArraySchema, BooleanSchema, NumberSchema, Schema, SchemaBase, SchemaBuilder, SchemaOutcome,
    StringSchema, ValidateOptions,
};
pub use store::{StoreEntry, ValueStore};
pub use validator::{
    SchemaMap, ValidationErrors, ValidationOutcome, ValidationResults, Validator,
    ValidatorOptions,
};
