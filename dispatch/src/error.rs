//! Error types for command construction and dispatch.
//!
//! [`ConfigError`] covers mistakes in a bot's command definitions or
//! configuration file; it is returned while building commands, before any
//! message is processed. [`DispatchError`] covers failures of external
//! collaborators and handlers while a message is being dispatched.
//!
//! Inhibitions (cooldown, restricted channel, missing permission) and
//! argument violations are not errors: they are reported as
//! [`DispatchOutcome`](crate::DispatchOutcome) values.

use chat_command_core::SchemaError;
use thiserror::Error;

/// Errors detected while building commands or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Command name is empty or whitespace-only.
    #[error("command name cannot be empty")]
    EmptyName,

    /// Name or alias contains whitespace and could never be typed as a token.
    #[error("invalid command name or alias: {0:?}")]
    InvalidName(String),

    /// An alias repeats the command's name or another alias.
    #[error("duplicate alias `{alias}` on command `{command}`")]
    DuplicateAlias { command: String, alias: String },

    /// Two commands in the same scope share a name or alias.
    #[error("duplicate command in scope `{scope}`: {name}")]
    DuplicateCommand { scope: String, name: String },

    /// A child definition is not marked as a subcommand.
    #[error("`{name}` is declared under `{parent}` but is not marked as a subcommand")]
    NotSubcommand { parent: String, name: String },

    /// A subcommand definition was registered as a top-level command.
    #[error("subcommand `{0}` cannot be registered as a top-level command")]
    SubcommandAtTopLevel(String),

    /// Usage limit values cannot be enforced.
    #[error("invalid usage limit on `{command}`: {reason}")]
    InvalidUsageLimit { command: String, reason: String },

    /// A permission requirement was set without a service to check it.
    #[error("`{0}` requires a permission level but no permission service was provided")]
    MissingPermissionService(String),

    /// Two argument fields share a name.
    #[error("duplicate argument `{field}` on `{command}`")]
    DuplicateArgument { command: String, field: String },

    /// A rest argument is followed by another field.
    #[error("rest argument `{field}` on `{command}` must be declared last")]
    RestNotLast { command: String, field: String },

    /// Configuration values failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised while dispatching a message.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The permission service could not answer.
    #[error("permission service failed: {0}")]
    Permission(String),

    /// The message transport could not deliver.
    #[error("message transport failed: {0}")]
    Transport(String),

    /// An argument schema is misconfigured.
    #[error("schema misconfiguration: {0}")]
    Schema(#[from] SchemaError),

    /// A command handler reported a failure.
    #[error("{0}")]
    Handler(String),
}

impl DispatchError {
    /// Convenience constructor for handler failures.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}

/// Convenience alias for results with [`DispatchError`].
pub type Result<T> = std::result::Result<T, DispatchError>;
