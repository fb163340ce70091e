//! Command dispatch for chat bots.
//!
//! Builds on `chat_command_core` argument validation and adds:
//!
//! - [`Command`] trees built eagerly from [`CommandDefinition`]s, with
//!   configuration mistakes reported as [`ConfigError`]
//! - the inhibitor pipeline ([`Inhibitor`]): custom predicate, per-scope
//!   usage limits ([`UsageTracker`]), restricted channels, and permission
//!   levels ([`PermissionService`])
//! - lifecycle hooks on [`CommandHandler`]
//! - message routing through a [`Dispatcher`] configured by YAML
//!   ([`DispatchConfig`])
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use chat_command_core::{NumberSchema, SchemaMap, ValidationResults};
//! use chat_command_dispatch::*;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl MessageTransport for Echo {
//!     async fn send(
//!         &self,
//!         channel_id: &str,
//!         content: &str,
//!         _: &FormatOptions,
//!     ) -> Result<SentMessage> {
//!         let (id, channel_id, content) = ("1".into(), channel_id.into(), content.into());
//!         Ok(SentMessage { id, channel_id, content })
//!     }
//! }
//!
//! struct Double;
//!
//! #[async_trait]
//! impl CommandHandler for Double {
//!     async fn did_dispatch(&self, ctx: &CommandContext, args: &ValidationResults) -> Result<()> {
//!         let n = args.get_i64("n").unwrap_or_default();
//!         ctx.reply(&(n * 2).to_string()).await?;
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut dispatcher = Dispatcher::new(DispatchConfig::default(), Services::new());
//! let options = CommandOptions::new("double")
//!     .with_args(SchemaMap::new().field("n", NumberSchema::new().integer()));
//! dispatcher.register(CommandDefinition::new(options, Double)).unwrap();
//!
//! let outcome = dispatcher
//!     .handle(Message::new("m1", "alice", "general", "!double 21"), Arc::new(Echo))
//!     .await
//!     .unwrap();
//! assert_eq!(outcome, Some(DispatchOutcome::Completed));
//! # });
//! ```

mod command;
mod config;
mod context;
mod error;
mod handler;
mod inhibitor;
mod message;
mod permission;
mod registry;
mod tokenizer;
mod usage;

pub use command::{Command, CommandDefinition, CommandOptions, DispatchOutcome, Services};
pub use config::{CommandOverride, DispatchConfig};
pub use context::CommandContext;
pub use error::{ConfigError, DispatchError, Result};
pub use handler::CommandHandler;
pub use inhibitor::Inhibitor;
pub use message::{Channel, FormatOptions, Message, MessageTransport, SentMessage};
pub use permission::{LevelTable, PermissionRequirement, PermissionService};
pub use registry::{CommandRegistry, Dispatcher};
pub use tokenizer::tokenize;
pub use usage::{UsageEntry, UsageLimit, UsageScope, UsageTracker};
