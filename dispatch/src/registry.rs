//! Top-level command lookup and message routing.

use std::sync::Arc;

use tracing::{debug, info};

use crate::command::{Command, CommandDefinition, DispatchOutcome, Services};
use crate::config::DispatchConfig;
use crate::context::CommandContext;
use crate::error::{ConfigError, Result};
use crate::message::{Message, MessageTransport};
use crate::tokenizer::tokenize;

/// Top-level commands, looked up by name or alias.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a built command.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SubcommandAtTopLevel`] for a subcommand and
    /// [`ConfigError::DuplicateCommand`] when a name or alias is taken.
    pub fn register(&mut self, command: Command) -> std::result::Result<(), ConfigError> {
        if command.is_subcommand() {
            return Err(ConfigError::SubcommandAtTopLevel(command.name().to_string()));
        }
        if let Some(label) = command.options().labels().find(|label| self.get(label).is_some()) {
            return Err(ConfigError::DuplicateCommand {
                scope: "<root>".to_string(),
                name: label.to_string(),
            });
        }
        self.commands.push(command);
        Ok(())
    }

    pub fn get(&self, token: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.options().matches(token))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(Command::name)
    }
}

/// Routes inbound messages to registered commands.
///
/// # Examples
///
/// ```
/// use chat_command_dispatch::*;
///
/// struct Ping;
/// impl CommandHandler for Ping {}
///
/// let mut dispatcher = Dispatcher::new(DispatchConfig::default(), Services::new());
/// dispatcher.register(CommandDefinition::new(CommandOptions::new("ping"), Ping)).unwrap();
///
/// assert_eq!(dispatcher.parse("!ping now"), Some(vec!["ping".to_string(), "now".to_string()]));
/// assert_eq!(dispatcher.parse("hello"), None);
/// ```
#[derive(Debug)]
pub struct Dispatcher {
    config: DispatchConfig,
    services: Services,
    registry: CommandRegistry,
}

impl Dispatcher {
    /// Creates a dispatcher. Validation options come from `config`.
    pub fn new(config: DispatchConfig, services: Services) -> Self {
        let services = services.with_validation(config.validation);
        Self {
            config,
            services,
            registry: CommandRegistry::new(),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Applies configuration overrides, builds and registers `definition`.
    ///
    /// Returns `false` when configuration disables the command.
    ///
    /// # Errors
    ///
    /// Returns any [`ConfigError`] from building or registering.
    pub fn register(
        &mut self,
        mut definition: CommandDefinition,
    ) -> std::result::Result<bool, ConfigError> {
        if !self.config.apply(&mut definition) {
            info!(command = definition.name(), "Command disabled by configuration");
            return Ok(false);
        }
        let command = Command::build(definition, &self.services)?;
        debug!(command = command.name(), "Registered command");
        self.registry.register(command)?;
        Ok(true)
    }

    /// Tokens of a prefixed message, or `None` when it is not a command.
    pub fn parse(&self, content: &str) -> Option<Vec<String>> {
        let tokens = tokenize(self.config.strip_prefix(content)?);
        (!tokens.is_empty()).then_some(tokens)
    }

    /// Dispatches `message` if it invokes a registered command.
    ///
    /// Returns `Ok(None)` for messages that are ignored: bot authors (when
    /// configured), missing prefix, or an unknown command name.
    ///
    /// # Errors
    ///
    /// Propagates [`Command::dispatch`] errors.
    pub async fn handle(
        &self,
        message: Message,
        transport: Arc<dyn MessageTransport>,
    ) -> Result<Option<DispatchOutcome>> {
        if self.config.ignore_bots && message.author_is_bot {
            debug!(author = %message.author_id, "Ignoring bot message");
            return Ok(None);
        }
        let Some(tokens) = self.parse(&message.content) else {
            return Ok(None);
        };
        let Some(command) = self.registry.get(&tokens[0]) else {
            debug!(name = %tokens[0], "Unknown command");
            return Ok(None);
        };

        let ctx = CommandContext::new(message, transport);
        command.dispatch(&ctx, &tokens[1..]).await.map(Some)
    }
}
