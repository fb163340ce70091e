//! Command definitions and the built command tree.
//!
//! A [`CommandDefinition`] is plain data plus a handler. [`Command::build`]
//! checks it and its subcommands once, eagerly, and turns it into a
//! [`Command`] owning its own usage ledger and validator. Misconfiguration
//! surfaces here as a [`ConfigError`] rather than on the first message.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chat_command_core::{
    SchemaMap, ValidationErrors, ValidationOutcome, Validator, ValidatorOptions,
};
use tracing::{debug, warn};

use crate::context::CommandContext;
use crate::error::{ConfigError, Result};
use crate::handler::CommandHandler;
use crate::inhibitor::Inhibitor;
use crate::permission::{PermissionRequirement, PermissionService};
use crate::usage::{UsageLimit, UsageTracker};

/// Static settings of a command.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use chat_command_core::{NumberSchema, SchemaMap};
/// use chat_command_dispatch::{CommandOptions, PermissionRequirement, UsageLimit};
///
/// let options = CommandOptions::new("roll")
///     .with_alias("r")
///     .with_description("Roll dice")
///     .with_usage_limit(UsageLimit::new(3, Duration::from_secs(10)))
///     .with_permission(PermissionRequirement::at_least(1))
///     .with_args(SchemaMap::new().field("sides", NumberSchema::new().integer()));
/// assert!(options.matches("R"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    /// Only usable in restricted channels.
    pub nsfw: bool,
    pub permission: Option<PermissionRequirement>,
    pub usage_limit: UsageLimit,
    /// Must be set on every definition nested under another.
    pub subcommand: bool,
    pub args: SchemaMap,
}

impl CommandOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn nsfw(mut self) -> Self {
        self.nsfw = true;
        self
    }

    pub fn with_permission(mut self, requirement: PermissionRequirement) -> Self {
        self.permission = Some(requirement);
        self
    }

    pub fn with_usage_limit(mut self, limit: UsageLimit) -> Self {
        self.usage_limit = limit;
        self
    }

    pub fn as_subcommand(mut self) -> Self {
        self.subcommand = true;
        self
    }

    pub fn with_args(mut self, args: SchemaMap) -> Self {
        self.args = args;
        self
    }

    /// Case-insensitive match against the name and aliases.
    pub fn matches(&self, token: &str) -> bool {
        self.labels().any(|label| label.eq_ignore_ascii_case(token))
    }

    /// Name followed by aliases.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    fn check(&self) -> std::result::Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }

        let mut seen = HashSet::new();
        for label in self.labels() {
            if label.is_empty() || label.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidName(label.to_string()));
            }
            if !seen.insert(label.to_ascii_lowercase()) {
                return Err(ConfigError::DuplicateAlias {
                    command: self.name.clone(),
                    alias: label.to_string(),
                });
            }
        }

        if let Some(reason) = self.usage_limit.problem() {
            return Err(ConfigError::InvalidUsageLimit {
                command: self.name.clone(),
                reason: reason.to_string(),
            });
        }

        if let Some(field) = self.args.duplicate_field() {
            return Err(ConfigError::DuplicateArgument {
                command: self.name.clone(),
                field: field.to_string(),
            });
        }
        if !self.args.rest_is_last() {
            return Err(ConfigError::RestNotLast {
                command: self.name.clone(),
                field: self.args.rest_field().unwrap_or_default().to_string(),
            });
        }

        Ok(())
    }
}

/// Unbuilt command: options, handler and nested subcommand definitions.
pub struct CommandDefinition {
    options: CommandOptions,
    handler: Arc<dyn CommandHandler>,
    subcommands: Vec<CommandDefinition>,
}

impl CommandDefinition {
    pub fn new(options: CommandOptions, handler: impl CommandHandler + 'static) -> Self {
        Self::with_shared_handler(options, Arc::new(handler))
    }

    pub fn with_shared_handler(options: CommandOptions, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            options,
            handler,
            subcommands: Vec::new(),
        }
    }

    pub fn with_subcommand(mut self, subcommand: CommandDefinition) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    pub fn options(&self) -> &CommandOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut CommandOptions {
        &mut self.options
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("options", &self.options)
            .field("subcommands", &self.subcommands)
            .finish_non_exhaustive()
    }
}

/// Collaborators shared by every command of a bot.
#[derive(Clone, Default)]
pub struct Services {
    pub permissions: Option<Arc<dyn PermissionService>>,
    pub validation: ValidatorOptions,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permissions(mut self, service: impl PermissionService + 'static) -> Self {
        self.permissions = Some(Arc::new(service));
        self
    }

    pub fn with_validation(mut self, options: ValidatorOptions) -> Self {
        self.validation = options;
        self
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("permissions", &self.permissions.is_some())
            .field("validation", &self.validation)
            .finish()
    }
}

/// How a dispatch ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A gate stopped the dispatch.
    Inhibited(Inhibitor),
    /// Arguments failed validation.
    InvalidArguments(ValidationErrors),
    Completed,
    /// The command body reported an error.
    Failed(String),
}

/// A built, validated command node.
pub struct Command {
    pub(crate) options: CommandOptions,
    pub(crate) handler: Arc<dyn CommandHandler>,
    pub(crate) usage: UsageTracker,
    pub(crate) permissions: Option<Arc<dyn PermissionService>>,
    validator: Validator,
    subcommands: Vec<Command>,
}

impl Command {
    /// Builds `definition` and its subcommand tree.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an invalid name or alias, an
    /// unenforceable usage limit, a malformed argument map, a permission
    /// requirement without a permission service, a nested definition not
    /// marked as a subcommand, or sibling subcommands sharing a label.
    pub fn build(
        definition: CommandDefinition,
        services: &Services,
    ) -> std::result::Result<Self, ConfigError> {
        Self::build_node(definition, services, &mut Vec::new())
    }

    fn build_node(
        definition: CommandDefinition,
        services: &Services,
        path: &mut Vec<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let CommandDefinition {
            options,
            handler,
            subcommands: children,
        } = definition;
        options.check()?;

        let permissions = match options.permission {
            Some(_) => Some(
                services
                    .permissions
                    .clone()
                    .ok_or_else(|| ConfigError::MissingPermissionService(options.name.clone()))?,
            ),
            None => None,
        };

        path.push(options.name.clone());
        let scope = path.join(" ");
        let mut labels = HashSet::new();
        let mut subcommands = Vec::with_capacity(children.len());
        for child in children {
            if !child.options.subcommand {
                return Err(ConfigError::NotSubcommand {
                    parent: scope,
                    name: child.options.name,
                });
            }
            for label in child.options.labels() {
                if !labels.insert(label.to_ascii_lowercase()) {
                    return Err(ConfigError::DuplicateCommand {
                        scope,
                        name: label.to_string(),
                    });
                }
            }
            subcommands.push(Self::build_node(child, services, path)?);
        }
        path.pop();

        debug!(command = %scope, subcommands = subcommands.len(), "Built command");
        Ok(Self {
            usage: UsageTracker::new(options.usage_limit),
            validator: Validator::new(services.validation),
            options,
            handler,
            permissions,
            subcommands,
        })
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn options(&self) -> &CommandOptions {
        &self.options
    }

    pub fn is_subcommand(&self) -> bool {
        self.options.subcommand
    }

    pub fn subcommands(&self) -> &[Command] {
        &self.subcommands
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Direct subcommand matching `token` by name or alias.
    pub fn find_subcommand(&self, token: &str) -> Option<&Command> {
        self.subcommands.iter().find(|c| c.options.matches(token))
    }

    /// Walks leading tokens down the subcommand tree.
    ///
    /// Returns the deepest matching command and how many tokens named it.
    ///
    /// # Examples
    ///
    /// ```
    /// use chat_command_dispatch::{
    ///     Command, CommandDefinition, CommandHandler, CommandOptions, Services,
    /// };
    ///
    /// struct Noop;
    /// impl CommandHandler for Noop {}
    ///
    /// let add = CommandDefinition::new(CommandOptions::new("add").as_subcommand(), Noop);
    /// let role = CommandDefinition::new(CommandOptions::new("role"), Noop);
    /// let definition = role.with_subcommand(add);
    /// let command = Command::build(definition, &Services::new()).unwrap();
    ///
    /// let (target, consumed) = command.resolve(&["ADD", "mods"]);
    /// assert_eq!((target.name(), consumed), ("add", 1));
    /// ```
    pub fn resolve<S: AsRef<str>>(&self, tokens: &[S]) -> (&Command, usize) {
        let mut current = self;
        let mut consumed = 0;
        while let Some(next) = tokens
            .get(consumed)
            .and_then(|token| current.find_subcommand(token.as_ref()))
        {
            current = next;
            consumed += 1;
        }
        (current, consumed)
    }

    /// Resolves `tokens` to a subcommand and runs it with the remainder as
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns an error when a collaborator or a notification hook fails, or
    /// when an argument schema is misconfigured. A failing command body is
    /// reported as [`DispatchOutcome::Failed`].
    pub async fn dispatch<S: AsRef<str> + Sync>(
        &self,
        ctx: &CommandContext,
        tokens: &[S],
    ) -> Result<DispatchOutcome> {
        let (command, consumed) = self.resolve(tokens);
        debug!(command = command.name(), depth = consumed, "Resolved command");
        command.invoke(ctx, &tokens[consumed..]).await
    }

    /// Runs this command, ignoring subcommands.
    pub async fn invoke<S: AsRef<str> + Sync>(
        &self,
        ctx: &CommandContext,
        args: &[S],
    ) -> Result<DispatchOutcome> {
        if let Some(gate) = self.run_inhibitors(ctx).await? {
            debug!(command = self.name(), gate = %gate, "Dispatch inhibited");
            return Ok(DispatchOutcome::Inhibited(gate));
        }

        self.handler.will_dispatch(ctx).await?;

        let args = match self.validator.validate(args, &self.options.args)? {
            ValidationOutcome::Valid(args) => args,
            ValidationOutcome::Invalid(errors) => {
                let fields: Vec<&str> = errors.fields().collect();
                debug!(command = self.name(), ?fields, "Invalid arguments");
                self.handler.did_catch_validation_errors(ctx, &errors).await?;
                return Ok(DispatchOutcome::InvalidArguments(errors));
            }
        };

        match self.handler.did_dispatch(ctx, &args).await {
            Ok(()) => {
                self.handler.did_dispatch_successfully(ctx).await?;
                Ok(DispatchOutcome::Completed)
            }
            Err(error) => {
                warn!(command = self.name(), error = %error, "Command failed");
                self.handler.did_dispatch_unsuccessfully(ctx, &error).await?;
                Ok(DispatchOutcome::Failed(error.to_string()))
            }
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("options", &self.options)
            .field("usage", &self.usage)
            .field("subcommands", &self.subcommands)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chat_command_core::{NumberSchema, StringSchema};

    use super::*;
    use crate::permission::LevelTable;

    struct Noop;
    impl CommandHandler for Noop {}

    fn def(options: CommandOptions) -> CommandDefinition {
        CommandDefinition::new(options, Noop)
    }

    fn sub(name: &str) -> CommandDefinition {
        def(CommandOptions::new(name).as_subcommand())
    }

    #[test]
    fn test_build_rejects_unflagged_subcommand() {
        let definition =
            def(CommandOptions::new("role")).with_subcommand(def(CommandOptions::new("add")));
        let err = Command::build(definition, &Services::new()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NotSubcommand { ref parent, ref name } if parent == "role" && name == "add"
        ));
    }

    #[test]
    fn test_build_reports_nested_path() {
        let definition = def(CommandOptions::new("config"))
            .with_subcommand(sub("set").with_subcommand(def(CommandOptions::new("key"))));
        let err = Command::build(definition, &Services::new()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NotSubcommand { ref parent, .. } if parent == "config set"
        ));
    }

    #[test]
    fn test_build_rejects_sibling_collision() {
        let definition = def(CommandOptions::new("role"))
            .with_subcommand(sub("add"))
            .with_subcommand(def(CommandOptions::new("plus").with_alias("ADD").as_subcommand()));
        let err = Command::build(definition, &Services::new()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateCommand { ref name, .. } if name == "ADD"));
    }

    #[test]
    fn test_build_rejects_bad_names() {
        let services = Services::new();
        assert!(matches!(
            Command::build(def(CommandOptions::new("  ")), &services),
            Err(ConfigError::EmptyName)
        ));
        assert!(matches!(
            Command::build(def(CommandOptions::new("two words")), &services),
            Err(ConfigError::InvalidName(_))
        ));
        assert!(matches!(
            Command::build(def(CommandOptions::new("ping").with_alias("PING")), &services),
            Err(ConfigError::DuplicateAlias { .. })
        ));
    }

    #[test]
    fn test_build_rejects_empty_bucket() {
        let empty = UsageLimit::new(0, Duration::from_secs(1));
        let options = CommandOptions::new("spam").with_usage_limit(empty);
        assert!(matches!(
            Command::build(def(options), &Services::new()),
            Err(ConfigError::InvalidUsageLimit { .. })
        ));
    }

    #[test]
    fn test_build_rejects_malformed_args() {
        let duplicate = CommandOptions::new("a").with_args(
            SchemaMap::new()
                .field("x", NumberSchema::new())
                .field("x", StringSchema::new()),
        );
        assert!(matches!(
            Command::build(def(duplicate), &Services::new()),
            Err(ConfigError::DuplicateArgument { ref field, .. }) if field == "x"
        ));

        let rest_first = CommandOptions::new("b").with_args(
            SchemaMap::new()
                .rest("words", StringSchema::new())
                .field("n", NumberSchema::new()),
        );
        assert!(matches!(
            Command::build(def(rest_first), &Services::new()),
            Err(ConfigError::RestNotLast { ref field, .. }) if field == "words"
        ));
    }

    #[test]
    fn test_permission_requires_service() {
        let options =
            CommandOptions::new("ban").with_permission(PermissionRequirement::at_least(5));
        assert!(matches!(
            Command::build(def(options.clone()), &Services::new()),
            Err(ConfigError::MissingPermissionService(ref name)) if name == "ban"
        ));
        let services = Services::new().with_permissions(LevelTable::new());
        assert!(Command::build(def(options), &services).is_ok());
    }

    #[test]
    fn test_resolve_picks_deepest_match() {
        let definition = def(CommandOptions::new("config"))
            .with_subcommand(sub("set").with_subcommand(sub("key")))
            .with_subcommand(sub("get"));
        let command = Command::build(definition, &Services::new()).unwrap();

        let (target, consumed) = command.resolve(&["set", "key", "value"]);
        assert_eq!((target.name(), consumed), ("key", 2));

        let (target, consumed) = command.resolve(&["set", "other"]);
        assert_eq!((target.name(), consumed), ("set", 1));

        let (target, consumed) = command.resolve::<&str>(&[]);
        assert_eq!((target.name(), consumed), ("config", 0));
    }

    #[test]
    fn test_subcommands_get_own_usage_tracker() {
        let limit = UsageLimit::new(1, Duration::from_secs(60));
        let definition =
            def(CommandOptions::new("a").with_usage_limit(limit)).with_subcommand(sub("b"));
        let command = Command::build(definition, &Services::new()).unwrap();
        assert!(!command.usage().limit().is_disabled());
        assert!(command.subcommands()[0].usage().limit().is_disabled());
    }
}
