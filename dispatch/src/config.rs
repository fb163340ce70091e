//! Dispatcher configuration loaded from YAML.
//!
//! ```yaml
//! prefix: "!"
//! ignore_bots: true
//! validation:
//!   abort_early: false
//! default_usage_limit:
//!   bucket: 3
//!   window_ms: 10000
//! commands:
//!   roll:
//!     usage_limit: { bucket: 1, window_ms: 2000, scope: group }
//!   ban:
//!     permission: { level: 5 }
//!   lewd:
//!     disabled: true
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chat_command_core::ValidatorOptions;
use serde::{Deserialize, Serialize};

use crate::command::CommandDefinition;
use crate::error::ConfigError;
use crate::permission::PermissionRequirement;
use crate::usage::UsageLimit;

/// Bot-wide dispatch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Text a message must start with to be treated as a command.
    pub prefix: String,
    /// Drop messages authored by bots.
    pub ignore_bots: bool,
    pub validation: ValidatorOptions,
    /// Applied to top-level commands that define no limit of their own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_usage_limit: Option<UsageLimit>,
    /// Per-command overrides, keyed by command name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub commands: BTreeMap<String, CommandOverride>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            ignore_bots: true,
            validation: ValidatorOptions::default(),
            default_usage_limit: None,
            commands: BTreeMap::new(),
        }
    }
}

/// Settings replacing a command's own definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<UsageLimit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<PermissionRequirement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
    /// Skip registration entirely.
    pub disabled: bool,
}

impl DispatchConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// holds invalid values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or holds invalid values.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() || self.prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "prefix must be non-empty without whitespace, got {:?}",
                self.prefix
            )));
        }
        let mut names: Vec<String> = self.commands.keys().map(|k| k.to_ascii_lowercase()).collect();
        names.sort();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::Invalid(format!(
                "commands: more than one override for `{}`",
                pair[0]
            )));
        }

        let limits = self
            .default_usage_limit
            .iter()
            .map(|limit| ("default_usage_limit".to_string(), limit))
            .chain(self.commands.iter().filter_map(|(name, o)| {
                o.usage_limit
                    .as_ref()
                    .map(|limit| (format!("commands.{name}.usage_limit"), limit))
            }));
        for (key, limit) in limits {
            if let Some(reason) = limit.problem() {
                return Err(ConfigError::Invalid(format!("{key}: {reason}")));
            }
        }
        Ok(())
    }

    /// Applies the default limit and any override to `definition`.
    ///
    /// Returns `false` when the command is disabled.
    pub fn apply(&self, definition: &mut CommandDefinition) -> bool {
        let options = definition.options_mut();
        if options.usage_limit.is_disabled() {
            if let Some(limit) = self.default_usage_limit {
                options.usage_limit = limit;
            }
        }

        let over = self
            .commands
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&options.name))
            .map(|(_, over)| over);
        let Some(over) = over else {
            return true;
        };
        if let Some(limit) = over.usage_limit {
            options.usage_limit = limit;
        }
        if let Some(requirement) = over.permission {
            options.permission = Some(requirement);
        }
        if let Some(nsfw) = over.nsfw {
            options.nsfw = nsfw;
        }
        !over.disabled
    }

    /// Strips the prefix from `content`.
    pub fn strip_prefix<'a>(&self, content: &'a str) -> Option<&'a str> {
        content.trim_start().strip_prefix(self.prefix.as_str())
    }
}
