//! Built-in commands hosted by the console.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chat_command_core::{
    ArraySchema, Limit, NumberSchema, SchemaBuilder, SchemaMap, StringSchema, ValidationErrors,
    ValidationResults,
};
use chat_command_dispatch::{
    CommandContext, CommandDefinition, CommandHandler, CommandOptions, DispatchError,
    FormatOptions, PermissionRequirement, Result, UsageLimit,
};
use serde_json::Value;

/// Longest sequence `range` prints.
const MAX_RANGE: usize = 50;

/// Largest magnitude `range` accepts for either end.
const RANGE_BOUND: i32 = 1_000_000;

/// Level required to manage roles.
const ROLE_ADMIN_LEVEL: u32 = 5;

#[derive(Debug, Clone, Copy)]
enum Action {
    Ping,
    Range,
    Sum,
    RoleList,
    RoleAdd,
    RoleRemove,
    Lewd,
}

type RoleSet = Arc<Mutex<BTreeSet<String>>>;

struct Demo {
    action: Action,
    roles: RoleSet,
}

/// Definitions of every console command.
pub fn definitions() -> Vec<CommandDefinition> {
    let roles = RoleSet::default();
    let demo = |action| Demo {
        action,
        roles: Arc::clone(&roles),
    };
    let role_name = || {
        SchemaMap::new().field("name", StringSchema::new().trim().lowercase().min(2).max(32))
    };
    let range_end = || NumberSchema::new().integer().min(-RANGE_BOUND).max(RANGE_BOUND);

    vec![
        CommandDefinition::new(
            CommandOptions::new("ping")
                .with_description("Replies with pong")
                .with_usage_limit(UsageLimit::new(3, Duration::from_secs(10))),
            demo(Action::Ping),
        ),
        CommandDefinition::new(
            CommandOptions::new("range")
                .with_alias("seq")
                .with_description("Lists whole numbers from start to end")
                .with_args(
                    SchemaMap::new()
                        .field("start", range_end())
                        .field("end", range_end().greater(Limit::reference("start")))
                        .field("step", NumberSchema::new().integer().positive().optional()),
                ),
            demo(Action::Range),
        ),
        CommandDefinition::new(
            CommandOptions::new("sum")
                .with_alias("total")
                .with_description("Adds numbers")
                .with_args(
                    SchemaMap::new().rest("numbers", ArraySchema::of(NumberSchema::new()).min(1)),
                ),
            demo(Action::Sum),
        ),
        CommandDefinition::new(
            CommandOptions::new("role")
                .with_description("Lists roles")
                .with_permission(PermissionRequirement::at_least(ROLE_ADMIN_LEVEL)),
            demo(Action::RoleList),
        )
        .with_subcommand(CommandDefinition::new(
            CommandOptions::new("add")
                .as_subcommand()
                .with_description("Creates a role")
                .with_permission(PermissionRequirement::at_least(ROLE_ADMIN_LEVEL))
                .with_args(role_name()),
            demo(Action::RoleAdd),
        ))
        .with_subcommand(CommandDefinition::new(
            CommandOptions::new("remove")
                .with_alias("rm")
                .as_subcommand()
                .with_description("Deletes a role")
                .with_permission(PermissionRequirement::at_least(ROLE_ADMIN_LEVEL))
                .with_args(role_name()),
            demo(Action::RoleRemove),
        )),
        CommandDefinition::new(
            CommandOptions::new("lewd")
                .nsfw()
                .with_description("Only answers in restricted channels"),
            demo(Action::Lewd),
        ),
    ]
}

impl Demo {
    fn roles(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.roles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond(&self, args: &ValidationResults) -> Result<String> {
        match self.action {
            Action::Ping => Ok("pong".to_string()),
            Action::Range => {
                let whole = |key: &str| {
                    args.get_i64(key).ok_or_else(|| {
                        DispatchError::handler(format!("{key} is not a whole number"))
                    })
                };
                let (start, end) = (whole("start")?, whole("end")?);
                let step = usize::try_from(args.get_i64("step").unwrap_or(1))
                    .map_err(|_| DispatchError::handler("step is out of range"))?;
                let values: Vec<String> = (start..=end)
                    .step_by(step)
                    .take(MAX_RANGE)
                    .map(|n| n.to_string())
                    .collect();
                Ok(values.join(" "))
            }
            Action::Sum => {
                let total: f64 = args
                    .get_array("numbers")
                    .map(|numbers| numbers.iter().filter_map(Value::as_f64).sum())
                    .unwrap_or_default();
                Ok(total.to_string())
            }
            Action::RoleList => {
                let roles = self.roles();
                if roles.is_empty() {
                    Ok("no roles".to_string())
                } else {
                    Ok(roles.iter().cloned().collect::<Vec<_>>().join(", "))
                }
            }
            Action::RoleAdd => {
                let name = args.get_str("name").unwrap_or_default();
                if !self.roles().insert(name.to_string()) {
                    return Err(DispatchError::handler(format!("role `{name}` already exists")));
                }
                Ok(format!("added role `{name}`"))
            }
            Action::RoleRemove => {
                let name = args.get_str("name").unwrap_or_default();
                if !self.roles().remove(name) {
                    return Err(DispatchError::handler(format!("no role named `{name}`")));
                }
                Ok(format!("removed role `{name}`"))
            }
            Action::Lewd => Ok("( ͡° ͜ʖ ͡°)".to_string()),
        }
    }
}

#[async_trait]
impl CommandHandler for Demo {
    async fn did_dispatch(&self, ctx: &CommandContext, args: &ValidationResults) -> Result<()> {
        let reply = self.respond(args)?;
        let options = match self.action {
            Action::Range | Action::Sum => FormatOptions::reply_to(&ctx.message.id).code("text"),
            _ => FormatOptions::reply_to(&ctx.message.id),
        };
        ctx.send(&reply, &options).await?;
        Ok(())
    }

    async fn did_dispatch_unsuccessfully(
        &self,
        ctx: &CommandContext,
        error: &DispatchError,
    ) -> Result<()> {
        ctx.reply(&format!("error: {error}")).await?;
        Ok(())
    }

    async fn did_catch_validation_errors(
        &self,
        ctx: &CommandContext,
        errors: &ValidationErrors,
    ) -> Result<()> {
        ctx.reply(&errors.messages().join("\n")).await?;
        Ok(())
    }

    async fn did_exceed_usage_limit(
        &self,
        ctx: &CommandContext,
        retry_after: Option<Duration>,
    ) -> Result<()> {
        let wait = retry_after.unwrap_or_default().as_secs_f64();
        ctx.reply(&format!("slow down, try again in {wait:.1}s")).await?;
        Ok(())
    }

    async fn did_reject_restricted_context(&self, ctx: &CommandContext) -> Result<()> {
        ctx.reply("this command only works in restricted channels").await?;
        Ok(())
    }

    async fn did_lack_permission(
        &self,
        ctx: &CommandContext,
        requirement: PermissionRequirement,
    ) -> Result<()> {
        ctx.reply(&format!("you need permission level {}", requirement.level))
            .await?;
        Ok(())
    }
}
