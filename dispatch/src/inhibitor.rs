//! Gates evaluated before a command runs.
//!
//! Gates run in a fixed order and stop at the first failure:
//!
//! 1. [`Inhibitor::Predicate`]: `should_dispatch` returns `false`. No hook.
//! 2. [`Inhibitor::UsageLimit`]: the invoker's bucket is exhausted.
//!    Notifies `did_exceed_usage_limit`.
//! 3. [`Inhibitor::RestrictedContext`]: an nsfw command is used outside a
//!    restricted channel. Notifies `did_reject_restricted_context`.
//! 4. [`Inhibitor::Permission`]: the permission service denies the level.
//!    Notifies `did_lack_permission`.
//!
//! The usage gate records the use before later gates run, so a use that
//! is then denied for permissions still counts against the bucket.

use std::fmt;

use tracing::trace;

use crate::command::Command;
use crate::context::CommandContext;
use crate::error::Result;

/// The gate that stopped a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Inhibitor {
    Predicate,
    UsageLimit,
    RestrictedContext,
    Permission,
}

impl Inhibitor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Predicate => "predicate",
            Self::UsageLimit => "usage_limit",
            Self::RestrictedContext => "restricted_context",
            Self::Permission => "permission",
        }
    }
}

impl fmt::Display for Inhibitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Command {
    /// `true` when every gate passes for `ctx`.
    ///
    /// # Errors
    ///
    /// Propagates failures of the permission service and of hooks.
    pub async fn compose_inhibitors(&self, ctx: &CommandContext) -> Result<bool> {
        Ok(self.run_inhibitors(ctx).await?.is_none())
    }

    /// Runs the gates in order and returns the first that fails.
    pub async fn run_inhibitors(&self, ctx: &CommandContext) -> Result<Option<Inhibitor>> {
        if !self.handler.should_dispatch(ctx).await? {
            return Ok(Some(Inhibitor::Predicate));
        }

        let scope = self.usage.limit().scope_key(&ctx.message);
        if !self.usage.allow_usage(scope) {
            let retry_after = self.usage.retry_after(scope);
            self.handler.did_exceed_usage_limit(ctx, retry_after).await?;
            return Ok(Some(Inhibitor::UsageLimit));
        }

        if self.options.nsfw && !ctx.message.channel.restricted {
            self.handler.did_reject_restricted_context(ctx).await?;
            return Ok(Some(Inhibitor::RestrictedContext));
        }

        if let (Some(requirement), Some(service)) = (self.options.permission, &self.permissions) {
            if !service.satisfies(requirement, &ctx.message).await? {
                self.handler.did_lack_permission(ctx, requirement).await?;
                return Ok(Some(Inhibitor::Permission));
            }
        }

        trace!(command = self.name(), "All gates passed");
        Ok(None)
    }
}
