//! Lifecycle hooks implemented by command authors.

use std::time::Duration;

use async_trait::async_trait;
use chat_command_core::{ValidationErrors, ValidationResults};

use crate::context::CommandContext;
use crate::error::{DispatchError, Result};
use crate::permission::PermissionRequirement;

/// Behavior of one command.
///
/// Every hook has a pass-through default, so a handler only overrides what
/// it needs. Hooks run in this order for a dispatch that clears all gates:
///
/// 1. [`should_dispatch`](Self::should_dispatch) (first gate)
/// 2. [`will_dispatch`](Self::will_dispatch)
/// 3. argument validation, then
///    [`did_catch_validation_errors`](Self::did_catch_validation_errors) on
///    failure
/// 4. [`did_dispatch`](Self::did_dispatch)
/// 5. [`did_dispatch_successfully`](Self::did_dispatch_successfully) or
///    [`did_dispatch_unsuccessfully`](Self::did_dispatch_unsuccessfully)
///
/// When a gate fails, the matching notification hook runs instead and the
/// dispatch stops there.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Custom gate evaluated before the built-in ones.
    async fn should_dispatch(&self, _ctx: &CommandContext) -> Result<bool> {
        Ok(true)
    }

    async fn will_dispatch(&self, _ctx: &CommandContext) -> Result<()> {
        Ok(())
    }

    /// The command body, with validated arguments.
    async fn did_dispatch(&self, _ctx: &CommandContext, _args: &ValidationResults) -> Result<()> {
        Ok(())
    }

    async fn did_dispatch_successfully(&self, _ctx: &CommandContext) -> Result<()> {
        Ok(())
    }

    async fn did_dispatch_unsuccessfully(
        &self,
        _ctx: &CommandContext,
        _error: &DispatchError,
    ) -> Result<()> {
        Ok(())
    }

    async fn did_catch_validation_errors(
        &self,
        _ctx: &CommandContext,
        _errors: &ValidationErrors,
    ) -> Result<()> {
        Ok(())
    }

    /// The invoker's usage bucket is exhausted.
    async fn did_exceed_usage_limit(
        &self,
        _ctx: &CommandContext,
        _retry_after: Option<Duration>,
    ) -> Result<()> {
        Ok(())
    }

    /// A restricted command was invoked outside a restricted channel.
    async fn did_reject_restricted_context(&self, _ctx: &CommandContext) -> Result<()> {
        Ok(())
    }

    async fn did_lack_permission(
        &self,
        _ctx: &CommandContext,
        _requirement: PermissionRequirement,
    ) -> Result<()> {
        Ok(())
    }
}
