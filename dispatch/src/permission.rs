//! Permission levels and the service that checks them.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;

/// Level a command demands from its invoker.
///
/// With `exact` set, only invokers at precisely `level` pass. Otherwise any
/// level at or above it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequirement {
    pub level: u32,
    #[serde(default)]
    pub exact: bool,
}

impl PermissionRequirement {
    pub fn at_least(level: u32) -> Self {
        Self { level, exact: false }
    }

    pub fn exactly(level: u32) -> Self {
        Self { level, exact: true }
    }
}

/// Answers whether a message's author holds a permission level.
#[async_trait]
pub trait PermissionService: Send + Sync {
    /// `true` when the author's level is at least `level`.
    async fn check(&self, level: u32, message: &Message) -> Result<bool>;

    /// `true` when the author's level is exactly `level`.
    async fn check_exact(&self, level: u32, message: &Message) -> Result<bool>;

    /// Dispatches to [`check`](Self::check) or
    /// [`check_exact`](Self::check_exact) per the requirement.
    async fn satisfies(
        &self,
        requirement: PermissionRequirement,
        message: &Message,
    ) -> Result<bool> {
        if requirement.exact {
            self.check_exact(requirement.level, message).await
        } else {
            self.check(requirement.level, message).await
        }
    }
}

/// Fixed per-user level table.
///
/// # Examples
///
/// ```
/// use chat_command_dispatch::{LevelTable, Message};
///
/// let table = LevelTable::new().with_user("owner", 10);
/// assert_eq!(table.level_of(&Message::new("1", "owner", "c", "")), 10);
/// assert_eq!(table.level_of(&Message::new("2", "guest", "c", "")), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LevelTable {
    default_level: u32,
    users: HashMap<String, u32>,
}

impl LevelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level for authors not listed in the table.
    pub fn with_default(mut self, level: u32) -> Self {
        self.default_level = level;
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>, level: u32) -> Self {
        self.users.insert(user_id.into(), level);
        self
    }

    pub fn level_of(&self, message: &Message) -> u32 {
        self.users
            .get(&message.author_id)
            .copied()
            .unwrap_or(self.default_level)
    }
}

#[async_trait]
impl PermissionService for LevelTable {
    async fn check(&self, level: u32, message: &Message) -> Result<bool> {
        Ok(self.level_of(message) >= level)
    }

    async fn check_exact(&self, level: u32, message: &Message) -> Result<bool> {
        Ok(self.level_of(message) == level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from(author: &str) -> Message {
        Message::new("m", author, "c", "")
    }

    #[tokio::test]
    async fn test_at_least_accepts_higher_levels() {
        let table = LevelTable::new().with_user("mod", 5).with_user("admin", 9);
        let requirement = PermissionRequirement::at_least(5);

        assert!(table.satisfies(requirement, &from("mod")).await.unwrap());
        assert!(table.satisfies(requirement, &from("admin")).await.unwrap());
        assert!(!table.satisfies(requirement, &from("guest")).await.unwrap());
    }

    #[tokio::test]
    async fn test_exact_rejects_higher_levels() {
        let table = LevelTable::new().with_user("mod", 5).with_user("admin", 9);
        let requirement = PermissionRequirement::exactly(5);

        assert!(table.satisfies(requirement, &from("mod")).await.unwrap());
        assert!(!table.satisfies(requirement, &from("admin")).await.unwrap());
    }

    #[test]
    fn test_requirement_yaml_defaults_to_at_least() {
        let requirement: PermissionRequirement = serde_yaml::from_str("level: 3").unwrap();
        assert_eq!(requirement, PermissionRequirement::at_least(3));
    }
}
