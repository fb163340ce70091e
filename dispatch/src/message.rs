//! Inbound message model and the outbound transport trait.
//!
//! The chat platform client is external. It converts platform events into
//! [`Message`] values and implements [`MessageTransport`] for replies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The channel a message arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    /// Whether the channel allows restricted (nsfw) content.
    #[serde(default)]
    pub restricted: bool,
}

/// An inbound chat message.
///
/// # Examples
///
/// ```
/// use chat_command_dispatch::Message;
///
/// let message = Message::new("m1", "alice", "general", "!ping")
///     .in_group("guild-7")
///     .in_restricted_channel();
/// assert_eq!(message.group_id.as_deref(), Some("guild-7"));
/// assert!(message.channel.restricted);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub author_id: String,
    /// Whether the author is a bot account.
    #[serde(default)]
    pub author_is_bot: bool,
    pub channel: Channel,
    /// Containing group (server, guild, workspace); `None` in direct messages.
    #[serde(default)]
    pub group_id: Option<String>,
    pub content: String,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        author_id: impl Into<String>,
        channel_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            author_is_bot: false,
            channel: Channel {
                id: channel_id.into(),
                restricted: false,
            },
            group_id: None,
            content: content.into(),
        }
    }

    pub fn in_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn in_restricted_channel(mut self) -> Self {
        self.channel.restricted = true;
        self
    }

    pub fn from_bot(mut self) -> Self {
        self.author_is_bot = true;
        self
    }
}

/// Presentation hints for an outbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Wrap the content in a code block with this language tag.
    pub code_block: Option<String>,
    /// Message id to reply to.
    pub reply_to: Option<String>,
    /// Suppress notifications.
    pub silent: bool,
}

impl FormatOptions {
    pub fn reply_to(message_id: impl Into<String>) -> Self {
        Self {
            reply_to: Some(message_id.into()),
            ..Self::default()
        }
    }

    pub fn code(mut self, language: impl Into<String>) -> Self {
        self.code_block = Some(language.into());
        self
    }

    /// Applies the text-level options to `content`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chat_command_dispatch::FormatOptions;
    ///
    /// let rendered = FormatOptions::default().code("json").render("{}");
    /// assert_eq!(rendered, "```json\n{}\n```");
    /// ```
    pub fn render(&self, content: &str) -> String {
        match &self.code_block {
            Some(language) => format!("```{language}\n{content}\n```"),
            None => content.to_string(),
        }
    }
}

/// A message accepted by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: String,
    pub channel_id: String,
    pub content: String,
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Sends `content` to `channel_id`.
    async fn send(
        &self,
        channel_id: &str,
        content: &str,
        options: &FormatOptions,
    ) -> Result<SentMessage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_platform_json() {
        let message: Message = serde_json::from_str(
            r#"{
                "id": "981",
                "author_id": "alice",
                "channel": { "id": "general" },
                "content": "!ping"
            }"#,
        )
        .unwrap();

        assert_eq!(message, Message::new("981", "alice", "general", "!ping"));
        assert!(!message.author_is_bot);
        assert!(message.group_id.is_none());
    }

    #[test]
    fn test_render_without_code_block() {
        let options = FormatOptions::reply_to("m1");
        assert_eq!(options.render("plain"), "plain");
        assert_eq!(options.reply_to.as_deref(), Some("m1"));
    }
}
