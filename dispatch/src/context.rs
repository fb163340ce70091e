use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::message::{FormatOptions, Message, MessageTransport, SentMessage};

/// The message being dispatched plus a handle for answering it.
#[derive(Clone)]
pub struct CommandContext {
    pub message: Message,
    transport: Arc<dyn MessageTransport>,
}

impl CommandContext {
    pub fn new(message: Message, transport: Arc<dyn MessageTransport>) -> Self {
        Self { message, transport }
    }

    /// Replies to the triggering message in its channel.
    pub async fn reply(&self, content: &str) -> Result<SentMessage> {
        self.send(content, &FormatOptions::reply_to(&self.message.id))
            .await
    }

    /// Sends to the triggering message's channel.
    pub async fn send(&self, content: &str, options: &FormatOptions) -> Result<SentMessage> {
        self.transport
            .send(&self.message.channel.id, content, options)
            .await
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}
