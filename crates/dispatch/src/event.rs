//! The chat event model and transport capability.
//!
//! The actual chat platform lives behind [`ChatTransport`]; the dispatcher
//! only ever sees [`ChatEvent`] values the transport adapter built.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use rampart_core::{ChannelId, GuildId, MessageId, Result, RoleId, UserId};

/// A role the author holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRole {
    /// Role id.
    pub id: RoleId,
    /// Display name of the role.
    pub name: String,
}

/// The author of an event, or a mentioned user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatAuthor {
    /// Stable platform id.
    pub id: UserId,
    /// Current display name.
    pub display_name: String,
    /// Roles held on the guild.
    pub roles: Vec<ChatRole>,
    /// Mention string, e.g. `<@1234>`.
    pub mention: String,
}

impl ChatAuthor {
    /// A bare author for tests and internal events.
    pub fn new(id: UserId, display_name: &str) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            roles: Vec::new(),
            mention: format!("<@{id}>"),
        }
    }

    /// Ids of all held roles.
    pub fn role_ids(&self) -> Vec<RoleId> {
        self.roles.iter().map(|r| r.id).collect()
    }
}

/// One inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    /// Guild the message arrived on.
    pub guild_id: GuildId,
    /// Guild display name, for logs.
    pub guild_name: String,
    /// Channel the message arrived on.
    pub channel_id: ChannelId,
    /// Channel display name, for logs.
    pub channel_name: String,
    /// The message id, for deletion after TTL.
    pub message_id: MessageId,
    /// Who sent it.
    pub author: ChatAuthor,
    /// Raw message text.
    pub content: String,
    /// Users mentioned in the message.
    pub mentions: Vec<ChatAuthor>,
    /// Channels mentioned in the message.
    pub channel_mentions: Vec<ChannelId>,
    /// Roles mentioned in the message.
    pub role_mentions: Vec<RoleId>,
    /// Platform timestamp.
    pub timestamp: DateTime<Utc>,
}

impl ChatEvent {
    /// Context string for error logs: who sent what from where.
    pub fn log_context(&self) -> String {
        format!(
            "{} sent {:?} from {}/{}",
            self.author.display_name, self.content, self.channel_name, self.guild_name
        )
    }
}

/// Capability onto the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a message to a channel.
    async fn send(&self, channel: ChannelId, text: &str) -> Result<MessageId>;

    /// Send a message that self-deletes after `ttl`.
    async fn send_ttl(&self, channel: ChannelId, text: &str, ttl: Duration) -> Result<()>;

    /// Delete a message.
    async fn delete(&self, channel: ChannelId, message: MessageId) -> Result<()>;

    /// Broadcast to every guild the bot serves.
    async fn broadcast(&self, text: &str) -> Result<()>;
}
