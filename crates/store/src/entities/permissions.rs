//! Command permissions.
//!
//! `AdminPerm` grants the admin console. `ChannelPerm` and `RolePerm`
//! restrict a command to listed channels or roles; with no rows present a
//! command is unrestricted.

use chrono::{DateTime, Utc};
use rampart_core::{ChannelId, Error, GuildId, Result, RoleId, UserId};
use serde::{Deserialize, Serialize};

/// An admin grant. All admins are equal except when removing another admin,
/// where the earlier creation date wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPerm {
    /// The admin's user id.
    pub id: UserId,
    /// When the grant was created, UTC.
    pub date: DateTime<Utc>,
}

impl AdminPerm {
    /// Check that `self` may remove `other`: strict seniority by date.
    pub fn may_remove(&self, other: &AdminPerm) -> Result<()> {
        if self.date > other.date {
            return Err(Error::InvalidPerms("You are not the senior admin. Refusing.".into()));
        }
        Ok(())
    }
}

/// Restrict `cmd` on a guild to a whitelisted channel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelPerm {
    /// Command name the rule applies to.
    pub cmd: String,
    /// Guild scope.
    pub guild_id: GuildId,
    /// Whitelisted channel.
    pub channel_id: ChannelId,
}

/// Restrict `cmd` on a guild to holders of a role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RolePerm {
    /// Command name the rule applies to.
    pub cmd: String,
    /// Guild scope.
    pub guild_id: GuildId,
    /// Whitelisted role.
    pub role_id: RoleId,
}
