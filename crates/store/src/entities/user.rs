//! Chat-platform users known to the bot.

use rampart_core::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chat user, created on first command and never destroyed by normal flows.
///
/// `pref_name` is the name the user goes by on the sheets and is unique
/// across all users; contributor rows reference it. `pref_cry` is the
/// battle-cry written beside their sheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    /// Stable platform id.
    pub id: UserId,
    /// Current display name on the platform, refreshed on every command.
    pub display_name: String,
    /// Sheet name, unique across users.
    pub pref_name: String,
    /// Battle-cry copied to sheet rows.
    pub pref_cry: String,
}

impl ChatUser {
    /// Create a user whose sheet name starts as their display name.
    pub fn new(id: UserId, display_name: &str) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            pref_name: display_name.to_string(),
            pref_cry: String::new(),
        }
    }
}

impl fmt::Display for ChatUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (sheet name {})", self.display_name, self.pref_name)
    }
}
