//! Newtype identifiers shared across the bot.
//!
//! Chat-platform ids (users, guilds, channels, roles, messages) are stable
//! numeric snowflakes assigned by the platform. Carrier ids are fixed
//! seven-character codes assigned by the game.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

macro_rules! snowflake_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

snowflake_id!(
    /// A chat-platform user id.
    UserId
);
snowflake_id!(
    /// A chat-platform guild (server) id.
    GuildId
);
snowflake_id!(
    /// A chat-platform channel id.
    ChannelId
);
snowflake_id!(
    /// A chat-platform role id.
    RoleId
);
snowflake_id!(
    /// A chat-platform message id.
    MessageId
);

/// The length every carrier id carries, e.g. `ABC-123`.
pub const CARRIER_ID_LEN: usize = 7;

/// A fleet carrier's fixed seven-character registration code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarrierId(String);

impl CarrierId {
    /// Validate and wrap a raw carrier id.
    ///
    /// The id is uppercased; anything that is not exactly
    /// [`CARRIER_ID_LEN`] characters raises `ValidationFail`.
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.chars().count() != CARRIER_ID_LEN {
            return Err(Error::ValidationFail(format!(
                "carrier id must be {CARRIER_ID_LEN} characters, got {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carrier_id_accepts_seven_chars() {
        let id = CarrierId::new("abc-123").unwrap();
        assert_eq!(id.as_str(), "ABC-123");
    }

    #[test]
    fn carrier_id_rejects_wrong_length() {
        assert!(CarrierId::new("AB-12").is_err());
        assert!(CarrierId::new("ABCD-1234").is_err());
        assert!(CarrierId::new("").is_err());
    }

    #[test]
    fn carrier_id_trims_whitespace() {
        let id = CarrierId::new("  XYZ-9W9  ").unwrap();
        assert_eq!(id.as_str(), "XYZ-9W9");
    }

    #[test]
    fn snowflakes_display_as_numbers() {
        assert_eq!(UserId(42).to_string(), "42");
        assert_eq!(ChannelId::from(7).0, 7);
    }
}
