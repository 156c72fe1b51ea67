//! The kill-on-sight registry.

use serde::{Deserialize, Serialize};

/// One pilot on the KOS sheet. No two entries share a cmdr name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KosEntry {
    /// Cache id.
    pub id: i64,
    /// Commander name, unique.
    pub cmdr: String,
    /// Squadron or faction the pilot flies for.
    pub squad: String,
    /// Why the pilot is listed.
    pub reason: String,
    /// Whitelisted friendlies are listed too, flagged.
    pub is_friendly: bool,
}

impl KosEntry {
    /// The verdict column as shown to users.
    pub fn verdict(&self) -> &'static str {
        if self.is_friendly {
            "FRIENDLY"
        } else {
            "KILL"
        }
    }
}
