//! Snapshots of the external power-play intelligence feed.
//!
//! Each snapshot row carries the feed's own timestamp; an incoming snapshot
//! replaces the stored one only when it is at least as new. Rows live in
//! the reference side of the cache and survive sheet rescans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fortification/undermining state of one control system per the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpySystem {
    /// Cache id.
    pub id: i64,
    /// Control system name.
    pub system: String,
    /// Owning power.
    pub power: String,
    /// Reported fortification merits.
    pub fort: i64,
    /// Fort trigger per the feed.
    pub fort_trigger: i64,
    /// Reported undermining merits.
    pub um: i64,
    /// Undermine trigger per the feed.
    pub um_trigger: i64,
    /// Feed timestamp of the snapshot.
    pub updated_at: DateTime<Utc>,
}

/// A power's consolidation vote percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpyVote {
    /// Power name, unique.
    pub power: String,
    /// Vote percentage in [0, 100].
    pub vote: i64,
    /// Feed timestamp of the snapshot.
    pub updated_at: DateTime<Utc>,
}

/// Preparation merits for a candidate expansion system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpyPrep {
    /// Cache id.
    pub id: i64,
    /// Power preparing the system.
    pub power: String,
    /// Candidate system name.
    pub system: String,
    /// Accumulated preparation merits.
    pub merits: i64,
    /// Feed timestamp of the snapshot.
    pub updated_at: DateTime<Utc>,
}

/// Daily traffic count for a system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpyTraffic {
    /// System name, unique.
    pub system: String,
    /// Ships seen over the last day.
    pub day_count: i64,
    /// Feed timestamp of the snapshot.
    pub updated_at: DateTime<Utc>,
}

/// One row of a system's top-bounty table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpyBounty {
    /// Cache id.
    pub id: i64,
    /// System the bounty was earned in.
    pub system: String,
    /// Rank within the table, 1-based.
    pub pos: i64,
    /// Commander holding the rank.
    pub cmdr: String,
    /// Bounty value in credits.
    pub bounty: i64,
    /// Feed timestamp of the snapshot.
    pub updated_at: DateTime<Utc>,
}
