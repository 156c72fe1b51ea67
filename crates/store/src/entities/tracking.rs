//! Carrier tracking entities.
//!
//! Leadership registers centre systems to watch; the cached table is the
//! expanded set of every system within range of any centre, each row
//! remembering which centres cover it. Carrier rows are updated by the feed
//! ingester as jumps are observed.

use chrono::{DateTime, Duration, Utc};
use rampart_core::CarrierId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used to join centre names in [`TrackSystemCached`].
pub const TRACK_SYSTEM_SEP: &str = ", ";

/// Days without an update before a non-override carrier row is reaped.
pub const CARRIER_STALE_DAYS: i64 = 4;

/// A centre system tracked for carrier activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSystem {
    /// Centre system name.
    pub system: String,
    /// Radius in light years, non-negative.
    pub distance: i64,
}

impl fmt::Display for TrackSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tracking systems <= {}ly from {}", self.distance, self.system)
    }
}

/// One system inside the union of all tracked radii.
///
/// `overlaps_with` records every centre covering the system, joined with
/// [`TRACK_SYSTEM_SEP`]; when the last centre is removed the row is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSystemCached {
    /// Covered system name.
    pub system: String,
    /// Centre names covering this system.
    pub overlaps_with: String,
}

impl TrackSystemCached {
    /// Create a cached row covered by a single centre.
    pub fn new(system: &str, centre: &str) -> Self {
        Self { system: system.to_string(), overlaps_with: centre.to_string() }
    }

    /// Record an additional covering centre.
    pub fn add_overlap(&mut self, centre: &str) {
        if self.overlaps_with.split(TRACK_SYSTEM_SEP).any(|c| c.eq_ignore_ascii_case(centre)) {
            return;
        }
        if !self.overlaps_with.is_empty() {
            self.overlaps_with.push_str(TRACK_SYSTEM_SEP);
        }
        self.overlaps_with.push_str(centre);
    }

    /// Remove a covering centre. Returns true when the row should now be
    /// deleted because no centre covers it any more.
    pub fn remove_overlap(&mut self, centre: &str) -> bool {
        let kept: Vec<&str> = self
            .overlaps_with
            .split(TRACK_SYSTEM_SEP)
            .filter(|c| !c.eq_ignore_ascii_case(centre))
            .collect();
        self.overlaps_with = kept.join(TRACK_SYSTEM_SEP);
        self.overlaps_with.is_empty()
    }
}

/// A fleet carrier's last known position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedCarrier {
    /// Seven-character registration.
    pub id: CarrierId,
    /// Squadron the carrier belongs to, when known.
    pub squad: String,
    /// Current system.
    pub system: String,
    /// System before the last observed jump.
    pub last_system: String,
    /// Always track this id regardless of location.
    pub override_flag: bool,
    /// Last observation time, UTC.
    pub updated_at: DateTime<Utc>,
}

impl TrackedCarrier {
    /// First sighting of a carrier.
    pub fn first_seen(id: CarrierId, squad: &str, system: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            squad: squad.to_string(),
            system: system.to_string(),
            last_system: String::new(),
            override_flag: false,
            updated_at: now,
        }
    }

    /// The carrier was spotted in a new system; shift the position history.
    pub fn spotted(&mut self, new_system: &str, now: DateTime<Utc>) {
        self.last_system = std::mem::take(&mut self.system);
        self.system = new_system.to_string();
        self.updated_at = now;
    }

    /// Whether the row is old enough to reap. Override rows never are.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        !self.override_flag && now - self.updated_at > Duration::days(CARRIER_STALE_DAYS)
    }

    /// Cells for the `track ids` table.
    pub fn table_line(&self) -> [String; 4] {
        [
            self.id.to_string(),
            self.squad.clone(),
            self.system.clone(),
            self.last_system.clone(),
        ]
    }
}

impl fmt::Display for TrackedCarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let squad = if self.squad.is_empty() { "No Group" } else { &self.squad };
        let system = if self.system.is_empty() { "No Info" } else { &self.system };
        let last = if self.last_system.is_empty() { "No Info" } else { &self.last_system };
        write!(f, "{} [{}] jumped {} => {}", self.id, squad, last, system)
    }
}
