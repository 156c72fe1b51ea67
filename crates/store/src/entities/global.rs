//! Per-cycle global state.

use chrono::{DateTime, Utc};
use rampart_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Singleton row of per-cycle globals.
///
/// `updated_at` is strictly non-decreasing: updates carrying an older
/// timestamp are rejected so a delayed feed snapshot can never roll the
/// cycle state backwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Global {
    /// Current cycle number, at least 1.
    pub cycle: i64,
    /// Consolidation vote percentage in [0, 100].
    pub consolidation: i64,
    /// Manual override to show nearly finished targets.
    pub show_almost_done: bool,
    /// Vote goal percentage in [0, 100].
    pub vote_goal: i64,
    /// When the row was last written, UTC.
    pub updated_at: DateTime<Utc>,
}

impl Global {
    /// A fresh row for the first observed cycle.
    pub fn new(cycle: i64, updated_at: DateTime<Utc>) -> Result<Self> {
        validate_cycle(cycle)?;
        Ok(Self { cycle, consolidation: 0, show_almost_done: false, vote_goal: 0, updated_at })
    }

    /// Apply an update stamped `updated_at`.
    ///
    /// Rejects stale timestamps and out-of-range values; on rejection the
    /// row is unchanged.
    pub fn update(
        &mut self,
        cycle: Option<i64>,
        consolidation: Option<i64>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        if updated_at < self.updated_at {
            return Err(Error::ValidationFail(
                "Date invalid or was older than current value.".into(),
            ));
        }
        if let Some(cycle) = cycle {
            validate_cycle(cycle)?;
        }
        if let Some(consolidation) = consolidation {
            validate_percent("consolidation", consolidation)?;
        }

        self.updated_at = updated_at;
        if let Some(cycle) = cycle {
            self.cycle = cycle;
        }
        if let Some(consolidation) = consolidation {
            self.consolidation = consolidation;
        }
        Ok(())
    }

    /// Set the vote goal percentage.
    pub fn set_vote_goal(&mut self, goal: i64) -> Result<()> {
        validate_percent("vote_goal", goal)?;
        self.vote_goal = goal;
        Ok(())
    }
}

fn validate_cycle(cycle: i64) -> Result<()> {
    if cycle < 1 {
        return Err(Error::ValidationFail(format!(
            "Bounds check failed for: cycle with value {cycle}"
        )));
    }
    Ok(())
}

fn validate_percent(key: &str, value: i64) -> Result<()> {
    if !(0..=100).contains(&value) {
        return Err(Error::ValidationFail(format!(
            "Bounds check failed for: {key} with value {value}"
        )));
    }
    Ok(())
}

impl fmt::Display for Global {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cycle {}: Consolidation Vote: {}%", self.cycle, self.consolidation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn stale_update_rejected_and_row_unchanged() {
        let now = Utc::now();
        let mut global = Global::new(300, now).unwrap();
        global.update(Some(301), Some(60), now + Duration::seconds(10)).unwrap();

        let err = global.update(Some(302), Some(70), now).unwrap_err();
        assert!(matches!(err, Error::ValidationFail(_)));
        assert_eq!(global.cycle, 301);
        assert_eq!(global.consolidation, 60);
    }

    #[test]
    fn equal_timestamp_is_accepted() {
        let now = Utc::now();
        let mut global = Global::new(300, now).unwrap();
        assert!(global.update(None, Some(55), now).is_ok());
        assert_eq!(global.consolidation, 55);
    }

    #[test]
    fn bounds_enforced() {
        let now = Utc::now();
        let mut global = Global::new(300, now).unwrap();
        assert!(global.update(Some(0), None, now).is_err());
        assert!(global.update(None, Some(101), now).is_err());
        assert!(global.set_vote_goal(-1).is_err());
        assert!(Global::new(0, now).is_err());
    }
}
