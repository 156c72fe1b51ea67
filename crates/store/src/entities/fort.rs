//! Fortification campaign entities.
//!
//! A cycle's fort sheet holds one column per system and one row per
//! contributor; drops intersect the two. `FortOrder` rows let leadership
//! override the sheet order of targets; while any exist, only the override
//! list is served.

use rampart_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a sheet column is a standard fort target or an expansion prep.
///
/// A fort target is complete once its trigger is reached; a prep is never
/// complete, the winner has the higher of forts vs undermining at tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FortKind {
    /// Standard fortification target.
    #[default]
    Fort,
    /// System being prepared for expansion.
    Prep,
}

/// A contributor row on the fort sheet.
///
/// The name is expected to equal some [`ChatUser::pref_name`] and the row is
/// unique per document. Rows are replaced wholesale on a full scan.
///
/// [`ChatUser::pref_name`]: super::user::ChatUser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortUser {
    /// Cache id.
    pub id: i64,
    /// Sheet name, matches a chat user's preferred name.
    pub name: String,
    /// 1-based sheet row.
    pub row: usize,
    /// Battle-cry beside the row.
    pub cry: String,
}

/// One system column on the fort sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FortSystem {
    /// Cache id.
    pub id: i64,
    /// System name, unique.
    pub name: String,
    /// Fort target or expansion prep.
    pub kind: FortKind,
    /// Manually reported fort merits.
    pub fort_status: i64,
    /// Merits required to fortify, at least 1.
    pub trigger: i64,
    /// Completion fraction override in [0, 1]; >= 1 forces fortified.
    pub fort_override: f64,
    /// Manually reported undermining merits.
    pub um_status: i64,
    /// Undermining fraction in [0, 1].
    pub undermine: f64,
    /// Distance from headquarters in light years.
    pub distance: f64,
    /// Free-text notes; drives priority/skip/medium flags.
    pub notes: String,
    /// Sheet column in A1 letters, unique.
    pub sheet_col: String,
    /// Position of the column in the sheet.
    pub sheet_order: i64,
    /// Manual ordinal when leadership overrides the order.
    pub manual_order: Option<i64>,
}

impl FortSystem {
    /// The higher of the manual fort status and the summed drops.
    pub fn current_status(&self, cmdr_merits: i64) -> i64 {
        self.fort_status.max(cmdr_merits)
    }

    /// Merits still required to fortify, floored at zero.
    pub fn missing(&self, cmdr_merits: i64) -> i64 {
        (self.trigger - self.current_status(cmdr_merits)).max(0)
    }

    /// Fortified when the override says so or the trigger is met.
    pub fn is_fortified(&self, cmdr_merits: i64) -> bool {
        self.fort_override >= 1.0 || self.current_status(cmdr_merits) >= self.trigger
    }

    /// Undermined when the enemy fraction reached 100%.
    pub fn is_undermined(&self) -> bool {
        self.undermine >= 1.0
    }

    /// Notes mark the system as a priority target.
    pub fn is_priority(&self) -> bool {
        self.notes.to_lowercase().contains("priority")
    }

    /// Notes mark the system to be left alone.
    pub fn is_skipped(&self) -> bool {
        let notes = self.notes.to_lowercase();
        notes.contains("leave") || notes.contains("skip")
    }

    /// Notes restrict the system to small/medium pads.
    pub fn is_medium(&self) -> bool {
        self.notes.to_lowercase().contains("s/m")
    }

    /// Close enough to finished that it is parked below the threshold.
    pub fn is_deferred(&self, cmdr_merits: i64, defer_missing: i64) -> bool {
        let missing = self.missing(cmdr_merits);
        missing > 0 && missing <= defer_missing
    }

    /// Prep columns are identified by kind.
    pub fn is_prep(&self) -> bool {
        self.kind == FortKind::Prep
    }

    /// Fort completion percentage, one decimal.
    pub fn completion(&self, cmdr_merits: i64) -> String {
        let pct = if self.trigger == 0 {
            0.0
        } else {
            self.current_status(cmdr_merits) as f64 / self.trigger as f64 * 100.0
        };
        format!("{pct:.1}")
    }

    /// Undermine percentage, one decimal.
    pub fn ump(&self) -> String {
        format!("{:.1}", self.undermine * 100.0)
    }

    /// Apply a `fort[:um]` status update from a command.
    ///
    /// Both components must be non-negative integers.
    pub fn set_status(&mut self, new_status: &str) -> Result<()> {
        let mut parts = new_status.splitn(2, ':');

        let fort = parse_status_component(parts.next().unwrap_or(""))?;
        self.fort_status = fort;

        if let Some(um_part) = parts.next() {
            self.um_status = parse_status_component(um_part)?;
        }

        Ok(())
    }
}

fn parse_status_component(part: &str) -> Result<i64> {
    let val: i64 = part
        .trim()
        .parse()
        .map_err(|_| Error::InvalidCommandArgs(format!("Status must be a number, got {part:?}")))?;
    if val < 0 {
        return Err(Error::InvalidCommandArgs(
            "New fort/um status must be in range: [0, \u{221e}]".into(),
        ));
    }
    Ok(val)
}

/// One contributor's merits dropped at one system. Unique per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortDrop {
    /// Cache id.
    pub id: i64,
    /// Contributor reference.
    pub user_id: i64,
    /// Target reference.
    pub system_id: i64,
    /// Accumulated merits, clamped at zero.
    pub amount: i64,
}

/// Manual override of the fort order.
///
/// While any rows exist, only systems named here are served as targets, in
/// ordinal order. Ordinals stay a gapless 1..k permutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortOrder {
    /// 1-based position, unique.
    pub order: i64,
    /// Target name, unique, references a fort system by name.
    pub system_name: String,
}

impl fmt::Display for FortSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.name, self.fort_status, self.trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> FortSystem {
        FortSystem {
            id: 1,
            name: "Frey".into(),
            kind: FortKind::Fort,
            fort_status: 4210,
            trigger: 4910,
            fort_override: 0.0,
            um_status: 0,
            undermine: 0.0,
            distance: 116.99,
            notes: String::new(),
            sheet_col: "G".into(),
            sheet_order: 1,
            manual_order: None,
        }
    }

    #[test]
    fn current_status_takes_max() {
        let sys = system();
        assert_eq!(sys.current_status(0), 4210);
        assert_eq!(sys.current_status(4500), 4500);
    }

    #[test]
    fn missing_floors_at_zero() {
        let sys = system();
        assert_eq!(sys.missing(0), 700);
        assert_eq!(sys.missing(9999), 0);
    }

    #[test]
    fn fortified_by_trigger_or_override() {
        let mut sys = system();
        assert!(!sys.is_fortified(0));
        assert!(sys.is_fortified(4910));

        sys.fort_override = 1.0;
        assert!(sys.is_fortified(0));
    }

    #[test]
    fn note_flags() {
        let mut sys = system();
        sys.notes = "S/M Priority, Skip".into();
        assert!(sys.is_medium());
        assert!(sys.is_priority());
        assert!(sys.is_skipped());

        sys.notes = "Leave for now".into();
        assert!(sys.is_skipped());
        assert!(!sys.is_medium());
    }

    #[test]
    fn deferred_band() {
        let sys = system();
        // missing = 700 with no drops
        assert!(sys.is_deferred(0, 750));
        assert!(!sys.is_deferred(0, 650));
        assert!(!sys.is_deferred(4910, 750));
    }

    #[test]
    fn set_status_both_components() {
        let mut sys = system();
        sys.set_status("4444:2000").unwrap();
        assert_eq!(sys.fort_status, 4444);
        assert_eq!(sys.um_status, 2000);

        sys.set_status("5000").unwrap();
        assert_eq!(sys.fort_status, 5000);
        assert_eq!(sys.um_status, 2000);
    }

    #[test]
    fn set_status_rejects_negative_and_junk() {
        let mut sys = system();
        assert!(sys.set_status("-5").is_err());
        assert!(sys.set_status("abc").is_err());
        assert!(sys.set_status("10:-1").is_err());
    }

    #[test]
    fn completion_handles_zero_trigger() {
        let mut sys = system();
        sys.trigger = 0;
        assert_eq!(sys.completion(100), "0.0");
    }

    proptest::proptest! {
        #[test]
        fn status_identities(
            fort_status in 0i64..20_000,
            merits in 0i64..20_000,
            trigger in 1i64..20_000,
        ) {
            let mut sys = system();
            sys.fort_status = fort_status;
            sys.trigger = trigger;

            let current = sys.current_status(merits);
            proptest::prop_assert_eq!(current, fort_status.max(merits));
            proptest::prop_assert!(sys.missing(merits) >= 0);
            // Fortified exactly when nothing is missing (no override set).
            proptest::prop_assert_eq!(sys.is_fortified(merits), sys.missing(merits) == 0);
        }
    }
}
