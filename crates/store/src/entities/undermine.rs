//! Undermining campaign entities.
//!
//! Two undermine sheets exist per cycle: the main sheet and the snipe sheet
//! for hits against other powers. Systems occupy column pairs; contributors
//! hold merits against a system and redeem them at a control later.

use rampart_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which undermine sheet a record belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UmSheet {
    /// The main undermining sheet.
    #[default]
    Main,
    /// The snipe sheet.
    Snipe,
}

/// What kind of undermining effort a system column represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UmKind {
    /// An enemy control system we undermine.
    #[default]
    Control,
    /// An expansion we want to win.
    Expand,
    /// An enemy expansion we oppose.
    Oppose,
}

/// A contributor row on an undermine sheet. Unique per (sheet, row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UmUser {
    /// Cache id.
    pub id: i64,
    /// Which sheet the row is on.
    pub sheet: UmSheet,
    /// Sheet name, matches a chat user's preferred name.
    pub name: String,
    /// 1-based sheet row.
    pub row: usize,
    /// Battle-cry beside the row.
    pub cry: String,
}

/// A system column pair on an undermine sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UmSystem {
    /// Cache id.
    pub id: i64,
    /// Which sheet the system is on.
    pub sheet: UmSheet,
    /// System name.
    pub name: String,
    /// Control, expansion, or opposition.
    pub kind: UmKind,
    /// First column of the pair in A1 letters, unique within the sheet.
    pub sheet_col: String,
    /// Merits needed to finish the effort.
    pub goal: i64,
    /// Security string, e.g. `Low`.
    pub security: String,
    /// Free text; for oppositions the first word names the expansion power.
    pub notes: String,
    /// Nearest friendly control system.
    pub close_control: String,
    /// Priority string, e.g. `Normal`; `leave`/`skip` marks the column idle.
    pub priority: String,
    /// Our progress as reported in game.
    pub progress_us: i64,
    /// Enemy progress as a fraction.
    pub progress_them: f64,
    /// Correction between the in-game map and summed merits.
    pub map_offset: i64,
    /// Expansion trigger, only meaningful for expand/oppose columns.
    pub exp_trigger: i64,
}

impl UmSystem {
    /// Merits still required, from the better of sheet merits and reported
    /// progress. May go negative once the goal is exceeded.
    pub fn missing(&self, cmdr_merits: i64) -> i64 {
        self.goal - (cmdr_merits + self.map_offset).max(self.progress_us)
    }

    /// Control systems finish when nothing is missing; expansions and
    /// oppositions are only resolved at the cycle tick.
    pub fn is_undermined(&self, cmdr_merits: i64) -> bool {
        match self.kind {
            UmKind::Control => self.missing(cmdr_merits) <= 0,
            UmKind::Expand | UmKind::Oppose => false,
        }
    }

    /// Priority string marks the column as skipped.
    pub fn is_skipped(&self) -> bool {
        let priority = self.priority.to_lowercase();
        priority.contains("leave") || priority.contains("skip")
    }

    /// Completion summary. Controls report a percentage of the goal;
    /// expansions compare our trigger progress against enemy progress.
    pub fn completion(&self, cmdr_merits: i64) -> String {
        match self.kind {
            UmKind::Control => {
                let pct = if self.goal == 0 {
                    0.0
                } else {
                    (self.goal - self.missing(cmdr_merits)) as f64 / self.goal as f64 * 100.0
                };
                format!("{pct:.0}%")
            }
            UmKind::Expand | UmKind::Oppose => {
                let ours = if self.exp_trigger == 0 {
                    0.0
                } else {
                    self.progress_us.max(cmdr_merits + self.map_offset) as f64 * 100.0
                        / self.exp_trigger as f64
                };
                let margin = ours - self.progress_them * 100.0;
                let prefix = if margin >= 0.0 { "Leading by" } else { "Behind by" };
                format!("{prefix} {:.0}%", margin.abs())
            }
        }
    }

    /// Descriptive prefix for display.
    pub fn descriptor(&self) -> String {
        match self.kind {
            UmKind::Control => "Control".to_string(),
            UmKind::Expand => "Expand".to_string(),
            UmKind::Oppose => {
                let suffix =
                    self.notes.split_whitespace().next().unwrap_or("expansion").to_string();
                format!("Opposing {suffix}")
            }
        }
    }

    /// Apply a `progress_us[:progress_them%]` update from a command.
    pub fn set_status(&mut self, new_status: &str) -> Result<()> {
        let mut parts = new_status.splitn(2, ':');

        let us_part = parts.next().unwrap_or("");
        let us: i64 = us_part.trim().parse().map_err(|_| {
            Error::InvalidCommandArgs(format!("Progress must be a number, got {us_part:?}"))
        })?;
        if us < 0 {
            return Err(Error::InvalidCommandArgs(
                "New \"progress us\" must be a number of merits in range: [0, \u{221e}]".into(),
            ));
        }

        if let Some(them_part) = parts.next() {
            let them: f64 = them_part.trim().parse().map_err(|_| {
                Error::InvalidCommandArgs(format!(
                    "Progress percentage must be a number, got {them_part:?}"
                ))
            })?;
            if them < 0.0 {
                return Err(Error::InvalidCommandArgs(
                    "New \"progress them\" must be a % in range: [0, \u{221e}]".into(),
                ));
            }
            self.progress_them = them / 100.0;
        }

        self.progress_us = us;
        Ok(())
    }
}

/// A contributor's held and redeemed merits within one undermining system.
/// Unique per (sheet, user, system). Both quantities stay non-negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UmHold {
    /// Cache id.
    pub id: i64,
    /// Which sheet the hold is on.
    pub sheet: UmSheet,
    /// Contributor reference.
    pub user_id: i64,
    /// System reference.
    pub system_id: i64,
    /// Merits currently held (lost on death).
    pub held: i64,
    /// Merits already redeemed.
    pub redeemed: i64,
}

impl UmHold {
    /// Set the held amount; negative values are a validation failure.
    pub fn set_held(&mut self, held: i64) -> Result<()> {
        if held < 0 {
            return Err(Error::ValidationFail(format!("held must be >= 0, got {held}")));
        }
        self.held = held;
        Ok(())
    }

    /// Move all held merits into redeemed. Returns the amount moved.
    pub fn redeem(&mut self) -> i64 {
        let moved = self.held;
        self.redeemed += moved;
        self.held = 0;
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control() -> UmSystem {
        UmSystem {
            id: 1,
            sheet: UmSheet::Main,
            name: "Burr".into(),
            kind: UmKind::Control,
            sheet_col: "D".into(),
            goal: 12000,
            security: "Low".into(),
            notes: String::new(),
            close_control: "Dongkum".into(),
            priority: "Normal".into(),
            progress_us: 0,
            progress_them: 0.0,
            map_offset: 0,
            exp_trigger: 0,
        }
    }

    #[test]
    fn control_missing_uses_best_estimate() {
        let mut sys = control();
        assert_eq!(sys.missing(4000), 8000);

        sys.progress_us = 9000;
        assert_eq!(sys.missing(4000), 3000);

        sys.map_offset = 6000;
        assert_eq!(sys.missing(4000), 2000);
    }

    #[test]
    fn control_undermined_at_goal() {
        let sys = control();
        assert!(!sys.is_undermined(11999));
        assert!(sys.is_undermined(12000));
        assert!(sys.is_undermined(15000));
    }

    #[test]
    fn expansion_never_undermined() {
        let mut sys = control();
        sys.kind = UmKind::Expand;
        sys.exp_trigger = 10000;
        assert!(!sys.is_undermined(999_999));
    }

    #[test]
    fn expansion_completion_reports_margin() {
        let mut sys = control();
        sys.kind = UmKind::Expand;
        sys.exp_trigger = 10000;
        sys.progress_us = 6000;
        sys.progress_them = 0.4;
        assert_eq!(sys.completion(0), "Leading by 20%");

        sys.progress_them = 0.8;
        assert_eq!(sys.completion(0), "Behind by 20%");
    }

    #[test]
    fn oppose_descriptor_uses_notes() {
        let mut sys = control();
        sys.kind = UmKind::Oppose;
        sys.notes = "Grom expansion".into();
        assert_eq!(sys.descriptor(), "Opposing Grom");

        sys.notes.clear();
        assert_eq!(sys.descriptor(), "Opposing expansion");
    }

    #[test]
    fn set_status_updates_both() {
        let mut sys = control();
        sys.set_status("7000:35").unwrap();
        assert_eq!(sys.progress_us, 7000);
        assert!((sys.progress_them - 0.35).abs() < f64::EPSILON);

        assert!(sys.set_status("-1").is_err());
        assert!(sys.set_status("5:-10").is_err());
    }

    #[test]
    fn hold_redeem_moves_everything() {
        let mut hold = UmHold {
            id: 1,
            sheet: UmSheet::Main,
            user_id: 1,
            system_id: 1,
            held: 400,
            redeemed: 100,
        };
        assert_eq!(hold.redeem(), 400);
        assert_eq!(hold.held, 0);
        assert_eq!(hold.redeemed, 500);
    }

    #[test]
    fn hold_rejects_negative() {
        let mut hold = UmHold {
            id: 1,
            sheet: UmSheet::Main,
            user_id: 1,
            system_id: 1,
            held: 0,
            redeemed: 0,
        };
        assert!(hold.set_held(-5).is_err());
        assert!(hold.set_held(250).is_ok());
        assert_eq!(hold.held, 250);
    }
}
