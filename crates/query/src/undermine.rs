//! Undermining targets, holds and redemption.

use rampart_core::{Error, Result};
use rampart_store::{Session, UmHold, UmSheet, UmSystem};

/// An undermine system joined with its summed merits.
#[derive(Debug, Clone, PartialEq)]
pub struct UmView {
    /// The system column pair.
    pub system: UmSystem,
    /// Held plus redeemed merits across contributors.
    pub merits: i64,
}

impl UmView {
    fn new(session: &Session, system: &UmSystem) -> Self {
        Self { system: system.clone(), merits: session.um_cmdr_merits(system.id) }
    }

    /// Merits still required; negative once past the goal.
    pub fn missing(&self) -> i64 {
        self.system.missing(self.merits)
    }

    /// Whether the effort is done (controls only; expansions wait for tick).
    pub fn is_undermined(&self) -> bool {
        self.system.is_undermined(self.merits)
    }

    /// Table-style summary for chat replies.
    pub fn display(&self) -> String {
        let sys = &self.system;
        let sec = sys.security.chars().next().map(|c| c.to_uppercase().to_string());
        let missing = self.missing();

        let mut lines = vec![
            format!(
                "{} | {}{}",
                sys.descriptor(),
                sys.name,
                sec.map(|s| format!(" [{s} sec]")).unwrap_or_default()
            ),
            format!(
                "{} | Merits {} {}",
                sys.completion(self.merits),
                if missing > 0 { "Missing" } else { "Leading" },
                missing.abs()
            ),
            format!(
                "Our Progress {} | Enemy Progress {:.0}%",
                sys.progress_us,
                sys.progress_them * 100.0
            ),
        ];
        if !sys.close_control.is_empty() {
            lines.push(format!("Nearest Control | {}", sys.close_control));
        }
        lines.push(format!("Priority | {}", sys.priority));
        if !sys.notes.is_empty() {
            lines.push(format!("Power | {}", sys.notes));
        }
        lines.join("\n")
    }
}

/// Find an undermine system on `sheet`: exact name first, then substring.
pub fn um_find_system(session: &Session, sheet: UmSheet, name: &str) -> Result<UmView> {
    let on_sheet = || session.um_systems.values().filter(|s| s.sheet == sheet);

    if let Some(system) = on_sheet().find(|s| s.name == name) {
        return Ok(UmView::new(session, system));
    }

    let needle = name.to_lowercase();
    let matches: Vec<&UmSystem> =
        on_sheet().filter(|s| s.name.to_lowercase().contains(&needle)).collect();

    match matches.len() {
        1 => Ok(UmView::new(session, matches[0])),
        0 => Err(Error::NoMatch { needle: name.to_string(), kind: "UMSystem" }),
        _ => Err(Error::MoreThanOneMatch {
            needle: name.to_string(),
            matches: matches.iter().map(|s| s.name.clone()).collect(),
            kind: "UMSystem",
        }),
    }
}

/// All undermine systems on `sheet`, optionally dropping finished ones.
pub fn um_get_systems(session: &Session, sheet: UmSheet, exclude_finished: bool) -> Vec<UmView> {
    let mut systems: Vec<&UmSystem> =
        session.um_systems.values().filter(|s| s.sheet == sheet).collect();
    systems.sort_by_key(|s| s.id);

    systems
        .into_iter()
        .map(|s| UmView::new(session, s))
        .filter(|v| !exclude_finished || !v.is_undermined())
        .collect()
}

/// Set (not increment) a contributor's hold at a system.
pub fn um_add_hold(
    session: &mut Session,
    sheet: UmSheet,
    user_id: i64,
    system_id: i64,
    held: i64,
) -> Result<UmHold> {
    if held < 0 {
        return Err(Error::InvalidCommandArgs(
            "Hold amount must be in range [0, \u{221e}]".into(),
        ));
    }

    let existing_id = session
        .um_holds
        .values()
        .find(|h| h.sheet == sheet && h.user_id == user_id && h.system_id == system_id)
        .map(|h| h.id);

    let id = match existing_id {
        Some(id) => id,
        None => session.insert_um_hold(UmHold {
            id: 0,
            sheet,
            user_id,
            system_id,
            held: 0,
            redeemed: 0,
        })?,
    };

    let hold = session
        .um_holds
        .get_mut(&id)
        .ok_or_else(|| Error::Internal("hold row vanished mid-update".into()))?;
    hold.set_held(held)?;
    Ok(hold.clone())
}

/// Zero all held merits for a contributor (death). Returns the touched holds.
pub fn um_reset_held(session: &mut Session, user_id: i64) -> Vec<UmHold> {
    let mut touched = Vec::new();
    for hold in session.um_holds.values_mut() {
        if hold.user_id == user_id && hold.held > 0 {
            hold.held = 0;
            touched.push(hold.clone());
        }
    }
    touched
}

/// Redeem all held merits for a contributor.
///
/// Returns the touched holds and the total moved.
pub fn um_redeem_merits(session: &mut Session, user_id: i64) -> (Vec<UmHold>, i64) {
    let mut touched = Vec::new();
    let mut total = 0;
    for hold in session.um_holds.values_mut() {
        if hold.user_id == user_id && hold.held > 0 {
            total += hold.redeem();
            touched.push(hold.clone());
        }
    }
    (touched, total)
}

/// Redeem held merits at the named systems only.
pub fn um_redeem_systems(
    session: &mut Session,
    user_id: i64,
    names: &[String],
) -> Result<(Vec<UmHold>, i64)> {
    let mut system_ids = Vec::new();
    for name in names {
        let sheet = UmSheet::Main;
        let view = um_find_system(session, sheet, name)?;
        system_ids.push(view.system.id);
    }

    let mut touched = Vec::new();
    let mut total = 0;
    for hold in session.um_holds.values_mut() {
        if hold.user_id == user_id && system_ids.contains(&hold.system_id) && hold.held > 0 {
            total += hold.redeem();
            touched.push(hold.clone());
        }
    }
    Ok((touched, total))
}

/// Matrix of all contributors with held merits, one column per system.
///
/// First row is the header `[CMDR, system...]`; following rows carry the
/// held amount per system, zero when none.
pub fn um_all_held_merits(session: &Session, sheet: UmSheet) -> Vec<Vec<String>> {
    let mut systems: Vec<&UmSystem> =
        session.um_systems.values().filter(|s| s.sheet == sheet).collect();
    systems.sort_by_key(|s| s.id);

    let mut header = vec!["CMDR".to_string()];
    header.extend(systems.iter().map(|s| s.name.clone()));

    let mut holders: Vec<&str> = session
        .um_holds
        .values()
        .filter(|h| h.sheet == sheet && h.held > 0)
        .filter_map(|h| session.um_users.get(&h.user_id).map(|u| u.name.as_str()))
        .collect();
    holders.sort_unstable();
    holders.dedup();

    let mut rows = vec![header];
    for holder in holders {
        let user_id = session
            .um_users
            .values()
            .find(|u| u.sheet == sheet && u.name == holder)
            .map(|u| u.id);
        let mut row = vec![holder.to_string()];
        for system in &systems {
            let held = session
                .um_holds
                .values()
                .find(|h| {
                    h.sheet == sheet && Some(h.user_id) == user_id && h.system_id == system.id
                })
                .map(|h| h.held)
                .unwrap_or(0);
            row.push(held.to_string());
        }
        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_store::{Store, UmKind, UmUser};

    fn control(name: &str, col: &str, goal: i64) -> UmSystem {
        UmSystem {
            id: 0,
            sheet: UmSheet::Main,
            name: name.into(),
            kind: UmKind::Control,
            sheet_col: col.into(),
            goal,
            security: "Low".into(),
            notes: String::new(),
            close_control: String::new(),
            priority: "Normal".into(),
            progress_us: 0,
            progress_them: 0.0,
            map_offset: 0,
            exp_trigger: 0,
        }
    }

    fn seed(session: &mut Session) -> (i64, i64, i64) {
        let burr = session.insert_um_system(control("Burr", "D", 12000)).unwrap();
        let rana = session.insert_um_system(control("Rana", "F", 8000)).unwrap();
        let user = session
            .insert_um_user(UmUser {
                id: 0,
                sheet: UmSheet::Main,
                name: "Gears".into(),
                row: 14,
                cry: String::new(),
            })
            .unwrap();
        (burr, rana, user)
    }

    #[test]
    fn hold_sets_rather_than_increments() {
        let store = Store::new();
        let mut session = store.begin_session();
        let (burr, _, user) = seed(&mut session);

        um_add_hold(&mut session, UmSheet::Main, user, burr, 400).unwrap();
        let hold = um_add_hold(&mut session, UmSheet::Main, user, burr, 250).unwrap();
        assert_eq!(hold.held, 250);

        assert!(um_add_hold(&mut session, UmSheet::Main, user, burr, -1).is_err());
    }

    #[test]
    fn redeem_moves_all_holds() {
        let store = Store::new();
        let mut session = store.begin_session();
        let (burr, rana, user) = seed(&mut session);
        um_add_hold(&mut session, UmSheet::Main, user, burr, 400).unwrap();
        um_add_hold(&mut session, UmSheet::Main, user, rana, 2200).unwrap();

        let (touched, total) = um_redeem_merits(&mut session, user);
        assert_eq!(total, 2600);
        assert_eq!(touched.len(), 2);
        assert!(session.um_holds.values().all(|h| h.held == 0));
        assert_eq!(session.um_holds.values().map(|h| h.redeemed).sum::<i64>(), 2600);
    }

    #[test]
    fn redeem_named_systems_only() {
        let store = Store::new();
        let mut session = store.begin_session();
        let (burr, rana, user) = seed(&mut session);
        um_add_hold(&mut session, UmSheet::Main, user, burr, 400).unwrap();
        um_add_hold(&mut session, UmSheet::Main, user, rana, 2200).unwrap();

        let (touched, total) =
            um_redeem_systems(&mut session, user, &["Burr".into()]).unwrap();
        assert_eq!(total, 400);
        assert_eq!(touched.len(), 1);

        let rana_hold = session
            .um_holds
            .values()
            .find(|h| h.system_id == rana)
            .unwrap();
        assert_eq!(rana_hold.held, 2200);
    }

    #[test]
    fn died_resets_held() {
        let store = Store::new();
        let mut session = store.begin_session();
        let (burr, _, user) = seed(&mut session);
        um_add_hold(&mut session, UmSheet::Main, user, burr, 999).unwrap();

        let touched = um_reset_held(&mut session, user);
        assert_eq!(touched.len(), 1);
        assert_eq!(touched[0].held, 0);
        assert_eq!(touched[0].redeemed, 0);
    }

    #[test]
    fn find_system_substring() {
        let store = Store::new();
        let mut session = store.begin_session();
        seed(&mut session);

        assert_eq!(um_find_system(&session, UmSheet::Main, "bur").unwrap().system.name, "Burr");
        assert!(um_find_system(&session, UmSheet::Main, "zz").is_err());
    }

    #[test]
    fn finished_systems_excluded() {
        let store = Store::new();
        let mut session = store.begin_session();
        let (burr, _, user) = seed(&mut session);
        um_add_hold(&mut session, UmSheet::Main, user, burr, 12000).unwrap();

        let active = um_get_systems(&session, UmSheet::Main, true);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].system.name, "Rana");

        let all = um_get_systems(&session, UmSheet::Main, false);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn held_matrix_shape() {
        let store = Store::new();
        let mut session = store.begin_session();
        let (burr, _, user) = seed(&mut session);
        um_add_hold(&mut session, UmSheet::Main, user, burr, 450).unwrap();

        let matrix = um_all_held_merits(&session, UmSheet::Main);
        assert_eq!(matrix[0], vec!["CMDR", "Burr", "Rana"]);
        assert_eq!(matrix[1], vec!["Gears", "450", "0"]);
    }
}
