//! Fortification target selection and drop bookkeeping.
//!
//! Selection order: while any manual-order rows exist only the first
//! unfinished entry is served; otherwise the sheet order is walked for the
//! first target that is neither fortified, skipped nor deferred. A
//! medium-pad system rides along as a secondary target when one remains,
//! and prep systems are always appended.

use rampart_core::matching::fuzzy_find;
use rampart_core::{Error, Result};
use tracing::info;

use rampart_store::{FortDrop, FortOrder, FortSystem, Session};

/// A fort system joined with its summed contributions.
///
/// The transient read-time view: selection and display never hold entity
/// references across sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct FortView {
    /// The system row.
    pub system: FortSystem,
    /// Sum of all drops at the system.
    pub merits: i64,
}

impl FortView {
    fn new(session: &Session, system: &FortSystem) -> Self {
        Self { system: system.clone(), merits: session.fort_cmdr_merits(system.id) }
    }

    /// The higher of reported status and summed drops.
    pub fn current_status(&self) -> i64 {
        self.system.current_status(self.merits)
    }

    /// Merits still required.
    pub fn missing(&self) -> i64 {
        self.system.missing(self.merits)
    }

    /// Whether the target is done.
    pub fn is_fortified(&self) -> bool {
        self.system.is_fortified(self.merits)
    }

    /// Whether the target is parked under the deferral threshold.
    pub fn is_deferred(&self, defer_missing: i64) -> bool {
        self.system.is_deferred(self.merits, defer_missing)
    }

    /// Short one-line summary for chat replies.
    ///
    /// `miss`: `None` shows the remainder only when under 1500, `Some(true)`
    /// always, `Some(false)` never.
    pub fn display(&self, miss: Option<bool>) -> String {
        let sys = &self.system;

        let umd = if sys.um_status > 0 {
            let suffix = if sys.is_undermined() { "ed" } else { "ing" };
            format!(", {} :Undermin{}:", sys.um_status, suffix)
        } else if sys.is_undermined() {
            ", :Undermined:".to_string()
        } else {
            String::new()
        };

        let fort_suffix = if self.is_fortified() { "ied" } else { "ying" };
        let mut msg = format!(
            "**{}** {:>4}/{} :Fortif{}:{}",
            sys.name,
            self.current_status(),
            sys.trigger,
            fort_suffix,
            umd
        );
        if sys.is_prep() {
            msg = format!("Prep: {msg}");
        }

        let missing = self.missing();
        if miss.unwrap_or(missing > 0 && missing < 1500) {
            msg.push_str(&format!(" ({missing} left)"));
        }

        if !sys.notes.is_empty() {
            msg.push(' ');
            msg.push_str(&sys.notes);
        }
        msg.push_str(&format!(" - {}Ly", sys.distance));

        msg
    }
}

/// All standard fort systems in sheet order. Preps are excluded; with
/// `include_mediums` false, medium-pad systems are dropped too.
pub fn fort_get_systems(session: &Session, include_mediums: bool) -> Vec<FortView> {
    let mut systems: Vec<&FortSystem> =
        session.fort_systems.values().filter(|s| !s.is_prep()).collect();
    systems.sort_by_key(|s| s.sheet_order);

    systems
        .into_iter()
        .filter(|s| include_mediums || !s.is_medium())
        .map(|s| FortView::new(session, s))
        .collect()
}

/// All prep systems in sheet order.
pub fn fort_get_preps(session: &Session) -> Vec<FortView> {
    let mut preps: Vec<&FortSystem> =
        session.fort_systems.values().filter(|s| s.is_prep()).collect();
    preps.sort_by_key(|s| s.sheet_order);
    preps.into_iter().map(|s| FortView::new(session, s)).collect()
}

/// Unfortified medium-pad systems that are neither skipped nor deferred.
pub fn fort_get_medium_systems(session: &Session, defer_missing: i64) -> Vec<FortView> {
    fort_get_systems(session, true)
        .into_iter()
        .filter(|v| {
            v.system.is_medium()
                && !v.system.is_skipped()
                && !v.is_fortified()
                && !v.is_deferred(defer_missing)
        })
        .collect()
}

/// Index of the next fortification target within [`fort_get_systems`].
pub fn fort_find_current_index(session: &Session, defer_missing: i64) -> Result<usize> {
    for (ind, view) in fort_get_systems(session, true).iter().enumerate() {
        if view.is_fortified() || view.system.is_skipped() || view.is_deferred(defer_missing) {
            continue;
        }
        return Ok(ind);
    }

    Err(Error::NoMoreTargets)
}

/// Find a fort system by name: exact first, then fuzzy over systems and
/// preps. With `search_all` false, the fuzzy search starts at the current
/// target.
pub fn fort_find_system(
    session: &Session,
    name: &str,
    search_all: bool,
    defer_missing: i64,
) -> Result<FortView> {
    if let Some(system) = session.fort_systems.values().find(|s| s.name == name) {
        return Ok(FortView::new(session, system));
    }

    let index = if search_all { 0 } else { fort_find_current_index(session, defer_missing)? };
    let mut candidates: Vec<FortView> =
        fort_get_systems(session, true).into_iter().skip(index).collect();
    candidates.extend(fort_get_preps(session));

    let found = fuzzy_find(name, candidates.iter(), |v| v.system.name.as_str(), "FortSystem")?;
    Ok(found.clone())
}

/// The active fortification targets.
///
/// A manual order short-circuits everything: only its first entry is
/// served. Otherwise the current target, an optional medium secondary and
/// all preps.
pub fn fort_get_targets(session: &mut Session, defer_missing: i64) -> Result<Vec<FortView>> {
    let ordered = fort_order_get(session, defer_missing);
    if !ordered.is_empty() {
        return Ok(ordered.into_iter().take(1).collect());
    }

    let systems = fort_get_systems(session, true);
    let current = fort_find_current_index(session, defer_missing)?;
    let mut targets = vec![systems[current].clone()];

    let mediums = fort_get_medium_systems(session, defer_missing);
    if let Some(medium) = mediums.first() {
        if medium.system.name != systems[current].system.name {
            targets.push(medium.clone());
        }
    }

    targets.extend(fort_get_preps(session));
    Ok(targets)
}

/// Up to `count` targets after the current one.
pub fn fort_get_next_targets(
    session: &mut Session,
    count: usize,
    defer_missing: i64,
) -> Result<Vec<FortView>> {
    let ordered = fort_order_get(session, defer_missing);
    let (systems, start) = if ordered.is_empty() {
        (fort_get_systems(session, true), fort_find_current_index(session, defer_missing)? + 1)
    } else {
        (ordered, 1)
    };

    let mut targets = Vec::new();
    for view in systems.into_iter().skip(start) {
        if view.is_fortified() || view.system.is_skipped() || view.is_deferred(defer_missing) {
            continue;
        }
        targets.push(view);
        if targets.len() == count {
            break;
        }
    }
    Ok(targets)
}

/// Targets parked below the deferral threshold.
pub fn fort_get_deferred_targets(session: &Session, defer_missing: i64) -> Vec<FortView> {
    fort_get_systems(session, true)
        .into_iter()
        .filter(|v| !v.is_fortified() && v.is_deferred(defer_missing))
        .collect()
}

/// Non-fortified, non-skipped targets missing at most `left` merits.
pub fn fort_get_missing_targets(session: &Session, left: i64) -> Vec<FortView> {
    fort_get_systems(session, true)
        .into_iter()
        .filter(|v| !v.is_fortified() && !v.system.is_skipped() && v.missing() <= left)
        .collect()
}

/// The state buckets of all fort systems.
///
/// A system may land in more than one bucket: fortified and undermined
/// together also means cancelled.
#[derive(Debug, Default, Clone)]
pub struct FortStates {
    /// Fortified and undermined both.
    pub cancelled: Vec<FortView>,
    /// Trigger reached or overridden.
    pub fortified: Vec<FortView>,
    /// Enemy fraction at 100%.
    pub undermined: Vec<FortView>,
    /// Marked leave/skip in the notes.
    pub skipped: Vec<FortView>,
    /// Still to be worked.
    pub left: Vec<FortView>,
}

/// Partition all fort systems into [`FortStates`].
pub fn fort_get_systems_by_state(session: &Session) -> FortStates {
    let mut states = FortStates::default();

    for view in fort_get_systems(session, true) {
        if view.is_fortified() && view.system.is_undermined() {
            states.cancelled.push(view.clone());
        }
        if view.system.is_undermined() {
            states.undermined.push(view.clone());
        }
        if view.is_fortified() {
            states.fortified.push(view.clone());
        }
        if !view.is_fortified() && !view.system.is_skipped() {
            states.left.push(view.clone());
        }
        if view.system.is_skipped() {
            states.skipped.push(view);
        }
    }

    states
}

/// Record a drop of `amount` by `user_id` at `system_id`.
///
/// The contribution accumulates and clamps at zero; the system's reported
/// status moves by the signed amount, also clamped at zero. Amounts outside
/// `[-max_drop, max_drop]` are refused.
pub fn fort_add_drop(
    session: &mut Session,
    user_id: i64,
    system_id: i64,
    amount: i64,
    max_drop: i64,
) -> Result<FortDrop> {
    if amount < -max_drop || amount > max_drop {
        return Err(Error::InvalidCommandArgs(format!(
            "Drop amount must be in range [-{max_drop}, {max_drop}]"
        )));
    }

    let existing_id = session
        .fort_drops
        .values()
        .find(|d| d.user_id == user_id && d.system_id == system_id)
        .map(|d| d.id);

    let id = match existing_id {
        Some(id) => id,
        None => session.insert_fort_drop(FortDrop { id: 0, user_id, system_id, amount: 0 })?,
    };

    let drop = session
        .fort_drops
        .get_mut(&id)
        .ok_or_else(|| Error::Internal("drop row vanished mid-update".into()))?;
    drop.amount = (drop.amount + amount).max(0);
    let updated = drop.clone();

    let system = session
        .fort_systems
        .get_mut(&system_id)
        .ok_or(Error::NoMatch { needle: system_id.to_string(), kind: "FortSystem" })?;
    system.fort_status = (system.fort_status + amount).max(0);

    info!(user_id, system_id, amount, new_status = system.fort_status, "drop recorded");
    Ok(updated)
}

/// The manual fort order as views, pruning entries that finished.
///
/// Fortified or deferred entries are removed and the remaining ordinals are
/// renumbered so they always form a gapless 1..k permutation.
pub fn fort_order_get(session: &mut Session, defer_missing: i64) -> Vec<FortView> {
    let ordinals: Vec<i64> = session.fort_orders.keys().copied().collect();

    let mut kept = Vec::new();
    for ordinal in ordinals {
        let name = session.fort_orders[&ordinal].system_name.clone();
        let done = match session.fort_systems.values().find(|s| s.name == name) {
            Some(system) => {
                let view = FortView::new(session, system);
                view.is_fortified() || view.missing() <= defer_missing
            }
            // Name no longer on the sheet after a rescan; prune it.
            None => true,
        };

        if done {
            session.fort_orders.remove(&ordinal);
        } else {
            kept.push(name);
        }
    }

    // Renumber to 1..k so ordinals stay gapless.
    session.fort_orders.clear();
    for (ind, name) in kept.iter().enumerate() {
        let order = FortOrder { order: ind as i64 + 1, system_name: name.clone() };
        session.fort_orders.insert(order.order, order);
    }

    kept.iter()
        .filter_map(|name| {
            session
                .fort_systems
                .values()
                .find(|s| &s.name == name)
                .map(|s| FortView::new(session, s))
        })
        .collect()
}

/// Replace the manual order with `names`, validating each against the
/// sheet. Duplicates refuse the whole command.
pub fn fort_order_set(session: &mut Session, names: &[String], defer_missing: i64) -> Result<()> {
    session.fort_orders.clear();

    for (ind, raw) in names.iter().enumerate() {
        let resolved = fort_find_system(session, raw, true, defer_missing)?.system.name;
        let order = FortOrder { order: ind as i64 + 1, system_name: resolved };
        session.insert_fort_order(order).map_err(|_| {
            Error::InvalidCommandArgs("Duplicate system specified, check your command!".into())
        })?;
    }
    Ok(())
}

/// Drop the named systems from the manual order.
pub fn fort_order_drop(session: &mut Session, names: &[String]) {
    let ordinals: Vec<i64> = session
        .fort_orders
        .iter()
        .filter(|(_, o)| names.iter().any(|n| n.eq_ignore_ascii_case(&o.system_name)))
        .map(|(k, _)| *k)
        .collect();
    for ordinal in ordinals {
        session.fort_orders.remove(&ordinal);
    }
}
