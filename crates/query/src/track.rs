//! Carrier tracking sets and the id registry.
//!
//! `track add d s1,s2` registers centres; the cached coverage table is kept
//! equal to the union of "systems within d ly of centre" over all centres,
//! each row remembering which centres cover it. Removing a centre subtracts
//! its coverage, deleting rows no centre covers any more.

use chrono::{DateTime, Utc};
use rampart_core::{CarrierId, Error, Result};
use rampart_store::{Session, TrackSystem, TrackSystemCached, TrackedCarrier};
use tracing::info;

use crate::catalog::SystemCatalog;

/// Register centres at `distance` ly and expand the coverage cache.
///
/// Returns the names of systems newly added to the coverage.
pub fn track_add_systems(
    session: &mut Session,
    catalog: &dyn SystemCatalog,
    centres: &[String],
    distance: i64,
) -> Result<Vec<String>> {
    if distance < 0 {
        return Err(Error::InvalidCommandArgs("Distance must be >= 0 ly.".into()));
    }

    let mut added = Vec::new();
    for centre in centres {
        if session.track_systems.contains_key(centre) {
            continue;
        }
        session
            .track_systems
            .insert(centre.clone(), TrackSystem { system: centre.clone(), distance });

        for covered in catalog.systems_within(centre, distance as f64)? {
            match session.track_cached.get_mut(&covered) {
                Some(row) => row.add_overlap(centre),
                None => {
                    session
                        .track_cached
                        .insert(covered.clone(), TrackSystemCached::new(&covered, centre));
                    added.push(covered);
                }
            }
        }
    }

    added.sort_unstable();
    info!(count = added.len(), "tracking coverage grew");
    Ok(added)
}

/// Unregister centres and subtract their coverage.
///
/// Returns the names of systems that fell out of coverage entirely.
pub fn track_remove_systems(
    session: &mut Session,
    catalog: &dyn SystemCatalog,
    centres: &[String],
) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    for centre in centres {
        let Some(track) = session.track_systems.remove(centre) else {
            continue;
        };

        for covered in catalog.systems_within(centre, track.distance as f64)? {
            let delete = match session.track_cached.get_mut(&covered) {
                Some(row) => row.remove_overlap(centre),
                None => false,
            };
            if delete {
                session.track_cached.remove(&covered);
                removed.push(covered);
            }
        }
    }

    removed.sort_unstable();
    info!(count = removed.len(), "tracking coverage shrank");
    Ok(removed)
}

/// All tracked centres, ordered by name.
pub fn track_get_all_systems(session: &Session) -> Vec<TrackSystem> {
    session.track_systems.values().cloned().collect()
}

/// Whether a system is inside the tracked coverage.
pub fn track_covers(tables: &rampart_store::Tables, system: &str) -> bool {
    tables.track_cached.contains_key(system)
}

/// Upsert carrier ids: `(id, squad, override)` triples from `track ids add`
/// or the carrier sheet. Existing rows keep their position history.
pub fn track_ids_update(
    session: &mut Session,
    entries: &[(CarrierId, String, bool)],
    now: DateTime<Utc>,
) {
    for (id, squad, override_flag) in entries {
        match session.carriers.get_mut(id) {
            Some(carrier) => {
                if !squad.is_empty() {
                    carrier.squad = squad.clone();
                }
                carrier.override_flag = *override_flag;
                carrier.updated_at = now;
            }
            None => {
                let mut carrier = TrackedCarrier::first_seen(id.clone(), squad, "", now);
                carrier.override_flag = *override_flag;
                session.carriers.insert(id.clone(), carrier);
            }
        }
    }
}

/// Remove carrier rows by id.
pub fn track_ids_remove(session: &mut Session, ids: &[CarrierId]) {
    for id in ids {
        session.carriers.remove(id);
    }
}

/// Record a carrier sighting in `system`, creating the row on first sight.
pub fn track_ids_spotted(
    session: &mut Session,
    id: &CarrierId,
    squad: &str,
    system: &str,
    now: DateTime<Utc>,
) -> TrackedCarrier {
    match session.carriers.get_mut(id) {
        Some(carrier) => {
            carrier.spotted(system, now);
            if carrier.squad.is_empty() && !squad.is_empty() {
                carrier.squad = squad.to_string();
            }
            carrier.clone()
        }
        None => {
            let carrier = TrackedCarrier::first_seen(id.clone(), squad, system, now);
            session.carriers.insert(id.clone(), carrier.clone());
            carrier
        }
    }
}

/// Carriers updated strictly after `since`, oldest first.
pub fn track_ids_newer_than(session: &Session, since: DateTime<Utc>) -> Vec<TrackedCarrier> {
    let mut rows: Vec<TrackedCarrier> =
        session.carriers.values().filter(|c| c.updated_at > since).cloned().collect();
    rows.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.cmp(&b.id)));
    rows
}

/// Reap rows with no update in four days, unless overridden.
///
/// Returns the reaped ids.
pub fn track_ids_reap_old(session: &mut Session, now: DateTime<Utc>) -> Vec<CarrierId> {
    let stale: Vec<CarrierId> = session
        .carriers
        .values()
        .filter(|c| c.is_stale(now))
        .map(|c| c.id.clone())
        .collect();
    for id in &stale {
        session.carriers.remove(id);
    }
    stale
}
