//! Per-cycle globals and feed snapshot upserts.
//!
//! Snapshot rows carry the feed's own timestamps; an upsert only wins when
//! its timestamp is at least as new as the stored row, so replayed or
//! delayed snapshots can never regress the cache.

use chrono::{DateTime, Utc};
use rampart_core::Result;
use rampart_store::{Global, Session, SpyPrep, SpySystem, SpyVote};

/// Fetch or create the per-cycle global row.
pub fn ensure_global(session: &mut Session, cycle: i64, now: DateTime<Utc>) -> Result<Global> {
    if let Some(global) = &session.global {
        return Ok(global.clone());
    }
    let global = Global::new(cycle, now)?;
    session.global = Some(global.clone());
    Ok(global)
}

/// Update the global row; stale timestamps are rejected by the entity.
pub fn global_update(
    session: &mut Session,
    cycle: Option<i64>,
    consolidation: Option<i64>,
    updated_at: DateTime<Utc>,
) -> Result<Global> {
    match session.global.as_mut() {
        Some(global) => {
            global.update(cycle, consolidation, updated_at)?;
            Ok(global.clone())
        }
        None => {
            let mut global = Global::new(cycle.unwrap_or(1), updated_at)?;
            if let Some(consolidation) = consolidation {
                global.update(None, Some(consolidation), updated_at)?;
            }
            session.global = Some(global.clone());
            Ok(global)
        }
    }
}

/// Upsert a control-system snapshot, keeping the newest timestamp.
pub fn spy_system_upsert(session: &mut Session, incoming: SpySystem) {
    if let Some(existing) =
        session.spy_systems.values_mut().find(|s| s.system == incoming.system)
    {
        if incoming.updated_at >= existing.updated_at {
            let id = existing.id;
            *existing = SpySystem { id, ..incoming };
        }
        return;
    }
    let id = session.next_spy_id();
    session.spy_systems.insert(id, SpySystem { id, ..incoming });
}

/// Upsert a power vote snapshot, keyed by power name.
pub fn spy_vote_upsert(session: &mut Session, incoming: SpyVote) {
    match session.spy_votes.get_mut(&incoming.power) {
        Some(existing) if incoming.updated_at < existing.updated_at => {}
        Some(existing) => *existing = incoming,
        None => {
            session.spy_votes.insert(incoming.power.clone(), incoming);
        }
    }
}

/// Upsert a traffic snapshot, keyed by system name.
pub fn spy_traffic_upsert(session: &mut Session, incoming: rampart_store::SpyTraffic) {
    match session.spy_traffic.get_mut(&incoming.system) {
        Some(existing) if incoming.updated_at < existing.updated_at => {}
        Some(existing) => *existing = incoming,
        None => {
            session.spy_traffic.insert(incoming.system.clone(), incoming);
        }
    }
}

/// Upsert one bounty-table row keyed by (system, pos).
pub fn spy_bounty_upsert(session: &mut Session, incoming: rampart_store::SpyBounty) {
    if let Some(existing) = session
        .spy_bounties
        .values_mut()
        .find(|b| b.system == incoming.system && b.pos == incoming.pos)
    {
        if incoming.updated_at >= existing.updated_at {
            let id = existing.id;
            *existing = rampart_store::SpyBounty { id, ..incoming };
        }
        return;
    }
    let id = session.next_spy_id();
    session.spy_bounties.insert(id, rampart_store::SpyBounty { id, ..incoming });
}

/// Upsert a preparation snapshot keyed by (power, system).
pub fn spy_prep_upsert(session: &mut Session, incoming: SpyPrep) {
    if let Some(existing) = session
        .spy_preps
        .values_mut()
        .find(|p| p.power == incoming.power && p.system == incoming.system)
    {
        if incoming.updated_at >= existing.updated_at {
            let id = existing.id;
            *existing = SpyPrep { id, ..incoming };
        }
        return;
    }
    let id = session.next_spy_id();
    session.spy_preps.insert(id, SpyPrep { id, ..incoming });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rampart_store::Store;

    #[test]
    fn global_rejects_stale_update() {
        let store = Store::new();
        let mut session = store.begin_session();
        let now = Utc::now();

        global_update(&mut session, Some(300), Some(55), now).unwrap();
        assert!(global_update(&mut session, Some(301), None, now - Duration::hours(1)).is_err());
        assert_eq!(session.global.as_ref().unwrap().cycle, 300);
    }

    #[test]
    fn spy_system_keeps_newest() {
        let store = Store::new();
        let mut session = store.begin_session();
        let now = Utc::now();

        let snap = |fort: i64, at| SpySystem {
            id: 0,
            system: "Rana".into(),
            power: "Hudson".into(),
            fort,
            fort_trigger: 5000,
            um: 0,
            um_trigger: 9000,
            updated_at: at,
        };

        spy_system_upsert(&mut session, snap(1000, now));
        spy_system_upsert(&mut session, snap(500, now - Duration::hours(2)));
        let stored = session.spy_systems.values().next().unwrap();
        assert_eq!(stored.fort, 1000);

        spy_system_upsert(&mut session, snap(2000, now + Duration::hours(1)));
        let stored = session.spy_systems.values().next().unwrap();
        assert_eq!(stored.fort, 2000);
        assert_eq!(session.spy_systems.len(), 1);
    }

    #[test]
    fn spy_vote_keyed_by_power() {
        let store = Store::new();
        let mut session = store.begin_session();
        let now = Utc::now();

        spy_vote_upsert(&mut session, SpyVote { power: "Hudson".into(), vote: 60, updated_at: now });
        spy_vote_upsert(
            &mut session,
            SpyVote { power: "Hudson".into(), vote: 40, updated_at: now - Duration::hours(1) },
        );
        assert_eq!(session.spy_votes["Hudson"].vote, 60);
    }
}
