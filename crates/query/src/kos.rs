//! Kill-on-sight lookups.

use rampart_core::Result;
use rampart_store::{KosEntry, Session};

/// All KOS entries whose cmdr name contains `term`, case-insensitive.
pub fn kos_search_cmdr(session: &Session, term: &str) -> Vec<KosEntry> {
    let needle = term.to_lowercase();
    session
        .kos
        .values()
        .filter(|k| k.cmdr.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Add a KOS entry directly to the cache (command-side report path).
pub fn kos_add(session: &mut Session, entry: KosEntry) -> Result<i64> {
    session.insert_kos(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_store::Store;

    fn entry(cmdr: &str, friendly: bool) -> KosEntry {
        KosEntry {
            id: 0,
            cmdr: cmdr.into(),
            squad: "squad".into(),
            reason: "because".into(),
            is_friendly: friendly,
        }
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let store = Store::new();
        let mut session = store.begin_session();
        kos_add(&mut session, entry("BadPilot", false)).unwrap();
        kos_add(&mut session, entry("GoodPilot", true)).unwrap();

        let hits = kos_search_cmdr(&session, "pilot");
        assert_eq!(hits.len(), 2);
        let hits = kos_search_cmdr(&session, "BAD");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].verdict(), "KILL");
    }

    #[test]
    fn duplicate_cmdr_refused() {
        let store = Store::new();
        let mut session = store.begin_session();
        kos_add(&mut session, entry("Bob", false)).unwrap();
        assert!(kos_add(&mut session, entry("bob", true)).is_err());
    }
}
