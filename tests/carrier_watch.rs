//! End-to-end scenarios for the feed ingester and the scanners.

mod common;

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use common::{FakeCatalog, FakeSheet};
use rampart::{CarrierId, FortScanner, KosScanner, ScannerRegistry, Store};
use rampart_feed::{ingest::ingest_one, summary::summarize, SchemaArchive};
use rampart_query::track;

fn journal_carrier(id: &str, system: &str) -> serde_json::Value {
    json!({
        "$schemaRef": "https://eddn.edcd.io/schemas/journal/1",
        "header": {
            "gatewayTimestamp": "2020-08-03T11:03:25Z",
            "softwareName": "E:D Market Connector"
        },
        "message": {
            "event": "Location",
            "StarSystem": system,
            "StationName": id,
            "StationType": "FleetCarrier",
            "Docked": true
        }
    })
}

#[test]
fn carrier_jump_into_tracked_system_alerts() {
    let store = Store::new();
    let catalog = FakeCatalog {
        coverage: [("Centre".to_string(), vec!["Rana".to_string(), "Centre".to_string()])]
            .into_iter()
            .collect(),
    };

    // Leadership tracks a centre covering Rana.
    store
        .with_session(|session| {
            track::track_add_systems(session, &catalog, &["Centre".to_string()], 15)?;
            Ok(())
        })
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let archive = SchemaArchive::new(dir.path().to_path_buf());
    let before = Utc::now() - chrono::Duration::minutes(1);

    ingest_one(&store, &archive, &journal_carrier("ABC-123", "Rana")).unwrap();

    // The carrier row was created with no previous system.
    let snapshot = store.snapshot();
    let id = CarrierId::new("ABC-123").unwrap();
    let carrier = &snapshot.carriers[&id];
    assert_eq!(carrier.system, "Rana");
    assert_eq!(carrier.last_system, "");

    // The next summary names it.
    let text = summarize(&store, before, false).unwrap();
    assert!(text.contains("ABC-123"), "summary was: {text}");

    // A later jump shifts the history.
    ingest_one(&store, &archive, &journal_carrier("ABC-123", "Sol")).unwrap();
    let snapshot = store.snapshot();
    let carrier = &snapshot.carriers[&id];
    assert_eq!(carrier.system, "Sol");
    assert_eq!(carrier.last_system, "Rana");
}

#[tokio::test]
async fn duplicate_kos_rows_abort_the_scan() {
    let store = Store::new();
    let registry = Arc::new(ScannerRegistry::new(store.clone()));

    // Rows 2 and 5 both carry cmdr Bob.
    let sheet = FakeSheet::new(vec![
        vec!["CMDR".into(), "Squad".into(), "Reason".into(), "Kill?".into()],
        vec!["Bob".into(), "Reds".into(), "griefing".into(), "KILL".into()],
        vec!["Alice".into(), "".into(), "".into(), "KILL".into()],
        vec!["".into(), "".into(), "".into(), "".into()],
        vec!["Bob".into(), "Blues".into(), "again".into(), "KILL".into()],
    ]);
    registry.insert(Arc::new(KosScanner::new("kos", sheet.client())));

    let err = registry.scan_now("kos").await.unwrap_err();
    let text = err.to_string();
    assert!(text.contains("Bob"), "error was: {text}");
    assert!(text.contains("[2, 5]"), "error was: {text}");

    // The cache kept its previous (empty) state.
    assert!(store.snapshot().kos.is_empty());
}

/// The fort tab fixture: preps in C, TBA padding, systems from G,
/// contributors from row 11.
fn fort_tab() -> Vec<Vec<String>> {
    let mut rows = vec![vec![String::new(); 8]; 10];
    let set_col = |rows: &mut Vec<Vec<String>>, col: usize, vals: [&str; 10]| {
        for (ind, val) in vals.iter().enumerate() {
            rows[ind][col] = val.to_string();
        }
    };

    set_col(&mut rows, 2, ["0", "0", "8000", "", "", "0", "0", "99.2", "To prep", "Rhea"]);
    set_col(&mut rows, 3, ["", "", "", "", "", "", "", "", "", "TBA"]);
    rows[9][4] = "TBA".into();
    rows[9][5] = "TBA".into();
    set_col(&mut rows, 6, ["0", "0", "4910", "", "", "4210", "0", "116.99", "", "Frey"]);
    set_col(&mut rows, 7, ["0", "0", "5400", "", "", "0", "0", "52.5", "", "Adeo"]);

    rows.push(vec![
        "".into(),
        "Alice".into(),
        "".into(),
        "".into(),
        "".into(),
        "".into(),
        "700".into(),
        "".into(),
    ]);
    rows.push(vec![
        "".into(),
        "Bob".into(),
        "".into(),
        "".into(),
        "".into(),
        "".into(),
        "".into(),
        "300".into(),
    ]);
    rows
}

#[tokio::test]
async fn repeated_scans_are_deterministic() {
    let store = Store::new();
    let registry = Arc::new(ScannerRegistry::new(store.clone()));
    let sheet = FakeSheet::new(fort_tab());
    registry.insert(Arc::new(FortScanner::new("fort", sheet.client())));

    registry.scan_now("fort").await.unwrap();
    let first = store.snapshot();
    assert_eq!(first.fort_systems.len(), 3);
    assert_eq!(first.fort_users.len(), 2);

    registry.scan_now("fort").await.unwrap();
    let second = store.snapshot();

    // Byte-for-byte equal caches: same rows, same ids, same everything.
    assert_eq!(*first, *second);
}

#[tokio::test]
async fn rescans_preserve_dispatcher_owned_rows() {
    let store = Store::new();
    let registry = Arc::new(ScannerRegistry::new(store.clone()));
    let sheet = FakeSheet::new(fort_tab());
    registry.insert(Arc::new(FortScanner::new("fort", sheet.client())));

    // Dispatcher-owned state written before the scan.
    store
        .with_session(|session| {
            rampart_query::users::ensure_user(session, rampart::UserId(1), "Alice")?;
            rampart_query::perms::add_admin(session, rampart::UserId(1), Utc::now())?;
            Ok(())
        })
        .unwrap();

    registry.scan_now("fort").await.unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.users.len(), 1);
    assert_eq!(snapshot.admins.len(), 1);
    assert_eq!(snapshot.fort_systems.len(), 3);
}
