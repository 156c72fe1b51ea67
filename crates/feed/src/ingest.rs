//! The feed ingest loop.
//!
//! The subscription yields decoded JSON values; the loop archives each one
//! verbatim, interprets only `journal/1` location events, and updates the
//! carrier table when a fleet carrier is seen inside the tracked coverage
//! or carries a manual override. A lost subscription reconnects after a
//! fixed backoff; the external cancel signal exits the loop cleanly after
//! the write in flight completes.

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use rampart_core::{CarrierId, Result};
use rampart_query::track;
use rampart_store::Store;

use crate::archive::SchemaArchive;
use crate::message::Envelope;

/// Delay before reconnecting a lost subscription.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Capability onto the streaming event source.
///
/// `next` yields the next decoded message, or `None` when the
/// subscription is lost and must be re-established via `connect`.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// (Re-)establish the subscription and ack the heartbeat.
    async fn connect(&mut self) -> Result<()>;

    /// The next decoded message; `None` means the stream dropped.
    async fn next(&mut self) -> Result<Option<serde_json::Value>>;
}

/// Run the ingester until `cancel` flips true.
pub async fn run_ingester(
    mut source: Box<dyn EventSource>,
    store: Store,
    archive: SchemaArchive,
    mut cancel: watch::Receiver<bool>,
) -> Result<()> {
    'reconnect: loop {
        if *cancel.borrow() {
            break;
        }
        if let Err(err) = source.connect().await {
            warn!(%err, "feed connect failed, retrying after backoff");
            tokio::select! {
                _ = tokio::time::sleep(RECONNECT_DELAY) => continue 'reconnect,
                _ = cancel.changed() => break 'reconnect,
            }
        }
        info!("feed subscription established");

        loop {
            let value = tokio::select! {
                value = source.next() => value,
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!("feed ingester cancelled, draining");
                        break 'reconnect;
                    }
                    continue;
                }
            };

            match value {
                Ok(Some(raw)) => {
                    if let Err(err) = ingest_one(&store, &archive, &raw) {
                        warn!(%err, "failed to ingest feed message");
                    }
                }
                Ok(None) => {
                    warn!("feed subscription lost, reconnecting after backoff");
                    tokio::select! {
                        _ = tokio::time::sleep(RECONNECT_DELAY) => continue 'reconnect,
                        _ = cancel.changed() => break 'reconnect,
                    }
                }
                Err(err) => {
                    warn!(%err, "feed read error, reconnecting after backoff");
                    tokio::select! {
                        _ = tokio::time::sleep(RECONNECT_DELAY) => continue 'reconnect,
                        _ = cancel.changed() => break 'reconnect,
                    }
                }
            }
        }
    }

    info!("feed ingester exited cleanly");
    Ok(())
}

/// Archive one raw message and apply it to the cache when it matches.
pub fn ingest_one(store: &Store, archive: &SchemaArchive, raw: &serde_json::Value) -> Result<()> {
    let schema_ref = raw
        .get("$schemaRef")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    archive.append(&schema_ref, &raw.to_string())?;

    let Ok(envelope) = serde_json::from_value::<Envelope>(raw.clone()) else {
        // Malformed for our shape; archived above, nothing else to do.
        return Ok(());
    };
    if !envelope.is_journal() || !envelope.message.is_location_event() {
        return Ok(());
    }
    let Some(raw_id) = envelope.message.carrier_id() else {
        return Ok(());
    };
    let Ok(id) = CarrierId::new(raw_id) else {
        debug!(raw_id, "carrier id did not validate, skipping");
        return Ok(());
    };

    let system = envelope.message.star_system.clone();
    let snapshot = store.snapshot();
    let tracked = track::track_covers(&snapshot, &system);
    let overridden =
        snapshot.carriers.get(&id).map(|c| c.override_flag).unwrap_or(false);
    if !tracked && !overridden {
        return Ok(());
    }

    // The ingester races the dispatcher's writes; retry on conflicts.
    store.with_session_retry(3, |session| {
        let carrier = track::track_ids_spotted(session, &id, "", &system, Utc::now());
        debug!(%carrier, "carrier observed");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn carrier_message(id: &str, system: &str) -> serde_json::Value {
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
                "StationType": "FleetCarrier"
            }
        })
    }

    fn store_tracking(system: &str) -> Store {
        let store = Store::new();
        store
            .with_session(|session| {
                session.track_cached.insert(
                    system.to_string(),
                    rampart_store::TrackSystemCached::new(system, "Centre"),
                );
                Ok(())
            })
            .unwrap();
        store
    }

    fn archive() -> (tempfile::TempDir, SchemaArchive) {
        let dir = tempfile::tempdir().unwrap();
        let archive = SchemaArchive::new(dir.path().to_path_buf());
        (dir, archive)
    }

    #[test]
    fn tracked_carrier_jump_creates_row() {
        let store = store_tracking("Rana");
        let (_dir, archive) = archive();

        ingest_one(&store, &archive, &carrier_message("ABC-123", "Rana")).unwrap();

        let snapshot = store.snapshot();
        let id = CarrierId::new("ABC-123").unwrap();
        let carrier = &snapshot.carriers[&id];
        assert_eq!(carrier.system, "Rana");
        assert_eq!(carrier.last_system, "");
    }

    #[test]
    fn untracked_system_is_ignored_but_archived() {
        let store = store_tracking("Rana");
        let (dir, archive) = archive();

        ingest_one(&store, &archive, &carrier_message("ABC-123", "Nowhere")).unwrap();
        assert!(store.snapshot().carriers.is_empty());

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn override_carrier_is_tracked_anywhere() {
        let store = store_tracking("Rana");
        let id = CarrierId::new("XYZ-9W9").unwrap();
        store
            .with_session(|session| {
                track::track_ids_update(
                    session,
                    &[(id.clone(), String::new(), true)],
                    Utc::now(),
                );
                Ok(())
            })
            .unwrap();
        let (_dir, archive) = archive();

        ingest_one(&store, &archive, &carrier_message("XYZ-9W9", "Nowhere")).unwrap();
        assert_eq!(store.snapshot().carriers[&id].system, "Nowhere");
    }

    #[test]
    fn non_journal_messages_only_archive() {
        let store = store_tracking("Rana");
        let (_dir, archive) = archive();
        let raw = json!({
            "$schemaRef": "https://eddn.edcd.io/schemas/commodity/3",
            "header": {"gatewayTimestamp": "2020-08-03T11:03:25Z"},
            "message": {"event": "Location", "StarSystem": "Rana",
                        "StationName": "ABC-123", "StationType": "FleetCarrier"}
        });

        ingest_one(&store, &archive, &raw).unwrap();
        assert!(store.snapshot().carriers.is_empty());
    }

    #[tokio::test]
    async fn ingester_drains_on_cancel() {
        struct ScriptedSource {
            messages: Vec<serde_json::Value>,
        }

        #[async_trait]
        impl EventSource for ScriptedSource {
            async fn connect(&mut self) -> Result<()> {
                Ok(())
            }
            async fn next(&mut self) -> Result<Option<serde_json::Value>> {
                match self.messages.pop() {
                    Some(msg) => Ok(Some(msg)),
                    None => {
                        // Block forever once drained; cancellation must win.
                        std::future::pending::<()>().await;
                        unreachable!()
                    }
                }
            }
        }

        let store = store_tracking("Rana");
        let dir = tempfile::tempdir().unwrap();
        let archive = SchemaArchive::new(dir.path().to_path_buf());
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let source = Box::new(ScriptedSource {
            messages: vec![carrier_message("ABC-123", "Rana")],
        });
        let task = tokio::spawn(run_ingester(source, store.clone(), archive, cancel_rx));

        // Wait for the message to land, then cancel.
        for _ in 0..100 {
            if !store.snapshot().carriers.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        assert!(!store.snapshot().carriers.is_empty());
    }
}
