//! The carrier-id registry sheet scanner.
//!
//! Leadership maintains (id, squad) rows of carriers to always track. A
//! scan upserts into the carrier table with the override flag set, keeping
//! the position history the feed ingester has already accumulated.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, warn};

use rampart_core::{CarrierId, Result};
use rampart_store::Session;

use crate::cells::CellGrid;
use crate::client::RetryClient;
use crate::scanner::Scanner;

/// Scanner for the carrier-id registry.
pub struct CarrierScanner {
    name: String,
    client: RetryClient,
    cells: RwLock<CellGrid>,
}

impl CarrierScanner {
    /// Create a scanner over `client`.
    pub fn new(name: impl Into<String>, client: RetryClient) -> Self {
        Self { name: name.into(), client, cells: RwLock::new(CellGrid::default()) }
    }

    /// Parse (id, squad) pairs from row 2 down. Malformed ids are logged
    /// and skipped rather than failing the registry scan.
    fn parse_entries(grid: &CellGrid) -> Vec<(CarrierId, String)> {
        let mut found = Vec::new();
        for row in grid.rows().iter().skip(1) {
            let raw = row.first().map(|c| c.trim()).unwrap_or_default();
            if raw.is_empty() {
                continue;
            }
            match CarrierId::new(raw) {
                Ok(id) => {
                    let squad = row.get(1).map(|c| c.trim().to_string()).unwrap_or_default();
                    found.push((id, squad));
                }
                Err(err) => warn!(%err, raw, "skipping malformed carrier id"),
            }
        }
        found
    }
}

#[async_trait]
impl Scanner for CarrierScanner {
    fn name(&self) -> &str {
        &self.name
    }

    fn client(&self) -> &RetryClient {
        &self.client
    }

    async fn update_cells(&self) -> Result<()> {
        let rows = self.client.whole_sheet().await?;
        *self.cells.write() = CellGrid::new(rows);
        Ok(())
    }

    fn parse_into(&self, session: &mut Session) -> Result<()> {
        let grid = self.cells.read().clone();
        let entries = Self::parse_entries(&grid);

        let now = Utc::now();
        let triples: Vec<(CarrierId, String, bool)> =
            entries.into_iter().map(|(id, squad)| (id, squad, true)).collect();
        rampart_query::track::track_ids_update(session, &triples, now);

        info!(scanner = %self.name, entries = triples.len(), "carrier registry parsed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_and_squads() {
        let grid = CellGrid::new(vec![
            vec!["ID".into(), "Squad".into()],
            vec!["ABC-123".into(), "Wolves".into()],
            vec!["bad".into(), "ignored".into()],
            vec!["XYZ-9W9".into(), "".into()],
        ]);

        let entries = CarrierScanner::parse_entries(&grid);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0.as_str(), "ABC-123");
        assert_eq!(entries[0].1, "Wolves");
        assert_eq!(entries[1].0.as_str(), "XYZ-9W9");
    }

    #[test]
    fn scan_preserves_position_history() {
        use rampart_query::track;
        use rampart_store::Store;

        let store = Store::new();
        let id = CarrierId::new("ABC-123").unwrap();

        // The ingester already saw this carrier move.
        store
            .with_session(|session| {
                track::track_ids_spotted(session, &id, "", "Rana", Utc::now());
                Ok(())
            })
            .unwrap();

        // The registry scan flags it override without losing the position.
        store
            .with_session(|session| {
                let triples = vec![(id.clone(), "Wolves".to_string(), true)];
                track::track_ids_update(session, &triples, Utc::now());
                Ok(())
            })
            .unwrap();

        let snapshot = store.snapshot();
        let carrier = &snapshot.carriers[&id];
        assert_eq!(carrier.system, "Rana");
        assert!(carrier.override_flag);
        assert_eq!(carrier.squad, "Wolves");
    }
}
