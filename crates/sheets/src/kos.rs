//! The kill-on-sight sheet scanner.
//!
//! One cmdr per row from row 2: name, squad, reason, friendly marker. A
//! cmdr name appearing twice aborts the whole scan — the sheet must be
//! fixed by hand before the cache accepts it.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use rampart_core::{Error, Result};
use rampart_store::{KosEntry, Session};

use crate::cells::CellGrid;
use crate::client::RetryClient;
use crate::payload::{self, CellUpdate};
use crate::scanner::Scanner;

/// Scanner for the KOS sheet.
pub struct KosScanner {
    name: String,
    client: RetryClient,
    cells: RwLock<CellGrid>,
}

impl KosScanner {
    /// Create a scanner over `client`.
    pub fn new(name: impl Into<String>, client: RetryClient) -> Self {
        Self { name: name.into(), client, cells: RwLock::new(CellGrid::default()) }
    }

    /// Parse all entries, verifying cmdr names never repeat.
    ///
    /// On duplicates the error lists every 1-based sheet row carrying the
    /// repeated name.
    fn parse_entries(grid: &CellGrid) -> Result<Vec<KosEntry>> {
        let mut found: Vec<(usize, KosEntry)> = Vec::new();

        for (ind, row) in grid.rows().iter().enumerate().skip(1) {
            let cmdr = row.first().map(|c| c.trim()).unwrap_or_default();
            if cmdr.is_empty() {
                continue;
            }
            let sheet_row = ind + 1;

            let dupes: Vec<usize> = found
                .iter()
                .filter(|(_, e)| e.cmdr.eq_ignore_ascii_case(cmdr))
                .map(|(r, _)| *r)
                .collect();
            if !dupes.is_empty() {
                let mut rows = dupes;
                rows.push(sheet_row);
                return Err(Error::NameCollision {
                    sheet: "KOS".to_string(),
                    name: cmdr.to_string(),
                    rows,
                });
            }

            let is_friendly = row
                .get(3)
                .and_then(|c| c.trim().chars().next())
                .map(|c| c == 'f' || c == 'F')
                .unwrap_or(false);
            found.push((
                sheet_row,
                KosEntry {
                    id: 0,
                    cmdr: cmdr.to_string(),
                    squad: row.get(1).map(|c| c.trim().to_string()).unwrap_or_default(),
                    reason: row.get(2).map(|c| c.trim().to_string()).unwrap_or_default(),
                    is_friendly,
                },
            ));
        }

        Ok(found.into_iter().map(|(_, e)| e).collect())
    }

    /// The 1-based row a new report should append at.
    pub fn next_report_row(&self) -> usize {
        let grid = self.cells.read();
        let occupied = grid
            .rows()
            .iter()
            .rposition(|row| row.first().map(|c| !c.trim().is_empty()).unwrap_or(false))
            .map(|ind| ind + 1)
            .unwrap_or(1);
        occupied + 1
    }

    /// The payload appending one report at `row`.
    pub fn report_payload(
        row: usize,
        cmdr: &str,
        squad: &str,
        reason: &str,
        friendly: bool,
    ) -> Vec<CellUpdate> {
        payload::kos_report(row, cmdr, squad, reason, friendly)
    }
}

#[async_trait]
impl Scanner for KosScanner {
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
        // Parse fully before dropping anything; a duplicate leaves the
        // cache at its previous state.
        let entries = Self::parse_entries(&grid)?;

        session.drop_kos_rows();
        for entry in &entries {
            session.insert_kos(entry.clone())?;
        }

        info!(scanner = %self.name, entries = entries.len(), "kos sheet parsed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[[&str; 4]]) -> CellGrid {
        let mut all = vec![vec![
            "CMDR".to_string(),
            "Squad".to_string(),
            "Reason".to_string(),
            "Kill?".to_string(),
        ]];
        all.extend(
            rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect::<Vec<_>>()),
        );
        CellGrid::new(all)
    }

    #[test]
    fn entries_parse_with_friendly_flag() {
        let grid = grid(&[
            ["Bob", "BadSquad", "griefing", "KILL"],
            ["Carol", "Friends", "ally", "friendly"],
        ]);
        let entries = KosScanner::parse_entries(&grid).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].is_friendly);
        assert!(entries[1].is_friendly);
    }

    #[test]
    fn duplicates_name_their_rows() {
        let grid = grid(&[
            ["Bob", "", "", "KILL"],
            ["Alice", "", "", "KILL"],
            ["", "", "", ""],
            ["bob", "", "", "KILL"],
        ]);
        let err = KosScanner::parse_entries(&grid).unwrap_err();
        match err {
            Error::NameCollision { sheet, name, rows } => {
                assert_eq!(sheet, "KOS");
                assert_eq!(name, "bob");
                assert_eq!(rows, vec![2, 5]);
            }
            other => panic!("expected NameCollision, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_scan_leaves_cache_unchanged() {
        use rampart_store::Store;
        use std::sync::Arc;

        use crate::client::{InputOption, MajorDim, SheetClient, ValueRender};

        struct Null;
        #[async_trait]
        impl SheetClient for Null {
            async fn title(&self) -> Result<String> {
                Ok("kos".into())
            }
            async fn whole_sheet(&self) -> Result<Vec<Vec<String>>> {
                Ok(vec![])
            }
            async fn batch_get(
                &self,
                _r: &[String],
                _d: MajorDim,
                _v: ValueRender,
            ) -> Result<Vec<Vec<Vec<String>>>> {
                Ok(vec![])
            }
            async fn batch_update(&self, _u: &[CellUpdate], _i: InputOption) -> Result<()> {
                Ok(())
            }
            async fn change_worksheet(&self, _p: &str) -> Result<()> {
                Ok(())
            }
        }

        let scanner = KosScanner::new("kos", RetryClient::new(Arc::new(Null)));
        let store = Store::new();

        // Seed with one good scan.
        *scanner.cells.write() = grid(&[["Bob", "", "", "KILL"]]);
        store.with_session(|s| scanner.parse_into(s)).unwrap();
        assert_eq!(store.snapshot().kos.len(), 1);

        // A later snapshot with duplicates fails; the old entry survives.
        *scanner.cells.write() = grid(&[["Eve", "", "", "KILL"], ["Eve", "", "", "KILL"]]);
        assert!(store.with_session(|s| scanner.parse_into(s)).is_err());
        let snapshot = store.snapshot();
        assert_eq!(snapshot.kos.len(), 1);
        assert_eq!(snapshot.kos.values().next().unwrap().cmdr, "Bob");
    }

    #[test]
    fn next_report_row_appends_after_last() {
        use std::sync::Arc;

        use crate::client::{InputOption, MajorDim, SheetClient, ValueRender};

        struct Null;
        #[async_trait]
        impl SheetClient for Null {
            async fn title(&self) -> Result<String> {
                Ok("kos".into())
            }
            async fn whole_sheet(&self) -> Result<Vec<Vec<String>>> {
                Ok(vec![])
            }
            async fn batch_get(
                &self,
                _r: &[String],
                _d: MajorDim,
                _v: ValueRender,
            ) -> Result<Vec<Vec<Vec<String>>>> {
                Ok(vec![])
            }
            async fn batch_update(&self, _u: &[CellUpdate], _i: InputOption) -> Result<()> {
                Ok(())
            }
            async fn change_worksheet(&self, _p: &str) -> Result<()> {
                Ok(())
            }
        }

        let scanner = KosScanner::new("kos", RetryClient::new(Arc::new(Null)));
        *scanner.cells.write() = grid(&[["Bob", "", "", "KILL"]]);
        assert_eq!(scanner.next_report_row(), 3);
    }
}
