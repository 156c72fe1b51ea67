//! The recruit roster sheet scanner.
//!
//! The roster is read-only intelligence for `admin top`: names in column B
//! from row 2 down, with the sheet row remembered so leadership can jump
//! to an entry. Nothing is persisted to the cache; handlers query the
//! roster snapshot directly.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use rampart_core::Result;
use rampart_store::Session;

use crate::cells::CellGrid;
use crate::client::RetryClient;
use crate::scanner::Scanner;

/// One recruit row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recruit {
    /// Sheet name of the recruit.
    pub name: String,
    /// 1-based sheet row.
    pub row: usize,
}

/// Scanner for the recruit roster.
pub struct RecruitScanner {
    name: String,
    client: RetryClient,
    cells: RwLock<CellGrid>,
    roster: RwLock<Vec<Recruit>>,
}

impl RecruitScanner {
    /// Create a scanner over `client`.
    pub fn new(name: impl Into<String>, client: RetryClient) -> Self {
        Self {
            name: name.into(),
            client,
            cells: RwLock::new(CellGrid::default()),
            roster: RwLock::new(Vec::new()),
        }
    }

    /// The roster from the last completed scan.
    pub fn roster(&self) -> Vec<Recruit> {
        self.roster.read().clone()
    }

    fn parse_roster(grid: &CellGrid) -> Vec<Recruit> {
        grid.rows()
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(ind, row)| {
                let name = row.get(1).map(|c| c.trim()).unwrap_or_default();
                (!name.is_empty()).then(|| Recruit { name: name.to_string(), row: ind + 1 })
            })
            .collect()
    }
}

#[async_trait]
impl Scanner for RecruitScanner {
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

    fn parse_into(&self, _session: &mut Session) -> Result<()> {
        let grid = self.cells.read().clone();
        let roster = Self::parse_roster(&grid);
        info!(scanner = %self.name, recruits = roster.len(), "recruit roster parsed");
        *self.roster.write() = roster;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_skips_blank_rows() {
        let grid = CellGrid::new(vec![
            vec!["Joined".into(), "Name".into()],
            vec!["2023-01-01".into(), "Alice".into()],
            vec!["".into(), "".into()],
            vec!["2023-02-01".into(), "Bob".into()],
        ]);

        let roster = RecruitScanner::parse_roster(&grid);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0], Recruit { name: "Alice".into(), row: 2 });
        assert_eq!(roster[1], Recruit { name: "Bob".into(), row: 4 });
    }
}
