//! The fortification sheet scanner.
//!
//! Sheet geometry: row 10 carries system headers. A run of `TBA` columns
//! precedes the first real system column; systems then occupy one column
//! each to the end of the sheet. Expansion preps sit between column `C` and
//! the first system column, `TBA`-named preps being placeholders. Each
//! system column stacks ten header rows; contributor drops fill the cells
//! below, one row per contributor. Contributors themselves occupy columns
//! A (cry) and B (name) from row 11 down.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use rampart_core::{Error, Result};
use rampart_store::{FortDrop, FortKind, FortSystem, FortUser, Session};

use crate::cells::{parse_float, parse_int, parse_percent, CellGrid};
use crate::client::RetryClient;
use crate::column::{column_to_index, Column};
use crate::scanner::Scanner;

/// 0-based index of the header row carrying system names.
const HEADER_ROW: usize = 9;
/// 0-based index of the first contributor row.
const USER_ROW: usize = 10;
/// Number of header rows stacked above the drop area in a system column.
const SYSTEM_HEADER_ROWS: usize = 10;

/// Scanner for the fortification sheet.
pub struct FortScanner {
    name: String,
    client: RetryClient,
    cells: RwLock<CellGrid>,
}

impl FortScanner {
    /// Create a scanner over `client`.
    pub fn new(name: impl Into<String>, client: RetryClient) -> Self {
        Self { name: name.into(), client, cells: RwLock::new(CellGrid::default()) }
    }

    /// Locate the first system column from the header row: the first
    /// non-`TBA` cell following a `TBA` cell.
    fn system_column(grid: &CellGrid) -> Result<String> {
        let header = grid.row(HEADER_ROW);
        let mut column = Column::new();

        let mut seen_tba = false;
        for cell in header {
            if seen_tba && cell.trim() != "TBA" {
                return Ok(column.to_string());
            }
            if cell.trim() == "TBA" {
                seen_tba = true;
            }
            column.fwd();
        }

        Err(Error::SheetParsing("Unable to determine system column.".into()))
    }

    /// Parse the ten header cells of one system column.
    ///
    /// Layout: undermine %, fort override %, trigger, missing, cmdr merits,
    /// fort status, um status, distance, notes, name. Missing and cmdr
    /// merits are derived cells and ignored.
    fn parse_system_column(
        cells: &[String],
        order: i64,
        sheet_col: &str,
        kind: FortKind,
    ) -> Result<Option<FortSystem>> {
        if cells.len() < SYSTEM_HEADER_ROWS {
            return Err(Error::SheetParsing("system column too short".into()));
        }
        let name = cells[9].trim();
        if name.is_empty() {
            return Ok(None);
        }

        Ok(Some(FortSystem {
            id: 0,
            name: name.to_string(),
            kind,
            fort_status: parse_int(&cells[5]),
            trigger: parse_int(&cells[2]).max(1),
            fort_override: parse_percent(&cells[1]),
            um_status: parse_int(&cells[6]),
            undermine: parse_percent(&cells[0]),
            distance: parse_float(&cells[7]),
            notes: cells[8].trim().to_string(),
            sheet_col: sheet_col.to_string(),
            sheet_order: order,
            manual_order: None,
        }))
    }

    fn parse_systems(grid: &CellGrid, system_col: &str) -> Result<Vec<FortSystem>> {
        let start = column_to_index(system_col)? - 1;
        let mut column = Column::parse(system_col)?;
        let mut found = Vec::new();
        let mut order = 1;

        for col in &grid.columns()[start.min(grid.width())..] {
            match Self::parse_system_column(col, order, &column.to_string(), FortKind::Fort)? {
                Some(system) => found.push(system),
                None => break,
            }
            order += 1;
            column.fwd();
        }

        Ok(found)
    }

    /// Preps live between column `C` and the first system column; `TBA`
    /// placeholders are skipped.
    fn parse_preps(grid: &CellGrid, system_col: &str) -> Result<Vec<FortSystem>> {
        let first_prep = column_to_index("C")? - 1;
        let first_system = column_to_index(system_col)? - 1;
        let mut column = Column::parse("C")?;
        let mut found = Vec::new();
        let mut order = 1;

        for col in &grid.columns()[first_prep..first_system.min(grid.width())] {
            let sheet_col = column.to_string();
            column.fwd();
            if col.len() >= SYSTEM_HEADER_ROWS && col[9].trim() == "TBA" {
                order += 1;
                continue;
            }
            if let Some(system) =
                Self::parse_system_column(col, order, &sheet_col, FortKind::Prep)?
            {
                found.push(system);
            }
            order += 1;
        }

        Ok(found)
    }

    /// Contributors from columns A and B, top to the last non-empty row.
    ///
    /// A repeated name is a hard parse failure naming all rows involved.
    fn parse_users(grid: &CellGrid) -> Result<Vec<FortUser>> {
        parse_user_rows(grid, USER_ROW, "Fort")
    }

    /// Drops under each system column, one row per contributor.
    fn parse_drops(
        grid: &CellGrid,
        systems: &[(i64, &FortSystem)],
        users: &[(i64, &FortUser)],
    ) -> Result<Vec<FortDrop>> {
        let mut found = Vec::new();
        for (system_id, system) in systems {
            let col_ind = column_to_index(&system.sheet_col)? - 1;
            let merit_cells = &grid.column(col_ind)[SYSTEM_HEADER_ROWS.min(grid.height())..];

            for (user_id, user) in users {
                // Align by sheet row, tolerating gaps between contributors.
                let Some(offset) = (user.row - 1).checked_sub(SYSTEM_HEADER_ROWS) else {
                    continue;
                };
                let Some(cell) = merit_cells.get(offset) else {
                    continue;
                };
                let cleaned = cell.trim().replace(',', "");
                let Ok(amount) = cleaned.parse::<i64>() else {
                    continue;
                };
                found.push(FortDrop { id: 0, user_id: *user_id, system_id: *system_id, amount });
            }
        }
        Ok(found)
    }
}

/// Shared contributor-row parsing for fort and undermine sheets.
///
/// Returns users in row order; a repeated name raises `NameCollision` with
/// every 1-based row carrying it.
pub(crate) fn parse_user_rows(
    grid: &CellGrid,
    start_row: usize,
    sheet: &str,
) -> Result<Vec<FortUser>> {
    let last = grid.last_user_row();
    let mut found: Vec<FortUser> = Vec::new();

    for row_ind in start_row..last {
        let cry = grid.row(row_ind).first().cloned().unwrap_or_default();
        let name = grid.row(row_ind).get(1).cloned().unwrap_or_default();
        let row = row_ind + 1;
        if name.trim().is_empty() {
            continue;
        }

        if found.iter().any(|u| u.name == name) {
            let mut rows: Vec<usize> =
                found.iter().filter(|u| u.name == name).map(|u| u.row).collect();
            rows.push(row);
            return Err(Error::NameCollision { sheet: sheet.to_string(), name, rows });
        }

        found.push(FortUser { id: 0, name, row, cry });
    }

    Ok(found)
}

#[async_trait]
impl Scanner for FortScanner {
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
        let system_col = Self::system_column(&grid)?;

        let systems = Self::parse_systems(&grid, &system_col)?;
        let preps = Self::parse_preps(&grid, &system_col)?;
        let users = Self::parse_users(&grid)?;

        session.drop_fort_rows();

        let mut user_ids = Vec::with_capacity(users.len());
        for user in &users {
            user_ids.push(session.insert_fort_user(user.clone())?);
        }
        let mut system_ids = Vec::with_capacity(systems.len() + preps.len());
        for system in systems.iter().chain(preps.iter()) {
            system_ids.push(session.insert_fort_system(system.clone())?);
        }

        let systems_with_ids: Vec<(i64, &FortSystem)> = system_ids
            .iter()
            .copied()
            .zip(systems.iter().chain(preps.iter()))
            .collect();
        let users_with_ids: Vec<(i64, &FortUser)> =
            user_ids.iter().copied().zip(users.iter()).collect();

        // Drops only live under standard system columns and preps alike.
        let drops = Self::parse_drops(&grid, &systems_with_ids, &users_with_ids)?;
        for drop in drops {
            session.insert_fort_drop(drop)?;
        }

        info!(
            scanner = %self.name,
            systems = systems_with_ids.len(),
            users = users_with_ids.len(),
            "fort sheet parsed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A small but faithful fort tab: preps in C-D, TBA padding in E-F,
    /// systems from G, contributors from row 11.
    pub(crate) fn fort_grid() -> CellGrid {
        let mut rows = vec![vec![String::new(); 9]; 10];
        // Header rows for the two system columns G and H and prep C.
        let header = |rows: &mut Vec<Vec<String>>, col: usize, vals: [&str; 10]| {
            for (ind, val) in vals.iter().enumerate() {
                rows[ind][col] = val.to_string();
            }
        };

        // C: a prep. D: TBA prep placeholder. E,F: TBA pad. G,H: systems.
        header(&mut rows, 2, ["0", "0", "8000", "", "", "0", "0", "99.2", "To prep", "Rhea"]);
        header(&mut rows, 3, ["", "", "", "", "", "", "", "", "", "TBA"]);
        rows[HEADER_ROW][4] = "TBA".into();
        rows[HEADER_ROW][5] = "TBA".into();
        header(
            &mut rows,
            6,
            ["0", "0", "4910", "", "", "4210", "0", "116.99", "", "Frey"],
        );
        header(
            &mut rows,
            7,
            ["1.2", "0", "6000", "", "", "0", "250", "99.51", "Attacked", "Rana"],
        );

        // Contributors and their drops.
        rows.push(vec![
            "For the mug!".into(),
            "Alice".into(),
            "".into(),
            "".into(),
            "".into(),
            "".into(),
            "700".into(),
            "".into(),
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
            "1,200".into(),
            "".into(),
        ]);

        CellGrid::new(rows)
    }

    #[test]
    fn system_column_found_after_tba_run() {
        let grid = fort_grid();
        assert_eq!(FortScanner::system_column(&grid).unwrap(), "G");
    }

    #[test]
    fn missing_tba_run_is_a_parse_error() {
        let grid = CellGrid::new(vec![vec!["x".into(); 3]; 10]);
        assert!(FortScanner::system_column(&grid).is_err());
    }

    #[test]
    fn systems_parse_in_sheet_order() {
        let grid = fort_grid();
        let systems = FortScanner::parse_systems(&grid, "G").unwrap();
        assert_eq!(systems.len(), 2);
        assert_eq!(systems[0].name, "Frey");
        assert_eq!(systems[0].trigger, 4910);
        assert_eq!(systems[0].fort_status, 4210);
        assert_eq!(systems[0].sheet_col, "G");
        assert_eq!(systems[1].name, "Rana");
        assert!((systems[1].undermine - 1.2).abs() < 1e-9);
        assert_eq!(systems[1].um_status, 250);
        assert_eq!(systems[1].notes, "Attacked");
    }

    #[test]
    fn preps_skip_tba_placeholders() {
        let grid = fort_grid();
        let preps = FortScanner::parse_preps(&grid, "G").unwrap();
        assert_eq!(preps.len(), 1);
        assert_eq!(preps[0].name, "Rhea");
        assert_eq!(preps[0].kind, FortKind::Prep);
        assert_eq!(preps[0].sheet_col, "C");
    }

    #[test]
    fn users_parse_from_row_eleven() {
        let grid = fort_grid();
        let users = FortScanner::parse_users(&grid).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "Alice");
        assert_eq!(users[0].row, 11);
        assert_eq!(users[0].cry, "For the mug!");
        assert_eq!(users[1].row, 12);
    }

    #[test]
    fn duplicate_user_names_fail_with_rows() {
        let mut rows = fort_grid().rows().to_vec();
        rows.push(vec!["".into(), "Alice".into()]);
        let grid = CellGrid::new(rows);

        let err = FortScanner::parse_users(&grid).unwrap_err();
        match err {
            Error::NameCollision { name, rows, .. } => {
                assert_eq!(name, "Alice");
                assert_eq!(rows, vec![11, 13]);
            }
            other => panic!("expected NameCollision, got {other:?}"),
        }
    }

    #[test]
    fn full_parse_replaces_cache_deterministically() {
        let grid = fort_grid();
        let store = rampart_store::Store::new();

        let parse = |session: &mut Session| {
            let system_col = FortScanner::system_column(&grid).unwrap();
            let systems = FortScanner::parse_systems(&grid, &system_col).unwrap();
            let preps = FortScanner::parse_preps(&grid, &system_col).unwrap();
            let users = FortScanner::parse_users(&grid).unwrap();

            session.drop_fort_rows();
            let mut user_ids = Vec::new();
            for user in &users {
                user_ids.push(session.insert_fort_user(user.clone()).unwrap());
            }
            let mut ids = Vec::new();
            for system in systems.iter().chain(preps.iter()) {
                ids.push(session.insert_fort_system(system.clone()).unwrap());
            }
            let with_ids: Vec<(i64, &FortSystem)> =
                ids.iter().copied().zip(systems.iter().chain(preps.iter())).collect();
            let users_with_ids: Vec<(i64, &FortUser)> =
                user_ids.iter().copied().zip(users.iter()).collect();
            for drop in FortScanner::parse_drops(&grid, &with_ids, &users_with_ids).unwrap() {
                session.insert_fort_drop(drop).unwrap();
            }
        };

        let mut session = store.begin_session();
        parse(&mut session);
        session.commit().unwrap();
        let first = store.snapshot();

        // A second scan with no intervening writes produces an identical cache.
        let mut session = store.begin_session();
        parse(&mut session);
        session.commit().unwrap();
        let second = store.snapshot();
        assert_eq!(*first, *second);

        // Drops landed against the right systems.
        let frey = first.fort_systems.values().find(|s| s.name == "Frey").unwrap();
        assert_eq!(first.fort_cmdr_merits(frey.id), 700);
        let rana = first.fort_systems.values().find(|s| s.name == "Rana").unwrap();
        assert_eq!(first.fort_cmdr_merits(rana.id), 1200);
    }
}
