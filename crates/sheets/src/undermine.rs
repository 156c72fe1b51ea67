//! The undermine sheet scanner (main and snipe variants).
//!
//! Systems occupy **pairs** of adjacent columns starting at `D`; parsing
//! stops at the first pair whose name cell (row 9) is blank or reads
//! `Template`. Rows 1-13 of a pair carry the system frame; contributor
//! holds fill rows 14 down as (held, redeemed) pairs. The two template
//! pairs at the tab's right are cloned when systems are inserted.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use tracing::info;

use rampart_core::{Error, Result};
use rampart_store::{Session, UmHold, UmKind, UmSheet, UmSystem, UmUser};

use crate::cells::{parse_int, parse_percent, CellGrid};
use crate::client::RetryClient;
use crate::column::{column_to_index, index_to_column, Column};
use crate::formula::slide_formula_by_offset;
use crate::fort::parse_user_rows;
use crate::payload::CellUpdate;
use crate::scanner::Scanner;

/// First system pair sits at column `D`.
const FIRST_SYSTEM_COL: &str = "D";
/// 0-based index of the first contributor row.
const USER_ROW: usize = 13;
/// Rows of the system frame above the hold area.
const SYSTEM_FRAME_ROWS: usize = 13;
/// 0-based row of the system name within a pair's main column.
const NAME_ROW: usize = 8;

/// Values used to fill a cloned template pair.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUmSystem {
    /// System name.
    pub name: String,
    /// Owning power, written beside the security cell.
    pub power: String,
    /// Undermine trigger.
    pub trigger: i64,
    /// Priority string.
    pub priority: String,
}

/// Scanner for one undermine sheet.
pub struct UmScanner {
    name: String,
    sheet: UmSheet,
    client: RetryClient,
    cells: RwLock<CellGrid>,
}

impl UmScanner {
    /// Create a scanner for `sheet` over `client`.
    pub fn new(name: impl Into<String>, sheet: UmSheet, client: RetryClient) -> Self {
        Self { name: name.into(), sheet, client, cells: RwLock::new(CellGrid::default()) }
    }

    /// Parse one system pair. `None` ends the system area.
    ///
    /// Main-column frame: opposition/expansion trigger header, trigger,
    /// margin formula, goal, cmdr merits, missing, security, closest
    /// control, name, our progress, enemy progress, skip, map offset. The
    /// secondary column carries notes, priority and the power name.
    fn parse_system_pair(
        sheet: UmSheet,
        main: &[String],
        sec: &[String],
        sheet_col: &str,
    ) -> Option<UmSystem> {
        let name = main.get(NAME_ROW).map(|c| c.trim()).unwrap_or_default();
        if name.is_empty() || name.to_lowercase().contains("template") {
            return None;
        }

        let header = main.first().map(|c| c.trim()).unwrap_or_default();
        let kind = if header.starts_with("Exp") {
            UmKind::Expand
        } else if !header.is_empty() {
            UmKind::Oppose
        } else {
            UmKind::Control
        };

        let cell = |cells: &[String], ind: usize| -> String {
            cells.get(ind).map(|c| c.trim().to_string()).unwrap_or_default()
        };

        Some(UmSystem {
            id: 0,
            sheet,
            name: name.to_string(),
            kind,
            sheet_col: sheet_col.to_string(),
            goal: parse_int(&cell(main, 3)),
            security: cell(main, 6).replace("Sec: ", ""),
            notes: cell(sec, 6),
            close_control: cell(main, 7),
            priority: cell(sec, 7),
            progress_us: parse_int(&cell(main, 9)),
            progress_them: parse_percent(&cell(main, 10)),
            map_offset: parse_int(&cell(main, 12)),
            exp_trigger: parse_int(&cell(main, 1)),
        })
    }

    fn parse_systems(&self, grid: &CellGrid) -> Result<Vec<UmSystem>> {
        let mut column = Column::parse(FIRST_SYSTEM_COL)?;
        let mut ind = column.index() - 1;
        let mut found = Vec::new();

        while ind + 1 < grid.width().max(1) {
            let main = grid.column(ind);
            let sec = grid.column(ind + 1);
            match Self::parse_system_pair(self.sheet, main, sec, &column.to_string()) {
                Some(system) => found.push(system),
                None => break,
            }
            column.offset(2)?;
            ind += 2;
        }

        Ok(found)
    }

    fn parse_users(&self, grid: &CellGrid) -> Result<Vec<UmUser>> {
        let rows = parse_user_rows(grid, USER_ROW, "UM")?;
        Ok(rows
            .into_iter()
            .map(|u| UmUser { id: 0, sheet: self.sheet, name: u.name, row: u.row, cry: u.cry })
            .collect())
    }

    fn parse_holds(
        &self,
        grid: &CellGrid,
        systems: &[(i64, &UmSystem)],
        users: &[(i64, &UmUser)],
    ) -> Result<Vec<UmHold>> {
        let mut found = Vec::new();
        for (system_id, system) in systems {
            let main_ind = column_to_index(&system.sheet_col)? - 1;
            let held_cells = &grid.column(main_ind)[SYSTEM_FRAME_ROWS.min(grid.height())..];
            let redeemed_cells =
                &grid.column(main_ind + 1)[SYSTEM_FRAME_ROWS.min(grid.height())..];

            for (user_id, user) in users {
                let Some(offset) = (user.row - 1).checked_sub(SYSTEM_FRAME_ROWS) else {
                    continue;
                };
                let held = held_cells.get(offset).map(String::as_str).unwrap_or("");
                let redeemed = redeemed_cells.get(offset).map(String::as_str).unwrap_or("");
                if held.trim().is_empty() && redeemed.trim().is_empty() {
                    continue;
                }
                found.push(UmHold {
                    id: 0,
                    sheet: self.sheet,
                    user_id: *user_id,
                    system_id: *system_id,
                    held: parse_int(held).max(0),
                    redeemed: parse_int(redeemed).max(0),
                });
            }
        }
        Ok(found)
    }

    /// Clone the template pairs for `new_systems` and slide the templates
    /// right, producing one write covering the tail of the system area.
    ///
    /// `columns` is the formula-rendered `D1:13` block, column-major. The
    /// returned range opens at the control template's column.
    pub fn slide_templates(
        columns: &[Vec<String>],
        new_systems: &[NewUmSystem],
    ) -> Result<Vec<CellUpdate>> {
        let template_ind = columns
            .iter()
            .position(|col| {
                col.get(NAME_ROW).map(|c| c.contains("Template")).unwrap_or(false)
            })
            .ok_or_else(|| Error::SheetParsing("no Template columns on the tab".into()))?;

        let templates = &columns[template_ind..];
        if templates.len() < 4 {
            return Err(Error::SheetParsing("expected two template pairs".into()));
        }
        let height = templates.iter().map(Vec::len).max().unwrap_or(0);
        if height < SYSTEM_FRAME_ROWS {
            return Err(Error::SheetParsing("template columns are truncated".into()));
        }

        let mut out_cols: Vec<Vec<String>> = Vec::new();
        for new_system in new_systems {
            // The cloned pair lands where the templates sat; its formulas
            // already reference the template columns, shifted per pair below.
            let offset = out_cols.len() as i64;
            let mut main = slide_formula_by_offset(&templates[0], offset)?;
            let mut sec = slide_formula_by_offset(&templates[1], offset)?;
            main.resize(height, String::new());
            sec.resize(height, String::new());

            main[3] = new_system.trigger.to_string();
            main[NAME_ROW] = new_system.name.clone();
            main[9] = "0".to_string();
            main[10] = "0".to_string();
            sec[6] = new_system.power.clone();
            sec[7] = new_system.priority.clone();

            out_cols.push(main);
            out_cols.push(sec);
        }

        // The four template columns slide right past the inserted pairs.
        let slid = out_cols.len() as i64;
        for template in templates.iter().take(4) {
            let mut col = slide_formula_by_offset(template, slid)?;
            col.resize(height, String::new());
            out_cols.push(col);
        }

        let start_col = index_to_column(template_ind + column_to_index(FIRST_SYSTEM_COL)?)?;
        Ok(vec![CellUpdate {
            range: format!("{start_col}1:{height}"),
            values: columns_to_rows(&out_cols, height),
        }])
    }

    /// Remove the pair named `name`, shifting every column after it two to
    /// the left and rewriting their formulas; the freed tail is blanked.
    pub fn remove_um_system(columns: &[Vec<String>], name: &str) -> Result<Vec<CellUpdate>> {
        let pair_ind = columns
            .iter()
            .step_by(2)
            .position(|col| col.get(NAME_ROW).map(|c| c.trim() == name).unwrap_or(false))
            .map(|p| p * 2)
            .ok_or_else(|| Error::NoMatch { needle: name.to_string(), kind: "UMSystem" })?;

        let height = columns.iter().map(Vec::len).max().unwrap_or(0);
        let mut out_cols: Vec<Vec<String>> = Vec::new();
        for col in &columns[pair_ind + 2..] {
            let mut shifted = slide_formula_by_offset(col, -2)?;
            shifted.resize(height, String::new());
            out_cols.push(shifted);
        }
        // Blank the two columns freed at the tail.
        out_cols.push(vec![String::new(); height]);
        out_cols.push(vec![String::new(); height]);

        let start_col = index_to_column(pair_ind + column_to_index(FIRST_SYSTEM_COL)?)?;
        Ok(vec![CellUpdate {
            range: format!("{start_col}1:{height}"),
            values: columns_to_rows(&out_cols, height),
        }])
    }
}

fn columns_to_rows(cols: &[Vec<String>], height: usize) -> Vec<Vec<serde_json::Value>> {
    (0..height)
        .map(|row| {
            cols.iter()
                .map(|col| json!(col.get(row).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

#[async_trait]
impl Scanner for UmScanner {
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

        let systems = self.parse_systems(&grid)?;
        let users = self.parse_users(&grid)?;

        session.drop_um_rows(self.sheet);

        let mut user_ids = Vec::with_capacity(users.len());
        for user in &users {
            user_ids.push(session.insert_um_user(user.clone())?);
        }
        let mut system_ids = Vec::with_capacity(systems.len());
        for system in &systems {
            system_ids.push(session.insert_um_system(system.clone())?);
        }

        let systems_with_ids: Vec<(i64, &UmSystem)> =
            system_ids.iter().copied().zip(systems.iter()).collect();
        let users_with_ids: Vec<(i64, &UmUser)> =
            user_ids.iter().copied().zip(users.iter()).collect();

        for hold in self.parse_holds(&grid, &systems_with_ids, &users_with_ids)? {
            session.insert_um_hold(hold)?;
        }

        info!(
            scanner = %self.name,
            systems = systems_with_ids.len(),
            users = users_with_ids.len(),
            "undermine sheet parsed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{InputOption, MajorDim, SheetClient, ValueRender};
    use std::sync::Arc;

    /// A compact undermine tab: pad columns A-C, one expansion pair (D-E),
    /// one control pair (F-G), the template pairs, users from row 14.
    fn um_grid() -> CellGrid {
        let blank = String::new;
        let mut cols: Vec<Vec<String>> = vec![vec![blank(); 16]; 3];
        // Cry/name columns.
        cols[0] = vec![
            "", "", "", "", "", "", "", "", "", "", "", "", "", "", "", "",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        cols[1] = cols[0].clone();
        cols[1][13] = "Alice".into();
        cols[1][14] = "Bob".into();

        // D: expansion main column.
        let mut main = vec![blank(); 16];
        main[0] = "Exp. trigger".into();
        main[1] = "5905".into();
        main[3] = "8000".into();
        main[6] = "Sec: Low".into();
        main[7] = "Dongkum".into();
        main[8] = "Burr".into();
        main[9] = "3500".into();
        main[10] = "0.35".into();
        main[12] = "0".into();
        main[13] = "400".into();
        // E: expansion secondary column.
        let mut sec = vec![blank(); 16];
        sec[6] = "Yuri Grom".into();
        sec[7] = "Normal".into();
        sec[13] = "100".into();
        cols.push(main);
        cols.push(sec);

        // F: control main column.
        let mut main = vec![blank(); 16];
        main[3] = "12000".into();
        main[6] = "Sec: Med".into();
        main[7] = "Sol".into();
        main[8] = "Rana".into();
        main[9] = "0".into();
        main[10] = "0".into();
        main[12] = "6000".into();
        main[14] = "2200".into();
        // G: control secondary column.
        let mut sec = vec![blank(); 16];
        sec[7] = "Leave for now".into();
        sec[14] = "900".into();
        cols.push(main);
        cols.push(sec);

        // H: control template pair ends parsing.
        let mut template = vec![blank(); 16];
        template[8] = "Control System Template".into();
        cols.push(template);
        cols.push(vec![blank(); 16]);

        // Transpose to rows for the grid constructor.
        let height = 16;
        let rows = (0..height)
            .map(|r| cols.iter().map(|c| c[r].clone()).collect())
            .collect();
        CellGrid::new(rows)
    }

    fn scanner() -> UmScanner {
        struct Null;
        #[async_trait]
        impl SheetClient for Null {
            async fn title(&self) -> Result<String> {
                Ok("um".into())
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
        UmScanner::new("undermine_main", UmSheet::Main, RetryClient::new(Arc::new(Null)))
    }

    #[test]
    fn systems_parse_as_pairs_until_template() {
        let scanner = scanner();
        let systems = scanner.parse_systems(&um_grid()).unwrap();

        assert_eq!(systems.len(), 2);
        assert_eq!(systems[0].name, "Burr");
        assert_eq!(systems[0].kind, UmKind::Expand);
        assert_eq!(systems[0].sheet_col, "D");
        assert_eq!(systems[0].exp_trigger, 5905);
        assert_eq!(systems[0].security, "Low");
        assert_eq!(systems[0].notes, "Yuri Grom");
        assert_eq!(systems[0].priority, "Normal");
        assert!((systems[0].progress_them - 0.35).abs() < 1e-9);

        assert_eq!(systems[1].name, "Rana");
        assert_eq!(systems[1].kind, UmKind::Control);
        assert_eq!(systems[1].sheet_col, "F");
        assert_eq!(systems[1].map_offset, 6000);
        assert!(systems[1].is_skipped());
    }

    #[test]
    fn holds_pair_held_and_redeemed() {
        let scanner = scanner();
        let grid = um_grid();
        let systems = scanner.parse_systems(&grid).unwrap();
        let users = scanner.parse_users(&grid).unwrap();

        let systems_with_ids: Vec<(i64, &UmSystem)> =
            systems.iter().enumerate().map(|(i, s)| (i as i64 + 1, s)).collect();
        let users_with_ids: Vec<(i64, &UmUser)> =
            users.iter().enumerate().map(|(i, u)| (i as i64 + 1, u)).collect();

        let holds = scanner.parse_holds(&grid, &systems_with_ids, &users_with_ids).unwrap();
        assert_eq!(holds.len(), 2);
        // Alice holds 400 at Burr with 100 redeemed.
        assert_eq!(holds[0].held, 400);
        assert_eq!(holds[0].redeemed, 100);
        // Bob holds 2200 at Rana with 900 redeemed.
        assert_eq!(holds[1].held, 2200);
        assert_eq!(holds[1].redeemed, 900);
    }

    #[test]
    fn users_start_at_row_fourteen() {
        let scanner = scanner();
        let users = scanner.parse_users(&um_grid()).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "Alice");
        assert_eq!(users[0].row, 14);
        assert_eq!(users[1].row, 15);
    }

    #[test]
    fn slide_templates_inserts_before_templates() {
        // Template block alone at N (10 pairs before it).
        let mut columns = vec![vec![String::new(); 13]; 10];
        for col in columns.iter_mut() {
            col[NAME_ROW] = "Existing".into();
        }
        let mut control_main = vec![String::new(); 13];
        control_main[3] = "1,000".into();
        control_main[4] = "=SUM(N14:O)".into();
        control_main[NAME_ROW] = "Control System Template".into();
        let control_sec = vec![String::new(); 13];
        let mut exp_main = vec![String::new(); 13];
        exp_main[0] = "Opp. trigger".into();
        exp_main[NAME_ROW] = "Expansion Template".into();
        let exp_sec = vec![String::new(); 13];
        columns.extend([control_main, control_sec, exp_main, exp_sec]);

        let new_systems = vec![NewUmSystem {
            name: "Frey".into(),
            power: "Yuri Grom".into(),
            trigger: 12345,
            priority: "Normal".into(),
        }];
        let updates = UmScanner::slide_templates(&columns, &new_systems).unwrap();
        assert_eq!(updates.len(), 1);
        // Ten pairs from D puts the templates at N.
        assert_eq!(updates[0].range, "N1:13");

        let rows = &updates[0].values;
        assert_eq!(rows.len(), 13);
        // New pair first: name and trigger filled in.
        assert_eq!(rows[NAME_ROW][0], json!("Frey"));
        assert_eq!(rows[3][0], json!("12345"));
        assert_eq!(rows[7][1], json!("Normal"));
        assert_eq!(rows[6][1], json!("Yuri Grom"));
        // Templates follow, formulas slid right by the inserted pair.
        assert_eq!(rows[NAME_ROW][2], json!("Control System Template"));
        assert_eq!(rows[4][2], json!("=SUM(P14:Q)"));
        assert_eq!(rows[NAME_ROW][4], json!("Expansion Template"));
    }

    #[test]
    fn remove_um_system_shifts_left_and_blanks_tail() {
        // Pairs: D/E = Pequen, F/G = Albisiyatae, then templates.
        let mut pequen_main = vec![String::new(); 14];
        pequen_main[NAME_ROW] = "Pequen".into();
        let mut pequen_sec = vec![String::new(); 14];
        pequen_sec[13] = "600".into();
        let mut albi_main = vec![String::new(); 14];
        albi_main[4] = "=SUM(F14:G)".into();
        albi_main[NAME_ROW] = "Albisiyatae".into();
        albi_main[13] = "1200".into();
        let albi_sec = vec![String::new(); 14];
        let columns = vec![pequen_main, pequen_sec, albi_main, albi_sec];

        let updates = UmScanner::remove_um_system(&columns, "Pequen").unwrap();
        assert_eq!(updates[0].range, "D1:14");

        let rows = &updates[0].values;
        // The second pair moved into the first slot with formulas offset.
        assert_eq!(rows[NAME_ROW][0], json!("Albisiyatae"));
        assert_eq!(rows[4][0], json!("=SUM(D14:E)"));
        assert_eq!(rows[13][0], json!("1200"));
        // Freed tail is blanked.
        assert_eq!(rows[NAME_ROW][2], json!(""));
        assert_eq!(rows[NAME_ROW][3], json!(""));
    }

    #[test]
    fn removing_unknown_system_is_no_match() {
        let columns = vec![vec![String::new(); 13]; 4];
        assert!(UmScanner::remove_um_system(&columns, "Nope").is_err());
    }

    #[test]
    fn full_parse_into_session() {
        let scanner = scanner();
        *scanner.cells.write() = um_grid();
        let store = rampart_store::Store::new();

        let mut session = store.begin_session();
        scanner.parse_into(&mut session).unwrap();
        session.commit().unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.um_systems.len(), 2);
        assert_eq!(snapshot.um_users.len(), 2);
        assert_eq!(snapshot.um_holds.len(), 2);

        let burr = snapshot.um_systems.values().find(|s| s.name == "Burr").unwrap();
        assert_eq!(snapshot.um_cmdr_merits(burr.id), 500);
    }
}
