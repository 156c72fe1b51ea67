//! Batch-update payloads.
//!
//! Every write to a sheet is a list of `{range, values}` items; the
//! builders here encode the cell geometry of the campaign sheets so
//! handlers never format A1 ranges themselves. Writes are idempotent given
//! a stable row/column layout.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::column::Column;
use rampart_core::Result;

/// One ranged write: `{"range": "G6:G7", "values": [[..], [..]]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellUpdate {
    /// Inclusive A1 range.
    pub range: String,
    /// Row-major values for the range.
    pub values: Vec<Vec<Value>>,
}

impl CellUpdate {
    /// A single-cell update.
    pub fn cell(range: impl Into<String>, value: Value) -> Self {
        Self { range: range.into(), values: vec![vec![value]] }
    }
}

/// Update a contributor's `A{row}:B{row}` pair (cry, name).
pub fn user_row(row: usize, cry: &str, name: &str) -> Vec<CellUpdate> {
    vec![CellUpdate {
        range: format!("A{row}:B{row}"),
        values: vec![vec![json!(cry), json!(name)]],
    }]
}

/// Update a fort system column's status cells `{col}6:{col}7`.
pub fn fort_system(col: &str, fort_status: i64, um_status: i64) -> Vec<CellUpdate> {
    vec![CellUpdate {
        range: format!("{col}6:{col}7"),
        values: vec![vec![json!(fort_status)], vec![json!(um_status)]],
    }]
}

/// Update a single drop cell at the intersection of a system column and a
/// contributor row.
pub fn fort_drop(system_col: &str, user_row: usize, amount: i64) -> Vec<CellUpdate> {
    vec![CellUpdate::cell(format!("{system_col}{user_row}:{system_col}{user_row}"), json!(amount))]
}

/// Update an undermine system block `{col}10:{col}13`.
///
/// `progress_them` is written as a formatted percentage the way the sheet
/// renders it; row 12 is the fixed `Hold Merits` label.
pub fn um_system(
    col: &str,
    progress_us: i64,
    progress_them: f64,
    map_offset: i64,
) -> Vec<CellUpdate> {
    vec![CellUpdate {
        range: format!("{col}10:{col}13"),
        values: vec![
            vec![json!(progress_us)],
            vec![json!(format!("{:.2}%", progress_them * 100.0))],
            vec![json!("Hold Merits")],
            vec![json!(map_offset)],
        ],
    }]
}

/// Update an undermine system's priority cell (second column, row 8).
pub fn um_priority(col: &str, priority: &str) -> Result<Vec<CellUpdate>> {
    let mut second = Column::parse(col)?;
    second.fwd();
    Ok(vec![CellUpdate::cell(format!("{second}8:{second}8"), json!(priority))])
}

/// Update a hold pair `{col}{row}:{col+1}{row}` (held, redeemed).
pub fn um_hold(
    system_col: &str,
    user_row: usize,
    held: i64,
    redeemed: i64,
) -> Result<Vec<CellUpdate>> {
    let mut second = Column::parse(system_col)?;
    second.fwd();
    Ok(vec![CellUpdate {
        range: format!("{system_col}{user_row}:{second}{user_row}"),
        values: vec![vec![json!(held), json!(redeemed)]],
    }])
}

/// Append a KOS report row `A{row}:D{row}`.
pub fn kos_report(row: usize, cmdr: &str, squad: &str, reason: &str, friendly: bool) -> Vec<CellUpdate> {
    vec![CellUpdate {
        range: format!("A{row}:D{row}"),
        values: vec![vec![
            json!(cmdr),
            json!(squad),
            json!(reason),
            json!(if friendly { "FRIENDLY" } else { "KILL" }),
        ]],
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fort_system_geometry() {
        let updates = fort_system("G", 4910, 250);
        assert_eq!(updates[0].range, "G6:G7");
        assert_eq!(updates[0].values, vec![vec![json!(4910)], vec![json!(250)]]);
    }

    #[test]
    fn drop_cell_geometry() {
        let updates = fort_drop("G", 22, 700);
        assert_eq!(updates[0].range, "G22:G22");
        assert_eq!(updates[0].values, vec![vec![json!(700)]]);
    }

    #[test]
    fn um_system_block_formats_percent() {
        let updates = um_system("G", 7000, 500.0, 4300);
        assert_eq!(updates[0].range, "G10:G13");
        assert_eq!(
            updates[0].values,
            vec![
                vec![json!(7000)],
                vec![json!("50000.00%")],
                vec![json!("Hold Merits")],
                vec![json!(4300)],
            ]
        );
    }

    #[test]
    fn um_hold_spans_the_pair() {
        let updates = um_hold("G", 22, 750, 3000).unwrap();
        assert_eq!(updates[0].range, "G22:H22");
        assert_eq!(updates[0].values, vec![vec![json!(750), json!(3000)]]);
    }

    #[test]
    fn um_priority_lands_in_second_column() {
        let updates = um_priority("G", "Medium Priority").unwrap();
        assert_eq!(updates[0].range, "H8:H8");
    }

    #[test]
    fn user_row_pair() {
        let updates = user_row(15, "For the mug!", "Gears");
        assert_eq!(updates[0].range, "A15:B15");
        assert_eq!(updates[0].values, vec![vec![json!("For the mug!"), json!("Gears")]]);
    }

    #[test]
    fn kos_report_row() {
        let updates = kos_report(7, "Bob", "BadSquad", "griefing", false);
        assert_eq!(updates[0].range, "A7:D7");
        assert_eq!(updates[0].values[0][3], json!("KILL"));
    }

    #[test]
    fn payload_serializes_like_the_api_expects() {
        let update = CellUpdate::cell("A1:A1", json!(5));
        let text = serde_json::to_string(&update).unwrap();
        assert_eq!(text, r#"{"range":"A1:A1","values":[[5]]}"#);
    }
}
