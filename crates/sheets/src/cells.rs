//! Cell grids and tolerant value parsing.
//!
//! A snapshot of a worksheet arrives row-major with ragged row widths; the
//! grid pads every row to a uniform width and keeps a column-major view
//! beside it, since the campaign sheets are laid out by column.

use serde::{Deserialize, Serialize};

/// A padded snapshot of a worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellGrid {
    rows: Vec<Vec<String>>,
    cols: Vec<Vec<String>>,
}

impl CellGrid {
    /// Build a grid from raw row-major cells, padding rows to equal width.
    pub fn new(mut rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }

        let mut cols = vec![Vec::with_capacity(rows.len()); width];
        for row in &rows {
            for (ind, cell) in row.iter().enumerate() {
                cols[ind].push(cell.clone());
            }
        }

        Self { rows, cols }
    }

    /// Row-major cells.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Column-major cells.
    pub fn columns(&self) -> &[Vec<String>] {
        &self.cols
    }

    /// One row by 0-based index; empty when out of range.
    pub fn row(&self, ind: usize) -> &[String] {
        self.rows.get(ind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One column by 0-based index; empty when out of range.
    pub fn column(&self, ind: usize) -> &[String] {
        self.cols.get(ind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns after padding.
    pub fn width(&self) -> usize {
        self.cols.len()
    }

    /// 1-based row of the last row whose first two cells are not both blank.
    ///
    /// The contributor area ends here; trailing formatting rows in the
    /// sheet body do not count.
    pub fn last_user_row(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| {
                row.first().map(|c| !c.trim().is_empty()).unwrap_or(false)
                    || row.get(1).map(|c| !c.trim().is_empty()).unwrap_or(false)
            })
            .map(|ind| ind + 1)
            .unwrap_or(0)
    }
}

/// Parse an integer cell; thousands separators are tolerated, anything
/// else parses as 0 (a blank cell means no merits, not an error).
pub fn parse_int(cell: &str) -> i64 {
    let cleaned = cell.trim();
    cleaned
        .parse()
        .or_else(|_| cleaned.replace(',', "").parse())
        .unwrap_or(0)
}

/// Parse a float cell; failures parse as 0.0.
pub fn parse_float(cell: &str) -> f64 {
    cell.trim().parse().unwrap_or(0.0)
}

/// Parse a percent cell into a fraction.
///
/// Accepts both the raw fraction form (`0.42`) and the formatted form
/// (`42%`); failures parse as 0.0.
pub fn parse_percent(cell: &str) -> f64 {
    let cleaned = cell.trim();
    if let Ok(val) = cleaned.parse::<f64>() {
        return val;
    }
    if let Some(stripped) = cleaned.strip_suffix('%') {
        return parse_float(stripped) / 100.0;
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> CellGrid {
        CellGrid::new(vec![
            vec!["a".into(), "b".into(), "c".into()],
            vec!["d".into()],
            vec!["e".into(), "f".into()],
        ])
    }

    #[test]
    fn rows_are_padded() {
        let grid = grid();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.row(1), &["d".to_string(), "".into(), "".into()]);
    }

    #[test]
    fn column_view_transposes() {
        let grid = grid();
        assert_eq!(grid.column(0), &["a".to_string(), "d".into(), "e".into()]);
        assert_eq!(grid.column(2), &["c".to_string(), "".into(), "".into()]);
        assert!(grid.column(7).is_empty());
    }

    #[test]
    fn last_user_row_ignores_trailing_blanks() {
        let grid = CellGrid::new(vec![
            vec!["cry".into(), "name".into()],
            vec!["".into(), "gears".into()],
            vec!["".into(), "".into(), "x".into()],
        ]);
        assert_eq!(grid.last_user_row(), 2);
    }

    #[test]
    fn int_parsing_tolerates_separators() {
        assert_eq!(parse_int(" 4910 "), 4910);
        assert_eq!(parse_int("1,000"), 1000);
        assert_eq!(parse_int(""), 0);
        assert_eq!(parse_int("#DIV/0!"), 0);
        assert_eq!(parse_int("-250"), -250);
    }

    #[test]
    fn percent_parsing_accepts_both_forms() {
        assert!((parse_percent("0.42") - 0.42).abs() < 1e-9);
        assert!((parse_percent("42%") - 0.42).abs() < 1e-9);
        assert!((parse_percent("50000.00%") - 500.0).abs() < 1e-9);
        assert_eq!(parse_percent("junk"), 0.0);
    }
}
