//! Offsetting A1 column references inside formula strings.
//!
//! Inserting or removing a system column shifts every column to its right,
//! so the formulas that moved must have their cell references rewritten by
//! the same offset. This is the one string-to-string transformation that
//! carries semantics, so it is a real tokenizing pass: quoted string
//! literals, function names and sheet-qualified references (`Import!$A$2`)
//! pass through untouched, and only genuine column references move.

use rampart_core::{Error, Result};

use crate::column::{column_to_index, index_to_column};

/// Rewrite one cell. Non-formula cells (no leading `=`) pass through.
pub fn offset_cell(cell: &str, offset: i64) -> Result<String> {
    if !cell.starts_with('=') {
        return Ok(cell.to_string());
    }
    offset_a1_refs(cell, offset)
}

/// Rewrite a whole column of cells by the same offset.
pub fn slide_formula_by_offset(cells: &[String], offset: i64) -> Result<Vec<String>> {
    cells.iter().map(|cell| offset_cell(cell, offset)).collect()
}

fn shift_column(ident: &str, offset: i64) -> Result<String> {
    let index = column_to_index(ident)? as i64 + offset;
    if index < 1 {
        return Err(Error::SheetParsing(format!(
            "offset {offset} pushes column {ident} before A"
        )));
    }
    index_to_column(index as usize)
}

/// Rewrite every unqualified A1 column reference in `formula` by `offset`.
///
/// A run of uppercase letters is a column reference when it is followed by
/// an optional `$` and row digits (`D$10`, `N4`), or when it closes a range
/// (`:D`, `:$C`). A run followed by `!` is a sheet name; references behind
/// a `!` belong to another sheet and are left alone, including the closing
/// half of their ranges.
pub fn offset_a1_refs(formula: &str, offset: i64) -> Result<String> {
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len() + 4);
    let mut i = 0;
    let mut in_quotes = false;
    // Whether the reference that ended just before a ':' was sheet-qualified;
    // the closing half of a range inherits it.
    let mut colon_inherits = false;

    while i < chars.len() {
        let ch = chars[i];

        if ch == '"' {
            in_quotes = !in_quotes;
            out.push(ch);
            i += 1;
            continue;
        }
        if in_quotes || !ch.is_ascii_uppercase() {
            // ':' and the '$' of an absolute closer carry qualification over
            // to the closing half of a range; anything else drops it.
            if ch != ':' && ch != '$' {
                colon_inherits = false;
            }
            out.push(ch);
            i += 1;
            continue;
        }

        // Collect the uppercase run.
        let start = i;
        while i < chars.len() && chars[i].is_ascii_uppercase() {
            i += 1;
        }
        let run: String = chars[start..i].iter().collect();

        // A sheet name: leave it, the `!` marks what follows as qualified.
        if chars.get(i) == Some(&'!') {
            out.push_str(&run);
            continue;
        }

        // What sits before the run, skipping one absolute marker.
        let mut before = start;
        if before > 0 && chars[before - 1] == '$' {
            before -= 1;
        }
        let prev = if before > 0 { Some(chars[before - 1]) } else { None };
        let qualified = prev == Some('!') || (prev == Some(':') && colon_inherits);

        // What sits after: optional `$` then row digits.
        let mut j = i;
        if chars.get(j) == Some(&'$') {
            j += 1;
        }
        let digit_start = j;
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
        }
        let has_digits = j > digit_start;
        let closes_range = prev == Some(':');

        let is_ref = has_digits || closes_range;
        if is_ref && !qualified {
            out.push_str(&shift_column(&run, offset)?);
        } else {
            out.push_str(&run);
        }
        // Copy the `$` and digits through untouched.
        for &c in &chars[i..j] {
            out.push(c);
        }
        i = j;

        // A ':' right after a qualified reference hands the qualification
        // on to the closing half of the range.
        colon_inherits = qualified && chars.get(i) == Some(&':');
    }

    Ok(out)
}
