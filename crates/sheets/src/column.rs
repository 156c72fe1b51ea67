//! A1 column arithmetic.
//!
//! A column identifier is a sequence of uppercase letters read as base-26
//! with `A = 1`: `A..Z, AA, AB, .. AZ, BA, ..`. The cursor walks forward
//! and backward one column at a time, wrapping into an extra letter exactly
//! as the sheet UI does.

use rampart_core::{Error, Result};
use std::fmt;

/// Convert a column identifier to its 1-based index: `A = 1, Z = 26, AA = 27`.
pub fn column_to_index(ident: &str) -> Result<usize> {
    if ident.is_empty() || !ident.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(Error::SheetParsing(format!("bad column identifier {ident:?}")));
    }
    let mut index = 0usize;
    for byte in ident.bytes() {
        index = index * 26 + (byte - b'A' + 1) as usize;
    }
    Ok(index)
}

/// Convert a 1-based index back to a column identifier.
pub fn index_to_column(mut index: usize) -> Result<String> {
    if index == 0 {
        return Err(Error::SheetParsing("column index starts at 1".into()));
    }
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    Ok(String::from_utf8(letters).expect("letters are ASCII"))
}

/// A mutable column cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// 1-based column index; the identifier is derived on demand.
    index: usize,
}

impl Column {
    /// Start at column `A`.
    pub fn new() -> Self {
        Self { index: 1 }
    }

    /// Parse an identifier like `"AG"`. Only uppercase A-Z are valid.
    pub fn parse(ident: &str) -> Result<Self> {
        Ok(Self { index: column_to_index(ident)? })
    }

    /// The 1-based index of the current column.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Advance one column. Returns the new identifier.
    pub fn fwd(&mut self) -> String {
        self.index += 1;
        self.to_string()
    }

    /// Step back one column. Returns the new identifier.
    ///
    /// Stepping back from `A` is a parsing-level fault: the caller walked
    /// off the sheet.
    pub fn back(&mut self) -> Result<String> {
        if self.index == 1 {
            return Err(Error::SheetParsing("column underflow before A".into()));
        }
        self.index -= 1;
        Ok(self.to_string())
    }

    /// Move by `offset` columns, negative moving left.
    pub fn offset(&mut self, offset: i64) -> Result<String> {
        if offset >= 0 {
            self.index += offset as usize;
        } else {
            let back = (-offset) as usize;
            if back >= self.index {
                return Err(Error::SheetParsing("column underflow before A".into()));
            }
            self.index -= back;
        }
        Ok(self.to_string())
    }
}

impl Default for Column {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&index_to_column(self.index).expect("index is >= 1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fwd_carries_into_extra_letter() {
        let mut col = Column::parse("Z").unwrap();
        assert_eq!(col.fwd(), "AA");
        assert_eq!(col.fwd(), "AB");

        let mut col = Column::parse("AZ").unwrap();
        assert_eq!(col.fwd(), "BA");

        let mut col = Column::parse("ZZ").unwrap();
        assert_eq!(col.fwd(), "AAA");
    }

    #[test]
    fn back_borrows_and_shrinks() {
        let mut col = Column::parse("AA").unwrap();
        assert_eq!(col.back().unwrap(), "Z");

        let mut col = Column::parse("BA").unwrap();
        assert_eq!(col.back().unwrap(), "AZ");
    }

    #[test]
    fn back_underflows_at_a() {
        let mut col = Column::new();
        assert!(col.back().is_err());
    }

    #[test]
    fn offset_both_directions() {
        let mut col = Column::parse("D").unwrap();
        assert_eq!(col.offset(2).unwrap(), "F");
        assert_eq!(col.offset(-5).unwrap(), "A");
        assert!(col.offset(-1).is_err());
    }

    #[test]
    fn index_conversions() {
        assert_eq!(column_to_index("A").unwrap(), 1);
        assert_eq!(column_to_index("Z").unwrap(), 26);
        assert_eq!(column_to_index("AA").unwrap(), 27);
        assert_eq!(column_to_index("AG").unwrap(), 33);

        assert_eq!(index_to_column(1).unwrap(), "A");
        assert_eq!(index_to_column(26).unwrap(), "Z");
        assert_eq!(index_to_column(27).unwrap(), "AA");
        assert_eq!(index_to_column(702).unwrap(), "ZZ");
        assert_eq!(index_to_column(703).unwrap(), "AAA");
    }

    #[test]
    fn rejects_bad_identifiers() {
        assert!(Column::parse("").is_err());
        assert!(Column::parse("a1").is_err());
        assert!(column_to_index("4").is_err());
        assert!(index_to_column(0).is_err());
    }

    proptest! {
        #[test]
        fn index_round_trip(n in 1usize..20_000) {
            let ident = index_to_column(n).unwrap();
            prop_assert_eq!(column_to_index(&ident).unwrap(), n);
        }

        #[test]
        fn fwd_then_back_is_identity(n in 1usize..20_000) {
            let ident = index_to_column(n).unwrap();
            let mut col = Column::parse(&ident).unwrap();
            col.fwd();
            col.back().unwrap();
            prop_assert_eq!(col.to_string(), ident);
        }

        #[test]
        fn fwd_matches_index_increment(n in 1usize..20_000) {
            let mut col = Column::parse(&index_to_column(n).unwrap()).unwrap();
            let next = col.fwd();
            prop_assert_eq!(column_to_index(&next).unwrap(), n + 1);
        }
    }
}
