//! Excel-style cell coordinates and ranges.
//!
//! Coordinates are 1-based on both axes and order row-major, so a
//! `BTreeMap<CellRef, _>` iterates in reading order.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::XlcanonError;

/// Largest column addressable in either container format (XFD).
pub const MAX_COL: u32 = 16_384;
/// Largest row addressable in either container format.
pub const MAX_ROW: u32 = 1_048_576;

/// A single cell coordinate such as `B7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse a reference like `"A1"` or `"$B$12"`.
    ///
    /// Returns `None` for anything that is not letters followed by digits,
    /// or that falls outside the addressable grid.
    pub fn parse(s: &str) -> Option<Self> {
        parse_ref_bytes(s.trim().as_bytes())
    }

    /// Build a coordinate from 0-based (col, row) indices as stored in drawing markers.
    pub fn from_zero_based(col: u32, row: u32) -> Self {
        Self::new(row.saturating_add(1), col.saturating_add(1))
    }

    /// Column letters for this coordinate, e.g. `"AB"`.
    pub fn column_letters(&self) -> String {
        column_letters(self.col)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

impl FromStr for CellRef {
    type Err = XlcanonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| XlcanonError::CellRef(s.to_string()))
    }
}

impl Serialize for CellRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Convert a 1-based column number to letters (1 -> "A", 28 -> "AB").
pub fn column_letters(col: u32) -> String {
    let mut n = col;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        // rem < 26, so this always fits in a byte.
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Parse a reference from raw ASCII bytes (quick-xml attribute values).
pub fn parse_ref_bytes(bytes: &[u8]) -> Option<CellRef> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for &b in bytes {
        match b {
            b'$' => {}
            b'A'..=b'Z' | b'a'..=b'z' if !saw_row => {
                let upper = b.to_ascii_uppercase();
                col = col
                    .checked_mul(26)?
                    .checked_add(u32::from(upper - b'A') + 1)?;
                saw_col = true;
            }
            b'0'..=b'9' if saw_col => {
                row = row.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
                saw_row = true;
            }
            _ => return None,
        }
    }

    if !saw_col || !saw_row || row == 0 || row > MAX_ROW || col > MAX_COL {
        return None;
    }
    Some(CellRef::new(row, col))
}

/// An inclusive rectangular range of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Create a range, normalizing the corners so `start` is top-left.
    pub fn new(a: CellRef, b: CellRef) -> Self {
        Self {
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn single(cell: CellRef) -> Self {
        Self {
            start: cell,
            end: cell,
        }
    }

    /// Parse `"A1:B10"` or a single `"A1"`. Sheet prefixes are not accepted.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((a, b)) => Some(Self::new(CellRef::parse(a)?, CellRef::parse(b)?)),
            None => CellRef::parse(s).map(Self::single),
        }
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    /// True if the two ranges share at least one cell.
    pub fn intersects(&self, other: &Self) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    pub fn rows(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn cols(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = XlcanonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| XlcanonError::CellRef(s.to_string()))
    }
}

impl Serialize for CellRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a space-separated sqref list.
///
/// Returns the parsed ranges and the parts that failed to parse.
pub fn parse_sqref(sqref: &str) -> (Vec<CellRange>, Vec<String>) {
    let mut ranges = Vec::new();
    let mut invalid = Vec::new();

    for part in sqref.split_whitespace() {
        match CellRange::parse(part) {
            Some(range) => ranges.push(range),
            None => invalid.push(part.to_string()),
        }
    }

    (ranges, invalid)
}
