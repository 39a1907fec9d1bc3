//! Shared formula expansion.
//!
//! A shared formula is stored once on its anchor cell; the other cells of
//! the group carry only the group index. Each dependent cell gets the anchor
//! text with relative references moved by the cell's offset from the anchor.

use std::collections::HashMap;

use crate::cell_ref::{column_letters, CellRef, MAX_COL, MAX_ROW};

/// Anchor formulas of the shared groups seen so far in a sheet.
#[derive(Debug, Default)]
pub(super) struct SharedFormulas {
    groups: HashMap<u32, (CellRef, String)>,
}

impl SharedFormulas {
    pub fn insert(&mut self, index: u32, anchor: CellRef, formula: String) {
        self.groups.insert(index, (anchor, formula));
    }

    /// Formula text for `cell` as a member of group `index`.
    pub fn expand(&self, index: u32, cell: CellRef) -> Option<String> {
        let (anchor, formula) = self.groups.get(&index)?;
        let d_row = i64::from(cell.row) - i64::from(anchor.row);
        let d_col = i64::from(cell.col) - i64::from(anchor.col);
        Some(shift_formula(formula, d_row, d_col))
    }
}

/// Move the relative cell references in `formula` by the given offsets.
///
/// String literals, quoted sheet names, function names and sheet prefixes
/// are copied unchanged. References pushed off the grid become `#REF!`.
pub(super) fn shift_formula(formula: &str, d_row: i64, d_col: i64) -> String {
    if d_row == 0 && d_col == 0 {
        return formula.to_string();
    }

    let mut out = String::with_capacity(formula.len());
    let mut chars = formula.char_indices().peekable();
    let mut prev: Option<char> = None;

    while let Some((start, c)) = chars.next() {
        if c == '"' || c == '\'' {
            // Quoted run; a doubled quote is an escaped quote
            out.push(c);
            while let Some((_, q)) = chars.next() {
                out.push(q);
                if q == c {
                    if chars.peek().map(|&(_, n)| n) == Some(c) {
                        if let Some((_, n)) = chars.next() {
                            out.push(n);
                        }
                    } else {
                        break;
                    }
                }
            }
            prev = Some(c);
        } else if is_token_char(c) {
            let mut end = start + c.len_utf8();
            while let Some(&(i, n)) = chars.peek() {
                if !is_token_char(n) {
                    break;
                }
                end = i + n.len_utf8();
                chars.next();
            }
            let token = formula.get(start..end).unwrap_or_default();
            let next = chars.peek().map(|&(_, n)| n);
            let standalone = !prev.is_some_and(char::is_alphanumeric)
                && !matches!(next, Some('(' | '!'));

            match standalone.then(|| shift_ref(token, d_row, d_col)).flatten() {
                Some(shifted) => out.push_str(&shifted),
                None => out.push_str(token),
            }
            prev = token.chars().last();
        } else {
            out.push(c);
            prev = Some(c);
        }
    }

    out
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '$' | '_' | '.')
}

/// Shift an `A1`-style token, honoring `$` markers. `None` when the token
/// is not a cell reference.
fn shift_ref(token: &str, d_row: i64, d_col: i64) -> Option<String> {
    let col_abs = token.starts_with('$');
    let rest = token.strip_prefix('$').unwrap_or(token);
    let split = rest.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, rest) = rest.split_at(split);
    let row_abs = rest.starts_with('$');
    let digits = rest.strip_prefix('$').unwrap_or(rest);

    if letters.is_empty()
        || letters.len() > 3
        || digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let cell = CellRef::parse(&format!("{letters}{digits}"))?;

    let col = if col_abs {
        i64::from(cell.col)
    } else {
        i64::from(cell.col) + d_col
    };
    let row = if row_abs {
        i64::from(cell.row)
    } else {
        i64::from(cell.row) + d_row
    };

    let (Some(col), Some(row)) = (
        u32::try_from(col).ok().filter(|c| (1..=MAX_COL).contains(c)),
        u32::try_from(row).ok().filter(|r| (1..=MAX_ROW).contains(r)),
    ) else {
        return Some("#REF!".to_string());
    };

    Some(format!(
        "{}{}{}{row}",
        if col_abs { "$" } else { "" },
        column_letters(col),
        if row_abs { "$" } else { "" },
    ))
}
