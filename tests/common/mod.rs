//! Common test utilities and assertion helpers.
//!
//! Helpers for running the analyzer over fixture packages or hand-built
//! container trees, and for looking up cells and diagnostics.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::sync::Arc;

use xlcanon::cell_ref::CellRef;
use xlcanon::source::{
    CellNode, InlineStyle, OpenXmlContainer, Palette, RawFont, RawValue, SheetNode, StyleRecord,
    StyleRef, StyleTable, WorkbookMeta, WorkbookNode,
};
use xlcanon::{AnalysisOptions, Cell, DiagnosticKind, Workbook, Worksheet};

// Re-export fixtures for convenience
pub use super::fixtures::*;

// ============================================================================
// Analysis Helpers
// ============================================================================

/// Analyze XLSX bytes with default options. Panics on fatal errors.
#[must_use]
pub fn analyze(data: &[u8]) -> Workbook {
    analyze_with(data, &AnalysisOptions::default())
}

#[must_use]
pub fn analyze_with(data: &[u8], options: &AnalysisOptions) -> Workbook {
    xlcanon::analyze_xlsx(data, options).expect("analysis failed")
}

/// Worksheet by position.
#[must_use]
pub fn sheet(workbook: &Workbook, index: usize) -> &Worksheet {
    workbook
        .worksheets
        .get(index)
        .unwrap_or_else(|| panic!("no worksheet at index {index}"))
}

/// Cell by A1 coordinate on the sheet at `index`.
#[must_use]
pub fn cell<'a>(workbook: &'a Workbook, index: usize, coordinate: &str) -> &'a Cell {
    sheet(workbook, index)
        .cell(coordinate)
        .unwrap_or_else(|| panic!("no cell {coordinate} on sheet {index}"))
}

/// Number of diagnostics of one kind across the workbook.
#[must_use]
pub fn count_diagnostics(workbook: &Workbook, kind: DiagnosticKind) -> usize {
    workbook
        .diagnostics
        .iter()
        .filter(|d| d.kind == kind)
        .count()
}

// ============================================================================
// Synthetic Trees
// ============================================================================

#[must_use]
pub fn coord(s: &str) -> CellRef {
    CellRef::parse(s).unwrap_or_else(|| panic!("bad coordinate {s}"))
}

#[must_use]
pub fn text_cell(coordinate: &str, text: &str) -> CellNode {
    CellNode::new(coord(coordinate), RawValue::Text(text.to_string()))
}

#[must_use]
pub fn number_cell(coordinate: &str, value: f64) -> CellNode {
    CellNode::new(coord(coordinate), RawValue::Number(value))
}

#[must_use]
pub fn styled(mut cell: CellNode, record: u32) -> CellNode {
    cell.style = Some(StyleRef::Index(record));
    cell
}

#[must_use]
pub fn inline_styled(mut cell: CellNode, font: RawFont) -> CellNode {
    cell.style = Some(StyleRef::Inline(Arc::new(InlineStyle {
        font: Some(font),
        ..InlineStyle::default()
    })));
    cell
}

/// Two records over the default font and a bold font: 0 is plain, 1 bold.
#[must_use]
pub fn basic_styles() -> StyleTable {
    StyleTable {
        records: vec![
            StyleRecord {
                font: Some(0),
                fill: Some(0),
                border: Some(0),
                num_fmt: Some(0),
                ..StyleRecord::default()
            },
            StyleRecord {
                parent: Some(0),
                font: Some(1),
                ..StyleRecord::default()
            },
        ],
        fonts: vec![
            RawFont {
                name: Some("Calibri".to_string()),
                size: Some(11.0),
                ..RawFont::default()
            },
            RawFont {
                name: Some("Calibri".to_string()),
                size: Some(11.0),
                bold: true,
                ..RawFont::default()
            },
        ],
        default_record: Some(0),
        ..StyleTable::default()
    }
}

/// A workbook tree with metadata, the basic styles and the given sheets.
#[must_use]
pub fn tree(sheets: Vec<SheetNode>) -> WorkbookNode {
    WorkbookNode {
        metadata: Some(WorkbookMeta::default()),
        styles: basic_styles(),
        palette: Palette::office(),
        sheets,
    }
}

#[must_use]
pub fn openxml(sheets: Vec<SheetNode>) -> OpenXmlContainer {
    OpenXmlContainer::new(tree(sheets))
}

/// `count` sheets with a block of numbers, a merge and a formula each.
#[must_use]
pub fn many_sheets(count: usize) -> Vec<SheetNode> {
    (0..count)
        .map(|i| {
            let mut node = SheetNode::new(format!("Sheet{}", i + 1));
            for row in 1..=20u32 {
                for col in ["A", "B", "C"] {
                    let value = f64::from(row) * (i as f64 + 1.0);
                    node.cells.push(number_cell(&format!("{col}{row}"), value));
                }
            }
            node.cells.push(styled(text_cell("D1", "Header"), 1));
            let mut total = number_cell("E1", 99.0);
            total.formula = Some("SUM(A1:C20)".to_string());
            node.cells.push(total);
            node.merges.push("F1:G2".to_string());
            node
        })
        .collect()
}
