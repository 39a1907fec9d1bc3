//! Cell extraction: the sparse coordinate to cell mapping.

use std::collections::BTreeMap;

use crate::cell_ref::{CellRange, CellRef};
use crate::error::Result;
use crate::numfmt::serial_to_datetime;
use crate::source::{CellNode, RawValue, SheetNode};
use crate::styles::StyleResolver;
use crate::types::{
    Cell, CellValue, Comment, DiagnosticKind, Diagnostics, FormattingRef, Hyperlink,
};

/// Build the populated cells of a sheet.
///
/// A cell is kept when it has a value, a formula, or formatting that differs
/// from the workbook default. Hyperlinks and comments create the cell they
/// point at when it is otherwise absent. Later duplicates of a coordinate
/// replace earlier ones. Notes the reader left on the sheet become warnings.
pub fn extract(
    sheet: &SheetNode,
    resolver: &mut StyleResolver<'_>,
    date_1904: bool,
    diags: &mut Diagnostics,
) -> Result<BTreeMap<CellRef, Cell>> {
    let default = resolver.default_formatting()?;
    let mut cells = BTreeMap::new();

    for note in &sheet.notes {
        diags.warn(note.kind, note.location.clone(), note.message.clone());
    }

    for node in &sheet.cells {
        let formatting = match &node.style {
            Some(style) => resolver.resolve(style)?,
            None => default.clone(),
        };
        if let Some(cell) = build_cell(node, formatting, &default, date_1904, diags) {
            cells.insert(cell.coordinate, cell);
        }
    }

    for link in &sheet.hyperlinks {
        let Some(range) = CellRange::parse(&link.reference) else {
            diags.warn(
                DiagnosticKind::InvalidRange,
                Some(link.reference.clone()),
                "hyperlink reference is not a cell range",
            );
            continue;
        };
        let cell = cells
            .entry(range.start)
            .or_insert_with(|| Cell::empty(range.start, default.clone()));
        cell.hyperlink = Some(Hyperlink {
            target: link.target.clone(),
            location: link.location.clone(),
            display: link.display.clone(),
            tooltip: link.tooltip.clone(),
        });
    }

    for note in &sheet.comments {
        let Some(coord) = CellRef::parse(&note.reference) else {
            diags.warn(
                DiagnosticKind::InvalidRange,
                Some(note.reference.clone()),
                "comment reference is not a cell",
            );
            continue;
        };
        let cell = cells
            .entry(coord)
            .or_insert_with(|| Cell::empty(coord, default.clone()));
        cell.comment = Some(Comment {
            author: note.author.clone(),
            text: note.text.clone(),
        });
    }

    Ok(cells)
}

fn build_cell(
    node: &CellNode,
    formatting: FormattingRef,
    default: &FormattingRef,
    date_1904: bool,
    diags: &mut Diagnostics,
) -> Option<Cell> {
    let formula = node.formula.as_deref().and_then(normalize_formula);

    let value = match &node.value {
        RawValue::Empty => CellValue::Empty,
        RawValue::Text(s) => CellValue::String(s.clone()),
        RawValue::Number(n) if formatting.number_format.is_date => serial_to_datetime(*n, date_1904)
            .map_or(CellValue::Number(*n), CellValue::Date),
        RawValue::Number(n) => CellValue::Number(*n),
        RawValue::Date(d) => CellValue::Date(*d),
        RawValue::Bool(b) => CellValue::Boolean(*b),
        RawValue::Error(e) => CellValue::Error(e.clone()),
    };

    let formula_only = formula.is_some() && value.is_empty();
    if formula_only {
        diags.warn(
            DiagnosticKind::FormulaWithoutCachedValue,
            Some(node.coord.to_string()),
            "formula has no cached result",
        );
    }

    if value.is_empty() && formula.is_none() && formatting == *default {
        return None;
    }

    Some(Cell {
        coordinate: node.coord,
        data_type: value.data_type(),
        value,
        formula,
        formula_only,
        formatting,
        hyperlink: None,
        comment: None,
    })
}

fn normalize_formula(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else if text.starts_with('=') {
        Some(text.to_string())
    } else {
        Some(format!("={text}"))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::source::{
        CommentNode, HyperlinkNode, Palette, RawFont, SourceNote, StyleRecord, StyleRef,
        StyleTable,
    };
    use crate::styles::DEFAULT_MAX_HOPS;
    use crate::types::DataType;
    use chrono::NaiveDate;

    fn table() -> StyleTable {
        let mut table = StyleTable {
            fonts: vec![
                RawFont::default(),
                RawFont {
                    bold: true,
                    ..RawFont::default()
                },
            ],
            records: vec![
                StyleRecord {
                    font: Some(0),
                    ..StyleRecord::default()
                },
                StyleRecord {
                    font: Some(1),
                    ..StyleRecord::default()
                },
                StyleRecord {
                    font: Some(0),
                    num_fmt: Some(14),
                    ..StyleRecord::default()
                },
                // Same as the default, through a different record
                StyleRecord {
                    font: Some(0),
                    ..StyleRecord::default()
                },
            ],
            ..StyleTable::default()
        };
        table.default_record = Some(0);
        table
    }

    fn node(coord: &str, value: RawValue, style: Option<u32>) -> CellNode {
        CellNode {
            coord: CellRef::parse(coord).unwrap(),
            value,
            formula: None,
            style: style.map(StyleRef::Index),
        }
    }

    fn run(sheet: &SheetNode) -> (BTreeMap<CellRef, Cell>, Vec<crate::types::Diagnostic>) {
        let table = table();
        let palette = Palette::standard();
        let mut resolver = StyleResolver::new(&table, &palette, DEFAULT_MAX_HOPS);
        let mut diags = Diagnostics::for_sheet(&sheet.name);
        let cells = extract(sheet, &mut resolver, false, &mut diags).unwrap();
        (cells, diags.into_vec())
    }

    #[test]
    fn test_sparsity() {
        let mut sheet = SheetNode::new("S");
        sheet.cells = vec![
            node("A1", RawValue::Empty, None),
            node("A2", RawValue::Empty, Some(0)),
            node("A3", RawValue::Empty, Some(3)),
            node("A4", RawValue::Empty, Some(1)),
            node("A5", RawValue::Number(1.0), None),
        ];

        let (cells, _) = run(&sheet);
        let coords: Vec<String> = cells.keys().map(ToString::to_string).collect();
        assert_eq!(coords, vec!["A4", "A5"]);
        assert!(cells.values().all(|c| !c.formula_only));
    }

    #[test]
    fn test_formula_with_cached_value() {
        let mut sheet = SheetNode::new("S");
        let mut cell = node("B1", RawValue::Number(42.0), None);
        cell.formula = Some("SUM(B2:B3)".into());
        sheet.cells = vec![cell];

        let (cells, diags) = run(&sheet);
        let b1 = &cells[&CellRef::new(1, 2)];
        assert_eq!(b1.formula.as_deref(), Some("=SUM(B2:B3)"));
        assert_eq!(b1.value, CellValue::Number(42.0));
        assert_eq!(b1.data_type, DataType::Number);
        assert!(!b1.formula_only);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_formula_without_cached_value() {
        let mut sheet = SheetNode::new("S");
        let mut cell = node("C3", RawValue::Empty, None);
        cell.formula = Some("=NOW()".into());
        sheet.cells = vec![cell];

        let (cells, diags) = run(&sheet);
        let c3 = &cells[&CellRef::new(3, 3)];
        assert!(c3.formula_only);
        assert_eq!(c3.data_type, DataType::Empty);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::FormulaWithoutCachedValue);
        assert_eq!(diags[0].location.as_deref(), Some("C3"));
    }

    #[test]
    fn test_date_formatted_number() {
        let mut sheet = SheetNode::new("S");
        sheet.cells = vec![
            node("A1", RawValue::Number(45_000.0), Some(2)),
            node("A2", RawValue::Number(-5.0), Some(2)),
        ];

        let (cells, _) = run(&sheet);
        assert_eq!(
            cells[&CellRef::new(1, 1)].value,
            CellValue::Date(
                NaiveDate::from_ymd_opt(2023, 3, 15)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            )
        );
        assert_eq!(cells[&CellRef::new(2, 1)].value, CellValue::Number(-5.0));
    }

    #[test]
    fn test_duplicate_coordinate_last_wins() {
        let mut sheet = SheetNode::new("S");
        sheet.cells = vec![
            node("A1", RawValue::Text("first".into()), None),
            node("A1", RawValue::Text("second".into()), None),
        ];

        let (cells, _) = run(&sheet);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[&CellRef::new(1, 1)].value.as_str(), Some("second"));
    }

    #[test]
    fn test_hyperlinks_and_comments_attach() {
        let mut sheet = SheetNode::new("S");
        sheet.cells = vec![node("A1", RawValue::Text("Docs".into()), None)];
        sheet.hyperlinks = vec![
            HyperlinkNode {
                reference: "A1:B2".into(),
                target: Some("https://example.com".into()),
                ..HyperlinkNode::default()
            },
            HyperlinkNode {
                reference: "not a ref".into(),
                ..HyperlinkNode::default()
            },
        ];
        sheet.comments = vec![CommentNode {
            reference: "D4".into(),
            author: Some("Ann".into()),
            text: "check this".into(),
        }];

        let (cells, diags) = run(&sheet);
        let a1 = &cells[&CellRef::new(1, 1)];
        assert_eq!(
            a1.hyperlink.as_ref().unwrap().target.as_deref(),
            Some("https://example.com")
        );
        let d4 = &cells[&CellRef::new(4, 4)];
        assert!(d4.value.is_empty());
        assert_eq!(d4.comment.as_ref().unwrap().text, "check this");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::InvalidRange);
    }

    #[test]
    fn test_iso_dates_and_reader_notes() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let mut sheet = SheetNode::new("S");
        sheet.cells = vec![
            node("A1", RawValue::Date(date), None),
            node("A2", RawValue::Text("7".into()), None),
        ];
        sheet.notes = vec![SourceNote {
            kind: DiagnosticKind::InvalidCellValue,
            location: Some("A2".into()),
            message: "shared string index out of range".into(),
        }];

        let (cells, diags) = run(&sheet);
        assert_eq!(cells[&CellRef::new(1, 1)].value, CellValue::Date(date));
        assert_eq!(cells[&CellRef::new(1, 1)].data_type, DataType::Date);
        assert_eq!(cells[&CellRef::new(2, 1)].value.as_str(), Some("7"));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::InvalidCellValue);
        assert_eq!(diags[0].location.as_deref(), Some("A2"));
    }
}
