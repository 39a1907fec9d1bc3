//! Sheet structure: merges, sizing, panes, filters, view and page settings.

use crate::cell_ref::{CellRange, CellRef};
use crate::color::normalize;
use crate::source::{PaneNode, PaneState, Palette, SheetNode};
use crate::types::{
    ColumnDimension, DiagnosticKind, Diagnostics, FreezePane, LineSpan, MergedRange,
    PageProperties, PageSetup, PrintTitles, RowDimension, SheetStructure, SheetView,
};

pub fn extract(sheet: &SheetNode, palette: &Palette, diags: &mut Diagnostics) -> SheetStructure {
    SheetStructure {
        merges: merges(&sheet.merges, diags),
        columns: sheet
            .columns
            .iter()
            .map(|c| ColumnDimension {
                min: c.min,
                max: c.max,
                width: c.width,
                hidden: c.hidden,
                outline_level: c.outline_level,
            })
            .collect(),
        rows: sheet
            .rows
            .iter()
            .map(|r| RowDimension {
                row: r.row,
                height: r.height,
                hidden: r.hidden,
                outline_level: r.outline_level,
            })
            .collect(),
        default_column_width: sheet.default_column_width,
        default_row_height: sheet.default_row_height,
        freeze_pane: sheet.pane.as_ref().and_then(freeze_pane),
        auto_filter: sheet
            .auto_filter
            .as_deref()
            .and_then(|text| parse_range(text, "autofilter", diags)),
        tab_color: sheet.tab_color.as_ref().map(|c| normalize(c, palette)),
        view: sheet
            .view
            .as_ref()
            .map(|v| SheetView {
                zoom: v.zoom,
                show_grid_lines: v.show_grid_lines,
                show_headers: v.show_headers,
                right_to_left: v.right_to_left,
                selected: v.selected,
            })
            .unwrap_or_default(),
        page: page(sheet, diags),
    }
}

/// Keep merges in source order, dropping any that overlap one already kept.
fn merges(texts: &[String], diags: &mut Diagnostics) -> Vec<MergedRange> {
    let mut kept: Vec<CellRange> = Vec::with_capacity(texts.len());

    for text in texts {
        let Some(range) = parse_range(text, "merge", diags) else {
            continue;
        };
        if let Some(first) = kept.iter().find(|k| k.intersects(&range)) {
            diags.warn(
                DiagnosticKind::OverlappingMergeRanges,
                Some(range.to_string()),
                format!("merge {range} overlaps {first} and was dropped"),
            );
            continue;
        }
        kept.push(range);
    }

    kept.into_iter().map(MergedRange::from).collect()
}

fn parse_range(text: &str, what: &str, diags: &mut Diagnostics) -> Option<CellRange> {
    let range = CellRange::parse(text);
    if range.is_none() {
        diags.warn(
            DiagnosticKind::InvalidRange,
            Some(text.to_string()),
            format!("unparseable {what} range"),
        );
    }
    range
}

/// Split panes are a view setting, not a freeze, and are ignored.
fn freeze_pane(pane: &PaneNode) -> Option<FreezePane> {
    if pane.state == PaneState::Split {
        return None;
    }
    let rows = split_count(pane.y_split);
    let cols = split_count(pane.x_split);
    if rows == 0 && cols == 0 {
        return None;
    }
    let top_left = pane
        .top_left_cell
        .as_deref()
        .and_then(CellRef::parse)
        .unwrap_or_else(|| CellRef::new(rows.saturating_add(1), cols.saturating_add(1)));
    Some(FreezePane {
        top_left,
        rows,
        cols,
    })
}

/// Frozen split counts are whole rows/columns stored as doubles.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn split_count(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.min(f64::from(u32::MAX)).round() as u32
    } else {
        0
    }
}

fn page(sheet: &SheetNode, diags: &mut Diagnostics) -> PageProperties {
    let print_area = sheet
        .print_area
        .as_deref()
        .map(|text| {
            split_outside_quotes(text)
                .into_iter()
                .map(without_sheet)
                .filter_map(|part| parse_range(part, "print area", diags))
                .collect()
        })
        .unwrap_or_default();
    let print_titles = sheet
        .print_titles
        .as_deref()
        .map(|text| print_titles(text, diags))
        .unwrap_or_default();

    PageProperties {
        setup: sheet.page_setup.as_ref().map(|s| PageSetup {
            orientation: s.orientation,
            paper_size: s.paper_size,
            scale: s.scale,
            fit_to_width: s.fit_to_width,
            fit_to_height: s.fit_to_height,
        }),
        margins: sheet.margins.clone(),
        header_footer: sheet.header_footer.clone().filter(|hf| !hf.is_empty()),
        print_area,
        print_titles,
        print_gridlines: sheet.print_gridlines,
        print_headings: sheet.print_headings,
    }
}

/// Split a defined-name value on the commas that separate its areas.
/// Commas inside a quoted sheet name do not split.
fn split_outside_quotes(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            ',' if !quoted => {
                parts.push(text.get(start..i).unwrap_or_default());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text.get(start..).unwrap_or_default());
    parts
}

/// `'My Sheet'!$A$1:$B$2` -> `$A$1:$B$2`
fn without_sheet(part: &str) -> &str {
    part.rsplit_once('!').map_or(part, |(_, area)| area).trim()
}

/// Whole-row (`$1:$2`) and whole-column (`$A:$B`) spans.
fn print_titles(text: &str, diags: &mut Diagnostics) -> PrintTitles {
    let mut titles = PrintTitles::default();
    for part in split_outside_quotes(text) {
        let area = without_sheet(part).replace('$', "");
        let span = area.split_once(':').and_then(|(first, last)| {
            let rows = row_number(first).zip(row_number(last));
            let cols = column_number(first).zip(column_number(last));
            match (rows, cols) {
                (Some((first, last)), None) => Some((true, first, last)),
                (None, Some((first, last))) => Some((false, first, last)),
                _ => None,
            }
        });
        match span {
            Some((true, first, last)) => titles.rows = Some(LineSpan { first, last }),
            Some((false, first, last)) => titles.cols = Some(LineSpan { first, last }),
            None => diags.warn(
                DiagnosticKind::InvalidRange,
                Some(part.trim().to_string()),
                "unparseable print titles range".to_string(),
            ),
        }
    }
    titles
}

fn row_number(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    CellRef::parse(&format!("A{text}")).map(|c| c.row)
}

fn column_number(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    CellRef::parse(&format!("{text}1")).map(|c| c.col)
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
    use crate::source::{ColumnNode, RawColor};
    use crate::types::{Color, HeaderFooter, Rgb};

    fn extract_sheet(sheet: &SheetNode) -> (SheetStructure, Vec<crate::types::Diagnostic>) {
        let mut diags = Diagnostics::for_sheet(&sheet.name);
        let structure = extract(sheet, &Palette::standard(), &mut diags);
        (structure, diags.into_vec())
    }

    #[test]
    fn test_overlapping_merge_keeps_first() {
        let mut sheet = SheetNode::new("S");
        sheet.merges = vec!["A1:B2".into(), "B2:C3".into(), "D1:D4".into()];

        let (structure, diags) = extract_sheet(&sheet);
        let kept: Vec<String> = structure.merges.iter().map(|m| m.range().to_string()).collect();
        assert_eq!(kept, vec!["A1:B2", "D1:D4"]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::OverlappingMergeRanges);
        assert_eq!(diags[0].location.as_deref(), Some("B2:C3"));
    }

    #[test]
    fn test_invalid_merge_text() {
        let mut sheet = SheetNode::new("S");
        sheet.merges = vec!["A0:B2".into(), "C1:D1".into()];

        let (structure, diags) = extract_sheet(&sheet);
        assert_eq!(structure.merges.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::InvalidRange);
    }

    #[test]
    fn test_frozen_pane() {
        let mut sheet = SheetNode::new("S");
        sheet.pane = Some(PaneNode {
            x_split: 1.0,
            y_split: 2.0,
            top_left_cell: None,
            state: PaneState::Frozen,
        });

        let (structure, _) = extract_sheet(&sheet);
        let pane = structure.freeze_pane.unwrap();
        assert_eq!(pane.rows, 2);
        assert_eq!(pane.cols, 1);
        assert_eq!(pane.top_left.to_string(), "B3");
    }

    #[test]
    fn test_split_pane_is_not_frozen() {
        let mut sheet = SheetNode::new("S");
        sheet.pane = Some(PaneNode {
            x_split: 2400.0,
            y_split: 0.0,
            top_left_cell: Some("D1".into()),
            state: PaneState::Split,
        });

        let (structure, _) = extract_sheet(&sheet);
        assert!(structure.freeze_pane.is_none());
    }

    #[test]
    fn test_sizing_tab_color_and_page() {
        let mut sheet = SheetNode::new("S");
        sheet.columns = vec![ColumnNode {
            min: 2,
            max: 3,
            width: Some(20.5),
            hidden: false,
            outline_level: None,
        }];
        sheet.auto_filter = Some("A1:C10".into());
        sheet.tab_color = Some(RawColor::Rgb("FF00B050".into()));
        sheet.print_area = Some("$A$1:$C$10,Sheet1!$E$1:$E$5".into());
        sheet.header_footer = Some(HeaderFooter::default());

        let (structure, diags) = extract_sheet(&sheet);
        assert!(diags.is_empty());
        assert_eq!(structure.columns[0].width, Some(20.5));
        assert_eq!(structure.auto_filter.unwrap().to_string(), "A1:C10");
        assert_eq!(
            structure.tab_color,
            Some(Color::rgb(Rgb::new(0x00, 0xB0, 0x50)))
        );
        assert_eq!(structure.page.print_area.len(), 2);
        assert_eq!(structure.page.print_area[1].to_string(), "E1:E5");
        assert!(structure.page.header_footer.is_none());
        assert!(structure.view.show_grid_lines);
    }

    #[test]
    fn test_print_area_with_comma_in_sheet_name() {
        let mut sheet = SheetNode::new("Q1, Q2");
        sheet.print_area = Some("'Q1, Q2'!$A$1:$B$2,'Q1, Q2'!$D$1:$D$3".into());

        let (structure, diags) = extract_sheet(&sheet);
        assert!(diags.is_empty());
        let areas: Vec<String> = structure
            .page
            .print_area
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(areas, vec!["A1:B2", "D1:D3"]);
    }

    #[test]
    fn test_print_titles_and_options() {
        let mut sheet = SheetNode::new("Data, Raw");
        sheet.print_titles = Some("'Data, Raw'!$1:$2,'Data, Raw'!$A:$B".into());
        sheet.print_gridlines = true;

        let (structure, diags) = extract_sheet(&sheet);
        assert!(diags.is_empty());
        let page = &structure.page;
        assert_eq!(page.print_titles.rows, Some(LineSpan { first: 1, last: 2 }));
        assert_eq!(page.print_titles.cols, Some(LineSpan { first: 1, last: 2 }));
        assert!(page.print_gridlines);
        assert!(!page.print_headings);
    }

    #[test]
    fn test_unreadable_print_titles() {
        let mut sheet = SheetNode::new("S");
        sheet.print_titles = Some("S!$A$1:$B$2,S!$3:$3".into());

        let (structure, diags) = extract_sheet(&sheet);
        assert_eq!(structure.page.print_titles.rows, Some(LineSpan { first: 3, last: 3 }));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::InvalidRange);
        assert_eq!(diags[0].location.as_deref(), Some("S!$A$1:$B$2"));
    }
}
