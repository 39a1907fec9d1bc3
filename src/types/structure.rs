use serde::Serialize;

use super::Color;
use crate::cell_ref::{CellRange, CellRef};

/// A merged block of cells. Ranges within one worksheet never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRange {
    pub top_left: CellRef,
    pub bottom_right: CellRef,
}

impl MergedRange {
    pub fn range(&self) -> CellRange {
        CellRange::new(self.top_left, self.bottom_right)
    }
}

impl From<CellRange> for MergedRange {
    fn from(range: CellRange) -> Self {
        Self {
            top_left: range.start,
            bottom_right: range.end,
        }
    }
}

/// Width override for an inclusive span of columns (1-based).
///
/// Widths are in character units as both container formats store them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDimension {
    pub min: u32,
    pub max: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline_level: Option<u8>,
}

/// Height override for a single row (1-based), in points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowDimension {
    pub row: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline_level: Option<u8>,
}

/// Frozen pane position: rows above and columns left of `top_left` stay fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezePane {
    pub top_left: CellRef,
    pub rows: u32,
    pub cols: u32,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<u32>,
    pub show_grid_lines: bool,
    pub show_headers: bool,
    pub right_to_left: bool,
    pub selected: bool,
}

impl Default for SheetView {
    fn default() -> Self {
        Self {
            zoom: None,
            show_grid_lines: true,
            show_headers: true,
            right_to_left: false,
            selected: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSetup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_to_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit_to_height: Option<u32>,
}

/// Page margins in inches.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub header: f64,
    pub footer: f64,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self {
            left: 0.7,
            right: 0.7,
            top: 0.75,
            bottom: 0.75,
            header: 0.3,
            footer: 0.3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderFooter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odd_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odd_footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub even_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub even_footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_footer: Option<String>,
    pub different_odd_even: bool,
    pub different_first: bool,
}

impl HeaderFooter {
    pub fn is_empty(&self) -> bool {
        self.odd_header.is_none()
            && self.odd_footer.is_none()
            && self.even_header.is_none()
            && self.even_footer.is_none()
            && self.first_header.is_none()
            && self.first_footer.is_none()
    }
}

/// Page-level properties gathered by the structure extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup: Option<PageSetup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margins: Option<PageMargins>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_footer: Option<HeaderFooter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub print_area: Vec<CellRange>,
    /// Rows and columns repeated on every printed page.
    #[serde(skip_serializing_if = "PrintTitles::is_empty")]
    pub print_titles: PrintTitles,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub print_gridlines: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub print_headings: bool,
}

impl PageProperties {
    pub fn is_empty(&self) -> bool {
        self.setup.is_none()
            && self.margins.is_none()
            && self.header_footer.is_none()
            && self.print_area.is_empty()
            && self.print_titles.is_empty()
            && !self.print_gridlines
            && !self.print_headings
    }
}

/// An inclusive run of whole rows or columns, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineSpan {
    pub first: u32,
    pub last: u32,
}

/// Print titles from the sheet's `_xlnm.Print_Titles` name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrintTitles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<LineSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<LineSpan>,
}

impl PrintTitles {
    pub fn is_empty(&self) -> bool {
        self.rows.is_none() && self.cols.is_none()
    }
}

/// Everything the structure extractor produces for one sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetStructure {
    pub merges: Vec<MergedRange>,
    pub columns: Vec<ColumnDimension>,
    pub rows: Vec<RowDimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_column_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_row_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeze_pane: Option<FreezePane>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_filter: Option<CellRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_color: Option<Color>,
    pub view: SheetView,
    #[serde(skip_serializing_if = "PageProperties::is_empty")]
    pub page: PageProperties,
}
