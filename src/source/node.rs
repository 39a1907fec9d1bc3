//! The in-memory tree a container reader produces.
//!
//! Nodes keep values as close to the source as possible (range text is left
//! unparsed, colors are raw) so the extractors own validation and reporting.
//! Unit conversions that depend on the container (twips, 1/256 character
//! widths) are done by the reader before a node is built.

use chrono::NaiveDateTime;

use super::style_table::{RawColor, StyleRef};
use crate::cell_ref::CellRef;
use crate::types::{
    Anchor, DiagnosticKind, HeaderFooter, Orientation, PageMargins, SheetState,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookMeta {
    pub properties: RawProperties,
    pub date_1904: bool,
    pub defined_names: Vec<DefinedNameNode>,
    /// 0-based active tab.
    pub active_sheet: Option<u32>,
    /// `calcMode` text, e.g. `manual`.
    pub calculation_mode: Option<String>,
}

/// Document properties as text. Timestamps are W3CDTF / RFC 3339 strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub last_modified_by: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub category: Option<String>,
    pub content_status: Option<String>,
    pub application: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedNameNode {
    pub name: String,
    pub value: String,
    pub local_sheet: Option<u32>,
    pub hidden: bool,
}

/// A cached cell value. `Empty` on a formula cell means no cached result.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
    /// A value stored as a calendar date rather than a serial number.
    Date(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellNode {
    pub coord: CellRef,
    pub value: RawValue,
    /// Formula text with or without the leading `=`.
    pub formula: Option<String>,
    pub style: Option<StyleRef>,
}

impl CellNode {
    pub fn new(coord: CellRef, value: RawValue) -> Self {
        Self {
            coord,
            value,
            formula: None,
            style: None,
        }
    }
}

/// Column span override. Width in character units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnNode {
    pub min: u32,
    pub max: u32,
    pub width: Option<f64>,
    pub hidden: bool,
    pub outline_level: Option<u8>,
}

/// Row override. Height in points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowNode {
    pub row: u32,
    pub height: Option<f64>,
    pub hidden: bool,
    pub outline_level: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneState {
    Frozen,
    FrozenSplit,
    Split,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaneNode {
    /// Frozen column count (or split position for split panes).
    pub x_split: f64,
    /// Frozen row count (or split position for split panes).
    pub y_split: f64,
    pub top_left_cell: Option<String>,
    pub state: PaneState,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq)]
pub struct SheetViewNode {
    pub zoom: Option<u32>,
    pub show_grid_lines: bool,
    pub show_headers: bool,
    pub right_to_left: bool,
    pub selected: bool,
}

impl Default for SheetViewNode {
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

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSetupNode {
    pub orientation: Option<Orientation>,
    pub paper_size: Option<u32>,
    pub scale: Option<u32>,
    pub fit_to_width: Option<u32>,
    pub fit_to_height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataValidationNode {
    pub sqref: String,
    pub kind: Option<String>,
    pub operator: Option<String>,
    pub formula1: Option<String>,
    pub formula2: Option<String>,
    pub allow_blank: bool,
    /// OpenXML semantics: `true` hides the in-cell dropdown.
    pub hide_dropdown: bool,
    pub show_input_message: bool,
    pub show_error_message: bool,
    pub prompt_title: Option<String>,
    pub prompt: Option<String>,
    pub error_title: Option<String>,
    pub error: Option<String>,
    pub error_style: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionalFormatNode {
    pub sqref: String,
    pub rules: Vec<CfRuleNode>,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CfRuleNode {
    pub rule_type: String,
    pub priority: Option<i32>,
    pub operator: Option<String>,
    pub formulas: Vec<String>,
    pub stop_if_true: bool,
    pub text: Option<String>,
    pub time_period: Option<String>,
    pub rank: Option<u32>,
    pub percent: bool,
    pub bottom: bool,
    pub above_average: Option<bool>,
    /// Index into [`super::StyleTable::dxfs`].
    pub dxf: Option<u32>,
    pub color_scale: Vec<RawColor>,
    pub data_bar_color: Option<RawColor>,
    pub icon_set: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HyperlinkNode {
    /// Cell or range text the link is attached to.
    pub reference: String,
    pub target: Option<String>,
    pub location: Option<String>,
    pub display: Option<String>,
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentNode {
    pub reference: String,
    pub author: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PictureNode {
    pub anchor: Anchor,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Part name or file name the bytes came from, used for format sniffing.
    pub source_name: Option<String>,
    /// Content type declared by the container, if any.
    pub content_type: Option<String>,
    /// `None` when the picture's target could not be found, or was too
    /// large to load.
    pub data: Option<Vec<u8>>,
    /// Size of a payload the reader left unloaded for exceeding the image
    /// limit.
    pub declared_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataRefNode {
    pub formula: Option<String>,
    pub num_cache: Vec<Option<f64>>,
    pub str_cache: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesNode {
    pub index: u32,
    pub name: Option<String>,
    pub name_ref: Option<String>,
    pub categories: Option<DataRefNode>,
    pub values: Option<DataRefNode>,
    pub color: Option<RawColor>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisNode {
    /// Axis element name (`catAx`, `valAx`, `dateAx`, `serAx`).
    pub element: String,
    pub title: Option<String>,
    pub position: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub major_unit: Option<f64>,
    pub minor_unit: Option<f64>,
    pub number_format: Option<String>,
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegendNode {
    pub position: Option<String>,
    pub overlay: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartNode {
    pub anchor: Option<Anchor>,
    pub name: Option<String>,
    /// First plot element name (`barChart`, `lineChart`, ...).
    pub plot_type: Option<String>,
    pub title: Option<String>,
    pub legend: Option<LegendNode>,
    pub bar_direction: Option<String>,
    pub grouping: Option<String>,
    pub series: Vec<SeriesNode>,
    pub axes: Vec<AxisNode>,
    /// Set by the reader when the chart part could not be read.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeNode {
    Picture(PictureNode),
    Chart(ChartNode),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetNode {
    pub name: String,
    pub state: SheetState,
    pub cells: Vec<CellNode>,
    /// Merge range text, e.g. `A1:B2`.
    pub merges: Vec<String>,
    pub columns: Vec<ColumnNode>,
    pub rows: Vec<RowNode>,
    pub default_column_width: Option<f64>,
    pub default_row_height: Option<f64>,
    pub pane: Option<PaneNode>,
    pub auto_filter: Option<String>,
    pub tab_color: Option<RawColor>,
    pub view: Option<SheetViewNode>,
    pub page_setup: Option<PageSetupNode>,
    pub margins: Option<PageMargins>,
    pub header_footer: Option<HeaderFooter>,
    /// Print area range text, comma separated. Parts may carry a sheet prefix.
    pub print_area: Option<String>,
    /// Print titles text, e.g. `Sheet1!$1:$2,Sheet1!$A:$A`.
    pub print_titles: Option<String>,
    pub print_gridlines: bool,
    pub print_headings: bool,
    pub data_validations: Vec<DataValidationNode>,
    pub conditional_formats: Vec<ConditionalFormatNode>,
    pub shapes: Vec<ShapeNode>,
    pub hyperlinks: Vec<HyperlinkNode>,
    pub comments: Vec<CommentNode>,
    /// Problems the reader met and worked around, in document order.
    pub notes: Vec<SourceNote>,
}

/// A recoverable problem found while reading a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNote {
    pub kind: DiagnosticKind,
    pub location: Option<String>,
    pub message: String,
}

impl SheetNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
