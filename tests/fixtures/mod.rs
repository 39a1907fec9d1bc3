//! Test fixtures for generating valid XLSX files in memory.
//!
//! Builders cover the parts the analyzer reads: shared strings, styles,
//! theme, worksheets with merges and rules, drawings with pictures and
//! charts, comments and document properties.
//!
//! # Example
//!
//! ```rust,ignore
//! use fixtures::{SheetBuilder, StyleBuilder, XlsxBuilder};
//!
//! let xlsx = XlsxBuilder::new()
//!     .sheet(
//!         SheetBuilder::new("Sheet1")
//!             .cell("A1", "Hello", Some(StyleBuilder::new().bold()))
//!             .merge("A1:B2"),
//!     )
//!     .build();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::fmt::Write as _;
use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::ZipWriter;

/// 1x1 PNG.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

// ============================================================================
// Style Builder
// ============================================================================

/// Font color as written to styles.xml.
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureColor {
    Rgb(String),
    Theme { index: u32, tint: f64 },
    Indexed(u32),
}

impl FixtureColor {
    fn attrs(&self) -> String {
        match self {
            Self::Rgb(hex) => format!(r#"rgb="{hex}""#),
            Self::Theme { index, tint } if *tint == 0.0 => format!(r#"theme="{index}""#),
            Self::Theme { index, tint } => format!(r#"theme="{index}" tint="{tint}""#),
            Self::Indexed(index) => format!(r#"indexed="{index}""#),
        }
    }
}

/// Builder for creating cell styles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleBuilder {
    pub bold: bool,
    pub italic: bool,
    pub font_color: Option<FixtureColor>,
    pub bg_color: Option<String>,
    pub border_style: Option<String>,
    pub number_format: Option<String>,
    pub horizontal: Option<String>,
}

impl StyleBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    #[must_use]
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Font color as `RRGGBB`; an alpha byte is added.
    #[must_use]
    pub fn font_color(mut self, hex: &str) -> Self {
        self.font_color = Some(FixtureColor::Rgb(format!("FF{}", hex.trim_start_matches('#'))));
        self
    }

    #[must_use]
    pub fn theme_font_color(mut self, index: u32, tint: f64) -> Self {
        self.font_color = Some(FixtureColor::Theme { index, tint });
        self
    }

    #[must_use]
    pub fn indexed_font_color(mut self, index: u32) -> Self {
        self.font_color = Some(FixtureColor::Indexed(index));
        self
    }

    /// Solid background fill as `RRGGBB`.
    #[must_use]
    pub fn bg_color(mut self, hex: &str) -> Self {
        self.bg_color = Some(format!("FF{}", hex.trim_start_matches('#')));
        self
    }

    #[must_use]
    pub fn border_all(mut self, style: &str) -> Self {
        self.border_style = Some(style.to_string());
        self
    }

    #[must_use]
    pub fn number_format(mut self, code: &str) -> Self {
        self.number_format = Some(code.to_string());
        self
    }

    #[must_use]
    pub fn align_horizontal(mut self, align: &str) -> Self {
        self.horizontal = Some(align.to_string());
        self
    }
}

// ============================================================================
// Cell Value
// ============================================================================

/// Represents a cell value that can be added to a sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Stored in the shared string table.
    String(String),
    Number(f64),
    Boolean(bool),
    /// An error value (e.g., "#DIV/0!").
    Error(String),
    InlineString(String),
    /// Style only.
    Empty,
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

// ============================================================================
// Sheet Builder
// ============================================================================

#[derive(Debug, Clone)]
pub struct CellEntry {
    pub cell_ref: String,
    pub value: CellValue,
    pub formula: Option<String>,
    pub style: Option<StyleBuilder>,
}

/// A picture or chart anchored at a cell.
#[derive(Debug, Clone)]
pub enum ShapeEntry {
    Image {
        from: (u32, u32),
        to: (u32, u32),
        name: String,
        data: Vec<u8>,
        extension: String,
    },
    Chart {
        from: (u32, u32),
        to: (u32, u32),
        name: String,
        xml: String,
    },
}

#[derive(Debug, Clone)]
pub struct CommentEntry {
    pub cell_ref: String,
    pub author: String,
    pub text: String,
}

/// Builder for a single worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetBuilder {
    pub name: String,
    pub state: Option<String>,
    pub cells: Vec<CellEntry>,
    pub merges: Vec<String>,
    pub frozen_rows: u32,
    pub frozen_cols: u32,
    pub col_widths: Vec<(u32, u32, f64)>,
    pub hidden_rows: Vec<u32>,
    pub validations: Vec<String>,
    pub conditional: Vec<String>,
    pub hyperlinks: Vec<(String, String)>,
    pub comments: Vec<CommentEntry>,
    pub shapes: Vec<ShapeEntry>,
    /// Row XML written verbatim after the generated rows.
    pub raw_rows: Vec<String>,
    pub print_titles: Option<String>,
    pub print_area: Option<String>,
    pub print_gridlines: bool,
    pub print_headings: bool,
}

impl SheetBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.state = Some("hidden".to_string());
        self
    }

    /// Append a `<row>` element as written, well-formed or not.
    #[must_use]
    pub fn raw_row(mut self, xml: &str) -> Self {
        self.raw_rows.push(xml.to_string());
        self
    }

    /// `_xlnm.Print_Titles` text, e.g. `Sheet1!$1:$2`.
    #[must_use]
    pub fn print_titles(mut self, text: &str) -> Self {
        self.print_titles = Some(text.to_string());
        self
    }

    /// `_xlnm.Print_Area` text.
    #[must_use]
    pub fn print_area(mut self, text: &str) -> Self {
        self.print_area = Some(text.to_string());
        self
    }

    #[must_use]
    pub fn print_options(mut self, gridlines: bool, headings: bool) -> Self {
        self.print_gridlines = gridlines;
        self.print_headings = headings;
        self
    }

    /// Add a cell with a value and optional style.
    #[must_use]
    pub fn cell<V: Into<CellValue>>(
        mut self,
        cell_ref: &str,
        value: V,
        style: Option<StyleBuilder>,
    ) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: value.into(),
            formula: None,
            style,
        });
        self
    }

    /// Add a formula cell. `cached` is the stored result, if any.
    #[must_use]
    pub fn formula(mut self, cell_ref: &str, formula: &str, cached: Option<CellValue>) -> Self {
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            value: cached.unwrap_or(CellValue::Empty),
            formula: Some(formula.to_string()),
            style: None,
        });
        self
    }

    /// Add an empty cell with only a style.
    #[must_use]
    pub fn styled_cell(self, cell_ref: &str, style: StyleBuilder) -> Self {
        self.cell(cell_ref, CellValue::Empty, Some(style))
    }

    /// Add a merge range (e.g., "A1:B2").
    #[must_use]
    pub fn merge(mut self, range: &str) -> Self {
        self.merges.push(range.to_string());
        self
    }

    #[must_use]
    pub fn freeze_panes(mut self, rows: u32, cols: u32) -> Self {
        self.frozen_rows = rows;
        self.frozen_cols = cols;
        self
    }

    #[must_use]
    pub fn col_width(mut self, min: u32, max: u32, width: f64) -> Self {
        self.col_widths.push((min, max, width));
        self
    }

    #[must_use]
    pub fn hide_row(mut self, row: u32) -> Self {
        self.hidden_rows.push(row);
        self
    }

    /// Add a list validation with an inline item list.
    #[must_use]
    pub fn list_validation(mut self, sqref: &str, items: &str) -> Self {
        self.validations.push(format!(
            r#"<dataValidation type="list" allowBlank="1" showErrorMessage="1" sqref="{sqref}"><formula1>"{items}"</formula1></dataValidation>"#
        ));
        self
    }

    /// Add a `cellIs` rule using differential format `dxf_id`.
    #[must_use]
    pub fn cell_is_rule(
        mut self,
        sqref: &str,
        operator: &str,
        formula: &str,
        priority: i32,
        dxf_id: u32,
    ) -> Self {
        self.conditional.push(format!(
            r#"<conditionalFormatting sqref="{sqref}"><cfRule type="cellIs" dxfId="{dxf_id}" priority="{priority}" operator="{operator}"><formula>{formula}</formula></cfRule></conditionalFormatting>"#
        ));
        self
    }

    /// Add a two-color scale rule.
    #[must_use]
    pub fn color_scale(mut self, sqref: &str, min_color: &str, max_color: &str) -> Self {
        let priority = self.conditional.len() + 1;
        self.conditional.push(format!(
            r#"<conditionalFormatting sqref="{sqref}"><cfRule type="colorScale" priority="{priority}"><colorScale><cfvo type="min"/><cfvo type="max"/><color rgb="FF{min_color}"/><color rgb="FF{max_color}"/></colorScale></cfRule></conditionalFormatting>"#
        ));
        self
    }

    #[must_use]
    pub fn hyperlink(mut self, cell_ref: &str, url: &str) -> Self {
        self.hyperlinks.push((cell_ref.to_string(), url.to_string()));
        self
    }

    #[must_use]
    pub fn comment(mut self, cell_ref: &str, author: &str, text: &str) -> Self {
        self.comments.push(CommentEntry {
            cell_ref: cell_ref.to_string(),
            author: author.to_string(),
            text: text.to_string(),
        });
        self
    }

    /// Anchor a picture between two zero-based (col, row) cells.
    #[must_use]
    pub fn image(mut self, from: (u32, u32), to: (u32, u32), name: &str, data: &[u8]) -> Self {
        self.shapes.push(ShapeEntry::Image {
            from,
            to,
            name: name.to_string(),
            data: data.to_vec(),
            extension: "png".to_string(),
        });
        self
    }

    /// Anchor a chart part between two zero-based (col, row) cells.
    #[must_use]
    pub fn chart(mut self, from: (u32, u32), to: (u32, u32), name: &str, xml: &str) -> Self {
        self.shapes.push(ShapeEntry::Chart {
            from,
            to,
            name: name.to_string(),
            xml: xml.to_string(),
        });
        self
    }
}

// ============================================================================
// Chart parts
// ============================================================================

/// A clustered column chart with one series of cached values.
#[must_use]
pub fn bar_chart_xml(title: &str, values: &[f64]) -> String {
    plot_chart_xml("barChart", title, values)
}

/// A chart whose plot element is `element`, one series of cached values.
#[must_use]
pub fn plot_chart_xml(element: &str, title: &str, values: &[f64]) -> String {
    let mut points = String::new();
    for (i, v) in values.iter().enumerate() {
        let _ = write!(points, r#"<c:pt idx="{i}"><c:v>{v}</c:v></c:pt>"#);
    }
    let bar_dir = if element == "barChart" {
        r#"<c:barDir val="col"/><c:grouping val="clustered"/>"#
    } else {
        ""
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<c:chartSpace xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><c:chart>
<c:title><c:tx><c:rich><a:p><a:r><a:t>{title}</a:t></a:r></a:p></c:rich></c:tx></c:title>
<c:plotArea><c:{element}>{bar_dir}
<c:ser><c:idx val="0"/><c:tx><c:v>Series 1</c:v></c:tx>
<c:val><c:numRef><c:f>Sheet1!$B$2:$B${end}</c:f><c:numCache><c:ptCount val="{count}"/>{points}</c:numCache></c:numRef></c:val></c:ser>
</c:{element}><c:catAx><c:axId val="1"/><c:axPos val="b"/></c:catAx><c:valAx><c:axId val="2"/><c:axPos val="l"/></c:valAx></c:plotArea>
<c:legend><c:legendPos val="r"/></c:legend></c:chart></c:chartSpace>"#,
        end = values.len() + 1,
        count = values.len(),
    )
}

// ============================================================================
// XLSX Builder
// ============================================================================

/// Builder for creating complete XLSX files.
#[derive(Debug, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
    theme_colors: Option<Vec<String>>,
    dxfs: Vec<String>,
    title: Option<String>,
    created: Option<String>,
    date_1904: bool,
    active_tab: Option<u32>,
    calc_mode: Option<String>,
}

impl XlsxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Twelve `RRGGBB` colors in style-reference order (lt1, dk1, lt2, dk2,
    /// accent1..6, hlink, folHlink).
    #[must_use]
    pub fn theme_colors(mut self, colors: Vec<String>) -> Self {
        self.theme_colors = Some(colors);
        self
    }

    /// Add a differential format with a solid fill, returning its id order.
    #[must_use]
    pub fn dxf_fill(mut self, hex: &str) -> Self {
        self.dxfs.push(format!(
            r#"<dxf><fill><patternFill patternType="solid"><bgColor rgb="FF{hex}"/></patternFill></fill></dxf>"#
        ));
        self
    }

    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    #[must_use]
    pub fn created(mut self, timestamp: &str) -> Self {
        self.created = Some(timestamp.to_string());
        self
    }

    #[must_use]
    pub fn date_1904(mut self) -> Self {
        self.date_1904 = true;
        self
    }

    #[must_use]
    pub fn active_tab(mut self, tab: u32) -> Self {
        self.active_tab = Some(tab);
        self
    }

    /// `calcMode` attribute of `<calcPr>`.
    #[must_use]
    pub fn calc_mode(mut self, mode: &str) -> Self {
        self.calc_mode = Some(mode.to_string());
        self
    }

    /// Build the XLSX file as bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let mut styles = StylesCollector::default();
        let mut shared_strings: Vec<String> = Vec::new();
        for sheet in &self.sheets {
            for cell in &sheet.cells {
                if let Some(ref style) = cell.style {
                    styles.add_style(style);
                }
                if let CellValue::String(ref s) = cell.value {
                    if !shared_strings.contains(s) {
                        shared_strings.push(s.clone());
                    }
                }
            }
        }

        let mut put = |path: &str, body: &[u8]| {
            zip.start_file(path, options).unwrap();
            zip.write_all(body).unwrap();
        };

        put("[Content_Types].xml", generate_content_types().as_bytes());
        put("_rels/.rels", ROOT_RELS.as_bytes());
        put("docProps/core.xml", self.generate_core().as_bytes());
        put(
            "xl/_rels/workbook.xml.rels",
            generate_workbook_rels(self.sheets.len()).as_bytes(),
        );
        put("xl/workbook.xml", self.generate_workbook().as_bytes());
        put(
            "xl/styles.xml",
            styles.generate_styles_xml(&self.dxfs).as_bytes(),
        );
        put(
            "xl/sharedStrings.xml",
            generate_shared_strings(&shared_strings).as_bytes(),
        );
        put(
            "xl/theme/theme1.xml",
            generate_theme(self.theme_colors.as_deref()).as_bytes(),
        );

        let mut chart_count = 0usize;
        let mut image_count = 0usize;
        for (i, sheet) in self.sheets.iter().enumerate() {
            let n = i + 1;
            let has_drawing = !sheet.shapes.is_empty();
            let has_comments = !sheet.comments.is_empty();
            put(
                &format!("xl/worksheets/sheet{n}.xml"),
                generate_sheet_xml(sheet, &shared_strings, &styles, has_drawing).as_bytes(),
            );

            let mut sheet_rels = Vec::new();
            if has_drawing {
                sheet_rels.push(format!(
                    r#"<Relationship Id="rIdDr" Type="{REL_BASE}/drawing" Target="../drawings/drawing{n}.xml"/>"#
                ));
            }
            if has_comments {
                sheet_rels.push(format!(
                    r#"<Relationship Id="rIdCm" Type="{REL_BASE}/comments" Target="../comments{n}.xml"/>"#
                ));
                put(
                    &format!("xl/comments{n}.xml"),
                    generate_comments(&sheet.comments).as_bytes(),
                );
            }
            for (j, (_, url)) in sheet.hyperlinks.iter().enumerate() {
                sheet_rels.push(format!(
                    r#"<Relationship Id="rIdH{j}" Type="{REL_BASE}/hyperlink" Target="{url}" TargetMode="External"/>"#
                ));
            }
            if !sheet_rels.is_empty() {
                put(
                    &format!("xl/worksheets/_rels/sheet{n}.xml.rels"),
                    wrap_rels(&sheet_rels).as_bytes(),
                );
            }

            if has_drawing {
                let mut anchors = String::new();
                let mut drawing_rels = Vec::new();
                for (k, shape) in sheet.shapes.iter().enumerate() {
                    let rid = format!("rId{}", k + 1);
                    match shape {
                        ShapeEntry::Image {
                            from,
                            to,
                            name,
                            data,
                            extension,
                        } => {
                            image_count += 1;
                            let media = format!("image{image_count}.{extension}");
                            put(&format!("xl/media/{media}"), data);
                            drawing_rels.push(format!(
                                r#"<Relationship Id="{rid}" Type="{REL_BASE}/image" Target="../media/{media}"/>"#
                            ));
                            anchors.push_str(&picture_anchor(*from, *to, k + 2, name, &rid));
                        }
                        ShapeEntry::Chart { from, to, name, xml } => {
                            chart_count += 1;
                            put(&format!("xl/charts/chart{chart_count}.xml"), xml.as_bytes());
                            drawing_rels.push(format!(
                                r#"<Relationship Id="{rid}" Type="{REL_BASE}/chart" Target="../charts/chart{chart_count}.xml"/>"#
                            ));
                            anchors.push_str(&chart_anchor(*from, *to, k + 2, name, &rid));
                        }
                    }
                }
                put(
                    &format!("xl/drawings/drawing{n}.xml"),
                    format!(
                        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart">{anchors}</xdr:wsDr>"#
                    )
                    .as_bytes(),
                );
                put(
                    &format!("xl/drawings/_rels/drawing{n}.xml.rels"),
                    wrap_rels(&drawing_rels).as_bytes(),
                );
            }
        }

        zip.finish().expect("Failed to finish ZIP").into_inner()
    }

    fn generate_workbook(&self) -> String {
        let mut sheets = String::new();
        for (i, sheet) in self.sheets.iter().enumerate() {
            let state = sheet
                .state
                .as_ref()
                .map(|s| format!(r#" state="{s}""#))
                .unwrap_or_default();
            let _ = write!(
                sheets,
                r#"<sheet name="{}" sheetId="{}"{state} r:id="rId{}"/>"#,
                escape(&sheet.name),
                i + 1,
                i + 1
            );
        }
        let pr = if self.date_1904 {
            r#"<workbookPr date1904="1"/>"#
        } else {
            "<workbookPr/>"
        };
        let views = self
            .active_tab
            .map(|tab| format!(r#"<bookViews><workbookView activeTab="{tab}"/></bookViews>"#))
            .unwrap_or_default();
        let mut names = String::new();
        for (i, sheet) in self.sheets.iter().enumerate() {
            let entries = [
                ("_xlnm.Print_Area", &sheet.print_area),
                ("_xlnm.Print_Titles", &sheet.print_titles),
            ];
            for (name, value) in entries {
                if let Some(value) = value {
                    let _ = write!(
                        names,
                        r#"<definedName name="{name}" localSheetId="{i}">{}</definedName>"#,
                        escape(value)
                    );
                }
            }
        }
        let names = if names.is_empty() {
            names
        } else {
            format!("<definedNames>{names}</definedNames>")
        };
        let calc = self
            .calc_mode
            .as_ref()
            .map(|mode| format!(r#"<calcPr calcId="191029" calcMode="{mode}"/>"#))
            .unwrap_or_default();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">{pr}{views}<sheets>{sheets}</sheets>{names}{calc}</workbook>"#
        )
    }

    fn generate_core(&self) -> String {
        let title = self
            .title
            .as_ref()
            .map(|t| format!("<dc:title>{}</dc:title>", escape(t)))
            .unwrap_or_default();
        let created = self
            .created
            .as_ref()
            .map(|t| format!(r#"<dcterms:created xsi:type="dcterms:W3CDTF">{t}</dcterms:created>"#))
            .unwrap_or_default();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">{title}<dc:creator>fixtures</dc:creator>{created}</cp:coreProperties>"#
        )
    }
}

// ============================================================================
// Styles Collector
// ============================================================================

/// Collects and deduplicates styles; xf 0 is the workbook default.
#[derive(Debug, Default)]
pub struct StylesCollector {
    styles: Vec<StyleBuilder>,
    num_fmts: Vec<String>,
}

impl StylesCollector {
    fn add_style(&mut self, style: &StyleBuilder) {
        if !self.styles.contains(style) {
            self.styles.push(style.clone());
        }
        if let Some(code) = &style.number_format {
            if builtin_num_fmt(code).is_none() && !self.num_fmts.contains(code) {
                self.num_fmts.push(code.clone());
            }
        }
    }

    /// `s` attribute for a cell with this style.
    fn xf_index(&self, style: Option<&StyleBuilder>) -> usize {
        style
            .and_then(|s| self.styles.iter().position(|x| x == s))
            .map_or(0, |i| i + 1)
    }

    fn num_fmt_id(&self, code: &str) -> u32 {
        builtin_num_fmt(code).unwrap_or_else(|| {
            let pos = self.num_fmts.iter().position(|c| c == code).unwrap_or(0);
            164 + u32::try_from(pos).unwrap()
        })
    }

    fn generate_styles_xml(&self, dxfs: &[String]) -> String {
        let mut num_fmts = String::new();
        for (i, code) in self.num_fmts.iter().enumerate() {
            let _ = write!(
                num_fmts,
                r#"<numFmt numFmtId="{}" formatCode="{}"/>"#,
                164 + i,
                escape(code)
            );
        }

        let mut fonts = String::from(
            r#"<font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font>"#,
        );
        let mut fills = String::from(
            r#"<fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill>"#,
        );
        let mut borders = String::from("<border><left/><right/><top/><bottom/><diagonal/></border>");
        let mut xfs = String::from(
            r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
        );

        for (i, style) in self.styles.iter().enumerate() {
            let font_id = i + 1;
            let color = style
                .font_color
                .as_ref()
                .map(|c| format!("<color {}/>", c.attrs()))
                .unwrap_or_else(|| r#"<color theme="1"/>"#.to_string());
            let _ = write!(
                fonts,
                r#"<font>{}{}<sz val="11"/>{color}<name val="Calibri"/></font>"#,
                if style.bold { "<b/>" } else { "" },
                if style.italic { "<i/>" } else { "" },
            );

            let fill_id = match &style.bg_color {
                Some(hex) => {
                    let _ = write!(
                        fills,
                        r#"<fill><patternFill patternType="solid"><fgColor rgb="{hex}"/><bgColor indexed="64"/></patternFill></fill>"#
                    );
                    fills.matches("<fill>").count() - 1
                }
                None => 0,
            };

            let border_id = match &style.border_style {
                Some(s) => {
                    let _ = write!(
                        borders,
                        r#"<border><left style="{s}"/><right style="{s}"/><top style="{s}"/><bottom style="{s}"/><diagonal/></border>"#
                    );
                    borders.matches("<border>").count() - 1
                }
                None => 0,
            };

            let num_fmt_id = style
                .number_format
                .as_deref()
                .map_or(0, |code| self.num_fmt_id(code));
            let alignment = style
                .horizontal
                .as_ref()
                .map(|h| format!(r#"<alignment horizontal="{h}"/>"#));
            let _ = write!(
                xfs,
                r#"<xf numFmtId="{num_fmt_id}" fontId="{font_id}" fillId="{fill_id}" borderId="{border_id}" xfId="0" applyFont="1"{}{}{}"#,
                if fill_id > 0 { r#" applyFill="1""# } else { "" },
                if num_fmt_id > 0 { r#" applyNumberFormat="1""# } else { "" },
                match &alignment {
                    Some(a) => format!(r#" applyAlignment="1">{a}</xf>"#),
                    None => "/>".to_string(),
                }
            );
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="{MAIN_NS}"><numFmts count="{}">{num_fmts}</numFmts><fonts>{fonts}</fonts><fills>{fills}</fills><borders>{borders}</borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs>{xfs}</cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles><dxfs count="{}">{}</dxfs></styleSheet>"#,
            self.num_fmts.len(),
            dxfs.len(),
            dxfs.concat()
        )
    }
}

fn builtin_num_fmt(code: &str) -> Option<u32> {
    match code {
        "General" => Some(0),
        "0" => Some(1),
        "0.00" => Some(2),
        "#,##0" => Some(3),
        "#,##0.00" => Some(4),
        "0%" => Some(9),
        "0.00%" => Some(10),
        "mm-dd-yy" => Some(14),
        _ => None,
    }
}

// ============================================================================
// Part generators
// ============================================================================

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

fn generate_content_types() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#
        .to_string()
}

fn wrap_rels(rels: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        rels.concat()
    )
}

fn generate_workbook_rels(sheet_count: usize) -> String {
    let mut rels: Vec<String> = (1..=sheet_count)
        .map(|n| {
            format!(
                r#"<Relationship Id="rId{n}" Type="{REL_BASE}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
            )
        })
        .collect();
    rels.push(format!(
        r#"<Relationship Id="rIdS" Type="{REL_BASE}/styles" Target="styles.xml"/>"#
    ));
    rels.push(format!(
        r#"<Relationship Id="rIdT" Type="{REL_BASE}/theme" Target="theme/theme1.xml"/>"#
    ));
    rels.push(format!(
        r#"<Relationship Id="rIdSS" Type="{REL_BASE}/sharedStrings" Target="sharedStrings.xml"/>"#
    ));
    wrap_rels(&rels)
}

fn generate_shared_strings(strings: &[String]) -> String {
    let mut items = String::new();
    for s in strings {
        let _ = write!(items, r#"<si><t xml:space="preserve">{}</t></si>"#, escape(s));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="{MAIN_NS}" count="{0}" uniqueCount="{0}">{items}</sst>"#,
        strings.len()
    )
}

const DEFAULT_THEME: [&str; 12] = [
    "FFFFFF", "000000", "E7E6E6", "44546A", "4472C4", "ED7D31", "A5A5A5", "FFC000", "5B9BD5",
    "70AD47", "0563C1", "954F72",
];

fn generate_theme(colors: Option<&[String]>) -> String {
    let color = |i: usize| -> String {
        colors
            .and_then(|c| c.get(i))
            .cloned()
            .unwrap_or_else(|| DEFAULT_THEME[i].to_string())
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office">
<a:dk1><a:sysClr val="windowText" lastClr="{}"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="{}"/></a:lt1>
<a:dk2><a:srgbClr val="{}"/></a:dk2><a:lt2><a:srgbClr val="{}"/></a:lt2>
<a:accent1><a:srgbClr val="{}"/></a:accent1><a:accent2><a:srgbClr val="{}"/></a:accent2>
<a:accent3><a:srgbClr val="{}"/></a:accent3><a:accent4><a:srgbClr val="{}"/></a:accent4>
<a:accent5><a:srgbClr val="{}"/></a:accent5><a:accent6><a:srgbClr val="{}"/></a:accent6>
<a:hlink><a:srgbClr val="{}"/></a:hlink><a:folHlink><a:srgbClr val="{}"/></a:folHlink>
</a:clrScheme></a:themeElements></a:theme>"#,
        color(1),
        color(0),
        color(3),
        color(2),
        color(4),
        color(5),
        color(6),
        color(7),
        color(8),
        color(9),
        color(10),
        color(11),
    )
}

fn generate_sheet_xml(
    sheet: &SheetBuilder,
    shared_strings: &[String],
    styles: &StylesCollector,
    has_drawing: bool,
) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">"#
    );

    xml.push_str("<sheetViews><sheetView workbookViewId=\"0\">");
    if sheet.frozen_rows > 0 || sheet.frozen_cols > 0 {
        let top_left = format!(
            "{}{}",
            column_letters(sheet.frozen_cols + 1),
            sheet.frozen_rows + 1
        );
        let _ = write!(xml, r#"<pane state="frozen" topLeftCell="{top_left}""#);
        if sheet.frozen_cols > 0 {
            let _ = write!(xml, r#" xSplit="{}""#, sheet.frozen_cols);
        }
        if sheet.frozen_rows > 0 {
            let _ = write!(xml, r#" ySplit="{}""#, sheet.frozen_rows);
        }
        xml.push_str("/>");
    }
    xml.push_str("</sheetView></sheetViews>");

    if !sheet.col_widths.is_empty() {
        xml.push_str("<cols>");
        for (min, max, width) in &sheet.col_widths {
            let _ = write!(
                xml,
                r#"<col min="{min}" max="{max}" width="{width}" customWidth="1"/>"#
            );
        }
        xml.push_str("</cols>");
    }

    // Group cells by row, in row order
    let mut rows: Vec<(u32, Vec<&CellEntry>)> = Vec::new();
    for cell in &sheet.cells {
        let row = row_number(&cell.cell_ref);
        match rows.iter_mut().find(|(r, _)| *r == row) {
            Some((_, cells)) => cells.push(cell),
            None => rows.push((row, vec![cell])),
        }
    }
    for row in &sheet.hidden_rows {
        if !rows.iter().any(|(r, _)| r == row) {
            rows.push((*row, Vec::new()));
        }
    }
    rows.sort_by_key(|(r, _)| *r);

    xml.push_str("<sheetData>");
    for (row, cells) in rows {
        let hidden = if sheet.hidden_rows.contains(&row) {
            r#" hidden="1""#
        } else {
            ""
        };
        let _ = write!(xml, r#"<row r="{row}"{hidden}>"#);
        for cell in cells {
            let s = styles.xf_index(cell.style.as_ref());
            let style_attr = if s > 0 {
                format!(r#" s="{s}""#)
            } else {
                String::new()
            };
            let formula = cell
                .formula
                .as_ref()
                .map(|f| format!("<f>{}</f>", escape(f)))
                .unwrap_or_default();
            let r = &cell.cell_ref;
            match &cell.value {
                CellValue::String(text) => {
                    let idx = shared_strings.iter().position(|x| x == text).unwrap();
                    let _ = write!(
                        xml,
                        r#"<c r="{r}"{style_attr} t="s">{formula}<v>{idx}</v></c>"#
                    );
                }
                CellValue::Number(n) => {
                    let _ = write!(xml, r#"<c r="{r}"{style_attr}>{formula}<v>{n}</v></c>"#);
                }
                CellValue::Boolean(b) => {
                    let _ = write!(
                        xml,
                        r#"<c r="{r}"{style_attr} t="b">{formula}<v>{}</v></c>"#,
                        u8::from(*b)
                    );
                }
                CellValue::Error(e) => {
                    let _ = write!(
                        xml,
                        r#"<c r="{r}"{style_attr} t="e">{formula}<v>{}</v></c>"#,
                        escape(e)
                    );
                }
                CellValue::InlineString(text) => {
                    let _ = write!(
                        xml,
                        r#"<c r="{r}"{style_attr} t="inlineStr"><is><t>{}</t></is></c>"#,
                        escape(text)
                    );
                }
                CellValue::Empty => {
                    let _ = write!(xml, r#"<c r="{r}"{style_attr}>{formula}</c>"#);
                }
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str(&sheet.raw_rows.concat());
    xml.push_str("</sheetData>");

    if !sheet.merges.is_empty() {
        let _ = write!(xml, r#"<mergeCells count="{}">"#, sheet.merges.len());
        for range in &sheet.merges {
            let _ = write!(xml, r#"<mergeCell ref="{range}"/>"#);
        }
        xml.push_str("</mergeCells>");
    }

    xml.push_str(&sheet.conditional.concat());

    if !sheet.validations.is_empty() {
        let _ = write!(
            xml,
            r#"<dataValidations count="{}">{}</dataValidations>"#,
            sheet.validations.len(),
            sheet.validations.concat()
        );
    }

    if !sheet.hyperlinks.is_empty() {
        xml.push_str("<hyperlinks>");
        for (j, (cell_ref, _)) in sheet.hyperlinks.iter().enumerate() {
            let _ = write!(xml, r#"<hyperlink ref="{cell_ref}" r:id="rIdH{j}"/>"#);
        }
        xml.push_str("</hyperlinks>");
    }

    if sheet.print_gridlines || sheet.print_headings {
        let _ = write!(
            xml,
            r#"<printOptions gridLines="{}" headings="{}"/>"#,
            u8::from(sheet.print_gridlines),
            u8::from(sheet.print_headings)
        );
    }
    xml.push_str(
        r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#,
    );
    if has_drawing {
        xml.push_str(r#"<drawing r:id="rIdDr"/>"#);
    }
    xml.push_str("</worksheet>");
    xml
}

fn generate_comments(comments: &[CommentEntry]) -> String {
    let mut authors: Vec<&str> = Vec::new();
    for c in comments {
        if !authors.contains(&c.author.as_str()) {
            authors.push(&c.author);
        }
    }
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<comments xmlns="{MAIN_NS}"><authors>"#
    );
    for a in &authors {
        let _ = write!(xml, "<author>{}</author>", escape(a));
    }
    xml.push_str("</authors><commentList>");
    for c in comments {
        let author_id = authors.iter().position(|a| *a == c.author).unwrap();
        let _ = write!(
            xml,
            r#"<comment ref="{}" authorId="{author_id}"><text><r><t>{}</t></r></text></comment>"#,
            c.cell_ref,
            escape(&c.text)
        );
    }
    xml.push_str("</commentList></comments>");
    xml
}

fn marker(tag: &str, (col, row): (u32, u32)) -> String {
    format!(
        "<xdr:{tag}><xdr:col>{col}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{row}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:{tag}>"
    )
}

fn picture_anchor(from: (u32, u32), to: (u32, u32), id: usize, name: &str, rid: &str) -> String {
    format!(
        r#"<xdr:twoCellAnchor>{}{}<xdr:pic><xdr:nvPicPr><xdr:cNvPr id="{id}" name="{}"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill><xdr:spPr/></xdr:pic><xdr:clientData/></xdr:twoCellAnchor>"#,
        marker("from", from),
        marker("to", to),
        escape(name)
    )
}

fn chart_anchor(from: (u32, u32), to: (u32, u32), id: usize, name: &str, rid: &str) -> String {
    format!(
        r#"<xdr:twoCellAnchor>{}{}<xdr:graphicFrame macro=""><xdr:nvGraphicFramePr><xdr:cNvPr id="{id}" name="{}"/><xdr:cNvGraphicFramePr/></xdr:nvGraphicFramePr><xdr:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/></xdr:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart"><c:chart r:id="{rid}"/></a:graphicData></a:graphic></xdr:graphicFrame><xdr:clientData/></xdr:twoCellAnchor>"#,
        marker("from", from),
        marker("to", to),
        escape(name)
    )
}

fn row_number(cell_ref: &str) -> u32 {
    cell_ref
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .unwrap()
}

fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap()));
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============================================================================
// Convenience
// ============================================================================

/// A workbook with one empty sheet.
#[must_use]
pub fn minimal_xlsx() -> Vec<u8> {
    XlsxBuilder::new().sheet(SheetBuilder::new("Sheet1")).build()
}

/// The two-sheet sample: a bold total label and a summing formula on the
/// first sheet, an empty second sheet with a single merge.
#[must_use]
pub fn two_sheet_xlsx() -> Vec<u8> {
    XlsxBuilder::new()
        .title("Quarterly report")
        .sheet(
            SheetBuilder::new("Summary")
                .cell("A1", "Total", Some(StyleBuilder::new().bold()))
                .formula("B1", "SUM(B2:B3)", Some(CellValue::Number(42.0))),
        )
        .sheet(SheetBuilder::new("Empty").merge("A1:B2"))
        .build()
}
