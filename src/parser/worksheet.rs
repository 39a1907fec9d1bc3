//! Worksheet part parsing.
//!
//! Produces the sheet node minus its drawing shapes and comments, which
//! live in separate parts the caller resolves through the sheet's
//! relationships.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::cell_ref::CellRef;
use crate::error::Result;
use crate::numfmt::parse_iso_datetime;
use crate::source::{
    CellNode, CfRuleNode, ColumnNode, ConditionalFormatNode, DataValidationNode, HyperlinkNode,
    PageSetupNode, PaneNode, PaneState, RawValue, RowNode, SheetNode, SheetViewNode, SourceNote,
    StyleRef,
};
use crate::types::{DiagnosticKind, HeaderFooter, Orientation, PageMargins, SheetState};
use crate::xml_helpers::{
    attr_bool, attr_bool_default, attr_f64, attr_i32, attr_string, attr_string_local, attr_u32,
    parse_color_attrs, read_text, skip_element, unclosed_element,
};

use super::relationships::Relationships;
use super::shared_formula::SharedFormulas;
use super::shared_strings::read_rich_text;

/// A parsed worksheet part plus the drawing parts it points at.
#[derive(Debug)]
pub(super) struct ParsedSheet {
    pub node: SheetNode,
    /// Relationship ids of `<drawing>` elements, in document order.
    pub drawing_ids: Vec<String>,
}

/// Cell type tag from the `t` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellTypeTag {
    SharedString,
    InlineString,
    FormulaString,
    Boolean,
    Error,
    Date,
    Number,
}

impl CellTypeTag {
    fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("s") => Self::SharedString,
            Some("inlineStr") => Self::InlineString,
            Some("str") => Self::FormulaString,
            Some("b") => Self::Boolean,
            Some("e") => Self::Error,
            Some("d") => Self::Date,
            _ => Self::Number,
        }
    }
}

/// Children of a `<c>` element.
#[derive(Debug, Default)]
struct CellContent {
    value: Option<String>,
    inline: Option<String>,
    formula: Option<String>,
    shared_index: Option<u32>,
}

/// Parse a worksheet part.
///
/// Malformed XML fails the whole part. Cell values that cannot be
/// interpreted keep their raw text and leave a note on the sheet.
#[allow(clippy::too_many_lines, clippy::cognitive_complexity)]
pub(super) fn parse_sheet<R: BufRead>(
    reader: R,
    name: &str,
    state: SheetState,
    shared_strings: &[String],
    rels: &Relationships,
) -> Result<ParsedSheet> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut sheet = SheetNode {
        state,
        ..SheetNode::new(name)
    };
    let mut drawing_ids = Vec::new();
    let mut shared = SharedFormulas::default();

    let mut buf = Vec::new();
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 1;
    let mut in_sheet_pr = false;
    let mut in_first_view = false;

    let mut current_dv: Option<DataValidationNode> = None;
    let mut current_cf: Option<ConditionalFormatNode> = None;
    let mut current_rule: Option<CfRuleNode> = None;
    let mut in_color_scale = false;
    let mut in_data_bar = false;
    let mut header_footer: Option<HeaderFooter> = None;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_start = matches!(event, Event::Start(_));

                match e.local_name().as_ref() {
                    b"sheetPr" => in_sheet_pr = is_start,
                    b"tabColor" if in_sheet_pr => {
                        sheet.tab_color = parse_color_attrs(e);
                    }

                    b"sheetView" if sheet.view.is_none() => {
                        sheet.view = Some(SheetViewNode {
                            zoom: attr_u32(e, b"zoomScale"),
                            show_grid_lines: attr_bool_default(e, b"showGridLines", true),
                            show_headers: attr_bool_default(e, b"showRowColHeaders", true),
                            right_to_left: attr_bool_default(e, b"rightToLeft", false),
                            selected: attr_bool_default(e, b"tabSelected", false),
                        });
                        in_first_view = is_start;
                    }
                    b"pane" if in_first_view => {
                        // A pane without a state attribute is a plain split
                        let state = match attr_string(e, b"state").as_deref() {
                            Some("frozen") => PaneState::Frozen,
                            Some("frozenSplit") => PaneState::FrozenSplit,
                            _ => PaneState::Split,
                        };
                        sheet.pane = Some(PaneNode {
                            x_split: attr_f64(e, b"xSplit").unwrap_or(0.0),
                            y_split: attr_f64(e, b"ySplit").unwrap_or(0.0),
                            top_left_cell: attr_string(e, b"topLeftCell"),
                            state,
                        });
                    }

                    b"sheetFormatPr" => {
                        sheet.default_column_width = attr_f64(e, b"defaultColWidth");
                        sheet.default_row_height = attr_f64(e, b"defaultRowHeight");
                    }

                    b"col" => {
                        if let (Some(min), Some(max)) = (attr_u32(e, b"min"), attr_u32(e, b"max")) {
                            sheet.columns.push(ColumnNode {
                                min,
                                max,
                                width: attr_f64(e, b"width"),
                                hidden: attr_bool_default(e, b"hidden", false),
                                outline_level: outline_level(e),
                            });
                        }
                    }

                    b"row" => {
                        current_row = attr_u32(e, b"r").unwrap_or(current_row.saturating_add(1));
                        next_col = 1;
                        let height = attr_f64(e, b"ht")
                            .filter(|_| attr_bool(e, b"customHeight") != Some(false));
                        let hidden = attr_bool_default(e, b"hidden", false);
                        let outline_level = outline_level(e);
                        if height.is_some() || hidden || outline_level.is_some() {
                            sheet.rows.push(RowNode {
                                row: current_row,
                                height,
                                hidden,
                                outline_level,
                            });
                        }
                    }

                    b"c" => {
                        let coord = match attr_string(e, b"r") {
                            Some(r) => CellRef::parse(&r),
                            None => (current_row > 0).then(|| CellRef::new(current_row, next_col)),
                        };
                        let tag = CellTypeTag::from_attr(attr_string(e, b"t").as_deref());
                        let style = attr_u32(e, b"s").map(StyleRef::Index);
                        let content = if is_start {
                            read_cell_content(&mut xml)?
                        } else {
                            CellContent::default()
                        };

                        if let Some(coord) = coord {
                            next_col = coord.col.saturating_add(1);
                            let formula = match (content.formula, content.shared_index) {
                                (Some(text), Some(index)) => {
                                    shared.insert(index, coord, text.clone());
                                    Some(text)
                                }
                                (Some(text), None) => Some(text),
                                (None, Some(index)) => shared.expand(index, coord),
                                (None, None) => None,
                            };
                            let value = cell_value(
                                tag,
                                content.value,
                                content.inline,
                                shared_strings,
                                coord,
                                &mut sheet.notes,
                            );
                            sheet.cells.push(CellNode {
                                coord,
                                value,
                                formula,
                                style,
                            });
                        } else {
                            sheet.notes.push(SourceNote {
                                kind: DiagnosticKind::InvalidRange,
                                location: attr_string(e, b"r"),
                                message: format!(
                                    "cell in row {current_row} has no usable reference and was skipped"
                                ),
                            });
                        }
                    }

                    b"mergeCell" => {
                        if let Some(reference) = attr_string(e, b"ref") {
                            sheet.merges.push(reference);
                        }
                    }

                    b"autoFilter" => {
                        sheet.auto_filter = attr_string(e, b"ref");
                        if is_start {
                            skip_element(&mut xml)?;
                        }
                    }

                    b"dataValidation" => {
                        let dv = DataValidationNode {
                            sqref: attr_string(e, b"sqref").unwrap_or_default(),
                            kind: attr_string(e, b"type"),
                            operator: attr_string(e, b"operator"),
                            formula1: None,
                            formula2: None,
                            allow_blank: attr_bool_default(e, b"allowBlank", false),
                            hide_dropdown: attr_bool_default(e, b"showDropDown", false),
                            show_input_message: attr_bool_default(e, b"showInputMessage", false),
                            show_error_message: attr_bool_default(e, b"showErrorMessage", false),
                            prompt_title: attr_string(e, b"promptTitle"),
                            prompt: attr_string(e, b"prompt"),
                            error_title: attr_string(e, b"errorTitle"),
                            error: attr_string(e, b"error"),
                            error_style: attr_string(e, b"errorStyle"),
                        };
                        if is_start {
                            current_dv = Some(dv);
                        } else {
                            sheet.data_validations.push(dv);
                        }
                    }
                    b"formula1" if is_start => {
                        let text = read_text(&mut xml)?;
                        if let Some(dv) = current_dv.as_mut() {
                            dv.formula1 = Some(text);
                        }
                    }
                    b"formula2" if is_start => {
                        let text = read_text(&mut xml)?;
                        if let Some(dv) = current_dv.as_mut() {
                            dv.formula2 = Some(text);
                        }
                    }

                    b"conditionalFormatting" => {
                        let block = ConditionalFormatNode {
                            sqref: attr_string(e, b"sqref").unwrap_or_default(),
                            rules: Vec::new(),
                        };
                        if is_start {
                            current_cf = Some(block);
                        }
                    }
                    b"cfRule" => {
                        let rule = parse_cf_rule(e);
                        match (is_start, current_cf.as_mut()) {
                            (true, _) => current_rule = Some(rule),
                            (false, Some(block)) => block.rules.push(rule),
                            (false, None) => {}
                        }
                    }
                    b"formula" if is_start => {
                        let text = read_text(&mut xml)?;
                        if let Some(rule) = current_rule.as_mut() {
                            rule.formulas.push(text);
                        }
                    }
                    b"colorScale" => in_color_scale = is_start,
                    b"dataBar" => in_data_bar = is_start,
                    b"iconSet" => {
                        if let Some(rule) = current_rule.as_mut() {
                            rule.icon_set = attr_string(e, b"iconSet");
                        }
                    }
                    b"color" => {
                        if let (Some(rule), Some(color)) =
                            (current_rule.as_mut(), parse_color_attrs(e))
                        {
                            if in_color_scale {
                                rule.color_scale.push(color);
                            } else if in_data_bar {
                                rule.data_bar_color = Some(color);
                            }
                        }
                    }

                    b"hyperlink" => {
                        if let Some(reference) = attr_string(e, b"ref") {
                            let target = attr_string_local(e, b"id")
                                .and_then(|id| rels.get(&id))
                                .map(|rel| rel.target.clone());
                            sheet.hyperlinks.push(HyperlinkNode {
                                reference,
                                target,
                                location: attr_string(e, b"location"),
                                display: attr_string(e, b"display"),
                                tooltip: attr_string(e, b"tooltip"),
                            });
                        }
                    }

                    b"pageMargins" => {
                        let defaults = PageMargins::default();
                        sheet.margins = Some(PageMargins {
                            left: attr_f64(e, b"left").unwrap_or(defaults.left),
                            right: attr_f64(e, b"right").unwrap_or(defaults.right),
                            top: attr_f64(e, b"top").unwrap_or(defaults.top),
                            bottom: attr_f64(e, b"bottom").unwrap_or(defaults.bottom),
                            header: attr_f64(e, b"header").unwrap_or(defaults.header),
                            footer: attr_f64(e, b"footer").unwrap_or(defaults.footer),
                        });
                    }

                    b"printOptions" => {
                        sheet.print_gridlines = attr_bool_default(e, b"gridLines", false);
                        sheet.print_headings = attr_bool_default(e, b"headings", false);
                    }

                    b"pageSetup" => {
                        sheet.page_setup = Some(PageSetupNode {
                            orientation: match attr_string(e, b"orientation").as_deref() {
                                Some("landscape") => Some(Orientation::Landscape),
                                Some("portrait") => Some(Orientation::Portrait),
                                _ => None,
                            },
                            paper_size: attr_u32(e, b"paperSize"),
                            scale: attr_u32(e, b"scale"),
                            fit_to_width: attr_u32(e, b"fitToWidth"),
                            fit_to_height: attr_u32(e, b"fitToHeight"),
                        });
                    }

                    b"headerFooter" => {
                        let hf = HeaderFooter {
                            different_odd_even: attr_bool_default(e, b"differentOddEven", false),
                            different_first: attr_bool_default(e, b"differentFirst", false),
                            ..HeaderFooter::default()
                        };
                        if is_start {
                            header_footer = Some(hf);
                        } else {
                            sheet.header_footer = Some(hf);
                        }
                    }
                    part @ (b"oddHeader" | b"oddFooter" | b"evenHeader" | b"evenFooter"
                    | b"firstHeader" | b"firstFooter")
                        if is_start =>
                    {
                        let text = Some(read_text(&mut xml)?).filter(|t| !t.is_empty());
                        if let Some(hf) = header_footer.as_mut() {
                            match part {
                                b"oddHeader" => hf.odd_header = text,
                                b"oddFooter" => hf.odd_footer = text,
                                b"evenHeader" => hf.even_header = text,
                                b"evenFooter" => hf.even_footer = text,
                                b"firstHeader" => hf.first_header = text,
                                _ => hf.first_footer = text,
                            }
                        }
                    }

                    b"drawing" => {
                        if let Some(id) = attr_string_local(e, b"id") {
                            drawing_ids.push(id);
                        }
                    }

                    // Extension lists repeat validations and formats in a
                    // different schema
                    b"extLst" if is_start => skip_element(&mut xml)?,

                    _ => {}
                }
            }

            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"sheetPr" => in_sheet_pr = false,
                b"sheetView" => in_first_view = false,
                b"dataValidation" => sheet.data_validations.extend(current_dv.take()),
                b"cfRule" => {
                    if let (Some(block), Some(rule)) = (current_cf.as_mut(), current_rule.take()) {
                        block.rules.push(rule);
                    }
                }
                b"conditionalFormatting" => sheet.conditional_formats.extend(current_cf.take()),
                b"colorScale" => in_color_scale = false,
                b"dataBar" => in_data_bar = false,
                b"headerFooter" => sheet.header_footer = header_footer.take(),
                _ => {}
            },

            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!(
                    "worksheet {name} is malformed after {} cells",
                    sheet.cells.len()
                );
                return Err(e.into());
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(ParsedSheet {
        node: sheet,
        drawing_ids,
    })
}

/// Read the children of a `<c>` element through its end tag.
fn read_cell_content<R: BufRead>(xml: &mut Reader<R>) -> Result<CellContent> {
    let mut content = CellContent::default();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_start = matches!(event, Event::Start(_));
                match e.local_name().as_ref() {
                    b"v" if is_start => content.value = Some(read_text(xml)?),
                    b"is" if is_start => content.inline = Some(read_rich_text(xml)?),
                    b"f" => {
                        if attr_string(e, b"t").as_deref() == Some("shared") {
                            content.shared_index = attr_u32(e, b"si");
                        }
                        if is_start {
                            content.formula = Some(read_text(xml)?).filter(|f| !f.is_empty());
                        }
                    }
                    _ if is_start => skip_element(xml)?,
                    _ => {}
                }
            }
            Ok(Event::End(_)) => break,
            Ok(Event::Eof) => return Err(unclosed_element()),
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(content)
}

/// Interpret a cell's `<v>` text by its type tag. Text that does not fit
/// the tag is kept as a string and noted.
fn cell_value(
    tag: CellTypeTag,
    value: Option<String>,
    inline: Option<String>,
    shared_strings: &[String],
    coord: CellRef,
    notes: &mut Vec<SourceNote>,
) -> RawValue {
    let Some(value) = value else {
        return inline.map_or(RawValue::Empty, RawValue::Text);
    };

    let mut invalid = |what: &str, value: String| {
        notes.push(SourceNote {
            kind: DiagnosticKind::InvalidCellValue,
            location: Some(coord.to_string()),
            message: format!("{what} {value:?}; kept as text"),
        });
        RawValue::Text(value)
    };

    match tag {
        CellTypeTag::SharedString => {
            let text = value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared_strings.get(i));
            match text {
                Some(text) => RawValue::Text(text.clone()),
                None => invalid("shared string index out of range:", value),
            }
        }
        CellTypeTag::Boolean => RawValue::Bool(matches!(value.trim(), "1" | "true")),
        CellTypeTag::Error => RawValue::Error(value),
        CellTypeTag::InlineString | CellTypeTag::FormulaString => RawValue::Text(value),
        CellTypeTag::Date => match parse_iso_datetime(&value) {
            Some(date) => RawValue::Date(date),
            None => invalid("date cell is not ISO 8601:", value),
        },
        CellTypeTag::Number if value.trim().is_empty() => RawValue::Empty,
        CellTypeTag::Number => match value.trim().parse::<f64>() {
            Ok(number) => RawValue::Number(number),
            Err(_) => invalid("numeric cell is not a number:", value),
        },
    }
}

fn outline_level(e: &BytesStart<'_>) -> Option<u8> {
    attr_u32(e, b"outlineLevel")
        .and_then(|l| u8::try_from(l).ok())
        .filter(|l| *l > 0)
}

fn parse_cf_rule(e: &BytesStart<'_>) -> CfRuleNode {
    CfRuleNode {
        rule_type: attr_string(e, b"type").unwrap_or_default(),
        priority: attr_i32(e, b"priority"),
        operator: attr_string(e, b"operator"),
        stop_if_true: attr_bool_default(e, b"stopIfTrue", false),
        text: attr_string(e, b"text"),
        time_period: attr_string(e, b"timePeriod"),
        rank: attr_u32(e, b"rank"),
        percent: attr_bool_default(e, b"percent", false),
        bottom: attr_bool_default(e, b"bottom", false),
        above_average: attr_bool(e, b"aboveAverage"),
        dxf: attr_u32(e, b"dxfId"),
        ..CfRuleNode::default()
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
    use crate::source::RawColor;
    use crate::parser::relationships::parse_relationships;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheetPr><tabColor rgb="FF00B050"/></sheetPr>
  <dimension ref="A1:C4"/>
  <sheetViews>
    <sheetView tabSelected="1" zoomScale="125" showGridLines="0" workbookViewId="0">
      <pane xSplit="1" ySplit="2" topLeftCell="B3" activePane="bottomRight" state="frozen"/>
    </sheetView>
  </sheetViews>
  <sheetFormatPr defaultRowHeight="15" defaultColWidth="9.5"/>
  <cols><col min="2" max="3" width="20.7109375" customWidth="1" outlineLevel="1"/></cols>
  <sheetData>
    <row r="1" ht="24" customHeight="1">
      <c r="A1" s="1" t="s"><v>0</v></c>
      <c r="B1"><f>SUM(B2:B3)</f><v>42</v></c>
      <c t="b"><v>1</v></c>
    </row>
    <row r="2" hidden="1">
      <c r="A2" t="inlineStr"><is><t>inline</t></is></c>
      <c r="B2"><f t="shared" ref="B2:B4" si="0">A2*2</f><v>2</v></c>
      <c r="C2" t="e"><v>#DIV/0!</v></c>
    </row>
    <row r="4">
      <c r="B4"><f t="shared" si="0"/><v>8</v></c>
      <c r="C4" t="str"><f>"x"&amp;"y"</f><v>xy</v></c>
      <c r="D4" s="2"/>
    </row>
  </sheetData>
  <autoFilter ref="A1:C4"><filterColumn colId="0"/></autoFilter>
  <mergeCells count="1"><mergeCell ref="A3:B3"/></mergeCells>
  <conditionalFormatting sqref="B2:B4">
    <cfRule type="cellIs" dxfId="0" priority="2" operator="greaterThan"><formula>5</formula></cfRule>
    <cfRule type="colorScale" priority="1"><colorScale><cfvo type="min"/><cfvo type="max"/><color rgb="FFF8696B"/><color theme="9"/></colorScale></cfRule>
  </conditionalFormatting>
  <dataValidations count="1">
    <dataValidation type="list" allowBlank="1" showErrorMessage="1" sqref="A1:A10"><formula1>"Yes,No"</formula1></dataValidation>
  </dataValidations>
  <hyperlinks>
    <hyperlink ref="A1" r:id="rId1" tooltip="Docs"/>
    <hyperlink ref="A2" location="Sheet2!A1"/>
  </hyperlinks>
  <printOptions gridLines="1"/>
  <pageMargins left="0.5" right="0.5" top="1" bottom="1" header="0.3" footer="0.3"/>
  <pageSetup orientation="landscape" paperSize="9" fitToWidth="1"/>
  <headerFooter differentFirst="1"><oddHeader>&amp;CReport</oddHeader></headerFooter>
  <drawing r:id="rId2"/>
  <extLst><ext uri="{CCE6A557-97BC-4b89-ADB6-D9C93CAAB3DF}"><x14:dataValidations xmlns:x14="x"><x14:dataValidation type="list"/></x14:dataValidations></ext></extLst>
</worksheet>"#;

    const RELS: &str = r#"<Relationships>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/>
</Relationships>"#;

    fn parse() -> ParsedSheet {
        let rels = parse_relationships(RELS.as_bytes(), "xl/worksheets/sheet1.xml").unwrap();
        parse_sheet(
            SHEET.as_bytes(),
            "Data",
            SheetState::Visible,
            &["Total".to_string()],
            &rels,
        )
        .unwrap()
    }

    fn parse_rows(rows: &str) -> Result<ParsedSheet> {
        let xml = format!(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{rows}</sheetData></worksheet>"#
        );
        parse_sheet(
            xml.as_bytes(),
            "Data",
            SheetState::Visible,
            &["only".to_string()],
            &Relationships::default(),
        )
    }

    fn cell<'a>(sheet: &'a SheetNode, reference: &str) -> &'a CellNode {
        let coord = CellRef::parse(reference).unwrap();
        sheet.cells.iter().find(|c| c.coord == coord).unwrap()
    }

    #[test]
    fn test_cell_values() {
        let sheet = parse().node;
        assert_eq!(sheet.cells.len(), 9);

        let a1 = cell(&sheet, "A1");
        assert_eq!(a1.value, RawValue::Text("Total".into()));
        assert_eq!(a1.style, Some(StyleRef::Index(1)));

        let b1 = cell(&sheet, "B1");
        assert_eq!(b1.value, RawValue::Number(42.0));
        assert_eq!(b1.formula.as_deref(), Some("SUM(B2:B3)"));

        // No r attribute: follows B1
        assert_eq!(cell(&sheet, "C1").value, RawValue::Bool(true));
        assert_eq!(cell(&sheet, "A2").value, RawValue::Text("inline".into()));
        assert_eq!(cell(&sheet, "C2").value, RawValue::Error("#DIV/0!".into()));
        assert_eq!(cell(&sheet, "C4").value, RawValue::Text("xy".into()));
        assert_eq!(cell(&sheet, "C4").formula.as_deref(), Some("\"x\"&\"y\""));

        let d4 = cell(&sheet, "D4");
        assert_eq!(d4.value, RawValue::Empty);
        assert_eq!(d4.style, Some(StyleRef::Index(2)));
    }

    #[test]
    fn test_shared_formula_expanded() {
        let sheet = parse().node;
        assert_eq!(cell(&sheet, "B2").formula.as_deref(), Some("A2*2"));
        assert_eq!(cell(&sheet, "B4").formula.as_deref(), Some("A4*2"));
    }

    #[test]
    fn test_structure() {
        let sheet = parse().node;
        assert_eq!(sheet.tab_color, Some(RawColor::Rgb("FF00B050".into())));

        let view = sheet.view.as_ref().unwrap();
        assert_eq!(view.zoom, Some(125));
        assert!(!view.show_grid_lines);
        assert!(view.selected);

        let pane = sheet.pane.as_ref().unwrap();
        assert_eq!(pane.state, PaneState::Frozen);
        assert_eq!(pane.x_split, 1.0);
        assert_eq!(pane.y_split, 2.0);

        assert_eq!(sheet.default_column_width, Some(9.5));
        assert_eq!(sheet.columns[0].width, Some(20.710_937_5));
        assert_eq!(sheet.columns[0].outline_level, Some(1));
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].height, Some(24.0));
        assert!(sheet.rows[1].hidden);

        assert_eq!(sheet.merges, vec!["A3:B3"]);
        assert_eq!(sheet.auto_filter.as_deref(), Some("A1:C4"));
    }

    #[test]
    fn test_rules() {
        let sheet = parse().node;

        assert_eq!(sheet.data_validations.len(), 1);
        let dv = &sheet.data_validations[0];
        assert_eq!(dv.kind.as_deref(), Some("list"));
        assert_eq!(dv.formula1.as_deref(), Some("\"Yes,No\""));
        assert!(dv.allow_blank);
        assert!(dv.show_error_message);

        assert_eq!(sheet.conditional_formats.len(), 1);
        let rules = &sheet.conditional_formats[0].rules;
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].dxf, Some(0));
        assert_eq!(rules[0].formulas, vec!["5"]);
        assert_eq!(rules[1].color_scale.len(), 2);
        assert_eq!(rules[1].color_scale[1], RawColor::Theme { index: 9, tint: 0.0 });
    }

    #[test]
    fn test_links_page_and_drawings() {
        let parsed = parse();
        let sheet = &parsed.node;

        assert_eq!(sheet.hyperlinks.len(), 2);
        assert_eq!(sheet.hyperlinks[0].target.as_deref(), Some("https://example.com"));
        assert_eq!(sheet.hyperlinks[0].tooltip.as_deref(), Some("Docs"));
        assert_eq!(sheet.hyperlinks[1].target, None);
        assert_eq!(sheet.hyperlinks[1].location.as_deref(), Some("Sheet2!A1"));

        assert_eq!(sheet.margins.as_ref().unwrap().top, 1.0);
        assert!(sheet.print_gridlines);
        assert!(!sheet.print_headings);
        let setup = sheet.page_setup.as_ref().unwrap();
        assert_eq!(setup.orientation, Some(Orientation::Landscape));
        assert_eq!(setup.paper_size, Some(9));
        let hf = sheet.header_footer.as_ref().unwrap();
        assert_eq!(hf.odd_header.as_deref(), Some("&CReport"));
        assert!(hf.different_first);

        assert_eq!(parsed.drawing_ids, vec!["rId2"]);
    }

    #[test]
    fn test_mismatched_end_tag_fails() {
        let result = parse_rows(r#"<row r="1"><c r="A1"><v>1</v></c></rowx>"#);
        assert!(matches!(result, Err(crate::error::XlcanonError::Xml(_))));
    }

    #[test]
    fn test_truncated_cell_fails() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1"><v>1</v>"#;
        let result = parse_sheet(
            xml.as_bytes(),
            "Data",
            SheetState::Visible,
            &[],
            &Relationships::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_shared_string_out_of_range_keeps_raw_text() {
        let sheet = parse_rows(r#"<row r="1"><c r="A1" t="s"><v>7</v></c></row>"#)
            .unwrap()
            .node;
        assert_eq!(cell(&sheet, "A1").value, RawValue::Text("7".into()));
        assert_eq!(sheet.notes.len(), 1);
        assert_eq!(sheet.notes[0].kind, DiagnosticKind::InvalidCellValue);
        assert_eq!(sheet.notes[0].location.as_deref(), Some("A1"));
    }

    #[test]
    fn test_iso_date_cells() {
        let sheet = parse_rows(
            r#"<row r="1"><c r="A1" t="d"><v>2024-03-15T10:30:00</v></c><c r="B1" t="d"><v>not a date</v></c></row>"#,
        )
        .unwrap()
        .node;

        let expected = chrono::NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(cell(&sheet, "A1").value, RawValue::Date(expected));
        assert_eq!(cell(&sheet, "B1").value, RawValue::Text("not a date".into()));
        assert_eq!(sheet.notes.len(), 1);
        assert_eq!(sheet.notes[0].location.as_deref(), Some("B1"));
    }

    #[test]
    fn test_unreadable_cell_reference_is_noted() {
        let sheet = parse_rows(r#"<row r="1"><c r="??"><v>1</v></c></row>"#)
            .unwrap()
            .node;
        assert!(sheet.cells.is_empty());
        assert_eq!(sheet.notes[0].kind, DiagnosticKind::InvalidRange);
    }
}
