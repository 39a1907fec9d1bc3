//! Parsing of xl/styles.xml into the style arena.
//!
//! `cellXfs` become records `0..n` and `cellStyleXfs` become records
//! `n..n+m`, so a cell format's `xfId` turns into a parent link the resolver
//! can walk.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::Result;
use crate::source::{
    RawAlignment, RawBorder, RawBorderSide, RawDxf, RawFill, RawFont, RawProtection, StyleRecord,
    StyleTable,
};
use crate::types::{BorderStyle, HAlign, PatternType, Rgb, UnderlineStyle, VAlign, VertAlign};
use crate::xml_helpers::{
    attr_bool, attr_bool_default, attr_i32, attr_string, attr_u32, attr_val, attr_val_f64,
    parse_color_attrs,
};

/// Everything styles.xml contributes to the workbook tree.
#[derive(Debug, Default)]
pub(super) struct ParsedStyles {
    pub table: StyleTable,
    /// Replacement for the standard indexed palette, when the file has one.
    pub indexed_colors: Option<Vec<Rgb>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XfList {
    Cell,
    CellStyle,
}

/// Parsed `<xf>` before parent indices are rebased.
#[derive(Debug, Default)]
struct Xf {
    record: StyleRecord,
    xf_id: Option<u32>,
}

/// Parse styles.xml content
#[allow(clippy::too_many_lines)]
#[allow(clippy::cognitive_complexity)]
pub(super) fn parse_styles<R: BufRead>(reader: R) -> Result<ParsedStyles> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut table = StyleTable::default();
    let mut cell_xfs: Vec<Xf> = Vec::new();
    let mut cell_style_xfs: Vec<Xf> = Vec::new();
    let mut indexed_colors: Vec<Rgb> = Vec::new();
    let mut buf = Vec::new();

    let mut in_num_fmts = false;
    let mut in_fonts = false;
    let mut in_fills = false;
    let mut in_borders = false;
    let mut in_indexed_colors = false;
    let mut xf_list: Option<XfList> = None;

    let mut current_font: Option<RawFont> = None;
    let mut current_fill: Option<RawFill> = None;
    let mut current_border: Option<RawBorder> = None;
    let mut current_side: Option<String> = None;
    let mut current_xf: Option<Xf> = None;
    let mut current_dxf: Option<RawDxf> = None;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.local_name();
                let name_str = std::str::from_utf8(name.as_ref()).unwrap_or("");

                match name_str {
                    "numFmts" => in_num_fmts = true,
                    "fonts" => in_fonts = true,
                    "fills" => in_fills = true,
                    "borders" => in_borders = true,
                    "cellXfs" => xf_list = Some(XfList::Cell),
                    "cellStyleXfs" => xf_list = Some(XfList::CellStyle),
                    "indexedColors" => in_indexed_colors = true,

                    "dxf" => {
                        current_dxf = Some(RawDxf::default());
                        if is_empty {
                            table.dxfs.extend(current_dxf.take());
                        }
                    }

                    "rgbColor" if in_indexed_colors => {
                        if let Some(rgb) = attr_string(e, b"rgb").and_then(|s| Rgb::from_hex(&s))
                        {
                            indexed_colors.push(rgb);
                        }
                    }

                    "numFmt" => {
                        if let (Some(id), Some(code)) =
                            (attr_u32(e, b"numFmtId"), attr_string(e, b"formatCode"))
                        {
                            if let Some(dxf) = current_dxf.as_mut() {
                                dxf.num_fmt_code = Some(code);
                            } else if in_num_fmts {
                                table.num_fmts.insert(id, code);
                            }
                        }
                    }

                    "font" if in_fonts || current_dxf.is_some() => {
                        current_font = Some(RawFont::default());
                        if is_empty {
                            finish_font(&mut table, &mut current_dxf, current_font.take());
                        }
                    }
                    "sz" => {
                        if let Some(font) = current_font.as_mut() {
                            font.size = attr_val_f64(e);
                        }
                    }
                    "name" | "rFont" => {
                        if let Some(font) = current_font.as_mut() {
                            font.name = attr_val(e);
                        }
                    }
                    "b" => {
                        if let Some(font) = current_font.as_mut() {
                            font.bold = attr_bool_default(e, b"val", true);
                        }
                    }
                    "i" => {
                        if let Some(font) = current_font.as_mut() {
                            font.italic = attr_bool_default(e, b"val", true);
                        }
                    }
                    "strike" => {
                        if let Some(font) = current_font.as_mut() {
                            font.strike = attr_bool_default(e, b"val", true);
                        }
                    }
                    "u" => {
                        if let Some(font) = current_font.as_mut() {
                            font.underline = UnderlineStyle::from_str_val(attr_val(e).as_deref());
                        }
                    }
                    "vertAlign" => {
                        if let Some(font) = current_font.as_mut() {
                            font.vert_align = attr_val(e).as_deref().and_then(VertAlign::from_str_val);
                        }
                    }

                    "fill" if in_fills || current_dxf.is_some() => {
                        current_fill = Some(RawFill::default());
                        if is_empty {
                            finish_fill(&mut table, &mut current_dxf, current_fill.take());
                        }
                    }
                    "patternFill" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.pattern = attr_string(e, b"patternType")
                                .map(|p| PatternType::from_str_val(&p));
                        }
                    }
                    "gradientFill" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.pattern = Some(PatternType::Gradient);
                        }
                    }
                    "fgColor" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.foreground = parse_color_attrs(e);
                        }
                    }
                    "bgColor" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.background = parse_color_attrs(e);
                        }
                    }

                    "border" if in_borders || current_dxf.is_some() => {
                        let border = RawBorder {
                            diagonal_up: attr_bool_default(e, b"diagonalUp", false),
                            diagonal_down: attr_bool_default(e, b"diagonalDown", false),
                            ..RawBorder::default()
                        };
                        if is_empty {
                            finish_border(&mut table, &mut current_dxf, Some(border));
                        } else {
                            current_border = Some(border);
                        }
                    }
                    "left" | "right" | "top" | "bottom" | "diagonal" | "start" | "end" => {
                        if let Some(border) = current_border.as_mut() {
                            let side = attr_string(e, b"style").map(|s| RawBorderSide {
                                style: BorderStyle::from_str_val(&s),
                                color: None,
                            });
                            if let Some(slot) = border_side(border, name_str) {
                                *slot = side;
                            }
                            if !is_empty {
                                current_side = Some(name_str.to_string());
                            }
                        }
                    }

                    "color" => {
                        let color = parse_color_attrs(e);
                        if let (Some(border), Some(side_name)) =
                            (current_border.as_mut(), current_side.as_deref())
                        {
                            if let Some(Some(side)) = border_side(border, side_name) {
                                side.color = color;
                            }
                        } else if let Some(font) = current_font.as_mut() {
                            font.color = color;
                        }
                    }

                    "xf" => {
                        if let Some(list) = xf_list {
                            let xf = parse_xf(e, list);
                            if is_empty {
                                push_xf(&mut cell_xfs, &mut cell_style_xfs, list, xf);
                            } else {
                                current_xf = Some(xf);
                            }
                        }
                    }

                    "alignment" => {
                        let alignment = RawAlignment {
                            horizontal: attr_string(e, b"horizontal")
                                .as_deref()
                                .and_then(HAlign::from_str_val),
                            vertical: attr_string(e, b"vertical")
                                .as_deref()
                                .and_then(VAlign::from_str_val),
                            wrap: attr_bool_default(e, b"wrapText", false),
                            shrink_to_fit: attr_bool_default(e, b"shrinkToFit", false),
                            indent: attr_u32(e, b"indent"),
                            rotation: attr_i32(e, b"textRotation"),
                        };
                        if let Some(xf) = current_xf.as_mut() {
                            xf.record.alignment = Some(alignment);
                        }
                    }

                    "protection" => {
                        if let Some(xf) = current_xf.as_mut() {
                            xf.record.protection = Some(RawProtection {
                                locked: attr_bool(e, b"locked"),
                                hidden: attr_bool(e, b"hidden"),
                            });
                        }
                    }

                    _ => {}
                }
            }

            Ok(Event::End(ref e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"numFmts" => in_num_fmts = false,
                    b"fonts" => in_fonts = false,
                    b"fills" => in_fills = false,
                    b"borders" => in_borders = false,
                    b"cellXfs" | b"cellStyleXfs" => xf_list = None,
                    b"indexedColors" => in_indexed_colors = false,
                    b"font" => finish_font(&mut table, &mut current_dxf, current_font.take()),
                    b"fill" => finish_fill(&mut table, &mut current_dxf, current_fill.take()),
                    b"border" => {
                        current_side = None;
                        finish_border(&mut table, &mut current_dxf, current_border.take());
                    }
                    b"left" | b"right" | b"top" | b"bottom" | b"diagonal" | b"start" | b"end" => {
                        current_side = None;
                    }
                    b"xf" => {
                        if let (Some(list), Some(xf)) = (xf_list, current_xf.take()) {
                            push_xf(&mut cell_xfs, &mut cell_style_xfs, list, xf);
                        }
                    }
                    b"dxf" => table.dxfs.extend(current_dxf.take()),
                    _ => {}
                }
            }

            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!(
                    "styles.xml is malformed after {} cell formats",
                    cell_xfs.len()
                );
                return Err(e.into());
            }
            _ => {}
        }
        buf.clear();
    }

    table.records = link_records(cell_xfs, cell_style_xfs);
    if !table.records.is_empty() {
        table.default_record = Some(0);
    }

    Ok(ParsedStyles {
        table,
        indexed_colors: (!indexed_colors.is_empty()).then_some(indexed_colors),
    })
}

fn parse_xf(e: &BytesStart, list: XfList) -> Xf {
    // A cell format only overrides its named style where it applies the
    // component; `applyX="0"` leaves the component to the parent.
    let component = |id: &[u8], apply: &[u8]| match list {
        XfList::Cell if attr_bool(e, apply) == Some(false) && attr_u32(e, b"xfId").is_some() => {
            None
        }
        _ => attr_u32(e, id),
    };

    Xf {
        record: StyleRecord {
            parent: None,
            font: component(b"fontId", b"applyFont"),
            fill: component(b"fillId", b"applyFill"),
            border: component(b"borderId", b"applyBorder"),
            num_fmt: component(b"numFmtId", b"applyNumberFormat"),
            alignment: None,
            protection: None,
        },
        xf_id: match list {
            XfList::Cell => attr_u32(e, b"xfId"),
            XfList::CellStyle => None,
        },
    }
}

fn push_xf(cell_xfs: &mut Vec<Xf>, cell_style_xfs: &mut Vec<Xf>, list: XfList, xf: Xf) {
    match list {
        XfList::Cell => cell_xfs.push(xf),
        XfList::CellStyle => cell_style_xfs.push(xf),
    }
}

/// Flatten both xf lists into one arena, rebasing `xfId` links.
fn link_records(cell_xfs: Vec<Xf>, cell_style_xfs: Vec<Xf>) -> Vec<StyleRecord> {
    let base = u32::try_from(cell_xfs.len()).unwrap_or(u32::MAX);
    let style_count = u32::try_from(cell_style_xfs.len()).unwrap_or(0);

    cell_xfs
        .into_iter()
        .map(|xf| StyleRecord {
            parent: xf
                .xf_id
                .filter(|id| *id < style_count)
                .and_then(|id| base.checked_add(id)),
            ..xf.record
        })
        .chain(cell_style_xfs.into_iter().map(|xf| xf.record))
        .collect()
}

fn border_side<'b>(border: &'b mut RawBorder, name: &str) -> Option<&'b mut Option<RawBorderSide>> {
    match name {
        "left" | "start" => Some(&mut border.left),
        "right" | "end" => Some(&mut border.right),
        "top" => Some(&mut border.top),
        "bottom" => Some(&mut border.bottom),
        "diagonal" => Some(&mut border.diagonal),
        _ => None,
    }
}

fn finish_font(table: &mut StyleTable, dxf: &mut Option<RawDxf>, font: Option<RawFont>) {
    let Some(font) = font else { return };
    match dxf.as_mut() {
        Some(dxf) => dxf.font = Some(font),
        None => table.fonts.push(font),
    }
}

fn finish_fill(table: &mut StyleTable, dxf: &mut Option<RawDxf>, fill: Option<RawFill>) {
    let Some(fill) = fill else { return };
    match dxf.as_mut() {
        Some(dxf) => dxf.fill = Some(fill),
        None => table.fills.push(fill),
    }
}

fn finish_border(table: &mut StyleTable, dxf: &mut Option<RawDxf>, border: Option<RawBorder>) {
    let Some(border) = border else { return };
    match dxf.as_mut() {
        Some(dxf) => dxf.border = Some(border),
        None => table.borders.push(border),
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

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy-mm-dd"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><i val="0"/><u/><sz val="14"/><color rgb="FFFF0000"/><name val="Arial"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor theme="4" tint="0.5"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border diagonalUp="1"><left style="thin"><color indexed="8"/></left><right/><top/><bottom style="double"/><diagonal/></border>
  </borders>
  <cellStyleXfs count="2">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="0"/>
  </cellStyleXfs>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="164" fontId="0" fillId="0" borderId="1" xfId="1" applyFont="0" applyFill="0" applyNumberFormat="1">
      <alignment horizontal="center" wrapText="1" textRotation="90"/>
      <protection locked="0"/>
    </xf>
    <xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="7"/>
  </cellXfs>
  <dxfs count="1">
    <dxf><font><b/><color rgb="FF9C0006"/></font><fill><patternFill><bgColor rgb="FFFFC7CE"/></patternFill></fill></dxf>
  </dxfs>
  <colors><indexedColors><rgbColor rgb="FF000000"/><rgbColor rgb="FFFFFFFF"/></indexedColors></colors>
</styleSheet>"#;

    #[test]
    fn test_components_parsed() {
        let parsed = parse_styles(STYLES.as_bytes()).unwrap();
        let table = &parsed.table;

        assert_eq!(table.num_fmts.get(&164).map(String::as_str), Some("yyyy-mm-dd"));
        assert_eq!(table.fonts.len(), 2);
        let bold = &table.fonts[1];
        assert!(bold.bold);
        assert!(!bold.italic);
        assert_eq!(bold.underline, Some(UnderlineStyle::Single));
        assert_eq!(bold.size, Some(14.0));
        assert_eq!(bold.color, Some(RawColor::Rgb("FFFF0000".into())));
        assert_eq!(table.fonts[0].color, Some(RawColor::Theme { index: 1, tint: 0.0 }));

        assert_eq!(table.fills.len(), 3);
        assert_eq!(table.fills[2].pattern, Some(PatternType::Solid));
        assert_eq!(
            table.fills[2].foreground,
            Some(RawColor::Theme { index: 4, tint: 0.5 })
        );
        assert_eq!(table.fills[2].background, Some(RawColor::Indexed(64)));

        let border = &table.borders[1];
        assert!(border.diagonal_up);
        let left = border.left.as_ref().unwrap();
        assert_eq!(left.style, BorderStyle::Thin);
        assert_eq!(left.color, Some(RawColor::Indexed(8)));
        assert_eq!(border.bottom.as_ref().unwrap().style, BorderStyle::Double);
        assert!(border.right.is_none());
    }

    #[test]
    fn test_records_link_to_named_styles() {
        let table = parse_styles(STYLES.as_bytes()).unwrap().table;

        assert_eq!(table.records.len(), 5);
        assert_eq!(table.default_record, Some(0));
        assert_eq!(table.records[0].parent, Some(3));

        let styled = &table.records[1];
        assert_eq!(styled.parent, Some(4));
        assert_eq!(styled.font, None);
        assert_eq!(styled.fill, None);
        assert_eq!(styled.num_fmt, Some(164));
        assert_eq!(styled.border, Some(1));
        let alignment = styled.alignment.as_ref().unwrap();
        assert_eq!(alignment.horizontal, Some(HAlign::Center));
        assert!(alignment.wrap);
        assert_eq!(alignment.rotation, Some(90));
        assert_eq!(styled.protection.unwrap().locked, Some(false));

        // xfId past the end of cellStyleXfs has no parent
        assert_eq!(table.records[2].parent, None);
        assert_eq!(table.records[4].font, Some(1));
    }

    #[test]
    fn test_dxfs_and_indexed_colors() {
        let parsed = parse_styles(STYLES.as_bytes()).unwrap();
        let dxf = &parsed.table.dxfs[0];
        let font = dxf.font.as_ref().unwrap();
        assert!(font.bold);
        assert_eq!(font.color, Some(RawColor::Rgb("FF9C0006".into())));
        assert_eq!(
            dxf.fill.as_ref().unwrap().background,
            Some(RawColor::Rgb("FFFFC7CE".into()))
        );
        // dxf parts are not added to the shared lists
        assert_eq!(parsed.table.fonts.len(), 2);
        assert_eq!(parsed.table.fills.len(), 3);

        assert_eq!(parsed.indexed_colors, Some(vec![Rgb::BLACK, Rgb::WHITE]));
    }

    #[test]
    fn test_empty_stylesheet() {
        let parsed = parse_styles(&b"<styleSheet/>"[..]).unwrap();
        assert!(parsed.table.records.is_empty());
        assert_eq!(parsed.table.default_record, None);
        assert!(parsed.indexed_colors.is_none());
    }

    #[test]
    fn test_malformed_stylesheet_is_an_error() {
        let xml = r#"<styleSheet><fonts count="1"><font><b/></fnt></fonts><cellXfs count="1"><xf fontId="0"/></cellXfs></styleSheet>"#;
        assert!(matches!(
            parse_styles(xml.as_bytes()),
            Err(crate::error::XlcanonError::Xml(_))
        ));
    }
}
