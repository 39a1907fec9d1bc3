//! Workbook-level parts: xl/workbook.xml and the docProps property parts.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::Result;
use crate::source::{DefinedNameNode, RawProperties};
use crate::types::SheetState;
use crate::xml_helpers::{attr_bool_default, attr_string, attr_string_local, attr_u32, read_text};

/// A `<sheet>` entry, before its part is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SheetEntry {
    pub name: String,
    pub rel_id: Option<String>,
    pub state: SheetState,
}

/// Contents of xl/workbook.xml.
#[derive(Debug, Default)]
pub(super) struct WorkbookPart {
    pub sheets: Vec<SheetEntry>,
    pub date_1904: bool,
    pub defined_names: Vec<DefinedNameNode>,
    pub active_sheet: Option<u32>,
    pub calculation_mode: Option<String>,
}

impl WorkbookPart {
    /// Print area text for the sheet at tab position `index`.
    pub fn print_area(&self, index: usize) -> Option<&str> {
        self.sheet_name("_xlnm.Print_Area", index)
    }

    /// Print titles text for the sheet at tab position `index`.
    pub fn print_titles(&self, index: usize) -> Option<&str> {
        self.sheet_name("_xlnm.Print_Titles", index)
    }

    fn sheet_name(&self, name: &str, index: usize) -> Option<&str> {
        let index = u32::try_from(index).ok()?;
        self.defined_names
            .iter()
            .find(|dn| dn.name == name && dn.local_sheet == Some(index))
            .map(|dn| dn.value.as_str())
    }
}

/// Parse workbook.xml content
///
/// Handles:
/// - `<sheet name="Sheet1" sheetId="1" state="hidden" r:id="rId1"/>`
/// - `<workbookPr date1904="1"/>`
/// - `<workbookView activeTab="2"/>`
/// - `<calcPr calcMode="manual"/>`
/// - `<definedName name="_xlnm.Print_Area" localSheetId="0">Sheet1!$A$1:$D$10</definedName>`
pub(super) fn parse_workbook_xml<R: BufRead>(reader: R) -> Result<WorkbookPart> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut part = WorkbookPart::default();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_start = matches!(event, Event::Start(_));
                match e.local_name().as_ref() {
                    b"sheet" => {
                        if let Some(entry) = parse_sheet_element(e) {
                            part.sheets.push(entry);
                        }
                    }
                    b"workbookPr" => {
                        part.date_1904 = attr_bool_default(e, b"date1904", false);
                    }
                    b"calcPr" => {
                        part.calculation_mode = attr_string(e, b"calcMode");
                    }
                    b"workbookView" => {
                        if part.active_sheet.is_none() {
                            part.active_sheet = Some(attr_u32(e, b"activeTab").unwrap_or(0));
                        }
                    }
                    b"definedName" => {
                        let name = attr_string(e, b"name").unwrap_or_default();
                        let local_sheet = attr_u32(e, b"localSheetId");
                        let hidden = attr_bool_default(e, b"hidden", false);
                        let value = if is_start {
                            read_text(&mut xml)?
                        } else {
                            String::new()
                        };
                        if !name.is_empty() {
                            part.defined_names.push(DefinedNameNode {
                                name,
                                value,
                                local_sheet,
                                hidden,
                            });
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(part)
}

fn parse_sheet_element(e: &BytesStart<'_>) -> Option<SheetEntry> {
    let name = attr_string(e, b"name").filter(|n| !n.is_empty())?;
    Some(SheetEntry {
        name,
        // r:id is namespace prefixed
        rel_id: attr_string_local(e, b"id"),
        state: attr_string(e, b"state")
            .as_deref()
            .map(SheetState::from_str_val)
            .unwrap_or_default(),
    })
}

/// Fill `props` from docProps/core.xml.
pub(super) fn parse_core_properties<R: BufRead>(
    reader: R,
    props: &mut RawProperties,
) -> Result<()> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let slot = match e.local_name().as_ref() {
                    b"title" => Some(&mut props.title),
                    b"subject" => Some(&mut props.subject),
                    b"creator" => Some(&mut props.creator),
                    b"keywords" => Some(&mut props.keywords),
                    b"description" => Some(&mut props.description),
                    b"lastModifiedBy" => Some(&mut props.last_modified_by),
                    b"created" => Some(&mut props.created),
                    b"modified" => Some(&mut props.modified),
                    b"category" => Some(&mut props.category),
                    b"contentStatus" => Some(&mut props.content_status),
                    _ => None,
                };
                if let Some(slot) = slot {
                    *slot = non_empty(read_text(&mut xml)?);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Fill `props` from docProps/app.xml.
pub(super) fn parse_app_properties<R: BufRead>(
    reader: R,
    props: &mut RawProperties,
) -> Result<()> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Application" {
                    props.application = non_empty(read_text(&mut xml)?);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
