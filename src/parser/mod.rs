//! OpenXML container reader
//!
//! Walks the package from its root relationships and builds the
//! [`WorkbookNode`] tree the engine consumes. Parts that are optional in the
//! package (theme, styles, shared strings, properties, drawings) fall back to
//! defaults when absent; worksheet parts named by the workbook must exist.

mod charts;
mod comments;
mod drawings;
mod relationships;
mod shared_formula;
mod shared_strings;
mod styles;
mod theme;
mod workbook;
mod worksheet;

use std::io::{Cursor, Read, Seek};

use zip::result::ZipError;
use zip::ZipArchive;

use crate::config::AnalysisOptions;
use crate::error::{Result, XlcanonError};
use crate::source::{
    ChartNode, OpenXmlContainer, Palette, PictureNode, RawProperties, ShapeNode, StyleTable,
    WorkbookMeta, WorkbookNode,
};

use drawings::{parse_drawing, DrawingObject};
use relationships::{parse_relationships, rels_path_for, ContentTypes, Relationships};

const DEFAULT_WORKBOOK_PATH: &str = "xl/workbook.xml";

/// Read an `.xlsx` package with default options.
///
/// Fails when the bytes are not a zip archive, a part cannot be
/// decompressed, an XML part is malformed, or a worksheet the workbook lists
/// has no part. A package without a workbook part yields a container whose
/// metadata is missing.
pub fn open(data: &[u8]) -> Result<OpenXmlContainer> {
    open_with(data, &AnalysisOptions::default())
}

/// Read an `.xlsx` package. Media parts larger than
/// `options.max_image_bytes` are not decompressed; only their size is kept.
pub fn open_with(data: &[u8], options: &AnalysisOptions) -> Result<OpenXmlContainer> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let content_types = match read_part(&mut archive, "[Content_Types].xml")? {
        Some(bytes) => ContentTypes::parse(bytes.as_slice())
            .map_err(malformed("[Content_Types].xml"))?,
        None => ContentTypes::default(),
    };
    let root_rels = read_rels(&mut archive, "")?;
    let workbook_path = root_rels
        .first_of_kind("officeDocument")
        .unwrap_or(DEFAULT_WORKBOOK_PATH)
        .to_string();
    let workbook_rels = read_rels(&mut archive, &workbook_path)?;

    let mut palette = Palette::office();
    if let Some(path) = workbook_rels.first_of_kind("theme") {
        if let Some(bytes) = read_part(&mut archive, path)? {
            palette.theme =
                Some(theme::parse_theme_colors(bytes.as_slice()).map_err(malformed(path))?);
        }
    }

    let mut style_table = StyleTable::default();
    if let Some(path) = workbook_rels.first_of_kind("styles") {
        if let Some(bytes) = read_part(&mut archive, path)? {
            let parsed = styles::parse_styles(bytes.as_slice()).map_err(malformed(path))?;
            style_table = parsed.table;
            // A custom palette replaces the standard entries it covers
            for (slot, rgb) in palette
                .indexed
                .iter_mut()
                .zip(parsed.indexed_colors.unwrap_or_default())
            {
                *slot = rgb;
            }
        }
    }

    let mut shared_strings = Vec::new();
    if let Some(path) = workbook_rels.first_of_kind("sharedStrings") {
        if let Some(bytes) = read_part(&mut archive, path)? {
            shared_strings =
                shared_strings::parse_shared_strings(bytes.as_slice()).map_err(malformed(path))?;
        }
    }

    let Some(workbook_bytes) = read_part(&mut archive, &workbook_path)? else {
        log::warn!("package has no workbook part at {workbook_path}");
        return Ok(OpenXmlContainer::new(WorkbookNode {
            metadata: None,
            styles: style_table,
            palette,
            sheets: Vec::new(),
        }));
    };
    let workbook_part = workbook::parse_workbook_xml(workbook_bytes.as_slice())
        .map_err(malformed(&workbook_path))?;
    let properties = read_properties(&mut archive, &root_rels)?;

    let mut sheets = Vec::with_capacity(workbook_part.sheets.len());
    for (index, entry) in workbook_part.sheets.iter().enumerate() {
        let sheet_path = entry
            .rel_id
            .as_deref()
            .and_then(|id| workbook_rels.get(id))
            .filter(|rel| !rel.external)
            .map_or_else(
                || format!("xl/worksheets/sheet{}.xml", index + 1),
                |rel| rel.target.clone(),
            );
        let bytes = read_part(&mut archive, &sheet_path)?.ok_or_else(|| {
            XlcanonError::Container(format!(
                "worksheet part {sheet_path} for sheet '{}' is missing",
                entry.name
            ))
        })?;
        let sheet_rels = read_rels(&mut archive, &sheet_path)?;

        let parsed = worksheet::parse_sheet(
            bytes.as_slice(),
            &entry.name,
            entry.state,
            &shared_strings,
            &sheet_rels,
        )
        .map_err(malformed(&sheet_path))?;
        let mut node = parsed.node;
        node.print_area = workbook_part.print_area(index).map(str::to_string);
        node.print_titles = workbook_part.print_titles(index).map(str::to_string);

        for path in sheet_rels.all_of_kind("comments") {
            if let Some(bytes) = read_part(&mut archive, path)? {
                node.comments
                    .extend(comments::parse_comments(bytes.as_slice()).map_err(malformed(path))?);
            }
        }

        for id in &parsed.drawing_ids {
            let Some(rel) = sheet_rels.get(id).filter(|rel| !rel.external) else {
                log::warn!("sheet '{}' has a drawing {id} with no target", entry.name);
                continue;
            };
            node.shapes.extend(read_drawing(
                &mut archive,
                &rel.target,
                &content_types,
                options.max_image_bytes,
            )?);
        }

        log::debug!(
            "read sheet '{}' from {sheet_path}: {} cells, {} shapes",
            node.name,
            node.cells.len(),
            node.shapes.len()
        );
        sheets.push(node);
    }

    Ok(OpenXmlContainer::new(WorkbookNode {
        metadata: Some(WorkbookMeta {
            properties,
            date_1904: workbook_part.date_1904,
            defined_names: workbook_part.defined_names,
            active_sheet: workbook_part.active_sheet,
            calculation_mode: workbook_part.calculation_mode,
        }),
        styles: style_table,
        palette,
        sheets,
    }))
}

/// Logs which part failed before the error is passed up.
fn malformed(path: &str) -> impl FnOnce(XlcanonError) -> XlcanonError + '_ {
    move |e| {
        log::warn!("part {path} is malformed: {e}");
        e
    }
}

/// Bytes of a package part, or `None` when the package has no such part.
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(path.trim_start_matches('/')) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    // The declared size comes from the archive and is not trusted
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// A media part, loaded only when it fits under the size ceiling.
#[derive(Debug)]
enum Media {
    Loaded(Vec<u8>),
    TooLarge(usize),
    Missing,
}

fn read_media<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
    max_bytes: usize,
) -> Result<Media> {
    let mut file = match archive.by_name(path.trim_start_matches('/')) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(Media::Missing),
        Err(e) => return Err(e.into()),
    };
    let declared = usize::try_from(file.size()).unwrap_or(usize::MAX);
    if declared > max_bytes {
        log::debug!("media {path} declares {declared} bytes; not decompressed");
        return Ok(Media::TooLarge(declared));
    }

    // Reads one byte past the ceiling so an understated size is caught
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    file.by_ref().take(limit).read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        log::warn!("media {path} declares {declared} bytes but holds more");
        return Ok(Media::TooLarge(bytes.len()));
    }
    Ok(Media::Loaded(bytes))
}

/// Relationships of `part_path`; the package root when it is empty.
fn read_rels<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part_path: &str,
) -> Result<Relationships> {
    let rels_path = if part_path.is_empty() {
        "_rels/.rels".to_string()
    } else {
        rels_path_for(part_path)
    };
    match read_part(archive, &rels_path)? {
        Some(bytes) => {
            parse_relationships(bytes.as_slice(), part_path).map_err(malformed(&rels_path))
        }
        None => Ok(Relationships::default()),
    }
}

fn read_properties<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    root_rels: &Relationships,
) -> Result<RawProperties> {
    let mut properties = RawProperties::default();
    let core = root_rels
        .first_of_kind("core-properties")
        .unwrap_or("docProps/core.xml");
    if let Some(bytes) = read_part(archive, core)? {
        workbook::parse_core_properties(bytes.as_slice(), &mut properties)
            .map_err(malformed(core))?;
    }
    let app = root_rels
        .first_of_kind("extended-properties")
        .unwrap_or("docProps/app.xml");
    if let Some(bytes) = read_part(archive, app)? {
        workbook::parse_app_properties(bytes.as_slice(), &mut properties)
            .map_err(malformed(app))?;
    }
    Ok(properties)
}

/// Pictures and charts of one drawing part, with media bytes and chart
/// parts loaded.
fn read_drawing<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    drawing_path: &str,
    content_types: &ContentTypes,
    max_media_bytes: usize,
) -> Result<Vec<ShapeNode>> {
    let Some(bytes) = read_part(archive, drawing_path)? else {
        log::warn!("drawing part {drawing_path} is missing");
        return Ok(Vec::new());
    };
    let rels = read_rels(archive, drawing_path)?;
    let target = |id: Option<String>| {
        id.and_then(|id| rels.get(&id))
            .filter(|rel| !rel.external)
            .map(|rel| rel.target.clone())
    };

    let mut shapes = Vec::new();
    for item in parse_drawing(bytes.as_slice()).map_err(malformed(drawing_path))? {
        match item.object {
            DrawingObject::Picture { embed_id } => {
                let path = target(embed_id);
                let media = match path.as_deref() {
                    Some(p) => read_media(archive, p, max_media_bytes)?,
                    None => Media::Missing,
                };
                let (data, declared_size) = match media {
                    Media::Loaded(data) => (Some(data), None),
                    Media::TooLarge(size) => (None, Some(size)),
                    Media::Missing => (None, None),
                };
                shapes.push(ShapeNode::Picture(PictureNode {
                    anchor: item.anchor,
                    name: item.name,
                    description: item.description,
                    content_type: path
                        .as_deref()
                        .and_then(|p| content_types.get(p))
                        .map(str::to_string),
                    source_name: path,
                    data,
                    declared_size,
                }));
            }
            DrawingObject::Chart { rel_id } => {
                let path = target(rel_id);
                let bytes = match path.as_deref() {
                    Some(p) => read_part(archive, p)?,
                    None => None,
                };
                let mut chart = match bytes {
                    Some(bytes) => charts::parse_chart(bytes.as_slice()),
                    None => ChartNode {
                        error: Some(format!(
                            "chart part {} is missing",
                            path.as_deref().unwrap_or("(unresolved)")
                        )),
                        ..ChartNode::default()
                    },
                };
                chart.anchor = Some(item.anchor);
                chart.name = item.name;
                shapes.push(ShapeNode::Chart(chart));
            }
        }
    }
    Ok(shapes)
}
