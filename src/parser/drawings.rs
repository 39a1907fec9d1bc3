//! Drawing part parsing (xl/drawings/drawingN.xml).
//!
//! Only pictures and chart frames are read; other shapes carry nothing the
//! canonical model keeps.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::cell_ref::CellRef;
use crate::error::Result;
use crate::types::{Anchor, AnchorPoint};
use crate::xml_helpers::{attr_i64, attr_string, attr_string_local, read_text};

/// What an anchor holds, by relationship id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum DrawingObject {
    /// `r:embed` of the picture's blip.
    Picture { embed_id: Option<String> },
    /// `r:id` of the chart part.
    Chart { rel_id: Option<String> },
}

/// One anchored object from a drawing part.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct DrawingItem {
    pub anchor: Anchor,
    pub name: Option<String>,
    pub description: Option<String>,
    pub object: DrawingObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnchorKind {
    TwoCell,
    OneCell,
    Absolute,
}

#[derive(Debug, Default, Clone, Copy)]
struct Marker {
    col: u32,
    row: u32,
    col_offset: i64,
    row_offset: i64,
}

impl Marker {
    fn point(self) -> AnchorPoint {
        AnchorPoint {
            cell: CellRef::from_zero_based(self.col, self.row),
            col_offset: self.col_offset,
            row_offset: self.row_offset,
        }
    }
}

#[derive(Debug)]
struct DrawingBuilder {
    kind: AnchorKind,
    from: Marker,
    to: Marker,
    extent: Option<(i64, i64)>,
    position: Option<(i64, i64)>,
    name: Option<String>,
    description: Option<String>,
    object: Option<DrawingObject>,
}

impl DrawingBuilder {
    fn new(kind: AnchorKind) -> Self {
        Self {
            kind,
            from: Marker::default(),
            to: Marker::default(),
            extent: None,
            position: None,
            name: None,
            description: None,
            object: None,
        }
    }

    fn build(self) -> Option<DrawingItem> {
        let object = self.object?;
        let (width, height) = self.extent.unwrap_or((0, 0));
        let anchor = match self.kind {
            AnchorKind::TwoCell => Anchor::TwoCell {
                from: self.from.point(),
                to: self.to.point(),
            },
            AnchorKind::OneCell => Anchor::OneCell {
                from: self.from.point(),
                width,
                height,
            },
            AnchorKind::Absolute => {
                let (x, y) = self.position.unwrap_or((0, 0));
                Anchor::Absolute {
                    x,
                    y,
                    width,
                    height,
                }
            }
        };
        Some(DrawingItem {
            anchor,
            name: self.name,
            description: self.description,
            object,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerSlot {
    From,
    To,
}

/// Parse a drawing part into anchored pictures and charts, in document order.
#[allow(clippy::too_many_lines)]
pub(super) fn parse_drawing<R: BufRead>(reader: R) -> Result<Vec<DrawingItem>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut items = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<DrawingBuilder> = None;
    let mut marker: Option<MarkerSlot> = None;
    // Depth inside the anchored object; its own transforms are not the anchor's
    let mut object_depth = 0usize;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_start = matches!(event, Event::Start(_));
                let local_name = e.local_name();

                if object_depth > 0 {
                    if is_start {
                        object_depth += 1;
                    }
                    let Some(drawing) = current.as_mut() else {
                        buf.clear();
                        continue;
                    };
                    match local_name.as_ref() {
                        b"cNvPr" if drawing.name.is_none() => {
                            drawing.name = attr_string(e, b"name");
                            drawing.description = attr_string(e, b"descr");
                        }
                        b"blip" => {
                            if let Some(DrawingObject::Picture { embed_id }) =
                                drawing.object.as_mut()
                            {
                                if embed_id.is_none() {
                                    *embed_id = attr_string_local(e, b"embed");
                                }
                            }
                        }
                        b"chart" => {
                            if let Some(DrawingObject::Chart { rel_id }) = drawing.object.as_mut()
                            {
                                if rel_id.is_none() {
                                    *rel_id = attr_string_local(e, b"id");
                                }
                            }
                        }
                        _ => {}
                    }
                    buf.clear();
                    continue;
                }

                match local_name.as_ref() {
                    b"twoCellAnchor" => current = Some(DrawingBuilder::new(AnchorKind::TwoCell)),
                    b"oneCellAnchor" => current = Some(DrawingBuilder::new(AnchorKind::OneCell)),
                    b"absoluteAnchor" => {
                        current = Some(DrawingBuilder::new(AnchorKind::Absolute));
                    }
                    b"from" => marker = Some(MarkerSlot::From),
                    b"to" => marker = Some(MarkerSlot::To),
                    name @ (b"col" | b"row" | b"colOff" | b"rowOff") if is_start => {
                        let text = read_text(&mut xml)?;
                        if let (Some(drawing), Some(slot)) = (current.as_mut(), marker) {
                            let target = match slot {
                                MarkerSlot::From => &mut drawing.from,
                                MarkerSlot::To => &mut drawing.to,
                            };
                            let text = text.trim();
                            match name {
                                b"col" => target.col = text.parse().unwrap_or(0),
                                b"row" => target.row = text.parse().unwrap_or(0),
                                b"colOff" => target.col_offset = text.parse().unwrap_or(0),
                                _ => target.row_offset = text.parse().unwrap_or(0),
                            }
                        }
                    }
                    b"ext" => {
                        if let Some(drawing) = current.as_mut() {
                            drawing.extent = Some((
                                attr_i64(e, b"cx").unwrap_or(0),
                                attr_i64(e, b"cy").unwrap_or(0),
                            ));
                        }
                    }
                    b"pos" => {
                        if let Some(drawing) = current.as_mut() {
                            drawing.position = Some((
                                attr_i64(e, b"x").unwrap_or(0),
                                attr_i64(e, b"y").unwrap_or(0),
                            ));
                        }
                    }
                    kind @ (b"pic" | b"graphicFrame" | b"sp" | b"grpSp" | b"cxnSp") => {
                        if let Some(drawing) = current.as_mut() {
                            if drawing.object.is_none() {
                                drawing.object = match kind {
                                    b"pic" => Some(DrawingObject::Picture { embed_id: None }),
                                    b"graphicFrame" => Some(DrawingObject::Chart { rel_id: None }),
                                    _ => None,
                                };
                            }
                        }
                        if is_start {
                            object_depth = 1;
                        }
                    }
                    _ => {}
                }
            }

            Ok(Event::End(ref e)) => {
                if object_depth > 0 {
                    object_depth -= 1;
                } else {
                    match e.local_name().as_ref() {
                        b"from" | b"to" => marker = None,
                        b"twoCellAnchor" | b"oneCellAnchor" | b"absoluteAnchor" => {
                            items.extend(current.take().and_then(DrawingBuilder::build));
                        }
                        _ => {}
                    }
                }
            }

            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}
