//! Tests for embedded pictures.
//!
//! Pictures live in `xl/drawings/drawingN.xml` as `<xdr:pic>` anchors whose
//! `<a:blip r:embed>` points through the drawing rels at `xl/media/*`.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;
mod fixtures;

use base64::Engine as _;
use common::{analyze, analyze_with, count_diagnostics, openxml, sheet};
use fixtures::{SheetBuilder, XlsxBuilder, TINY_PNG};
use xlcanon::cell_ref::CellRef;
use xlcanon::source::{PictureNode, ShapeNode, SheetNode};
use xlcanon::{
    AnalysisOptions, Anchor, AnchorPoint, DiagnosticKind, ImageFormat, ImagePayload, Severity,
};

fn with_image(data: &[u8]) -> Vec<u8> {
    XlsxBuilder::new()
        .sheet(SheetBuilder::new("Sheet1").image((1, 2), (4, 10), "Logo", data))
        .build()
}

// ============================================================================
// Inline payloads
// ============================================================================

#[test]
fn test_picture_is_extracted() {
    let workbook = analyze(&with_image(TINY_PNG));
    let images = &sheet(&workbook, 0).images;

    assert_eq!(images.len(), 1);
    let image = &images[0];
    assert_eq!(image.name.as_deref(), Some("Logo"));
    assert_eq!(image.format, ImageFormat::Png);
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(image.payload.bytes(), Some(TINY_PNG));
    assert!(workbook.diagnostics.is_empty());
}

#[test]
fn test_picture_anchor() {
    let workbook = analyze(&with_image(TINY_PNG));
    match sheet(&workbook, 0).images[0].anchor {
        Anchor::TwoCell { from, to } => {
            assert_eq!(from.cell.to_string(), "B3");
            assert_eq!(to.cell.to_string(), "E11");
            assert_eq!(from.col_offset, 0);
        }
        other => panic!("expected a two-cell anchor, got {other:?}"),
    }
}

/// Charts and pictures in one drawing each land in their own list.
#[test]
fn test_pictures_and_charts_are_separated() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .image((0, 0), (2, 2), "First", TINY_PNG)
                .chart((3, 0), (8, 12), "Sales", &fixtures::bar_chart_xml("Sales", &[1.0, 2.0]))
                .image((0, 5), (2, 7), "Second", TINY_PNG),
        )
        .build();
    let workbook = analyze(&xlsx);
    let ws = sheet(&workbook, 0);

    let names: Vec<_> = ws.images.iter().filter_map(|i| i.name.as_deref()).collect();
    assert_eq!(names, ["First", "Second"]);
    assert_eq!(ws.charts.len(), 1);
}

#[test]
fn test_payload_serializes_as_base64() {
    let workbook = analyze(&with_image(TINY_PNG));
    let json = serde_json::to_value(&sheet(&workbook, 0).images[0]).unwrap();

    assert_eq!(json["payload"]["kind"], "inline");
    let encoded = json["payload"]["data"].as_str().unwrap();
    assert_eq!(
        base64::engine::general_purpose::STANDARD.decode(encoded).unwrap(),
        TINY_PNG
    );
}

// ============================================================================
// Size ceiling
// ============================================================================

/// Payloads above the ceiling become placeholders with the original size.
#[test]
fn test_oversized_picture_becomes_placeholder() {
    let options = AnalysisOptions {
        max_image_bytes: 32,
        ..AnalysisOptions::default()
    };
    let workbook = analyze_with(&with_image(TINY_PNG), &options);
    let image = &sheet(&workbook, 0).images[0];

    assert_eq!(
        image.payload,
        ImagePayload::Placeholder {
            original_size: TINY_PNG.len()
        }
    );
    assert_eq!(image.format, ImageFormat::Png);
    assert_eq!(count_diagnostics(&workbook, DiagnosticKind::ImageTooLarge), 1);
    assert_eq!(workbook.diagnostics[0].severity, Severity::Warning);
}

/// The ceiling is inclusive.
#[test]
fn test_picture_at_ceiling_is_kept() {
    let options = AnalysisOptions {
        max_image_bytes: TINY_PNG.len(),
        ..AnalysisOptions::default()
    };
    let workbook = analyze_with(&with_image(TINY_PNG), &options);
    assert!(sheet(&workbook, 0).images[0].payload.bytes().is_some());
    assert!(workbook.diagnostics.is_empty());
}

// ============================================================================
// Missing data
// ============================================================================

fn picture(data: Option<Vec<u8>>) -> ShapeNode {
    let point = AnchorPoint {
        cell: CellRef::parse("C4").unwrap(),
        col_offset: 0,
        row_offset: 0,
    };
    ShapeNode::Picture(PictureNode {
        anchor: Anchor::TwoCell {
            from: point,
            to: point,
        },
        name: Some("Broken".to_string()),
        description: None,
        source_name: Some("xl/media/image9.png".to_string()),
        content_type: None,
        data,
        declared_size: None,
    })
}

/// A picture whose bytes are missing is skipped and reported.
#[test]
fn test_missing_picture_data() {
    let mut node = SheetNode::new("Sheet1");
    node.shapes.push(picture(None));
    node.shapes.push(picture(Some(TINY_PNG.to_vec())));

    let workbook = xlcanon::analyze(&openxml(vec![node]), &AnalysisOptions::default()).unwrap();

    assert_eq!(sheet(&workbook, 0).images.len(), 1);
    assert_eq!(count_diagnostics(&workbook, DiagnosticKind::MissingImageData), 1);
    let diag = &workbook.diagnostics[0];
    assert_eq!(diag.location.as_deref(), Some("Broken"));
    assert!(diag.message.contains("xl/media/image9.png"));
}

/// Without magic bytes the format falls back to the part extension.
#[test]
fn test_format_from_extension() {
    let mut node = SheetNode::new("Sheet1");
    node.shapes.push(picture(Some(b"not really a png".to_vec())));

    let workbook = xlcanon::analyze(&openxml(vec![node]), &AnalysisOptions::default()).unwrap();
    let image = &sheet(&workbook, 0).images[0];
    assert_eq!(image.format, ImageFormat::Png);
    assert_eq!(image.mime_type, "image/png");
}
