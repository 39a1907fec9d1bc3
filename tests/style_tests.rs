//! Tests for style resolution and color normalization.
//!
//! Cells reference records in the style table; records inherit unset
//! components from their parent. Resolved formatting is shared: every cell
//! resolving the same record points at one allocation.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;
mod fixtures;

use common::{analyze, analyze_with, cell, inline_styled, openxml, styled, text_cell, tree};
use fixtures::{SheetBuilder, StyleBuilder, XlsxBuilder};
use proptest::prelude::*;
use xlcanon::color::{apply_tint, normalize, renormalize};
use xlcanon::source::{
    LegacyContainer, OpenXmlContainer, Palette, RawColor, RawFont, SheetNode, StyleRecord,
};
use xlcanon::{AnalysisOptions, BorderStyle, Color, HAlign, Rgb, Stage, XlcanonError};

// ============================================================================
// Fonts, fills, borders, alignment
// ============================================================================

#[test]
fn test_resolved_components() {
    let style = StyleBuilder::new()
        .bold()
        .italic()
        .font_color("C00000")
        .bg_color("DDEBF7")
        .border_all("thin")
        .align_horizontal("center");
    let xlsx = XlsxBuilder::new()
        .sheet(SheetBuilder::new("Sheet1").cell("A1", "styled", Some(style)))
        .build();
    let workbook = analyze(&xlsx);
    let f = &cell(&workbook, 0, "A1").formatting;

    assert!(f.font.bold);
    assert!(f.font.italic);
    assert_eq!(f.font.name.as_deref(), Some("Calibri"));
    assert_eq!(f.font.size, Some(11.0));
    assert_eq!(f.font.color.as_ref().and_then(Color::resolved).unwrap().to_hex(), "#C00000");
    assert_eq!(f.fill.pattern, xlcanon::PatternType::Solid);
    assert_eq!(f.fill.foreground.as_ref().and_then(Color::resolved).unwrap().to_hex(), "#DDEBF7");
    assert_eq!(f.border.left.style, BorderStyle::Thin);
    assert_eq!(f.border.bottom.style, BorderStyle::Thin);
    assert_eq!(f.border.diagonal.style, BorderStyle::None);
    assert_eq!(f.alignment.horizontal, Some(HAlign::Center));
}

#[test]
fn test_unstyled_cell_uses_workbook_default() {
    let workbook = analyze(&fixtures::two_sheet_xlsx());
    let b1 = cell(&workbook, 0, "B1");
    assert!(!b1.formatting.font.bold);
    assert_eq!(b1.formatting.font.name.as_deref(), Some("Calibri"));
    assert_eq!(b1.formatting.number_format.code, "General");
}

// ============================================================================
// Sharing
// ============================================================================

/// Cells with the same style share one resolved formatting.
#[test]
fn test_same_style_shares_allocation() {
    let bold = StyleBuilder::new().bold();
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .cell("A1", "one", Some(bold.clone()))
                .cell("A2", "two", Some(bold))
                .cell("A3", "three", Some(StyleBuilder::new().italic()))
                .cell("A4", "plain", None)
                .cell("A5", "plain too", None),
        )
        .build();
    let workbook = analyze(&xlsx);

    let a1 = &cell(&workbook, 0, "A1").formatting;
    let a2 = &cell(&workbook, 0, "A2").formatting;
    let a3 = &cell(&workbook, 0, "A3").formatting;
    assert!(a1.ptr_eq(a2));
    assert!(!a1.ptr_eq(a3));
    assert!(cell(&workbook, 0, "A4").formatting.ptr_eq(&cell(&workbook, 0, "A5").formatting));
}

/// With a single resolver the sharing extends across worksheets.
#[test]
fn test_sequential_sharing_across_sheets() {
    let bold = StyleBuilder::new().bold();
    let xlsx = XlsxBuilder::new()
        .sheet(SheetBuilder::new("One").cell("A1", "x", Some(bold.clone())))
        .sheet(SheetBuilder::new("Two").cell("A1", "y", Some(bold)))
        .build();
    let workbook = analyze_with(&xlsx, &AnalysisOptions::sequential());

    assert!(cell(&workbook, 0, "A1")
        .formatting
        .ptr_eq(&cell(&workbook, 1, "A1").formatting));
}

// ============================================================================
// Inheritance and cycles
// ============================================================================

#[test]
fn test_child_inherits_unset_components() {
    let mut node = tree(Vec::new());
    node.styles.records.push(StyleRecord {
        parent: Some(1),
        num_fmt: Some(4),
        ..StyleRecord::default()
    });
    let mut sheet = SheetNode::new("Sheet1");
    sheet.cells.push(styled(common::number_cell("A1", 1234.5), 2));
    node.sheets.push(sheet);

    let workbook = xlcanon::analyze(&OpenXmlContainer::new(node), &AnalysisOptions::default())
        .unwrap();
    let f = &cell(&workbook, 0, "A1").formatting;
    assert!(f.font.bold, "font comes from the parent record");
    assert_eq!(f.number_format.code, "#,##0.00");
}

/// A parent chain that loops is fatal, tagged with the cells stage of the
/// sheet that reached it.
#[test]
fn test_cyclic_style_is_fatal() {
    let mut node = tree(Vec::new());
    node.styles.records.push(StyleRecord {
        parent: Some(3),
        ..StyleRecord::default()
    });
    node.styles.records.push(StyleRecord {
        parent: Some(2),
        ..StyleRecord::default()
    });
    let mut sheet = SheetNode::new("Loop");
    sheet.cells.push(styled(text_cell("A1", "x"), 2));
    node.sheets.push(sheet);

    let err = xlcanon::analyze(&OpenXmlContainer::new(node), &AnalysisOptions::default())
        .unwrap_err();
    assert!(matches!(
        err.root(),
        XlcanonError::CyclicStyleReference { style: 2, .. }
    ));
    assert_eq!(err.stage(), Some(Stage::Cells));
}

#[test]
fn test_cyclic_default_style_fails_in_styles_stage() {
    let mut node = tree(vec![SheetNode::new("Sheet1")]);
    node.styles.records[0].parent = Some(0);

    let err = xlcanon::analyze(&OpenXmlContainer::new(node), &AnalysisOptions::default())
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Styles));
}

#[test]
fn test_overlong_chain_is_rejected() {
    let mut node = tree(Vec::new());
    // 2 -> 3 -> ... -> 9 -> 0
    for i in 2..10u32 {
        node.styles.records.push(StyleRecord {
            parent: Some(if i == 9 { 0 } else { i + 1 }),
            ..StyleRecord::default()
        });
    }
    let mut sheet = SheetNode::new("Deep");
    sheet.cells.push(styled(text_cell("A1", "x"), 2));
    node.sheets.push(sheet);
    let container = OpenXmlContainer::new(node);

    let tight = AnalysisOptions {
        max_style_hops: 4,
        ..AnalysisOptions::default()
    };
    assert!(xlcanon::analyze(&container, &tight).is_err());
    assert!(xlcanon::analyze(&container, &AnalysisOptions::default()).is_ok());
}

// ============================================================================
// Colors
// ============================================================================

/// Theme colors keep their slot and tint and carry the resolved value.
#[test]
fn test_theme_font_color() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .cell("A1", "plain accent", Some(StyleBuilder::new().theme_font_color(4, 0.0)))
                .cell("A2", "lighter", Some(StyleBuilder::new().theme_font_color(4, 0.4))),
        )
        .build();
    let workbook = analyze(&xlsx);

    match cell(&workbook, 0, "A1").formatting.font.color.as_ref().unwrap() {
        Color::Theme { index, tint, rgb } => {
            assert_eq!(*index, 4);
            assert_eq!(*tint, 0.0);
            assert_eq!(rgb.unwrap().to_hex(), "#4472C4");
        }
        other => panic!("expected a theme color, got {other:?}"),
    }

    let lighter = cell(&workbook, 0, "A2")
        .formatting
        .font
        .color
        .as_ref()
        .and_then(Color::resolved)
        .unwrap();
    let base = Rgb::from_hex("4472C4").unwrap();
    assert!(lighter.r >= base.r && lighter.g >= base.g && lighter.b >= base.b);
    assert_ne!(lighter, base);
}

#[test]
fn test_custom_theme_palette() {
    let mut colors: Vec<String> = [
        "FFFFFF", "000000", "EEECE1", "1F497D", "4F81BD", "C0504D", "9BBB59", "8064A2", "4BACC6",
        "F79646", "0000FF", "800080",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    colors[5] = "123456".to_string();
    let xlsx = XlsxBuilder::new()
        .theme_colors(colors)
        .sheet(SheetBuilder::new("Sheet1").cell(
            "A1",
            "x",
            Some(StyleBuilder::new().theme_font_color(5, 0.0)),
        ))
        .build();
    let workbook = analyze(&xlsx);
    let color = cell(&workbook, 0, "A1").formatting.font.color.clone().unwrap();
    assert_eq!(color.resolved().unwrap().to_hex(), "#123456");
}

#[test]
fn test_indexed_colors() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .cell("A1", "red", Some(StyleBuilder::new().indexed_font_color(10)))
                .cell("A2", "system", Some(StyleBuilder::new().indexed_font_color(64))),
        )
        .build();
    let workbook = analyze(&xlsx);

    assert_eq!(
        cell(&workbook, 0, "A1").formatting.font.color,
        Some(Color::Indexed {
            index: 10,
            rgb: Some(Rgb::new(0xFF, 0, 0)),
        })
    );
    assert_eq!(cell(&workbook, 0, "A2").formatting.font.color, Some(Color::Auto));
}

/// Legacy workbooks have no theme, so theme colors carry no resolved value.
#[test]
fn test_legacy_theme_color_is_unresolved() {
    let mut sheet = SheetNode::new("Sheet1");
    sheet.cells.push(inline_styled(
        text_cell("A1", "x"),
        RawFont {
            color: Some(RawColor::Theme { index: 4, tint: 0.0 }),
            ..RawFont::default()
        },
    ));
    let container = LegacyContainer::new(tree(vec![sheet]));
    let workbook = xlcanon::analyze(&container, &AnalysisOptions::default()).unwrap();

    match cell(&workbook, 0, "A1").formatting.font.color.as_ref().unwrap() {
        Color::Theme { index, rgb, .. } => {
            assert_eq!(*index, 4);
            assert!(rgb.is_none());
        }
        other => panic!("expected a theme color, got {other:?}"),
    }
}

#[test]
fn test_inline_style_on_openxml_tree() {
    let mut sheet = SheetNode::new("Sheet1");
    sheet.cells.push(inline_styled(
        text_cell("B2", "inline"),
        RawFont {
            italic: true,
            color: Some(RawColor::Rgb("FF00B050".to_string())),
            ..RawFont::default()
        },
    ));
    let workbook = xlcanon::analyze(&openxml(vec![sheet]), &AnalysisOptions::default()).unwrap();
    let f = &cell(&workbook, 0, "B2").formatting;
    assert!(f.font.italic);
    assert_eq!(f.font.color.as_ref().and_then(Color::resolved).unwrap().to_hex(), "#00B050");
}

fn raw_color_strategy() -> impl Strategy<Value = RawColor> {
    prop_oneof![
        any::<[u8; 3]>().prop_map(|[r, g, b]| RawColor::Rgb(format!("FF{r:02X}{g:02X}{b:02X}"))),
        (0u32..14, -1.0f64..=1.0).prop_map(|(index, tint)| RawColor::Theme { index, tint }),
        (0u32..70).prop_map(RawColor::Indexed),
        Just(RawColor::Auto),
    ]
}

proptest! {
    /// Normalizing an already normalized color changes nothing.
    #[test]
    fn prop_normalize_is_idempotent(raw in raw_color_strategy()) {
        for palette in [Palette::office(), Palette::standard()] {
            let once = normalize(&raw, &palette);
            prop_assert_eq!(renormalize(&once, &palette), once);
        }
    }

    /// A zero tint returns the base color exactly.
    #[test]
    fn prop_zero_tint_is_identity(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
        let base = Rgb::new(r, g, b);
        prop_assert_eq!(apply_tint(base, 0.0), base);
    }

    /// Tinting toward white never darkens a channel.
    #[test]
    fn prop_positive_tint_lightens(r in any::<u8>(), g in any::<u8>(), b in any::<u8>(), tint in 0.0f64..=1.0) {
        let base = Rgb::new(r, g, b);
        let lighter = apply_tint(base, tint);
        let luma = |c: Rgb| u32::from(c.r) + u32::from(c.g) + u32::from(c.b);
        // HSL round trips can lose a unit per channel
        prop_assert!(luma(lighter) + 3 >= luma(base));
    }
}
