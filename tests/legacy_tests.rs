//! Tests for legacy (BIFF) containers.
//!
//! A legacy reader hands the engine the same tree as the OpenXML reader, but
//! the container declares conditional formatting, charts and theme colors
//! unsupported. The engine reports each once and leaves those features empty.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;
mod fixtures;

use common::{cell, count_diagnostics, number_cell, sheet, styled, text_cell, tree};
use xlcanon::source::{
    CfRuleNode, ConditionalFormatNode, DataValidationNode, LegacyContainer, ParsedContainer,
    SheetNode, WorkbookMeta,
};
use xlcanon::{
    AnalysisOptions, DiagnosticKind, Feature, Severity, SourceFormat, Stage, Support,
    XlcanonError,
};

fn legacy_sheet() -> SheetNode {
    let mut node = SheetNode::new("Budget");
    node.cells.push(styled(text_cell("A1", "Item"), 1));
    node.cells.push(number_cell("B1", 1200.0));
    node.merges.push("A3:B3".to_string());
    node.data_validations.push(DataValidationNode {
        sqref: "B1:B20".to_string(),
        kind: Some("decimal".to_string()),
        operator: Some("greaterThan".to_string()),
        formula1: Some("0".to_string()),
        show_error_message: true,
        ..DataValidationNode::default()
    });
    node.conditional_formats.push(ConditionalFormatNode {
        sqref: "B1:B20".to_string(),
        rules: vec![CfRuleNode {
            rule_type: "cellIs".to_string(),
            priority: Some(1),
            operator: Some("lessThan".to_string()),
            formulas: vec!["0".to_string()],
            ..CfRuleNode::default()
        }],
    });
    node
}

fn analyze_legacy(sheets: Vec<SheetNode>) -> xlcanon::Workbook {
    xlcanon::analyze(
        &LegacyContainer::new(tree(sheets)),
        &AnalysisOptions::default(),
    )
    .unwrap()
}

// ============================================================================
// Capabilities
// ============================================================================

#[test]
fn test_capabilities() {
    let container = LegacyContainer::new(tree(Vec::new()));
    let caps = container.capabilities();

    assert_eq!(container.format(), SourceFormat::Legacy);
    assert_eq!(caps.get(Feature::ConditionalFormatting), Support::Unsupported);
    assert_eq!(caps.get(Feature::Charts), Support::Unsupported);
    assert_eq!(caps.get(Feature::ThemeColors), Support::Unsupported);
    assert_eq!(caps.get(Feature::DataValidation), Support::Supported);
    assert_eq!(caps.get(Feature::Images), Support::Supported);
    assert!(container.palette().theme.is_none());
}

/// Each unsupported feature is reported once, before any sheet diagnostics.
#[test]
fn test_unsupported_features_reported_once() {
    let workbook = analyze_legacy(vec![legacy_sheet(), SheetNode::new("Other")]);

    assert_eq!(workbook.source_format, SourceFormat::Legacy);
    assert_eq!(count_diagnostics(&workbook, DiagnosticKind::UnsupportedFeature), 3);
    for diag in workbook.diagnostics.iter().take(3) {
        assert_eq!(diag.kind, DiagnosticKind::UnsupportedFeature);
        assert_eq!(diag.severity, Severity::Info);
        assert!(diag.sheet.is_none());
    }
}

// ============================================================================
// Feature extraction
// ============================================================================

#[test]
fn test_conditional_formatting_is_empty() {
    let workbook = analyze_legacy(vec![legacy_sheet()]);
    assert!(sheet(&workbook, 0).conditional_formatting.is_empty());
}

#[test]
fn test_supported_features_still_extract() {
    let workbook = analyze_legacy(vec![legacy_sheet()]);
    let ws = sheet(&workbook, 0);

    assert_eq!(ws.name, "Budget");
    assert!(cell(&workbook, 0, "A1").formatting.font.bold);
    assert_eq!(cell(&workbook, 0, "B1").value.as_number(), Some(1200.0));
    assert_eq!(ws.merges.len(), 1);

    assert_eq!(ws.data_validations.len(), 1);
    let rule = &ws.data_validations[0];
    assert_eq!(rule.kind, xlcanon::ValidationKind::Decimal);
    assert_eq!(rule.operator, Some(xlcanon::ComparisonOperator::GreaterThan));
}

/// The same tree read as OpenXML keeps its conditional formatting.
#[test]
fn test_same_tree_as_openxml_keeps_rules() {
    let workbook = xlcanon::analyze(
        &common::openxml(vec![legacy_sheet()]),
        &AnalysisOptions::default(),
    )
    .unwrap();
    assert_eq!(workbook.source_format, SourceFormat::OpenXml);
    assert_eq!(sheet(&workbook, 0).conditional_formatting.len(), 1);
    assert_eq!(count_diagnostics(&workbook, DiagnosticKind::UnsupportedFeature), 0);
}

// ============================================================================
// Metadata
// ============================================================================

#[test]
fn test_missing_metadata_is_fatal() {
    let mut node = tree(vec![legacy_sheet()]);
    node.metadata = None;
    let err = xlcanon::analyze(&LegacyContainer::new(node), &AnalysisOptions::default())
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Metadata));
    assert!(matches!(err.root(), XlcanonError::MissingMetadata(_)));
}

#[test]
fn test_1904_dates() {
    let mut node = tree(Vec::new());
    node.metadata = Some(WorkbookMeta {
        date_1904: true,
        ..WorkbookMeta::default()
    });
    let workbook = xlcanon::analyze(&LegacyContainer::new(node), &AnalysisOptions::default())
        .unwrap();
    assert_eq!(workbook.date_system, xlcanon::DateSystem::Excel1904);
}
