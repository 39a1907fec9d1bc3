//! Data validation and conditional formatting rules.

use crate::cell_ref::{parse_sqref, CellRange};
use crate::color::normalize;
use crate::source::{CfRuleNode, DataValidationNode, SheetNode};
use crate::styles::StyleResolver;
use crate::types::{
    ComparisonOperator, ConditionalFormattingRule, ConditionalRuleKind, DataValidationRule,
    DiagnosticKind, Diagnostics, RuleVisual, ValidationErrorStyle, ValidationKind,
    ValidationMessage,
};

/// Validation rules in source order. Rules with no usable range are dropped.
pub fn data_validations(sheet: &SheetNode, diags: &mut Diagnostics) -> Vec<DataValidationRule> {
    sheet
        .data_validations
        .iter()
        .filter_map(|dv| {
            let ranges = parse_ranges(&dv.sqref, "data validation", diags)?;
            Some(validation(dv, ranges))
        })
        .collect()
}

fn validation(dv: &DataValidationNode, ranges: Vec<CellRange>) -> DataValidationRule {
    let kind = dv
        .kind
        .as_deref()
        .map(ValidationKind::from_str_val)
        .unwrap_or_default();
    let list_values = match (kind, dv.formula1.as_deref()) {
        (ValidationKind::List, Some(formula)) => parse_list_values(formula),
        _ => Vec::new(),
    };

    DataValidationRule {
        ranges,
        kind,
        operator: dv
            .operator
            .as_deref()
            .and_then(ComparisonOperator::from_str_val),
        formula1: dv.formula1.clone(),
        formula2: dv.formula2.clone(),
        allow_blank: dv.allow_blank,
        show_dropdown: kind == ValidationKind::List && !dv.hide_dropdown,
        prompt: ValidationMessage {
            title: dv.prompt_title.clone(),
            text: dv.prompt.clone(),
            show: dv.show_input_message,
        },
        error: ValidationMessage {
            title: dv.error_title.clone(),
            text: dv.error.clone(),
            show: dv.show_error_message,
        },
        error_style: dv
            .error_style
            .as_deref()
            .map(ValidationErrorStyle::from_str_val)
            .unwrap_or_default(),
        list_values,
    }
}

/// Inline list items from a quoted formula like `"Yes,No,Maybe"`.
/// Range references yield no items.
fn parse_list_values(formula: &str) -> Vec<String> {
    let trimmed = formula.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(|inner| {
            inner
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// One canonical rule per source rule, ordered by priority. Rules without a
/// priority sort after the rest in source order.
pub fn conditional_formatting(
    sheet: &SheetNode,
    resolver: &StyleResolver<'_>,
    diags: &mut Diagnostics,
) -> Vec<ConditionalFormattingRule> {
    let mut rules = Vec::new();

    for block in &sheet.conditional_formats {
        let Some(ranges) = parse_ranges(&block.sqref, "conditional format", diags) else {
            continue;
        };
        for rule in &block.rules {
            rules.push(conditional_rule(rule, &ranges, resolver));
        }
    }

    rules.sort_by_key(|r| r.priority);
    rules
}

fn conditional_rule(
    rule: &CfRuleNode,
    ranges: &[CellRange],
    resolver: &StyleResolver<'_>,
) -> ConditionalFormattingRule {
    let palette = resolver.palette();
    let kind = ConditionalRuleKind::from_str_val(&rule.rule_type);

    let visual = match kind {
        ConditionalRuleKind::ColorScale => Some(RuleVisual::ColorScale {
            colors: rule
                .color_scale
                .iter()
                .map(|c| normalize(c, palette))
                .collect(),
        }),
        ConditionalRuleKind::DataBar => Some(RuleVisual::DataBar {
            color: rule.data_bar_color.as_ref().map(|c| normalize(c, palette)),
        }),
        ConditionalRuleKind::IconSet => Some(RuleVisual::IconSet {
            name: rule
                .icon_set
                .clone()
                .unwrap_or_else(|| "3TrafficLights1".to_string()),
        }),
        _ => None,
    };

    ConditionalFormattingRule {
        ranges: ranges.to_vec(),
        kind,
        priority: rule.priority.unwrap_or(i32::MAX),
        operator: rule
            .operator
            .as_deref()
            .and_then(ComparisonOperator::from_str_val),
        formulas: rule.formulas.clone(),
        stop_if_true: rule.stop_if_true,
        text: rule.text.clone(),
        time_period: rule.time_period.clone(),
        rank: rule.rank,
        percent: rule.percent,
        bottom: rule.bottom,
        above_average: rule.above_average,
        format: rule.dxf.and_then(|i| resolver.resolve_dxf(i)),
        visual,
    }
}

/// Parse an sqref, reporting bad parts. `None` when nothing parsed.
fn parse_ranges(sqref: &str, what: &str, diags: &mut Diagnostics) -> Option<Vec<CellRange>> {
    let (ranges, invalid) = parse_sqref(sqref);
    for part in invalid {
        diags.warn(
            DiagnosticKind::InvalidRange,
            Some(part),
            format!("unparseable {what} range"),
        );
    }
    if ranges.is_empty() {
        log::debug!("skipping {what} with empty sqref {sqref:?}");
        None
    } else {
        Some(ranges)
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
    use crate::source::{ConditionalFormatNode, Palette, RawColor, RawDxf, RawFont, StyleTable};
    use crate::styles::DEFAULT_MAX_HOPS;
    use crate::types::{Color, Rgb};

    #[test]
    fn test_parse_list_values() {
        assert_eq!(parse_list_values("\"Yes,No,Maybe\""), vec!["Yes", "No", "Maybe"]);
        assert_eq!(parse_list_values("\" a , b \""), vec!["a", "b"]);
        assert!(parse_list_values("$A$1:$A$5").is_empty());
        assert!(parse_list_values("\"\"").is_empty());
    }

    #[test]
    fn test_list_validation() {
        let mut sheet = SheetNode::new("S");
        sheet.data_validations = vec![
            DataValidationNode {
                sqref: "A1:A10 C1".into(),
                kind: Some("list".into()),
                formula1: Some("\"Red,Green\"".into()),
                allow_blank: true,
                show_error_message: true,
                error: Some("Pick a color".into()),
                error_style: Some("warning".into()),
                ..DataValidationNode::default()
            },
            DataValidationNode {
                sqref: "ZZZZ0".into(),
                kind: Some("whole".into()),
                ..DataValidationNode::default()
            },
        ];

        let mut diags = Diagnostics::for_sheet("S");
        let rules = data_validations(&sheet, &mut diags);
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.ranges.len(), 2);
        assert_eq!(rule.kind, ValidationKind::List);
        assert_eq!(rule.list_values, vec!["Red", "Green"]);
        assert!(rule.show_dropdown);
        assert!(rule.error.show);
        assert_eq!(rule.error_style, ValidationErrorStyle::Warning);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_conditional_rules_flattened_and_ordered() {
        let table = StyleTable {
            dxfs: vec![RawDxf {
                font: Some(RawFont {
                    color: Some(RawColor::Rgb("FF9C0006".into())),
                    ..RawFont::default()
                }),
                ..RawDxf::default()
            }],
            ..StyleTable::default()
        };
        let palette = Palette::office();
        let resolver = StyleResolver::new(&table, &palette, DEFAULT_MAX_HOPS);

        let mut sheet = SheetNode::new("S");
        sheet.conditional_formats = vec![
            ConditionalFormatNode {
                sqref: "A1:A10".into(),
                rules: vec![CfRuleNode {
                    rule_type: "colorScale".into(),
                    priority: Some(2),
                    color_scale: vec![
                        RawColor::Rgb("FFF8696B".into()),
                        RawColor::Theme { index: 9, tint: 0.0 },
                    ],
                    ..CfRuleNode::default()
                }],
            },
            ConditionalFormatNode {
                sqref: "B1:B10".into(),
                rules: vec![CfRuleNode {
                    rule_type: "cellIs".into(),
                    priority: Some(1),
                    operator: Some("greaterThan".into()),
                    formulas: vec!["100".into()],
                    dxf: Some(0),
                    ..CfRuleNode::default()
                }],
            },
        ];

        let mut diags = Diagnostics::for_sheet("S");
        let rules = conditional_formatting(&sheet, &resolver, &mut diags);
        assert_eq!(rules.len(), 2);

        assert_eq!(rules[0].kind, ConditionalRuleKind::CellIs);
        assert_eq!(rules[0].operator, Some(ComparisonOperator::GreaterThan));
        let font = rules[0].format.as_ref().unwrap().font.as_ref().unwrap();
        assert_eq!(font.color, Some(Color::rgb(Rgb::new(0x9C, 0x00, 0x06))));

        let Some(RuleVisual::ColorScale { colors }) = &rules[1].visual else {
            panic!("expected color scale");
        };
        assert_eq!(colors[1].resolved(), Some(Rgb::new(0x70, 0xAD, 0x47)));
        assert!(diags.is_empty());
    }
}
