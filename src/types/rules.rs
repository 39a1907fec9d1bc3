use serde::Serialize;

use super::{Border, Color, Font, PatternType};
use crate::cell_ref::CellRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationKind {
    #[default]
    Any,
    Whole,
    Decimal,
    List,
    Date,
    Time,
    TextLength,
    Custom,
}

impl ValidationKind {
    pub fn from_str_val(s: &str) -> Self {
        match s {
            "whole" => Self::Whole,
            "decimal" => Self::Decimal,
            "list" => Self::List,
            "date" => Self::Date,
            "time" => Self::Time,
            "textLength" => Self::TextLength,
            "custom" => Self::Custom,
            _ => Self::Any,
        }
    }
}

/// Comparison operator shared by validation and cell-is rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    Between,
    NotBetween,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    ContainsText,
    NotContains,
    BeginsWith,
    EndsWith,
}

impl ComparisonOperator {
    pub fn from_str_val(s: &str) -> Option<Self> {
        match s {
            "between" => Some(Self::Between),
            "notBetween" => Some(Self::NotBetween),
            "equal" => Some(Self::Equal),
            "notEqual" => Some(Self::NotEqual),
            "greaterThan" => Some(Self::GreaterThan),
            "lessThan" => Some(Self::LessThan),
            "greaterThanOrEqual" => Some(Self::GreaterThanOrEqual),
            "lessThanOrEqual" => Some(Self::LessThanOrEqual),
            "containsText" => Some(Self::ContainsText),
            "notContains" => Some(Self::NotContains),
            "beginsWith" => Some(Self::BeginsWith),
            "endsWith" => Some(Self::EndsWith),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationErrorStyle {
    #[default]
    Stop,
    Warning,
    Information,
}

impl ValidationErrorStyle {
    pub fn from_str_val(s: &str) -> Self {
        match s {
            "warning" => Self::Warning,
            "information" => Self::Information,
            _ => Self::Stop,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub show: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValidationRule {
    pub ranges: Vec<CellRange>,
    pub kind: ValidationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<ComparisonOperator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula2: Option<String>,
    pub allow_blank: bool,
    pub show_dropdown: bool,
    pub prompt: ValidationMessage,
    pub error: ValidationMessage,
    pub error_style: ValidationErrorStyle,
    /// Literal items of an inline list (`"a,b,c"`). Empty for range-backed lists.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub list_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionalRuleKind {
    CellIs,
    Expression,
    ColorScale,
    DataBar,
    IconSet,
    Top10,
    AboveAverage,
    UniqueValues,
    DuplicateValues,
    ContainsText,
    NotContainsText,
    BeginsWith,
    EndsWith,
    ContainsBlanks,
    NotContainsBlanks,
    ContainsErrors,
    NotContainsErrors,
    TimePeriod,
    #[serde(untagged)]
    Other(String),
}

impl ConditionalRuleKind {
    pub fn from_str_val(s: &str) -> Self {
        match s {
            "cellIs" => Self::CellIs,
            "expression" => Self::Expression,
            "colorScale" => Self::ColorScale,
            "dataBar" => Self::DataBar,
            "iconSet" => Self::IconSet,
            "top10" => Self::Top10,
            "aboveAverage" => Self::AboveAverage,
            "uniqueValues" => Self::UniqueValues,
            "duplicateValues" => Self::DuplicateValues,
            "containsText" => Self::ContainsText,
            "notContainsText" => Self::NotContainsText,
            "beginsWith" => Self::BeginsWith,
            "endsWith" => Self::EndsWith,
            "containsBlanks" => Self::ContainsBlanks,
            "notContainsBlanks" => Self::NotContainsBlanks,
            "containsErrors" => Self::ContainsErrors,
            "notContainsErrors" => Self::NotContainsErrors,
            "timePeriod" => Self::TimePeriod,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Formatting fragment applied when a conditional rule matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifferentialFormatting {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_pattern: Option<PatternType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_foreground: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_background: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<Border>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_format: Option<String>,
}

/// Visual payload of scale-style rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RuleVisual {
    ColorScale { colors: Vec<Color> },
    DataBar { color: Option<Color> },
    IconSet { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalFormattingRule {
    pub ranges: Vec<CellRange>,
    pub kind: ConditionalRuleKind,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<ComparisonOperator>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub formulas: Vec<String>,
    pub stop_if_true: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    pub percent: bool,
    pub bottom: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub above_average: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<DifferentialFormatting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual: Option<RuleVisual>,
}
