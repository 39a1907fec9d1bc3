use chrono::NaiveDateTime;
use serde::Serialize;

use super::FormattingRef;
use crate::cell_ref::CellRef;

/// Canonical cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CellValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDateTime),
    /// Error literal such as `#DIV/0!`.
    Error(String),
    Empty,
}

impl CellValue {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Number(_) => DataType::Number,
            Self::Boolean(_) => DataType::Boolean,
            Self::Date(_) => DataType::Date,
            Self::Error(_) => DataType::Error,
            Self::Empty => DataType::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Error(s) => Some(s),
            _ => None,
        }
    }
}

/// Data-type tag. For formula cells this is the type of the cached result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Date,
    Error,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub coordinate: CellRef,
    pub value: CellValue,
    pub data_type: DataType,
    /// Formula text including the leading `=`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// Set when the formula has no cached result in the source.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub formula_only: bool,
    pub formatting: FormattingRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<Hyperlink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Comment>,
}

impl Cell {
    /// A cell with no value, formula or annotations.
    pub fn empty(coordinate: CellRef, formatting: FormattingRef) -> Self {
        Self {
            coordinate,
            value: CellValue::Empty,
            data_type: DataType::Empty,
            formula: None,
            formula_only: false,
            formatting,
            hyperlink: None,
            comment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hyperlink {
    /// External target (URL, file path, mailto).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// In-workbook location such as `Sheet2!A1`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub text: String,
}
