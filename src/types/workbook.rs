use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::{
    Cell, Chart, Color, ColumnDimension, ConditionalFormattingRule, DataValidationRule,
    Diagnostic, FreezePane, Image, MergedRange, PageProperties, RowDimension, SheetView,
};
use crate::cell_ref::{CellRange, CellRef};

/// Container format the workbook was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceFormat {
    /// Zip-of-XML parts (`.xlsx`, `.xlsm`).
    OpenXml,
    /// BIFF records in an OLE compound file (`.xls`).
    Legacy,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenXml => f.write_str("OpenXML"),
            Self::Legacy => f.write_str("legacy BIFF"),
        }
    }
}

/// Serial date epoch used by the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DateSystem {
    #[default]
    #[serde(rename = "1900")]
    Excel1900,
    #[serde(rename = "1904")]
    Excel1904,
}

/// When the workbook asks to be recalculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CalculationMode {
    #[default]
    Auto,
    /// Automatic except data tables.
    AutoNoTable,
    Manual,
}

impl CalculationMode {
    pub fn from_str_val(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Self::Auto),
            "autoNoTable" => Some(Self::AutoNoTable),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Sheet visibility state
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SheetState {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetState {
    pub fn from_str_val(s: &str) -> Self {
        match s {
            "hidden" => Self::Hidden,
            "veryHidden" => Self::VeryHidden,
            _ => Self::Visible,
        }
    }
}

/// Whether the source format can carry a feature at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Support {
    Supported,
    Unsupported,
}

/// Features whose availability depends on the source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    DataValidation,
    ConditionalFormatting,
    Charts,
    Images,
    ThemeColors,
}

impl Feature {
    pub const ALL: [Self; 5] = [
        Self::DataValidation,
        Self::ConditionalFormatting,
        Self::Charts,
        Self::Images,
        Self::ThemeColors,
    ];
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DataValidation => "data validation",
            Self::ConditionalFormatting => "conditional formatting",
            Self::Charts => "charts",
            Self::Images => "images",
            Self::ThemeColors => "theme colors",
        };
        f.write_str(name)
    }
}

/// Capability flags. `Unsupported` means "cannot exist in this source",
/// which is distinct from a supported feature with nothing present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub data_validation: Support,
    pub conditional_formatting: Support,
    pub charts: Support,
    pub images: Support,
    pub theme_colors: Support,
}

impl Capabilities {
    pub const ALL_SUPPORTED: Self = Self {
        data_validation: Support::Supported,
        conditional_formatting: Support::Supported,
        charts: Support::Supported,
        images: Support::Supported,
        theme_colors: Support::Supported,
    };

    pub fn get(&self, feature: Feature) -> Support {
        match feature {
            Feature::DataValidation => self.data_validation,
            Feature::ConditionalFormatting => self.conditional_formatting,
            Feature::Charts => self.charts,
            Feature::Images => self.images,
            Feature::ThemeColors => self.theme_colors,
        }
    }

    pub fn supports(&self, feature: Feature) -> bool {
        self.get(feature) == Support::Supported
    }

    #[must_use]
    pub fn with(mut self, feature: Feature, support: Support) -> Self {
        let slot = match feature {
            Feature::DataValidation => &mut self.data_validation,
            Feature::ConditionalFormatting => &mut self.conditional_formatting,
            Feature::Charts => &mut self.charts,
            Feature::Images => &mut self.images,
            Feature::ThemeColors => &mut self.theme_colors,
        };
        *slot = support;
        self
    }

    pub fn unsupported(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL
            .into_iter()
            .filter(move |feature| !self.supports(*feature))
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::ALL_SUPPORTED
    }
}

/// Document properties. Every field is optional in both formats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinedName {
    pub name: String,
    /// Formula text, e.g. `Sheet1!$A$1:$D$10`.
    pub value: String,
    /// Sheet scope (0-based), or workbook scope when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_sheet: Option<u32>,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Worksheet {
    pub name: String,
    pub index: usize,
    pub state: SheetState,
    /// Populated cells only, in row-major order.
    pub cells: BTreeMap<CellRef, Cell>,
    pub merges: Vec<MergedRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnDimension>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<RowDimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_column_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_row_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeze_pane: Option<FreezePane>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_filter: Option<CellRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_color: Option<Color>,
    pub view: SheetView,
    #[serde(skip_serializing_if = "PageProperties::is_empty")]
    pub page: PageProperties,
    pub data_validations: Vec<DataValidationRule>,
    pub conditional_formatting: Vec<ConditionalFormattingRule>,
    pub charts: Vec<Chart>,
    pub images: Vec<Image>,
}

impl Worksheet {
    pub fn cell(&self, coordinate: &str) -> Option<&Cell> {
        self.cells.get(&CellRef::parse(coordinate)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workbook {
    pub source_format: SourceFormat,
    pub properties: DocumentProperties,
    pub date_system: DateSystem,
    pub calculation_mode: CalculationMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub defined_names: Vec<DefinedName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_sheet: Option<usize>,
    pub worksheets: Vec<Worksheet>,
    pub capabilities: Capabilities,
    pub diagnostics: Vec<Diagnostic>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets.iter().find(|s| s.name == name)
    }
}
