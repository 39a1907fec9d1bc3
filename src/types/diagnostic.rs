use serde::Serialize;
use std::fmt;

/// Non-fatal problem categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// A merge overlapped an earlier one and was dropped.
    OverlappingMergeRanges,
    /// An image payload exceeded the configured ceiling.
    ImageTooLarge,
    /// An image relationship pointed at missing bytes.
    MissingImageData,
    /// A chart plot type without structured extraction support.
    UnsupportedChartKind,
    /// A chart definition that could not be read.
    MalformedChart,
    /// A formula cell with no cached result.
    FormulaWithoutCachedValue,
    /// The source format cannot carry a feature.
    UnsupportedFeature,
    /// A range or cell reference that did not parse.
    InvalidRange,
    /// A workbook property that did not parse.
    InvalidMetadata,
    /// A cell value the reader could not interpret; its raw text is kept.
    InvalidCellValue,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OverlappingMergeRanges => "OverlappingMergeRanges",
            Self::ImageTooLarge => "ImageTooLarge",
            Self::MissingImageData => "MissingImageData",
            Self::UnsupportedChartKind => "UnsupportedChartKind",
            Self::MalformedChart => "MalformedChart",
            Self::FormulaWithoutCachedValue => "FormulaWithoutCachedValue",
            Self::UnsupportedFeature => "UnsupportedFeature",
            Self::InvalidRange => "InvalidRange",
            Self::InvalidMetadata => "InvalidMetadata",
            Self::InvalidCellValue => "InvalidCellValue",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    /// Cell, range or part the diagnostic refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(sheet) = &self.sheet {
            write!(f, " [{sheet}")?;
            if let Some(location) = &self.location {
                write!(f, "!{location}")?;
            }
            write!(f, "]")?;
        } else if let Some(location) = &self.location {
            write!(f, " [{location}]")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered collector for one extraction scope (a sheet or the workbook).
///
/// Every pushed diagnostic is also logged.
#[derive(Debug, Default)]
pub struct Diagnostics {
    sheet: Option<String>,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn for_workbook() -> Self {
        Self::default()
    }

    pub fn for_sheet(name: &str) -> Self {
        Self {
            sheet: Some(name.to_string()),
            items: Vec::new(),
        }
    }

    pub fn warn(
        &mut self,
        kind: DiagnosticKind,
        location: Option<String>,
        message: impl Into<String>,
    ) {
        self.push(kind, Severity::Warning, location, message.into());
    }

    pub fn info(
        &mut self,
        kind: DiagnosticKind,
        location: Option<String>,
        message: impl Into<String>,
    ) {
        self.push(kind, Severity::Info, location, message.into());
    }

    fn push(
        &mut self,
        kind: DiagnosticKind,
        severity: Severity,
        location: Option<String>,
        message: String,
    ) {
        let diagnostic = Diagnostic {
            kind,
            severity,
            sheet: self.sheet.clone(),
            location,
            message,
        };
        match severity {
            Severity::Warning => log::warn!("{diagnostic}"),
            Severity::Info => log::info!("{diagnostic}"),
        }
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_scope_is_stamped() {
        let mut diags = Diagnostics::for_sheet("Data");
        diags.warn(
            DiagnosticKind::InvalidRange,
            Some("A0".into()),
            "bad merge",
        );
        let items = diags.into_vec();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sheet.as_deref(), Some("Data"));
        assert_eq!(items[0].severity, Severity::Warning);
        assert_eq!(items[0].to_string(), "InvalidRange [Data!A0]: bad merge");
    }

    #[test]
    fn test_workbook_scope_display() {
        let mut diags = Diagnostics::for_workbook();
        diags.info(DiagnosticKind::UnsupportedFeature, None, "no charts");
        assert_eq!(
            diags.iter().next().unwrap().to_string(),
            "UnsupportedFeature: no charts"
        );
    }
}
