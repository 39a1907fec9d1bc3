//! Structured error types for xlcanon.
//!
//! Only unrecoverable conditions become errors. Per-feature problems are
//! reported through [`crate::types::Diagnostic`] instead.

use std::fmt;

/// Engine stage that was running when a fatal error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading the container bytes into a parsed tree.
    Container,
    /// Workbook-level metadata (properties, sheet list).
    Metadata,
    /// Style table resolution.
    Styles,
    Structure,
    Cells,
    Rules,
    Charts,
    Images,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Container => "container",
            Self::Metadata => "metadata",
            Self::Styles => "styles",
            Self::Structure => "structure",
            Self::Cells => "cells",
            Self::Rules => "rules",
            Self::Charts => "charts",
            Self::Images => "images",
        };
        f.write_str(name)
    }
}

/// All errors that can abort an analysis.
#[derive(Debug, thiserror::Error)]
pub enum XlcanonError {
    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The container is readable but structurally broken.
    #[error("Corrupt container: {0}")]
    Container(String),

    /// Workbook-level metadata is absent or unreadable.
    #[error("Missing workbook metadata: {0}")]
    MissingMetadata(String),

    /// Two worksheets share a name.
    #[error("Duplicate worksheet name: {0}")]
    DuplicateSheetName(String),

    /// A style chain revisited a record or exceeded the hop limit.
    #[error("Cyclic style reference: style {style} did not resolve within {hops} hops")]
    CyclicStyleReference { style: u32, hops: usize },

    /// Invalid cell reference.
    #[error("Invalid cell reference: {0}")]
    CellRef(String),

    /// Options could not be deserialized.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The caller cancelled the analysis.
    #[error("Analysis cancelled")]
    Cancelled,

    /// A fatal error tagged with the stage (and sheet) that produced it.
    #[error("{stage} stage failed{}: {source}", sheet_suffix(.sheet))]
    InStage {
        stage: Stage,
        sheet: Option<String>,
        source: Box<XlcanonError>,
    },
}

fn sheet_suffix(sheet: &Option<String>) -> String {
    sheet
        .as_ref()
        .map(|name| format!(" on sheet '{name}'"))
        .unwrap_or_default()
}

impl XlcanonError {
    /// Tag this error with the stage that produced it.
    ///
    /// Errors that already carry a stage are returned unchanged, and
    /// cancellation is never tagged.
    #[must_use]
    pub fn in_stage(self, stage: Stage, sheet: Option<&str>) -> Self {
        match self {
            Self::InStage { .. } | Self::Cancelled => self,
            other => Self::InStage {
                stage,
                sheet: sheet.map(str::to_string),
                source: Box::new(other),
            },
        }
    }

    /// The stage recorded on this error, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::InStage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, with stage wrappers removed.
    pub fn root(&self) -> &Self {
        match self {
            Self::InStage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlcanonError>;
