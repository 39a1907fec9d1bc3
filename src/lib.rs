//! xlcanon - canonical extraction of spreadsheet workbooks
//!
//! Turns a parsed workbook container into one format-independent model:
//! - Typed cell values with fully resolved, shared formatting
//! - Merges, dimensions, freeze panes, views and page setup
//! - Data validation and ordered conditional formatting rules
//! - Charts and images with their anchors
//! - Non-fatal problems collected as diagnostics
//!
//! Two container formats feed the same engine: OpenXML packages, read by
//! [`parser::open`], and legacy workbooks, which a caller-supplied reader
//! turns into a [`LegacyContainer`].
//!
//! # Usage
//!
//! ```no_run
//! let bytes = std::fs::read("report.xlsx")?;
//! let workbook = xlcanon::analyze_xlsx(&bytes, &xlcanon::AnalysisOptions::default())?;
//! for sheet in &workbook.worksheets {
//!     println!("{}: {} cells", sheet.name, sheet.cells.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cell_ref;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod numfmt;
pub mod parser;
pub mod source;
pub mod styles;
pub mod types;
pub mod xml_helpers;

pub use cell_ref::{CellRange, CellRef};
pub use config::{AnalysisOptions, ChartDegradation};
pub use engine::{Analyzer, CancellationToken};
pub use error::{Result, Stage, XlcanonError};
pub use source::{LegacyContainer, OpenXmlContainer, ParsedContainer, WorkbookNode};
pub use types::*;

/// Build the canonical model for an already parsed container.
///
/// # Errors
/// Fails on missing workbook metadata, duplicate sheet names or cyclic
/// styles. Recoverable problems are reported in `Workbook::diagnostics`.
pub fn analyze(container: &dyn ParsedContainer, options: &AnalysisOptions) -> Result<Workbook> {
    Analyzer::new(options.clone()).analyze(container)
}

/// Read an `.xlsx` package and build its canonical model.
///
/// # Errors
/// Container errors are tagged with [`Stage::Container`]; the rest are as
/// for [`analyze`].
pub fn analyze_xlsx(data: &[u8], options: &AnalysisOptions) -> Result<Workbook> {
    let container =
        parser::open_with(data, options).map_err(|e| e.in_stage(Stage::Container, None))?;
    analyze(&container, options)
}

/// Library version.
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
