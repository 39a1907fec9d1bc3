//! Integration tests for xlcanon.
//!
//! This module provides the shared test infrastructure:
//!
//! - `fixtures`: Builders for creating valid XLSX files in memory
//! - `common`: Analysis helpers and synthetic container trees
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use crate::common::{analyze, cell};
//! use crate::fixtures::{SheetBuilder, StyleBuilder, XlsxBuilder};
//!
//! fn test_bold_text() {
//!     let xlsx = XlsxBuilder::new()
//!         .sheet(SheetBuilder::new("Sheet1").cell("A1", "Bold", Some(StyleBuilder::new().bold())))
//!         .build();
//!
//!     let workbook = analyze(&xlsx);
//!     assert!(cell(&workbook, 0, "A1").formatting.font.bold);
//! }
//! ```
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

pub mod common;
pub mod fixtures;

pub use common::{analyze, analyze_with, cell, count_diagnostics, sheet};
pub use fixtures::{CellValue, SheetBuilder, StyleBuilder, XlsxBuilder};
