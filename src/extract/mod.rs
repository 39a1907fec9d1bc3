//! Per-worksheet extractors.
//!
//! Each extractor reads one slice of a [`crate::source::SheetNode`] and
//! returns a canonical fragment. Recoverable problems go into the sheet's
//! [`crate::types::Diagnostics`]; only style cycles are fatal.

pub mod cells;
pub mod charts;
pub mod images;
pub mod rules;
pub mod structure;
