//! The canonical, format-independent workbook model.
//!
//! Everything here is built once per analysis and read-only afterwards.

mod cell;
mod chart;
mod diagnostic;
mod drawing;
mod rules;
mod structure;
mod style;
mod workbook;

pub use cell::*;
pub use chart::*;
pub use diagnostic::*;
pub use drawing::*;
pub use rules::*;
pub use structure::*;
pub use style::*;
pub use workbook::*;
