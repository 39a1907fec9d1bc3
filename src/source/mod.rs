//! The parsed-container interface the engine consumes.
//!
//! A container reader turns file bytes into a [`WorkbookNode`] tree and wraps
//! it in the variant for its format. The engine only ever sees the
//! [`ParsedContainer`] trait, so format differences reduce to the variant's
//! capability flags.

mod node;
mod style_table;

pub use node::*;
pub use style_table::*;

use crate::error::{Result, XlcanonError};
use crate::types::{Capabilities, Feature, SourceFormat, Support};

/// Read-only view of a parsed workbook.
pub trait ParsedContainer: Send + Sync {
    fn format(&self) -> SourceFormat;

    /// Features this source format can carry.
    fn capabilities(&self) -> Capabilities;

    /// Workbook-level metadata. Fails when the source had none.
    fn metadata(&self) -> Result<&WorkbookMeta>;

    fn styles(&self) -> &StyleTable;

    fn palette(&self) -> &Palette;

    /// Worksheets in tab order.
    fn sheets(&self) -> &[SheetNode];
}

/// Format-neutral workbook tree shared by both container variants.
#[derive(Debug, Clone, Default)]
pub struct WorkbookNode {
    /// `None` when the container had no readable workbook part.
    pub metadata: Option<WorkbookMeta>,
    pub styles: StyleTable,
    pub palette: Palette,
    pub sheets: Vec<SheetNode>,
}

impl WorkbookNode {
    fn metadata(&self, format: SourceFormat) -> Result<&WorkbookMeta> {
        self.metadata.as_ref().ok_or_else(|| {
            XlcanonError::MissingMetadata(format!("{format} container has no workbook part"))
        })
    }
}

/// A workbook read from a zip-of-XML container.
#[derive(Debug, Clone, Default)]
pub struct OpenXmlContainer {
    tree: WorkbookNode,
}

impl OpenXmlContainer {
    pub fn new(tree: WorkbookNode) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &WorkbookNode {
        &self.tree
    }

    pub fn into_tree(self) -> WorkbookNode {
        self.tree
    }
}

impl ParsedContainer for OpenXmlContainer {
    fn format(&self) -> SourceFormat {
        SourceFormat::OpenXml
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL_SUPPORTED
    }

    fn metadata(&self) -> Result<&WorkbookMeta> {
        self.tree.metadata(SourceFormat::OpenXml)
    }

    fn styles(&self) -> &StyleTable {
        &self.tree.styles
    }

    fn palette(&self) -> &Palette {
        &self.tree.palette
    }

    fn sheets(&self) -> &[SheetNode] {
        &self.tree.sheets
    }
}

/// A workbook read from a BIFF compound document.
///
/// BIFF has no conditional-formatting records the engine models, stores no
/// structured chart parts, and predates theme colors. Any such nodes a
/// reader leaves in the tree are ignored.
#[derive(Debug, Clone, Default)]
pub struct LegacyContainer {
    tree: WorkbookNode,
}

impl LegacyContainer {
    pub fn new(mut tree: WorkbookNode) -> Self {
        tree.palette.theme = None;
        Self { tree }
    }

    pub fn tree(&self) -> &WorkbookNode {
        &self.tree
    }
}

impl ParsedContainer for LegacyContainer {
    fn format(&self) -> SourceFormat {
        SourceFormat::Legacy
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL_SUPPORTED
            .with(Feature::ConditionalFormatting, Support::Unsupported)
            .with(Feature::Charts, Support::Unsupported)
            .with(Feature::ThemeColors, Support::Unsupported)
    }

    fn metadata(&self) -> Result<&WorkbookMeta> {
        self.tree.metadata(SourceFormat::Legacy)
    }

    fn styles(&self) -> &StyleTable {
        &self.tree.styles
    }

    fn palette(&self) -> &Palette {
        &self.tree.palette
    }

    fn sheets(&self) -> &[SheetNode] {
        &self.tree.sheets
    }
}
