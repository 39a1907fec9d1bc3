//! Raw, format-neutral style storage handed to the style resolver.
//!
//! Both container readers lower their style tables into this arena. Records
//! reference shared fonts, fills and borders by index and may point at a
//! parent record they inherit unset components from.

use std::collections::HashMap;
use std::sync::Arc;

use crate::color::{DEFAULT_THEME_COLORS, INDEXED_COLORS};
use crate::types::{BorderStyle, HAlign, PatternType, Rgb, UnderlineStyle, VAlign, VertAlign};

/// A color as the source stored it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawColor {
    /// `RRGGBB` or `AARRGGBB` hex text.
    Rgb(String),
    Theme { index: u32, tint: f64 },
    Indexed(u32),
    Auto,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFont {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub underline: Option<UnderlineStyle>,
    pub strike: bool,
    pub vert_align: Option<VertAlign>,
    pub color: Option<RawColor>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFill {
    pub pattern: Option<PatternType>,
    pub foreground: Option<RawColor>,
    pub background: Option<RawColor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBorderSide {
    pub style: BorderStyle,
    pub color: Option<RawColor>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBorder {
    pub left: Option<RawBorderSide>,
    pub right: Option<RawBorderSide>,
    pub top: Option<RawBorderSide>,
    pub bottom: Option<RawBorderSide>,
    pub diagonal: Option<RawBorderSide>,
    pub diagonal_up: bool,
    pub diagonal_down: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAlignment {
    pub horizontal: Option<HAlign>,
    pub vertical: Option<VAlign>,
    pub wrap: bool,
    pub shrink_to_fit: bool,
    pub indent: Option<u32>,
    pub rotation: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawProtection {
    pub locked: Option<bool>,
    pub hidden: Option<bool>,
}

/// One node of the style arena.
///
/// `None` components are inherited from `parent`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleRecord {
    pub parent: Option<u32>,
    pub font: Option<u32>,
    pub fill: Option<u32>,
    pub border: Option<u32>,
    pub num_fmt: Option<u32>,
    pub alignment: Option<RawAlignment>,
    pub protection: Option<RawProtection>,
}

/// Formatting stored directly on a cell rather than in the shared table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    pub parent: Option<u32>,
    pub font: Option<RawFont>,
    pub fill: Option<RawFill>,
    pub border: Option<RawBorder>,
    pub num_fmt_code: Option<String>,
    pub alignment: Option<RawAlignment>,
    pub protection: Option<RawProtection>,
}

/// A cell's style reference.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleRef {
    /// Index into [`StyleTable::records`].
    Index(u32),
    Inline(Arc<InlineStyle>),
}

/// Differential formatting used by conditional formatting rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDxf {
    pub font: Option<RawFont>,
    pub fill: Option<RawFill>,
    pub border: Option<RawBorder>,
    pub num_fmt_code: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    pub records: Vec<StyleRecord>,
    pub fonts: Vec<RawFont>,
    pub fills: Vec<RawFill>,
    pub borders: Vec<RawBorder>,
    /// Custom number format codes by id. Built-in ids are looked up separately.
    pub num_fmts: HashMap<u32, String>,
    pub dxfs: Vec<RawDxf>,
    /// Record applied to cells without a style reference.
    pub default_record: Option<u32>,
}

/// Color tables used to resolve theme and indexed colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    /// Theme colors in `<color theme="n">` order, when the source has a theme.
    pub theme: Option<Vec<Rgb>>,
    pub indexed: Vec<Rgb>,
}

impl Palette {
    /// Standard 64-entry indexed palette with no theme.
    pub fn standard() -> Self {
        Self {
            theme: None,
            indexed: INDEXED_COLORS.to_vec(),
        }
    }

    /// Standard indexed palette plus the default Office theme.
    pub fn office() -> Self {
        Self {
            theme: Some(DEFAULT_THEME_COLORS.to_vec()),
            indexed: INDEXED_COLORS.to_vec(),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::standard()
    }
}
