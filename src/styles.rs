//! Style resolution
//!
//! Turns a cell's [`StyleRef`] into a fully materialized [`Formatting`] by
//! walking the style arena's parent chain. Each component (font, fill,
//! border, number format, alignment, protection) takes the first value found
//! walking child-first; anything still unset after the root gets the
//! default.
//!
//! A resolver caches by record index and belongs to one analysis. Parallel
//! workers each [`fork`](StyleResolver::fork) their own copy from a seed.

use std::collections::{HashMap, HashSet};

use crate::color::normalize;
use crate::error::{Result, XlcanonError};
use crate::numfmt::{number_format, resolve_format_code};
use crate::source::{
    InlineStyle, Palette, RawAlignment, RawBorder, RawBorderSide, RawDxf, RawFill, RawFont,
    RawProtection, StyleRecord, StyleRef, StyleTable,
};
use crate::types::{
    Alignment, Border, BorderEdge, DifferentialFormatting, Fill, Font, Formatting, FormattingRef,
    Protection,
};

/// Default bound on parent-chain length.
pub const DEFAULT_MAX_HOPS: usize = 16;

pub struct StyleResolver<'a> {
    table: &'a StyleTable,
    palette: &'a Palette,
    max_hops: usize,
    cache: HashMap<u32, FormattingRef>,
    default: Option<FormattingRef>,
}

/// Components picked so far while walking a chain. The outer `Option` marks
/// whether a layer has decided the component; the inner one is `None` when
/// the deciding layer pointed past the end of its table.
#[derive(Default)]
struct Picked<'t> {
    font: Option<Option<&'t RawFont>>,
    fill: Option<Option<&'t RawFill>>,
    border: Option<Option<&'t RawBorder>>,
    num_fmt: Option<String>,
    alignment: Option<&'t RawAlignment>,
    locked: Option<bool>,
    hidden: Option<bool>,
}

impl<'t> Picked<'t> {
    fn take_protection(&mut self, protection: Option<&RawProtection>) {
        if let Some(p) = protection {
            self.locked = self.locked.or(p.locked);
            self.hidden = self.hidden.or(p.hidden);
        }
    }

    fn take_inline(&mut self, inline: &'t InlineStyle) {
        self.font = inline.font.as_ref().map(Some);
        self.fill = inline.fill.as_ref().map(Some);
        self.border = inline.border.as_ref().map(Some);
        self.num_fmt.clone_from(&inline.num_fmt_code);
        self.alignment = inline.alignment.as_ref();
        self.take_protection(inline.protection.as_ref());
    }

    fn take_record(&mut self, record: &'t StyleRecord, table: &'t StyleTable) {
        if self.font.is_none() {
            self.font = record.font.map(|i| lookup(&table.fonts, i));
        }
        if self.fill.is_none() {
            self.fill = record.fill.map(|i| lookup(&table.fills, i));
        }
        if self.border.is_none() {
            self.border = record.border.map(|i| lookup(&table.borders, i));
        }
        if self.num_fmt.is_none() {
            self.num_fmt = record
                .num_fmt
                .map(|id| resolve_format_code(id, &table.num_fmts));
        }
        if self.alignment.is_none() {
            self.alignment = record.alignment.as_ref();
        }
        self.take_protection(record.protection.as_ref());
    }
}

fn lookup<T>(items: &[T], index: u32) -> Option<&T> {
    usize::try_from(index).ok().and_then(|i| items.get(i))
}

impl<'a> StyleResolver<'a> {
    pub fn new(table: &'a StyleTable, palette: &'a Palette, max_hops: usize) -> Self {
        Self {
            table,
            palette,
            max_hops,
            cache: HashMap::new(),
            default: None,
        }
    }

    /// A new resolver sharing this one's tables, starting from a copy of its
    /// cache. Cached values keep their `Arc`s, so formatting resolved before
    /// the fork stays pointer-equal across workers.
    pub fn fork(&self) -> Self {
        Self {
            table: self.table,
            palette: self.palette,
            max_hops: self.max_hops,
            cache: self.cache.clone(),
            default: self.default.clone(),
        }
    }

    pub fn palette(&self) -> &'a Palette {
        self.palette
    }

    /// Number of cached record resolutions.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Formatting applied to cells without a style reference.
    pub fn default_formatting(&mut self) -> Result<FormattingRef> {
        if let Some(default) = &self.default {
            return Ok(default.clone());
        }
        let default = match self.table.default_record {
            Some(index) => self.resolve_index(index)?,
            None if !self.table.records.is_empty() => self.resolve_index(0)?,
            None => FormattingRef::default(),
        };
        self.default = Some(default.clone());
        Ok(default)
    }

    pub fn resolve(&mut self, style: &StyleRef) -> Result<FormattingRef> {
        match style {
            StyleRef::Index(index) => self.resolve_index(*index),
            StyleRef::Inline(inline) => {
                let mut picked = Picked::default();
                picked.take_inline(inline);
                if let Some(parent) = inline.parent {
                    for record in self.chain(parent)? {
                        picked.take_record(record, self.table);
                    }
                }
                Ok(FormattingRef::new(self.materialize(&picked)))
            }
        }
    }

    fn resolve_index(&mut self, index: u32) -> Result<FormattingRef> {
        if let Some(hit) = self.cache.get(&index) {
            return Ok(hit.clone());
        }

        let mut picked = Picked::default();
        for record in self.chain(index)? {
            picked.take_record(record, self.table);
        }
        let resolved = FormattingRef::new(self.materialize(&picked));
        self.cache.insert(index, resolved.clone());
        Ok(resolved)
    }

    /// Records from `start` up to the root, child first. A dangling parent
    /// ends the chain.
    fn chain(&self, start: u32) -> Result<Vec<&'a StyleRecord>> {
        let mut visited = HashSet::new();
        let mut chain = Vec::new();
        let mut next = Some(start);

        while let Some(index) = next {
            if !visited.insert(index) || chain.len() >= self.max_hops {
                return Err(XlcanonError::CyclicStyleReference {
                    style: start,
                    hops: chain.len(),
                });
            }
            let Some(record) = lookup(&self.table.records, index) else {
                break;
            };
            chain.push(record);
            next = record.parent;
        }

        Ok(chain)
    }

    fn materialize(&self, picked: &Picked<'_>) -> Formatting {
        Formatting {
            font: picked
                .font
                .flatten()
                .map(|f| self.font(f))
                .unwrap_or_default(),
            fill: picked
                .fill
                .flatten()
                .map(|f| self.fill(f))
                .unwrap_or_default(),
            border: picked
                .border
                .flatten()
                .map(|b| self.border(b))
                .unwrap_or_default(),
            alignment: picked.alignment.map(alignment).unwrap_or_default(),
            number_format: picked
                .num_fmt
                .as_ref()
                .map(|code| number_format(code.as_str()))
                .unwrap_or_default(),
            protection: Protection {
                locked: picked.locked.unwrap_or(true),
                hidden: picked.hidden.unwrap_or(false),
            },
        }
    }

    fn font(&self, raw: &RawFont) -> Font {
        Font {
            name: raw.name.clone(),
            size: raw.size,
            bold: raw.bold,
            italic: raw.italic,
            underline: raw.underline,
            strike: raw.strike,
            vert_align: raw.vert_align,
            color: raw.color.as_ref().map(|c| normalize(c, self.palette)),
        }
    }

    fn fill(&self, raw: &RawFill) -> Fill {
        Fill {
            pattern: raw.pattern.unwrap_or_default(),
            foreground: raw.foreground.as_ref().map(|c| normalize(c, self.palette)),
            background: raw.background.as_ref().map(|c| normalize(c, self.palette)),
        }
    }

    fn border(&self, raw: &RawBorder) -> Border {
        Border {
            left: self.edge(raw.left.as_ref()),
            right: self.edge(raw.right.as_ref()),
            top: self.edge(raw.top.as_ref()),
            bottom: self.edge(raw.bottom.as_ref()),
            diagonal: self.edge(raw.diagonal.as_ref()),
            diagonal_up: raw.diagonal_up,
            diagonal_down: raw.diagonal_down,
        }
    }

    fn edge(&self, side: Option<&RawBorderSide>) -> BorderEdge {
        side.map_or_else(BorderEdge::default, |side| BorderEdge {
            style: side.style,
            color: side.color.as_ref().map(|c| normalize(c, self.palette)),
        })
    }

    /// Resolve a differential format. Out-of-range indices yield `None`.
    pub fn resolve_dxf(&self, index: u32) -> Option<DifferentialFormatting> {
        lookup(&self.table.dxfs, index).map(|dxf| self.dxf(dxf))
    }

    fn dxf(&self, raw: &RawDxf) -> DifferentialFormatting {
        DifferentialFormatting {
            font: raw.font.as_ref().map(|f| self.font(f)),
            fill_pattern: raw.fill.as_ref().and_then(|f| f.pattern),
            fill_foreground: raw
                .fill
                .as_ref()
                .and_then(|f| f.foreground.as_ref())
                .map(|c| normalize(c, self.palette)),
            fill_background: raw
                .fill
                .as_ref()
                .and_then(|f| f.background.as_ref())
                .map(|c| normalize(c, self.palette)),
            border: raw.border.as_ref().map(|b| self.border(b)),
            number_format: raw.num_fmt_code.clone(),
        }
    }
}

fn alignment(raw: &RawAlignment) -> Alignment {
    Alignment {
        horizontal: raw.horizontal,
        vertical: raw.vertical,
        wrap: raw.wrap,
        shrink_to_fit: raw.shrink_to_fit,
        indent: raw.indent,
        rotation: raw.rotation,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::source::RawColor;
    use crate::types::{BorderStyle, Color, HAlign, PatternType, Rgb};
    use std::sync::Arc;

    fn table() -> StyleTable {
        let mut table = StyleTable {
            fonts: vec![
                RawFont {
                    name: Some("Calibri".to_string()),
                    size: Some(11.0),
                    ..RawFont::default()
                },
                RawFont {
                    name: Some("Calibri".to_string()),
                    size: Some(11.0),
                    bold: true,
                    color: Some(RawColor::Rgb("FFFF0000".to_string())),
                    ..RawFont::default()
                },
            ],
            fills: vec![
                RawFill::default(),
                RawFill {
                    pattern: Some(PatternType::Solid),
                    foreground: Some(RawColor::Theme { index: 4, tint: 0.0 }),
                    background: None,
                },
            ],
            borders: vec![RawBorder {
                bottom: Some(RawBorderSide {
                    style: BorderStyle::Thin,
                    color: Some(RawColor::Indexed(8)),
                }),
                ..RawBorder::default()
            }],
            ..StyleTable::default()
        };
        table.num_fmts.insert(164, "yyyy-mm-dd".to_string());
        table.records = vec![
            // 0: default cell format, child of named style 3
            StyleRecord {
                parent: Some(3),
                font: Some(0),
                fill: Some(0),
                num_fmt: Some(0),
                ..StyleRecord::default()
            },
            // 1: bold with a date format, inherits fill from 4
            StyleRecord {
                parent: Some(4),
                font: Some(1),
                num_fmt: Some(164),
                ..StyleRecord::default()
            },
            // 2: dangling font index
            StyleRecord {
                font: Some(99),
                ..StyleRecord::default()
            },
            // 3: Normal named style
            StyleRecord {
                font: Some(0),
                ..StyleRecord::default()
            },
            // 4: named style with fill, border and alignment
            StyleRecord {
                fill: Some(1),
                border: Some(0),
                alignment: Some(RawAlignment {
                    horizontal: Some(HAlign::Center),
                    wrap: true,
                    ..RawAlignment::default()
                }),
                protection: Some(RawProtection {
                    locked: Some(false),
                    hidden: None,
                }),
                ..StyleRecord::default()
            },
        ];
        table
    }

    #[test]
    fn test_child_first_inheritance() {
        let table = table();
        let palette = Palette::office();
        let mut resolver = StyleResolver::new(&table, &palette, DEFAULT_MAX_HOPS);

        let fmt = resolver.resolve(&StyleRef::Index(1)).unwrap();
        assert!(fmt.font.bold);
        assert_eq!(fmt.font.color, Some(Color::rgb(Rgb::new(0xFF, 0, 0))));
        assert_eq!(fmt.fill.pattern, PatternType::Solid);
        assert_eq!(
            fmt.fill.foreground.as_ref().and_then(Color::resolved),
            Some(Rgb::new(0x44, 0x72, 0xC4))
        );
        assert_eq!(fmt.border.bottom.style, BorderStyle::Thin);
        assert_eq!(fmt.alignment.horizontal, Some(HAlign::Center));
        assert!(fmt.alignment.wrap);
        assert!(!fmt.protection.locked);
        assert_eq!(fmt.number_format.code, "yyyy-mm-dd");
        assert!(fmt.number_format.is_date);
    }

    #[test]
    fn test_cache_returns_identical_values() {
        let table = table();
        let palette = Palette::office();
        let mut resolver = StyleResolver::new(&table, &palette, DEFAULT_MAX_HOPS);

        let first = resolver.resolve(&StyleRef::Index(1)).unwrap();
        let second = resolver.resolve(&StyleRef::Index(1)).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(first, second);
        assert_eq!(resolver.cached(), 1);
    }

    #[test]
    fn test_fork_shares_resolved_values() {
        let table = table();
        let palette = Palette::office();
        let mut seed = StyleResolver::new(&table, &palette, DEFAULT_MAX_HOPS);
        let default = seed.default_formatting().unwrap();

        let mut worker = seed.fork();
        assert!(worker.default_formatting().unwrap().ptr_eq(&default));
        assert!(worker.resolve(&StyleRef::Index(0)).unwrap().ptr_eq(&default));

        // Worker caches stay private
        worker.resolve(&StyleRef::Index(1)).unwrap();
        assert_eq!(worker.cached(), 2);
        assert_eq!(seed.cached(), 1);
    }

    #[test]
    fn test_self_cycle_fails() {
        let table = StyleTable {
            records: vec![StyleRecord {
                parent: Some(0),
                ..StyleRecord::default()
            }],
            ..StyleTable::default()
        };
        let palette = Palette::standard();
        let mut resolver = StyleResolver::new(&table, &palette, DEFAULT_MAX_HOPS);

        let err = resolver.resolve(&StyleRef::Index(0)).unwrap_err();
        assert!(matches!(
            err,
            XlcanonError::CyclicStyleReference { style: 0, .. }
        ));
    }

    #[test]
    fn test_two_record_cycle_fails() {
        let table = StyleTable {
            records: vec![
                StyleRecord {
                    parent: Some(1),
                    ..StyleRecord::default()
                },
                StyleRecord {
                    parent: Some(0),
                    ..StyleRecord::default()
                },
            ],
            ..StyleTable::default()
        };
        let palette = Palette::standard();
        let mut resolver = StyleResolver::new(&table, &palette, DEFAULT_MAX_HOPS);

        let err = resolver.resolve(&StyleRef::Index(1)).unwrap_err();
        assert!(matches!(
            err,
            XlcanonError::CyclicStyleReference { style: 1, hops: 2 }
        ));
    }

    #[test]
    fn test_hop_limit() {
        // 0 -> 1 -> 2 -> 3, no cycle but longer than the limit
        let records = (0..4)
            .map(|i| StyleRecord {
                parent: if i < 3 { Some(i + 1) } else { None },
                ..StyleRecord::default()
            })
            .collect();
        let table = StyleTable {
            records,
            ..StyleTable::default()
        };
        let palette = Palette::standard();

        let mut tight = StyleResolver::new(&table, &palette, 3);
        assert!(matches!(
            tight.resolve(&StyleRef::Index(0)),
            Err(XlcanonError::CyclicStyleReference { hops: 3, .. })
        ));

        let mut loose = StyleResolver::new(&table, &palette, 4);
        assert!(loose.resolve(&StyleRef::Index(0)).is_ok());
    }

    #[test]
    fn test_dangling_indices_fall_back() {
        let table = table();
        let palette = Palette::office();
        let mut resolver = StyleResolver::new(&table, &palette, DEFAULT_MAX_HOPS);

        let fmt = resolver.resolve(&StyleRef::Index(2)).unwrap();
        assert_eq!(fmt.font, Font::default());

        // Missing record resolves to plain defaults
        let missing = resolver.resolve(&StyleRef::Index(500)).unwrap();
        assert_eq!(*missing, Formatting::default());
    }

    #[test]
    fn test_inline_style_inherits_from_parent() {
        let table = table();
        let palette = Palette::office();
        let mut resolver = StyleResolver::new(&table, &palette, DEFAULT_MAX_HOPS);

        let inline = InlineStyle {
            parent: Some(4),
            font: Some(RawFont {
                italic: true,
                ..RawFont::default()
            }),
            num_fmt_code: Some("0.00%".to_string()),
            ..InlineStyle::default()
        };
        let fmt = resolver
            .resolve(&StyleRef::Inline(Arc::new(inline)))
            .unwrap();
        assert!(fmt.font.italic);
        assert_eq!(fmt.fill.pattern, PatternType::Solid);
        assert_eq!(fmt.number_format.code, "0.00%");
        assert!(!fmt.number_format.is_date);
        assert_eq!(resolver.cached(), 0);
    }

    #[test]
    fn test_default_formatting_without_records() {
        let table = StyleTable::default();
        let palette = Palette::standard();
        let mut resolver = StyleResolver::new(&table, &palette, DEFAULT_MAX_HOPS);
        assert_eq!(
            *resolver.default_formatting().unwrap(),
            Formatting::default()
        );
    }

    #[test]
    fn test_dxf_resolution() {
        let mut table = table();
        table.dxfs.push(RawDxf {
            font: Some(RawFont {
                bold: true,
                color: Some(RawColor::Rgb("FF9C0006".to_string())),
                ..RawFont::default()
            }),
            fill: Some(RawFill {
                pattern: None,
                foreground: None,
                background: Some(RawColor::Rgb("FFFFC7CE".to_string())),
            }),
            ..RawDxf::default()
        });
        let palette = Palette::office();
        let resolver = StyleResolver::new(&table, &palette, DEFAULT_MAX_HOPS);

        let dxf = resolver.resolve_dxf(0).unwrap();
        assert!(dxf.font.unwrap().bold);
        assert_eq!(
            dxf.fill_background,
            Some(Color::rgb(Rgb::new(0xFF, 0xC7, 0xCE)))
        );
        assert!(resolver.resolve_dxf(1).is_none());
    }
}
