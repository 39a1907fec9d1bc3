//! Color normalization
//!
//! Converts every source color encoding (RGB/ARGB text, theme index + tint,
//! indexed palette entry, automatic) into the canonical [`Color`]. Pure
//! functions only; the palette is passed in by the caller.

use crate::source::{Palette, RawColor};
use crate::types::{Color, Rgb};

/// Excel's 64 indexed colors (legacy palette)
pub const INDEXED_COLORS: [Rgb; 64] = [
    Rgb::new(0x00, 0x00, 0x00), Rgb::new(0xFF, 0xFF, 0xFF), Rgb::new(0xFF, 0x00, 0x00), Rgb::new(0x00, 0xFF, 0x00),
    Rgb::new(0x00, 0x00, 0xFF), Rgb::new(0xFF, 0xFF, 0x00), Rgb::new(0xFF, 0x00, 0xFF), Rgb::new(0x00, 0xFF, 0xFF),
    Rgb::new(0x00, 0x00, 0x00), Rgb::new(0xFF, 0xFF, 0xFF), Rgb::new(0xFF, 0x00, 0x00), Rgb::new(0x00, 0xFF, 0x00),
    Rgb::new(0x00, 0x00, 0xFF), Rgb::new(0xFF, 0xFF, 0x00), Rgb::new(0xFF, 0x00, 0xFF), Rgb::new(0x00, 0xFF, 0xFF),
    Rgb::new(0x80, 0x00, 0x00), Rgb::new(0x00, 0x80, 0x00), Rgb::new(0x00, 0x00, 0x80), Rgb::new(0x80, 0x80, 0x00),
    Rgb::new(0x80, 0x00, 0x80), Rgb::new(0x00, 0x80, 0x80), Rgb::new(0xC0, 0xC0, 0xC0), Rgb::new(0x80, 0x80, 0x80),
    Rgb::new(0x99, 0x99, 0xFF), Rgb::new(0x99, 0x33, 0x66), Rgb::new(0xFF, 0xFF, 0xCC), Rgb::new(0xCC, 0xFF, 0xFF),
    Rgb::new(0x66, 0x00, 0x66), Rgb::new(0xFF, 0x80, 0x80), Rgb::new(0x00, 0x66, 0xCC), Rgb::new(0xCC, 0xCC, 0xFF),
    Rgb::new(0x00, 0x00, 0x80), Rgb::new(0xFF, 0x00, 0xFF), Rgb::new(0xFF, 0xFF, 0x00), Rgb::new(0x00, 0xFF, 0xFF),
    Rgb::new(0x80, 0x00, 0x80), Rgb::new(0x80, 0x00, 0x00), Rgb::new(0x00, 0x80, 0x80), Rgb::new(0x00, 0x00, 0xFF),
    Rgb::new(0x00, 0xCC, 0xFF), Rgb::new(0xCC, 0xFF, 0xFF), Rgb::new(0xCC, 0xFF, 0xCC), Rgb::new(0xFF, 0xFF, 0x99),
    Rgb::new(0x99, 0xCC, 0xFF), Rgb::new(0xFF, 0x99, 0xCC), Rgb::new(0xCC, 0x99, 0xFF), Rgb::new(0xFF, 0xCC, 0x99),
    Rgb::new(0x33, 0x66, 0xFF), Rgb::new(0x33, 0xCC, 0xCC), Rgb::new(0x99, 0xCC, 0x00), Rgb::new(0xFF, 0xCC, 0x00),
    Rgb::new(0xFF, 0x99, 0x00), Rgb::new(0xFF, 0x66, 0x00), Rgb::new(0x66, 0x66, 0x99), Rgb::new(0x96, 0x96, 0x96),
    Rgb::new(0x00, 0x33, 0x66), Rgb::new(0x33, 0x99, 0x66), Rgb::new(0x00, 0x33, 0x00), Rgb::new(0x33, 0x33, 0x00),
    Rgb::new(0x99, 0x33, 0x00), Rgb::new(0x99, 0x33, 0x66), Rgb::new(0x33, 0x33, 0x99), Rgb::new(0x33, 0x33, 0x33),
];

/// Default theme colors (Office theme) used when no theme part is present.
///
/// Ordered by `<color theme="n">` index, which swaps the first two pairs
/// relative to the clrScheme element order:
/// 0: lt1, 1: dk1, 2: lt2, 3: dk2, 4-9: accent1-6, 10: hlink, 11: folHlink
pub const DEFAULT_THEME_COLORS: [Rgb; 12] = [
    Rgb::new(0xFF, 0xFF, 0xFF),
    Rgb::new(0x00, 0x00, 0x00),
    Rgb::new(0xE7, 0xE6, 0xE6),
    Rgb::new(0x44, 0x54, 0x6A),
    Rgb::new(0x44, 0x72, 0xC4),
    Rgb::new(0xED, 0x7D, 0x31),
    Rgb::new(0xA5, 0xA5, 0xA5),
    Rgb::new(0xFF, 0xC0, 0x00),
    Rgb::new(0x5B, 0x9B, 0xD5),
    Rgb::new(0x70, 0xAD, 0x47),
    Rgb::new(0x05, 0x63, 0xC1),
    Rgb::new(0x95, 0x4F, 0x72),
];

/// Normalize a raw source color against the workbook palette.
///
/// Unparseable hex text and indexed colors past the palette end (including
/// the system foreground/background slots 64 and 65) become [`Color::Auto`].
pub fn normalize(raw: &RawColor, palette: &Palette) -> Color {
    match raw {
        RawColor::Rgb(hex) => Rgb::from_hex(hex).map_or(Color::Auto, Color::rgb),
        RawColor::Theme { index, tint } => Color::Theme {
            index: *index,
            tint: *tint,
            rgb: theme_rgb(*index, *tint, palette),
        },
        RawColor::Indexed(index) => indexed(*index, palette),
        RawColor::Auto => Color::Auto,
    }
}

/// Re-resolve an already canonical color.
///
/// RGB and automatic colors come back unchanged; theme and indexed colors
/// get their approximation recomputed from `palette`.
pub fn renormalize(color: &Color, palette: &Palette) -> Color {
    match color {
        Color::Rgb { .. } | Color::Auto => color.clone(),
        Color::Theme { index, tint, .. } => Color::Theme {
            index: *index,
            tint: *tint,
            rgb: theme_rgb(*index, *tint, palette),
        },
        Color::Indexed { index, .. } => indexed(*index, palette),
    }
}

fn indexed(index: u32, palette: &Palette) -> Color {
    usize::try_from(index)
        .ok()
        .and_then(|i| palette.indexed.get(i))
        .map_or(Color::Auto, |rgb| Color::Indexed {
            index,
            rgb: Some(*rgb),
        })
}

fn theme_rgb(index: u32, tint: f64, palette: &Palette) -> Option<Rgb> {
    let colors = palette.theme.as_ref()?;
    let base = *colors.get(usize::try_from(index).ok()?)?;
    Some(apply_tint(base, tint))
}

/// Apply a tint value to a color
/// tint < 0: shade (darken)
/// tint > 0: tint (lighten)
///
/// A zero tint returns `base` exactly.
#[allow(clippy::many_single_char_names)]
pub fn apply_tint(base: Rgb, tint: f64) -> Rgb {
    if tint.abs() < f64::EPSILON {
        return base;
    }

    let (h, s, l) = rgb_to_hsl(base);

    let new_l = if tint < 0.0 {
        l * (1.0 + tint)
    } else {
        (1.0 - l).mul_add(tint, l)
    };

    hsl_to_rgb(h, s, new_l.clamp(0.0, 1.0))
}

/// Convert RGB to HSL
#[allow(clippy::many_single_char_names)]
fn rgb_to_hsl(rgb: Rgb) -> (f64, f64, f64) {
    let r = f64::from(rgb.r) / 255.0;
    let g = f64::from(rgb.g) / 255.0;
    let b = f64::from(rgb.b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if (max - r).abs() < f64::EPSILON {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if (max - g).abs() < f64::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h / 6.0, s, l)
}

/// Convert HSL to RGB
#[allow(clippy::many_single_char_names)]
fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    if s.abs() < f64::EPSILON {
        let v = unit_to_byte(l);
        return Rgb::new(v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l.mul_add(-s, l + s)
    };
    let p = 2.0f64.mul_add(l, -q);

    Rgb::new(
        unit_to_byte(hue_to_rgb(p, q, h + 1.0 / 3.0)),
        unit_to_byte(hue_to_rgb(p, q, h)),
        unit_to_byte(hue_to_rgb(p, q, h - 1.0 / 3.0)),
    )
}

/// Scale a 0..=1 channel to a byte. The clamp keeps the cast in range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_byte(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }

    if t < 1.0 / 6.0 {
        return ((q - p) * 6.0).mul_add(t, p);
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return ((q - p) * (2.0 / 3.0 - t)).mul_add(6.0, p);
    }
    p
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
    use proptest::prelude::*;
    use test_case::test_case;

    fn hex(s: &str) -> Rgb {
        Rgb::from_hex(s).unwrap()
    }

    #[test]
    fn test_tint_lighten() {
        // 50% tint on black should give gray
        assert_eq!(apply_tint(Rgb::BLACK, 0.5), hex("808080"));
    }

    #[test]
    fn test_tint_darken() {
        // 50% shade on white should give gray
        assert_eq!(apply_tint(Rgb::WHITE, -0.5), hex("808080"));
    }

    #[test]
    fn test_accent_tints() {
        // accent1 at +40% and -25%, as Excel's palette shows them
        let accent1 = DEFAULT_THEME_COLORS[4];
        assert_eq!(apply_tint(accent1, 0.399_975_585_192_419_2), hex("8FAADC"));
        assert_eq!(apply_tint(accent1, -0.249_977_111_117_893), hex("2F5597"));
    }

    #[test]
    fn test_zero_tint_returns_base_for_every_theme_slot() {
        let palette = Palette::office();
        for (i, base) in DEFAULT_THEME_COLORS.iter().enumerate() {
            let color = normalize(
                &RawColor::Theme {
                    index: u32::try_from(i).unwrap(),
                    tint: 0.0,
                },
                &palette,
            );
            assert_eq!(color.resolved(), Some(*base));
        }
    }

    #[test_case("FF0000", Some(Rgb::new(0xFF, 0, 0)) ; "rgb")]
    #[test_case("#00ff00", Some(Rgb::new(0, 0xFF, 0)) ; "hash prefixed lowercase")]
    #[test_case("FF0000FF", Some(Rgb::new(0, 0, 0xFF)) ; "argb drops alpha")]
    #[test_case("00123456", Some(Rgb::new(0x12, 0x34, 0x56)) ; "transparent argb keeps rgb")]
    #[test_case("XYZ", None ; "garbage")]
    #[test_case("FFFFF", None ; "short")]
    fn test_rgb_text(input: &str, expected: Option<Rgb>) {
        let color = normalize(&RawColor::Rgb(input.to_string()), &Palette::standard());
        assert_eq!(color.resolved(), expected);
        if expected.is_none() {
            assert_eq!(color, Color::Auto);
        }
    }

    #[test]
    fn test_indexed_colors() {
        let palette = Palette::standard();
        assert_eq!(
            normalize(&RawColor::Indexed(2), &palette),
            Color::Indexed {
                index: 2,
                rgb: Some(hex("FF0000"))
            }
        );
        // System foreground/background are outside the palette.
        assert_eq!(normalize(&RawColor::Indexed(64), &palette), Color::Auto);
        assert_eq!(normalize(&RawColor::Indexed(65), &palette), Color::Auto);
    }

    #[test]
    fn test_custom_indexed_palette() {
        let palette = Palette {
            theme: None,
            indexed: vec![hex("123456")],
        };
        assert_eq!(
            normalize(&RawColor::Indexed(0), &palette).resolved(),
            Some(hex("123456"))
        );
        assert_eq!(normalize(&RawColor::Indexed(1), &palette), Color::Auto);
    }

    #[test]
    fn test_theme_without_palette_keeps_tag() {
        let color = normalize(
            &RawColor::Theme {
                index: 4,
                tint: 0.0,
            },
            &Palette::standard(),
        );
        assert_eq!(
            color,
            Color::Theme {
                index: 4,
                tint: 0.0,
                rgb: None
            }
        );
    }

    #[test]
    fn test_theme_index_out_of_range() {
        let color = normalize(
            &RawColor::Theme {
                index: 40,
                tint: 0.0,
            },
            &Palette::office(),
        );
        assert_eq!(color.resolved(), None);
    }

    proptest! {
        #[test]
        fn prop_canonical_rgb_is_fixed_point(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let palette = Palette::office();
            let once = normalize(&RawColor::Rgb(Rgb::new(r, g, b).to_hex()), &palette);
            prop_assert_eq!(&once, &Color::rgb(Rgb::new(r, g, b)));
            prop_assert_eq!(renormalize(&once, &palette), once);
        }

        #[test]
        fn prop_renormalize_is_idempotent(index in 0u32..80, tint in -1.0f64..1.0) {
            let palette = Palette::office();
            for raw in [RawColor::Theme { index, tint }, RawColor::Indexed(index)] {
                let once = normalize(&raw, &palette);
                let twice = renormalize(&once, &palette);
                prop_assert_eq!(&renormalize(&twice, &palette), &twice);
                prop_assert_eq!(twice, once);
            }
        }
    }
}
