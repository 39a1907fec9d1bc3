//! Shared XML attribute parsing utilities for the OpenXML reader.
//!
//! All functions handle namespace-prefixed attributes and UTF-8 conversion
//! without failing; a malformed attribute reads as absent.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, XlcanonError};
use crate::source::RawColor;

/// Extract a string attribute value by key.
///
/// Returns `None` if the attribute is missing or not valid UTF-8.
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return attr.unescape_value().ok().map(|s| s.into_owned());
        }
    }
    None
}

/// Extract a string attribute by local name (ignoring namespace prefix).
pub fn attr_string_local(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == key {
            return attr.unescape_value().ok().map(|s| s.into_owned());
        }
    }
    None
}

/// Extract a `u32` attribute value by key.
pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract an `i32` attribute value by key.
pub fn attr_i32(e: &BytesStart, key: &[u8]) -> Option<i32> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract an `i64` attribute value by key.
pub fn attr_i64(e: &BytesStart, key: &[u8]) -> Option<i64> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract an `f64` attribute value by key.
pub fn attr_f64(e: &BytesStart, key: &[u8]) -> Option<f64> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract a boolean attribute value by key.
///
/// Returns `None` if missing. Recognizes `"1"`, `"true"` as true; anything
/// else as false.
pub fn attr_bool(e: &BytesStart, key: &[u8]) -> Option<bool> {
    attr_string(e, key).map(|s| matches!(s.as_str(), "1" | "true"))
}

/// Extract a boolean attribute with a default value.
pub fn attr_bool_default(e: &BytesStart, key: &[u8], default: bool) -> bool {
    attr_bool(e, key).unwrap_or(default)
}

/// Extract the `val` attribute as a string. Very common in OpenXML.
pub fn attr_val(e: &BytesStart) -> Option<String> {
    attr_string(e, b"val")
}

/// Extract the `val` attribute as `u32`.
pub fn attr_val_u32(e: &BytesStart) -> Option<u32> {
    attr_u32(e, b"val")
}

/// Extract the `val` attribute as `f64`.
pub fn attr_val_f64(e: &BytesStart) -> Option<f64> {
    attr_f64(e, b"val")
}

/// Read a color element (`<color>`, `<fgColor>`, `<tabColor>`, ...).
///
/// `rgb` wins over `theme`, which wins over `indexed`. An element with none
/// of those and no `auto` flag is `None`.
pub fn parse_color_attrs(e: &BytesStart) -> Option<RawColor> {
    if let Some(rgb) = attr_string(e, b"rgb") {
        return Some(RawColor::Rgb(rgb));
    }
    if let Some(index) = attr_u32(e, b"theme") {
        return Some(RawColor::Theme {
            index,
            tint: attr_f64(e, b"tint").unwrap_or(0.0),
        });
    }
    if let Some(index) = attr_u32(e, b"indexed") {
        return Some(RawColor::Indexed(index));
    }
    attr_bool_default(e, b"auto", false).then_some(RawColor::Auto)
}

/// Get the local element name as an owned string.
///
/// Returns empty string if not valid UTF-8.
#[inline]
pub fn local_name_string(e: &BytesStart) -> String {
    let bytes = e.local_name();
    std::str::from_utf8(bytes.as_ref())
        .unwrap_or("")
        .to_string()
}

/// Collect the text content of the element whose start tag was just read,
/// consuming events through its end tag. Nested markup is skipped but its
/// text is kept.
///
/// # Errors
/// Malformed XML, or a document that ends before the element closes.
pub fn read_text<R: BufRead>(xml: &mut Reader<R>) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Text(t)) => {
                if let Ok(s) = t.unescape() {
                    text.push_str(&s);
                }
            }
            Ok(Event::CData(c)) => {
                if let Ok(s) = std::str::from_utf8(&c) {
                    text.push_str(s);
                }
            }
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Ok(Event::Eof) => return Err(unclosed_element()),
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

/// Skip the rest of the element whose start tag was just read.
///
/// # Errors
/// Malformed XML, or a document that ends before the element closes.
pub fn skip_element<R: BufRead>(xml: &mut Reader<R>) -> Result<()> {
    let mut depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Ok(Event::Eof) => return Err(unclosed_element()),
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Error for a part whose document ends inside an open element.
pub fn unclosed_element() -> XlcanonError {
    XlcanonError::Container("XML document ends inside an open element".to_string())
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

    fn make_start(xml: &str) -> BytesStart<'_> {
        // Strip < and > / /> to get just the tag content
        let content = xml
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_end_matches('/')
            .trim_end();
        BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
    }

    #[test]
    fn test_attr_string_and_numbers() {
        let e = make_start(r#"<foo name="a &amp; b" count="42" neg="-7" val="2.5" />"#);
        assert_eq!(attr_string(&e, b"name"), Some("a & b".to_string()));
        assert_eq!(attr_string(&e, b"missing"), None);
        assert_eq!(attr_u32(&e, b"count"), Some(42));
        assert_eq!(attr_u32(&e, b"neg"), None);
        assert_eq!(attr_i32(&e, b"neg"), Some(-7));
        assert_eq!(attr_val_f64(&e), Some(2.5));
    }

    #[test]
    fn test_attr_string_local_ignores_prefix() {
        let e = make_start(r#"<sheet name="S" r:id="rId3" />"#);
        assert_eq!(attr_string_local(&e, b"id"), Some("rId3".to_string()));
        assert_eq!(attr_string(&e, b"id"), None);
    }

    #[test]
    fn test_attr_bool() {
        let e = make_start(r#"<foo a="1" b="0" c="true" d="false" />"#);
        assert_eq!(attr_bool(&e, b"a"), Some(true));
        assert_eq!(attr_bool(&e, b"b"), Some(false));
        assert_eq!(attr_bool(&e, b"c"), Some(true));
        assert_eq!(attr_bool(&e, b"d"), Some(false));
        assert!(attr_bool_default(&e, b"missing", true));
    }

    #[test]
    fn test_parse_color_attrs() {
        let rgb = make_start(r#"<color rgb="FFFF0000" theme="1" />"#);
        assert_eq!(parse_color_attrs(&rgb), Some(RawColor::Rgb("FFFF0000".into())));

        let theme = make_start(r#"<color theme="4" tint="-0.25" />"#);
        assert_eq!(
            parse_color_attrs(&theme),
            Some(RawColor::Theme {
                index: 4,
                tint: -0.25
            })
        );

        let indexed = make_start(r#"<color indexed="64" />"#);
        assert_eq!(parse_color_attrs(&indexed), Some(RawColor::Indexed(64)));

        let auto = make_start(r#"<color auto="1" />"#);
        assert_eq!(parse_color_attrs(&auto), Some(RawColor::Auto));

        let empty = make_start("<color />");
        assert_eq!(parse_color_attrs(&empty), None);
    }

    #[test]
    fn test_read_text_spans_runs() {
        let mut xml = Reader::from_str("<text><r><t>Hello </t></r><r><t>world</t></r></text><next/>");
        let mut buf = Vec::new();
        assert!(matches!(xml.read_event_into(&mut buf), Ok(Event::Start(_))));
        assert_eq!(read_text(&mut xml).unwrap(), "Hello world");
        buf.clear();
        assert!(matches!(xml.read_event_into(&mut buf), Ok(Event::Empty(_))));
    }

    #[test]
    fn test_read_text_mismatched_end_tag() {
        let mut xml = Reader::from_str("<v><b>12</i></v>");
        let mut buf = Vec::new();
        assert!(matches!(xml.read_event_into(&mut buf), Ok(Event::Start(_))));
        assert!(matches!(read_text(&mut xml), Err(XlcanonError::Xml(_))));
    }

    #[test]
    fn test_skip_element_truncated() {
        let mut xml = Reader::from_str("<extLst><ext><x/>");
        let mut buf = Vec::new();
        assert!(matches!(xml.read_event_into(&mut buf), Ok(Event::Start(_))));
        assert!(matches!(skip_element(&mut xml), Err(XlcanonError::Container(_))));
    }
}
