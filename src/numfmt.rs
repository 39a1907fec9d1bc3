//! Number format lookup and date handling
//!
//! Number formats are carried through to the canonical model as their code
//! text. The only interpretation done here is deciding whether a code
//! displays a calendar date, and converting date serials to timestamps.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::types::NumberFormat;

/// Largest serial Excel accepts (9999-12-31), plus one for the time part.
const MAX_SERIAL: f64 = 2_958_466.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Built-in number format IDs (0-49 are predefined by Excel)
/// See: ECMA-376 Part 1, Section 18.8.30
pub const fn get_builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        // Currency formats (5-8)
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0 ;(#,##0)"),
        38 => Some("#,##0 ;[Red](#,##0)"),
        39 => Some("#,##0.00;(#,##0.00)"),
        40 => Some("#,##0.00;[Red](#,##0.00)"),
        // Accounting formats (41-44)
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mmss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}

/// Check if a format code is a date/time format
///
/// Quoted literals, bracketed sections (colors, conditions, locales), and
/// escaped or padding characters are ignored. Only the first section is
/// inspected, which is the one applied to positive serials.
pub fn is_date_format(format_code: &str) -> bool {
    let section = first_section(format_code);

    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut skip_next = false;
    let mut cleaned = String::with_capacity(section.len());

    for c in section.chars() {
        if skip_next {
            skip_next = false;
            continue;
        }
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            _ if in_brackets => {}
            // Escaped literal, fill character, or padding width
            '\\' | '*' | '_' => skip_next = true,
            _ => cleaned.push(c.to_ascii_lowercase()),
        }
    }

    cleaned.contains('y') ||
    cleaned.contains('m') && !cleaned.contains('#') ||  // m is month if no # (number format)
    cleaned.contains('d') ||
    cleaned.contains('h') ||
    cleaned.contains('s') && cleaned.contains(':') // s is seconds if with colon
}

/// Text before the first unquoted `;`.
fn first_section(format_code: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in format_code.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return format_code.get(..i).unwrap_or(format_code),
            _ => {}
        }
    }
    format_code
}

/// Resolve a number format id to its code.
///
/// Custom codes from the workbook win over built-ins; unknown ids fall back
/// to `General`.
pub fn resolve_format_code(id: u32, custom: &HashMap<u32, String>) -> String {
    custom
        .get(&id)
        .map(String::as_str)
        .or_else(|| get_builtin_format(id))
        .unwrap_or("General")
        .to_string()
}

/// Build the canonical number format for a code.
pub fn number_format(code: impl Into<String>) -> NumberFormat {
    let code = code.into();
    let is_date = is_date_format(&code) || is_elapsed_time(&code);
    NumberFormat { code, is_date }
}

fn is_elapsed_time(code: &str) -> bool {
    let lower = code.to_ascii_lowercase();
    ["[h]", "[hh]", "[m]", "[mm]", "[s]", "[ss]"]
        .iter()
        .any(|token| lower.contains(token))
}

/// Convert an Excel date serial to a calendar timestamp.
///
/// The 1900 system counts from 1899-12-30 and includes the nonexistent
/// 1900-02-29 (serial 60), which maps to 1900-02-28. Serials below 60 are
/// shifted one day so serial 1 is 1900-01-01. The 1904 system counts from
/// 1904-01-01. Negative, non-finite, and out-of-range serials return `None`.
/// Time of day is rounded to the millisecond.
#[allow(clippy::cast_possible_truncation)]
pub fn serial_to_datetime(serial: f64, date_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial >= MAX_SERIAL {
        return None;
    }

    let days = serial.floor();
    let millis = ((serial - days) * MILLIS_PER_DAY).round() as i64;
    // Bounded above by MAX_SERIAL
    let days = days as i64;

    let date = if date_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?.checked_add_signed(Duration::days(days))?
    } else if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?.checked_add_signed(Duration::days(days))?
    } else if days == 60 {
        NaiveDate::from_ymd_opt(1900, 2, 28)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(days))?
    };

    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::milliseconds(millis))
}

/// Parse the ISO 8601 text of a date-typed cell.
///
/// Accepts a date, a date with a time (a UTC offset is dropped, keeping the
/// wall-clock time as written), or a bare time, which lands on 1899-12-31
/// like a fractional 1900-system serial.
pub fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    let time = NaiveTime::parse_from_str(text, "%H:%M:%S%.f").ok()?;
    Some(NaiveDate::from_ymd_opt(1899, 12, 31)?.and_time(time))
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
    use test_case::test_case;

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test_case("mm-dd-yy", true ; "builtin 14")]
    #[test_case("d-mmm-yy", true ; "builtin 15")]
    #[test_case("h:mm AM/PM", true ; "time")]
    #[test_case("yyyy-mm-dd hh:mm:ss", true ; "iso")]
    #[test_case("[$-409]mmmm d, yyyy", true ; "locale prefix")]
    #[test_case("General", false ; "general")]
    #[test_case("0.00", false ; "decimal")]
    #[test_case("#,##0", false ; "thousands")]
    #[test_case("0.00E+00", false ; "scientific")]
    #[test_case("$#,##0_);[Red]($#,##0)", false ; "currency with red")]
    #[test_case("0 \"days\"", false ; "quoted literal")]
    #[test_case("0\\d", false ; "escaped literal")]
    #[test_case("@", false ; "text")]
    fn test_date_detection(code: &str, expected: bool) {
        assert_eq!(is_date_format(code), expected);
    }

    #[test]
    fn test_elapsed_time_is_date() {
        assert!(number_format("[h]:mm:ss").is_date);
        assert!(number_format("mm-dd-yy").is_date);
        assert!(!number_format("0%").is_date);
    }

    #[test]
    fn test_resolve_format_code() {
        let mut custom = HashMap::new();
        custom.insert(164, "yyyy-mm-dd".to_string());
        custom.insert(4, "0.0000".to_string());

        assert_eq!(resolve_format_code(164, &custom), "yyyy-mm-dd");
        assert_eq!(resolve_format_code(4, &custom), "0.0000");
        assert_eq!(resolve_format_code(9, &custom), "0%");
        assert_eq!(resolve_format_code(200, &custom), "General");
    }

    #[test_case(1.0, ymd_hms(1900, 1, 1, 0, 0, 0) ; "serial one")]
    #[test_case(59.0, ymd_hms(1900, 2, 28, 0, 0, 0) ; "day before leap bug")]
    #[test_case(60.0, ymd_hms(1900, 2, 28, 0, 0, 0) ; "phantom leap day")]
    #[test_case(61.0, ymd_hms(1900, 3, 1, 0, 0, 0) ; "day after leap bug")]
    #[test_case(45_000.0, ymd_hms(2023, 3, 15, 0, 0, 0) ; "modern date")]
    #[test_case(45_000.5, ymd_hms(2023, 3, 15, 12, 0, 0) ; "noon")]
    fn test_serial_1900(serial: f64, expected: NaiveDateTime) {
        assert_eq!(serial_to_datetime(serial, false), Some(expected));
    }

    #[test]
    fn test_date1904_system() {
        assert_eq!(
            serial_to_datetime(0.0, true),
            Some(ymd_hms(1904, 1, 1, 0, 0, 0))
        );
        // Same calendar day is 1462 serials apart between the systems
        assert_eq!(
            serial_to_datetime(45_000.0 - 1462.0, true),
            serial_to_datetime(45_000.0, false)
        );
    }

    #[test]
    fn test_time_rounds_to_millisecond() {
        // 23:59:59.9999 rounds up into the next day
        let serial = 45_000.0 + 86_399.999_9 / 86_400.0;
        assert_eq!(
            serial_to_datetime(serial, false),
            Some(ymd_hms(2023, 3, 16, 0, 0, 0))
        );
    }

    #[test_case(-1.0 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    #[test_case(f64::INFINITY ; "infinite")]
    #[test_case(3_000_000.0 ; "past year 9999")]
    fn test_unconvertible_serials(serial: f64) {
        assert_eq!(serial_to_datetime(serial, false), None);
    }

    #[test_case("2024-03-01T00:00:00", ymd_hms(2024, 3, 1, 0, 0, 0) ; "date and time")]
    #[test_case("2024-03-01T14:05:09.250", ymd_hms(2024, 3, 1, 14, 5, 9) + Duration::milliseconds(250) ; "fraction")]
    #[test_case("2024-03-01", ymd_hms(2024, 3, 1, 0, 0, 0) ; "date only")]
    #[test_case("2024-03-01T08:30:00Z", ymd_hms(2024, 3, 1, 8, 30, 0) ; "utc")]
    #[test_case("2024-03-01T08:30:00+02:00", ymd_hms(2024, 3, 1, 8, 30, 0) ; "offset kept as written")]
    #[test_case("12:30:00", ymd_hms(1899, 12, 31, 12, 30, 0) ; "time only")]
    fn test_parse_iso_datetime(text: &str, expected: NaiveDateTime) {
        assert_eq!(parse_iso_datetime(text), Some(expected));
    }

    #[test_case("" ; "empty")]
    #[test_case("2024-13-01" ; "bad month")]
    #[test_case("yesterday" ; "words")]
    fn test_unparseable_iso_text(text: &str) {
        assert_eq!(parse_iso_datetime(text), None);
    }
}
