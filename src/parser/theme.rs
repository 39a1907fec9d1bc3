//! Theme color scheme from xl/theme/theme1.xml.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::color::DEFAULT_THEME_COLORS;
use crate::error::Result;
use crate::types::Rgb;
use crate::xml_helpers::attr_string;

// Index order used by `<color theme="n">`. The scheme lists dark before
// light, but style references count light first.
const SCHEME_SLOTS: [&str; 12] = [
    "lt1", "dk1", "lt2", "dk2", "accent1", "accent2", "accent3", "accent4", "accent5", "accent6",
    "hlink", "folHlink",
];

/// Theme index for a DrawingML `schemeClr` name.
pub(super) fn scheme_color_index(name: &str) -> Option<u32> {
    let slot = match name {
        "bg1" => "lt1",
        "tx1" => "dk1",
        "bg2" => "lt2",
        "tx2" => "dk2",
        other => other,
    };
    SCHEME_SLOTS
        .iter()
        .position(|&n| n == slot)
        .and_then(|i| u32::try_from(i).ok())
}

/// Theme colors in style-reference order. Slots the scheme leaves out keep
/// the default Office colors.
pub(super) fn parse_theme_colors<R: BufRead>(reader: R) -> Result<Vec<Rgb>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut colors = DEFAULT_THEME_COLORS.to_vec();
    let mut buf = Vec::new();
    let mut in_clr_scheme = false;
    let mut slot: Option<usize> = None;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                let local_name = e.local_name();
                let name = std::str::from_utf8(local_name.as_ref()).unwrap_or("");

                if name == "clrScheme" {
                    in_clr_scheme = true;
                } else if in_clr_scheme {
                    if let Some(index) = SCHEME_SLOTS.iter().position(|&n| n == name) {
                        slot = Some(index);
                    } else if let Some(index) = slot {
                        // sysClr carries its rendered value in lastClr
                        let value = match name {
                            "srgbClr" => attr_string(e, b"val"),
                            "sysClr" => attr_string(e, b"lastClr"),
                            _ => None,
                        };
                        if let (Some(rgb), Some(target)) =
                            (value.and_then(|v| Rgb::from_hex(&v)), colors.get_mut(index))
                        {
                            *target = rgb;
                        }
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let local_name = e.local_name();
                match local_name.as_ref() {
                    b"clrScheme" => {
                        in_clr_scheme = false;
                        slot = None;
                    }
                    name if SCHEME_SLOTS.iter().any(|s| s.as_bytes() == name) => slot = None,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(colors)
}
