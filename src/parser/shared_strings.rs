//! Shared string table from xl/sharedStrings.xml.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;
use crate::xml_helpers::unclosed_element;

/// Plain text of each `<si>` entry.
pub(super) fn parse_shared_strings<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"si" => {
                strings.push(read_rich_text(&mut xml)?);
            }
            // <si/> is a valid empty entry
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!(
                    "sharedStrings.xml is malformed after {} entries",
                    strings.len()
                );
                return Err(e.into());
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Text of a rich text container (`<si>`, `<is>`, comment `<text>`) whose
/// start tag was just read. Runs are concatenated and phonetic runs are
/// left out. Consumes events through the container's end tag.
pub(super) fn read_rich_text<R: BufRead>(xml: &mut Reader<R>) -> Result<String> {
    let mut text = String::new();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                match e.local_name().as_ref() {
                    b"rPh" => in_phonetic = true,
                    b"t" if !in_phonetic => in_t = true,
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) if in_t => {
                if let Ok(t) = e.unescape() {
                    text.push_str(&t);
                }
            }
            Ok(Event::End(ref e)) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                match e.local_name().as_ref() {
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                }
            }
            Ok(Event::Eof) => return Err(unclosed_element()),
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}
