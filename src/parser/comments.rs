//! Cell comments (xl/commentsN.xml).

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;
use crate::source::CommentNode;
use crate::xml_helpers::{attr_string, attr_u32, read_text};

use super::shared_strings::read_rich_text;

/// Parse a comments part. Authors are resolved from the `<authors>` list by
/// position; comments without a `ref` are dropped.
pub(super) fn parse_comments<R: BufRead>(reader: R) -> Result<Vec<CommentNode>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut authors: Vec<String> = Vec::new();
    let mut comments = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<(String, Option<u32>)> = None;
    let mut text = String::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"author" => authors.push(read_text(&mut xml)?),
                b"comment" => {
                    current = attr_string(e, b"ref").map(|r| (r, attr_u32(e, b"authorId")));
                    text.clear();
                }
                b"text" if current.is_some() => text = read_rich_text(&mut xml)?,
                _ => {}
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"comment" => {
                if let Some((reference, author_id)) = current.take() {
                    let author = author_id
                        .and_then(|id| usize::try_from(id).ok())
                        .and_then(|id| authors.get(id))
                        .cloned();
                    comments.push(CommentNode {
                        reference,
                        author,
                        text: std::mem::take(&mut text),
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("comments part is malformed after {} comments", comments.len());
                return Err(e.into());
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(comments)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_with_authors() {
        let xml = r#"<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <authors><author>Ana</author><author>Lee</author></authors>
  <commentList>
    <comment ref="B2" authorId="1"><text><r><rPr><b/></rPr><t>Lee:</t></r><r><t xml:space="preserve"> check this</t></r></text></comment>
    <comment ref="C5" authorId="7"><text><t>Orphan</t></text></comment>
  </commentList>
</comments>"#;
        let comments = parse_comments(xml.as_bytes()).unwrap();

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].reference, "B2");
        assert_eq!(comments[0].author.as_deref(), Some("Lee"));
        assert_eq!(comments[0].text, "Lee: check this");
        assert_eq!(comments[1].author, None);
        assert_eq!(comments[1].text, "Orphan");
    }
}
