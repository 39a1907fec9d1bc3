//! Package plumbing: relationship parts, content types and part paths.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;
use crate::xml_helpers::attr_string;

/// One `<Relationship>` with its target resolved to a part path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Relationship {
    /// Last segment of the relationship type URI (`worksheet`, `image`, ...).
    pub kind: String,
    /// Package path for internal targets, the raw URI for external ones.
    pub target: String,
    pub external: bool,
}

/// Relationships of a single part, keyed by `Id`.
#[derive(Debug, Default)]
pub(super) struct Relationships {
    by_id: HashMap<String, Relationship>,
}

impl Relationships {
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id)
    }

    /// Target of the first relationship of `kind`. Ties are broken by id so
    /// the result does not depend on hash order.
    pub fn first_of_kind(&self, kind: &str) -> Option<&str> {
        self.by_id
            .iter()
            .filter(|(_, rel)| rel.kind == kind && !rel.external)
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, rel)| rel.target.as_str())
    }

    /// Targets of all relationships of `kind`, ordered by id.
    pub fn all_of_kind(&self, kind: &str) -> Vec<&str> {
        let mut found: Vec<(&String, &Relationship)> = self
            .by_id
            .iter()
            .filter(|(_, rel)| rel.kind == kind && !rel.external)
            .collect();
        found.sort_by(|(a, _), (b, _)| a.cmp(b));
        found.into_iter().map(|(_, rel)| rel.target.as_str()).collect()
    }
}

/// Parse a `.rels` part belonging to `part_path`.
pub(super) fn parse_relationships<R: BufRead>(
    reader: R,
    part_path: &str,
) -> Result<Relationships> {
    let base_dir = parent_dir(part_path);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut rels = Relationships::default();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let id = attr_string(e, b"Id").unwrap_or_default();
                    let target = attr_string(e, b"Target").unwrap_or_default();
                    let rel_type = attr_string(e, b"Type").unwrap_or_default();
                    let external = attr_string(e, b"TargetMode").as_deref() == Some("External");

                    if !id.is_empty() && !target.is_empty() {
                        let kind = rel_type.rsplit('/').next().unwrap_or_default().to_string();
                        let target = if external {
                            target
                        } else {
                            resolve_relative_path(base_dir, &target)
                        };
                        rels.by_id.insert(
                            id,
                            Relationship {
                                kind,
                                target,
                                external,
                            },
                        );
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("relationships for {part_path} are malformed");
                return Err(e.into());
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Path of the relationships part for `part_path`,
/// e.g. `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`.
pub(super) fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

/// Directory portion of a part path, without the trailing slash.
pub(super) fn parent_dir(part_path: &str) -> &str {
    part_path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Resolve a relationship target against the directory of its source part.
pub(super) fn resolve_relative_path(base_dir: &str, relative: &str) -> String {
    // Absolute targets are rooted at the package
    if let Some(stripped) = relative.strip_prefix('/') {
        return stripped.to_string();
    }

    let mut components: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for part in relative.split('/') {
        match part {
            ".." => {
                components.pop();
            }
            "." | "" => {}
            _ => components.push(part),
        }
    }
    components.join("/")
}

/// `[Content_Types].xml`: defaults by extension plus per-part overrides.
#[derive(Debug, Default)]
pub(super) struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut xml = Reader::from_reader(reader);
        xml.trim_text(true);

        let mut types = Self::default();
        let mut buf = Vec::new();

        loop {
            match xml.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                    let content_type = attr_string(e, b"ContentType");
                    match (e.local_name().as_ref(), content_type) {
                        (b"Default", Some(ct)) => {
                            if let Some(ext) = attr_string(e, b"Extension") {
                                types.defaults.insert(ext.to_ascii_lowercase(), ct);
                            }
                        }
                        (b"Override", Some(ct)) => {
                            if let Some(part) = attr_string(e, b"PartName") {
                                types
                                    .overrides
                                    .insert(part.trim_start_matches('/').to_string(), ct);
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(e.into()),
                _ => {}
            }
            buf.clear();
        }

        Ok(types)
    }

    /// Declared content type of a part, override first.
    pub fn get(&self, part_path: &str) -> Option<&str> {
        self.overrides
            .get(part_path)
            .or_else(|| {
                let (_, ext) = part_path.rsplit_once('.')?;
                self.defaults.get(&ext.to_ascii_lowercase())
            })
            .map(String::as_str)
    }
}
