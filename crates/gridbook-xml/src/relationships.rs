//! Relationship (`.rels`) parts.
//!
//! A relationships collection is an insertion-ordered list of typed edges
//! keyed by id. Order is preserved so serialization is stable across
//! round-trips.

use quick_xml::events::Event;

use crate::namespaces::PACKAGE_RELATIONSHIPS;
use crate::sax::{self, Emitter};
use crate::Result;

/// A typed directed edge from one part to another (or an external target).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    /// True when `TargetMode="External"`.
    pub is_external: bool,
}

/// An ordered collection of relationships belonging to one source part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    entries: Vec<Relationship>,
}

impl Relationships {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a relationship. Ids are expected to be unique; the first
    /// entry wins on lookup if they are not.
    pub fn push(&mut self, rel: Relationship) {
        self.entries.push(rel);
    }

    /// Append an internal relationship, returning the id it was given.
    pub fn add(&mut self, id: String, rel_type: &str, target: &str) -> String {
        self.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            is_external: false,
        });
        id
    }

    /// Append an external-mode relationship, returning the id it was given.
    pub fn add_external(&mut self, id: String, rel_type: &str, target: &str) -> String {
        self.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            is_external: true,
        });
        id
    }

    /// Look up a relationship by id.
    pub fn by_id(&self, id: &str) -> Option<&Relationship> {
        self.entries.iter().find(|r| r.id == id)
    }

    /// All relationships of the given type, in insertion order.
    pub fn by_type<'a>(&'a self, rel_type: &'a str) -> impl Iterator<Item = &'a Relationship> {
        self.entries.iter().filter(move |r| r.rel_type == rel_type)
    }

    /// The first relationship of the given type, if any.
    pub fn first_of_type<'a>(&'a self, rel_type: &'a str) -> Option<&'a Relationship> {
        self.by_type(rel_type).next()
    }

    /// All entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a `.rels` payload.
pub fn parse_relationships(part: &str, data: &[u8]) -> Result<Relationships> {
    let mut reader = sax::reader(data);
    let mut buf = Vec::new();
    let mut rels = Relationships::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = sax::require_attr(part, e, "Id")?;
                let rel_type = sax::require_attr(part, e, "Type")?;
                let target = sax::require_attr(part, e, "Target")?;
                let is_external = sax::attr(part, e, "TargetMode")?
                    .map(|mode| mode == "External")
                    .unwrap_or(false);
                rels.push(Relationship {
                    id,
                    rel_type,
                    target,
                    is_external,
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(crate::Error::malformed(part, e)),
            _ => {}
        }
    }

    Ok(rels)
}

/// Serialize a relationships collection back to XML.
pub fn write_relationships(rels: &Relationships) -> Result<Vec<u8>> {
    let mut em = Emitter::new()?;
    em.start(sax::element(
        "Relationships",
        &[("xmlns", PACKAGE_RELATIONSHIPS)],
    ))?;
    for rel in rels.iter() {
        let mut el = sax::element(
            "Relationship",
            &[
                ("Id", &rel.id),
                ("Type", &rel.rel_type),
                ("Target", &rel.target),
            ],
        );
        if rel.is_external {
            el.push_attribute(("TargetMode", "External"));
        }
        em.empty(el)?;
    }
    em.end("Relationships")?;
    Ok(em.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::rel_types;

    const PART: &str = "xl/_rels/workbook.xml.rels";

    #[test]
    fn test_parse_real_workbook_rels() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;

        let rels = parse_relationships(PART, xml).unwrap();
        assert_eq!(rels.len(), 3);
        assert_eq!(rels.by_id("rId1").unwrap().target, "worksheets/sheet1.xml");
        assert_eq!(
            rels.first_of_type(rel_types::STYLES).unwrap().id,
            "rId2"
        );
        assert!(!rels.by_id("rId3").unwrap().is_external);
    }

    #[test]
    fn test_parse_external_target_mode() {
        let xml = br#"<Relationships xmlns="x">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;
        let rels = parse_relationships(PART, xml).unwrap();
        assert!(rels.by_id("rId1").unwrap().is_external);
    }

    #[test]
    fn test_missing_target_attribute() {
        let xml = br#"<Relationships xmlns="x"><Relationship Id="rId1" Type="t"/></Relationships>"#;
        let err = parse_relationships(PART, xml).unwrap_err();
        assert!(err.to_string().contains("Target"));
    }

    #[test]
    fn test_by_type_preserves_insertion_order() {
        let mut rels = Relationships::new();
        rels.add("rId1".to_string(), rel_types::WORKSHEET, "worksheets/sheet1.xml");
        rels.add("rId2".to_string(), rel_types::STYLES, "styles.xml");
        rels.add("rId3".to_string(), rel_types::WORKSHEET, "worksheets/sheet2.xml");

        let sheets: Vec<&str> = rels
            .by_type(rel_types::WORKSHEET)
            .map(|r| r.target.as_str())
            .collect();
        assert_eq!(sheets, vec!["worksheets/sheet1.xml", "worksheets/sheet2.xml"]);
    }

    #[test]
    fn test_roundtrip() {
        let mut rels = Relationships::new();
        rels.add("rId1".to_string(), rel_types::WORKSHEET, "worksheets/sheet1.xml");
        rels.add_external("rId2".to_string(), rel_types::HYPERLINK, "https://example.com/?a=1&b=2");

        let bytes = write_relationships(&rels).unwrap();
        let parsed = parse_relationships(PART, &bytes).unwrap();
        assert_eq!(parsed, rels);
    }

    #[test]
    fn test_empty_collection_roundtrip() {
        let rels = Relationships::new();
        let bytes = write_relationships(&rels).unwrap();
        let parsed = parse_relationships(PART, &bytes).unwrap();
        assert!(parsed.is_empty());
    }
}
