//! The `[Content_Types].xml` manifest.
//!
//! Maps file extensions to default content types and individual part paths
//! to override content types. Overrides win when both apply.

use quick_xml::events::Event;

use crate::namespaces::{mime_types, CONTENT_TYPES};
use crate::sax::{self, Emitter};
use crate::Result;

/// A default entry: extension (without dot) to content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultType {
    pub extension: String,
    pub content_type: String,
}

/// An override entry: absolute part path (leading `/`) to content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideType {
    pub part_name: String,
    pub content_type: String,
}

/// Parsed `[Content_Types].xml` manifest.
///
/// Insertion order is preserved so serialization is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    pub defaults: Vec<DefaultType>,
    pub overrides: Vec<OverrideType>,
}

impl ContentTypes {
    /// The baseline manifest every written package starts from.
    pub fn standard() -> Self {
        Self {
            defaults: vec![
                DefaultType {
                    extension: "rels".to_string(),
                    content_type: mime_types::RELATIONSHIPS.to_string(),
                },
                DefaultType {
                    extension: "xml".to_string(),
                    content_type: mime_types::XML.to_string(),
                },
            ],
            overrides: vec![],
        }
    }

    /// Register a default for an extension, ignoring duplicates.
    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        if self.defaults.iter().any(|d| d.extension == extension) {
            return;
        }
        self.defaults.push(DefaultType {
            extension: extension.to_string(),
            content_type: content_type.to_string(),
        });
    }

    /// Register an override for a part path, ignoring duplicates.
    pub fn add_override(&mut self, part_name: &str, content_type: &str) {
        if self.overrides.iter().any(|o| o.part_name == part_name) {
            return;
        }
        self.overrides.push(OverrideType {
            part_name: part_name.to_string(),
            content_type: content_type.to_string(),
        });
    }

    /// Resolve the content type of an absolute part path.
    ///
    /// An override wins over the extension default.
    pub fn content_type_of(&self, part_name: &str) -> Option<&str> {
        if let Some(o) = self.overrides.iter().find(|o| o.part_name == part_name) {
            return Some(&o.content_type);
        }
        let extension = part_name.rsplit_once('.').map(|(_, ext)| ext)?;
        self.defaults
            .iter()
            .find(|d| d.extension.eq_ignore_ascii_case(extension))
            .map(|d| d.content_type.as_str())
    }
}

/// Parse a `[Content_Types].xml` payload.
pub fn parse_content_types(part: &str, data: &[u8]) -> Result<ContentTypes> {
    let mut reader = sax::reader(data);
    let mut buf = Vec::new();
    let mut types = ContentTypes::default();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match e.local_name().as_ref() {
                    b"Default" => {
                        let extension = sax::require_attr(part, e, "Extension")?;
                        let content_type = sax::require_attr(part, e, "ContentType")?;
                        types.defaults.push(DefaultType {
                            extension,
                            content_type,
                        });
                    }
                    b"Override" => {
                        let part_name = sax::require_attr(part, e, "PartName")?;
                        let content_type = sax::require_attr(part, e, "ContentType")?;
                        types.overrides.push(OverrideType {
                            part_name,
                            content_type,
                        });
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(crate::Error::malformed(part, e)),
            _ => {}
        }
    }

    Ok(types)
}

/// Serialize a manifest back to XML.
pub fn write_content_types(types: &ContentTypes) -> Result<Vec<u8>> {
    let mut em = Emitter::new()?;
    em.start(sax::element("Types", &[("xmlns", CONTENT_TYPES)]))?;
    for d in &types.defaults {
        em.empty(sax::element(
            "Default",
            &[
                ("Extension", &d.extension),
                ("ContentType", &d.content_type),
            ],
        ))?;
    }
    for o in &types.overrides {
        em.empty(sax::element(
            "Override",
            &[
                ("PartName", &o.part_name),
                ("ContentType", &o.content_type),
            ],
        ))?;
    }
    em.end("Types")?;
    Ok(em.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART: &str = "[Content_Types].xml";

    #[test]
    fn test_parse_real_manifest() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

        let types = parse_content_types(PART, xml).unwrap();
        assert_eq!(types.defaults.len(), 2);
        assert_eq!(types.overrides.len(), 2);
        assert_eq!(types.defaults[0].extension, "rels");
        assert_eq!(types.overrides[0].part_name, "/xl/workbook.xml");
    }

    #[test]
    fn test_override_wins_over_default() {
        let mut types = ContentTypes::standard();
        types.add_override("/xl/workbook.xml", mime_types::WORKBOOK);

        assert_eq!(
            types.content_type_of("/xl/workbook.xml"),
            Some(mime_types::WORKBOOK)
        );
        // A plain .xml part falls back to the extension default.
        assert_eq!(
            types.content_type_of("/xl/other.xml"),
            Some(mime_types::XML)
        );
        assert_eq!(types.content_type_of("/xl/unknown.bin"), None);
    }

    #[test]
    fn test_add_default_and_override_dedupe() {
        let mut types = ContentTypes::standard();
        types.add_default("xml", "something/else");
        assert_eq!(types.defaults.len(), 2);
        assert_eq!(types.content_type_of("/a.xml"), Some(mime_types::XML));

        types.add_override("/xl/styles.xml", mime_types::STYLES);
        types.add_override("/xl/styles.xml", "something/else");
        assert_eq!(types.overrides.len(), 1);
    }

    #[test]
    fn test_roundtrip_preserves_order() {
        let mut types = ContentTypes::standard();
        types.add_override("/xl/workbook.xml", mime_types::WORKBOOK);
        types.add_override("/xl/worksheets/sheet1.xml", mime_types::WORKSHEET);
        types.add_override("/xl/styles.xml", mime_types::STYLES);

        let bytes = write_content_types(&types).unwrap();
        let parsed = parse_content_types(PART, &bytes).unwrap();
        assert_eq!(parsed, types);
    }

    #[test]
    fn test_missing_required_attribute() {
        let xml = br#"<Types xmlns="x"><Default Extension="xml"/></Types>"#;
        let err = parse_content_types(PART, xml).unwrap_err();
        assert!(err.to_string().contains("ContentType"));
    }
}
