//! Shared plumbing for the SAX-style parsers and the streaming builders.

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::{Error, Result};

/// Create an event reader over a raw part payload.
///
/// Text is never trimmed; whitespace inside `<t>` elements is significant
/// for shared strings and inline text.
pub(crate) fn reader(data: &[u8]) -> Reader<&[u8]> {
    Reader::from_reader(data)
}

/// Fetch an attribute by its local name, unescaping the value.
///
/// Matching on the local name tolerates namespace-qualified attributes such
/// as `r:id`.
pub(crate) fn attr_local(part: &str, e: &BytesStart, name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::malformed(part, err))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(unescape_attr(part, &attr)?));
        }
    }
    Ok(None)
}

/// Fetch an attribute by its exact key name.
pub(crate) fn attr(part: &str, e: &BytesStart, name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::malformed(part, err))?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(unescape_attr(part, &attr)?));
        }
    }
    Ok(None)
}

/// Fetch a required attribute by its exact key name.
pub(crate) fn require_attr(part: &str, e: &BytesStart, name: &str) -> Result<String> {
    attr(part, e, name)?.ok_or_else(|| {
        Error::missing_attribute(&String::from_utf8_lossy(e.name().as_ref()), name)
    })
}

fn unescape_attr(part: &str, attr: &Attribute) -> Result<String> {
    attr.unescape_value()
        .map(|v| v.into_owned())
        .map_err(|err| Error::malformed(part, err))
}

/// Parse an OOXML boolean attribute value: `"1"`/`"true"` are true.
pub(crate) fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Parse a numeric attribute value, reporting the attribute name on failure.
pub(crate) fn parse_num<T: std::str::FromStr>(attribute: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::InvalidAttributeValue {
        attribute: attribute.to_string(),
        value: value.to_string(),
    })
}

/// A streaming XML emitter over an in-memory buffer.
///
/// Wraps `quick_xml::Writer` so builder modules stay free of error-mapping
/// noise; every part starts with the standard standalone UTF-8 declaration.
pub(crate) struct Emitter {
    writer: Writer<Vec<u8>>,
}

impl Emitter {
    /// Create an emitter and write the XML declaration.
    pub(crate) fn new() -> Result<Self> {
        let mut emitter = Self {
            writer: Writer::new(Vec::new()),
        };
        emitter
            .writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(|e| Error::Write(e.to_string()))?;
        Ok(emitter)
    }

    /// Create an emitter with no XML declaration (legacy VML parts).
    pub(crate) fn bare() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    pub(crate) fn start(&mut self, el: BytesStart) -> Result<()> {
        self.writer
            .write_event(Event::Start(el))
            .map_err(|e| Error::Write(e.to_string()))
    }

    pub(crate) fn empty(&mut self, el: BytesStart) -> Result<()> {
        self.writer
            .write_event(Event::Empty(el))
            .map_err(|e| Error::Write(e.to_string()))
    }

    pub(crate) fn end(&mut self, name: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(|e| Error::Write(e.to_string()))
    }

    /// Emit character data; entity escaping is applied on write.
    pub(crate) fn text(&mut self, content: &str) -> Result<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(content)))
            .map_err(|e| Error::Write(e.to_string()))
    }

    /// Emit `<name>content</name>`.
    pub(crate) fn leaf(&mut self, name: &str, content: &str) -> Result<()> {
        self.start(BytesStart::new(name))?;
        self.text(content)?;
        self.end(name)
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Build an element with attributes in one expression.
pub(crate) fn element<'a>(name: &'a str, attrs: &[(&str, &str)]) -> BytesStart<'a> {
    let mut el = BytesStart::new(name);
    for (k, v) in attrs {
        el.push_attribute((*k, *v));
    }
    el
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_one_and_true() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_parse_num_reports_attribute() {
        let err = parse_num::<u32>("sheetId", "abc").unwrap_err();
        assert!(err.to_string().contains("sheetId"));
        assert_eq!(parse_num::<u32>("sheetId", "7").unwrap(), 7);
    }

    #[test]
    fn test_emitter_escapes_text_and_attributes() {
        let mut em = Emitter::new().unwrap();
        em.start(element("t", &[("v", "a<b&c")])).unwrap();
        em.text("x<y&z").unwrap();
        em.end("t").unwrap();
        let xml = String::from_utf8(em.into_bytes()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert!(xml.contains("a&lt;b&amp;c"));
        assert!(xml.contains("x&lt;y&amp;z"));
    }

    #[test]
    fn test_attr_local_matches_qualified_names() {
        let mut el = BytesStart::new("hyperlink");
        el.push_attribute(("ref", "A1"));
        el.push_attribute(("r:id", "rId3"));
        assert_eq!(
            attr_local("sheet1.xml", &el, "id").unwrap(),
            Some("rId3".to_string())
        );
        assert_eq!(
            attr("sheet1.xml", &el, "ref").unwrap(),
            Some("A1".to_string())
        );
        assert_eq!(attr("sheet1.xml", &el, "missing").unwrap(), None);
    }
}
