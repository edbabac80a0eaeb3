//! The shared string table (`xl/sharedStrings.xml`).
//!
//! One entry per `<si>`: plain text when the item holds only `<t>`, a
//! rich-text run list when it holds `<r>` elements. Whitespace inside `<t>`
//! is preserved verbatim.

use quick_xml::events::Event;

use crate::namespaces::SPREADSHEET_ML;
use crate::sax::{self, Emitter};
use crate::Result;

/// Vertical alignment of a rich-text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertAlign {
    Superscript,
    Subscript,
}

/// Color of a rich-text run: an RGB hex string or a theme index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunColor {
    Rgb(String),
    Theme(u32),
}

/// A single formatted run inside a rich-text entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font: Option<String>,
    pub size: Option<f64>,
    pub color: Option<RunColor>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub vert_align: Option<VertAlign>,
}

/// One shared-string entry: plain text or an ordered run list.
#[derive(Debug, Clone, PartialEq)]
pub enum SharedStringEntry {
    Plain(String),
    Rich(Vec<TextRun>),
}

impl SharedStringEntry {
    /// The plain-text content of the entry; rich entries concatenate runs.
    pub fn plain_text(&self) -> String {
        match self {
            SharedStringEntry::Plain(s) => s.clone(),
            SharedStringEntry::Rich(runs) => runs.iter().map(|r| r.text.as_str()).collect(),
        }
    }
}

/// The parsed shared string table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedStrings {
    pub entries: Vec<SharedStringEntry>,
}

impl SharedStrings {
    pub fn get(&self, index: usize) -> Option<&SharedStringEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parser context: which container element we are inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Si,
    Run,
    RunProps,
    Text,
}

/// Parse an `xl/sharedStrings.xml` payload.
pub fn parse_shared_strings(part: &str, data: &[u8]) -> Result<SharedStrings> {
    let mut reader = sax::reader(data);
    let mut buf = Vec::new();
    let mut strings = SharedStrings::default();

    let mut stack: Vec<Ctx> = Vec::new();
    let mut plain: Option<String> = None;
    let mut runs: Vec<TextRun> = Vec::new();
    let mut run = TextRun::default();
    let mut text = String::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    stack.push(Ctx::Si);
                    plain = None;
                    runs.clear();
                }
                b"r" if stack.last() == Some(&Ctx::Si) => {
                    stack.push(Ctx::Run);
                    run = TextRun::default();
                }
                b"rPr" if stack.last() == Some(&Ctx::Run) => stack.push(Ctx::RunProps),
                b"t" if matches!(stack.last(), Some(Ctx::Si) | Some(Ctx::Run)) => {
                    stack.push(Ctx::Text);
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if stack.last() == Some(&Ctx::RunProps) {
                    apply_run_property(part, &mut run, e)?;
                } else if e.local_name().as_ref() == b"t"
                    && matches!(stack.last(), Some(Ctx::Si) | Some(Ctx::Run))
                {
                    // `<t/>`: empty text payload.
                    match stack.last() {
                        Some(Ctx::Run) => run.text.clear(),
                        _ => plain = Some(String::new()),
                    }
                }
            }
            Ok(Event::Text(ref t)) => {
                if stack.last() == Some(&Ctx::Text) {
                    text.push_str(&t.unescape().map_err(|e| crate::Error::malformed(part, e))?);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" if stack.last() == Some(&Ctx::Text) => {
                    stack.pop();
                    match stack.last() {
                        Some(Ctx::Run) => run.text = text.clone(),
                        Some(Ctx::Si) => plain = Some(text.clone()),
                        _ => {}
                    }
                }
                b"rPr" if stack.last() == Some(&Ctx::RunProps) => {
                    stack.pop();
                }
                b"r" if stack.last() == Some(&Ctx::Run) => {
                    stack.pop();
                    runs.push(std::mem::take(&mut run));
                }
                b"si" if stack.last() == Some(&Ctx::Si) => {
                    stack.pop();
                    if !runs.is_empty() {
                        strings
                            .entries
                            .push(SharedStringEntry::Rich(std::mem::take(&mut runs)));
                    } else {
                        // Empty `<si>` produces an empty plain entry.
                        strings
                            .entries
                            .push(SharedStringEntry::Plain(plain.take().unwrap_or_default()));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(crate::Error::malformed(part, e)),
            _ => {}
        }
    }

    Ok(strings)
}

/// Apply one `<rPr>` child to the run being accumulated.
fn apply_run_property(
    part: &str,
    run: &mut TextRun,
    e: &quick_xml::events::BytesStart,
) -> Result<()> {
    match e.local_name().as_ref() {
        b"rFont" => run.font = sax::attr(part, e, "val")?,
        b"sz" => {
            if let Some(v) = sax::attr(part, e, "val")? {
                run.size = Some(sax::parse_num("val", &v)?);
            }
        }
        b"color" => {
            if let Some(rgb) = sax::attr(part, e, "rgb")? {
                run.color = Some(RunColor::Rgb(rgb));
            } else if let Some(theme) = sax::attr(part, e, "theme")? {
                run.color = Some(RunColor::Theme(sax::parse_num("theme", &theme)?));
            }
        }
        // Boolean flags default to true when `val` is absent.
        b"b" => run.bold = flag_value(part, e)?,
        b"i" => run.italic = flag_value(part, e)?,
        b"u" => run.underline = flag_value(part, e)?,
        b"strike" => run.strike = flag_value(part, e)?,
        b"vertAlign" => {
            run.vert_align = match sax::attr(part, e, "val")?.as_deref() {
                Some("superscript") => Some(VertAlign::Superscript),
                Some("subscript") => Some(VertAlign::Subscript),
                _ => None,
            }
        }
        _ => {}
    }
    Ok(())
}

fn flag_value(part: &str, e: &quick_xml::events::BytesStart) -> Result<bool> {
    Ok(sax::attr(part, e, "val")?
        .map(|v| sax::parse_bool(&v))
        .unwrap_or(true))
}

/// Whether a text payload needs `xml:space="preserve"` to survive re-reading.
fn needs_space_preserve(s: &str) -> bool {
    s.starts_with(' ')
        || s.ends_with(' ')
        || s.contains("  ")
        || s.contains('\n')
        || s.contains('\t')
}

/// Serialize a shared string table back to XML.
pub fn write_shared_strings(strings: &SharedStrings) -> Result<Vec<u8>> {
    let count = strings.len().to_string();
    let mut em = Emitter::new()?;
    em.start(sax::element(
        "sst",
        &[
            ("xmlns", SPREADSHEET_ML),
            ("count", &count),
            ("uniqueCount", &count),
        ],
    ))?;

    for entry in &strings.entries {
        em.start(sax::element("si", &[]))?;
        match entry {
            SharedStringEntry::Plain(text) => write_t(&mut em, text)?,
            SharedStringEntry::Rich(runs) => {
                for run in runs {
                    em.start(sax::element("r", &[]))?;
                    write_run_properties(&mut em, run)?;
                    write_t(&mut em, &run.text)?;
                    em.end("r")?;
                }
            }
        }
        em.end("si")?;
    }

    em.end("sst")?;
    Ok(em.into_bytes())
}

fn write_t(em: &mut Emitter, text: &str) -> Result<()> {
    if needs_space_preserve(text) {
        em.start(sax::element("t", &[("xml:space", "preserve")]))?;
        em.text(text)?;
        em.end("t")
    } else {
        em.leaf("t", text)
    }
}

fn write_run_properties(em: &mut Emitter, run: &TextRun) -> Result<()> {
    let has_props = run.font.is_some()
        || run.size.is_some()
        || run.color.is_some()
        || run.bold
        || run.italic
        || run.underline
        || run.strike
        || run.vert_align.is_some();
    if !has_props {
        return Ok(());
    }

    em.start(sax::element("rPr", &[]))?;
    if run.bold {
        em.empty(sax::element("b", &[]))?;
    }
    if run.italic {
        em.empty(sax::element("i", &[]))?;
    }
    if run.underline {
        em.empty(sax::element("u", &[]))?;
    }
    if run.strike {
        em.empty(sax::element("strike", &[]))?;
    }
    if let Some(sz) = run.size {
        em.empty(sax::element("sz", &[("val", &sz.to_string())]))?;
    }
    match &run.color {
        Some(RunColor::Rgb(rgb)) => em.empty(sax::element("color", &[("rgb", rgb)]))?,
        Some(RunColor::Theme(idx)) => {
            em.empty(sax::element("color", &[("theme", &idx.to_string())]))?
        }
        None => {}
    }
    if let Some(font) = &run.font {
        em.empty(sax::element("rFont", &[("val", font)]))?;
    }
    if let Some(va) = run.vert_align {
        let val = match va {
            VertAlign::Superscript => "superscript",
            VertAlign::Subscript => "subscript",
        };
        em.empty(sax::element("vertAlign", &[("val", val)]))?;
    }
    em.end("rPr")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART: &str = "xl/sharedStrings.xml";

    #[test]
    fn test_parse_plain_entries() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>Name</t></si>
  <si><t>Value</t></si>
  <si><t>Description</t></si>
</sst>"#;
        let sst = parse_shared_strings(PART, xml).unwrap();
        assert_eq!(sst.len(), 3);
        assert_eq!(sst.get(0).unwrap().plain_text(), "Name");
        assert_eq!(sst.get(2).unwrap().plain_text(), "Description");
    }

    #[test]
    fn test_parse_preserves_whitespace() {
        let xml = br#"<sst xmlns="x"><si><t xml:space="preserve">  padded  </t></si></sst>"#;
        let sst = parse_shared_strings(PART, xml).unwrap();
        assert_eq!(
            sst.get(0).unwrap(),
            &SharedStringEntry::Plain("  padded  ".to_string())
        );
    }

    #[test]
    fn test_parse_empty_si_is_empty_plain_entry() {
        let xml = br#"<sst xmlns="x"><si></si><si><t/></si></sst>"#;
        let sst = parse_shared_strings(PART, xml).unwrap();
        assert_eq!(sst.len(), 2);
        assert_eq!(sst.get(0).unwrap(), &SharedStringEntry::Plain(String::new()));
        assert_eq!(sst.get(1).unwrap(), &SharedStringEntry::Plain(String::new()));
    }

    #[test]
    fn test_parse_rich_entry_runs_in_document_order() {
        let xml = br#"<sst xmlns="x">
  <si>
    <r>
      <rPr><b/><sz val="11"/><color rgb="FFFF0000"/><rFont val="Calibri"/></rPr>
      <t>Bold</t>
    </r>
    <r>
      <t xml:space="preserve"> text</t>
    </r>
  </si>
</sst>"#;
        let sst = parse_shared_strings(PART, xml).unwrap();
        let SharedStringEntry::Rich(runs) = sst.get(0).unwrap() else {
            panic!("expected rich entry");
        };
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "Bold");
        assert!(runs[0].bold);
        assert_eq!(runs[0].size, Some(11.0));
        assert_eq!(runs[0].color, Some(RunColor::Rgb("FFFF0000".to_string())));
        assert_eq!(runs[0].font.as_deref(), Some("Calibri"));
        assert_eq!(runs[1].text, " text");
        assert!(!runs[1].bold);
        assert_eq!(sst.get(0).unwrap().plain_text(), "Bold text");
    }

    #[test]
    fn test_parse_flag_val_defaults_to_true() {
        let xml = br#"<sst xmlns="x">
  <si><r><rPr><b/><i val="0"/><u val="true"/><strike val="1"/></rPr><t>x</t></r></si>
</sst>"#;
        let sst = parse_shared_strings(PART, xml).unwrap();
        let SharedStringEntry::Rich(runs) = sst.get(0).unwrap() else {
            panic!("expected rich entry");
        };
        assert!(runs[0].bold);
        assert!(!runs[0].italic);
        assert!(runs[0].underline);
        assert!(runs[0].strike);
    }

    #[test]
    fn test_parse_theme_color_and_vert_align() {
        let xml = br#"<sst xmlns="x">
  <si><r><rPr><color theme="4"/><vertAlign val="superscript"/></rPr><t>x</t></r></si>
</sst>"#;
        let sst = parse_shared_strings(PART, xml).unwrap();
        let SharedStringEntry::Rich(runs) = sst.get(0).unwrap() else {
            panic!("expected rich entry");
        };
        assert_eq!(runs[0].color, Some(RunColor::Theme(4)));
        assert_eq!(runs[0].vert_align, Some(VertAlign::Superscript));
    }

    #[test]
    fn test_roundtrip_plain_and_rich() {
        let strings = SharedStrings {
            entries: vec![
                SharedStringEntry::Plain("hello".to_string()),
                SharedStringEntry::Plain("  spaced  ".to_string()),
                SharedStringEntry::Rich(vec![
                    TextRun {
                        text: "Bold".to_string(),
                        bold: true,
                        size: Some(12.0),
                        font: Some("Arial".to_string()),
                        color: Some(RunColor::Rgb("FF00FF00".to_string())),
                        ..TextRun::default()
                    },
                    TextRun {
                        text: " rest".to_string(),
                        vert_align: Some(VertAlign::Subscript),
                        ..TextRun::default()
                    },
                ]),
            ],
        };

        let bytes = write_shared_strings(&strings).unwrap();
        let parsed = parse_shared_strings(PART, &bytes).unwrap();
        assert_eq!(parsed, strings);
    }

    #[test]
    fn test_write_escapes_entities() {
        let strings = SharedStrings {
            entries: vec![SharedStringEntry::Plain("a<b&c>\"d\"".to_string())],
        };
        let bytes = write_shared_strings(&strings).unwrap();
        let xml = String::from_utf8(bytes.clone()).unwrap();
        assert!(xml.contains("a&lt;b&amp;c"));
        let parsed = parse_shared_strings(PART, &bytes).unwrap();
        assert_eq!(parsed.get(0).unwrap().plain_text(), "a<b&c>\"d\"");
    }

    #[test]
    fn test_malformed_xml_reports_part() {
        let xml = b"<sst><si><t>text</wrong></si></sst>";
        let err = parse_shared_strings(PART, xml).unwrap_err();
        assert!(err.to_string().contains(PART));
    }
}
