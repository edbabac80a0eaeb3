//! Table parts (`xl/tables/table*.xml`).

use quick_xml::events::Event;

use crate::namespaces::SPREADSHEET_ML;
use crate::sax::{self, Emitter};
use crate::Result;

/// Descriptor for one table part.
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    /// Globally unique table id (monotonic across all sheets).
    pub id: u32,
    pub name: String,
    pub display_name: String,
    pub range: String,
    /// Column names in declaration order.
    pub columns: Vec<String>,
    pub header_row: bool,
    pub totals_row: bool,
    pub style_name: Option<String>,
}

/// Parse a table part.
pub fn parse_table(part: &str, data: &[u8]) -> Result<TableData> {
    let mut reader = sax::reader(data);
    let mut buf = Vec::new();
    let mut table: Option<TableData> = None;

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| crate::Error::malformed(part, e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"table" => {
                    table = Some(TableData {
                        id: sax::parse_num("id", &sax::require_attr(part, e, "id")?)?,
                        name: sax::require_attr(part, e, "name")?,
                        display_name: sax::attr(part, e, "displayName")?
                            .unwrap_or_default(),
                        range: sax::require_attr(part, e, "ref")?,
                        columns: vec![],
                        // A missing headerRowCount means the header is present.
                        header_row: sax::attr(part, e, "headerRowCount")?
                            .map(|v| v != "0")
                            .unwrap_or(true),
                        totals_row: sax::attr(part, e, "totalsRowCount")?
                            .map(|v| v != "0")
                            .unwrap_or(false),
                        style_name: None,
                    });
                }
                b"tableColumn" => {
                    if let Some(t) = table.as_mut() {
                        t.columns.push(sax::require_attr(part, e, "name")?);
                    }
                }
                b"tableStyleInfo" => {
                    if let Some(t) = table.as_mut() {
                        t.style_name = sax::attr(part, e, "name")?;
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    table.ok_or_else(|| crate::Error::missing_element(part, "table"))
}

/// Serialize a table part.
pub fn write_table(table: &TableData) -> Result<Vec<u8>> {
    let id = table.id.to_string();
    let mut em = Emitter::new()?;
    let mut attrs: Vec<(&str, &str)> = vec![
        ("xmlns", SPREADSHEET_ML),
        ("id", &id),
        ("name", &table.name),
        ("displayName", &table.display_name),
        ("ref", &table.range),
    ];
    if table.totals_row {
        attrs.push(("totalsRowCount", "1"));
    } else {
        attrs.push(("totalsRowShown", "0"));
    }
    em.start(sax::element("table", &attrs))?;

    if table.header_row {
        em.empty(sax::element("autoFilter", &[("ref", &table.range)]))?;
    }

    em.start(sax::element(
        "tableColumns",
        &[("count", &table.columns.len().to_string())],
    ))?;
    for (i, name) in table.columns.iter().enumerate() {
        em.empty(sax::element(
            "tableColumn",
            &[("id", &(i + 1).to_string()), ("name", name)],
        ))?;
    }
    em.end("tableColumns")?;

    if let Some(style) = &table.style_name {
        em.empty(sax::element(
            "tableStyleInfo",
            &[
                ("name", style),
                ("showFirstColumn", "0"),
                ("showLastColumn", "0"),
                ("showRowStripes", "1"),
                ("showColumnStripes", "0"),
            ],
        ))?;
    }

    em.end("table")?;
    Ok(em.into_bytes())
}
