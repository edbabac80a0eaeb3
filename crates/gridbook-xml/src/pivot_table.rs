//! Pivot-table metadata descriptors (`xl/pivotTables/pivotTable*.xml`).
//!
//! Like charts, pivot tables are preserved rather than interpreted: the
//! parser extracts the name, cache id, location, and field counts, and keeps
//! the raw part bytes for literal rewrite.

use quick_xml::events::Event;

use crate::sax;
use crate::Result;

/// Descriptor for one pivot-table part.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotTableData {
    pub name: String,
    pub cache_id: u32,
    /// The worksheet range the pivot table occupies.
    pub location: String,
    pub row_field_count: usize,
    pub col_field_count: usize,
    pub data_field_count: usize,
    /// The untouched part payload, re-emitted verbatim on write.
    pub raw_xml: Vec<u8>,
}

impl PivotTableData {
    /// The literal bytes to write back into a package.
    pub fn to_xml(&self) -> &[u8] {
        &self.raw_xml
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    RowFields,
    ColFields,
    None,
}

/// Parse a pivot-table part into a descriptor.
pub fn parse_pivot_table(part: &str, data: &[u8]) -> Result<PivotTableData> {
    let mut reader = sax::reader(data);
    let mut buf = Vec::new();

    let mut name: Option<String> = None;
    let mut cache_id: u32 = 0;
    let mut location = String::new();
    let mut row_fields = 0usize;
    let mut col_fields = 0usize;
    let mut data_fields = 0usize;
    let mut section = Section::None;

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| crate::Error::malformed(part, e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"pivotTableDefinition" => {
                    name = Some(sax::require_attr(part, e, "name")?);
                    if let Some(v) = sax::attr(part, e, "cacheId")? {
                        cache_id = sax::parse_num("cacheId", &v)?;
                    }
                }
                b"location" => {
                    if let Some(r) = sax::attr(part, e, "ref")? {
                        location = r;
                    }
                }
                b"rowFields" => section = Section::RowFields,
                b"colFields" => section = Section::ColFields,
                b"field" => match section {
                    Section::RowFields => row_fields += 1,
                    Section::ColFields => col_fields += 1,
                    Section::None => {}
                },
                b"dataField" => data_fields += 1,
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"rowFields" | b"colFields" => section = Section::None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(PivotTableData {
        name: name.ok_or_else(|| crate::Error::missing_element(part, "pivotTableDefinition"))?,
        cache_id,
        location,
        row_field_count: row_fields,
        col_field_count: col_fields,
        data_field_count: data_fields,
        raw_xml: data.to_vec(),
    })
}
