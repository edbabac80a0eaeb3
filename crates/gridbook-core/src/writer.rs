//! The write-side builders.
//!
//! A [`WorkbookWriter`] owns the style and shared-string registries plus
//! one [`SheetWriter`] per sheet. `build` first prepares every sheet
//! (interning strings, assigning relationship ids from counters, emitting
//! satellite parts), then lays the parts into the package in a fixed
//! order; identical call sequences produce byte-identical output.

use std::collections::{BTreeMap, HashMap};

use gridbook_xml::cell_ref::{CellRange, CellRef};
use gridbook_xml::comments::{write_comments, CommentsData, SheetComment};
use gridbook_xml::namespaces::{mime_types, rel_types};
use gridbook_xml::relationships::{write_relationships, Relationships};
use gridbook_xml::shared_strings::{
    write_shared_strings, SharedStringEntry, SharedStrings, TextRun,
};
use gridbook_xml::styles::write_styles;
use gridbook_xml::table::{write_table, TableData};
use gridbook_xml::vml::write_vml_drawing;
use gridbook_xml::workbook::{
    write_workbook, DefinedName, SheetInfo, SheetState, WorkbookInfo, WorkbookProtection,
};
use gridbook_xml::worksheet::{
    write_worksheet, AutoFilter, ConditionalFormat, DataValidation, Hyperlink, Margins, PageSetup,
    RawCell, RawCellValue, RawColumn, RawRow, SheetProtection, WorksheetData,
};

use crate::cell::CellValue;
use crate::error::{Error, Result};
use crate::package::{PackageBuilder, ROOT_RELS_PATH, WORKBOOK_PATH};
use crate::paths;
use crate::style::{CellStyle, StyleRegistry};

/// Builder for a whole workbook.
pub struct WorkbookWriter {
    sheets: Vec<SheetWriter>,
    styles: StyleRegistry,
    defined_names: Vec<DefinedName>,
    protection: Option<WorkbookProtection>,
}

impl WorkbookWriter {
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            styles: StyleRegistry::new(),
            defined_names: Vec::new(),
            protection: None,
        }
    }

    /// Append a sheet. Sheet order is workbook order.
    pub fn add_sheet(&mut self, name: &str) -> Result<&mut SheetWriter> {
        if self.sheets.iter().any(|s| s.name == name) {
            return Err(Error::SheetAlreadyExists {
                name: name.to_string(),
            });
        }
        self.sheets.push(SheetWriter::new(name));
        Ok(self.sheets.last_mut().expect("just pushed"))
    }

    /// Revisit a previously added sheet.
    pub fn sheet(&mut self, name: &str) -> Option<&mut SheetWriter> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    /// Register a style, returning the index sheet writers reference.
    pub fn add_style(&mut self, style: &CellStyle) -> u32 {
        self.styles.register(style)
    }

    /// Register a workbook-scoped defined name.
    pub fn add_defined_name(&mut self, name: &str, refers_to: &str) {
        self.defined_names.push(DefinedName {
            name: name.to_string(),
            refers_to: refers_to.to_string(),
            local_sheet_id: None,
        });
    }

    /// Protect the workbook structure and/or windows.
    pub fn protect_workbook(&mut self, lock_structure: bool, lock_windows: bool) {
        self.protection = Some(WorkbookProtection {
            password_hash: None,
            lock_structure,
            lock_windows,
        });
    }

    /// Emit the package bytes.
    pub fn build(self) -> Result<Vec<u8>> {
        let sheet_count = self.sheets.len();

        // Workbook metadata: sheetId equals the 1-based position, the
        // relationship id is rId{sheetId}.
        let mut info = WorkbookInfo {
            sheets: Vec::with_capacity(sheet_count),
            defined_names: self.defined_names,
            protection: self.protection,
        };
        for (i, sheet) in self.sheets.iter().enumerate() {
            let sheet_id = (i + 1) as u32;
            info.sheets.push(SheetInfo {
                name: sheet.name.clone(),
                sheet_id,
                rel_id: format!("rId{sheet_id}"),
                state: SheetState::Visible,
            });
            if let Some(area) = &sheet.print_area {
                info.defined_names.push(DefinedName {
                    name: "_xlnm.Print_Area".to_string(),
                    refers_to: format!("'{}'!{}", sheet.name, area),
                    local_sheet_id: Some(i as u32),
                });
            }
            if let Some(titles) = &sheet.print_titles {
                info.defined_names.push(DefinedName {
                    name: "_xlnm.Print_Titles".to_string(),
                    refers_to: format!("'{}'!{}", sheet.name, titles),
                    local_sheet_id: Some(i as u32),
                });
            }
        }

        // Prepare sheets first so the shared-string table is complete
        // before any part is laid down.
        let mut shared = SharedStringRegistry::default();
        let mut table_counter = 0u32;
        let mut prepared: Vec<PreparedSheet> = Vec::with_capacity(sheet_count);
        for (i, sheet) in self.sheets.into_iter().enumerate() {
            prepared.push(sheet.prepare(i + 1, &mut table_counter, &mut shared)?);
        }

        let has_strings = !shared.is_empty();

        let mut package = PackageBuilder::new();
        package.add_default("vml", mime_types::VML_DRAWING);

        package.add_override(WORKBOOK_PATH, mime_types::WORKBOOK);
        package.write(WORKBOOK_PATH, write_workbook(&info)?);

        package.add_override("/xl/styles.xml", mime_types::STYLES);
        package.write("/xl/styles.xml", write_styles(&self.styles.into_info())?);

        if has_strings {
            package.add_override("/xl/sharedStrings.xml", mime_types::SHARED_STRINGS);
            package.write(
                "/xl/sharedStrings.xml",
                write_shared_strings(&shared.into_shared_strings())?,
            );
        }

        for sheet in &prepared {
            package.add_override(&sheet.path, mime_types::WORKSHEET);
            package.write(&sheet.path, sheet.worksheet_xml.clone());
            for part in &sheet.satellites {
                if let Some(content_type) = part.content_type {
                    package.add_override(&part.path, content_type);
                }
                package.write(&part.path, part.bytes.clone());
            }
        }

        // Relationship parts last: root, workbook, then per-worksheet.
        let mut root_rels = Relationships::new();
        root_rels.add(
            "rId1".to_string(),
            rel_types::OFFICE_DOCUMENT,
            "xl/workbook.xml",
        );
        package.write(ROOT_RELS_PATH, write_relationships(&root_rels)?);

        let mut workbook_rels = Relationships::new();
        for n in 1..=sheet_count {
            workbook_rels.add(
                format!("rId{n}"),
                rel_types::WORKSHEET,
                &format!("worksheets/sheet{n}.xml"),
            );
        }
        workbook_rels.add(
            format!("rId{}", sheet_count + 1),
            rel_types::STYLES,
            "styles.xml",
        );
        if has_strings {
            workbook_rels.add(
                format!("rId{}", sheet_count + 2),
                rel_types::SHARED_STRINGS,
                "sharedStrings.xml",
            );
        }
        package.write(
            &paths::rels_path_for(WORKBOOK_PATH),
            write_relationships(&workbook_rels)?,
        );

        for sheet in &prepared {
            if !sheet.rels.is_empty() {
                package.write(
                    &paths::rels_path_for(&sheet.path),
                    write_relationships(&sheet.rels)?,
                );
            }
        }

        package.finalize()
    }

    /// Build and write the package to disk.
    pub fn save<P: AsRef<std::path::Path>>(self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.build()?;
        std::fs::write(path, bytes).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                Error::AccessDenied(path.display().to_string())
            }
            _ => Error::Io(e),
        })
    }
}

impl Default for WorkbookWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// One cell's pending state.
struct PendingCell {
    value: CellValue,
    formula: Option<(String, Option<CellValue>)>,
    style: Option<u32>,
}

enum PendingHyperlink {
    External {
        reference: String,
        url: String,
        display: Option<String>,
        tooltip: Option<String>,
    },
    Internal {
        reference: String,
        location: String,
        display: Option<String>,
    },
}

struct PendingTable {
    name: String,
    range: String,
    columns: Vec<String>,
}

struct SatellitePart {
    path: String,
    bytes: Vec<u8>,
    content_type: Option<&'static str>,
}

struct PreparedSheet {
    path: String,
    worksheet_xml: Vec<u8>,
    rels: Relationships,
    satellites: Vec<SatellitePart>,
}

/// Builder for one worksheet.
pub struct SheetWriter {
    name: String,
    cells: BTreeMap<(u32, u32), PendingCell>,
    row_heights: BTreeMap<u32, f64>,
    col_widths: BTreeMap<u32, f64>,
    merged: Vec<CellRange>,
    validations: Vec<DataValidation>,
    conditional_formats: Vec<ConditionalFormat>,
    auto_filter: Option<String>,
    hyperlinks: Vec<PendingHyperlink>,
    comments: Vec<(CellRef, String, String)>,
    protection: Option<SheetProtection>,
    page_setup: Option<PageSetup>,
    margins: Option<Margins>,
    print_area: Option<String>,
    print_titles: Option<String>,
    tables: Vec<PendingTable>,
}

impl SheetWriter {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: BTreeMap::new(),
            row_heights: BTreeMap::new(),
            col_widths: BTreeMap::new(),
            merged: Vec::new(),
            validations: Vec::new(),
            conditional_formats: Vec::new(),
            auto_filter: None,
            hyperlinks: Vec::new(),
            comments: Vec::new(),
            protection: None,
            page_setup: None,
            margins: None,
            print_area: None,
            print_titles: None,
            tables: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write any resolvable value at a reference.
    pub fn write<V: Into<CellValue>>(&mut self, reference: &str, value: V) -> Result<&mut Self> {
        let cell = CellRef::parse(reference)?;
        let style = self.cells.get(&(cell.row, cell.col)).and_then(|c| c.style);
        self.cells.insert(
            (cell.row, cell.col),
            PendingCell {
                value: value.into(),
                formula: None,
                style,
            },
        );
        Ok(self)
    }

    pub fn write_text(&mut self, reference: &str, text: &str) -> Result<&mut Self> {
        self.write(reference, CellValue::Text(text.to_string()))
    }

    pub fn write_number(&mut self, reference: &str, number: f64) -> Result<&mut Self> {
        self.write(reference, CellValue::Number(number))
    }

    pub fn write_boolean(&mut self, reference: &str, value: bool) -> Result<&mut Self> {
        self.write(reference, CellValue::Bool(value))
    }

    /// Write a formula (without the leading `=`), optionally with a cached
    /// result value.
    pub fn write_formula(
        &mut self,
        reference: &str,
        formula: &str,
        cached: Option<CellValue>,
    ) -> Result<&mut Self> {
        let cell = CellRef::parse(reference)?;
        let style = self.cells.get(&(cell.row, cell.col)).and_then(|c| c.style);
        self.cells.insert(
            (cell.row, cell.col),
            PendingCell {
                value: CellValue::Empty,
                formula: Some((formula.to_string(), cached)),
                style,
            },
        );
        Ok(self)
    }

    /// Attach a registered style (see [`WorkbookWriter::add_style`]) to a
    /// cell, creating an empty styled cell if none was written.
    pub fn set_cell_style(&mut self, reference: &str, style_index: u32) -> Result<&mut Self> {
        let cell = CellRef::parse(reference)?;
        self.cells
            .entry((cell.row, cell.col))
            .or_insert_with(|| PendingCell {
                value: CellValue::Empty,
                formula: None,
                style: None,
            })
            .style = Some(style_index);
        Ok(self)
    }

    pub fn merge_cells(&mut self, range: &str) -> Result<&mut Self> {
        self.merged.push(CellRange::parse(range)?);
        Ok(self)
    }

    pub fn add_data_validation(&mut self, validation: DataValidation) -> &mut Self {
        self.validations.push(validation);
        self
    }

    pub fn add_conditional_format(&mut self, format: ConditionalFormat) -> &mut Self {
        self.conditional_formats.push(format);
        self
    }

    pub fn set_auto_filter(&mut self, range: &str) -> Result<&mut Self> {
        CellRange::parse(range)?;
        self.auto_filter = Some(range.to_string());
        Ok(self)
    }

    /// Hyperlink to an external URL.
    pub fn add_hyperlink(
        &mut self,
        reference: &str,
        url: &str,
        display: Option<&str>,
        tooltip: Option<&str>,
    ) -> Result<&mut Self> {
        CellRef::parse(reference)?;
        self.hyperlinks.push(PendingHyperlink::External {
            reference: reference.to_string(),
            url: url.to_string(),
            display: display.map(str::to_string),
            tooltip: tooltip.map(str::to_string),
        });
        Ok(self)
    }

    /// Hyperlink to a location inside the workbook (`Sheet2!A1`).
    pub fn add_internal_hyperlink(
        &mut self,
        reference: &str,
        location: &str,
        display: Option<&str>,
    ) -> Result<&mut Self> {
        CellRef::parse(reference)?;
        self.hyperlinks.push(PendingHyperlink::Internal {
            reference: reference.to_string(),
            location: location.to_string(),
            display: display.map(str::to_string),
        });
        Ok(self)
    }

    pub fn add_comment(&mut self, reference: &str, author: &str, text: &str) -> Result<&mut Self> {
        let cell = CellRef::parse(reference)?;
        self.comments
            .push((cell, author.to_string(), text.to_string()));
        Ok(self)
    }

    pub fn protect_sheet(&mut self, protection: SheetProtection) -> &mut Self {
        self.protection = Some(protection);
        self
    }

    pub fn set_page_setup(&mut self, setup: PageSetup) -> &mut Self {
        self.page_setup = Some(setup);
        self
    }

    pub fn set_margins(&mut self, margins: Margins) -> &mut Self {
        self.margins = Some(margins);
        self
    }

    pub fn set_print_area(&mut self, range: &str) -> Result<&mut Self> {
        CellRange::parse(range)?;
        self.print_area = Some(range.to_string());
        Ok(self)
    }

    /// Rows repeated at the top of every printed page, e.g. `$1:$1`.
    pub fn set_print_titles(&mut self, rows: &str) -> &mut Self {
        self.print_titles = Some(rows.to_string());
        self
    }

    pub fn add_table(&mut self, name: &str, range: &str, columns: &[&str]) -> Result<&mut Self> {
        CellRange::parse(range)?;
        self.tables.push(PendingTable {
            name: name.to_string(),
            range: range.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        Ok(self)
    }

    pub fn set_column_width(&mut self, letters: &str, width: f64) -> Result<&mut Self> {
        let col = gridbook_xml::cell_ref::column_name_to_number(letters)?;
        self.col_widths.insert(col, width);
        Ok(self)
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) -> &mut Self {
        self.row_heights.insert(row, height);
        self
    }

    /// Turn accumulated state into the worksheet part, its satellites
    /// (comments, VML, tables), and its relationships collection.
    fn prepare(
        self,
        sheet_number: usize,
        table_counter: &mut u32,
        shared: &mut SharedStringRegistry,
    ) -> Result<PreparedSheet> {
        let sheet_path = format!("/xl/worksheets/sheet{sheet_number}.xml");
        let mut rels = Relationships::new();
        let mut rel_counter = 0usize;
        let mut satellites: Vec<SatellitePart> = Vec::new();

        // Hyperlinks claim the first relationship ids.
        let mut hyperlinks: Vec<Hyperlink> = Vec::new();
        for link in &self.hyperlinks {
            match link {
                PendingHyperlink::External {
                    reference,
                    url,
                    display,
                    tooltip,
                } => {
                    rel_counter += 1;
                    let id = format!("rId{rel_counter}");
                    rels.add_external(id.clone(), rel_types::HYPERLINK, url);
                    hyperlinks.push(Hyperlink {
                        reference: reference.clone(),
                        rel_id: Some(id),
                        display: display.clone(),
                        tooltip: tooltip.clone(),
                        location: None,
                    });
                }
                PendingHyperlink::Internal {
                    reference,
                    location,
                    display,
                } => {
                    hyperlinks.push(Hyperlink {
                        reference: reference.clone(),
                        rel_id: None,
                        display: display.clone(),
                        tooltip: None,
                        location: Some(location.clone()),
                    });
                }
            }
        }

        // Comments part plus the VML drawing that anchors its boxes; the
        // worksheet references the VML through <legacyDrawing r:id>.
        let mut legacy_drawing_rel_id = None;
        if !self.comments.is_empty() {
            let comments_path = format!("/xl/comments{sheet_number}.xml");
            let vml_path = format!("/xl/drawings/vmlDrawing{sheet_number}.vml");

            let mut authors: Vec<String> = Vec::new();
            let mut entries: Vec<SheetComment> = Vec::new();
            for (cell, author, text) in &self.comments {
                let author_id = match authors.iter().position(|a| a == author) {
                    Some(pos) => pos,
                    None => {
                        authors.push(author.clone());
                        authors.len() - 1
                    }
                };
                entries.push(SheetComment {
                    reference: cell.to_string(),
                    author_id: Some(author_id),
                    text: text.clone(),
                });
            }
            satellites.push(SatellitePart {
                path: comments_path.clone(),
                bytes: write_comments(&CommentsData {
                    authors,
                    comments: entries,
                })?,
                content_type: Some(mime_types::COMMENTS),
            });

            let comment_refs: Vec<CellRef> = self.comments.iter().map(|(c, _, _)| *c).collect();
            satellites.push(SatellitePart {
                path: vml_path.clone(),
                bytes: write_vml_drawing(&comment_refs)?,
                content_type: None,
            });

            rel_counter += 1;
            rels.add(
                format!("rId{rel_counter}"),
                rel_types::COMMENTS,
                &paths::relative_target(&sheet_path, &comments_path),
            );
            rel_counter += 1;
            let vml_id = format!("rId{rel_counter}");
            rels.add(
                vml_id.clone(),
                rel_types::VML_DRAWING,
                &paths::relative_target(&sheet_path, &vml_path),
            );
            legacy_drawing_rel_id = Some(vml_id);
        }

        // Tables: globally unique part ids, per-sheet relationship ids.
        let mut table_rel_ids: Vec<String> = Vec::new();
        for (k, table) in self.tables.iter().enumerate() {
            *table_counter += 1;
            let table_path = format!("/xl/tables/table{table_counter}.xml");
            let data = TableData {
                id: *table_counter,
                name: table.name.clone(),
                display_name: table.name.clone(),
                range: table.range.clone(),
                columns: table.columns.clone(),
                header_row: true,
                totals_row: false,
                style_name: None,
            };
            satellites.push(SatellitePart {
                path: table_path.clone(),
                bytes: write_table(&data)?,
                content_type: Some(mime_types::TABLE),
            });

            let rel_id = format!("rIdTable{}", k + 1);
            rels.add(
                rel_id.clone(),
                rel_types::TABLE,
                &paths::relative_target(&sheet_path, &table_path),
            );
            table_rel_ids.push(rel_id);
        }

        let worksheet =
            self.into_worksheet_data(hyperlinks, legacy_drawing_rel_id, table_rel_ids, shared);
        Ok(PreparedSheet {
            path: sheet_path,
            worksheet_xml: write_worksheet(&worksheet)?,
            rels,
            satellites,
        })
    }

    fn into_worksheet_data(
        self,
        hyperlinks: Vec<Hyperlink>,
        legacy_drawing_rel_id: Option<String>,
        table_rel_ids: Vec<String>,
        shared: &mut SharedStringRegistry,
    ) -> WorksheetData {
        let dimension = dimension_of(&self.cells);

        let mut rows: Vec<RawRow> = Vec::new();
        for ((row_index, col), pending) in self.cells {
            if rows.last().map(|r: &RawRow| r.index) != Some(row_index) {
                rows.push(RawRow {
                    index: row_index,
                    cells: vec![],
                    height: self.row_heights.get(&row_index).copied(),
                    custom_height: self.row_heights.contains_key(&row_index),
                    hidden: false,
                });
            }
            let (value, formula) = match pending.formula {
                Some((expr, cached)) => {
                    let raw = cached.map(cached_raw_value).unwrap_or(RawCellValue::Empty);
                    (raw, Some(expr))
                }
                None => (plain_raw_value(pending.value, shared), None),
            };
            rows.last_mut().expect("row pushed above").cells.push(RawCell {
                reference: CellRef::new(col, row_index),
                value,
                style: pending.style,
                formula,
            });
        }

        // Rows that only carry a height still need a row record.
        for (&row_index, &height) in &self.row_heights {
            if !rows.iter().any(|r| r.index == row_index) {
                let insert_at = rows
                    .iter()
                    .position(|r| r.index > row_index)
                    .unwrap_or(rows.len());
                rows.insert(
                    insert_at,
                    RawRow {
                        index: row_index,
                        cells: vec![],
                        height: Some(height),
                        custom_height: true,
                        hidden: false,
                    },
                );
            }
        }

        let columns: Vec<RawColumn> = self
            .col_widths
            .iter()
            .map(|(&col, &width)| RawColumn {
                min: col,
                max: col,
                width: Some(width),
                custom_width: true,
                hidden: false,
                style: None,
            })
            .collect();

        // A page setup without margins still serializes a margins record.
        let margins = match (&self.margins, &self.page_setup) {
            (Some(m), _) => Some(m.clone()),
            (None, Some(_)) => Some(Margins::default()),
            (None, None) => None,
        };

        WorksheetData {
            dimension,
            rows,
            columns,
            merged_ranges: self.merged,
            data_validations: self.validations,
            hyperlinks,
            conditional_formats: self.conditional_formats,
            protection: self.protection,
            auto_filter: self.auto_filter.map(|range| AutoFilter {
                range,
                columns: vec![],
            }),
            page_setup: self.page_setup,
            margins,
            print_area: self.print_area,
            print_titles: self.print_titles,
            legacy_drawing_rel_id,
            table_rel_ids,
        }
    }
}

/// Map a plain (non-formula) cell value to its raw payload, interning
/// strings into the shared table.
fn plain_raw_value(value: CellValue, shared: &mut SharedStringRegistry) -> RawCellValue {
    match value {
        CellValue::Text(s) => RawCellValue::SharedString(shared.intern_plain(&s)),
        CellValue::RichText(runs) => RawCellValue::SharedString(shared.intern_rich(runs)),
        CellValue::Number(n) => RawCellValue::Number(n),
        CellValue::Bool(b) => RawCellValue::Bool(b),
        CellValue::Date(d) => RawCellValue::DateIso(d),
        CellValue::Error(e) => RawCellValue::Error(e),
        CellValue::Empty => RawCellValue::Empty,
    }
}

/// Map a cached formula result to its raw payload; cached strings stay
/// inline (`t="str"`).
fn cached_raw_value(value: CellValue) -> RawCellValue {
    match value {
        CellValue::Number(n) => RawCellValue::Number(n),
        CellValue::Bool(b) => RawCellValue::Bool(b),
        CellValue::Text(s) => RawCellValue::InlineString(s),
        CellValue::RichText(runs) => {
            RawCellValue::InlineString(runs.iter().map(|r| r.text.as_str()).collect())
        }
        CellValue::Date(d) => RawCellValue::DateIso(d),
        CellValue::Error(e) => RawCellValue::Error(e),
        CellValue::Empty => RawCellValue::Empty,
    }
}

fn dimension_of(cells: &BTreeMap<(u32, u32), PendingCell>) -> Option<String> {
    let mut iter = cells.keys();
    let first = iter.next()?;
    let (mut min_row, mut max_row) = (first.0, first.0);
    let (mut min_col, mut max_col) = (first.1, first.1);
    for (row, col) in iter {
        min_row = min_row.min(*row);
        max_row = max_row.max(*row);
        min_col = min_col.min(*col);
        max_col = max_col.max(*col);
    }
    let range = CellRange::new(CellRef::new(min_col, min_row), CellRef::new(max_col, max_row));
    Some(range.to_string())
}

/// Deduplicating shared-string registry; indices are first-use ordered.
#[derive(Default)]
struct SharedStringRegistry {
    entries: Vec<SharedStringEntry>,
    plain_index: HashMap<String, usize>,
}

impl SharedStringRegistry {
    fn intern_plain(&mut self, text: &str) -> usize {
        if let Some(&idx) = self.plain_index.get(text) {
            return idx;
        }
        let idx = self.entries.len();
        self.entries.push(SharedStringEntry::Plain(text.to_string()));
        self.plain_index.insert(text.to_string(), idx);
        idx
    }

    fn intern_rich(&mut self, runs: Vec<TextRun>) -> usize {
        let candidate = SharedStringEntry::Rich(runs);
        if let Some(idx) = self.entries.iter().position(|e| *e == candidate) {
            return idx;
        }
        self.entries.push(candidate);
        self.entries.len() - 1
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn into_shared_strings(self) -> SharedStrings {
        SharedStrings {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sheet_rejects_duplicates() {
        let mut writer = WorkbookWriter::new();
        writer.add_sheet("Data").unwrap();
        assert!(matches!(
            writer.add_sheet("Data"),
            Err(Error::SheetAlreadyExists { .. })
        ));
        assert!(writer.sheet("Data").is_some());
        assert!(writer.sheet("Nope").is_none());
    }

    #[test]
    fn test_write_rejects_bad_reference() {
        let mut writer = WorkbookWriter::new();
        let sheet = writer.add_sheet("S").unwrap();
        assert!(sheet.write_number("notacell", 1.0).is_err());
        assert!(sheet.merge_cells("A1;B2").is_err());
    }

    #[test]
    fn test_build_deterministic() {
        let build = || {
            let mut writer = WorkbookWriter::new();
            let bold = writer.add_style(&CellStyle::new().bold());
            {
                let sheet = writer.add_sheet("One").unwrap();
                sheet.write_text("A1", "hello").unwrap();
                sheet.write_number("B2", 42.0).unwrap();
                sheet.set_cell_style("A1", bold).unwrap();
                sheet.merge_cells("C1:D2").unwrap();
                sheet.add_comment("B2", "Ada", "check").unwrap();
                sheet
                    .add_hyperlink("A2", "https://example.com", Some("site"), None)
                    .unwrap();
                sheet.add_table("T1", "A1:B2", &["a", "b"]).unwrap();
            }
            writer.add_defined_name("Totals", "'One'!$B$2");
            writer.protect_workbook(true, false);
            writer.build().unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_shared_string_dedup_in_build() {
        let mut writer = WorkbookWriter::new();
        {
            let sheet = writer.add_sheet("S").unwrap();
            sheet.write_text("A1", "dup").unwrap();
            sheet.write_text("A2", "dup").unwrap();
            sheet.write_text("A3", "other").unwrap();
        }
        let bytes = writer.build().unwrap();
        let workbook = crate::workbook::Workbook::open(bytes).unwrap();
        assert_eq!(workbook.shared_strings().len(), 2);
    }

    #[test]
    fn test_overwrite_keeps_style() {
        let mut writer = WorkbookWriter::new();
        let bold = writer.add_style(&CellStyle::new().bold());
        let sheet = writer.add_sheet("S").unwrap();
        sheet.set_cell_style("A1", bold).unwrap();
        sheet.write_number("A1", 5.0).unwrap();
        let pending = sheet.cells.get(&(1, 1)).unwrap();
        assert_eq!(pending.style, Some(bold));
    }
}
