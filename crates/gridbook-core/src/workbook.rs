//! The read-side workbook.
//!
//! A [`Workbook`] owns the package handle and the decoded workbook-wide
//! tables (sheet metadata, shared strings, styles, pivot descriptors).
//! Sheets are loaded on demand; each [`crate::sheet::Sheet`] borrows the
//! shared tables for as long as the workbook lives.

use std::collections::HashMap;

use gridbook_xml::chart::{self, ChartData};
use gridbook_xml::comments::{self, CommentsData};
use gridbook_xml::namespaces::{mime_types, rel_types};
use gridbook_xml::pivot_table::{self, PivotTableData};
use gridbook_xml::shared_strings::{self, SharedStrings};
use gridbook_xml::styles::{self, StylesInfo};
use gridbook_xml::table::{self, TableData};
use gridbook_xml::workbook::{DefinedName, SheetInfo, WorkbookInfo, WorkbookProtection};
use gridbook_xml::worksheet;

use crate::error::{Error, FormulaError, Result};
use crate::package::{Package, WORKBOOK_PATH};
use crate::sheet::Sheet;

/// Reader configuration: best-effort loading toggles for the optional
/// decorations a workbook may carry.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    load_charts: bool,
    load_pivot_tables: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip or keep following drawing relationships into chart parts.
    pub fn charts(mut self, load: bool) -> Self {
        self.load_charts = load;
        self
    }

    /// Skip or keep scanning the manifest for pivot-table descriptors.
    pub fn pivot_tables(mut self, load: bool) -> Self {
        self.load_pivot_tables = load;
        self
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            load_charts: true,
            load_pivot_tables: true,
        }
    }
}

/// An opened `.xlsx` workbook.
#[derive(Debug)]
pub struct Workbook {
    package: Package,
    info: WorkbookInfo,
    shared_strings: SharedStrings,
    styles: StylesInfo,
    pivot_tables: Vec<PivotTableData>,
    options: OpenOptions,
}

impl Workbook {
    /// Open a workbook from its raw bytes.
    pub fn open(bytes: Vec<u8>) -> Result<Self> {
        Self::open_with_options(bytes, OpenOptions::default())
    }

    /// Open a workbook from a file on disk.
    pub fn open_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                Error::AccessDenied(path.display().to_string())
            }
            _ => Error::Io(e),
        })?;
        Self::open(bytes)
    }

    /// Open a workbook with explicit [`OpenOptions`].
    pub fn open_with_options(bytes: Vec<u8>, options: OpenOptions) -> Result<Self> {
        let package = Package::open(bytes)?;

        let workbook_bytes = package.read_part(WORKBOOK_PATH)?;
        let info = gridbook_xml::workbook::parse_workbook(WORKBOOK_PATH, &workbook_bytes)?;

        let workbook_rels = package.relationships_for(WORKBOOK_PATH)?;

        // Optional workbook-wide tables act as empty when absent.
        let shared_strings = match workbook_rels.first_of_type(rel_types::SHARED_STRINGS) {
            Some(rel) => {
                let path = package.resolve(rel, WORKBOOK_PATH);
                match package.read_part(&path) {
                    Ok(bytes) => shared_strings::parse_shared_strings(&path, &bytes)?,
                    Err(_) => SharedStrings::default(),
                }
            }
            None => SharedStrings::default(),
        };

        let styles = match workbook_rels.first_of_type(rel_types::STYLES) {
            Some(rel) => {
                let path = package.resolve(rel, WORKBOOK_PATH);
                match package.read_part(&path) {
                    Ok(bytes) => styles::parse_styles(&path, &bytes)?,
                    Err(_) => StylesInfo::default(),
                }
            }
            None => StylesInfo::default(),
        };

        // Pivot descriptors come from the manifest; a corrupt pivot part
        // must not keep the workbook from opening.
        let mut pivot_tables = Vec::new();
        if options.load_pivot_tables {
            for ovr in &package.content_types().overrides {
                if ovr.content_type != mime_types::PIVOT_TABLE {
                    continue;
                }
                if let Ok(bytes) = package.read_part(&ovr.part_name) {
                    if let Ok(pivot) = pivot_table::parse_pivot_table(&ovr.part_name, &bytes) {
                        pivot_tables.push(pivot);
                    }
                }
            }
        }

        Ok(Self {
            package,
            info,
            shared_strings,
            styles,
            pivot_tables,
            options,
        })
    }

    /// Sheet metadata in workbook order.
    pub fn sheets(&self) -> &[SheetInfo] {
        &self.info.sheets
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.info.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn protection(&self) -> Option<&WorkbookProtection> {
        self.info.protection.as_ref()
    }

    pub fn defined_names(&self) -> &[DefinedName] {
        &self.info.defined_names
    }

    pub fn pivot_tables(&self) -> &[PivotTableData] {
        &self.pivot_tables
    }

    pub fn shared_strings(&self) -> &SharedStrings {
        &self.shared_strings
    }

    /// Strict shared-string lookup; cell resolution degrades the same
    /// condition to an error value instead.
    pub fn shared_string(&self, index: usize) -> Result<&gridbook_xml::shared_strings::SharedStringEntry> {
        self.shared_strings
            .get(index)
            .ok_or(Error::SharedStringIndexOutOfRange {
                index,
                len: self.shared_strings.len(),
            })
    }

    pub fn styles(&self) -> &StylesInfo {
        &self.styles
    }

    /// Split a refers-to expression into sheet and range on the *last* `!`,
    /// stripping matching single quotes around the sheet part.
    pub fn parse_defined_name(refers_to: &str) -> (Option<String>, String) {
        match refers_to.rsplit_once('!') {
            Some((sheet, range)) => {
                let sheet = sheet.trim();
                let sheet = sheet
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .unwrap_or(sheet);
                (Some(sheet.to_string()), range.to_string())
            }
            None => (None, refers_to.to_string()),
        }
    }

    /// Look up a defined name and parse its refers-to expression.
    pub fn named_range(&self, name: &str) -> Result<(Option<String>, String)> {
        let dn = self
            .info
            .defined_name(name)
            .ok_or_else(|| Error::Formula(FormulaError::NameNotFound(name.to_string())))?;
        Ok(Self::parse_defined_name(&dn.refers_to))
    }

    /// Load a sheet by name.
    pub fn sheet_named(&self, name: &str) -> Result<Sheet<'_>> {
        let position = self
            .info
            .sheets
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| Error::SheetNotFound {
                name: name.to_string(),
            })?;
        self.sheet_at(position)
    }

    /// Load a sheet by its zero-based position.
    pub fn sheet_at(&self, index: usize) -> Result<Sheet<'_>> {
        let sheet_info = self.info.sheets.get(index).ok_or_else(|| Error::SheetNotFound {
            name: format!("#{index}"),
        })?;

        // The workbook rels file is the authoritative mapping from sheet
        // metadata to the physical part path.
        let workbook_rels = self.package.relationships_for(WORKBOOK_PATH)?;
        let rel = workbook_rels.by_id(&sheet_info.rel_id).ok_or_else(|| {
            Error::InvalidPackageStructure(format!(
                "sheet '{}' references unknown relationship '{}'",
                sheet_info.name, sheet_info.rel_id
            ))
        })?;
        let sheet_path = self.package.resolve(rel, WORKBOOK_PATH);

        let sheet_bytes = self.package.read_part(&sheet_path)?;
        let mut data = worksheet::parse_worksheet(&sheet_path, &sheet_bytes)?;

        let sheet_rels = self.package.relationships_for(&sheet_path)?;

        // Comments are optional; a corrupt part drops silently.
        let comments: Option<CommentsData> = sheet_rels
            .first_of_type(rel_types::COMMENTS)
            .and_then(|rel| {
                let path = self.package.resolve(rel, &sheet_path);
                let bytes = self.package.read_part(&path).ok()?;
                comments::parse_comments(&path, &bytes).ok()
            });

        // External hyperlink targets resolve through the sheet rels.
        let mut hyperlink_targets: HashMap<String, String> = HashMap::new();
        for rel in sheet_rels.by_type(rel_types::HYPERLINK) {
            if rel.is_external {
                hyperlink_targets.insert(rel.id.clone(), rel.target.clone());
            }
        }

        // Charts hang off the sheet's drawing part.
        let mut charts: Vec<ChartData> = Vec::new();
        if self.options.load_charts {
            for drawing_rel in sheet_rels.by_type(rel_types::DRAWING) {
                let drawing_path = self.package.resolve(drawing_rel, &sheet_path);
                let Ok(drawing_rels) = self.package.relationships_for(&drawing_path) else {
                    continue;
                };
                for chart_rel in drawing_rels.by_type(rel_types::CHART) {
                    let chart_path = self.package.resolve(chart_rel, &drawing_path);
                    let Ok(bytes) = self.package.read_part(&chart_path) else {
                        continue;
                    };
                    if let Ok(mut chart) = chart::parse_chart(&chart_path, &bytes) {
                        chart::refine_bar_direction(&mut chart);
                        charts.push(chart);
                    }
                }
            }
        }

        // Table parts attached to this sheet.
        let mut tables: Vec<TableData> = Vec::new();
        for rel in sheet_rels.by_type(rel_types::TABLE) {
            let path = self.package.resolve(rel, &sheet_path);
            let Ok(bytes) = self.package.read_part(&path) else {
                continue;
            };
            if let Ok(t) = table::parse_table(&path, &bytes) {
                tables.push(t);
            }
        }

        // Print area and titles live as sheet-scoped defined names.
        for dn in &self.info.defined_names {
            if dn.local_sheet_id != Some(index as u32) {
                continue;
            }
            let (_, range) = Self::parse_defined_name(&dn.refers_to);
            match dn.name.as_str() {
                "_xlnm.Print_Area" => data.print_area = Some(range),
                "_xlnm.Print_Titles" => data.print_titles = Some(range),
                _ => {}
            }
        }

        Ok(Sheet::new(
            sheet_info.name.clone(),
            data,
            &self.shared_strings,
            &self.styles,
            comments,
            charts,
            tables,
            hyperlink_targets,
        ))
    }
}

/// Convenience: resolve a raw cell against workbook tables without a
/// full sheet load (used by tests and tooling).
pub(crate) fn resolve_raw_value(
    value: &worksheet::RawCellValue,
    style: Option<u32>,
    shared: &SharedStrings,
    styles: &StylesInfo,
) -> crate::cell::CellValue {
    use crate::cell::CellValue;
    use gridbook_xml::shared_strings::SharedStringEntry;
    use gridbook_xml::worksheet::RawCellValue;

    match value {
        RawCellValue::SharedString(index) => match shared.get(*index) {
            Some(SharedStringEntry::Plain(text)) => CellValue::Text(text.clone()),
            Some(SharedStringEntry::Rich(runs)) => CellValue::RichText(runs.clone()),
            None => CellValue::Error(format!("Invalid shared string index: {index}")),
        },
        RawCellValue::Number(n) => {
            let is_date = style
                .map(|s| styles.is_date_format(s as usize))
                .unwrap_or(false);
            if is_date {
                CellValue::Date(CellValue::Number(*n).to_string())
            } else {
                CellValue::Number(*n)
            }
        }
        RawCellValue::InlineString(s) => CellValue::Text(s.clone()),
        RawCellValue::Bool(b) => CellValue::Bool(*b),
        RawCellValue::Error(e) => CellValue::Error(e.clone()),
        RawCellValue::DateIso(d) => CellValue::Date(d.clone()),
        RawCellValue::Empty => CellValue::Empty,
    }
}
