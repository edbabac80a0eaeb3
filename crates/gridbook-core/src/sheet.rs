//! The read-side sheet and its query surface.
//!
//! A [`Sheet`] wires a parsed worksheet together with the workbook's
//! shared-string and style tables (borrowed for the workbook's lifetime),
//! plus the comments, charts, and tables discovered through the sheet's
//! relationships.

use std::collections::HashMap;

use gridbook_xml::cell_ref::{sqref_intersects, CellRange, CellRef};
use gridbook_xml::chart::ChartData;
use gridbook_xml::comments::CommentsData;
use gridbook_xml::shared_strings::SharedStrings;
use gridbook_xml::styles::StylesInfo;
use gridbook_xml::table::TableData;
use gridbook_xml::worksheet::{
    AutoFilter, ConditionalFormat, DataValidation, Margins, PageSetup, SheetProtection,
    WorksheetData,
};

use crate::cell::CellValue;
use crate::error::{FormulaResult, Result};
use crate::formula::{CellResolver, ErrorCode, FormulaValue};
use crate::style::{resolve_style, ResolvedStyle};
use crate::workbook::resolve_raw_value;

/// A comment attached to a cell, with its author resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment<'a> {
    pub author: Option<&'a str>,
    pub text: &'a str,
}

/// A hyperlink with its external target resolved through the sheet rels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHyperlink<'a> {
    pub reference: &'a str,
    /// The external URL, when the link leaves the workbook.
    pub target: Option<&'a str>,
    pub display: Option<&'a str>,
    pub tooltip: Option<&'a str>,
    /// The in-workbook location (`Sheet2!A1`) for internal links.
    pub location: Option<&'a str>,
}

/// A loaded worksheet bound to its workbook's tables.
pub struct Sheet<'wb> {
    name: String,
    data: WorksheetData,
    shared: &'wb SharedStrings,
    styles: &'wb StylesInfo,
    comments: Option<CommentsData>,
    charts: Vec<ChartData>,
    tables: Vec<TableData>,
    hyperlink_targets: HashMap<String, String>,
}

impl<'wb> Sheet<'wb> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        data: WorksheetData,
        shared: &'wb SharedStrings,
        styles: &'wb StylesInfo,
        comments: Option<CommentsData>,
        charts: Vec<ChartData>,
        tables: Vec<TableData>,
        hyperlink_targets: HashMap<String, String>,
    ) -> Self {
        Self {
            name,
            data,
            shared,
            styles,
            comments,
            charts,
            tables,
            hyperlink_targets,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared dimension string, if the sheet carried one.
    pub fn dimension(&self) -> Option<&str> {
        self.data.dimension.as_deref()
    }

    /// The raw worksheet model behind this sheet.
    pub fn raw(&self) -> &WorksheetData {
        &self.data
    }

    /// Resolve the cell at an A1-style reference.
    ///
    /// Missing cells are empty; a shared-string index past the table
    /// resolves to an error value rather than failing the sheet.
    pub fn cell(&self, reference: &str) -> Result<CellValue> {
        let cell_ref = CellRef::parse(reference)?;
        Ok(self.cell_at(&cell_ref))
    }

    /// Resolve a cell by parsed reference.
    pub fn cell_at(&self, reference: &CellRef) -> CellValue {
        match self.data.cell(reference) {
            Some(raw) => resolve_raw_value(&raw.value, raw.style, self.shared, self.styles),
            None => CellValue::Empty,
        }
    }

    /// All populated cells of one row, resolved, in document order.
    pub fn row(&self, index: u32) -> Vec<(CellRef, CellValue)> {
        match self.data.row(index) {
            Some(row) => row
                .cells
                .iter()
                .map(|c| {
                    (
                        c.reference,
                        resolve_raw_value(&c.value, c.style, self.shared, self.styles),
                    )
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Lazy iterator over rows in document order.
    pub fn rows(&self) -> impl Iterator<Item = (u32, Vec<(CellRef, CellValue)>)> + '_ {
        self.data
            .rows
            .iter()
            .map(move |row| (row.index, self.row(row.index)))
    }

    /// Every reference inside a rectangle, resolved (missing cells empty).
    pub fn range(&self, range: &str) -> Result<Vec<(CellRef, CellValue)>> {
        let range = CellRange::parse(range)?;
        Ok(range
            .cells()
            .map(|cell_ref| (cell_ref, self.cell_at(&cell_ref)))
            .collect())
    }

    /// All populated cells of one column, top to bottom.
    pub fn column(&self, letters: &str) -> Result<Vec<(CellRef, CellValue)>> {
        let col = gridbook_xml::cell_ref::column_name_to_number(letters)?;
        let mut out = Vec::new();
        for row in &self.data.rows {
            for cell in &row.cells {
                if cell.reference.col == col {
                    out.push((
                        cell.reference,
                        resolve_raw_value(&cell.value, cell.style, self.shared, self.styles),
                    ));
                }
            }
        }
        Ok(out)
    }

    /// First populated cell satisfying the predicate, in document order.
    pub fn find<F>(&self, predicate: F) -> Option<(CellRef, CellValue)>
    where
        F: Fn(&CellValue) -> bool,
    {
        self.find_all(predicate).into_iter().next()
    }

    /// All populated cells satisfying the predicate, in document order.
    pub fn find_all<F>(&self, predicate: F) -> Vec<(CellRef, CellValue)>
    where
        F: Fn(&CellValue) -> bool,
    {
        let mut out = Vec::new();
        for row in &self.data.rows {
            for cell in &row.cells {
                let value = resolve_raw_value(&cell.value, cell.style, self.shared, self.styles);
                if predicate(&value) {
                    out.push((cell.reference, value));
                }
            }
        }
        out
    }

    /// The formula text of a cell, if it carries one.
    pub fn formula(&self, reference: &str) -> Result<Option<&str>> {
        let cell_ref = CellRef::parse(reference)?;
        Ok(self
            .data
            .cell(&cell_ref)
            .and_then(|c| c.formula.as_deref()))
    }

    /// The resolved style of a cell, or `None` when unstyled.
    pub fn cell_style(&self, reference: &str) -> Result<Option<ResolvedStyle>> {
        let cell_ref = CellRef::parse(reference)?;
        match self.data.cell(&cell_ref).and_then(|c| c.style) {
            Some(index) => Ok(Some(resolve_style(self.styles, index as usize)?)),
            None => Ok(None),
        }
    }

    /// Data validations whose sqref intersects the given cell or range.
    pub fn validations_for(&self, reference: &str) -> Result<Vec<&DataValidation>> {
        let probe = CellRange::parse(reference)?;
        Ok(self
            .data
            .data_validations
            .iter()
            .filter(|dv| sqref_intersects(&dv.sqref, &probe))
            .collect())
    }

    /// The hyperlink attached to a cell, with its external target resolved.
    pub fn hyperlink(&self, reference: &str) -> Option<ResolvedHyperlink<'_>> {
        let link = self
            .data
            .hyperlinks
            .iter()
            .find(|h| h.reference == reference)?;
        let target = link
            .rel_id
            .as_deref()
            .and_then(|id| self.hyperlink_targets.get(id))
            .map(|t| t.as_str());
        Some(ResolvedHyperlink {
            reference: &link.reference,
            target,
            display: link.display.as_deref(),
            tooltip: link.tooltip.as_deref(),
            location: link.location.as_deref(),
        })
    }

    /// The comment attached to a cell, author resolved leniently.
    pub fn comment(&self, reference: &str) -> Option<Comment<'_>> {
        let comments = self.comments.as_ref()?;
        let comment = comments.comment_at(reference)?;
        Some(Comment {
            author: comments.author_of(comment),
            text: &comment.text,
        })
    }

    pub fn merged_ranges(&self) -> &[CellRange] {
        &self.data.merged_ranges
    }

    pub fn conditional_formats(&self) -> &[ConditionalFormat] {
        &self.data.conditional_formats
    }

    pub fn auto_filter(&self) -> Option<&AutoFilter> {
        self.data.auto_filter.as_ref()
    }

    pub fn protection(&self) -> Option<&SheetProtection> {
        self.data.protection.as_ref()
    }

    pub fn page_setup(&self) -> Option<&PageSetup> {
        self.data.page_setup.as_ref()
    }

    pub fn margins(&self) -> Option<&Margins> {
        self.data.margins.as_ref()
    }

    pub fn print_area(&self) -> Option<&str> {
        self.data.print_area.as_deref()
    }

    pub fn print_titles(&self) -> Option<&str> {
        self.data.print_titles.as_deref()
    }

    pub fn charts(&self) -> &[ChartData] {
        &self.charts
    }

    pub fn tables(&self) -> &[TableData] {
        &self.tables
    }

    /// Evaluate a formula string against this sheet's live cell values.
    pub fn evaluate(&self, formula: &str) -> FormulaResult<FormulaValue> {
        crate::formula::evaluate_formula(formula, &SheetValues { sheet: self })
    }
}

/// Adapter letting the evaluator read a loaded sheet.
struct SheetValues<'a, 'wb> {
    sheet: &'a Sheet<'wb>,
}

impl CellResolver for SheetValues<'_, '_> {
    fn resolve(&self, cell: &CellRef) -> FormulaValue {
        cell_to_formula_value(self.sheet.cell_at(cell))
    }
}

/// Map a resolved cell value into the formula domain.
fn cell_to_formula_value(value: CellValue) -> FormulaValue {
    match value {
        CellValue::Empty => FormulaValue::Empty,
        CellValue::Number(n) => FormulaValue::Number(n),
        CellValue::Bool(b) => FormulaValue::Bool(b),
        CellValue::Text(s) => FormulaValue::Text(s),
        CellValue::RichText(runs) => {
            FormulaValue::Text(runs.iter().map(|r| r.text.as_str()).collect())
        }
        // Date-styled numbers carry their serial; ISO payloads stay text.
        CellValue::Date(s) => match s.parse::<f64>() {
            Ok(n) => FormulaValue::Number(n),
            Err(_) => FormulaValue::Text(s),
        },
        CellValue::Error(e) => {
            FormulaValue::Error(ErrorCode::parse(&e).unwrap_or(ErrorCode::Value))
        }
    }
}
