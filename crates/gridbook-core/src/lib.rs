//! gridbook-core: reading, writing, and evaluating Excel (`.xlsx`)
//! workbooks.
//!
//! The crate is layered bottom-up: the [`package`] module hides the OPC
//! container, the schema parsers and builders live in [`gridbook_xml`],
//! the object model ([`Workbook`], [`Sheet`]) resolves raw cells through
//! the shared-string and style tables, and the [`formula`] subsystem
//! evaluates a defined subset of spreadsheet functions against live cell
//! values.
//!
//! # Reading
//!
//! ```no_run
//! use gridbook_core::Workbook;
//!
//! let workbook = Workbook::open_file("report.xlsx")?;
//! let sheet = workbook.sheet_at(0)?;
//! println!("{}", sheet.cell("B2")?);
//! # Ok::<(), gridbook_core::Error>(())
//! ```
//!
//! # Writing
//!
//! ```
//! use gridbook_core::{CellStyle, WorkbookWriter};
//!
//! let mut writer = WorkbookWriter::new();
//! let bold = writer.add_style(&CellStyle::new().bold());
//! let sheet = writer.add_sheet("Report")?;
//! sheet.write_text("A1", "Total")?;
//! sheet.write_number("B1", 1234.5)?;
//! sheet.set_cell_style("A1", bold)?;
//! let bytes = writer.build()?;
//! # assert!(!bytes.is_empty());
//! # Ok::<(), gridbook_core::Error>(())
//! ```

pub mod cell;
pub mod error;
pub mod formula;
pub mod package;
pub mod sheet;
pub mod style;
pub mod workbook;
pub mod writer;

pub(crate) mod paths;

pub use cell::CellValue;
pub use error::{Error, FormulaError, FormulaResult, Result};
pub use formula::{DependencyGraph, ErrorCode, FormulaEngine, FormulaValue};
pub use package::{Package, PackageBuilder};
pub use sheet::{Comment, ResolvedHyperlink, Sheet};
pub use style::{CellStyle, ResolvedStyle};
pub use workbook::{OpenOptions, Workbook};
pub use writer::{SheetWriter, WorkbookWriter};

// The schema layer's vocabulary is part of the public surface.
pub use gridbook_xml::cell_ref::{
    column_index, column_letters, column_name_to_number, column_number_to_name, CellRange, CellRef,
};
pub use gridbook_xml::chart::{ChartData, ChartType};
pub use gridbook_xml::pivot_table::PivotTableData;
pub use gridbook_xml::shared_strings::{RunColor, SharedStringEntry, TextRun, VertAlign};
pub use gridbook_xml::table::TableData;
pub use gridbook_xml::workbook::{DefinedName, SheetInfo, SheetState, WorkbookProtection};
pub use gridbook_xml::worksheet::{
    AutoFilter, CfRule, CfRuleKind, Cfvo, CfvoKind, ConditionalFormat, DataValidation, Hyperlink,
    Margins, Orientation, PageSetup, PaperSize, SheetProtection, ValidationKind,
};
