//! Worksheet parts (`xl/worksheets/sheet*.xml`).
//!
//! The parser is a single forward pass emitting rows in document order; the
//! builder streams the same model back out with a stable element order:
//! `dimension`, `cols`, `sheetData`, `sheetProtection`, `autoFilter`,
//! `mergeCells`, `conditionalFormatting`, `dataValidations`, `hyperlinks`,
//! `pageMargins`, `pageSetup`, `legacyDrawing`, `tableParts`.

use quick_xml::events::{BytesStart, Event};

use crate::cell_ref::{CellRange, CellRef};
use crate::namespaces::{RELATIONSHIPS, SPREADSHEET_ML};
use crate::sax::{self, Emitter};
use crate::Result;

// -------------------------------------------------------------------------
// Raw model
// -------------------------------------------------------------------------

/// The undecoded value carried by a `<c>` element.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCellValue {
    /// Index into the shared string table (`t="s"`).
    SharedString(usize),
    /// Literal string payload (`t="str"`).
    InlineString(String),
    /// Numeric payload (`t="n"` or no type attribute).
    Number(f64),
    /// Boolean payload (`t="b"`, `"1"` is true).
    Bool(bool),
    /// Error code payload (`t="e"`).
    Error(String),
    /// Pre-parsed ISO date payload (`t="d"`).
    DateIso(String),
    /// No `<v>` element.
    Empty,
}

/// One `<c>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCell {
    pub reference: CellRef,
    pub value: RawCellValue,
    /// Index into the style table's cell formats.
    pub style: Option<u32>,
    /// Formula text without the leading `=`.
    pub formula: Option<String>,
}

/// One `<row>` element with its cells in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub index: u32,
    pub cells: Vec<RawCell>,
    pub height: Option<f64>,
    pub custom_height: bool,
    pub hidden: bool,
}

/// A `<col>` definition covering an inclusive 1-based column span.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub min: u32,
    pub max: u32,
    pub width: Option<f64>,
    pub custom_width: bool,
    pub hidden: bool,
    pub style: Option<u32>,
}

/// Data-validation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationKind {
    List,
    Whole,
    Decimal,
    Date,
    Custom,
    Unknown(String),
}

impl ValidationKind {
    pub fn as_str(&self) -> &str {
        match self {
            ValidationKind::List => "list",
            ValidationKind::Whole => "whole",
            ValidationKind::Decimal => "decimal",
            ValidationKind::Date => "date",
            ValidationKind::Custom => "custom",
            ValidationKind::Unknown(s) => s,
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "list" => ValidationKind::List,
            "whole" => ValidationKind::Whole,
            "decimal" => ValidationKind::Decimal,
            "date" => ValidationKind::Date,
            "custom" => ValidationKind::Custom,
            other => ValidationKind::Unknown(other.to_string()),
        }
    }
}

/// A `<dataValidation>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct DataValidation {
    pub kind: ValidationKind,
    pub allow_blank: bool,
    /// Space-separated list of single references and colon ranges.
    pub sqref: String,
    pub operator: Option<String>,
    pub formula1: Option<String>,
    pub formula2: Option<String>,
}

/// A `<hyperlink>` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hyperlink {
    pub reference: String,
    /// Relationship id carrying the external target, if any.
    pub rel_id: Option<String>,
    pub display: Option<String>,
    pub tooltip: Option<String>,
    /// Internal location (`Sheet2!A1`) for in-workbook links.
    pub location: Option<String>,
}

/// A conditional-formatting threshold value object.
#[derive(Debug, Clone, PartialEq)]
pub struct Cfvo {
    pub kind: CfvoKind,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfvoKind {
    Min,
    Max,
    Num,
    Percent,
    Percentile,
    Formula,
    Unknown(String),
}

impl CfvoKind {
    pub fn as_str(&self) -> &str {
        match self {
            CfvoKind::Min => "min",
            CfvoKind::Max => "max",
            CfvoKind::Num => "num",
            CfvoKind::Percent => "percent",
            CfvoKind::Percentile => "percentile",
            CfvoKind::Formula => "formula",
            CfvoKind::Unknown(s) => s,
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "min" => CfvoKind::Min,
            "max" => CfvoKind::Max,
            "num" => CfvoKind::Num,
            "percent" => CfvoKind::Percent,
            "percentile" => CfvoKind::Percentile,
            "formula" => CfvoKind::Formula,
            other => CfvoKind::Unknown(other.to_string()),
        }
    }
}

/// The body of a `<cfRule>`.
#[derive(Debug, Clone, PartialEq)]
pub enum CfRuleKind {
    CellIs {
        operator: String,
        formulas: Vec<String>,
    },
    Expression {
        formula: String,
    },
    DataBar {
        min: Cfvo,
        max: Cfvo,
        color: String,
        show_value: bool,
    },
    ColorScale {
        values: Vec<Cfvo>,
        colors: Vec<String>,
    },
    IconSet {
        icon_set: String,
        values: Vec<Cfvo>,
        show_value: bool,
        reverse: bool,
        percent: bool,
    },
    /// A rule type this library does not model; the type tag is preserved.
    Unknown(String),
}

/// One `<cfRule>` with its shared attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct CfRule {
    pub kind: CfRuleKind,
    pub priority: Option<i32>,
    pub dxf_id: Option<u32>,
    pub stop_if_true: bool,
}

/// A `<conditionalFormatting>` block: a range plus its rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalFormat {
    pub range: String,
    pub rules: Vec<CfRule>,
}

/// `<sheetProtection>` permission flags.
///
/// Every flag defaults to allowed; an attribute value of `"0"` denies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetProtection {
    pub password_hash: Option<String>,
    pub select_locked_cells: bool,
    pub select_unlocked_cells: bool,
    pub format_cells: bool,
    pub format_columns: bool,
    pub format_rows: bool,
    pub insert_columns: bool,
    pub insert_rows: bool,
    pub insert_hyperlinks: bool,
    pub delete_columns: bool,
    pub delete_rows: bool,
    pub sort: bool,
    pub auto_filter: bool,
    pub pivot_tables: bool,
}

impl Default for SheetProtection {
    fn default() -> Self {
        Self {
            password_hash: None,
            select_locked_cells: true,
            select_unlocked_cells: true,
            format_cells: true,
            format_columns: true,
            format_rows: true,
            insert_columns: true,
            insert_rows: true,
            insert_hyperlinks: true,
            delete_columns: true,
            delete_rows: true,
            sort: true,
            auto_filter: true,
            pivot_tables: true,
        }
    }
}

/// An `<autoFilter>` with its per-column filter values.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoFilter {
    pub range: String,
    pub columns: Vec<FilterColumn>,
}

/// One `<filterColumn>`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterColumn {
    pub col_id: u32,
    pub values: Vec<String>,
}

/// Enumerated paper sizes (the OOXML `paperSize` codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperSize {
    Letter,
    Tabloid,
    Legal,
    A3,
    A4,
    A5,
    B4,
    B5,
    Unknown(u32),
}

impl PaperSize {
    pub fn code(&self) -> u32 {
        match self {
            PaperSize::Letter => 1,
            PaperSize::Tabloid => 3,
            PaperSize::Legal => 5,
            PaperSize::A3 => 8,
            PaperSize::A4 => 9,
            PaperSize::A5 => 11,
            PaperSize::B4 => 12,
            PaperSize::B5 => 13,
            PaperSize::Unknown(code) => *code,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            1 => PaperSize::Letter,
            3 => PaperSize::Tabloid,
            5 => PaperSize::Legal,
            8 => PaperSize::A3,
            9 => PaperSize::A4,
            11 => PaperSize::A5,
            12 => PaperSize::B4,
            13 => PaperSize::B5,
            other => PaperSize::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// `<pageSetup>` attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSetup {
    pub paper_size: PaperSize,
    pub orientation: Orientation,
    pub scale: Option<u32>,
    pub fit_to_width: Option<u32>,
    pub fit_to_height: Option<u32>,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            orientation: Orientation::Portrait,
            scale: None,
            fit_to_width: None,
            fit_to_height: None,
        }
    }
}

/// `<pageMargins>` in inches.
#[derive(Debug, Clone, PartialEq)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub header: f64,
    pub footer: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 0.7,
            right: 0.7,
            top: 0.75,
            bottom: 0.75,
            header: 0.3,
            footer: 0.3,
        }
    }
}

/// Everything a worksheet part carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorksheetData {
    pub dimension: Option<String>,
    pub rows: Vec<RawRow>,
    pub columns: Vec<RawColumn>,
    pub merged_ranges: Vec<CellRange>,
    pub data_validations: Vec<DataValidation>,
    pub hyperlinks: Vec<Hyperlink>,
    pub conditional_formats: Vec<ConditionalFormat>,
    pub protection: Option<SheetProtection>,
    pub auto_filter: Option<AutoFilter>,
    pub page_setup: Option<PageSetup>,
    pub margins: Option<Margins>,
    /// Workbook-level print area for this sheet, filled from defined names.
    pub print_area: Option<String>,
    /// Workbook-level print titles for this sheet, filled from defined names.
    pub print_titles: Option<String>,
    /// Relationship id of the legacy VML drawing anchoring comments.
    pub legacy_drawing_rel_id: Option<String>,
    /// Relationship ids of the table parts attached to this sheet.
    pub table_rel_ids: Vec<String>,
}

impl WorksheetData {
    /// Find a cell by reference.
    pub fn cell(&self, reference: &CellRef) -> Option<&RawCell> {
        self.rows
            .iter()
            .find(|row| row.index == reference.row)?
            .cells
            .iter()
            .find(|c| c.reference == *reference)
    }

    /// Find a row by its 1-based index.
    pub fn row(&self, index: u32) -> Option<&RawRow> {
        self.rows.iter().find(|row| row.index == index)
    }
}

// -------------------------------------------------------------------------
// Parser
// -------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    SheetData,
    Row,
    Cell,
    CellValue,
    CellFormula,
    Cols,
    MergeCells,
    DataValidations,
    DataValidation,
    ValidationFormula(u8),
    Hyperlinks,
    ConditionalFormatting,
    CfRule,
    CfFormula,
    DataBar,
    ColorScale,
    IconSet,
    AutoFilter,
    FilterColumn,
    Other,
}

/// In-flight `<cfRule>` state.
#[derive(Default)]
struct PendingRule {
    rule_type: String,
    operator: Option<String>,
    priority: Option<i32>,
    dxf_id: Option<u32>,
    stop_if_true: bool,
    formulas: Vec<String>,
    cfvos: Vec<Cfvo>,
    colors: Vec<String>,
    show_value: bool,
    reverse: bool,
    percent: bool,
    icon_set: String,
}

/// Parse a worksheet part.
pub fn parse_worksheet(part: &str, data: &[u8]) -> Result<WorksheetData> {
    let mut reader = sax::reader(data);
    let mut buf = Vec::new();
    let mut ws = WorksheetData::default();

    let mut stack: Vec<Ctx> = Vec::new();
    let mut row = RawRow::default();
    let mut next_row_index: u32 = 1;
    let mut cell: Option<RawCell> = None;
    let mut cell_type = String::new();
    let mut text = String::new();
    let mut validation: Option<DataValidation> = None;
    let mut cf_range = String::new();
    let mut cf_rules: Vec<CfRule> = Vec::new();
    let mut rule = PendingRule::default();
    let mut filter_col: Option<FilterColumn> = None;

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| crate::Error::malformed(part, e))?;
        match event {
            Event::Start(ref e) => {
                let ctx = start_context(&stack, e);
                handle_start(
                    part, e, ctx, &mut ws, &mut row, &mut next_row_index, &mut cell,
                    &mut cell_type, &mut text, &mut validation, &mut cf_range, &mut cf_rules,
                    &mut rule, &mut filter_col,
                )?;
                stack.push(ctx);
            }
            Event::Empty(ref e) => {
                let ctx = start_context(&stack, e);
                handle_start(
                    part, e, ctx, &mut ws, &mut row, &mut next_row_index, &mut cell,
                    &mut cell_type, &mut text, &mut validation, &mut cf_range, &mut cf_rules,
                    &mut rule, &mut filter_col,
                )?;
                // Close the synthetic frame immediately.
                stack.push(ctx);
                handle_end(
                    part, &mut stack, &mut ws, &mut row, &mut cell, &cell_type, &text,
                    &mut validation, &mut cf_range, &mut cf_rules, &mut rule, &mut filter_col,
                )?;
            }
            Event::Text(ref t) => {
                if matches!(
                    stack.last(),
                    Some(Ctx::CellValue)
                        | Some(Ctx::CellFormula)
                        | Some(Ctx::ValidationFormula(_))
                        | Some(Ctx::CfFormula)
                ) {
                    text.push_str(&t.unescape().map_err(|e| crate::Error::malformed(part, e))?);
                }
            }
            Event::End(_) => {
                handle_end(
                    part, &mut stack, &mut ws, &mut row, &mut cell, &cell_type, &text,
                    &mut validation, &mut cf_range, &mut cf_rules, &mut rule, &mut filter_col,
                )?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ws)
}

fn start_context(stack: &[Ctx], e: &BytesStart) -> Ctx {
    let parent = stack.last().copied();
    match e.local_name().as_ref() {
        b"sheetData" => Ctx::SheetData,
        b"row" if parent == Some(Ctx::SheetData) => Ctx::Row,
        b"c" if parent == Some(Ctx::Row) => Ctx::Cell,
        b"v" if parent == Some(Ctx::Cell) => Ctx::CellValue,
        b"f" if parent == Some(Ctx::Cell) => Ctx::CellFormula,
        b"cols" => Ctx::Cols,
        b"mergeCells" => Ctx::MergeCells,
        b"dataValidations" => Ctx::DataValidations,
        b"dataValidation" if parent == Some(Ctx::DataValidations) => Ctx::DataValidation,
        b"formula1" if parent == Some(Ctx::DataValidation) => Ctx::ValidationFormula(1),
        b"formula2" if parent == Some(Ctx::DataValidation) => Ctx::ValidationFormula(2),
        b"hyperlinks" => Ctx::Hyperlinks,
        b"conditionalFormatting" => Ctx::ConditionalFormatting,
        b"cfRule" if parent == Some(Ctx::ConditionalFormatting) => Ctx::CfRule,
        b"formula" if parent == Some(Ctx::CfRule) => Ctx::CfFormula,
        b"dataBar" if parent == Some(Ctx::CfRule) => Ctx::DataBar,
        b"colorScale" if parent == Some(Ctx::CfRule) => Ctx::ColorScale,
        b"iconSet" if parent == Some(Ctx::CfRule) => Ctx::IconSet,
        b"autoFilter" => Ctx::AutoFilter,
        b"filterColumn" if parent == Some(Ctx::AutoFilter) => Ctx::FilterColumn,
        _ => Ctx::Other,
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_start(
    part: &str,
    e: &BytesStart,
    ctx: Ctx,
    ws: &mut WorksheetData,
    row: &mut RawRow,
    next_row_index: &mut u32,
    cell: &mut Option<RawCell>,
    cell_type: &mut String,
    text: &mut String,
    validation: &mut Option<DataValidation>,
    cf_range: &mut String,
    cf_rules: &mut Vec<CfRule>,
    rule: &mut PendingRule,
    filter_col: &mut Option<FilterColumn>,
) -> Result<()> {
    match ctx {
        Ctx::Row => {
            let index = match sax::attr(part, e, "r")? {
                Some(v) => sax::parse_num("r", &v)?,
                None => *next_row_index,
            };
            *next_row_index = index + 1;
            *row = RawRow {
                index,
                cells: vec![],
                height: match sax::attr(part, e, "ht")? {
                    Some(v) => Some(sax::parse_num("ht", &v)?),
                    None => None,
                },
                custom_height: bool_attr(part, e, "customHeight")?,
                hidden: bool_attr(part, e, "hidden")?,
            };
        }
        Ctx::Cell => {
            // An invalid reference is fatal.
            let reference = CellRef::parse(&sax::require_attr(part, e, "r")?)?;
            *cell_type = sax::attr(part, e, "t")?.unwrap_or_else(|| "n".to_string());
            *cell = Some(RawCell {
                reference,
                value: RawCellValue::Empty,
                style: match sax::attr(part, e, "s")? {
                    Some(v) => Some(sax::parse_num("s", &v)?),
                    None => None,
                },
                formula: None,
            });
        }
        Ctx::CellValue | Ctx::CellFormula | Ctx::ValidationFormula(_) | Ctx::CfFormula => {
            text.clear();
        }
        Ctx::DataValidation => {
            *validation = Some(DataValidation {
                kind: ValidationKind::from_str(
                    sax::attr(part, e, "type")?.as_deref().unwrap_or("custom"),
                ),
                allow_blank: bool_attr(part, e, "allowBlank")?,
                sqref: sax::require_attr(part, e, "sqref")?,
                operator: sax::attr(part, e, "operator")?,
                formula1: None,
                formula2: None,
            });
        }
        Ctx::ConditionalFormatting => {
            *cf_range = sax::require_attr(part, e, "sqref")?;
            cf_rules.clear();
        }
        Ctx::CfRule => {
            *rule = PendingRule {
                rule_type: sax::attr(part, e, "type")?.unwrap_or_default(),
                operator: sax::attr(part, e, "operator")?,
                priority: match sax::attr(part, e, "priority")? {
                    Some(v) => Some(sax::parse_num("priority", &v)?),
                    None => None,
                },
                dxf_id: match sax::attr(part, e, "dxfId")? {
                    Some(v) => Some(sax::parse_num("dxfId", &v)?),
                    None => None,
                },
                stop_if_true: bool_attr(part, e, "stopIfTrue")?,
                show_value: true,
                ..PendingRule::default()
            };
        }
        Ctx::DataBar | Ctx::ColorScale | Ctx::IconSet => {
            if ctx == Ctx::IconSet {
                rule.icon_set = sax::attr(part, e, "iconSet")?
                    .unwrap_or_else(|| "3TrafficLights1".to_string());
                rule.percent = bool_attr(part, e, "percent")?;
                rule.reverse = bool_attr(part, e, "reverse")?;
            }
            if let Some(v) = sax::attr(part, e, "showValue")? {
                rule.show_value = sax::parse_bool(&v);
            }
        }
        Ctx::AutoFilter => {
            ws.auto_filter = Some(AutoFilter {
                range: sax::attr(part, e, "ref")?.unwrap_or_default(),
                columns: vec![],
            });
        }
        Ctx::FilterColumn => {
            *filter_col = Some(FilterColumn {
                col_id: sax::parse_num("colId", &sax::require_attr(part, e, "colId")?)?,
                values: vec![],
            });
        }
        Ctx::Other => handle_leaf(part, e, ws, rule, filter_col)?,
        _ => {}
    }
    Ok(())
}

/// Leaf elements that carry all their data in attributes.
fn handle_leaf(
    part: &str,
    e: &BytesStart,
    ws: &mut WorksheetData,
    rule: &mut PendingRule,
    filter_col: &mut Option<FilterColumn>,
) -> Result<()> {
    match e.local_name().as_ref() {
        b"dimension" => ws.dimension = sax::attr(part, e, "ref")?,
        b"col" => {
            ws.columns.push(RawColumn {
                min: sax::parse_num("min", &sax::require_attr(part, e, "min")?)?,
                max: sax::parse_num("max", &sax::require_attr(part, e, "max")?)?,
                width: match sax::attr(part, e, "width")? {
                    Some(v) => Some(sax::parse_num("width", &v)?),
                    None => None,
                },
                custom_width: bool_attr(part, e, "customWidth")?,
                hidden: bool_attr(part, e, "hidden")?,
                style: match sax::attr(part, e, "style")? {
                    Some(v) => Some(sax::parse_num("style", &v)?),
                    None => None,
                },
            });
        }
        b"mergeCell" => {
            let range = sax::require_attr(part, e, "ref")?;
            ws.merged_ranges.push(CellRange::parse(&range)?);
        }
        b"hyperlink" => {
            ws.hyperlinks.push(Hyperlink {
                reference: sax::require_attr(part, e, "ref")?,
                rel_id: sax::attr_local(part, e, "id")?,
                display: sax::attr(part, e, "display")?,
                tooltip: sax::attr(part, e, "tooltip")?,
                location: sax::attr(part, e, "location")?,
            });
        }
        b"sheetProtection" => {
            let allowed = |name: &str| -> Result<bool> {
                Ok(sax::attr(part, e, name)?
                    .map(|v| sax::parse_bool(&v))
                    .unwrap_or(true))
            };
            ws.protection = Some(SheetProtection {
                password_hash: sax::attr(part, e, "password")?,
                select_locked_cells: allowed("selectLockedCells")?,
                select_unlocked_cells: allowed("selectUnlockedCells")?,
                format_cells: allowed("formatCells")?,
                format_columns: allowed("formatColumns")?,
                format_rows: allowed("formatRows")?,
                insert_columns: allowed("insertColumns")?,
                insert_rows: allowed("insertRows")?,
                insert_hyperlinks: allowed("insertHyperlinks")?,
                delete_columns: allowed("deleteColumns")?,
                delete_rows: allowed("deleteRows")?,
                sort: allowed("sort")?,
                auto_filter: allowed("autoFilter")?,
                pivot_tables: allowed("pivotTables")?,
            });
        }
        b"pageSetup" => {
            ws.page_setup = Some(PageSetup {
                paper_size: PaperSize::from_code(match sax::attr(part, e, "paperSize")? {
                    Some(v) => sax::parse_num("paperSize", &v)?,
                    None => 1,
                }),
                orientation: match sax::attr(part, e, "orientation")?.as_deref() {
                    Some("landscape") => Orientation::Landscape,
                    _ => Orientation::Portrait,
                },
                scale: match sax::attr(part, e, "scale")? {
                    Some(v) => Some(sax::parse_num("scale", &v)?),
                    None => None,
                },
                fit_to_width: match sax::attr(part, e, "fitToWidth")? {
                    Some(v) => Some(sax::parse_num("fitToWidth", &v)?),
                    None => None,
                },
                fit_to_height: match sax::attr(part, e, "fitToHeight")? {
                    Some(v) => Some(sax::parse_num("fitToHeight", &v)?),
                    None => None,
                },
            });
        }
        b"pageMargins" => {
            let margin = |name: &str| -> Result<f64> {
                match sax::attr(part, e, name)? {
                    Some(v) => sax::parse_num(name, &v),
                    None => Ok(0.0),
                }
            };
            ws.margins = Some(Margins {
                left: margin("left")?,
                right: margin("right")?,
                top: margin("top")?,
                bottom: margin("bottom")?,
                header: margin("header")?,
                footer: margin("footer")?,
            });
        }
        b"legacyDrawing" => ws.legacy_drawing_rel_id = sax::attr_local(part, e, "id")?,
        b"tablePart" => {
            if let Some(id) = sax::attr_local(part, e, "id")? {
                ws.table_rel_ids.push(id);
            }
        }
        b"cfvo" => {
            rule.cfvos.push(Cfvo {
                kind: CfvoKind::from_str(sax::attr(part, e, "type")?.as_deref().unwrap_or("num")),
                value: sax::attr(part, e, "val")?,
            });
        }
        b"color" => {
            if let Some(rgb) = sax::attr(part, e, "rgb")? {
                rule.colors.push(rgb);
            }
        }
        b"filter" => {
            if let Some(fc) = filter_col.as_mut() {
                if let Some(val) = sax::attr(part, e, "val")? {
                    fc.values.push(val);
                }
            }
        }
        _ => {}
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_end(
    part: &str,
    stack: &mut Vec<Ctx>,
    ws: &mut WorksheetData,
    row: &mut RawRow,
    cell: &mut Option<RawCell>,
    cell_type: &str,
    text: &str,
    validation: &mut Option<DataValidation>,
    cf_range: &mut String,
    cf_rules: &mut Vec<CfRule>,
    rule: &mut PendingRule,
    filter_col: &mut Option<FilterColumn>,
) -> Result<()> {
    match stack.pop() {
        Some(Ctx::Row) => ws.rows.push(std::mem::take(row)),
        Some(Ctx::Cell) => {
            if let Some(c) = cell.take() {
                row.cells.push(c);
            }
        }
        Some(Ctx::CellValue) => {
            if let Some(c) = cell.as_mut() {
                c.value = decode_cell_value(part, cell_type, text)?;
            }
        }
        Some(Ctx::CellFormula) => {
            if let Some(c) = cell.as_mut() {
                c.formula = Some(text.to_string());
            }
        }
        Some(Ctx::ValidationFormula(which)) => {
            if let Some(v) = validation.as_mut() {
                if which == 1 {
                    v.formula1 = Some(text.to_string());
                } else {
                    v.formula2 = Some(text.to_string());
                }
            }
        }
        Some(Ctx::DataValidation) => {
            if let Some(v) = validation.take() {
                ws.data_validations.push(v);
            }
        }
        Some(Ctx::CfFormula) => rule.formulas.push(text.to_string()),
        Some(Ctx::CfRule) => cf_rules.push(finish_rule(std::mem::take(rule))),
        Some(Ctx::ConditionalFormatting) => {
            ws.conditional_formats.push(ConditionalFormat {
                range: std::mem::take(cf_range),
                rules: std::mem::take(cf_rules),
            });
        }
        Some(Ctx::FilterColumn) => {
            if let (Some(fc), Some(af)) = (filter_col.take(), ws.auto_filter.as_mut()) {
                af.columns.push(fc);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Select the raw value variant from the `t` attribute (spec default `n`).
fn decode_cell_value(part: &str, cell_type: &str, text: &str) -> Result<RawCellValue> {
    let value = match cell_type {
        "s" => RawCellValue::SharedString(sax::parse_num("v", text)?),
        "b" => RawCellValue::Bool(text == "1"),
        "str" => RawCellValue::InlineString(text.to_string()),
        "e" => RawCellValue::Error(text.to_string()),
        "d" => RawCellValue::DateIso(text.to_string()),
        "n" | "" => {
            if text.is_empty() {
                RawCellValue::Empty
            } else {
                RawCellValue::Number(sax::parse_num("v", text)?)
            }
        }
        _ => RawCellValue::Empty,
    };
    let _ = part;
    Ok(value)
}

fn finish_rule(p: PendingRule) -> CfRule {
    let mut cfvos = p.cfvos;
    let kind = match p.rule_type.as_str() {
        "cellIs" => CfRuleKind::CellIs {
            operator: p.operator.unwrap_or_default(),
            formulas: p.formulas,
        },
        "expression" => CfRuleKind::Expression {
            formula: p.formulas.into_iter().next().unwrap_or_default(),
        },
        "dataBar" => {
            let mut drain = cfvos.drain(..);
            CfRuleKind::DataBar {
                min: drain.next().unwrap_or(Cfvo {
                    kind: CfvoKind::Min,
                    value: None,
                }),
                max: drain.next().unwrap_or(Cfvo {
                    kind: CfvoKind::Max,
                    value: None,
                }),
                color: p.colors.into_iter().next().unwrap_or_default(),
                show_value: p.show_value,
            }
        }
        "colorScale" => CfRuleKind::ColorScale {
            values: cfvos,
            colors: p.colors,
        },
        "iconSet" => CfRuleKind::IconSet {
            icon_set: p.icon_set,
            values: cfvos,
            show_value: p.show_value,
            reverse: p.reverse,
            percent: p.percent,
        },
        other => CfRuleKind::Unknown(other.to_string()),
    };
    CfRule {
        kind,
        priority: p.priority,
        dxf_id: p.dxf_id,
        stop_if_true: p.stop_if_true,
    }
}

fn bool_attr(part: &str, e: &BytesStart, name: &str) -> Result<bool> {
    Ok(sax::attr(part, e, name)?
        .map(|v| sax::parse_bool(&v))
        .unwrap_or(false))
}

// -------------------------------------------------------------------------
// Builder
// -------------------------------------------------------------------------

/// Serialize a worksheet part.
pub fn write_worksheet(ws: &WorksheetData) -> Result<Vec<u8>> {
    let mut em = Emitter::new()?;
    em.start(sax::element(
        "worksheet",
        &[("xmlns", SPREADSHEET_ML), ("xmlns:r", RELATIONSHIPS)],
    ))?;

    if let Some(dim) = &ws.dimension {
        em.empty(sax::element("dimension", &[("ref", dim)]))?;
    }

    if !ws.columns.is_empty() {
        em.start(sax::element("cols", &[]))?;
        for col in &ws.columns {
            let mut attrs: Vec<(&str, String)> = vec![
                ("min", col.min.to_string()),
                ("max", col.max.to_string()),
            ];
            if let Some(w) = col.width {
                attrs.push(("width", w.to_string()));
            }
            if col.custom_width {
                attrs.push(("customWidth", "1".to_string()));
            }
            if col.hidden {
                attrs.push(("hidden", "1".to_string()));
            }
            if let Some(s) = col.style {
                attrs.push(("style", s.to_string()));
            }
            em.empty(owned_element("col", &attrs))?;
        }
        em.end("cols")?;
    }

    em.start(sax::element("sheetData", &[]))?;
    for row in &ws.rows {
        write_row(&mut em, row)?;
    }
    em.end("sheetData")?;

    if let Some(p) = &ws.protection {
        write_protection(&mut em, p)?;
    }

    if let Some(af) = &ws.auto_filter {
        if af.columns.is_empty() {
            em.empty(sax::element("autoFilter", &[("ref", &af.range)]))?;
        } else {
            em.start(sax::element("autoFilter", &[("ref", &af.range)]))?;
            for fc in &af.columns {
                em.start(owned_element(
                    "filterColumn",
                    &[("colId", fc.col_id.to_string())],
                ))?;
                em.start(sax::element("filters", &[]))?;
                for v in &fc.values {
                    em.empty(sax::element("filter", &[("val", v)]))?;
                }
                em.end("filters")?;
                em.end("filterColumn")?;
            }
            em.end("autoFilter")?;
        }
    }

    if !ws.merged_ranges.is_empty() {
        em.start(sax::element(
            "mergeCells",
            &[("count", &ws.merged_ranges.len().to_string())],
        ))?;
        for range in &ws.merged_ranges {
            em.empty(sax::element("mergeCell", &[("ref", &range.to_string())]))?;
        }
        em.end("mergeCells")?;
    }

    for cf in &ws.conditional_formats {
        write_conditional_format(&mut em, cf)?;
    }

    if !ws.data_validations.is_empty() {
        em.start(sax::element(
            "dataValidations",
            &[("count", &ws.data_validations.len().to_string())],
        ))?;
        for dv in &ws.data_validations {
            write_validation(&mut em, dv)?;
        }
        em.end("dataValidations")?;
    }

    if !ws.hyperlinks.is_empty() {
        em.start(sax::element("hyperlinks", &[]))?;
        for link in &ws.hyperlinks {
            let mut attrs: Vec<(&str, String)> = vec![("ref", link.reference.clone())];
            if let Some(id) = &link.rel_id {
                attrs.push(("r:id", id.clone()));
            }
            if let Some(location) = &link.location {
                attrs.push(("location", location.clone()));
            }
            if let Some(display) = &link.display {
                attrs.push(("display", display.clone()));
            }
            if let Some(tooltip) = &link.tooltip {
                attrs.push(("tooltip", tooltip.clone()));
            }
            em.empty(owned_element("hyperlink", &attrs))?;
        }
        em.end("hyperlinks")?;
    }

    if let Some(m) = &ws.margins {
        em.empty(owned_element(
            "pageMargins",
            &[
                ("left", m.left.to_string()),
                ("right", m.right.to_string()),
                ("top", m.top.to_string()),
                ("bottom", m.bottom.to_string()),
                ("header", m.header.to_string()),
                ("footer", m.footer.to_string()),
            ],
        ))?;
    }

    if let Some(ps) = &ws.page_setup {
        let mut attrs: Vec<(&str, String)> = vec![
            ("paperSize", ps.paper_size.code().to_string()),
            (
                "orientation",
                match ps.orientation {
                    Orientation::Portrait => "portrait".to_string(),
                    Orientation::Landscape => "landscape".to_string(),
                },
            ),
        ];
        if let Some(scale) = ps.scale {
            attrs.push(("scale", scale.to_string()));
        }
        if let Some(w) = ps.fit_to_width {
            attrs.push(("fitToWidth", w.to_string()));
        }
        if let Some(h) = ps.fit_to_height {
            attrs.push(("fitToHeight", h.to_string()));
        }
        em.empty(owned_element("pageSetup", &attrs))?;
    }

    if let Some(id) = &ws.legacy_drawing_rel_id {
        em.empty(sax::element("legacyDrawing", &[("r:id", id)]))?;
    }

    if !ws.table_rel_ids.is_empty() {
        em.start(sax::element(
            "tableParts",
            &[("count", &ws.table_rel_ids.len().to_string())],
        ))?;
        for id in &ws.table_rel_ids {
            em.empty(sax::element("tablePart", &[("r:id", id)]))?;
        }
        em.end("tableParts")?;
    }

    em.end("worksheet")?;
    Ok(em.into_bytes())
}

fn owned_element<'a>(name: &'a str, attrs: &[(&str, String)]) -> BytesStart<'a> {
    let mut el = BytesStart::new(name);
    for (k, v) in attrs {
        el.push_attribute((*k, v.as_str()));
    }
    el
}

fn write_row(em: &mut Emitter, row: &RawRow) -> Result<()> {
    let mut attrs: Vec<(&str, String)> = vec![("r", row.index.to_string())];
    if let Some(h) = row.height {
        attrs.push(("ht", h.to_string()));
    }
    if row.custom_height {
        attrs.push(("customHeight", "1".to_string()));
    }
    if row.hidden {
        attrs.push(("hidden", "1".to_string()));
    }
    em.start(owned_element("row", &attrs))?;
    for cell in &row.cells {
        write_cell(em, cell)?;
    }
    em.end("row")
}

fn write_cell(em: &mut Emitter, cell: &RawCell) -> Result<()> {
    let reference = cell.reference.to_string();
    let mut attrs: Vec<(&str, String)> = vec![("r", reference)];
    if let Some(s) = cell.style {
        attrs.push(("s", s.to_string()));
    }
    let (type_attr, payload): (Option<&str>, Option<String>) = match &cell.value {
        RawCellValue::SharedString(idx) => (Some("s"), Some(idx.to_string())),
        RawCellValue::InlineString(s) => (Some("str"), Some(s.clone())),
        RawCellValue::Number(n) => (None, Some(n.to_string())),
        RawCellValue::Bool(b) => (Some("b"), Some(if *b { "1" } else { "0" }.to_string())),
        RawCellValue::Error(e) => (Some("e"), Some(e.clone())),
        RawCellValue::DateIso(d) => (Some("d"), Some(d.clone())),
        RawCellValue::Empty => (None, None),
    };
    if let Some(t) = type_attr {
        attrs.push(("t", t.to_string()));
    }

    if cell.formula.is_none() && payload.is_none() {
        return em.empty(owned_element("c", &attrs));
    }

    em.start(owned_element("c", &attrs))?;
    if let Some(f) = &cell.formula {
        em.leaf("f", f)?;
    }
    if let Some(v) = &payload {
        em.leaf("v", v)?;
    }
    em.end("c")
}

fn write_protection(em: &mut Emitter, p: &SheetProtection) -> Result<()> {
    let mut attrs: Vec<(&str, String)> = vec![("sheet", "1".to_string())];
    if let Some(hash) = &p.password_hash {
        attrs.push(("password", hash.clone()));
    }
    let denied: &[(&str, bool)] = &[
        ("selectLockedCells", p.select_locked_cells),
        ("selectUnlockedCells", p.select_unlocked_cells),
        ("formatCells", p.format_cells),
        ("formatColumns", p.format_columns),
        ("formatRows", p.format_rows),
        ("insertColumns", p.insert_columns),
        ("insertRows", p.insert_rows),
        ("insertHyperlinks", p.insert_hyperlinks),
        ("deleteColumns", p.delete_columns),
        ("deleteRows", p.delete_rows),
        ("sort", p.sort),
        ("autoFilter", p.auto_filter),
        ("pivotTables", p.pivot_tables),
    ];
    for (name, allowed) in denied {
        if !*allowed {
            attrs.push((name, "0".to_string()));
        }
    }
    em.empty(owned_element("sheetProtection", &attrs))
}

fn write_validation(em: &mut Emitter, dv: &DataValidation) -> Result<()> {
    let mut attrs: Vec<(&str, String)> = vec![
        ("type", dv.kind.as_str().to_string()),
        ("sqref", dv.sqref.clone()),
    ];
    if let Some(op) = &dv.operator {
        attrs.push(("operator", op.clone()));
    }
    if dv.allow_blank {
        attrs.push(("allowBlank", "1".to_string()));
    }
    if dv.formula1.is_none() && dv.formula2.is_none() {
        return em.empty(owned_element("dataValidation", &attrs));
    }
    em.start(owned_element("dataValidation", &attrs))?;
    if let Some(f1) = &dv.formula1 {
        em.leaf("formula1", f1)?;
    }
    if let Some(f2) = &dv.formula2 {
        em.leaf("formula2", f2)?;
    }
    em.end("dataValidation")
}

fn write_conditional_format(em: &mut Emitter, cf: &ConditionalFormat) -> Result<()> {
    em.start(sax::element("conditionalFormatting", &[("sqref", &cf.range)]))?;
    for rule in &cf.rules {
        write_cf_rule(em, rule)?;
    }
    em.end("conditionalFormatting")
}

fn rule_type_name(kind: &CfRuleKind) -> &str {
    match kind {
        CfRuleKind::CellIs { .. } => "cellIs",
        CfRuleKind::Expression { .. } => "expression",
        CfRuleKind::DataBar { .. } => "dataBar",
        CfRuleKind::ColorScale { .. } => "colorScale",
        CfRuleKind::IconSet { .. } => "iconSet",
        CfRuleKind::Unknown(t) => t,
    }
}

fn write_cf_rule(em: &mut Emitter, rule: &CfRule) -> Result<()> {
    let mut attrs: Vec<(&str, String)> = vec![("type", rule_type_name(&rule.kind).to_string())];
    if let CfRuleKind::CellIs { operator, .. } = &rule.kind {
        attrs.push(("operator", operator.clone()));
    }
    if let Some(p) = rule.priority {
        attrs.push(("priority", p.to_string()));
    }
    if let Some(d) = rule.dxf_id {
        attrs.push(("dxfId", d.to_string()));
    }
    if rule.stop_if_true {
        attrs.push(("stopIfTrue", "1".to_string()));
    }

    em.start(owned_element("cfRule", &attrs))?;
    match &rule.kind {
        CfRuleKind::CellIs { formulas, .. } => {
            for f in formulas {
                em.leaf("formula", f)?;
            }
        }
        CfRuleKind::Expression { formula } => em.leaf("formula", formula)?,
        CfRuleKind::DataBar {
            min,
            max,
            color,
            show_value,
        } => {
            let el = if *show_value {
                sax::element("dataBar", &[])
            } else {
                sax::element("dataBar", &[("showValue", "0")])
            };
            em.start(el)?;
            write_cfvo(em, min)?;
            write_cfvo(em, max)?;
            em.empty(sax::element("color", &[("rgb", color)]))?;
            em.end("dataBar")?;
        }
        CfRuleKind::ColorScale { values, colors } => {
            em.start(sax::element("colorScale", &[]))?;
            for v in values {
                write_cfvo(em, v)?;
            }
            for c in colors {
                em.empty(sax::element("color", &[("rgb", c)]))?;
            }
            em.end("colorScale")?;
        }
        CfRuleKind::IconSet {
            icon_set,
            values,
            show_value,
            reverse,
            percent,
        } => {
            let mut attrs: Vec<(&str, String)> = vec![("iconSet", icon_set.clone())];
            if !*show_value {
                attrs.push(("showValue", "0".to_string()));
            }
            if *percent {
                attrs.push(("percent", "1".to_string()));
            }
            if *reverse {
                attrs.push(("reverse", "1".to_string()));
            }
            em.start(owned_element("iconSet", &attrs))?;
            for v in values {
                write_cfvo(em, v)?;
            }
            em.end("iconSet")?;
        }
        CfRuleKind::Unknown(_) => {}
    }
    em.end("cfRule")
}

fn write_cfvo(em: &mut Emitter, cfvo: &Cfvo) -> Result<()> {
    match &cfvo.value {
        Some(v) => em.empty(sax::element("cfvo", &[("type", cfvo.kind.as_str()), ("val", v)])),
        None => em.empty(sax::element("cfvo", &[("type", cfvo.kind.as_str())])),
    }
}

// =========================================================================
// Tests
// =========================================================================
