//! Error types for the gridbook core library.
//!
//! Package, content, and resolution failures surface as [`Error`];
//! the formula subsystem raises [`FormulaError`].

use thiserror::Error;

/// The top-level error type for reading and writing workbooks.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Package (structural) errors =====
    /// The byte buffer is not a readable ZIP archive.
    #[error("invalid ZIP archive: {0}")]
    InvalidZipArchive(String),

    /// A required part is absent from the package.
    #[error("missing part: {path}")]
    MissingPart { path: String },

    /// A part's declared content type does not match what was expected.
    #[error("invalid content type for '{path}': {content_type}")]
    InvalidContentType { path: String, content_type: String },

    /// The package violates OPC structure (manifest, root rels, ...).
    #[error("invalid package structure: {0}")]
    InvalidPackageStructure(String),

    /// The package is a ZIP but not a SpreadsheetML document.
    #[error("not an .xlsx file: {0}")]
    NotAnXlsxFile(String),

    // ===== File-system errors =====
    /// The file to open does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// The file exists but cannot be accessed.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Any other underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ===== Resolution errors =====
    /// A cell referenced a shared string beyond the table.
    #[error("shared string index {index} out of range (table has {len} entries)")]
    SharedStringIndexOutOfRange { index: usize, len: usize },

    /// A cell referenced a style beyond the cell-format table.
    #[error("style index {index} out of range (table has {len} formats)")]
    StyleIndexOutOfRange { index: usize, len: usize },

    /// No sheet with the given name exists in the workbook.
    #[error("sheet '{name}' does not exist")]
    SheetNotFound { name: String },

    /// A sheet with the given name already exists.
    #[error("sheet '{name}' already exists")]
    SheetAlreadyExists { name: String },

    // ===== Wrapped lower layers =====
    /// A schema-level parse or serialization error.
    #[error(transparent)]
    Xml(#[from] gridbook_xml::Error),

    /// A formula-subsystem error.
    #[error(transparent)]
    Formula(#[from] FormulaError),
}

/// Errors raised by the formula tokenizer, parser, and evaluator.
///
/// Data-level failures (a bad operand, division by zero) flow through
/// evaluation as error *values*; these variants cover structural misuse.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("empty formula")]
    EmptyFormula,

    #[error("unexpected end of formula")]
    UnexpectedEndOfFormula,

    #[error("unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("expected '('")]
    ExpectedLeftParen,

    #[error("expected ')'")]
    ExpectedRightParen,

    #[error("expected ',' or ')'")]
    ExpectedCommaOrRightParen,

    #[error("invalid cell reference: {0}")]
    InvalidCellReference(String),

    #[error("{name} expects {expected} arguments, got {got}")]
    InvalidArgumentCount {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("invalid argument type for {name}: {detail}")]
    InvalidArgumentType { name: String, detail: String },

    #[error("circular reference involving {cell}")]
    CircularReference { cell: String },

    #[error("name not found: {0}")]
    NameNotFound(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("evaluation error: {0}")]
    EvaluationError(String),
}

/// A convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Result alias for formula-subsystem entry points.
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_missing_part() {
        let err = Error::MissingPart {
            path: "/xl/styles.xml".to_string(),
        };
        assert_eq!(err.to_string(), "missing part: /xl/styles.xml");
    }

    #[test]
    fn test_error_display_shared_string_out_of_range() {
        let err = Error::SharedStringIndexOutOfRange { index: 9, len: 3 };
        assert_eq!(
            err.to_string(),
            "shared string index 9 out of range (table has 3 entries)"
        );
    }

    #[test]
    fn test_error_display_not_an_xlsx() {
        let err = Error::NotAnXlsxFile("no officeDocument relationship".to_string());
        assert!(err.to_string().starts_with("not an .xlsx file"));
    }

    #[test]
    fn test_formula_error_display() {
        let err = FormulaError::InvalidArgumentCount {
            name: "IF".to_string(),
            expected: "2..3".to_string(),
            got: 5,
        };
        assert_eq!(err.to_string(), "IF expects 2..3 arguments, got 5");

        let err = FormulaError::CircularReference {
            cell: "B2".to_string(),
        };
        assert_eq!(err.to_string(), "circular reference involving B2");
    }

    #[test]
    fn test_xml_error_wraps_transparently() {
        let xml_err = gridbook_xml::Error::InvalidCellReference("9Z".to_string());
        let err: Error = xml_err.into();
        assert_eq!(err.to_string(), "invalid cell reference: 9Z");
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
        assert_send::<FormulaError>();
    }
}
