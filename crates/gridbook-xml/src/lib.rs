//! gridbook-xml: SAX-style parsing and streaming serialization for the
//! SpreadsheetML parts of an OOXML package.
//!
//! Every parser in this crate is a forward-only `quick_xml::Reader` event
//! loop with an explicit element stack; every builder streams through a
//! `quick_xml::Writer`. No part is ever materialized as a DOM.
//!
//! # Modules
//!
//! - [`namespaces`] - OOXML namespace, relationship-type, and content-type URIs
//! - [`cell_ref`] - A1-style cell references and ranges
//! - [`content_types`] - `[Content_Types].xml`
//! - [`relationships`] - relationship (`.rels`) parts
//! - [`workbook`] - `xl/workbook.xml`
//! - [`worksheet`] - `xl/worksheets/sheet*.xml`
//! - [`styles`] - `xl/styles.xml`
//! - [`shared_strings`] - `xl/sharedStrings.xml`
//! - [`comments`] - `xl/comments*.xml`
//! - [`vml`] - legacy VML drawings anchoring comments
//! - [`table`] - `xl/tables/table*.xml`
//! - [`chart`] - chart metadata descriptors
//! - [`pivot_table`] - pivot-table metadata descriptors

use thiserror::Error;

pub mod cell_ref;
pub mod chart;
pub mod comments;
pub mod content_types;
pub mod namespaces;
pub mod pivot_table;
pub mod relationships;
pub mod shared_strings;
pub mod styles;
pub mod table;
pub mod vml;
pub mod workbook;
pub mod worksheet;

pub(crate) mod sax;

/// Errors raised while parsing or serializing an individual XML part.
#[derive(Error, Debug)]
pub enum Error {
    /// The XML stream itself could not be decoded.
    #[error("malformed XML in '{part}': {detail}")]
    MalformedXml { part: String, detail: String },

    /// A required element was absent from the part.
    #[error("missing required element '{element}' in '{part}'")]
    MissingRequiredElement { part: String, element: String },

    /// A required attribute was absent from an element.
    #[error("missing required attribute '{attribute}' on <{element}>")]
    MissingRequiredAttribute { element: String, attribute: String },

    /// An attribute carried a value outside its domain.
    #[error("invalid value '{value}' for attribute '{attribute}'")]
    InvalidAttributeValue { attribute: String, value: String },

    /// The given string is not a valid A1-style cell reference.
    #[error("invalid cell reference: {0}")]
    InvalidCellReference(String),

    /// The row number is out of the allowed range (1..=1_048_576).
    #[error("invalid row number: {0}")]
    InvalidRowNumber(u32),

    /// The column number is out of the allowed range (1..=16_384).
    #[error("invalid column number: {0}")]
    InvalidColumnNumber(u32),

    /// An error while emitting XML.
    #[error("XML write error: {0}")]
    Write(String),
}

/// A convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap a reader-level failure with the part path it occurred in.
    pub(crate) fn malformed(part: &str, detail: impl std::fmt::Display) -> Self {
        Error::MalformedXml {
            part: part.to_string(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn missing_element(part: &str, element: &str) -> Self {
        Error::MissingRequiredElement {
            part: part.to_string(),
            element: element.to_string(),
        }
    }

    pub(crate) fn missing_attribute(element: &str, attribute: &str) -> Self {
        Error::MissingRequiredAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        }
    }
}
