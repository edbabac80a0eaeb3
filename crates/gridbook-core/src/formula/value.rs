//! The formula value sum type and its coercions.

use std::fmt;

use crate::error::{FormulaError, FormulaResult};

/// Spreadsheet error codes carried by error values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Value,
    Div0,
    Ref,
    Na,
    Name,
    Num,
    Null,
}

impl ErrorCode {
    /// The canonical display form (`#VALUE!`, `#DIV/0!`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Value => "#VALUE!",
            ErrorCode::Div0 => "#DIV/0!",
            ErrorCode::Ref => "#REF!",
            ErrorCode::Na => "#N/A",
            ErrorCode::Name => "#NAME?",
            ErrorCode::Num => "#NUM!",
            ErrorCode::Null => "#NULL!",
        }
    }

    /// Parse a literal error code as it appears in formulas and cells.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "#VALUE!" => Some(ErrorCode::Value),
            "#DIV/0!" => Some(ErrorCode::Div0),
            "#REF!" => Some(ErrorCode::Ref),
            "#N/A" => Some(ErrorCode::Na),
            "#NAME?" => Some(ErrorCode::Name),
            "#NUM!" => Some(ErrorCode::Num),
            "#NULL!" => Some(ErrorCode::Null),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A value produced by formula evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Error(ErrorCode),
    /// A rectangular two-dimensional array, row-major.
    Array(Vec<Vec<FormulaValue>>),
    /// An empty cell.
    Empty,
}

impl FormulaValue {
    /// Numeric coercion: numbers pass through, booleans become 0/1, strings
    /// parse. Everything else (including empty) fails.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FormulaValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean coercion: booleans pass through, numbers test non-zero,
    /// `"TRUE"`/`"FALSE"` strings are recognized case-insensitively.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FormulaValue::Bool(b) => Some(*b),
            FormulaValue::Number(n) => Some(*n != 0.0),
            FormulaValue::Text(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// String coercion; never fails.
    pub fn as_string(&self) -> String {
        match self {
            FormulaValue::Text(s) => s.clone(),
            FormulaValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            FormulaValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            FormulaValue::Error(code) => code.to_string(),
            FormulaValue::Array(_) => "#ARRAY!".to_string(),
            FormulaValue::Empty => String::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FormulaValue::Empty)
    }

    /// Lift an error value into the typed error domain. Useful for callers
    /// that want `Result`-shaped evaluation.
    pub fn into_result(self) -> FormulaResult<FormulaValue> {
        match self {
            FormulaValue::Error(ErrorCode::Div0) => Err(FormulaError::DivisionByZero),
            FormulaValue::Error(ErrorCode::Name) => {
                Err(FormulaError::NameNotFound("#NAME?".to_string()))
            }
            FormulaValue::Error(code) => {
                Err(FormulaError::EvaluationError(code.to_string()))
            }
            other => Ok(other),
        }
    }
}

/// Ordering used by comparison operators and lookup functions.
///
/// Numbers compare numerically, strings case-insensitively; mixed types
/// rank empty < number < text < bool < error.
pub fn compare(lhs: &FormulaValue, rhs: &FormulaValue) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    fn type_rank(v: &FormulaValue) -> u8 {
        match v {
            FormulaValue::Empty => 0,
            FormulaValue::Number(_) => 1,
            FormulaValue::Text(_) => 2,
            FormulaValue::Bool(_) => 3,
            FormulaValue::Error(_) => 4,
            FormulaValue::Array(_) => 5,
        }
    }

    let (lr, rr) = (type_rank(lhs), type_rank(rhs));
    if lr != rr {
        return lr.cmp(&rr);
    }

    match (lhs, rhs) {
        (FormulaValue::Number(a), FormulaValue::Number(b)) => {
            a.partial_cmp(b).unwrap_or(Ordering::Equal)
        }
        (FormulaValue::Text(a), FormulaValue::Text(b)) => {
            a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase())
        }
        (FormulaValue::Bool(a), FormulaValue::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// Value equality as lookup functions see it (same type, case-insensitive
/// strings).
pub fn values_equal(lhs: &FormulaValue, rhs: &FormulaValue) -> bool {
    compare(lhs, rhs) == std::cmp::Ordering::Equal
        && !matches!(lhs, FormulaValue::Array(_))
        && !matches!(rhs, FormulaValue::Array(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_roundtrip() {
        for code in [
            ErrorCode::Value,
            ErrorCode::Div0,
            ErrorCode::Ref,
            ErrorCode::Na,
            ErrorCode::Name,
            ErrorCode::Num,
            ErrorCode::Null,
        ] {
            assert_eq!(ErrorCode::parse(code.as_str()), Some(code));
        }
        assert_eq!(ErrorCode::parse("#BOGUS!"), None);
    }

    #[test]
    fn test_as_double() {
        assert_eq!(FormulaValue::Number(2.5).as_double(), Some(2.5));
        assert_eq!(FormulaValue::Bool(true).as_double(), Some(1.0));
        assert_eq!(FormulaValue::Bool(false).as_double(), Some(0.0));
        assert_eq!(FormulaValue::Text("3.5".to_string()).as_double(), Some(3.5));
        assert_eq!(FormulaValue::Text("abc".to_string()).as_double(), None);
        assert_eq!(FormulaValue::Empty.as_double(), None);
        assert_eq!(FormulaValue::Error(ErrorCode::Na).as_double(), None);
    }

    #[test]
    fn test_as_boolean() {
        assert_eq!(FormulaValue::Bool(true).as_boolean(), Some(true));
        assert_eq!(FormulaValue::Number(0.0).as_boolean(), Some(false));
        assert_eq!(FormulaValue::Number(-2.0).as_boolean(), Some(true));
        assert_eq!(
            FormulaValue::Text("true".to_string()).as_boolean(),
            Some(true)
        );
        assert_eq!(
            FormulaValue::Text("FALSE".to_string()).as_boolean(),
            Some(false)
        );
        assert_eq!(FormulaValue::Text("yes".to_string()).as_boolean(), None);
        assert_eq!(FormulaValue::Empty.as_boolean(), None);
    }

    #[test]
    fn test_as_string() {
        assert_eq!(FormulaValue::Number(42.0).as_string(), "42");
        assert_eq!(FormulaValue::Number(3.14).as_string(), "3.14");
        assert_eq!(FormulaValue::Bool(true).as_string(), "TRUE");
        assert_eq!(FormulaValue::Error(ErrorCode::Div0).as_string(), "#DIV/0!");
        assert_eq!(FormulaValue::Array(vec![]).as_string(), "#ARRAY!");
        assert_eq!(FormulaValue::Empty.as_string(), "");
    }

    #[test]
    fn test_compare_numbers_and_strings() {
        use std::cmp::Ordering;
        assert_eq!(
            compare(&FormulaValue::Number(1.0), &FormulaValue::Number(2.0)),
            Ordering::Less
        );
        assert_eq!(
            compare(
                &FormulaValue::Text("ABC".to_string()),
                &FormulaValue::Text("abc".to_string())
            ),
            Ordering::Equal
        );
        // Mixed types rank by kind: numbers sort before text.
        assert_eq!(
            compare(
                &FormulaValue::Number(99.0),
                &FormulaValue::Text("1".to_string())
            ),
            Ordering::Less
        );
    }

    #[test]
    fn test_values_equal() {
        assert!(values_equal(
            &FormulaValue::Text("Apple".to_string()),
            &FormulaValue::Text("APPLE".to_string())
        ));
        assert!(values_equal(
            &FormulaValue::Number(2.0),
            &FormulaValue::Number(2.0)
        ));
        assert!(!values_equal(
            &FormulaValue::Number(2.0),
            &FormulaValue::Text("2".to_string())
        ));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(
            FormulaValue::Number(1.0).into_result(),
            Ok(FormulaValue::Number(1.0))
        );
        assert_eq!(
            FormulaValue::Error(ErrorCode::Div0).into_result(),
            Err(FormulaError::DivisionByZero)
        );
        assert!(matches!(
            FormulaValue::Error(ErrorCode::Name).into_result(),
            Err(FormulaError::NameNotFound(_))
        ));
        assert!(matches!(
            FormulaValue::Error(ErrorCode::Ref).into_result(),
            Err(FormulaError::EvaluationError(_))
        ));
    }
}
