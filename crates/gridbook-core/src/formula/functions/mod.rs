//! Built-in function dispatch.
//!
//! [`lookup_function`] resolves a case-insensitive name to its
//! implementation; unknown names are the caller's business (the evaluator
//! turns them into `#NAME?`). Shared helpers for argument checking and
//! criteria matching live here.

pub mod date_time;
pub mod information;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod statistical;
pub mod text;

use regex::Regex;

use crate::error::{FormulaError, FormulaResult};
use crate::formula::eval::Evaluator;
use crate::formula::parser::Expr;
use crate::formula::value::FormulaValue;

/// Signature of a built-in implementation.
///
/// Functions receive unevaluated argument expressions so they can
/// short-circuit (IF, IFERROR) and expand ranges themselves (SUM).
pub type FunctionFn = fn(&[Expr], &mut Evaluator) -> FormulaResult<FormulaValue>;

/// Unwrap a coerced argument, returning the error code as a value.
macro_rules! try_val {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(code) => return Ok($crate::formula::value::FormulaValue::Error(code)),
        }
    };
}
pub(crate) use try_val;

/// Resolve a function name (case-insensitive) to its implementation.
pub fn lookup_function(name: &str) -> Option<FunctionFn> {
    match name.to_ascii_uppercase().as_str() {
        "SUM" => Some(math::fn_sum),
        "ABS" => Some(math::fn_abs),
        "INT" => Some(math::fn_int),
        "MOD" => Some(math::fn_mod),
        "ROUND" => Some(math::fn_round),
        "SQRT" => Some(math::fn_sqrt),
        "SUMIF" => Some(math::fn_sumif),
        "SUMIFS" => Some(math::fn_sumifs),
        "AVERAGE" => Some(statistical::fn_average),
        "MIN" => Some(statistical::fn_min),
        "MAX" => Some(statistical::fn_max),
        "MEDIAN" => Some(statistical::fn_median),
        "COUNT" => Some(statistical::fn_count),
        "COUNTA" => Some(statistical::fn_counta),
        "COUNTIF" => Some(statistical::fn_countif),
        "COUNTIFS" => Some(statistical::fn_countifs),
        "AVERAGEIF" => Some(statistical::fn_averageif),
        "IF" => Some(logical::fn_if),
        "IFERROR" => Some(logical::fn_iferror),
        "AND" => Some(logical::fn_and),
        "OR" => Some(logical::fn_or),
        "NOT" => Some(logical::fn_not),
        "LEN" => Some(text::fn_len),
        "UPPER" => Some(text::fn_upper),
        "LOWER" => Some(text::fn_lower),
        "CONCAT" => Some(text::fn_concat),
        "CONCATENATE" => Some(text::fn_concatenate),
        "LEFT" => Some(text::fn_left),
        "RIGHT" => Some(text::fn_right),
        "MID" => Some(text::fn_mid),
        "TRIM" => Some(text::fn_trim),
        "FIND" => Some(text::fn_find),
        "SEARCH" => Some(text::fn_search),
        "SUBSTITUTE" => Some(text::fn_substitute),
        "TEXT" => Some(text::fn_text),
        "VLOOKUP" => Some(lookup::fn_vlookup),
        "INDEX" => Some(lookup::fn_index),
        "MATCH" => Some(lookup::fn_match),
        "TODAY" => Some(date_time::fn_today),
        "NOW" => Some(date_time::fn_now),
        "DATE" => Some(date_time::fn_date),
        "YEAR" => Some(date_time::fn_year),
        "MONTH" => Some(date_time::fn_month),
        "DAY" => Some(date_time::fn_day),
        "ISBLANK" => Some(information::fn_isblank),
        "ISNUMBER" => Some(information::fn_isnumber),
        "ISTEXT" => Some(information::fn_istext),
        "ISERROR" => Some(information::fn_iserror),
        _ => None,
    }
}

/// Verify that `args` has between `min` and `max` entries (inclusive).
pub fn check_arg_count(name: &str, args: &[Expr], min: usize, max: usize) -> FormulaResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{min}")
        } else {
            format!("{min}..{max}")
        };
        return Err(FormulaError::InvalidArgumentCount {
            name: name.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

/// Whether a value matches a criteria value from the `*IF` family.
///
/// A leading `>=`, `<=`, `<>`, `>`, `<`, or `=` compares against the
/// remainder parsed as number or string; a pattern containing `*` or `?`
/// matches as a case-insensitive glob; otherwise equality (numeric when
/// both sides parse, else case-insensitive string).
pub fn matches_criteria(value: &FormulaValue, criteria: &FormulaValue) -> bool {
    let criteria_text = match criteria {
        FormulaValue::Text(s) => s.clone(),
        other => other.as_string(),
    };

    let (op, rest) = split_operator(&criteria_text);

    if let Some(op) = op {
        let value_num = value.as_double();
        let rest_num: Option<f64> = rest.trim().parse().ok();
        if let (Some(a), Some(b)) = (value_num, rest_num) {
            return compare_with(op, a.partial_cmp(&b));
        }
        let a = value.as_string().to_ascii_lowercase();
        let b = rest.to_ascii_lowercase();
        return compare_with(op, Some(a.cmp(&b)));
    }

    if rest.contains('*') || rest.contains('?') {
        return glob_match(rest, &value.as_string());
    }

    // Plain equality: numeric when both sides parse.
    if let (Some(a), Ok(b)) = (value.as_double(), rest.trim().parse::<f64>()) {
        return a == b;
    }
    value.as_string().eq_ignore_ascii_case(rest)
}

fn split_operator(criteria: &str) -> (Option<&'static str>, &str) {
    for op in [">=", "<=", "<>", ">", "<", "="] {
        if let Some(rest) = criteria.strip_prefix(op) {
            return (Some(op), rest);
        }
    }
    (None, criteria)
}

fn compare_with(op: &str, ord: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering;
    let Some(ord) = ord else { return false };
    match op {
        ">=" => ord != Ordering::Less,
        "<=" => ord != Ordering::Greater,
        "<>" => ord != Ordering::Equal,
        ">" => ord == Ordering::Greater,
        "<" => ord == Ordering::Less,
        "=" => ord == Ordering::Equal,
        _ => false,
    }
}

/// Case-insensitive glob match (`*` any run, `?` one character).
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let mut regex = String::with_capacity(pattern.len() * 2 + 8);
    regex.push_str("(?i)^");
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    Regex::new(&regex)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> FormulaValue {
        FormulaValue::Number(n)
    }

    fn text(s: &str) -> FormulaValue {
        FormulaValue::Text(s.to_string())
    }

    #[test]
    fn test_check_arg_count() {
        let args = vec![Expr::Number(1.0), Expr::Number(2.0)];
        assert!(check_arg_count("IF", &args, 2, 3).is_ok());
        let err = check_arg_count("NOT", &args, 1, 1).unwrap_err();
        assert_eq!(err.to_string(), "NOT expects 1 arguments, got 2");
    }

    #[test]
    fn test_criteria_operators() {
        assert!(matches_criteria(&num(3.0), &text(">=2")));
        assert!(matches_criteria(&num(2.0), &text(">=2")));
        assert!(!matches_criteria(&num(1.0), &text(">=2")));
        assert!(matches_criteria(&num(1.0), &text("<2")));
        assert!(matches_criteria(&num(1.0), &text("<>2")));
        assert!(matches_criteria(&num(2.0), &text("=2")));
    }

    #[test]
    fn test_criteria_string_comparison() {
        assert!(matches_criteria(&text("banana"), &text(">apple")));
        assert!(matches_criteria(&text("Apple"), &text("=apple")));
    }

    #[test]
    fn test_criteria_plain_equality() {
        assert!(matches_criteria(&num(2.0), &num(2.0)));
        assert!(matches_criteria(&text("2"), &text("2")));
        // Numeric equality when both sides parse.
        assert!(matches_criteria(&num(2.0), &text("2")));
        assert!(matches_criteria(&text("Hello"), &text("hello")));
        assert!(!matches_criteria(&text("Hello"), &text("world")));
    }

    #[test]
    fn test_criteria_wildcards_case_insensitive() {
        assert!(matches_criteria(&text("Berlin"), &text("*e*")));
        assert!(matches_criteria(&text("TEST"), &text("te?t")));
        assert!(!matches_criteria(&text("toast"), &text("te?t")));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        assert!(glob_match("a.b*", "a.bcd"));
        assert!(!glob_match("a.b", "axb"));
        assert!(glob_match("(x)?", "(x)y"));
    }

    #[test]
    fn test_lookup_function_case_insensitive() {
        assert!(lookup_function("sum").is_some());
        assert!(lookup_function("Sum").is_some());
        assert!(lookup_function("VLOOKUP").is_some());
        assert!(lookup_function("NOPE").is_none());
    }
}
