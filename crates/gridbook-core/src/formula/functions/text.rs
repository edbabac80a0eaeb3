//! Text functions: LEN, UPPER, LOWER, CONCAT, CONCATENATE, LEFT, RIGHT,
//! MID, TRIM, FIND, SEARCH, SUBSTITUTE, TEXT.

use crate::error::FormulaResult;
use crate::formula::eval::Evaluator;
use crate::formula::functions::{check_arg_count, try_val};
use crate::formula::parser::Expr;
use crate::formula::serial;
use crate::formula::value::{ErrorCode, FormulaValue};

pub fn fn_len(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("LEN", args, 1, 1)?;
    let s = try_val!(ctx.string_arg(args, 0)?);
    Ok(FormulaValue::Number(s.chars().count() as f64))
}

pub fn fn_upper(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("UPPER", args, 1, 1)?;
    let s = try_val!(ctx.string_arg(args, 0)?);
    Ok(FormulaValue::Text(s.to_uppercase()))
}

pub fn fn_lower(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("LOWER", args, 1, 1)?;
    let s = try_val!(ctx.string_arg(args, 0)?);
    Ok(FormulaValue::Text(s.to_lowercase()))
}

/// CONCAT flattens ranges; every element is stringified.
pub fn fn_concat(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("CONCAT", args, 1, 255)?;
    let mut out = String::new();
    for value in ctx.flatten_args(args)? {
        if let FormulaValue::Error(code) = value {
            return Ok(FormulaValue::Error(code));
        }
        out.push_str(&value.as_string());
    }
    Ok(FormulaValue::Text(out))
}

/// CONCATENATE takes scalar arguments only.
pub fn fn_concatenate(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("CONCATENATE", args, 1, 255)?;
    let mut out = String::new();
    for i in 0..args.len() {
        out.push_str(&try_val!(ctx.string_arg(args, i)?));
    }
    Ok(FormulaValue::Text(out))
}

pub fn fn_left(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("LEFT", args, 1, 2)?;
    let s = try_val!(ctx.string_arg(args, 0)?);
    let n = if args.len() > 1 {
        try_val!(ctx.number_arg(args, 1)?) as usize
    } else {
        1
    };
    Ok(FormulaValue::Text(s.chars().take(n).collect()))
}

pub fn fn_right(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("RIGHT", args, 1, 2)?;
    let s = try_val!(ctx.string_arg(args, 0)?);
    let n = if args.len() > 1 {
        try_val!(ctx.number_arg(args, 1)?) as usize
    } else {
        1
    };
    let chars: Vec<char> = s.chars().collect();
    let start = chars.len().saturating_sub(n);
    Ok(FormulaValue::Text(chars[start..].iter().collect()))
}

pub fn fn_mid(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("MID", args, 3, 3)?;
    let s = try_val!(ctx.string_arg(args, 0)?);
    let start = try_val!(ctx.number_arg(args, 1)?);
    let count = try_val!(ctx.number_arg(args, 2)?);
    if start < 1.0 || count < 0.0 {
        return Ok(FormulaValue::Error(ErrorCode::Value));
    }
    let result: String = s
        .chars()
        .skip(start as usize - 1)
        .take(count as usize)
        .collect();
    Ok(FormulaValue::Text(result))
}

/// TRIM collapses every run of whitespace to a single space and strips the
/// ends.
pub fn fn_trim(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("TRIM", args, 1, 1)?;
    let s = try_val!(ctx.string_arg(args, 0)?);
    let collapsed: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(FormulaValue::Text(collapsed))
}

/// FIND(needle, haystack, [start]): case-sensitive, 1-indexed.
pub fn fn_find(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("FIND", args, 2, 3)?;
    let needle = try_val!(ctx.string_arg(args, 0)?);
    let haystack = try_val!(ctx.string_arg(args, 1)?);
    let start = start_index(args, ctx)?;
    let start = try_val!(start);

    let chars: Vec<char> = haystack.chars().collect();
    if start < 1 || start > chars.len() + 1 {
        return Ok(FormulaValue::Error(ErrorCode::Value));
    }
    let tail: String = chars[start - 1..].iter().collect();
    match tail.find(&needle) {
        Some(byte_pos) => {
            let char_pos = tail[..byte_pos].chars().count();
            Ok(FormulaValue::Number((start + char_pos) as f64))
        }
        None => Ok(FormulaValue::Error(ErrorCode::Value)),
    }
}

/// SEARCH(needle, haystack, [start]): case-insensitive, `*`/`?` wildcards.
pub fn fn_search(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("SEARCH", args, 2, 3)?;
    let needle = try_val!(ctx.string_arg(args, 0)?);
    let haystack = try_val!(ctx.string_arg(args, 1)?);
    let start = start_index(args, ctx)?;
    let start = try_val!(start);

    let chars: Vec<char> = haystack.chars().collect();
    if start < 1 || start > chars.len() + 1 {
        return Ok(FormulaValue::Error(ErrorCode::Value));
    }
    let tail: String = chars[start - 1..].iter().collect();

    let mut pattern = String::from("(?i)");
    for c in needle.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    let re = match regex::Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return Ok(FormulaValue::Error(ErrorCode::Value)),
    };
    match re.find(&tail) {
        Some(m) => {
            let char_pos = tail[..m.start()].chars().count();
            Ok(FormulaValue::Number((start + char_pos) as f64))
        }
        None => Ok(FormulaValue::Error(ErrorCode::Value)),
    }
}

fn start_index(
    args: &[Expr],
    ctx: &mut Evaluator,
) -> FormulaResult<Result<usize, ErrorCode>> {
    if args.len() < 3 {
        return Ok(Ok(1));
    }
    Ok(match ctx.number_arg(args, 2)? {
        Ok(n) if n >= 1.0 => Ok(n as usize),
        Ok(_) => Err(ErrorCode::Value),
        Err(code) => Err(code),
    })
}

/// SUBSTITUTE(text, old, new, [instance]): replaces the nth occurrence
/// only when an instance number is given, every occurrence otherwise.
pub fn fn_substitute(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("SUBSTITUTE", args, 3, 4)?;
    let text = try_val!(ctx.string_arg(args, 0)?);
    let old = try_val!(ctx.string_arg(args, 1)?);
    let new = try_val!(ctx.string_arg(args, 2)?);
    if old.is_empty() {
        return Ok(FormulaValue::Text(text));
    }

    if args.len() < 4 {
        return Ok(FormulaValue::Text(text.replace(&old, &new)));
    }

    let instance = try_val!(ctx.number_arg(args, 3)?);
    if instance < 1.0 {
        return Ok(FormulaValue::Error(ErrorCode::Value));
    }
    let instance = instance as usize;

    let mut seen = 0usize;
    let mut search_from = 0usize;
    while let Some(pos) = text[search_from..].find(&old) {
        let absolute = search_from + pos;
        seen += 1;
        if seen == instance {
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..absolute]);
            out.push_str(&new);
            out.push_str(&text[absolute + old.len()..]);
            return Ok(FormulaValue::Text(out));
        }
        search_from = absolute + old.len();
    }
    Ok(FormulaValue::Text(text))
}

/// TEXT(value, format): a focused subset of number-format codes.
pub fn fn_text(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("TEXT", args, 2, 2)?;
    let value = ctx.eval_arg(args, 0)?;
    if let FormulaValue::Error(code) = value {
        return Ok(FormulaValue::Error(code));
    }
    let format = try_val!(ctx.string_arg(args, 1)?);

    let Some(n) = value.as_double() else {
        // Non-numeric values pass through as text.
        return Ok(FormulaValue::Text(value.as_string()));
    };

    let lower = format.to_ascii_lowercase();
    if lower.contains('y') || lower.contains('m') || lower.contains('d') {
        return Ok(FormulaValue::Text(format_date(n, &lower)));
    }
    Ok(FormulaValue::Text(format_number(n, &format)))
}

/// Render a serial through date tokens `yyyy`, `yy`, `mm`, `m`, `dd`, `d`.
fn format_date(serial: f64, format: &str) -> String {
    use chrono::Datelike;
    let Some(date) = serial::serial_to_date(serial) else {
        return serial.to_string();
    };

    let mut out = String::new();
    let chars: Vec<char> = format.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let rest: String = chars[i..].iter().collect();
        if rest.starts_with("yyyy") {
            out.push_str(&format!("{:04}", date.year()));
            i += 4;
        } else if rest.starts_with("yy") {
            out.push_str(&format!("{:02}", date.year() % 100));
            i += 2;
        } else if rest.starts_with("mm") {
            out.push_str(&format!("{:02}", date.month()));
            i += 2;
        } else if rest.starts_with('m') {
            out.push_str(&date.month().to_string());
            i += 1;
        } else if rest.starts_with("dd") {
            out.push_str(&format!("{:02}", date.day()));
            i += 2;
        } else if rest.starts_with('d') {
            out.push_str(&date.day().to_string());
            i += 1;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Render a number through `0`, `.00`, `%`, `$`, and `#,##0` patterns.
fn format_number(mut n: f64, format: &str) -> String {
    let percent = format.contains('%');
    if percent {
        n *= 100.0;
    }
    let decimals = format
        .split_once('.')
        .map(|(_, frac)| frac.chars().take_while(|c| *c == '0').count())
        .unwrap_or(0);
    let grouped = format.contains(',');

    let mut body = format!("{n:.decimals$}");
    if grouped {
        body = group_thousands(&body);
    }

    let mut out = String::new();
    if format.contains('$') {
        out.push('$');
    }
    out.push_str(&body);
    if percent {
        out.push('%');
    }
    out
}

fn group_thousands(body: &str) -> String {
    let (sign, rest) = match body.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", body),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::new();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use crate::formula::eval::{evaluate_formula, EmptyResolver};
    use crate::formula::value::{ErrorCode, FormulaValue};

    fn eval(formula: &str) -> FormulaValue {
        evaluate_formula(formula, &EmptyResolver).unwrap()
    }

    fn text(s: &str) -> FormulaValue {
        FormulaValue::Text(s.to_string())
    }

    #[test]
    fn test_len_counts_chars() {
        assert_eq!(eval("LEN(\"hello\")"), FormulaValue::Number(5.0));
        assert_eq!(eval("LEN(\"\")"), FormulaValue::Number(0.0));
        assert_eq!(eval("LEN(1234)"), FormulaValue::Number(4.0));
    }

    #[test]
    fn test_upper_lower() {
        assert_eq!(eval("UPPER(\"aBc\")"), text("ABC"));
        assert_eq!(eval("LOWER(\"aBc\")"), text("abc"));
    }

    #[test]
    fn test_concat_and_concatenate() {
        assert_eq!(eval("CONCAT(\"a\",1,TRUE)"), text("a1TRUE"));
        assert_eq!(eval("CONCATENATE(\"x\",\"-\",\"y\")"), text("x-y"));
    }

    #[test]
    fn test_left_right_mid() {
        assert_eq!(eval("LEFT(\"hello\",2)"), text("he"));
        assert_eq!(eval("LEFT(\"hello\")"), text("h"));
        assert_eq!(eval("RIGHT(\"hello\",3)"), text("llo"));
        assert_eq!(eval("MID(\"hello\",2,3)"), text("ell"));
        assert_eq!(eval("MID(\"hello\",0,3)"), FormulaValue::Error(ErrorCode::Value));
    }

    #[test]
    fn test_trim_collapses_internal_runs() {
        assert_eq!(eval("TRIM(\"  a   b  \")"), text("a b"));
        assert_eq!(eval("TRIM(\"one two\")"), text("one two"));
    }

    #[test]
    fn test_find_case_sensitive() {
        assert_eq!(eval("FIND(\"b\",\"abcb\")"), FormulaValue::Number(2.0));
        assert_eq!(eval("FIND(\"b\",\"abcb\",3)"), FormulaValue::Number(4.0));
        assert_eq!(
            eval("FIND(\"B\",\"abc\")"),
            FormulaValue::Error(ErrorCode::Value)
        );
    }

    #[test]
    fn test_search_case_insensitive_with_wildcards() {
        assert_eq!(eval("SEARCH(\"B\",\"abc\")"), FormulaValue::Number(2.0));
        assert_eq!(eval("SEARCH(\"a*c\",\"abbc\")"), FormulaValue::Number(1.0));
        assert_eq!(eval("SEARCH(\"b?c\",\"xxbac\")"), FormulaValue::Number(3.0));
        assert_eq!(
            eval("SEARCH(\"z\",\"abc\")"),
            FormulaValue::Error(ErrorCode::Value)
        );
    }

    #[test]
    fn test_substitute_all_and_nth() {
        assert_eq!(eval("SUBSTITUTE(\"a-b-c\",\"-\",\"+\")"), text("a+b+c"));
        assert_eq!(eval("SUBSTITUTE(\"a-b-c\",\"-\",\"+\",2)"), text("a-b+c"));
        // Instance beyond the last occurrence leaves the text untouched.
        assert_eq!(eval("SUBSTITUTE(\"a-b\",\"-\",\"+\",5)"), text("a-b"));
    }

    #[test]
    fn test_text_numeric_formats() {
        assert_eq!(eval("TEXT(1234.567, \"0\")"), text("1235"));
        assert_eq!(eval("TEXT(1234.567, \"0.00\")"), text("1234.57"));
        assert_eq!(eval("TEXT(0.25, \"0%\")"), text("25%"));
        assert_eq!(eval("TEXT(1234567.891, \"#,##0.00\")"), text("1,234,567.89"));
        assert_eq!(eval("TEXT(42, \"$0.00\")"), text("$42.00"));
    }

    #[test]
    fn test_text_date_formats() {
        // Serial 45292 is 2024-01-01.
        assert_eq!(eval("TEXT(45292, \"yyyy-mm-dd\")"), text("2024-01-01"));
        assert_eq!(eval("TEXT(45292, \"d/m/yy\")"), text("1/1/24"));
    }

    #[test]
    fn test_text_passes_strings_through() {
        assert_eq!(eval("TEXT(\"abc\", \"0\")"), text("abc"));
    }
}
