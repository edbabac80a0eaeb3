//! Lookup functions: VLOOKUP, INDEX, MATCH.

use crate::error::{FormulaError, FormulaResult};
use crate::formula::eval::Evaluator;
use crate::formula::functions::{check_arg_count, try_val};
use crate::formula::parser::Expr;
use crate::formula::value::{compare, values_equal, ErrorCode, FormulaValue};

/// VLOOKUP(lookup, table, col_index, [range_lookup]).
///
/// `range_lookup` defaults to TRUE; the approximate match assumes the
/// first column is sorted ascending and answers the last row whose key is
/// less than or equal to the lookup value.
pub fn fn_vlookup(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("VLOOKUP", args, 3, 4)?;
    let lookup = ctx.eval_arg(args, 0)?;
    if let FormulaValue::Error(code) = lookup {
        return Ok(FormulaValue::Error(code));
    }
    let table = try_val!(ctx.table_of(&args[1])?);
    let col = try_val!(ctx.number_arg(args, 2)?);
    let approximate = if args.len() > 3 {
        try_val!(ctx.bool_arg(args, 3)?)
    } else {
        true
    };

    if col < 1.0 {
        return Ok(FormulaValue::Error(ErrorCode::Value));
    }
    let col = col as usize - 1;

    let matched_row: Option<&Vec<FormulaValue>> = if approximate {
        let mut best: Option<&Vec<FormulaValue>> = None;
        for row in &table {
            let Some(key) = row.first() else { continue };
            if compare(key, &lookup) != std::cmp::Ordering::Greater {
                best = Some(row);
            }
        }
        best
    } else {
        table
            .iter()
            .find(|row| row.first().is_some_and(|key| values_equal(key, &lookup)))
    };

    match matched_row {
        Some(row) => match row.get(col) {
            Some(value) => Ok(value.clone()),
            None => Ok(FormulaValue::Error(ErrorCode::Ref)),
        },
        None => Ok(FormulaValue::Error(ErrorCode::Na)),
    }
}

/// INDEX(table, row, [col]).
pub fn fn_index(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("INDEX", args, 2, 3)?;
    let table = try_val!(ctx.table_of(&args[0])?);
    let row = try_val!(ctx.number_arg(args, 1)?);
    let col = if args.len() > 2 {
        try_val!(ctx.number_arg(args, 2)?)
    } else {
        1.0
    };

    if row < 1.0 || col < 1.0 {
        return Ok(FormulaValue::Error(ErrorCode::Ref));
    }
    match table
        .get(row as usize - 1)
        .and_then(|r| r.get(col as usize - 1))
    {
        Some(value) => Ok(value.clone()),
        None => Ok(FormulaValue::Error(ErrorCode::Ref)),
    }
}

/// MATCH(lookup, array, [match_type]).
///
/// Match type 0 is exact; 1 (the default) assumes ascending order and
/// answers the last position whose value is less than or equal to the
/// lookup. Other match types are not supported.
pub fn fn_match(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("MATCH", args, 2, 3)?;
    let lookup = ctx.eval_arg(args, 0)?;
    if let FormulaValue::Error(code) = lookup {
        return Ok(FormulaValue::Error(code));
    }
    let values = ctx.values_of(&args[1])?;
    let match_type = if args.len() > 2 {
        try_val!(ctx.number_arg(args, 2)?)
    } else {
        1.0
    };

    if match_type == 0.0 {
        for (i, value) in values.iter().enumerate() {
            if values_equal(value, &lookup) {
                return Ok(FormulaValue::Number((i + 1) as f64));
            }
        }
        return Ok(FormulaValue::Error(ErrorCode::Na));
    }

    if match_type == 1.0 {
        let mut best: Option<usize> = None;
        for (i, value) in values.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            if compare(value, &lookup) != std::cmp::Ordering::Greater {
                best = Some(i);
            }
        }
        return Ok(match best {
            Some(i) => FormulaValue::Number((i + 1) as f64),
            None => FormulaValue::Error(ErrorCode::Na),
        });
    }

    Err(FormulaError::InvalidArgumentType {
        name: "MATCH".to_string(),
        detail: format!("unsupported match type {match_type}"),
    })
}

#[cfg(test)]
mod tests {
    use crate::error::FormulaError;
    use crate::formula::eval::{evaluate_formula, EmptyResolver, MapResolver};
    use crate::formula::value::{ErrorCode, FormulaValue};

    fn eval(formula: &str) -> FormulaValue {
        evaluate_formula(formula, &EmptyResolver).unwrap()
    }

    fn lookup_cells() -> MapResolver {
        let mut cells = MapResolver::new();
        for (i, (key, label)) in [(1.0, "a"), (2.0, "b"), (3.0, "c")].iter().enumerate() {
            let row = i as u32 + 1;
            cells.set_number(&format!("A{row}"), *key).unwrap();
            cells.set_text(&format!("B{row}"), label).unwrap();
        }
        cells
    }

    #[test]
    fn test_vlookup_exact_match_on_array_literal() {
        assert_eq!(
            eval("VLOOKUP(2, {1,\"a\"; 2,\"b\"; 3,\"c\"}, 2, FALSE)"),
            FormulaValue::Text("b".to_string())
        );
    }

    #[test]
    fn test_vlookup_exact_match_not_found() {
        assert_eq!(
            eval("VLOOKUP(9, {1,\"a\"; 2,\"b\"}, 2, FALSE)"),
            FormulaValue::Error(ErrorCode::Na)
        );
    }

    #[test]
    fn test_vlookup_approximate_takes_last_le_row() {
        // 2.5 falls between 2 and 3: the last key <= 2.5 is 2.
        assert_eq!(
            eval("VLOOKUP(2.5, {1,\"a\"; 2,\"b\"; 3,\"c\"}, 2)"),
            FormulaValue::Text("b".to_string())
        );
        // Above the last key: the last row answers.
        assert_eq!(
            eval("VLOOKUP(99, {1,\"a\"; 2,\"b\"; 3,\"c\"}, 2)"),
            FormulaValue::Text("c".to_string())
        );
        // Below the first key: no match.
        assert_eq!(
            eval("VLOOKUP(0, {1,\"a\"; 2,\"b\"}, 2)"),
            FormulaValue::Error(ErrorCode::Na)
        );
    }

    #[test]
    fn test_vlookup_over_cell_range() {
        let cells = lookup_cells();
        assert_eq!(
            evaluate_formula("VLOOKUP(3, A1:B3, 2, FALSE)", &cells).unwrap(),
            FormulaValue::Text("c".to_string())
        );
    }

    #[test]
    fn test_vlookup_column_out_of_range() {
        assert_eq!(
            eval("VLOOKUP(1, {1,\"a\"}, 5, FALSE)"),
            FormulaValue::Error(ErrorCode::Ref)
        );
    }

    #[test]
    fn test_vlookup_string_keys_case_insensitive() {
        assert_eq!(
            eval("VLOOKUP(\"B\", {\"a\",1; \"b\",2}, 2, FALSE)"),
            FormulaValue::Number(2.0)
        );
    }

    #[test]
    fn test_index() {
        assert_eq!(
            eval("INDEX({1,2; 3,4}, 2, 2)"),
            FormulaValue::Number(4.0)
        );
        assert_eq!(
            eval("INDEX({10; 20; 30}, 2)"),
            FormulaValue::Number(20.0)
        );
        assert_eq!(
            eval("INDEX({1,2}, 5)"),
            FormulaValue::Error(ErrorCode::Ref)
        );
    }

    #[test]
    fn test_match_exact_and_approximate() {
        assert_eq!(eval("MATCH(20, {10; 20; 30}, 0)"), FormulaValue::Number(2.0));
        assert_eq!(
            eval("MATCH(25, {10; 20; 30}, 1)"),
            FormulaValue::Number(2.0)
        );
        assert_eq!(eval("MATCH(25, {10; 20; 30})"), FormulaValue::Number(2.0));
        assert_eq!(
            eval("MATCH(5, {10; 20}, 1)"),
            FormulaValue::Error(ErrorCode::Na)
        );
        assert_eq!(
            eval("MATCH(99, {10; 20}, 0)"),
            FormulaValue::Error(ErrorCode::Na)
        );
    }

    #[test]
    fn test_match_unsupported_type_is_typed_error() {
        let err = evaluate_formula("MATCH(1, {1;2}, -1)", &EmptyResolver).unwrap_err();
        assert!(matches!(err, FormulaError::InvalidArgumentType { .. }));
    }
}
