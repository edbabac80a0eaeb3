//! Math functions: SUM, ABS, INT, MOD, ROUND, SQRT, SUMIF, SUMIFS.

use crate::error::FormulaResult;
use crate::formula::eval::Evaluator;
use crate::formula::functions::{check_arg_count, matches_criteria, try_val};
use crate::formula::parser::Expr;
use crate::formula::value::{ErrorCode, FormulaValue};

pub fn fn_sum(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("SUM", args, 1, 255)?;
    let nums = try_val!(ctx.collect_numbers(args)?);
    Ok(FormulaValue::Number(nums.iter().sum()))
}

pub fn fn_abs(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("ABS", args, 1, 1)?;
    let n = try_val!(ctx.number_arg(args, 0)?);
    Ok(FormulaValue::Number(n.abs()))
}

/// INT floors toward negative infinity.
pub fn fn_int(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("INT", args, 1, 1)?;
    let n = try_val!(ctx.number_arg(args, 0)?);
    Ok(FormulaValue::Number(n.floor()))
}

/// MOD's result carries the sign of the divisor.
pub fn fn_mod(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("MOD", args, 2, 2)?;
    let a = try_val!(ctx.number_arg(args, 0)?);
    let b = try_val!(ctx.number_arg(args, 1)?);
    if b == 0.0 {
        return Ok(FormulaValue::Error(ErrorCode::Div0));
    }
    Ok(FormulaValue::Number(a - (a / b).floor() * b))
}

pub fn fn_round(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("ROUND", args, 1, 2)?;
    let n = try_val!(ctx.number_arg(args, 0)?);
    let digits = if args.len() > 1 {
        try_val!(ctx.number_arg(args, 1)?) as i32
    } else {
        0
    };
    let factor = 10f64.powi(digits);
    Ok(FormulaValue::Number((n * factor).round() / factor))
}

pub fn fn_sqrt(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("SQRT", args, 1, 1)?;
    let n = try_val!(ctx.number_arg(args, 0)?);
    if n < 0.0 {
        return Ok(FormulaValue::Error(ErrorCode::Num));
    }
    Ok(FormulaValue::Number(n.sqrt()))
}

pub fn fn_sumif(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("SUMIF", args, 2, 3)?;
    let test_values = ctx.values_of(&args[0])?;
    let criteria = ctx.eval_arg(args, 1)?;
    let sum_values = if args.len() > 2 {
        ctx.values_of(&args[2])?
    } else {
        test_values.clone()
    };

    let mut total = 0.0;
    for (i, test) in test_values.iter().enumerate() {
        if matches_criteria(test, &criteria) {
            if let Some(n) = sum_values.get(i).and_then(|v| v.as_double()) {
                total += n;
            }
        }
    }
    Ok(FormulaValue::Number(total))
}

/// SUMIFS(sum_range, criteria_range1, criteria1, ...).
pub fn fn_sumifs(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("SUMIFS", args, 3, 255)?;
    if (args.len() - 1) % 2 != 0 {
        return Err(crate::error::FormulaError::InvalidArgumentCount {
            name: "SUMIFS".to_string(),
            expected: "an odd number (sum range plus range/criteria pairs)".to_string(),
            got: args.len(),
        });
    }

    let sum_values = ctx.values_of(&args[0])?;
    let mask = criteria_mask(args[1..].chunks(2), ctx, sum_values.len())?;

    let total: f64 = sum_values
        .iter()
        .zip(mask.iter())
        .filter(|(_, keep)| **keep)
        .filter_map(|(v, _)| v.as_double())
        .sum();
    Ok(FormulaValue::Number(total))
}

/// Evaluate range/criteria pairs into a keep-mask of the given length.
pub(super) fn criteria_mask<'a>(
    pairs: impl Iterator<Item = &'a [Expr]>,
    ctx: &mut Evaluator,
    len: usize,
) -> FormulaResult<Vec<bool>> {
    let mut mask = vec![true; len];
    for pair in pairs {
        let range_values = ctx.values_of(&pair[0])?;
        let criteria = ctx.eval_expr(&pair[1])?;
        for (i, keep) in mask.iter_mut().enumerate() {
            let value = range_values.get(i).unwrap_or(&FormulaValue::Empty);
            if !matches_criteria(value, &criteria) {
                *keep = false;
            }
        }
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use crate::formula::eval::{evaluate_formula, EmptyResolver, MapResolver};
    use crate::formula::value::{ErrorCode, FormulaValue};

    fn eval(formula: &str) -> FormulaValue {
        evaluate_formula(formula, &EmptyResolver).unwrap()
    }

    #[test]
    fn test_sum_scalars_and_ranges() {
        assert_eq!(eval("SUM(1,2,3)"), FormulaValue::Number(6.0));
        let mut cells = MapResolver::new();
        cells.set_number("A1", 1.5).unwrap();
        cells.set_number("A2", 2.5).unwrap();
        assert_eq!(
            evaluate_formula("SUM(A1:A2, 1)", &cells).unwrap(),
            FormulaValue::Number(5.0)
        );
    }

    #[test]
    fn test_abs_int() {
        assert_eq!(eval("ABS(-4.5)"), FormulaValue::Number(4.5));
        assert_eq!(eval("INT(3.7)"), FormulaValue::Number(3.0));
        // INT floors, it does not truncate.
        assert_eq!(eval("INT(-3.2)"), FormulaValue::Number(-4.0));
    }

    #[test]
    fn test_mod_sign_follows_divisor() {
        assert_eq!(eval("MOD(5,3)"), FormulaValue::Number(2.0));
        assert_eq!(eval("MOD(-3,2)"), FormulaValue::Number(1.0));
        assert_eq!(eval("MOD(3,-2)"), FormulaValue::Number(-1.0));
        assert_eq!(eval("MOD(1,0)"), FormulaValue::Error(ErrorCode::Div0));
    }

    #[test]
    fn test_round() {
        assert_eq!(eval("ROUND(2.567,2)"), FormulaValue::Number(2.57));
        assert_eq!(eval("ROUND(2.5)"), FormulaValue::Number(3.0));
        assert_eq!(eval("ROUND(1234.5,-2)"), FormulaValue::Number(1200.0));
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(eval("SQRT(16)"), FormulaValue::Number(4.0));
        assert_eq!(eval("SQRT(-1)"), FormulaValue::Error(ErrorCode::Num));
    }

    #[test]
    fn test_sumif_with_and_without_sum_range() {
        let mut cells = MapResolver::new();
        cells.set_number("A1", 1.0).unwrap();
        cells.set_number("A2", 2.0).unwrap();
        cells.set_number("A3", 3.0).unwrap();
        cells.set_number("B1", 10.0).unwrap();
        cells.set_number("B2", 20.0).unwrap();
        cells.set_number("B3", 30.0).unwrap();

        assert_eq!(
            evaluate_formula("SUMIF(A1:A3, \">=2\")", &cells).unwrap(),
            FormulaValue::Number(5.0)
        );
        assert_eq!(
            evaluate_formula("SUMIF(A1:A3, \">=2\", B1:B3)", &cells).unwrap(),
            FormulaValue::Number(50.0)
        );
    }

    #[test]
    fn test_sumifs_multiple_criteria() {
        let mut cells = MapResolver::new();
        cells.set_number("A1", 10.0).unwrap();
        cells.set_number("A2", 20.0).unwrap();
        cells.set_number("A3", 30.0).unwrap();
        cells.set_text("B1", "red").unwrap();
        cells.set_text("B2", "blue").unwrap();
        cells.set_text("B3", "red").unwrap();
        cells.set_number("C1", 1.0).unwrap();
        cells.set_number("C2", 1.0).unwrap();
        cells.set_number("C3", 2.0).unwrap();

        assert_eq!(
            evaluate_formula("SUMIFS(A1:A3, B1:B3, \"red\", C1:C3, \">1\")", &cells).unwrap(),
            FormulaValue::Number(30.0)
        );
    }

    #[test]
    fn test_sumifs_rejects_even_tail() {
        let mut cells = MapResolver::new();
        cells.set_number("A1", 1.0).unwrap();
        assert!(evaluate_formula("SUMIFS(A1:A3, B1:B3)", &cells).is_err());
    }

    #[test]
    fn test_sum_propagates_value_error_from_scalar() {
        assert_eq!(eval("SUM(1,\"x\")"), FormulaValue::Error(ErrorCode::Value));
    }
}
