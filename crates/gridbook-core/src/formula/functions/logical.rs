//! Logical functions: IF, IFERROR, AND, OR, NOT.

use crate::error::FormulaResult;
use crate::formula::eval::Evaluator;
use crate::formula::functions::{check_arg_count, try_val};
use crate::formula::parser::Expr;
use crate::formula::value::{ErrorCode, FormulaValue};

/// IF(condition, then, [else]). The untaken branch is never evaluated.
pub fn fn_if(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("IF", args, 2, 3)?;
    let condition = try_val!(ctx.bool_arg(args, 0)?);
    if condition {
        ctx.eval_expr(&args[1])
    } else if args.len() > 2 {
        ctx.eval_expr(&args[2])
    } else {
        Ok(FormulaValue::Bool(false))
    }
}

/// IFERROR(value, fallback): catches error values, not parse errors.
pub fn fn_iferror(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("IFERROR", args, 2, 2)?;
    let value = ctx.eval_expr(&args[0])?;
    if value.is_error() {
        ctx.eval_expr(&args[1])
    } else {
        Ok(value)
    }
}

pub fn fn_and(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("AND", args, 1, 255)?;
    fold_logical(args, ctx, true, |acc, v| acc && v)
}

pub fn fn_or(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("OR", args, 1, 255)?;
    fold_logical(args, ctx, false, |acc, v| acc || v)
}

fn fold_logical(
    args: &[Expr],
    ctx: &mut Evaluator,
    initial: bool,
    combine: fn(bool, bool) -> bool,
) -> FormulaResult<FormulaValue> {
    let values = ctx.flatten_args(args)?;
    let mut acc = initial;
    let mut seen = false;
    for value in &values {
        match value {
            FormulaValue::Empty => continue,
            FormulaValue::Error(code) => return Ok(FormulaValue::Error(*code)),
            other => match other.as_boolean() {
                Some(b) => {
                    acc = combine(acc, b);
                    seen = true;
                }
                None => return Ok(FormulaValue::Error(ErrorCode::Value)),
            },
        }
    }
    if !seen {
        return Ok(FormulaValue::Error(ErrorCode::Value));
    }
    Ok(FormulaValue::Bool(acc))
}

pub fn fn_not(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("NOT", args, 1, 1)?;
    let value = try_val!(ctx.bool_arg(args, 0)?);
    Ok(FormulaValue::Bool(!value))
}

#[cfg(test)]
mod tests {
    use crate::formula::eval::{evaluate_formula, EmptyResolver, MapResolver};
    use crate::formula::value::{ErrorCode, FormulaValue};

    fn eval(formula: &str) -> FormulaValue {
        evaluate_formula(formula, &EmptyResolver).unwrap()
    }

    #[test]
    fn test_if_branches() {
        assert_eq!(eval("IF(TRUE,10,20)"), FormulaValue::Number(10.0));
        assert_eq!(eval("IF(FALSE,10,20)"), FormulaValue::Number(20.0));
        assert_eq!(eval("IF(FALSE,10)"), FormulaValue::Bool(false));
    }

    #[test]
    fn test_if_condition_from_cell() {
        let mut cells = MapResolver::new();
        cells.set_number("A1", -1.0).unwrap();
        assert_eq!(
            evaluate_formula("IF(A1>0, \"p\", \"n\")", &cells).unwrap(),
            FormulaValue::Text("n".to_string())
        );
    }

    #[test]
    fn test_if_short_circuits() {
        // The untaken branch would divide by zero.
        assert_eq!(eval("IF(TRUE, 1, 1/0)"), FormulaValue::Number(1.0));
    }

    #[test]
    fn test_iferror_catches_error_values() {
        assert_eq!(eval("IFERROR(1/0, 42)"), FormulaValue::Number(42.0));
        assert_eq!(eval("IFERROR(7, 42)"), FormulaValue::Number(7.0));
        assert_eq!(eval("IFERROR(#N/A, \"-\")"), FormulaValue::Text("-".to_string()));
    }

    #[test]
    fn test_and_or_not() {
        assert_eq!(eval("AND(TRUE,TRUE)"), FormulaValue::Bool(true));
        assert_eq!(eval("AND(TRUE,FALSE)"), FormulaValue::Bool(false));
        assert_eq!(eval("OR(FALSE,TRUE)"), FormulaValue::Bool(true));
        assert_eq!(eval("OR(FALSE,FALSE)"), FormulaValue::Bool(false));
        assert_eq!(eval("NOT(TRUE)"), FormulaValue::Bool(false));
        assert_eq!(eval("AND(1,2)"), FormulaValue::Bool(true));
        assert_eq!(eval("AND(1,0)"), FormulaValue::Bool(false));
    }

    #[test]
    fn test_and_skips_empty_cells() {
        let mut cells = MapResolver::new();
        cells.set("A1", FormulaValue::Bool(true)).unwrap();
        assert_eq!(
            evaluate_formula("AND(A1:A3)", &cells).unwrap(),
            FormulaValue::Bool(true)
        );
    }

    #[test]
    fn test_logical_coercion_failure() {
        assert_eq!(eval("AND(\"abc\")"), FormulaValue::Error(ErrorCode::Value));
        assert_eq!(eval("NOT(\"abc\")"), FormulaValue::Error(ErrorCode::Value));
    }

    #[test]
    fn test_logical_error_propagation() {
        assert_eq!(eval("AND(TRUE, 1/0)"), FormulaValue::Error(ErrorCode::Div0));
    }
}
