//! Information functions: ISBLANK, ISNUMBER, ISTEXT, ISERROR.
//!
//! These inspect rather than coerce, so error values do not propagate
//! through them.

use crate::error::FormulaResult;
use crate::formula::eval::Evaluator;
use crate::formula::functions::check_arg_count;
use crate::formula::parser::Expr;
use crate::formula::value::FormulaValue;

/// ISBLANK is true for a reference to an empty cell. A literal empty
/// string is not blank.
pub fn fn_isblank(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("ISBLANK", args, 1, 1)?;
    let value = ctx.eval_arg(args, 0)?;
    Ok(FormulaValue::Bool(value.is_empty()))
}

pub fn fn_isnumber(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("ISNUMBER", args, 1, 1)?;
    let value = ctx.eval_arg(args, 0)?;
    Ok(FormulaValue::Bool(matches!(value, FormulaValue::Number(_))))
}

pub fn fn_istext(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("ISTEXT", args, 1, 1)?;
    let value = ctx.eval_arg(args, 0)?;
    Ok(FormulaValue::Bool(matches!(value, FormulaValue::Text(_))))
}

pub fn fn_iserror(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("ISERROR", args, 1, 1)?;
    let value = ctx.eval_arg(args, 0)?;
    Ok(FormulaValue::Bool(value.is_error()))
}
