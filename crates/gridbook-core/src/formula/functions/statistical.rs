//! Statistical functions: AVERAGE, MIN, MAX, MEDIAN, COUNT, COUNTA,
//! COUNTIF, COUNTIFS, AVERAGEIF.

use crate::error::{FormulaError, FormulaResult};
use crate::formula::eval::Evaluator;
use crate::formula::functions::{check_arg_count, matches_criteria, math, try_val};
use crate::formula::parser::Expr;
use crate::formula::value::{ErrorCode, FormulaValue};

pub fn fn_average(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("AVERAGE", args, 1, 255)?;
    let nums = try_val!(ctx.collect_numbers(args)?);
    if nums.is_empty() {
        return Ok(FormulaValue::Error(ErrorCode::Div0));
    }
    let sum: f64 = nums.iter().sum();
    Ok(FormulaValue::Number(sum / nums.len() as f64))
}

pub fn fn_min(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("MIN", args, 1, 255)?;
    let nums = try_val!(ctx.collect_numbers(args)?);
    if nums.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    Ok(FormulaValue::Number(
        nums.iter().copied().fold(f64::INFINITY, f64::min),
    ))
}

pub fn fn_max(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("MAX", args, 1, 255)?;
    let nums = try_val!(ctx.collect_numbers(args)?);
    if nums.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    Ok(FormulaValue::Number(
        nums.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    ))
}

pub fn fn_median(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("MEDIAN", args, 1, 255)?;
    let mut nums = try_val!(ctx.collect_numbers(args)?);
    if nums.is_empty() {
        return Ok(FormulaValue::Error(ErrorCode::Num));
    }
    nums.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = nums.len() / 2;
    let median = if nums.len() % 2 == 1 {
        nums[mid]
    } else {
        (nums[mid - 1] + nums[mid]) / 2.0
    };
    Ok(FormulaValue::Number(median))
}

/// COUNT counts numeric values only.
pub fn fn_count(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("COUNT", args, 1, 255)?;
    let values = ctx.flatten_args(args)?;
    let count = values
        .iter()
        .filter(|v| matches!(v, FormulaValue::Number(_)))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// COUNTA counts any non-empty, non-error value.
pub fn fn_counta(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("COUNTA", args, 1, 255)?;
    let values = ctx.flatten_args(args)?;
    let count = values
        .iter()
        .filter(|v| !matches!(v, FormulaValue::Empty | FormulaValue::Error(_)))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

pub fn fn_countif(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("COUNTIF", args, 2, 2)?;
    let values = ctx.values_of(&args[0])?;
    let criteria = ctx.eval_arg(args, 1)?;
    let count = values
        .iter()
        .filter(|v| matches_criteria(v, &criteria))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// COUNTIFS(criteria_range1, criteria1, ...).
pub fn fn_countifs(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("COUNTIFS", args, 2, 255)?;
    if args.len() % 2 != 0 {
        return Err(FormulaError::InvalidArgumentCount {
            name: "COUNTIFS".to_string(),
            expected: "an even number (range/criteria pairs)".to_string(),
            got: args.len(),
        });
    }
    let len = ctx.values_of(&args[0])?.len();
    let mask = math::criteria_mask(args.chunks(2), ctx, len)?;
    Ok(FormulaValue::Number(
        mask.iter().filter(|keep| **keep).count() as f64,
    ))
}

pub fn fn_averageif(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("AVERAGEIF", args, 2, 3)?;
    let test_values = ctx.values_of(&args[0])?;
    let criteria = ctx.eval_arg(args, 1)?;
    let avg_values = if args.len() > 2 {
        ctx.values_of(&args[2])?
    } else {
        test_values.clone()
    };

    let mut sum = 0.0;
    let mut count = 0usize;
    for (i, test) in test_values.iter().enumerate() {
        if matches_criteria(test, &criteria) {
            if let Some(n) = avg_values.get(i).and_then(|v| v.as_double()) {
                sum += n;
                count += 1;
            }
        }
    }
    if count == 0 {
        return Ok(FormulaValue::Error(ErrorCode::Div0));
    }
    Ok(FormulaValue::Number(sum / count as f64))
}
