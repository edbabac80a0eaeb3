//! Date functions: TODAY, NOW, DATE, YEAR, MONTH, DAY.
//!
//! All of these speak 1900-system serial numbers (see
//! [`crate::formula::serial`]).

use chrono::{Datelike, Local, Timelike};

use crate::error::FormulaResult;
use crate::formula::eval::Evaluator;
use crate::formula::functions::{check_arg_count, try_val};
use crate::formula::parser::Expr;
use crate::formula::serial::{date_to_serial, serial_to_date, ymd_to_serial};
use crate::formula::value::{ErrorCode, FormulaValue};

pub fn fn_today(args: &[Expr], _ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("TODAY", args, 0, 0)?;
    Ok(FormulaValue::Number(date_to_serial(
        Local::now().date_naive(),
    )))
}

pub fn fn_now(args: &[Expr], _ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("NOW", args, 0, 0)?;
    let now = Local::now().naive_local();
    let day_fraction = f64::from(now.num_seconds_from_midnight()) / 86_400.0;
    Ok(FormulaValue::Number(
        date_to_serial(now.date()) + day_fraction,
    ))
}

/// DATE(year, month, day): months and days normalize through overflow,
/// years 0..=99 land in 1900..=1999.
pub fn fn_date(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("DATE", args, 3, 3)?;
    let year = try_val!(ctx.number_arg(args, 0)?);
    let month = try_val!(ctx.number_arg(args, 1)?);
    let day = try_val!(ctx.number_arg(args, 2)?);

    match ymd_to_serial(year as i64, month as i64, day as i64) {
        Some(serial) => Ok(FormulaValue::Number(serial)),
        None => Ok(FormulaValue::Error(ErrorCode::Num)),
    }
}

pub fn fn_year(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("YEAR", args, 1, 1)?;
    date_part(args, ctx, |d| d.year() as f64)
}

pub fn fn_month(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("MONTH", args, 1, 1)?;
    date_part(args, ctx, |d| f64::from(d.month()))
}

pub fn fn_day(args: &[Expr], ctx: &mut Evaluator) -> FormulaResult<FormulaValue> {
    check_arg_count("DAY", args, 1, 1)?;
    date_part(args, ctx, |d| f64::from(d.day()))
}

fn date_part(
    args: &[Expr],
    ctx: &mut Evaluator,
    extract: fn(chrono::NaiveDate) -> f64,
) -> FormulaResult<FormulaValue> {
    let serial = try_val!(ctx.number_arg(args, 0)?);
    match serial_to_date(serial) {
        Some(date) => Ok(FormulaValue::Number(extract(date))),
        None => Ok(FormulaValue::Error(ErrorCode::Value)),
    }
}
