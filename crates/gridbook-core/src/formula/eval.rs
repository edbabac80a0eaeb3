//! Formula evaluation.
//!
//! Evaluates parsed expression trees against cell data supplied through
//! the [`CellResolver`] trait. Data-level failures travel as
//! [`FormulaValue::Error`] values with first-error-wins semantics;
//! structural misuse (argument counts, unsupported modes) surfaces as
//! typed [`FormulaError`]s.

use std::collections::HashMap;

use gridbook_xml::cell_ref::CellRef;

use crate::error::{FormulaError, FormulaResult};
use crate::formula::functions;
use crate::formula::parser::{parse_formula, Expr};
use crate::formula::token::BinaryOp;
use crate::formula::value::{compare, ErrorCode, FormulaValue};

/// Maximum nesting depth for expression evaluation.
const MAX_EVAL_DEPTH: usize = 256;

/// Supplies live cell values to the evaluator.
pub trait CellResolver {
    /// The value of a cell; empty cells return [`FormulaValue::Empty`].
    fn resolve(&self, cell: &CellRef) -> FormulaValue;
}

/// An in-memory snapshot of cell values, decoupled from any workbook.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    cells: HashMap<CellRef, FormulaValue>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value at an A1-style reference.
    pub fn set(&mut self, reference: &str, value: FormulaValue) -> FormulaResult<()> {
        let cell = CellRef::parse(reference)
            .map_err(|_| FormulaError::InvalidCellReference(reference.to_string()))?;
        self.cells.insert(cell, value);
        Ok(())
    }

    pub fn set_number(&mut self, reference: &str, n: f64) -> FormulaResult<()> {
        self.set(reference, FormulaValue::Number(n))
    }

    pub fn set_text(&mut self, reference: &str, s: &str) -> FormulaResult<()> {
        self.set(reference, FormulaValue::Text(s.to_string()))
    }
}

impl CellResolver for MapResolver {
    fn resolve(&self, cell: &CellRef) -> FormulaValue {
        self.cells.get(cell).cloned().unwrap_or(FormulaValue::Empty)
    }
}

/// A resolver with no cells; every reference is empty.
pub struct EmptyResolver;

impl CellResolver for EmptyResolver {
    fn resolve(&self, _cell: &CellRef) -> FormulaValue {
        FormulaValue::Empty
    }
}

/// Evaluate a parsed expression.
pub fn evaluate(expr: &Expr, resolver: &dyn CellResolver) -> FormulaResult<FormulaValue> {
    Evaluator::new(resolver).eval_expr(expr)
}

/// Parse and evaluate a formula string in one step.
pub fn evaluate_formula(input: &str, resolver: &dyn CellResolver) -> FormulaResult<FormulaValue> {
    let expr = parse_formula(input)?;
    evaluate(&expr, resolver)
}

/// Stateful evaluator handed to function implementations.
pub struct Evaluator<'a> {
    resolver: &'a dyn CellResolver,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(resolver: &'a dyn CellResolver) -> Self {
        Self { resolver, depth: 0 }
    }

    /// Evaluate one expression node.
    pub fn eval_expr(&mut self, expr: &Expr) -> FormulaResult<FormulaValue> {
        self.depth += 1;
        if self.depth > MAX_EVAL_DEPTH {
            self.depth -= 1;
            return Err(FormulaError::EvaluationError(
                "maximum evaluation depth exceeded".to_string(),
            ));
        }
        let result = self.eval_inner(expr);
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, expr: &Expr) -> FormulaResult<FormulaValue> {
        match expr {
            Expr::Number(n) => Ok(FormulaValue::Number(*n)),
            Expr::Str(s) => Ok(FormulaValue::Text(s.clone())),
            Expr::Bool(b) => Ok(FormulaValue::Bool(*b)),
            Expr::ErrorLit(code) => Ok(FormulaValue::Error(*code)),
            Expr::CellRef(cell) => Ok(self.resolver.resolve(cell)),
            Expr::Range(start, end) => {
                // A range in scalar context yields its first cell.
                Ok(self
                    .expand_range(start, end)
                    .into_iter()
                    .next()
                    .unwrap_or(FormulaValue::Empty))
            }
            Expr::Array(rows) => {
                let mut out = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut out_row = Vec::with_capacity(row.len());
                    for item in row {
                        out_row.push(self.eval_expr(item)?);
                    }
                    out.push(out_row);
                }
                Ok(FormulaValue::Array(out))
            }
            Expr::BinaryOp { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Function { name, args } => match functions::lookup_function(name) {
                Some(func) => func(args, self),
                // Unknown names evaluate to #NAME? rather than failing.
                None => Ok(FormulaValue::Error(ErrorCode::Name)),
            },
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> FormulaResult<FormulaValue> {
        let lhs = self.eval_expr(left)?;
        let rhs = self.eval_expr(right)?;

        // First error wins.
        if let FormulaValue::Error(code) = lhs {
            return Ok(FormulaValue::Error(code));
        }
        if let FormulaValue::Error(code) = rhs {
            return Ok(FormulaValue::Error(code));
        }

        match op {
            BinaryOp::Concat => Ok(FormulaValue::Text(format!(
                "{}{}",
                lhs.as_string(),
                rhs.as_string()
            ))),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
                let (Some(a), Some(b)) = (lhs.as_double(), rhs.as_double()) else {
                    return Ok(FormulaValue::Error(ErrorCode::Value));
                };
                let result = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => {
                        if b == 0.0 {
                            return Ok(FormulaValue::Error(ErrorCode::Div0));
                        }
                        a / b
                    }
                    BinaryOp::Pow => a.powf(b),
                    _ => unreachable!(),
                };
                Ok(FormulaValue::Number(result))
            }
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                use std::cmp::Ordering;
                let ord = compare(&lhs, &rhs);
                let result = match op {
                    BinaryOp::Eq => ord == Ordering::Equal,
                    BinaryOp::Ne => ord != Ordering::Equal,
                    BinaryOp::Lt => ord == Ordering::Less,
                    BinaryOp::Le => ord != Ordering::Greater,
                    BinaryOp::Gt => ord == Ordering::Greater,
                    BinaryOp::Ge => ord != Ordering::Less,
                    _ => unreachable!(),
                };
                Ok(FormulaValue::Bool(result))
            }
        }
    }

    // -- Helpers used by function implementations --

    /// Evaluate the argument at `index`; the index must be in bounds.
    pub fn eval_arg(&mut self, args: &[Expr], index: usize) -> FormulaResult<FormulaValue> {
        let arg = args.get(index).ok_or_else(|| FormulaError::InvalidArgumentCount {
            name: "<argument>".to_string(),
            expected: format!(">{index}"),
            got: args.len(),
        })?;
        self.eval_expr(arg)
    }

    /// Evaluate an argument and coerce it to a number. Error values and
    /// failed coercions surface as error codes for the caller to return.
    pub fn number_arg(
        &mut self,
        args: &[Expr],
        index: usize,
    ) -> FormulaResult<Result<f64, ErrorCode>> {
        let value = self.eval_arg(args, index)?;
        Ok(match value {
            FormulaValue::Error(code) => Err(code),
            other => other.as_double().ok_or(ErrorCode::Value),
        })
    }

    /// Evaluate an argument and coerce it to a string (errors propagate).
    pub fn string_arg(
        &mut self,
        args: &[Expr],
        index: usize,
    ) -> FormulaResult<Result<String, ErrorCode>> {
        let value = self.eval_arg(args, index)?;
        Ok(match value {
            FormulaValue::Error(code) => Err(code),
            other => Ok(other.as_string()),
        })
    }

    /// Evaluate an argument and coerce it to a boolean.
    pub fn bool_arg(
        &mut self,
        args: &[Expr],
        index: usize,
    ) -> FormulaResult<Result<bool, ErrorCode>> {
        let value = self.eval_arg(args, index)?;
        Ok(match value {
            FormulaValue::Error(code) => Err(code),
            other => other.as_boolean().ok_or(ErrorCode::Value),
        })
    }

    /// Enumerate a rectangular range through the resolver, row-major.
    pub fn expand_range(&mut self, start: &CellRef, end: &CellRef) -> Vec<FormulaValue> {
        let (c0, c1) = (start.col.min(end.col), start.col.max(end.col));
        let (r0, r1) = (start.row.min(end.row), start.row.max(end.row));
        let mut values = Vec::new();
        for row in r0..=r1 {
            for col in c0..=c1 {
                values.push(self.resolver.resolve(&CellRef::new(col, row)));
            }
        }
        values
    }

    /// Enumerate a range as rows of values.
    pub fn range_rows(&mut self, start: &CellRef, end: &CellRef) -> Vec<Vec<FormulaValue>> {
        let (c0, c1) = (start.col.min(end.col), start.col.max(end.col));
        let (r0, r1) = (start.row.min(end.row), start.row.max(end.row));
        let mut rows = Vec::new();
        for row in r0..=r1 {
            let mut out = Vec::new();
            for col in c0..=c1 {
                out.push(self.resolver.resolve(&CellRef::new(col, row)));
            }
            rows.push(out);
        }
        rows
    }

    /// Flatten one argument into a list of values: ranges enumerate,
    /// arrays flatten row-major, scalars evaluate to a single value.
    pub fn values_of(&mut self, arg: &Expr) -> FormulaResult<Vec<FormulaValue>> {
        match arg {
            Expr::Range(start, end) => Ok(self.expand_range(start, end)),
            Expr::Array(_) => match self.eval_expr(arg)? {
                FormulaValue::Array(rows) => Ok(rows.into_iter().flatten().collect()),
                other => Ok(vec![other]),
            },
            _ => Ok(vec![self.eval_expr(arg)?]),
        }
    }

    /// Flatten every argument (see [`Evaluator::values_of`]).
    pub fn flatten_args(&mut self, args: &[Expr]) -> FormulaResult<Vec<FormulaValue>> {
        let mut out = Vec::new();
        for arg in args {
            out.extend(self.values_of(arg)?);
        }
        Ok(out)
    }

    /// Collect the numeric content of the arguments.
    ///
    /// Inside ranges and arrays, empty cells are skipped (the documented
    /// aggregation semantics) and so are non-numeric values, while error
    /// values propagate. Scalar arguments must coerce or the whole
    /// collection fails with `#VALUE!`.
    pub fn collect_numbers(&mut self, args: &[Expr]) -> FormulaResult<Result<Vec<f64>, ErrorCode>> {
        let mut nums = Vec::new();
        for arg in args {
            match arg {
                Expr::Range(_, _) | Expr::Array(_) => {
                    for value in self.values_of(arg)? {
                        match value {
                            FormulaValue::Error(code) => return Ok(Err(code)),
                            FormulaValue::Empty => {}
                            other => {
                                if let Some(n) = other.as_double() {
                                    nums.push(n);
                                }
                            }
                        }
                    }
                }
                _ => match self.number_arg(std::slice::from_ref(arg), 0)? {
                    Ok(n) => nums.push(n),
                    Err(code) => return Ok(Err(code)),
                },
            }
        }
        Ok(Ok(nums))
    }

    /// Interpret an argument as a rectangular table: a range resolves
    /// through cells, an array literal evaluates element-wise.
    pub fn table_of(
        &mut self,
        arg: &Expr,
    ) -> FormulaResult<Result<Vec<Vec<FormulaValue>>, ErrorCode>> {
        match arg {
            Expr::Range(start, end) => Ok(Ok(self.range_rows(start, end))),
            Expr::Array(_) => match self.eval_expr(arg)? {
                FormulaValue::Array(rows) => Ok(Ok(rows)),
                FormulaValue::Error(code) => Ok(Err(code)),
                _ => Ok(Err(ErrorCode::Value)),
            },
            _ => match self.eval_expr(arg)? {
                FormulaValue::Array(rows) => Ok(Ok(rows)),
                FormulaValue::Error(code) => Ok(Err(code)),
                _ => Ok(Err(ErrorCode::Value)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(formula: &str) -> FormulaValue {
        evaluate_formula(formula, &EmptyResolver).unwrap()
    }

    fn eval_with(formula: &str, resolver: &MapResolver) -> FormulaValue {
        evaluate_formula(formula, resolver).unwrap()
    }

    // -- Arithmetic --

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(eval("=1+2*3"), FormulaValue::Number(7.0));
        assert_eq!(eval("(1+2)*3"), FormulaValue::Number(9.0));
        assert_eq!(eval("2^10"), FormulaValue::Number(1024.0));
        assert_eq!(eval("10/4"), FormulaValue::Number(2.5));
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval("-5+3"), FormulaValue::Number(-2.0));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("1/0"), FormulaValue::Error(ErrorCode::Div0));
    }

    #[test]
    fn test_numeric_coercion_failure_is_value_error() {
        assert_eq!(eval("1+\"abc\""), FormulaValue::Error(ErrorCode::Value));
        // Numeric strings coerce.
        assert_eq!(eval("1+\"2\""), FormulaValue::Number(3.0));
        // Booleans coerce to 0/1.
        assert_eq!(eval("TRUE+TRUE"), FormulaValue::Number(2.0));
    }

    #[test]
    fn test_empty_operand_fails_numeric_coercion() {
        assert_eq!(eval_with("A1+1", &MapResolver::new()), FormulaValue::Error(ErrorCode::Value));
    }

    // -- Errors --

    #[test]
    fn test_error_literal_propagates() {
        assert_eq!(eval("1+#DIV/0!"), FormulaValue::Error(ErrorCode::Div0));
    }

    #[test]
    fn test_first_error_wins() {
        assert_eq!(eval("#REF!+#NUM!"), FormulaValue::Error(ErrorCode::Ref));
    }

    #[test]
    fn test_unknown_function_is_name_error() {
        assert_eq!(eval("NOSUCHFN(1)"), FormulaValue::Error(ErrorCode::Name));
    }

    // -- Comparison and concat --

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("1<2"), FormulaValue::Bool(true));
        assert_eq!(eval("2<=2"), FormulaValue::Bool(true));
        assert_eq!(eval("3<>3"), FormulaValue::Bool(false));
        assert_eq!(eval("\"abc\"=\"ABC\""), FormulaValue::Bool(true));
        assert_eq!(eval("\"abc\"<\"abd\""), FormulaValue::Bool(true));
    }

    #[test]
    fn test_concat() {
        assert_eq!(
            eval("\"n=\"&42"),
            FormulaValue::Text("n=42".to_string())
        );
        assert_eq!(
            eval("1&2&3"),
            FormulaValue::Text("123".to_string())
        );
    }

    // -- Cells and ranges --

    #[test]
    fn test_cell_resolution() {
        let mut cells = MapResolver::new();
        cells.set_number("A1", 5.0).unwrap();
        cells.set_number("B1", 3.0).unwrap();
        assert_eq!(eval_with("A1*B1+2", &cells), FormulaValue::Number(17.0));
        assert_eq!(eval_with("Z99", &cells), FormulaValue::Empty);
    }

    #[test]
    fn test_sum_over_range_skips_empty() {
        let mut cells = MapResolver::new();
        cells.set_number("A1", 1.0).unwrap();
        cells.set_number("A2", 2.0).unwrap();
        cells.set_number("A3", 3.0).unwrap();
        assert_eq!(eval_with("SUM(A1:A3)", &cells), FormulaValue::Number(6.0));

        let mut sparse = MapResolver::new();
        sparse.set_number("A1", 1.0).unwrap();
        sparse.set_number("A3", 3.0).unwrap();
        assert_eq!(eval_with("SUM(A1:A3)", &sparse), FormulaValue::Number(4.0));
    }

    #[test]
    fn test_range_in_scalar_context_takes_first_cell() {
        let mut cells = MapResolver::new();
        cells.set_number("A1", 9.0).unwrap();
        cells.set_number("A2", 1.0).unwrap();
        assert_eq!(eval_with("A1:A2+1", &cells), FormulaValue::Number(10.0));
    }

    #[test]
    fn test_array_literal_evaluates() {
        let value = eval("{1,2; 3,4}");
        let FormulaValue::Array(rows) = value else {
            panic!("expected array");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![FormulaValue::Number(1.0), FormulaValue::Number(2.0)]);
    }

    #[test]
    fn test_max_depth_guard() {
        let mut formula = String::new();
        for _ in 0..300 {
            formula.push('(');
        }
        formula.push('1');
        for _ in 0..300 {
            formula.push(')');
        }
        let err = evaluate_formula(&formula, &EmptyResolver).unwrap_err();
        assert!(matches!(err, FormulaError::EvaluationError(_)));
    }

    #[test]
    fn test_collect_numbers_propagates_range_errors() {
        let mut cells = MapResolver::new();
        cells.set_number("A1", 1.0).unwrap();
        cells
            .set("A2", FormulaValue::Error(ErrorCode::Div0))
            .unwrap();
        assert_eq!(
            eval_with("SUM(A1:A2)", &cells),
            FormulaValue::Error(ErrorCode::Div0)
        );
    }
}
