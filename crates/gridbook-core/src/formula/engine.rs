//! The recalculation engine.
//!
//! Combines the parser, the evaluator, and the dependency graph into a
//! stateful cell store: plain values and formulas go in, and every change
//! re-evaluates exactly the affected formulas in topological order.

use std::collections::HashMap;

use gridbook_xml::cell_ref::CellRef;

use crate::error::{FormulaError, FormulaResult};
use crate::formula::eval::{evaluate, CellResolver};
use crate::formula::graph::DependencyGraph;
use crate::formula::parser::{parse_formula, Expr};
use crate::formula::value::FormulaValue;

/// A live store of cell values and formulas with automatic recalculation.
#[derive(Default)]
pub struct FormulaEngine {
    /// Plain (non-formula) cell values.
    values: HashMap<CellRef, FormulaValue>,
    /// Parsed formulas by cell.
    formulas: HashMap<CellRef, Expr>,
    /// Last evaluation result per formula cell.
    results: HashMap<CellRef, FormulaValue>,
    graph: DependencyGraph,
}

impl FormulaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current value of a cell: a formula cell answers its last
    /// evaluation result, anything else its stored value.
    pub fn value(&self, cell: &CellRef) -> FormulaValue {
        if let Some(result) = self.results.get(cell) {
            return result.clone();
        }
        self.values.get(cell).cloned().unwrap_or(FormulaValue::Empty)
    }

    /// The formula expression held by a cell, if any.
    pub fn formula(&self, cell: &CellRef) -> Option<&Expr> {
        self.formulas.get(cell)
    }

    /// Store a plain value and recalculate everything depending on the
    /// cell. Returns the recalculated cells in evaluation order.
    pub fn set_value(&mut self, cell: CellRef, value: FormulaValue) -> FormulaResult<Vec<CellRef>> {
        self.formulas.remove(&cell);
        self.results.remove(&cell);
        self.graph.remove_formula(&cell);
        self.values.insert(cell, value);
        self.recalculate(&[cell])
    }

    /// Parse and store a formula (leading `=` optional), then evaluate it
    /// and everything downstream. Introducing a cycle rolls the formula
    /// back and surfaces `circularReference`.
    pub fn set_formula(&mut self, cell: CellRef, formula: &str) -> FormulaResult<Vec<CellRef>> {
        let expr = parse_formula(formula)?;
        let refs = expr.references();

        let previous = self.formulas.get(&cell).cloned();
        self.graph.add_formula(cell, &refs);
        if let Err(err) = self.graph.recalculation_order(&[cell]) {
            // Restore the prior edges before reporting the cycle.
            match &previous {
                Some(expr) => self.graph.add_formula(cell, &expr.references()),
                None => self.graph.remove_formula(&cell),
            }
            return Err(err);
        }

        self.values.remove(&cell);
        self.formulas.insert(cell, expr);
        self.recalculate(&[cell])
    }

    /// Clear a cell entirely and recalculate its dependents.
    pub fn clear(&mut self, cell: CellRef) -> FormulaResult<Vec<CellRef>> {
        self.values.remove(&cell);
        self.formulas.remove(&cell);
        self.results.remove(&cell);
        self.graph.remove_formula(&cell);
        self.recalculate(&[cell])
    }

    /// Whether evaluating any of the given cells would loop.
    pub fn has_circular_reference(&self, cells: &[CellRef]) -> bool {
        self.graph.has_circular_reference(cells)
    }

    /// Re-evaluate the transitive dependents of the changed cells in
    /// topological order, returning the cells that were recalculated.
    fn recalculate(&mut self, changed: &[CellRef]) -> FormulaResult<Vec<CellRef>> {
        let order = self.graph.recalculation_order(changed)?;
        for cell in &order {
            let Some(expr) = self.formulas.get(cell).cloned() else {
                continue;
            };
            let result = {
                let view = EngineView {
                    values: &self.values,
                    results: &self.results,
                };
                evaluate(&expr, &view)?
            };
            self.results.insert(*cell, result);
        }
        Ok(order)
    }

    /// Evaluate a one-off formula against the engine's current state
    /// without storing it.
    pub fn evaluate(&self, formula: &str) -> FormulaResult<FormulaValue> {
        let expr = parse_formula(formula)?;
        let view = EngineView {
            values: &self.values,
            results: &self.results,
        };
        evaluate(&expr, &view)
    }

    /// Convenience: parse a reference and store a plain value.
    pub fn set(&mut self, reference: &str, value: FormulaValue) -> FormulaResult<Vec<CellRef>> {
        let cell = CellRef::parse(reference)
            .map_err(|_| FormulaError::InvalidCellReference(reference.to_string()))?;
        self.set_value(cell, value)
    }
}

/// Immutable view the evaluator reads while results are being rebuilt.
struct EngineView<'a> {
    values: &'a HashMap<CellRef, FormulaValue>,
    results: &'a HashMap<CellRef, FormulaValue>,
}

impl CellResolver for EngineView<'_> {
    fn resolve(&self, cell: &CellRef) -> FormulaValue {
        if let Some(result) = self.results.get(cell) {
            return result.clone();
        }
        self.values.get(cell).cloned().unwrap_or(FormulaValue::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> CellRef {
        CellRef::parse(s).unwrap()
    }

    fn num(n: f64) -> FormulaValue {
        FormulaValue::Number(n)
    }

    #[test]
    fn test_plain_values() {
        let mut engine = FormulaEngine::new();
        engine.set("A1", num(5.0)).unwrap();
        assert_eq!(engine.value(&cell("A1")), num(5.0));
        assert_eq!(engine.value(&cell("B9")), FormulaValue::Empty);
    }

    #[test]
    fn test_formula_evaluates_on_insert() {
        let mut engine = FormulaEngine::new();
        engine.set("A1", num(2.0)).unwrap();
        let recalculated = engine.set_formula(cell("B1"), "=A1*10").unwrap();
        assert_eq!(recalculated, vec![cell("B1")]);
        assert_eq!(engine.value(&cell("B1")), num(20.0));
    }

    #[test]
    fn test_change_propagates_through_chain() {
        let mut engine = FormulaEngine::new();
        engine.set("A1", num(1.0)).unwrap();
        engine.set_formula(cell("B1"), "A1+1").unwrap();
        engine.set_formula(cell("C1"), "B1*2").unwrap();
        engine.set_formula(cell("D1"), "A1+C1").unwrap();

        let recalculated = engine.set("A1", num(5.0)).unwrap();
        // Dependencies come before dependents.
        let pos = |c: &str| recalculated.iter().position(|x| *x == cell(c)).unwrap();
        assert!(pos("B1") < pos("C1"));
        assert!(pos("C1") < pos("D1"));

        assert_eq!(engine.value(&cell("B1")), num(6.0));
        assert_eq!(engine.value(&cell("C1")), num(12.0));
        assert_eq!(engine.value(&cell("D1")), num(17.0));
    }

    #[test]
    fn test_cycle_rolls_back() {
        let mut engine = FormulaEngine::new();
        engine.set_formula(cell("A1"), "B1+1").unwrap();
        let err = engine.set_formula(cell("B1"), "A1+1").unwrap_err();
        assert!(matches!(err, FormulaError::CircularReference { .. }));

        // The failed formula left no edges behind: B1 can still be a value.
        engine.set("B1", num(3.0)).unwrap();
        assert_eq!(engine.value(&cell("A1")), num(4.0));
        assert!(!engine.has_circular_reference(&[cell("A1")]));
    }

    #[test]
    fn test_replacing_formula_keeps_graph_consistent() {
        let mut engine = FormulaEngine::new();
        engine.set("A1", num(1.0)).unwrap();
        engine.set("Z9", num(100.0)).unwrap();
        engine.set_formula(cell("B1"), "A1+1").unwrap();
        engine.set_formula(cell("B1"), "Z9+1").unwrap();

        // A1 no longer triggers B1.
        let recalculated = engine.set("A1", num(2.0)).unwrap();
        assert!(recalculated.is_empty());
        let recalculated = engine.set("Z9", num(200.0)).unwrap();
        assert_eq!(recalculated, vec![cell("B1")]);
        assert_eq!(engine.value(&cell("B1")), num(201.0));
    }

    #[test]
    fn test_clear_removes_value_and_dependents_see_empty() {
        let mut engine = FormulaEngine::new();
        engine.set("A1", num(3.0)).unwrap();
        engine.set_formula(cell("B1"), "SUM(A1:A2)").unwrap();
        assert_eq!(engine.value(&cell("B1")), num(3.0));

        engine.clear(cell("A1")).unwrap();
        assert_eq!(engine.value(&cell("B1")), num(0.0));
        assert_eq!(engine.value(&cell("A1")), FormulaValue::Empty);
    }

    #[test]
    fn test_range_formula_recalculates_on_member_change() {
        let mut engine = FormulaEngine::new();
        engine.set("A1", num(1.0)).unwrap();
        engine.set("A2", num(2.0)).unwrap();
        engine.set("A3", num(3.0)).unwrap();
        engine.set_formula(cell("B1"), "SUM(A1:A3)").unwrap();
        assert_eq!(engine.value(&cell("B1")), num(6.0));

        engine.set("A2", num(10.0)).unwrap();
        assert_eq!(engine.value(&cell("B1")), num(14.0));
    }

    #[test]
    fn test_one_off_evaluate_reads_engine_state() {
        let mut engine = FormulaEngine::new();
        engine.set("A1", num(2.0)).unwrap();
        engine.set_formula(cell("B1"), "A1*3").unwrap();
        assert_eq!(engine.evaluate("A1+B1").unwrap(), num(8.0));
        // Nothing was stored.
        assert_eq!(engine.formula(&cell("C1")), None);
    }

    #[test]
    fn test_formula_error_values_propagate_but_do_not_fail_recalc() {
        let mut engine = FormulaEngine::new();
        engine.set("A1", num(1.0)).unwrap();
        engine.set("A2", num(0.0)).unwrap();
        engine.set_formula(cell("B1"), "A1/A2").unwrap();
        engine.set_formula(cell("C1"), "B1+1").unwrap();

        assert!(engine.value(&cell("B1")).is_error());
        assert!(engine.value(&cell("C1")).is_error());

        engine.set("A2", num(2.0)).unwrap();
        assert_eq!(engine.value(&cell("B1")), num(0.5));
        assert_eq!(engine.value(&cell("C1")), num(1.5));
    }
}
