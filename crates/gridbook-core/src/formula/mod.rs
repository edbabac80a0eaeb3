//! The formula subsystem: tokenizer, parser, evaluator, serial dates, and
//! the dependency graph driving recalculation.

pub mod engine;
pub mod eval;
pub mod functions;
pub mod graph;
pub mod parser;
pub mod serial;
pub mod token;
pub mod value;

pub use engine::FormulaEngine;
pub use eval::{evaluate, evaluate_formula, CellResolver, EmptyResolver, Evaluator, MapResolver};
pub use graph::DependencyGraph;
pub use parser::{parse_formula, Expr};
pub use token::{tokenize, BinaryOp, Token};
pub use value::{ErrorCode, FormulaValue};
