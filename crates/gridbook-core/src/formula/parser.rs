//! Recursive-descent formula parser.
//!
//! Precedence climbing, lowest to highest: comparison, additive (`+ - &`),
//! multiplicative (`* /`), power (`^`), primary. All binary tiers are
//! left-associative. A unary minus in primary position is lowered to
//! `(-1) * operand`.

use gridbook_xml::cell_ref::CellRef;

use crate::error::{FormulaError, FormulaResult};
use crate::formula::token::{tokenize, BinaryOp, Token};
use crate::formula::value::ErrorCode;

/// A parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    ErrorLit(ErrorCode),
    CellRef(CellRef),
    Range(CellRef, CellRef),
    /// A rectangular array literal, row-major (`{1,2; 3,4}`).
    Array(Vec<Vec<Expr>>),
    Function {
        name: String,
        args: Vec<Expr>,
    },
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Collect every cell this expression references, ranges enumerated.
    pub fn references(&self) -> Vec<CellRef> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references(&self, out: &mut Vec<CellRef>) {
        match self {
            Expr::CellRef(cell) => out.push(*cell),
            Expr::Range(start, end) => {
                let (c0, c1) = (start.col.min(end.col), start.col.max(end.col));
                let (r0, r1) = (start.row.min(end.row), start.row.max(end.row));
                for row in r0..=r1 {
                    for col in c0..=c1 {
                        out.push(CellRef::new(col, row));
                    }
                }
            }
            Expr::Array(rows) => {
                for row in rows {
                    for item in row {
                        item.collect_references(out);
                    }
                }
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.collect_references(out);
                }
            }
            Expr::BinaryOp { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            _ => {}
        }
    }
}

/// Parse a formula string (leading `=` optional) into an expression tree.
pub fn parse_formula(input: &str) -> FormulaResult<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_comparison()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(FormulaError::UnexpectedToken(describe(tok))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    // -- Precedence tiers, lowest first --

    fn parse_comparison(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_additive()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            if !matches!(
                op,
                BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
            ) {
                break;
            }
            self.pos += 1;
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            if !matches!(op, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Concat) {
                break;
            }
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_power()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            if !matches!(op, BinaryOp::Mul | BinaryOp::Div) {
                break;
            }
            self.pos += 1;
            let right = self.parse_power()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_primary()?;
        while let Some(Token::Op(BinaryOp::Pow)) = self.peek() {
            self.pos += 1;
            let right = self.parse_primary()?;
            left = binary(BinaryOp::Pow, left, right);
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        let token = self.next().ok_or(FormulaError::UnexpectedEndOfFormula)?;
        match token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::ErrorLit(code) => Ok(Expr::ErrorLit(code)),
            Token::CellRef(cell) => Ok(Expr::CellRef(cell)),
            Token::Range(start, end) => Ok(Expr::Range(start, end)),
            // Unary minus lowers to (-1) * operand.
            Token::Op(BinaryOp::Sub) => {
                let operand = self.parse_primary()?;
                Ok(binary(BinaryOp::Mul, Expr::Number(-1.0), operand))
            }
            Token::LParen => {
                let inner = self.parse_comparison()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(tok) => Err(FormulaError::UnexpectedToken(describe(&tok))),
                    None => Err(FormulaError::ExpectedRightParen),
                }
            }
            Token::LBrace => self.parse_array(),
            Token::Function(name) => self.parse_call(name),
            other => Err(FormulaError::UnexpectedToken(describe(&other))),
        }
    }

    /// A function token: either a call, a boolean literal, or a mistake.
    fn parse_call(&mut self, name: String) -> FormulaResult<Expr> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                let mut args = Vec::new();
                if matches!(self.peek(), Some(Token::RParen)) {
                    self.pos += 1;
                    return Ok(Expr::Function { name, args });
                }
                loop {
                    args.push(self.parse_comparison()?);
                    match self.next() {
                        Some(Token::Comma) => continue,
                        Some(Token::RParen) => break,
                        Some(_) => return Err(FormulaError::ExpectedCommaOrRightParen),
                        None => return Err(FormulaError::UnexpectedEndOfFormula),
                    }
                }
                Ok(Expr::Function { name, args })
            }
            _ => match name.as_str() {
                "TRUE" => Ok(Expr::Bool(true)),
                "FALSE" => Ok(Expr::Bool(false)),
                _ => Err(FormulaError::ExpectedLeftParen),
            },
        }
    }

    /// `{row; row; ...}` where rows are comma-separated expressions.
    fn parse_array(&mut self) -> FormulaResult<Expr> {
        let mut rows: Vec<Vec<Expr>> = Vec::new();
        let mut current: Vec<Expr> = Vec::new();
        loop {
            current.push(self.parse_comparison()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::Semicolon) => {
                    rows.push(std::mem::take(&mut current));
                    continue;
                }
                Some(Token::RBrace) => {
                    rows.push(current);
                    return Ok(Expr::Array(rows));
                }
                Some(tok) => return Err(FormulaError::UnexpectedToken(describe(&tok))),
                None => return Err(FormulaError::UnexpectedEndOfFormula),
            }
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => n.to_string(),
        Token::Str(s) => format!("\"{s}\""),
        Token::CellRef(c) => c.to_string(),
        Token::Range(a, b) => format!("{a}:{b}"),
        Token::Function(name) => name.clone(),
        Token::ErrorLit(code) => code.to_string(),
        Token::Op(op) => op.symbol().to_string(),
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
        Token::Comma => ",".to_string(),
        Token::LBrace => "{".to_string(),
        Token::RBrace => "}".to_string(),
        Token::Semicolon => ";".to_string(),
    }
}
