//! nom-based formula tokenizer.
//!
//! Input is trimmed and a leading `=` stripped. Identifier runs (letters,
//! digits, `$`, `.`) are classified on the fly: a run followed by `:` and a
//! second reference becomes a range token, a run followed by `(` becomes a
//! function token, a run that parses as a cell reference becomes a cell
//! token, and anything else is left as a function token for the parser to
//! judge.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    combinator::{opt, recognize},
    sequence::pair,
    IResult,
};

use gridbook_xml::cell_ref::CellRef;

use crate::error::{FormulaError, FormulaResult};
use crate::formula::value::ErrorCode;

/// Binary operators, lowest-to-highest precedence tiers:
/// comparison, additive (`+ - &`), multiplicative, power.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Concat => "&",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

/// One lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    CellRef(CellRef),
    Range(CellRef, CellRef),
    Function(String),
    ErrorLit(ErrorCode),
    Op(BinaryOp),
    LParen,
    RParen,
    Comma,
    LBrace,
    RBrace,
    Semicolon,
}

/// Tokenize a formula string. The leading `=` is stripped if present.
pub fn tokenize(input: &str) -> FormulaResult<Vec<Token>> {
    let mut rest = input.trim();
    rest = rest.strip_prefix('=').unwrap_or(rest).trim_start();
    if rest.is_empty() {
        return Err(FormulaError::EmptyFormula);
    }

    let mut tokens = Vec::new();
    while !rest.is_empty() {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let (next, token) = next_token(rest)?;
        tokens.push(token);
        rest = next;
    }
    Ok(tokens)
}

fn next_token(input: &str) -> FormulaResult<(&str, Token)> {
    if let Ok((rest, token)) = simple_token(input) {
        return Ok((rest, token));
    }
    if let Ok((rest, token)) = number_token(input) {
        return Ok((rest, token));
    }
    if let Ok((rest, token)) = string_token(input) {
        return Ok((rest, token));
    }
    if let Ok((rest, token)) = error_token(input) {
        return Ok((rest, token));
    }
    if let Ok((rest, token)) = identifier_token(input) {
        return Ok((rest, token));
    }
    let offending: String = input.chars().take(1).collect();
    Err(FormulaError::UnexpectedToken(offending))
}

/// Operators and punctuation. Two-character operators must win over their
/// one-character prefixes.
fn simple_token(input: &str) -> IResult<&str, Token> {
    use BinaryOp::*;
    let (rest, matched) = alt((
        tag("<="),
        tag(">="),
        tag("<>"),
        tag("="),
        tag("<"),
        tag(">"),
        tag("+"),
        tag("-"),
        tag("*"),
        tag("/"),
        tag("^"),
        tag("&"),
        tag("("),
        tag(")"),
        tag(","),
        tag("{"),
        tag("}"),
        tag(";"),
    ))(input)?;
    let token = match matched {
        "<=" => Token::Op(Le),
        ">=" => Token::Op(Ge),
        "<>" => Token::Op(Ne),
        "=" => Token::Op(Eq),
        "<" => Token::Op(Lt),
        ">" => Token::Op(Gt),
        "+" => Token::Op(Add),
        "-" => Token::Op(Sub),
        "*" => Token::Op(Mul),
        "/" => Token::Op(Div),
        "^" => Token::Op(Pow),
        "&" => Token::Op(Concat),
        "(" => Token::LParen,
        ")" => Token::RParen,
        "," => Token::Comma,
        "{" => Token::LBrace,
        "}" => Token::RBrace,
        ";" => Token::Semicolon,
        _ => unreachable!(),
    };
    Ok((rest, token))
}

/// Integer or decimal literal.
fn number_token(input: &str) -> IResult<&str, Token> {
    let (rest, text) = recognize(pair(
        take_while1(|c: char| c.is_ascii_digit()),
        opt(pair(tag("."), take_while1(|c: char| c.is_ascii_digit()))),
    ))(input)?;
    let n: f64 = text.parse().map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float))
    })?;
    Ok((rest, Token::Number(n)))
}

/// Quoted string; no escape processing beyond the delimiters.
fn string_token(input: &str) -> IResult<&str, Token> {
    let (rest, _) = tag::<_, _, nom::error::Error<&str>>("\"")(input)?;
    match rest.find('"') {
        Some(end) => Ok((&rest[end + 1..], Token::Str(rest[..end].to_string()))),
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        ))),
    }
}

/// A `#...` error literal.
fn error_token(input: &str) -> IResult<&str, Token> {
    let (rest, matched) = alt((
        tag("#DIV/0!"),
        tag("#VALUE!"),
        tag("#REF!"),
        tag("#NAME?"),
        tag("#NUM!"),
        tag("#NULL!"),
        tag("#N/A"),
    ))(input)?;
    let code = ErrorCode::parse(matched).expect("literal matches known code");
    Ok((rest, Token::ErrorLit(code)))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '$' || c == '.')(input)
}

/// An identifier run, classified by what follows it.
fn identifier_token(input: &str) -> IResult<&str, Token> {
    let (rest, name) = identifier(input)?;

    // `A1:B10` -> one range token.
    if let Some(after_colon) = rest.strip_prefix(':') {
        if let Ok((tail, end_name)) = identifier(after_colon) {
            if let (Ok(start), Ok(end)) = (CellRef::parse(name), CellRef::parse(end_name)) {
                return Ok((tail, Token::Range(start, end)));
            }
        }
    }

    // A call site keeps the name as a function token.
    if rest.trim_start().starts_with('(') {
        return Ok((rest, Token::Function(name.to_uppercase())));
    }

    if let Ok(cell) = CellRef::parse(name) {
        return Ok((rest, Token::CellRef(cell)));
    }

    // Not a reference: leave classification to the parser.
    Ok((rest, Token::Function(name.to_uppercase())))
}
