//! Unit expression evaluator.
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('*' | '/') term)*
//! term   := factor ('**' exponent)?
//! factor := IDENT | NUMBER | '(' expr ')'
//! exponent := ('+' | '-')? NUMBER | '(' ('+' | '-')? NUMBER ')'
//! ```
//!
//! Identifiers resolve to atoms; `dimensionless` is the empty composition.

use crate::dimension::{Atom, Dimensionality, Reference};
use crate::error::{QuantityError, Result};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Star,
    Slash,
    Pow,
    Plus,
    Minus,
    LParen,
    RParen,
}

/// Whether `s` can be used as a unit name, symbol, or alias.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '*' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '*'))) {
                    chars.next();
                    tokens.push(Token::Pow);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            c if c.is_ascii_digit() || c == '.' => {
                let end = number_end(expr, start);
                let text = &expr[start..end];
                let value = text.parse::<f64>().map_err(|_| {
                    QuantityError::invalid_expression(expr, format!("bad number \"{text}\""))
                })?;
                tokens.push(Token::Number(value));
                while matches!(chars.peek(), Some(&(i, _)) if i < end) {
                    chars.next();
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if !(c.is_alphanumeric() || c == '_') {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Ident(expr[start..end].to_string()));
            }
            other => {
                return Err(QuantityError::invalid_expression(
                    expr,
                    format!("unexpected character '{other}'"),
                ))
            }
        }
    }

    Ok(tokens)
}

/// Byte offset one past the numeric literal starting at `start`.
///
/// An `e` only continues the literal when digits follow it, so `2e` is the number 2
/// followed by the identifier `e`.
fn number_end(expr: &str, start: usize) -> usize {
    let bytes = expr.as_bytes();
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                exp += 1;
            }
            end = exp;
        }
    }
    end
}

struct Parser<'a, F> {
    expr: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    resolve: F,
}

impl<F> Parser<'_, F>
where
    F: Fn(&str) -> Option<Atom>,
{
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, reason: impl Into<String>) -> QuantityError {
        QuantityError::invalid_expression(self.expr, reason)
    }

    fn expr(&mut self) -> Result<Reference> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    acc = Reference {
                        factor: acc.factor * rhs.factor,
                        dims: acc.dims.mul(&rhs.dims),
                    };
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    acc = Reference {
                        factor: acc.factor / rhs.factor,
                        dims: acc.dims.div(&rhs.dims),
                    };
                }
                _ => return Ok(acc),
            }
        }
    }

    fn term(&mut self) -> Result<Reference> {
        let base = self.factor()?;
        if self.peek() != Some(&Token::Pow) {
            return Ok(base);
        }
        self.pos += 1;
        let exp = self.exponent()?;
        Ok(Reference {
            factor: base.factor.powf(exp),
            dims: base.dims.powf(exp),
        })
    }

    fn exponent(&mut self) -> Result<f64> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let exp = self.signed_number()?;
            return match self.next() {
                Some(Token::RParen) => Ok(exp),
                _ => Err(self.error("expected ')' after exponent")),
            };
        }
        self.signed_number()
    }

    fn signed_number(&mut self) -> Result<f64> {
        let sign = match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                -1.0
            }
            Some(Token::Plus) => {
                self.pos += 1;
                1.0
            }
            _ => 1.0,
        };
        match self.next() {
            Some(Token::Number(value)) if value.is_finite() => Ok(sign * value),
            Some(Token::Number(_)) => Err(self.error("exponent must be finite")),
            _ => Err(self.error("exponent must be a number")),
        }
    }

    fn factor(&mut self) -> Result<Reference> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Reference::scalar(value)),
            Some(Token::Ident(name)) if name == "dimensionless" => Ok(Reference::scalar(1.0)),
            Some(Token::Ident(name)) => match (self.resolve)(&name) {
                Some(atom) => Ok(Reference {
                    factor: 1.0,
                    dims: Dimensionality::from_atom(atom),
                }),
                None => Err(QuantityError::UnknownUnit(name)),
            },
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("unbalanced parentheses")),
                }
            }
            Some(token) => Err(self.error(format!("unexpected {token:?}"))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

/// Evaluates `expr` to a factor and a composition of the atoms `resolve` returns.
///
/// Atoms are kept as written; call [`Reference::simplified`] to reduce to base units.
pub(crate) fn evaluate<F>(expr: &str, resolve: F) -> Result<Reference>
where
    F: Fn(&str) -> Option<Atom>,
{
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(QuantityError::invalid_expression(expr, "empty expression"));
    }

    let mut parser = Parser {
        expr,
        tokens,
        pos: 0,
        resolve,
    };
    let reference = parser.expr()?;
    match parser.peek() {
        None => Ok(reference),
        Some(token) => Err(parser.error(format!("unexpected trailing {token:?}"))),
    }
}
