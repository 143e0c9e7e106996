//! Recursive-descent parser for unit expressions
//!
//! Grammar:
//! ```text
//! product := power (('*' | '/' | <juxtaposition>) power)*
//! power   := atom (('^' | '**') exponent)*
//! atom    := number | name[exponent] | '(' product ')'
//! ```
//! A name may carry a trailing exponent directly (`cm3`, `m-2`). Operators
//! associate left, so `g/m^2/s` is `g m^-2 s^-1`.

use super::registry::{self, Dims, UnitDef};
use crate::error::{CaseError, Result};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name { name: String, exponent: i32 },
    Mul,
    Div,
    Pow,
    LParen,
    RParen,
}

impl Token {
    /// True if the token can end an operand
    fn ends_operand(&self) -> bool {
        matches!(self, Token::Number(_) | Token::Name { .. } | Token::RParen)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '%'
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    source: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            source,
        }
    }

    fn error(&self, reason: impl std::fmt::Display) -> CaseError {
        CaseError::units(format!("cannot parse '{}': {}", self.source, reason))
    }

    fn digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(&c) = self.chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.chars.next();
        }
        digits
    }

    fn number(&mut self, sign: Option<char>) -> Result<f64> {
        let mut text: String = sign.map(String::from).unwrap_or_default();
        text.push_str(&self.digits());
        if self.chars.peek() == Some(&'.') {
            self.chars.next();
            text.push('.');
            text.push_str(&self.digits());
        }
        // scientific notation only when digits follow the `e`
        if matches!(self.chars.peek(), Some('e' | 'E')) {
            let mut ahead = self.chars.clone();
            ahead.next();
            let signed = matches!(ahead.peek(), Some('+' | '-'));
            if signed {
                ahead.next();
            }
            if ahead.peek().is_some_and(char::is_ascii_digit) {
                text.push('e');
                self.chars.next();
                if signed {
                    text.extend(self.chars.next());
                }
                text.push_str(&self.digits());
            }
        }
        text.parse().map_err(|_| self.error(format!("bad number '{}'", text)))
    }

    fn name(&mut self) -> Result<Token> {
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if !is_name_char(c) {
                break;
            }
            name.push(c);
            self.chars.next();
        }

        let mut ahead = self.chars.clone();
        let sign = match ahead.peek() {
            Some(&c @ ('-' | '+')) => {
                ahead.next();
                Some(c)
            }
            _ => None,
        };
        let exponent = if ahead.peek().is_some_and(char::is_ascii_digit) {
            self.chars = ahead;
            let digits = self.digits();
            let value: i32 = digits
                .parse()
                .map_err(|_| self.error(format!("bad exponent '{}'", digits)))?;
            if sign == Some('-') { -value } else { value }
        } else {
            1
        };
        Ok(Token::Name { name, exponent })
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::new();
        while let Some(&c) = self.chars.peek() {
            let after_operand = tokens.last().is_some_and(Token::ends_operand);
            let token = match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                    continue;
                }
                '*' => {
                    self.chars.next();
                    if self.chars.peek() == Some(&'*') {
                        self.chars.next();
                        Token::Pow
                    } else {
                        Token::Mul
                    }
                }
                '/' => {
                    self.chars.next();
                    Token::Div
                }
                '^' => {
                    self.chars.next();
                    Token::Pow
                }
                '(' => {
                    self.chars.next();
                    Token::LParen
                }
                ')' => {
                    self.chars.next();
                    Token::RParen
                }
                '-' | '+' if !after_operand => {
                    self.chars.next();
                    Token::Number(self.number(Some(c))?)
                }
                c if c.is_ascii_digit() || c == '.' => Token::Number(self.number(None)?),
                c if is_name_char(c) => self.name()?,
                other => return Err(self.error(format!("unexpected character '{}'", other))),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// A parsed unit expression in SI terms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub factor: f64,
    pub dims: Dims,
    /// Offset of a lone offset unit such as `degC`; zero otherwise
    pub offset: f64,
}

impl Quantity {
    pub const ONE: Quantity = Quantity {
        factor: 1.0,
        dims: Dims::NONE,
        offset: 0.0,
    };

    fn from_def(def: UnitDef) -> Self {
        Self {
            factor: def.factor,
            dims: def.dims,
            offset: 0.0,
        }
    }

    pub fn mul(self, other: Quantity) -> Quantity {
        Quantity {
            factor: self.factor * other.factor,
            dims: self.dims.mul(other.dims),
            offset: 0.0,
        }
    }

    pub fn div(self, other: Quantity) -> Quantity {
        self.mul(other.powi(-1))
    }

    pub fn powi(self, n: i32) -> Quantity {
        Quantity {
            factor: self.factor.powi(n),
            dims: self.dims.powi(n),
            offset: 0.0,
        }
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn error(&self, reason: impl std::fmt::Display) -> CaseError {
        CaseError::units(format!("cannot parse '{}': {}", self.source, reason))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn product(&mut self) -> Result<Quantity> {
        let mut value = self.power()?;
        loop {
            match self.peek() {
                Some(Token::Mul) => {
                    self.next();
                    value = value.mul(self.power()?);
                }
                Some(Token::Div) => {
                    self.next();
                    value = value.div(self.power()?);
                }
                Some(Token::Number(_) | Token::Name { .. } | Token::LParen) => {
                    value = value.mul(self.power()?);
                }
                _ => return Ok(value),
            }
        }
    }

    fn power(&mut self) -> Result<Quantity> {
        let mut value = self.atom()?;
        while self.peek() == Some(&Token::Pow) {
            self.next();
            value = value.powi(self.exponent()?);
        }
        Ok(value)
    }

    fn exponent(&mut self) -> Result<i32> {
        let value = match self.next() {
            Some(Token::Number(n)) => n,
            Some(Token::LParen) => {
                let n = match self.next() {
                    Some(Token::Number(n)) => n,
                    other => return Err(self.error(format!("expected exponent, found {:?}", other))),
                };
                if self.next() != Some(Token::RParen) {
                    return Err(self.error("unclosed exponent"));
                }
                n
            }
            other => return Err(self.error(format!("expected exponent, found {:?}", other))),
        };
        if value.fract() != 0.0 || value.abs() > i32::MAX as f64 {
            return Err(self.error(format!("exponent {} is not an integer", value)));
        }
        Ok(value as i32)
    }

    fn atom(&mut self) -> Result<Quantity> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Quantity {
                factor: n,
                ..Quantity::ONE
            }),
            Some(Token::Name { name, exponent }) => {
                let def = registry::lookup(&name)
                    .ok_or_else(|| self.error(format!("unknown unit '{}'", name)))?;
                Ok(Quantity::from_def(def).powi(exponent))
            }
            Some(Token::LParen) => {
                let value = self.product()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(self.error("unbalanced parentheses")),
                }
            }
            other => Err(self.error(format!("unexpected {:?}", other))),
        }
    }
}

/// Parse a unit expression.
///
/// Offsets are kept only when the whole expression is a single offset unit
/// (`degC`, `degF`); in compound expressions such units act as intervals.
pub fn parse(source: &str) -> Result<Quantity> {
    let tokens = Lexer::new(source).tokenize()?;
    if tokens.is_empty() {
        return Ok(Quantity::ONE);
    }

    if let [Token::Name { name, exponent: 1 }] = tokens.as_slice() {
        if let Some(def) = registry::lookup(name) {
            return Ok(Quantity {
                offset: def.offset,
                ..Quantity::from_def(def)
            });
        }
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        source,
    };
    let value = parser.product()?;
    match parser.peek() {
        None => Ok(value),
        Some(token) => Err(parser.error(format!("unexpected {:?}", token))),
    }
}
