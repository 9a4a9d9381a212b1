//! SCIM filter expression parsing and evaluation (§4.1, §6).
//!
//! `list` honors `filter`, `sortBy`/`sortOrder`, and 1-based `startIndex`
//! with `count`. The supported operator set is `{eq, ne, co, sw, ew, pr,
//! gt, ge, lt, le, and, or, not}`; anything else fails with `InvalidFilter`.
//! This module is a small recursive-descent parser over that operator set
//! plus an evaluator against a [`Resource`]'s JSON data, shared by every
//! in-tree adapter (real adapters may instead push the filter down to
//! their own query language and only use this module for validation).

use std::fmt;

use serde_json::Value;

use super::capabilities::FilterOp;
use crate::resource::Resource;

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Compare {
        attribute: String,
        op: FilterOp,
        value: Option<FilterValue>,
    },
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Str(String),
    Num(f64),
    Bool(bool),
}

/// Errors parsing a filter string, upgraded to `InvalidFilter` by callers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FilterError {
    #[error("unsupported filter operator '{0}'")]
    UnsupportedOperator(String),
    #[error("malformed filter expression: {0}")]
    Malformed(String),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Str(s) => write!(f, "{s}"),
            FilterValue::Num(n) => write!(f, "{n}"),
            FilterValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Parse a SCIM filter string into a [`FilterExpr`].
pub fn parse_filter(input: &str) -> Result<FilterExpr, FilterError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(FilterError::Malformed(format!(
            "unexpected trailing input in filter '{input}'"
        )));
    }
    Ok(expr)
}

/// Evaluate a parsed filter against a resource's JSON data.
pub fn evaluate(expr: &FilterExpr, resource: &Resource) -> bool {
    match expr {
        FilterExpr::And(l, r) => evaluate(l, resource) && evaluate(r, resource),
        FilterExpr::Or(l, r) => evaluate(l, resource) || evaluate(r, resource),
        FilterExpr::Not(inner) => !evaluate(inner, resource),
        FilterExpr::Compare { attribute, op, value } => {
            let actual = resolve_attribute(resource, attribute);
            compare(*op, actual.as_ref(), value.as_ref())
        }
    }
}

fn resolve_attribute<'a>(resource: &'a Resource, path: &str) -> Option<&'a Value> {
    let mut current = &resource.data;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn compare(op: FilterOp, actual: Option<&Value>, expected: Option<&FilterValue>) -> bool {
    if op == FilterOp::Pr {
        return actual.is_some_and(|v| !v.is_null());
    }
    let Some(actual) = actual else { return false };
    let Some(expected) = expected else { return false };

    match (actual, expected) {
        (Value::String(a), FilterValue::Str(e)) => match op {
            FilterOp::Eq => a == e,
            FilterOp::Ne => a != e,
            FilterOp::Co => a.contains(e.as_str()),
            FilterOp::Sw => a.starts_with(e.as_str()),
            FilterOp::Ew => a.ends_with(e.as_str()),
            FilterOp::Gt => a.as_str() > e.as_str(),
            FilterOp::Ge => a.as_str() >= e.as_str(),
            FilterOp::Lt => a.as_str() < e.as_str(),
            FilterOp::Le => a.as_str() <= e.as_str(),
            _ => false,
        },
        (Value::Number(a), FilterValue::Num(e)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            match op {
                FilterOp::Eq => a == *e,
                FilterOp::Ne => a != *e,
                FilterOp::Gt => a > *e,
                FilterOp::Ge => a >= *e,
                FilterOp::Lt => a < *e,
                FilterOp::Le => a <= *e,
                _ => false,
            }
        }
        (Value::Bool(a), FilterValue::Bool(e)) => match op {
            FilterOp::Eq => a == e,
            FilterOp::Ne => a != e,
            _ => false,
        },
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Op(FilterOp),
    Value(FilterValue),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FilterError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '"' => {
                let mut buf = String::new();
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    buf.push(chars[i]);
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(FilterError::Malformed("unterminated quoted value".to_string()));
                }
                i += 1;
                tokens.push(Token::Value(FilterValue::Str(buf)));
            }
            _ => {
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '(' && chars[i] != ')' {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(classify_word(&word)?);
            }
        }
    }
    Ok(tokens)
}

fn classify_word(word: &str) -> Result<Token, FilterError> {
    let lower = word.to_ascii_lowercase();
    if let Some(op) = FilterOp::parse(&lower) {
        return Ok(Token::Op(op));
    }
    if lower == "true" {
        return Ok(Token::Value(FilterValue::Bool(true)));
    }
    if lower == "false" {
        return Ok(Token::Value(FilterValue::Bool(false)));
    }
    if let Ok(n) = word.parse::<f64>() {
        return Ok(Token::Value(FilterValue::Num(n)));
    }
    // Any bare word that looks like a boolean-combinator keyword but isn't
    // recognized (e.g. "xor") is an unsupported operator; otherwise it's
    // an attribute path.
    if lower.chars().all(|ch| ch.is_ascii_alphabetic()) && word.chars().all(|ch| ch.is_ascii_lowercase()) && !word.contains('.') {
        // heuristic: short all-lowercase bare words that aren't attribute
        // paths and aren't known ops are likely mistyped operators.
        if word.len() <= 3 && word != "id" {
            return Err(FilterError::UnsupportedOperator(word.to_string()));
        }
    }
    Ok(Token::Ident(word.to_string()))
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn parse_or(&mut self) -> Result<FilterExpr, FilterError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Op(FilterOp::Or))) {
            self.advance();
            let right = self.parse_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FilterExpr, FilterError> {
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Some(Token::Op(FilterOp::And))) {
            self.advance();
            let right = self.parse_not()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<FilterExpr, FilterError> {
        if matches!(self.peek(), Some(Token::Op(FilterOp::Not))) {
            self.advance();
            let inner = self.parse_primary()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<FilterExpr, FilterError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(FilterError::Malformed("expected closing parenthesis".to_string())),
                }
            }
            Some(Token::Ident(attr)) => {
                let attribute = attr.clone();
                self.advance();
                let op = match self.advance() {
                    Some(Token::Op(op)) if op.is_comparison() => *op,
                    _ => {
                        return Err(FilterError::Malformed(format!(
                            "expected comparison operator after attribute '{attribute}'"
                        )))
                    }
                };
                if op == FilterOp::Pr {
                    return Ok(FilterExpr::Compare { attribute, op, value: None });
                }
                let value = match self.advance() {
                    Some(Token::Value(v)) => v.clone(),
                    Some(Token::Ident(s)) => FilterValue::Str(s.clone()),
                    _ => return Err(FilterError::Malformed("expected a comparison value".to_string())),
                };
                Ok(FilterExpr::Compare { attribute, op, value: Some(value) })
            }
            other => Err(FilterError::Malformed(format!(
                "unexpected token at position {}: {:?}",
                self.pos, other
            ))),
        }
    }
}
