//! # Analyzer
//!
//! Recursive descent parser for stage source. [`parse`] tokenizes and parses
//! a whole module; [`parse_expression`] handles a single expression, which
//! hosts use for ad-hoc evaluation.
//!
//! Parsing is strict: there is no error recovery, and the first mismatch is
//! returned as a [`ParseError`] carrying the offending token's position.

pub mod core;
pub mod parsers;

pub use self::core::{ParseError, ParseResult, Parser};

use crate::ast::{Expression, Module};
use crate::tokenizer::{tokenize, Token};
use crate::Result;

#[tracing::instrument(level = "debug", skip(source))]
pub fn parse(source: &str) -> Result<Module> {
    let tokens = tokenize(source)?;
    Ok(parse_tokens(tokens)?)
}

pub fn parse_tokens(tokens: Vec<Token>) -> ParseResult<Module> {
    let module = Parser::new(tokens).parse_module()?;
    tracing::debug!("parsed {} definitions", module.definitions.len());
    Ok(module)
}

/// Parses `source` as exactly one expression.
pub fn parse_expression(source: &str) -> Result<Expression> {
    let mut parser = Parser::new(tokenize(source)?);
    parser.skip_newlines();
    let expression = parser.parse_expression()?;
    parser.skip_newlines();
    if !parser.at_eof() {
        return Err(parser.unexpected("end of expression").into());
    }
    Ok(expression)
}
