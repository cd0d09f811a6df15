//! # Symbol Tokens
//!
//! Punctuation and operators of the stage language. Symbols are matched
//! longest-first so that `..`, `==`, `!=`, `<=`, `>=` and `->` win over their
//! single-character prefixes.

use nom::{
    branch::alt,
    bytes::complete::tag,
    combinator::value,
    error::context,
};
use strum_macros::{AsRefStr, Display, EnumString};

use super::token::ScanResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
pub enum Symbol {
    #[strum(serialize = "(")]
    LeftParen,
    #[strum(serialize = ")")]
    RightParen,
    #[strum(serialize = "[")]
    LeftBracket,
    #[strum(serialize = "]")]
    RightBracket,
    #[strum(serialize = "{")]
    LeftBrace,
    #[strum(serialize = "}")]
    RightBrace,
    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = ".")]
    Dot,
    #[strum(serialize = "..")]
    DotDot,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Star,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "@")]
    At,
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "==")]
    EqualEqual,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "->")]
    Arrow,
    #[strum(serialize = "$")]
    Dollar,
}

impl Symbol {
    /// Opening brackets suspend indentation tracking until closed.
    pub fn opens_group(&self) -> bool {
        matches!(self, Symbol::LeftParen | Symbol::LeftBracket | Symbol::LeftBrace)
    }

    pub fn closes_group(&self) -> bool {
        matches!(
            self,
            Symbol::RightParen | Symbol::RightBracket | Symbol::RightBrace
        )
    }
}

pub fn parse_symbol(input: &str) -> ScanResult<Symbol> {
    context(
        "symbol",
        alt((
            alt((
                value(Symbol::DotDot, tag("..")),
                value(Symbol::EqualEqual, tag("==")),
                value(Symbol::NotEqual, tag("!=")),
                value(Symbol::LessEqual, tag("<=")),
                value(Symbol::GreaterEqual, tag(">=")),
                value(Symbol::Arrow, tag("->")),
            )),
            alt((
                value(Symbol::LeftParen, tag("(")),
                value(Symbol::RightParen, tag(")")),
                value(Symbol::LeftBracket, tag("[")),
                value(Symbol::RightBracket, tag("]")),
                value(Symbol::LeftBrace, tag("{")),
                value(Symbol::RightBrace, tag("}")),
                value(Symbol::Comma, tag(",")),
                value(Symbol::Colon, tag(":")),
                value(Symbol::Dot, tag(".")),
                value(Symbol::Plus, tag("+")),
                value(Symbol::Minus, tag("-")),
                value(Symbol::Star, tag("*")),
                value(Symbol::Slash, tag("/")),
                value(Symbol::At, tag("@")),
                value(Symbol::Assign, tag("=")),
                value(Symbol::Less, tag("<")),
                value(Symbol::Greater, tag(">")),
                value(Symbol::Dollar, tag("$")),
            )),
        )),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_match() {
        assert_eq!(parse_symbol("..5").unwrap(), ("5", Symbol::DotDot));
        assert_eq!(parse_symbol("->x").unwrap(), ("x", Symbol::Arrow));
        assert_eq!(parse_symbol("<= 3").unwrap(), (" 3", Symbol::LessEqual));
        assert_eq!(parse_symbol("= 3").unwrap(), (" 3", Symbol::Assign));
        assert_eq!(parse_symbol("-1").unwrap(), ("1", Symbol::Minus));
    }

    #[test]
    fn test_not_a_symbol() {
        assert!(parse_symbol("!").is_err());
        assert!(parse_symbol("abc").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Symbol::NotEqual.to_string(), "!=");
        assert_eq!(Symbol::Dollar.to_string(), "$");
    }
}
