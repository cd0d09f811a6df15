//! # Tokenizer
//!
//! Turns stage source text into a flat [`Token`] stream. Indentation is
//! made explicit with synthetic `Indent`/`Dedent` tokens and every logical
//! line ends with `Newline`, so the parser never looks at whitespace.
//!
//! ## Component Structure
//!
//! * [`token`]: token types, [`LexerError`] and the [`Tokenizer`] itself
//! * [`keyword`]: reserved words
//! * [`symbol`]: punctuation and operators
//! * [`literal`]: number, duration, color, string and identifier scanners
//!
//! ## Guarantees
//!
//! Tokenizing either fails with the first [`LexerError`] or yields a stream
//! whose `Indent`/`Dedent` tokens are balanced and whose last token is `Eof`.

pub mod keyword;
pub mod literal;
pub mod symbol;
pub mod token;

pub use keyword::Keyword;
pub use symbol::Symbol;
pub use token::{LexerError, LexerResult, Token, TokenKind, Tokenizer};

/// Tokenizes `source` with a fresh [`Tokenizer`].
pub fn tokenize(source: &str) -> LexerResult<Vec<Token>> {
    Tokenizer::new().tokenize(source)
}
