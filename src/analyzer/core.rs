use thiserror::Error;

use crate::ast::Location;
use crate::error::Diagnostic;
use crate::tokenizer::{Keyword, Symbol, Token, TokenKind};

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            hint: None,
        }
    }

    pub fn at(message: impl Into<String>, location: Location) -> Self {
        Self::new(message, location.line, location.column)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Diagnostic for ParseError {
    fn message(&self) -> String {
        self.message.clone()
    }

    fn location(&self) -> Option<Location> {
        Some(Location::new(self.line, self.column))
    }

    fn hint(&self) -> Option<String> {
        self.hint.clone()
    }
}

/// Recursive descent parser over a token stream.
///
/// The grammar lives in [`super::parsers`] as `impl Parser` blocks, one file
/// per area. This file only holds the cursor and the small helpers they share.
/// Every helper fails fast: the first mismatch becomes a [`ParseError`]
/// pointing at the offending token.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let (line, column) = tokens
                .last()
                .map(|t| (t.line, t.column + t.text.chars().count()))
                .unwrap_or((1, 1));
            tokens.push(Token::new(TokenKind::Eof, "", line, column));
        }
        Self { tokens, pos: 0 }
    }

    // Token helpers

    pub fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    pub fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    pub fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub fn location(&self) -> Location {
        self.peek().location()
    }

    pub fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub fn at_symbol(&self, symbol: Symbol) -> bool {
        self.peek().is_symbol(symbol)
    }

    pub fn at_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_keyword(keyword)
    }

    /// True when the next token is the bare identifier `word`.
    pub fn at_word(&self, word: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Identifier(name) if name == word)
    }

    pub fn at_eof(&self) -> bool {
        *self.peek_kind() == TokenKind::Eof
    }

    /// Newline, the end of an enclosing block, or the end of input.
    pub fn at_line_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof
        )
    }

    /// True when the token at `offset` can be read as a name.
    pub fn is_name_at(&self, offset: usize) -> bool {
        matches!(
            self.peek_at(offset).kind,
            TokenKind::Identifier(_) | TokenKind::Keyword(_)
        )
    }

    pub fn eat_symbol(&mut self, symbol: Symbol) -> bool {
        if self.at_symbol(symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_symbol(&mut self, symbol: Symbol) -> ParseResult<Token> {
        if self.at_symbol(symbol) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", symbol)))
        }
    }

    pub fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<Token> {
        if self.at_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", keyword)))
        }
    }

    pub fn expect_word(&mut self, word: &str) -> ParseResult<Token> {
        if self.at_word(word) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", word)))
        }
    }

    pub fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.peek_kind() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// An identifier or a keyword used as a plain name (`on:`, `off:`).
    pub fn expect_name(&mut self) -> ParseResult<String> {
        if self.is_name_at(0) {
            Ok(self.advance().text)
        } else {
            Err(self.unexpected("name"))
        }
    }

    /// `name(.name)*`
    pub fn expect_dotted_name(&mut self) -> ParseResult<String> {
        let mut name = self.expect_name()?;
        while self.at_symbol(Symbol::Dot) && self.is_name_at(1) {
            self.advance();
            name.push('.');
            name.push_str(&self.expect_name()?);
        }
        Ok(name)
    }

    /// Event names are dotted names or strings (`"scenario:start"`).
    pub fn expect_event_name(&mut self) -> ParseResult<String> {
        if let TokenKind::String(name) = self.peek_kind() {
            let name = name.clone();
            self.advance();
            return Ok(name);
        }
        self.expect_dotted_name()
            .map_err(|e| e.with_hint("event names are names like door.opened or strings like \"scenario:start\""))
    }

    pub fn expect_line_end(&mut self) -> ParseResult<()> {
        match self.peek_kind() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Dedent | TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    pub fn skip_newlines(&mut self) {
        while *self.peek_kind() == TokenKind::Newline {
            self.advance();
        }
    }

    /// Parses `NEWLINE INDENT item* DEDENT`; the `:` before it has already
    /// been consumed. Each item parser consumes its own line end.
    pub fn parse_block<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Vec<T>> {
        self.expect_block_start()?;
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek_kind() {
                TokenKind::Dedent => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => break,
                _ => items.push(item(self)?),
            }
        }
        Ok(items)
    }

    fn expect_block_start(&mut self) -> ParseResult<()> {
        if *self.peek_kind() != TokenKind::Newline {
            return Err(self.unexpected("end of line before block"));
        }
        self.advance();
        self.skip_newlines();
        if *self.peek_kind() != TokenKind::Indent {
            return Err(self
                .unexpected("indented block")
                .with_hint("indent the lines that belong to this block"));
        }
        self.advance();
        Ok(())
    }

    /// True when a `:` is followed by the end of the line, i.e. a block.
    pub fn at_block_colon(&self) -> bool {
        self.at_symbol(Symbol::Colon) && self.peek_at(1).kind == TokenKind::Newline
    }

    // Errors

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::at(message, self.location())
    }

    pub fn unexpected(&self, expected: &str) -> ParseError {
        let error = self.error(format!(
            "expected {} but found {}",
            expected,
            self.peek().describe()
        ));
        tracing::debug!("{}", error);
        error
    }
}
