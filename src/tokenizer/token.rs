use nom::{error::VerboseError, IResult};
use thiserror::Error;

use super::{
    keyword::Keyword,
    literal::{
        is_identifier_char, is_identifier_start, is_valid_color_length, scan_duration_unit,
        scan_hex_run, scan_identifier, scan_number, scan_string,
    },
    symbol::{parse_symbol, Symbol},
};
use crate::ast::Location;
use crate::error::Diagnostic;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    /// Hex digits without the leading `#`.
    Color(String),
    /// Normalized to milliseconds.
    Duration(f64),
    // Words
    Identifier(String),
    Keyword(Keyword),
    // Punctuation
    Symbol(Symbol),
    // Structure
    Indent,
    Dedent,
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    pub fn is_symbol(&self, symbol: Symbol) -> bool {
        self.kind == TokenKind::Symbol(symbol)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Human readable form used in parse errors.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Indent => "indentation".to_string(),
            TokenKind::Dedent => "end of block".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Number(_) => write!(f, "NUMBER"),
            TokenKind::String(_) => write!(f, "STRING"),
            TokenKind::Boolean(_) => write!(f, "BOOLEAN"),
            TokenKind::Color(_) => write!(f, "COLOR"),
            TokenKind::Duration(_) => write!(f, "DURATION"),
            TokenKind::Identifier(_) => write!(f, "IDENTIFIER"),
            TokenKind::Keyword(_) => write!(f, "KEYWORD"),
            TokenKind::Symbol(_) => write!(f, "SYMBOL"),
            TokenKind::Indent => write!(f, "INDENT"),
            TokenKind::Dedent => write!(f, "DEDENT"),
            TokenKind::Newline => write!(f, "NEWLINE"),
            TokenKind::Eof => write!(f, "EOF"),
        }
    }
}

pub type ScanResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

pub type LexerResult<T> = Result<T, LexerError>;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at line {line}, column {column}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub hint: Option<String>,
}

impl LexerError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Diagnostic for LexerError {
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

/// What a `#` introduces at a given position.
enum HashKind<'a> {
    Color(&'a str),
    InvalidColor(&'a str),
    Comment,
}

fn classify_hash(input: &str) -> HashKind<'_> {
    match scan_hex_run(input) {
        Ok((rest, hex)) => {
            let glued = rest.chars().next().is_some_and(is_identifier_char);
            if glued {
                // `#define`, `#fade-out`: a comment that happens to start with hex.
                HashKind::Comment
            } else if is_valid_color_length(hex.len()) {
                HashKind::Color(hex)
            } else {
                HashKind::InvalidColor(hex)
            }
        }
        Err(_) => HashKind::Comment,
    }
}

fn is_blank_line(rest: &str) -> bool {
    match rest.chars().next() {
        None | Some('\n') | Some('\r') => true,
        Some('#') => matches!(classify_hash(rest), HashKind::Comment),
        _ => false,
    }
}

/// Indentation aware scanner.
///
/// The tokenizer keeps a stack of indentation widths starting at `[0]`.
/// Every logical line is measured (space = 1, tab = 2) before its first
/// token: a deeper line pushes and emits `Indent`, a shallower one pops and
/// emits one `Dedent` per level and must land exactly on an enclosing width.
/// Blank and comment-only lines never touch the stack, and inside `()`/`[]`
/// line breaks are not significant.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    current_line: usize,
    current_column: usize,
    indent_stack: Vec<usize>,
    group_depth: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            current_line: 1,   // 1-based
            current_column: 1, // 1-based
            indent_stack: vec![0],
            group_depth: 0,
        }
    }

    #[tracing::instrument(level = "debug", skip(self, input))]
    pub fn tokenize(&mut self, input: &str) -> LexerResult<Vec<Token>> {
        *self = Self::new();
        let mut tokens = Vec::new();
        let mut remaining = input;
        let mut at_line_start = true;

        loop {
            if at_line_start && self.group_depth == 0 {
                let indent_len = remaining
                    .find(|c: char| c != ' ' && c != '\t')
                    .unwrap_or(remaining.len());
                let (indent, rest) = remaining.split_at(indent_len);

                if is_blank_line(rest) {
                    let line_end = rest
                        .find('\n')
                        .map(|i| indent_len + i + 1)
                        .unwrap_or(remaining.len());
                    self.update_position(&remaining[..line_end]);
                    remaining = &remaining[line_end..];
                    if remaining.is_empty() {
                        break;
                    }
                    continue;
                }

                let width = indent
                    .chars()
                    .map(|c| if c == '\t' { 2 } else { 1 })
                    .sum();
                self.update_position(indent);
                remaining = rest;
                self.apply_indent(width, &mut tokens)?;
                at_line_start = false;
            }

            let Some(c) = remaining.chars().next() else {
                break;
            };

            let line = self.current_line;
            let column = self.current_column;

            let consumed = match c {
                '\n' => {
                    if self.group_depth == 0 {
                        tokens.push(Token::new(TokenKind::Newline, "\n", line, column));
                        at_line_start = true;
                    }
                    1
                }
                ' ' | '\t' | '\r' => remaining
                    .find(|c: char| c != ' ' && c != '\t' && c != '\r')
                    .unwrap_or(remaining.len()),
                '#' => match classify_hash(remaining) {
                    HashKind::Color(hex) => {
                        tokens.push(Token::new(
                            TokenKind::Color(hex.to_string()),
                            &remaining[..hex.len() + 1],
                            line,
                            column,
                        ));
                        hex.len() + 1
                    }
                    HashKind::InvalidColor(hex) => {
                        return Err(LexerError::new(
                            format!("invalid color literal '#{}'", hex),
                            line,
                            column,
                        )
                        .with_hint("colors use 3, 4, 6 or 8 hex digits, e.g. #ff8800"));
                    }
                    HashKind::Comment => remaining.find('\n').unwrap_or(remaining.len()),
                },
                '"' | '\'' => match scan_string(remaining) {
                    Ok((rest, raw, content)) => {
                        tokens.push(Token::new(TokenKind::String(content), raw, line, column));
                        remaining.len() - rest.len()
                    }
                    Err(_) => {
                        return Err(LexerError::new("unterminated string", line, column)
                            .with_hint(format!("close the string with {} on the same line", c)));
                    }
                },
                c if c.is_ascii_digit() => {
                    let (token, len) = self.scan_numeric(remaining, line, column)?;
                    tokens.push(token);
                    len
                }
                c if is_identifier_start(c) => {
                    let (rest, word) = scan_identifier(remaining).map_err(|_| {
                        LexerError::new(format!("unexpected character '{}'", c), line, column)
                    })?;
                    let kind = match word {
                        "true" => TokenKind::Boolean(true),
                        "false" => TokenKind::Boolean(false),
                        _ => match Keyword::try_from(word) {
                            Ok(kw) => TokenKind::Keyword(kw),
                            Err(_) => TokenKind::Identifier(word.to_string()),
                        },
                    };
                    tokens.push(Token::new(kind, word, line, column));
                    remaining.len() - rest.len()
                }
                _ => match parse_symbol(remaining) {
                    Ok((rest, symbol)) => {
                        if symbol.opens_group() {
                            self.group_depth += 1;
                        } else if symbol.closes_group() {
                            self.group_depth = self.group_depth.saturating_sub(1);
                        }
                        let len = remaining.len() - rest.len();
                        tokens.push(Token::new(
                            TokenKind::Symbol(symbol),
                            &remaining[..len],
                            line,
                            column,
                        ));
                        len
                    }
                    Err(_) => {
                        let error =
                            LexerError::new(format!("unexpected character '{}'", c), line, column);
                        tracing::error!("{}", error);
                        return Err(error);
                    }
                },
            };

            self.update_position(&remaining[..consumed]);
            remaining = &remaining[consumed..];
        }

        if !at_line_start {
            tokens.push(Token::new(
                TokenKind::Newline,
                "",
                self.current_line,
                self.current_column,
            ));
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token::new(
                TokenKind::Dedent,
                "",
                self.current_line,
                self.current_column,
            ));
        }
        tokens.push(Token::new(
            TokenKind::Eof,
            "",
            self.current_line,
            self.current_column,
        ));

        tracing::debug!("tokenized {} tokens", tokens.len());
        Ok(tokens)
    }

    fn apply_indent(&mut self, width: usize, tokens: &mut Vec<Token>) -> LexerResult<()> {
        let line = self.current_line;
        let column = self.current_column;
        let top = self.indent_stack.last().copied().unwrap_or(0);

        if width > top {
            self.indent_stack.push(width);
            tokens.push(Token::new(TokenKind::Indent, "", line, column));
        } else if width < top {
            while self.indent_stack.len() > 1
                && width < self.indent_stack.last().copied().unwrap_or(0)
            {
                self.indent_stack.pop();
                tokens.push(Token::new(TokenKind::Dedent, "", line, column));
            }
            if self.indent_stack.last().copied().unwrap_or(0) != width {
                return Err(LexerError::new("inconsistent indentation", line, column)
                    .with_hint("dedent to the same column as an enclosing block"));
            }
        }
        Ok(())
    }

    fn scan_numeric(
        &self,
        input: &str,
        line: usize,
        column: usize,
    ) -> LexerResult<(Token, usize)> {
        let invalid = |len: usize| {
            let glued: String = input[len..]
                .chars()
                .take_while(|c| is_identifier_char(*c))
                .collect();
            LexerError::new(
                format!("invalid number literal '{}{}'", &input[..len], glued),
                line,
                column,
            )
            .with_hint("durations use ms, s, m or h, e.g. 250ms")
        };

        let (rest, number) = scan_number(input)
            .map_err(|_| LexerError::new("invalid number literal", line, column))?;
        let mut len = input.len() - rest.len();
        let mut kind = TokenKind::Number(number);

        if let Ok((after_unit, multiplier)) = scan_duration_unit(rest) {
            if !after_unit.chars().next().is_some_and(is_identifier_char) {
                kind = TokenKind::Duration(number * multiplier);
                len = input.len() - after_unit.len();
            }
        }

        if input[len..].chars().next().is_some_and(is_identifier_char) {
            return Err(invalid(len));
        }

        Ok((Token::new(kind, &input[..len], line, column), len))
    }

    fn update_position(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.current_line += 1;
                self.current_column = 1;
            } else {
                self.current_column += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Tokenizer::new()
            .tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn ident(s: &str) -> TokenKind {
        TokenKind::Identifier(s.to_string())
    }

    #[test]
    fn test_simple_line() {
        assert_eq!(
            kinds("x = 1"),
            vec![
                ident("x"),
                TokenKind::Symbol(Symbol::Assign),
                TokenKind::Number(1.0),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_indent_and_dedent() {
        let source = "rule a on tick:\n  emit x\n  if y:\n    break\nrule b on tick:\n  break\n";
        let kinds = kinds(source);
        let indents = kinds.iter().filter(|k| **k == TokenKind::Indent).count();
        let dedents = kinds.iter().filter(|k| **k == TokenKind::Dedent).count();
        assert_eq!(indents, 3);
        assert_eq!(dedents, 3);
        assert_eq!(kinds.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn test_double_dedent_on_one_line() {
        let kinds = kinds("a:\n  b:\n    c\nd\n");
        let pos = kinds.iter().position(|k| *k == ident("d")).unwrap();
        assert_eq!(kinds[pos - 1], TokenKind::Dedent);
        assert_eq!(kinds[pos - 2], TokenKind::Dedent);
        assert_eq!(kinds[pos - 3], TokenKind::Newline);
    }

    #[test]
    fn test_blank_and_comment_lines_keep_indent() {
        let kinds = kinds("a:\n  b\n\n  # note\n      # deep comment\n  c\n");
        let indents = kinds.iter().filter(|k| **k == TokenKind::Indent).count();
        assert_eq!(indents, 1);
        assert!(kinds.contains(&ident("c")));
    }

    #[test]
    fn test_tab_counts_two() {
        let kinds = kinds("a:\n\tb\n  c\n");
        // tab = 2 and two spaces = 2 are the same level
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Indent).count(), 1);
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Dedent).count(), 1);
    }

    #[test]
    fn test_inconsistent_indentation() {
        let err = Tokenizer::new()
            .tokenize("a:\n    b\n  c\n")
            .unwrap_err();
        assert_eq!(err.message, "inconsistent indentation");
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 3);
    }

    #[test]
    fn test_newlines_ignored_in_brackets() {
        let kinds = kinds("x = [1,\n      2,\n  3]\ny\n");
        assert!(!kinds.contains(&TokenKind::Indent));
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Newline).count(), 2);
    }

    #[test]
    fn test_colors_and_comments() {
        assert_eq!(
            kinds("c: #ff8800 # trailing"),
            vec![
                ident("c"),
                TokenKind::Symbol(Symbol::Colon),
                TokenKind::Color("ff8800".to_string()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("#define something\n"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_invalid_color() {
        let err = Tokenizer::new().tokenize("c: #12345").unwrap_err();
        assert!(err.message.starts_with("invalid color literal"));
        assert_eq!(err.column, 4);
    }

    #[test]
    fn test_durations() {
        assert_eq!(
            kinds("500ms 2s 1.5m 1h"),
            vec![
                TokenKind::Duration(500.0),
                TokenKind::Duration(2000.0),
                TokenKind::Duration(90_000.0),
                TokenKind::Duration(3_600_000.0),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_glued_number_is_error() {
        let err = Tokenizer::new().tokenize("x = 12abc").unwrap_err();
        assert_eq!(err.message, "invalid number literal '12abc'");
        let err = Tokenizer::new().tokenize("x = 5sec").unwrap_err();
        assert_eq!(err.message, "invalid number literal '5sec'");
    }

    #[test]
    fn test_range_tokens() {
        assert_eq!(
            kinds("0..10"),
            vec![
                TokenKind::Number(0.0),
                TokenKind::Symbol(Symbol::DotDot),
                TokenKind::Number(10.0),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_booleans_and_hyphens() {
        assert_eq!(
            kinds("set-state wall-fan on true hp-1"),
            vec![
                TokenKind::Keyword(Keyword::SetState),
                ident("wall-fan"),
                TokenKind::Keyword(Keyword::On),
                TokenKind::Boolean(true),
                ident("hp"),
                TokenKind::Symbol(Symbol::Minus),
                TokenKind::Number(1.0),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_reactive_reference() {
        assert_eq!(
            kinds("$a.b"),
            vec![
                TokenKind::Symbol(Symbol::Dollar),
                ident("a"),
                TokenKind::Symbol(Symbol::Dot),
                ident("b"),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = Tokenizer::new().tokenize("a:\n  bee 'x'").unwrap();
        let bee = tokens.iter().find(|t| t.text == "bee").unwrap();
        assert_eq!((bee.line, bee.column), (2, 3));
        let s = tokens.iter().find(|t| t.text == "'x'").unwrap();
        assert_eq!((s.line, s.column), (2, 7));
        assert_eq!(s.kind, TokenKind::String("x".to_string()));
    }

    #[test]
    fn test_tokenizer_is_reusable() {
        let mut tokenizer = Tokenizer::new();
        let first = tokenizer.tokenize("a:\n  b\n").unwrap();
        let second = tokenizer.tokenize("a:\n  b\n").unwrap();
        assert_eq!(first, second);
        assert_eq!((second[0].line, second[0].column), (1, 1));

        // A failed run leaves no indentation behind either.
        assert!(tokenizer.tokenize("a:\n    b\n  c\n").is_err());
        assert_eq!(tokenizer.tokenize("x").unwrap()[0].column, 1);
    }

    #[test]
    fn test_unterminated_string_location() {
        let err = Tokenizer::new().tokenize("a:\n  b \"oops\n").unwrap_err();
        assert_eq!(err.message, "unterminated string");
        assert_eq!((err.line, err.column), (2, 5));
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_unexpected_character() {
        let err = Tokenizer::new().tokenize("a ! b").unwrap_err();
        assert_eq!(err.to_string(), "unexpected character '!' at line 1, column 3");
    }
}
