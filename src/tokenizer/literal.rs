//! Scanners for literal tokens: numbers, durations, colors, strings and
//! identifiers.
//!
//! Each scanner consumes the longest valid prefix and leaves validation that
//! needs a source position (glued identifier characters, color length) to the
//! [`Tokenizer`](super::Tokenizer), which owns line and column tracking.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, satisfy},
    combinator::{map_res, opt, peek, recognize, value},
    error::context,
    multi::many0,
    sequence::{pair, preceded, terminated},
};

use super::token::ScanResult;

pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Digits with an optional fraction. The dot is only taken when a digit
/// follows it, so `1..5` scans as `1` and leaves `..5`.
pub fn scan_number(input: &str) -> ScanResult<f64> {
    context(
        "number",
        map_res(
            recognize(pair(digit1, opt(pair(char('.'), digit1)))),
            |s: &str| s.parse::<f64>(),
        ),
    )(input)
}

/// Duration suffix as a millisecond multiplier. `ms` is tried before `m`.
pub fn scan_duration_unit(input: &str) -> ScanResult<f64> {
    context(
        "duration unit",
        alt((
            value(1.0, tag("ms")),
            value(1_000.0, tag("s")),
            value(60_000.0, tag("m")),
            value(3_600_000.0, tag("h")),
        )),
    )(input)
}

/// The hex run after `#`. Length is validated by the caller.
pub fn scan_hex_run(input: &str) -> ScanResult<&str> {
    context(
        "color",
        preceded(char('#'), take_while1(|c: char| c.is_ascii_hexdigit())),
    )(input)
}

pub fn is_valid_color_length(len: usize) -> bool {
    matches!(len, 3 | 4 | 6 | 8)
}

/// Identifiers may contain a hyphen when a letter or underscore follows it,
/// so `wall-fan` is one word and `hp-1` is not.
pub fn scan_identifier(input: &str) -> ScanResult<&str> {
    context(
        "identifier",
        recognize(pair(
            satisfy(is_identifier_start),
            many0(alt((
                satisfy(is_identifier_char),
                terminated(char('-'), peek(satisfy(is_identifier_start))),
            ))),
        )),
    )(input)
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringScanError {
    /// A newline or the end of input came before the closing quote.
    Unterminated,
}

/// Scans a quoted string, returning the rest of the input, the raw source
/// text and the unescaped contents.
pub fn scan_string(input: &str) -> Result<(&str, &str, String), StringScanError> {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, q @ ('"' | '\''))) => q,
        _ => return Err(StringScanError::Unterminated),
    };
    let mut content = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => {
                let end = i + c.len_utf8();
                return Ok((&input[end..], &input[..end], content));
            }
            '\n' => return Err(StringScanError::Unterminated),
            '\\' => match chars.next() {
                Some((_, 'n')) => content.push('\n'),
                Some((_, 't')) => content.push('\t'),
                Some((_, e @ ('\\' | '"' | '\''))) => content.push(e),
                Some((_, '\n')) | None => return Err(StringScanError::Unterminated),
                Some((_, other)) => {
                    content.push('\\');
                    content.push(other);
                }
            },
            c => content.push(c),
        }
    }
    Err(StringScanError::Unterminated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_stops_before_range() {
        assert_eq!(scan_number("1..5").unwrap(), ("..5", 1.0));
        assert_eq!(scan_number("2.5s").unwrap(), ("s", 2.5));
        assert_eq!(scan_number("3.").unwrap(), (".", 3.0));
    }

    #[test]
    fn test_duration_units() {
        assert_eq!(scan_duration_unit("ms").unwrap(), ("", 1.0));
        assert_eq!(scan_duration_unit("m").unwrap(), ("", 60_000.0));
        assert_eq!(scan_duration_unit("h ").unwrap(), (" ", 3_600_000.0));
        assert!(scan_duration_unit("x").is_err());
    }

    #[test]
    fn test_identifier_with_hyphen() {
        assert_eq!(scan_identifier("wall-fan x").unwrap(), (" x", "wall-fan"));
        assert_eq!(scan_identifier("set-state door").unwrap(), (" door", "set-state"));
        assert_eq!(scan_identifier("hp-1").unwrap(), ("-1", "hp"));
        assert_eq!(scan_identifier("a- b").unwrap(), ("- b", "a"));
    }

    #[test]
    fn test_hex_run() {
        assert_eq!(scan_hex_run("#ff8800 x").unwrap(), (" x", "ff8800"));
        assert!(scan_hex_run("# comment").is_err());
        assert!(is_valid_color_length(8));
        assert!(!is_valid_color_length(5));
    }

    #[test]
    fn test_string_escapes() {
        let (rest, raw, content) = scan_string(r#""a\"b\n" tail"#).unwrap();
        assert_eq!(rest, " tail");
        assert_eq!(raw, r#""a\"b\n""#);
        assert_eq!(content, "a\"b\n");

        let (_, _, single) = scan_string("'it\\'s'").unwrap();
        assert_eq!(single, "it's");
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(scan_string("\"abc"), Err(StringScanError::Unterminated));
        assert_eq!(scan_string("\"abc\ndef\""), Err(StringScanError::Unterminated));
    }
}
