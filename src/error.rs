use thiserror::Error;

use crate::analyzer::ParseError;
use crate::ast::Location;
use crate::eval::{EvalError, ExecutionError};
use crate::tokenizer::LexerError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }

    /// The diagnostic view of this error, if it carries one.
    pub fn as_diagnostic(&self) -> Option<&dyn Diagnostic> {
        match self {
            Error::Lexer(e) => Some(e),
            Error::Parse(e) => Some(e),
            Error::Eval(e) => Some(e),
            Error::Execution(e) => Some(e),
            _ => None,
        }
    }
}

/// Anything that can be rendered by [`crate::formatter::ErrorReport`].
pub trait Diagnostic {
    fn message(&self) -> String;
    fn location(&self) -> Option<Location>;
    fn hint(&self) -> Option<String> {
        None
    }
}

impl Diagnostic for Error {
    fn message(&self) -> String {
        match self.as_diagnostic() {
            Some(d) => d.message(),
            None => self.to_string(),
        }
    }

    fn location(&self) -> Option<Location> {
        self.as_diagnostic().and_then(|d| d.location())
    }

    fn hint(&self) -> Option<String> {
        self.as_diagnostic().and_then(|d| d.hint())
    }
}
