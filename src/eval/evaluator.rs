use thiserror::Error;

use crate::ast::Location;
use crate::error::Diagnostic;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("unknown function '{name}' at {location}")]
    UnknownFunction { name: String, location: Location },

    #[error("expression is not callable at {location}")]
    NotCallable { location: Location },

    /// A user function called from an expression failed inside its body.
    #[error(transparent)]
    Execution(Box<ExecutionError>),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("unknown function '{name}'{}", at(.location))]
    UnknownFunction {
        name: String,
        location: Option<Location>,
    },

    #[error("while loop exceeded {limit} iterations at {location}")]
    LoopLimitExceeded { limit: usize, location: Location },

    #[error("call to '{name}' exceeded the maximum call depth of {limit}{}", at(.location))]
    CallDepthExceeded {
        name: String,
        limit: usize,
        location: Option<Location>,
    },

    #[error("event '{event}' exceeded the maximum emit depth of {limit}")]
    EmitDepthExceeded { event: String, limit: usize },

    #[error(transparent)]
    Eval(#[from] EvalError),
}

fn at(location: &Option<Location>) -> String {
    location
        .map(|location| format!(" at {}", location))
        .unwrap_or_default()
}

impl From<ExecutionError> for EvalError {
    fn from(error: ExecutionError) -> Self {
        match error {
            // Unwrap instead of nesting when an eval error round-trips
            // through a function body.
            ExecutionError::Eval(inner) => inner,
            other => EvalError::Execution(Box::new(other)),
        }
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
pub type ExecResult<T> = Result<T, ExecutionError>;

impl Diagnostic for EvalError {
    fn message(&self) -> String {
        match self {
            EvalError::UnknownFunction { name, .. } => format!("unknown function '{}'", name),
            EvalError::NotCallable { .. } => "expression is not callable".to_string(),
            EvalError::Execution(inner) => inner.message(),
        }
    }

    fn location(&self) -> Option<Location> {
        match self {
            EvalError::UnknownFunction { location, .. } | EvalError::NotCallable { location } => {
                Some(*location)
            }
            EvalError::Execution(inner) => inner.location(),
        }
    }

    fn hint(&self) -> Option<String> {
        match self {
            EvalError::UnknownFunction { .. } => Some(
                "declare it with `function <name>(...)` or check the builtin name".to_string(),
            ),
            EvalError::NotCallable { .. } => None,
            EvalError::Execution(inner) => inner.hint(),
        }
    }
}

impl Diagnostic for ExecutionError {
    fn message(&self) -> String {
        match self {
            ExecutionError::UnknownFunction { name, .. } => format!("unknown function '{}'", name),
            ExecutionError::LoopLimitExceeded { limit, .. } => {
                format!("while loop exceeded {} iterations", limit)
            }
            ExecutionError::CallDepthExceeded { name, limit, .. } => format!(
                "call to '{}' exceeded the maximum call depth of {}",
                name, limit
            ),
            ExecutionError::EmitDepthExceeded { event, limit } => format!(
                "event '{}' exceeded the maximum emit depth of {}",
                event, limit
            ),
            ExecutionError::Eval(inner) => inner.message(),
        }
    }

    fn location(&self) -> Option<Location> {
        match self {
            ExecutionError::UnknownFunction { location, .. }
            | ExecutionError::CallDepthExceeded { location, .. } => *location,
            ExecutionError::LoopLimitExceeded { location, .. } => Some(*location),
            ExecutionError::EmitDepthExceeded { .. } => None,
            ExecutionError::Eval(inner) => inner.location(),
        }
    }

    fn hint(&self) -> Option<String> {
        match self {
            ExecutionError::LoopLimitExceeded { .. } => {
                Some("make sure the loop condition eventually becomes false".to_string())
            }
            ExecutionError::CallDepthExceeded { .. } => {
                Some("recursive functions need a base case that returns".to_string())
            }
            ExecutionError::EmitDepthExceeded { event, .. } => Some(format!(
                "a rule or handler on '{}' keeps emitting events that lead back to it",
                event
            )),
            ExecutionError::Eval(inner) => inner.hint(),
            ExecutionError::UnknownFunction { .. } => None,
        }
    }
}
