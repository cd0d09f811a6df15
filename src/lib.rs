//! # Stagecraft: a scripting language for interactive scenes
//!
//! Stage files declare the pieces of an interactive scene (assets, layouts,
//! entities and state machines) next to the logic that drives it: rules,
//! scenarios, behaviors, win/lose conditions and interactions. This crate
//! parses those files and runs the logic.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Source → Tokenizer → Analyzer → AST → Vm (Evaluator + Executor)
//! ```
//!
//! ### Stage 1: Tokenization
//!
//! The [`tokenizer`] turns text into tokens and makes indentation explicit
//! with `Indent`/`Dedent` tokens.
//!
//! ### Stage 2: Parsing
//!
//! The [`analyzer`] is a recursive descent parser producing an [`ast::Module`]
//! of twelve definition kinds.
//!
//! ### Stage 3: Evaluation
//!
//! The [`eval`] module evaluates expressions and executes statement bodies.
//! Effects (`animate`, `emit`, `set-state`, ...) are handed to an
//! [`eval::ExecutionCallbacks`] implementation instead of acting directly.
//!
//! ### Stage 4: Runtime
//!
//! [`runtime::Vm`] loads modules, keeps the [`state::StateTree`], and drives
//! rules, scenarios, behaviors and conditions from ticks and [`event`]s.
//!
//! ## Errors
//!
//! Every stage has its own error type, all collected into [`Error`]. The
//! [`formatter`] renders any of them as an annotated source excerpt.

pub mod analyzer;
pub mod ast;
pub mod config;
pub mod error;
pub mod eval;
pub mod event;
pub mod formatter;
pub mod runtime;
pub mod state;
pub mod tokenizer;

// Re-exports
pub use analyzer::{parse, parse_expression};
pub use config::VmConfig;
pub use error::*;
pub use eval::{Callbacks, ExecutionCallbacks, Value};
pub use event::{Event, Subscription};
pub use runtime::Vm;
pub use state::StateTree;
