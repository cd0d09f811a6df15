//! # Evaluation
//!
//! Expressions are evaluated by [`evaluate`] and statement lists run by
//! [`execute_statements`], both against an [`EvalContext`]. Neither keeps
//! anything between calls: all long-lived data sits behind the
//! [`Environment`] handles (state tree, config and function registries)
//! owned by whoever built the context, usually the [`crate::runtime::Vm`].
//!
//! Effect statements (`animate`, `emit`, `set`, ...) never act on their own;
//! they are forwarded to an [`ExecutionCallbacks`] implementation.

pub mod builtins;
pub mod context;
pub mod evaluator;
pub mod expression;
pub mod function;
pub mod registry;
pub mod statement;
pub mod value;

pub use builtins::Builtin;
pub use context::{Environment, EvalContext, Limits};
pub use evaluator::{EvalError, EvalResult, ExecResult, ExecutionError};
pub use expression::{evaluate, ExpressionEvaluator};
pub use function::{call_function, invoke};
pub use registry::{
    load_configs_from_module, load_functions_from_module, properties_to_value, ConfigRegistry,
    FunctionRegistry,
};
pub use statement::{
    execute_statement, execute_statements, Callbacks, ControlFlow, ExecutionCallbacks,
    NoCallbacks, StatementEvaluator, StatementResult,
};
pub use value::{Callable, Value};
