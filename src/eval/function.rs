use tracing::trace;

use crate::ast::{FunctionDef, Location};

use super::context::EvalContext;
use super::evaluator::{ExecResult, ExecutionError};
use super::expression::evaluate;
use super::statement::{execute_statements, ControlFlow, ExecutionCallbacks, StatementResult};
use super::value::Value;

/// Calls the user function `name` from the environment's registry.
pub fn call_function(
    name: &str,
    args: Vec<Value>,
    ctx: &EvalContext,
    callbacks: &mut dyn ExecutionCallbacks,
) -> ExecResult<Value> {
    let def = ctx
        .env()
        .functions
        .borrow()
        .get(name)
        .ok_or_else(|| ExecutionError::UnknownFunction {
            name: name.to_string(),
            location: None,
        })?;
    invoke(&def, args, None, ctx, callbacks)
}

/// Binds `args` positionally and runs the body in a new frame under `ctx`.
///
/// Omitted arguments take their default, evaluated in `ctx`, or `Null`.
/// Extra arguments are ignored. Falling off the end returns `Null`.
pub fn invoke(
    def: &FunctionDef,
    args: Vec<Value>,
    location: Option<Location>,
    ctx: &EvalContext,
    callbacks: &mut dyn ExecutionCallbacks,
) -> ExecResult<Value> {
    let limit = ctx.limits().max_call_depth;
    let calls = ctx.env().calls.clone();
    if calls.get() >= limit {
        return Err(ExecutionError::CallDepthExceeded {
            name: def.name.clone(),
            limit,
            location,
        });
    }
    trace!("invoking {} at depth {}", def.name, calls.get() + 1);

    calls.set(calls.get() + 1);
    let result = run_frame(def, args, ctx, callbacks);
    calls.set(calls.get() - 1);
    result
}

fn run_frame(
    def: &FunctionDef,
    args: Vec<Value>,
    ctx: &EvalContext,
    callbacks: &mut dyn ExecutionCallbacks,
) -> ExecResult<Value> {
    let mut frame = ctx.child();
    let mut args = args.into_iter();
    for param in &def.params {
        let value = match (args.next(), &param.default) {
            (Some(value), _) => value,
            (None, Some(default)) => evaluate(default, ctx)?,
            (None, None) => Value::Null,
        };
        frame.set_var(param.name.as_str(), value);
    }

    match execute_statements(&def.body, &frame, callbacks)? {
        StatementResult::Control(ControlFlow::Return(value)) => Ok(value),
        _ => Ok(Value::Null),
    }
}
