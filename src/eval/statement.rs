use tracing::debug;

use crate::ast::{
    ConditionalBranch, Easing, EmitData, Expression, MatchCase, Pattern, Statement, StatementKind,
};

use super::builtins::range_values;
use super::context::EvalContext;
use super::evaluator::{ExecResult, ExecutionError};
use super::expression::ExpressionEvaluator;
use super::value::Value;

/// Outcome of running a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    /// Ran to the end; the next statement may run.
    Completed,

    /// Unwinding towards the nearest loop or function.
    Control(ControlFlow),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlow {
    Break,
    Continue,
    Return(Value),
}

impl StatementResult {
    pub fn is_return(&self) -> bool {
        matches!(self, StatementResult::Control(ControlFlow::Return(_)))
    }

    pub fn is_break(&self) -> bool {
        matches!(self, StatementResult::Control(ControlFlow::Break))
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, StatementResult::Control(ControlFlow::Continue))
    }

    pub fn return_value(&self) -> Option<&Value> {
        match self {
            StatementResult::Control(ControlFlow::Return(value)) => Some(value),
            _ => None,
        }
    }
}

/// Host hooks for effect statements. Every hook defaults to a no-op, so a
/// host only implements the ones it reflects.
pub trait ExecutionCallbacks {
    fn on_animate(
        &mut self,
        _target: &str,
        _to: &Value,
        _duration: Option<f64>,
        _easing: Option<Easing>,
    ) -> ExecResult<()> {
        Ok(())
    }

    fn on_set_state(&mut self, _target: &str, _state: &Value) -> ExecResult<()> {
        Ok(())
    }

    fn on_play_animation(&mut self, _target: &str, _animation: &str, _looped: bool) -> ExecResult<()> {
        Ok(())
    }

    fn on_stop_animation(&mut self, _target: &str, _animation: Option<&str>) -> ExecResult<()> {
        Ok(())
    }

    fn on_emit(&mut self, _event: &str, _data: &Value) -> ExecResult<()> {
        Ok(())
    }

    /// `reactive` is true for `set $path = ...`.
    fn on_set(&mut self, _path: &str, _value: &Value, _reactive: bool) -> ExecResult<()> {
        Ok(())
    }
}

/// Ignores every effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCallbacks;

impl ExecutionCallbacks for NoCallbacks {}

type AnimateFn = Box<dyn FnMut(&str, &Value, Option<f64>, Option<Easing>)>;
type SetStateFn = Box<dyn FnMut(&str, &Value)>;
type PlayFn = Box<dyn FnMut(&str, &str, bool)>;
type StopFn = Box<dyn FnMut(&str, Option<&str>)>;
type EmitFn = Box<dyn FnMut(&str, &Value)>;
type SetFn = Box<dyn FnMut(&str, &Value, bool)>;

/// Closure based callbacks; unset hooks are no-ops.
#[derive(Default)]
pub struct Callbacks {
    pub on_animate: Option<AnimateFn>,
    pub on_set_state: Option<SetStateFn>,
    pub on_play_animation: Option<PlayFn>,
    pub on_stop_animation: Option<StopFn>,
    pub on_emit: Option<EmitFn>,
    pub on_set: Option<SetFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_animate(
        mut self,
        f: impl FnMut(&str, &Value, Option<f64>, Option<Easing>) + 'static,
    ) -> Self {
        self.on_animate = Some(Box::new(f));
        self
    }

    pub fn on_set_state(mut self, f: impl FnMut(&str, &Value) + 'static) -> Self {
        self.on_set_state = Some(Box::new(f));
        self
    }

    pub fn on_play_animation(mut self, f: impl FnMut(&str, &str, bool) + 'static) -> Self {
        self.on_play_animation = Some(Box::new(f));
        self
    }

    pub fn on_stop_animation(mut self, f: impl FnMut(&str, Option<&str>) + 'static) -> Self {
        self.on_stop_animation = Some(Box::new(f));
        self
    }

    pub fn on_emit(mut self, f: impl FnMut(&str, &Value) + 'static) -> Self {
        self.on_emit = Some(Box::new(f));
        self
    }

    pub fn on_set(mut self, f: impl FnMut(&str, &Value, bool) + 'static) -> Self {
        self.on_set = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_animate", &self.on_animate.is_some())
            .field("on_set_state", &self.on_set_state.is_some())
            .field("on_play_animation", &self.on_play_animation.is_some())
            .field("on_stop_animation", &self.on_stop_animation.is_some())
            .field("on_emit", &self.on_emit.is_some())
            .field("on_set", &self.on_set.is_some())
            .finish()
    }
}

impl ExecutionCallbacks for Callbacks {
    fn on_animate(
        &mut self,
        target: &str,
        to: &Value,
        duration: Option<f64>,
        easing: Option<Easing>,
    ) -> ExecResult<()> {
        if let Some(f) = self.on_animate.as_mut() {
            f(target, to, duration, easing);
        }
        Ok(())
    }

    fn on_set_state(&mut self, target: &str, state: &Value) -> ExecResult<()> {
        if let Some(f) = self.on_set_state.as_mut() {
            f(target, state);
        }
        Ok(())
    }

    fn on_play_animation(&mut self, target: &str, animation: &str, looped: bool) -> ExecResult<()> {
        if let Some(f) = self.on_play_animation.as_mut() {
            f(target, animation, looped);
        }
        Ok(())
    }

    fn on_stop_animation(&mut self, target: &str, animation: Option<&str>) -> ExecResult<()> {
        if let Some(f) = self.on_stop_animation.as_mut() {
            f(target, animation);
        }
        Ok(())
    }

    fn on_emit(&mut self, event: &str, data: &Value) -> ExecResult<()> {
        if let Some(f) = self.on_emit.as_mut() {
            f(event, data);
        }
        Ok(())
    }

    fn on_set(&mut self, path: &str, value: &Value, reactive: bool) -> ExecResult<()> {
        if let Some(f) = self.on_set.as_mut() {
            f(path, value, reactive);
        }
        Ok(())
    }
}

pub fn execute_statement(
    statement: &Statement,
    ctx: &EvalContext,
    callbacks: &mut dyn ExecutionCallbacks,
) -> ExecResult<StatementResult> {
    StatementEvaluator::new().eval_statement(statement, ctx, callbacks)
}

/// Runs `statements` in order, stopping at the first one that signals
/// `break`, `continue` or `return` and passing that signal up.
pub fn execute_statements(
    statements: &[Statement],
    ctx: &EvalContext,
    callbacks: &mut dyn ExecutionCallbacks,
) -> ExecResult<StatementResult> {
    StatementEvaluator::new().eval_block(statements, ctx, callbacks)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StatementEvaluator {
    pub expression_evaluator: ExpressionEvaluator,
}

impl StatementEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eval_statement(
        &self,
        statement: &Statement,
        ctx: &EvalContext,
        callbacks: &mut dyn ExecutionCallbacks,
    ) -> ExecResult<StatementResult> {
        match &statement.kind {
            StatementKind::Animate {
                target,
                to,
                duration,
                easing,
            } => {
                let to = self.eval_expression(to, ctx)?;
                let duration = match duration {
                    Some(expr) => self.eval_expression(expr, ctx)?.as_number(),
                    None => None,
                };
                callbacks.on_animate(target, &to, duration, *easing)?;
                Ok(StatementResult::Completed)
            }
            StatementKind::SetState { target, state } => {
                let state = self.eval_expression(state, ctx)?;
                callbacks.on_set_state(target, &state)?;
                Ok(StatementResult::Completed)
            }
            StatementKind::Play {
                target,
                animation,
                looped,
            } => {
                callbacks.on_play_animation(target, animation, *looped)?;
                Ok(StatementResult::Completed)
            }
            StatementKind::StopAnimation { target, animation } => {
                callbacks.on_stop_animation(target, animation.as_deref())?;
                Ok(StatementResult::Completed)
            }
            StatementKind::Emit { event, data } => {
                let data = self.eval_emit_data(data.as_ref(), ctx)?;
                debug!("emit {}", event);
                callbacks.on_emit(event, &data)?;
                Ok(StatementResult::Completed)
            }
            StatementKind::Set { target, value } => {
                let value = self.eval_expression(value, ctx)?;
                callbacks.on_set(&target.dotted(), &value, target.reactive)?;
                Ok(StatementResult::Completed)
            }
            StatementKind::When {
                condition,
                then_body,
                else_body,
            } => {
                if self.eval_expression(condition, ctx)?.is_truthy() {
                    self.eval_block(then_body, ctx, callbacks)
                } else {
                    self.eval_block(else_body, ctx, callbacks)
                }
            }
            StatementKind::Match { subject, cases } => self.eval_match(subject, cases, ctx, callbacks),
            // Handlers are declarations; hosts register them ahead of time.
            StatementKind::On(_) => Ok(StatementResult::Completed),
            StatementKind::If { branches, else_body } => {
                self.eval_if(branches, else_body.as_deref(), ctx, callbacks)
            }
            StatementKind::For {
                variable,
                iterable,
                body,
            } => self.eval_for(variable, iterable, body, ctx, callbacks),
            StatementKind::While { condition, body } => {
                self.eval_while(condition, body, statement, ctx, callbacks)
            }
            StatementKind::Break => Ok(StatementResult::Control(ControlFlow::Break)),
            StatementKind::Continue => Ok(StatementResult::Control(ControlFlow::Continue)),
            StatementKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expression(expr, ctx)?,
                    None => Value::Null,
                };
                Ok(StatementResult::Control(ControlFlow::Return(value)))
            }
        }
    }

    pub fn eval_block(
        &self,
        statements: &[Statement],
        ctx: &EvalContext,
        callbacks: &mut dyn ExecutionCallbacks,
    ) -> ExecResult<StatementResult> {
        for statement in statements {
            let result = self.eval_statement(statement, ctx, callbacks)?;
            if let StatementResult::Control(_) = result {
                return Ok(result);
            }
        }
        Ok(StatementResult::Completed)
    }

    fn eval_expression(&self, expr: &Expression, ctx: &EvalContext) -> ExecResult<Value> {
        Ok(self.expression_evaluator.eval_expression(expr, ctx)?)
    }

    fn eval_emit_data(&self, data: Option<&EmitData>, ctx: &EvalContext) -> ExecResult<Value> {
        match data {
            None => Ok(Value::Null),
            Some(EmitData::Expression(expr)) => self.eval_expression(expr, ctx),
            Some(EmitData::Fields(fields)) => {
                let mut entries = Vec::with_capacity(fields.len());
                for (key, expr) in fields {
                    entries.push((key.clone(), self.eval_expression(expr, ctx)?));
                }
                Ok(Value::map(entries))
            }
        }
    }

    fn eval_if(
        &self,
        branches: &[ConditionalBranch],
        else_body: Option<&[Statement]>,
        ctx: &EvalContext,
        callbacks: &mut dyn ExecutionCallbacks,
    ) -> ExecResult<StatementResult> {
        for branch in branches {
            if self.eval_expression(&branch.condition, ctx)?.is_truthy() {
                return self.eval_block(&branch.body, ctx, callbacks);
            }
        }
        match else_body {
            Some(body) => self.eval_block(body, ctx, callbacks),
            None => Ok(StatementResult::Completed),
        }
    }

    fn eval_match(
        &self,
        subject: &Expression,
        cases: &[MatchCase],
        ctx: &EvalContext,
        callbacks: &mut dyn ExecutionCallbacks,
    ) -> ExecResult<StatementResult> {
        let subject = self.eval_expression(subject, ctx)?;
        for case in cases {
            let matched = match &case.pattern {
                Pattern::Wildcard => true,
                Pattern::Expression(pattern) => self.eval_expression(pattern, ctx)? == subject,
            };
            if matched {
                return self.eval_block(&case.body, ctx, callbacks);
            }
        }
        Ok(StatementResult::Completed)
    }

    fn eval_for(
        &self,
        variable: &str,
        iterable: &Expression,
        body: &[Statement],
        ctx: &EvalContext,
        callbacks: &mut dyn ExecutionCallbacks,
    ) -> ExecResult<StatementResult> {
        let items: Box<dyn Iterator<Item = Value>> = match self.eval_expression(iterable, ctx)? {
            Value::List(items) => Box::new(items.into_iter()),
            Value::Range(start, end) => Box::new(range_values(start, end)),
            Value::Map(map) => Box::new(map.into_keys().map(Value::String)),
            Value::String(s) => Box::new(
                s.chars()
                    .map(|c| Value::String(c.to_string()))
                    .collect::<Vec<_>>()
                    .into_iter(),
            ),
            _ => Box::new(std::iter::empty()),
        };

        for item in items {
            let mut scope = ctx.child();
            scope.set_var(variable, item);
            match self.eval_block(body, &scope, callbacks)? {
                StatementResult::Control(ControlFlow::Break) => break,
                StatementResult::Control(ControlFlow::Continue) | StatementResult::Completed => {}
                returned @ StatementResult::Control(ControlFlow::Return(_)) => return Ok(returned),
            }
        }
        Ok(StatementResult::Completed)
    }

    fn eval_while(
        &self,
        condition: &Expression,
        body: &[Statement],
        statement: &Statement,
        ctx: &EvalContext,
        callbacks: &mut dyn ExecutionCallbacks,
    ) -> ExecResult<StatementResult> {
        let limit = ctx.limits().max_loop_iterations;
        let mut iterations = 0;
        while self.eval_expression(condition, ctx)?.is_truthy() {
            if iterations >= limit {
                return Err(ExecutionError::LoopLimitExceeded {
                    limit,
                    location: statement.location,
                });
            }
            iterations += 1;

            let scope = ctx.child();
            match self.eval_block(body, &scope, callbacks)? {
                StatementResult::Control(ControlFlow::Break) => break,
                StatementResult::Control(ControlFlow::Continue) | StatementResult::Completed => {}
                returned @ StatementResult::Control(ControlFlow::Return(_)) => return Ok(returned),
            }
        }
        Ok(StatementResult::Completed)
    }
}
