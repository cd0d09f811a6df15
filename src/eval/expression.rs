use std::cmp::Ordering;

use tracing::trace;

use crate::ast::{BinaryOperator, Expression, ExpressionKind, Location, UnaryOperator};

use super::builtins::Builtin;
use super::context::EvalContext;
use super::evaluator::{EvalError, EvalResult};
use super::function::invoke;
use super::statement::NoCallbacks;
use super::value::{Callable, Value};

/// Evaluates `expr` against `ctx`. Evaluation never writes state; the only
/// failures are calls that cannot be resolved.
pub fn evaluate(expr: &Expression, ctx: &EvalContext) -> EvalResult<Value> {
    ExpressionEvaluator::new().eval_expression(expr, ctx)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn eval_expression(&self, expr: &Expression, ctx: &EvalContext) -> EvalResult<Value> {
        match &expr.kind {
            ExpressionKind::Number(n) | ExpressionKind::Duration(n) => Ok(Value::Number(*n)),
            ExpressionKind::String(s) => Ok(Value::String(s.clone())),
            ExpressionKind::Boolean(b) => Ok(Value::Boolean(*b)),
            ExpressionKind::Color(hex) => Ok(Value::Color(format!("#{}", hex))),
            ExpressionKind::Identifier(name) => Ok(self.eval_identifier(name, ctx)),
            ExpressionKind::Vector2(x, y) => {
                let x = self.eval_expression(x, ctx)?;
                let y = self.eval_expression(y, ctx)?;
                Ok(match (x, y) {
                    (Value::Number(x), Value::Number(y)) => Value::Vec2(x, y),
                    _ => Value::Null,
                })
            }
            ExpressionKind::Vector3(x, y, z) => {
                let x = self.eval_expression(x, ctx)?;
                let y = self.eval_expression(y, ctx)?;
                let z = self.eval_expression(z, ctx)?;
                Ok(match (x, y, z) {
                    (Value::Number(x), Value::Number(y), Value::Number(z)) => Value::Vec3(x, y, z),
                    _ => Value::Null,
                })
            }
            ExpressionKind::Range { start, end } => {
                let start = self.eval_expression(start, ctx)?;
                let end = self.eval_expression(end, ctx)?;
                Ok(match (start, end) {
                    (Value::Number(start), Value::Number(end)) => Value::Range(start, end),
                    _ => Value::Null,
                })
            }
            ExpressionKind::Reactive(path) => Ok(ctx.resolve_reactive(path)),
            ExpressionKind::Member { object, property } => {
                let object = self.eval_expression(object, ctx)?;
                Ok(object.member(property).unwrap_or_default())
            }
            ExpressionKind::Binary { op, left, right } => {
                self.eval_binary_op(op, left, right, ctx)
            }
            ExpressionKind::Unary { op, operand } => {
                let value = self.eval_expression(operand, ctx)?;
                Ok(self.eval_unary_op(op, value))
            }
            ExpressionKind::Call { callee, arguments } => {
                self.eval_function_call(callee, arguments, expr.location, ctx)
            }
            ExpressionKind::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.eval_expression(item, ctx))
                    .collect::<EvalResult<Vec<_>>>()?,
            )),
        }
    }

    /// Variables first, then builtins and user functions as callable
    /// values. Anything else is `Null`.
    fn eval_identifier(&self, name: &str, ctx: &EvalContext) -> Value {
        if let Some(value) = ctx.lookup(name) {
            return value;
        }
        if let Some(builtin) = Builtin::lookup(name) {
            return Value::Function(Callable::Builtin(builtin));
        }
        match ctx.env().functions.borrow().get(name) {
            Some(def) => Value::Function(Callable::User(def)),
            None => Value::Null,
        }
    }

    fn eval_function_call(
        &self,
        callee: &Expression,
        arguments: &[Expression],
        location: Location,
        ctx: &EvalContext,
    ) -> EvalResult<Value> {
        let callable = match &callee.kind {
            ExpressionKind::Identifier(name) => self.resolve_callable(name, location, ctx)?,
            _ => match self.eval_expression(callee, ctx)? {
                Value::Function(callable) => callable,
                _ => return Err(EvalError::NotCallable { location }),
            },
        };

        let args = arguments
            .iter()
            .map(|arg| self.eval_expression(arg, ctx))
            .collect::<EvalResult<Vec<_>>>()?;
        trace!("calling {} with {} arguments", callable.name(), args.len());

        match callable {
            Callable::Builtin(builtin) => Ok(builtin.call(&args)),
            // Expressions stay side-effect free: user functions run without
            // host callbacks.
            Callable::User(def) => Ok(invoke(&def, args, Some(location), ctx, &mut NoCallbacks)?),
        }
    }

    /// Builtin table, then a callable bound in scope, then the function
    /// registry.
    fn resolve_callable(
        &self,
        name: &str,
        location: Location,
        ctx: &EvalContext,
    ) -> EvalResult<Callable> {
        if let Some(builtin) = Builtin::lookup(name) {
            return Ok(Callable::Builtin(builtin));
        }
        if let Some(Value::Function(callable)) = ctx.lookup(name) {
            return Ok(callable);
        }
        if let Some(def) = ctx.env().functions.borrow().get(name) {
            return Ok(Callable::User(def));
        }
        Err(EvalError::UnknownFunction {
            name: name.to_string(),
            location,
        })
    }

    fn eval_binary_op(
        &self,
        op: &BinaryOperator,
        left: &Expression,
        right: &Expression,
        ctx: &EvalContext,
    ) -> EvalResult<Value> {
        let left_val = self.eval_expression(left, ctx)?;

        // Short-circuit before touching the right side.
        match op {
            BinaryOperator::And if !left_val.is_truthy() => return Ok(Value::Boolean(false)),
            BinaryOperator::Or if left_val.is_truthy() => return Ok(Value::Boolean(true)),
            _ => {}
        }

        let right_val = self.eval_expression(right, ctx)?;
        Ok(match op {
            BinaryOperator::And | BinaryOperator::Or => Value::Boolean(right_val.is_truthy()),
            BinaryOperator::Add => self.eval_add(&left_val, &right_val),
            BinaryOperator::Subtract => arithmetic(&left_val, &right_val, |l, r| l - r),
            BinaryOperator::Multiply => self.eval_multiply(&left_val, &right_val),
            BinaryOperator::Divide => self.eval_divide(&left_val, &right_val),
            BinaryOperator::Equal => Value::Boolean(left_val == right_val),
            BinaryOperator::NotEqual => Value::Boolean(left_val != right_val),
            BinaryOperator::Less => compare_values(&left_val, &right_val, Ordering::is_lt),
            BinaryOperator::Greater => compare_values(&left_val, &right_val, Ordering::is_gt),
            BinaryOperator::LessEqual => compare_values(&left_val, &right_val, Ordering::is_le),
            BinaryOperator::GreaterEqual => compare_values(&left_val, &right_val, Ordering::is_ge),
            BinaryOperator::At => self.eval_intensity(&left_val, &right_val),
        })
    }

    fn eval_add(&self, left: &Value, right: &Value) -> Value {
        match (left, right) {
            (Value::String(l), r) => Value::String(format!("{}{}", l, r)),
            (l, Value::String(r)) => Value::String(format!("{}{}", l, r)),
            (Value::List(l), Value::List(r)) => {
                Value::List(l.iter().chain(r.iter()).cloned().collect())
            }
            _ => arithmetic(left, right, |l, r| l + r),
        }
    }

    fn eval_multiply(&self, left: &Value, right: &Value) -> Value {
        match (left, right) {
            (Value::Number(s), v) | (v, Value::Number(s)) if is_vector(v) => {
                scale(v, |c| c * s)
            }
            _ => arithmetic(left, right, |l, r| l * r),
        }
    }

    fn eval_divide(&self, left: &Value, right: &Value) -> Value {
        let div = |l: f64, r: f64| if r == 0.0 { 0.0 } else { l / r };
        match (left, right) {
            (v, Value::Number(s)) if is_vector(v) => scale(v, |c| div(c, *s)),
            _ => arithmetic(left, right, div),
        }
    }

    /// `#ff8800 @ 2` or `2 @ "#ff8800"`.
    fn eval_intensity(&self, left: &Value, right: &Value) -> Value {
        match (color_of(left), right, color_of(right), left) {
            (Some(color), Value::Number(intensity), _, _)
            | (_, _, Some(color), Value::Number(intensity)) => Value::Emissive {
                color,
                intensity: *intensity,
            },
            _ => Value::Null,
        }
    }

    fn eval_unary_op(&self, op: &UnaryOperator, value: Value) -> Value {
        match op {
            UnaryOperator::Not => Value::Boolean(!value.is_truthy()),
            UnaryOperator::Negate => match value {
                Value::Number(n) => Value::Number(-n),
                v if is_vector(&v) => scale(&v, |c| -c),
                _ => Value::Null,
            },
        }
    }
}

fn is_vector(value: &Value) -> bool {
    matches!(value, Value::Vec2(..) | Value::Vec3(..))
}

fn scale(value: &Value, f: impl Fn(f64) -> f64) -> Value {
    match value {
        Value::Vec2(x, y) => Value::Vec2(f(*x), f(*y)),
        Value::Vec3(x, y, z) => Value::Vec3(f(*x), f(*y), f(*z)),
        _ => Value::Null,
    }
}

/// Numeric or componentwise vector arithmetic; other pairs are `Null`.
fn arithmetic(left: &Value, right: &Value, f: impl Fn(f64, f64) -> f64) -> Value {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Value::Number(f(*l, *r)),
        (Value::Vec2(ax, ay), Value::Vec2(bx, by)) => Value::Vec2(f(*ax, *bx), f(*ay, *by)),
        (Value::Vec3(ax, ay, az), Value::Vec3(bx, by, bz)) => {
            Value::Vec3(f(*ax, *bx), f(*ay, *by), f(*az, *bz))
        }
        _ => Value::Null,
    }
}

fn compare_values(left: &Value, right: &Value, f: impl Fn(Ordering) -> bool) -> Value {
    let ordering = match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    };
    Value::Boolean(ordering.is_some_and(f))
}

fn color_of(value: &Value) -> Option<String> {
    match value {
        Value::Color(color) => Some(color.clone()),
        Value::String(s) if s.starts_with('#') => Some(s.clone()),
        _ => None,
    }
}
