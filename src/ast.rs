//! # Stage AST
//!
//! The tree produced by [`crate::analyzer::parse`]. Three families of nodes:
//!
//! * [`Expression`]: values computed by [`crate::eval::evaluate`]
//! * [`Statement`]: effects and control flow run by
//!   [`crate::eval::execute_statements`]
//! * [`Definition`]: top-level declarations collected into a [`Module`]
//!
//! Every expression and statement carries the [`Location`] of its first
//! token so evaluation errors can point back into the source.

mod definition;

pub use definition::*;

use std::str::FromStr;

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub location: Location,
}

impl Expression {
    pub fn new(kind: ExpressionKind, location: Location) -> Self {
        Self { kind, location }
    }

    /// The dotted name this expression spells, if it is a plain identifier
    /// or a chain of member accesses on one (`door.panel`).
    pub fn as_path(&self) -> Option<String> {
        match &self.kind {
            ExpressionKind::Identifier(name) => Some(name.clone()),
            ExpressionKind::Member { object, property } => {
                object.as_path().map(|base| format!("{}.{}", base, property))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Number(f64),
    String(String),
    Boolean(bool),
    /// Hex digits without `#`.
    Color(String),
    /// Milliseconds.
    Duration(f64),
    Identifier(String),
    Vector2(Box<Expression>, Box<Expression>),
    Vector3(Box<Expression>, Box<Expression>, Box<Expression>),
    Range {
        start: Box<Expression>,
        end: Box<Expression>,
    },
    /// `$a.b.c`, stored as its path segments.
    Reactive(Vec<String>),
    Member {
        object: Box<Expression>,
        property: String,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    List(Vec<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    /// Color intensity, `#ff8800 @ 2`.
    #[strum(serialize = "@")]
    At,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum UnaryOperator {
    #[strum(serialize = "not")]
    Not,
    #[strum(serialize = "-")]
    Negate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: Location,
}

impl Statement {
    pub fn new(kind: StatementKind, location: Location) -> Self {
        Self { kind, location }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Animate {
        target: String,
        to: Expression,
        duration: Option<Expression>,
        easing: Option<Easing>,
    },
    SetState {
        target: String,
        state: Expression,
    },
    Play {
        target: String,
        animation: String,
        looped: bool,
    },
    StopAnimation {
        target: String,
        animation: Option<String>,
    },
    Emit {
        event: String,
        data: Option<EmitData>,
    },
    Set {
        target: SetTarget,
        value: Expression,
    },
    When {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },
    Match {
        subject: Expression,
        cases: Vec<MatchCase>,
    },
    On(EventHandler),
    If {
        branches: Vec<ConditionalBranch>,
        else_body: Option<Vec<Statement>>,
    },
    For {
        variable: String,
        iterable: Expression,
        body: Vec<Statement>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    Break,
    Continue,
    Return(Option<Expression>),
}

/// Payload of an `emit` statement.
#[derive(Debug, Clone, PartialEq)]
pub enum EmitData {
    /// `emit hit amount: 3, source: "trap"`
    Fields(Vec<(String, Expression)>),
    /// `emit hit $last_hit`
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetTarget {
    pub path: Vec<String>,
    /// Written as `$path`.
    pub reactive: bool,
}

impl SetTarget {
    pub fn dotted(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// `_`
    Wildcard,
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBranch {
    pub condition: Expression,
    pub body: Vec<Statement>,
}

/// `on <event> [if <guard>]: <body>`, used by statements, scenarios and
/// behaviors alike.
#[derive(Debug, Clone, PartialEq)]
pub struct EventHandler {
    pub event: String,
    pub guard: Option<Expression>,
    pub body: Vec<Statement>,
    pub location: Location,
}

/// Easing curves for animations and the `ease` builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Easing {
    Linear,
    #[strum(to_string = "quad-in", serialize = "ease-in")]
    QuadIn,
    #[strum(to_string = "quad-out", serialize = "ease-out")]
    QuadOut,
    #[strum(to_string = "quad-in-out", serialize = "ease-in-out")]
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
}

impl Easing {
    pub fn parse(name: &str) -> Option<Self> {
        Easing::from_str(name).ok()
    }

    /// Maps progress `t` (clamped to 0..=1) through the curve.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => t * (2.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    (t - 1.0) * u * u + 1.0
                }
            }
        }
    }
}
