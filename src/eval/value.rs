use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::json;

use crate::ast::FunctionDef;

use super::builtins::Builtin;

/// Runtime value of the stage language.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    String(String),
    Boolean(bool),
    /// `#rrggbb` style, always with the leading `#`.
    Color(String),
    Vec2(f64, f64),
    Vec3(f64, f64, f64),
    /// Half open `start..end`.
    Range(f64, f64),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A color scaled by `@`.
    Emissive { color: String, intensity: f64 },
    Function(Callable),
}

/// Something a call expression can invoke.
#[derive(Debug, Clone, PartialEq)]
pub enum Callable {
    Builtin(Builtin),
    User(Rc<FunctionDef>),
}

impl Callable {
    pub fn name(&self) -> String {
        match self {
            Callable::Builtin(b) => b.to_string(),
            Callable::User(def) => def.name.clone(),
        }
    }
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Color(_) => "color",
            Value::Vec2(..) => "vec2",
            Value::Vec3(..) => "vec3",
            Value::Range(..) => "range",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Emissive { .. } => "emissive",
            Value::Function(_) => "function",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Lenient numeric conversion used by `number()` and friends.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Null => Some(0.0),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Field access used by member expressions and dotted state paths.
    pub fn member(&self, property: &str) -> Option<Value> {
        match (self, property) {
            (Value::Map(map), key) => map.get(key).cloned(),
            (Value::Vec2(x, _), "x") | (Value::Vec3(x, _, _), "x") => Some(Value::Number(*x)),
            (Value::Vec2(_, y), "y") | (Value::Vec3(_, y, _), "y") => Some(Value::Number(*y)),
            (Value::Vec3(_, _, z), "z") => Some(Value::Number(*z)),
            (Value::Range(start, _), "start") => Some(Value::Number(*start)),
            (Value::Range(_, end), "end") => Some(Value::Number(*end)),
            (Value::Emissive { color, .. }, "color") => Some(Value::Color(color.clone())),
            (Value::Emissive { intensity, .. }, "intensity") => Some(Value::Number(*intensity)),
            (Value::List(items), "length") => Some(Value::Number(items.len() as f64)),
            (Value::String(s), "length") => Some(Value::Number(s.chars().count() as f64)),
            _ => None,
        }
    }

    pub fn map(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Map(entries.into_iter().collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            // f64 Display already drops a trailing `.0`
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Color(c) => write!(f, "{}", c),
            Value::Vec2(x, y) => write!(f, "({}, {})", x, y),
            Value::Vec3(x, y, z) => write!(f, "({}, {}, {})", x, y, z),
            Value::Range(start, end) => write!(f, "{}..{}", start, end),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Emissive { color, intensity } => write!(f, "{}@{}", color, intensity),
            Value::Function(callable) => write!(f, "<function {}>", callable.name()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    // Integral values serialize without a fraction.
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        json!(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => json!(s),
            Value::Boolean(b) => json!(b),
            Value::Color(c) => json!(c),
            Value::Vec2(x, y) => json!([number_to_json(*x), number_to_json(*y)]),
            Value::Vec3(x, y, z) => {
                json!([number_to_json(*x), number_to_json(*y), number_to_json(*z)])
            }
            Value::Range(start, end) => {
                json!({ "start": number_to_json(*start), "end": number_to_json(*end) })
            }
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
            Value::Emissive { color, intensity } => {
                json!({ "color": color, "intensity": number_to_json(*intensity) })
            }
            Value::Function(callable) => json!(format!("<function {}>", callable.name())),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        serde_json::Value::from(&value)
    }
}
