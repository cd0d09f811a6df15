//! Builtin function table.
//!
//! Builtins are total: an argument of the wrong shape yields [`Value::Null`]
//! instead of an error, so a typo in authored content degrades to a blank
//! value rather than aborting a tick.

use std::collections::BTreeMap;
use std::str::FromStr;

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::ast::Easing;

use super::value::Value;

/// Upper bound on the list produced by `range()`.
pub const MAX_RANGE_ITEMS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Builtin {
    // math
    Abs,
    Floor,
    Ceil,
    Round,
    Sqrt,
    Pow,
    Sin,
    Cos,
    Tan,
    #[strum(serialize = "atan2")]
    Atan2,
    Min,
    Max,
    Clamp,
    Lerp,
    Sign,
    Mod,
    // strings
    Len,
    Upper,
    Lower,
    Trim,
    Contains,
    StartsWith,
    EndsWith,
    Replace,
    Substring,
    Split,
    Join,
    // coercion
    Number,
    Int,
    String,
    Str,
    Bool,
    TypeOf,
    // colors
    Rgb,
    Rgba,
    Hex,
    // vectors
    #[strum(serialize = "vec2")]
    Vec2,
    #[strum(serialize = "vec3")]
    Vec3,
    Length,
    Distance,
    Normalize,
    Dot,
    // animation
    Ease,
    Interpolate,
    // collections
    Range,
    Keys,
    Values,
    Has,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        Builtin::from_str(name).ok()
    }

    pub fn call(&self, args: &[Value]) -> Value {
        match self {
            Builtin::Abs => unary_math(args, f64::abs),
            Builtin::Floor => unary_math(args, f64::floor),
            Builtin::Ceil => unary_math(args, f64::ceil),
            Builtin::Round => unary_math(args, f64::round),
            Builtin::Sqrt => unary_math(args, f64::sqrt),
            Builtin::Sin => unary_math(args, f64::sin),
            Builtin::Cos => unary_math(args, f64::cos),
            Builtin::Tan => unary_math(args, f64::tan),
            Builtin::Sign => unary_math(args, |n| {
                if n > 0.0 {
                    1.0
                } else if n < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }),
            Builtin::Pow => binary_math(args, f64::powf),
            Builtin::Atan2 => binary_math(args, f64::atan2),
            Builtin::Mod => binary_math(args, |a, b| if b == 0.0 { 0.0 } else { a.rem_euclid(b) }),
            Builtin::Min => fold_numbers(args, f64::min),
            Builtin::Max => fold_numbers(args, f64::max),
            Builtin::Clamp => match numbers::<3>(args) {
                Some([n, lo, hi]) if lo <= hi => Value::Number(n.clamp(lo, hi)),
                _ => Value::Null,
            },
            Builtin::Lerp => match numbers::<3>(args) {
                Some([a, b, t]) => Value::Number(a + (b - a) * t),
                None => Value::Null,
            },

            Builtin::Len => match args.first() {
                Some(Value::String(s)) => Value::Number(s.chars().count() as f64),
                Some(Value::List(items)) => Value::Number(items.len() as f64),
                Some(Value::Map(map)) => Value::Number(map.len() as f64),
                _ => Value::Null,
            },
            Builtin::Upper => map_string(args, |s| s.to_uppercase()),
            Builtin::Lower => map_string(args, |s| s.to_lowercase()),
            Builtin::Trim => map_string(args, |s| s.trim().to_string()),
            Builtin::Contains => match args {
                [Value::String(s), Value::String(needle), ..] => {
                    Value::Boolean(s.contains(needle.as_str()))
                }
                [Value::List(items), item, ..] => Value::Boolean(items.contains(item)),
                _ => Value::Null,
            },
            Builtin::StartsWith => match args {
                [Value::String(s), Value::String(prefix), ..] => {
                    Value::Boolean(s.starts_with(prefix.as_str()))
                }
                _ => Value::Null,
            },
            Builtin::EndsWith => match args {
                [Value::String(s), Value::String(suffix), ..] => {
                    Value::Boolean(s.ends_with(suffix.as_str()))
                }
                _ => Value::Null,
            },
            Builtin::Replace => match args {
                [Value::String(s), Value::String(from), Value::String(to), ..] => {
                    Value::String(s.replace(from.as_str(), to))
                }
                _ => Value::Null,
            },
            Builtin::Substring => substring(args),
            Builtin::Split => match args {
                [Value::String(s), Value::String(sep), ..] => Value::List(
                    s.split(sep.as_str())
                        .map(|part| Value::String(part.to_string()))
                        .collect(),
                ),
                _ => Value::Null,
            },
            Builtin::Join => match args {
                [Value::List(items), rest @ ..] => {
                    let sep = rest.first().and_then(Value::as_str).unwrap_or(",");
                    Value::String(
                        items
                            .iter()
                            .map(Value::to_string)
                            .collect::<Vec<_>>()
                            .join(sep),
                    )
                }
                _ => Value::Null,
            },

            Builtin::Number => args
                .first()
                .and_then(Value::to_number)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Builtin::Int => args
                .first()
                .and_then(Value::to_number)
                .map(|n| Value::Number(n.trunc()))
                .unwrap_or(Value::Null),
            Builtin::String | Builtin::Str => args
                .first()
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null),
            Builtin::Bool => Value::Boolean(args.first().is_some_and(Value::is_truthy)),
            Builtin::TypeOf => Value::String(
                args.first()
                    .map(Value::type_name)
                    .unwrap_or("null")
                    .to_string(),
            ),

            Builtin::Rgb => match numbers::<3>(args) {
                Some([r, g, b]) => Value::Color(format!(
                    "#{:02x}{:02x}{:02x}",
                    channel(r),
                    channel(g),
                    channel(b)
                )),
                None => Value::Null,
            },
            Builtin::Rgba => match numbers::<4>(args) {
                Some([r, g, b, a]) => Value::Color(format!(
                    "#{:02x}{:02x}{:02x}{:02x}",
                    channel(r),
                    channel(g),
                    channel(b),
                    channel(a.clamp(0.0, 1.0) * 255.0)
                )),
                None => Value::Null,
            },
            Builtin::Hex => match args.first() {
                Some(Value::Color(c)) => Value::String(c.clone()),
                Some(Value::Emissive { color, .. }) => Value::String(color.clone()),
                Some(Value::String(s)) => {
                    let digits = s.trim_start_matches('#');
                    let valid = matches!(digits.len(), 3 | 4 | 6 | 8)
                        && digits.chars().all(|c| c.is_ascii_hexdigit());
                    if valid {
                        Value::Color(format!("#{}", digits.to_ascii_lowercase()))
                    } else {
                        Value::Null
                    }
                }
                _ => Value::Null,
            },

            Builtin::Vec2 => match numbers::<2>(args) {
                Some([x, y]) => Value::Vec2(x, y),
                None => Value::Null,
            },
            Builtin::Vec3 => match numbers::<3>(args) {
                Some([x, y, z]) => Value::Vec3(x, y, z),
                None => Value::Null,
            },
            Builtin::Length => match args.first() {
                Some(Value::Vec2(x, y)) => Value::Number(x.hypot(*y)),
                Some(Value::Vec3(x, y, z)) => Value::Number((x * x + y * y + z * z).sqrt()),
                _ => Value::Null,
            },
            Builtin::Distance => match args {
                [Value::Vec2(ax, ay), Value::Vec2(bx, by), ..] => {
                    Value::Number((bx - ax).hypot(by - ay))
                }
                [Value::Vec3(ax, ay, az), Value::Vec3(bx, by, bz), ..] => {
                    let (dx, dy, dz) = (bx - ax, by - ay, bz - az);
                    Value::Number((dx * dx + dy * dy + dz * dz).sqrt())
                }
                _ => Value::Null,
            },
            Builtin::Normalize => match args.first() {
                Some(Value::Vec2(x, y)) => {
                    let len = x.hypot(*y);
                    if len == 0.0 {
                        Value::Vec2(0.0, 0.0)
                    } else {
                        Value::Vec2(x / len, y / len)
                    }
                }
                Some(Value::Vec3(x, y, z)) => {
                    let len = (x * x + y * y + z * z).sqrt();
                    if len == 0.0 {
                        Value::Vec3(0.0, 0.0, 0.0)
                    } else {
                        Value::Vec3(x / len, y / len, z / len)
                    }
                }
                _ => Value::Null,
            },
            Builtin::Dot => match args {
                [Value::Vec2(ax, ay), Value::Vec2(bx, by), ..] => Value::Number(ax * bx + ay * by),
                [Value::Vec3(ax, ay, az), Value::Vec3(bx, by, bz), ..] => {
                    Value::Number(ax * bx + ay * by + az * bz)
                }
                _ => Value::Null,
            },

            Builtin::Ease => match args {
                [Value::String(name), Value::Number(t), ..] => Easing::parse(name)
                    .map(|easing| Value::Number(easing.apply(*t)))
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            },
            Builtin::Interpolate => interpolate(args),

            Builtin::Range => range(args),
            Builtin::Keys => match args.first() {
                Some(Value::Map(map)) => {
                    Value::List(map.keys().cloned().map(Value::String).collect())
                }
                _ => Value::Null,
            },
            Builtin::Values => match args.first() {
                Some(Value::Map(map)) => Value::List(map.values().cloned().collect()),
                _ => Value::Null,
            },
            Builtin::Has => match args {
                [Value::Map(map), Value::String(key), ..] => Value::Boolean(map.contains_key(key)),
                _ => Value::Null,
            },
        }
    }
}

fn numbers<const N: usize>(args: &[Value]) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    for (slot, arg) in out.iter_mut().zip(args.get(..N)?) {
        *slot = arg.as_number()?;
    }
    Some(out)
}

fn unary_math(args: &[Value], f: impl Fn(f64) -> f64) -> Value {
    match numbers::<1>(args) {
        Some([n]) => Value::Number(f(n)),
        None => Value::Null,
    }
}

fn binary_math(args: &[Value], f: impl Fn(f64, f64) -> f64) -> Value {
    match numbers::<2>(args) {
        Some([a, b]) => Value::Number(f(a, b)),
        None => Value::Null,
    }
}

/// `min`/`max` over their arguments, or over a single list argument.
fn fold_numbers(args: &[Value], f: impl Fn(f64, f64) -> f64) -> Value {
    let items = match args {
        [Value::List(items)] => items.as_slice(),
        _ => args,
    };
    let mut acc: Option<f64> = None;
    for item in items {
        let Some(n) = item.as_number() else {
            return Value::Null;
        };
        acc = Some(acc.map_or(n, |a| f(a, n)));
    }
    acc.map(Value::Number).unwrap_or(Value::Null)
}

fn map_string(args: &[Value], f: impl Fn(&str) -> String) -> Value {
    match args.first() {
        Some(Value::String(s)) => Value::String(f(s)),
        _ => Value::Null,
    }
}

fn substring(args: &[Value]) -> Value {
    let [Value::String(s), Value::Number(start), rest @ ..] = args else {
        return Value::Null;
    };
    let chars: Vec<char> = s.chars().collect();
    let start = (start.max(0.0) as usize).min(chars.len());
    let end = match rest.first() {
        Some(Value::Number(end)) => (end.max(0.0) as usize).min(chars.len()),
        _ => chars.len(),
    };
    if end <= start {
        return Value::String(String::new());
    }
    Value::String(chars[start..end].iter().collect())
}

fn channel(n: f64) -> u8 {
    n.round().clamp(0.0, 255.0) as u8
}

fn interpolate(args: &[Value]) -> Value {
    let (a, b, t) = match args {
        [a, b, Value::Number(t), ..] => (a, b, *t),
        _ => return Value::Null,
    };
    let t = match args.get(3) {
        Some(Value::String(name)) => match Easing::parse(name) {
            Some(easing) => easing.apply(t),
            None => return Value::Null,
        },
        _ => t,
    };
    let mix = |x: f64, y: f64| x + (y - x) * t;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Value::Number(mix(*x, *y)),
        (Value::Vec2(ax, ay), Value::Vec2(bx, by)) => Value::Vec2(mix(*ax, *bx), mix(*ay, *by)),
        (Value::Vec3(ax, ay, az), Value::Vec3(bx, by, bz)) => {
            Value::Vec3(mix(*ax, *bx), mix(*ay, *by), mix(*az, *bz))
        }
        _ => Value::Null,
    }
}

/// `range(n)` is `0..n`, `range(a, b)` is `a..b`, both exclusive.
fn range(args: &[Value]) -> Value {
    let (start, end) = match args {
        [Value::Number(end)] => (0.0, *end),
        [Value::Number(start), Value::Number(end), ..] => (*start, *end),
        [Value::Range(start, end)] => (*start, *end),
        _ => return Value::Null,
    };
    Value::List(range_values(start, end).take(MAX_RANGE_ITEMS).collect())
}

/// Integer steps from `start` towards `end`, exclusive. Lazy, so `for`
/// loops over large ranges never materialize them.
pub fn range_values(start: f64, end: f64) -> impl Iterator<Item = Value> {
    let count = if end > start {
        (end - start).ceil() as usize
    } else {
        0
    };
    (0..count).map(move |i| Value::Number(start + i as f64))
}

/// Builds a map value from `(key, value)` pairs.
pub fn object(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<BTreeMap<_, _>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    fn n(v: f64) -> Value {
        Value::Number(v)
    }

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    #[test]
    fn test_names_round_trip() {
        for builtin in Builtin::iter() {
            assert_eq!(Builtin::lookup(&builtin.to_string()), Some(builtin));
        }
        assert_eq!(Builtin::lookup("starts_with"), Some(Builtin::StartsWith));
        assert_eq!(Builtin::lookup("type_of"), Some(Builtin::TypeOf));
        assert_eq!(Builtin::lookup("vec3"), Some(Builtin::Vec3));
        assert_eq!(Builtin::lookup("atan2"), Some(Builtin::Atan2));
        assert_eq!(Builtin::lookup("teleport"), None);
    }

    #[test]
    fn test_math() {
        assert_eq!(Builtin::Abs.call(&[n(-3.0)]), n(3.0));
        assert_eq!(Builtin::Pow.call(&[n(2.0), n(10.0)]), n(1024.0));
        assert_eq!(Builtin::Min.call(&[n(4.0), n(2.0), n(8.0)]), n(2.0));
        assert_eq!(Builtin::Max.call(&[Value::List(vec![n(4.0), n(9.0)])]), n(9.0));
        assert_eq!(Builtin::Clamp.call(&[n(15.0), n(0.0), n(10.0)]), n(10.0));
        assert_eq!(Builtin::Lerp.call(&[n(0.0), n(10.0), n(0.25)]), n(2.5));
        assert_eq!(Builtin::Mod.call(&[n(-1.0), n(3.0)]), n(2.0));
        assert_eq!(Builtin::Mod.call(&[n(1.0), n(0.0)]), n(0.0));
        assert_eq!(Builtin::Sign.call(&[n(-0.5)]), n(-1.0));
    }

    #[test]
    fn test_wrong_shapes_are_null() {
        assert_eq!(Builtin::Abs.call(&[s("x")]), Value::Null);
        assert_eq!(Builtin::Sqrt.call(&[]), Value::Null);
        assert_eq!(Builtin::Upper.call(&[n(1.0)]), Value::Null);
        assert_eq!(Builtin::Clamp.call(&[n(1.0), n(5.0), n(0.0)]), Value::Null);
    }

    #[test]
    fn test_strings() {
        assert_eq!(Builtin::Upper.call(&[s("alarm")]), s("ALARM"));
        assert_eq!(Builtin::Trim.call(&[s("  x ")]), s("x"));
        assert_eq!(Builtin::Len.call(&[s("héllo")]), n(5.0));
        assert_eq!(
            Builtin::Contains.call(&[s("reactor core"), s("core")]),
            Value::Boolean(true)
        );
        assert_eq!(Builtin::Replace.call(&[s("a-b-c"), s("-"), s("+")]), s("a+b+c"));
        assert_eq!(Builtin::Substring.call(&[s("station"), n(1.0), n(4.0)]), s("tat"));
        assert_eq!(Builtin::Substring.call(&[s("abc"), n(5.0)]), s(""));
        assert_eq!(
            Builtin::Split.call(&[s("a,b"), s(",")]),
            Value::List(vec![s("a"), s("b")])
        );
        assert_eq!(
            Builtin::Join.call(&[Value::List(vec![n(1.0), s("x")]), s("-")]),
            s("1-x")
        );
    }

    #[test]
    fn test_coercion() {
        assert_eq!(Builtin::Number.call(&[s(" 4.5 ")]), n(4.5));
        assert_eq!(Builtin::Number.call(&[s("four")]), Value::Null);
        assert_eq!(Builtin::Int.call(&[n(-4.7)]), n(-4.0));
        assert_eq!(Builtin::Str.call(&[n(3.0)]), s("3"));
        assert_eq!(Builtin::Bool.call(&[s("")]), Value::Boolean(false));
        assert_eq!(Builtin::TypeOf.call(&[Value::Vec2(0.0, 0.0)]), s("vec2"));
    }

    #[test]
    fn test_colors() {
        assert_eq!(
            Builtin::Rgb.call(&[n(255.0), n(136.0), n(0.0)]),
            Value::Color("#ff8800".into())
        );
        assert_eq!(
            Builtin::Rgba.call(&[n(0.0), n(0.0), n(0.0), n(0.5)]),
            Value::Color("#00000080".into())
        );
        assert_eq!(Builtin::Hex.call(&[s("#FFF")]), Value::Color("#fff".into()));
        assert_eq!(Builtin::Hex.call(&[s("#ggg")]), Value::Null);
    }

    #[test]
    fn test_vectors() {
        assert_eq!(Builtin::Length.call(&[Value::Vec2(3.0, 4.0)]), n(5.0));
        assert_eq!(
            Builtin::Normalize.call(&[Value::Vec2(0.0, 2.0)]),
            Value::Vec2(0.0, 1.0)
        );
        assert_eq!(
            Builtin::Dot.call(&[Value::Vec3(1.0, 2.0, 3.0), Value::Vec3(4.0, 5.0, 6.0)]),
            n(32.0)
        );
        assert_eq!(
            Builtin::Distance.call(&[Value::Vec2(0.0, 0.0), Value::Vec2(3.0, 4.0)]),
            n(5.0)
        );
    }

    #[test]
    fn test_easing_and_interpolation() {
        assert_eq!(Builtin::Ease.call(&[s("quad-in"), n(0.5)]), n(0.25));
        assert_eq!(Builtin::Ease.call(&[s("wobble"), n(0.5)]), Value::Null);
        assert_eq!(
            Builtin::Interpolate.call(&[n(0.0), n(100.0), n(0.5), s("quad-in")]),
            n(25.0)
        );
        assert_eq!(
            Builtin::Interpolate.call(&[Value::Vec2(0.0, 0.0), Value::Vec2(2.0, 4.0), n(0.5)]),
            Value::Vec2(1.0, 2.0)
        );
    }

    #[test]
    fn test_collections() {
        assert_eq!(
            Builtin::Range.call(&[n(3.0)]),
            Value::List(vec![n(0.0), n(1.0), n(2.0)])
        );
        assert_eq!(Builtin::Range.call(&[n(5.0), n(2.0)]), Value::List(vec![]));
        let capped = Builtin::Range.call(&[n(1e9)]);
        assert!(matches!(capped, Value::List(items) if items.len() == MAX_RANGE_ITEMS));
        assert_eq!(range_values(0.0, 150_000.0).count(), 150_000);
        assert_eq!(range_values(0.5, 2.0).last(), Some(n(1.5)));

        let map = object(vec![("b", n(2.0)), ("a", n(1.0))]);
        assert_eq!(Builtin::Keys.call(&[map.clone()]), Value::List(vec![s("a"), s("b")]));
        assert_eq!(Builtin::Has.call(&[map, s("a")]), Value::Boolean(true));
    }
}
