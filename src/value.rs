//! The SQL value domain and the three-valued logic used to evaluate predicates.
//!
//! `Value` is the tagged sum every expression evaluates to. `Truth` is kept
//! separate from `Value` on purpose: predicate evaluation needs a boolean
//! that can also be `Unknown`, and folding that into `Value::Null` would
//! force every caller to re-derive "is this actually NULL or just an
//! unknown comparison" from context.

use std::cmp::Ordering;
use std::fmt;

/// A value in the SQL value domain.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns `true` if this value is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Coerces the value to `f64` if it is numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Renders the value as text, the way `||` and string functions expect.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Bytes(b) => b.iter().map(|byte| format!("{byte:02x}")).collect(),
        }
    }

    /// Loose equality: used for `=`/`<>` text/number coercion, `CASE` simple
    /// form, row-equality in `DISTINCT`/`GROUP BY`/set ops (where two `Null`s
    /// are considered equal), and `IN` list matching.
    ///
    /// This is NOT the predicate-context `=` operator — that goes through
    /// [`crate::eval`] and returns a [`Truth`], not a `bool`.
    #[must_use]
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (a, b) if a.as_f64().is_some() && b.as_f64().is_some() => {
                (a.as_f64().unwrap() - b.as_f64().unwrap()).abs() < f64::EPSILON
            }
            (Self::Text(s), other) | (other, Self::Text(s)) => {
                other.as_f64().is_some_and(|n| s.parse::<f64>().is_ok_and(|p| (p - n).abs() < f64::EPSILON))
            }
            _ => false,
        }
    }

    /// Total order used by strict comparisons (`<`, `<=`, `>`, `>=`) across
    /// mismatched kinds. Numeric values order before text, text orders
    /// before bytes; within a kind the natural order applies. Callers must
    /// have already ruled out `Null` operands — SQL three-valued rules
    /// handle those, not this order.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Bool(_) => 0,
                Value::Int(_) | Value::Float(_) => 1,
                Value::Text(_) => 2,
                Value::Bytes(_) => 3,
                Value::Null => 4,
            }
        }
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (a, b) if a.as_f64().is_some() && b.as_f64().is_some() => a
                .as_f64()
                .unwrap()
                .partial_cmp(&b.as_f64().unwrap())
                .unwrap_or(Ordering::Equal),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "x'{}'", b.iter().map(|byte| format!("{byte:02x}")).collect::<String>()),
        }
    }
}

/// Trait for Rust types that can be lifted into the SQL value domain.
///
/// Mirrors the conversions a concrete table source needs when handing rows
/// (built from native Rust types) to the evaluator.
pub trait ToValue {
    /// Converts `self` into a [`Value`].
    fn to_value(self) -> Value;
}

impl ToValue for Value {
    fn to_value(self) -> Value {
        self
    }
}

impl ToValue for bool {
    fn to_value(self) -> Value {
        Value::Bool(self)
    }
}

macro_rules! impl_to_value_int {
    ($($t:ty),*) => {
        $(impl ToValue for $t {
            fn to_value(self) -> Value {
                Value::Int(i64::from(self))
            }
        })*
    };
}
impl_to_value_int!(i64, i32, i16, i8, u32, u16, u8);

impl ToValue for f64 {
    fn to_value(self) -> Value {
        Value::Float(self)
    }
}

impl ToValue for f32 {
    fn to_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl ToValue for String {
    fn to_value(self) -> Value {
        Value::Text(self)
    }
}

impl ToValue for &str {
    fn to_value(self) -> Value {
        Value::Text(String::from(self))
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl ToValue for Vec<u8> {
    fn to_value(self) -> Value {
        Value::Bytes(self)
    }
}

/// SQL three-valued logic: `True`, `False`, or `Unknown`.
///
/// Produced by predicate evaluation (`eval_bool`). Collapses to `false` only
/// at the row-inclusion boundary (WHERE/HAVING/ON/join-match acceptance);
/// everywhere else it must stay distinguishable from plain `false` so that
/// e.g. `NOT Unknown` still yields `Unknown`, not `True`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    /// Definitely true.
    True,
    /// Definitely false.
    False,
    /// Neither — a `NULL` participated in the comparison.
    Unknown,
}

impl Truth {
    /// Lifts a plain `bool` into `Truth`.
    #[must_use]
    pub const fn from_bool(b: bool) -> Self {
        if b {
            Self::True
        } else {
            Self::False
        }
    }

    /// Collapses to a plain `bool` for row-inclusion decisions: `Unknown`
    /// behaves like `false`.
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    /// SQL `NOT`: `NOT Unknown = Unknown`.
    #[must_use]
    pub const fn not(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }

    /// SQL `AND` with short-circuit-compatible truth table:
    /// `false AND x = false`, `true AND true = true`, else `unknown`.
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, Self::True) => Self::True,
            _ => Self::Unknown,
        }
    }

    /// SQL `OR` with short-circuit-compatible truth table:
    /// `true OR x = true`, `false OR false = false`, else `unknown`.
    #[must_use]
    pub const fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::False, Self::False) => Self::False,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Truth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "TRUE"),
            Self::False => write!(f, "FALSE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}
