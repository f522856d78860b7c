//! Property values and their coercion kinds.

use std::fmt;

use serde_json::{Number, Value};

/// Coercion rule of a property, fixed by the runtime type of its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropKind {
    /// Passed through unchanged in both directions.
    Text,
    /// Presence encoding.
    Flag,
    /// JSON encoding with raw-string fallback.
    Data,
}

/// A property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Text(String),
    Flag(bool),
    Data(Value),
}

impl PropValue {
    /// The coercion kind this value selects when used as a default.
    #[must_use]
    pub fn kind(&self) -> PropKind {
        match self {
            Self::Text(_) => PropKind::Text,
            Self::Flag(_) => PropKind::Flag,
            Self::Data(_) => PropKind::Data,
        }
    }

    /// Re-express the value in the shape expected by `kind` where that is
    /// lossless. Values that do not fit are kept as they are.
    ///
    /// Data values come out with integral floats stored as integers, so `5.0`
    /// equals and encodes like `5`.
    #[must_use]
    pub fn conform(self, kind: PropKind) -> Self {
        match (kind, self) {
            (PropKind::Text, Self::Data(Value::String(s))) => Self::Text(s),
            (PropKind::Flag, Self::Data(Value::Bool(b))) => Self::Flag(b),
            (PropKind::Data, Self::Text(s)) => Self::Data(Value::String(s)),
            (PropKind::Data, Self::Flag(b)) => Self::Data(Value::Bool(b)),
            (PropKind::Data, Self::Data(v)) => Self::Data(canonical_json(v)),
            (_, other) => other,
        }
    }

    /// Build a value from a JSON payload entry for a property of `kind`.
    #[must_use]
    pub fn from_json(kind: PropKind, value: Value) -> Self {
        Self::Data(value).conform(kind)
    }

    /// JSON view of the value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Flag(b) => Value::Bool(*b),
            Self::Data(v) => v.clone(),
        }
    }

    /// Truthiness used by flag encoding: empty text, `false`, `null`, zero and
    /// the empty string are falsy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Text(s) => !s.is_empty(),
            Self::Flag(b) => *b,
            Self::Data(v) => match v {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
                Value::String(s) => !s.is_empty(),
                Value::Array(_) | Value::Object(_) => true,
            },
        }
    }

    /// Text content, for text values and JSON strings.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Data(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            Self::Data(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_data().and_then(Value::as_i64)
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_data().and_then(Value::as_f64)
    }
}

/// `value` with every integral finite float replaced by the equal integer.
#[must_use]
pub fn canonical_json(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(canonical_number(n)),
        Value::Array(items) => Value::Array(items.into_iter().map(canonical_json).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, canonical_json(v))).collect())
        }
        other => other,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn canonical_number(n: Number) -> Number {
    let Some(f) = n.as_f64().filter(|f| n.is_f64() && f.is_finite() && f.fract() == 0.0) else {
        return n;
    };
    // i64::MAX and u64::MAX round up to a power of two as f64, so upper bounds are exclusive.
    if f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Number::from(f as i64)
    } else if f >= 0.0 && f < u64::MAX as f64 {
        Number::from(f as u64)
    } else {
        n
    }
}

impl fmt::Display for PropValue {
    /// Plain textual rendering: strings unquoted, everything else as JSON.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Flag(b) => write!(f, "{b}"),
            Self::Data(Value::String(s)) => f.write_str(s),
            Self::Data(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Data(Value::from(value))
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Data(Value::from(value))
    }
}

impl From<u64> for PropValue {
    fn from(value: u64) -> Self {
        Self::Data(Value::from(value))
    }
}

impl From<f64> for PropValue {
    /// Non-finite numbers have no JSON form and become `null`.
    fn from(value: f64) -> Self {
        Self::Data(Value::from(value))
    }
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}
