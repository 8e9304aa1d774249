//! Dynamic values carried by template cells.
//!
//! Attribute literals parse into numbers, percentages, or text. Spread targets
//! are [`Value::Object`]s whose ordered fields become attributes.

use std::fmt;
use std::rc::Rc;

use crate::reactive::Identity;

/// Ordered field list of an object value. Duplicate keys are kept.
pub type Fields = Vec<(String, Value)>;

/// A dynamically typed value.
///
/// Lists and objects are reference values: two of them are the *same* only if
/// they share the allocation, which keeps identity checks O(1).
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value. Subscribers are not initialised with it.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    /// A number with a `%` unit, e.g. `50%`.
    Percent(f64),
    Text(String),
    List(Rc<Vec<Value>>),
    Object(Rc<Fields>),
}

impl Value {
    /// Build an object value from `(key, value)` pairs, preserving order.
    pub fn object<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(Rc::new(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// Build a list value.
    pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::List(Rc::new(items.into_iter().map(Into::into).collect()))
    }

    /// Parse an attribute literal into a typed value.
    ///
    /// `"120"` becomes a number, `"50%"` a percentage, anything else stays text.
    pub fn parse_literal(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Text(raw.to_owned());
        }
        if let Some(number) = trimmed.strip_suffix('%') {
            if let Some(n) = parse_finite(number.trim_end()) {
                return Value::Percent(n);
            }
        }
        match parse_finite(trimmed) {
            Some(n) => Value::Number(n),
            None => Value::Text(raw.to_owned()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) | Value::Percent(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Object fields, if this is an object.
    pub fn fields(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// First field with the given key.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Truthiness: null, `false`, zero, NaN and empty text are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) | Value::Percent(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
            Value::List(_) | Value::Object(_) => true,
        }
    }
}

// Rejects "nan" and "inf" spellings that `f64::from_str` accepts.
fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `Object.is`-style number identity: NaN is itself, `0.0` and `-0.0` differ.
fn same_number(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

impl Identity for Value {
    fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => same_number(*a, *b),
            (Value::Percent(a), Value::Percent(b)) => same_number(*a, *b),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn is_nullish(&self) -> bool {
        self.is_null()
    }
}

/// Structural equality, used by tests and callers comparing contents rather
/// than identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Percent(a), Value::Percent(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write_number(f, *n),
            Value::Percent(n) => {
                write_number(f, *n)?;
                f.write_str("%")
            }
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Object(fields) => {
                f.write_str("{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number() {
        assert_eq!(Value::parse_literal("120"), Value::Number(120.0));
        assert_eq!(Value::parse_literal("-1.5"), Value::Number(-1.5));
    }

    #[test]
    fn parse_percentage() {
        assert_eq!(Value::parse_literal("50%"), Value::Percent(50.0));
        assert_eq!(Value::parse_literal("12.5 %"), Value::Percent(12.5));
    }

    #[test]
    fn parse_text() {
        assert_eq!(Value::parse_literal("panel"), Value::from("panel"));
        assert_eq!(Value::parse_literal("abc%"), Value::from("abc%"));
        assert_eq!(Value::parse_literal(""), Value::from(""));
        assert_eq!(Value::parse_literal("nan"), Value::from("nan"));
        assert_eq!(Value::parse_literal("inf"), Value::from("inf"));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Number(5.0).to_string(), "5");
        assert_eq!(Value::Number(0.25).to_string(), "0.25");
        assert_eq!(Value::Percent(50.0).to_string(), "50%");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::list([1, 2, 3]).to_string(), "1,2,3");
        assert_eq!(Value::object([("a", 1)]).to_string(), "{a: 1}");
    }

    #[test]
    fn identity_of_reference_values() {
        let a = Value::object([("id", "y")]);
        let b = Value::object([("id", "y")]);
        assert!(a.is_same(&a.clone()));
        assert!(!a.is_same(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn identity_of_numbers() {
        assert!(Value::Number(f64::NAN).is_same(&Value::Number(f64::NAN)));
        assert!(!Value::Number(0.0).is_same(&Value::Number(-0.0)));
        assert!(!Value::Number(1.0).is_same(&Value::Percent(1.0)));
    }

    #[test]
    fn field_lookup() {
        let v = Value::object([("a", Value::from(1)), ("b", Value::from("x"))]);
        assert_eq!(v.field("b"), Some(&Value::from("x")));
        assert!(v.field("c").is_none());
        assert!(Value::from("x").fields().is_none());
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("a").is_truthy());
        assert!(Value::object(Vec::<(String, Value)>::new()).is_truthy());
    }
}
