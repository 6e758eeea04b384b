//! Values produced by constant evaluation

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// A compile-time constant value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Unit `()`
    Unit,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
    /// Unicode scalar
    Char(char),
    /// Owned string
    String(String),
    /// Growable vector
    Vec(Vec<Value>),
    /// Fixed tuple
    Tuple(Vec<Value>),
    /// Object with fields in insertion order
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Returns the integer value if this is an integer
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the boolean value if this is a boolean
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the float value if this is a float
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string slice if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the elements of a vec
    #[must_use]
    pub fn as_vec(&self) -> Option<&[Value]> {
        match self {
            Self::Vec(values) => Some(values),
            _ => None,
        }
    }

    /// Human-readable type name used in diagnostics
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Char(_) => "char",
            Self::String(_) => "string",
            Self::Vec(_) => "vec",
            Self::Tuple(_) => "tuple",
            Self::Object(_) => "object",
        }
    }

    /// Debug-style rendering: strings and chars are quoted
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Self::String(value) => format!("{value:?}"),
            Self::Char(value) => format!("{value:?}"),
            other => other.to_string(),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_finite() && value.fract() == 0.0 {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&value.repr())?;
    }
    Ok(())
}

/// Template rendering: top-level strings and chars are written raw
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write_float(f, *value),
            Self::Char(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
            Self::Vec(values) => {
                f.write_str("[")?;
                write_seq(f, values)?;
                f.write_str("]")
            }
            Self::Tuple(values) => {
                f.write_str("(")?;
                write_seq(f, values)?;
                if values.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Self::Object(fields) => {
                f.write_str("#{")?;
                for (index, (key, value)) in fields.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {}", value.repr())?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_writes_strings_raw_inside_templates() {
        assert_eq!(Value::from("Jane").to_string(), "Jane");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        let greetings = Value::Vec(vec![Value::from("a"), Value::Integer(1)]);
        assert_eq!(greetings.to_string(), r#"["a", 1]"#);
    }

    #[test]
    fn serializes_as_plain_json() {
        let mut fields = IndexMap::new();
        fields.insert("answer".to_string(), Value::Integer(42));
        fields.insert("names".to_string(), Value::Vec(vec![Value::from("Mio")]));
        let json = serde_json::to_string(&Value::Object(fields)).unwrap();
        assert_eq!(json, r#"{"answer":42,"names":["Mio"]}"#);
    }

    #[test]
    fn one_tuple_keeps_trailing_comma() {
        assert_eq!(Value::Tuple(vec![Value::Unit]).to_string(), "((),)");
    }
}
