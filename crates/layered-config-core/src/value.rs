//! Scalar values and their string form
//!
//! Sources deliver text; defaults and writes arrive as native values. Both
//! meet here: `parse` coerces either into the requested [`ValueKind`], and
//! `stringify` produces the canonical text written back to a source.
//!
//! Parsing never invents a value: absent input yields absent output for
//! every kind. Boolean coercion is permissive and never fails.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of kinds a configuration value can be declared as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(ValueKind::String),
            "integer" | "int" => Ok(ValueKind::Integer),
            "float" => Ok(ValueKind::Float),
            "boolean" | "bool" => Ok(ValueKind::Boolean),
            other => Err(ConfigError::Settings(format!("unknown value kind: {}", other))),
        }
    }
}

/// A configuration value, either raw text from a source or a native scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// The kind this value already has, without coercion
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Boolean(_) => ValueKind::Boolean,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&stringify(self))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

/// Canonical string form of a value
///
/// Integral floats keep a trailing `.0` so the text still reads as a float.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => {
            let text = f.to_string();
            if f.is_finite() && !text.contains(['.', 'e', 'E']) {
                format!("{}.0", text)
            } else {
                text
            }
        }
        Value::Boolean(b) => b.to_string(),
    }
}

/// Coerce a value into `kind`
///
/// Numeric text is parsed without locale rules after trimming surrounding
/// whitespace. Floats truncate toward zero when read as integers.
pub fn parse(kind: ValueKind, value: Option<&Value>) -> ConfigResult<Option<Value>> {
    let Some(value) = value else {
        return Ok(None);
    };

    let parsed = match kind {
        ValueKind::String => Value::String(stringify(value)),
        ValueKind::Integer => Value::Integer(parse_integer(value)?),
        ValueKind::Float => Value::Float(parse_float(value)?),
        ValueKind::Boolean => Value::Boolean(parse_boolean(value)),
    };
    Ok(Some(parsed))
}

fn parse_integer(value: &Value) -> ConfigResult<i64> {
    match value {
        Value::Integer(i) => Ok(*i),
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
        Value::Float(f) if (i64::MIN as f64..i64::MAX as f64).contains(&f.trunc()) => {
            Ok(f.trunc() as i64)
        }
        Value::Float(f) => Err(ConfigError::parse(
            ValueKind::Integer,
            f.to_string(),
            "float is outside the integer range",
        )),
        Value::Boolean(b) => Ok(i64::from(*b)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| ConfigError::parse(ValueKind::Integer, s.as_str(), e)),
    }
}

fn parse_float(value: &Value) -> ConfigResult<f64> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Integer(i) => Ok(*i as f64),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| ConfigError::parse(ValueKind::Float, s.as_str(), e)),
    }
}

// Only a case-insensitive "true" is true.
fn parse_boolean(value: &Value) -> bool {
    match value {
        Value::Boolean(b) => *b,
        other => stringify(other).eq_ignore_ascii_case("true"),
    }
}
