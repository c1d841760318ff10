//! Scalar values stored in a configuration tree.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar configuration value.
///
/// TOML and YAML keep their native scalar types; INI values are always
/// [`ConfigValue::String`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ConfigValue {
    /// Returns the string content of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Reads the value as a number. Strings are parsed after trimming.
    ///
    /// Integers (and integer strings) beyond `2^53 - 1` in magnitude have no
    /// exact `f64` and read as `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Integer(i) => exact_integer(*i),
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::String(s) => {
                let s = s.trim();
                match s.parse::<i64>() {
                    Ok(i) => exact_integer(i),
                    Err(_) => s.parse().ok(),
                }
            }
            ConfigValue::Bool(_) => None,
        }
    }

    /// Reads the value as source text: strings verbatim, numbers formatted.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            ConfigValue::String(s) => Some(Cow::Borrowed(s)),
            ConfigValue::Integer(i) => Some(Cow::Owned(i.to_string())),
            ConfigValue::Float(f) => Some(Cow::Owned(f.to_string())),
            ConfigValue::Bool(_) => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::String(_) => "string",
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Integer(i) => write!(f, "{i}"),
            ConfigValue::Float(x) => write!(f, "{x}"),
            ConfigValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_owned())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<f64> for ConfigValue {
    fn from(x: f64) -> Self {
        ConfigValue::Float(x)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Integer(i)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

/// Largest integer magnitude an `f64` holds exactly.
const MAX_EXACT_INTEGER: u64 = (1u64 << f64::MANTISSA_DIGITS) - 1;

fn exact_integer(i: i64) -> Option<f64> {
    (i.unsigned_abs() <= MAX_EXACT_INTEGER).then_some(i as f64)
}
