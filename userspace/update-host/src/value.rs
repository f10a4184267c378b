// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration values shared by every resolver tier.

use std::fmt;

use log::warn;

/// A resolved configuration value. Absence is modelled as `Option::None` by callers.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Data(Vec<u8>),
}

impl ConfigValue {
    /// Coerces the value to a boolean the way preference stores do.
    ///
    /// Integers are true when non-zero; strings are true for `yes`, `true` or `1`
    /// (case-insensitive). Data is never true.
    pub fn as_bool(&self) -> bool {
        match self {
            ConfigValue::Bool(value) => *value,
            ConfigValue::Integer(value) => *value != 0,
            ConfigValue::Float(value) => *value != 0.0,
            ConfigValue::String(value) => {
                let value = value.trim();
                value.eq_ignore_ascii_case("yes")
                    || value.eq_ignore_ascii_case("true")
                    || value == "1"
            }
            ConfigValue::Data(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::String(_) => "string",
            ConfigValue::Data(_) => "data",
        }
    }

    /// Converts a TOML value into a configuration value.
    ///
    /// Arrays are accepted only when every element is a byte (`Data`); tables are
    /// not representable and yield `None`.
    pub fn from_toml(key: &str, value: toml::Value) -> Option<Self> {
        match value {
            toml::Value::Boolean(value) => Some(ConfigValue::Bool(value)),
            toml::Value::Integer(value) => Some(ConfigValue::Integer(value)),
            toml::Value::Float(value) => Some(ConfigValue::Float(value)),
            toml::Value::String(value) => Some(ConfigValue::String(value)),
            toml::Value::Datetime(value) => Some(ConfigValue::String(value.to_string())),
            toml::Value::Array(items) => {
                let mut bytes = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_integer().and_then(|v| u8::try_from(v).ok()) {
                        Some(byte) => bytes.push(byte),
                        None => {
                            warn!("manifest key {key}: array is not a byte string, ignoring");
                            return None;
                        }
                    }
                }
                Some(ConfigValue::Data(bytes))
            }
            toml::Value::Table(_) => {
                warn!("manifest key {key}: tables are not supported, ignoring");
                None
            }
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(value) => write!(f, "{value}"),
            ConfigValue::Integer(value) => write!(f, "{value}"),
            ConfigValue::Float(value) => write!(f, "{value}"),
            ConfigValue::String(value) => f.write_str(value),
            ConfigValue::Data(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<Vec<u8>> for ConfigValue {
    fn from(value: Vec<u8>) -> Self {
        ConfigValue::Data(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_coercion() {
        assert!(ConfigValue::Bool(true).as_bool());
        assert!(!ConfigValue::Bool(false).as_bool());
        assert!(ConfigValue::Integer(3).as_bool());
        assert!(!ConfigValue::Integer(0).as_bool());
        assert!(ConfigValue::from("YES").as_bool());
        assert!(ConfigValue::from(" true ").as_bool());
        assert!(ConfigValue::from("1").as_bool());
        assert!(!ConfigValue::from("no").as_bool());
        assert!(!ConfigValue::Data(vec![1]).as_bool());
    }

    #[test]
    fn toml_conversion() {
        let bytes = toml::Value::Array(vec![toml::Value::Integer(1), toml::Value::Integer(255)]);
        assert_eq!(ConfigValue::from_toml("k", bytes), Some(ConfigValue::Data(vec![1, 255])));

        let mixed = toml::Value::Array(vec![toml::Value::String("a".into())]);
        assert_eq!(ConfigValue::from_toml("k", mixed), None);
        assert_eq!(ConfigValue::from_toml("k", toml::Value::Table(Default::default())), None);
        assert_eq!(
            ConfigValue::from_toml("k", toml::Value::Integer(86400)),
            Some(ConfigValue::Integer(86400))
        );
    }
}
