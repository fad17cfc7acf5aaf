//! The typed setting model: a policy key, a typed value, and the row shape
//! used by every YAML document the crate reads or writes.
//!
//! Values arrive from YAML as untyped scalars. [`Setting::from_raw`] coerces
//! them against the declared type and rejects anything that does not fit, so a
//! constructed [`Setting`] always holds a value of its own kind.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::Value as RawValue;

use crate::error::BravetuneError;
use crate::validate;

/// The declared type of a setting, as written in the `type` field of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Integer,
    String,
}

impl ValueKind {
    /// Parse a type tag. Accepts `bool`/`boolean`, `integer`/`int` and
    /// `string`, case-insensitively.
    pub fn parse_tag(key: &str, tag: &str) -> Result<Self, BravetuneError> {
        match tag.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(ValueKind::Bool),
            "integer" | "int" => Ok(ValueKind::Integer),
            "string" => Ok(ValueKind::String),
            _ => Err(BravetuneError::UnknownType {
                key: key.into(),
                tag: tag.into(),
            }),
        }
    }

    /// The canonical tag written back to documents.
    pub fn tag(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::String => "string",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Str(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Integer(_) => ValueKind::Integer,
            Value::Str(_) => ValueKind::String,
        }
    }

    /// The form the preference store prints for this value: booleans as
    /// `1`/`0`, everything else in its natural string form.
    pub fn normalized(&self) -> String {
        match self {
            Value::Bool(true) => "1".into(),
            Value::Bool(false) => "0".into(),
            Value::Integer(n) => n.to_string(),
            Value::Str(s) => s.clone(),
        }
    }

    fn to_raw(&self) -> RawValue {
        match self {
            Value::Bool(b) => RawValue::Bool(*b),
            Value::Integer(n) => RawValue::Number((*n).into()),
            Value::Str(s) => RawValue::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// A single preference key with a typed value. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Setting {
    key: String,
    value: Value,
}

impl Setting {
    /// Build a setting from an already-typed value, validating the key.
    pub fn new(key: impl Into<String>, value: Value) -> Result<Self, BravetuneError> {
        let key = key.into();
        validate::check_key(&key)?;
        Ok(Self { key, value })
    }

    /// Build a setting from an untyped document value and a declared kind.
    pub fn from_raw(key: &str, raw: &RawValue, kind: ValueKind) -> Result<Self, BravetuneError> {
        validate::check_key(key)?;
        let value = coerce(key, raw, kind)?;
        Ok(Self {
            key: key.to_string(),
            value,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    /// The `(key, value, type)` row written to documents.
    pub fn to_row(&self) -> SettingRow {
        SettingRow {
            key: self.key.clone(),
            value: self.value.to_raw(),
            kind: self.kind().tag().to_string(),
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.key, self.value)
    }
}

/// On-disk shape of one setting: `{key, value, type}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingRow {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: RawValue,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl SettingRow {
    pub fn to_setting(&self) -> Result<Setting, BravetuneError> {
        let kind = ValueKind::parse_tag(&self.key, &self.kind)?;
        Setting::from_raw(&self.key, &self.value, kind)
    }
}

fn coerce(key: &str, raw: &RawValue, kind: ValueKind) -> Result<Value, BravetuneError> {
    let fail = || BravetuneError::TypeConversion {
        key: key.into(),
        kind,
        found: describe(raw),
    };
    match kind {
        ValueKind::Bool => match raw {
            RawValue::Bool(b) => Ok(Value::Bool(*b)),
            RawValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
        ValueKind::Integer => match raw {
            RawValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else if n.is_u64() {
                    // Larger than i64::MAX.
                    Err(fail())
                } else {
                    let t = n.as_f64().ok_or_else(fail)?.trunc();
                    // NaN and infinities fall outside the range too.
                    if (i64::MIN as f64..i64::MAX as f64).contains(&t) {
                        Ok(Value::Integer(t as i64))
                    } else {
                        Err(fail())
                    }
                }
            }
            RawValue::String(s) => s.trim().parse::<i64>().map(Value::Integer).map_err(|_| fail()),
            _ => Err(fail()),
        },
        ValueKind::String => match raw {
            RawValue::String(s) => Ok(Value::Str(s.clone())),
            _ => Err(fail()),
        },
    }
}

fn describe(raw: &RawValue) -> String {
    match raw {
        RawValue::Null => "null".into(),
        RawValue::Bool(b) => format!("bool {b}"),
        RawValue::Number(n) => format!("number {n}"),
        RawValue::String(s) => format!("string {s:?}"),
        RawValue::Sequence(_) => "a list".into(),
        RawValue::Mapping(_) => "a mapping".into(),
        RawValue::Tagged(_) => "a tagged value".into(),
    }
}
