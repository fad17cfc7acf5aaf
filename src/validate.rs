//! Shape checks shared by every document reader: policy key syntax, and
//! detection of fields a document carries but the reader does not consume.
//!
//! Unknown fields are never fatal. They usually mean a typo (`descripton`) or
//! a document written by a newer version, so readers log them and move on.

use serde::Deserialize;
use tracing::warn;

use crate::error::BravetuneError;

/// Check that `key` matches `[A-Za-z][A-Za-z0-9]*`, the naming convention
/// for Chromium policy identifiers.
pub fn check_key(key: &str) -> Result<(), BravetuneError> {
    let mut chars = key.chars();
    let valid = match chars.next() {
        Some(first) => first.is_ascii_alphabetic() && chars.all(|c| c.is_ascii_alphanumeric()),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(BravetuneError::InvalidKey { key: key.into() })
    }
}

/// Deserialize a YAML document, collecting the paths of any fields `T` does
/// not consume.
pub fn yaml_with_unknown<T>(content: &str) -> Result<(T, Vec<String>), serde_yaml::Error>
where
    T: for<'de> Deserialize<'de>,
{
    let mut unknown = Vec::new();
    let deserializer = serde_yaml::Deserializer::from_str(content);
    let value: T = serde_ignored::deserialize(deserializer, |path| {
        unknown.push(path.to_string());
    })?;
    Ok((value, unknown))
}

/// Log each unknown field found in `origin`.
pub fn warn_unknown(origin: &str, unknown: &[String]) {
    for field in unknown {
        warn!(origin, field = %field, "ignoring unknown field");
    }
}

/// Deserialize a TOML document, collecting unknown field paths.
pub fn toml_with_unknown<T>(content: &str) -> Result<(T, Vec<String>), toml::de::Error>
where
    T: for<'de> Deserialize<'de>,
{
    let mut unknown = Vec::new();
    let deserializer = toml::Deserializer::new(content);
    let value: T = serde_ignored::deserialize(deserializer, |path| {
        unknown.push(path.to_string());
    })?;
    Ok((value, unknown))
}
