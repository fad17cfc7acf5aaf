//! The tool's own settings and how they are layered.
//!
//! Lowest priority first:
//!
//! 1. Compiled defaults (the `#[config(default = ...)]` attributes below)
//! 2. `bravetune.toml` files, in search-path order
//! 3. `BRAVETUNE__*` environment variables
//! 4. Programmatic overrides as dotted keys (`--beta` sets `variant`)
//!
//! Every layer is a `toml::Table`. They are deep-merged, deserialized into the
//! confique layer, and confique fills in defaults. No I/O happens in
//! [`resolve`]; callers load files and collect env vars beforehand.

use std::path::PathBuf;
use std::time::Duration;

use confique::Config;
use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::env;
use crate::error::BravetuneError;
use crate::merge::deep_merge;
use crate::store::Timeouts;
use crate::target::{Target, Variant};
use crate::validate;

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolConfig {
    /// Brave release channel to manage: "stable" or "beta".
    #[config(default = "stable")]
    pub variant: Variant,

    /// Where the desired-state document is kept.
    /// Defaults to ~/.config/bravetune/bravetune.yaml.
    pub desired_state_path: Option<PathBuf>,

    /// Directory for user preference backups.
    /// Defaults to ~/Library/Application Support/bravetune/backups.
    pub backup_dir: Option<PathBuf>,

    /// Base preset for Privacy Guides when neither --base nor the saved
    /// state names one.
    #[config(default = "quick")]
    pub default_supplement_base: String,

    /// Subprocess time limits.
    #[config(nested)]
    pub timeouts: TimeoutConfig,
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeoutConfig {
    /// Seconds allowed for `defaults`, `pgrep` and other store commands.
    #[config(default = 30)]
    pub store_secs: u64,

    /// Seconds allowed for a command behind the administrator prompt,
    /// including the time the prompt is on screen.
    #[config(default = 90)]
    pub elevated_secs: u64,
}

impl ToolConfig {
    pub fn target(&self) -> Target {
        Target::new(self.variant)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            store: Duration::from_secs(self.timeouts.store_secs),
            elevated: Duration::from_secs(self.timeouts.elevated_secs),
        }
    }
}

/// Pre-loaded inputs for [`resolve`].
#[derive(Debug, Default)]
pub struct ConfigInput {
    /// File contents, lowest priority first.
    pub files: Vec<(PathBuf, String)>,
    /// Raw environment pairs. Ignored when `env_prefix` is `None`.
    pub env_vars: Vec<(String, String)>,
    pub env_prefix: Option<String>,
    /// `(dotted_key, value)` pairs. The last entry for a key wins.
    pub overrides: Vec<(String, Value)>,
}

pub fn resolve(input: ConfigInput) -> Result<ToolConfig, BravetuneError> {
    let mut merged = Table::new();
    for (path, content) in &input.files {
        let (_, unknown): (<ToolConfig as Config>::Layer, _) = validate::toml_with_unknown(content)
            .map_err(|e| BravetuneError::ConfigParse {
                path: path.clone(),
                source: e,
            })?;
        validate::warn_unknown(&path.display().to_string(), &unknown);

        let table: Table = toml::from_str(content).map_err(|e| BravetuneError::ConfigParse {
            path: path.clone(),
            source: e,
        })?;
        merged = deep_merge(merged, table);
    }

    if let Some(prefix) = &input.env_prefix {
        merged = deep_merge(merged, env::env_to_table(prefix, input.env_vars));
    }

    if !input.overrides.is_empty() {
        merged = deep_merge(merged, overrides_to_table(&input.overrides));
    }

    let layer: <ToolConfig as Config>::Layer =
        Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| BravetuneError::InvalidValue {
                key: "<merged>".into(),
                reason: e.to_string(),
            })?;

    ToolConfig::builder()
        .preloaded(layer)
        .load()
        .map_err(BravetuneError::from)
}

/// Expand dotted-key overrides into a nested table.
///
/// `("timeouts.store_secs", 5)` becomes `{timeouts = {store_secs = 5}}`. A
/// scalar in the way of a deeper key is replaced by a table.
pub fn overrides_to_table(entries: &[(String, Value)]) -> Table {
    let mut table = Table::new();
    for (dotted_key, value) in entries {
        let segments: Vec<&str> = dotted_key.split('.').collect();
        set_nested(&mut table, &segments, value.clone());
    }
    table
}

fn set_nested(table: &mut Table, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [leaf] => {
            table.insert(leaf.to_string(), value);
        }
        [first, rest @ ..] => {
            let slot = table
                .entry(*first)
                .or_insert_with(|| Value::Table(Table::new()));
            if !slot.is_table() {
                *slot = Value::Table(Table::new());
            }
            if let Value::Table(sub) = slot {
                set_nested(sub, rest, value);
            }
        }
    }
}

/// A commented `bravetune.toml` listing every setting and its default.
pub fn template() -> String {
    confique::toml::template::<ToolConfig>(confique::toml::FormatOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content: &str) -> (PathBuf, String) {
        ("bravetune.toml".into(), content.into())
    }

    #[test]
    fn defaults_only() {
        let config = resolve(ConfigInput::default()).unwrap();
        assert_eq!(config.variant, Variant::Stable);
        assert_eq!(config.default_supplement_base, "quick");
        assert_eq!(config.desired_state_path, None);
        assert_eq!(config.timeouts().store, Duration::from_secs(30));
        assert_eq!(config.timeouts().elevated, Duration::from_secs(90));
    }

    #[test]
    fn later_file_wins() {
        let config = resolve(ConfigInput {
            files: vec![
                file("variant = \"beta\"\ndefault_supplement_base = \"max-privacy\"\n"),
                file("variant = \"stable\"\n"),
            ],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.variant, Variant::Stable);
        assert_eq!(config.default_supplement_base, "max-privacy");
    }

    #[test]
    fn env_overrides_file_and_overrides_win() {
        let input = ConfigInput {
            files: vec![file("[timeouts]\nstore_secs = 10\nelevated_secs = 20\n")],
            env_vars: vec![
                ("BRAVETUNE__TIMEOUTS__STORE_SECS".into(), "11".into()),
                ("BRAVETUNE__VARIANT".into(), "stable".into()),
            ],
            env_prefix: Some(env::ENV_PREFIX.into()),
            overrides: vec![("variant".into(), Value::String("beta".into()))],
        };
        let config = resolve(input).unwrap();
        assert_eq!(config.timeouts.store_secs, 11);
        assert_eq!(config.timeouts.elevated_secs, 20);
        assert_eq!(config.variant, Variant::Beta);
        assert_eq!(config.target().domain, "com.brave.Browser.beta");
    }

    #[test]
    fn env_ignored_without_prefix() {
        let config = resolve(ConfigInput {
            env_vars: vec![("BRAVETUNE__VARIANT".into(), "beta".into())],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.variant, Variant::Stable);
    }

    #[test]
    fn unknown_keys_are_not_fatal() {
        let config = resolve(ConfigInput {
            files: vec![file("varient = \"beta\"\n[timeouts]\nstore = 3\n")],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.variant, Variant::Stable);
    }

    #[test]
    fn bad_variant_names_the_file() {
        let err = resolve(ConfigInput {
            files: vec![file("variant = \"nightly\"\n")],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, BravetuneError::ConfigParse { .. }));
        assert!(err.to_string().contains("bravetune.toml"));
    }

    #[test]
    fn nested_override_replaces_scalar() {
        let table = overrides_to_table(&[
            ("timeouts".into(), Value::Integer(1)),
            ("timeouts.store_secs".into(), Value::Integer(5)),
        ]);
        assert_eq!(
            table["timeouts"].as_table().unwrap()["store_secs"].as_integer(),
            Some(5)
        );
    }

    #[test]
    fn template_documents_every_field() {
        let template = template();
        for needle in [
            "variant",
            "desired_state_path",
            "backup_dir",
            "default_supplement_base",
            "store_secs",
            "elevated_secs",
            "release channel",
        ] {
            assert!(template.contains(needle), "missing {needle}");
        }
    }
}
