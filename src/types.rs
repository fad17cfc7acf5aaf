use std::path::PathBuf;

use crate::catalog::{CUSTOM_ID, PRIVACY_GUIDES_ID};

/// Where to search for the tool's own `bravetune.toml`.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (`~/Library/Application Support/bravetune` on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".config/bravetune")`.
    Home(&'static str),
    /// An explicit directory.
    Path(PathBuf),
}

/// What to apply, inspect or diff, as named on the command line.
///
/// - `privacy-guides` stacks the privacy supplement on the saved or default base.
/// - `privacy-guides:<base>` stacks it on an explicit base (`custom` included).
/// - `custom` is the saved custom selection.
/// - anything else is a preset id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Preset(String),
    PrivacyGuides { base: Option<String> },
    Custom,
}

impl Selection {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s == PRIVACY_GUIDES_ID {
            return Selection::PrivacyGuides { base: None };
        }
        if let Some(base) = s.strip_prefix("privacy-guides:").or_else(|| s.strip_prefix("privacy-guides=")) {
            let base = base.trim();
            return Selection::PrivacyGuides {
                base: (!base.is_empty()).then(|| base.to_string()),
            };
        }
        if s == CUSTOM_ID {
            return Selection::Custom;
        }
        Selection::Preset(s.to_string())
    }
}

/// A tool operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Apply { target: Selection },
    PrivacyGuides { base: Option<String> },
    ApplyFile { path: PathBuf },
    Custom { keys: Vec<String> },
    Reapply,
    DryRun { target: Selection },
    Diff { target: Selection },
    Drift,
    Export { path: PathBuf },
    Current,
    Presets,
    Reset,
    Backups,
    Restore { name: String },
    DeleteBackup { name: String },
    Version,
    InstallLoginHook,
    ConfigTemplate { output: Option<PathBuf> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selection_forms() {
        assert_eq!(Selection::parse("quick"), Selection::Preset("quick".into()));
        assert_eq!(
            Selection::parse("privacy-guides"),
            Selection::PrivacyGuides { base: None }
        );
        assert_eq!(
            Selection::parse("privacy-guides:max-privacy"),
            Selection::PrivacyGuides {
                base: Some("max-privacy".into())
            }
        );
        assert_eq!(
            Selection::parse("privacy-guides=custom"),
            Selection::PrivacyGuides {
                base: Some("custom".into())
            }
        );
        assert_eq!(
            Selection::parse("privacy-guides:"),
            Selection::PrivacyGuides { base: None }
        );
        assert_eq!(Selection::parse(" custom "), Selection::Custom);
    }
}
