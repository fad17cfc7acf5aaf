//! Clap front end for the `bravetune` binary.
//!
//! Compiled only with the `cli` feature. Parsing ends at
//! [`Cli::into_action()`]; everything after that goes through the clap-free
//! [`Session`](crate::Session) API, so other front ends can build
//! [`Action`](crate::Action) values directly.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::types::{Action, Selection};

/// Apply privacy and debloat presets to Brave Browser on macOS.
#[derive(Debug, Parser)]
#[command(name = "bravetune", version)]
pub struct Cli {
    /// Manage Brave Browser Beta instead of the stable release.
    #[arg(long, global = true)]
    pub beta: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log external commands and decisions to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply a preset, `custom`, or `privacy-guides[:BASE]`.
    Apply {
        #[arg(default_value = "quick")]
        id: String,
    },
    /// Apply the Privacy Guides recommendations on top of a base preset.
    PrivacyGuides {
        /// Base preset id, or `custom` for the saved custom selection.
        #[arg(long)]
        base: Option<String>,
    },
    /// Apply the settings in a bundle file.
    ApplyFile { path: PathBuf },
    /// Apply a hand-picked set of toggles by key.
    Custom {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Apply the last recorded settings again.
    Reapply,
    /// Show what would be applied, without writing anything.
    DryRun {
        #[arg(default_value = "quick")]
        target: String,
    },
    /// Show the settings that would change.
    Diff { target: String },
    /// Compare the last recorded settings with the current ones.
    Drift,
    /// Write the current values of all known keys to a bundle file.
    Export { path: PathBuf },
    /// Show the current values of the headline keys.
    Current,
    /// List available presets.
    Presets,
    /// Clear user preferences and remove the managed policy document.
    Reset,
    /// List backups of the user preferences.
    Backups,
    /// Copy a backup over the user preferences.
    Restore {
        /// Backup path or file name, as listed by `backups`.
        name: String,
    },
    /// Delete a backup.
    DeleteBackup { name: String },
    /// Show tool and browser versions.
    Version,
    /// Run `reapply` at every login.
    InstallLoginHook,
    /// Print a commented bravetune.toml.
    ConfigTemplate {
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn into_action(self) -> Action {
        match self.command {
            Command::Apply { id } => Action::Apply {
                target: Selection::parse(&id),
            },
            Command::PrivacyGuides { base } => Action::PrivacyGuides { base },
            Command::ApplyFile { path } => Action::ApplyFile { path },
            Command::Custom { keys } => Action::Custom { keys },
            Command::Reapply => Action::Reapply,
            Command::DryRun { target } => Action::DryRun {
                target: Selection::parse(&target),
            },
            Command::Diff { target } => Action::Diff {
                target: Selection::parse(&target),
            },
            Command::Drift => Action::Drift,
            Command::Export { path } => Action::Export { path },
            Command::Current => Action::Current,
            Command::Presets => Action::Presets,
            Command::Reset => Action::Reset,
            Command::Backups => Action::Backups,
            Command::Restore { name } => Action::Restore { name },
            Command::DeleteBackup { name } => Action::DeleteBackup { name },
            Command::Version => Action::Version,
            Command::InstallLoginHook => Action::InstallLoginHook,
            Command::ConfigTemplate { output } => Action::ConfigTemplate { output },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn action(args: &[&str]) -> Action {
        parse(args).into_action()
    }

    #[test]
    fn apply_defaults_to_quick() {
        assert_eq!(
            action(&["bravetune", "apply"]),
            Action::Apply {
                target: Selection::Preset("quick".into())
            }
        );
    }

    #[test]
    fn apply_accepts_privacy_guides_form() {
        assert_eq!(
            action(&["bravetune", "apply", "privacy-guides:max-privacy"]),
            Action::Apply {
                target: Selection::PrivacyGuides {
                    base: Some("max-privacy".into())
                }
            }
        );
    }

    #[test]
    fn privacy_guides_base_flag() {
        assert_eq!(
            action(&["bravetune", "privacy-guides", "--base", "custom"]),
            Action::PrivacyGuides {
                base: Some("custom".into())
            }
        );
        assert_eq!(
            action(&["bravetune", "privacy-guides"]),
            Action::PrivacyGuides { base: None }
        );
    }

    #[test]
    fn custom_needs_keys() {
        assert!(Cli::try_parse_from(["bravetune", "custom"]).is_err());
        assert_eq!(
            action(&["bravetune", "custom", "TorDisabled", "SyncDisabled"]),
            Action::Custom {
                keys: vec!["TorDisabled".into(), "SyncDisabled".into()]
            }
        );
    }

    #[test]
    fn diff_needs_target() {
        assert!(Cli::try_parse_from(["bravetune", "diff"]).is_err());
        assert_eq!(
            action(&["bravetune", "diff", "custom"]),
            Action::Diff {
                target: Selection::Custom
            }
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["bravetune", "current", "--beta", "--json", "-v"]);
        assert!(cli.beta);
        assert!(cli.json);
        assert!(cli.verbose);
        assert_eq!(cli.into_action(), Action::Current);
    }

    #[test]
    fn backup_commands_take_names() {
        assert_eq!(
            action(&["bravetune", "restore", "2024-01-02T03-04-05Z-user.plist"]),
            Action::Restore {
                name: "2024-01-02T03-04-05Z-user.plist".into()
            }
        );
        assert_eq!(
            action(&["bravetune", "delete-backup", "x"]),
            Action::DeleteBackup { name: "x".into() }
        );
    }

    #[test]
    fn config_template_output() {
        assert_eq!(
            action(&["bravetune", "config-template", "-o", "out.toml"]),
            Action::ConfigTemplate {
                output: Some("out.toml".into())
            }
        );
    }

    #[test]
    fn kebab_case_subcommands() {
        assert_eq!(action(&["bravetune", "install-login-hook"]), Action::InstallLoginHook);
        assert_eq!(
            action(&["bravetune", "apply-file", "mine.yaml"]),
            Action::ApplyFile {
                path: "mine.yaml".into()
            }
        );
        assert_eq!(
            action(&["bravetune", "dry-run"]),
            Action::DryRun {
                target: Selection::Preset("quick".into())
            }
        );
    }

    #[test]
    fn unknown_subcommand_errors() {
        assert!(Cli::try_parse_from(["bravetune", "explode"]).is_err());
    }
}
