//! Results of session operations, returned to the caller for display.
//!
//! Every [`Report`] renders as plain text through `Display` and as JSON
//! through `Serialize` (tagged by `result`).

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::backup::ResetOutcome;
use crate::bundle::Bundle;
use crate::catalog::{PRIVACY_GUIDES_URL, Preset};
use crate::compose::DiffEntry;
use crate::persist::Provenance;
use crate::store::Layer;

/// One setting as it would be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSetting {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl PlannedSetting {
    pub fn from_bundle(bundle: &Bundle) -> Vec<Self> {
        bundle
            .iter()
            .map(|s| PlannedSetting {
                key: s.key().to_string(),
                value: s.value().normalized(),
                kind: s.kind().tag().to_string(),
            })
            .collect()
    }
}

/// A key's effective value and the layer it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentEntry {
    pub key: String,
    pub value: Option<String>,
    pub layer: Option<Layer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub settings: usize,
}

impl From<&Preset> for PresetSummary {
    fn from(p: &Preset) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            description: p.description.clone(),
            settings: p.settings.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Report {
    Applied {
        what: Provenance,
        app: String,
        settings: usize,
        enforced: bool,
        backup: Option<PathBuf>,
        /// The app was running during the write.
        running: bool,
        /// The desired state was recorded.
        saved: bool,
    },
    DryRun {
        what: String,
        settings: Vec<PlannedSetting>,
    },
    Diff {
        what: String,
        entries: Vec<DiffEntry>,
    },
    Drift {
        what: Provenance,
        entries: Vec<DiffEntry>,
    },
    Current {
        managed_present: bool,
        entries: Vec<CurrentEntry>,
    },
    Presets {
        presets: Vec<PresetSummary>,
    },
    Exported {
        path: PathBuf,
        settings: usize,
    },
    Reset {
        app: String,
        backup: Option<PathBuf>,
        outcome: ResetOutcome,
    },
    Backups {
        backups: Vec<PathBuf>,
    },
    Restored {
        app: String,
        path: PathBuf,
        running: bool,
    },
    BackupDeleted {
        path: PathBuf,
    },
    Version {
        tool: String,
        app: String,
        app_version: Option<String>,
    },
    LoginHookInstalled {
        path: PathBuf,
        log: PathBuf,
    },
    Template {
        template: String,
    },
    TemplateWritten {
        path: PathBuf,
    },
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Applied {
                what,
                app,
                settings,
                enforced,
                backup,
                running,
                saved,
            } => {
                if let Some(path) = backup {
                    writeln!(f, "Backed up user preferences to {}", path.display())?;
                }
                if *enforced {
                    write!(f, "Applied {what} ({settings} settings) as managed policy.")?;
                } else {
                    write!(
                        f,
                        "Applied {what} ({settings} settings) to user preferences. \
                         They are not enforced; approve the administrator prompt to enforce them."
                    )?;
                }
                if matches!(what, Provenance::PrivacyGuidesApplied { .. }) {
                    write!(f, "\nSource: {PRIVACY_GUIDES_URL}")?;
                }
                if *running {
                    write!(f, "\n{app} is running. Restart it for the changes to take effect.")?;
                }
                if !saved {
                    write!(
                        f,
                        "\nWarning: the applied settings were not recorded; reapply will not restore them."
                    )?;
                }
                Ok(())
            }
            Report::DryRun { what, settings } => {
                write!(f, "Would apply {what} ({} settings):", settings.len())?;
                for s in settings {
                    write!(f, "\n  {} = {} ({})", s.key, s.value, s.kind)?;
                }
                Ok(())
            }
            Report::Diff { what, entries } => {
                if entries.is_empty() {
                    return write!(f, "No changes: current preferences already match {what}.");
                }
                write!(f, "Changes for {what}:")?;
                for entry in entries {
                    write!(f, "\n  {entry}")?;
                }
                Ok(())
            }
            Report::Drift { what, entries } => {
                if entries.is_empty() {
                    return write!(f, "No drift from {what}.");
                }
                write!(f, "{} settings drifted from {what}:", entries.len())?;
                for entry in entries {
                    write!(f, "\n  {entry}")?;
                }
                Ok(())
            }
            Report::Current {
                managed_present,
                entries,
            } => {
                if *managed_present {
                    write!(f, "Managed policy document present.")?;
                } else {
                    write!(f, "No managed policy document.")?;
                }
                for entry in entries {
                    match (&entry.value, entry.layer) {
                        (Some(value), Some(Layer::Managed)) => {
                            write!(f, "\n  {} = {value} (enforced)", entry.key)?
                        }
                        (Some(value), _) => write!(f, "\n  {} = {value} (user)", entry.key)?,
                        (None, _) => write!(f, "\n  {} (not set)", entry.key)?,
                    }
                }
                Ok(())
            }
            Report::Presets { presets } => {
                for (i, p) in presets.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{:<14} {} ({} settings)", p.id, p.name, p.settings)?;
                    if !p.description.is_empty() {
                        write!(f, "\n{:<14} {}", "", p.description)?;
                    }
                }
                Ok(())
            }
            Report::Exported { path, settings } => {
                write!(f, "Exported {settings} settings to {}", path.display())
            }
            Report::Reset {
                app,
                backup,
                outcome,
            } => {
                if let Some(path) = backup {
                    writeln!(f, "Backed up user preferences to {}", path.display())?;
                }
                write!(f, "Reset {app} user preferences.")?;
                match (outcome.had_managed, outcome.managed_removed) {
                    (true, true) => write!(f, " Removed the managed policy document."),
                    (true, false) => write!(
                        f,
                        "\nWarning: the managed policy document could not be removed; its settings are still enforced."
                    ),
                    (false, _) => Ok(()),
                }
            }
            Report::Backups { backups } => {
                if backups.is_empty() {
                    return write!(f, "No backups.");
                }
                for (i, path) in backups.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", path.display())?;
                }
                Ok(())
            }
            Report::Restored { app, path, running } => {
                write!(f, "Restored {} over {app} user preferences.", path.display())?;
                if *running {
                    write!(f, "\n{app} is running. Quit it first or it may overwrite the restored file.")?;
                }
                Ok(())
            }
            Report::BackupDeleted { path } => write!(f, "Deleted {}", path.display()),
            Report::Version {
                tool,
                app,
                app_version,
            } => {
                write!(f, "bravetune {tool}")?;
                match app_version {
                    Some(v) => write!(f, "\n{app} {v}"),
                    None => write!(f, "\n{app} not installed"),
                }
            }
            Report::LoginHookInstalled { path, log } => write!(
                f,
                "Installed login hook at {}\nReapply output is logged to {}",
                path.display(),
                log.display()
            ),
            Report::Template { template } => write!(f, "{template}"),
            Report::TemplateWritten { path } => {
                write!(f, "Config template written to {}", path.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::quick_bundle;

    fn applied(enforced: bool, saved: bool) -> Report {
        Report::Applied {
            what: Provenance::PresetApplied {
                preset_id: "quick".into(),
            },
            app: "Brave Browser".into(),
            settings: 2,
            enforced,
            backup: Some("/b/2024-01-02T03-04-05Z-user.plist".into()),
            running: false,
            saved,
        }
    }

    #[test]
    fn applied_user_layer_says_not_enforced() {
        let text = applied(false, true).to_string();
        assert!(text.starts_with("Backed up user preferences to /b/"));
        assert!(text.contains("preset 'quick' (2 settings) to user preferences"));
        assert!(text.contains("not enforced"));
        assert!(!text.contains("not recorded"));
    }

    #[test]
    fn applied_enforced_and_unsaved() {
        let text = applied(true, false).to_string();
        assert!(text.contains("as managed policy"));
        assert!(text.contains("not recorded"));
    }

    #[test]
    fn privacy_guides_cites_source() {
        let report = Report::Applied {
            what: Provenance::PrivacyGuidesApplied {
                base_preset_id: "quick".into(),
            },
            app: "Brave Browser".into(),
            settings: 10,
            enforced: true,
            backup: None,
            running: true,
            saved: true,
        };
        let text = report.to_string();
        assert!(text.contains(PRIVACY_GUIDES_URL));
        assert!(text.contains("Brave Browser is running"));
    }

    #[test]
    fn dry_run_lists_settings() {
        let report = Report::DryRun {
            what: "preset 'quick'".into(),
            settings: PlannedSetting::from_bundle(&quick_bundle()),
        };
        assert_eq!(
            report.to_string(),
            "Would apply preset 'quick' (2 settings):\n  BraveRewardsDisabled = 1 (bool)\n  MetricsReportingEnabled = 0 (bool)"
        );
    }

    #[test]
    fn empty_diff_reads_as_no_changes() {
        let report = Report::Diff {
            what: "preset 'quick'".into(),
            entries: vec![],
        };
        assert!(report.to_string().starts_with("No changes"));
    }

    #[test]
    fn current_marks_layers() {
        let report = Report::Current {
            managed_present: true,
            entries: vec![
                CurrentEntry {
                    key: "A".into(),
                    value: Some("1".into()),
                    layer: Some(Layer::Managed),
                },
                CurrentEntry {
                    key: "B".into(),
                    value: Some("0".into()),
                    layer: Some(Layer::User),
                },
                CurrentEntry {
                    key: "C".into(),
                    value: None,
                    layer: None,
                },
            ],
        };
        assert_eq!(
            report.to_string(),
            "Managed policy document present.\n  A = 1 (enforced)\n  B = 0 (user)\n  C (not set)"
        );
    }

    #[test]
    fn reset_warns_when_policy_remains() {
        let report = Report::Reset {
            app: "Brave Browser".into(),
            backup: None,
            outcome: ResetOutcome {
                had_managed: true,
                managed_removed: false,
            },
        };
        assert!(report.to_string().contains("still enforced"));
    }

    #[test]
    fn json_is_tagged() {
        let json = serde_json::to_value(applied(false, true)).unwrap();
        assert_eq!(json["result"], "applied");
        assert_eq!(json["what"]["kind"], "preset_applied");
        assert_eq!(json["what"]["preset_id"], "quick");
        assert_eq!(json["enforced"], false);
    }
}
