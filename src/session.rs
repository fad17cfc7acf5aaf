//! Every tool operation, independent of any front end.
//!
//! A [`Session`] owns one preference store, the preset catalog, the resolved
//! tool config and the file locations derived from it. Each operation
//! returns a [`Report`]; the binary prints it, other front ends can render it
//! however they like.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::backup::{self, BackupManager};
use crate::bundle::Bundle;
use crate::catalog::{self, PresetCatalog};
use crate::compose::{diff, resolve_base};
use crate::config::{self, ToolConfig};
use crate::custom::{self, KeySpace};
use crate::error::BravetuneError;
use crate::file;
use crate::merge::merge;
use crate::ops::{CurrentEntry, PlannedSetting, PresetSummary, Report};
use crate::paths::Paths;
use crate::persist::{DesiredState, DesiredStateStore, Provenance, Record};
use crate::store::{PreferenceStore, plist};
use crate::target::{Target, Variant};
use crate::types::{Action, Selection};

pub const LOGIN_HOOK_LABEL: &str = "com.bravetune.reapply";
const LOGIN_HOOK_LOG: &str = "reapply.log";

/// A resolved bundle and what produced it.
enum Plan {
    Preset {
        id: String,
        bundle: Bundle,
    },
    PrivacyGuides {
        base_id: String,
        base: Bundle,
        supplement: &'static Bundle,
        bundle: Bundle,
    },
    File {
        path: PathBuf,
        bundle: Bundle,
    },
    Custom {
        bundle: Bundle,
    },
    /// Re-application of the saved state. Nothing new is recorded.
    Saved(DesiredState),
}

impl Plan {
    fn bundle(&self) -> &Bundle {
        match self {
            Plan::Preset { bundle, .. }
            | Plan::PrivacyGuides { bundle, .. }
            | Plan::File { bundle, .. }
            | Plan::Custom { bundle } => bundle,
            Plan::Saved(state) => &state.settings,
        }
    }

    fn provenance(&self) -> Provenance {
        match self {
            Plan::Preset { id, .. } => Provenance::PresetApplied {
                preset_id: id.clone(),
            },
            Plan::PrivacyGuides { base_id, .. } => Provenance::PrivacyGuidesApplied {
                base_preset_id: base_id.clone(),
            },
            Plan::File { path, .. } => Provenance::FileApplied { path: path.clone() },
            Plan::Custom { .. } => Provenance::CustomApplied,
            Plan::Saved(state) => state.provenance.clone(),
        }
    }

    fn record(&self) -> Option<Record<'_>> {
        match self {
            Plan::Preset { id, bundle } => Some(Record::Preset { id, settings: bundle }),
            Plan::PrivacyGuides {
                base_id,
                base,
                supplement,
                ..
            } => Some(Record::PrivacyGuides {
                base_id,
                base,
                supplement,
            }),
            Plan::File { path, bundle } => Some(Record::File {
                path,
                settings: bundle,
            }),
            Plan::Custom { bundle } => Some(Record::Custom { settings: bundle }),
            Plan::Saved(_) => None,
        }
    }
}

pub struct Session<S> {
    store: S,
    target: Target,
    catalog: PresetCatalog,
    config: ToolConfig,
    paths: Paths,
    desired: DesiredStateStore,
    backups: BackupManager,
}

impl<S: PreferenceStore> Session<S> {
    pub fn new(store: S, catalog: PresetCatalog, config: ToolConfig, paths: Paths) -> Self {
        Self {
            target: config.target(),
            desired: DesiredStateStore::new(&paths.desired_state),
            backups: BackupManager::new(&paths.user_document, &paths.backup_dir),
            store,
            catalog,
            config,
            paths,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &PresetCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn handle(&self, action: &Action) -> Result<Report, BravetuneError> {
        match action {
            Action::Apply { target } => self.apply(target),
            Action::PrivacyGuides { base } => self.apply_privacy_guides(base.as_deref()),
            Action::ApplyFile { path } => self.apply_file(path),
            Action::Custom { keys } => self.apply_custom(keys),
            Action::Reapply => self.reapply(),
            Action::DryRun { target } => self.dry_run(target),
            Action::Diff { target } => self.diff(target),
            Action::Drift => self.drift(),
            Action::Export { path } => self.export(path),
            Action::Current => Ok(self.current()),
            Action::Presets => Ok(self.presets()),
            Action::Reset => self.reset(),
            Action::Backups => self.backups(),
            Action::Restore { name } => self.restore(name),
            Action::DeleteBackup { name } => self.delete_backup(name),
            Action::Version => Ok(self.version()),
            Action::InstallLoginHook => self.install_login_hook(),
            Action::ConfigTemplate { output } => config_template(output.as_deref()),
        }
    }

    // -- apply ---------------------------------------------------------------

    /// Apply a preset id, `custom`, or one of the `privacy-guides` forms.
    pub fn apply_preset(&self, id: &str) -> Result<Report, BravetuneError> {
        self.apply(&Selection::parse(id))
    }

    pub fn apply(&self, selection: &Selection) -> Result<Report, BravetuneError> {
        let plan = self.plan(selection)?;
        self.execute(plan)
    }

    pub fn apply_privacy_guides(&self, base: Option<&str>) -> Result<Report, BravetuneError> {
        let plan = self.plan_privacy_guides(base)?;
        self.execute(plan)
    }

    pub fn apply_file(&self, path: &Path) -> Result<Report, BravetuneError> {
        let bundle = file::load_bundle(path)?;
        self.execute(Plan::File {
            path: path.to_path_buf(),
            bundle,
        })
    }

    pub fn apply_custom(&self, keys: &[String]) -> Result<Report, BravetuneError> {
        let bundle = custom::bundle_for(keys)?;
        self.execute(Plan::Custom { bundle })
    }

    /// Apply the saved desired state again, e.g. at login.
    pub fn reapply(&self) -> Result<Report, BravetuneError> {
        let state = self
            .desired
            .read(&self.catalog)?
            .ok_or(BravetuneError::NoDesiredState)?;
        self.execute(Plan::Saved(state))
    }

    fn execute(&self, plan: Plan) -> Result<Report, BravetuneError> {
        if !self.store.is_target_installed() {
            return Err(BravetuneError::TargetNotInstalled {
                app: self.target.app_name.clone(),
                path: self.target.app_path.clone(),
            });
        }
        let running = self.store.is_target_running();
        if running {
            warn!(app = %self.target.app_name, "target is running; changes apply after restart");
        }

        let backup = self.backup_best_effort();
        let bundle = plan.bundle();
        let outcome = self.store.apply_bundle(bundle)?;

        let saved = match plan.record() {
            None => true,
            Some(record) => match self.desired.write(record) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "applied settings were not recorded");
                    false
                }
            },
        };

        let what = plan.provenance();
        info!(what = %what, enforced = outcome.enforced, "applied");
        Ok(Report::Applied {
            what,
            app: self.target.app_name.clone(),
            settings: bundle.len(),
            enforced: outcome.enforced,
            backup,
            running,
            saved,
        })
    }

    fn backup_best_effort(&self) -> Option<PathBuf> {
        match self.backups.backup() {
            Ok(path) => Some(path),
            Err(BravetuneError::SourceNotFound { .. }) => {
                debug!("no user preferences yet, nothing to back up");
                None
            }
            Err(e) => {
                warn!(error = %e, "backup skipped");
                None
            }
        }
    }

    // -- planning ------------------------------------------------------------

    fn plan(&self, selection: &Selection) -> Result<Plan, BravetuneError> {
        match selection {
            Selection::Preset(id) => {
                let preset = self.catalog.find(id)?;
                Ok(Plan::Preset {
                    id: preset.id.clone(),
                    bundle: preset.settings.clone(),
                })
            }
            Selection::PrivacyGuides { base } => self.plan_privacy_guides(base.as_deref()),
            Selection::Custom => {
                let bundle = self
                    .saved_best_effort()
                    .map(|state| state.custom_settings())
                    .unwrap_or_default();
                if bundle.is_empty() {
                    return Err(BravetuneError::NoCustomBase);
                }
                Ok(Plan::Custom { bundle })
            }
        }
    }

    /// Base: `base` if given, else the one the saved state implies, else the
    /// configured default.
    fn plan_privacy_guides(&self, base: Option<&str>) -> Result<Plan, BravetuneError> {
        let saved = self.saved_best_effort();
        let base_id = match base {
            Some(id) => id.to_string(),
            None => saved
                .as_ref()
                .and_then(|state| state.supplement_base(&self.catalog))
                .unwrap_or_else(|| self.config.default_supplement_base.clone()),
        };
        let custom = saved
            .map(|state| state.custom_settings())
            .unwrap_or_default();

        let base = resolve_base(&base_id, &self.catalog, &custom)?;
        let supplement = catalog::privacy_guides()?;
        let bundle = merge(&base, supplement);
        debug!(base = %base_id, settings = bundle.len(), "composed privacy guides");
        Ok(Plan::PrivacyGuides {
            base_id,
            base,
            supplement,
            bundle,
        })
    }

    /// The saved state, or `None` if it is missing or unreadable.
    fn saved_best_effort(&self) -> Option<DesiredState> {
        match self.desired.read(&self.catalog) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable desired state");
                None
            }
        }
    }

    // -- inspection ----------------------------------------------------------

    pub fn dry_run(&self, selection: &Selection) -> Result<Report, BravetuneError> {
        let plan = self.plan(selection)?;
        Ok(Report::DryRun {
            what: plan.provenance().to_string(),
            settings: PlannedSetting::from_bundle(plan.bundle()),
        })
    }

    pub fn diff(&self, selection: &Selection) -> Result<Report, BravetuneError> {
        let plan = self.plan(selection)?;
        Ok(Report::Diff {
            what: plan.provenance().to_string(),
            entries: diff(plan.bundle(), &self.store),
        })
    }

    /// Compare the saved desired state with what the store holds now.
    pub fn drift(&self) -> Result<Report, BravetuneError> {
        let state = self
            .desired
            .read(&self.catalog)?
            .ok_or(BravetuneError::NoDesiredState)?;
        Ok(Report::Drift {
            entries: diff(&state.settings, &self.store),
            what: state.provenance,
        })
    }

    pub fn current(&self) -> Report {
        let entries = KeySpace::headline()
            .iter()
            .map(|key| {
                let current = self.store.read_effective(key);
                CurrentEntry {
                    key: key.to_string(),
                    layer: current.as_ref().map(|c| c.layer),
                    value: current.map(|c| c.raw),
                }
            })
            .collect();
        Report::Current {
            managed_present: self.store.managed_layer_exists(),
            entries,
        }
    }

    pub fn presets(&self) -> Report {
        Report::Presets {
            presets: self.catalog.all().iter().map(PresetSummary::from).collect(),
        }
    }

    /// Known keys: the built-in ones, then those declared by presets, the
    /// supplement and the saved state.
    pub fn key_space(&self) -> KeySpace {
        let mut keys = KeySpace::well_known();
        for preset in self.catalog.all() {
            keys.extend(preset.settings.keys());
        }
        if let Ok(supplement) = catalog::privacy_guides() {
            keys.extend(supplement.keys());
        }
        if let Some(state) = self.saved_best_effort() {
            keys.extend(state.settings.keys());
        }
        keys
    }

    pub fn export(&self, path: &Path) -> Result<Report, BravetuneError> {
        let bundle = file::export_current(&self.store, &self.key_space())?;
        file::write_bundle(path, &bundle)?;
        Ok(Report::Exported {
            path: path.to_path_buf(),
            settings: bundle.len(),
        })
    }

    pub fn version(&self) -> Report {
        Report::Version {
            tool: env!("CARGO_PKG_VERSION").to_string(),
            app: self.target.app_name.clone(),
            app_version: self.store.target_version(),
        }
    }

    // -- backups and reset ---------------------------------------------------

    /// Back up, then clear both layers. Refused while the app is running,
    /// since it would write its in-memory preferences back.
    pub fn reset(&self) -> Result<Report, BravetuneError> {
        if self.store.is_target_running() {
            return Err(BravetuneError::TargetRunning {
                app: self.target.app_name.clone(),
            });
        }
        let backup = self.backup_best_effort();
        let outcome = backup::reset(&self.store)?;
        Ok(Report::Reset {
            app: self.target.app_name.clone(),
            backup,
            outcome,
        })
    }

    pub fn backups(&self) -> Result<Report, BravetuneError> {
        Ok(Report::Backups {
            backups: self.backups.list()?,
        })
    }

    pub fn restore(&self, name: &str) -> Result<Report, BravetuneError> {
        let path = self.backups.resolve(name)?;
        let running = self.store.is_target_running();
        if running {
            warn!(app = %self.target.app_name, "restoring while the target is running");
        }
        self.backups.restore(&path)?;
        Ok(Report::Restored {
            app: self.target.app_name.clone(),
            path,
            running,
        })
    }

    pub fn delete_backup(&self, name: &str) -> Result<Report, BravetuneError> {
        let path = self.backups.resolve(name)?;
        self.backups.delete(&path)?;
        Ok(Report::BackupDeleted { path })
    }

    // -- login hook ----------------------------------------------------------

    /// Write a LaunchAgent that runs `bravetune [--beta] reapply` at login.
    pub fn install_login_hook(&self) -> Result<Report, BravetuneError> {
        let exe = std::env::current_exe()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| crate::paths::APP_NAME.to_string());
        self.write_login_hook(&exe)
    }

    fn write_login_hook(&self, exe: &str) -> Result<Report, BravetuneError> {
        let mut program = vec![exe.to_string()];
        if self.target.variant == Variant::Beta {
            program.push("--beta".into());
        }
        program.push("reapply".into());

        let log = self.paths.state_dir.join(LOGIN_HOOK_LOG);
        let path = self
            .paths
            .launch_agents
            .join(format!("{LOGIN_HOOK_LABEL}.plist"));
        for dir in [&self.paths.launch_agents, &self.paths.state_dir] {
            std::fs::create_dir_all(dir).map_err(|e| BravetuneError::io(dir, e))?;
        }
        std::fs::write(&path, plist::launch_agent(LOGIN_HOOK_LABEL, &program, &log))
            .map_err(|e| BravetuneError::io(&path, e))?;
        info!(path = %path.display(), "installed login hook");
        Ok(Report::LoginHookInstalled { path, log })
    }
}

/// Print or write the commented config template.
pub fn config_template(output: Option<&Path>) -> Result<Report, BravetuneError> {
    let template = config::template();
    match output {
        Some(path) => {
            std::fs::write(path, &template).map_err(|e| BravetuneError::io(path, e))?;
            Ok(Report::TemplateWritten {
                path: path.to_path_buf(),
            })
        }
        None => Ok(Report::Template { template }),
    }
}
