//! Snapshots of the user-layer document, and the two-phase reset.
//!
//! A backup is a byte-for-byte copy of the live user preference file, named
//! `<YYYY-MM-DDTHH-MM-SS>Z-user.<ext>` in UTC so names sort by time even
//! across daylight-saving changes. Backups are never removed automatically.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::BravetuneError;
use crate::store::PreferenceStore;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%SZ";
const SUFFIX: &str = "-user";

/// Result of [`reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResetOutcome {
    /// A managed document existed, so removal (and its prompt) was attempted.
    pub had_managed: bool,
    pub managed_removed: bool,
}

/// Takes, lists, restores and deletes backups of one user-layer document.
#[derive(Debug, Clone)]
pub struct BackupManager {
    source: PathBuf,
    dir: PathBuf,
}

impl BackupManager {
    /// `source` is the live user document, `dir` the backup directory.
    pub fn new(source: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dir: dir.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy the live document into the backup directory.
    pub fn backup(&self) -> Result<PathBuf, BravetuneError> {
        self.backup_at(Utc::now())
    }

    /// [`backup`](Self::backup) with an explicit timestamp. A name already
    /// taken moves the stamp forward one second at a time.
    pub fn backup_at(&self, mut stamp: DateTime<Utc>) -> Result<PathBuf, BravetuneError> {
        if !self.source.is_file() {
            return Err(BravetuneError::SourceNotFound {
                path: self.source.clone(),
            });
        }
        fs::create_dir_all(&self.dir).map_err(|e| BravetuneError::io(&self.dir, e))?;

        let mut dst = self.dir.join(self.file_name(&stamp));
        while dst.exists() {
            stamp += TimeDelta::seconds(1);
            dst = self.dir.join(self.file_name(&stamp));
        }

        fs::copy(&self.source, &dst).map_err(|e| BravetuneError::io(&dst, e))?;
        set_private(&dst)?;
        info!(path = %dst.display(), "backed up user preferences");
        Ok(dst)
    }

    /// Backups in name order, oldest first. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<PathBuf>, BravetuneError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BravetuneError::io(&self.dir, e)),
        };
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| BravetuneError::io(&self.dir, e))?.path();
            if path.is_file() && is_backup_name(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Copy `backup` over the live document. The managed layer is untouched.
    pub fn restore(&self, backup: &Path) -> Result<(), BravetuneError> {
        if !backup.is_file() {
            return Err(BravetuneError::BackupNotFound(backup.display().to_string()));
        }
        if let Some(parent) = self.source.parent() {
            fs::create_dir_all(parent).map_err(|e| BravetuneError::io(parent, e))?;
        }
        fs::copy(backup, &self.source).map_err(|e| BravetuneError::io(&self.source, e))?;
        info!(from = %backup.display(), "restored user preferences");
        Ok(())
    }

    pub fn delete(&self, backup: &Path) -> Result<(), BravetuneError> {
        match fs::remove_file(backup) {
            Ok(()) => {
                info!(path = %backup.display(), "deleted backup");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BravetuneError::BackupNotFound(backup.display().to_string()))
            }
            Err(e) => Err(BravetuneError::io(backup, e)),
        }
    }

    /// Find a backup by full path or file name, or by a suffix that only one
    /// backup name ends with. An existing path outside the list is accepted
    /// as-is.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, BravetuneError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BravetuneError::BackupNotFound(String::new()));
        }
        let backups = self.list()?;
        if let Some(path) = backups.iter().find(|p| {
            p.as_os_str() == name || p.file_name().is_some_and(|f| f == name)
        }) {
            return Ok(path.clone());
        }

        let mut matches: Vec<&PathBuf> = backups
            .iter()
            .filter(|p| p.to_string_lossy().ends_with(name))
            .collect();
        match matches.len() {
            0 => {}
            1 => return Ok(matches.remove(0).clone()),
            count => {
                return Err(BravetuneError::AmbiguousBackup {
                    name: name.into(),
                    count,
                });
            }
        }

        let candidate = PathBuf::from(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
        Err(BravetuneError::BackupNotFound(name.into()))
    }

    fn file_name(&self, stamp: &DateTime<Utc>) -> String {
        let ext = self
            .source
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "plist".into());
        format!("{}{SUFFIX}.{ext}", stamp.format(TIMESTAMP_FORMAT))
    }
}

/// Clear the user layer, then remove the managed document if there is one.
///
/// Elevation is only attempted when a managed document exists, so
/// `had_managed == false` means no prompt was shown. A declined or failed
/// removal leaves the managed layer in place and is reported through
/// `managed_removed`, not as an error.
pub fn reset<S: PreferenceStore + ?Sized>(store: &S) -> Result<ResetOutcome, BravetuneError> {
    store.reset_user()?;
    info!("cleared user layer");

    if !store.managed_layer_exists() {
        return Ok(ResetOutcome {
            had_managed: false,
            managed_removed: false,
        });
    }
    let managed_removed = match store.reset_managed_elevated() {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "managed layer not removed");
            false
        }
    };
    Ok(ResetOutcome {
        had_managed: true,
        managed_removed,
    })
}

fn is_backup_name(path: &Path) -> bool {
    path.file_stem()
        .map(|s| s.to_string_lossy().ends_with(SUFFIX))
        .unwrap_or(false)
}

fn set_private(path: &Path) -> Result<(), BravetuneError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| BravetuneError::io(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
