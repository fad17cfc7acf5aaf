//! Where the tool keeps its files, and where it looks for `bravetune.toml`.

use std::path::{Path, PathBuf};

use crate::config::ToolConfig;
use crate::error::BravetuneError;
use crate::target::Target;
use crate::types::SearchPath;

pub const APP_NAME: &str = "bravetune";
pub const CONFIG_FILE_NAME: &str = "bravetune.toml";
const STATE_DIR: &str = ".config/bravetune";

/// Resolved locations for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    pub home: PathBuf,
    /// The target's user-layer document, the source of backups.
    pub user_document: PathBuf,
    pub desired_state: PathBuf,
    pub backup_dir: PathBuf,
    /// Log directory for the login hook.
    pub state_dir: PathBuf,
    pub launch_agents: PathBuf,
}

impl Paths {
    /// Default locations under `home`.
    pub fn under_home(home: &Path, target: &Target) -> Self {
        let state_dir = home.join(STATE_DIR);
        Self {
            home: home.to_path_buf(),
            user_document: target.user_document(home),
            desired_state: state_dir.join(format!("{APP_NAME}.yaml")),
            backup_dir: home
                .join("Library/Application Support")
                .join(APP_NAME)
                .join("backups"),
            state_dir,
            launch_agents: home.join("Library/LaunchAgents"),
        }
    }

    /// Locations for the current user, with `config` overrides applied.
    pub fn discover(target: &Target, config: &ToolConfig) -> Result<Self, BravetuneError> {
        let user = directories::UserDirs::new().ok_or(BravetuneError::NoHomeDir)?;
        Ok(Self::under_home(user.home_dir(), target).with_config(config))
    }

    pub fn with_config(mut self, config: &ToolConfig) -> Self {
        if let Some(path) = &config.desired_state_path {
            self.desired_state = path.clone();
        }
        if let Some(dir) = &config.backup_dir {
            self.backup_dir = dir.clone();
        }
        self
    }
}

/// The default places to look for `bravetune.toml`, lowest priority first.
pub fn default_search_paths() -> Vec<SearchPath> {
    vec![SearchPath::Platform, SearchPath::Home(STATE_DIR)]
}

/// Resolve a [`SearchPath`] to a directory. `None` when the platform has no
/// home or config directory.
pub fn resolve_search_path(sp: &SearchPath) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", APP_NAME)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Read every `bravetune.toml` found across `search_paths`, in order.
/// Missing files are skipped, other read failures are errors. A directory
/// listed twice is read once.
pub fn load_config_files(
    search_paths: &[SearchPath],
) -> Result<Vec<(PathBuf, String)>, BravetuneError> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for dir in search_paths.iter().filter_map(resolve_search_path) {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }

    let mut results = Vec::new();
    for dir in dirs {
        let file_path = dir.join(CONFIG_FILE_NAME);
        match std::fs::read_to_string(&file_path) {
            Ok(content) => results.push((file_path, content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(BravetuneError::io(file_path, e)),
        }
    }
    Ok(results)
}
