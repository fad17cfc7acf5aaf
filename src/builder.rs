use std::path::PathBuf;

use crate::catalog::PresetCatalog;
use crate::config::{self, ConfigInput, ToolConfig};
use crate::env::ENV_PREFIX;
use crate::error::BravetuneError;
use crate::ops::Report;
use crate::paths::{self, Paths};
use crate::session::{self, Session};
use crate::store::{DefaultsStore, PreferenceStore};
use crate::target::Variant;
use crate::types::{Action, SearchPath};

/// Entry point for building a [`Session`].
pub struct Bravetune;

impl Bravetune {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }
}

/// Collects everything a [`Session`] is built from: where the tool config
/// lives, programmatic overrides, and optional replacements for the preset
/// catalog and the home directory.
pub struct SessionBuilder {
    search_paths: Option<Vec<SearchPath>>,
    env_enabled: bool,
    overrides: Vec<(String, toml::Value)>,
    presets_dir: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl SessionBuilder {
    fn new() -> Self {
        Self {
            search_paths: None,
            env_enabled: true,
            overrides: Vec::new(),
            presets_dir: None,
            home: None,
        }
    }

    /// Replace the default config search paths. Later entries win.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Append a search path after the defaults (or after those already set).
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths
            .get_or_insert_with(paths::default_search_paths)
            .push(path);
        self
    }

    /// Ignore `BRAVETUNE__*` environment variables.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    /// Manage Brave Beta instead of the configured variant. `false` leaves
    /// the configured variant alone.
    pub fn beta(self, beta: bool) -> Self {
        let variant = beta.then(|| Variant::Beta.to_string());
        self.override_value("variant", variant)
    }

    /// Override one config key by dotted path. `None` is ignored.
    pub fn override_value<V: Into<toml::Value>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.overrides.push((key.to_string(), v.into()));
        }
        self
    }

    /// Load presets from `*.yaml` files in `dir` instead of the built-in set.
    pub fn presets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.presets_dir = Some(dir.into());
        self
    }

    /// Use `home` instead of the current user's home directory.
    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    fn build_input(&self) -> Result<ConfigInput, BravetuneError> {
        let search_paths = self
            .search_paths
            .clone()
            .unwrap_or_else(paths::default_search_paths);
        let files = paths::load_config_files(&search_paths)?;
        let (env_prefix, env_vars) = if self.env_enabled {
            (Some(ENV_PREFIX.to_string()), std::env::vars().collect())
        } else {
            (None, Vec::new())
        };
        Ok(ConfigInput {
            files,
            env_vars,
            env_prefix,
            overrides: self.overrides.clone(),
        })
    }

    /// Resolve the tool config through all layers.
    pub fn load_config(&self) -> Result<ToolConfig, BravetuneError> {
        config::resolve(self.build_input()?)
    }

    fn catalog(&self) -> Result<PresetCatalog, BravetuneError> {
        match &self.presets_dir {
            Some(dir) => PresetCatalog::load_dir(dir),
            None => Ok(PresetCatalog::embedded_or_empty()),
        }
    }

    /// A session over the real `defaults`-backed store.
    pub fn build(self) -> Result<Session<DefaultsStore>, BravetuneError> {
        let config = self.load_config()?;
        let store = DefaultsStore::new(config.target(), config.timeouts());
        self.finish(config, store)
    }

    /// A session over any store. `store` must serve the configured variant.
    pub fn build_with<S: PreferenceStore>(self, store: S) -> Result<Session<S>, BravetuneError> {
        let config = self.load_config()?;
        self.finish(config, store)
    }

    fn finish<S: PreferenceStore>(
        self,
        config: ToolConfig,
        store: S,
    ) -> Result<Session<S>, BravetuneError> {
        let target = config.target();
        let paths = match &self.home {
            Some(home) => Paths::under_home(home, &target).with_config(&config),
            None => Paths::discover(&target, &config)?,
        };
        let catalog = self.catalog()?;
        Ok(Session::new(store, catalog, config, paths))
    }

    /// Run `action` against the real store. The config template needs no
    /// session and works on any platform.
    pub fn handle(self, action: &Action) -> Result<Report, BravetuneError> {
        if let Action::ConfigTemplate { output } = action {
            return session::config_template(output.as_deref());
        }
        self.build()?.handle(action)
    }
}
