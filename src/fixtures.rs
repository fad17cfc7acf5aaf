#[cfg(test)]
pub mod test {
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use crate::bundle::Bundle;
    use crate::catalog::PresetCatalog;
    use crate::error::BravetuneError;
    use crate::setting::{Setting, Value};
    use crate::store::PreferenceStore;

    pub const QUICK_YAML: &str = "\
id: quick
name: Quick Debloat
description: Rewards off, metrics off.
settings:
  - {key: BraveRewardsDisabled, value: true, type: bool}
  - {key: MetricsReportingEnabled, value: false, type: bool}
";

    pub const MAX_YAML: &str = "\
id: max-privacy
name: Maximum Privacy
description: Everything off.
settings:
  - {key: BraveRewardsDisabled, value: true, type: bool}
  - {key: SyncDisabled, value: true, type: bool}
  - {key: WebRtcIPHandling, value: disable_non_proxied_udp, type: string}
";

    /// A two-preset catalog: `quick` and `max-privacy`.
    pub fn fixture_catalog() -> PresetCatalog {
        PresetCatalog::from_sources([("01-quick.yaml", QUICK_YAML), ("02-max.yaml", MAX_YAML)])
            .unwrap()
    }

    /// The settings of the fixture `quick` preset.
    pub fn quick_bundle() -> Bundle {
        Bundle::from_settings(vec![
            Setting::new("BraveRewardsDisabled", Value::Bool(true)).unwrap(),
            Setting::new("MetricsReportingEnabled", Value::Bool(false)).unwrap(),
        ])
        .unwrap()
    }

    type Layer = BTreeMap<String, String>;

    /// A [`PreferenceStore`] double.
    ///
    /// The user layer is a JSON document on disk, so backups can copy it like
    /// the real preference file. The managed layer lives in memory. Elevation
    /// is declined unless [`accept_elevation`](Self::accept_elevation) is set,
    /// and every elevated call is counted.
    pub struct MemoryStore {
        dir: TempDir,
        managed: RefCell<Option<Layer>>,
        accept: bool,
        elevation_calls: Cell<usize>,
        failing_key: Option<String>,
        installed: bool,
        running: bool,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                managed: RefCell::new(None),
                accept: false,
                elevation_calls: Cell::new(0),
                failing_key: None,
                installed: true,
                running: false,
            }
        }

        pub fn accept_elevation(mut self) -> Self {
            self.accept = true;
            self
        }

        /// Make user-layer writes of `key` fail.
        pub fn fail_user_write(mut self, key: &str) -> Self {
            self.failing_key = Some(key.into());
            self
        }

        pub fn not_installed(mut self) -> Self {
            self.installed = false;
            self
        }

        pub fn running(mut self) -> Self {
            self.running = true;
            self
        }

        pub fn elevation_calls(&self) -> usize {
            self.elevation_calls.get()
        }

        /// Scratch directory owned by this store, for desired state, backups
        /// and the like.
        pub fn dir(&self) -> &Path {
            self.dir.path()
        }

        pub fn user_document(&self) -> PathBuf {
            self.dir.path().join("user.json")
        }

        pub fn set_user(&self, key: &str, raw: &str) {
            let mut layer = self.load_user();
            layer.insert(key.into(), raw.into());
            self.save_user(&layer);
        }

        pub fn set_managed(&self, key: &str, raw: &str) {
            self.managed
                .borrow_mut()
                .get_or_insert_with(Layer::new)
                .insert(key.into(), raw.into());
        }

        pub fn user_layer(&self) -> BTreeMap<String, String> {
            self.load_user()
        }

        fn load_user(&self) -> Layer {
            match fs::read_to_string(self.user_document()) {
                Ok(s) => serde_json::from_str(&s).unwrap(),
                Err(_) => Layer::new(),
            }
        }

        fn save_user(&self, layer: &Layer) {
            fs::write(self.user_document(), serde_json::to_string(layer).unwrap()).unwrap();
        }

        fn elevate(&self) -> Result<(), BravetuneError> {
            self.elevation_calls.set(self.elevation_calls.get() + 1);
            if self.accept {
                Ok(())
            } else {
                Err(BravetuneError::Elevation {
                    reason: "User canceled.".into(),
                })
            }
        }
    }

    impl PreferenceStore for MemoryStore {
        fn read_user(&self, key: &str) -> Option<String> {
            self.load_user().get(key).cloned()
        }

        fn read_managed(&self, key: &str) -> Option<String> {
            self.managed.borrow().as_ref()?.get(key).cloned()
        }

        fn write_user(&self, setting: &Setting) -> Result<(), BravetuneError> {
            if self.failing_key.as_deref() == Some(setting.key()) {
                return Err(BravetuneError::StoreWrite {
                    key: setting.key().into(),
                    reason: "simulated failure".into(),
                });
            }
            self.set_user(setting.key(), &setting.value().normalized());
            Ok(())
        }

        fn write_managed_elevated(&self, bundle: &Bundle) -> Result<(), BravetuneError> {
            self.elevate()?;
            let layer = bundle
                .iter()
                .map(|s| (s.key().to_string(), s.value().normalized()))
                .collect();
            *self.managed.borrow_mut() = Some(layer);
            Ok(())
        }

        fn delete_user(&self, key: &str) -> Result<(), BravetuneError> {
            let mut layer = self.load_user();
            layer.remove(key);
            self.save_user(&layer);
            Ok(())
        }

        fn reset_user(&self) -> Result<(), BravetuneError> {
            match fs::remove_file(self.user_document()) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(BravetuneError::io(self.user_document(), e)),
            }
        }

        fn reset_managed_elevated(&self) -> Result<(), BravetuneError> {
            self.elevate()?;
            *self.managed.borrow_mut() = None;
            Ok(())
        }

        fn is_target_installed(&self) -> bool {
            self.installed
        }

        fn is_target_running(&self) -> bool {
            self.running
        }

        fn target_version(&self) -> Option<String> {
            self.installed.then(|| "1.70.117".to_string())
        }

        fn managed_layer_exists(&self) -> bool {
            self.managed.borrow().is_some()
        }
    }

    #[test]
    fn memory_store_round_trips_user_values() {
        let store = MemoryStore::new();
        let setting = Setting::new("TorDisabled", Value::Bool(true)).unwrap();
        store.write_user(&setting).unwrap();
        assert_eq!(store.read_user("TorDisabled").as_deref(), Some("1"));
        assert!(store.user_document().exists());

        store.reset_user().unwrap();
        assert_eq!(store.read_user("TorDisabled"), None);
        store.reset_user().unwrap();
    }

    #[test]
    fn declined_elevation_is_counted() {
        let store = MemoryStore::new();
        assert!(store.write_managed_elevated(&quick_bundle()).is_err());
        assert_eq!(store.elevation_calls(), 1);
        assert!(!store.managed_layer_exists());
    }
}
