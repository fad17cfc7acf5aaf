//! Bundle files: `{settings: [{key, value, type}]}` documents authored by
//! hand or produced by export.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bundle::Bundle;
use crate::compose::read_current;
use crate::custom::KeySpace;
use crate::error::BravetuneError;
use crate::setting::SettingRow;
use crate::store::PreferenceStore;
use crate::validate;

#[derive(Debug, Default, Serialize, Deserialize)]
struct BundleFile {
    #[serde(default)]
    settings: Vec<SettingRow>,
}

/// Read and validate a bundle file. A file without settings is an error.
pub fn load_bundle(path: &Path) -> Result<Bundle, BravetuneError> {
    let content = fs::read_to_string(path).map_err(|e| BravetuneError::io(path, e))?;
    let origin = path.display().to_string();

    let (file, unknown): (BundleFile, _) =
        validate::yaml_with_unknown(&content).map_err(|e| BravetuneError::ParseError {
            origin: origin.clone(),
            source: e,
        })?;
    validate::warn_unknown(&origin, &unknown);

    let bundle = Bundle::from_rows(&file.settings).map_err(|e| BravetuneError::Definition {
        origin: origin.clone(),
        source: Box::new(e),
    })?;
    if bundle.is_empty() {
        return Err(BravetuneError::EmptyBundle { origin });
    }
    Ok(bundle)
}

/// Write `bundle` as a bundle file, readable only by the user. Parent
/// directories are created.
pub fn write_bundle(path: &Path, bundle: &Bundle) -> Result<(), BravetuneError> {
    let doc = BundleFile {
        settings: bundle.to_rows(),
    };
    let yaml = serde_yaml::to_string(&doc).map_err(|e| BravetuneError::InvalidValue {
        key: path.display().to_string(),
        reason: e.to_string(),
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| BravetuneError::io(parent, e))?;
    }
    fs::write(path, yaml).map_err(|e| BravetuneError::io(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| BravetuneError::io(path, e))?;
    }
    info!(path = %path.display(), settings = bundle.len(), "wrote bundle file");
    Ok(())
}

/// The effective value of every key in `keys` that is set, as a bundle.
pub fn export_current<S: PreferenceStore + ?Sized>(
    store: &S,
    keys: &KeySpace,
) -> Result<Bundle, BravetuneError> {
    let mut bundle = Bundle::new();
    for key in keys.iter() {
        if let Some(setting) = read_current(store, key) {
            bundle.push_unchecked(setting);
        }
    }
    if bundle.is_empty() {
        return Err(BravetuneError::EmptyBundle {
            origin: "current preferences".into(),
        });
    }
    Ok(bundle)
}
