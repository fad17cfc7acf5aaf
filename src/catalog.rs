//! The preset catalog and the privacy supplement.
//!
//! Presets are declarative YAML documents, one per preset:
//!
//! ```yaml
//! id: quick
//! name: Quick Debloat
//! description: ...
//! settings:
//!   - {key: BraveRewardsDisabled, value: true, type: bool}
//! ```
//!
//! The built-in set is compiled into the binary and sorted by file name, so
//! `01-quick.yaml` lists before `02-max-privacy.yaml`. Every definition is
//! validated on load. Failures are collected across all files and reported
//! together as [`BravetuneError::CatalogLoad`], so one bad definition does not
//! hide another.
//!
//! The built-in catalog is built once per process and shared by reference.
//! [`PresetCatalog::embedded`] surfaces a load failure; callers that prefer
//! to carry on use [`PresetCatalog::embedded_or_empty`].

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use tracing::warn;

use crate::bundle::Bundle;
use crate::error::BravetuneError;
use crate::setting::SettingRow;
use crate::validate;

/// Id that selects the saved custom bundle as a base. Presets cannot use it.
pub const CUSTOM_ID: &str = "custom";

/// Name of the privacy supplement, also the apply target that selects it.
pub const PRIVACY_GUIDES_ID: &str = "privacy-guides";

pub const PRIVACY_GUIDES_URL: &str = "https://www.privacyguides.org/en/desktop-browsers/#brave";

const EMBEDDED_PRESETS: &[(&str, &str)] = &[
    (
        "01-quick.yaml",
        include_str!("../data/presets/01-quick.yaml"),
    ),
    (
        "02-max-privacy.yaml",
        include_str!("../data/presets/02-max-privacy.yaml"),
    ),
    (
        "03-performance.yaml",
        include_str!("../data/presets/03-performance.yaml"),
    ),
];

const EMBEDDED_PRIVACY_GUIDES: &str = include_str!("../data/supplements/privacy-guides.yaml");

static EMBEDDED: OnceLock<PresetCatalog> = OnceLock::new();
static PRIVACY_GUIDES: OnceLock<Bundle> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub settings: Bundle,
}

/// On-disk shape of a preset definition.
#[derive(Debug, Deserialize)]
struct PresetFile {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    settings: Vec<SettingRow>,
}

/// On-disk shape of a supplement. Only `settings` is consumed.
#[derive(Debug, Deserialize)]
struct SupplementFile {
    #[serde(default)]
    #[allow(dead_code)]
    name: String,
    #[serde(default)]
    #[allow(dead_code)]
    description: String,
    #[serde(default)]
    settings: Vec<SettingRow>,
}

/// An ordered, id-unique list of presets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetCatalog {
    presets: Vec<Preset>,
}

impl PresetCatalog {
    /// Build a catalog from `(file name, content)` pairs. Sources are sorted
    /// by file name before loading.
    pub fn from_sources<N, C>(sources: impl IntoIterator<Item = (N, C)>) -> Result<Self, BravetuneError>
    where
        N: Into<String>,
        C: AsRef<str>,
    {
        let mut sources: Vec<(String, C)> =
            sources.into_iter().map(|(n, c)| (n.into(), c)).collect();
        sources.sort_by(|a, b| a.0.cmp(&b.0));

        let mut presets = Vec::with_capacity(sources.len());
        let mut seen = HashSet::new();
        let mut errors = Vec::new();

        for (origin, content) in &sources {
            let preset = match parse_preset(origin, content.as_ref()) {
                Ok(p) => p,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            if !seen.insert(preset.id.clone()) {
                errors.push(BravetuneError::DuplicatePresetId {
                    id: preset.id,
                    origin: origin.clone(),
                });
                continue;
            }
            presets.push(preset);
        }

        if errors.is_empty() {
            Ok(Self { presets })
        } else {
            Err(BravetuneError::CatalogLoad(errors))
        }
    }

    /// Load every `*.yaml` file in `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, BravetuneError> {
        let entries = fs::read_dir(dir).map_err(|e| BravetuneError::io(dir, e))?;
        let mut sources = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| BravetuneError::io(dir, e))?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "yaml") {
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|e| BravetuneError::io(&path, e))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            sources.push((name, content));
        }
        Self::from_sources(sources)
    }

    /// The built-in catalog, loaded on first use.
    pub fn embedded() -> Result<&'static PresetCatalog, BravetuneError> {
        if let Some(catalog) = EMBEDDED.get() {
            return Ok(catalog);
        }
        let catalog = Self::from_sources(EMBEDDED_PRESETS.iter().copied())?;
        Ok(EMBEDDED.get_or_init(|| catalog))
    }

    /// The built-in catalog, or an empty one (with a warning) if it fails to
    /// load.
    pub fn embedded_or_empty() -> PresetCatalog {
        match Self::embedded() {
            Ok(catalog) => catalog.clone(),
            Err(e) => {
                warn!(error = %e, "built-in presets failed to load");
                PresetCatalog::default()
            }
        }
    }

    pub fn find(&self, id: &str) -> Result<&Preset, BravetuneError> {
        self.get(id)
            .ok_or_else(|| BravetuneError::PresetNotFound(id.into()))
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn all(&self) -> &[Preset] {
        &self.presets
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

/// The built-in privacy supplement, loaded on first use.
pub fn privacy_guides() -> Result<&'static Bundle, BravetuneError> {
    if let Some(bundle) = PRIVACY_GUIDES.get() {
        return Ok(bundle);
    }
    let bundle = parse_supplement("privacy-guides.yaml", EMBEDDED_PRIVACY_GUIDES)?;
    Ok(PRIVACY_GUIDES.get_or_init(|| bundle))
}

fn parse_preset(origin: &str, content: &str) -> Result<Preset, BravetuneError> {
    let (file, unknown): (PresetFile, _) =
        validate::yaml_with_unknown(content).map_err(|e| BravetuneError::ParseError {
            origin: origin.into(),
            source: e,
        })?;
    validate::warn_unknown(origin, &unknown);

    let id = file.id.trim();
    if id.is_empty() {
        return Err(BravetuneError::InvalidPreset {
            origin: origin.into(),
            reason: "id is empty".into(),
        });
    }
    if id == CUSTOM_ID || id == PRIVACY_GUIDES_ID || id.starts_with("privacy-guides:") {
        return Err(BravetuneError::InvalidPreset {
            origin: origin.into(),
            reason: format!("id '{id}' is reserved"),
        });
    }

    let settings = Bundle::from_rows(&file.settings).map_err(|e| BravetuneError::Definition {
        origin: origin.into(),
        source: Box::new(e),
    })?;

    Ok(Preset {
        id: id.to_string(),
        name: file.name,
        description: file.description,
        settings,
    })
}

fn parse_supplement(origin: &str, content: &str) -> Result<Bundle, BravetuneError> {
    let (file, unknown): (SupplementFile, _) =
        validate::yaml_with_unknown(content).map_err(|e| BravetuneError::ParseError {
            origin: origin.into(),
            source: e,
        })?;
    validate::warn_unknown(origin, &unknown);
    let bundle = Bundle::from_rows(&file.settings).map_err(|e| BravetuneError::Definition {
        origin: origin.into(),
        source: Box::new(e),
    })?;
    if bundle.is_empty() {
        return Err(BravetuneError::EmptyBundle {
            origin: origin.into(),
        });
    }
    Ok(bundle)
}
