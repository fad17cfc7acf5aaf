//! The desired-state document: the last bundle the operator applied, and
//! where it came from.
//!
//! The document is YAML and is replaced wholesale on every write. Two layouts
//! are readable.
//!
//! The current layout keys settings blocks by provenance:
//!
//! ```yaml
//! preset:
//!   quick:
//!     settings: [{key: BraveRewardsDisabled, value: true, type: bool}]
//! supplement:
//!   privacy_guides:
//!     settings: [...]
//! ```
//!
//! A custom selection is stored as `preset.custom`, and an imported file as
//! top-level `apply_file` plus `settings`.
//!
//! The legacy layout is flat: a `preset` string, optional `base_preset`, an
//! optional `supplement` list and a `settings` list.
//!
//! Detection is by shape. The current layout is tried first and accepted if
//! it yields a preset block, an `apply_file` or settings. Otherwise the
//! legacy layout is tried. A document matching neither is an error; one that
//! matches but carries no settings reads as "nothing saved".

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bundle::Bundle;
use crate::catalog::{CUSTOM_ID, PRIVACY_GUIDES_ID, PresetCatalog};
use crate::compose::compose_with_supplement;
use crate::error::BravetuneError;
use crate::merge::merge;
use crate::setting::SettingRow;

const SUPPLEMENT_KEY: &str = "privacy_guides";
/// Older writers used the hyphenated form.
const SUPPLEMENT_KEY_OLD: &str = "privacy-guides";

/// What produced a saved bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    PresetApplied { preset_id: String },
    PrivacyGuidesApplied { base_preset_id: String },
    FileApplied { path: PathBuf },
    CustomApplied,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::PresetApplied { preset_id } => write!(f, "preset '{preset_id}'"),
            Provenance::PrivacyGuidesApplied { base_preset_id } if base_preset_id.is_empty() => {
                write!(f, "Privacy Guides")
            }
            Provenance::PrivacyGuidesApplied { base_preset_id } => {
                write!(f, "Privacy Guides on '{base_preset_id}'")
            }
            Provenance::FileApplied { path } => write!(f, "file {}", path.display()),
            Provenance::CustomApplied => write!(f, "custom selection"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    pub provenance: Provenance,
    pub settings: Bundle,
    /// For a supplement composition, the base bundle before the supplement.
    pub base: Option<Bundle>,
}

impl DesiredState {
    /// The base to reuse when stacking the supplement again.
    ///
    /// A known preset id, `custom` for a saved custom selection, or the base
    /// of a previous composition if it is still usable.
    pub fn supplement_base(&self, catalog: &PresetCatalog) -> Option<String> {
        match &self.provenance {
            Provenance::PrivacyGuidesApplied { base_preset_id }
                if base_preset_id == CUSTOM_ID || catalog.contains(base_preset_id) =>
            {
                Some(base_preset_id.clone())
            }
            Provenance::CustomApplied if !self.settings.is_empty() => Some(CUSTOM_ID.into()),
            Provenance::PresetApplied { preset_id } if catalog.contains(preset_id) => {
                Some(preset_id.clone())
            }
            _ => None,
        }
    }

    /// The saved custom selection, or an empty bundle if the last apply was
    /// not custom-based.
    pub fn custom_settings(&self) -> Bundle {
        match &self.provenance {
            Provenance::CustomApplied => self.settings.clone(),
            Provenance::PrivacyGuidesApplied { base_preset_id } if base_preset_id == CUSTOM_ID => {
                self.base.clone().unwrap_or_else(|| self.settings.clone())
            }
            _ => Bundle::new(),
        }
    }
}

/// What to record. Compositions keep base and supplement apart so the
/// document shows both.
#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    Preset {
        id: &'a str,
        settings: &'a Bundle,
    },
    PrivacyGuides {
        base_id: &'a str,
        base: &'a Bundle,
        supplement: &'a Bundle,
    },
    File {
        path: &'a Path,
        settings: &'a Bundle,
    },
    Custom {
        settings: &'a Bundle,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Block {
    #[serde(default)]
    settings: Vec<SettingRow>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CurrentDoc {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    preset: BTreeMap<String, Block>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    supplement: BTreeMap<String, Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    apply_file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    settings: Vec<SettingRow>,
}

impl CurrentDoc {
    fn is_usable(&self) -> bool {
        !self.preset.is_empty()
            || self.apply_file.as_deref().is_some_and(|p| !p.is_empty())
            || !self.settings.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
struct LegacyDoc {
    #[serde(default)]
    preset: String,
    #[serde(default)]
    base_preset: String,
    #[serde(default)]
    supplement: Vec<SettingRow>,
    #[serde(default)]
    apply_file: String,
    #[serde(default)]
    settings: Vec<SettingRow>,
}

/// Reads and writes the desired-state document at one path.
#[derive(Debug, Clone)]
pub struct DesiredStateStore {
    path: PathBuf,
}

impl DesiredStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the document with `record`.
    ///
    /// The document is written to a temp file beside the target and renamed
    /// over it, so a crash leaves either the old or the new document. Parent
    /// directories are created. The file is private to the user.
    pub fn write(&self, record: Record<'_>) -> Result<(), BravetuneError> {
        let doc = to_doc(record);
        let yaml = serde_yaml::to_string(&doc).map_err(|e| BravetuneError::InvalidValue {
            key: "<desired state>".into(),
            reason: e.to_string(),
        })?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| BravetuneError::io(dir, e))?;

        // NamedTempFile is created 0600 on unix.
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| BravetuneError::io(dir, e))?;
        tmp.write_all(yaml.as_bytes())
            .map_err(|e| BravetuneError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| BravetuneError::io(&self.path, e.error))?;

        info!(path = %self.path.display(), "saved desired state");
        Ok(())
    }

    /// Load the saved state. `Ok(None)` if there is no document or it holds
    /// no settings.
    pub fn read(&self, catalog: &PresetCatalog) -> Result<Option<DesiredState>, BravetuneError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BravetuneError::io(&self.path, e)),
        };
        self.parse(&content, catalog)
    }

    /// The base to stack the supplement on, from the saved state.
    pub fn resolve_supplement_base(
        &self,
        catalog: &PresetCatalog,
    ) -> Result<Option<String>, BravetuneError> {
        Ok(self
            .read(catalog)?
            .and_then(|state| state.supplement_base(catalog)))
    }

    fn parse(
        &self,
        content: &str,
        catalog: &PresetCatalog,
    ) -> Result<Option<DesiredState>, BravetuneError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| BravetuneError::ParseError {
                origin: self.path.display().to_string(),
                source: e,
            })?;
        if value.is_null() {
            return Ok(None);
        }

        if let Ok(doc) = serde_yaml::from_value::<CurrentDoc>(value.clone())
            && doc.is_usable()
        {
            debug!(path = %self.path.display(), "reading current layout");
            return read_current_doc(doc).map(non_empty);
        }

        match serde_yaml::from_value::<LegacyDoc>(value) {
            Ok(doc) => {
                debug!(path = %self.path.display(), "reading legacy layout");
                read_legacy_doc(doc, catalog).map(non_empty)
            }
            Err(_) => Err(BravetuneError::UnrecognizedDocument {
                path: self.path.clone(),
            }),
        }
    }
}

fn non_empty(state: Option<DesiredState>) -> Option<DesiredState> {
    state.filter(|s| !s.settings.is_empty())
}

fn to_doc(record: Record<'_>) -> CurrentDoc {
    let block = |b: &Bundle| Block { settings: b.to_rows() };
    let mut doc = CurrentDoc::default();
    match record {
        Record::Preset { id, settings } => {
            doc.preset.insert(id.into(), block(settings));
        }
        Record::PrivacyGuides {
            base_id,
            base,
            supplement,
        } => {
            doc.preset.insert(base_id.into(), block(base));
            doc.supplement.insert(SUPPLEMENT_KEY.into(), block(supplement));
        }
        Record::File { path, settings } => {
            doc.apply_file = Some(path.display().to_string());
            doc.settings = settings.to_rows();
        }
        Record::Custom { settings } => {
            doc.preset.insert(CUSTOM_ID.into(), block(settings));
        }
    }
    doc
}

fn rows(origin: &str, rows: &[SettingRow]) -> Result<Bundle, BravetuneError> {
    Bundle::from_rows(rows).map_err(|e| BravetuneError::Definition {
        origin: origin.into(),
        source: Box::new(e),
    })
}

fn read_current_doc(doc: CurrentDoc) -> Result<Option<DesiredState>, BravetuneError> {
    // BTreeMap iteration makes the choice deterministic if a hand-edited
    // document names more than one preset.
    if let Some((id, block)) = doc.preset.iter().find(|(_, b)| !b.settings.is_empty()) {
        let base = rows(&format!("preset.{id}"), &block.settings)?;
        let supplement = [SUPPLEMENT_KEY, SUPPLEMENT_KEY_OLD]
            .into_iter()
            .filter_map(|k| doc.supplement.get(k).map(|b| (k, b)))
            .find(|(_, b)| !b.settings.is_empty());

        if let Some((key, sup)) = supplement {
            let sup = rows(&format!("supplement.{key}"), &sup.settings)?;
            return Ok(Some(DesiredState {
                provenance: Provenance::PrivacyGuidesApplied {
                    base_preset_id: id.clone(),
                },
                settings: merge(&base, &sup),
                base: Some(base),
            }));
        }

        let provenance = if id == CUSTOM_ID {
            Provenance::CustomApplied
        } else {
            Provenance::PresetApplied {
                preset_id: id.clone(),
            }
        };
        return Ok(Some(DesiredState {
            provenance,
            settings: base,
            base: None,
        }));
    }

    if doc.settings.is_empty() {
        return Ok(None);
    }
    let settings = rows("settings", &doc.settings)?;
    let provenance = match doc.apply_file.filter(|p| !p.is_empty()) {
        Some(path) => Provenance::FileApplied { path: path.into() },
        None => Provenance::CustomApplied,
    };
    Ok(Some(DesiredState {
        provenance,
        settings,
        base: None,
    }))
}

fn read_legacy_doc(
    doc: LegacyDoc,
    catalog: &PresetCatalog,
) -> Result<Option<DesiredState>, BravetuneError> {
    let is_privacy_guides = doc.preset == PRIVACY_GUIDES_ID;
    let settings = rows("settings", &doc.settings)?;

    if is_privacy_guides && !doc.base_preset.is_empty() && !doc.supplement.is_empty() {
        let supplement = rows("supplement", &doc.supplement)?;
        match compose_with_supplement(&doc.base_preset, catalog, &settings, &supplement) {
            Ok(merged) => {
                let base = merged_base(&doc.base_preset, catalog, &settings);
                return Ok(Some(DesiredState {
                    provenance: Provenance::PrivacyGuidesApplied {
                        base_preset_id: doc.base_preset,
                    },
                    settings: merged,
                    base,
                }));
            }
            Err(e) if settings.is_empty() => return Err(e),
            Err(e) => {
                warn!(error = %e, "cannot rebuild saved composition, using saved settings");
            }
        }
    }

    if settings.is_empty() {
        return Ok(None);
    }

    let provenance = if is_privacy_guides {
        Provenance::PrivacyGuidesApplied {
            base_preset_id: doc.base_preset,
        }
    } else if !doc.apply_file.is_empty() {
        Provenance::FileApplied {
            path: doc.apply_file.into(),
        }
    } else if doc.preset.is_empty() || doc.preset == CUSTOM_ID {
        Provenance::CustomApplied
    } else {
        Provenance::PresetApplied {
            preset_id: doc.preset,
        }
    };
    Ok(Some(DesiredState {
        provenance,
        settings,
        base: None,
    }))
}

fn merged_base(base_id: &str, catalog: &PresetCatalog, custom: &Bundle) -> Option<Bundle> {
    if base_id == CUSTOM_ID {
        Some(custom.clone())
    } else {
        catalog.get(base_id).map(|p| p.settings.clone())
    }
}
