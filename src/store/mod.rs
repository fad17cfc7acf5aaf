//! The preference store seam.
//!
//! A [`PreferenceStore`] reads and writes single keys against two layers of
//! one application's preference domain:
//!
//! - the **user layer**, the application's ordinary per-user document, and
//! - the **managed layer**, a document the application treats as mandatory
//!   policy. Writing or removing it goes through a privilege-elevated
//!   operation that may prompt a human and may be declined.
//!
//! The trait exposes the primitive capability set. The two composed
//! operations every caller relies on, [`read_effective`](PreferenceStore::read_effective)
//! and [`apply_bundle`](PreferenceStore::apply_bundle), are provided methods so
//! every implementation gets the same precedence and fallback rules.
//!
//! [`DefaultsStore`] is the macOS implementation. Tests use an in-memory
//! double.

mod defaults;
pub(crate) mod plist;
pub(crate) mod process;

pub use defaults::{DefaultsStore, Timeouts};

use serde::Serialize;
use tracing::{info, warn};

use crate::bundle::Bundle;
use crate::error::BravetuneError;
use crate::setting::Setting;

/// Which layer supplied an effective value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Managed,
    User,
}

/// A value read back from the store, in the store's own string form
/// (booleans print as `1`/`0`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentValue {
    pub raw: String,
    pub layer: Layer,
}

/// Result of [`PreferenceStore::apply_bundle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    /// `true` when the bundle landed in the managed layer.
    pub enforced: bool,
}

pub trait PreferenceStore {
    /// Value of `key` in the user layer, or `None` if unset.
    fn read_user(&self, key: &str) -> Option<String>;

    /// Value of `key` in the managed layer, or `None` if unset.
    fn read_managed(&self, key: &str) -> Option<String>;

    fn write_user(&self, setting: &Setting) -> Result<(), BravetuneError>;

    /// Replace the managed layer with `bundle`, as one document, through an
    /// elevated operation. Declining the prompt is an error.
    fn write_managed_elevated(&self, bundle: &Bundle) -> Result<(), BravetuneError>;

    fn delete_user(&self, key: &str) -> Result<(), BravetuneError>;

    /// Clear the whole user layer. An already-empty layer is success.
    fn reset_user(&self) -> Result<(), BravetuneError>;

    /// Remove the managed document through an elevated operation.
    fn reset_managed_elevated(&self) -> Result<(), BravetuneError>;

    fn is_target_installed(&self) -> bool;

    fn is_target_running(&self) -> bool;

    fn target_version(&self) -> Option<String>;

    fn managed_layer_exists(&self) -> bool;

    /// The value the application honors for `key`: managed if set there,
    /// else user, else `None`.
    fn read_effective(&self, key: &str) -> Option<CurrentValue> {
        if self.managed_layer_exists()
            && let Some(raw) = self.read_managed(key)
        {
            return Some(CurrentValue {
                raw,
                layer: Layer::Managed,
            });
        }
        self.read_user(key).map(|raw| CurrentValue {
            raw,
            layer: Layer::User,
        })
    }

    /// Write `bundle`, preferring the managed layer.
    ///
    /// The elevated write is always attempted first. If it fails for any
    /// reason, declined prompt included, every setting is written to the user
    /// layer in bundle order. The fallback stops at the first failing key;
    /// keys written before it stay written.
    fn apply_bundle(&self, bundle: &Bundle) -> Result<ApplyOutcome, BravetuneError> {
        match self.write_managed_elevated(bundle) {
            Ok(()) => {
                info!(settings = bundle.len(), "applied to managed layer");
                return Ok(ApplyOutcome { enforced: true });
            }
            Err(e) => {
                warn!(error = %e, "managed write failed, falling back to user layer");
            }
        }
        for setting in bundle {
            self.write_user(setting)?;
        }
        info!(settings = bundle.len(), "applied to user layer");
        Ok(ApplyOutcome { enforced: false })
    }
}
