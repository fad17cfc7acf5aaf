//! Which Brave installation the crate operates on.
//!
//! A [`Target`] is an explicit value handed to every store; nothing in the
//! crate keeps a process-wide "current channel". Two stores for two variants
//! can coexist in one process.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Brave release channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Stable,
    Beta,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Stable => f.write_str("stable"),
            Variant::Beta => f.write_str("beta"),
        }
    }
}

/// Paths and names identifying one Brave installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub variant: Variant,
    /// The `defaults` domain of the user layer.
    pub domain: String,
    /// Managed layer location, without the `.plist` extension (the form
    /// `defaults read` expects).
    pub managed_base: PathBuf,
    pub app_path: PathBuf,
    pub process_name: String,
    /// Human-readable application name.
    pub app_name: String,
}

const MANAGED_DIR: &str = "/Library/Managed Preferences";

impl Target {
    pub fn new(variant: Variant) -> Self {
        let (domain, app_name) = match variant {
            Variant::Stable => ("com.brave.Browser", "Brave Browser"),
            Variant::Beta => ("com.brave.Browser.beta", "Brave Browser Beta"),
        };
        Self {
            variant,
            domain: domain.into(),
            managed_base: Path::new(MANAGED_DIR).join(domain),
            app_path: PathBuf::from(format!("/Applications/{app_name}.app")),
            process_name: app_name.into(),
            app_name: app_name.into(),
        }
    }

    /// The managed preferences document read by Brave as mandatory policy.
    pub fn managed_document(&self) -> PathBuf {
        with_plist_ext(&self.managed_base)
    }

    pub fn managed_dir(&self) -> &'static Path {
        Path::new(MANAGED_DIR)
    }

    /// The user-layer document, `~/Library/Preferences/<domain>.plist`.
    pub fn user_document(&self, home: &Path) -> PathBuf {
        home.join("Library")
            .join("Preferences")
            .join(format!("{}.plist", self.domain))
    }

    /// `Info` inside the app bundle, without extension, for `defaults read`.
    pub fn info_base(&self) -> PathBuf {
        self.app_path.join("Contents").join("Info")
    }
}

fn with_plist_ext(base: &Path) -> PathBuf {
    let mut s = base.as_os_str().to_owned();
    s.push(".plist");
    PathBuf::from(s)
}
