use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::setting::ValueKind;

/// Coarse classification of a [`BravetuneError`], used by front ends to decide
/// how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad key shape, unconvertible value, unknown type, malformed document.
    Validation,
    /// Unknown preset, missing backup, no saved desired state.
    NotFound,
    /// The underlying write primitive failed.
    StoreWrite,
    /// The privilege prompt was declined or the privileged command failed.
    Elevation,
    /// There is no user preference document to back up.
    SourceNotFound,
    Io,
    Platform,
}

#[derive(Debug, Error)]
pub enum BravetuneError {
    #[error("Invalid key '{key}': policy names must match [A-Za-z][A-Za-z0-9]*")]
    InvalidKey { key: String },

    #[error("Cannot convert {found} to {kind} for '{key}'")]
    TypeConversion {
        key: String,
        kind: ValueKind,
        found: String,
    },

    #[error("Unknown type '{tag}' for '{key}' (expected bool, integer or string)")]
    UnknownType { key: String, tag: String },

    #[error("Duplicate key '{key}' in settings list")]
    DuplicateKey { key: String },

    #[error("Duplicate preset id '{id}' in {origin}")]
    DuplicatePresetId { id: String, origin: String },

    #[error("Invalid preset in {origin}: {reason}")]
    InvalidPreset { origin: String, reason: String },

    #[error("{origin}: {source}")]
    Definition {
        origin: String,
        source: Box<BravetuneError>,
    },

    #[error("{} preset definition(s) failed to load", .0.len())]
    CatalogLoad(Vec<BravetuneError>),

    #[error("Failed to parse {origin}: {source}")]
    ParseError {
        origin: String,
        source: serde_yaml::Error,
    },

    #[error("{path} matches neither the current nor the legacy desired-state layout")]
    UnrecognizedDocument { path: PathBuf },

    #[error("Failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] confique::Error),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("No settings in {origin}")]
    EmptyBundle { origin: String },

    #[error("Preset '{0}' not found")]
    PresetNotFound(String),

    #[error("Unknown custom setting '{0}'")]
    UnknownToggle(String),

    #[error("No custom settings saved to use as a base")]
    NoCustomBase,

    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    #[error("'{name}' matches {count} backups; give the full file name")]
    AmbiguousBackup { name: String, count: usize },

    #[error("No desired state saved; apply a preset or a file first")]
    NoDesiredState,

    #[error("User preferences not found at {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Failed to write '{key}': {reason}")]
    StoreWrite { key: String, reason: String },

    #[error("Privileged operation declined or failed: {reason}")]
    Elevation { reason: String },

    #[error("{program} timed out after {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },

    #[error("{app} not found at {}", .path.display())]
    TargetNotInstalled { app: String, path: PathBuf },

    #[error("{app} is running; quit it first or it will restore its preferences from memory")]
    TargetRunning { app: String },

    #[error("Only macOS is supported")]
    UnsupportedPlatform,

    #[error("Could not determine the home directory")]
    NoHomeDir,

    #[error("Failed to access {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl BravetuneError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BravetuneError::IoError {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        use BravetuneError::*;
        match self {
            InvalidKey { .. }
            | TypeConversion { .. }
            | UnknownType { .. }
            | DuplicateKey { .. }
            | DuplicatePresetId { .. }
            | InvalidPreset { .. }
            | CatalogLoad(_)
            | ParseError { .. }
            | UnrecognizedDocument { .. }
            | ConfigParse { .. }
            | ConfigError(_)
            | InvalidValue { .. }
            | EmptyBundle { .. }
            | AmbiguousBackup { .. } => ErrorKind::Validation,
            Definition { source, .. } => source.kind(),
            PresetNotFound(_)
            | UnknownToggle(_)
            | NoCustomBase
            | BackupNotFound(_)
            | NoDesiredState
            | TargetNotInstalled { .. } => ErrorKind::NotFound,
            StoreWrite { .. } | Timeout { .. } => ErrorKind::StoreWrite,
            Elevation { .. } => ErrorKind::Elevation,
            SourceNotFound { .. } => ErrorKind::SourceNotFound,
            IoError { .. } | NoHomeDir => ErrorKind::Io,
            UnsupportedPlatform | TargetRunning { .. } => ErrorKind::Platform,
        }
    }
}
