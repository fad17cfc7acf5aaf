//! Layered, reversible preference management for Brave Browser on macOS.
//!
//! Bravetune writes named bundles of typed settings ("presets") into Brave's
//! preference domain. Brave reads two layers: a managed policy document that
//! only an administrator can write, and the user's own preferences. A bundle
//! is always offered to the managed layer first; if the administrator prompt
//! is declined, every setting is written to the user layer instead.
//!
//! ```ignore
//! let session = Bravetune::builder().build()?;
//! let report = session.apply_preset("quick")?;
//! println!("{report}");
//! ```
//!
//! # Pieces
//!
//! - [`Setting`] and [`Bundle`]: a key with a typed value, and an ordered,
//!   key-unique list of them.
//! - [`PreferenceStore`]: the two layers of one Brave installation.
//!   [`DefaultsStore`] drives the macOS `defaults` command and `osascript`.
//! - [`PresetCatalog`]: presets loaded from YAML, built into the binary or
//!   read from a directory.
//! - [`merge`](merge::merge) and [`compose`]: stacking a supplement on a base
//!   bundle, and diffing a bundle against the store.
//! - [`DesiredStateStore`]: the record of what was last applied, so it can be
//!   re-applied at login and checked for drift.
//! - [`BackupManager`]: timestamped copies of the user preferences, restore
//!   and reset.
//! - [`Session`]: every operation above behind one value, returning a
//!   [`Report`] for display.
//!
//! # Variants
//!
//! Stable and Beta live in different preference domains. The variant is part
//! of [`ToolConfig`] and of the [`Target`] each store is built for; nothing
//! in the crate keeps a global "current variant".
//!
//! # Tool configuration
//!
//! ```text
//! Compiled defaults     #[config(default = ...)] on ToolConfig
//!        ↑ overridden by
//! bravetune.toml        platform config dir, then ~/.config/bravetune
//!        ↑ overridden by
//! Environment vars      BRAVETUNE__VARIANT, BRAVETUNE__TIMEOUTS__STORE_SECS
//!        ↑ overridden by
//! Overrides             --beta, SessionBuilder::override_value
//! ```
//!
//! Unknown keys in `bravetune.toml` are logged and ignored. Run
//! `bravetune config-template` for a commented file listing every key.
//!
//! # Documents
//!
//! Preset definitions look like this:
//!
//! ```yaml
//! id: quick
//! name: Quick Debloat
//! description: Turn off Rewards, Wallet, VPN and telemetry.
//! settings:
//!   - {key: BraveRewardsDisabled, value: true, type: bool}
//!   - {key: DnsOverHttpsMode, value: automatic, type: string}
//! ```
//!
//! Bundle files (`apply-file`, `export`) carry just the `settings` list. The
//! desired-state document is described in [`persist`].
//!
//! # Logging
//!
//! The library logs through `tracing`: each external command at `debug`,
//! applied and written state at `info`, and every fallback at `warn`. The
//! binary prints warnings to stderr; `-v` or `RUST_LOG` shows more.

pub mod error;
pub mod types;

pub mod backup;
mod builder;
pub mod bundle;
pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compose;
pub mod config;
pub mod custom;
mod env;
pub mod file;
pub mod merge;
pub mod ops;
pub mod paths;
pub mod persist;
mod session;
pub mod setting;
pub mod store;
pub mod target;
mod validate;

#[cfg(test)]
mod fixtures;

pub use backup::{BackupManager, ResetOutcome};
pub use builder::{Bravetune, SessionBuilder};
pub use bundle::Bundle;
pub use catalog::{Preset, PresetCatalog};
pub use config::ToolConfig;
pub use error::{BravetuneError, ErrorKind};
pub use ops::Report;
pub use persist::{DesiredState, DesiredStateStore, Provenance};
pub use session::Session;
pub use setting::{Setting, Value, ValueKind};
pub use store::{DefaultsStore, PreferenceStore};
pub use target::{Target, Variant};
pub use types::{Action, SearchPath, Selection};
