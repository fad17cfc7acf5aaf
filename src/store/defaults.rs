//! [`PreferenceStore`] backed by the macOS `defaults` command.
//!
//! User-layer reads and writes shell out to `defaults`. The managed layer is
//! replaced wholesale: the bundle is rendered to a plist in a private temp
//! dir and copied into `/Library/Managed Preferences` by one shell command run
//! through `osascript ... with administrator privileges`, which shows the
//! system credential dialog. Only the temp file path is interpolated into
//! that command; setting data travels inside the file.
//!
//! Off macOS every read reports "unset"/`false` and every write fails with
//! [`BravetuneError::UnsupportedPlatform`].

use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use super::{PreferenceStore, plist, process};
use crate::bundle::Bundle;
use crate::error::BravetuneError;
use crate::setting::{Setting, Value};
use crate::target::Target;

/// Upper bounds for external commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// `defaults`, `pgrep` and friends.
    pub store: Duration,
    /// Anything that shows the credential dialog.
    pub elevated: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            store: Duration::from_secs(30),
            elevated: Duration::from_secs(90),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DefaultsStore {
    target: Target,
    timeouts: Timeouts,
}

impl DefaultsStore {
    pub fn new(target: Target, timeouts: Timeouts) -> Self {
        Self { target, timeouts }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    fn defaults(&self, args: &[&str]) -> Result<process::Output, BravetuneError> {
        process::run("defaults", args, self.timeouts.store)
    }

    fn read_path(&self, domain: &str, key: &str) -> Option<String> {
        if !is_macos() {
            return None;
        }
        match self.defaults(&["read", domain, key]) {
            Ok(out) if out.success() => Some(out.stdout.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                debug!(key, error = %e, "defaults read failed");
                None
            }
        }
    }

    /// Run `shell_cmd` as root through the credential dialog.
    fn run_elevated(&self, shell_cmd: &str) -> Result<(), BravetuneError> {
        let script = format!(
            "do shell script \"{}\" with administrator privileges",
            escape_applescript(shell_cmd)
        );
        let out = process::run("osascript", &["-e", &script], self.timeouts.elevated)
            .map_err(|e| BravetuneError::Elevation {
                reason: e.to_string(),
            })?;
        if out.success() {
            Ok(())
        } else {
            Err(BravetuneError::Elevation {
                reason: out.failure_reason(),
            })
        }
    }
}

impl PreferenceStore for DefaultsStore {
    fn read_user(&self, key: &str) -> Option<String> {
        self.read_path(&self.target.domain, key)
    }

    fn read_managed(&self, key: &str) -> Option<String> {
        if !self.managed_layer_exists() {
            return None;
        }
        self.read_path(&self.target.managed_base.to_string_lossy(), key)
    }

    fn write_user(&self, setting: &Setting) -> Result<(), BravetuneError> {
        ensure_macos()?;
        let (flag, value) = match setting.value() {
            Value::Bool(b) => ("-bool", b.to_string()),
            Value::Integer(n) => ("-integer", n.to_string()),
            Value::Str(s) => ("-string", s.clone()),
        };
        let out = self
            .defaults(&["write", &self.target.domain, setting.key(), flag, &value])
            .map_err(|e| BravetuneError::StoreWrite {
                key: setting.key().into(),
                reason: e.to_string(),
            })?;
        if out.success() {
            debug!(key = setting.key(), "wrote user setting");
            Ok(())
        } else {
            Err(BravetuneError::StoreWrite {
                key: setting.key().into(),
                reason: out.failure_reason(),
            })
        }
    }

    fn write_managed_elevated(&self, bundle: &Bundle) -> Result<(), BravetuneError> {
        ensure_macos()?;
        let tmp = tempfile::Builder::new()
            .prefix("bravetune")
            .tempdir()
            .map_err(|e| BravetuneError::io(std::env::temp_dir(), e))?;
        let src = tmp.path().join(format!("{}.plist", self.target.domain));
        write_private(&src, plist::render(bundle))?;

        let dst = self.target.managed_document();
        let dst = dst.to_string_lossy();
        let dir = self.target.managed_dir().to_string_lossy();
        let shell_cmd = format!(
            "mkdir -p {dir} && cp {src} {dst} && chown root:wheel {dst} && chmod 644 {dst}",
            dir = shell_quote(&dir),
            src = shell_quote(&src.to_string_lossy()),
            dst = shell_quote(&dst),
        );
        self.run_elevated(&shell_cmd)
    }

    fn delete_user(&self, key: &str) -> Result<(), BravetuneError> {
        ensure_macos()?;
        let out = self.defaults(&["delete", &self.target.domain, key])?;
        // A missing key is not an error.
        if out.success() || missing(&out) {
            Ok(())
        } else {
            Err(BravetuneError::StoreWrite {
                key: key.into(),
                reason: out.failure_reason(),
            })
        }
    }

    fn reset_user(&self) -> Result<(), BravetuneError> {
        ensure_macos()?;
        let out = self.defaults(&["delete", &self.target.domain])?;
        if out.success() || missing(&out) {
            Ok(())
        } else {
            Err(BravetuneError::StoreWrite {
                key: self.target.domain.clone(),
                reason: out.failure_reason(),
            })
        }
    }

    fn reset_managed_elevated(&self) -> Result<(), BravetuneError> {
        ensure_macos()?;
        let dst = self.target.managed_document();
        self.run_elevated(&format!("rm -f {}", shell_quote(&dst.to_string_lossy())))
    }

    fn is_target_installed(&self) -> bool {
        is_macos() && self.target.app_path.is_dir()
    }

    fn is_target_running(&self) -> bool {
        if !is_macos() {
            return false;
        }
        process::run(
            "pgrep",
            &["-x", &self.target.process_name],
            self.timeouts.store,
        )
        .map(|out| out.success())
        .unwrap_or(false)
    }

    fn target_version(&self) -> Option<String> {
        if !self.is_target_installed() {
            return None;
        }
        let info = self.target.info_base();
        self.read_path(&info.to_string_lossy(), "CFBundleShortVersionString")
            .filter(|v| !v.is_empty())
    }

    fn managed_layer_exists(&self) -> bool {
        is_macos() && self.target.managed_document().exists()
    }
}

fn is_macos() -> bool {
    cfg!(target_os = "macos")
}

fn ensure_macos() -> Result<(), BravetuneError> {
    if is_macos() {
        Ok(())
    } else {
        Err(BravetuneError::UnsupportedPlatform)
    }
}

fn write_private(path: &Path, content: String) -> Result<(), BravetuneError> {
    fs::write(path, content).map_err(|e| BravetuneError::io(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| BravetuneError::io(path, e))?;
    }
    Ok(())
}

/// `defaults delete` failed only because the domain or key was absent.
fn missing(out: &process::Output) -> bool {
    !out.success() && out.stderr.contains("does not exist")
}

/// Wrap `s` in single quotes for `sh`, escaping embedded quotes.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r#"'"'"'"#))
}

/// Escape `s` for use inside a double-quoted AppleScript string.
fn escape_applescript(s: &str) -> String {
    s.replace('\\', r"\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Variant;

    #[test]
    fn shell_quote_handles_embedded_quotes() {
        assert_eq!(shell_quote("/tmp/a b"), "'/tmp/a b'");
        assert_eq!(shell_quote("it's"), r#"'it'"'"'s'"#);
    }

    #[test]
    fn applescript_escaping() {
        assert_eq!(escape_applescript(r#"cp "a" \b"#), r#"cp \"a\" \\b"#);
    }

    #[cfg(unix)]
    #[test]
    fn only_absent_keys_count_as_deleted() {
        use std::os::unix::process::ExitStatusExt;
        let failed = |stderr: &str| process::Output {
            status: std::process::ExitStatus::from_raw(1 << 8),
            stdout: String::new(),
            stderr: stderr.into(),
        };
        assert!(missing(&failed(
            "The domain/default pair of (com.brave.Browser, TorDisabled) does not exist"
        )));
        assert!(!missing(&failed(
            "Could not write domain com.brave.Browser; exiting"
        )));
        assert!(!missing(&failed("")));
    }

    #[test]
    fn default_timeouts_give_elevation_more_time() {
        let t = Timeouts::default();
        assert_eq!(t.store, Duration::from_secs(30));
        assert_eq!(t.elevated, Duration::from_secs(90));
        assert!(t.elevated > t.store);
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn non_macos_reads_unset_and_refuses_writes() {
        let store = DefaultsStore::new(Target::new(Variant::Stable), Timeouts::default());
        assert_eq!(store.read_user("BraveRewardsDisabled"), None);
        assert!(!store.managed_layer_exists());
        assert!(!store.is_target_installed());
        assert!(!store.is_target_running());
        let setting = Setting::new("TorDisabled", Value::Bool(true)).unwrap();
        assert!(matches!(
            store.write_user(&setting),
            Err(BravetuneError::UnsupportedPlatform)
        ));
        assert!(matches!(
            store.reset_managed_elevated(),
            Err(BravetuneError::UnsupportedPlatform)
        ));
    }

    #[test]
    fn store_keeps_its_target() {
        let store = DefaultsStore::new(Target::new(Variant::Beta), Timeouts::default());
        assert_eq!(store.target().domain, "com.brave.Browser.beta");
    }
}
