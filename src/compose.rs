//! Composition: stacking a supplement on a base bundle, and comparing a
//! bundle against what the store currently holds.

use std::fmt;

use serde::Serialize;

use crate::bundle::Bundle;
use crate::catalog::{self, CUSTOM_ID, PresetCatalog};
use crate::error::BravetuneError;
use crate::merge::merge;
use crate::setting::{Setting, Value};
use crate::store::PreferenceStore;

const NOT_SET: &str = "(not set)";

/// One key whose effective value differs from the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub key: String,
    /// Effective value in store form, or `None` if unset.
    pub current: Option<String>,
    pub new: String,
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.as_deref().unwrap_or(NOT_SET);
        write!(f, "{}: {} -> {}", self.key, current, self.new)
    }
}

/// Keys of `bundle` whose effective value differs, in bundle order.
///
/// Both sides are compared in store form, so `true` in the bundle matches
/// `1` in the store.
pub fn diff<S: PreferenceStore + ?Sized>(bundle: &Bundle, store: &S) -> Vec<DiffEntry> {
    bundle
        .iter()
        .filter_map(|setting| {
            let new = setting.value().normalized();
            let current = store.read_effective(setting.key()).map(|c| c.raw);
            if current.as_deref() == Some(new.as_str()) {
                None
            } else {
                Some(DiffEntry {
                    key: setting.key().to_string(),
                    current,
                    new,
                })
            }
        })
        .collect()
}

/// Resolve the base bundle for `base_id`: the custom fallback for `custom`,
/// the catalog preset otherwise.
pub fn resolve_base(
    base_id: &str,
    catalog: &PresetCatalog,
    custom_fallback: &Bundle,
) -> Result<Bundle, BravetuneError> {
    if base_id == CUSTOM_ID {
        if custom_fallback.is_empty() {
            return Err(BravetuneError::NoCustomBase);
        }
        return Ok(custom_fallback.clone());
    }
    Ok(catalog.find(base_id)?.settings.clone())
}

/// `supplement` stacked on the base selected by `base_id`.
pub fn compose_with_supplement(
    base_id: &str,
    catalog: &PresetCatalog,
    custom_fallback: &Bundle,
    supplement: &Bundle,
) -> Result<Bundle, BravetuneError> {
    let base = resolve_base(base_id, catalog, custom_fallback)?;
    Ok(merge(&base, supplement))
}

/// The privacy supplement stacked on the base selected by `base_id`.
pub fn compose_privacy_layer(
    base_id: &str,
    catalog: &PresetCatalog,
    custom_fallback: &Bundle,
) -> Result<Bundle, BravetuneError> {
    compose_with_supplement(base_id, catalog, custom_fallback, catalog::privacy_guides()?)
}

/// Read the effective value of `key` back as a typed setting.
///
/// The store does not report types, so one is inferred: `1`/`true`/`yes`
/// and `0`/`false`/`no` are booleans, whole numbers are integers, anything
/// else is a string.
pub fn read_current<S: PreferenceStore + ?Sized>(store: &S, key: &str) -> Option<Setting> {
    let raw = store.read_effective(key)?.raw;
    Setting::new(key, infer_value(&raw)).ok()
}

fn infer_value(raw: &str) -> Value {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => return Value::Bool(true),
        "0" | "false" | "no" => return Value::Bool(false),
        _ => {}
    }
    match raw.trim().parse::<i64>() {
        Ok(n) => Value::Integer(n),
        Err(_) => Value::Str(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures::test::{MemoryStore, fixture_catalog, quick_bundle};

    fn int_bundle(pairs: &[(&str, i64)]) -> Bundle {
        Bundle::from_settings(
            pairs
                .iter()
                .map(|(k, v)| Setting::new(*k, Value::Integer(*v)).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn diff_lists_unset_and_changed_keys_in_order() {
        let store = MemoryStore::new();
        store.set_user("MetricsReportingEnabled", "1");
        let entries = diff(&quick_bundle(), &store);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "BraveRewardsDisabled");
        assert_eq!(entries[0].current, None);
        assert_eq!(entries[0].to_string(), "BraveRewardsDisabled: (not set) -> 1");
        assert_eq!(entries[1].current.as_deref(), Some("1"));
        assert_eq!(entries[1].new, "0");
    }

    #[test]
    fn diff_empty_when_store_matches() {
        let store = MemoryStore::new();
        store.set_user("BraveRewardsDisabled", "1");
        store.set_user("MetricsReportingEnabled", "0");
        assert!(diff(&quick_bundle(), &store).is_empty());
    }

    #[test]
    fn diff_uses_managed_value_over_user_value() {
        let store = MemoryStore::new();
        store.set_user("BraveRewardsDisabled", "1");
        store.set_user("MetricsReportingEnabled", "0");
        store.set_managed("BraveRewardsDisabled", "0");
        let entries = diff(&quick_bundle(), &store);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].current.as_deref(), Some("0"));
    }

    #[test]
    fn custom_base_without_saved_settings_fails() {
        let err = compose_privacy_layer(CUSTOM_ID, &fixture_catalog(), &Bundle::new()).unwrap_err();
        assert!(matches!(err, BravetuneError::NoCustomBase));
    }

    #[test]
    fn unknown_base_fails() {
        let err = compose_with_supplement("nope", &fixture_catalog(), &Bundle::new(), &Bundle::new())
            .unwrap_err();
        assert!(matches!(err, BravetuneError::PresetNotFound(id) if id == "nope"));
        assert_eq!(
            BravetuneError::PresetNotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn supplement_stacks_on_catalog_base() {
        let supplement = int_bundle(&[("X", 1)]);
        let composed =
            compose_with_supplement("quick", &fixture_catalog(), &Bundle::new(), &supplement).unwrap();
        assert_eq!(
            composed.keys().collect::<Vec<_>>(),
            vec!["BraveRewardsDisabled", "MetricsReportingEnabled", "X"]
        );
    }

    #[test]
    fn supplement_stacks_on_custom_base() {
        let custom = int_bundle(&[("A", 1), ("B", 2)]);
        let supplement = int_bundle(&[("B", 5)]);
        let composed =
            compose_with_supplement(CUSTOM_ID, &fixture_catalog(), &custom, &supplement).unwrap();
        assert_eq!(composed, int_bundle(&[("A", 1), ("B", 5)]));
    }

    #[test]
    fn privacy_layer_includes_embedded_supplement() {
        let composed = compose_privacy_layer("quick", &fixture_catalog(), &Bundle::new()).unwrap();
        assert!(composed.contains_key("BraveRewardsDisabled"));
        assert!(composed.contains_key("BraveP3AEnabled"));
    }

    #[test]
    fn read_current_infers_types() {
        let store = MemoryStore::new();
        store.set_user("A", "1");
        store.set_user("B", "no");
        store.set_user("C", "2");
        store.set_user("D", "automatic");

        assert_eq!(read_current(&store, "A").unwrap().value(), &Value::Bool(true));
        assert_eq!(read_current(&store, "B").unwrap().value(), &Value::Bool(false));
        assert_eq!(read_current(&store, "C").unwrap().value(), &Value::Integer(2));
        assert_eq!(
            read_current(&store, "D").unwrap().value(),
            &Value::Str("automatic".into())
        );
        assert!(read_current(&store, "E").is_none());
    }
}
