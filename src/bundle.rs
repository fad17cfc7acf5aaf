use std::collections::HashSet;

use crate::error::BravetuneError;
use crate::setting::{Setting, SettingRow};

/// An ordered list of settings with unique keys.
///
/// Order is the declaration (or merge) order and is kept for display and
/// diffing; lookup is by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle {
    settings: Vec<Setting>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bundle, rejecting repeated keys.
    pub fn from_settings(settings: Vec<Setting>) -> Result<Self, BravetuneError> {
        let mut seen = HashSet::with_capacity(settings.len());
        for s in &settings {
            if !seen.insert(s.key()) {
                return Err(BravetuneError::DuplicateKey {
                    key: s.key().to_string(),
                });
            }
        }
        Ok(Self { settings })
    }

    /// Convert document rows, stopping at the first invalid row.
    pub fn from_rows(rows: &[SettingRow]) -> Result<Self, BravetuneError> {
        let settings = rows
            .iter()
            .map(SettingRow::to_setting)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_settings(settings)
    }

    pub fn to_rows(&self) -> Vec<SettingRow> {
        self.settings.iter().map(Setting::to_row).collect()
    }

    pub fn get(&self, key: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.key() == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.settings.iter().map(Setting::key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Setting> {
        self.settings.iter()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Append without the duplicate check. Callers guarantee uniqueness.
    pub(crate) fn push_unchecked(&mut self, setting: Setting) {
        debug_assert!(!self.contains_key(setting.key()));
        self.settings.push(setting);
    }
}

impl<'a> IntoIterator for &'a Bundle {
    type Item = &'a Setting;
    type IntoIter = std::slice::Iter<'a, Setting>;

    fn into_iter(self) -> Self::IntoIter {
        self.settings.iter()
    }
}

impl IntoIterator for Bundle {
    type Item = Setting;
    type IntoIter = std::vec::IntoIter<Setting>;

    fn into_iter(self) -> Self::IntoIter {
        self.settings.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setting::Value;

    fn bool_setting(key: &str, v: bool) -> Setting {
        Setting::new(key, Value::Bool(v)).unwrap()
    }

    #[test]
    fn keeps_declaration_order() {
        let b = Bundle::from_settings(vec![bool_setting("B", true), bool_setting("A", false)])
            .unwrap();
        assert_eq!(b.keys().collect::<Vec<_>>(), vec!["B", "A"]);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = Bundle::from_settings(vec![bool_setting("A", true), bool_setting("A", false)])
            .unwrap_err();
        assert!(matches!(err, BravetuneError::DuplicateKey { key } if key == "A"));
    }

    #[test]
    fn rows_convert_both_ways() {
        let rows: Vec<SettingRow> = serde_yaml::from_str(
            "- {key: TorDisabled, value: true, type: bool}\n- {key: BrowserSignin, value: 0, type: integer}\n",
        )
        .unwrap();
        let b = Bundle::from_rows(&rows).unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(b.get("BrowserSignin").unwrap().value(), &Value::Integer(0));
        assert_eq!(Bundle::from_rows(&b.to_rows()).unwrap(), b);
    }

    #[test]
    fn first_bad_row_fails_conversion() {
        let rows: Vec<SettingRow> =
            serde_yaml::from_str("- {key: Good, value: true, type: bool}\n- {key: Bad, value: x, type: float}\n")
                .unwrap();
        let err = Bundle::from_rows(&rows).unwrap_err();
        assert!(matches!(err, BravetuneError::UnknownType { key, .. } if key == "Bad"));
    }
}
