//! Overlay-wins merges: settings bundles, and the TOML tables the tool's own
//! config is layered from.

use toml::Table;

use crate::bundle::Bundle;

/// Merge `overlay` on top of `base`.
///
/// The result holds every key of `base` in base order, with the overlay's
/// setting substituted where both have the key, followed by the keys only
/// `overlay` has, in overlay order. Callers display and diff in this order.
pub fn merge(base: &Bundle, overlay: &Bundle) -> Bundle {
    let mut out = Bundle::new();
    for setting in base {
        let winner = overlay.get(setting.key()).unwrap_or(setting);
        out.push_unchecked(winner.clone());
    }
    for setting in overlay {
        if !base.contains_key(setting.key()) {
            out.push_unchecked(setting.clone());
        }
    }
    out
}

/// Deep-merge `overlay` on top of `base`.
/// If both sides have a Table for the same key, recurse.
/// Otherwise, `overlay`'s value wins.
pub fn deep_merge(mut base: Table, overlay: Table) -> Table {
    for (key, overlay_val) in overlay {
        match (base.remove(&key), overlay_val) {
            (Some(toml::Value::Table(base_tbl)), toml::Value::Table(overlay_tbl)) => {
                base.insert(key, toml::Value::Table(deep_merge(base_tbl, overlay_tbl)));
            }
            (_, overlay_val) => {
                base.insert(key, overlay_val);
            }
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setting::{Setting, Value};

    fn bundle(pairs: &[(&str, i64)]) -> Bundle {
        Bundle::from_settings(
            pairs
                .iter()
                .map(|(k, v)| Setting::new(*k, Value::Integer(*v)).unwrap())
                .collect(),
        )
        .unwrap()
    }

    fn keys(b: &Bundle) -> Vec<&str> {
        b.keys().collect()
    }

    #[test]
    fn merge_with_itself_is_identity() {
        let b = bundle(&[("C", 3), ("A", 1), ("B", 2)]);
        assert_eq!(merge(&b, &b), b);
    }

    #[test]
    fn disjoint_bundles_concatenate() {
        let a = bundle(&[("Z", 1), ("Y", 2)]);
        let b = bundle(&[("B", 3), ("A", 4)]);
        let merged = merge(&a, &b);
        assert_eq!(merged.len(), a.len() + b.len());
        assert_eq!(keys(&merged), vec!["Z", "Y", "B", "A"]);
    }

    #[test]
    fn overlapping_key_takes_overlay_value_at_base_position() {
        let base = bundle(&[("A", 1), ("K", 2), ("B", 3)]);
        let overlay = bundle(&[("X", 9), ("K", 20)]);
        let merged = merge(&base, &overlay);
        assert_eq!(keys(&merged), vec!["A", "K", "B", "X"]);
        assert_eq!(merged.get("K").unwrap().value(), &Value::Integer(20));
    }

    #[test]
    fn empty_sides() {
        let b = bundle(&[("A", 1)]);
        assert_eq!(merge(&Bundle::new(), &b), b);
        assert_eq!(merge(&b, &Bundle::new()), b);
    }

    fn table(toml_str: &str) -> Table {
        toml_str.parse::<Table>().unwrap()
    }

    #[test]
    fn tables_scalar_overlay_wins() {
        let merged = deep_merge(table(r#"variant = "stable""#), table(r#"variant = "beta""#));
        assert_eq!(merged["variant"].as_str().unwrap(), "beta");
    }

    #[test]
    fn tables_nested_recurse() {
        let base = table("[timeouts]\nstore_secs = 30\nelevated_secs = 90\n");
        let overlay = table("[timeouts]\nelevated_secs = 120\n");
        let merged = deep_merge(base, overlay);
        let t = merged["timeouts"].as_table().unwrap();
        assert_eq!(t["store_secs"].as_integer().unwrap(), 30);
        assert_eq!(t["elevated_secs"].as_integer().unwrap(), 120);
    }
}
