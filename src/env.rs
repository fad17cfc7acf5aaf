//! `BRAVETUNE__*` environment variables as a config layer.

use toml::{Table, Value};

/// Prefix of every environment variable read as configuration.
pub const ENV_PREFIX: &str = "BRAVETUNE";

/// Build a `toml::Table` from variables named `{prefix}__SECTION__FIELD`.
///
/// `__` separates nesting levels, a single `_` is part of the field name and
/// segments are lowercased. Values are parsed as bool, then integer, then
/// float, then string. Variables with an empty segment are skipped.
pub fn env_to_table(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Table {
    let needle = format!("{prefix}__");
    let mut table = Table::new();

    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(&needle) else {
            continue;
        };
        let segments: Vec<String> = rest.split("__").map(str::to_lowercase).collect();
        if segments.iter().any(String::is_empty) {
            continue;
        }
        insert_nested(&mut table, &segments, parse_env_value(&value));
    }

    table
}

fn insert_nested(table: &mut Table, segments: &[String], value: Value) {
    let (first, rest) = match segments {
        [] => return,
        [first, rest @ ..] => (first, rest),
    };

    if rest.is_empty() {
        table.insert(first.clone(), value);
        return;
    }
    let sub = table
        .entry(first.as_str())
        .or_insert_with(|| Value::Table(Table::new()));
    if let Value::Table(sub_table) = sub {
        insert_nested(sub_table, rest, value);
    }
}

fn parse_env_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    // "inf" and "NaN" parse as floats; only dotted numbers count.
    if s.contains('.')
        && let Ok(f) = s.parse::<f64>()
    {
        return Value::Float(f);
    }
    Value::String(s.to_string())
}
