//! Environment variable overrides.
//!
//! `TIDINGS_*` variables override whatever the file layers set.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Prefix of every recognised environment variable.
pub const ENV_PREFIX: &str = "TIDINGS_";

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    section: &'static str,
    field: &'static str,
    kind: FieldKind,
}

#[derive(Clone, Copy)]
enum FieldKind {
    String,
    Integer,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "TIDINGS_BUS_NAME",
        section: "bus",
        field: "name",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "TIDINGS_SLOW_DELIVERY_WARN_MS",
        section: "bus",
        field: "slow_delivery_warn_ms",
        kind: FieldKind::Integer,
    },
    EnvMapping {
        var_name: "TIDINGS_LOG_LEVEL",
        section: "logging",
        field: "level",
        kind: FieldKind::String,
    },
    EnvMapping {
        var_name: "TIDINGS_LOG_FORMAT",
        section: "logging",
        field: "format",
        kind: FieldKind::String,
    },
];

/// Snapshot the `TIDINGS_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect()
}

/// Apply environment overrides to the merged TOML tree.
///
/// Returns the number of overrides applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric variable does not parse.
pub fn apply_env_overrides<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };

        let value = match mapping.kind {
            FieldKind::String => toml::Value::String(raw.clone()),
            FieldKind::Integer => {
                let parsed: i64 = raw.trim().parse().map_err(|_| ConfigError::EnvError {
                    var_name: mapping.var_name.to_owned(),
                    message: format!("expected an integer, got '{raw}'"),
                })?;
                toml::Value::Integer(parsed)
            },
        };

        debug!(
            var = mapping.var_name,
            field = %format_args!("{}.{}", mapping.section, mapping.field),
            "applying env var override"
        );
        set_field(merged, mapping.section, mapping.field, value);
        count = count.saturating_add(1);
    }

    Ok(count)
}

fn set_field(root: &mut toml::Value, section: &str, field: &str, value: toml::Value) {
    let Some(root) = root.as_table_mut() else {
        return;
    };
    let section = root
        .entry(section)
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    if let Some(table) = section.as_table_mut() {
        table.insert(field.to_owned(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_overrides_create_missing_sections() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let applied = apply_env_overrides(
            &mut merged,
            &env(&[("TIDINGS_BUS_NAME", "orders"), ("TIDINGS_LOG_LEVEL", "debug")]),
        )
        .unwrap();

        assert_eq!(applied, 2);
        assert_eq!(merged["bus"]["name"].as_str(), Some("orders"));
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
    }

    #[test]
    fn test_integer_override_is_typed() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        apply_env_overrides(
            &mut merged,
            &env(&[("TIDINGS_SLOW_DELIVERY_WARN_MS", " 250 ")]),
        )
        .unwrap();

        assert_eq!(
            merged["bus"]["slow_delivery_warn_ms"].as_integer(),
            Some(250)
        );
    }

    #[test]
    fn test_bad_integer_is_rejected() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let err = apply_env_overrides(
            &mut merged,
            &env(&[("TIDINGS_SLOW_DELIVERY_WARN_MS", "soon")]),
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::EnvError { ref var_name, .. } if var_name == "TIDINGS_SLOW_DELIVERY_WARN_MS"));
    }

    #[test]
    fn test_unrelated_vars_ignored() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let applied =
            apply_env_overrides(&mut merged, &env(&[("TIDINGS_UNKNOWN", "x")])).unwrap();
        assert_eq!(applied, 0);
    }
}
