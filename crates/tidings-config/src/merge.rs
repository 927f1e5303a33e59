//! Layer merging.

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                match base_table.get_mut(key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => {
                        base_table.insert(key.clone(), overlay_val.clone());
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_tables_merge_per_field() {
        let mut base = parse("[bus]\nname = \"a\"\n[logging]\nlevel = \"info\"\n");
        deep_merge(&mut base, &parse("[bus]\nslow_delivery_warn_ms = 5\n"));

        assert_eq!(base["bus"]["name"].as_str(), Some("a"));
        assert_eq!(base["bus"]["slow_delivery_warn_ms"].as_integer(), Some(5));
        assert_eq!(base["logging"]["level"].as_str(), Some("info"));
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = parse("[logging]\ndirectives = [\"a=debug\", \"b=warn\"]\n");
        deep_merge(&mut base, &parse("[logging]\ndirectives = [\"c=trace\"]\n"));

        let directives = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].as_str(), Some("c=trace"));
    }
}
