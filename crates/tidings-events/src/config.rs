//! Bus configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bus name used in log records.
pub const DEFAULT_BUS_NAME: &str = "tidings";

/// Configuration for an [`EventBus`](crate::EventBus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Name attached to every log record emitted by the bus.
    pub name: String,
    /// Log a warning when an asynchronous delivery has been blocked for this
    /// many milliseconds. The delivery keeps waiting; this is not a timeout.
    pub slow_delivery_warn_ms: Option<u64>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_BUS_NAME.to_owned(),
            slow_delivery_warn_ms: None,
        }
    }
}

impl BusConfig {
    /// Create a config with the given bus name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Warn about asynchronous deliveries blocked for longer than `after`.
    ///
    /// The warning timer needs a Tokio runtime with the time driver enabled.
    #[must_use]
    pub fn with_slow_delivery_warning(mut self, after: Duration) -> Self {
        self.slow_delivery_warn_ms = Some(u64::try_from(after.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// The slow delivery threshold, if enabled. A zero threshold disables it.
    #[must_use]
    pub fn slow_delivery_warning(&self) -> Option<Duration> {
        self.slow_delivery_warn_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

#[cfg(feature = "config")]
impl From<&tidings_config::BusSection> for BusConfig {
    fn from(section: &tidings_config::BusSection) -> Self {
        Self {
            name: section.name.clone(),
            slow_delivery_warn_ms: section.slow_delivery_warn_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BusConfig::default();
        assert_eq!(config.name, DEFAULT_BUS_NAME);
        assert!(config.slow_delivery_warning().is_none());
    }

    #[test]
    fn test_slow_delivery_warning_round_trips_millis() {
        let config = BusConfig::new("orders").with_slow_delivery_warning(Duration::from_millis(250));
        assert_eq!(config.name, "orders");
        assert_eq!(config.slow_delivery_warn_ms, Some(250));
        assert_eq!(
            config.slow_delivery_warning(),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_zero_threshold_disables_warning() {
        let config = BusConfig {
            slow_delivery_warn_ms: Some(0),
            ..BusConfig::default()
        };
        assert!(config.slow_delivery_warning().is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: BusConfig = serde_json::from_str(r#"{"slow_delivery_warn_ms": 10}"#).unwrap();
        assert_eq!(config.name, DEFAULT_BUS_NAME);
        assert_eq!(config.slow_delivery_warn_ms, Some(10));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_bus_section() {
        let config = tidings_config::Config::from_toml_str(
            "[bus]\nname = \"orders\"\nslow_delivery_warn_ms = 75\n",
        )
        .unwrap();
        let bus = BusConfig::from(&config.bus);
        assert_eq!(bus.name, "orders");
        assert_eq!(bus.slow_delivery_warning(), Some(Duration::from_millis(75)));
    }
}
