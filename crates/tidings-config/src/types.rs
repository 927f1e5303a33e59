//! Configuration types.
//!
//! These types mirror the runtime settings of the other tidings crates
//! without depending on them; conversion happens in those crates behind their
//! `config` feature. Every struct implements [`Default`] so that a bare
//! `[section]` header in TOML produces a working configuration.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Event bus settings.
    pub bus: BusSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

/// Event bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSection {
    /// Name attached to the bus's log records.
    pub name: String,
    /// Warn when an asynchronous delivery has been blocked this long
    /// (milliseconds). Unset disables the warning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow_delivery_warn_ms: Option<u64>,
}

impl Default for BusSection {
    fn default() -> Self {
        Self {
            name: "tidings".to_owned(),
            slow_delivery_warn_ms: None,
        }
    }
}

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`, `"off"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["tidings_events=trace"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
