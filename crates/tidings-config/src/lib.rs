#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Layered configuration for the tidings event bus.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tidings_config::Config;
//!
//! let config = Config::load(Some(std::path::Path::new("tidings.toml"))).unwrap();
//! println!("bus name: {}", config.bus.name);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`TIDINGS_*`)
//! 2. **Config file** (path passed to [`Config::load`])
//! 3. **Embedded defaults** (`defaults.toml` compiled into binary)
//!
//! This crate has no dependencies on other internal tidings crates.
//! `tidings-events` and `tidings-telemetry` convert these sections into
//! their own types behind their `config` feature.

pub mod prelude;

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file loading.
pub mod loader;
/// TOML tree merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::*;

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::Path;

impl Config {
    /// Load configuration: defaults, then `path` if it exists, then
    /// `TIDINGS_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is malformed, an override is
    /// invalid, or the result fails validation.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Load configuration with an explicit environment map.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_with_env<S: BuildHasher>(
        path: Option<&Path>,
        env_vars: &HashMap<String, String, S>,
    ) -> ConfigResult<Self> {
        loader::load_with_env(path, env_vars)
    }

    /// Parse a TOML string layered over the defaults. No env overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if parsing or validation fails.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::from_toml_str(content)
    }
}
