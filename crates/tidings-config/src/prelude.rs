//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tidings_config::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust,no_run
//! use tidings_config::prelude::*;
//!
//! # fn main() -> ConfigResult<()> {
//! let config = Config::load(None)?;
//! let bus: &BusSection = &config.bus;
//! println!("bus name: {}", bus.name);
//! # Ok(())
//! # }
//! ```

// Configuration
pub use crate::{BusSection, Config, LoggingSection};

// Errors
pub use crate::{ConfigError, ConfigResult};
