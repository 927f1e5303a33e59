//! Tidings Test - Shared test utilities for the tidings crates.
//!
//! This crate provides timeout-guarded helpers for awaiting deliveries and
//! payload fixtures for exercising failure isolation. It has no dependency on
//! the bus itself, so any crate can use it as a dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! tidings-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! use tidings_test::{expect_value, init_test_tracing};
//!
//! #[tokio::test]
//! async fn test_delivery() {
//!     init_test_tracing();
//!     let bus = EventBus::new();
//!     let mut sub = bus.subscribe("t");
//!     bus.publish("t", 1);
//!     assert_eq!(expect_value(sub.recv()).await, 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::*;
