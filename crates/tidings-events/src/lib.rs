//! Tidings Events - in-process publish/subscribe bus.
//!
//! This crate provides:
//! - A topic-keyed [`EventBus`] with per-subscriber rendezvous delivery
//! - Fire-and-forget and synchronous publishing
//! - A graceful, three-phase shutdown
//!
//! # Architecture
//!
//! Each call to [`EventBus::subscribe`] creates an endpoint registered under a
//! topic and returns the receiving [`Subscription`]. Publishing snapshots the
//! topic's endpoints under a read lock, releases the lock, and only then hands
//! the payload over:
//!
//! 1. **Asynchronous**: [`EventBus::publish`] starts one Tokio task per
//!    subscriber and returns immediately. Failures are logged.
//!
//! 2. **Synchronous**: [`EventBus::publish_sync`] delivers in registration
//!    order and reports failed subscribers as a [`PublishError`].
//!
//! [`EventBus::close`] fires a shutdown signal that makes blocked asynchronous
//! deliveries give up, waits for them, then terminates every subscription.
//!
//! # Example
//!
//! ```rust
//! use tidings_events::EventBus;
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut orders = bus.subscribe("orders");
//!
//! bus.publish("orders", "created".to_string());
//! assert_eq!(orders.recv().await.as_deref(), Some("created"));
//!
//! bus.close().await;
//! assert_eq!(orders.recv().await, None);
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod config;
mod error;
mod subscription;

pub use bus::EventBus;
pub use config::{BusConfig, DEFAULT_BUS_NAME};
pub use error::{DeliveryError, DeliveryErrors, DeliveryFailure, PublishError, PublishResult};
pub use subscription::{SubscriberId, Subscription};
