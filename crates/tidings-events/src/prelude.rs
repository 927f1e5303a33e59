//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tidings_events::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use tidings_events::prelude::*;
//!
//! # async fn example() -> PublishResult<()> {
//! let bus = EventBus::with_config(BusConfig::new("jobs"));
//! let mut worker = bus.subscribe("jobs.ready");
//!
//! let reader = tokio::spawn(async move { worker.recv().await });
//! bus.publish_sync("jobs.ready", 42_u64).await?;
//! assert_eq!(reader.await.ok().flatten(), Some(42));
//! # Ok(())
//! # }
//! ```

// Event bus
pub use crate::{BusConfig, EventBus};

// Subscriptions
pub use crate::{SubscriberId, Subscription};

// Errors
pub use crate::{DeliveryError, DeliveryErrors, DeliveryFailure, PublishError, PublishResult};
