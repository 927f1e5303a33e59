//! Publish and delivery error types.

use std::fmt;

use thiserror::Error;

use crate::subscription::SubscriberId;

/// Why a single delivery to one subscriber did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    /// The endpoint was terminated by `unsubscribe` or `close` before or
    /// while the value was being handed over.
    #[error("subscriber endpoint is terminated")]
    EndpointTerminated,

    /// The subscriber dropped its receiving half.
    #[error("subscriber receiver was dropped")]
    ReceiverDropped,

    /// Cloning or handing over the payload panicked.
    #[error("delivery panicked: {0}")]
    Panicked(String),
}

/// A failed delivery recorded by a synchronous publish.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("subscriber #{index} ({subscriber}): {failure}")]
pub struct DeliveryError {
    /// Position of the subscriber in the topic's registration order.
    pub index: usize,
    /// Identity of the subscriber.
    pub subscriber: SubscriberId,
    /// Underlying cause.
    #[source]
    pub failure: DeliveryFailure,
}

/// One or more delivery failures from a single synchronous publish.
///
/// Always holds at least one error, so [`first`](Self::first) never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryErrors {
    first: DeliveryError,
    rest: Vec<DeliveryError>,
}

impl DeliveryErrors {
    /// Collect recorded failures. Returns `None` when there were none.
    #[must_use]
    pub fn from_failures(failures: Vec<DeliveryError>) -> Option<Self> {
        let mut iter = failures.into_iter();
        let first = iter.next()?;
        Some(Self {
            first,
            rest: iter.collect(),
        })
    }

    /// Number of subscribers whose delivery failed.
    #[must_use]
    pub fn count(&self) -> usize {
        self.rest.len().saturating_add(1)
    }

    /// The first failure, in registration order.
    #[must_use]
    pub fn first(&self) -> &DeliveryError {
        &self.first
    }

    /// Iterate over every recorded failure in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &DeliveryError> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }
}

impl fmt::Display for DeliveryErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} delivery error(s); first: {}",
            self.count(),
            self.first
        )
    }
}

impl std::error::Error for DeliveryErrors {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.first)
    }
}

/// Errors returned by [`EventBus::publish_sync`](crate::EventBus::publish_sync).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The bus was already closed when the publish started.
    #[error("event bus is closed")]
    Closed,

    /// At least one subscriber did not receive the payload.
    #[error("publish_sync: {0}")]
    Delivery(#[from] DeliveryErrors),
}

impl PublishError {
    /// Whether this is the closed-bus outcome.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// The per-subscriber failures, if this is a delivery error.
    #[must_use]
    pub fn delivery_errors(&self) -> Option<&DeliveryErrors> {
        match self {
            Self::Delivery(errors) => Some(errors),
            Self::Closed => None,
        }
    }
}

/// Result type for publish operations.
pub type PublishResult<T> = Result<T, PublishError>;
