//! Subscriber endpoints.
//!
//! Each subscription is a rendezvous channel: a send only completes once the
//! receiving side has taken the value. The bus keeps the sending half
//! ([`Endpoint`]) in its registry and hands the receiving half
//! ([`Subscription`]) to the caller.
//!
//! Both halves share a termination token. Termination is how `unsubscribe`
//! and `close` end a subscription; it is never inferred from the shutdown
//! signal.

use std::fmt;
use std::pin::pin;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::trace;
use uuid::Uuid;

use crate::error::DeliveryFailure;

/// Identity of a subscription. Two subscriptions on the same topic are told
/// apart by this, never by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A value in flight plus the acknowledgement the receiver fires on taking it.
struct Handoff<T> {
    value: T,
    taken: oneshot::Sender<()>,
}

/// How a delivery attempt that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Handover {
    /// The receiver took the value.
    Taken,
    /// The abandon signal fired before the receiver took the value.
    Abandoned,
}

/// Bus-side half of a subscription.
pub(crate) struct Endpoint<T> {
    id: SubscriberId,
    tx: mpsc::Sender<Handoff<T>>,
    terminated: CancellationToken,
}

impl<T> Clone for Endpoint<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
            terminated: self.terminated.clone(),
        }
    }
}

impl<T> fmt::Debug for Endpoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("terminated", &self.terminated.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Create a connected endpoint/subscription pair for `topic`.
pub(crate) fn channel<T>(topic: String) -> (Endpoint<T>, Subscription<T>) {
    // Capacity 1 is the smallest tokio allows; the acknowledgement turns it
    // into a rendezvous.
    let (tx, rx) = mpsc::channel(1);
    let id = SubscriberId::new();
    let terminated = CancellationToken::new();

    let endpoint = Endpoint {
        id,
        tx,
        terminated: terminated.clone(),
    };
    let subscription = Subscription {
        id,
        topic,
        rx,
        terminated,
    };
    (endpoint, subscription)
}

impl<T> Endpoint<T> {
    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    /// End the subscription. Receivers observe `None` from then on.
    pub(crate) fn terminate(&self) {
        self.terminated.cancel();
    }

    /// Hand `value` to the receiver, waiting until it is taken.
    ///
    /// A terminated endpoint is detected before anything is sent. While
    /// waiting, the attempt also races termination and, if given, `abandon`.
    pub(crate) async fn deliver(
        &self,
        value: T,
        abandon: Option<&CancellationToken>,
    ) -> Result<Handover, DeliveryFailure> {
        if self.terminated.is_cancelled() {
            return Err(DeliveryFailure::EndpointTerminated);
        }

        let mut abandoned = pin!(async {
            match abandon {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        });

        let (taken_tx, mut taken_rx) = oneshot::channel();
        let handoff = Handoff {
            value,
            taken: taken_tx,
        };

        tokio::select! {
            biased;
            () = self.terminated.cancelled() => return Err(DeliveryFailure::EndpointTerminated),
            () = &mut abandoned => return Ok(Handover::Abandoned),
            sent = self.tx.send(handoff) => {
                sent.map_err(|_| DeliveryFailure::ReceiverDropped)?;
            },
        }

        // The value now sits in the channel. Whatever wins below, closing
        // `taken_rx` first settles whether the receiver got it.
        tokio::select! {
            biased;
            taken = &mut taken_rx => taken
                .map(|()| Handover::Taken)
                .map_err(|_| DeliveryFailure::ReceiverDropped),
            () = self.terminated.cancelled() => {
                taken_rx.close();
                taken_rx
                    .try_recv()
                    .map(|()| Handover::Taken)
                    .map_err(|_| DeliveryFailure::EndpointTerminated)
            },
            () = &mut abandoned => {
                taken_rx.close();
                Ok(if taken_rx.try_recv().is_ok() {
                    Handover::Taken
                } else {
                    Handover::Abandoned
                })
            },
        }
    }
}

/// Receiving half of a subscription, returned by
/// [`EventBus::subscribe`](crate::EventBus::subscribe).
///
/// Dropping a subscription does not unregister it; publishes to it then fail
/// with [`DeliveryFailure::ReceiverDropped`]. Call
/// [`EventBus::unsubscribe`](crate::EventBus::unsubscribe) to remove it.
pub struct Subscription<T> {
    id: SubscriberId,
    topic: String,
    rx: mpsc::Receiver<Handoff<T>>,
    terminated: CancellationToken,
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("terminated", &self.terminated.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<T> Subscription<T> {
    /// A subscription that is terminated from the start.
    pub(crate) fn terminated(topic: String) -> Self {
        let (endpoint, subscription) = channel(topic);
        endpoint.terminate();
        subscription
    }

    /// Identity of this subscription.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Topic this subscription was registered on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether the subscription has been terminated by the bus.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated.is_cancelled()
    }

    /// Receive the next value.
    ///
    /// Returns `None` once the subscription is terminated, or once the bus
    /// and every in-flight delivery to it have been dropped.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            let handoff = tokio::select! {
                biased;
                () = self.terminated.cancelled() => return None,
                handoff = self.rx.recv() => handoff?,
            };
            if let Some(value) = self.accept(handoff) {
                return Some(value);
            }
        }
    }

    /// Take a value that is already waiting, without blocking.
    ///
    /// Returns `None` if nothing is waiting or the subscription is terminated.
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            if self.terminated.is_cancelled() {
                return None;
            }
            let handoff = self.rx.try_recv().ok()?;
            if let Some(value) = self.accept(handoff) {
                return Some(value);
            }
        }
    }

    /// Acknowledge a handoff. A sender that already gave up has dropped its
    /// side, in which case the value is discarded.
    fn accept(&self, handoff: Handoff<T>) -> Option<T> {
        if handoff.taken.send(()).is_ok() {
            Some(handoff.value)
        } else {
            trace!(subscriber = %self.id, topic = %self.topic, "Discarding abandoned delivery");
            None
        }
    }
}
