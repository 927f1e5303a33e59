//! Topic-keyed event bus.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tracing::{Instrument, debug, debug_span, trace, warn};

use crate::config::BusConfig;
use crate::error::{DeliveryError, DeliveryErrors, DeliveryFailure, PublishError, PublishResult};
use crate::subscription::{self, Endpoint, Handover, SubscriberId, Subscription};

/// Registry contents guarded by the bus lock.
struct BusState<T> {
    /// Topic → endpoints in registration order. Keys outlive their last
    /// subscriber and are only removed by `close`.
    topics: HashMap<String, Vec<Endpoint<T>>>,
    /// Set once by `close`, never reset.
    closed: bool,
}

struct Shared<T> {
    state: RwLock<BusState<T>>,
    /// Fired once by `close` to unblock asynchronous deliveries.
    shutdown: CancellationToken,
    /// Counts in-flight asynchronous deliveries.
    deliveries: TaskTracker,
    config: BusConfig,
}

/// In-process publish/subscribe bus.
///
/// Subscribers register on a topic and receive every payload published to it
/// afterwards over their own [`Subscription`]. Delivery is a rendezvous: a
/// send completes when the subscriber takes the value.
///
/// The registry lock is never held while a value is being handed over, so a
/// slow subscriber cannot block `subscribe`, `unsubscribe` or other
/// publishers.
///
/// Cloning an `EventBus` yields another handle to the same bus.
pub struct EventBus<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read_state();
        f.debug_struct("EventBus")
            .field("name", &self.shared.config.name)
            .field("closed", &state.closed)
            .field("topic_count", &state.topics.len())
            .field("pending_deliveries", &self.shared.deliveries.len())
            .finish()
    }
}

impl<T> Default for EventBus<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBus<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a bus with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a bus with the given configuration.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(BusState {
                    topics: HashMap::new(),
                    closed: false,
                }),
                shutdown: CancellationToken::new(),
                deliveries: TaskTracker::new(),
                config,
            }),
        }
    }

    /// Register a new subscriber on `topic`.
    ///
    /// On a closed bus the returned subscription is already terminated and
    /// never yields a value.
    pub fn subscribe(&self, topic: impl Into<String>) -> Subscription<T> {
        let topic = topic.into();
        let mut state = self.write_state();

        if state.closed {
            debug!(bus = %self.name(), topic = %topic, "Subscribe on closed bus, returning terminated subscription");
            return Subscription::terminated(topic);
        }

        let (endpoint, subscription) = subscription::channel(topic.clone());
        debug!(bus = %self.name(), topic = %topic, subscriber = %endpoint.id(), "Subscriber registered");
        state.topics.entry(topic).or_default().push(endpoint);
        subscription
    }

    /// Remove `subscription` from `topic` and terminate it.
    ///
    /// Unknown subscriptions, wrong topics and repeated calls are no-ops.
    pub fn unsubscribe(&self, topic: &str, subscription: &Subscription<T>) {
        self.unsubscribe_id(topic, subscription.id());
    }

    /// Remove the subscriber with `id` from `topic` and terminate it.
    ///
    /// Returns `true` if a subscriber was removed.
    pub fn unsubscribe_id(&self, topic: &str, id: SubscriberId) -> bool {
        let mut state = self.write_state();

        let Some(endpoints) = state.topics.get_mut(topic) else {
            return false;
        };
        let Some(position) = endpoints.iter().position(|e| e.id() == id) else {
            return false;
        };

        // `remove` keeps the relative order of the remaining subscribers.
        let endpoint = endpoints.remove(position);
        endpoint.terminate();

        debug!(bus = %self.name(), topic = %topic, subscriber = %id, "Subscriber unregistered");
        true
    }

    /// Publish `payload` to every current subscriber of `topic` without
    /// waiting for delivery.
    ///
    /// One delivery task is started per subscriber. A closed bus makes this a
    /// silent no-op. Delivery failures are logged, never returned.
    ///
    /// Returns the number of delivery tasks started. Outside of a Tokio
    /// runtime nothing can be spawned; the publish is logged and dropped.
    ///
    /// # Panics
    ///
    /// With a slow delivery threshold configured, the delivery tasks panic if
    /// the runtime was built without the time driver.
    pub fn publish(&self, topic: &str, payload: T) -> usize {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(bus = %self.name(), topic = %topic, "Publish outside of a Tokio runtime dropped");
            return 0;
        };

        // Tracker tokens are taken under the lock so that `close` cannot
        // start waiting before these deliveries are counted.
        let deliveries: Vec<(Endpoint<T>, TaskTrackerToken)> = {
            let state = self.read_state();
            if state.closed {
                trace!(bus = %self.name(), topic = %topic, "Publish on closed bus ignored");
                return 0;
            }
            state
                .topics
                .get(topic)
                .map(|endpoints| {
                    endpoints
                        .iter()
                        .map(|e| (e.clone(), self.shared.deliveries.token()))
                        .collect()
                })
                .unwrap_or_default()
        };

        let started = deliveries.len();
        if started == 0 {
            trace!(bus = %self.name(), topic = %topic, "No subscribers for topic");
            return 0;
        }

        let payload = Arc::new(payload);
        for (endpoint, token) in deliveries {
            let span = debug_span!(
                "delivery",
                bus = %self.name(),
                topic = %topic,
                subscriber = %endpoint.id(),
            );
            let task = DeliveryTask {
                endpoint,
                payload: Arc::clone(&payload),
                shutdown: self.shared.shutdown.clone(),
                slow_after: self.shared.config.slow_delivery_warning(),
                _token: token,
            };
            runtime.spawn(task.run().instrument(span));
        }

        debug!(bus = %self.name(), topic = %topic, subscribers = started, "Event published");
        started
    }

    /// Publish `payload` to every current subscriber of `topic`, one after
    /// the other in registration order, waiting for each hand-over.
    ///
    /// A failing subscriber does not stop delivery to the rest.
    ///
    /// # Errors
    ///
    /// - [`PublishError::Closed`] if the bus was closed when the call started.
    /// - [`PublishError::Delivery`] if one or more subscribers did not receive
    ///   the payload.
    pub async fn publish_sync(&self, topic: &str, payload: T) -> PublishResult<()> {
        let snapshot: Vec<Endpoint<T>> = {
            let state = self.read_state();
            if state.closed {
                return Err(PublishError::Closed);
            }
            state.topics.get(topic).cloned().unwrap_or_default()
        };

        let mut failures = Vec::new();
        for (index, endpoint) in snapshot.iter().enumerate() {
            match attempt(endpoint, &payload, None).await {
                Ok(_) => {
                    trace!(bus = %self.name(), topic = %topic, subscriber = %endpoint.id(), "Delivered");
                },
                Err(failure) => {
                    debug!(
                        bus = %self.name(),
                        topic = %topic,
                        subscriber = %endpoint.id(),
                        index,
                        error = %failure,
                        "Synchronous delivery failed"
                    );
                    failures.push(DeliveryError {
                        index,
                        subscriber: endpoint.id(),
                        failure,
                    });
                },
            }
        }

        match DeliveryErrors::from_failures(failures) {
            None => Ok(()),
            Some(errors) => Err(errors.into()),
        }
    }

    /// Shut the bus down.
    ///
    /// Marks the bus closed and fires the shutdown signal, waits for every
    /// in-flight asynchronous delivery to finish or abandon, then terminates
    /// all subscriptions and clears the registry.
    ///
    /// Calling it again is cheap once a close has completed. If a previous
    /// `close` future was dropped before finishing, the next call completes
    /// the drain.
    pub async fn close(&self) {
        {
            let mut state = self.write_state();
            if !state.closed {
                state.closed = true;
                self.shared.shutdown.cancel();
                self.shared.deliveries.close();
                debug!(
                    bus = %self.name(),
                    pending = self.shared.deliveries.len(),
                    "Bus closing, waiting for in-flight deliveries"
                );
            }
        }

        self.shared.deliveries.wait().await;

        let mut state = self.write_state();
        if state.topics.is_empty() {
            return;
        }
        let mut terminated: usize = 0;
        for (_, endpoints) in state.topics.drain() {
            for endpoint in endpoints {
                endpoint.terminate();
                terminated = terminated.saturating_add(1);
            }
        }
        debug!(bus = %self.name(), terminated, "Bus closed");
    }
}

impl<T> EventBus<T> {
    /// All topics currently known, including those with no subscribers left.
    #[must_use]
    pub fn topics(&self) -> BTreeSet<String> {
        self.read_state().topics.keys().cloned().collect()
    }

    /// Number of live subscribers on `topic` (0 for unknown topics).
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.read_state().topics.get(topic).map_or(0, Vec::len)
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.read_state().closed
    }

    /// Number of asynchronous deliveries still in flight.
    #[must_use]
    pub fn pending_deliveries(&self) -> usize {
        self.shared.deliveries.len()
    }

    /// The configuration this bus was created with.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.shared.config
    }

    fn name(&self) -> &str {
        &self.shared.config.name
    }

    fn read_state(&self) -> RwLockReadGuard<'_, BusState<T>> {
        self.shared.state.read().unwrap_or_else(|e| {
            warn!(bus = %self.name(), "EventBus read lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, BusState<T>> {
        self.shared.state.write().unwrap_or_else(|e| {
            warn!(bus = %self.name(), "EventBus lock poisoned, recovering");
            e.into_inner()
        })
    }
}

/// One asynchronous delivery. Dropping it (on any exit path, including
/// unwinding) releases the tracker token.
struct DeliveryTask<T> {
    endpoint: Endpoint<T>,
    payload: Arc<T>,
    shutdown: CancellationToken,
    slow_after: Option<std::time::Duration>,
    _token: TaskTrackerToken,
}

impl<T> DeliveryTask<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run(self) {
        let delivery = attempt(&self.endpoint, &self.payload, Some(&self.shutdown));
        let mut delivery = std::pin::pin!(delivery);

        let outcome = match self.slow_after {
            Some(after) => {
                tokio::select! {
                    outcome = &mut delivery => outcome,
                    () = tokio::time::sleep(after) => {
                        warn!(waited_ms = u64::try_from(after.as_millis()).unwrap_or(u64::MAX), "Slow subscriber, delivery still blocked");
                        delivery.await
                    },
                }
            },
            None => delivery.await,
        };

        match outcome {
            Ok(Handover::Taken) => trace!("Delivered"),
            Ok(Handover::Abandoned) => debug!("Delivery abandoned on shutdown"),
            Err(failure) => warn!(error = %failure, "Delivery failed"),
        }
    }
}

/// Clone `payload` and hand it to `endpoint`, converting a panic anywhere in
/// the attempt into [`DeliveryFailure::Panicked`].
async fn attempt<T>(
    endpoint: &Endpoint<T>,
    payload: &T,
    abandon: Option<&CancellationToken>,
) -> Result<Handover, DeliveryFailure>
where
    T: Clone,
{
    AssertUnwindSafe(async { endpoint.deliver(payload.clone(), abandon).await })
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let message = panic_message(panic.as_ref());
            warn!(subscriber = %endpoint.id(), panic = %message, "Recovered from delivery panic");
            Err(DeliveryFailure::Panicked(message))
        })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
