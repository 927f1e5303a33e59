//! Failure isolation in both publish paths.

use std::time::Duration;

use tidings_events::{BusConfig, DeliveryFailure, EventBus};
use tidings_test::{CloneCounter, PanicOnClone, eventually, expect_value, init_test_tracing};

#[tokio::test]
async fn test_publish_sync_continues_past_dropped_subscriber() {
    init_test_tracing();
    let bus = EventBus::<u32>::new();
    let mut first = bus.subscribe("t");
    let dropped = bus.subscribe("t");
    let mut last = bus.subscribe("t");
    let dropped_id = dropped.id();
    drop(dropped);

    let readers = (
        tokio::spawn(async move { first.recv().await }),
        tokio::spawn(async move { last.recv().await }),
    );

    let err = bus.publish_sync("t", 9).await.unwrap_err();
    let errors = err.delivery_errors().unwrap();
    assert_eq!(errors.count(), 1);
    assert_eq!(errors.first().index, 1);
    assert_eq!(errors.first().subscriber, dropped_id);
    assert_eq!(errors.first().failure, DeliveryFailure::ReceiverDropped);

    assert_eq!(readers.0.await.unwrap(), Some(9));
    assert_eq!(readers.1.await.unwrap(), Some(9));
}

#[tokio::test]
async fn test_publish_sync_isolates_panicking_payload() {
    init_test_tracing();
    let bus = EventBus::<PanicOnClone>::new();
    let _a = bus.subscribe("t");
    let _b = bus.subscribe("t");

    let err = bus.publish_sync("t", PanicOnClone).await.unwrap_err();
    let errors = err.delivery_errors().unwrap();

    assert_eq!(errors.count(), 2);
    assert!(matches!(
        &errors.first().failure,
        DeliveryFailure::Panicked(msg) if msg.contains("refused to clone")
    ));
    assert!(err.to_string().starts_with("publish_sync: 2 delivery error(s)"));
}

#[tokio::test]
async fn test_publish_isolates_panicking_payload() {
    init_test_tracing();
    let bus = EventBus::<PanicOnClone>::new();
    let mut subscription = bus.subscribe("t");

    assert_eq!(bus.publish("t", PanicOnClone), 1);

    // The task recovers and is counted down; the caller never sees the panic.
    eventually(Duration::from_secs(1), || bus.pending_deliveries() == 0).await;
    assert!(subscription.try_recv().is_none());
    assert!(!bus.is_closed());
}

#[tokio::test]
async fn test_publish_to_dropped_subscriber_is_logged_not_raised() {
    let bus = EventBus::<u32>::new();
    drop(bus.subscribe("t"));
    let mut live = bus.subscribe("t");

    assert_eq!(bus.publish("t", 3), 2);
    assert_eq!(expect_value(live.recv()).await, 3);
    eventually(Duration::from_secs(1), || bus.pending_deliveries() == 0).await;
}

#[tokio::test]
async fn test_unsubscribe_racing_async_delivery() {
    init_test_tracing();
    let bus = EventBus::<u32>::new();
    let subscription = bus.subscribe("t");

    bus.publish("t", 1);
    bus.unsubscribe("t", &subscription);

    // The blocked delivery observes termination and finishes on its own.
    eventually(Duration::from_secs(1), || bus.pending_deliveries() == 0).await;
    assert!(subscription.is_terminated());
}

#[tokio::test]
async fn test_payload_cloned_once_per_subscriber() {
    let bus = EventBus::<CloneCounter>::new();
    let mut subscriptions: Vec<_> = (0..3).map(|_| bus.subscribe("t")).collect();
    let payload = CloneCounter::new();
    let probe = payload.clone();

    bus.publish("t", payload);
    for subscription in &mut subscriptions {
        expect_value(subscription.recv()).await;
    }

    // One clone for the probe, one per subscriber.
    assert_eq!(probe.clones(), 4);
}

#[tokio::test]
async fn test_slow_delivery_warning_does_not_time_out() {
    init_test_tracing();
    let bus = EventBus::with_config(
        BusConfig::new("slow").with_slow_delivery_warning(Duration::from_millis(10)),
    );
    let mut subscription = bus.subscribe("t");

    bus.publish("t", "late".to_string());
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Still deliverable well past the warning threshold.
    assert_eq!(bus.pending_deliveries(), 1);
    assert_eq!(expect_value(subscription.recv()).await, "late");
}
