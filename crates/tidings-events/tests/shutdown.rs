//! Shutdown protocol.

use std::time::Duration;

use tidings_events::{EventBus, PublishError};
use tidings_test::{completes_within, expect_closed, init_test_tracing};

#[tokio::test]
async fn test_close_with_in_flight_publish_returns_promptly() {
    init_test_tracing();
    let bus = EventBus::new();
    let mut ch1 = bus.subscribe("t1");
    let mut ch2 = bus.subscribe("t2");

    // Nobody reads ch1, so this delivery stays blocked.
    assert_eq!(bus.publish("t1", "x".to_string()), 1);
    assert_eq!(bus.pending_deliveries(), 1);

    completes_within(Duration::from_millis(500), bus.close()).await;

    assert!(ch1.is_terminated());
    assert!(ch2.is_terminated());
    // The abandoned value is never observed.
    expect_closed(ch1.recv()).await;
    expect_closed(ch2.recv()).await;

    assert!(bus.topics().is_empty());
    assert_eq!(bus.subscriber_count("t1"), 0);
    assert_eq!(bus.pending_deliveries(), 0);
}

#[tokio::test]
async fn test_close_waits_for_many_blocked_deliveries() {
    let bus = EventBus::new();
    let subscriptions: Vec<_> = ["topic-0", "topic-1"]
        .into_iter()
        .cycle()
        .take(8)
        .map(|topic| bus.subscribe(topic))
        .collect();

    for _ in 0..3 {
        bus.publish("topic-0", 1_u16);
        bus.publish("topic-1", 2_u16);
    }
    assert_eq!(bus.pending_deliveries(), 24);

    completes_within(Duration::from_secs(1), bus.close()).await;
    assert_eq!(bus.pending_deliveries(), 0);
    assert!(subscriptions.iter().all(tidings_events::Subscription::is_terminated));
}

#[tokio::test]
async fn test_subscribe_after_close_is_terminated() {
    let bus = EventBus::<u32>::new();
    bus.close().await;

    let mut late = bus.subscribe("any");
    assert!(late.is_terminated());
    expect_closed(late.recv()).await;
    // Late subscriptions are never registered.
    assert!(bus.topics().is_empty());
}

#[tokio::test]
async fn test_publish_after_close_is_noop() {
    let bus = EventBus::new();
    bus.close().await;

    let started = completes_within(Duration::from_millis(100), async { bus.publish("foo", "bar") }).await;
    assert_eq!(started, 0);
    assert_eq!(bus.pending_deliveries(), 0);
}

#[tokio::test]
async fn test_publish_sync_after_close_reports_closed() {
    let bus = EventBus::<i32>::new();
    bus.close().await;

    assert_eq!(bus.publish_sync("any", 123).await, Err(PublishError::Closed));
}

#[tokio::test]
async fn test_close_during_publish_sync_records_failure() {
    init_test_tracing();
    let bus = EventBus::<u32>::new();
    let _stuck = bus.subscribe("t");

    let publisher = {
        let bus = bus.clone();
        tokio::spawn(async move { bus.publish_sync("t", 5).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Synchronous sends ignore the shutdown signal; termination makes the
    // pending send fail instead.
    completes_within(Duration::from_secs(1), bus.close()).await;
    let outcome = completes_within(Duration::from_secs(1), publisher).await.unwrap();

    let err = outcome.unwrap_err();
    let errors = err.delivery_errors().unwrap();
    assert_eq!(errors.count(), 1);
    assert_eq!(
        errors.first().failure,
        tidings_events::DeliveryFailure::EndpointTerminated
    );
}

#[tokio::test]
async fn test_concurrent_close_calls() {
    let bus = EventBus::new();
    let _sub = bus.subscribe("t");
    bus.publish("t", 0_u8);

    completes_within(Duration::from_secs(1), async {
        tokio::join!(bus.close(), bus.close());
    })
    .await;

    // Whichever call did the work has finished all three phases.
    assert!(bus.is_closed());
    assert_eq!(bus.subscriber_count("t"), 0);
}
