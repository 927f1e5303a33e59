//! Timeout-guarded async helpers.
//!
//! Every helper panics with a descriptive message instead of hanging when the
//! awaited condition does not happen in time.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Default time allowed for a delivery in tests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Await `fut`, panicking if it takes longer than `timeout`.
///
/// # Panics
///
/// Panics on timeout.
pub async fn completes_within<F: Future>(timeout: Duration, fut: F) -> F::Output {
    match tokio::time::timeout(timeout, fut).await {
        Ok(output) => output,
        Err(_) => panic!("operation did not complete within {timeout:?}"),
    }
}

/// Await a receive future (e.g. `subscription.recv()`), panicking if it does
/// not resolve within `timeout`.
///
/// # Panics
///
/// Panics on timeout.
pub async fn recv_within<T, F>(timeout: Duration, fut: F) -> Option<T>
where
    F: Future<Output = Option<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(received) => received,
        Err(_) => panic!("timed out after {timeout:?} waiting for a delivery"),
    }
}

/// Await a receive future and require a value within [`DEFAULT_TIMEOUT`].
///
/// # Panics
///
/// Panics on timeout or if the receiver reports it is closed.
pub async fn expect_value<T, F>(fut: F) -> T
where
    F: Future<Output = Option<T>>,
{
    match recv_within(DEFAULT_TIMEOUT, fut).await {
        Some(value) => value,
        None => panic!("expected a delivery, but the subscription is closed"),
    }
}

/// Await a receive future and require it to report closed within
/// [`DEFAULT_TIMEOUT`].
///
/// # Panics
///
/// Panics on timeout or if a value arrives instead.
pub async fn expect_closed<T, F>(fut: F)
where
    T: Debug,
    F: Future<Output = Option<T>>,
{
    if let Some(value) = recv_within(DEFAULT_TIMEOUT, fut).await {
        panic!("expected a closed subscription, received {value:?}");
    }
}

/// Poll `condition` until it holds, panicking after `timeout`.
///
/// # Panics
///
/// Panics if the condition is still false after `timeout`.
pub async fn eventually<C>(timeout: Duration, mut condition: C)
where
    C: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now()
        .checked_add(timeout)
        .unwrap_or_else(tokio::time::Instant::now);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `debug` for the tidings crates. Output goes
/// through the libtest capture, so it only shows for failing tests.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,tidings_events=debug"));
        // Another harness may have installed a global subscriber already.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
