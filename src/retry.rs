//! Bounded retry with a fixed inter-attempt delay.
//!
//! One visible, parameterized unit rather than an attribute on the fetch
//! function: the attempt bound and delay are arguments, and the wrapper is
//! testable on its own. No backoff and no jitter — the dominant failure cause
//! is a slow-to-render page, and a short fixed wait is enough for that to
//! clear.

use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::{Action, Retry};

/// Run `action` up to `max_attempts` times, sleeping `delay` between
/// attempts. Returns the first success, or the last attempt's error.
pub async fn with_retry<A: Action>(
    max_attempts: usize,
    delay: Duration,
    action: A,
) -> Result<A::Item, A::Error> {
    let strategy = FixedInterval::new(delay).take(max_attempts.saturating_sub(1));
    Retry::spawn(strategy, action).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn transient_failures_then_success_uses_exactly_three_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result = with_retry(3, Duration::from_secs(5), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(format!("attempt {n} failed"))
                } else {
                    Ok("observed")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("observed"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_success_makes_one_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result = with_retry(3, Duration::from_secs(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>("observed") }
        })
        .await;

        assert_eq!(result, Ok("observed"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_surfaces_the_last_error_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), String> = with_retry(3, Duration::from_secs(5), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(format!("attempt {n} failed")) }
        })
        .await;

        assert_eq!(result, Err("attempt 3 failed".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_bound_never_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), &str> = with_retry(1, Duration::from_secs(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err("nope") }
        })
        .await;

        assert_eq!(result, Err("nope"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
