// tests/retry_test.rs

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use uniovi_classes::retry::{Backoff, MAX_RETRIES, RetryPolicy, retry};
use uniovi_classes::{Result, ScraperError};

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::new(MAX_RETRIES, Backoff::None);

    let result: Result<()> = retry(&policy, "always failing", |attempt| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Err(ScraperError::NavigationError(format!("attempt {}", attempt))) }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    match result {
        Err(ScraperError::RetriesExhausted { attempts, last, .. }) => {
            assert_eq!(attempts, 3);
            assert!(last.to_string().contains("attempt 3"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_stops_at_first_success() -> Result<()> {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::default();

    let value = retry(&policy, "flaky", |attempt| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt < 2 {
                Err(ScraperError::Timeout("rows".to_string()))
            } else {
                Ok(attempt)
            }
        }
    })
    .await?;

    assert_eq!(value, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_linear_backoff_waits_between_attempts_only() {
    let policy = RetryPolicy::new(3, Backoff::Linear(Duration::from_secs(5)));
    let start = Instant::now();

    let result: Result<()> = retry(&policy, "linear", |_| async {
        Err(ScraperError::Timeout("rows".to_string()))
    })
    .await;

    assert!(result.is_err());
    // 5s after the first failure, 10s after the second, nothing after the last.
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16),
        "{:?}",
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn test_fixed_backoff() {
    let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::from_secs(2)));
    let start = Instant::now();

    let _: Result<()> = retry(&policy, "fixed", |_| async {
        Err(ScraperError::Timeout("listing".to_string()))
    })
    .await;

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5), "{:?}", elapsed);
}
