//! Timing tests for `RetryVerdict::wait` under Tokio's paused clock.

use std::time::Duration;

use peril_retry::RetryPolicy;
use peril_transport::AckType;
use tokio::time::Instant;

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 4,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(1),
        jitter: Duration::ZERO,
    }
}

#[tokio::test(start_paused = true)]
async fn test_wait_sleeps_for_backoff() {
    let verdict = policy().apply(AckType::NackRequeue, 3);
    let start = Instant::now();
    verdict.wait().await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(400));
    assert!(elapsed < Duration::from_millis(410));
}

#[tokio::test(start_paused = true)]
async fn test_wait_is_instant_for_ack() {
    let verdict = policy().apply(AckType::Ack, 3);
    let start = Instant::now();
    verdict.wait().await;
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_full_budget_sequence() {
    let policy = policy();
    let acks: Vec<AckType> = (1..=5)
        .map(|count| policy.apply(AckType::NackRequeue, count).ack)
        .collect();
    assert_eq!(
        acks,
        vec![
            AckType::NackRequeue,
            AckType::NackRequeue,
            AckType::NackRequeue,
            AckType::NackDiscard,
            AckType::NackDiscard,
        ]
    );
}
