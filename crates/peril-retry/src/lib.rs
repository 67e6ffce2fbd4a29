//! Retry budget and backoff for requeued deliveries.
//!
//! A broker requeue is immediate and unlimited. Left alone, a message whose
//! side effect keeps failing (or that no consumer will ever claim) circles
//! the queue forever. [`RetryPolicy`] sits between the acknowledgment
//! decision and the broker:
//!
//! - `Ack` and `NackDiscard` pass through untouched.
//! - `NackRequeue` carries an exponential backoff with jitter, slept by the
//!   consumer before its next pull.
//! - Once a message has been delivered `max_attempts` times, a further
//!   `NackRequeue` becomes a terminal `NackDiscard`.
//!
//! The attempt count comes from the broker's own redelivery counter
//! ([`Delivery::delivery_count`](peril_transport::Delivery)), so the policy
//! holds no per-message state and survives consumer restarts.
//!
//! # Integration
//!
//! ```ignore
//! let decision = handle(&msg).await;
//! let verdict = policy.apply(decision, delivery.delivery_count);
//! subscription.settle(&delivery, verdict.ack)?;
//! verdict.wait().await;
//! ```

use std::time::Duration;

use peril_transport::AckType;
use rand::Rng;
use tokio::time;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How requeued deliveries are delayed and when they are given up on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deliveries allowed before a requeue turns into a discard.
    /// 0 = unlimited.
    pub max_attempts: u32,
    /// Delay before the first requeue. Doubles on each further attempt.
    pub base_delay: Duration,
    /// Upper bound on the exponential part of the delay.
    pub max_delay: Duration,
    /// Random extra delay (0..jitter) so competing consumers do not retry
    /// in lockstep.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            jitter: Duration::from_millis(25),
        }
    }
}

impl RetryPolicy {
    /// Immediate, unlimited requeue: the raw broker behavior.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// A budget of `max_attempts` deliveries with default delays.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Fixes out-of-range values: `base_delay` is capped to `max_delay`.
    pub fn validated(mut self) -> Self {
        if self.base_delay > self.max_delay {
            warn!(
                base_ms = self.base_delay.as_millis() as u64,
                max_ms = self.max_delay.as_millis() as u64,
                "retry base_delay exceeds max_delay, clamping"
            );
            self.base_delay = self.max_delay;
        }
        self
    }

    /// Returns `true` when there is no attempt limit.
    pub fn is_unlimited(&self) -> bool {
        self.max_attempts == 0
    }

    /// Exponential part of the delay after the `attempt`-th delivery
    /// (1-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    fn jitter(&self) -> Duration {
        let max_us = self.jitter.as_micros() as u64;
        if max_us == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(rand::rng().random_range(0..max_us))
    }

    /// Applies the budget to a handler's decision for a delivery that has
    /// been handed out `delivery_count` times.
    pub fn apply(&self, decision: AckType, delivery_count: u32) -> RetryVerdict {
        match decision {
            AckType::Ack | AckType::NackDiscard => RetryVerdict::immediate(decision),
            AckType::NackRequeue => {
                if !self.is_unlimited() && delivery_count >= self.max_attempts {
                    warn!(
                        attempts = delivery_count,
                        max = self.max_attempts,
                        "retry budget exhausted, discarding"
                    );
                    return RetryVerdict {
                        ack: AckType::NackDiscard,
                        delay: Duration::ZERO,
                        exhausted: true,
                    };
                }
                let delay = self.backoff(delivery_count) + self.jitter();
                debug!(
                    attempt = delivery_count,
                    delay_ms = delay.as_secs_f64() * 1000.0,
                    "requeue scheduled"
                );
                RetryVerdict {
                    ack: AckType::NackRequeue,
                    delay,
                    exhausted: false,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// The final acknowledgment for a delivery, and how long the consumer pauses
/// after settling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryVerdict {
    pub ack: AckType,
    /// Pause before the next pull. Zero unless `ack` is a requeue.
    pub delay: Duration,
    /// `true` if a requeue was turned into a discard by the budget.
    pub exhausted: bool,
}

impl RetryVerdict {
    fn immediate(ack: AckType) -> Self {
        Self {
            ack,
            delay: Duration::ZERO,
            exhausted: false,
        }
    }

    /// Sleeps for [`delay`](Self::delay). Called after the requeue is settled,
    /// so the message is already visible to other consumers while this one
    /// backs off.
    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            jitter: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_ack_and_discard_pass_through() {
        let policy = no_jitter();
        for count in [1, 5, 100] {
            assert_eq!(policy.apply(AckType::Ack, count).ack, AckType::Ack);
            assert_eq!(
                policy.apply(AckType::NackDiscard, count).ack,
                AckType::NackDiscard
            );
            assert_eq!(policy.apply(AckType::Ack, count).delay, Duration::ZERO);
        }
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = no_jitter();
        assert_eq!(policy.backoff(1), Duration::from_millis(50));
        assert_eq!(policy.backoff(2), Duration::from_millis(100));
        assert_eq!(policy.backoff(3), Duration::from_millis(200));
        assert_eq!(policy.backoff(10), Duration::from_secs(2));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(2));
    }

    #[test]
    fn test_requeue_within_budget_is_delayed() {
        let policy = no_jitter();
        let verdict = policy.apply(AckType::NackRequeue, 2);
        assert_eq!(verdict.ack, AckType::NackRequeue);
        assert_eq!(verdict.delay, Duration::from_millis(100));
        assert!(!verdict.exhausted);
    }

    #[test]
    fn test_requeue_at_budget_becomes_discard() {
        let policy = RetryPolicy::with_max_attempts(3);
        assert_eq!(policy.apply(AckType::NackRequeue, 2).ack, AckType::NackRequeue);
        let verdict = policy.apply(AckType::NackRequeue, 3);
        assert_eq!(verdict.ack, AckType::NackDiscard);
        assert!(verdict.exhausted);
        assert_eq!(verdict.delay, Duration::ZERO);
    }

    #[test]
    fn test_unbounded_never_discards_or_waits() {
        let policy = RetryPolicy::unbounded();
        let verdict = policy.apply(AckType::NackRequeue, 1_000_000);
        assert_eq!(verdict.ack, AckType::NackRequeue);
        assert_eq!(verdict.delay, Duration::ZERO);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            jitter: Duration::from_millis(5),
            max_attempts: 0,
        };
        for _ in 0..100 {
            let delay = policy.apply(AckType::NackRequeue, 1).delay;
            assert!(delay >= Duration::from_millis(10));
            assert!(delay < Duration::from_millis(15));
        }
    }

    #[test]
    fn test_validated_clamps_base_delay() {
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(1),
            ..RetryPolicy::default()
        }
        .validated();
        assert_eq!(policy.base_delay, Duration::from_secs(1));
    }
}
