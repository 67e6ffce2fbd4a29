//! Consumer runtime: one cancellable task per subscription.
//!
//! Each task loops:
//!   1. Wait for the next delivery (or shutdown)
//!   2. Decode it; a payload that fails to decode is discarded
//!   3. Run the handler to get an acknowledgment decision
//!   4. Apply the retry budget and settle
//!   5. After a requeue, back off before pulling again (or shutdown)
//!
//! Shutdown is never observed between steps 1 and 4, so a delivery that has
//! been picked up is always settled before the task exits. Requeued
//! deliveries go back to the queue before the backoff, where another
//! consumer of a shared queue can take them at once.

use std::future::Future;

use peril_protocol::Codec;
use peril_retry::RetryPolicy;
use peril_transport::{AckType, Broker, QueueDurability, Subscription};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::PerilError;

/// Where a consumer reads from: the queue, and how it is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSpec {
    pub exchange: String,
    pub queue: String,
    pub binding_key: String,
    pub durability: QueueDurability,
}

impl QueueSpec {
    pub fn new(
        exchange: impl Into<String>,
        queue: impl Into<String>,
        binding_key: impl Into<String>,
        durability: QueueDurability,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            queue: queue.into(),
            binding_key: binding_key.into(),
            durability,
        }
    }
}

/// A running consumer task. Resolves to `Err` only on a transport failure.
pub type ConsumerTask = JoinHandle<Result<(), PerilError>>;

/// Declares and binds the queue described by `spec`, then spawns a task that
/// feeds every delivery through `handler` until `shutdown` turns `true` (or
/// its sender is dropped) or the queue goes away.
///
/// # Errors
/// Returns a transport error if the queue cannot be declared or consumed.
pub async fn subscribe<B, C, T, H, Fut>(
    broker: &B,
    spec: QueueSpec,
    codec: C,
    retry: RetryPolicy,
    shutdown: watch::Receiver<bool>,
    handler: H,
) -> Result<ConsumerTask, PerilError>
where
    B: Broker,
    C: Codec,
    T: DeserializeOwned + Send + 'static,
    H: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AckType> + Send + 'static,
{
    let handle = broker
        .declare_and_bind(&spec.exchange, &spec.queue, &spec.binding_key, spec.durability)
        .await?;
    let subscription = broker.consume(&handle).await?;
    tracing::info!(queue = %spec.queue, key = %spec.binding_key, "consumer started");

    let span = tracing::info_span!("consumer", queue = %spec.queue);
    let task = tokio::spawn(
        run(subscription, codec, retry, shutdown, handler).instrument(span),
    );
    Ok(task)
}

async fn run<S, C, T, H, Fut>(
    mut subscription: S,
    codec: C,
    retry: RetryPolicy,
    mut shutdown: watch::Receiver<bool>,
    handler: H,
) -> Result<(), PerilError>
where
    S: Subscription,
    C: Codec,
    T: DeserializeOwned + Send + 'static,
    H: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AckType> + Send + 'static,
{
    loop {
        // `next()` only takes a message off the queue after its last await,
        // so losing the race to shutdown never drops a delivery.
        let delivery = tokio::select! {
            biased;
            () = shutdown_requested(&mut shutdown) => {
                tracing::debug!("shutdown requested");
                break;
            }
            next = subscription.next() => match next {
                Some(delivery) => delivery,
                None => {
                    tracing::info!("queue closed");
                    break;
                }
            },
        };

        let decision = match codec.decode::<T>(&delivery.body) {
            Ok(msg) => handler(msg).await,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    routing_key = %delivery.routing_key,
                    "undecodable payload discarded"
                );
                AckType::NackDiscard
            }
        };

        let verdict = retry.apply(decision, delivery.delivery_count);
        match verdict.ack {
            AckType::Ack => tracing::debug!(
                routing_key = %delivery.routing_key,
                "delivery acked"
            ),
            AckType::NackRequeue => tracing::debug!(
                routing_key = %delivery.routing_key,
                attempt = delivery.delivery_count,
                "delivery requeued"
            ),
            AckType::NackDiscard => tracing::warn!(
                routing_key = %delivery.routing_key,
                exhausted = verdict.exhausted,
                "delivery discarded"
            ),
        }

        if let Err(e) = subscription.settle(&delivery, verdict.ack) {
            tracing::error!(error = %e, "settle failed, stopping consumer");
            return Err(e.into());
        }

        tokio::select! {
            biased;
            () = shutdown_requested(&mut shutdown) => {
                tracing::debug!("shutdown requested");
                break;
            }
            () = verdict.wait() => {}
        }
    }
    Ok(())
}

/// Resolves once shutdown is signalled or the signal's sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
