//! Broker abstraction layer for Peril.
//!
//! Provides the [`Publisher`], [`Broker`] and [`Subscription`] traits that
//! abstract over an at-least-once message broker with direct and topic
//! exchanges, durable and transient queues, and explicit acknowledgment.
//!
//! # Feature Flags
//!
//! - `memory` (default) — in-process broker ([`InMemoryBroker`])

mod error;
#[cfg(feature = "memory")]
mod memory;
mod routing;

pub use error::TransportError;
#[cfg(feature = "memory")]
pub use memory::{InMemoryBroker, MemorySubscription};
pub use routing::{direct_matches, topic_matches};

use std::fmt;
use std::future::Future;

/// How an exchange matches routing keys against its bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    /// Exact match on the binding key.
    Direct,
    /// Dot-separated words; `*` matches one word, `#` matches zero or more.
    Topic,
}

impl ExchangeKind {
    /// Returns `true` if a message published with `routing_key` should be
    /// delivered through a binding with `binding_key`.
    pub fn matches(self, binding_key: &str, routing_key: &str) -> bool {
        match self {
            Self::Direct => direct_matches(binding_key, routing_key),
            Self::Topic => topic_matches(binding_key, routing_key),
        }
    }
}

/// Lifetime of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueDurability {
    /// Outlives its consumers; may be shared by competing consumers.
    Durable,
    /// Exclusive to one consumer and deleted when that consumer goes away.
    Transient,
}

impl fmt::Display for QueueDurability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Durable => write!(f, "durable"),
            Self::Transient => write!(f, "transient"),
        }
    }
}

/// The consumer's verdict on a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckType {
    /// Processed; remove from the queue.
    Ack,
    /// Not processed; put back on the queue for redelivery.
    NackRequeue,
    /// Not processable, ever; drop it.
    NackDiscard,
}

impl fmt::Display for AckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack => write!(f, "ack"),
            Self::NackRequeue => write!(f, "nack-requeue"),
            Self::NackDiscard => write!(f, "nack-discard"),
        }
    }
}

/// A queue that was declared and bound. Pass it to [`Broker::consume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    /// Queue name.
    pub name: String,
    /// Declared durability.
    pub durability: QueueDurability,
}

/// A single message handed to a consumer.
///
/// Must be settled through the [`Subscription`] that produced it. Deliveries
/// that are still unsettled when the subscription is dropped are requeued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Subscription-scoped identifier used to settle this delivery.
    pub delivery_tag: u64,
    /// Routing key the message was published with.
    pub routing_key: String,
    /// Content type set by the publisher.
    pub content_type: String,
    /// Raw payload.
    pub body: Vec<u8>,
    /// `true` if this message was delivered at least once before.
    pub redelivered: bool,
    /// Number of times this message has been handed out, starting at 1.
    pub delivery_count: u32,
}

/// Publishes raw payloads to an exchange.
///
/// This is the only capability message handlers need, so it is split from
/// [`Broker`] to keep handler tests free of queue plumbing.
pub trait Publisher: Send + Sync + 'static {
    /// Publishes `payload` to `exchange` with `routing_key`.
    ///
    /// A message that matches no binding is dropped, not an error.
    fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        content_type: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Full broker: exchange and queue topology plus consumption.
pub trait Broker: Publisher + Clone {
    /// The subscription type produced by [`consume`](Self::consume).
    type Subscription: Subscription;

    /// Declares an exchange. Re-declaring with the same kind is a no-op.
    fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Declares `queue` (if missing) and binds it to `exchange` with `key`.
    fn declare_and_bind(
        &self,
        exchange: &str,
        queue: &str,
        key: &str,
        durability: QueueDurability,
    ) -> impl Future<Output = Result<QueueHandle, TransportError>> + Send;

    /// Starts consuming from a declared queue.
    fn consume(
        &self,
        queue: &QueueHandle,
    ) -> impl Future<Output = Result<Self::Subscription, TransportError>> + Send;
}

/// A stream of deliveries from one queue.
pub trait Subscription: Send + 'static {
    /// Waits for the next delivery.
    ///
    /// Returns `None` when the queue is deleted or the broker is closed.
    fn next(&mut self) -> impl Future<Output = Option<Delivery>> + Send;

    /// Acknowledges, requeues or discards a delivery.
    fn settle(
        &mut self,
        delivery: &Delivery,
        ack: AckType,
    ) -> Result<(), TransportError>;
}
