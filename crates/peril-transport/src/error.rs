/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Publishing or binding against an exchange that was never declared.
    #[error("exchange {0} not found")]
    ExchangeNotFound(String),

    /// The exchange already exists with a different kind.
    #[error("exchange {0} already declared with a different kind")]
    ExchangeKindMismatch(String),

    /// Consuming from a queue that does not exist (or was auto-deleted).
    #[error("queue {0} not found")]
    QueueNotFound(String),

    /// The queue already exists with a different durability.
    #[error("queue {0} already declared with a different durability")]
    QueueMismatch(String),

    /// The queue is exclusive and already has a consumer.
    #[error("queue {0} is exclusive and already has a consumer")]
    QueueLocked(String),

    /// Settling a delivery this subscription never handed out.
    #[error("unknown delivery tag {0}")]
    UnknownDeliveryTag(u64),

    /// Publishing failed for a broker-specific reason.
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// The broker was shut down.
    #[error("broker closed")]
    Closed,
}
