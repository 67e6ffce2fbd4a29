//! Unified error type for the Peril runtime.

use peril_game::GameError;
use peril_protocol::ProtocolError;
use peril_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls, so
/// the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PerilError {
    /// A broker-level error (declare, publish, consume, settle).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A local command was rejected.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Writing a game log entry failed.
    #[error("log sink failed: {0}")]
    Sink(#[source] std::io::Error),

    /// A consumer task panicked or was aborted.
    #[error("consumer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: PerilError = TransportError::Closed.into();
        assert!(matches!(err, PerilError::Transport(_)));
        assert_eq!(err.to_string(), "broker closed");
    }

    #[test]
    fn test_from_protocol_error() {
        let err: PerilError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, PerilError::Protocol(_)));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_from_game_error() {
        let err: PerilError = GameError::UnitNotFound(3).into();
        assert!(matches!(err, PerilError::Game(_)));
        assert_eq!(err.to_string(), "unit 3 not found");
    }

    #[test]
    fn test_sink_error_display() {
        let err = PerilError::Sink(std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "log sink failed: disk full");
    }
}
