//! Error types for the game layer.

use peril_protocol::ProtocolError;

/// Errors raised by local command handlers.
///
/// Incoming broker messages never produce a `GameError`: their outcomes are
/// closed enums ([`MoveOutcome`](crate::MoveOutcome),
/// [`WarOutcome`](crate::WarOutcome)) mapped to acknowledgments instead.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The server paused the game; state-changing commands are refused.
    #[error("the game is paused, you cannot {0}")]
    Paused(&'static str),

    /// A command was missing arguments.
    #[error("not enough arguments, usage: {0}")]
    Usage(&'static str),

    /// A unit id argument was not a number.
    #[error("invalid unit id {0:?}")]
    InvalidUnitId(String),

    /// A unit id argument named no unit of the local player.
    #[error("unit {0} not found")]
    UnitNotFound(u32),

    /// A numeric argument was not a number.
    #[error("invalid count {0:?}")]
    InvalidCount(String),

    /// The first word of the input is not a known command.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// A location or unit kind argument was malformed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
