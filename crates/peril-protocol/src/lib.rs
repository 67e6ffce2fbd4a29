//! Wire protocol for Peril.
//!
//! This crate defines the "language" every player process and the server
//! speak over the broker:
//!
//! - **Types** ([`ArmyMove`], [`RecognitionOfWar`], [`PlayingState`],
//!   [`GameLog`], and the [`Player`]/[`Unit`] snapshots they carry).
//! - **Routing** ([`routing`]): exchange names, routing keys, queue names.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`], [`BincodeCodec`]): how those
//!   messages become bytes and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (typed message) → Game (outcome)
//! ```

mod codec;
mod error;
pub mod routing;
mod types;

pub use codec::{Codec, CONTENT_TYPE_BINCODE, CONTENT_TYPE_JSON};
#[cfg(feature = "binary")]
pub use codec::BincodeCodec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ArmyMove, GameLog, Location, Player, PlayingState, RecognitionOfWar, Unit,
    UnitKind,
};
