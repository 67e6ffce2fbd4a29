//! # Peril
//!
//! Message-driven multiplayer strategy game coordination over a pub/sub
//! broker with at-least-once delivery.
//!
//! Every player runs a [`PerilClient`]: one `GameState` behind a mutex and
//! three consumers (pause signals, army moves, war recognitions). A
//! [`PerilServer`] pauses and resumes the game and collects the game log.
//! Nobody holds the authoritative board: each process resolves incoming
//! messages against its own view and answers the broker with an
//! acknowledgment decision.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use peril::prelude::*;
//!
//! # async fn demo() -> Result<(), PerilError> {
//! let broker = InMemoryBroker::new();
//! let server = PerilServer::start(broker.clone(), MemoryLogSink::new(), PerilConfig::default()).await?;
//! let alice = PerilClient::connect(broker.clone(), "alice", PerilConfig::default()).await?;
//!
//! alice.spawn("europe".parse()?, UnitKind::Infantry).await?;
//! server.pause().await?;
//!
//! alice.shutdown().await?;
//! server.shutdown().await
//! # }
//! ```

mod client;
mod config;
pub mod consumer;
mod error;
pub mod handler;
mod server;
mod sink;

pub use client::{PerilClient, CLIENT_HELP};
pub use config::{PerilConfig, WarQueue};
pub use error::PerilError;
pub use server::{collect_log, PerilServer, SERVER_HELP};
pub use sink::{FileLogSink, LogSink, MemoryLogSink};

pub use peril_game as game;
pub use peril_protocol as protocol;
pub use peril_retry as retry;
pub use peril_transport as transport;

/// Installs a `tracing` subscriber filtered by `RUST_LOG`, defaulting to
/// `info`. Does nothing if a subscriber is already set.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub mod prelude {
    pub use crate::{
        FileLogSink, LogSink, MemoryLogSink, PerilClient, PerilConfig, PerilError,
        PerilServer, WarQueue,
    };
    pub use peril_game::{Command, GameError, GameState, MoveOutcome, ServerCommand, WarOutcome};
    pub use peril_protocol::{
        ArmyMove, GameLog, Location, Player, PlayingState, RecognitionOfWar, Unit, UnitKind,
    };
    pub use peril_retry::RetryPolicy;
    pub use peril_transport::{AckType, Broker, InMemoryBroker, Publisher};
}
