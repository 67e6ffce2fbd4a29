//! The server process: pause control and the game-log collector.

use std::sync::Arc;

use peril_game::ServerCommand;
use peril_protocol::routing::{
    any_player_key, EXCHANGE_DIRECT, EXCHANGE_TOPIC, GAME_LOG_QUEUE, GAME_LOG_SLUG, PAUSE_KEY,
};
use peril_protocol::{BincodeCodec, GameLog, JsonCodec, PlayingState};
use peril_transport::{AckType, Broker, QueueDurability};
use tokio::sync::watch;

use crate::client::declare_exchanges;
use crate::consumer::{subscribe, ConsumerTask, QueueSpec};
use crate::handler::publish_with;
use crate::sink::LogSink;
use crate::{PerilConfig, PerilError};

pub const SERVER_HELP: &str = "\
commands:
  pause     pause the game for every player
  resume    resume the game
  help
  quit";

/// Stores one collected entry. A sink failure requeues the delivery.
pub async fn collect_log<S: LogSink>(sink: &S, entry: GameLog) -> AckType {
    match sink.append(&entry).await {
        Ok(()) => AckType::Ack,
        Err(e) => {
            tracing::warn!(username = %entry.username, error = %e, "log sink failed, requeueing");
            AckType::NackRequeue
        }
    }
}

/// The running server.
///
/// Players keep working while the server is down; their log entries wait
/// on the durable `game_logs` queue until a collector comes back.
pub struct PerilServer<B: Broker, S: LogSink> {
    broker: B,
    sink: Arc<S>,
    shutdown: watch::Sender<bool>,
    collector: ConsumerTask,
}

impl<B: Broker, S: LogSink> PerilServer<B, S> {
    /// Declares the topology and starts the log collector.
    ///
    /// # Errors
    /// Returns a transport error if the topology cannot be declared.
    pub async fn start(broker: B, sink: S, config: PerilConfig) -> Result<Self, PerilError> {
        declare_exchanges(&broker).await?;
        let sink = Arc::new(sink);
        let (shutdown, signal) = watch::channel(false);

        let collector_sink = Arc::clone(&sink);
        let collector = subscribe(
            &broker,
            QueueSpec::new(
                EXCHANGE_TOPIC,
                GAME_LOG_QUEUE,
                any_player_key(GAME_LOG_SLUG),
                QueueDurability::Durable,
            ),
            BincodeCodec,
            config.retry,
            signal,
            move |entry: GameLog| {
                let sink = Arc::clone(&collector_sink);
                async move { collect_log(sink.as_ref(), entry).await }
            },
        )
        .await?;

        tracing::info!("peril server started");
        Ok(Self {
            broker,
            sink,
            shutdown,
            collector,
        })
    }

    /// The sink entries are written to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Pauses the game for every connected player.
    pub async fn pause(&self) -> Result<(), PerilError> {
        self.publish_playing_state(true).await
    }

    /// Resumes the game for every connected player.
    pub async fn resume(&self) -> Result<(), PerilError> {
        self.publish_playing_state(false).await
    }

    async fn publish_playing_state(&self, is_paused: bool) -> Result<(), PerilError> {
        publish_with(
            &self.broker,
            &JsonCodec,
            EXCHANGE_DIRECT,
            PAUSE_KEY,
            &PlayingState { is_paused },
        )
        .await?;
        tracing::info!(paused = is_paused, "playing state published");
        Ok(())
    }

    /// Runs one parsed command and returns the text to show the operator.
    ///
    /// `Quit` is not handled here; the caller owns the process lifetime.
    pub async fn execute(&self, command: ServerCommand) -> Result<String, PerilError> {
        match command {
            ServerCommand::Pause => {
                self.pause().await?;
                Ok("game paused".to_string())
            }
            ServerCommand::Resume => {
                self.resume().await?;
                Ok("game resumed".to_string())
            }
            ServerCommand::Help | ServerCommand::Quit => Ok(SERVER_HELP.to_string()),
        }
    }

    /// Stops the collector after its in-flight delivery.
    pub async fn shutdown(self) -> Result<(), PerilError> {
        self.shutdown.send_replace(true);
        let result = self.collector.await?;
        tracing::info!("peril server stopped");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryLogSink;

    struct FailingSink;

    impl LogSink for FailingSink {
        async fn append(&self, _entry: &GameLog) -> Result<(), PerilError> {
            Err(PerilError::Sink(std::io::Error::other("disk full")))
        }
    }

    #[tokio::test]
    async fn test_collect_log_acks_on_success() {
        let sink = MemoryLogSink::new();
        let ack = collect_log(&sink, GameLog::new("alice", "hi")).await;
        assert_eq!(ack, AckType::Ack);
        assert_eq!(sink.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_collect_log_requeues_on_sink_failure() {
        let ack = collect_log(&FailingSink, GameLog::new("alice", "hi")).await;
        assert_eq!(ack, AckType::NackRequeue);
    }
}
