//! A player process: shared state, three consumers and the local commands.

use std::sync::Arc;

use peril_game::{Command, GameState, Status};
use peril_protocol::routing::{
    any_player_key, army_moves_queue, pause_queue, player_key, ARMY_MOVES_PREFIX,
    EXCHANGE_DIRECT, EXCHANGE_TOPIC, PAUSE_KEY, WAR_RECOGNITIONS_PREFIX,
};
use peril_protocol::{ArmyMove, JsonCodec, Location, PlayingState, RecognitionOfWar, Unit, UnitKind};
use peril_transport::{Broker, ExchangeKind, QueueDurability};
use rand::seq::IndexedRandom;
use tokio::sync::{watch, Mutex};

use crate::consumer::{subscribe, ConsumerTask, QueueSpec};
use crate::handler::{publish_with, PlayerContext, SharedState};
use crate::{PerilConfig, PerilError};

/// Lines `spam` picks from.
const TAUNTS: &[&str] = &[
    "Your borders are made of paper.",
    "I have seen stronger armies in a chess set.",
    "Retreat now and keep your capital.",
    "My artillery sends its regards.",
    "History will not remember your name.",
    "Every road leads to my victory.",
];

pub const CLIENT_HELP: &str = "\
commands:
  spawn <location> <kind>            kinds: infantry, archer, cavalry, artillery
  move <location> <unitID> [unitID...]
  status
  spam <n>                           publish n game-log entries
  help
  quit";

/// Declares the two exchanges every process publishes to.
pub(crate) async fn declare_exchanges<B: Broker>(broker: &B) -> Result<(), PerilError> {
    broker
        .declare_exchange(EXCHANGE_DIRECT, ExchangeKind::Direct)
        .await?;
    broker
        .declare_exchange(EXCHANGE_TOPIC, ExchangeKind::Topic)
        .await?;
    Ok(())
}

/// One connected player.
///
/// Owns the player's [`GameState`] behind a single mutex shared with the
/// pause, move and war consumers. Dropping the client without calling
/// [`shutdown`](Self::shutdown) also stops the consumers, but does not wait
/// for them.
pub struct PerilClient<B: Broker> {
    ctx: PlayerContext<B>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<ConsumerTask>,
}

impl<B: Broker> PerilClient<B> {
    /// Joins the game as `username` and starts the three consumers.
    ///
    /// # Errors
    /// Returns a transport error if the topology cannot be declared, e.g. a
    /// second client with the same username already holds its exclusive
    /// queues.
    pub async fn connect(
        broker: B,
        username: impl Into<String>,
        config: PerilConfig,
    ) -> Result<Self, PerilError> {
        let state: SharedState = Arc::new(Mutex::new(GameState::new(username)));
        let ctx = PlayerContext::new(state, broker.clone()).await;
        let username = ctx.username().to_string();

        declare_exchanges(&broker).await?;
        let (shutdown, signal) = watch::channel(false);
        let mut tasks = Vec::with_capacity(3);

        let pause_ctx = ctx.clone();
        tasks.push(
            subscribe(
                &broker,
                QueueSpec::new(
                    EXCHANGE_DIRECT,
                    pause_queue(&username),
                    PAUSE_KEY,
                    QueueDurability::Transient,
                ),
                JsonCodec,
                config.retry.clone(),
                signal.clone(),
                move |signal: PlayingState| {
                    let ctx = pause_ctx.clone();
                    async move { ctx.handle_pause(signal).await }
                },
            )
            .await?,
        );

        let move_ctx = ctx.clone();
        tasks.push(
            subscribe(
                &broker,
                QueueSpec::new(
                    EXCHANGE_TOPIC,
                    army_moves_queue(&username),
                    any_player_key(ARMY_MOVES_PREFIX),
                    QueueDurability::Transient,
                ),
                JsonCodec,
                config.retry.clone(),
                signal.clone(),
                move |mv: ArmyMove| {
                    let ctx = move_ctx.clone();
                    async move { ctx.handle_move(mv).await }
                },
            )
            .await?,
        );

        let war_queue = config.war_queue.queue_name(&username);
        let war_ctx = ctx.clone();
        tasks.push(
            subscribe(
                &broker,
                QueueSpec::new(
                    EXCHANGE_TOPIC,
                    war_queue.clone(),
                    any_player_key(WAR_RECOGNITIONS_PREFIX),
                    QueueDurability::Durable,
                ),
                JsonCodec,
                config.retry.clone(),
                signal,
                move |row: RecognitionOfWar| {
                    let ctx = war_ctx.clone();
                    async move { ctx.handle_war(row).await }
                },
            )
            .await?,
        );

        tracing::info!(username = %username, %war_queue, "player connected");
        Ok(Self {
            ctx,
            shutdown,
            tasks,
        })
    }

    pub fn username(&self) -> &str {
        self.ctx.username()
    }

    /// The state shared with the consumers.
    pub fn state(&self) -> &SharedState {
        self.ctx.state()
    }

    /// Spawns a unit. Local only; nothing is published.
    pub async fn spawn(&self, location: Location, kind: UnitKind) -> Result<Unit, PerilError> {
        let unit = self.ctx.state().lock().await.spawn(location, kind)?;
        Ok(unit)
    }

    /// Moves local units and broadcasts the move to every player.
    ///
    /// The local state is updated before publishing. A failed publish is
    /// reported but not rolled back.
    pub async fn move_units(
        &self,
        destination: Location,
        unit_ids: &[u32],
    ) -> Result<ArmyMove, PerilError> {
        let mv = self
            .ctx
            .state()
            .lock()
            .await
            .move_units(destination, unit_ids)?;
        publish_with(
            self.ctx.publisher(),
            &JsonCodec,
            EXCHANGE_TOPIC,
            &player_key(ARMY_MOVES_PREFIX, self.username()),
            &mv,
        )
        .await?;
        tracing::info!(
            username = %self.username(),
            destination = %mv.destination,
            units = mv.units.len(),
            "army move published"
        );
        Ok(mv)
    }

    pub async fn status(&self) -> Status {
        self.ctx.state().lock().await.status()
    }

    /// Publishes `count` game-log entries with random taunts.
    pub async fn spam(&self, count: usize) -> Result<(), PerilError> {
        for _ in 0..count {
            let taunt = TAUNTS
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or_default();
            self.ctx.publish_log(taunt.to_string()).await?;
        }
        tracing::info!(username = %self.username(), count, "spam published");
        Ok(())
    }

    /// Runs one parsed command and returns the text to show the player.
    ///
    /// `Quit` is not handled here; the caller owns the process lifetime.
    pub async fn execute(&self, command: Command) -> Result<String, PerilError> {
        match command {
            Command::Spawn { location, kind } => {
                let unit = self.spawn(location, kind).await?;
                Ok(format!("spawned {unit}"))
            }
            Command::Move {
                destination,
                unit_ids,
            } => {
                let mv = self.move_units(destination, &unit_ids).await?;
                Ok(format!(
                    "moved {} unit(s) to {}",
                    mv.units.len(),
                    mv.destination
                ))
            }
            Command::Status => Ok(self.status().await.to_string()),
            Command::Spam { count } => {
                self.spam(count).await?;
                Ok(format!("published {count} log entries"))
            }
            Command::Help | Command::Quit => Ok(CLIENT_HELP.to_string()),
        }
    }

    /// Stops the consumers and waits for them to finish their in-flight
    /// delivery. Returns the first consumer error, if any.
    pub async fn shutdown(self) -> Result<(), PerilError> {
        self.shutdown.send_replace(true);
        let mut first = None;
        for task in self.tasks {
            if let Err(e) = task.await.map_err(PerilError::from).and_then(|r| r) {
                tracing::warn!(username = %self.ctx.username(), error = %e, "consumer ended with error");
                first.get_or_insert(e);
            }
        }
        tracing::info!(username = %self.ctx.username(), "player disconnected");
        first.map_or(Ok(()), Err)
    }
}
