//! Acknowledgment policy: from resolved outcome to broker decision.
//!
//! Each incoming message flows:
//!   1. Resolve against the shared `GameState` (one critical section)
//!   2. Map the outcome to a base decision ([`move_ack`], [`war_ack`])
//!   3. Perform the outcome's follow-up publish, if any, outside the lock
//!   4. Downgrade `Ack` to `NackRequeue` if that publish failed, so the whole
//!      unit of work is redone on redelivery
//!
//! Domain problems never escape as errors: the decision IS the error
//! handling.

use std::sync::Arc;

use peril_game::{
    resolve_move, resolve_war, GameState, MoveOutcome, WarOutcome,
};
use peril_protocol::routing::{
    player_key, EXCHANGE_TOPIC, GAME_LOG_SLUG, WAR_RECOGNITIONS_PREFIX,
};
use peril_protocol::{
    ArmyMove, BincodeCodec, Codec, GameLog, JsonCodec, PlayingState,
    RecognitionOfWar,
};
use peril_transport::{AckType, Publisher};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::PerilError;

/// The game state shared by every consumer task and the command loop.
pub type SharedState = Arc<Mutex<GameState>>;

/// Base decision for an army move, before side effects.
pub fn move_ack(outcome: MoveOutcome) -> AckType {
    match outcome {
        MoveOutcome::Safe | MoveOutcome::MakeWar => AckType::Ack,
        MoveOutcome::SamePlayer => AckType::NackDiscard,
    }
}

/// Base decision for a war recognition, before side effects.
pub fn war_ack(outcome: WarOutcome) -> AckType {
    match outcome {
        // A party may still pick it up; bounded by the retry budget.
        WarOutcome::NotInvolved => AckType::NackRequeue,
        WarOutcome::NoUnits => AckType::Ack,
        WarOutcome::OpponentWon | WarOutcome::YouWon | WarOutcome::Draw => AckType::Ack,
    }
}

/// Pause signals are idempotent overwrites and always accepted.
pub fn pause_ack() -> AckType {
    AckType::Ack
}

/// Turns a failed follow-up into a retry of the whole delivery.
fn downgrade(ack: AckType, effect: Result<(), PerilError>, what: &str) -> AckType {
    match (ack, effect) {
        (_, Ok(())) => ack,
        (AckType::Ack, Err(e)) => {
            tracing::warn!(error = %e, what, "follow-up publish failed, requeueing");
            AckType::NackRequeue
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, what, %ack, "follow-up publish failed");
            ack
        }
    }
}

/// Encodes `value` with `codec` and publishes it.
pub(crate) async fn publish_with<P, C, T>(
    publisher: &P,
    codec: &C,
    exchange: &str,
    routing_key: &str,
    value: &T,
) -> Result<(), PerilError>
where
    P: Publisher,
    C: Codec,
    T: Serialize,
{
    let payload = codec.encode(value)?;
    publisher
        .publish(exchange, routing_key, &payload, codec.content_type())
        .await?;
    Ok(())
}

/// Everything a player's message handlers need. Cheap to clone.
#[derive(Debug)]
pub struct PlayerContext<P> {
    state: SharedState,
    publisher: P,
    username: String,
}

impl<P: Clone> Clone for PlayerContext<P> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            publisher: self.publisher.clone(),
            username: self.username.clone(),
        }
    }
}

impl<P: Publisher> PlayerContext<P> {
    /// Creates a context for the player owning `state`.
    pub async fn new(state: SharedState, publisher: P) -> Self {
        let username = state.lock().await.username().to_string();
        Self {
            state,
            publisher,
            username,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Applies a pause/resume signal.
    pub async fn handle_pause(&self, signal: PlayingState) -> AckType {
        self.state.lock().await.apply_pause(signal);
        tracing::debug!(username = %self.username, paused = signal.is_paused, "pause handled");
        pause_ack()
    }

    /// Resolves an incoming army move and announces the resulting war.
    ///
    /// The recognition names the mover as attacker, as recorded after the
    /// move, and the local player's current snapshot as defender.
    pub async fn handle_move(&self, mv: ArmyMove) -> AckType {
        if let Err(e) = mv.validate() {
            tracing::warn!(username = %self.username, error = %e, "invalid army move discarded");
            return AckType::NackDiscard;
        }

        let (outcome, attacker, defender) = {
            let mut state = self.state.lock().await;
            let outcome = resolve_move(&mut state, &mv);
            let attacker = state
                .player(&mv.player.username)
                .cloned()
                .unwrap_or_else(|| mv.player.clone());
            (outcome, attacker, state.player_snapshot())
        };
        let ack = move_ack(outcome);

        let effect = match outcome {
            MoveOutcome::SamePlayer => {
                tracing::debug!(username = %self.username, "own move echo discarded");
                Ok(())
            }
            MoveOutcome::Safe | MoveOutcome::MakeWar => {
                let row = RecognitionOfWar { attacker, defender };
                publish_with(
                    &self.publisher,
                    &JsonCodec,
                    EXCHANGE_TOPIC,
                    &player_key(WAR_RECOGNITIONS_PREFIX, &self.username),
                    &row,
                )
                .await
            }
        };
        downgrade(ack, effect, "war recognition")
    }

    /// Resolves a war recognition and records a fought war in the game log.
    pub async fn handle_war(&self, row: RecognitionOfWar) -> AckType {
        let resolution = {
            let mut state = self.state.lock().await;
            resolve_war(&mut state, &row)
        };
        let ack = war_ack(resolution.outcome);

        let effect = match resolution.outcome {
            WarOutcome::NotInvolved => {
                tracing::debug!(
                    username = %self.username,
                    attacker = %row.attacker.username,
                    defender = %row.defender.username,
                    "not a party to this war"
                );
                Ok(())
            }
            WarOutcome::NoUnits => Ok(()),
            WarOutcome::OpponentWon | WarOutcome::YouWon | WarOutcome::Draw => {
                match resolution.log_message() {
                    Some(message) => self.publish_log(message).await,
                    None => {
                        tracing::error!(username = %self.username, "fought war has no battle record");
                        return AckType::NackDiscard;
                    }
                }
            }
        };
        downgrade(ack, effect, "game log")
    }

    /// Publishes a game-log entry under this player's key.
    pub async fn publish_log(&self, message: String) -> Result<(), PerilError> {
        let entry = GameLog::new(self.username.clone(), message);
        publish_with(
            &self.publisher,
            &BincodeCodec,
            EXCHANGE_TOPIC,
            &player_key(GAME_LOG_SLUG, &self.username),
            &entry,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_ack_table() {
        assert_eq!(move_ack(MoveOutcome::Safe), AckType::Ack);
        assert_eq!(move_ack(MoveOutcome::MakeWar), AckType::Ack);
        assert_eq!(move_ack(MoveOutcome::SamePlayer), AckType::NackDiscard);
    }

    #[test]
    fn test_war_ack_table() {
        assert_eq!(war_ack(WarOutcome::NotInvolved), AckType::NackRequeue);
        assert_eq!(war_ack(WarOutcome::NoUnits), AckType::Ack);
        assert_eq!(war_ack(WarOutcome::OpponentWon), AckType::Ack);
        assert_eq!(war_ack(WarOutcome::YouWon), AckType::Ack);
        assert_eq!(war_ack(WarOutcome::Draw), AckType::Ack);
    }

    #[test]
    fn test_pause_ack_is_accept() {
        assert_eq!(pause_ack(), AckType::Ack);
    }

    #[test]
    fn test_downgrade_only_touches_failed_accepts() {
        let fail = || Err(PerilError::Sink(std::io::Error::other("x")));
        assert_eq!(downgrade(AckType::Ack, Ok(()), "t"), AckType::Ack);
        assert_eq!(downgrade(AckType::Ack, fail(), "t"), AckType::NackRequeue);
        assert_eq!(downgrade(AckType::NackDiscard, fail(), "t"), AckType::NackDiscard);
        assert_eq!(downgrade(AckType::NackRequeue, fail(), "t"), AckType::NackRequeue);
    }
}
