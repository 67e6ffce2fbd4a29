//! Exchange names, routing keys and queue names shared by every process.
//!
//! These strings are the contract between independently deployed players and
//! the server; changing one breaks interop with older builds.

/// Direct exchange carrying pause/resume signals.
pub const EXCHANGE_DIRECT: &str = "peril_direct";

/// Topic exchange carrying moves, war recognitions and game logs.
pub const EXCHANGE_TOPIC: &str = "peril_topic";

/// Routing key of pause signals on [`EXCHANGE_DIRECT`].
pub const PAUSE_KEY: &str = "pause";

/// Prefix of army-move routing keys (`army_moves.<username>`).
pub const ARMY_MOVES_PREFIX: &str = "army_moves";

/// Prefix of war-recognition routing keys (`war_recognitions.<username>`).
pub const WAR_RECOGNITIONS_PREFIX: &str = "war_recognitions";

/// Prefix of game-log routing keys (`game_logs.<username>`).
pub const GAME_LOG_SLUG: &str = "game_logs";

/// Name of the war queue when every player reads from one shared queue.
pub const WAR_QUEUE: &str = "war";

/// Durable queue the server's log collector reads from.
pub const GAME_LOG_QUEUE: &str = GAME_LOG_SLUG;

/// `<prefix>.<username>`: the key a player publishes under.
pub fn player_key(prefix: &str, username: &str) -> String {
    format!("{prefix}.{username}")
}

/// `<prefix>.*`: binds to every player's messages of one kind.
pub fn any_player_key(prefix: &str) -> String {
    format!("{prefix}.*")
}

/// Per-player exclusive queue for pause signals.
pub fn pause_queue(username: &str) -> String {
    player_key(PAUSE_KEY, username)
}

/// Per-player exclusive queue for incoming army moves.
pub fn army_moves_queue(username: &str) -> String {
    player_key(ARMY_MOVES_PREFIX, username)
}

/// Per-player durable queue for war recognitions (`war.<username>`).
pub fn war_queue(username: &str) -> String {
    player_key(WAR_QUEUE, username)
}
