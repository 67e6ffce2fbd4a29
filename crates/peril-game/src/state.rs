//! Per-process game state and the local command handlers that mutate it.
//!
//! `GameState` is owned by one player process. It is not thread-safe by
//! itself; the runtime wraps it in a single mutex so every resolver call and
//! every local command is one critical section.

use std::collections::BTreeMap;
use std::fmt;

use peril_protocol::{ArmyMove, Location, Player, PlayingState, Unit, UnitKind};

use crate::GameError;

/// Everything one player process knows about the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    username: String,
    /// Last-known snapshot per username. Always contains the local player.
    players: BTreeMap<String, Player>,
    paused: bool,
    next_unit_id: u32,
}

impl GameState {
    /// Fresh state for `username` with no units, not paused.
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        let mut players = BTreeMap::new();
        players.insert(username.clone(), Player::new(username.clone()));
        Self {
            username,
            players,
            paused: false,
            next_unit_id: 0,
        }
    }

    /// The local player's username.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Last-known snapshot of a player, local or remote.
    pub fn player(&self, username: &str) -> Option<&Player> {
        self.players.get(username)
    }

    /// All known players, ordered by username.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// A value copy of the local player, suitable for embedding in a message.
    pub fn player_snapshot(&self) -> Player {
        self.players
            .get(&self.username)
            .cloned()
            .unwrap_or_else(|| Player::new(self.username.clone()))
    }

    /// Applies a pause/resume signal. Unconditional overwrite, so replaying
    /// the same signal is harmless.
    pub fn apply_pause(&mut self, signal: PlayingState) {
        if self.paused != signal.is_paused {
            tracing::info!(
                username = %self.username,
                paused = signal.is_paused,
                "game pause state changed"
            );
        }
        self.paused = signal.is_paused;
    }

    /// Replaces the last-known snapshot of a remote player.
    pub(crate) fn record_snapshot(&mut self, snapshot: Player) {
        self.players.insert(snapshot.username.clone(), snapshot);
    }

    fn local_mut(&mut self) -> &mut Player {
        let username = self.username.clone();
        self.players
            .entry(username.clone())
            .or_insert_with(|| Player::new(username))
    }

    /// Removes every local unit at `location`. Returns how many were lost.
    pub(crate) fn remove_local_units_at(&mut self, location: &Location) -> usize {
        let local = self.local_mut();
        let before = local.units.len();
        local.units.retain(|u| &u.location != location);
        before - local.units.len()
    }

    // -----------------------------------------------------------------------
    // Local commands
    // -----------------------------------------------------------------------

    /// Adds a new unit of `kind` at `location` to the local player.
    ///
    /// # Errors
    /// [`GameError::Paused`] while the game is paused.
    pub fn spawn(&mut self, location: Location, kind: UnitKind) -> Result<Unit, GameError> {
        if self.paused {
            return Err(GameError::Paused("spawn"));
        }
        let unit = Unit {
            id: self.next_unit_id,
            kind,
            location,
        };
        self.next_unit_id += 1;
        self.local_mut().units.push(unit.clone());
        tracing::debug!(username = %self.username, %unit, "unit spawned");
        Ok(unit)
    }

    /// Moves the named local units to `destination` and returns the message
    /// to broadcast.
    ///
    /// Validates every id before moving anything, so a failed command leaves
    /// the state untouched.
    ///
    /// # Errors
    /// [`GameError::Paused`] while paused, [`GameError::Usage`] with no ids,
    /// [`GameError::UnitNotFound`] for an id the local player does not own.
    pub fn move_units(
        &mut self,
        destination: Location,
        unit_ids: &[u32],
    ) -> Result<ArmyMove, GameError> {
        if self.paused {
            return Err(GameError::Paused("move"));
        }
        if unit_ids.is_empty() {
            return Err(GameError::Usage("move <location> <unitID> [unitID...]"));
        }
        let local = self.local_mut();
        if let Some(missing) = unit_ids
            .iter()
            .find(|id| !local.units.iter().any(|u| u.id == **id))
        {
            return Err(GameError::UnitNotFound(*missing));
        }

        let mut moved = Vec::with_capacity(unit_ids.len());
        for unit in local.units.iter_mut().filter(|u| unit_ids.contains(&u.id)) {
            unit.location = destination.clone();
            moved.push(unit.clone());
        }

        tracing::debug!(
            username = %self.username,
            %destination,
            count = moved.len(),
            "units moved"
        );
        Ok(ArmyMove {
            player: self.player_snapshot(),
            units: moved,
            destination,
        })
    }

    /// A printable summary of the local player.
    pub fn status(&self) -> Status {
        Status {
            username: self.username.clone(),
            paused: self.paused,
            units: self.player_snapshot().units,
        }
    }
}

/// Output of the `status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub username: String,
    pub paused: bool,
    pub units: Vec<Unit>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.paused {
            writeln!(f, "{} (game paused)", self.username)?;
        } else {
            writeln!(f, "{}", self.username)?;
        }
        if self.units.is_empty() {
            return write!(f, "  no units");
        }
        for (i, unit) in self.units.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {unit}")?;
        }
        Ok(())
    }
}
