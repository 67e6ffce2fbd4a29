//! Closed outcome types produced by the resolvers.
//!
//! Every consumer must match these exhaustively; adding a variant is a compile
//! error everywhere an acknowledgment decision is made.

use peril_protocol::Location;

/// What an incoming army move means for the local player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveOutcome {
    /// No other player occupies the destination.
    Safe,
    /// The destination now hosts units of two or more players.
    MakeWar,
    /// The move is the local player's own broadcast echoed back.
    SamePlayer,
}

/// What a war recognition means for the local player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarOutcome {
    /// The local player is neither attacker nor defender.
    NotInvolved,
    /// One side has no units able to fight.
    NoUnits,
    OpponentWon,
    YouWon,
    Draw,
}

/// The battle both participants computed from the same snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Battle {
    pub location: Location,
    pub attacker: String,
    pub defender: String,
    pub attacker_power: u32,
    pub defender_power: u32,
}

impl Battle {
    /// Username of the stronger side. `None` on equal power.
    pub fn winner(&self) -> Option<&str> {
        match self.attacker_power.cmp(&self.defender_power) {
            std::cmp::Ordering::Greater => Some(self.attacker.as_str()),
            std::cmp::Ordering::Less => Some(self.defender.as_str()),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Username of the weaker side. `None` on equal power.
    pub fn loser(&self) -> Option<&str> {
        match self.attacker_power.cmp(&self.defender_power) {
            std::cmp::Ordering::Greater => Some(self.defender.as_str()),
            std::cmp::Ordering::Less => Some(self.attacker.as_str()),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Result of evaluating one [`RecognitionOfWar`](peril_protocol::RecognitionOfWar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarResolution {
    pub outcome: WarOutcome,
    /// Present only when a battle was fought.
    pub battle: Option<Battle>,
}

impl WarResolution {
    pub(crate) fn without_battle(outcome: WarOutcome) -> Self {
        Self { outcome, battle: None }
    }

    /// Username of the winner. `None` for draws and unfought wars.
    pub fn winner(&self) -> Option<&str> {
        self.battle.as_ref()?.winner()
    }

    /// Username of the loser. `None` for draws and unfought wars.
    pub fn loser(&self) -> Option<&str> {
        self.battle.as_ref()?.loser()
    }

    /// The game-log line for a fought war, `None` otherwise.
    pub fn log_message(&self) -> Option<String> {
        let battle = self.battle.as_ref()?;
        match self.outcome {
            WarOutcome::NotInvolved | WarOutcome::NoUnits => None,
            WarOutcome::OpponentWon | WarOutcome::YouWon => Some(format!(
                "{} won a war against {}",
                self.winner()?,
                self.loser()?
            )),
            WarOutcome::Draw => Some(format!(
                "A war between {} and {} resulted in a draw",
                battle.attacker, battle.defender
            )),
        }
    }
}
