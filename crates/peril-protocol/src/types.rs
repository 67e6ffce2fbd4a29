//! Core protocol types for Peril's wire format.
//!
//! Every type here travels inside a broker message. They are value types:
//! a `Player` inside an `ArmyMove` is a copy of the sender's state at publish
//! time, never a live reference into another process.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A named place on the board, e.g. `rome` or `europe`.
///
/// Always non-empty, lowercase and free of whitespace, so two players typing
/// `Rome` and `rome` end up at the same place. Deserialization goes through
/// the same check (`try_from = "String"`), so a malformed location is a
/// decode error rather than a silently different place.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location(String);

impl Location {
    /// Creates a location, normalizing to lowercase.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] for empty names or names
    /// containing whitespace.
    pub fn new(name: &str) -> Result<Self, ProtocolError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProtocolError::InvalidMessage("empty location".into()));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ProtocolError::InvalidMessage(format!(
                "location {name:?} contains whitespace"
            )));
        }
        Ok(Self(name.to_lowercase()))
    }

    /// The normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Location {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.0
    }
}

impl FromStr for Location {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Units and players
// ---------------------------------------------------------------------------

/// The kind of a unit. Closed set; combat power is assigned per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Infantry,
    Archer,
    Cavalry,
    Artillery,
}

impl UnitKind {
    /// Every kind, in declaration order.
    pub const ALL: [UnitKind; 4] = [
        UnitKind::Infantry,
        UnitKind::Archer,
        UnitKind::Cavalry,
        UnitKind::Artillery,
    ];

    /// The lowercase name used on the wire and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Infantry => "infantry",
            Self::Archer => "archer",
            Self::Cavalry => "cavalry",
            Self::Artillery => "artillery",
        }
    }
}

impl FromStr for UnitKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| ProtocolError::InvalidMessage(format!("unknown unit kind {s:?}")))
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit on the board.
///
/// `id` is only meaningful inside the owning process: it is how the owner's
/// command line names its units. Remote players must not treat it as a
/// global identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: u32,
    pub kind: UnitKind,
    pub location: Location,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}@{}", self.id, self.kind, self.location)
    }
}

/// A player and their units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    pub units: Vec<Unit>,
}

impl Player {
    /// A player with no units.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            units: Vec::new(),
        }
    }

    /// Units currently at `location`, in list order.
    pub fn units_at<'a>(&'a self, location: &'a Location) -> impl Iterator<Item = &'a Unit> + 'a {
        self.units.iter().filter(move |u| &u.location == location)
    }

    /// Returns `true` if any unit stands at `location`.
    pub fn occupies(&self, location: &Location) -> bool {
        self.units_at(location).next().is_some()
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A player moved some of their units. Published on `army_moves.<username>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmyMove {
    /// The mover's state at send time, after the move was applied locally.
    pub player: Player,
    /// The moved units. Non-empty, each drawn from `player.units`.
    pub units: Vec<Unit>,
    pub destination: Location,
}

impl ArmyMove {
    /// Checks the structural rules a decoded move must satisfy.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if `units` is empty or names
    /// a unit id the snapshot does not contain.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.units.is_empty() {
            return Err(ProtocolError::InvalidMessage(format!(
                "army move from {} carries no units",
                self.player.username
            )));
        }
        if let Some(stray) = self
            .units
            .iter()
            .find(|u| !self.player.units.iter().any(|own| own.id == u.id))
        {
            return Err(ProtocolError::InvalidMessage(format!(
                "army move from {} names unit {} it does not own",
                self.player.username, stray.id
            )));
        }
        Ok(())
    }
}

/// A declared conflict between two players. Published on
/// `war_recognitions.<username>`; every war consumer evaluates it and decides
/// for itself whether it is a party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionOfWar {
    pub attacker: Player,
    pub defender: Player,
}

impl RecognitionOfWar {
    /// Returns `true` if `username` is the attacker or the defender.
    pub fn involves(&self, username: &str) -> bool {
        self.attacker.username == username || self.defender.username == username
    }
}

/// Pause/resume signal from the server. Published on the direct exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayingState {
    pub is_paused: bool,
}

/// Append-only audit record. Published on `game_logs.<username>` and
/// collected by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLog {
    pub current_time: DateTime<Utc>,
    pub message: String,
    pub username: String,
}

impl GameLog {
    /// A log entry stamped with the current time.
    pub fn new(username: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            current_time: Utc::now(),
            message: message.into(),
            username: username.into(),
        }
    }
}

impl fmt::Display for GameLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.current_time.to_rfc3339(),
            self.username,
            self.message
        )
    }
}
