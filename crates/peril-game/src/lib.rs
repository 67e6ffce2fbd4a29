//! Game rules for Peril.
//!
//! Everything here is pure with respect to I/O: resolvers mutate a
//! [`GameState`] and return a closed outcome; deciding what to publish and how
//! to acknowledge the message is the runtime's job.
//!
//! # Key types
//!
//! - [`GameState`] — one player's view of the game
//! - [`resolve_move`] → [`MoveOutcome`]
//! - [`resolve_war`] → [`WarResolution`] / [`WarOutcome`]
//! - [`Command`] / [`ServerCommand`] — parsed input lines

mod command;
mod error;
mod moves;
mod outcome;
mod state;
mod war;

pub use command::{Command, ServerCommand};
pub use error::GameError;
pub use moves::resolve_move;
pub use outcome::{Battle, MoveOutcome, WarOutcome, WarResolution};
pub use state::{GameState, Status};
pub use war::{battlefield, power_at, resolve_war, unit_power};
