//! Typed commands parsed from a line of player or server input.

use peril_protocol::{Location, UnitKind};

use crate::GameError;

/// A player-side command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `spawn <location> <kind>`
    Spawn { location: Location, kind: UnitKind },
    /// `move <location> <unitID> [unitID...]`
    Move { destination: Location, unit_ids: Vec<u32> },
    /// `status`
    Status,
    /// `spam <n>`: publish `n` junk game-log entries.
    Spam { count: usize },
    /// `help`
    Help,
    /// `quit`
    Quit,
}

impl Command {
    /// Parses one input line. Command words are case-insensitive.
    ///
    /// # Errors
    /// [`GameError::UnknownCommand`] for an unknown first word,
    /// [`GameError::Usage`] for missing arguments, and the matching error
    /// for a malformed location, unit kind, id or count.
    pub fn parse(line: &str) -> Result<Option<Self>, GameError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((head, args)) = words.split_first() else {
            return Ok(None);
        };

        let cmd = match head.to_lowercase().as_str() {
            "spawn" => {
                let [location, kind] = args else {
                    return Err(GameError::Usage("spawn <location> <kind>"));
                };
                Self::Spawn {
                    location: location.parse()?,
                    kind: kind.parse()?,
                }
            }
            "move" => {
                let Some((destination, ids)) = args.split_first() else {
                    return Err(GameError::Usage("move <location> <unitID> [unitID...]"));
                };
                if ids.is_empty() {
                    return Err(GameError::Usage("move <location> <unitID> [unitID...]"));
                }
                let unit_ids = ids
                    .iter()
                    .map(|id| {
                        id.parse::<u32>()
                            .map_err(|_| GameError::InvalidUnitId((*id).to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Self::Move {
                    destination: destination.parse()?,
                    unit_ids,
                }
            }
            "spam" => {
                let [count] = args else {
                    return Err(GameError::Usage("spam <n>"));
                };
                let count = count
                    .parse()
                    .map_err(|_| GameError::InvalidCount((*count).to_string()))?;
                Self::Spam { count }
            }
            "status" => Self::Status,
            "help" => Self::Help,
            "quit" => Self::Quit,
            other => return Err(GameError::UnknownCommand(other.to_string())),
        };
        Ok(Some(cmd))
    }
}

/// A server-side command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCommand {
    Pause,
    Resume,
    Help,
    Quit,
}

impl ServerCommand {
    /// Parses one input line; `Ok(None)` for a blank line.
    ///
    /// # Errors
    /// [`GameError::UnknownCommand`] for anything else.
    pub fn parse(line: &str) -> Result<Option<Self>, GameError> {
        let Some(head) = line.split_whitespace().next() else {
            return Ok(None);
        };
        match head.to_lowercase().as_str() {
            "pause" => Ok(Some(Self::Pause)),
            "resume" => Ok(Some(Self::Resume)),
            "help" => Ok(Some(Self::Help)),
            "quit" => Ok(Some(Self::Quit)),
            other => Err(GameError::UnknownCommand(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(name: &str) -> Location {
        Location::new(name).unwrap()
    }

    #[test]
    fn test_blank_line_is_none() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(ServerCommand::parse("").unwrap(), None);
    }

    #[test]
    fn test_parse_spawn() {
        assert_eq!(
            Command::parse("Spawn Rome archer").unwrap(),
            Some(Command::Spawn { location: loc("rome"), kind: UnitKind::Archer })
        );
    }

    #[test]
    fn test_parse_spawn_rejects_unknown_kind() {
        assert!(matches!(
            Command::parse("spawn rome dragon"),
            Err(GameError::Protocol(_))
        ));
    }

    #[test]
    fn test_parse_spawn_requires_two_args() {
        assert!(matches!(Command::parse("spawn rome"), Err(GameError::Usage(_))));
    }

    #[test]
    fn test_parse_move() {
        assert_eq!(
            Command::parse("move asia 0 2").unwrap(),
            Some(Command::Move { destination: loc("asia"), unit_ids: vec![0, 2] })
        );
    }

    #[test]
    fn test_parse_move_rejects_bad_id() {
        assert!(matches!(
            Command::parse("move asia zero"),
            Err(GameError::InvalidUnitId(id)) if id == "zero"
        ));
        assert!(matches!(Command::parse("move asia"), Err(GameError::Usage(_))));
    }

    #[test]
    fn test_parse_spam() {
        assert_eq!(Command::parse("spam 5").unwrap(), Some(Command::Spam { count: 5 }));
        assert!(matches!(Command::parse("spam lots"), Err(GameError::InvalidCount(_))));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("status").unwrap(), Some(Command::Status));
        assert_eq!(Command::parse("HELP").unwrap(), Some(Command::Help));
        assert_eq!(Command::parse("quit").unwrap(), Some(Command::Quit));
        assert!(matches!(Command::parse("dance"), Err(GameError::UnknownCommand(_))));
    }

    #[test]
    fn test_parse_server_commands() {
        assert_eq!(ServerCommand::parse("pause").unwrap(), Some(ServerCommand::Pause));
        assert_eq!(ServerCommand::parse("Resume").unwrap(), Some(ServerCommand::Resume));
        assert!(ServerCommand::parse("spawn").is_err());
    }
}
