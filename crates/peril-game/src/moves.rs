//! Move resolution: what an incoming army move means for the local player.

use peril_protocol::ArmyMove;

use crate::{GameState, MoveOutcome};

/// Resolves an incoming [`ArmyMove`] against local state.
///
/// Records the mover's snapshot (last write wins) with the moved units placed
/// at the destination, then reports [`MoveOutcome::MakeWar`] if any other
/// known player has units there. The local player's own echoed broadcast is
/// [`MoveOutcome::SamePlayer`] and leaves the state untouched.
///
/// Performs no I/O. Replaying the same move yields the same outcome and the
/// same state, since a snapshot is a full copy rather than a delta.
pub fn resolve_move(state: &mut GameState, mv: &ArmyMove) -> MoveOutcome {
    if mv.player.username == state.username() {
        return MoveOutcome::SamePlayer;
    }

    let mut snapshot = mv.player.clone();
    for unit in snapshot
        .units
        .iter_mut()
        .filter(|u| mv.units.iter().any(|moved| moved.id == u.id))
    {
        unit.location = mv.destination.clone();
    }
    state.record_snapshot(snapshot);

    let contested = state
        .players()
        .any(|p| p.username != mv.player.username && p.occupies(&mv.destination));

    let outcome = if contested {
        MoveOutcome::MakeWar
    } else {
        MoveOutcome::Safe
    };
    tracing::debug!(
        username = %state.username(),
        mover = %mv.player.username,
        destination = %mv.destination,
        ?outcome,
        "move resolved"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use peril_protocol::{Location, Player, Unit, UnitKind};

    fn loc(name: &str) -> Location {
        Location::new(name).unwrap()
    }

    fn bob_moves_archer_to_rome() -> ArmyMove {
        let archer = Unit { id: 0, kind: UnitKind::Archer, location: loc("rome") };
        ArmyMove {
            player: Player { username: "bob".into(), units: vec![archer.clone()] },
            units: vec![archer],
            destination: loc("rome"),
        }
    }

    #[test]
    fn test_own_move_is_same_player_and_state_unchanged() {
        let mut state = GameState::new("alice");
        state.spawn(loc("rome"), UnitKind::Infantry).unwrap();
        let mv = state.move_units(loc("asia"), &[0]).unwrap();
        let before = state.clone();

        assert_eq!(resolve_move(&mut state, &mv), MoveOutcome::SamePlayer);
        assert_eq!(state, before);
    }

    #[test]
    fn test_move_to_empty_destination_is_safe_and_recorded() {
        let mut state = GameState::new("alice");
        let mv = bob_moves_archer_to_rome();

        assert_eq!(resolve_move(&mut state, &mv), MoveOutcome::Safe);
        assert_eq!(state.player("bob"), Some(&mv.player));
    }

    #[test]
    fn test_move_onto_local_units_makes_war() {
        let mut state = GameState::new("alice");
        state.spawn(loc("rome"), UnitKind::Infantry).unwrap();

        assert_eq!(
            resolve_move(&mut state, &bob_moves_archer_to_rome()),
            MoveOutcome::MakeWar
        );
    }

    #[test]
    fn test_move_onto_third_party_units_makes_war() {
        let mut state = GameState::new("alice");
        let carol_unit = Unit { id: 4, kind: UnitKind::Cavalry, location: loc("rome") };
        let carol_move = ArmyMove {
            player: Player { username: "carol".into(), units: vec![carol_unit.clone()] },
            units: vec![carol_unit],
            destination: loc("rome"),
        };
        assert_eq!(resolve_move(&mut state, &carol_move), MoveOutcome::Safe);

        assert_eq!(
            resolve_move(&mut state, &bob_moves_archer_to_rome()),
            MoveOutcome::MakeWar
        );
    }

    #[test]
    fn test_units_elsewhere_do_not_make_war() {
        let mut state = GameState::new("alice");
        state.spawn(loc("asia"), UnitKind::Artillery).unwrap();

        assert_eq!(
            resolve_move(&mut state, &bob_moves_archer_to_rome()),
            MoveOutcome::Safe
        );
    }

    #[test]
    fn test_moved_units_are_placed_at_destination() {
        let mut state = GameState::new("alice");
        let stale = Unit { id: 2, kind: UnitKind::Archer, location: loc("asia") };
        let mv = ArmyMove {
            player: Player { username: "bob".into(), units: vec![stale.clone()] },
            units: vec![stale],
            destination: loc("rome"),
        };

        resolve_move(&mut state, &mv);

        let bob = state.player("bob").unwrap();
        assert!(bob.occupies(&loc("rome")));
        assert!(!bob.occupies(&loc("asia")));
    }

    #[test]
    fn test_replaying_move_is_idempotent() {
        let mv = bob_moves_archer_to_rome();
        let mut first = GameState::new("alice");
        first.spawn(loc("rome"), UnitKind::Infantry).unwrap();
        let mut second = first.clone();

        let a = resolve_move(&mut first, &mv);
        let b = resolve_move(&mut second, &mv);
        let c = resolve_move(&mut second, &mv);

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(first, second);
    }

    #[test]
    fn test_later_snapshot_overwrites_earlier() {
        let mut state = GameState::new("alice");
        resolve_move(&mut state, &bob_moves_archer_to_rome());

        let cav = Unit { id: 1, kind: UnitKind::Cavalry, location: loc("asia") };
        let later = ArmyMove {
            player: Player { username: "bob".into(), units: vec![cav.clone()] },
            units: vec![cav],
            destination: loc("asia"),
        };
        resolve_move(&mut state, &later);

        assert_eq!(state.player("bob"), Some(&later.player));
    }
}
