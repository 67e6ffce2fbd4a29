//! War resolution and the combat rule.
//!
//! Both participants evaluate the same `RecognitionOfWar` independently and
//! must reach the same verdict, so the rule reads only the two snapshots in
//! the message and never local state:
//!
//! 1. The battlefield is the smallest location (by name) where both sides
//!    have units. No shared location means there is nothing to fight.
//! 2. Each side's power is the sum of its unit power at the battlefield.
//! 3. Higher power wins; equal power is a draw.

use peril_protocol::{Location, Player, RecognitionOfWar, UnitKind};

use crate::{Battle, GameState, WarOutcome, WarResolution};

/// Combat power of one unit.
pub fn unit_power(kind: UnitKind) -> u32 {
    match kind {
        UnitKind::Infantry => 1,
        UnitKind::Archer => 3,
        UnitKind::Cavalry => 5,
        UnitKind::Artillery => 10,
    }
}

/// Total power a player fields at `location`.
pub fn power_at(player: &Player, location: &Location) -> u32 {
    player.units_at(location).map(|u| unit_power(u.kind)).sum()
}

/// The location the two players fight over, if they share one.
pub fn battlefield(attacker: &Player, defender: &Player) -> Option<Location> {
    attacker
        .units
        .iter()
        .map(|u| &u.location)
        .filter(|location| defender.occupies(location))
        .min()
        .cloned()
}

/// Resolves a war recognition for the local player.
///
/// Every war consumer sees every recognition; only the attacker and the
/// defender get anything other than [`WarOutcome::NotInvolved`]. When the
/// local player loses, or the war is a draw, its own units on the
/// battlefield are destroyed. Re-running the same recognition removes
/// nothing further.
pub fn resolve_war(state: &mut GameState, row: &RecognitionOfWar) -> WarResolution {
    let username = state.username().to_string();
    if !row.involves(&username) {
        return WarResolution::without_battle(WarOutcome::NotInvolved);
    }
    if row.attacker.units.is_empty() || row.defender.units.is_empty() {
        tracing::debug!(%username, "war with an empty side");
        return WarResolution::without_battle(WarOutcome::NoUnits);
    }
    let Some(location) = battlefield(&row.attacker, &row.defender) else {
        tracing::debug!(%username, "war without a shared location");
        return WarResolution::without_battle(WarOutcome::NoUnits);
    };

    let battle = Battle {
        attacker_power: power_at(&row.attacker, &location),
        defender_power: power_at(&row.defender, &location),
        attacker: row.attacker.username.clone(),
        defender: row.defender.username.clone(),
        location,
    };
    let outcome = match battle.winner() {
        None => WarOutcome::Draw,
        Some(winner) if winner == username => WarOutcome::YouWon,
        Some(_) => WarOutcome::OpponentWon,
    };

    if matches!(outcome, WarOutcome::OpponentWon | WarOutcome::Draw) {
        let lost = state.remove_local_units_at(&battle.location);
        tracing::info!(%username, location = %battle.location, lost, "units lost in war");
    }

    let resolution = WarResolution {
        outcome,
        battle: Some(battle),
    };
    tracing::debug!(
        %username,
        outcome = ?resolution.outcome,
        winner = resolution.winner(),
        "war resolved"
    );
    resolution
}
