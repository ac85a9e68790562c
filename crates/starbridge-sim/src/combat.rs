//! Beam combat (§4.5 phases 6/7): player beams and NPC return fire share
//! the same shield/hull damage model.

use starbridge_protocol::constants::SystemIndex;

use crate::entities::{NpcShip, PlayerShip};
use crate::tuning;

/// Applies `damage` to whichever shield faces the attack, bleeding
/// through to hull once that shield empties. Returns the hull damage
/// actually applied (0 if the shield fully absorbed it).
pub fn apply_damage_to_player(target: &mut PlayerShip, bearing_from_attacker: f32, damage: f32) -> f32 {
    let facing_fore = {
        let relative = angle_between(target.heading, bearing_from_attacker);
        relative.abs() < std::f32::consts::FRAC_PI_2
    };
    let shield = if facing_fore {
        &mut target.shields_fore
    } else {
        &mut target.shields_aft
    };
    bleed_through(shield, damage)
}

pub fn apply_damage_to_npc(target: &mut NpcShip, bearing_from_attacker: f32, damage: f32) {
    let facing_fore = angle_between(target.heading, bearing_from_attacker).abs() < std::f32::consts::FRAC_PI_2;
    let shield = if facing_fore {
        &mut target.shields_fore
    } else {
        &mut target.shields_aft
    };
    let hull_damage = bleed_through(shield, damage);
    target.hull -= hull_damage;
}

fn bleed_through(shield: &mut f32, damage: f32) -> f32 {
    if *shield >= damage {
        *shield -= damage;
        0.0
    } else {
        let overflow = damage - *shield;
        *shield = 0.0;
        overflow
    }
}

fn angle_between(a: f32, b: f32) -> f32 {
    let two_pi = std::f32::consts::TAU;
    let mut d = (a - b) % two_pi;
    if d > std::f32::consts::PI {
        d -= two_pi;
    } else if d < -std::f32::consts::PI {
        d += two_pi;
    }
    d
}

/// Beam damage for a player shot (§4.5 phase 6): base damage scaled by
/// the beams system's effective allocation, with a frequency-match bonus.
pub fn player_beam_damage(ship: &PlayerShip, target_shield_frequency: u8) -> f32 {
    let allocation = ship.system(SystemIndex::Beams).effective_allocation();
    let bonus = if ship.beam_frequency == target_shield_frequency {
        tuning::FREQUENCY_MATCH_BONUS
    } else {
        1.0
    };
    tuning::BASE_BEAM_DAMAGE * allocation * bonus
}
