//! NPC behavior (§4.5 phase 5): enemy pursuit/standoff, neutral flee/wander.

use rand::Rng;
use starbridge_protocol::constants::Faction;

use crate::entities::NpcShip;
use crate::ids::EntityId;
use crate::tuning;
use crate::vector::{turn_toward, Vec3};
use crate::world::World;

pub fn run_npc_ai(world: &mut World, dt: f32, rng: &mut impl Rng) {
    let player_positions: Vec<(EntityId, Vec3)> =
        world.player_ships.values().map(|s| (s.id, s.position)).collect();
    // Enemies without a live player ship to chase fall back to the
    // nearest base, so the loss condition (all bases destroyed) is
    // reachable even in an all-NPC scenario.
    let base_positions: Vec<(EntityId, Vec3)> = world.bases.values().map(|b| (b.id, b.position)).collect();
    let nearest_player = |from: Vec3| -> Option<(EntityId, Vec3)> {
        let candidates = if player_positions.is_empty() { &base_positions } else { &player_positions };
        candidates
            .iter()
            .copied()
            .min_by(|(_, a), (_, b)| a.distance_to(from).total_cmp(&b.distance_to(from)))
    };

    let enemy_positions: Vec<Vec3> = world
        .npc_ships
        .values()
        .filter(|n| n.faction == Faction::Enemy)
        .map(|n| n.position)
        .collect();

    for npc in world.npc_ships.values_mut() {
        if npc.is_emp_disabled() || npc.surrendered {
            continue;
        }
        match npc.faction {
            Faction::Enemy => run_enemy(npc, nearest_player(npc.position), dt),
            Faction::Neutral => run_neutral(npc, &enemy_positions, dt, rng),
            Faction::Friendly => {}
        }
    }
}

fn run_enemy(npc: &mut NpcShip, target: Option<(EntityId, Vec3)>, dt: f32) {
    let Some((target_id, target_pos)) = target else {
        npc.ai_target = None;
        return;
    };
    npc.ai_target = Some(target_id);
    let bearing = npc.position.bearing_to(target_pos);
    let distance = npc.position.distance_to(target_pos);

    if distance > tuning::ATTACK_RANGE {
        npc.heading = turn_toward(npc.heading, bearing, tuning::TURN_RATE * dt);
        npc.velocity = tuning::CRUISE_SPEED;
    } else {
        npc.heading = turn_toward(npc.heading, bearing, tuning::TURN_RATE * dt);
        npc.velocity = 0.0;
    }
    let heading = npc.heading;
    npc.position = npc.position.add(Vec3::new(heading.sin(), 0.0, heading.cos()).scale(npc.velocity * dt));
}

fn run_neutral(npc: &mut NpcShip, enemies: &[Vec3], dt: f32, rng: &mut impl Rng) {
    let nearest_enemy = enemies
        .iter()
        .copied()
        .min_by(|a, b| a.distance_to(npc.position).total_cmp(&b.distance_to(npc.position)));

    if let Some(enemy_pos) = nearest_enemy.filter(|e| e.distance_to(npc.position) < tuning::FLEE_RANGE) {
        let away_bearing = enemy_pos.bearing_to(npc.position);
        npc.heading = turn_toward(npc.heading, away_bearing, tuning::TURN_RATE * dt);
        npc.velocity = tuning::FLEE_SPEED;
    } else {
        npc.wander_timer -= dt;
        if npc.wander_timer <= 0.0 {
            npc.wander_timer = tuning::WANDER_INTERVAL_SEC;
            npc.heading = rng.gen_range(0.0..std::f32::consts::TAU);
        }
        npc.velocity = tuning::WANDER_SPEED;
    }
    let heading = npc.heading;
    npc.position = npc.position.add(Vec3::new(heading.sin(), 0.0, heading.cos()).scale(npc.velocity * dt));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_pcg::Pcg32;

    #[test]
    fn enemy_beyond_attack_range_targets_and_approaches() {
        let mut npc = NpcShip::new(2000, "Raider", Faction::Enemy, Vec3::new(0.0, 0.0, 0.0));
        let target = (1000u32, Vec3::new(0.0, 0.0, 10_000.0));
        run_enemy(&mut npc, Some(target), tuning::TICK_DT);
        assert_eq!(npc.ai_target, Some(1000));
        assert!(npc.velocity > 0.0);
    }

    #[test]
    fn enemy_with_no_player_clears_target() {
        let mut npc = NpcShip::new(2000, "Raider", Faction::Enemy, Vec3::ZERO);
        npc.ai_target = Some(1000);
        run_enemy(&mut npc, None, tuning::TICK_DT);
        assert_eq!(npc.ai_target, None);
    }

    #[test]
    fn neutral_flees_a_nearby_enemy() {
        let mut npc = NpcShip::new(3000, "Trader", Faction::Neutral, Vec3::new(0.0, 0.0, 0.0));
        let enemies = vec![Vec3::new(0.0, 0.0, 100.0)];
        let mut rng = Pcg32::new(1, 1);
        run_neutral(&mut npc, &enemies, tuning::TICK_DT, &mut rng);
        assert_eq!(npc.velocity, tuning::FLEE_SPEED);
    }
}
