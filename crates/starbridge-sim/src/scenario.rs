//! Scenario bootstrap (§4.1): fixed starting positions for the default
//! session. Player ships are not spawned here — they're created lazily
//! on a client's first `setShip` (§3 "Lifecycle").

use starbridge_protocol::constants::{Faction, FRIENDLY_BASE_NAMES};
use tracing::info;

use crate::entities::{Base, Nebula, NpcShip};
use crate::vector::Vec3;
use crate::world::World;

const ENEMY_COUNT: usize = 6;
const NEUTRAL_COUNT: usize = 2;
const NEBULA_COUNT: usize = 3;
const NEBULA_RADIUS: f32 = 4000.0;

/// Populates an empty `World` with the fixed bootstrap entities: four
/// friendly bases, six enemy NPCs, two neutral NPCs, three nebulae.
pub fn bootstrap(world: &mut World) {
    for (i, name) in FRIENDLY_BASE_NAMES.iter().enumerate() {
        let id = world.ids.next();
        let position = Vec3::new(10_000.0 + i as f32 * 20_000.0, 0.0, 10_000.0);
        world.bases.insert(id, Base::new(id, *name, position));
    }

    for i in 0..ENEMY_COUNT {
        let id = world.ids.next();
        let position = Vec3::new(30_000.0 + i as f32 * 8_000.0, 0.0, 70_000.0);
        let name = format!("Raider-{i}");
        world.npc_ships.insert(id, NpcShip::new(id, name, Faction::Enemy, position));
    }

    for i in 0..NEUTRAL_COUNT {
        let id = world.ids.next();
        let position = Vec3::new(50_000.0 + i as f32 * 15_000.0, 0.0, 40_000.0);
        let name = format!("Trader-{i}");
        world.npc_ships.insert(id, NpcShip::new(id, name, Faction::Neutral, position));
    }

    for i in 0..NEBULA_COUNT {
        let id = world.ids.next();
        let position = Vec3::new(20_000.0 + i as f32 * 30_000.0, 0.0, 50_000.0);
        world.nebulae.insert(id, Nebula::new(id, position, 0, NEBULA_RADIUS));
    }

    world.bases_ever_spawned = true;
    world.enemies_ever_spawned = true;

    info!(bases = FRIENDLY_BASE_NAMES.len(), enemies = ENEMY_COUNT, neutrals = NEUTRAL_COUNT, "scenario bootstrapped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_spawns_the_fixed_counts() {
        let mut world = World::new();
        bootstrap(&mut world);
        assert_eq!(world.bases.len(), 4);
        assert_eq!(
            world.npc_ships.values().filter(|n| n.faction == Faction::Enemy).count(),
            ENEMY_COUNT
        );
        assert_eq!(
            world.npc_ships.values().filter(|n| n.faction == Faction::Neutral).count(),
            NEUTRAL_COUNT
        );
        assert_eq!(world.nebulae.len(), NEBULA_COUNT);
        assert!(world.player_ships.is_empty());
    }
}
