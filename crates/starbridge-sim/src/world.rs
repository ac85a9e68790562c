//! §3 "World container": entities partitioned by kind, keyed by id.

use std::collections::HashMap;

use crate::entities::{Base, Mine, Nebula, NpcShip, PlayerShip, Torpedo};
use crate::ids::{EntityId, IdAllocator};

#[derive(Debug, Default)]
pub struct World {
    pub player_ships: HashMap<EntityId, PlayerShip>,
    pub npc_ships: HashMap<EntityId, NpcShip>,
    pub bases: HashMap<EntityId, Base>,
    pub torpedoes: HashMap<EntityId, Torpedo>,
    pub mines: HashMap<EntityId, Mine>,
    pub nebulae: HashMap<EntityId, Nebula>,
    pub ids: IdAllocator,
    /// Bases and enemy NPCs are removed from their maps on destruction
    /// (§3 "Lifecycle"), so the win/loss phase can't tell "all destroyed"
    /// apart from "none were ever spawned" by looking at the map alone.
    /// These flags are set once by the scenario bootstrap.
    pub bases_ever_spawned: bool,
    pub enemies_ever_spawned: bool,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the ship index a client's `setShip` command referenced;
    /// player ships are keyed by id but §4.6 routes commands by
    /// `shipIndex`, so callers scan this small map rather than maintain a
    /// second index.
    pub fn player_ship_by_index(&self, ship_index: u8) -> Option<&PlayerShip> {
        self.player_ships.values().find(|s| s.ship_index == ship_index)
    }

    pub fn player_ship_by_index_mut(&mut self, ship_index: u8) -> Option<&mut PlayerShip> {
        self.player_ships.values_mut().find(|s| s.ship_index == ship_index)
    }

    pub fn nearest_player_ship(&self, from: crate::vector::Vec3) -> Option<&PlayerShip> {
        self.player_ships
            .values()
            .min_by(|a, b| a.position.distance_to(from).total_cmp(&b.position.distance_to(from)))
    }

    pub fn nearest_friendly_base(&self, from: crate::vector::Vec3) -> Option<&Base> {
        self.bases
            .values()
            .min_by(|a, b| a.position.distance_to(from).total_cmp(&b.position.distance_to(from)))
    }

    /// True once every friendly base has been destroyed (§4.5 phase 14
    /// loss condition). Destroyed bases are removed from the map, so this
    /// checks emptiness rather than scanning for a destroyed flag.
    pub fn all_bases_destroyed(&self) -> bool {
        self.bases_ever_spawned && self.bases.is_empty()
    }

    /// True once every enemy NPC is destroyed or surrendered (§4.5 phase
    /// 14 win condition). Destroyed enemies are removed from the map;
    /// surrendered ones stay but no longer count against the win.
    pub fn all_enemies_defeated(&self) -> bool {
        self.enemies_ever_spawned
            && self
                .npc_ships
                .values()
                .filter(|n| n.faction == starbridge_protocol::constants::Faction::Enemy)
                .all(|n| n.surrendered)
    }
}
