//! Per-tick change tracking (§3 "Change set per tick", §4.5 "Change set").
//!
//! Every phase that creates, destroys, or mutates an entity records it
//! here. The session server reads this after `tick()` returns and clears
//! it before the next call.

use std::collections::HashSet;

use crate::ids::EntityId;

/// created/destroyed/mutated sets for a single entity kind.
#[derive(Debug, Clone, Default)]
pub struct KindChanges {
    pub created: HashSet<EntityId>,
    pub destroyed: HashSet<EntityId>,
    pub mutated: HashSet<EntityId>,
}

impl KindChanges {
    fn clear(&mut self) {
        self.created.clear();
        self.destroyed.clear();
        self.mutated.clear();
    }

    pub fn mark_created(&mut self, id: EntityId) {
        self.created.insert(id);
    }

    /// Marks `id` mutated unless it was created or destroyed this tick;
    /// those already imply the client must (re)render the full entity.
    pub fn mark_mutated(&mut self, id: EntityId) {
        if !self.created.contains(&id) && !self.destroyed.contains(&id) {
            self.mutated.insert(id);
        }
    }

    pub fn mark_destroyed(&mut self, id: EntityId) {
        self.created.remove(&id);
        self.mutated.remove(&id);
        self.destroyed.insert(id);
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub player_ships: KindChanges,
    pub npc_ships: KindChanges,
    pub bases: KindChanges,
    pub torpedoes: KindChanges,
    pub mines: KindChanges,
    pub nebulae: KindChanges,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.player_ships.clear();
        self.npc_ships.clear();
        self.bases.clear();
        self.torpedoes.clear();
        self.mines.clear();
        self.nebulae.clear();
    }

    pub fn is_empty(&self) -> bool {
        [
            &self.player_ships,
            &self.npc_ships,
            &self.bases,
            &self.torpedoes,
            &self.mines,
            &self.nebulae,
        ]
        .iter()
        .all(|k| k.created.is_empty() && k.destroyed.is_empty() && k.mutated.is_empty())
    }

    /// Marks every currently-present entity in `world` as mutated, except
    /// ones already marked created/destroyed this tick. Used at the end
    /// of each tick instead of tracking per-field dirtiness; the session
    /// server broadcasts full entity state either way (§4.6).
    pub fn mark_all_mutated(&mut self, world: &crate::world::World) {
        for id in world.player_ships.keys() {
            self.player_ships.mark_mutated(*id);
        }
        for id in world.npc_ships.keys() {
            self.npc_ships.mark_mutated(*id);
        }
        for id in world.bases.keys() {
            self.bases.mark_mutated(*id);
        }
        for id in world.torpedoes.keys() {
            self.torpedoes.mark_mutated(*id);
        }
        for id in world.mines.keys() {
            self.mines.mark_mutated(*id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_then_destroyed_in_the_same_tick_nets_to_destroyed_only() {
        let mut kind = KindChanges::default();
        kind.mark_created(1000);
        kind.mark_mutated(1000);
        kind.mark_destroyed(1000);
        assert!(kind.created.is_empty());
        assert!(kind.mutated.is_empty());
        assert!(kind.destroyed.contains(&1000));
    }

    #[test]
    fn clear_empties_every_kind() {
        let mut cs = ChangeSet::new();
        cs.player_ships.created.insert(1000);
        cs.clear();
        assert!(cs.is_empty());
    }
}
