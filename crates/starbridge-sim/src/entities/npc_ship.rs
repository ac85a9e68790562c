use serde::{Deserialize, Serialize};
use starbridge_protocol::constants::Faction;

use crate::ids::EntityId;
use crate::vector::Vec3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcShip {
    pub id: EntityId,
    pub name: String,
    pub position: Vec3,
    pub heading: f32,
    pub velocity: f32,
    pub faction: Faction,

    pub shields_fore: f32,
    pub shields_aft: f32,
    pub hull: f32,
    pub hull_max: f32,
    pub shield_frequency: u8,

    pub surrendered: bool,
    pub in_nebula: bool,
    /// 0 = unknown, 1 = basic, 2 = detailed (§3 "scanState").
    pub scan_state: u8,
    pub beam_cooldown: f32,
    /// Tick count remaining until EMP disable lifts; 0 = not disabled.
    pub emp_disable_until: u32,
    pub ai_target: Option<EntityId>,
    /// Phase-5 wander-state timer, shared by the wander heading refresh.
    pub wander_timer: f32,
}

impl NpcShip {
    /// Faction-specific defaults (§4.4): enemies run hot and tough,
    /// neutrals carry no offense, friendlies (unused by the bootstrap,
    /// which only spawns bases as friendlies) fall back to neutral stats.
    pub fn new(id: EntityId, name: impl Into<String>, faction: Faction, position: Vec3) -> Self {
        let (shields, hull) = match faction {
            Faction::Enemy => (80.0, 150.0),
            Faction::Neutral => (40.0, 80.0),
            Faction::Friendly => (60.0, 100.0),
        };
        Self {
            id,
            name: name.into(),
            position,
            heading: 0.0,
            velocity: 0.0,
            faction,
            shields_fore: shields,
            shields_aft: shields,
            hull,
            hull_max: hull,
            shield_frequency: 0,
            surrendered: false,
            in_nebula: false,
            scan_state: 0,
            beam_cooldown: 0.0,
            emp_disable_until: 0,
            ai_target: None,
            wander_timer: 0.0,
        }
    }

    pub fn is_emp_disabled(&self) -> bool {
        self.emp_disable_until > 0
    }

    pub fn is_destroyed(&self) -> bool {
        self.hull <= 0.0
    }

    /// True once hull has bled down to the surrender threshold but the
    /// ship hasn't been destroyed outright this tick (§3, §4.5 phase 14).
    pub fn is_below_surrender_threshold(&self) -> bool {
        self.hull > 0.0 && self.hull <= self.hull_max * crate::tuning::SURRENDER_HULL_FRACTION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enemy_defaults_are_tougher_than_neutral() {
        let enemy = NpcShip::new(1000, "Raider", Faction::Enemy, Vec3::ZERO);
        let neutral = NpcShip::new(1001, "Trader", Faction::Neutral, Vec3::ZERO);
        assert!(enemy.hull > neutral.hull);
        assert!(enemy.shields_fore > neutral.shields_fore);
    }
}
