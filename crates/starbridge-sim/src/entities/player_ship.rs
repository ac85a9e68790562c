use serde::{Deserialize, Serialize};
use starbridge_protocol::constants::{MainScreenView, OrdnanceType, TubeState};

use crate::entities::system::ShipSystem;
use crate::ids::EntityId;
use crate::tuning;
use crate::vector::Vec3;

/// One of the 6 weapons tubes (§3 "weapons").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tube {
    pub state: TubeState,
    pub ordnance_type: OrdnanceType,
    pub load_timer: f32,
}

impl Default for Tube {
    fn default() -> Self {
        Self {
            state: TubeState::Empty,
            ordnance_type: OrdnanceType::Homing,
            load_timer: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub target_id: EntityId,
    pub elapsed: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerShip {
    pub id: EntityId,
    pub ship_index: u8,
    pub name: String,

    pub position: Vec3,
    pub heading: f32,
    pub velocity: f32,
    pub impulse: f32,
    pub warp_factor: u8,
    pub reverse: bool,
    pub rudder: f32,
    pub pitch: f32,

    pub shields_fore: f32,
    pub shields_aft: f32,
    pub shields_fore_max: f32,
    pub shields_aft_max: f32,
    pub shields_active: bool,
    pub beam_frequency: u8,

    pub energy: f32,
    pub systems: [ShipSystem; 8],
    pub coolant_available: u8,

    pub tubes: [Tube; 6],
    /// Indexed by `OrdnanceType::index()`.
    pub ordnance_inventory: [u8; 8],
    pub target_id: Option<EntityId>,
    pub auto_beams: bool,
    pub beam_cooldown: f32,

    pub docked: bool,
    pub docked_with: Option<EntityId>,
    pub restock_timer: f32,

    pub red_alert: bool,
    pub main_screen_view: MainScreenView,
    pub in_nebula: bool,

    pub scan_progress: Option<ScanProgress>,
}

impl PlayerShip {
    /// Factory default (§4.4): full shields, full energy, all systems at
    /// allocation 1.0, heat 0, coolant 0, damage 0, empty tubes with zero
    /// ordnance. Ids are assigned by the caller (the session server), never
    /// by the factory itself.
    pub fn new(id: EntityId, ship_index: u8, name: impl Into<String>) -> Self {
        Self {
            id,
            ship_index,
            name: name.into(),
            position: Vec3::ZERO,
            heading: 0.0,
            velocity: 0.0,
            impulse: 0.0,
            warp_factor: 0,
            reverse: false,
            rudder: 0.0,
            pitch: 0.0,
            shields_fore: 100.0,
            shields_aft: 100.0,
            shields_fore_max: 100.0,
            shields_aft_max: 100.0,
            shields_active: true,
            beam_frequency: 0,
            energy: tuning::ENERGY_MAX,
            systems: [ShipSystem::default(); 8],
            coolant_available: 0,
            tubes: [Tube::default(); 6],
            ordnance_inventory: [0; 8],
            target_id: None,
            auto_beams: false,
            beam_cooldown: 0.0,
            docked: false,
            docked_with: None,
            restock_timer: 0.0,
            red_alert: false,
            main_screen_view: MainScreenView::Forward,
            in_nebula: false,
            scan_progress: None,
        }
    }

    pub fn system(&self, idx: starbridge_protocol::constants::SystemIndex) -> &ShipSystem {
        &self.systems[idx.index()]
    }

    pub fn system_mut(&mut self, idx: starbridge_protocol::constants::SystemIndex) -> &mut ShipSystem {
        &mut self.systems[idx.index()]
    }

    /// A system's effective allocation for this tick, folding in the
    /// ship-wide energy crisis rule from §4.5 phase 1: at 0 energy every
    /// system's allocation is treated as 0, regardless of its dial
    /// setting or damage state.
    pub fn effective_allocation(&self, idx: starbridge_protocol::constants::SystemIndex) -> f32 {
        if self.energy <= 0.0 {
            0.0
        } else {
            self.system(idx).effective_allocation()
        }
    }
}
