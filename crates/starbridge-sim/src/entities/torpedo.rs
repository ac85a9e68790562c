use serde::{Deserialize, Serialize};
use starbridge_protocol::constants::OrdnanceType;

use crate::ids::EntityId;
use crate::tuning;
use crate::vector::Vec3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Torpedo {
    pub id: EntityId,
    pub position: Vec3,
    pub heading: f32,
    pub velocity: f32,
    pub ordnance_type: OrdnanceType,
    pub owner_id: EntityId,
    pub homing_target_id: Option<EntityId>,
    pub lifetime_remaining: f32,
}

impl Torpedo {
    pub fn new(
        id: EntityId,
        position: Vec3,
        heading: f32,
        ordnance_type: OrdnanceType,
        owner_id: EntityId,
        homing_target_id: Option<EntityId>,
    ) -> Self {
        Self {
            id,
            position,
            heading,
            velocity: tuning::TORPEDO_SPEED,
            ordnance_type,
            owner_id,
            homing_target_id,
            lifetime_remaining: tuning::TORPEDO_LIFETIME_SEC,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime_remaining <= 0.0
    }
}
