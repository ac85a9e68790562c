use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::vector::Vec3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mine {
    pub id: EntityId,
    pub position: Vec3,
    pub owner_id: EntityId,
    pub arm_delay_remaining: f32,
}

impl Mine {
    pub fn new(id: EntityId, position: Vec3, owner_id: EntityId, arm_delay: f32) -> Self {
        Self {
            id,
            position,
            owner_id,
            arm_delay_remaining: arm_delay,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.arm_delay_remaining <= 0.0
    }
}
