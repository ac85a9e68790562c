use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::vector::Vec3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nebula {
    pub id: EntityId,
    pub position: Vec3,
    pub nebula_type: u8,
    pub radius: f32,
}

impl Nebula {
    pub fn new(id: EntityId, position: Vec3, nebula_type: u8, radius: f32) -> Self {
        Self {
            id,
            position,
            nebula_type,
            radius,
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        self.position.distance_to(point) <= self.radius
    }
}
