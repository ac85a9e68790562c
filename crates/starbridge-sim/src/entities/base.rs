use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::vector::Vec3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Base {
    pub id: EntityId,
    pub name: String,
    pub position: Vec3,
    pub shields: f32,
    pub shields_max: f32,
    /// Indexed by `OrdnanceType::index()`.
    pub ordnance_stock: [u8; 8],
}

impl Base {
    pub fn new(id: EntityId, name: impl Into<String>, position: Vec3) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            shields: 200.0,
            shields_max: 200.0,
            ordnance_stock: [6, 6, 6, 6, 6, 6, 6, 6],
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.shields <= 0.0
    }

    /// The ordnance slot with the smallest stock, used by docking restock
    /// (§4.5 phase 4) to decide which inventory to top up.
    pub fn lowest_stocked_index(&self) -> usize {
        self.ordnance_stock
            .iter()
            .enumerate()
            .min_by_key(|(_, count)| **count)
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }
}
