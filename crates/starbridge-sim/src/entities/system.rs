use serde::{Deserialize, Serialize};

/// Per-system state (§3 "per-system state"), one of these per entry in
/// [`crate::tuning`]'s implicit 8-system list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShipSystem {
    /// 0..3.0; 1.0 = nominal.
    pub energy_allocation: f32,
    /// 0..1.
    pub heat: f32,
    /// Coolant units assigned, drawn from the ship's coolant pool.
    pub coolant: u8,
    /// 0..1; >=1.0 means offline.
    pub damage: f32,
}

impl Default for ShipSystem {
    fn default() -> Self {
        Self {
            energy_allocation: 1.0,
            heat: 0.0,
            coolant: 0,
            damage: 0.0,
        }
    }
}

impl ShipSystem {
    pub fn is_offline(&self) -> bool {
        self.damage >= crate::tuning::SYSTEM_DAMAGE_MAX
    }

    /// Effective allocation for this tick: 0 when damaged beyond the
    /// threshold, otherwise the raw allocation (§4.5 phase 1).
    pub fn effective_allocation(&self) -> f32 {
        if self.is_offline() {
            0.0
        } else {
            self.energy_allocation
        }
    }
}
