//! Gameplay tuning constants referenced by the engine's phases (§4.5).
//! Centralized so tests can assert against the exact numbers the
//! simulation uses instead of duplicating magic numbers.

/// Fixed logical tick rate (§4.5 "Scheduling").
pub const TICK_HZ: f32 = 20.0;
pub const TICK_DT: f32 = 1.0 / TICK_HZ;
/// Broadcasts fire every other logical tick (§4.6, §9).
pub const BROADCAST_TICK_DIVISOR: u64 = 2;

// -- Engineering (phase 1) --
pub const ENERGY_MAX: f32 = 1000.0;
pub const BASE_ENERGY_DRAIN_PER_SEC: f32 = 2.0;
pub const SYSTEM_ENERGY_DRAIN_PER_SEC: f32 = 5.0;
pub const SHIELD_ACTIVE_DRAIN_PER_SEC: f32 = 4.0;
pub const NEBULA_SHIELD_DRAIN_MULTIPLIER: f32 = 3.0;
pub const WARP_ENERGY_DRAIN_PER_SEC: f32 = 10.0;
pub const HEAT_RISE_PER_SEC: f32 = 0.25;
pub const COOLANT_EFFICIENCY: f32 = 0.1;
pub const OVERHEAT_THRESHOLD: f32 = 1.0;
pub const CRITICAL_HEAT: f32 = 1.0;
pub const POST_CRITICAL_HEAT: f32 = 0.8;
pub const DAMAGE_RATE_PER_SEC: f32 = 0.1;
pub const SYSTEM_DAMAGE_MAX: f32 = 1.0;
pub const COOLANT_POOL: u8 = 8;
pub const ENERGY_BUDGET: f32 = 24.0; // sum of the 8 systems' allocations

// -- Movement (phase 2) --
pub const MAX_IMPULSE_SPEED: f32 = 200.0;
pub const WARP_SPEED_PER_FACTOR: f32 = 800.0;
pub const ACCEL: f32 = 150.0; // units/s^2
pub const TURN_RATE: f32 = 0.6; // rad/s at full rudder
pub const VERTICAL_SPEED: f32 = 60.0;
pub const REVERSE_SPEED_MULTIPLIER: f32 = 0.5;

// -- Nebula (phase 3) --
pub const NEBULA_SENSOR_RANGE_MULTIPLIER: f32 = 0.5;

// -- Docking (phase 4) --
pub const DOCK_IMPULSE_THRESHOLD: f32 = 0.05;
pub const DOCK_RANGE: f32 = 500.0;
pub const ENERGY_RECHARGE_PER_SEC: f32 = 50.0;
pub const SHIELD_REPAIR_PER_SEC: f32 = 20.0;
pub const SYSTEM_REPAIR_PER_SEC: f32 = 0.05;
pub const RESTOCK_INTERVAL_SEC: f32 = 10.0;

// -- NPC AI (phase 5) --
pub const ATTACK_RANGE: f32 = 3000.0;
pub const CRUISE_SPEED: f32 = 120.0;
pub const FLEE_RANGE: f32 = 4000.0;
pub const FLEE_SPEED: f32 = 160.0;
pub const WANDER_INTERVAL_SEC: f32 = 15.0;
pub const WANDER_SPEED: f32 = 40.0;
/// Enemy NPCs surrender instead of being destroyed once hull drops to
/// this fraction of their starting hull (§3 "hull (for surrender
/// threshold)", §4.5 phase 14).
pub const SURRENDER_HULL_FRACTION: f32 = 0.15;

// -- Beams (phases 6/7) --
pub const BASE_BEAM_DAMAGE: f32 = 30.0;
pub const BEAM_RANGE: f32 = 3500.0;
pub const BEAM_COOLDOWN_SEC: f32 = 3.0;
pub const FREQUENCY_MATCH_BONUS: f32 = 1.5;
pub const NPC_BEAM_DAMAGE: f32 = 15.0;
pub const NPC_BEAM_COOLDOWN_SEC: f32 = 4.0;
pub const MAX_SYSTEM_ALLOCATION: f32 = 3.0;

// -- Torpedo loading (phase 8) --
pub const LOAD_TIME_SEC: f32 = 7.0;
pub const UNLOAD_TIME_SEC: f32 = 4.0;

// -- Torpedo/mine flight & effects (phases 9/10) --
pub const TORPEDO_SPEED: f32 = 600.0;
pub const TORPEDO_LIFETIME_SEC: f32 = 30.0;
pub const HOMING_TURN_RATE: f32 = 1.2;
pub const HIT_RADIUS: f32 = 150.0;
pub const HOMING_DAMAGE: f32 = 60.0;
pub const NUKE_DAMAGE: f32 = 120.0;
pub const NUKE_RADIUS: f32 = 2000.0;
pub const EMP_RADIUS: f32 = 1500.0;
pub const EMP_DURATION_SEC: f32 = 12.0;
pub const PSHOCK_DAMAGE: f32 = 20.0;
pub const PSHOCK_SHIELD_DROP: f32 = 50.0;
pub const MINE_TRIGGER_RADIUS: f32 = 200.0;
pub const MINE_DAMAGE: f32 = 80.0;
pub const MINE_ARM_DELAY_SEC: f32 = 2.0;

// -- Scans (phase 12) --
pub const SCAN_DURATION_SEC: f32 = 5.0;
pub const SENSOR_RANGE: f32 = 5000.0;

// -- Win/loss (phase 14) --
pub const GAME_OVER_GRACE_PERIOD_SEC: f32 = 5.0;
