//! Simulation engine: world model, fixed-rate tick loop, and the
//! physics/combat/engineering/AI/docking/win-loss rules that run inside it.
//! Owns no networking; `starbridge-net` drives this crate's `Engine` from
//! client commands and broadcasts the `ChangeSet` each tick produces.

pub mod ai;
pub mod change_set;
pub mod combat;
pub mod engine;
pub mod entities;
pub mod ids;
pub mod scenario;
pub mod tuning;
pub mod vector;
pub mod world;

pub use change_set::ChangeSet;
pub use engine::{Engine, Outcome};
pub use ids::EntityId;
pub use vector::Vec3;
pub use world::World;
