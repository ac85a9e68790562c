pub mod base;
pub mod mine;
pub mod nebula;
pub mod npc_ship;
pub mod player_ship;
pub mod system;
pub mod torpedo;

pub use base::Base;
pub use mine::Mine;
pub use nebula::Nebula;
pub use npc_ship::NpcShip;
pub use player_ship::{PlayerShip, ScanProgress, Tube};
pub use system::ShipSystem;
pub use torpedo::Torpedo;
