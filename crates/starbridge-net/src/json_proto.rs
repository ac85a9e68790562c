//! WS JSON wire shapes (§6.2). One `#[serde(tag = "type")]` enum per
//! direction so the wire shape falls directly out of the types.

use serde::{Deserialize, Serialize};
use starbridge_protocol::constants::ConsoleType;
use starbridge_sim::entities::{Base, Mine, Nebula, NpcShip, PlayerShip, Torpedo};
use starbridge_sim::{EntityId, Outcome};

#[derive(Debug, Clone, Serialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorldSnapshot {
    pub player_ships: Vec<PlayerShip>,
    pub npc_ships: Vec<NpcShip>,
    pub bases: Vec<Base>,
    pub mines: Vec<Mine>,
    pub nebulae: Vec<Nebula>,
    pub torpedoes: Vec<Torpedo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Welcome { version: Version },
    GameStart,
    GameOver { outcome: Outcome },
    Heartbeat,
    ConsoleStatus { ship_index: u8, consoles: [bool; 11] },
    WorldUpdate { world: WorldSnapshot },
    ShipUpdate { ship: PlayerShip },
    DestroyObject { object_type: ObjectKind, object_id: EntityId },
    GameMessage { message: String },
}

/// Kind tag for `destroyObject` (§6.2); named by entity kind rather than
/// reusing the binary wire's `ObjectType` numeric tag, since JSON clients
/// never see the binary protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectKind {
    PlayerShip,
    Npc,
    Base,
    Mine,
    Nebula,
    Torpedo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// `console_type` is the raw numeric console ordinal (§6.2 `join`),
    /// matching every other `*Type`/`*Index` field on the wire rather
    /// than the string-tagged `ConsoleType` used elsewhere in this file.
    Join { ship_index: u8, console_type: u8, player_name: String },
    Ready,
    Heartbeat,
    Command { command: String, params: serde_json::Value },
}
