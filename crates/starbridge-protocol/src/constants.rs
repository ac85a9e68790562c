//! C1: packet-type tags, object-type tags, console/system/ordnance enums,
//! beam frequencies, world bounds, and scenario constants.

use serde::{Deserialize, Serialize};

/// Magic prefix marking the start of every framed binary packet.
pub const MAGIC: u32 = 0xDEAD_BEEF;
/// Size in bytes of the fixed packet header.
pub const HEADER_LEN: usize = 24;
/// Guard against unbounded buffer growth on a malformed stream.
pub const MAX_PACKET_SIZE: u32 = 1 << 20;

/// Origin tag carried in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Origin {
    Server = 0x01,
    Client = 0x02,
}

impl Origin {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::Server),
            0x02 => Some(Self::Client),
            _ => None,
        }
    }
}

/// 32-bit packet-type tags. Treated as opaque identifiers on the wire;
/// the numeric values only need to be internally consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PacketType {
    PlainTextGreeting = 1,
    Version = 2,
    ServerHeartbeat = 3,
    GameStart = 4,
    GameOver = 5,
    ConsoleStatus = 6,
    ObjectUpdate = 7,
    DestroyObject = 8,
    GameMessage = 9,
    ClientCommand = 100,
}

impl PacketType {
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            1 => Self::PlainTextGreeting,
            2 => Self::Version,
            3 => Self::ServerHeartbeat,
            4 => Self::GameStart,
            5 => Self::GameOver,
            6 => Self::ConsoleStatus,
            7 => Self::ObjectUpdate,
            8 => Self::DestroyObject,
            9 => Self::GameMessage,
            100 => Self::ClientCommand,
            _ => return None,
        })
    }
}

/// 8-bit object-type tags (§4.1). `0x00` is the batch terminator, never a
/// real entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectType {
    PlayerShip = 0x01,
    Npc = 0x05,
    Base = 0x06,
    Mine = 0x07,
    Anomaly = 0x08,
    Nebula = 0x0A,
    Torpedo = 0x0B,
    Creature = 0x0F,
}

/// Terminator byte for an entity-update batch.
pub const BATCH_TERMINATOR: u8 = 0x00;

impl ObjectType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x01 => Self::PlayerShip,
            0x05 => Self::Npc,
            0x06 => Self::Base,
            0x07 => Self::Mine,
            0x08 => Self::Anomaly,
            0x0A => Self::Nebula,
            0x0B => Self::Torpedo,
            0x0F => Self::Creature,
            _ => return None,
        })
    }
}

/// The 11-wide console enumeration. Only the first 6 have behavior; the
/// remaining slots exist because the `consoleStatus` wire layout is a
/// fixed 11-wide flag array (§9 "Console-occupation table").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum ConsoleType {
    Helm = 0,
    Weapons = 1,
    Engineering = 2,
    Science = 3,
    Communications = 4,
    MainScreen = 5,
    GameMaster = 6,
    Fighter = 7,
    Observer = 8,
    Data = 9,
    Engineering2 = 10,
}

/// All 11 console slots in wire order, for `consoleStatus` encoding.
pub const ALL_CONSOLES: [ConsoleType; 11] = [
    ConsoleType::Helm,
    ConsoleType::Weapons,
    ConsoleType::Engineering,
    ConsoleType::Science,
    ConsoleType::Communications,
    ConsoleType::MainScreen,
    ConsoleType::GameMaster,
    ConsoleType::Fighter,
    ConsoleType::Observer,
    ConsoleType::Data,
    ConsoleType::Engineering2,
];

impl ConsoleType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Helm,
            1 => Self::Weapons,
            2 => Self::Engineering,
            3 => Self::Science,
            4 => Self::Communications,
            5 => Self::MainScreen,
            6 => Self::GameMaster,
            7 => Self::Fighter,
            8 => Self::Observer,
            9 => Self::Data,
            10 => Self::Engineering2,
            _ => return None,
        })
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 8 ship-system indices, fixed order (§3 "per-system state").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum SystemIndex {
    Beams = 0,
    Torpedoes = 1,
    Sensors = 2,
    Maneuvering = 3,
    Impulse = 4,
    Warp = 5,
    ForeShields = 6,
    AftShields = 7,
}

pub const ALL_SYSTEMS: [SystemIndex; 8] = [
    SystemIndex::Beams,
    SystemIndex::Torpedoes,
    SystemIndex::Sensors,
    SystemIndex::Maneuvering,
    SystemIndex::Impulse,
    SystemIndex::Warp,
    SystemIndex::ForeShields,
    SystemIndex::AftShields,
];

impl SystemIndex {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Beams,
            1 => Self::Torpedoes,
            2 => Self::Sensors,
            3 => Self::Maneuvering,
            4 => Self::Impulse,
            5 => Self::Warp,
            6 => Self::ForeShields,
            7 => Self::AftShields,
            _ => return None,
        })
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 8 ordnance types (§3 "weapons" / §4.5 phase 9 effects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum OrdnanceType {
    Homing = 0,
    Nuke = 1,
    Mine = 2,
    Emp = 3,
    PShock = 4,
    Beacon = 5,
    Probe = 6,
    Tag = 7,
}

pub const ALL_ORDNANCE: [OrdnanceType; 8] = [
    OrdnanceType::Homing,
    OrdnanceType::Nuke,
    OrdnanceType::Mine,
    OrdnanceType::Emp,
    OrdnanceType::PShock,
    OrdnanceType::Beacon,
    OrdnanceType::Probe,
    OrdnanceType::Tag,
];

impl OrdnanceType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Homing,
            1 => Self::Nuke,
            2 => Self::Mine,
            3 => Self::Emp,
            4 => Self::PShock,
            5 => Self::Beacon,
            6 => Self::Probe,
            7 => Self::Tag,
            _ => return None,
        })
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 5 beam-frequency slots.
pub const BEAM_FREQUENCY_COUNT: u8 = 5;

/// Main-screen view enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum MainScreenView {
    Forward = 0,
    Aft = 1,
    Starboard = 2,
    Port = 3,
    Tactical = 4,
    LongRangeSensors = 5,
}

impl MainScreenView {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Forward,
            1 => Self::Aft,
            2 => Self::Starboard,
            3 => Self::Port,
            4 => Self::Tactical,
            5 => Self::LongRangeSensors,
            _ => return None,
        })
    }
}

/// NPC faction tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum Faction {
    Enemy = 0,
    Neutral = 1,
    Friendly = 2,
}

impl Faction {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Enemy,
            1 => Self::Neutral,
            2 => Self::Friendly,
            _ => return None,
        })
    }
}

/// Tube state machine (§3 "weapons").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum TubeState {
    Empty = 0,
    Loading = 1,
    Loaded = 2,
    Unloading = 3,
}

/// World bounds (§3 "Vector").
pub const WORLD_X_MIN: f32 = 0.0;
pub const WORLD_X_MAX: f32 = 100_000.0;
pub const WORLD_Y_MIN: f32 = -100_000.0;
pub const WORLD_Y_MAX: f32 = 100_000.0;
pub const WORLD_Z_MIN: f32 = 0.0;
pub const WORLD_Z_MAX: f32 = 100_000.0;

/// Scenario constants (§4.1): player ship and station names.
pub const PLAYER_SHIP_NAMES: [&str; 8] = [
    "Artemis", "Intrepid", "Excalibur", "Hyperion", "Constellation", "Valkyrie", "Zephyr",
    "Meridian",
];

pub const FRIENDLY_BASE_NAMES: [&str; 4] = ["DS-Alpha", "DS-Beta", "DS-Gamma", "DS-Delta"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_round_trips() {
        for v in [0x01u8, 0x05, 0x06, 0x07, 0x08, 0x0A, 0x0B, 0x0F] {
            let ty = ObjectType::from_u8(v).expect("known tag");
            assert_eq!(ty as u8, v);
        }
        assert!(ObjectType::from_u8(0x00).is_none());
        assert!(ObjectType::from_u8(0xFF).is_none());
    }

    #[test]
    fn all_consoles_is_eleven_wide() {
        assert_eq!(ALL_CONSOLES.len(), 11);
    }
}
