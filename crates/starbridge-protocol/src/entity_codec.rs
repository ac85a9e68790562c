//! Tagged bitfield entity-update encoding (§4.2, §4.4).
//!
//! An entity update is: object-type byte, id, a `ceil(n/8)`-byte bitfield
//! (bit k set iff property k of that kind's table is present), then the
//! present properties in ascending bit order using each property's
//! declared primitive type. A batch is a sequence of updates terminated
//! by a single `0x00` byte.

use bytes::{Buf, BufMut, BytesMut};

use crate::constants::{ObjectType, BATCH_TERMINATOR};
use crate::error::ProtocolError;
use crate::strings::{read_string, write_string, written_len as string_written_len};

/// Primitive wire types a property can take (§4.2 "Property tables").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimType {
    Int32,
    UInt8,
    Float32,
    Str,
}

/// One entry of a per-kind property table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropDef {
    pub name: &'static str,
    pub prim: PrimType,
}

const fn p(name: &'static str, prim: PrimType) -> PropDef {
    PropDef { name, prim }
}

/// A decoded/to-be-encoded property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int32(i32),
    UInt8(u8),
    Float32(f32),
    Str(String),
}

impl PropertyValue {
    fn prim(&self) -> PrimType {
        match self {
            Self::Int32(_) => PrimType::Int32,
            Self::UInt8(_) => PrimType::UInt8,
            Self::Float32(_) => PrimType::Float32,
            Self::Str(_) => PrimType::Str,
        }
    }

    fn write(&self, buf: &mut BytesMut) {
        match self {
            Self::Int32(v) => buf.put_i32_le(*v),
            Self::UInt8(v) => buf.put_u8(*v),
            Self::Float32(v) => buf.put_f32_le(*v),
            Self::Str(s) => write_string(buf, s),
        }
    }

    fn written_len(&self) -> usize {
        match self {
            Self::Int32(_) => 4,
            Self::UInt8(_) => 1,
            Self::Float32(_) => 4,
            Self::Str(s) => string_written_len(s),
        }
    }

    fn read(r: &mut &[u8], prim: PrimType) -> Result<Self, ProtocolError> {
        Ok(match prim {
            PrimType::Int32 => {
                if r.len() < 4 {
                    return Err(ProtocolError::Truncated { needed: 4 - r.len() });
                }
                Self::Int32(r.get_i32_le())
            }
            PrimType::UInt8 => {
                if r.is_empty() {
                    return Err(ProtocolError::Truncated { needed: 1 });
                }
                Self::UInt8(r.get_u8())
            }
            PrimType::Float32 => {
                if r.len() < 4 {
                    return Err(ProtocolError::Truncated { needed: 4 - r.len() });
                }
                Self::Float32(r.get_f32_le())
            }
            PrimType::Str => Self::Str(read_string(r)?),
        })
    }
}

/// One property-table index paired with the value present at that bit.
pub type Property = (usize, PropertyValue);

/// A fully decoded entity update: kind, id, and the subset of properties
/// whose bit was set.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityUpdate {
    pub kind: ObjectType,
    pub id: u32,
    pub props: Vec<Property>,
}

pub mod tables {
    use super::{p, PrimType::*, PropDef};

    /// §3 "Player ship". System fields (8 systems × 4) and tube fields (6
    /// tubes × 3) are flattened into the table in fixed order.
    pub const PLAYER_SHIP: &[PropDef] = &[
        p("shipIndex", UInt8),
        p("name", Str),
        p("positionX", Float32),
        p("positionY", Float32),
        p("positionZ", Float32),
        p("heading", Float32),
        p("velocity", Float32),
        p("impulse", Float32),
        p("warpFactor", UInt8),
        p("reverse", UInt8),
        p("rudder", Float32),
        p("pitch", Float32),
        p("shieldsFore", Float32),
        p("shieldsAft", Float32),
        p("shieldsForeMax", Float32),
        p("shieldsAftMax", Float32),
        p("shieldsActive", UInt8),
        p("beamFrequency", UInt8),
        p("energy", Float32),
        // 8 systems: Beams, Torpedoes, Sensors, Maneuvering, Impulse, Warp,
        // ForeShields, AftShields, each {energyAllocation, heat, coolant, damage}.
        p("sys0EnergyAllocation", Float32),
        p("sys0Heat", Float32),
        p("sys0Coolant", UInt8),
        p("sys0Damage", Float32),
        p("sys1EnergyAllocation", Float32),
        p("sys1Heat", Float32),
        p("sys1Coolant", UInt8),
        p("sys1Damage", Float32),
        p("sys2EnergyAllocation", Float32),
        p("sys2Heat", Float32),
        p("sys2Coolant", UInt8),
        p("sys2Damage", Float32),
        p("sys3EnergyAllocation", Float32),
        p("sys3Heat", Float32),
        p("sys3Coolant", UInt8),
        p("sys3Damage", Float32),
        p("sys4EnergyAllocation", Float32),
        p("sys4Heat", Float32),
        p("sys4Coolant", UInt8),
        p("sys4Damage", Float32),
        p("sys5EnergyAllocation", Float32),
        p("sys5Heat", Float32),
        p("sys5Coolant", UInt8),
        p("sys5Damage", Float32),
        p("sys6EnergyAllocation", Float32),
        p("sys6Heat", Float32),
        p("sys6Coolant", UInt8),
        p("sys6Damage", Float32),
        p("sys7EnergyAllocation", Float32),
        p("sys7Heat", Float32),
        p("sys7Coolant", UInt8),
        p("sys7Damage", Float32),
        p("coolantAvailable", UInt8),
        // 6 tubes, each {state, ordnanceType, loadTimer}.
        p("tube0State", UInt8),
        p("tube0OrdnanceType", UInt8),
        p("tube0LoadTimer", Float32),
        p("tube1State", UInt8),
        p("tube1OrdnanceType", UInt8),
        p("tube1LoadTimer", Float32),
        p("tube2State", UInt8),
        p("tube2OrdnanceType", UInt8),
        p("tube2LoadTimer", Float32),
        p("tube3State", UInt8),
        p("tube3OrdnanceType", UInt8),
        p("tube3LoadTimer", Float32),
        p("tube4State", UInt8),
        p("tube4OrdnanceType", UInt8),
        p("tube4LoadTimer", Float32),
        p("tube5State", UInt8),
        p("tube5OrdnanceType", UInt8),
        p("tube5LoadTimer", Float32),
        // 8 ordnance inventory counts.
        p("ordnance0Count", UInt8),
        p("ordnance1Count", UInt8),
        p("ordnance2Count", UInt8),
        p("ordnance3Count", UInt8),
        p("ordnance4Count", UInt8),
        p("ordnance5Count", UInt8),
        p("ordnance6Count", UInt8),
        p("ordnance7Count", UInt8),
        p("targetId", Int32),
        p("autoBeams", UInt8),
        p("beamCooldown", Float32),
        p("docked", UInt8),
        p("dockedWith", Int32),
        p("redAlert", UInt8),
        p("mainScreenView", UInt8),
        p("inNebula", UInt8),
    ];

    /// §3 "NPC ship".
    pub const NPC_SHIP: &[PropDef] = &[
        p("name", Str),
        p("positionX", Float32),
        p("positionY", Float32),
        p("positionZ", Float32),
        p("heading", Float32),
        p("velocity", Float32),
        p("faction", UInt8),
        p("shieldsFore", Float32),
        p("shieldsAft", Float32),
        p("hull", Float32),
        p("shieldFrequency", UInt8),
        p("surrendered", UInt8),
        p("inNebula", UInt8),
        p("scanState", UInt8),
        p("beamCooldown", Float32),
        p("empDisableUntil", Int32),
        p("aiTarget", Int32),
    ];

    /// §3 "Base".
    pub const BASE: &[PropDef] = &[
        p("name", Str),
        p("positionX", Float32),
        p("positionY", Float32),
        p("positionZ", Float32),
        p("shields", Float32),
        p("shieldsMax", Float32),
        p("ordnance0Stock", UInt8),
        p("ordnance1Stock", UInt8),
        p("ordnance2Stock", UInt8),
        p("ordnance3Stock", UInt8),
        p("ordnance4Stock", UInt8),
        p("ordnance5Stock", UInt8),
        p("ordnance6Stock", UInt8),
        p("ordnance7Stock", UInt8),
    ];

    /// §3 "Torpedo".
    pub const TORPEDO: &[PropDef] = &[
        p("positionX", Float32),
        p("positionY", Float32),
        p("positionZ", Float32),
        p("heading", Float32),
        p("velocity", Float32),
        p("ordnanceType", UInt8),
        p("ownerId", Int32),
        p("homingTargetId", Int32),
        p("lifetimeRemaining", Float32),
    ];

    /// §3 "Mine".
    pub const MINE: &[PropDef] = &[
        p("positionX", Float32),
        p("positionY", Float32),
        p("positionZ", Float32),
        p("ownerId", Int32),
        p("armDelayRemaining", Float32),
    ];

    /// §3 "Nebula".
    pub const NEBULA: &[PropDef] = &[
        p("positionX", Float32),
        p("positionY", Float32),
        p("positionZ", Float32),
        p("nebulaType", UInt8),
        p("radius", Float32),
    ];

    /// Anomaly and Creature are declared object-type tags (§4.1) with no
    /// modeled behavior in this core; their tables are empty.
    pub const ANOMALY: &[PropDef] = &[];
    pub const CREATURE: &[PropDef] = &[];
}

/// The single authoritative property table for `kind`.
pub fn table_for(kind: ObjectType) -> &'static [PropDef] {
    match kind {
        ObjectType::PlayerShip => tables::PLAYER_SHIP,
        ObjectType::Npc => tables::NPC_SHIP,
        ObjectType::Base => tables::BASE,
        ObjectType::Torpedo => tables::TORPEDO,
        ObjectType::Mine => tables::MINE,
        ObjectType::Nebula => tables::NEBULA,
        ObjectType::Anomaly => tables::ANOMALY,
        ObjectType::Creature => tables::CREATURE,
    }
}

fn bitfield_len(kind: ObjectType) -> usize {
    table_for(kind).len().div_ceil(8)
}

/// Encodes one entity update. `props` need not be sorted; the bitfield
/// and property stream are always emitted in ascending bit order.
pub fn write_entity_update(kind: ObjectType, id: u32, props: &[Property]) -> BytesMut {
    let table = table_for(kind);
    let mut bitfield = vec![0u8; bitfield_len(kind)];
    for (idx, val) in props {
        debug_assert!(*idx < table.len(), "bit index out of range for {kind:?}");
        debug_assert_eq!(
            table[*idx].prim,
            val.prim(),
            "property type mismatch for {kind:?}.{}",
            table[*idx].name
        );
        bitfield[idx / 8] |= 1 << (idx % 8);
    }

    let mut sorted = props.to_vec();
    sorted.sort_by_key(|(idx, _)| *idx);

    let mut buf = BytesMut::with_capacity(
        5 + bitfield.len() + sorted.iter().map(|(_, v)| v.written_len()).sum::<usize>(),
    );
    buf.put_u8(kind as u8);
    buf.put_u32_le(id);
    buf.extend_from_slice(&bitfield);
    for (_, val) in &sorted {
        val.write(&mut buf);
    }
    buf
}

/// Concatenates entity updates into one batch, terminated by `0x00`.
pub fn write_entity_batch(entities: &[(ObjectType, u32, Vec<Property>)]) -> BytesMut {
    let mut buf = BytesMut::new();
    for (kind, id, props) in entities {
        buf.extend_from_slice(&write_entity_update(*kind, *id, props));
    }
    buf.put_u8(BATCH_TERMINATOR);
    buf
}

/// Decodes one entity update from the front of `r`, advancing past it.
pub fn read_entity_update(r: &mut &[u8]) -> Result<EntityUpdate, ProtocolError> {
    if r.is_empty() {
        return Err(ProtocolError::Truncated { needed: 1 });
    }
    let kind_byte = r.get_u8();
    let kind = ObjectType::from_u8(kind_byte).ok_or(ProtocolError::UnknownObjectType(kind_byte))?;

    if r.len() < 4 {
        return Err(ProtocolError::Truncated { needed: 4 - r.len() });
    }
    let id = r.get_u32_le();

    let table = table_for(kind);
    let nbits = bitfield_len(kind);
    if r.len() < nbits {
        return Err(ProtocolError::Truncated { needed: nbits - r.len() });
    }
    let bitfield = &r[..nbits];
    r.advance(nbits);

    let mut props = Vec::new();
    for (idx, def) in table.iter().enumerate() {
        let set = bitfield[idx / 8] & (1 << (idx % 8)) != 0;
        if set {
            let val = PropertyValue::read(r, def.prim)?;
            props.push((idx, val));
        }
    }

    Ok(EntityUpdate { kind, id, props })
}

/// Decodes a batch of entity updates up to and including the `0x00`
/// terminator, advancing `r` past it.
pub fn read_entity_batch(r: &mut &[u8]) -> Result<Vec<EntityUpdate>, ProtocolError> {
    let mut out = Vec::new();
    loop {
        if r.is_empty() {
            return Err(ProtocolError::Truncated { needed: 1 });
        }
        if r[0] == BATCH_TERMINATOR {
            r.advance(1);
            return Ok(out);
        }
        out.push(read_entity_update(r)?);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_property_round_trips() {
        let props = vec![(0usize, PropertyValue::UInt8(3))];
        let bytes = write_entity_update(ObjectType::PlayerShip, 1000, &props);
        let mut r = &bytes[..];
        let decoded = read_entity_update(&mut r).unwrap();
        assert!(r.is_empty());
        assert_eq!(decoded.kind, ObjectType::PlayerShip);
        assert_eq!(decoded.id, 1000);
        assert_eq!(decoded.props, props);
    }

    #[test]
    fn every_bit_subset_round_trips_for_torpedo() {
        let table = tables::TORPEDO;
        // Exhaustively sweep every subset of the (small) torpedo table.
        for mask in 0..(1u32 << table.len()) {
            let mut props = Vec::new();
            for (idx, def) in table.iter().enumerate() {
                if mask & (1 << idx) != 0 {
                    let val = match def.prim {
                        PrimType::Int32 => PropertyValue::Int32(idx as i32 * -7),
                        PrimType::UInt8 => PropertyValue::UInt8(idx as u8),
                        PrimType::Float32 => PropertyValue::Float32(idx as f32 * 1.5),
                        PrimType::Str => PropertyValue::Str(format!("v{idx}")),
                    };
                    props.push((idx, val));
                }
            }
            let bytes = write_entity_update(ObjectType::Torpedo, 2001, &props);
            let mut r = &bytes[..];
            let decoded = read_entity_update(&mut r).unwrap();
            assert!(r.is_empty());
            let mut expected_sorted = props.clone();
            expected_sorted.sort_by_key(|(i, _)| *i);
            assert_eq!(decoded.props, expected_sorted);
        }
    }

    #[test]
    fn batch_round_trips_and_is_terminated() {
        let entities = vec![
            (
                ObjectType::Mine,
                3001,
                vec![(0usize, PropertyValue::Float32(10.0))],
            ),
            (
                ObjectType::Mine,
                3002,
                vec![(3usize, PropertyValue::Int32(42))],
            ),
        ];
        let bytes = write_entity_batch(&entities);
        assert_eq!(*bytes.last().unwrap(), BATCH_TERMINATOR);
        let mut r = &bytes[..];
        let decoded = read_entity_batch(&mut r).unwrap();
        assert!(r.is_empty());
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].id, 3001);
        assert_eq!(decoded[1].id, 3002);
    }

    #[test]
    fn unknown_kind_is_a_decode_error() {
        let mut bytes = write_entity_update(ObjectType::Mine, 1, &[]);
        bytes[0] = 0xEE;
        let mut r = &bytes[..];
        assert!(matches!(
            read_entity_update(&mut r),
            Err(ProtocolError::UnknownObjectType(0xEE))
        ));
    }

    #[test]
    fn strings_in_properties_round_trip() {
        let props = vec![(0usize, PropertyValue::Str("U.S.S. Artemis".to_string()))];
        let bytes = write_entity_update(ObjectType::PlayerShip, 1000, &props);
        let mut r = &bytes[..];
        let decoded = read_entity_update(&mut r).unwrap();
        assert_eq!(decoded.props, props);
    }
}
