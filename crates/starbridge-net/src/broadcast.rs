//! Broadcast encoding (§4.6 "Broadcast schedule"): turns a `ChangeSet` plus
//! the current `World` into binary TCP packets and JSON WS messages.
//!
//! Every broadcast tick is a full-state broadcast of every entity the
//! change set marks created or mutated (§4.5 "Change set" chooses option
//! (a): `ChangeSet::mark_all_mutated` marks every live entity each tick),
//! so there is no incremental bit-diffing to do here.

use bytes::{Bytes, BytesMut};
use starbridge_protocol::entity_codec::{write_entity_batch, Property, PropertyValue};
use starbridge_protocol::header::Header;
use starbridge_protocol::constants::{ObjectType, Origin, PacketType};
use starbridge_sim::change_set::KindChanges;
use starbridge_sim::entities::{Base, Mine, Nebula, NpcShip, PlayerShip, Torpedo};
use starbridge_sim::{ChangeSet, World};

use crate::json_proto::{ObjectKind, ServerMessage, WorldSnapshot};

fn framed(packet_type: PacketType, payload: &[u8]) -> Bytes {
    let mut buf = Header::write(Origin::Server as u32, packet_type as u32, payload.len());
    buf.extend_from_slice(payload);
    buf.freeze()
}

pub fn server_heartbeat() -> Bytes {
    framed(PacketType::ServerHeartbeat, &[])
}

pub fn game_start() -> Bytes {
    let mut payload = BytesMut::new();
    payload.extend_from_slice(&0u32.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes());
    framed(PacketType::GameStart, &payload)
}

pub fn game_over() -> Bytes {
    framed(PacketType::GameOver, &[])
}

pub fn console_status(ship_index: u8, consoles: [bool; 11]) -> Bytes {
    let mut payload = BytesMut::new();
    payload.extend_from_slice(&(ship_index as u32).to_le_bytes());
    for flag in consoles {
        payload.extend_from_slice(&u32::from(flag).to_le_bytes());
    }
    framed(PacketType::ConsoleStatus, &payload)
}

pub fn game_message(message: &str) -> Bytes {
    let mut payload = BytesMut::new();
    starbridge_protocol::strings::write_string(&mut payload, message);
    framed(PacketType::GameMessage, &payload)
}

pub fn destroy_object(kind: ObjectType, id: u32) -> Bytes {
    let mut payload = BytesMut::new();
    payload.extend_from_slice(&[kind as u8]);
    payload.extend_from_slice(&id.to_le_bytes());
    framed(PacketType::DestroyObject, &payload)
}

fn object_update(entities: &[(ObjectType, u32, Vec<Property>)]) -> Bytes {
    let batch = write_entity_batch(entities);
    framed(PacketType::ObjectUpdate, &batch)
}

/// One `OBJECT_UPDATE` packet per entity kind touched this tick, plus one
/// `DESTROY_OBJECT` packet per destroyed entity. Returns an empty vec for a
/// kind with nothing to report (§4.6's "destroyed entities are announced
/// exactly once").
pub fn tcp_broadcast(world: &World, changes: &ChangeSet, include_nebulae: bool) -> Vec<Bytes> {
    let mut packets = Vec::new();

    push_kind_update(&mut packets, ObjectType::PlayerShip, &changes.player_ships, |id| {
        world.player_ships.get(&id).map(player_ship_properties)
    });
    push_kind_update(&mut packets, ObjectType::Npc, &changes.npc_ships, |id| {
        world.npc_ships.get(&id).map(npc_ship_properties)
    });
    push_kind_update(&mut packets, ObjectType::Base, &changes.bases, |id| {
        world.bases.get(&id).map(base_properties)
    });
    push_kind_update(&mut packets, ObjectType::Torpedo, &changes.torpedoes, |id| {
        world.torpedoes.get(&id).map(torpedo_properties)
    });
    push_kind_update(&mut packets, ObjectType::Mine, &changes.mines, |id| {
        world.mines.get(&id).map(mine_properties)
    });
    if include_nebulae {
        push_kind_update(&mut packets, ObjectType::Nebula, &changes.nebulae, |id| {
            world.nebulae.get(&id).map(nebula_properties)
        });
    }

    for id in &changes.player_ships.destroyed {
        packets.push(destroy_object(ObjectType::PlayerShip, *id));
    }
    for id in &changes.npc_ships.destroyed {
        packets.push(destroy_object(ObjectType::Npc, *id));
    }
    for id in &changes.bases.destroyed {
        packets.push(destroy_object(ObjectType::Base, *id));
    }
    for id in &changes.torpedoes.destroyed {
        packets.push(destroy_object(ObjectType::Torpedo, *id));
    }
    for id in &changes.mines.destroyed {
        packets.push(destroy_object(ObjectType::Mine, *id));
    }

    packets
}

fn push_kind_update(
    packets: &mut Vec<Bytes>,
    kind: ObjectType,
    changes: &KindChanges,
    lookup: impl Fn(u32) -> Option<Vec<Property>>,
) {
    let entities: Vec<(ObjectType, u32, Vec<Property>)> = changes
        .created
        .iter()
        .chain(changes.mutated.iter())
        .filter_map(|id| lookup(*id).map(|props| (kind, *id, props)))
        .collect();
    if !entities.is_empty() {
        packets.push(object_update(&entities));
    }
}

/// Full-state JSON snapshot of the whole world (§6.2 `worldUpdate`); WS
/// clients always get the complete arrays, not a change-set diff.
pub fn world_snapshot(world: &World) -> WorldSnapshot {
    WorldSnapshot {
        player_ships: world.player_ships.values().cloned().collect(),
        npc_ships: world.npc_ships.values().cloned().collect(),
        bases: world.bases.values().cloned().collect(),
        mines: world.mines.values().cloned().collect(),
        nebulae: world.nebulae.values().cloned().collect(),
        torpedoes: world.torpedoes.values().cloned().collect(),
    }
}

pub fn ws_destroy_messages(changes: &ChangeSet) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    for id in &changes.player_ships.destroyed {
        out.push(ServerMessage::DestroyObject { object_type: ObjectKind::PlayerShip, object_id: *id });
    }
    for id in &changes.npc_ships.destroyed {
        out.push(ServerMessage::DestroyObject { object_type: ObjectKind::Npc, object_id: *id });
    }
    for id in &changes.bases.destroyed {
        out.push(ServerMessage::DestroyObject { object_type: ObjectKind::Base, object_id: *id });
    }
    for id in &changes.torpedoes.destroyed {
        out.push(ServerMessage::DestroyObject { object_type: ObjectKind::Torpedo, object_id: *id });
    }
    for id in &changes.mines.destroyed {
        out.push(ServerMessage::DestroyObject { object_type: ObjectKind::Mine, object_id: *id });
    }
    out
}

fn player_ship_properties(ship: &PlayerShip) -> Vec<Property> {
    use PropertyValue::*;
    let mut props = vec![
        (0, UInt8(ship.ship_index)),
        (1, Str(ship.name.clone())),
        (2, Float32(ship.position.x)),
        (3, Float32(ship.position.y)),
        (4, Float32(ship.position.z)),
        (5, Float32(ship.heading)),
        (6, Float32(ship.velocity)),
        (7, Float32(ship.impulse)),
        (8, UInt8(ship.warp_factor)),
        (9, UInt8(u8::from(ship.reverse))),
        (10, Float32(ship.rudder)),
        (11, Float32(ship.pitch)),
        (12, Float32(ship.shields_fore)),
        (13, Float32(ship.shields_aft)),
        (14, Float32(ship.shields_fore_max)),
        (15, Float32(ship.shields_aft_max)),
        (16, UInt8(u8::from(ship.shields_active))),
        (17, UInt8(ship.beam_frequency)),
        (18, Float32(ship.energy)),
    ];
    for (i, system) in ship.systems.iter().enumerate() {
        let base = 19 + i * 4;
        props.push((base, Float32(system.energy_allocation)));
        props.push((base + 1, Float32(system.heat)));
        props.push((base + 2, UInt8(system.coolant)));
        props.push((base + 3, Float32(system.damage)));
    }
    props.push((51, UInt8(ship.coolant_available)));
    for (i, tube) in ship.tubes.iter().enumerate() {
        let base = 52 + i * 3;
        props.push((base, UInt8(tube.state as u8)));
        props.push((base + 1, UInt8(tube.ordnance_type as u8)));
        props.push((base + 2, Float32(tube.load_timer)));
    }
    for (i, count) in ship.ordnance_inventory.iter().enumerate() {
        props.push((70 + i, UInt8(*count)));
    }
    props.push((78, Int32(ship.target_id.map(|id| id as i32).unwrap_or(-1))));
    props.push((79, UInt8(u8::from(ship.auto_beams))));
    props.push((80, Float32(ship.beam_cooldown)));
    props.push((81, UInt8(u8::from(ship.docked))));
    props.push((82, Int32(ship.docked_with.map(|id| id as i32).unwrap_or(-1))));
    props.push((83, UInt8(u8::from(ship.red_alert))));
    props.push((84, UInt8(ship.main_screen_view as u8)));
    props.push((85, UInt8(u8::from(ship.in_nebula))));
    props
}

fn npc_ship_properties(npc: &NpcShip) -> Vec<Property> {
    use PropertyValue::*;
    vec![
        (0, Str(npc.name.clone())),
        (1, Float32(npc.position.x)),
        (2, Float32(npc.position.y)),
        (3, Float32(npc.position.z)),
        (4, Float32(npc.heading)),
        (5, Float32(npc.velocity)),
        (6, UInt8(npc.faction as u8)),
        (7, Float32(npc.shields_fore)),
        (8, Float32(npc.shields_aft)),
        (9, Float32(npc.hull)),
        (10, UInt8(npc.shield_frequency)),
        (11, UInt8(u8::from(npc.surrendered))),
        (12, UInt8(u8::from(npc.in_nebula))),
        (13, UInt8(npc.scan_state)),
        (14, Float32(npc.beam_cooldown)),
        (15, Int32(npc.emp_disable_until as i32)),
        (16, Int32(npc.ai_target.map(|id| id as i32).unwrap_or(-1))),
    ]
}

fn base_properties(base: &Base) -> Vec<Property> {
    use PropertyValue::*;
    let mut props = vec![
        (0, Str(base.name.clone())),
        (1, Float32(base.position.x)),
        (2, Float32(base.position.y)),
        (3, Float32(base.position.z)),
        (4, Float32(base.shields)),
        (5, Float32(base.shields_max)),
    ];
    for (i, stock) in base.ordnance_stock.iter().enumerate() {
        props.push((6 + i, UInt8(*stock)));
    }
    props
}

fn torpedo_properties(t: &Torpedo) -> Vec<Property> {
    use PropertyValue::*;
    vec![
        (0, Float32(t.position.x)),
        (1, Float32(t.position.y)),
        (2, Float32(t.position.z)),
        (3, Float32(t.heading)),
        (4, Float32(t.velocity)),
        (5, UInt8(t.ordnance_type as u8)),
        (6, Int32(t.owner_id as i32)),
        (7, Int32(t.homing_target_id.map(|id| id as i32).unwrap_or(-1))),
        (8, Float32(t.lifetime_remaining)),
    ]
}

fn mine_properties(m: &Mine) -> Vec<Property> {
    use PropertyValue::*;
    vec![
        (0, Float32(m.position.x)),
        (1, Float32(m.position.y)),
        (2, Float32(m.position.z)),
        (3, Int32(m.owner_id as i32)),
        (4, Float32(m.arm_delay_remaining)),
    ]
}

fn nebula_properties(n: &Nebula) -> Vec<Property> {
    use PropertyValue::*;
    vec![
        (0, Float32(n.position.x)),
        (1, Float32(n.position.y)),
        (2, Float32(n.position.z)),
        (3, UInt8(n.nebula_type)),
        (4, Float32(n.radius)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use starbridge_sim::entities::PlayerShip;

    #[test]
    fn tcp_broadcast_emits_one_packet_per_touched_kind() {
        let mut world = World::new();
        let ship = PlayerShip::new(1000, 0, "Artemis");
        world.player_ships.insert(1000, ship);
        let mut changes = ChangeSet::new();
        changes.player_ships.mark_created(1000);

        let packets = tcp_broadcast(&world, &changes, true);
        assert_eq!(packets.len(), 1);
    }

    #[test]
    fn destroyed_entities_each_get_their_own_packet() {
        let world = World::new();
        let mut changes = ChangeSet::new();
        changes.npc_ships.mark_destroyed(2000);
        let packets = tcp_broadcast(&world, &changes, true);
        assert_eq!(packets.len(), 1);
    }
}
