//! Command surface (§4.7): one validator+effect function per command,
//! shared by the TCP and WS dispatch paths (both decode into the same
//! `ClientCommand` shape before reaching here).

use std::collections::HashMap;

use starbridge_protocol::constants::{ConsoleType, MainScreenView, OrdnanceType, SystemIndex, TubeState};
use starbridge_protocol::ClientCommand;
use starbridge_sim::entities::PlayerShip;
use starbridge_sim::Engine;

use crate::client::{Client, ClientId, ClientState};
use crate::console::ConsoleTable;

/// Per-command outcome the caller (session loop) may want to react to —
/// currently only `sendComms`, which produces a `gameMessage` broadcast.
pub enum Effect {
    None,
    GameMessage { ship_index: u8, target_id: Option<i32> },
}

/// Applies one client command, validating its precondition (§4.7) first.
/// Preconditions that fail are silent no-ops, never surfaced to the client.
pub fn apply(
    client_id: ClientId,
    cmd: ClientCommand,
    clients: &mut HashMap<ClientId, Client>,
    consoles: &mut ConsoleTable,
    engine: &mut Engine,
) -> Effect {
    match cmd {
        ClientCommand::Heartbeat => Effect::None,
        ClientCommand::SetShip { ship_index } => {
            set_ship(client_id, ship_index.min(7), clients, consoles, engine);
            Effect::None
        }
        ClientCommand::SetConsole { console_type } => {
            if let Some(console) = ConsoleType::from_u8(console_type) {
                set_console(client_id, console, clients, consoles);
            }
            Effect::None
        }
        ClientCommand::Ready => {
            mark_ready(client_id, clients);
            Effect::None
        }
        ClientCommand::ToggleReverse => with_ship(client_id, clients, engine, |ship, console| {
            if console == ConsoleType::Helm {
                ship.reverse = !ship.reverse;
            }
        }),
        ClientCommand::SetImpulse { value } => with_ship(client_id, clients, engine, |ship, console| {
            if console == ConsoleType::Helm {
                ship.impulse = value.clamp(0.0, 1.0);
            }
        }),
        ClientCommand::SetWarp { value } => with_ship(client_id, clients, engine, |ship, console| {
            if console == ConsoleType::Helm {
                let warp = value.clamp(0, 4);
                ship.warp_factor = warp as u8;
                if warp > 0 {
                    ship.impulse = 0.0;
                }
            }
        }),
        ClientCommand::SetSteering { value } => with_ship(client_id, clients, engine, |ship, console| {
            if console == ConsoleType::Helm {
                ship.rudder = value.clamp(-1.0, 1.0);
            }
        }),
        ClientCommand::ClimbDive { value } => with_ship(client_id, clients, engine, |ship, console| {
            if console == ConsoleType::Helm {
                ship.pitch = value.clamp(-1.0, 1.0);
            }
        }),
        ClientCommand::RequestDock => Effect::None, // phase 4 auto-docks; see DESIGN.md
        ClientCommand::SetTarget { target_id } => with_ship(client_id, clients, engine, |ship, console| {
            if console == ConsoleType::Weapons {
                ship.target_id = entity_id_from_wire(target_id);
            }
        }),
        ClientCommand::FireTube { tube_index } => {
            let Some(client) = clients.get(&client_id) else { return Effect::None };
            if client.console != Some(ConsoleType::Weapons) {
                return Effect::None;
            }
            if let Some(ship_id) = client.ship_id {
                engine.fire_tube(ship_id, tube_index as usize);
            }
            Effect::None
        }
        ClientCommand::LoadTube { tube_index, ordnance_type } => {
            let Some(ordnance) = OrdnanceType::from_u8(ordnance_type) else { return Effect::None };
            with_ship(client_id, clients, engine, move |ship, console| {
                if console != ConsoleType::Weapons {
                    return;
                }
                let Some(tube) = ship.tubes.get_mut(tube_index as usize) else { return };
                if tube.state != TubeState::Empty {
                    return;
                }
                let idx = ordnance.index();
                if ship.ordnance_inventory[idx] == 0 {
                    return;
                }
                ship.ordnance_inventory[idx] -= 1;
                tube.ordnance_type = ordnance;
                tube.state = TubeState::Loading;
                tube.load_timer = starbridge_sim::tuning::LOAD_TIME_SEC;
            })
        }
        ClientCommand::UnloadTube { tube_index } => with_ship(client_id, clients, engine, move |ship, console| {
            if console != ConsoleType::Weapons {
                return;
            }
            let Some(tube) = ship.tubes.get_mut(tube_index as usize) else { return };
            if matches!(tube.state, TubeState::Loaded | TubeState::Loading) {
                tube.state = TubeState::Unloading;
                tube.load_timer = starbridge_sim::tuning::UNLOAD_TIME_SEC;
            }
        }),
        ClientCommand::ToggleAutoBeams => with_ship(client_id, clients, engine, |ship, console| {
            if console == ConsoleType::Weapons {
                ship.auto_beams = !ship.auto_beams;
            }
        }),
        ClientCommand::ToggleShields => with_ship(client_id, clients, engine, |ship, console| {
            if console == ConsoleType::Weapons {
                ship.shields_active = !ship.shields_active;
                if ship.shields_active {
                    ship.docked = false;
                    ship.docked_with = None;
                }
            }
        }),
        ClientCommand::SetBeamFrequency { value } => with_ship(client_id, clients, engine, |ship, console| {
            if console == ConsoleType::Weapons {
                ship.beam_frequency = value.min(starbridge_protocol::constants::BEAM_FREQUENCY_COUNT - 1);
            }
        }),
        ClientCommand::SetEnergy { system_index, value } => with_ship(client_id, clients, engine, move |ship, console| {
            if console != ConsoleType::Engineering {
                return;
            }
            let Some(idx) = SystemIndex::from_u8(system_index) else { return };
            let clamped = value.clamp(0.0, starbridge_sim::tuning::MAX_SYSTEM_ALLOCATION);
            let others: f32 = ship
                .systems
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != idx.index())
                .map(|(_, s)| s.energy_allocation)
                .sum();
            let budget_left = (starbridge_sim::tuning::ENERGY_BUDGET - others).max(0.0);
            ship.system_mut(idx).energy_allocation = clamped.min(budget_left);
        }),
        ClientCommand::SetCoolant { system_index, units } => with_ship(client_id, clients, engine, move |ship, console| {
            if console != ConsoleType::Engineering {
                return;
            }
            let Some(idx) = SystemIndex::from_u8(system_index) else { return };
            let others: u32 = ship
                .systems
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != idx.index())
                .map(|(_, s)| s.coolant as u32)
                .sum();
            let pool_left = (starbridge_sim::tuning::COOLANT_POOL as u32).saturating_sub(others);
            ship.system_mut(idx).coolant = (units as u32).min(pool_left) as u8;
        }),
        ClientCommand::ScanTarget { target_id } => with_ship(client_id, clients, engine, move |ship, console| {
            if console != ConsoleType::Science {
                return;
            }
            let Some(target_id) = entity_id_from_wire(target_id) else { return };
            ship.scan_progress = Some(starbridge_sim::entities::ScanProgress { target_id, elapsed: 0.0 });
        }),
        ClientCommand::SelectTarget { target_id } => {
            if let Some(client) = clients.get_mut(&client_id) {
                if client.console == Some(ConsoleType::Science) {
                    client.selected_target = entity_id_from_wire(target_id);
                }
            }
            Effect::None
        }
        ClientCommand::SetRedAlert { active } => with_ship(client_id, clients, engine, move |ship, _| {
            ship.red_alert = active;
        }),
        ClientCommand::SetMainScreen { view } => with_ship(client_id, clients, engine, move |ship, console| {
            if console == ConsoleType::MainScreen {
                if let Some(view) = MainScreenView::from_u8(view) {
                    ship.main_screen_view = view;
                }
            }
        }),
        ClientCommand::SendComms { target_id } => {
            let Some(client) = clients.get(&client_id) else { return Effect::None };
            if client.console != Some(ConsoleType::Communications) {
                return Effect::None;
            }
            let Some(ship_index) = client.ship_index else { return Effect::None };
            Effect::GameMessage { ship_index, target_id: Some(target_id) }
        }
    }
}

fn entity_id_from_wire(id: i32) -> Option<starbridge_sim::EntityId> {
    u32::try_from(id).ok()
}

/// Runs `f` against the client's ship if the client occupies `console`,
/// passing the console along so callers needing exactly one console can
/// check it inline. No-ops (silently) if the client has no ship yet.
fn with_ship(
    client_id: ClientId,
    clients: &mut HashMap<ClientId, Client>,
    engine: &mut Engine,
    f: impl FnOnce(&mut PlayerShip, ConsoleType),
) -> Effect {
    let Some(client) = clients.get(&client_id) else { return Effect::None };
    let Some(console) = client.console else { return Effect::None };
    let Some(ship_id) = client.ship_id else { return Effect::None };
    if let Some(ship) = engine.world_mut().player_ships.get_mut(&ship_id) {
        f(ship, console);
    }
    Effect::None
}

/// `setShip` (§4.7): releases any console the client holds, moves it to
/// `ShipSelected`, and spawns the player ship if this is the first client
/// to pick that index.
fn set_ship(
    client_id: ClientId,
    ship_index: u8,
    clients: &mut HashMap<ClientId, Client>,
    consoles: &mut ConsoleTable,
    engine: &mut Engine,
) {
    let Some(client) = clients.get(&client_id) else { return };
    if client.state as u8 > ClientState::Ready as u8 {
        return;
    }
    consoles.release_all(client_id);

    let ship_id = match engine.world().player_ship_by_index(ship_index) {
        Some(existing) => existing.id,
        None => {
            let id = engine.world_mut().ids.next();
            let name = starbridge_protocol::constants::PLAYER_SHIP_NAMES
                .get(ship_index as usize)
                .copied()
                .unwrap_or("Unnamed");
            engine.world_mut().player_ships.insert(id, PlayerShip::new(id, ship_index, name));
            id
        }
    };

    let client = clients.get_mut(&client_id).expect("checked above");
    client.ship_index = Some(ship_index);
    client.ship_id = Some(ship_id);
    client.console = None;
    client.state = ClientState::ShipSelected;
}

/// `setConsole` (§4.7): fails (no-op) if the console is already occupied
/// by someone else on this ship.
fn set_console(
    client_id: ClientId,
    console: ConsoleType,
    clients: &mut HashMap<ClientId, Client>,
    consoles: &mut ConsoleTable,
) {
    let Some(client) = clients.get(&client_id) else { return };
    if !matches!(client.state, ClientState::ShipSelected | ClientState::ConsoleSelected) {
        return;
    }
    let Some(ship_index) = client.ship_index else { return };
    consoles.release_all(client_id);
    if !consoles.occupy(ship_index, console, client_id) {
        return;
    }
    let client = clients.get_mut(&client_id).expect("checked above");
    client.console = Some(console);
    client.state = ClientState::ConsoleSelected;
}

fn mark_ready(client_id: ClientId, clients: &mut HashMap<ClientId, Client>) {
    if let Some(client) = clients.get_mut(&client_id) {
        if client.state == ClientState::ConsoleSelected {
            client.state = ClientState::Ready;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Transport;
    use std::time::Instant;

    fn new_engine_with_client() -> (Engine, HashMap<ClientId, Client>, ConsoleTable) {
        let world = starbridge_sim::World::new();
        let engine = Engine::new(world, 1);
        let mut clients = HashMap::new();
        let (tx, _rx) = flume::unbounded();
        clients.insert(1, Client::new(1, "127.0.0.1:0".to_string(), Transport::Tcp { outgoing: tx }, Instant::now()));
        (engine, clients, ConsoleTable::new())
    }

    #[test]
    fn set_ship_then_set_console_progresses_state() {
        let (mut engine, mut clients, mut consoles) = new_engine_with_client();
        apply(1, ClientCommand::SetShip { ship_index: 0 }, &mut clients, &mut consoles, &mut engine);
        assert_eq!(clients[&1].state, ClientState::ShipSelected);
        assert_eq!(engine.world().player_ships.len(), 1);

        apply(1, ClientCommand::SetConsole { console_type: ConsoleType::Helm as u8 }, &mut clients, &mut consoles, &mut engine);
        assert_eq!(clients[&1].state, ClientState::ConsoleSelected);
        assert_eq!(clients[&1].console, Some(ConsoleType::Helm));
    }

    #[test]
    fn second_client_cannot_take_an_occupied_console() {
        let (mut engine, mut clients, mut consoles) = new_engine_with_client();
        let (tx, _rx) = flume::unbounded();
        clients.insert(2, Client::new(2, "127.0.0.1:0".to_string(), Transport::Tcp { outgoing: tx }, Instant::now()));

        apply(1, ClientCommand::SetShip { ship_index: 0 }, &mut clients, &mut consoles, &mut engine);
        apply(1, ClientCommand::SetConsole { console_type: ConsoleType::Helm as u8 }, &mut clients, &mut consoles, &mut engine);
        apply(2, ClientCommand::SetShip { ship_index: 0 }, &mut clients, &mut consoles, &mut engine);
        apply(2, ClientCommand::SetConsole { console_type: ConsoleType::Helm as u8 }, &mut clients, &mut consoles, &mut engine);

        assert_eq!(clients[&2].state, ClientState::ShipSelected);
        assert_eq!(clients[&2].console, None);
    }

    #[test]
    fn set_impulse_is_ignored_off_the_helm_console() {
        let (mut engine, mut clients, mut consoles) = new_engine_with_client();
        apply(1, ClientCommand::SetShip { ship_index: 0 }, &mut clients, &mut consoles, &mut engine);
        apply(1, ClientCommand::SetConsole { console_type: ConsoleType::Weapons as u8 }, &mut clients, &mut consoles, &mut engine);
        apply(1, ClientCommand::SetImpulse { value: 0.75 }, &mut clients, &mut consoles, &mut engine);

        let ship = engine.world().player_ships.values().next().unwrap();
        assert_eq!(ship.impulse, 0.0);
    }

    #[test]
    fn set_impulse_clamps_out_of_range_values() {
        let (mut engine, mut clients, mut consoles) = new_engine_with_client();
        apply(1, ClientCommand::SetShip { ship_index: 0 }, &mut clients, &mut consoles, &mut engine);
        apply(1, ClientCommand::SetConsole { console_type: ConsoleType::Helm as u8 }, &mut clients, &mut consoles, &mut engine);
        apply(1, ClientCommand::SetImpulse { value: 5.0 }, &mut clients, &mut consoles, &mut engine);

        let ship = engine.world().player_ships.values().next().unwrap();
        assert_eq!(ship.impulse, 1.0);
    }
}
