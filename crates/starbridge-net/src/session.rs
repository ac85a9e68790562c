//! Session loop (§4.6, §5): the single task that owns `World`, `Engine`,
//! the client table and the console table. Every other task (TCP reader
//! task, WS reader task) only ever reaches this state through
//! [`SessionEvent`]s sent over a channel; the loop itself never awaits,
//! preserving the single-writer invariant (§5).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use starbridge_protocol::constants::ConsoleType;
use starbridge_protocol::ClientCommand;
use starbridge_sim::{Engine, World};
use tracing::{debug, info, warn};

use crate::broadcast;
use crate::client::{Client, ClientId, ClientState, Transport};
use crate::commands::{self, Effect};
use crate::console::ConsoleTable;
use crate::heartbeat::{HeartbeatClock, CLIENT_TIMEOUT_SECS};
use crate::json_proto::{ServerMessage, Version};

/// Startup configuration (§4.6 "Configuration"). Overridable by
/// environment variables read once in `main.rs`.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub tcp_port: u16,
    pub ws_port: u16,
    pub max_packet_size: u32,
    pub tick_hz: f32,
    pub broadcast_divisor: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tcp_port: 2010,
            ws_port: 2011,
            max_packet_size: starbridge_protocol::constants::MAX_PACKET_SIZE,
            tick_hz: starbridge_sim::tuning::TICK_HZ,
            broadcast_divisor: starbridge_sim::tuning::BROADCAST_TICK_DIVISOR,
        }
    }
}

/// What a reader task (TCP or WS) hands to the session loop.
pub enum SessionEvent {
    Connected { id: ClientId, remote_address: String, transport: Transport },
    Command { id: ClientId, cmd: ClientCommand },
    Disconnected { id: ClientId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GamePhase {
    PreGame,
    InGame,
    PostGame,
}

pub struct SessionServer {
    config: ServerConfig,
    engine: Engine,
    clients: HashMap<ClientId, Client>,
    consoles: ConsoleTable,
    phase: GamePhase,
    tick_count: u64,
    heartbeat_clock: HeartbeatClock,
    last_nebula_broadcast: Instant,
}

const NEBULA_BROADCAST_INTERVAL: Duration = Duration::from_secs(5);
const PROTOCOL_VERSION: Version = Version { major: 1, minor: 0, patch: 0 };

impl SessionServer {
    pub fn new(config: ServerConfig, mut world: World, rng_seed: u64) -> Self {
        starbridge_sim::scenario::bootstrap(&mut world);
        let now = Instant::now();
        Self {
            config,
            engine: Engine::new(world, rng_seed),
            clients: HashMap::new(),
            consoles: ConsoleTable::new(),
            phase: GamePhase::PreGame,
            tick_count: 0,
            heartbeat_clock: HeartbeatClock::new(now),
            last_nebula_broadcast: now,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn world(&self) -> &starbridge_sim::World {
        self.engine.world()
    }

    pub fn world_mut(&mut self) -> &mut starbridge_sim::World {
        self.engine.world_mut()
    }

    /// Drains every pending event, applying commands in arrival order
    /// before the next tick starts (§5 "Ordering guarantees").
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected { id, remote_address, transport } => {
                self.accept(id, remote_address, transport);
            }
            SessionEvent::Command { id, cmd } => self.apply_command(id, cmd),
            SessionEvent::Disconnected { id } => self.remove_client(id),
        }
    }

    fn accept(&mut self, id: ClientId, remote_address: String, transport: Transport) {
        info!(client = id, addr = %remote_address, "client connected");
        let is_tcp = matches!(transport, Transport::Tcp { .. });
        let client = Client::new(id, remote_address, transport, Instant::now());
        self.clients.insert(id, client);
        if is_tcp {
            self.greet_tcp(id);
        } else {
            self.greet_ws(id);
        }
    }

    fn greet_tcp(&mut self, id: ClientId) {
        let console_status = self.console_status_packet(0);
        let Some(client) = self.clients.get_mut(&id) else { return };
        client.send_binary(tcp_greeting());
        client.send_binary(tcp_version());
        client.send_binary(console_status);
        client.greeted = true;
    }

    fn greet_ws(&mut self, id: ClientId) {
        let Some(client) = self.clients.get_mut(&id) else { return };
        let welcome = ServerMessage::Welcome { version: PROTOCOL_VERSION.clone() };
        if let Ok(json) = serde_json::to_string(&welcome) {
            client.send_json(json);
        }
        client.greeted = true;
    }

    fn apply_command(&mut self, id: ClientId, cmd: ClientCommand) {
        let Some(client) = self.clients.get_mut(&id) else { return };
        client.touch(Instant::now());
        let notify_console = matches!(cmd, ClientCommand::SetConsole { .. } | ClientCommand::SetShip { .. });
        let effect = commands::apply(id, cmd, &mut self.clients, &mut self.consoles, &mut self.engine);
        self.handle_effect(effect);
        if notify_console {
            if let Some(ship_index) = self.clients.get(&id).and_then(|c| c.ship_index) {
                self.broadcast_console_status(ship_index);
            }
        }
        self.maybe_start_game();
    }

    /// Sends the current console-occupation flags for `ship_index` to every
    /// client on that ship (§4.7 `setConsole`/`setShip`: occupancy changes
    /// are broadcast, not just acknowledged to the requester).
    fn broadcast_console_status(&self, ship_index: u8) {
        let tcp_packet = self.console_status_packet(ship_index);
        let ws_message = ServerMessage::ConsoleStatus {
            ship_index,
            consoles: self.consoles.status_flags(ship_index),
        };
        let ws_json = serde_json::to_string(&ws_message).ok();
        for client in self.clients.values() {
            if client.ship_index != Some(ship_index) {
                continue;
            }
            client.send_binary(tcp_packet.clone());
            if let Some(json) = &ws_json {
                client.send_json(json.clone());
            }
        }
    }

    fn handle_effect(&mut self, effect: Effect) {
        if let Effect::GameMessage { ship_index, target_id } = effect {
            let message = match target_id {
                Some(id) => format!("Incoming transmission (ref {id})"),
                None => "Incoming transmission".to_string(),
            };
            self.broadcast_to_ship(ship_index, &message);
        }
    }

    fn broadcast_to_ship(&self, ship_index: u8, message: &str) {
        let tcp_packet = broadcast::game_message(message);
        let ws_message = ServerMessage::GameMessage { message: message.to_string() };
        for client in self.clients.values() {
            if client.ship_index == Some(ship_index) {
                client.send_binary(tcp_packet.clone());
                if let Ok(json) = serde_json::to_string(&ws_message) {
                    client.send_json(json);
                }
            }
        }
    }

    /// §4.6 "Game start": transitions to `InGame` once at least one
    /// client is `Ready`.
    fn maybe_start_game(&mut self) {
        if self.phase != GamePhase::PreGame {
            return;
        }
        if !self.clients.values().any(|c| c.state == ClientState::Ready) {
            return;
        }
        self.phase = GamePhase::InGame;
        for client in self.clients.values_mut() {
            if client.state == ClientState::Ready {
                client.state = ClientState::InGame;
            }
        }
        info!("game start");
        let tcp_packet = broadcast::game_start();
        for client in self.clients.values() {
            client.send_binary(tcp_packet.clone());
            if let Ok(json) = serde_json::to_string(&ServerMessage::GameStart) {
                client.send_json(json);
            }
        }
    }

    fn remove_client(&mut self, id: ClientId) {
        if self.clients.remove(&id).is_some() {
            self.consoles.release_all(id);
            debug!(client = id, "client removed");
        }
    }

    /// Runs one simulation tick plus, on a broadcast tick, encodes and
    /// sends world state to every `InGame` client (§4.6 "Broadcast
    /// schedule"). Returns false once the game has ended and the final
    /// broadcast has been sent.
    pub fn step(&mut self) -> bool {
        self.evict_timed_out_clients();
        self.maybe_send_heartbeats();

        if self.phase != GamePhase::InGame {
            return true;
        }

        let changes = self.engine.tick(1.0 / self.config.tick_hz);
        self.tick_count += 1;

        if self.tick_count % self.config.broadcast_divisor == 0 {
            self.broadcast_tick(&changes);
        }

        if let Some(outcome) = self.engine.outcome() {
            self.end_game(outcome);
            return false;
        }
        true
    }

    fn broadcast_tick(&mut self, changes: &starbridge_sim::ChangeSet) {
        let now = Instant::now();
        let include_nebulae = now.duration_since(self.last_nebula_broadcast) >= NEBULA_BROADCAST_INTERVAL;
        if include_nebulae {
            self.last_nebula_broadcast = now;
        }

        let world = self.engine.world();
        let tcp_packets = broadcast::tcp_broadcast(world, changes, include_nebulae);
        let snapshot = broadcast::world_snapshot(world);
        let destroy_messages = broadcast::ws_destroy_messages(changes);
        let world_update = ServerMessage::WorldUpdate { world: snapshot };
        let world_update_json = serde_json::to_string(&world_update).ok();
        let destroy_json: Vec<String> =
            destroy_messages.iter().filter_map(|m| serde_json::to_string(m).ok()).collect();

        for client in self.clients.values() {
            if client.state != ClientState::InGame {
                continue;
            }
            for packet in &tcp_packets {
                client.send_binary(packet.clone());
            }
            if let Some(json) = &world_update_json {
                client.send_json(json.clone());
            }
            for json in &destroy_json {
                client.send_json(json.clone());
            }
            if let Some(ship_id) = client.ship_id {
                if let Some(ship) = world.player_ships.get(&ship_id) {
                    if let Ok(json) = serde_json::to_string(&ServerMessage::ShipUpdate { ship: ship.clone() }) {
                        client.send_json(json);
                    }
                }
            }
        }
    }

    fn end_game(&mut self, outcome: starbridge_sim::Outcome) {
        self.phase = GamePhase::PostGame;
        info!(?outcome, "game over");
        let tcp_packet = broadcast::game_over();
        let ws_message = ServerMessage::GameOver { outcome };
        let ws_json = serde_json::to_string(&ws_message).ok();
        for client in self.clients.values_mut() {
            client.send_binary(tcp_packet.clone());
            if let Some(json) = &ws_json {
                client.send_json(json.clone());
            }
            if client.state == ClientState::InGame {
                client.state = ClientState::PostGame;
            }
        }
    }

    fn maybe_send_heartbeats(&mut self) {
        if !self.heartbeat_clock.due(Instant::now()) {
            return;
        }
        let tcp_packet = broadcast::server_heartbeat();
        for client in self.clients.values() {
            if client.greeted || client.state == ClientState::InGame {
                client.send_binary(tcp_packet.clone());
                if let Ok(json) = serde_json::to_string(&ServerMessage::Heartbeat) {
                    client.send_json(json);
                }
            }
        }
    }

    fn evict_timed_out_clients(&mut self) {
        let now = Instant::now();
        let timed_out: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|(_, c)| c.is_timed_out(now, CLIENT_TIMEOUT_SECS))
            .map(|(id, _)| *id)
            .collect();
        for id in timed_out {
            warn!(client = id, "client heartbeat timeout");
            self.remove_client(id);
        }
    }

    /// Console occupation flags for `consoleStatus` (sent on TCP accept
    /// and whenever a client's `setConsole` changes the table).
    pub fn console_status_packet(&self, ship_index: u8) -> bytes::Bytes {
        broadcast::console_status(ship_index, self.consoles.status_flags(ship_index))
    }

    /// Final `GAME_OVER`-like broadcast sent on a shutdown signal, even if
    /// the game never actually ended (§5 "Server shutdown").
    pub fn shutdown_broadcast(&mut self) {
        let tcp_packet = broadcast::game_over();
        let ws_json = serde_json::to_string(&ServerMessage::GameOver {
            outcome: starbridge_sim::Outcome::Loss,
        })
        .ok();
        for client in self.clients.values() {
            client.send_binary(tcp_packet.clone());
            if let Some(json) = &ws_json {
                client.send_json(json.clone());
            }
        }
    }
}

fn tcp_greeting() -> bytes::Bytes {
    use bytes::BufMut;
    use starbridge_protocol::constants::{Origin, PacketType};
    use starbridge_protocol::header::Header;

    const GREETING: &[u8] = b"Welcome to Starbridge";
    let mut buf = Header::write(Origin::Server as u32, PacketType::PlainTextGreeting as u32, GREETING.len());
    buf.put_slice(GREETING);
    buf.freeze()
}

fn tcp_version() -> bytes::Bytes {
    use bytes::BufMut;
    use starbridge_protocol::constants::{Origin, PacketType};
    use starbridge_protocol::header::Header;

    let mut payload = bytes::BytesMut::new();
    payload.put_u32_le(PROTOCOL_VERSION.major);
    payload.put_u32_le(PROTOCOL_VERSION.minor);
    payload.put_u32_le(PROTOCOL_VERSION.patch);
    let mut buf = Header::write(Origin::Server as u32, PacketType::Version as u32, payload.len());
    buf.extend_from_slice(&payload);
    buf.freeze()
}

/// Translates a WS `join` message's console tag into the shared
/// `ClientCommand` pair the TCP path already speaks, so both transports
/// drive the exact same validator (§4.6 "Command dispatch").
pub fn join_to_commands(ship_index: u8, console: ConsoleType) -> [ClientCommand; 2] {
    [
        ClientCommand::SetShip { ship_index },
        ClientCommand::SetConsole { console_type: console as u8 },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_server() -> SessionServer {
        SessionServer::new(ServerConfig::default(), World::new(), 1)
    }

    #[test]
    fn game_does_not_start_with_no_ready_clients() {
        let mut server = new_server();
        let (tx, _rx) = flume::unbounded();
        server.handle_event(SessionEvent::Connected {
            id: 1,
            remote_address: "127.0.0.1:1".to_string(),
            transport: Transport::Tcp { outgoing: tx },
        });
        assert!(server.step());
        assert_eq!(server.phase, GamePhase::PreGame);
    }

    #[test]
    fn one_ready_client_starts_the_game() {
        let mut server = new_server();
        let (tx, _rx) = flume::unbounded();
        server.handle_event(SessionEvent::Connected {
            id: 1,
            remote_address: "127.0.0.1:1".to_string(),
            transport: Transport::Tcp { outgoing: tx },
        });
        server.handle_event(SessionEvent::Command { id: 1, cmd: ClientCommand::SetShip { ship_index: 0 } });
        server.handle_event(SessionEvent::Command {
            id: 1,
            cmd: ClientCommand::SetConsole { console_type: ConsoleType::Helm as u8 },
        });
        server.handle_event(SessionEvent::Command { id: 1, cmd: ClientCommand::Ready });
        assert_eq!(server.phase, GamePhase::InGame);
        assert_eq!(server.clients[&1].state, ClientState::InGame);
    }

    #[test]
    fn disconnect_releases_console() {
        let mut server = new_server();
        let (tx, _rx) = flume::unbounded();
        server.handle_event(SessionEvent::Connected {
            id: 1,
            remote_address: "127.0.0.1:1".to_string(),
            transport: Transport::Tcp { outgoing: tx },
        });
        server.handle_event(SessionEvent::Command { id: 1, cmd: ClientCommand::SetShip { ship_index: 0 } });
        server.handle_event(SessionEvent::Command {
            id: 1,
            cmd: ClientCommand::SetConsole { console_type: ConsoleType::Helm as u8 },
        });
        server.handle_event(SessionEvent::Disconnected { id: 1 });
        assert!(server.consoles.is_free(0, ConsoleType::Helm));
    }
}
