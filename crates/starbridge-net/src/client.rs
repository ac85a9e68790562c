//! Per-connection state machine (§4.6 "Per-client state machine").

use std::time::Instant;

use starbridge_protocol::constants::ConsoleType;
use starbridge_sim::EntityId;

pub type ClientId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Connected,
    ShipSelected,
    ConsoleSelected,
    Ready,
    InGame,
    PostGame,
}

/// One connected client. Owned exclusively by the session loop (§5); the
/// reader/writer tasks never see this struct.
pub struct Client {
    pub id: ClientId,
    pub remote_address: String,
    pub state: ClientState,
    pub transport: Transport,
    pub ship_index: Option<u8>,
    pub ship_id: Option<EntityId>,
    pub console: Option<ConsoleType>,
    pub player_name: Option<String>,
    pub selected_target: Option<EntityId>,
    pub last_heartbeat: Instant,
    pub greeted: bool,
}

/// Which listener accepted this client, and the channel to push encoded
/// frames to its writer task.
pub enum Transport {
    Tcp { outgoing: flume::Sender<bytes::Bytes> },
    Ws { outgoing: flume::Sender<String> },
}

impl Client {
    pub fn new(id: ClientId, remote_address: String, transport: Transport, now: Instant) -> Self {
        Self {
            id,
            remote_address,
            state: ClientState::Connected,
            transport,
            ship_index: None,
            ship_id: None,
            console: None,
            player_name: None,
            selected_target: None,
            last_heartbeat: now,
            greeted: false,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_heartbeat = now;
    }

    pub fn is_timed_out(&self, now: Instant, timeout_secs: f32) -> bool {
        now.duration_since(self.last_heartbeat).as_secs_f32() > timeout_secs
    }

    pub fn send_binary(&self, bytes: bytes::Bytes) {
        if let Transport::Tcp { outgoing } = &self.transport {
            let _ = outgoing.try_send(bytes);
        }
    }

    pub fn send_json(&self, text: String) {
        if let Transport::Ws { outgoing } = &self.transport {
            let _ = outgoing.try_send(text);
        }
    }
}
