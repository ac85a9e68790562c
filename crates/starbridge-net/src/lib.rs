//! Session server (C6): dual TCP/WS listeners, client records, the
//! console-occupation table, command dispatch, and broadcast scheduling
//! described in spec §4.6.

pub mod broadcast;
pub mod client;
pub mod commands;
pub mod console;
pub mod heartbeat;
pub mod json_proto;
pub mod session;
pub mod tcp;
pub mod ws;

pub use client::{Client, ClientId, ClientState, Transport};
pub use console::ConsoleTable;
pub use session::{ServerConfig, SessionEvent, SessionServer};
