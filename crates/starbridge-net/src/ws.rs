//! JSON WebSocket transport (§6.2). Mirrors `tcp.rs`'s reader/writer task
//! split, but over `tokio_tungstenite`'s `StreamExt`/`SinkExt` split
//! instead of raw socket halves, and speaks JSON text messages instead of
//! length-prefixed binary frames.

use std::sync::atomic::{AtomicU32, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::client::Transport;
use crate::json_proto::ClientMessage;
use crate::session::{join_to_commands, SessionEvent};

static NEXT_CLIENT_ID: AtomicU32 = AtomicU32::new(1_000_000);

/// Binds the WS listener and accepts connections until the socket is
/// closed or a bind error occurs.
pub async fn accept_loop(port: u16, events_tx: flume::Sender<SessionEvent>) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    loop {
        let (stream, remote_addr) = listener.accept().await?;
        let events_tx = events_tx.clone();
        let id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(async move {
            handle_connection(id, stream, remote_addr.to_string(), events_tx).await;
        });
    }
}

async fn handle_connection(
    id: crate::client::ClientId,
    stream: TcpStream,
    remote_address: String,
    events_tx: flume::Sender<SessionEvent>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!(client = id, "WS handshake failed: {e}");
            return;
        }
    };
    let (mut sink, mut stream) = ws.split();

    let (outgoing_tx, outgoing_rx) = flume::unbounded::<String>();
    let _ = events_tx.send(SessionEvent::Connected {
        id,
        remote_address,
        transport: Transport::Ws { outgoing: outgoing_tx },
    });

    let writer_task = tokio::spawn(async move {
        while let Ok(text) = outgoing_rx.recv_async().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                debug!(client = id, "WS read error, closing connection: {e}");
                break;
            }
        };
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(parsed) => dispatch(id, parsed, &events_tx),
                Err(e) => {
                    debug!(client = id, "invalid WS JSON, closing connection: {e}");
                    break;
                }
            },
            Message::Close(_) => break,
            _ => {} // ping/pong/binary: any inbound message counts as a heartbeat (§4.6)
        }
    }

    let _ = events_tx.send(SessionEvent::Disconnected { id });
    writer_task.abort();
}

fn dispatch(id: crate::client::ClientId, msg: ClientMessage, events_tx: &flume::Sender<SessionEvent>) {
    match msg {
        ClientMessage::Join { ship_index, console_type, player_name: _ } => {
            let Some(console_type) = starbridge_protocol::constants::ConsoleType::from_u8(console_type) else {
                debug!(client = id, console_type, "dropping join with unknown console type");
                return;
            };
            for cmd in join_to_commands(ship_index, console_type) {
                let _ = events_tx.send(SessionEvent::Command { id, cmd });
            }
        }
        ClientMessage::Ready => {
            let _ = events_tx.send(SessionEvent::Command {
                id,
                cmd: starbridge_protocol::ClientCommand::Ready,
            });
        }
        ClientMessage::Heartbeat => {
            let _ = events_tx.send(SessionEvent::Command {
                id,
                cmd: starbridge_protocol::ClientCommand::Heartbeat,
            });
        }
        ClientMessage::Command { command, params } => {
            if let Some(cmd) = decode_ws_command(&command, &params) {
                let _ = events_tx.send(SessionEvent::Command { id, cmd });
            }
        }
    }
}

/// Maps a WS `{command, params}` pair onto the same `ClientCommand` shape
/// the binary wire decodes into (§4.6 "both map to the same command
/// table"). Unknown names or malformed params are dropped silently,
/// matching §4.7's "references to non-existent ids are dropped silently"
/// posture extended to malformed commands in general.
fn decode_ws_command(command: &str, params: &serde_json::Value) -> Option<starbridge_protocol::ClientCommand> {
    use starbridge_protocol::ClientCommand;

    let num = |key: &str| params.get(key).and_then(serde_json::Value::as_f64);
    let int = |key: &str| params.get(key).and_then(serde_json::Value::as_i64);

    Some(match command {
        "setShip" => ClientCommand::SetShip { ship_index: int("shipIndex")? as u8 },
        "setConsole" => ClientCommand::SetConsole { console_type: int("consoleType")? as u8 },
        "setImpulse" => ClientCommand::SetImpulse { value: num("value")? as f32 },
        "setWarp" => ClientCommand::SetWarp { value: int("value")? as i32 },
        "setSteering" => ClientCommand::SetSteering { value: num("value")? as f32 },
        "climbDive" => ClientCommand::ClimbDive { value: num("value")? as f32 },
        "toggleReverse" => ClientCommand::ToggleReverse,
        "requestDock" => ClientCommand::RequestDock,
        "setTarget" => ClientCommand::SetTarget { target_id: int("targetId")? as i32 },
        "fireTube" => ClientCommand::FireTube { tube_index: int("tubeIndex")? as u8 },
        "loadTube" => ClientCommand::LoadTube {
            tube_index: int("tubeIndex")? as u8,
            ordnance_type: int("ordnanceType")? as u8,
        },
        "unloadTube" => ClientCommand::UnloadTube { tube_index: int("tubeIndex")? as u8 },
        "toggleAutoBeams" => ClientCommand::ToggleAutoBeams,
        "toggleShields" => ClientCommand::ToggleShields,
        "setBeamFrequency" => ClientCommand::SetBeamFrequency { value: int("value")? as u8 },
        "setEnergy" => ClientCommand::SetEnergy {
            system_index: int("systemIndex")? as u8,
            value: num("value")? as f32,
        },
        "setCoolant" => ClientCommand::SetCoolant {
            system_index: int("systemIndex")? as u8,
            units: int("units")? as u8,
        },
        "scanTarget" => ClientCommand::ScanTarget { target_id: int("targetId")? as i32 },
        "selectTarget" => ClientCommand::SelectTarget { target_id: int("targetId")? as i32 },
        "setRedAlert" => ClientCommand::SetRedAlert { active: params.get("active")?.as_bool()? },
        "setMainScreen" => ClientCommand::SetMainScreen { view: int("view")? as u8 },
        "sendComms" => ClientCommand::SendComms { target_id: int("targetId")? as i32 },
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_ws_command_maps_known_names() {
        let params = serde_json::json!({"value": 0.5});
        let cmd = decode_ws_command("setImpulse", &params).unwrap();
        assert_eq!(cmd, starbridge_protocol::ClientCommand::SetImpulse { value: 0.5 });
    }

    #[test]
    fn decode_ws_command_drops_unknown_names() {
        let params = serde_json::json!({});
        assert!(decode_ws_command("doTheImpossible", &params).is_none());
    }

    #[test]
    fn decode_ws_command_drops_missing_params() {
        let params = serde_json::json!({});
        assert!(decode_ws_command("setImpulse", &params).is_none());
    }
}
