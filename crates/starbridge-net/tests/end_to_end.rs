//! End-to-end session scenarios: spin up a `SessionServer` bound to an
//! ephemeral port and drive it with a real client over both transports.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use starbridge_net::client::Transport;
use starbridge_net::session::{ServerConfig, SessionEvent, SessionServer};
use starbridge_protocol::constants::{ConsoleType, OrdnanceType};
use starbridge_protocol::ClientCommand;
use starbridge_sim::World;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

/// Binds an ephemeral port, then runs `accept_loop` and a ticking
/// `SessionServer` in the background until the test ends.
async fn spawn_ws_session() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (events_tx, events_rx) = flume::unbounded::<SessionEvent>();
    tokio::spawn(starbridge_net::ws::accept_loop(port, events_tx));

    tokio::spawn(async move {
        let mut session = SessionServer::new(ServerConfig::default(), World::new(), 42);
        let mut ticker = tokio::time::interval(Duration::from_millis(5));
        loop {
            tokio::select! {
                event = events_rx.recv_async() => {
                    match event {
                        Ok(event) => session.handle_event(event),
                        Err(_) => break,
                    }
                }
                _ = ticker.tick() => { session.step(); }
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    port
}

async fn recv_json(
    ws: &mut (impl StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin),
) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("message arrived in time")
        .expect("stream open")
        .expect("no transport error");
    match msg {
        Message::Text(text) => serde_json::from_str(&text).expect("valid JSON"),
        other => panic!("expected a text message, got {other:?}"),
    }
}

#[tokio::test]
async fn join_and_ready_over_websocket_starts_the_game() {
    let port = spawn_ws_session().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}"))
        .await
        .expect("handshake succeeds");

    let welcome = recv_json(&mut ws).await;
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["version"]["major"], 1);

    ws.send(Message::Text(
        r#"{"type":"join","shipIndex":0,"consoleType":0,"playerName":"Kirk"}"#.into(),
    ))
    .await
    .unwrap();

    // `join` dispatches as a `setShip` followed by a `setConsole`, each of
    // which broadcasts `consoleStatus`; the second reflects the occupied
    // helm slot.
    recv_json(&mut ws).await;
    let console_status = recv_json(&mut ws).await;
    assert_eq!(console_status["type"], "consoleStatus");
    assert_eq!(console_status["shipIndex"], 0);
    assert_eq!(console_status["consoles"][0], true);
    for i in 1..11 {
        assert_eq!(console_status["consoles"][i], false);
    }

    ws.send(Message::Text(r#"{"type":"ready"}"#.into())).await.unwrap();

    let game_start = recv_json(&mut ws).await;
    assert_eq!(game_start["type"], "gameStart");
}

#[tokio::test]
async fn second_client_is_refused_an_occupied_console() {
    let port = spawn_ws_session().await;

    let (mut first, _) = tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}")).await.unwrap();
    recv_json(&mut first).await; // welcome
    first
        .send(Message::Text(
            r#"{"type":"join","shipIndex":0,"consoleType":0,"playerName":"Kirk"}"#.into(),
        ))
        .await
        .unwrap();
    recv_json(&mut first).await; // consoleStatus from setShip
    recv_json(&mut first).await; // consoleStatus from setConsole

    let (mut second, _) = tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}")).await.unwrap();
    recv_json(&mut second).await; // welcome
    second
        .send(Message::Text(
            r#"{"type":"join","shipIndex":0,"consoleType":0,"playerName":"Spock"}"#.into(),
        ))
        .await
        .unwrap();

    // Both of second's setShip/setConsole broadcasts report the helm slot
    // as still occupied by the first client, since `occupy` refused the
    // second client's attempt.
    recv_json(&mut second).await;
    let console_status = recv_json(&mut second).await;
    assert_eq!(console_status["type"], "consoleStatus");
    assert_eq!(console_status["consoles"][0], true);
}

#[tokio::test]
async fn tcp_client_receives_greeting_version_and_console_status() {
    use starbridge_protocol::constants::PacketType;
    use starbridge_protocol::StreamParser;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (events_tx, events_rx) = flume::unbounded::<SessionEvent>();
    tokio::spawn(starbridge_net::tcp::accept_loop(
        port,
        events_tx,
        starbridge_protocol::constants::MAX_PACKET_SIZE,
    ));
    tokio::spawn(async move {
        let mut session = SessionServer::new(ServerConfig::default(), World::new(), 7);
        loop {
            match events_rx.recv_async().await {
                Ok(event) => session.handle_event(event),
                Err(_) => break,
            }
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let mut parser = StreamParser::new();
    let mut buf = [0u8; 1024];

    let mut frames = Vec::new();
    while frames.len() < 3 {
        let n = stream.read(&mut buf).await.unwrap();
        parser.push(&buf[..n]);
        frames.extend(parser.drain().unwrap());
    }

    assert_eq!(frames[0].header.packet_type, PacketType::PlainTextGreeting as u32);
    assert_eq!(frames[1].header.packet_type, PacketType::Version as u32);
    assert_eq!(frames[2].header.packet_type, PacketType::ConsoleStatus as u32);
}

/// A single garbage byte spliced into the stream between two valid
/// packets must not cost more than the packet it corrupts: the parser
/// resyncs on the next magic prefix and every packet after it decodes
/// cleanly.
#[tokio::test]
async fn a_garbage_byte_between_packets_only_costs_that_packet() {
    use starbridge_protocol::constants::PacketType;
    use starbridge_protocol::StreamParser;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (events_tx, events_rx) = flume::unbounded::<SessionEvent>();
    tokio::spawn(starbridge_net::tcp::accept_loop(
        port,
        events_tx,
        starbridge_protocol::constants::MAX_PACKET_SIZE,
    ));
    tokio::spawn(async move {
        let mut session = SessionServer::new(ServerConfig::default(), World::new(), 7);
        loop {
            match events_rx.recv_async().await {
                Ok(event) => session.handle_event(event),
                Err(_) => break,
            }
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

    // Collect the raw greeting+version+console-status bytes exactly as
    // they left the server, then splice a garbage byte between the
    // version and console-status packets before handing the corrupted
    // buffer to a fresh parser — isolating the resync behavior from
    // however the socket happened to chunk the reads.
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).await.unwrap();
        raw.extend_from_slice(&buf[..n]);
        let mut probe = StreamParser::new();
        probe.push(&raw);
        if probe.drain().unwrap().len() >= 3 {
            break;
        }
    }

    let mut probe = StreamParser::new();
    probe.push(&raw);
    let clean_frames = probe.drain().unwrap();
    assert_eq!(clean_frames.len(), 3);
    let corrupt_at = (clean_frames[0].header.total + clean_frames[1].header.total) as usize;

    let mut corrupted = raw[..corrupt_at].to_vec();
    corrupted.push(0xFF);
    corrupted.extend_from_slice(&raw[corrupt_at..]);

    let mut parser = StreamParser::new();
    parser.push(&corrupted);
    let frames = parser.drain().unwrap();

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].header.packet_type, PacketType::PlainTextGreeting as u32);
    assert_eq!(frames[1].header.packet_type, PacketType::Version as u32);
    assert_eq!(frames[2].header.packet_type, PacketType::ConsoleStatus as u32);
}

// The remaining scenarios drive a `SessionServer` directly through the
// same `SessionEvent`s a TCP/WS reader task would forward, rather than
// through an actual socket — the command dispatch and tick loop are
// exactly what S1's WS client exercises over the wire, so this reaches
// the identical code path while letting each scenario seed preconditions
// (ordnance stock, ship position) that would otherwise take minutes of
// simulated time to reach via docking/travel alone.

fn new_session() -> SessionServer {
    SessionServer::new(ServerConfig::default(), World::new(), 99)
}

/// Connects a client, selects `ship_index`'s ship, occupies `console`,
/// and leaves it there — one step short of `Ready` so the caller can
/// seed world state before the game clock starts.
fn join_ship(session: &mut SessionServer, client_id: u32, ship_index: u8, console: ConsoleType) {
    let (tx, _rx) = flume::unbounded();
    session.handle_event(SessionEvent::Connected {
        id: client_id,
        remote_address: "127.0.0.1:1".to_string(),
        transport: Transport::Tcp { outgoing: tx },
    });
    session.handle_event(SessionEvent::Command { id: client_id, cmd: ClientCommand::SetShip { ship_index } });
    session.handle_event(SessionEvent::Command {
        id: client_id,
        cmd: ClientCommand::SetConsole { console_type: console as u8 },
    });
}

fn ready(session: &mut SessionServer, client_id: u32) {
    session.handle_event(SessionEvent::Command { id: client_id, cmd: ClientCommand::Ready });
}

#[test]
fn impulse_command_accelerates_the_ship_to_steady_state_speed() {
    let mut session = new_session();
    join_ship(&mut session, 1, 0, ConsoleType::Helm);
    ready(&mut session, 1);

    session.handle_event(SessionEvent::Command { id: 1, cmd: ClientCommand::SetImpulse { value: 0.5 } });

    let start_position = session.world().player_ships.values().next().unwrap().position;
    for _ in 0..200 {
        // 200 ticks at 20Hz = 10 simulated seconds, far past the ~0.67s
        // ramp time at full ACCEL, so velocity has fully settled.
        session.step();
    }

    let ship = session.world().player_ships.values().next().unwrap();
    let expected_speed = 0.5 * starbridge_sim::tuning::MAX_IMPULSE_SPEED;
    assert!((ship.velocity - expected_speed).abs() < 0.01);
    assert!(ship.position.distance_to(start_position) > 0.0);
}

#[test]
fn loaded_tube_can_be_fired_once_loading_completes() {
    let mut session = new_session();
    join_ship(&mut session, 1, 0, ConsoleType::Weapons);

    let ship_id = *session.world().player_ships.keys().next().unwrap();
    session.world_mut().player_ships.get_mut(&ship_id).unwrap().ordnance_inventory[OrdnanceType::Homing.index()] = 1;

    ready(&mut session, 1);

    session.handle_event(SessionEvent::Command {
        id: 1,
        cmd: ClientCommand::LoadTube { tube_index: 0, ordnance_type: OrdnanceType::Homing as u8 },
    });

    let ship = session.world().player_ships.get(&ship_id).unwrap();
    assert_eq!(ship.tubes[0].state, starbridge_protocol::constants::TubeState::Loading);
    assert_eq!(ship.ordnance_inventory[OrdnanceType::Homing.index()], 0);

    // LOAD_TIME_SEC at 20Hz; a few extra ticks to clear any rounding.
    let load_ticks = (starbridge_sim::tuning::LOAD_TIME_SEC / starbridge_sim::tuning::TICK_DT) as u32 + 2;
    for _ in 0..load_ticks {
        session.step();
    }
    assert_eq!(
        session.world().player_ships.get(&ship_id).unwrap().tubes[0].state,
        starbridge_protocol::constants::TubeState::Loaded
    );

    session.handle_event(SessionEvent::Command { id: 1, cmd: ClientCommand::FireTube { tube_index: 0 } });

    let ship = session.world().player_ships.get(&ship_id).unwrap();
    assert_eq!(ship.tubes[0].state, starbridge_protocol::constants::TubeState::Empty);
    assert_eq!(session.world().torpedoes.len(), 1);
}

#[test]
fn a_nuke_detonation_damages_every_npc_within_its_blast_radius_with_falloff() {
    let mut session = new_session();
    join_ship(&mut session, 1, 0, ConsoleType::GameMaster);
    ready(&mut session, 1);

    let ids: Vec<starbridge_sim::EntityId> = session.world().npc_ships.keys().copied().collect();
    let (near_id, far_id) = (ids[0], ids[1]);
    let other_ids: Vec<starbridge_sim::EntityId> = ids[2..].to_vec();

    let world = session.world_mut();
    world.npc_ships.get_mut(&near_id).unwrap().position = starbridge_sim::Vec3::new(0.0, 0.0, 0.0);
    world.npc_ships.get_mut(&far_id).unwrap().position = starbridge_sim::Vec3::new(1000.0, 0.0, 0.0);
    for id in &other_ids {
        world.npc_ships.get_mut(id).unwrap().position = starbridge_sim::Vec3::new(100_000.0, 0.0, 100_000.0);
    }
    let near_hull_before = world.npc_ships[&near_id].hull;
    let far_hull_before = world.npc_ships[&far_id].hull;
    let other_hulls_before: Vec<f32> = other_ids.iter().map(|id| world.npc_ships[id].hull).collect();

    let torpedo_id = world.ids.next();
    let torpedo = starbridge_sim::entities::Torpedo::new(
        torpedo_id,
        starbridge_sim::Vec3::new(0.0, 0.0, 0.0),
        0.0,
        OrdnanceType::Nuke,
        0,
        None,
    );
    world.torpedoes.insert(torpedo_id, torpedo);

    session.step();

    let world = session.world();
    assert!(world.npc_ships[&near_id].hull < near_hull_before, "ground zero NPC takes full damage");
    assert!(world.npc_ships[&far_id].hull < far_hull_before, "NPC within the blast radius still takes damage");
    assert!(
        near_hull_before - world.npc_ships[&near_id].hull > far_hull_before - world.npc_ships[&far_id].hull,
        "damage falls off with distance from the blast center"
    );
    for (id, before) in other_ids.iter().zip(other_hulls_before) {
        assert_eq!(world.npc_ships[id].hull, before, "NPCs outside the blast radius are untouched");
    }
    assert!(world.torpedoes.is_empty());
}

#[test]
fn docking_recharges_energy_and_shields_and_restocks_ordnance() {
    let mut session = new_session();
    join_ship(&mut session, 1, 0, ConsoleType::Weapons);
    session.handle_event(SessionEvent::Command { id: 1, cmd: ClientCommand::ToggleShields }); // drop shields so docking can engage

    let ship_id = *session.world().player_ships.keys().next().unwrap();
    let base_position = session.world().bases.values().next().unwrap().position;
    {
        let world = session.world_mut();
        let ship = world.player_ships.get_mut(&ship_id).unwrap();
        ship.position = base_position;
        ship.energy = 500.0;
        ship.shields_fore = 50.0;
        ship.ordnance_inventory = [0; 8];
    }

    ready(&mut session, 1);

    // RESTOCK_INTERVAL_SEC at 20Hz, plus a handful of extra ticks past
    // the boundary so the restock has definitely landed.
    let ticks = (starbridge_sim::tuning::RESTOCK_INTERVAL_SEC / starbridge_sim::tuning::TICK_DT) as u32 + 10;
    for _ in 0..ticks {
        session.step();
    }

    let ship = session.world().player_ships.get(&ship_id).unwrap();
    assert!(ship.docked);
    assert!(ship.energy > 500.0);
    assert_eq!(ship.shields_fore, ship.shields_fore_max);
    assert_eq!(ship.ordnance_inventory.iter().sum::<u8>(), 1);
}
