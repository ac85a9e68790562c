//! Entry point (§6.3 "Server process surface"): reads startup
//! configuration, initializes logging, and drives the tokio runtime that
//! owns both listeners and the fixed-rate session loop.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use starbridge_net::session::{ServerConfig, SessionEvent, SessionServer};
use starbridge_sim::World;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(err) = run().await {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = config_from_env();
    let rng_seed = rand::random::<u64>();
    let mut session = SessionServer::new(config, World::new(), rng_seed);

    let (events_tx, events_rx) = flume::unbounded::<SessionEvent>();

    let tcp_task = tokio::spawn(starbridge_net::tcp::accept_loop(
        config.tcp_port,
        events_tx.clone(),
        config.max_packet_size,
    ));
    let ws_task = tokio::spawn(starbridge_net::ws::accept_loop(config.ws_port, events_tx.clone()));
    drop(events_tx);

    let mut ticker = tokio::time::interval(Duration::from_secs_f32(1.0 / config.tick_hz));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::info!(tcp_port = config.tcp_port, ws_port = config.ws_port, "starbridge listening");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Commands queued since the previous tick are applied before
                // this tick starts, in arrival order (§5 "Ordering guarantees").
                while let Ok(event) = events_rx.try_recv() {
                    session.handle_event(event);
                }
                if !session.step() {
                    tracing::info!("game session ended, shutting down");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }

    // Stop accepting new connections, finish the current tick (already
    // done above), emit a final broadcast, then close sockets (§5).
    tcp_task.abort();
    ws_task.abort();
    session.shutdown_broadcast();
    tokio::time::sleep(Duration::from_millis(50)).await;

    Ok(())
}

fn config_from_env() -> ServerConfig {
    let mut config = ServerConfig::default();
    if let Some(v) = env_parse("BRIDGE_TCP_PORT") {
        config.tcp_port = v;
    }
    if let Some(v) = env_parse("BRIDGE_WS_PORT") {
        config.ws_port = v;
    }
    if let Some(v) = env_parse("BRIDGE_MAX_PACKET_SIZE") {
        config.max_packet_size = v;
    }
    if let Some(v) = env_parse("BRIDGE_TICK_HZ") {
        config.tick_hz = v;
    }
    if let Some(v) = env_parse("BRIDGE_BROADCAST_DIVISOR") {
        config.broadcast_divisor = v;
    }
    config
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(key, raw, "ignoring unparsable env override");
                None
            }
        },
        Err(_) => None,
    }
}
