//! Binary wire protocol transport (§6.1). One accept loop, and a
//! reader/writer task split per connection: the reader task feeds raw
//! bytes into a per-connection `StreamParser` and forwards decoded
//! commands to the session loop over a channel; the writer task drains
//! an outgoing-bytes channel into the socket. Neither task ever touches
//! `World`/`Engine` directly (§5).

use std::sync::atomic::{AtomicU32, Ordering};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use starbridge_protocol::{parse_client_command, ClientCommand, Frame, FramingError, StreamParser};

use crate::client::{ClientId, Transport};
use crate::session::SessionEvent;

const READ_BUF_SIZE: usize = 4096;

static NEXT_CLIENT_ID: AtomicU32 = AtomicU32::new(1);

/// Binds the TCP listener and accepts connections until the socket is
/// closed or a bind error occurs. Each accepted connection is spawned as
/// its own reader/writer task pair; `events_tx` is the only channel that
/// reaches the single session loop (§5 "single logical task").
pub async fn accept_loop(
    port: u16,
    events_tx: flume::Sender<SessionEvent>,
    max_packet_size: u32,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    loop {
        let (stream, remote_addr) = listener.accept().await?;
        let events_tx = events_tx.clone();
        let id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(async move {
            handle_connection(id, stream, remote_addr.to_string(), events_tx, max_packet_size).await;
        });
    }
}

async fn handle_connection(
    id: ClientId,
    stream: TcpStream,
    remote_address: String,
    events_tx: flume::Sender<SessionEvent>,
    max_packet_size: u32,
) {
    let (outgoing_tx, outgoing_rx) = flume::unbounded::<Bytes>();
    let (mut reader, mut writer) = stream.into_split();

    let _ = events_tx.send(SessionEvent::Connected {
        id,
        remote_address: remote_address.clone(),
        transport: Transport::Tcp { outgoing: outgoing_tx },
    });

    let writer_task = tokio::spawn(async move {
        while let Ok(bytes) = outgoing_rx.recv_async().await {
            if writer.write_all(&bytes).await.is_err() {
                break;
            }
        }
    });

    let mut parser = StreamParser::with_max_packet_size(max_packet_size);
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(client = id, "error reading from socket: {e}");
                break;
            }
        };
        parser.push(&buf[..n]);

        match parser.drain() {
            Ok(frames) => {
                for frame in frames {
                    if let Some(cmd) = decode_command(&frame) {
                        let _ = events_tx.send(SessionEvent::Command { id, cmd });
                    }
                }
            }
            Err(FramingError { error, offset }) => {
                warn!(client = id, %error, offset, "framing error, closing connection");
                break;
            }
        }
    }

    let _ = events_tx.send(SessionEvent::Disconnected { id });
    writer_task.abort();
}

fn decode_command(frame: &Frame) -> Option<ClientCommand> {
    use starbridge_protocol::constants::PacketType;
    if PacketType::from_u32(frame.header.packet_type) != Some(PacketType::ClientCommand) {
        return None;
    }
    match parse_client_command(&frame.payload) {
        Ok(cmd) => Some(cmd),
        Err(e) => {
            debug!("dropping unparseable client command: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn accept_loop_registers_a_connected_event() {
        let (events_tx, events_rx) = flume::unbounded();
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let server = tokio::spawn(accept_loop(port, events_tx, starbridge_protocol::constants::MAX_PACKET_SIZE));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), events_rx.recv_async())
            .await
            .expect("event arrived")
            .expect("channel open");
        assert!(matches!(event, SessionEvent::Connected { .. }));
        server.abort();
    }
}
