//! Listener node - the operator side of the link
//!
//! The node owns the shared telemetry store and the session link. Both are
//! handed out by reference: the receive task writes the store, the
//! visualization side reads it and steers through a `CommandDispatcher`.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::tcp::OwnedReadHalf;
use tokio::task::JoinHandle;

use rover_core::{RoverError, RoverResult, SessionId};
use rover_state::TelemetryStore;
use rover_transport::{
    spawn_command_writer, CloseReason, CommandDispatcher, ReadEvent, RecordReader, SessionLink,
    SessionPhase, TelemetryListener,
};
use rover_wire::decode_into;

use crate::ServerConfig;

/// Summary of a finished listener session
#[derive(Clone, Debug, PartialEq)]
pub struct SessionReport {
    pub session: SessionId,
    pub peer: SocketAddr,
    /// Records that updated the store
    pub records: u64,
    /// Chunks with nothing usable in them
    pub rejected: u64,
    /// Individual fields skipped as unknown or malformed
    pub skipped_fields: u64,
    pub bytes_received: u64,
    /// Unterminated data dropped under line framing
    pub discarded_bytes: u64,
    pub commands_sent: u64,
    pub reason: CloseReason,
}

/// A running listener session
pub struct SessionHandle {
    session: SessionId,
    peer: SocketAddr,
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Wait for the session to end
    pub async fn join(self) -> RoverResult<SessionReport> {
        self.task
            .await
            .map_err(|e| RoverError::Transport(format!("session task failed: {}", e)))
    }
}

/// Listener node
pub struct ListenerNode {
    config: ServerConfig,
    listener: TelemetryListener,
    store: Arc<TelemetryStore>,
    link: Arc<SessionLink>,
}

impl ListenerNode {
    /// Bind the listening socket; no peer is accepted yet
    pub async fn bind(config: ServerConfig) -> RoverResult<Self> {
        let listener = TelemetryListener::bind(config.bind_addr).await?;
        let link = Arc::new(SessionLink::new(config.command_queue));
        Ok(ListenerNode {
            config,
            listener,
            store: Arc::new(TelemetryStore::new()),
            link,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Shared store handle for readers
    pub fn store(&self) -> Arc<TelemetryStore> {
        Arc::clone(&self.store)
    }

    /// Command handle for the visualization side
    pub fn dispatcher(&self) -> CommandDispatcher {
        CommandDispatcher::new(Arc::clone(&self.link))
    }

    pub fn phase(&self) -> SessionPhase {
        self.link.phase()
    }

    /// Accept the next platform and start its session tasks
    ///
    /// Without `reconnect` only one session is ever accepted; asking again
    /// after it closed fails with `SessionClosed`.
    pub async fn accept_session(&mut self) -> RoverResult<SessionHandle> {
        match self.link.phase() {
            SessionPhase::Idle => {}
            SessionPhase::Open => {
                let open = self.link.session().unwrap_or_default();
                return Err(RoverError::SessionAlreadyOpen(open));
            }
            SessionPhase::Closed if self.config.reconnect => {
                self.link.rearm();
                self.store.reset();
            }
            SessionPhase::Closed => return Err(RoverError::SessionClosed),
        }

        let (stream, peer, session) = self.listener.accept().await?;
        let (read_half, write_half) = stream.into_split();

        let commands = self.link.open(session)?;
        let writer = spawn_command_writer(write_half, commands, Arc::clone(&self.link), session);

        let reader = RecordReader::new(read_half, self.config.framing);
        let store = Arc::clone(&self.store);
        let link = Arc::clone(&self.link);
        let task = tokio::spawn(async move {
            let mut report = receive_loop(reader, &store, session, peer).await;
            link.close(session);
            report.commands_sent = writer.await.unwrap_or(0);
            tracing::info!(
                session = %session,
                %peer,
                reason = %report.reason,
                records = report.records,
                "session closed"
            );
            report
        });

        Ok(SessionHandle {
            session,
            peer,
            task,
        })
    }

    /// Serve sessions until the listener is done
    ///
    /// Accepts once, or keeps accepting with `reconnect`.
    pub async fn run(mut self) -> RoverResult<Vec<SessionReport>> {
        let mut reports = Vec::new();
        loop {
            let handle = self.accept_session().await?;
            reports.push(handle.join().await?);
            if !self.config.reconnect {
                return Ok(reports);
            }
        }
    }
}

/// Decode every received record into the store until the stream ends
///
/// Each record overlays the current one, so a field missing from the text
/// keeps its last value. Text with no usable field is not written, so it
/// can never become the origin.
async fn receive_loop(
    mut reader: RecordReader<OwnedReadHalf>,
    store: &TelemetryStore,
    session: SessionId,
    peer: SocketAddr,
) -> SessionReport {
    let mut report = SessionReport {
        session,
        peer,
        records: 0,
        rejected: 0,
        skipped_fields: 0,
        bytes_received: 0,
        discarded_bytes: 0,
        commands_sent: 0,
        reason: CloseReason::PeerClosed,
    };

    loop {
        match reader.next_event().await {
            ReadEvent::Records(texts) => {
                for text in texts {
                    let mut record = store.current();
                    let decoded = decode_into(&mut record, &text);
                    if decoded.has_skipped() {
                        report.skipped_fields += u64::from(decoded.unknown + decoded.malformed);
                        tracing::debug!(
                            session = %session,
                            unknown = decoded.unknown,
                            malformed = decoded.malformed,
                            "skipped telemetry fields"
                        );
                    }
                    if decoded.is_empty() {
                        tracing::debug!(
                            session = %session,
                            text = %text,
                            "no usable telemetry in record"
                        );
                        report.rejected += 1;
                        continue;
                    }
                    store.write(record);
                    report.records += 1;
                    tracing::trace!(
                        session = %session,
                        lat = record.latitude,
                        lon = record.longitude,
                        temp = record.temperature,
                        "record received"
                    );
                }
            }
            ReadEvent::Closed(reason) => {
                report.bytes_received = reader.bytes_read();
                report.discarded_bytes = reader.discarded();
                report.reason = reason;
                return report;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use rover_core::Direction;
    use rover_wire::Framing;

    fn local_config(reconnect: bool) -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            reconnect,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_decodes_into_store() {
        let mut node = ListenerNode::bind(local_config(false)).await.unwrap();
        let store = node.store();
        let addr = node.local_addr();

        let mut client = TcpStream::connect(addr).await.unwrap();
        let handle = node.accept_session().await.unwrap();
        assert_eq!(node.phase(), SessionPhase::Open);

        client
            .write_all(b"LAT:34.0522;LON:-118.2437;TEMP:25.0;")
            .await
            .unwrap();
        drop(client);

        let report = handle.join().await.unwrap();
        assert_eq!(report.records, 1);
        assert_eq!(report.reason, CloseReason::PeerClosed);

        let snap = store.read();
        assert!(snap.origin_set);
        assert_eq!(snap.current.latitude, 34.0522);
        assert_eq!(node.phase(), SessionPhase::Closed);
    }

    #[tokio::test]
    async fn test_out_of_range_temperature_is_clamped() {
        let mut node = ListenerNode::bind(local_config(false)).await.unwrap();
        let store = node.store();
        let mut client = TcpStream::connect(node.local_addr()).await.unwrap();
        let handle = node.accept_session().await.unwrap();

        client.write_all(b"LAT:1.0;LON:2.0;TEMP:150.0;").await.unwrap();
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        while !store.origin_set() {
            assert!(tokio::time::Instant::now() < deadline, "record never arrived");
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        assert_eq!(store.read().origin.temperature, 100.0);

        client.write_all(b"TEMP:-5.0;").await.unwrap();
        drop(client);

        let report = handle.join().await.unwrap();
        assert_eq!(report.records, 2);
        let snap = store.read();
        assert_eq!(snap.current.temperature, 0.0);
        assert_eq!(snap.current.latitude, 1.0);
    }

    #[tokio::test]
    async fn test_line_framing_reports_discarded_bytes() {
        let mut node = ListenerNode::bind(ServerConfig {
            framing: Framing::Line,
            ..local_config(false)
        })
        .await
        .unwrap();
        let mut client = TcpStream::connect(node.local_addr()).await.unwrap();
        let handle = node.accept_session().await.unwrap();

        client
            .write_all(&vec![b'x'; rover_wire::MAX_PENDING_BYTES + 2048])
            .await
            .unwrap();
        drop(client);

        let report = handle.join().await.unwrap();
        assert_eq!(report.records, 0);
        assert!(report.discarded_bytes > rover_wire::MAX_PENDING_BYTES as u64);
    }

    #[tokio::test]
    async fn test_accept_once_without_reconnect() {
        let mut node = ListenerNode::bind(local_config(false)).await.unwrap();
        let client = TcpStream::connect(node.local_addr()).await.unwrap();
        let handle = node.accept_session().await.unwrap();

        assert!(matches!(
            node.accept_session().await,
            Err(RoverError::SessionAlreadyOpen(_))
        ));

        drop(client);
        handle.join().await.unwrap();
        assert!(matches!(
            node.accept_session().await,
            Err(RoverError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn test_garbage_never_sets_origin() {
        let mut node = ListenerNode::bind(local_config(false)).await.unwrap();
        let store = node.store();
        let mut client = TcpStream::connect(node.local_addr()).await.unwrap();
        let handle = node.accept_session().await.unwrap();

        client.write_all(b"hello there").await.unwrap();
        drop(client);

        let report = handle.join().await.unwrap();
        assert_eq!(report.records, 0);
        assert_eq!(report.rejected, 1);
        assert!(!store.origin_set());
    }

    #[tokio::test]
    async fn test_dispatcher_reaches_peer() {
        let mut node = ListenerNode::bind(local_config(false)).await.unwrap();
        let dispatcher = node.dispatcher();
        assert!(!dispatcher.send(Direction::North));

        let mut client = TcpStream::connect(node.local_addr()).await.unwrap();
        let handle = node.accept_session().await.unwrap();

        assert!(dispatcher.is_connected());
        assert!(dispatcher.send(Direction::South));

        let mut token = [0u8; 5];
        client.read_exact(&mut token).await.unwrap();
        assert_eq!(&token, b"CMD:S");

        drop(client);
        let report = handle.join().await.unwrap();
        assert_eq!(report.commands_sent, 1);
        assert!(!dispatcher.is_connected());
        assert!(!dispatcher.send(Direction::East));
    }
}
