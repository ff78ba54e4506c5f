//! Stream adapters - raw socket halves to record texts and command tokens

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use rover_core::{Direction, SessionId, READ_BUFFER_SIZE};
use rover_wire::{encode_command, Framing, RecordAssembler};

use crate::SessionLink;

/// Why a read loop stopped
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// Zero-length read: the peer shut down its side
    PeerClosed,
    /// The read failed
    ReadError(String),
    /// Nobody is consuming the records any more
    ConsumerGone,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => write!(f, "peer closed"),
            CloseReason::ReadError(e) => write!(f, "read error: {}", e),
            CloseReason::ConsumerGone => write!(f, "consumer gone"),
        }
    }
}

/// Result of one read
#[derive(Debug)]
pub enum ReadEvent {
    /// Complete record texts (possibly none, if a record is still partial)
    Records(Vec<String>),
    /// The stream is finished
    Closed(CloseReason),
}

/// Reads a stream in fixed-size chunks and frames them into record texts
pub struct RecordReader<R> {
    reader: R,
    assembler: RecordAssembler,
    buf: Vec<u8>,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin> RecordReader<R> {
    pub fn new(reader: R, framing: Framing) -> Self {
        RecordReader {
            reader,
            assembler: RecordAssembler::new(framing),
            buf: vec![0u8; READ_BUFFER_SIZE],
            bytes_read: 0,
        }
    }

    /// Total bytes received so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Bytes dropped by line framing because no terminator arrived
    pub fn discarded(&self) -> u64 {
        self.assembler.discarded() as u64
    }

    /// Wait for the next chunk
    pub async fn next_event(&mut self) -> ReadEvent {
        match self.reader.read(&mut self.buf).await {
            Ok(0) => ReadEvent::Closed(CloseReason::PeerClosed),
            Ok(len) => {
                self.bytes_read += len as u64;
                ReadEvent::Records(self.assembler.push(&self.buf[..len]))
            }
            Err(e) => ReadEvent::Closed(CloseReason::ReadError(e.to_string())),
        }
    }
}

/// Receiver of command chunks from the client's read loop
pub type CommandReceiver = mpsc::Receiver<String>;

/// Start a background loop that forwards every received chunk as text
///
/// The reference peer sends bare `CMD:<letter>` tokens with no terminator,
/// so each read is forwarded whole. The channel closes when the stream
/// ends; the task's result says why.
pub fn start_command_reader<R>(
    reader: R,
    buffer_size: usize,
) -> (CommandReceiver, JoinHandle<CloseReason>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(buffer_size.max(1));

    let handle = tokio::spawn(async move {
        let mut reader = RecordReader::new(reader, Framing::PerRead);
        loop {
            match reader.next_event().await {
                ReadEvent::Records(chunks) => {
                    for chunk in chunks {
                        if tx.send(chunk).await.is_err() {
                            return CloseReason::ConsumerGone;
                        }
                    }
                }
                ReadEvent::Closed(reason) => {
                    tracing::info!(%reason, "command stream ended");
                    return reason;
                }
            }
        }
    });

    (rx, handle)
}

/// Start the writer task that owns a session's outbound half
///
/// Drains the link's command queue onto the socket, one 5-byte token per
/// write. Stops when the link closes (queue sender dropped) or a write
/// fails; a failed write closes the link.
pub fn spawn_command_writer<W>(
    mut writer: W,
    mut commands: mpsc::Receiver<Direction>,
    link: Arc<SessionLink>,
    session: SessionId,
) -> JoinHandle<u64>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut sent = 0u64;
        while let Some(direction) = commands.recv().await {
            let token = encode_command(direction);
            if let Err(e) = writer.write_all(&token).await {
                tracing::warn!(session = %session, error = %e, "command write failed");
                link.close(session);
                break;
            }
            sent += 1;
            tracing::debug!(session = %session, %direction, "command sent");
        }
        let _ = writer.shutdown().await;
        sent
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_reader_per_read_chunks() {
        let (mut tx, rx) = duplex(64);
        let mut reader = RecordReader::new(rx, Framing::PerRead);

        tx.write_all(b"LAT:1.0;LON:2.0;TEMP:3.0;").await.unwrap();
        match reader.next_event().await {
            ReadEvent::Records(r) => assert_eq!(r, vec!["LAT:1.0;LON:2.0;TEMP:3.0;".to_string()]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(reader.bytes_read(), 25);

        drop(tx);
        assert!(matches!(
            reader.next_event().await,
            ReadEvent::Closed(CloseReason::PeerClosed)
        ));
    }

    #[tokio::test]
    async fn test_reader_line_framing_waits_for_terminator() {
        let (mut tx, rx) = duplex(64);
        let mut reader = RecordReader::new(rx, Framing::Line);

        tx.write_all(b"LAT:1.0;").await.unwrap();
        match reader.next_event().await {
            ReadEvent::Records(r) => assert!(r.is_empty()),
            other => panic!("unexpected {:?}", other),
        }

        tx.write_all(b"TEMP:2.0;\n").await.unwrap();
        match reader.next_event().await {
            ReadEvent::Records(r) => assert_eq!(r, vec!["LAT:1.0;TEMP:2.0;".to_string()]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reader_counts_discarded_line_data() {
        let (mut tx, rx) = duplex(4096);
        let mut reader = RecordReader::new(rx, Framing::Line);

        let writer = tokio::spawn(async move {
            tx.write_all(&vec![b'x'; rover_wire::MAX_PENDING_BYTES + 4096])
                .await
                .unwrap();
        });

        loop {
            match reader.next_event().await {
                ReadEvent::Records(r) => assert!(r.is_empty()),
                ReadEvent::Closed(reason) => {
                    assert_eq!(reason, CloseReason::PeerClosed);
                    break;
                }
            }
        }
        writer.await.unwrap();

        assert!(reader.discarded() > rover_wire::MAX_PENDING_BYTES as u64);
        assert_eq!(reader.bytes_read(), (rover_wire::MAX_PENDING_BYTES + 4096) as u64);
    }

    #[tokio::test]
    async fn test_command_reader_forwards_chunks() {
        let (mut tx, rx) = duplex(64);
        let (mut commands, handle) = start_command_reader(rx, 8);

        tx.write_all(b"CMD:E").await.unwrap();
        assert_eq!(commands.recv().await.unwrap(), "CMD:E");

        drop(tx);
        assert!(commands.recv().await.is_none());
        assert_eq!(handle.await.unwrap(), CloseReason::PeerClosed);
    }

    #[tokio::test]
    async fn test_command_writer_drains_until_close() {
        let link = Arc::new(SessionLink::default());
        let session = SessionId::new(1);
        let queue = link.open(session).unwrap();

        let (client, mut server) = duplex(64);
        let writer = spawn_command_writer(client, queue, link.clone(), session);

        assert!(link.dispatch(Direction::North));
        assert!(link.dispatch(Direction::West));
        link.close(session);

        assert_eq!(writer.await.unwrap(), 2);

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"CMD:NCMD:W");
    }
}
