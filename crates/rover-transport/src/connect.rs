//! Client connect with retry

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;

use rover_core::{RoverError, RoverResult};

/// How the client retries while the peer is not yet reachable
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectPolicy {
    /// Delay between attempts
    #[serde(with = "rover_core::duration")]
    pub poll_interval: Duration,
    /// Give up after this many attempts (`None` retries forever)
    pub max_attempts: Option<u32>,
    /// Treat "connection refused" as not-yet-connected instead of fatal
    pub retry_refused: bool,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        ConnectPolicy {
            poll_interval: Duration::from_millis(100),
            max_attempts: None,
            retry_refused: false,
        }
    }
}

/// What to do with a failed connect attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectAttempt {
    /// Connection still pending; poll again
    Retry,
    /// Give up
    Fatal,
}

impl ConnectPolicy {
    /// Classify a connect error under this policy
    pub fn classify(&self, err: &io::Error) -> ConnectAttempt {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut => {
                ConnectAttempt::Retry
            }
            io::ErrorKind::ConnectionRefused if self.retry_refused => ConnectAttempt::Retry,
            _ => ConnectAttempt::Fatal,
        }
    }
}

/// Connect to `addr`, polling at the policy's interval while the
/// connection is pending
///
/// Every attempt uses a fresh socket, so an established connection is
/// returned as soon as one attempt succeeds.
pub async fn connect_with_retry(addr: SocketAddr, policy: &ConnectPolicy) -> RoverResult<TcpStream> {
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::warn!(%addr, error = %e, "failed to disable Nagle");
                }
                tracing::info!(%addr, attempts, "connected");
                return Ok(stream);
            }
            Err(e) => match policy.classify(&e) {
                ConnectAttempt::Fatal => {
                    tracing::error!(%addr, error = %e, "connect failed");
                    return Err(RoverError::Connect { addr, source: e });
                }
                ConnectAttempt::Retry => {
                    if policy.max_attempts.is_some_and(|max| attempts >= max) {
                        tracing::warn!(%addr, attempts, "connect retries exhausted");
                        return Err(RoverError::ConnectRetriesExhausted { addr, attempts });
                    }
                    tracing::debug!(%addr, attempts, error = %e, "connect pending, retrying");
                    tokio::time::sleep(policy.poll_interval).await;
                }
            },
        }
    }
}
