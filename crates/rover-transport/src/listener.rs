//! Telemetry listener - binds the server port and hands out peers

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use rover_core::{RoverError, RoverResult, SessionId};

/// TCP listener for platform connections
///
/// Accepting is explicit: the caller decides whether to accept once or to
/// come back for another peer after a session ends.
pub struct TelemetryListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    last_session: SessionId,
}

impl TelemetryListener {
    /// Bind to a local address
    pub async fn bind(addr: SocketAddr) -> RoverResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| RoverError::Bind { addr, source })?;

        let local_addr = listener
            .local_addr()
            .map_err(|source| RoverError::Bind { addr, source })?;

        tracing::info!(addr = %local_addr, "listening for platform connection");

        Ok(TelemetryListener {
            listener,
            local_addr,
            last_session: SessionId::ZERO,
        })
    }

    /// Get local address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the next peer and number its session
    pub async fn accept(&mut self) -> RoverResult<(TcpStream, SocketAddr, SessionId)> {
        let (stream, peer) = self.listener.accept().await.map_err(RoverError::Accept)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(%peer, error = %e, "failed to disable Nagle");
        }

        self.last_session = self.last_session.next();
        tracing::info!(%peer, session = %self.last_session, "connection accepted");
        Ok((stream, peer, self.last_session))
    }
}
