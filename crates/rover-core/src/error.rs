//! Error types for the ROVER telemetry link

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Core ROVER errors
///
/// Only fatal conditions live here. Malformed telemetry fields, unknown
/// command tokens and commands issued without a peer are absorbed where
/// they occur and never become errors.
#[derive(Error, Debug)]
pub enum RoverError {
    // Listener errors
    #[error("Failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("Failed to accept connection: {0}")]
    Accept(io::Error),

    // Connect errors
    #[error("Connection to {addr} failed: {source}")]
    Connect { addr: SocketAddr, source: io::Error },

    #[error("Gave up connecting to {addr} after {attempts} attempts")]
    ConnectRetriesExhausted { addr: SocketAddr, attempts: u32 },

    // Session errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Session {0} is still open")]
    SessionAlreadyOpen(crate::SessionId),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for ROVER operations
pub type RoverResult<T> = Result<T, RoverError>;

impl From<io::Error> for RoverError {
    fn from(e: io::Error) -> Self {
        RoverError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let err = RoverError::ConnectRetriesExhausted { addr, attempts: 3 };
        assert_eq!(
            err.to_string(),
            "Gave up connecting to 127.0.0.1:8080 after 3 attempts"
        );

        let err: RoverError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(err, RoverError::Transport(_)));
    }
}
