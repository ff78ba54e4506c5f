//! Runtime configuration

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;

use serde::{Deserialize, Serialize};

use rover_core::{RoverError, RoverResult, DEFAULT_PORT};
use rover_sim::MotionConfig;
use rover_transport::{ConnectPolicy, DEFAULT_COMMAND_QUEUE};
use rover_wire::Framing;

/// Aggregator (platform side) configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Listener address
    pub connect_addr: SocketAddr,
    /// Connect retry policy
    pub connect: ConnectPolicy,
    /// Motion model and tick rate
    pub motion: MotionConfig,
    /// Telemetry framing
    pub framing: Framing,
    /// Stop after this many ticks (`None` runs until the session ends)
    pub max_ticks: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            connect_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            connect: ConnectPolicy::default(),
            motion: MotionConfig::default(),
            framing: Framing::default(),
            max_ticks: None,
        }
    }
}

/// Listener (operator side) configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub bind_addr: SocketAddr,
    /// Accept a new platform after a session ends
    pub reconnect: bool,
    /// Telemetry framing
    pub framing: Framing,
    /// Depth of the outbound command queue
    pub command_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            reconnect: false,
            framing: Framing::default(),
            command_queue: DEFAULT_COMMAND_QUEUE,
        }
    }
}

/// Full runtime configuration, as read from a JSON file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Default tracing filter (overridden by `RUST_LOG`)
    pub log_filter: String,
    pub client: ClientConfig,
    pub server: ServerConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            log_filter: "info".to_string(),
            client: ClientConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse from JSON text; missing keys take defaults
    pub fn from_json_str(text: &str) -> RoverResult<Self> {
        let config: RuntimeConfig =
            serde_json::from_str(text).map_err(|e| RoverError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> RoverResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RoverError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> RoverResult<()> {
        self.client.motion.validate()?;
        if self.client.connect.poll_interval.is_zero() {
            return Err(RoverError::Config("connect.poll_interval must be non-zero".into()));
        }
        if self.client.connect.max_attempts == Some(0) {
            return Err(RoverError::Config("connect.max_attempts must be at least 1".into()));
        }
        if self.server.command_queue == 0 {
            return Err(RoverError::Config("server.command_queue must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_match_reference_endpoint() {
        let config = RuntimeConfig::default();
        assert_eq!(config.client.connect_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert!(!config.server.reconnect);
        assert_eq!(config.client.framing, Framing::PerRead);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = RuntimeConfig::from_json_str(
            r#"{
                "log_filter": "debug",
                "client": {
                    "connect_addr": "10.0.0.5:9000",
                    "connect": { "poll_interval": "50ms", "retry_refused": true },
                    "motion": { "tick": "500ms" },
                    "framing": "line"
                },
                "server": { "reconnect": true }
            }"#,
        )
        .unwrap();

        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.client.connect_addr.port(), 9000);
        assert_eq!(config.client.connect.poll_interval, Duration::from_millis(50));
        assert!(config.client.connect.retry_refused);
        assert_eq!(config.client.motion.tick, Duration::from_millis(500));
        assert_eq!(config.client.framing, Framing::Line);
        assert!(config.server.reconnect);
        assert_eq!(config.server.command_queue, DEFAULT_COMMAND_QUEUE);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(RuntimeConfig::from_json_str("{not json").is_err());
        assert!(RuntimeConfig::from_json_str(r#"{"server":{"command_queue":0}}"#).is_err());
        assert!(
            RuntimeConfig::from_json_str(r#"{"client":{"connect":{"max_attempts":0}}}"#).is_err()
        );
        assert!(RuntimeConfig::from_json_str(r#"{"client":{"motion":{"step":-1.0}}}"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = RuntimeConfig::load("/nonexistent/rover.json").unwrap_err();
        assert!(matches!(err, RoverError::Config(_)));
    }
}
