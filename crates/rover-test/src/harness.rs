//! Loopback harness - a listener node on an ephemeral local port

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

use rover_core::{RoverError, RoverResult};
use rover_runtime::{
    AggregatorNode, AggregatorReport, ClientConfig, ListenerNode, ServerConfig, SessionReport,
};
use rover_sim::MotionConfig;
use rover_state::{TelemetrySnapshot, TelemetryStore};
use rover_transport::CommandDispatcher;

/// Tick used by harness aggregators
pub const FAST_TICK: Duration = Duration::from_millis(5);

/// How often `wait_for` polls the store
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// A listener node running in the background on 127.0.0.1
pub struct LoopbackHarness {
    addr: SocketAddr,
    store: Arc<TelemetryStore>,
    dispatcher: CommandDispatcher,
    listener: JoinHandle<RoverResult<Vec<SessionReport>>>,
}

impl LoopbackHarness {
    /// Bind an ephemeral port and start serving with `config`
    ///
    /// `config.bind_addr` is replaced.
    pub async fn start(config: ServerConfig) -> RoverResult<Self> {
        let config = ServerConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..config
        };
        let node = ListenerNode::bind(config).await?;
        let addr = node.local_addr();
        let store = node.store();
        let dispatcher = node.dispatcher();
        let listener = tokio::spawn(node.run());

        Ok(LoopbackHarness {
            addr,
            store,
            dispatcher,
            listener,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Aggregator config pointed at this harness, ticking fast
    pub fn client_config(&self, max_ticks: Option<u64>) -> ClientConfig {
        ClientConfig {
            connect_addr: self.addr,
            motion: MotionConfig {
                tick: FAST_TICK,
                ..Default::default()
            },
            max_ticks,
            ..Default::default()
        }
    }

    /// Run an aggregator against this harness in the background
    pub fn spawn_aggregator(
        &self,
        config: ClientConfig,
    ) -> JoinHandle<RoverResult<AggregatorReport>> {
        tokio::spawn(async move {
            let mut node = AggregatorNode::new(config)?;
            node.run().await
        })
    }

    /// Poll the store until `predicate` holds or `timeout` passes
    pub async fn wait_for<F>(&self, timeout: Duration, predicate: F) -> Option<TelemetrySnapshot>
    where
        F: Fn(&TelemetrySnapshot) -> bool,
    {
        wait_for(&self.store, timeout, predicate).await
    }

    /// Wait for the listener to stop on its own (accept-once mode)
    pub async fn finish(self) -> RoverResult<Vec<SessionReport>> {
        self.listener
            .await
            .map_err(|e| RoverError::Transport(format!("listener task failed: {}", e)))?
    }

    /// Stop a listener that would otherwise keep accepting
    pub fn abort(self) {
        self.listener.abort();
    }
}

/// Poll a store until `predicate` holds or `timeout` passes
pub async fn wait_for<F>(
    store: &TelemetryStore,
    timeout: Duration,
    predicate: F,
) -> Option<TelemetrySnapshot>
where
    F: Fn(&TelemetrySnapshot) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        let snapshot = store.read();
        if predicate(&snapshot) {
            return Some(snapshot);
        }
        if Instant::now() >= deadline {
            return None;
        }
        sleep(POLL_INTERVAL).await;
    }
}
