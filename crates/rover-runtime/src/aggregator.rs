//! Aggregator node - the platform side of the link
//!
//! One loop owns the simulator: each tick it advances the motion model and
//! writes the encoded record; in between it applies command chunks that
//! the reader task forwards from the socket.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{interval, MissedTickBehavior};

use rover_core::{RoverError, RoverResult};
use rover_sim::MotionSimulator;
use rover_transport::{connect_with_retry, start_command_reader, CloseReason};

use crate::ClientConfig;

/// Depth of the queue between the command reader and the tick loop
const COMMAND_CHANNEL_DEPTH: usize = 64;

/// How an aggregator session went
#[derive(Clone, Debug, PartialEq)]
pub struct AggregatorReport {
    /// Telemetry records written to the socket
    pub records_sent: u64,
    /// Direction commands applied to the simulator
    pub commands_applied: u64,
    /// Why the session ended; `None` if it stopped at `max_ticks`
    pub closed: Option<CloseReason>,
}

/// Aggregator node
pub struct AggregatorNode {
    config: ClientConfig,
    simulator: MotionSimulator,
}

impl AggregatorNode {
    pub fn new(config: ClientConfig) -> RoverResult<Self> {
        config.motion.validate()?;
        let simulator = MotionSimulator::new(config.motion.clone());
        Ok(AggregatorNode { config, simulator })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn simulator(&self) -> &MotionSimulator {
        &self.simulator
    }

    /// Connect to the listener and stream until the session ends
    ///
    /// A fatal connect error aborts before any telemetry is produced.
    pub async fn run(&mut self) -> RoverResult<AggregatorReport> {
        let stream = connect_with_retry(self.config.connect_addr, &self.config.connect).await?;
        self.run_session(stream).await
    }

    /// Drive an established connection
    ///
    /// Every session starts from the origin at rest. Ends with `Ok` when the
    /// listener closes the session or `max_ticks` is reached; a failed
    /// telemetry write ends it with an error.
    pub async fn run_session(&mut self, stream: TcpStream) -> RoverResult<AggregatorReport> {
        self.simulator.reset();
        let (read_half, mut write_half) = stream.into_split();
        let (mut commands, mut reader) = start_command_reader(read_half, COMMAND_CHANNEL_DEPTH);

        let mut ticker = interval(self.config.motion.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut report = AggregatorReport {
            records_sent: 0,
            commands_applied: 0,
            closed: None,
        };

        tracing::info!(
            tick = ?self.config.motion.tick,
            framing = %self.config.framing,
            "streaming telemetry"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.config.max_ticks.is_some_and(|max| self.simulator.ticks() >= max) {
                        break;
                    }

                    let record = self.simulator.tick();
                    let bytes = self.config.framing.encode_record(&record);
                    if let Err(e) = write_half.write_all(&bytes).await {
                        tracing::error!(error = %e, "telemetry write failed");
                        reader.abort();
                        return Err(RoverError::Transport(e.to_string()));
                    }
                    report.records_sent += 1;
                    tracing::trace!(
                        lat = record.latitude,
                        lon = record.longitude,
                        temp = record.temperature,
                        "record sent"
                    );
                }
                chunk = commands.recv() => match chunk {
                    Some(chunk) => {
                        report.commands_applied += self.simulator.handle_chunk(&chunk) as u64;
                    }
                    None => {
                        let reason = match (&mut reader).await {
                            Ok(reason) => reason,
                            Err(e) => CloseReason::ReadError(e.to_string()),
                        };
                        tracing::info!(
                            %reason,
                            records = report.records_sent,
                            "session ended by listener"
                        );
                        report.closed = Some(reason);
                        return Ok(report);
                    }
                },
            }
        }

        let _ = write_half.shutdown().await;
        reader.abort();
        tracing::info!(records = report.records_sent, "tick limit reached");
        Ok(report)
    }
}
