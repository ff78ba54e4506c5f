//! ROVER Aggregator - the platform side
//!
//! Connects to a listener, streams simulated telemetry every tick and
//! steers by the direction commands it receives.

mod common;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use rover_runtime::{init_tracing, AggregatorNode};
use rover_wire::Framing;

#[derive(Parser)]
#[command(author, version, about = "Stream simulated rover telemetry to a listener")]
struct Args {
    /// Listener address
    #[arg(long)]
    connect: Option<SocketAddr>,
    /// Simulation tick, e.g. "100ms"
    #[arg(long, value_parser = humantime::parse_duration)]
    tick: Option<Duration>,
    /// Give up connecting after this many attempts
    #[arg(long)]
    max_attempts: Option<u32>,
    /// Keep retrying while the listener is not up yet
    #[arg(long)]
    wait_for_listener: bool,
    /// Telemetry framing: per-read or line
    #[arg(long)]
    framing: Option<Framing>,
    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = common::load_config(args.config.as_deref())?;
    let client = &mut config.client;
    if let Some(addr) = args.connect {
        client.connect_addr = addr;
    }
    if let Some(tick) = args.tick {
        client.motion.tick = tick;
    }
    if args.max_attempts.is_some() {
        client.connect.max_attempts = args.max_attempts;
    }
    if args.wait_for_listener {
        client.connect.retry_refused = true;
    }
    if let Some(framing) = args.framing {
        client.framing = framing;
    }
    if args.max_ticks.is_some() {
        client.max_ticks = args.max_ticks;
    }
    config.validate()?;
    init_tracing(&config.log_filter)?;

    common::banner("ROVER Aggregator", "Simulated platform telemetry");
    println!("Connecting to {}...", config.client.connect_addr);

    let mut node = AggregatorNode::new(config.client)?;
    match node.run().await {
        Ok(report) => {
            println!();
            println!("Records sent:     {}", report.records_sent);
            println!("Commands applied: {}", report.commands_applied);
            match report.closed {
                Some(reason) => println!("Session ended:    {}", reason),
                None => println!("Session ended:    tick limit"),
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Aggregator stopped: {}", e);
            Err(e.into())
        }
    }
}
