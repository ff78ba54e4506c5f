//! ROVER Listener - the operator side
//!
//! Accepts the platform, shows its telemetry relative to the session origin
//! and sends direction commands typed on stdin.

mod common;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};

use rover_core::{Direction, COMMAND_PREFIX};
use rover_runtime::{init_tracing, ListenerNode};
use rover_state::TelemetrySnapshot;
use rover_wire::{scan_commands, Framing};

#[derive(Parser)]
#[command(author, version, about = "Receive rover telemetry and steer the platform")]
struct Args {
    /// Address to listen on
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Accept a new platform after each session ends
    #[arg(long)]
    reconnect: bool,
    /// Telemetry framing: per-read or line
    #[arg(long)]
    framing: Option<Framing>,
    /// How often to print the telemetry line
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
    render_interval: Duration,
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = common::load_config(args.config.as_deref())?;
    if let Some(addr) = args.bind {
        config.server.bind_addr = addr;
    }
    if args.reconnect {
        config.server.reconnect = true;
    }
    if let Some(framing) = args.framing {
        config.server.framing = framing;
    }
    config.validate()?;
    init_tracing(&config.log_filter)?;

    let node = ListenerNode::bind(config.server).await?;
    let store = node.store();
    let dispatcher = node.dispatcher();

    common::banner("ROVER Listener", "Telemetry view and remote steering");
    println!("Listening on {}", node.local_addr());
    println!("Commands: n / s / e / w (or CMD:<letter>), q to quit");
    println!();

    let mut server = tokio::spawn(node.run());
    let mut render = interval(args.render_interval);
    render.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    loop {
        tokio::select! {
            _ = render.tick() => {
                let line = render_line(&store.read(), store.updates(), dispatcher.is_connected());
                println!("{}", line);
            }
            line = input.next_line(), if input_open => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line == "q" || line == "quit" {
                        break;
                    }
                    for direction in parse_input(line) {
                        if dispatcher.send(direction) {
                            println!("-> {}", direction);
                        } else {
                            println!("No platform connected, {} dropped", direction);
                        }
                    }
                }
                Ok(None) => input_open = false,
                Err(e) => {
                    eprintln!("stdin: {}", e);
                    input_open = false;
                }
            },
            done = &mut server => {
                let reports = done??;
                for report in &reports {
                    println!(
                        "Session {} from {}: {} records, {} commands, {}",
                        report.session,
                        report.peer,
                        report.records,
                        report.commands_sent,
                        report.reason
                    );
                }
                return Ok(());
            }
        }
    }

    server.abort();
    println!("Goodbye!");
    Ok(())
}

/// Directions typed by the operator: single letters or `CMD:` tokens
fn parse_input(line: &str) -> Vec<Direction> {
    if line.contains(COMMAND_PREFIX) {
        return scan_commands(line).collect();
    }
    line.chars()
        .filter(|c| !c.is_whitespace())
        .filter_map(|c| Direction::from_letter(c.to_ascii_uppercase()))
        .collect()
}

fn render_line(snap: &TelemetrySnapshot, updates: u64, connected: bool) -> String {
    if !snap.origin_set {
        return if connected {
            "[link up] waiting for first record".to_string()
        } else {
            "[no link] waiting for platform".to_string()
        };
    }
    let (dlat, dlon) = snap.offset_from_origin();
    format!(
        "[{}] #{} lat {:.6} lon {:.6} temp {:.2}  offset ({:+.6}, {:+.6})",
        if connected { "link up" } else { "closed" },
        updates,
        snap.current.latitude,
        snap.current.longitude,
        snap.current.temperature,
        dlat,
        dlon
    )
}
