//! ROVER Runtime - Node orchestration
//!
//! Two node roles share one wire:
//! - `AggregatorNode` (platform side): connects, ticks the motion simulator,
//!   streams telemetry and applies incoming direction commands.
//! - `ListenerNode` (operator side): accepts the platform, decodes its
//!   telemetry into the shared store and carries commands back.
//!
//! Plus the configuration layer and tracing setup used by the binaries.

pub mod aggregator;
pub mod config;
pub mod listener;
pub mod logging;

pub use aggregator::*;
pub use config::*;
pub use listener::*;
pub use logging::*;
