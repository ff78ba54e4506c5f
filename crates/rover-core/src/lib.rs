//! ROVER Core - Fundamental types and primitives
//!
//! This crate defines the core types shared by both ends of the link:
//! - Telemetry record (position + temperature)
//! - Direction intents and command token constants
//! - Session identifiers
//! - Error types
//! - Human-readable duration (de)serialization for config files

pub mod command;
pub mod duration;
pub mod error;
pub mod id;
pub mod record;

pub use command::*;
pub use error::*;
pub use id::*;
pub use record::*;

/// Default TCP port of the telemetry link
pub const DEFAULT_PORT: u16 = 8080;

/// Size of a single socket read, in bytes
pub const READ_BUFFER_SIZE: usize = 1024;
