//! ROVER Wire Protocol - Text record format
//!
//! This crate implements the wire format of the telemetry link:
//! - Telemetry records: `LAT:<v>;LON:<v>;TEMP:<v>;`
//! - Command tokens: `CMD:N`, `CMD:S`, `CMD:E`, `CMD:W`
//! - Record framing (one read per record, or newline-terminated)

pub mod command;
pub mod framing;
pub mod telemetry;

pub use command::*;
pub use framing::*;
pub use telemetry::*;
