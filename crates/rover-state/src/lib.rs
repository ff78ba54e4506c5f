//! ROVER State - Shared telemetry store
//!
//! The receive path of a listener session writes decoded records here; any
//! number of readers (the visualization side) take consistent snapshots of
//! the current record together with the session's origin.

pub mod store;

pub use store::*;
