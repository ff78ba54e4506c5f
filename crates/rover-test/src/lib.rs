//! ROVER Test Harness - Loopback sessions and protocol validation
//!
//! This crate provides:
//! - A loopback listener with store and dispatcher handles
//! - Polling helpers for asynchronous store updates
//! - End-to-end integration tests of both node roles

pub mod harness;
pub mod integration;

pub use harness::*;
