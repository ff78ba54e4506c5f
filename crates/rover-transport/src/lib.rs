//! ROVER Transport Layer - TCP session plumbing
//!
//! This crate provides:
//! - Client connect with retry
//! - Single-session listener
//! - Session link state (idle, open, closed) and the command dispatcher
//! - Record reader and command writer tasks

pub mod connect;
pub mod link;
pub mod listener;
pub mod stream;

pub use connect::*;
pub use link::*;
pub use listener::*;
pub use stream::*;
