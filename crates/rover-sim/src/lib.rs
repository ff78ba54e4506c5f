//! ROVER Simulator - Client-side motion model
//!
//! The simulator owns the live telemetry record of the platform. Each tick
//! it advances position by the current velocity, keeps the platform inside
//! a square around its starting point and warms the temperature sensor.
//! Direction commands from the link change the velocity.

pub mod motion;

pub use motion::*;
