//! # MPC library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the MPC exec crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Controller module - finds the actuator command which best tracks the reference curve
pub mod ctrl;

/// Cycle driver - runs one frame from the simulator through the whole processing chain
pub mod cycle;

/// Geometry module - moves waypoints between the world and vehicle frames
pub mod geometry;

/// Latency compensation - propagates the vehicle state over the actuation latency
pub mod latency;

/// Parameters of the exec
pub mod params;

/// Polynomial fitting of the reference waypoints
pub mod poly;

/// Response encoder - builds the frame sent back to the simulator
pub mod response;

/// Simulator server - accepts connections and serves each one on its own thread
pub mod server;

pub mod trace;
