//! # Telemetry Frame

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry sent by the simulator on every cycle.
///
/// All positions are in the simulator's world frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// X coordinates of the reference waypoints.
    ///
    /// Units: meters
    pub ptsx: Vec<f64>,

    /// Y coordinates of the reference waypoints, parallel to `ptsx`.
    ///
    /// Units: meters
    pub ptsy: Vec<f64>,

    /// Vehicle X position.
    ///
    /// Units: meters
    pub x: f64,

    /// Vehicle Y position.
    ///
    /// Units: meters
    pub y: f64,

    /// Vehicle heading, angle to the world X axis.
    ///
    /// Units: radians
    pub psi: f64,

    /// Vehicle speed.
    ///
    /// Units: miles/hour
    pub speed: f64,

    /// Steering angle currently applied.
    ///
    /// Units: radians
    pub steering_angle: f64,

    /// Throttle currently applied, between -1 and +1.
    pub throttle: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TelemetryFrame {
    /// Number of reference waypoints in the frame.
    pub fn num_waypoints(&self) -> usize {
        self.ptsx.len()
    }

    /// Iterate over the reference waypoints as `(x, y)` pairs.
    pub fn waypoints(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.ptsx.iter().copied().zip(self.ptsy.iter().copied())
    }
}
