//! # Steer Frame

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{EncodeError, EVENT_PREFIX, STEER_EVENT};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Actuation payload sent back to the simulator.
///
/// All traces are in the vehicle's local frame. The simulator draws `mpc_*` as the predicted
/// trajectory and `next_*` as the reference line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SteerPayload {
    /// Normalised steering demand between -1 and +1.
    pub steering_angle: f64,

    /// Throttle demand between -1 and +1.
    pub throttle: f64,

    /// X coordinates of the predicted trajectory.
    pub mpc_x: Vec<f64>,

    /// Y coordinates of the predicted trajectory.
    pub mpc_y: Vec<f64>,

    /// X coordinates of the reference line.
    pub next_x: Vec<f64>,

    /// Y coordinates of the reference line.
    pub next_y: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SteerPayload {
    /// Encode the payload as a complete `42["steer", {...}]` frame.
    pub fn to_frame(&self) -> Result<String, EncodeError> {
        let body = serde_json::to_string(&(STEER_EVENT, self))
            .map_err(EncodeError::SerializationError)?;

        Ok(format!("{}{}", EVENT_PREFIX, body))
    }
}
