//! # Response encoder
//!
//! Builds the steer frame sent back to the simulator from the controller's solution and the fitted
//! reference polynomial.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::sim::{EncodeError, SteerPayload};
use nalgebra::Point2;

use crate::{ctrl::Solution, poly::Polynomial, trace::Trace};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Sample the reference polynomial for display.
///
/// Points are taken at `x = step * i` for `i` in `1..num_points`, so `num_points - 1` samples.
pub fn reference_trace(poly: &Polynomial, step_m: f64, num_points: usize) -> Trace {
    (1..num_points)
        .map(|i| {
            let x = step_m * i as f64;
            Point2::new(x, poly.eval(x))
        })
        .collect()
}

/// Map a steering angle onto the simulator's `[-1, 1]` steering range.
pub fn normalise_steering(steer_rad: f64, max_steer_rad: f64) -> f64 {
    steer_rad / max_steer_rad
}

/// Build the payload to send to the simulator.
pub fn build_payload(
    solution: Solution,
    reference: Trace,
    max_steer_rad: f64
) -> SteerPayload {
    let (mpc_x, mpc_y) = solution.predicted.into_parts();
    let (next_x, next_y) = reference.into_parts();

    SteerPayload {
        steering_angle: normalise_steering(solution.command.steer_rad, max_steer_rad),
        throttle: solution.command.throttle,
        mpc_x,
        mpc_y,
        next_x,
        next_y
    }
}

/// Build and encode the complete steer frame.
pub fn encode_response(
    solution: Solution,
    reference: Trace,
    max_steer_rad: f64
) -> Result<String, EncodeError> {
    build_payload(solution, reference, max_steer_rad).to_frame()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
