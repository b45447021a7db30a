//! # Latency compensation module
//!
//! A command computed now only takes effect once the actuation latency has elapsed, so the
//! optimizer must plan from where the vehicle will be at that point. This module propagates the
//! vehicle's local frame state forward by the latency under a kinematic bicycle model, holding the
//! current steering and throttle constant.
//!
//! The simulator reports steering with positive values turning clockwise, hence the yaw rate is
//! `v * (-delta / lf)`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector6;
use serde::Serialize;

use crate::poly::Polynomial;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The state handed to the optimizer, expressed in the vehicle's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleState {
    /// Position along the local X axis.
    ///
    /// Units: meters
    pub x_m: f64,

    /// Position along the local Y axis.
    ///
    /// Units: meters
    pub y_m: f64,

    /// Heading relative to the local X axis.
    ///
    /// Units: radians
    pub psi_rad: f64,

    /// Speed.
    ///
    /// Units: meters/second
    pub v_ms: f64,

    /// Cross track error, signed lateral offset of the reference curve from the vehicle.
    ///
    /// Units: meters
    pub cte_m: f64,

    /// Heading error, signed difference between the vehicle heading and the curve tangent.
    ///
    /// Units: radians
    pub epsi_rad: f64,
}

/// The actuation the vehicle is currently under, as reported by telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentActuation {
    /// Speed.
    ///
    /// Units: meters/second
    pub v_ms: f64,

    /// Steering angle, simulator convention (positive turns clockwise).
    ///
    /// Units: radians
    pub steer_rad: f64,

    /// Throttle, treated as longitudinal acceleration.
    pub throttle: f64,
}

/// Constants of the latency model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyModel {
    /// Time the state is propagated by.
    ///
    /// Units: seconds
    pub latency_s: f64,

    /// Distance from the center of mass to the front axle.
    ///
    /// Units: meters
    pub lf_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VehicleState {
    /// The state as a `[x, y, psi, v, cte, epsi]` vector.
    pub fn to_vector(&self) -> Vector6<f64> {
        Vector6::new(self.x_m, self.y_m, self.psi_rad, self.v_ms, self.cte_m, self.epsi_rad)
    }

    /// Returns true if every element of the state is finite.
    pub fn is_finite(&self) -> bool {
        self.to_vector().iter().all(|e| e.is_finite())
    }
}

impl LatencyModel {
    /// Propagate the state of a vehicle sitting at the local origin by the latency.
    ///
    /// Pure: identical inputs always give an identical state.
    pub fn compensate(&self, actuation: &CurrentActuation, poly: &Polynomial) -> VehicleState {
        let dt = self.latency_s;
        let v = actuation.v_ms;

        let (cte0, epsi0) = initial_errors(poly);

        // Heading is zero in the local frame so cos(psi) = 1 and sin(psi) = 0
        let yaw_rate = v * (-actuation.steer_rad / self.lf_m);

        VehicleState {
            x_m: v * dt,
            y_m: 0.0,
            psi_rad: yaw_rate * dt,
            v_ms: v + actuation.throttle * dt,
            cte_m: cte0 + v * epsi0.sin() * dt,
            epsi_rad: epsi0 + yaw_rate * dt,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Cross track and heading errors of a vehicle at the local origin with zero heading.
///
/// Returns `(cte, epsi)` where `cte = f(0)` and `epsi = -atan(f'(0))`.
pub fn initial_errors(poly: &Polynomial) -> (f64, f64) {
    (poly.eval(0.0), -poly.tangent_angle(0.0))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
