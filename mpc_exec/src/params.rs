//! # MPC Executable Parameters
//!
//! This module provides the parameters for the MPC executable, loaded from `mpc_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the MPC executable.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExecParams {

    // ---- VEHICLE ----

    /// Distance between the vehicle's center of mass and its front axle.
    ///
    /// Units: meters
    pub lf_m: f64,

    /// Maximum steering angle of the vehicle, used to normalise steering demands.
    ///
    /// Units: degrees
    pub max_steer_deg: f64,

    // ---- LATENCY ----

    /// Time between a command being computed and it taking effect on the vehicle. The state given
    /// to the optimizer is propagated forward by this amount.
    ///
    /// Units: seconds
    pub actuation_latency_s: f64,

    /// Delay held after computing a command and before sending it to the simulator.
    ///
    /// Units: milliseconds
    pub reply_delay_ms: u64,

    // ---- REFERENCE CURVE ----

    /// Degree of the polynomial fitted to the reference waypoints.
    pub poly_degree: usize,

    /// Separation of reference trace samples along the local X axis.
    ///
    /// Units: meters
    pub ref_trace_step_m: f64,

    /// Exclusive upper bound on the reference trace sample index. Samples are taken at indices
    /// `1..ref_trace_num_points`.
    pub ref_trace_num_points: usize,

    // ---- OPTIMIZER ----

    /// Parameters for the default shooting optimizer.
    pub optimizer: OptimizerParams,
}

/// Parameters for the shooting optimizer.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OptimizerParams {

    /// Number of steps in the prediction horizon
    pub horizon_steps: usize,

    /// Duration of one prediction step.
    ///
    /// Units: seconds
    pub step_s: f64,

    /// Speed the vehicle should hold.
    ///
    /// Units: meters/second
    pub ref_speed_ms: f64,

    /// Weight on the squared cross track error
    pub cte_weight: f64,

    /// Weight on the squared heading error
    pub epsi_weight: f64,

    /// Weight on the squared speed error
    pub speed_weight: f64,

    /// Weight on the squared steering demand
    pub steer_weight: f64,

    /// Weight on the squared throttle demand
    pub throttle_weight: f64,

    /// Number of steering candidates per search grid
    pub num_steer_candidates: usize,

    /// Number of throttle candidates per search grid
    pub num_throttle_candidates: usize,

    /// Number of refinement passes made around the best candidate of the previous grid
    pub refine_passes: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reasons a parameter set cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Expected a polynomial degree of at least 1, found {0}")]
    InvalidPolyDegree(usize),

    #[error("Expected a strictly positive {0}, found {1}")]
    NotPositive(&'static str, f64),

    #[error("Expected a non-negative actuation latency, found {0} s")]
    NegativeLatency(f64),

    #[error("Expected at least {1} {0}, found {2}")]
    TooFew(&'static str, usize, usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ExecParams {

    /// Maximum steering angle in radians.
    pub fn max_steer_rad(&self) -> f64 {
        util::convert::deg_to_rad(self.max_steer_deg)
    }

    /// Check that the parameters describe a usable configuration.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.poly_degree < 1 {
            return Err(ParamsError::InvalidPolyDegree(self.poly_degree))
        }

        for (name, value) in [
            ("lf_m", self.lf_m),
            ("max_steer_deg", self.max_steer_deg),
            ("ref_trace_step_m", self.ref_trace_step_m),
            ("optimizer.step_s", self.optimizer.step_s),
        ].iter() {
            // Written so NaN fails as well
            if !(*value > 0.0) {
                return Err(ParamsError::NotPositive(*name, *value))
            }
        }

        if !(self.actuation_latency_s >= 0.0) {
            return Err(ParamsError::NegativeLatency(self.actuation_latency_s))
        }

        for (name, min, value) in [
            ("optimizer.horizon_steps", 1, self.optimizer.horizon_steps),
            ("optimizer.num_steer_candidates", 2, self.optimizer.num_steer_candidates),
            ("optimizer.num_throttle_candidates", 2, self.optimizer.num_throttle_candidates),
        ].iter() {
            if value < min {
                return Err(ParamsError::TooFew(*name, *min, *value))
            }
        }

        Ok(())
    }
}

impl Default for ExecParams {
    fn default() -> Self {
        Self {
            lf_m: 2.67,
            max_steer_deg: 25.0,
            actuation_latency_s: 0.1,
            reply_delay_ms: 100,
            poly_degree: 3,
            ref_trace_step_m: 2.5,
            ref_trace_num_points: 25,
            optimizer: OptimizerParams::default(),
        }
    }
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            horizon_steps: 10,
            step_s: 0.1,
            ref_speed_ms: 20.0,
            cte_weight: 2000.0,
            epsi_weight: 2000.0,
            speed_weight: 1.0,
            steer_weight: 5.0,
            throttle_weight: 5.0,
            num_steer_candidates: 21,
            num_throttle_candidates: 11,
            refine_passes: 2,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let params = ExecParams::default();
        params.validate().unwrap();
        assert!((params.max_steer_rad() - 0.436332312998582).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = ExecParams::default();
        params.poly_degree = 0;
        assert!(matches!(params.validate(), Err(ParamsError::InvalidPolyDegree(0))));

        let mut params = ExecParams::default();
        params.lf_m = std::f64::NAN;
        assert!(matches!(params.validate(), Err(ParamsError::NotPositive("lf_m", _))));

        let mut params = ExecParams::default();
        params.actuation_latency_s = -0.1;
        assert!(matches!(params.validate(), Err(ParamsError::NegativeLatency(_))));

        let mut params = ExecParams::default();
        params.optimizer.num_throttle_candidates = 1;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::TooFew("optimizer.num_throttle_candidates", 2, 1))
        ));
    }

    #[test]
    fn test_params_file() {
        let text = std::fs::read_to_string(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../params/mpc_exec.toml"
        ))
        .unwrap();

        let params: ExecParams = util::params::from_str(&text).unwrap();
        params.validate().unwrap();
        assert_eq!(params.poly_degree, 3);
        assert_eq!(params.reply_delay_ms, 100);
    }
}
