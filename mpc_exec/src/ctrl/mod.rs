//! # Controller module
//!
//! The controller turns the latency compensated vehicle state and the fitted reference polynomial
//! into an actuator command. The optimisation itself sits behind the [`Optimizer`] trait so that
//! the cycle can be driven by any solver, the default one being the [`ShootingOptimizer`].
//!
//! Whatever the solver, its output is checked before use: a command or trace that the simulator
//! can't act upon is reported as a [`ControllerError`] rather than forwarded.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod shooting;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use shooting::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use crate::{latency::VehicleState, poly::Polynomial, trace::Trace};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A solver finding the actuation that best tracks the reference polynomial.
pub trait Optimizer {
    /// Solve for the actuation to apply from `state`.
    ///
    /// The call is synchronous and is never retried.
    fn solve(&mut self, state: &VehicleState, poly: &Polynomial)
        -> Result<Solution, ControllerError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Actuation demanded by the optimizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ActuatorCommand {
    /// Steering angle, simulator convention (positive turns clockwise).
    ///
    /// Units: radians
    pub steer_rad: f64,

    /// Throttle between -1 and +1, negative values brake.
    pub throttle: f64,
}

/// The result of one optimisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Solution {
    /// The command to apply
    pub command: ActuatorCommand,

    /// The trajectory the optimizer expects the vehicle to follow under the command, in the local
    /// frame.
    pub predicted: Trace,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors produced by the controller.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("The state given to the optimizer is not finite: {0:?}")]
    NonFiniteState(VehicleState),

    #[error("The optimizer produced a non-finite command: {0:?}")]
    NonFiniteCommand(ActuatorCommand),

    #[error("The optimizer produced a throttle of {0} which is outside [-1, 1]")]
    ThrottleOutOfRange(f64),

    #[error("The predicted trace contains non-finite points")]
    NonFiniteTrace,

    #[error("The predicted trace has {x} x coordinates but {y} y coordinates")]
    MismatchedTrace {
        x: usize,
        y: usize
    },

    #[error("The optimizer failed to find a solution: {0}")]
    SolverFailed(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Solution {
    /// Check that the solution can be sent to the simulator.
    pub fn validate(&self) -> Result<(), ControllerError> {
        let cmd = &self.command;

        if !cmd.steer_rad.is_finite() || !cmd.throttle.is_finite() {
            return Err(ControllerError::NonFiniteCommand(*cmd))
        }

        if cmd.throttle < -1.0 || cmd.throttle > 1.0 {
            return Err(ControllerError::ThrottleOutOfRange(cmd.throttle))
        }

        if self.predicted.len().is_none() {
            return Err(ControllerError::MismatchedTrace {
                x: self.predicted.x.len(),
                y: self.predicted.y.len()
            })
        }

        if !self.predicted.is_finite() {
            return Err(ControllerError::NonFiniteTrace)
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run the optimizer and check both its input and its output.
pub fn solve_checked<O>(
    optimizer: &mut O,
    state: &VehicleState,
    poly: &Polynomial
) -> Result<Solution, ControllerError>
where
    O: Optimizer + ?Sized
{
    if !state.is_finite() {
        return Err(ControllerError::NonFiniteState(*state))
    }

    let solution = optimizer.solve(state, poly)?;
    solution.validate()?;

    Ok(solution)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Returns a fixed solution regardless of the input.
    struct Fixed(Solution);

    impl Optimizer for Fixed {
        fn solve(&mut self, _: &VehicleState, _: &Polynomial)
            -> Result<Solution, ControllerError>
        {
            Ok(self.0.clone())
        }
    }

    fn state() -> VehicleState {
        VehicleState {
            x_m: 1.0,
            y_m: 0.0,
            psi_rad: 0.01,
            v_ms: 10.0,
            cte_m: 0.2,
            epsi_rad: -0.05,
        }
    }

    fn solution(steer_rad: f64, throttle: f64) -> Solution {
        let mut predicted = Trace::default();
        predicted.push(1.0, 0.0);
        predicted.push(2.0, 0.1);

        Solution {
            command: ActuatorCommand { steer_rad, throttle },
            predicted
        }
    }

    #[test]
    fn test_valid_solution() {
        let poly = Polynomial::new(vec![0.0; 4]);
        let mut opt = Fixed(solution(0.1, 0.5));

        let sol = solve_checked(&mut opt, &state(), &poly).unwrap();

        assert_eq!(sol, solution(0.1, 0.5));
    }

    #[test]
    fn test_invalid_solutions() {
        let poly = Polynomial::new(vec![0.0; 4]);

        let mut opt = Fixed(solution(std::f64::NAN, 0.5));
        assert!(matches!(
            solve_checked(&mut opt, &state(), &poly),
            Err(ControllerError::NonFiniteCommand(_))
        ));

        let mut opt = Fixed(solution(0.0, 1.5));
        assert!(matches!(
            solve_checked(&mut opt, &state(), &poly),
            Err(ControllerError::ThrottleOutOfRange(_))
        ));

        let mut sol = solution(0.0, 0.0);
        sol.predicted.x.push(3.0);
        let mut opt = Fixed(sol);
        assert!(matches!(
            solve_checked(&mut opt, &state(), &poly),
            Err(ControllerError::MismatchedTrace { x: 3, y: 2 })
        ));

        let mut sol = solution(0.0, 0.0);
        sol.predicted.push(std::f64::NEG_INFINITY, 0.0);
        let mut opt = Fixed(sol);
        assert!(matches!(
            solve_checked(&mut opt, &state(), &poly),
            Err(ControllerError::NonFiniteTrace)
        ));
    }

    #[test]
    fn test_non_finite_state() {
        let poly = Polynomial::new(vec![0.0; 4]);
        let mut opt = Fixed(solution(0.0, 0.0));

        let mut s = state();
        s.v_ms = std::f64::INFINITY;

        assert!(matches!(
            solve_checked(&mut opt, &s, &poly),
            Err(ControllerError::NonFiniteState(_))
        ));
    }
}
