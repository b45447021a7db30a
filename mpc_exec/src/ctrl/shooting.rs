//! # Shooting optimizer
//!
//! A receding horizon search over constant actuation. Each candidate steering and throttle pair is
//! held over the whole horizon and rolled out through the kinematic bicycle model, the candidate
//! with the lowest cost wins. The search starts on a coarse grid spanning the full actuation range
//! then refines around the best candidate, shrinking the grid to the previous grid's spacing on
//! each pass.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;

use super::{ActuatorCommand, ControllerError, Optimizer, Solution};
use crate::{
    latency::VehicleState,
    params::{ExecParams, OptimizerParams},
    poly::Polynomial,
    trace::Trace
};
use util::maths::linspace;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The default optimizer.
#[derive(Debug, Clone)]
pub struct ShootingOptimizer {
    params: OptimizerParams,

    /// Units: meters
    lf_m: f64,

    /// Units: radians
    max_steer_rad: f64,
}

/// Best candidate found so far.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    command: ActuatorCommand,
    cost: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ShootingOptimizer {
    pub fn new(params: &ExecParams) -> Self {
        Self {
            params: params.optimizer.clone(),
            lf_m: params.lf_m,
            max_steer_rad: params.max_steer_rad(),
        }
    }

    /// Simulate the command over the horizon, returning the accumulated cost.
    ///
    /// If `trace` is given the position at the end of each step is appended to it.
    fn rollout(
        &self,
        state: &VehicleState,
        poly: &Polynomial,
        command: &ActuatorCommand,
        mut trace: Option<&mut Trace>
    ) -> f64 {
        let p = &self.params;
        let dt = p.step_s;

        let mut x = state.x_m;
        let mut y = state.y_m;
        let mut psi = state.psi_rad;
        let mut v = state.v_ms;

        let yaw_gain = -command.steer_rad / self.lf_m;

        let mut cost = p.horizon_steps as f64 * (
            p.steer_weight * command.steer_rad.powi(2)
            + p.throttle_weight * command.throttle.powi(2)
        );

        for _ in 0..p.horizon_steps {
            x += v * psi.cos() * dt;
            y += v * psi.sin() * dt;
            psi += v * yaw_gain * dt;
            v += command.throttle * dt;

            let cte = poly.eval(x) - y;
            let epsi = psi - poly.tangent_angle(x);

            cost += p.cte_weight * cte.powi(2)
                + p.epsi_weight * epsi.powi(2)
                + p.speed_weight * (v - p.ref_speed_ms).powi(2);

            if let Some(t) = trace.as_mut() {
                t.push(x, y);
            }
        }

        cost
    }

    /// Evaluate every pair of the two candidate lists, keeping the best into `best`.
    fn search(
        &self,
        state: &VehicleState,
        poly: &Polynomial,
        steers: &[f64],
        throttles: &[f64],
        best: &mut Option<Candidate>
    ) {
        for &steer_rad in steers {
            for &throttle in throttles {
                let command = ActuatorCommand { steer_rad, throttle };
                let cost = self.rollout(state, poly, &command, None);

                // NaN costs never compare less so are never selected
                let better = match best {
                    Some(b) => cost < b.cost,
                    None => cost.is_finite()
                };

                if better {
                    *best = Some(Candidate { command, cost });
                }
            }
        }
    }
}

impl Optimizer for ShootingOptimizer {
    fn solve(&mut self, state: &VehicleState, poly: &Polynomial)
        -> Result<Solution, ControllerError>
    {
        let p = &self.params;
        let max_steer = self.max_steer_rad;

        let mut steer_span = max_steer;
        let mut throttle_span = 1.0;
        let mut best = None;

        // Coarse grid over the full range
        let steers = linspace(-max_steer, max_steer, p.num_steer_candidates);
        let throttles = linspace(-1.0, 1.0, p.num_throttle_candidates);
        self.search(state, poly, &steers, &throttles, &mut best);

        for pass in 0..p.refine_passes {
            let centre = match best {
                Some(b) => b.command,
                None => break
            };

            // The new grid spans one spacing of the previous grid either side of the centre
            steer_span = 2.0 * steer_span / (p.num_steer_candidates.max(2) - 1) as f64;
            throttle_span = 2.0 * throttle_span / (p.num_throttle_candidates.max(2) - 1) as f64;

            let steers: Vec<f64> = linspace(
                centre.steer_rad - steer_span,
                centre.steer_rad + steer_span,
                p.num_steer_candidates
            )
            .into_iter()
            .map(|s| s.max(-max_steer).min(max_steer))
            .collect();
            let throttles: Vec<f64> = linspace(
                centre.throttle - throttle_span,
                centre.throttle + throttle_span,
                p.num_throttle_candidates
            )
            .into_iter()
            .map(|t| t.max(-1.0).min(1.0))
            .collect();

            self.search(state, poly, &steers, &throttles, &mut best);

            trace!("Refinement pass {}: {:?}", pass, best);
        }

        let best = match best {
            Some(b) => b,
            None => return Err(ControllerError::SolverFailed(
                "no candidate produced a finite cost".into()
            ))
        };

        let mut predicted = Trace::with_capacity(p.horizon_steps);
        self.rollout(state, poly, &best.command, Some(&mut predicted));

        Ok(Solution {
            command: best.command,
            predicted
        })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn state(v_ms: f64) -> VehicleState {
        VehicleState {
            x_m: 0.0,
            y_m: 0.0,
            psi_rad: 0.0,
            v_ms,
            cte_m: 0.0,
            epsi_rad: 0.0,
        }
    }

    #[test]
    fn test_on_path_holds_straight() {
        let params = ExecParams::default();
        let mut opt = ShootingOptimizer::new(&params);

        let poly = Polynomial::new(vec![0.0; 4]);
        let sol = opt.solve(&state(10.0), &poly).unwrap();

        assert!(sol.command.steer_rad.abs() < 1e-6, "{:?}", sol.command);
        assert_eq!(sol.predicted.len(), Some(params.optimizer.horizon_steps));
        assert!(sol.predicted.y.iter().all(|y| y.abs() < 1e-6));
        sol.validate().unwrap();
    }

    #[test]
    fn test_steers_towards_path() {
        let params = ExecParams::default();
        let mut opt = ShootingOptimizer::new(&params);

        // Path 2 m to the left of the vehicle, reaching it needs an anticlockwise turn which is a
        // negative steering angle
        let poly = Polynomial::new(vec![2.0, 0.0, 0.0, 0.0]);
        let sol = opt.solve(&state(10.0), &poly).unwrap();

        assert!(sol.command.steer_rad < 0.0, "{:?}", sol.command);
        assert!(sol.command.steer_rad >= -params.max_steer_rad());
        assert!(sol.predicted.y.last().copied().unwrap_or(0.0) > 0.0);

        // And the mirror image
        let poly = Polynomial::new(vec![-2.0, 0.0, 0.0, 0.0]);
        let sol = opt.solve(&state(10.0), &poly).unwrap();

        assert!(sol.command.steer_rad > 0.0, "{:?}", sol.command);
    }

    #[test]
    fn test_accelerates_to_reference_speed() {
        let params = ExecParams::default();
        let mut opt = ShootingOptimizer::new(&params);
        let poly = Polynomial::new(vec![0.0; 4]);

        let sol = opt.solve(&state(0.0), &poly).unwrap();
        assert!(sol.command.throttle > 0.0, "{:?}", sol.command);

        let sol = opt.solve(&state(2.0 * params.optimizer.ref_speed_ms), &poly).unwrap();
        assert!(sol.command.throttle < 0.0, "{:?}", sol.command);
        assert!(sol.command.throttle >= -1.0);
    }

    #[test]
    fn test_non_finite_costs() {
        let mut opt = ShootingOptimizer::new(&ExecParams::default());
        let poly = Polynomial::new(vec![std::f64::NAN; 4]);

        assert!(matches!(
            opt.solve(&state(10.0), &poly),
            Err(ControllerError::SolverFailed(_))
        ));
    }
}
