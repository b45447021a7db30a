//! # Cycle driver
//!
//! One cycle takes a single raw message from the simulator and produces at most one reply. The
//! cycle is a state machine:
//!
//! ```text
//! AWAIT_FRAME -> DECODE -> NO_TELEMETRY -------------------------------------> AWAIT_FRAME
//!                       -> TELEMETRY -> TRANSFORM -> FIT -> COMPENSATE -> SOLVE
//!                                       -> ENCODE -> REPLY ------------------> AWAIT_FRAME
//! ```
//!
//! A failure in any stage after `TELEMETRY` moves the machine to `ERROR_REPLY`, which answers with
//! the manual frame. No failure in a cycle is fatal to the connection, the next frame always starts
//! a fresh cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{convert::Infallible, sync::Arc, time::{Duration, Instant}};

use log::{debug, trace, warn};
use nalgebra::Point2;
use serde::Serialize;

use comms_if::sim::{
    self, DecodeError, EncodeError, SimEvent, TelemetryFrame, MANUAL_FRAME
};
use util::{convert::{mph_to_ms, rad_to_deg}, module::State, time::std_duration_to_millis};

use crate::{
    ctrl::{self, ActuatorCommand, ControllerError, Optimizer, Solution},
    geometry::{self, GeometryError, Pose2},
    latency::{CurrentActuation, LatencyModel, VehicleState},
    params::{ExecParams, ParamsError},
    poly::{FitError, Polynomial},
    response,
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The hold between computing a command and sending it.
///
/// The hold stands in for the actuation latency of a real vehicle. Implementations only ever
/// block the calling connection.
pub trait ReplyDelay {
    fn hold(&mut self, duration: Duration);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Suspends the current thread for the hold duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepDelay;

/// Does not hold at all, for use in tests and benchmarks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

/// Drives one connection's cycles.
pub struct CycleDriver<O, D> {
    params: Arc<ExecParams>,

    optimizer: O,

    delay: D,
}

/// Report on a single cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    /// States visited during the cycle, in order.
    pub path: Vec<CycleState>,

    /// Coefficients of the fitted reference polynomial, ascending order.
    pub poly_coeffs: Option<Vec<f64>>,

    /// Latency compensated state handed to the optimizer.
    pub state: Option<VehicleState>,

    /// Command produced by the optimizer.
    pub command: Option<ActuatorCommand>,

    /// Time spent in the optimizer.
    ///
    /// Units: milliseconds
    pub solve_time_ms: Option<f64>,

    /// Description of the error which caused a fallback reply, if any.
    pub error: Option<String>,
}

/// Measurements taken from a telemetry frame.
#[derive(Debug, Clone)]
struct Measurement {
    pose: Pose2,
    waypoints_m_world: Vec<Point2<f64>>,
    actuation: CurrentActuation,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Labels of the cycle's states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleState {
    AwaitFrame,
    Decode,
    NoTelemetry,
    Telemetry,
    Transform,
    Fit,
    Compensate,
    Solve,
    Encode,
    Reply,
    ErrorReply,
}

/// Errors which cause a cycle to fall back to the manual reply.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Could not decode the frame: {0}")]
    Decode(#[from] DecodeError),

    #[error("Could not transform the waypoints: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Could not fit the reference polynomial: {0}")]
    Fit(#[from] FitError),

    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),

    #[error("Could not encode the response: {0}")]
    Encode(#[from] EncodeError),
}

/// A state of the cycle along with the data it works on.
enum Stage {
    Decode,
    NoTelemetry,
    Telemetry(TelemetryFrame),
    Transform(Measurement),
    Fit {
        waypoints_m_local: Vec<Point2<f64>>,
        actuation: CurrentActuation
    },
    Compensate {
        poly: Polynomial,
        actuation: CurrentActuation
    },
    Solve {
        poly: Polynomial,
        state: VehicleState
    },
    Encode {
        poly: Polynomial,
        solution: Solution
    },
    Reply(String),
    ErrorReply(CycleError),
}

/// Outcome of advancing the cycle by one state.
enum Step {
    /// Continue into the given stage.
    Next(Stage),

    /// The cycle is complete, with the reply to send if any.
    Done(Option<String>),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ReplyDelay for SleepDelay {
    fn hold(&mut self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

impl ReplyDelay for NoDelay {
    fn hold(&mut self, _: Duration) {}
}

impl Stage {
    fn label(&self) -> CycleState {
        match self {
            Stage::Decode => CycleState::Decode,
            Stage::NoTelemetry => CycleState::NoTelemetry,
            Stage::Telemetry(_) => CycleState::Telemetry,
            Stage::Transform(_) => CycleState::Transform,
            Stage::Fit { .. } => CycleState::Fit,
            Stage::Compensate { .. } => CycleState::Compensate,
            Stage::Solve { .. } => CycleState::Solve,
            Stage::Encode { .. } => CycleState::Encode,
            Stage::Reply(_) => CycleState::Reply,
            Stage::ErrorReply(_) => CycleState::ErrorReply,
        }
    }
}

impl From<TelemetryFrame> for Measurement {
    fn from(frame: TelemetryFrame) -> Self {
        Measurement {
            pose: Pose2 {
                position_m: Point2::new(frame.x, frame.y),
                heading_rad: frame.psi,
            },
            waypoints_m_world: frame.waypoints().map(|(x, y)| Point2::new(x, y)).collect(),
            actuation: CurrentActuation {
                v_ms: mph_to_ms(frame.speed),
                steer_rad: frame.steering_angle,
                throttle: frame.throttle,
            },
        }
    }
}

impl<O, D> CycleDriver<O, D>
where
    O: Optimizer,
    D: ReplyDelay
{
    /// Create a new driver with the default parameters, call `init` to set them.
    pub fn new(optimizer: O, delay: D) -> Self {
        Self {
            params: Arc::new(ExecParams::default()),
            optimizer,
            delay
        }
    }

    pub fn params(&self) -> &ExecParams {
        &self.params
    }

    fn latency_model(&self) -> LatencyModel {
        LatencyModel {
            latency_s: self.params.actuation_latency_s,
            lf_m: self.params.lf_m,
        }
    }

    /// Advance the machine by one state.
    ///
    /// Returns `Step::Done` with the reply to send, if any, once the cycle is complete.
    fn step(
        &mut self,
        stage: Stage,
        raw: &str,
        report: &mut CycleReport
    ) -> Step {
        let next = match stage {
            Stage::Decode => match sim::decode_frame(raw) {
                Ok(SimEvent::Telemetry(frame)) => Stage::Telemetry(frame),
                Ok(SimEvent::NoTelemetry) => Stage::NoTelemetry,
                Ok(SimEvent::NotEvent) => {
                    trace!("Ignoring non-event frame: {:?}", raw);
                    return Step::Done(None)
                },
                Ok(SimEvent::Other(name)) => {
                    debug!("Ignoring \"{}\" event", name);
                    return Step::Done(None)
                },
                Err(e) => {
                    warn!("Could not decode frame, replying with manual: {}", e);
                    report.error = Some(CycleError::from(e).to_string());
                    Stage::NoTelemetry
                }
            },

            Stage::NoTelemetry => return Step::Done(Some(MANUAL_FRAME.to_string())),

            Stage::Telemetry(frame) => {
                trace!("Telemetry: {:?}", frame);
                Stage::Transform(Measurement::from(frame))
            },

            Stage::Transform(m) => {
                match geometry::world_to_local(&m.waypoints_m_world, &m.pose) {
                    Ok(waypoints_m_local) => Stage::Fit {
                        waypoints_m_local,
                        actuation: m.actuation
                    },
                    Err(e) => Stage::ErrorReply(e.into())
                }
            },

            Stage::Fit { waypoints_m_local, actuation } => {
                match Polynomial::fit(&waypoints_m_local, self.params.poly_degree) {
                    Ok(poly) => {
                        trace!("Reference polynomial: {:?}", poly.coeffs());
                        report.poly_coeffs = Some(poly.coeffs().to_vec());
                        Stage::Compensate { poly, actuation }
                    },
                    Err(e) => Stage::ErrorReply(e.into())
                }
            },

            Stage::Compensate { poly, actuation } => {
                let state = self.latency_model().compensate(&actuation, &poly);
                report.state = Some(state);
                Stage::Solve { poly, state }
            },

            Stage::Solve { poly, state } => {
                let start = Instant::now();
                let result = ctrl::solve_checked(&mut self.optimizer, &state, &poly);
                report.solve_time_ms = Some(std_duration_to_millis(start.elapsed()));

                match result {
                    Ok(solution) => {
                        report.command = Some(solution.command);
                        Stage::Encode { poly, solution }
                    },
                    Err(e) => Stage::ErrorReply(e.into())
                }
            },

            Stage::Encode { poly, solution } => {
                let reference = response::reference_trace(
                    &poly,
                    self.params.ref_trace_step_m,
                    self.params.ref_trace_num_points
                );

                match response::encode_response(
                    solution,
                    reference,
                    self.params.max_steer_rad()
                ) {
                    Ok(frame) => Stage::Reply(frame),
                    Err(e) => Stage::ErrorReply(e.into())
                }
            },

            Stage::Reply(frame) => {
                self.delay.hold(Duration::from_millis(self.params.reply_delay_ms));
                return Step::Done(Some(frame))
            },

            Stage::ErrorReply(e) => {
                warn!("Cycle failed, replying with manual: {}", e);
                report.error = Some(e.to_string());
                return Step::Done(Some(MANUAL_FRAME.to_string()))
            }
        };

        Step::Next(next)
    }
}

impl<O, D> State for CycleDriver<O, D>
where
    O: Optimizer,
    D: ReplyDelay
{
    type InitData = Arc<ExecParams>;
    type InitError = ParamsError;

    type InputData = str;
    type OutputData = Option<String>;
    type StatusReport = CycleReport;
    type ProcError = Infallible;

    /// Initialise the driver.
    ///
    /// Expected init data is the exec parameters, which are validated before use.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.validate()?;
        self.params = init_data;

        Ok(())
    }

    /// Run one full cycle on a raw message.
    ///
    /// The output is the frame to send back, or `None` if the message is not answered.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let mut report = CycleReport::default();
        report.path.push(CycleState::AwaitFrame);

        let mut stage = Stage::Decode;

        let reply = loop {
            report.path.push(stage.label());

            stage = match self.step(stage, input_data, &mut report) {
                Step::Next(s) => s,
                Step::Done(reply) => break reply
            };
        };

        report.path.push(CycleState::AwaitFrame);

        if let (Some(state), Some(cmd)) = (report.state, report.command) {
            debug!(
                "cte = {:.4} m, epsi = {:.4} rad, steer = {:.2} deg, throttle = {:.4}",
                state.cte_m, state.epsi_rad, rad_to_deg(cmd.steer_rad), cmd.throttle
            );
        }

        Ok((reply, report))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
