//! Main MPC executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Bind the simulator server
//!     - For each simulator connection, on its own thread:
//!         - Receive a frame
//!         - Cycle processing:
//!             - Frame decoding
//!             - Waypoint transformation into the vehicle frame
//!             - Reference polynomial fitting
//!             - Latency compensation
//!             - Optimisation
//!             - Response encoding
//!         - Hold for the actuation delay and send the reply
//!
//! # Modules
//!
//! All cyclic processing (i.e. `cycle::CycleDriver`) shall implement the `util::module::State`
//! trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{debug, info};
use std::sync::Arc;
use structopt::StructOpt;

// Internal
use comms_if::net::{NetParams, SimServer};
use mpc_lib::{params::ExecParams, server};
use util::{
    host,
    logger::{logger_init, parse_level},
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "mpc_exec", about = "MPC controller for the driving simulator")]
struct Opt {
    /// Port to listen on, overriding `net.toml`
    #[structopt(short, long)]
    port: Option<u16>,

    /// Minimum log level, one of "info", "debug" or "trace"
    #[structopt(long, default_value = "debug")]
    log_level: String,

    /// Exec parameter file, relative to the params directory
    #[structopt(long, default_value = "mpc_exec.toml")]
    params: String,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let log_level = parse_level(&opt.log_level)
        .ok_or_else(|| eyre!("Unknown log level \"{}\"", opt.log_level))?;

    // Initialise session
    let session = Session::new(
        "mpc_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("MPC Executable\n");
    info!("Running on: {}", host::get_platform());
    info!("Session directory: {:?}\n", session.session_root);

    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let mut net_params: NetParams = util::params::load(
        "net.toml"
    ).wrap_err("Could not load net params")?;

    if let Some(port) = opt.port {
        net_params.port = port;
    }

    let exec_params: ExecParams = util::params::load(
        &opt.params
    ).wrap_err("Could not load exec params")?;

    exec_params.validate()
        .wrap_err("Invalid exec params")?;

    debug!("Exec parameters: {:#?}", exec_params);
    info!("Exec parameters loaded");

    // ---- INITIALISE NETWORK ----

    let server = SimServer::bind(&net_params)
        .wrap_err("Failed to listen to port")?;

    info!("Listening to port {}", net_params.port);

    // ---- MAIN LOOP ----

    server::run(server, Arc::new(exec_params));

    Ok(())
}
