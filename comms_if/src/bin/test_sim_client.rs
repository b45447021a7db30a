//! Simple simulator client test
//!
//! Connects to a running `mpc_exec`, sends one telemetry frame describing a vehicle sitting on a
//! gently curving road and prints the reply.

use comms_if::{
    net::tungstenite::{self, Message},
    sim::{TelemetryFrame, EVENT_PREFIX, TELEMETRY_EVENT},
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "test_sim_client", about = "Send a telemetry frame to the MPC exec")]
struct Opt {
    /// Websocket URL of the exec
    #[structopt(long, default_value = "ws://127.0.0.1:4567/")]
    url: String,

    /// Vehicle speed in miles/hour
    #[structopt(long, default_value = "20")]
    speed: f64,

    /// Number of frames to send
    #[structopt(long, default_value = "1")]
    count: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let (mut socket, _) = tungstenite::connect(opt.url.as_str())?;
    println!("Connected to {}", opt.url);

    let ptsx: Vec<f64> = (0..6).map(|i| i as f64 * 10.0).collect();
    let ptsy: Vec<f64> = ptsx.iter().map(|x| 0.002 * x * x).collect();

    let frame = TelemetryFrame {
        ptsx,
        ptsy,
        x: 0.0,
        y: 0.5,
        psi: 0.05,
        speed: opt.speed,
        steering_angle: 0.0,
        throttle: 0.2,
    };

    let msg = format!(
        "{}{}",
        EVENT_PREFIX,
        serde_json::to_string(&(TELEMETRY_EVENT, &frame))?
    );

    for _ in 0..opt.count {
        println!("Sending: {}", msg);
        socket.send(Message::Text(msg.clone()))?;

        match socket.read()? {
            Message::Text(r) => println!("Response: {}", r),
            m => println!("Unexpected response: {:?}", m)
        }
    }

    socket.close(None)?;

    Ok(())
}
