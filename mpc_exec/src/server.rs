//! # Simulator server
//!
//! Accepts simulator connections and runs an independent cycle driver for each of them on its own
//! thread. Within a connection cycles are strictly sequential: the next frame is only read once the
//! reply to the previous one has been sent.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{net::{SocketAddr, TcpStream}, sync::Arc, thread};

use log::{debug, error, info, trace, warn};

use comms_if::net::{self, Accepted, NetError, SimConnection, SimServer};
use util::module::State;

use crate::{
    ctrl::{Optimizer, ShootingOptimizer},
    cycle::{CycleDriver, ReplyDelay, SleepDelay},
    params::ExecParams
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A bidirectional stream of text frames.
pub trait FrameTransport {
    /// Block until the next frame arrives, `None` once the peer has gone.
    fn recv_frame(&mut self) -> Result<Option<String>, NetError>;

    fn send_frame(&mut self, frame: String) -> Result<(), NetError>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FrameTransport for SimConnection {
    fn recv_frame(&mut self) -> Result<Option<String>, NetError> {
        self.recv_text()
    }

    fn send_frame(&mut self, frame: String) -> Result<(), NetError> {
        self.send_text(frame)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Accept streams forever, handling each one on a new thread.
///
/// Accept failures are logged and do not stop the server.
pub fn run(server: SimServer, params: Arc<ExecParams>) {
    loop {
        let (stream, peer) = match server.accept() {
            Ok(s) => s,
            Err(e) => {
                error!("{}", e);
                continue
            }
        };

        let params = params.clone();

        let spawned = thread::Builder::new()
            .name(format!("conn {}", peer))
            .spawn(move || handle_stream(stream, peer, params));

        if let Err(e) = spawned {
            error!("Could not start a thread for {}: {}", peer, e);
        }
    }
}

/// Handle one accepted stream to completion.
fn handle_stream(stream: TcpStream, peer: SocketAddr, params: Arc<ExecParams>) {
    let mut connection = match net::accept_stream(stream, peer) {
        Ok(Accepted::Connection(c)) => c,
        Ok(Accepted::HttpServed { path }) => {
            debug!("Served HTTP request for \"{}\" from {}", path, peer);
            return
        },
        Err(e) => {
            warn!("Rejected stream from {}: {}", peer, e);
            return
        }
    };

    info!("Connected to {}", peer);

    let mut driver = CycleDriver::new(ShootingOptimizer::new(&params), SleepDelay);
    if let Err(e) = driver.init(params) {
        error!("Could not initialise the cycle driver for {}: {}", peer, e);
        return
    }

    match serve_connection(&mut connection, &mut driver) {
        Ok(num_cycles) => info!("Disconnected from {} after {} cycles", peer, num_cycles),
        Err(e) => warn!("Connection to {} lost: {}", peer, e)
    }
}

/// Run cycles on frames from the transport until it closes.
///
/// Returns the number of frames processed.
pub fn serve_connection<T, O, D>(
    transport: &mut T,
    driver: &mut CycleDriver<O, D>
) -> Result<usize, NetError>
where
    T: FrameTransport,
    O: Optimizer,
    D: ReplyDelay
{
    let mut num_cycles = 0;

    while let Some(frame) = transport.recv_frame()? {
        num_cycles += 1;

        let (reply, report) = match driver.proc(frame.as_str()) {
            Ok(r) => r,
            Err(e) => match e {}
        };

        trace!("Cycle {} report: {:?}", num_cycles, report);

        if let Some(reply) = reply {
            transport.send_frame(reply)?;
        }
    }

    Ok(num_cycles)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::{collections::VecDeque, io::{Read, Write}, net::TcpStream};

    use comms_if::{
        net::{tungstenite::{self, Message}, NetParams, HTTP_ROOT_BODY},
        sim::MANUAL_FRAME
    };
    use crate::cycle::NoDelay;

    const STRAIGHT_TELEMETRY: &str = "42[\"telemetry\",{\"ptsx\":[10,20,30,40,50,60],\
        \"ptsy\":[0,0,0,0,0,0],\"x\":0,\"y\":0,\"psi\":0,\"speed\":0,\"steering_angle\":0,\
        \"throttle\":0}]";

    /// In memory transport replaying a fixed list of frames.
    #[derive(Default)]
    struct MockTransport {
        inbound: VecDeque<String>,
        outbound: Vec<String>,
    }

    impl FrameTransport for MockTransport {
        fn recv_frame(&mut self) -> Result<Option<String>, NetError> {
            Ok(self.inbound.pop_front())
        }

        fn send_frame(&mut self, frame: String) -> Result<(), NetError> {
            self.outbound.push(frame);
            Ok(())
        }
    }

    fn driver() -> CycleDriver<ShootingOptimizer, NoDelay> {
        let params = Arc::new(ExecParams::default());
        let mut driver = CycleDriver::new(ShootingOptimizer::new(&params), NoDelay);
        driver.init(params).unwrap();
        driver
    }

    #[test]
    fn test_serve_connection() {
        let mut transport = MockTransport {
            inbound: vec![
                "0{\"sid\":\"abc\"}",
                STRAIGHT_TELEMETRY,
                "42[\"telemetry\",null]",
                "2",
                STRAIGHT_TELEMETRY,
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            ..Default::default()
        };

        let num_cycles = serve_connection(&mut transport, &mut driver()).unwrap();

        assert_eq!(num_cycles, 5);

        // Only events are answered, in order
        assert_eq!(transport.outbound.len(), 3);
        assert!(transport.outbound[0].starts_with("42[\"steer\","));
        assert_eq!(transport.outbound[1], MANUAL_FRAME);
        assert!(transport.outbound[2].starts_with("42[\"steer\","));
    }

    #[test]
    fn test_serve_websocket() {
        let server = SimServer::bind(&NetParams {
            bind_addr: String::from("127.0.0.1"),
            port: 0,
        })
        .unwrap();
        let addr = server.local_addr().unwrap();

        thread::spawn(move || run(server, Arc::new(ExecParams::default())));

        // Plain HTTP is answered with the static page
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        assert!(response.ends_with(HTTP_ROOT_BODY));

        // Two simultaneous simulators are served independently
        let url = format!("ws://{}/", addr);
        let (mut sim_a, _) = tungstenite::connect(url.as_str()).unwrap();
        let (mut sim_b, _) = tungstenite::connect(url.as_str()).unwrap();

        sim_a.send(Message::Text(STRAIGHT_TELEMETRY.into())).unwrap();
        sim_b.send(Message::Text("42[\"telemetry\",null]".into())).unwrap();

        match sim_b.read().unwrap() {
            Message::Text(t) => assert_eq!(t, MANUAL_FRAME),
            m => panic!("Unexpected message {:?}", m)
        }
        match sim_a.read().unwrap() {
            Message::Text(t) => assert!(t.starts_with("42[\"steer\","), "{}", t),
            m => panic!("Unexpected message {:?}", m)
        }

        for mut sim in vec![sim_a, sim_b] {
            sim.close(None).unwrap();
            while sim.read().is_ok() {}
        }
    }
}
