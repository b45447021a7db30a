//! # Network Module
//!
//! This module provides networking abstractions over the websocket transport used by the
//! simulator. The server listens on a plain TCP socket. Each accepted stream is either upgraded to
//! a websocket, or, if the peer made an ordinary HTTP request, answered with a static body and
//! closed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    thread,
    time::Duration,
};
use log::{debug, trace};
use serde::Deserialize;
use tungstenite::{Message, WebSocket};

// Export tungstenite
pub use tungstenite;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Body served for an HTTP request on the root path.
pub const HTTP_ROOT_BODY: &str = "<h1>Hello world!</h1>";

/// Maximum size of an HTTP request head that will be inspected.
const MAX_REQUEST_HEAD_LEN: usize = 8192;

/// Maximum number of headers parsed from a request head.
const MAX_REQUEST_HEADERS: usize = 32;

/// Time to wait between peeks while the request head is still arriving.
const HEAD_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Maximum time a peer may take to send its request head.
const HEAD_TIMEOUT: Duration = Duration::from_secs(5);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters, loaded from `net.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct NetParams {
    /// Address the simulator server binds to
    pub bind_addr: String,

    /// Port the simulator server listens on
    pub port: u16,
}

/// Listening server accepting connections from the simulator.
pub struct SimServer {
    listener: TcpListener,
}

/// An established websocket connection to the simulator.
pub struct SimConnection {
    socket: WebSocket<TcpStream>,
    peer: SocketAddr,
}

/// The result of handling a freshly accepted stream.
pub enum Accepted {
    /// The peer upgraded to a websocket.
    Connection(SimConnection),

    /// The peer made a plain HTTP request which has been answered.
    HttpServed {
        /// Path the peer requested
        path: String,
    },
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NetError {
    #[error("Could not bind the server to {0}: {1}")]
    BindError(String, std::io::Error),

    #[error("Could not accept a connection: {0}")]
    AcceptError(std::io::Error),

    #[error("Could not read the request head: {0}")]
    RequestReadError(std::io::Error),

    #[error("The peer closed the stream before sending a request")]
    EmptyRequest,

    #[error("The request head is malformed or too long")]
    MalformedRequest,

    #[error("Could not write the HTTP response: {0}")]
    HttpWriteError(std::io::Error),

    #[error("The websocket handshake failed: {0}")]
    HandshakeError(String),

    #[error("Could not send a message to the simulator: {0}")]
    SendError(tungstenite::Error),

    #[error("Could not recieve a message from the simulator: {0}")]
    RecvError(tungstenite::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NetParams {
    fn default() -> Self {
        Self {
            bind_addr: String::from("0.0.0.0"),
            port: 4567,
        }
    }
}

impl NetParams {
    /// The `address:port` string the server binds to.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

impl SimServer {
    /// Bind a new server to the endpoint in the parameters.
    pub fn bind(params: &NetParams) -> Result<Self, NetError> {
        let endpoint = params.endpoint();

        let listener = TcpListener::bind(endpoint.as_str())
            .map_err(|e| NetError::BindError(endpoint, e))?;

        Ok(Self { listener })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.listener.local_addr().map_err(NetError::AcceptError)
    }

    /// Block until a new stream is accepted.
    pub fn accept(&self) -> Result<(TcpStream, SocketAddr), NetError> {
        self.listener.accept().map_err(NetError::AcceptError)
    }
}

impl SimConnection {
    /// Address of the connected peer.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Block until the next text message arrives.
    ///
    /// Control and binary frames are skipped. `Ok(None)` is returned once the connection has been
    /// closed.
    pub fn recv_text(&mut self) -> Result<Option<String>, NetError> {
        loop {
            match self.socket.read() {
                Ok(Message::Text(t)) => return Ok(Some(t)),
                // Keep reading so the close reply queued by tungstenite gets flushed
                Ok(Message::Close(frame)) => {
                    debug!("Close frame from {}: {:?}", self.peer, frame);
                    continue
                },
                Ok(m) => {
                    trace!("Skipping non-text message from {}: {:?}", self.peer, m);
                    continue
                },
                Err(tungstenite::Error::ConnectionClosed)
                | Err(tungstenite::Error::AlreadyClosed) => return Ok(None),
                Err(e) => return Err(NetError::RecvError(e))
            }
        }
    }

    /// Send a text message to the simulator.
    pub fn send_text(&mut self, text: String) -> Result<(), NetError> {
        self.socket
            .send(Message::Text(text))
            .map_err(NetError::SendError)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Handle a freshly accepted stream.
///
/// Websocket upgrade requests are handed to tungstenite and returned as a connection, any other
/// HTTP request is answered with [`HTTP_ROOT_BODY`] for the root path and an empty body otherwise.
pub fn accept_stream(stream: TcpStream, peer: SocketAddr) -> Result<Accepted, NetError> {
    let (head_len, request) = peek_request_head(&stream)?;

    if request.upgrade {
        let socket = tungstenite::accept(stream)
            .map_err(|e| NetError::HandshakeError(e.to_string()))?;

        return Ok(Accepted::Connection(SimConnection { socket, peer }))
    }

    serve_http(stream, head_len, &request.path)?;

    Ok(Accepted::HttpServed { path: request.path })
}

// ------------------------------------------------------------------------------------------------
// PRIVATE
// ------------------------------------------------------------------------------------------------

/// The parts of an HTTP request head that decide how a stream is handled.
#[derive(Debug, PartialEq)]
struct RequestHead {
    path: String,
    upgrade: bool,
}

/// Peek at the stream until a full request head is available, without consuming it.
///
/// The head is left in the stream so the websocket handshake can read it again. Returns the length
/// of the head along with its parsed parts.
fn peek_request_head(stream: &TcpStream) -> Result<(usize, RequestHead), NetError> {
    stream
        .set_read_timeout(Some(HEAD_TIMEOUT))
        .map_err(NetError::RequestReadError)?;

    let mut buf = vec![0u8; MAX_REQUEST_HEAD_LEN];
    let mut waited = Duration::from_secs(0);

    let parsed = loop {
        let num_bytes = stream.peek(&mut buf).map_err(NetError::RequestReadError)?;

        if num_bytes == 0 {
            return Err(NetError::EmptyRequest)
        }

        if let Some(parsed) = parse_request_head(&buf[..num_bytes])? {
            break parsed
        }

        if num_bytes == buf.len() || waited >= HEAD_TIMEOUT {
            return Err(NetError::MalformedRequest)
        }

        // Peek returns immediately while a partial head is buffered
        thread::sleep(HEAD_POLL_INTERVAL);
        waited += HEAD_POLL_INTERVAL;
    };

    stream
        .set_read_timeout(None)
        .map_err(NetError::RequestReadError)?;

    Ok(parsed)
}

/// Parse a request head from the start of `buf`.
///
/// Returns `Ok(None)` while the head is incomplete, otherwise the length of the head and its
/// parts.
fn parse_request_head(buf: &[u8]) -> Result<Option<(usize, RequestHead)>, NetError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_REQUEST_HEADERS];
    let mut request = httparse::Request::new(&mut headers);

    let head_len = match request.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => {
            debug!("Malformed request head: {}", e);
            return Err(NetError::MalformedRequest)
        }
    };

    let path = request.path.ok_or(NetError::MalformedRequest)?.to_string();

    let upgrade = request.headers.iter().any(|h| {
        h.name.eq_ignore_ascii_case("upgrade")
            && std::str::from_utf8(h.value)
                .map(|v| v.trim().eq_ignore_ascii_case("websocket"))
                .unwrap_or(false)
    });

    Ok(Some((head_len, RequestHead { path, upgrade })))
}

/// Consume the request head and write the static response.
fn serve_http(mut stream: TcpStream, head_len: usize, path: &str) -> Result<(), NetError> {
    let mut head = vec![0u8; head_len];
    stream.read_exact(&mut head).map_err(NetError::RequestReadError)?;

    let body = match path {
        "/" => HTTP_ROOT_BODY,
        _ => ""
    };

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        body.len(),
        body
    );

    stream
        .write_all(response.as_bytes())
        .and_then(|_| stream.flush())
        .map_err(NetError::HttpWriteError)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn local_server() -> (SimServer, SocketAddr) {
        let server = SimServer::bind(&NetParams {
            bind_addr: String::from("127.0.0.1"),
            port: 0,
        })
        .unwrap();
        let addr = server.local_addr().unwrap();
        (server, addr)
    }

    #[test]
    fn test_parse_request_head() {
        let head = b"GET /socket.io/?EIO=4 HTTP/1.1\r\nHost: x\r\nUpgrade: WebSocket\r\n\r\n";
        assert_eq!(
            parse_request_head(head).unwrap(),
            Some((head.len(), RequestHead { path: "/socket.io/?EIO=4".into(), upgrade: true }))
        );

        // Bytes after the head are not part of it
        let head = b"GET / HTTP/1.1\r\nHost: x\r\n\r\nextra";
        assert_eq!(
            parse_request_head(head).unwrap(),
            Some((head.len() - 5, RequestHead { path: "/".into(), upgrade: false }))
        );

        // Still arriving
        assert_eq!(parse_request_head(b"GET / HTTP/1.1\r\nHost: x\r\n").unwrap(), None);

        assert!(parse_request_head(b"NOT A REQUEST\r\n\r\n").is_err());
        assert!(parse_request_head(b"GET / HTTP/1.1\r\nBad Header\r\n\r\n").is_err());
    }

    #[test]
    fn test_http_root() {
        let (server, addr) = local_server();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).unwrap();
            response
        });

        let (stream, peer) = server.accept().unwrap();
        match accept_stream(stream, peer).unwrap() {
            Accepted::HttpServed { path } => assert_eq!(path, "/"),
            Accepted::Connection(_) => panic!("Expected a plain HTTP request")
        }

        let response = client.join().unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with(HTTP_ROOT_BODY));
    }

    #[test]
    fn test_http_other_path() {
        let (server, addr) = local_server();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"GET /status HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).unwrap();
            response
        });

        let (stream, peer) = server.accept().unwrap();
        accept_stream(stream, peer).unwrap();

        let response = client.join().unwrap();
        assert!(response.contains("Content-Length: 0\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_websocket_echo() {
        let (server, addr) = local_server();

        let client = thread::spawn(move || {
            let (mut socket, _) = tungstenite::connect(format!("ws://{}/", addr)).unwrap();
            socket.send(Message::Text("42[\"hello\",{}]".into())).unwrap();
            let reply = socket.read().unwrap();

            // Drive the close handshake to completion
            socket.close(None).ok();
            while socket.read().is_ok() {}

            reply
        });

        let (stream, peer) = server.accept().unwrap();
        let mut conn = match accept_stream(stream, peer).unwrap() {
            Accepted::Connection(c) => c,
            Accepted::HttpServed { .. } => panic!("Expected a websocket upgrade")
        };

        let msg = conn.recv_text().unwrap().unwrap();
        conn.send_text(msg.clone()).unwrap();

        // Answer the client's close before waiting on it
        assert_eq!(conn.recv_text().unwrap(), None);
        drop(conn);

        assert_eq!(client.join().unwrap(), Message::Text(msg));
    }
}
