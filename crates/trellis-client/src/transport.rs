//! Request/response exchange with a Trellis server.
//!
//! The [`Transport`] trait is the only seam between the resolver and the
//! network. [`SocketTransport`] speaks the daemon's framing: one JSON
//! [`Request`] line out, one JSON [`Response`] line back, per connection.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use trellis_config::{Config, SocketEndpoint};
use trellis_wire::{Request, Response};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

use crate::errors::TransportError;

/// Time allowed for establishing a connection.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends one request and returns its response.
pub trait Transport {
    /// Performs a single round trip.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the exchange fails; error
    /// *responses* are not transport errors.
    fn exchange(&self, request: &Request) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn exchange(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).exchange(request)
    }
}

/// Transport dialling a daemon socket once per request.
#[derive(Debug, Clone)]
pub struct SocketTransport {
    endpoint: SocketEndpoint,
}

impl SocketTransport {
    /// Dials `endpoint` for every exchange.
    #[must_use]
    pub const fn new(endpoint: SocketEndpoint) -> Self {
        Self { endpoint }
    }

    /// Dials the configured listen socket.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.listen_socket().clone())
    }

    /// Endpoint being dialled.
    #[must_use]
    pub const fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }
}

impl Transport for SocketTransport {
    fn exchange(&self, request: &Request) -> Result<Response, TransportError> {
        let mut line = serde_json::to_vec(request).map_err(TransportError::Encode)?;
        line.push(b'\n');
        let mut connection = connect(&self.endpoint)?;
        connection.write_all(&line).map_err(TransportError::Send)?;
        connection.flush().map_err(TransportError::Send)?;

        let mut reply = String::new();
        let read = BufReader::new(connection)
            .read_line(&mut reply)
            .map_err(TransportError::Receive)?;
        if read == 0 {
            return Err(TransportError::Closed);
        }
        serde_json::from_str(&reply).map_err(TransportError::Decode)
    }
}

trait Duplex: Read + Write {}

impl<S: Read + Write> Duplex for S {}

type Connection = Box<dyn Duplex>;

fn connect(endpoint: &SocketEndpoint) -> Result<Connection, TransportError> {
    match endpoint {
        SocketEndpoint::Tcp { host, port } => {
            let address = resolve_tcp_address(host, *port).map_err(|source| {
                TransportError::Resolve {
                    endpoint: endpoint.to_string(),
                    source,
                }
            })?;
            TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT)
                .map(|stream| -> Connection { Box::new(stream) })
                .map_err(|source| TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })
        }
        SocketEndpoint::Unix { path } => {
            #[cfg(unix)]
            {
                connect_unix(path.as_str()).map_err(|source| TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })
            }

            #[cfg(not(unix))]
            {
                Err(TransportError::UnsupportedUnix(path.to_string()))
            }
        }
    }
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

#[cfg(unix)]
fn connect_unix(path: &str) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, CONNECTION_TIMEOUT)?;
    let stream: UnixStream = socket.into();
    Ok(Box::new(stream))
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    use trellis_wire::Method;

    use super::*;

    fn serve_once(reply: &'static [u8]) -> (SocketEndpoint, thread::JoinHandle<String>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let port = listener.local_addr().expect("address").port();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).expect("read request");
            reader.get_mut().write_all(reply).expect("write reply");
            line
        });
        (SocketEndpoint::tcp("127.0.0.1", port), server)
    }

    #[test]
    fn requests_travel_as_one_json_line() {
        let (endpoint, server) = serve_once(b"{\"status\":204}\n");
        let transport = SocketTransport::new(endpoint);

        let response = transport
            .exchange(&Request::new(Method::Get, "/total"))
            .expect("exchange");

        assert_eq!(response.status, 204);
        let sent = server.join().expect("server thread");
        assert!(sent.ends_with('\n'));
        assert!(sent.contains(r#""url":"/total""#), "{sent}");
    }

    #[test]
    fn silent_servers_are_reported_as_closed() {
        let (endpoint, server) = serve_once(b"");
        let error = SocketTransport::new(endpoint)
            .exchange(&Request::new(Method::Get, "/"))
            .expect_err("no reply");
        assert!(matches!(error, TransportError::Closed));
        server.join().expect("server thread");
    }
}
