//! Per-connection request framing: one JSON request line in, one JSON
//! response line out.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use tracing::{debug, warn};
use trellis_wire::{Request, Response};

use super::LISTENER_TARGET;
use crate::dispatch::{DispatchError, Namespace};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Largest request line, newline included, that a connection may send.
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Byte stream a connection can be answered over.
trait Duplex: Read + Write {}

impl<S: Read + Write> Duplex for S {}

/// An accepted connection of either socket family.
pub(crate) enum ConnectionStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ConnectionStream {
    fn io(&mut self) -> &mut dyn Duplex {
        match self {
            Self::Tcp(stream) => stream,
            #[cfg(unix)]
            Self::Unix(stream) => stream,
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.io().read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.io().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.io().flush()
    }
}

/// Serves one accepted connection on the thread it was given.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    fn handle(&self, stream: ConnectionStream);
}

/// Answers one JSONL [`Request`] per connection from a [`Namespace`].
pub(crate) struct NamespaceConnectionHandler {
    namespace: Arc<Namespace>,
}

impl NamespaceConnectionHandler {
    pub(crate) const fn new(namespace: Arc<Namespace>) -> Self {
        Self { namespace }
    }

    fn answer(&self, line: &[u8]) -> Response {
        match serde_json::from_slice::<Request>(line) {
            Ok(request) => {
                debug!(
                    target: LISTENER_TARGET,
                    method = %request.method,
                    url = request.url.as_str(),
                    "request received"
                );
                self.namespace.respond(&request)
            }
            Err(error) => self.namespace.fault_response(&DispatchError::invalid_argument(
                format!("malformed request envelope: {error}"),
            )),
        }
    }
}

impl ConnectionHandler for NamespaceConnectionHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        let response = match read_request_line(&mut stream) {
            Ok(Some(line)) => self.answer(&line),
            Ok(None) => return,
            Err(error) if error.kind() == io::ErrorKind::InvalidData => {
                self.namespace
                    .fault_response(&DispatchError::invalid_argument(error.to_string()))
            }
            Err(error) => {
                warn!(
                    target: LISTENER_TARGET,
                    error = %error,
                    "connection read failed"
                );
                return;
            }
        };
        if let Err(error) = write_response(&mut stream, &response) {
            warn!(
                target: LISTENER_TARGET,
                error = %error,
                "connection write failed"
            );
        }
    }
}

fn write_response(stream: &mut ConnectionStream, response: &Response) -> io::Result<()> {
    let mut line = serde_json::to_vec(response).map_err(io::Error::other)?;
    line.push(b'\n');
    stream.write_all(&line)?;
    stream.flush()
}

/// Reads up to and including the first newline, or to end of stream.
///
/// Returns `None` when the peer closed without sending anything.
fn read_request_line(stream: &mut impl Read) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let read = read_chunk_with_retry(stream, &mut chunk)?;
        if read == 0 {
            return Ok((!buffer.is_empty()).then_some(buffer));
        }
        let received = chunk.get(..read).unwrap_or_default();
        if let Some(position) = received.iter().position(|byte| *byte == b'\n') {
            buffer.extend(received.iter().take(position.saturating_add(1)));
            enforce_request_limit(buffer.len())?;
            return Ok(Some(buffer));
        }
        buffer.extend_from_slice(received);
        enforce_request_limit(buffer.len())?;
    }
}

fn read_chunk_with_retry(stream: &mut impl Read, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}

fn enforce_request_limit(size: usize) -> io::Result<()> {
    if size > MAX_REQUEST_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("request exceeds {MAX_REQUEST_BYTES} bytes"),
        ));
    }
    Ok(())
}
