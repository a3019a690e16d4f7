//! Accept loop serving a namespace on one socket.
//!
//! The listener socket is non-blocking so the loop can notice shutdown
//! between connections; accepted streams are switched back to blocking and
//! answered on their own thread.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};
use trellis_config::SocketEndpoint;

use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

#[cfg(unix)]
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(unix)]
use std::path::Path;

/// Pause when no connection is waiting.
const IDLE_PAUSE: Duration = Duration::from_millis(25);
/// Pause after a failed accept.
const FAILURE_PAUSE: Duration = Duration::from_millis(150);

#[derive(Debug)]
enum Socket {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl Socket {
    fn set_nonblocking(&self) -> io::Result<()> {
        match self {
            Self::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            Self::Unix(listener) => listener.set_nonblocking(true),
        }
    }

    /// Next waiting connection, or `None` when nobody is queued.
    fn poll_accept(&self) -> io::Result<Option<ConnectionStream>> {
        let accepted = match self {
            Self::Tcp(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                Ok(ConnectionStream::Tcp(stream))
            }),
            #[cfg(unix)]
            Self::Unix(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                Ok(ConnectionStream::Unix(stream))
            }),
        };
        match accepted {
            Ok(stream) => Ok(Some(stream)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// A bound socket that is not accepting yet.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: SocketEndpoint,
    socket: Socket,
}

impl SocketListener {
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let socket = match endpoint {
            SocketEndpoint::Tcp { host, port } => Socket::Tcp(bind_tcp(host, *port)?),
            #[cfg(unix)]
            SocketEndpoint::Unix { path } => Socket::Unix(bind_unix(path.as_std_path())?),
            #[cfg(not(unix))]
            SocketEndpoint::Unix { path } => {
                return Err(ListenerError::UnsupportedUnix {
                    endpoint: path.to_string(),
                });
            }
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            socket,
        })
    }

    /// Bound TCP address; `None` for Unix sockets.
    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match &self.socket {
            Socket::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            Socket::Unix(_) => None,
        }
    }

    /// Starts accepting on a background thread.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        if let Err(source) = self.socket.set_nonblocking() {
            #[cfg(unix)]
            cleanup_unix_socket(&self.endpoint);
            return Err(ListenerError::NonBlocking { source });
        }
        let stop = Arc::new(AtomicBool::new(false));
        let accept_loop = AcceptLoop {
            listener: self,
            handler,
            stop: Arc::clone(&stop),
            last_failure: None,
        };
        Ok(ListenerHandle {
            stop,
            thread: Some(thread::spawn(move || accept_loop.run())),
        })
    }
}

/// Owner of the accept thread; dropping it asks the loop to stop.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub(crate) fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept thread to finish.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        self.thread
            .take()
            .map_or(Ok(()), |thread| thread.join().map_err(|_| ListenerError::ThreadPanic))
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct AcceptLoop {
    listener: SocketListener,
    handler: Arc<dyn ConnectionHandler>,
    stop: Arc<AtomicBool>,
    /// Kind of the previous accept failure; repeats are not logged again.
    last_failure: Option<io::ErrorKind>,
}

impl AcceptLoop {
    fn run(mut self) {
        info!(target: LISTENER_TARGET, endpoint = %self.listener.endpoint, "serving namespace");
        while !self.stop.load(Ordering::SeqCst) {
            let pause = self.step();
            if let Some(duration) = pause {
                thread::sleep(duration);
            }
        }
        debug!(target: LISTENER_TARGET, endpoint = %self.listener.endpoint, "listener stopped");
        #[cfg(unix)]
        cleanup_unix_socket(&self.listener.endpoint);
    }

    /// Accepts at most one connection and returns how long to pause.
    fn step(&mut self) -> Option<Duration> {
        match self.listener.socket.poll_accept() {
            Ok(Some(stream)) => {
                self.last_failure = None;
                let handler = Arc::clone(&self.handler);
                thread::spawn(move || handler.handle(stream));
                None
            }
            Ok(None) => Some(IDLE_PAUSE),
            Err(error) => {
                if self.last_failure.replace(error.kind()) != Some(error.kind()) {
                    warn!(target: LISTENER_TARGET, %error, "accept failed");
                }
                Some(FAILURE_PAUSE)
            }
        }
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut candidates = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = candidates.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

#[cfg(unix)]
fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    if path.exists() {
        remove_stale_socket(path)?;
    }
    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: path.display().to_string(),
        source,
    })
}

/// Deletes a socket file whose daemon is gone. Live sockets and other file
/// types are left alone and reported.
#[cfg(unix)]
fn remove_stale_socket(path: &Path) -> Result<(), ListenerError> {
    let shown = path.display().to_string();
    let file_type = fs::symlink_metadata(path)
        .map_err(|source| ListenerError::UnixMetadata {
            path: shown.clone(),
            source,
        })?
        .file_type();
    if !file_type.is_socket() {
        return Err(ListenerError::UnixNotSocket { path: shown });
    }
    let Err(refusal) = UnixStream::connect(path) else {
        return Err(ListenerError::UnixInUse { path: shown });
    };
    if !matches!(
        refusal.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
    ) {
        return Err(ListenerError::UnixConnect {
            path: shown,
            source: refusal,
        });
    }
    fs::remove_file(path).map_err(|source| ListenerError::UnixCleanup { path: shown, source })
}

#[cfg(unix)]
fn cleanup_unix_socket(endpoint: &SocketEndpoint) {
    let Some(path) = endpoint.unix_path() else {
        return;
    };
    match fs::remove_file(path.as_std_path()) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => {
            warn!(target: LISTENER_TARGET, %error, %path, "could not remove socket file");
        }
        _ => {}
    }
}
