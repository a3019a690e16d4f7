//! Socket endpoints in `unix://` and `tcp://` form.

use std::fmt;
use std::fs::DirBuilder;
use std::io;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Socket the daemon serves its namespace on.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum SocketEndpoint {
    /// Filesystem socket.
    Unix {
        /// Socket file.
        path: Utf8PathBuf,
    },
    /// Network socket.
    Tcp {
        /// Host name or address.
        host: String,
        /// Port; `0` asks the OS for one.
        port: u16,
    },
}

impl SocketEndpoint {
    /// Unix endpoint at `path`.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// TCP endpoint at `host:port`.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Socket file of a Unix endpoint.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        if let Self::Unix { path } = self {
            Some(path.as_path())
        } else {
            None
        }
    }

    /// Makes sure the directory holding a Unix socket exists and is private
    /// to the owner. Does nothing for TCP.
    ///
    /// # Errors
    ///
    /// Fails for a bare file name or when the directory cannot be made.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(path) = self.unix_path() else {
            return Ok(());
        };
        let directory = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .ok_or_else(|| SocketPreparationError::MissingParent {
                path: path.to_path_buf(),
            })?;
        private_dir_builder()
            .create(directory.as_std_path())
            .map_err(|source| SocketPreparationError::CreateDirectory {
                path: directory.to_path_buf(),
                source,
            })
    }
}

fn private_dir_builder() -> DirBuilder {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    std::os::unix::fs::DirBuilderExt::mode(&mut builder, 0o700);
    builder
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Self::Unix { path } => write!(f, "unix://{path}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(text)?;
        let missing = |part| SocketParseError::Missing {
            part,
            endpoint: text.to_owned(),
        };
        match url.scheme() {
            "tcp" => {
                let host = url.host_str().ok_or_else(|| missing("TCP host"))?;
                let port = url.port().ok_or_else(|| missing("TCP port"))?;
                Ok(Self::tcp(host, port))
            }
            "unix" => match url.path() {
                "" | "/" => Err(missing("Unix socket path")),
                path => Ok(Self::unix(path)),
            },
            scheme => Err(SocketParseError::UnsupportedScheme(scheme.to_owned())),
        }
    }
}

/// Text that does not name a socket endpoint.
#[derive(Debug, Error)]
pub enum SocketParseError {
    /// Only `unix` and `tcp` are understood.
    #[error("'{0}' endpoints are not supported")]
    UnsupportedScheme(String),
    /// The URL lacks a part its scheme needs.
    #[error("{endpoint} has no {part}")]
    Missing {
        /// What is missing.
        part: &'static str,
        /// Endpoint as written.
        endpoint: String,
    },
    /// Not a URL at all.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// The socket directory could not be made ready.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// A bare file name has no directory to prepare.
    #[error("{path} has no parent directory")]
    MissingParent {
        /// Socket path.
        path: Utf8PathBuf,
    },
    /// The directory could not be created.
    #[error("cannot create {path}: {source}")]
    CreateDirectory {
        /// Directory being created.
        path: Utf8PathBuf,
        /// OS error.
        #[source]
        source: io::Error,
    },
}
