//! Port targets the binaries can open.
//!
//! A target string is one of:
//! - `tcp:<host:port>`: TCP socket (e.g. a serial-over-IP bridge)
//! - `unix:<path>`: Unix domain socket
//! - `vsock:<cid>:<port>`: vsock socket (requires the `vsock` feature)
//! - anything else: a serial device node, already configured

use core::fmt;
use core::str::FromStr;
use std::boxed::Box;
use std::fs::OpenOptions;
use std::io::Write;
use std::net::TcpStream;
use std::path::PathBuf;
use std::string::{String, ToString};

use thiserror::Error;

use super::StreamTransport;
use crate::error::{TransportError, TransportResult};

/// Write half of an opened port.
pub type PortWriter = Box<dyn Write + Send>;

/// Error parsing a [`PortTarget`] string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetParseError {
    /// Empty target string.
    #[error("empty port target")]
    Empty,

    /// `vsock:` target not in `<cid>:<port>` form.
    #[error("invalid vsock target {0:?}, expected vsock:<cid>:<port>")]
    InvalidVsock(String),

    /// `vsock:` target on a build without vsock support.
    #[error("vsock targets are not supported by this build")]
    VsockUnsupported,
}

/// Where the serial line lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortTarget {
    /// Device node opened read/write.
    Device(PathBuf),
    /// TCP endpoint in `host:port` form.
    Tcp(String),
    /// Unix domain socket path.
    Unix(PathBuf),
    /// vsock endpoint.
    Vsock {
        /// Context identifier.
        cid: u32,
        /// Port number.
        port: u32,
    },
}

impl FromStr for PortTarget {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(TargetParseError::Empty);
        }
        if let Some(addr) = s.strip_prefix("tcp:") {
            return Ok(Self::Tcp(addr.to_string()));
        }
        if let Some(path) = s.strip_prefix("unix:") {
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        if let Some(rest) = s.strip_prefix("vsock:") {
            if !cfg!(feature = "vsock") {
                return Err(TargetParseError::VsockUnsupported);
            }
            let invalid = || TargetParseError::InvalidVsock(rest.to_string());
            let (cid, port) = rest.split_once(':').ok_or_else(invalid)?;
            return Ok(Self::Vsock {
                cid: cid.parse().map_err(|_| invalid())?,
                port: port.parse().map_err(|_| invalid())?,
            });
        }
        Ok(Self::Device(PathBuf::from(s)))
    }
}

impl fmt::Display for PortTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(path) => write!(f, "{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp:{addr}"),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
            Self::Vsock { cid, port } => write!(f, "vsock:{cid}:{port}"),
        }
    }
}

fn open_failed(target: &PortTarget) -> impl FnOnce(std::io::Error) -> TransportError + '_ {
    move |e| {
        log::error!("failed to open {target}: {e}");
        TransportError::OpenFailed
    }
}

impl PortTarget {
    /// Opens the target and wraps it in a [`StreamTransport`].
    pub fn open(&self) -> TransportResult<StreamTransport<PortWriter>> {
        log::info!("opening port {self}");
        match self {
            Self::Device(path) => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(path)
                    .map_err(open_failed(self))?;
                let reader = file.try_clone().map_err(open_failed(self))?;
                StreamTransport::new(reader, Box::new(file) as PortWriter)
            }
            Self::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str()).map_err(open_failed(self))?;
                stream.set_nodelay(true).map_err(open_failed(self))?;
                let reader = stream.try_clone().map_err(open_failed(self))?;
                StreamTransport::new(reader, Box::new(stream) as PortWriter)
            }
            #[cfg(unix)]
            Self::Unix(path) => {
                let stream =
                    std::os::unix::net::UnixStream::connect(path).map_err(open_failed(self))?;
                let reader = stream.try_clone().map_err(open_failed(self))?;
                StreamTransport::new(reader, Box::new(stream) as PortWriter)
            }
            #[cfg(not(unix))]
            Self::Unix(_) => {
                log::error!("unix sockets are not available on this platform");
                Err(TransportError::OpenFailed)
            }
            #[cfg(feature = "vsock")]
            Self::Vsock { cid, port } => {
                let addr = vsock::VsockAddr::new(*cid, *port);
                let stream = vsock::VsockStream::connect(&addr).map_err(open_failed(self))?;
                let reader = stream.try_clone().map_err(open_failed(self))?;
                StreamTransport::new(reader, Box::new(stream) as PortWriter)
            }
            #[cfg(not(feature = "vsock"))]
            Self::Vsock { .. } => {
                log::error!("vsock support not compiled in");
                Err(TransportError::OpenFailed)
            }
        }
    }
}
