//! # Transport Layer
//!
//! Blocking byte streams to a single server endpoint.
//!
//! A transport is exclusively owned by one session. Reads and writes block the
//! calling thread until they are fully satisfied or the stream fails; a read or
//! write that cannot complete is reported as [`TransportError::Truncated`].
//! `close` is idempotent.
//!
//! ## Implementations
//! - [`tcp::TcpTransport`]: TCP socket with connect/read/write timeouts
//! - [`local::LocalTransport`]: Unix domain socket (Unix only)
//! - [`tls::TlsTransport`]: TLS over an already connected TCP socket
//! - [`memory::MemoryTransport`]: in-memory peer for embedding and tests

pub mod local;
pub mod memory;
pub mod tcp;
pub mod tls;

use std::fmt;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bytes::{Bytes, BytesMut};
use tracing::{debug, instrument};

use crate::config::{ClientConfig, DEFAULT_PORT};
use crate::error::TransportError;

/// Kind of stream an endpoint is reached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Streaming network socket.
    Tcp,
    /// Local socket on the same host.
    Local,
}

/// Where a session connects to. Immutable once a session is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Local { path: PathBuf },
}

impl Endpoint {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Endpoint::Tcp {
            host: host.into(),
            port,
        }
    }

    pub fn local(path: impl AsRef<Path>) -> Self {
        Endpoint::Local {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Endpoint::Tcp { .. } => TransportKind::Tcp,
            Endpoint::Local { .. } => TransportKind::Local,
        }
    }

    /// Host name for TCP endpoints.
    pub fn host(&self) -> Option<&str> {
        match self {
            Endpoint::Tcp { host, .. } => Some(host),
            Endpoint::Local { .. } => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } if host.contains(':') => write!(f, "[{host}]:{port}"),
            Endpoint::Tcp { host, port } => write!(f, "{host}:{port}"),
            Endpoint::Local { path } => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Parses `host`, `host:port`, `[v6]:port`, `unix:/path` or `/path`.
impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("endpoint cannot be empty".to_string());
        }
        if let Some(path) = s.strip_prefix("unix:") {
            return Ok(Endpoint::local(path));
        }
        if s.starts_with('/') {
            return Ok(Endpoint::local(s));
        }

        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| format!("unterminated IPv6 address in '{s}'"))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(port, s)?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => return Err(format!("unexpected characters after address in '{s}'")),
            };
            return Ok(Endpoint::tcp(host, port));
        }

        match s.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                Ok(Endpoint::tcp(host, parse_port(port, s)?))
            }
            _ => Ok(Endpoint::tcp(s, DEFAULT_PORT)),
        }
    }
}

fn parse_port(port: &str, input: &str) -> Result<u16, String> {
    port.parse::<u16>()
        .map_err(|_| format!("invalid port '{port}' in '{input}'"))
}

/// A blocking, exclusively owned duplex byte stream.
pub trait Transport: Send {
    /// Fills `buf` completely or fails.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;

    /// Writes all of `buf` or fails.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError>;

    /// Closes the stream. Calling it again is a no-op.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    fn kind(&self) -> TransportKind;

    /// Negotiated cipher suite, for encrypted transports.
    fn cipher(&self) -> Option<String> {
        None
    }

    /// Reads exactly `n` bytes.
    fn read_n(&mut self, n: usize) -> Result<Bytes, TransportError> {
        let mut buf = BytesMut::zeroed(n);
        self.read_exact(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Releases the underlying TCP socket so it can be wrapped in TLS.
    ///
    /// Transports without a plain TCP socket return `None`.
    fn into_tcp(self: Box<Self>) -> Option<TcpStream> {
        None
    }
}

/// Opens a transport to `endpoint` using the timeouts from `config`.
#[instrument(skip(config), fields(endpoint = %endpoint))]
pub fn open(
    endpoint: &Endpoint,
    config: &ClientConfig,
) -> Result<Box<dyn Transport>, TransportError> {
    let transport: Box<dyn Transport> = match endpoint {
        Endpoint::Tcp { host, port } => Box::new(tcp::TcpTransport::connect(host, *port, config)?),
        Endpoint::Local { path } => Box::new(local::LocalTransport::connect(path, config)?),
    };
    debug!("transport opened");
    Ok(transport)
}

/// Shared `read_exact` for std streams: a missing stream means the transport was closed.
pub(crate) fn read_exact_from<R: Read>(
    stream: Option<&mut R>,
    buf: &mut [u8],
) -> Result<(), TransportError> {
    let stream = stream.ok_or(TransportError::Closed)?;
    stream.read_exact(buf).map_err(TransportError::from)
}

/// Shared `write_all` for std streams; flushes after writing.
pub(crate) fn write_all_to<W: Write>(
    stream: Option<&mut W>,
    buf: &[u8],
) -> Result<(), TransportError> {
    let stream = stream.ok_or(TransportError::Closed)?;
    stream.write_all(buf)?;
    stream.flush().map_err(TransportError::from)
}
