//! Local socket transport.
//!
//! On Unix systems this uses Unix Domain Sockets. Other platforms have no
//! local socket support and report a transport error on connect.

#[cfg(unix)]
use std::net::Shutdown;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::path::Path;

use tracing::{debug, instrument};

#[cfg(unix)]
use super::{read_exact_from, write_all_to};
use super::{Transport, TransportKind};
use crate::config::ClientConfig;
use crate::error::TransportError;

/// Blocking Unix domain socket stream.
#[derive(Debug)]
pub struct LocalTransport {
    #[cfg(unix)]
    stream: Option<UnixStream>,
    path: String,
}

impl LocalTransport {
    /// Connect to the local socket at `path`.
    #[cfg(unix)]
    #[instrument(skip(path, config), fields(socket_path = %path.as_ref().display()))]
    pub fn connect<P: AsRef<Path>>(path: P, config: &ClientConfig) -> Result<Self, TransportError> {
        let stream = UnixStream::connect(path.as_ref())?;
        stream.set_read_timeout(Some(config.read_timeout))?;
        stream.set_write_timeout(Some(config.write_timeout))?;
        debug!("local socket connected");
        Ok(Self::from_stream(stream, path))
    }

    #[cfg(not(unix))]
    #[instrument(skip(path, _config), fields(socket_path = %path.as_ref().display()))]
    pub fn connect<P: AsRef<Path>>(path: P, _config: &ClientConfig) -> Result<Self, TransportError> {
        debug!("local sockets unsupported on this platform");
        Err(TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!(
                "local socket {} is not supported on this platform",
                path.as_ref().display()
            ),
        )))
    }

    /// Wraps an already connected stream.
    #[cfg(unix)]
    pub fn from_stream<P: AsRef<Path>>(stream: UnixStream, path: P) -> Self {
        Self {
            stream: Some(stream),
            path: path.as_ref().to_string_lossy().to_string(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(unix)]
impl Transport for LocalTransport {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        read_exact_from(self.stream.as_mut(), buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        write_all_to(self.stream.as_mut(), buf)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!(path = %self.path, "local transport closed");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Local
    }
}

#[cfg(not(unix))]
impl Transport for LocalTransport {
    fn read_exact(&mut self, _buf: &mut [u8]) -> Result<(), TransportError> {
        Err(TransportError::Closed)
    }

    fn write_all(&mut self, _buf: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::Closed)
    }

    fn close(&mut self) {}

    fn is_open(&self) -> bool {
        false
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Local
    }
}
