//! TCP transport.

use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use tracing::{debug, instrument, warn};

use super::{read_exact_from, write_all_to, Transport, TransportKind};
use crate::config::ClientConfig;
use crate::error::TransportError;

/// Blocking TCP stream with the configured timeouts applied.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    peer: Option<SocketAddr>,
}

impl TcpTransport {
    /// Resolves `host:port` and connects to the first address that accepts.
    #[instrument(skip(config))]
    pub fn connect(host: &str, port: u16, config: &ClientConfig) -> Result<Self, TransportError> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| TransportError::Resolve(format!("{host}:{port}: {e}")))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, config.connect_timeout) {
                Ok(stream) => {
                    debug!(peer = %addr, "tcp connected");
                    let transport = Self::from_stream(stream)?;
                    transport.apply_timeouts(config)?;
                    return Ok(transport);
                }
                Err(e) => {
                    warn!(peer = %addr, error = %e, "tcp connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => TransportError::from(e),
            None => TransportError::Resolve(format!("{host}:{port}: no addresses found")),
        })
    }

    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr().ok();
        Ok(Self {
            stream: Some(stream),
            peer,
        })
    }

    fn apply_timeouts(&self, config: &ClientConfig) -> Result<(), TransportError> {
        if let Some(stream) = &self.stream {
            stream.set_read_timeout(Some(config.read_timeout))?;
            stream.set_write_timeout(Some(config.write_timeout))?;
        }
        Ok(())
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl Transport for TcpTransport {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        read_exact_from(self.stream.as_mut(), buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        write_all_to(self.stream.as_mut(), buf)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            // The peer may already be gone; the socket is released on drop either way.
            let _ = stream.shutdown(Shutdown::Both);
            debug!(peer = ?self.peer, "tcp transport closed");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn into_tcp(mut self: Box<Self>) -> Option<TcpStream> {
        self.stream.take()
    }
}
