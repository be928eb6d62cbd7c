//! # Error Types
//!
//! Classified error handling for the X protocol client engine.
//!
//! Every failure surfaced by the engine falls into exactly one class, so callers
//! can tell a recoverable server-side failure apart from a broken connection
//! without inspecting message text.
//!
//! ## Error Categories
//! - **Transport**: connect refused, name resolution, truncated or reset streams, timeouts
//! - **Protocol**: unknown type tags, malformed payloads, framing violations
//! - **Server**: `ERROR` messages reported by the server (`code`, `sqlstate`, `message`)
//! - **Unexpected response**: a well-formed message the caller did not expect at this point
//! - **State**: operations issued while the session is not in a state that permits them
//! - **Request too large**: an outgoing request above the frame limit, refused before sending
//!
//! Transport, protocol and authentication failures are fatal: the session that
//! observed them is closed before the error reaches the caller. Server errors
//! leave the session usable.
//!
//! ## Example Usage
//! ```rust,no_run
//! use mysqlx_protocol::error::Error;
//! use mysqlx_protocol::session::{Credentials, Session};
//! use mysqlx_protocol::{config::ClientConfig, transport::Endpoint};
//! use tracing::{error, warn};
//!
//! let credentials = Credentials::new("app", "secret");
//! let endpoint = Endpoint::tcp("127.0.0.1", 33060);
//! if let Ok(mut session) = Session::connect(endpoint, &credentials, ClientConfig::default()) {
//!     match session.execute("USE x") {
//!         Ok(_) => {}
//!         Err(Error::Server(e)) => warn!(code = e.code, sqlstate = %e.sqlstate, "{}", e.message),
//!         Err(e) => error!(error = %e, "session failed"),
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

use crate::session::SessionState;

/// Static context strings attached to exchanges, reported back in
/// [`Error::UnexpectedResponse`] so a mismatch can be traced to its call site.
pub mod constants {
    /// Handshake
    pub const CTX_CAPABILITIES_GET: &str = "reading server capabilities";
    pub const CTX_CAPABILITIES_SET: &str = "enabling TLS";
    pub const CTX_AUTH_START: &str = "starting authentication";
    pub const CTX_AUTH_CONTINUE: &str = "continuing authentication";

    /// Statement execution
    pub const CTX_STMT_EXECUTE: &str = "executing statement";
    pub const CTX_RESULT_STREAM: &str = "reading result set";
    pub const CTX_PREPARE: &str = "preparing statement";
    pub const CTX_PREPARED_EXECUTE: &str = "executing prepared statement";

    /// Cursors
    pub const CTX_CURSOR_FETCH: &str = "fetching from cursor";
    pub const CTX_CURSOR_CLOSE: &str = "closing cursor";
    pub const CTX_CURSORS_POLL: &str = "polling cursors";

    /// Session maintenance
    pub const CTX_SESSION_RESET: &str = "resetting session";
    pub const CTX_SERVER_VERSION: &str = "reading server version";
}

/// Failures of the underlying byte stream.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection refused: {0}")]
    Refused(String),

    #[error("could not resolve {0}")]
    Resolve(String),

    #[error("stream truncated: {0}")]
    Truncated(String),

    #[error("connection reset: {0}")]
    Reset(String),

    #[error("operation timed out")]
    Timeout,

    #[error("transport is closed")]
    Closed,

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::WriteZero => {
                TransportError::Truncated(err.to_string())
            }
            io::ErrorKind::ConnectionRefused => TransportError::Refused(err.to_string()),
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected => TransportError::Reset(err.to_string()),
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout,
            _ => TransportError::Io(err),
        }
    }
}

/// Violations of the length-prefixed frame layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// Declared length cannot cover the length field and type tag.
    #[error("declared frame length {0} is shorter than the 5-byte header")]
    Underflow(u32),

    #[error("frame payload of {size} bytes exceeds the maximum of {max} bytes")]
    Oversized { size: usize, max: usize },
}

/// The peer sent something this client cannot interpret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown message type {0} received")]
    UnknownType(u8),

    #[error("malformed payload for message type {0}")]
    Malformed(u8),

    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
}

/// Failure reported by the server in an `ERROR` message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("server error {code} ({sqlstate}): {message}")]
pub struct ServerError {
    pub code: u32,
    pub sqlstate: String,
    pub message: String,
    /// The server will drop the connection after reporting this error.
    /// Carries the payload's `severity` field: `FATAL` maps to `true`,
    /// `ERROR` to `false`.
    pub fatal: bool,
}

// Error is the classified error type returned by every engine operation
#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Server(#[from] ServerError),

    #[error("unexpected response [{received_tag}] while {context}")]
    UnexpectedResponse { received_tag: u8, context: String },

    #[error("{operation} is not allowed while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("session is closed")]
    SessionClosed,

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// A request larger than the configured frame limit. Nothing was written,
    /// so the connection stays usable.
    #[error("request of {size} bytes exceeds the maximum frame payload of {max} bytes")]
    RequestTooLarge { size: usize, max: usize },
}

impl From<FramingError> for Error {
    fn from(err: FramingError) -> Self {
        Error::Protocol(ProtocolError::Framing(err))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

impl Error {
    /// Whether this error leaves the connection unusable.
    ///
    /// A server error flagged fatal by the server counts as fatal too.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Protocol(_) | Error::Authentication(_) => true,
            Error::Server(e) => e.fatal,
            _ => false,
        }
    }

    /// Whether the operation was rejected because of the session's state.
    pub fn is_state_error(&self) -> bool {
        matches!(self, Error::InvalidState { .. } | Error::SessionClosed)
    }

    /// The server-reported detail, if this is a server error.
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            Error::Server(e) => Some(e),
            _ => None,
        }
    }
}

/// Type alias for Results using the classified [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
