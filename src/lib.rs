//! # mysqlx-protocol
//!
//! Synchronous wire-level client engine for the MySQL X protocol.
//!
//! The crate turns a byte stream into typed, length-prefixed protocol
//! messages, correlates each request with the reply it expects, and drives a
//! session through capability negotiation, optional TLS, authentication and
//! statement execution. Failures are reported through one classified
//! [`error::Error`] type.
//!
//! ## Layers
//! - [`transport`]: blocking TCP, Unix socket and TLS streams
//! - [`core`]: frame encoding and the two-phase frame read
//! - [`protocol`]: message catalog, payload codecs, exchange correlation and the handshake
//! - [`session`]: the connection state machine, result streams and the `DbSession` interface
//! - [`config`], [`utils`]: configuration, logging and metrics
//!
//! ## Concurrency
//! One session owns one transport and is driven by one thread at a time.
//! Requests are never pipelined: every operation takes `&mut self`.

#![cfg_attr(not(test), warn(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod utils;

pub use error::{Error, Result};
pub use session::{Credentials, DbSession, QueryResult, ScopedSession, Session, SessionState};
pub use transport::Endpoint;
