//! # Protocol Layer
//!
//! Meaning of the frames moved by [`crate::core`].
//!
//! ## Components
//! - **Schema**: protobuf payload definitions
//! - **Message**: closed server and client message catalogs with their type tags
//! - **Registry**: tag to codec routing for both directions
//! - **Exchange**: one request, one classified reply
//! - **Handshake**: capabilities, TLS negotiation and authentication mechanisms

pub mod exchange;
pub mod handshake;
pub mod message;
pub mod registry;
pub mod schema;

pub use message::{ClientMessage, ClientTag, ServerMessage, ServerTag};
pub use registry::WireMessage;
