//! # Core Protocol Components
//!
//! Low-level frame handling for the X protocol wire format.
//!
//! This module owns the byte layout of a frame and the two-phase read that
//! turns a stream of bytes into discrete frames. It knows nothing about what
//! a payload means; that belongs to [`crate::protocol`].
//!
//! ## Wire Format
//! ```text
//! [Length(4, big-endian)] [Type(1)] [Payload(Length - 5)]
//! ```
//!
//! The length counts itself and the type byte, so an empty payload is
//! announced as `00 00 00 05`.
//!
//! ## Security
//! - Maximum payload size is checked before the payload buffer is allocated
//! - A declared length below 5 is rejected instead of wrapping around

pub mod frame;
