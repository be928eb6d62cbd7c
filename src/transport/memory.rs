//! In-memory transport.
//!
//! A scripted peer: bytes queued with [`MemoryTransport::push_bytes`] (or whole
//! server messages with [`MemoryTransport::push_message`]) are what the session
//! reads, and everything the session writes is captured for inspection.
//! Clones share the same buffers, so a test can keep one handle while the
//! session owns another. The reported [`TransportKind`] defaults to `Local`
//! and can be set with [`MemoryTransport::with_kind`] to drive the TCP paths
//! of the handshake.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Transport, TransportKind};
use crate::core::frame;
use crate::error::{ProtocolError, Result, TransportError};
use crate::protocol::message::{ClientMessage, ServerMessage};
use crate::protocol::registry::WireMessage;

#[derive(Debug, Default)]
struct MemoryState {
    incoming: VecDeque<u8>,
    outgoing: Vec<u8>,
    closed: bool,
    close_calls: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
    kind: TransportKind,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            kind: TransportKind::Local,
        }
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports `kind` to the session instead of `Local`.
    pub fn with_kind(mut self, kind: TransportKind) -> Self {
        self.kind = kind;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queues raw bytes for the reader.
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.lock().incoming.extend(bytes.iter().copied());
    }

    /// Queues one framed server message.
    pub fn push_message(&self, message: &ServerMessage) {
        let (tag, payload) = message.to_frame();
        match frame::encode(tag, &payload) {
            Ok(bytes) => self.push_bytes(&bytes),
            Err(e) => tracing::error!(error = %e, "message does not fit in a frame"),
        }
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().outgoing.clone()
    }

    /// Decodes everything written so far as client frames.
    pub fn written_messages(&self) -> Result<Vec<ClientMessage>> {
        let bytes = self.written();
        let mut messages = Vec::new();
        let mut rest = &bytes[..];
        while !rest.is_empty() {
            if rest.len() < frame::HEADER_SIZE {
                return Err(TransportError::Truncated("partial frame header".into()).into());
            }
            let mut header = [0u8; frame::HEADER_SIZE];
            header.copy_from_slice(&rest[..frame::HEADER_SIZE]);
            let (len, tag) = frame::decode_header(&header).map_err(ProtocolError::from)?;
            let end = frame::HEADER_SIZE + len;
            if rest.len() < end {
                return Err(TransportError::Truncated("partial frame payload".into()).into());
            }
            messages.push(ClientMessage::decode_payload(
                tag,
                &rest[frame::HEADER_SIZE..end],
            )?);
            rest = &rest[end..];
        }
        Ok(messages)
    }

    /// Bytes queued but not yet read.
    pub fn unread(&self) -> usize {
        self.lock().incoming.len()
    }

    /// How many times `close` was called.
    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }
}

impl Transport for MemoryTransport {
    fn read_exact(&mut self, buf: &mut [u8]) -> std::result::Result<(), TransportError> {
        let mut state = self.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        if state.incoming.len() < buf.len() {
            let available = state.incoming.len();
            state.incoming.clear();
            return Err(TransportError::Truncated(format!(
                "needed {} bytes, peer had {available}",
                buf.len()
            )));
        }
        let needed = buf.len();
        for (slot, byte) in buf.iter_mut().zip(state.incoming.drain(..needed)) {
            *slot = byte;
        }
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> std::result::Result<(), TransportError> {
        let mut state = self.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.outgoing.extend_from_slice(buf);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.lock();
        state.close_calls += 1;
        state.closed = true;
    }

    fn is_open(&self) -> bool {
        !self.lock().closed
    }

    fn kind(&self) -> TransportKind {
        self.kind
    }
}
