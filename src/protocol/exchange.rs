//! Request/response correlation.
//!
//! Each exchange sends exactly one client frame and then classifies the next
//! server frame against the set of tags the caller is prepared to handle.
//! The coordinator never retries and never reorders.

use std::net::TcpStream;
use std::sync::Arc;

use tracing::{debug, instrument, trace};

use crate::core::frame;
use crate::error::{Error, Result, ServerError};
use crate::protocol::message::{ClientMessage, ServerMessage, ServerTag};
use crate::protocol::registry::{self, WireMessage};
use crate::protocol::schema::Severity;
use crate::transport::{tls::TlsTransport, Transport, TransportKind};
use crate::utils::metrics::Metrics;

/// A request that has been written but whose reply has not been read yet.
///
/// Holding the token borrows nothing, but only one can be produced before
/// [`Channel::complete`] consumes it, since both require `&mut Channel`.
#[must_use = "the reply to a sent request must be read"]
#[derive(Debug)]
pub struct PendingExchange {
    expected: Vec<ServerTag>,
    context: String,
}

impl PendingExchange {
    pub fn expected(&self) -> &[ServerTag] {
        &self.expected
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Classifies one decoded server message.
///
/// `ERROR` always becomes [`Error::Server`], whether or not it was expected.
/// Any other tag outside `expected` is an [`Error::UnexpectedResponse`].
pub fn classify(message: ServerMessage, expected: &[ServerTag], context: &str) -> Result<ServerMessage> {
    match message {
        ServerMessage::Error(e) => Err(Error::Server(ServerError {
            code: e.code,
            sqlstate: e.sql_state,
            message: e.msg,
            fatal: e.severity == Severity::Fatal as i32,
        })),
        other if expected.contains(&other.tag()) => Ok(other),
        other => Err(Error::UnexpectedResponse {
            received_tag: other.tag() as u8,
            context: context.to_string(),
        }),
    }
}

/// Framed, exclusively owned connection to the server.
pub struct Channel {
    transport: Box<dyn Transport>,
    max_frame_size: usize,
    metrics: Arc<Metrics>,
}

impl Channel {
    pub fn new(transport: Box<dyn Transport>, max_frame_size: usize, metrics: Arc<Metrics>) -> Self {
        Self {
            transport,
            max_frame_size,
            metrics,
        }
    }

    /// Writes one client frame.
    ///
    /// A request above the frame limit is refused with
    /// [`Error::RequestTooLarge`] before any byte reaches the transport.
    pub fn write(&mut self, message: &ClientMessage) -> Result<()> {
        let (tag, payload) = message.to_frame();
        if payload.len() > self.max_frame_size {
            return Err(Error::RequestTooLarge {
                size: payload.len(),
                max: self.max_frame_size,
            });
        }
        let written = frame::write_frame(self.transport.as_mut(), tag, &payload, self.max_frame_size)?;
        self.metrics.frame_sent(written as u64);
        debug!(message = %message.tag(), bytes = written, "sent");
        Ok(())
    }

    /// Sends `message` and records what the reply must look like.
    pub fn send(
        &mut self,
        message: &ClientMessage,
        expected: &[ServerTag],
        context: &str,
    ) -> Result<PendingExchange> {
        self.write(message)?;
        self.metrics.exchange_started();
        Ok(PendingExchange {
            expected: expected.to_vec(),
            context: context.to_string(),
        })
    }

    /// Expects one more reply without sending anything, for servers that
    /// interleave notices ahead of the real response.
    pub fn expect(&mut self, expected: &[ServerTag], context: &str) -> PendingExchange {
        PendingExchange {
            expected: expected.to_vec(),
            context: context.to_string(),
        }
    }

    /// Reads and classifies the reply to a pending request.
    pub fn complete(&mut self, pending: PendingExchange) -> Result<ServerMessage> {
        self.receive_expected(&pending.expected, &pending.context)
    }

    /// One full round trip: send, read one frame, classify.
    #[instrument(level = "trace", skip(self, message, expected), fields(message = %message.tag()))]
    pub fn exchange(
        &mut self,
        message: &ClientMessage,
        expected: &[ServerTag],
        context: &str,
    ) -> Result<ServerMessage> {
        let pending = self.send(message, expected, context)?;
        self.complete(pending)
    }

    /// Reads and decodes the next server frame without classifying it.
    pub fn receive(&mut self) -> Result<ServerMessage> {
        let frame = frame::read_frame(self.transport.as_mut(), self.max_frame_size)?;
        self.metrics.frame_received(frame.wire_size() as u64);
        let message = registry::decode(frame.type_tag, &frame.payload)?;
        trace!(message = %message.tag(), bytes = frame.wire_size(), "received");
        Ok(message)
    }

    /// Reads the next server frame and classifies it against `expected`.
    pub fn receive_expected(&mut self, expected: &[ServerTag], context: &str) -> Result<ServerMessage> {
        let message = self.receive()?;
        classify(message, expected, context)
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn cipher(&self) -> Option<String> {
        self.transport.cipher()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Closes the transport. Idempotent.
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Re-wraps the underlying TCP socket in TLS.
    ///
    /// Fails with a transport error when the channel is not backed by a plain
    /// TCP socket.
    pub fn upgrade_tls(self, host: &str, verify: bool) -> Result<Channel> {
        let Channel {
            transport,
            max_frame_size,
            metrics,
        } = self;
        let tcp: TcpStream = transport.into_tcp().ok_or_else(|| {
            crate::error::TransportError::Tls("transport cannot be upgraded to TLS".to_string())
        })?;
        let tls = TlsTransport::upgrade(tcp, host, verify)?;
        Ok(Channel {
            transport: Box::new(tls),
            max_frame_size,
            metrics,
        })
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("kind", &self.transport.kind())
            .field("open", &self.transport.is_open())
            .field("max_frame_size", &self.max_frame_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::constants::CTX_STMT_EXECUTE;
    use crate::protocol::schema::Row;
    use crate::transport::memory::MemoryTransport;

    fn channel(peer: &MemoryTransport) -> Channel {
        Channel::new(Box::new(peer.clone()), frame::MAX_PAYLOAD_SIZE, Arc::new(Metrics::new()))
    }

    #[test]
    fn expected_reply_is_returned() {
        let peer = MemoryTransport::new();
        peer.push_message(&ServerMessage::ok());
        let mut channel = channel(&peer);

        let reply = channel
            .exchange(&ClientMessage::sql("DO 1"), &[ServerTag::Ok], CTX_STMT_EXECUTE)
            .unwrap();
        assert_eq!(reply, ServerMessage::ok());
        assert_eq!(peer.written_messages().unwrap(), vec![ClientMessage::sql("DO 1")]);
        assert_eq!(peer.unread(), 0);
    }

    #[test]
    fn error_reply_becomes_server_error_even_when_unexpected() {
        let peer = MemoryTransport::new();
        peer.push_message(&ServerMessage::error(1049, "42000", "Unknown database 'x'"));
        let mut channel = channel(&peer);

        let err = channel
            .exchange(&ClientMessage::sql("USE x"), &[ServerTag::Ok], CTX_STMT_EXECUTE)
            .unwrap_err();
        let server = err.server_error().unwrap();
        assert_eq!(server.code, 1049);
        assert_eq!(server.sqlstate, "42000");
        assert_eq!(server.message, "Unknown database 'x'");
        assert!(!err.is_fatal());
    }

    #[test]
    fn oversized_request_is_refused_before_writing() {
        let peer = MemoryTransport::new();
        let mut channel = Channel::new(Box::new(peer.clone()), 16, Arc::new(Metrics::new()));

        let err = channel
            .exchange(&ClientMessage::sql(&"x".repeat(64)), &[ServerTag::Ok], CTX_STMT_EXECUTE)
            .unwrap_err();
        assert!(matches!(err, Error::RequestTooLarge { max: 16, .. }));
        assert!(!err.is_fatal());
        assert!(peer.written().is_empty());
        assert!(channel.is_open());
        assert_eq!(channel.metrics().snapshot().exchanges_total, 0);
    }

    #[test]
    fn other_tags_are_unexpected_responses() {
        let peer = MemoryTransport::new();
        peer.push_message(&ServerMessage::Row(Row::default()));
        let mut channel = channel(&peer);

        match channel.exchange(&ClientMessage::sql("DO 1"), &[ServerTag::Ok], CTX_STMT_EXECUTE) {
            Err(Error::UnexpectedResponse {
                received_tag,
                context,
            }) => {
                assert_eq!(received_tag, ServerTag::Row as u8);
                assert_eq!(context, CTX_STMT_EXECUTE);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_is_a_protocol_error() {
        let peer = MemoryTransport::new();
        peer.push_bytes(&frame::encode(0x7F, &[]).unwrap());
        let mut channel = channel(&peer);

        let err = channel.receive().unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(crate::error::ProtocolError::UnknownType(0x7F))
        ));
    }

    #[test]
    fn fatal_severity_is_preserved() {
        let mut payload = match ServerMessage::error(1053, "08S01", "Server shutdown") {
            ServerMessage::Error(e) => e,
            _ => unreachable!(),
        };
        payload.severity = Severity::Fatal as i32;
        let err = classify(ServerMessage::Error(payload), &[], "testing").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn metrics_count_frames_in_both_directions() {
        let peer = MemoryTransport::new();
        peer.push_message(&ServerMessage::ok());
        let mut channel = channel(&peer);
        channel
            .exchange(&ClientMessage::sql("DO 1"), &[ServerTag::Ok], CTX_STMT_EXECUTE)
            .unwrap();

        let snapshot = channel.metrics().snapshot();
        assert_eq!(snapshot.exchanges_total, 1);
        assert_eq!(snapshot.frames_sent, 1);
        assert_eq!(snapshot.frames_received, 1);
        assert_eq!(snapshot.bytes_received, 5);
    }

    #[test]
    fn memory_channel_cannot_upgrade_to_tls() {
        let peer = MemoryTransport::new();
        let err = channel(&peer).upgrade_tls("localhost", true).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
