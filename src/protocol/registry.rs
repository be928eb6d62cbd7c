//! Tag to payload codec routing.
//!
//! Decoding is a single lookup on the type tag followed by a protobuf decode
//! of the payload. Unknown tags and payloads that fail to decode are reported
//! as protocol errors carrying the offending tag.

use prost::Message;
use tracing::debug;

use crate::error::ProtocolError;
use crate::protocol::message::{ClientMessage, ClientTag, ServerMessage, ServerTag};

/// A message that can be put on and taken off the wire.
pub trait WireMessage: Sized {
    /// Numeric type tag of this message.
    fn type_tag(&self) -> u8;

    /// Serializes the payload (without the frame header).
    fn encode_payload(&self) -> Vec<u8>;

    /// Decodes the payload of a frame with the given tag.
    fn decode_payload(tag: u8, payload: &[u8]) -> Result<Self, ProtocolError>;

    /// `(type_tag, payload)` ready for framing.
    fn to_frame(&self) -> (u8, Vec<u8>) {
        (self.type_tag(), self.encode_payload())
    }
}

fn parse<M: Message + Default>(tag: u8, payload: &[u8]) -> Result<M, ProtocolError> {
    M::decode(payload).map_err(|e| {
        debug!(tag, error = %e, "payload failed to decode");
        ProtocolError::Malformed(tag)
    })
}

impl WireMessage for ServerMessage {
    fn type_tag(&self) -> u8 {
        self.tag() as u8
    }

    fn encode_payload(&self) -> Vec<u8> {
        match self {
            ServerMessage::Ok(m) => m.encode_to_vec(),
            ServerMessage::Error(m) => m.encode_to_vec(),
            ServerMessage::Notice(m) => m.encode_to_vec(),
            ServerMessage::ParamChange(m) => m.encode_to_vec(),
            ServerMessage::Capabilities(m) => m.encode_to_vec(),
            ServerMessage::AuthContinue(m) => m.encode_to_vec(),
            ServerMessage::AuthOk(m) => m.encode_to_vec(),
            ServerMessage::AuthFail(m) => m.encode_to_vec(),
            ServerMessage::PrepStmtOk(m) => m.encode_to_vec(),
            ServerMessage::PrepStmtExecOk(m) => m.encode_to_vec(),
            ServerMessage::ColumnMeta(m) => m.encode_to_vec(),
            ServerMessage::Row(m) => m.encode_to_vec(),
            ServerMessage::CursorFetchDone(m) => m.encode_to_vec(),
            ServerMessage::CursorFetchSuspended(m) => m.encode_to_vec(),
            ServerMessage::CursorsPoll(m) => m.encode_to_vec(),
            ServerMessage::CursorCloseOk(m) => m.encode_to_vec(),
            ServerMessage::CursorFetchDoneMoreResultsets(m) => m.encode_to_vec(),
        }
    }

    fn decode_payload(tag: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        let message = match ServerTag::try_from(tag)? {
            ServerTag::Ok => ServerMessage::Ok(parse(tag, payload)?),
            ServerTag::Error => ServerMessage::Error(parse(tag, payload)?),
            ServerTag::Notice => ServerMessage::Notice(parse(tag, payload)?),
            ServerTag::ParamChange => ServerMessage::ParamChange(parse(tag, payload)?),
            ServerTag::Capabilities => ServerMessage::Capabilities(parse(tag, payload)?),
            ServerTag::AuthContinue => ServerMessage::AuthContinue(parse(tag, payload)?),
            ServerTag::AuthOk => ServerMessage::AuthOk(parse(tag, payload)?),
            ServerTag::AuthFail => ServerMessage::AuthFail(parse(tag, payload)?),
            ServerTag::PrepStmtOk => ServerMessage::PrepStmtOk(parse(tag, payload)?),
            ServerTag::PrepStmtExecOk => ServerMessage::PrepStmtExecOk(parse(tag, payload)?),
            ServerTag::ColumnMeta => ServerMessage::ColumnMeta(parse(tag, payload)?),
            ServerTag::Row => ServerMessage::Row(parse(tag, payload)?),
            ServerTag::CursorFetchDone => ServerMessage::CursorFetchDone(parse(tag, payload)?),
            ServerTag::CursorFetchSuspended => {
                ServerMessage::CursorFetchSuspended(parse(tag, payload)?)
            }
            ServerTag::CursorsPoll => ServerMessage::CursorsPoll(parse(tag, payload)?),
            ServerTag::CursorCloseOk => ServerMessage::CursorCloseOk(parse(tag, payload)?),
            ServerTag::CursorFetchDoneMoreResultsets => {
                ServerMessage::CursorFetchDoneMoreResultsets(parse(tag, payload)?)
            }
        };
        Ok(message)
    }
}

impl WireMessage for ClientMessage {
    fn type_tag(&self) -> u8 {
        self.tag() as u8
    }

    fn encode_payload(&self) -> Vec<u8> {
        match self {
            ClientMessage::CapabilitiesGet(m) => m.encode_to_vec(),
            ClientMessage::CapabilitiesSet(m) => m.encode_to_vec(),
            ClientMessage::ConnClose(m) => m.encode_to_vec(),
            ClientMessage::AuthStart(m) => m.encode_to_vec(),
            ClientMessage::AuthContinue(m) => m.encode_to_vec(),
            ClientMessage::SessReset(m) => m.encode_to_vec(),
            ClientMessage::SessClose(m) => m.encode_to_vec(),
            ClientMessage::PrepareStmt(m) => m.encode_to_vec(),
            ClientMessage::PreparedStmtExecute(m) => m.encode_to_vec(),
            ClientMessage::CursorFetch(m) => m.encode_to_vec(),
            ClientMessage::CursorClose(m) => m.encode_to_vec(),
            ClientMessage::StmtExecute(m) => m.encode_to_vec(),
            ClientMessage::CursorsPoll(m) => m.encode_to_vec(),
        }
    }

    fn decode_payload(tag: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        let message = match ClientTag::try_from(tag)? {
            ClientTag::CapabilitiesGet => ClientMessage::CapabilitiesGet(parse(tag, payload)?),
            ClientTag::CapabilitiesSet => ClientMessage::CapabilitiesSet(parse(tag, payload)?),
            ClientTag::ConnClose => ClientMessage::ConnClose(parse(tag, payload)?),
            ClientTag::AuthStart => ClientMessage::AuthStart(parse(tag, payload)?),
            ClientTag::AuthContinue => ClientMessage::AuthContinue(parse(tag, payload)?),
            ClientTag::SessReset => ClientMessage::SessReset(parse(tag, payload)?),
            ClientTag::SessClose => ClientMessage::SessClose(parse(tag, payload)?),
            ClientTag::PrepareStmt => ClientMessage::PrepareStmt(parse(tag, payload)?),
            ClientTag::PreparedStmtExecute => {
                ClientMessage::PreparedStmtExecute(parse(tag, payload)?)
            }
            ClientTag::CursorFetch => ClientMessage::CursorFetch(parse(tag, payload)?),
            ClientTag::CursorClose => ClientMessage::CursorClose(parse(tag, payload)?),
            ClientTag::StmtExecute => ClientMessage::StmtExecute(parse(tag, payload)?),
            ClientTag::CursorsPoll => ClientMessage::CursorsPoll(parse(tag, payload)?),
        };
        Ok(message)
    }
}

/// Decodes a server frame payload.
pub fn decode(tag: u8, payload: &[u8]) -> Result<ServerMessage, ProtocolError> {
    ServerMessage::decode_payload(tag, payload)
}

/// Encodes a server message into `(type_tag, payload)`; the inverse of [`decode`].
pub fn encode(message: &ServerMessage) -> (u8, Vec<u8>) {
    message.to_frame()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::schema::{ErrorPayload, Row, Severity};

    #[test]
    fn empty_ok_payload_decodes() {
        assert_eq!(decode(0, &[]).unwrap(), ServerMessage::ok());
    }

    #[test]
    fn error_payload_fields_survive_decoding() {
        let payload = ErrorPayload {
            severity: Severity::Error as i32,
            code: 1049,
            msg: "Unknown database 'x'".into(),
            sql_state: "42000".into(),
        }
        .encode_to_vec();

        match decode(ServerTag::Error as u8, &payload).unwrap() {
            ServerMessage::Error(e) => {
                assert_eq!(e.code, 1049);
                assert_eq!(e.sql_state, "42000");
                assert_eq!(e.msg, "Unknown database 'x'");
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_is_reported() {
        assert_eq!(decode(200, &[]), Err(ProtocolError::UnknownType(200)));
        assert_eq!(
            ClientMessage::decode_payload(0, &[]),
            Err(ProtocolError::UnknownType(0))
        );
    }

    #[test]
    fn garbage_payload_is_malformed() {
        // field 1, length-delimited, claims 100 bytes but carries 1
        let garbage = [0x0A, 0x64, 0x01];
        assert_eq!(
            decode(ServerTag::Row as u8, &garbage),
            Err(ProtocolError::Malformed(ServerTag::Row as u8))
        );
    }

    #[test]
    fn client_message_frames_carry_its_tag() {
        let (tag, payload) = ClientMessage::sql("SELECT 1").to_frame();
        assert_eq!(tag, ClientTag::StmtExecute as u8);
        assert_eq!(
            ClientMessage::decode_payload(tag, &payload).unwrap(),
            ClientMessage::sql("SELECT 1")
        );
    }

    #[test]
    fn row_fields_are_preserved() {
        let row = ServerMessage::Row(Row {
            field: vec![vec![0x02], vec![], b"abc\0".to_vec()],
        });
        let (tag, payload) = encode(&row);
        assert_eq!(decode(tag, &payload).unwrap(), row);
    }
}
