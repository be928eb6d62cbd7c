//! Scripted in-process X protocol server for integration tests.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};

use mysqlx_protocol::core::frame;
use mysqlx_protocol::protocol::schema::{
    Any, AnyArray, AnyType, Capabilities, Capability, ColumnMetaData, ColumnType, CursorFetchDone,
    Row, Scalar,
};
use mysqlx_protocol::protocol::{ClientMessage, ClientTag, ServerMessage, WireMessage};
use mysqlx_protocol::transport::tcp::TcpTransport;
use mysqlx_protocol::transport::Transport;

/// One expected client request and the frames sent back for it.
pub struct Step {
    pub expect: ClientTag,
    pub replies: Vec<ServerMessage>,
}

pub fn step(expect: ClientTag, replies: Vec<ServerMessage>) -> Step {
    Step { expect, replies }
}

fn read_message(peer: &mut dyn Transport) -> mysqlx_protocol::Result<ClientMessage> {
    let frame = frame::read_frame(peer, frame::MAX_PAYLOAD_SIZE)?;
    Ok(ClientMessage::decode_payload(frame.type_tag, &frame.payload)?)
}

/// Plays `script` against `peer`, then collects whatever the client sends
/// until it hangs up. Returns every client message received.
pub fn run_script<T: Transport>(mut peer: T, script: Vec<Step>) -> Vec<ClientMessage> {
    let mut received = Vec::new();
    for step in script {
        let message = read_message(&mut peer).expect("client request");
        assert_eq!(message.tag(), step.expect, "unexpected client message {message:?}");
        received.push(message);
        for reply in &step.replies {
            let (tag, payload) = reply.to_frame();
            frame::write_frame(&mut peer, tag, &payload, frame::MAX_PAYLOAD_SIZE).expect("server reply");
        }
    }
    while let Ok(message) = read_message(&mut peer) {
        received.push(message);
    }
    peer.close();
    received
}

/// Listens on an ephemeral local port and serves one connection.
pub fn serve_tcp(script: Vec<Step>) -> (SocketAddr, JoinHandle<Vec<ClientMessage>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let peer = TcpTransport::from_stream(stream).expect("wrap stream");
        run_script(peer, script)
    });
    (addr, handle)
}

pub fn capabilities(tls: bool) -> ServerMessage {
    let mechanisms = Any {
        r#type: AnyType::Array as i32,
        scalar: None,
        array: Some(AnyArray {
            value: vec![
                Any::scalar(Scalar::string("MYSQL41")),
                Any::scalar(Scalar::string("PLAIN")),
            ],
        }),
    };
    let mut list = vec![Capability {
        name: "authentication.mechanisms".into(),
        value: Some(mechanisms),
    }];
    if tls {
        list.push(Capability {
            name: "tls".into(),
            value: Some(Any::scalar(Scalar::bool(true))),
        });
    }
    ServerMessage::Capabilities(Capabilities { capabilities: list })
}

pub fn column(name: &str, column_type: ColumnType) -> ServerMessage {
    ServerMessage::ColumnMeta(ColumnMetaData {
        r#type: column_type as i32,
        name: Some(name.as_bytes().to_vec()),
        ..Default::default()
    })
}

pub fn row(fields: &[&[u8]]) -> ServerMessage {
    ServerMessage::Row(Row {
        field: fields.iter().map(|f| f.to_vec()).collect(),
    })
}

pub fn done() -> ServerMessage {
    ServerMessage::CursorFetchDone(CursorFetchDone {})
}

/// Reply to `SELECT @@version`.
pub fn version_reply(version: &str) -> Vec<ServerMessage> {
    let mut field = version.as_bytes().to_vec();
    field.push(0);
    vec![column("@@version", ColumnType::Bytes), row(&[&field]), done()]
}
