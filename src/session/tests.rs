// test-only module included via session/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::config::{AuthMethod, TlsMode};
use crate::error::{ProtocolError, TransportError};
use crate::protocol::schema::{
    AuthenticateContinue, AuthenticateFail, AuthenticateOk, Capability, ColumnMetaData, ColumnType,
    CursorCloseOk, CursorFetchDone, CursorFetchDoneMoreResultsets, CursorFetchSuspended,
    PrepareStmtOk, PreparedStmtExecuteOk, Row, Scalar,
};
use crate::transport::memory::MemoryTransport;

fn config() -> ClientConfig {
    ClientConfig {
        fetch_server_version: false,
        ..ClientConfig::default()
    }
}

fn credentials() -> Credentials {
    Credentials::new("app", "secret").with_schema("shop")
}

fn column(name: &str, column_type: ColumnType) -> ServerMessage {
    ServerMessage::ColumnMeta(ColumnMetaData {
        r#type: column_type as i32,
        name: Some(name.as_bytes().to_vec()),
        ..Default::default()
    })
}

fn row(fields: &[&[u8]]) -> ServerMessage {
    ServerMessage::Row(Row {
        field: fields.iter().map(|f| f.to_vec()).collect(),
    })
}

fn done() -> ServerMessage {
    ServerMessage::CursorFetchDone(CursorFetchDone {})
}

fn exec_ok(rows_affected: u64, last_insert_id: Option<u64>) -> ServerMessage {
    ServerMessage::PrepStmtExecOk(PreparedStmtExecuteOk {
        rows_affected: Some(rows_affected),
        last_insert_id,
    })
}

fn push_capabilities(peer: &MemoryTransport) {
    peer.push_message(&ServerMessage::Capabilities(Capabilities::default()));
}

/// A session that went through the PLAIN handshake on a memory transport.
fn ready_session() -> (Session, MemoryTransport) {
    ready_session_with(config())
}

fn ready_session_with(config: ClientConfig) -> (Session, MemoryTransport) {
    let peer = MemoryTransport::new();
    push_capabilities(&peer);
    peer.push_message(&ServerMessage::AuthOk(AuthenticateOk::default()));

    let mut session = Session::new(Endpoint::local("/tmp/mysqlx.sock"), config);
    session.open_with(Box::new(peer.clone()), &credentials()).unwrap();
    (session, peer)
}

/// Client messages written after the handshake.
fn sent_after_handshake(peer: &MemoryTransport) -> Vec<ClientMessage> {
    peer.written_messages().unwrap().split_off(2)
}

#[test]
fn plain_handshake_over_local_socket() {
    let (session, peer) = ready_session();
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.is_open());
    assert!(session.cipher().is_none());
    assert!(session.server_version().is_none());

    let sent = peer.written_messages().unwrap();
    assert!(matches!(sent[0], ClientMessage::CapabilitiesGet(_)));
    match &sent[1] {
        ClientMessage::AuthStart(start) => {
            assert_eq!(start.mech_name, "PLAIN");
            assert_eq!(start.auth_data.as_deref(), Some(&b"shop\0app\0secret"[..]));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(session.metrics().snapshot().sessions_opened, 1);
}

#[test]
fn configured_mysql41_answers_the_challenge() {
    let peer = MemoryTransport::new();
    push_capabilities(&peer);
    peer.push_message(&ServerMessage::AuthContinue(AuthenticateContinue {
        auth_data: b"abcdefghijabcdefghij".to_vec(),
    }));
    peer.push_message(&ServerMessage::AuthOk(AuthenticateOk::default()));

    let config = ClientConfig {
        auth_method: AuthMethod::Mysql41,
        ..config()
    };
    let mut session = Session::new(Endpoint::local("/tmp/mysqlx.sock"), config);
    session.open_with(Box::new(peer.clone()), &credentials()).unwrap();

    let sent = peer.written_messages().unwrap();
    assert_eq!(sent.len(), 3);
    assert!(matches!(&sent[1], ClientMessage::AuthStart(s) if s.mech_name == "MYSQL41"));
    assert!(matches!(&sent[2], ClientMessage::AuthContinue(c) if c.auth_data.starts_with(b"shop\0app\0*")));
}

#[test]
fn unencrypted_tcp_picks_mysql41_on_its_own() {
    let peer = MemoryTransport::new().with_kind(TransportKind::Tcp);
    push_capabilities(&peer);
    peer.push_message(&ServerMessage::AuthContinue(AuthenticateContinue {
        auth_data: b"abcdefghijabcdefghij".to_vec(),
    }));
    peer.push_message(&ServerMessage::AuthOk(AuthenticateOk::default()));

    let config = ClientConfig {
        tls_mode: TlsMode::Disabled,
        auth_method: AuthMethod::Auto,
        ..config()
    };
    let mut session = Session::new(Endpoint::tcp("db.example", 33060), config);
    session.open_with(Box::new(peer.clone()), &credentials()).unwrap();

    let sent = peer.written_messages().unwrap();
    assert_eq!(sent.len(), 3);
    assert!(matches!(&sent[1], ClientMessage::AuthStart(s) if s.mech_name == "MYSQL41" && s.auth_data.is_none()));
    assert!(matches!(&sent[2], ClientMessage::AuthContinue(_)));
    assert!(session.cipher().is_none());
}

#[test]
fn offered_tls_is_requested_before_authenticating() {
    let peer = MemoryTransport::new().with_kind(TransportKind::Tcp);
    peer.push_message(&ServerMessage::Capabilities(Capabilities {
        capabilities: vec![Capability {
            name: "tls".into(),
            value: Some(Any::scalar(Scalar::bool(true))),
        }],
    }));
    peer.push_message(&ServerMessage::ok());

    let mut session = Session::new(Endpoint::tcp("db.example", 33060), config());
    let err = session.open_with(Box::new(peer.clone()), &credentials()).unwrap_err();

    // a memory peer has no socket to wrap
    assert!(matches!(err, Error::Transport(TransportError::Tls(_))));
    assert_eq!(session.state(), SessionState::Closed);
    let sent = peer.written_messages().unwrap();
    assert_eq!(sent.len(), 2);
    assert!(matches!(sent[0], ClientMessage::CapabilitiesGet(_)));
    assert!(matches!(sent[1], ClientMessage::CapabilitiesSet(_)));
    assert_eq!(session.metrics().snapshot().handshakes_failed, 1);
}

#[test]
fn server_version_is_read_after_authentication() {
    let peer = MemoryTransport::new();
    push_capabilities(&peer);
    peer.push_message(&ServerMessage::AuthOk(AuthenticateOk::default()));
    peer.push_message(&column("@@version", ColumnType::Bytes));
    peer.push_message(&row(&[b"8.0.36-log\0"]));
    peer.push_message(&done());

    let config = ClientConfig {
        fetch_server_version: true,
        ..ClientConfig::default()
    };
    let mut session = Session::new(Endpoint::local("/tmp/mysqlx.sock"), config);
    session.open_with(Box::new(peer.clone()), &credentials()).unwrap();

    let version = session.server_version().unwrap();
    assert_eq!(version, &"8.0.36-log".parse::<Version>().unwrap());
    assert!(matches!(
        &sent_after_handshake(&peer)[0],
        ClientMessage::StmtExecute(s) if s.stmt == b"SELECT @@version"
    ));
    assert_eq!(peer.unread(), 0);
}

#[test]
fn server_version_failure_is_not_fatal() {
    let peer = MemoryTransport::new();
    push_capabilities(&peer);
    peer.push_message(&ServerMessage::AuthOk(AuthenticateOk::default()));
    peer.push_message(&ServerMessage::error(1227, "42000", "Access denied"));

    let mut session = Session::new(Endpoint::local("/tmp/mysqlx.sock"), ClientConfig::default());
    session.open_with(Box::new(peer), &credentials()).unwrap();
    assert!(session.is_open());
    assert!(session.server_version().is_none());
}

#[test]
fn auth_fail_closes_the_session() {
    let peer = MemoryTransport::new();
    push_capabilities(&peer);
    peer.push_message(&ServerMessage::AuthFail(AuthenticateFail {
        msg: "Access denied for user 'app'".into(),
    }));

    let mut session = Session::new(Endpoint::local("/tmp/mysqlx.sock"), config());
    let err = session
        .open_with(Box::new(peer.clone()), &credentials())
        .unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(peer.close_calls(), 1);
    let snapshot = session.metrics().snapshot();
    assert_eq!(snapshot.handshakes_failed, 1);
    assert_eq!(snapshot.sessions_opened, 0);
    assert_eq!(snapshot.sessions_closed, 0);
}

#[test]
fn truncated_capabilities_reply_closes_the_session() {
    let peer = MemoryTransport::new();
    peer.push_bytes(&[0x00, 0x00, 0x00, 0x09, 0x04]);

    let mut session = Session::new(Endpoint::local("/tmp/mysqlx.sock"), config());
    let err = session.open_with(Box::new(peer.clone()), &credentials()).unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_fatal());
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(peer.close_calls(), 1);
}

#[test]
fn requests_outside_ready_do_not_touch_the_transport() {
    let mut session = Session::new(Endpoint::local("/tmp/mysqlx.sock"), config());
    let err = session.query("SELECT 1", true).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            operation: "query",
            state: SessionState::Disconnected
        }
    ));
    assert!(err.is_state_error());

    let peer = MemoryTransport::new();
    session.attach(Box::new(peer.clone())).unwrap();
    assert_eq!(session.state(), SessionState::Connecting);
    assert!(matches!(
        session.query("SELECT 1", false),
        Err(Error::InvalidState {
            operation: "query",
            state: SessionState::Connecting
        })
    ));
    assert!(matches!(
        session.execute("DELETE FROM t"),
        Err(Error::InvalidState {
            state: SessionState::Connecting,
            ..
        })
    ));
    assert!(matches!(session.prepare("SELECT 1"), Err(Error::InvalidState { .. })));
    assert!(matches!(session.reset(), Err(Error::InvalidState { .. })));
    assert!(peer.written().is_empty());
    assert!(peer.written_messages().unwrap().is_empty());
}

#[test]
fn closed_session_rejects_everything() {
    let (mut session, peer) = ready_session();
    session.close();

    assert!(matches!(session.query("SELECT 1", true), Err(Error::SessionClosed)));
    assert!(matches!(session.execute("DO 1"), Err(Error::SessionClosed)));
    assert!(matches!(session.fetch(1, None), Err(Error::SessionClosed)));
    assert!(matches!(session.poll_cursors(&[1]), Err(Error::SessionClosed)));
    assert!(matches!(
        session.open_with(Box::new(MemoryTransport::new()), &credentials()),
        Err(Error::SessionClosed)
    ));
    assert_eq!(sent_after_handshake(&peer).len(), 1);
}

#[test]
fn close_is_idempotent() {
    let (mut session, peer) = ready_session();
    session.close();
    session.close();
    drop(session);

    assert_eq!(peer.close_calls(), 1);
    let sent = sent_after_handshake(&peer);
    assert_eq!(sent, vec![ClientMessage::ConnClose(ConnectionClose {})]);
}

#[test]
fn close_pairs_with_open_in_metrics() {
    let (mut session, _peer) = ready_session();
    let metrics = session.metrics();
    session.close();
    session.close();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.sessions_opened, 1);
    assert_eq!(snapshot.sessions_closed, 1);
}

#[test]
fn buffered_query_reads_the_whole_reply() {
    let (mut session, peer) = ready_session();
    peer.push_message(&column("id", ColumnType::Uint));
    peer.push_message(&column("name", ColumnType::Bytes));
    peer.push_message(&row(&[&[0x01], b"apple\0"]));
    peer.push_message(&ServerMessage::Notice(Notice::default()));
    peer.push_message(&row(&[&[0x02], b""]));
    peer.push_message(&done());

    let mut result = session.query("SELECT id, name FROM items", true).unwrap();
    assert_eq!(peer.unread(), 0);
    let names: Vec<&str> = result.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "name"]);

    let rows = result.rows().unwrap();
    assert_eq!(rows[0], vec![Value::Unsigned(1), Value::Bytes(b"apple".to_vec())]);
    assert_eq!(rows[1], vec![Value::Unsigned(2), Value::Null]);
    assert!(result.is_finished());
    drop(result);

    assert_eq!(session.take_notices().len(), 1);
    assert!(session.take_notices().is_empty());
}

#[test]
fn unbuffered_query_reads_on_demand() {
    let (mut session, peer) = ready_session();
    peer.push_message(&column("n", ColumnType::Sint));
    peer.push_message(&row(&[&[0x04]]));
    peer.push_message(&row(&[&[0x01]]));
    peer.push_message(&done());

    let mut result = session.query("SELECT n FROM t", false).unwrap();
    assert_eq!(result.next_row().unwrap(), Some(vec![Value::Signed(2)]));
    assert!(peer.unread() > 0);
    assert_eq!(result.next_row().unwrap(), Some(vec![Value::Signed(-1)]));
    assert_eq!(result.next_row().unwrap(), None);
    assert!(result.is_finished());
    drop(result);
    assert!(session.is_open());
}

#[test]
fn dropped_stream_drains_the_rest() {
    let (mut session, peer) = ready_session();
    peer.push_message(&column("n", ColumnType::Uint));
    for i in 0..5u8 {
        peer.push_message(&row(&[&[i]]));
    }
    peer.push_message(&done());

    let mut result = session.query("SELECT n FROM t", false).unwrap();
    result.next_row().unwrap();
    drop(result);

    assert_eq!(peer.unread(), 0);
    assert!(session.is_open());

    peer.push_message(&exec_ok(0, None));
    assert_eq!(session.execute("DO 1").unwrap().rows_affected, 0);
}

#[test]
fn multiple_result_sets() {
    let (mut session, peer) = ready_session();
    peer.push_message(&column("a", ColumnType::Uint));
    peer.push_message(&row(&[&[0x01]]));
    peer.push_message(&ServerMessage::CursorFetchDoneMoreResultsets(
        CursorFetchDoneMoreResultsets {},
    ));
    peer.push_message(&column("b", ColumnType::Bytes));
    peer.push_message(&row(&[b"x\0"]));
    peer.push_message(&row(&[b"y\0"]));
    peer.push_message(&done());

    let mut result = session.query("CALL two_sets()", false).unwrap();
    assert_eq!(result.rows().unwrap().len(), 1);
    assert!(result.next_result_set().unwrap());
    assert_eq!(result.columns()[0].name, "b");
    assert_eq!(result.rows().unwrap().len(), 2);
    assert!(!result.next_result_set().unwrap());
    drop(result);
    assert_eq!(peer.unread(), 0);
}

#[test]
fn execute_reports_counts() {
    let (mut session, peer) = ready_session();
    peer.push_message(&ServerMessage::ParamChange(ParameterChanged {
        param: "autocommit".into(),
        value: Some(Scalar::bool(true)),
    }));
    peer.push_message(&exec_ok(3, Some(42)));

    let outcome = session.execute("INSERT INTO t VALUES (1), (2), (3)").unwrap();
    assert_eq!(outcome.rows_affected, 3);
    assert_eq!(outcome.last_insert_id, Some(42));
    assert_eq!(session.take_parameter_changes()[0].param, "autocommit");
}

#[test]
fn query_with_binds_arguments() {
    let (mut session, peer) = ready_session();
    peer.push_message(&column("name", ColumnType::Bytes));
    peer.push_message(&row(&[b"pear\0"]));
    peer.push_message(&done());

    let args = vec![Any::scalar(Scalar::unsigned(2))];
    let mut result = session
        .query_with("SELECT name FROM items WHERE id = ?", args.clone(), true)
        .unwrap();
    assert_eq!(result.rows().unwrap()[0][0].as_str(), Some("pear"));
    drop(result);

    match &sent_after_handshake(&peer)[0] {
        ClientMessage::StmtExecute(stmt) => {
            assert_eq!(stmt.args, args);
            assert_eq!(stmt.namespace.as_deref(), Some("sql"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn server_error_leaves_the_session_ready() {
    let (mut session, peer) = ready_session();
    peer.push_message(&ServerMessage::error(1049, "42000", "Unknown database 'nope'"));

    let err = session.execute("USE nope").unwrap_err();
    let server = err.server_error().unwrap();
    assert_eq!(server.code, 1049);
    assert_eq!(server.sqlstate, "42000");
    assert_eq!(server.message, "Unknown database 'nope'");
    assert!(!server.fatal);
    assert!(!err.is_fatal());
    assert_eq!(session.state(), SessionState::Ready);

    peer.push_message(&exec_ok(1, None));
    assert_eq!(session.execute("DO 1").unwrap().rows_affected, 1);
    assert_eq!(session.metrics().snapshot().server_errors, 1);
}

#[test]
fn oversized_request_leaves_the_session_ready() {
    let config = ClientConfig {
        max_frame_size: 1024,
        ..config()
    };
    let (mut session, peer) = ready_session_with(config);
    let written_before = peer.written().len();

    let err = session.execute(&"x".repeat(4096)).unwrap_err();
    assert!(matches!(err, Error::RequestTooLarge { max: 1024, .. }));
    assert!(!err.is_fatal());
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(peer.written().len(), written_before);
    assert_eq!(peer.close_calls(), 0);

    peer.push_message(&exec_ok(1, None));
    assert_eq!(session.execute("DO 1").unwrap().rows_affected, 1);
}

#[test]
fn unexpected_first_reply_names_the_statement() {
    let (mut session, peer) = ready_session();
    peer.push_message(&ServerMessage::AuthOk(AuthenticateOk::default()));

    match session.execute("DO 1") {
        Err(Error::UnexpectedResponse {
            received_tag,
            context,
        }) => {
            assert_eq!(received_tag, ServerTag::AuthOk as u8);
            assert_eq!(context, constants::CTX_STMT_EXECUTE);
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Ready);

    peer.push_message(&exec_ok(2, None));
    assert_eq!(session.execute("DO 2").unwrap().rows_affected, 2);
}

#[test]
fn unexpected_message_mid_stream_abandons_the_session() {
    let (mut session, peer) = ready_session();
    peer.push_message(&column("n", ColumnType::Uint));
    peer.push_message(&row(&[&[0x01]]));
    peer.push_message(&ServerMessage::AuthOk(AuthenticateOk::default()));
    peer.push_message(&row(&[&[0x02]]));
    peer.push_message(&done());
    peer.push_message(&exec_ok(1, None));

    let mut result = session.query("SELECT n FROM t", false).unwrap();
    assert_eq!(result.next_row().unwrap(), Some(vec![Value::Unsigned(1)]));
    let err = result.next_row().unwrap_err();
    assert!(matches!(
        err,
        Error::UnexpectedResponse { received_tag, .. } if received_tag == ServerTag::AuthOk as u8
    ));
    drop(result);

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(peer.close_calls(), 1);
    assert!(matches!(session.execute("DELETE FROM t"), Err(Error::SessionClosed)));
}

#[test]
fn unexpected_message_in_buffered_reply_abandons_the_session() {
    let (mut session, peer) = ready_session();
    peer.push_message(&column("n", ColumnType::Uint));
    peer.push_message(&ServerMessage::CursorCloseOk(CursorCloseOk {}));
    peer.push_message(&done());

    assert!(matches!(
        session.query("SELECT n FROM t", true),
        Err(Error::UnexpectedResponse { .. })
    ));
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn unknown_tag_mid_stream_closes_the_session() {
    let (mut session, peer) = ready_session();
    peer.push_bytes(&[0x00, 0x00, 0x00, 0x05, 0x40]);

    let err = session.query("SELECT 1", true).unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::UnknownType(0x40))));
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(peer.close_calls(), 1);
}

#[test]
fn undecodable_row_abandons_a_stream() {
    let (mut session, peer) = ready_session();
    peer.push_message(&column("n", ColumnType::Uint));
    peer.push_message(&row(&[&[0x01], &[0x02]]));
    peer.push_message(&done());

    let mut result = session.query("SELECT n FROM t", false).unwrap();
    assert!(result.next_row().is_err());
    drop(result);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(peer.close_calls(), 1);
}

#[test]
fn prepared_statement_with_cursor() {
    let (mut session, peer) = ready_session();
    peer.push_message(&ServerMessage::PrepStmtOk(PrepareStmtOk {}));
    let stmt = session.prepare("SELECT id FROM items WHERE id > ?").unwrap();
    assert_eq!(stmt.id, 1);

    peer.push_message(&column("id", ColumnType::Uint));
    peer.push_message(&ServerMessage::CursorFetchSuspended(CursorFetchSuspended {}));
    let result = session
        .execute_prepared(&stmt, 7, vec![Any::scalar(Scalar::unsigned(0))])
        .unwrap();
    assert_eq!(result.columns().len(), 1);
    drop(result);

    peer.push_message(&row(&[&[0x05]]));
    peer.push_message(&row(&[&[0x06]]));
    peer.push_message(&ServerMessage::CursorFetchSuspended(CursorFetchSuspended {}));
    let batch = session.fetch(7, Some(2)).unwrap();
    assert_eq!(batch.status, FetchStatus::Suspended);
    assert_eq!(batch.rows, vec![vec![Value::Unsigned(5)], vec![Value::Unsigned(6)]]);
    assert_eq!(batch.columns[0].name, "id");

    peer.push_message(&row(&[&[0x07]]));
    peer.push_message(&done());
    let batch = session.fetch(7, None).unwrap();
    assert_eq!(batch.status, FetchStatus::Done);
    assert_eq!(batch.rows.len(), 1);

    peer.push_message(&ServerMessage::CursorsPoll(CursorsPoll { cursor_id: vec![7] }));
    assert_eq!(session.poll_cursors(&[7, 8]).unwrap(), vec![7]);

    peer.push_message(&ServerMessage::CursorCloseOk(CursorCloseOk {}));
    session.close_cursor(7).unwrap();

    let sent = sent_after_handshake(&peer);
    assert!(matches!(&sent[0], ClientMessage::PrepareStmt(p) if p.stmt_id == 1));
    assert!(matches!(&sent[1], ClientMessage::PreparedStmtExecute(e) if e.cursor_id == 7));
    assert!(matches!(&sent[2], ClientMessage::CursorFetch(f) if f.fetch_rows == Some(2)));
    assert!(matches!(&sent[3], ClientMessage::CursorFetch(f) if f.fetch_rows.is_none()));
    assert!(matches!(&sent[4], ClientMessage::CursorsPoll(_)));
    assert!(matches!(&sent[5], ClientMessage::CursorClose(c) if c.cursor_id == 7));
}

#[test]
fn unexpected_reply_keeps_the_session_open() {
    let (mut session, peer) = ready_session();
    peer.push_message(&ServerMessage::ok());

    let err = session.close_cursor(3).unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse { received_tag: 0, .. }));
    assert!(session.is_open());
}

#[test]
fn reset_restarts_statement_ids() {
    let (mut session, peer) = ready_session();
    peer.push_message(&ServerMessage::PrepStmtOk(PrepareStmtOk {}));
    peer.push_message(&ServerMessage::PrepStmtOk(PrepareStmtOk {}));
    assert_eq!(session.prepare("SELECT 1").unwrap().id, 1);
    assert_eq!(session.prepare("SELECT 2").unwrap().id, 2);

    peer.push_message(&ServerMessage::ok());
    session.reset().unwrap();
    peer.push_message(&ServerMessage::PrepStmtOk(PrepareStmtOk {}));
    assert_eq!(session.prepare("SELECT 3").unwrap().id, 1);
}

#[test]
fn scoped_session_closes_on_early_return() {
    fn run(session: &mut Session) -> Result<u64> {
        let mut scoped = ScopedSession::new(session);
        let outcome = scoped.execute("DELETE FROM t")?;
        Ok(outcome.rows_affected)
    }

    let (mut session, peer) = ready_session();
    peer.push_message(&ServerMessage::error(1146, "42S02", "Table 't' doesn't exist"));
    assert!(run(&mut session).is_err());
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(peer.close_calls(), 1);
}

#[test]
fn credentials_never_print_the_password() {
    let printed = format!("{:?}", credentials());
    assert!(printed.contains("app"));
    assert!(!printed.contains("secret"));
}
