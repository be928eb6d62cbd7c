//! # Session
//!
//! A session owns one transport and walks it through the connection
//! lifecycle:
//!
//! ```text
//! Disconnected -> Connecting -> Authenticating -> Ready -> Closed
//! ```
//!
//! Any fatal error (transport, protocol, authentication) moves the session to
//! `Closed` before the error is returned. Server errors leave it `Ready`.
//! Application requests are only accepted in `Ready`; anywhere else they fail
//! without touching the transport.
//!
//! ## Example
//! ```rust,no_run
//! use mysqlx_protocol::config::ClientConfig;
//! use mysqlx_protocol::session::{Credentials, Session};
//! use mysqlx_protocol::transport::Endpoint;
//!
//! # fn main() -> mysqlx_protocol::error::Result<()> {
//! let credentials = Credentials::new("app", "secret").with_schema("shop");
//! let mut session = Session::connect(Endpoint::tcp("127.0.0.1", 33060), &credentials, ClientConfig::default())?;
//!
//! let mut result = session.query("SELECT id, name FROM items", false)?;
//! while let Some(row) = result.next_row()? {
//!     println!("{row:?}");
//! }
//! drop(result);
//!
//! session.close();
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod result;
pub mod version;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

pub use api::{DbSession, ScopedSession};
pub use result::{Column, ExecOutcome, QueryResult, StreamEvent, Value};
pub use version::Version;

use crate::config::ClientConfig;
use crate::error::{constants, Error, Result};
use crate::protocol::exchange::Channel;
use crate::protocol::handshake::{self, Mechanism};
use crate::protocol::message::{ClientMessage, ServerMessage, ServerTag};
use crate::protocol::schema::{
    Any, Capabilities, ConnectionClose, CursorClose, CursorFetch, CursorsPoll, Notice,
    ParameterChanged, PrepareStmt, PreparedStmtExecute, SessionReset, StmtExecute,
};
use crate::transport::{self, Endpoint, Transport, TransportKind};
use crate::utils::metrics::{Metrics, Timer};

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Authenticating => "authenticating",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Login credentials. The password is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub schema: Option<String>,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("schema", &self.schema)
            .finish()
    }
}

/// A server-side prepared statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    pub id: u32,
    pub sql: String,
}

/// How a cursor fetch stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The cursor is exhausted.
    Done,
    /// The row limit was reached; fetch again for more.
    Suspended,
    /// The current result set is exhausted and another one follows.
    MoreResultsets,
}

/// Rows returned by one cursor fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorBatch {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
    pub status: FetchStatus,
}

/// Tags that may follow a statement request.
const STREAM_EXPECTED: &[ServerTag] = &[
    ServerTag::ColumnMeta,
    ServerTag::Row,
    ServerTag::CursorFetchDone,
    ServerTag::CursorFetchDoneMoreResultsets,
    ServerTag::PrepStmtExecOk,
    ServerTag::Notice,
    ServerTag::ParamChange,
];

/// Tags that may follow a prepared statement execution, which can leave a
/// cursor suspended.
const PREPARED_EXPECTED: &[ServerTag] = &[
    ServerTag::ColumnMeta,
    ServerTag::Row,
    ServerTag::CursorFetchDone,
    ServerTag::CursorFetchDoneMoreResultsets,
    ServerTag::CursorFetchSuspended,
    ServerTag::PrepStmtExecOk,
    ServerTag::Notice,
    ServerTag::ParamChange,
];

/// Tags that may follow a cursor fetch.
const FETCH_EXPECTED: &[ServerTag] = &[
    ServerTag::ColumnMeta,
    ServerTag::Row,
    ServerTag::CursorFetchDone,
    ServerTag::CursorFetchDoneMoreResultsets,
    ServerTag::CursorFetchSuspended,
    ServerTag::Notice,
    ServerTag::ParamChange,
];

/// One client connection to an X protocol server.
pub struct Session {
    endpoint: Endpoint,
    config: ClientConfig,
    state: SessionState,
    channel: Option<Channel>,
    metrics: Arc<Metrics>,
    capabilities: Option<Capabilities>,
    server_version: Option<Version>,
    cipher: Option<String>,
    notices: Vec<Notice>,
    parameter_changes: Vec<ParameterChanged>,
    cursor_columns: HashMap<u32, Vec<Column>>,
    next_statement_id: u32,
    /// Context of the statement whose reply is being read.
    stream_context: &'static str,
    /// Reply events of that statement read so far, notices excluded.
    stream_events: usize,
}

impl Session {
    /// A disconnected session for `endpoint`.
    pub fn new(endpoint: Endpoint, config: ClientConfig) -> Self {
        Self {
            endpoint,
            config,
            state: SessionState::Disconnected,
            channel: None,
            metrics: Arc::new(Metrics::new()),
            capabilities: None,
            server_version: None,
            cipher: None,
            notices: Vec::new(),
            parameter_changes: Vec::new(),
            cursor_columns: HashMap::new(),
            next_statement_id: 1,
            stream_context: constants::CTX_RESULT_STREAM,
            stream_events: 0,
        }
    }

    /// Connects, negotiates and authenticates in one step.
    pub fn connect(endpoint: Endpoint, credentials: &Credentials, config: ClientConfig) -> Result<Self> {
        let mut session = Self::new(endpoint, config);
        session.open(credentials)?;
        Ok(session)
    }

    /// Opens the transport to the configured endpoint and runs the handshake.
    #[instrument(skip(self, credentials), fields(endpoint = %self.endpoint))]
    pub fn open(&mut self, credentials: &Credentials) -> Result<()> {
        self.require(SessionState::Disconnected, "open")?;
        let transport = match transport::open(&self.endpoint, &self.config) {
            Ok(transport) => transport,
            Err(e) => {
                let err = Error::from(e);
                self.metrics.record_error(&err);
                self.state = SessionState::Closed;
                return Err(err);
            }
        };
        self.attach(transport)?;
        self.handshake(credentials)
    }

    /// Attaches an already connected transport.
    pub fn attach(&mut self, transport: Box<dyn Transport>) -> Result<()> {
        self.require(SessionState::Disconnected, "attach")?;
        self.channel = Some(Channel::new(
            transport,
            self.config.max_frame_size,
            Arc::clone(&self.metrics),
        ));
        self.state = SessionState::Connecting;
        debug!(endpoint = %self.endpoint, "transport attached");
        Ok(())
    }

    /// Attaches `transport` and runs the handshake over it.
    pub fn open_with(&mut self, transport: Box<dyn Transport>, credentials: &Credentials) -> Result<()> {
        self.attach(transport)?;
        self.handshake(credentials)
    }

    /// Capabilities, optional TLS, authentication, then the server version.
    ///
    /// Any failure closes the session.
    #[instrument(skip(self, credentials), fields(endpoint = %self.endpoint, user = %credentials.user))]
    pub fn handshake(&mut self, credentials: &Credentials) -> Result<()> {
        self.require(SessionState::Connecting, "handshake")?;
        let _timer = Timer::start("handshake");
        self.metrics.handshake_attempt();

        if let Err(e) = self.run_handshake(credentials) {
            self.metrics.handshake_failed();
            self.metrics.record_error(&e);
            warn!(error = %e, "handshake failed");
            self.shutdown();
            return Err(e);
        }

        self.state = SessionState::Ready;
        self.metrics.session_opened();
        info!(cipher = ?self.cipher, "session ready");

        if self.config.fetch_server_version {
            self.load_server_version()?;
        }
        Ok(())
    }

    fn run_handshake(&mut self, credentials: &Credentials) -> Result<()> {
        let channel = self.channel.as_mut().ok_or(Error::SessionClosed)?;
        let capabilities = handshake::read_capabilities(channel)?;
        self.state = SessionState::Authenticating;

        let kind = channel.kind();
        let mut secure = kind == TransportKind::Local;
        if handshake::wants_tls(kind, &capabilities, &self.config)? {
            handshake::request_tls(channel)?;
            let host = self
                .endpoint
                .host()
                .ok_or_else(|| Error::Config("TLS requires a host name".to_string()))?;
            let plain = self.channel.take().ok_or(Error::SessionClosed)?;
            let upgraded = plain.upgrade_tls(host, self.config.tls_verify)?;
            self.cipher = upgraded.cipher();
            self.channel = Some(upgraded);
            secure = true;
        }

        let mechanism = Mechanism::select(self.config.auth_method, secure);
        let advertised = handshake::advertised_mechanisms(&capabilities);
        if !advertised.is_empty() && !advertised.iter().any(|m| m == mechanism.name()) {
            warn!(mechanism = mechanism.name(), ?advertised, "server does not list the chosen mechanism");
        }

        let schema = credentials
            .schema
            .as_deref()
            .or(self.config.default_schema.as_deref())
            .unwrap_or("");
        let channel = self.channel.as_mut().ok_or(Error::SessionClosed)?;
        handshake::authenticate(channel, mechanism, credentials, schema, &mut self.notices)?;

        self.capabilities = Some(capabilities);
        Ok(())
    }

    fn load_server_version(&mut self) -> Result<()> {
        let mut result = {
            let queried = self.query("SELECT @@version", true);
            match queried {
                Ok(result) => result,
                Err(_) => {
                    let Some(e) = queried.err() else { unreachable!() };
                    if e.is_fatal() || self.state != SessionState::Ready {
                        return Err(e);
                    }
                    warn!(error = %e, context = constants::CTX_SERVER_VERSION, "could not read server version");
                    return Ok(());
                }
            }
        };
        let text = result
            .next_row()?
            .and_then(|row| row.into_iter().next())
            .and_then(|value| value.as_str().map(str::to_string));
        drop(result);

        self.server_version = match text.as_deref().map(str::parse::<Version>) {
            Some(Ok(version)) => {
                debug!(%version, "server version");
                Some(version)
            }
            Some(Err(e)) => {
                warn!(error = %e, "unparseable server version");
                None
            }
            None => {
                warn!("server returned no version");
                None
            }
        };
        Ok(())
    }

    // ========================================================================
    // State handling
    // ========================================================================

    fn require(&self, state: SessionState, operation: &'static str) -> Result<()> {
        match self.state {
            s if s == state => Ok(()),
            SessionState::Closed => Err(Error::SessionClosed),
            s => Err(Error::InvalidState { operation, state: s }),
        }
    }

    fn ready_channel(&mut self, operation: &'static str) -> Result<&mut Channel> {
        self.require(SessionState::Ready, operation)?;
        self.channel.as_mut().ok_or(Error::SessionClosed)
    }

    /// Records `err` and closes the session if it is fatal.
    fn fail(&mut self, err: Error) -> Error {
        self.metrics.record_error(&err);
        if err.is_fatal() {
            warn!(error = %err, "fatal error, closing session");
            self.shutdown();
        }
        err
    }

    /// Closes the session after a failure that left the stream position
    /// unknown, whatever the error class.
    pub(crate) fn abandon(&mut self, err: Error) -> Error {
        self.metrics.record_error(&err);
        warn!(error = %err, "result stream abandoned, closing session");
        self.shutdown();
        err
    }

    fn shutdown(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
            if self.state == SessionState::Ready {
                self.metrics.session_closed();
            }
        }
        self.cursor_columns.clear();
        self.state = SessionState::Closed;
    }

    /// One request whose reply is a single message, skipping interleaved
    /// notices and parameter changes.
    fn round_trip(
        &mut self,
        operation: &'static str,
        message: &ClientMessage,
        expected: &[ServerTag],
        context: &str,
    ) -> Result<ServerMessage> {
        let mut allowed = expected.to_vec();
        allowed.extend([ServerTag::Notice, ServerTag::ParamChange]);

        let channel = self.ready_channel(operation)?;
        let mut pending = match channel.send(message, &allowed, context) {
            Ok(pending) => pending,
            Err(e) => return Err(self.fail(e)),
        };
        loop {
            let channel = self.channel.as_mut().ok_or(Error::SessionClosed)?;
            let reply = match channel.complete(pending) {
                Ok(reply) => reply,
                Err(e) => return Err(self.fail(e)),
            };
            match reply {
                ServerMessage::Notice(notice) => self.notices.push(notice),
                ServerMessage::ParamChange(change) => self.parameter_changes.push(change),
                other => return Ok(other),
            }
            let channel = self.channel.as_mut().ok_or(Error::SessionClosed)?;
            pending = channel.expect(&allowed, context);
        }
    }

    /// Next event of the statement currently streaming.
    pub(crate) fn next_stream_event(&mut self) -> Result<StreamEvent> {
        self.next_event_in(STREAM_EXPECTED, self.stream_context)
    }

    /// Marks the start of a statement reply after its request was written.
    fn begin_reply(&mut self, context: &'static str) {
        self.metrics.exchange_started();
        self.stream_context = context;
        self.stream_events = 0;
    }

    /// Fails a statement reply. Once part of the reply has been consumed an
    /// unexpected message leaves the rest of it unread, so the session is
    /// abandoned instead of kept.
    fn fail_reply(&mut self, err: Error) -> Error {
        if self.stream_events > 0 && matches!(err, Error::UnexpectedResponse { .. }) {
            return self.abandon(err);
        }
        self.fail(err)
    }

    fn next_event_in(&mut self, expected: &[ServerTag], context: &str) -> Result<StreamEvent> {
        loop {
            let channel = self.ready_channel("read result")?;
            let message = match channel.receive_expected(expected, context) {
                Ok(message) => message,
                Err(e) => return Err(self.fail_reply(e)),
            };
            let event = match message {
                ServerMessage::Notice(notice) => {
                    self.notices.push(notice);
                    continue;
                }
                ServerMessage::ParamChange(change) => {
                    self.parameter_changes.push(change);
                    continue;
                }
                ServerMessage::ColumnMeta(meta) => match Column::try_from(meta) {
                    Ok(column) => StreamEvent::Column(column),
                    Err(e) => return Err(self.fail(e.into())),
                },
                ServerMessage::Row(row) => StreamEvent::Row(row.field),
                ServerMessage::CursorFetchDone(_) => StreamEvent::ResultSetEnd { more: false },
                ServerMessage::CursorFetchDoneMoreResultsets(_) => {
                    StreamEvent::ResultSetEnd { more: true }
                }
                ServerMessage::PrepStmtExecOk(ok) => StreamEvent::StatementOk(ok.into()),
                ServerMessage::CursorFetchSuspended(_) => StreamEvent::Suspended,
                other => {
                    return Err(self.fail_reply(Error::UnexpectedResponse {
                        received_tag: other.tag() as u8,
                        context: context.to_string(),
                    }))
                }
            };
            self.stream_events += 1;
            return Ok(event);
        }
    }

    /// Reads a whole statement reply into memory.
    fn read_statement(&mut self, expected: &[ServerTag], context: &str) -> Result<VecDeque<StreamEvent>> {
        let mut events = VecDeque::new();
        loop {
            let event = self.next_event_in(expected, context)?;
            let done = event.ends_statement();
            events.push_back(event);
            if done {
                return Ok(events);
            }
        }
    }

    fn start_statement(
        &mut self,
        operation: &'static str,
        message: &ClientMessage,
        context: &'static str,
        buffered: bool,
    ) -> Result<QueryResult<'_>> {
        let channel = self.ready_channel(operation)?;
        // replies are read as a stream, classified per event
        if let Err(e) = channel.write(message) {
            return Err(self.fail(e));
        }
        self.begin_reply(context);
        debug!(context, buffered, "statement sent");

        if buffered {
            let events = self.read_statement(STREAM_EXPECTED, context)?;
            QueryResult::buffered(events)
        } else {
            QueryResult::streaming(self)
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Runs `sql` and returns its result sets.
    ///
    /// A buffered result reads the whole reply before returning. An
    /// unbuffered one reads rows on demand and holds the session until it
    /// is exhausted or dropped.
    #[instrument(skip(self, sql))]
    pub fn query(&mut self, sql: &str, buffered: bool) -> Result<QueryResult<'_>> {
        self.start_statement("query", &ClientMessage::sql(sql), constants::CTX_STMT_EXECUTE, buffered)
    }

    /// Runs `sql` with positional arguments bound to its `?` placeholders.
    pub fn query_with(&mut self, sql: &str, args: Vec<Any>, buffered: bool) -> Result<QueryResult<'_>> {
        let message = ClientMessage::StmtExecute(StmtExecute {
            stmt: sql.as_bytes().to_vec(),
            args,
            namespace: Some("sql".to_string()),
            compact_metadata: None,
        });
        self.start_statement("query", &message, constants::CTX_STMT_EXECUTE, buffered)
    }

    /// Runs `sql`, discarding any rows, and returns the completion counts.
    pub fn execute(&mut self, sql: &str) -> Result<ExecOutcome> {
        let mut result = self.query(sql, false)?;
        result.drain()?;
        Ok(result.outcome())
    }

    /// Prepares `sql` on the server.
    #[instrument(skip(self, sql))]
    pub fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        self.require(SessionState::Ready, "prepare")?;
        let id = self.next_statement_id;
        let message = ClientMessage::PrepareStmt(PrepareStmt {
            stmt_id: id,
            stmt: sql.as_bytes().to_vec(),
        });
        self.round_trip("prepare", &message, &[ServerTag::PrepStmtOk], constants::CTX_PREPARE)?;
        self.next_statement_id = self.next_statement_id.wrapping_add(1).max(1);
        debug!(stmt_id = id, "statement prepared");
        Ok(PreparedStatement {
            id,
            sql: sql.to_string(),
        })
    }

    /// Executes a prepared statement, opening cursor `cursor_id` over its
    /// result. The reply is read fully before returning; when it stops
    /// suspended the remaining rows are read with [`Session::fetch`].
    #[instrument(skip(self, statement, args), fields(stmt_id = statement.id))]
    pub fn execute_prepared(
        &mut self,
        statement: &PreparedStatement,
        cursor_id: u32,
        args: Vec<Any>,
    ) -> Result<QueryResult<'_>> {
        let message = ClientMessage::PreparedStmtExecute(PreparedStmtExecute {
            stmt_id: statement.id,
            cursor_id,
            args,
        });
        let channel = self.ready_channel("execute_prepared")?;
        if let Err(e) = channel.write(&message) {
            return Err(self.fail(e));
        }
        self.begin_reply(constants::CTX_PREPARED_EXECUTE);

        let events = self.read_statement(PREPARED_EXPECTED, constants::CTX_PREPARED_EXECUTE)?;
        if matches!(events.back(), Some(StreamEvent::Suspended)) {
            // later fetches carry rows only
            let mut columns: Vec<Column> = events
                .iter()
                .rev()
                .take_while(|event| !matches!(event, StreamEvent::ResultSetEnd { .. }))
                .filter_map(|event| match event {
                    StreamEvent::Column(column) => Some(column.clone()),
                    _ => None,
                })
                .collect();
            columns.reverse();
            self.cursor_columns.insert(cursor_id, columns);
        }
        QueryResult::buffered(events)
    }

    /// Fetches up to `rows` rows (all when `None`) from an open cursor.
    #[instrument(skip(self))]
    pub fn fetch(&mut self, cursor_id: u32, rows: Option<u64>) -> Result<CursorBatch> {
        let channel = self.ready_channel("fetch")?;
        let request = ClientMessage::CursorFetch(CursorFetch {
            cursor_id,
            fetch_rows: rows,
        });
        if let Err(e) = channel.write(&request) {
            return Err(self.fail(e));
        }
        self.begin_reply(constants::CTX_CURSOR_FETCH);

        let mut columns = Vec::new();
        let mut raw_rows = Vec::new();
        let status = loop {
            match self.next_event_in(FETCH_EXPECTED, constants::CTX_CURSOR_FETCH)? {
                StreamEvent::Column(column) => columns.push(column),
                StreamEvent::Row(fields) => raw_rows.push(fields),
                StreamEvent::ResultSetEnd { more: false } => break FetchStatus::Done,
                StreamEvent::ResultSetEnd { more: true } => break FetchStatus::MoreResultsets,
                StreamEvent::Suspended => break FetchStatus::Suspended,
                StreamEvent::StatementOk(_) => break FetchStatus::Done,
            }
        };

        if !columns.is_empty() {
            self.cursor_columns.insert(cursor_id, columns);
        }
        let columns = self.cursor_columns.get(&cursor_id).cloned().unwrap_or_default();
        let mut rows = Vec::with_capacity(raw_rows.len());
        for fields in &raw_rows {
            match result::decode_row(&columns, fields) {
                Ok(row) => rows.push(row),
                Err(e) => return Err(self.fail(e.into())),
            }
        }
        if matches!(status, FetchStatus::MoreResultsets) {
            // the next result set announces its own columns
            self.cursor_columns.remove(&cursor_id);
        }

        Ok(CursorBatch {
            columns,
            rows,
            status,
        })
    }

    /// Closes a cursor opened by [`Session::execute_prepared`].
    pub fn close_cursor(&mut self, cursor_id: u32) -> Result<()> {
        let message = ClientMessage::CursorClose(CursorClose { cursor_id });
        self.round_trip(
            "close_cursor",
            &message,
            &[ServerTag::CursorCloseOk],
            constants::CTX_CURSOR_CLOSE,
        )?;
        self.cursor_columns.remove(&cursor_id);
        Ok(())
    }

    /// Asks which of `cursor_ids` have rows ready.
    pub fn poll_cursors(&mut self, cursor_ids: &[u32]) -> Result<Vec<u32>> {
        let message = ClientMessage::CursorsPoll(CursorsPoll {
            cursor_id: cursor_ids.to_vec(),
        });
        match self.round_trip(
            "poll_cursors",
            &message,
            &[ServerTag::CursorsPoll],
            constants::CTX_CURSORS_POLL,
        )? {
            ServerMessage::CursorsPoll(ready) => Ok(ready.cursor_id),
            other => Err(self.fail(Error::UnexpectedResponse {
                received_tag: other.tag() as u8,
                context: constants::CTX_CURSORS_POLL.to_string(),
            })),
        }
    }

    /// Resets server-side session state, keeping the connection.
    #[instrument(skip(self))]
    pub fn reset(&mut self) -> Result<()> {
        let message = ClientMessage::SessReset(SessionReset {});
        self.round_trip("reset", &message, &[ServerTag::Ok], constants::CTX_SESSION_RESET)?;
        self.cursor_columns.clear();
        self.next_statement_id = 1;
        Ok(())
    }

    // ========================================================================
    // Lifecycle and accessors
    // ========================================================================

    /// Closes the session. Safe to call any number of times.
    ///
    /// A ready session tells the server it is leaving first; failures doing
    /// so are ignored.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if self.state == SessionState::Ready {
            if let Some(channel) = self.channel.as_mut() {
                if let Err(e) = channel.write(&ClientMessage::ConnClose(ConnectionClose {})) {
                    debug!(error = %e, "close notification not delivered");
                }
            }
        }
        self.shutdown();
        info!(endpoint = %self.endpoint, "session closed");
        self.metrics.log_metrics();
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Ready
            && self.channel.as_ref().is_some_and(Channel::is_open)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn server_version(&self) -> Option<&Version> {
        self.server_version.as_ref()
    }

    /// Negotiated TLS cipher suite, if the connection is encrypted.
    pub fn cipher(&self) -> Option<&str> {
        self.cipher.as_deref()
    }

    /// Capabilities reported by the server during the handshake.
    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.capabilities.as_ref()
    }

    /// Notices collected so far, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn take_parameter_changes(&mut self) -> Vec<ParameterChanged> {
        std::mem::take(&mut self.parameter_changes)
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("server_version", &self.server_version)
            .field("cipher", &self.cipher)
            .finish()
    }
}

#[cfg(test)]
mod tests;
