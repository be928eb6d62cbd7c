//! Message catalog.
//!
//! Every frame carries a one-byte type tag. Server and client tags are
//! separate numbering spaces, so the same byte means different things
//! depending on direction.

use std::fmt;

use crate::error::ProtocolError;
use crate::protocol::schema;

/// Type tags of frames sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServerTag {
    Ok = 0,
    Error = 1,
    Notice = 2,
    ParamChange = 3,
    Capabilities = 4,
    AuthContinue = 5,
    AuthOk = 6,
    AuthFail = 7,
    PrepStmtOk = 8,
    PrepStmtExecOk = 9,
    ColumnMeta = 10,
    Row = 11,
    CursorFetchDone = 12,
    CursorFetchSuspended = 13,
    CursorsPoll = 14,
    CursorCloseOk = 15,
    CursorFetchDoneMoreResultsets = 16,
}

impl ServerTag {
    pub const ALL: [ServerTag; 17] = [
        ServerTag::Ok,
        ServerTag::Error,
        ServerTag::Notice,
        ServerTag::ParamChange,
        ServerTag::Capabilities,
        ServerTag::AuthContinue,
        ServerTag::AuthOk,
        ServerTag::AuthFail,
        ServerTag::PrepStmtOk,
        ServerTag::PrepStmtExecOk,
        ServerTag::ColumnMeta,
        ServerTag::Row,
        ServerTag::CursorFetchDone,
        ServerTag::CursorFetchSuspended,
        ServerTag::CursorsPoll,
        ServerTag::CursorCloseOk,
        ServerTag::CursorFetchDoneMoreResultsets,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ServerTag::Ok => "OK",
            ServerTag::Error => "ERROR",
            ServerTag::Notice => "NOTICE",
            ServerTag::ParamChange => "PARAM_CHANGE",
            ServerTag::Capabilities => "CAPABILITIES",
            ServerTag::AuthContinue => "AUTH_CONTINUE",
            ServerTag::AuthOk => "AUTH_OK",
            ServerTag::AuthFail => "AUTH_FAIL",
            ServerTag::PrepStmtOk => "PREP_STMT_OK",
            ServerTag::PrepStmtExecOk => "PREP_STMT_EXEC_OK",
            ServerTag::ColumnMeta => "COLUMN_META",
            ServerTag::Row => "ROW",
            ServerTag::CursorFetchDone => "CURSOR_FETCH_DONE",
            ServerTag::CursorFetchSuspended => "CURSOR_FETCH_SUSPENDED",
            ServerTag::CursorsPoll => "CURSORS_POLL",
            ServerTag::CursorCloseOk => "CURSOR_CLOSE_OK",
            ServerTag::CursorFetchDoneMoreResultsets => "CURSOR_FETCH_DONE_MORE_RESULTSETS",
        }
    }
}

impl TryFrom<u8> for ServerTag {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, <ServerTag as TryFrom<u8>>::Error> {
        ServerTag::ALL
            .get(tag as usize)
            .copied()
            .ok_or(ProtocolError::UnknownType(tag))
    }
}

impl fmt::Display for ServerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as u8)
    }
}

/// Type tags of frames sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ClientTag {
    CapabilitiesGet = 1,
    CapabilitiesSet = 2,
    ConnClose = 3,
    AuthStart = 4,
    AuthContinue = 5,
    SessReset = 6,
    SessClose = 7,
    PrepareStmt = 8,
    PreparedStmtExecute = 9,
    CursorFetch = 10,
    CursorClose = 11,
    StmtExecute = 12,
    CursorsPoll = 13,
}

impl ClientTag {
    pub const ALL: [ClientTag; 13] = [
        ClientTag::CapabilitiesGet,
        ClientTag::CapabilitiesSet,
        ClientTag::ConnClose,
        ClientTag::AuthStart,
        ClientTag::AuthContinue,
        ClientTag::SessReset,
        ClientTag::SessClose,
        ClientTag::PrepareStmt,
        ClientTag::PreparedStmtExecute,
        ClientTag::CursorFetch,
        ClientTag::CursorClose,
        ClientTag::StmtExecute,
        ClientTag::CursorsPoll,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClientTag::CapabilitiesGet => "CAPABILITIES_GET",
            ClientTag::CapabilitiesSet => "CAPABILITIES_SET",
            ClientTag::ConnClose => "CONN_CLOSE",
            ClientTag::AuthStart => "AUTH_START",
            ClientTag::AuthContinue => "AUTH_CONTINUE",
            ClientTag::SessReset => "SESS_RESET",
            ClientTag::SessClose => "SESS_CLOSE",
            ClientTag::PrepareStmt => "PREPARE_STMT",
            ClientTag::PreparedStmtExecute => "PREPARED_STMT_EXECUTE",
            ClientTag::CursorFetch => "CURSOR_FETCH",
            ClientTag::CursorClose => "CURSOR_CLOSE",
            ClientTag::StmtExecute => "STMT_EXECUTE",
            ClientTag::CursorsPoll => "CURSORS_POLL",
        }
    }
}

impl TryFrom<u8> for ClientTag {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1..=13 => Ok(ClientTag::ALL[tag as usize - 1]),
            _ => Err(ProtocolError::UnknownType(tag)),
        }
    }
}

impl fmt::Display for ClientTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as u8)
    }
}

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Ok(schema::OkPayload),
    Error(schema::ErrorPayload),
    Notice(schema::Notice),
    ParamChange(schema::ParameterChanged),
    Capabilities(schema::Capabilities),
    AuthContinue(schema::AuthenticateContinue),
    AuthOk(schema::AuthenticateOk),
    AuthFail(schema::AuthenticateFail),
    PrepStmtOk(schema::PrepareStmtOk),
    PrepStmtExecOk(schema::PreparedStmtExecuteOk),
    ColumnMeta(schema::ColumnMetaData),
    Row(schema::Row),
    CursorFetchDone(schema::CursorFetchDone),
    CursorFetchSuspended(schema::CursorFetchSuspended),
    CursorsPoll(schema::CursorsPoll),
    CursorCloseOk(schema::CursorCloseOk),
    CursorFetchDoneMoreResultsets(schema::CursorFetchDoneMoreResultsets),
}

impl ServerMessage {
    pub fn tag(&self) -> ServerTag {
        match self {
            ServerMessage::Ok(_) => ServerTag::Ok,
            ServerMessage::Error(_) => ServerTag::Error,
            ServerMessage::Notice(_) => ServerTag::Notice,
            ServerMessage::ParamChange(_) => ServerTag::ParamChange,
            ServerMessage::Capabilities(_) => ServerTag::Capabilities,
            ServerMessage::AuthContinue(_) => ServerTag::AuthContinue,
            ServerMessage::AuthOk(_) => ServerTag::AuthOk,
            ServerMessage::AuthFail(_) => ServerTag::AuthFail,
            ServerMessage::PrepStmtOk(_) => ServerTag::PrepStmtOk,
            ServerMessage::PrepStmtExecOk(_) => ServerTag::PrepStmtExecOk,
            ServerMessage::ColumnMeta(_) => ServerTag::ColumnMeta,
            ServerMessage::Row(_) => ServerTag::Row,
            ServerMessage::CursorFetchDone(_) => ServerTag::CursorFetchDone,
            ServerMessage::CursorFetchSuspended(_) => ServerTag::CursorFetchSuspended,
            ServerMessage::CursorsPoll(_) => ServerTag::CursorsPoll,
            ServerMessage::CursorCloseOk(_) => ServerTag::CursorCloseOk,
            ServerMessage::CursorFetchDoneMoreResultsets(_) => {
                ServerTag::CursorFetchDoneMoreResultsets
            }
        }
    }

    /// An `ERROR` message with the given code and SQL state.
    pub fn error(code: u32, sql_state: &str, msg: &str) -> Self {
        ServerMessage::Error(schema::ErrorPayload {
            severity: schema::Severity::Error as i32,
            code,
            msg: msg.to_string(),
            sql_state: sql_state.to_string(),
        })
    }

    pub fn ok() -> Self {
        ServerMessage::Ok(schema::OkPayload::default())
    }
}

/// A client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    CapabilitiesGet(schema::CapabilitiesGet),
    CapabilitiesSet(schema::CapabilitiesSet),
    ConnClose(schema::ConnectionClose),
    AuthStart(schema::AuthenticateStart),
    AuthContinue(schema::AuthenticateContinue),
    SessReset(schema::SessionReset),
    SessClose(schema::SessionClose),
    PrepareStmt(schema::PrepareStmt),
    PreparedStmtExecute(schema::PreparedStmtExecute),
    CursorFetch(schema::CursorFetch),
    CursorClose(schema::CursorClose),
    StmtExecute(schema::StmtExecute),
    CursorsPoll(schema::CursorsPoll),
}

impl ClientMessage {
    pub fn tag(&self) -> ClientTag {
        match self {
            ClientMessage::CapabilitiesGet(_) => ClientTag::CapabilitiesGet,
            ClientMessage::CapabilitiesSet(_) => ClientTag::CapabilitiesSet,
            ClientMessage::ConnClose(_) => ClientTag::ConnClose,
            ClientMessage::AuthStart(_) => ClientTag::AuthStart,
            ClientMessage::AuthContinue(_) => ClientTag::AuthContinue,
            ClientMessage::SessReset(_) => ClientTag::SessReset,
            ClientMessage::SessClose(_) => ClientTag::SessClose,
            ClientMessage::PrepareStmt(_) => ClientTag::PrepareStmt,
            ClientMessage::PreparedStmtExecute(_) => ClientTag::PreparedStmtExecute,
            ClientMessage::CursorFetch(_) => ClientTag::CursorFetch,
            ClientMessage::CursorClose(_) => ClientTag::CursorClose,
            ClientMessage::StmtExecute(_) => ClientTag::StmtExecute,
            ClientMessage::CursorsPoll(_) => ClientTag::CursorsPoll,
        }
    }

    /// A plain SQL statement with no arguments.
    pub fn sql(stmt: &str) -> Self {
        ClientMessage::StmtExecute(schema::StmtExecute {
            stmt: stmt.as_bytes().to_vec(),
            args: Vec::new(),
            namespace: Some("sql".to_string()),
            compact_metadata: None,
        })
    }
}
