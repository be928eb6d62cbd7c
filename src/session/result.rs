//! Statement results.
//!
//! The reply to a statement is a stream of events: column metadata, rows, a
//! terminator per result set and, for statements without a result set, an
//! execution-ok carrying counts. A [`QueryResult`] consumes that stream either
//! from a buffer filled up front or lazily from the session.

use std::collections::VecDeque;

use prost::encoding::decode_varint;
use tracing::{debug, warn};

use crate::error::{constants, Error, ProtocolError, Result};
use crate::protocol::message::ServerTag;
use crate::protocol::schema::{ColumnMetaData, ColumnType, PreparedStmtExecuteOk};
use crate::session::Session;

/// Description of one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub original_name: String,
    pub table: String,
    pub schema: String,
    pub column_type: ColumnType,
    pub collation: Option<u64>,
    pub length: Option<u32>,
    pub fractional_digits: Option<u32>,
    pub flags: u32,
}

fn text(bytes: Option<Vec<u8>>) -> String {
    bytes
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default()
}

impl TryFrom<ColumnMetaData> for Column {
    type Error = ProtocolError;

    fn try_from(meta: ColumnMetaData) -> std::result::Result<Self, Self::Error> {
        let column_type = ColumnType::try_from(meta.r#type).map_err(|_| {
            debug!(column_type = meta.r#type, "unknown column type");
            ProtocolError::Malformed(ServerTag::ColumnMeta as u8)
        })?;
        Ok(Column {
            name: text(meta.name),
            original_name: text(meta.original_name),
            table: text(meta.table),
            schema: text(meta.schema),
            column_type,
            collation: meta.collation,
            length: meta.length,
            fractional_digits: meta.fractional_digits,
            flags: meta.flags.unwrap_or(0),
        })
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Signed(i64),
    Unsigned(u64),
    Double(f64),
    Float(f32),
    Bytes(Vec<u8>),
    /// Types passed through undecoded (decimal, time, datetime, set).
    Raw(Vec<u8>),
}

impl Value {
    /// Decodes one row field according to its column type.
    ///
    /// An empty field is `NULL`. Byte strings carry a trailing `0x00` that
    /// is stripped.
    pub fn decode(column_type: ColumnType, field: &[u8]) -> std::result::Result<Self, ProtocolError> {
        if field.is_empty() {
            return Ok(Value::Null);
        }
        let malformed = ProtocolError::Malformed(ServerTag::Row as u8);

        let value = match column_type {
            ColumnType::Sint => {
                let raw = varint(field).ok_or(malformed)?;
                Value::Signed(((raw >> 1) as i64) ^ -((raw & 1) as i64))
            }
            ColumnType::Uint | ColumnType::Bit => Value::Unsigned(varint(field).ok_or(malformed)?),
            ColumnType::Double => {
                let bytes: [u8; 8] = field.try_into().map_err(|_| malformed)?;
                Value::Double(f64::from_le_bytes(bytes))
            }
            ColumnType::Float => {
                let bytes: [u8; 4] = field.try_into().map_err(|_| malformed)?;
                Value::Float(f32::from_le_bytes(bytes))
            }
            ColumnType::Bytes | ColumnType::Enum => {
                Value::Bytes(field[..field.len() - 1].to_vec())
            }
            ColumnType::Time | ColumnType::Datetime | ColumnType::Set | ColumnType::Decimal => {
                Value::Raw(field.to_vec())
            }
        };
        Ok(value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// UTF-8 view of a byte string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Signed(v) => Some(v),
            Value::Unsigned(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Unsigned(v) => Some(v),
            Value::Signed(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }
}

/// Reads a varint that must span the whole field.
fn varint(field: &[u8]) -> Option<u64> {
    let mut rest = field;
    let value = decode_varint(&mut rest).ok()?;
    rest.is_empty().then_some(value)
}

/// Decodes a whole row against its columns.
pub fn decode_row(columns: &[Column], fields: &[Vec<u8>]) -> std::result::Result<Vec<Value>, ProtocolError> {
    if columns.len() != fields.len() {
        debug!(
            columns = columns.len(),
            fields = fields.len(),
            "row width does not match column metadata"
        );
        return Err(ProtocolError::Malformed(ServerTag::Row as u8));
    }
    columns
        .iter()
        .zip(fields)
        .map(|(column, field)| Value::decode(column.column_type, field))
        .collect()
}

/// Counts reported when a statement completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    pub last_insert_id: Option<u64>,
}

impl From<PreparedStmtExecuteOk> for ExecOutcome {
    fn from(ok: PreparedStmtExecuteOk) -> Self {
        Self {
            rows_affected: ok.rows_affected.unwrap_or(0),
            last_insert_id: ok.last_insert_id,
        }
    }
}

/// One step of a statement's response stream, with notices already removed.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Column(Column),
    Row(Vec<Vec<u8>>),
    /// End of a result set; `more` when another one follows.
    ResultSetEnd { more: bool },
    /// Statement finished without (further) result sets.
    StatementOk(ExecOutcome),
    /// A cursor stopped at its row limit; the rest is fetched separately.
    Suspended,
}

impl StreamEvent {
    /// Whether nothing of the statement follows this event.
    pub fn ends_statement(&self) -> bool {
        matches!(
            self,
            StreamEvent::ResultSetEnd { more: false }
                | StreamEvent::StatementOk(_)
                | StreamEvent::Suspended
        )
    }
}

enum EventSource<'s> {
    Buffered(VecDeque<StreamEvent>),
    Streaming(&'s mut Session),
}

/// Rows of a statement, one result set at a time.
///
/// A streaming result borrows its session until it is exhausted or dropped;
/// dropping it early reads and discards the rest of the stream.
pub struct QueryResult<'s> {
    source: EventSource<'s>,
    columns: Vec<Column>,
    peeked: Option<StreamEvent>,
    set_done: bool,
    more: bool,
    finished: bool,
    suspended: bool,
    outcome: ExecOutcome,
}

impl<'s> QueryResult<'s> {
    pub(crate) fn buffered(events: VecDeque<StreamEvent>) -> Result<Self> {
        Self::start(EventSource::Buffered(events))
    }

    pub(crate) fn streaming(session: &'s mut Session) -> Result<Self> {
        Self::start(EventSource::Streaming(session))
    }

    fn start(source: EventSource<'s>) -> Result<Self> {
        let mut result = Self {
            source,
            columns: Vec::new(),
            peeked: None,
            set_done: false,
            more: false,
            finished: false,
            suspended: false,
            outcome: ExecOutcome::default(),
        };
        result.load_columns()?;
        Ok(result)
    }

    fn next_event(&mut self) -> Result<StreamEvent> {
        if let Some(event) = self.peeked.take() {
            return Ok(event);
        }
        let event = match &mut self.source {
            EventSource::Buffered(events) => events.pop_front().ok_or_else(|| {
                Error::Protocol(ProtocolError::Malformed(ServerTag::CursorFetchDone as u8))
            }),
            EventSource::Streaming(session) => session.next_stream_event(),
        };
        if event.is_err() {
            self.finished = true;
            self.set_done = true;
        }
        event
    }

    /// Reads the column metadata heading the current result set.
    fn load_columns(&mut self) -> Result<()> {
        self.columns.clear();
        loop {
            match self.next_event()? {
                StreamEvent::Column(column) => self.columns.push(column),
                other => {
                    self.peeked = Some(other);
                    return Ok(());
                }
            }
        }
    }

    /// Columns of the current result set; empty for statements without one.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Next row of the current result set, or `None` at its end.
    pub fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        if self.set_done {
            return Ok(None);
        }
        match self.next_event()? {
            StreamEvent::Row(fields) => match decode_row(&self.columns, &fields) {
                Ok(row) => Ok(Some(row)),
                Err(e) => Err(self.abort(e.into())),
            },
            StreamEvent::ResultSetEnd { more } => {
                self.set_done = true;
                self.more = more;
                self.finished = !more;
                Ok(None)
            }
            StreamEvent::StatementOk(outcome) => {
                self.outcome = outcome;
                self.set_done = true;
                self.finished = true;
                Ok(None)
            }
            StreamEvent::Column(_) => Err(self.abort(Error::UnexpectedResponse {
                received_tag: ServerTag::ColumnMeta as u8,
                context: constants::CTX_RESULT_STREAM.to_string(),
            })),
            StreamEvent::Suspended => {
                self.set_done = true;
                self.finished = true;
                self.suspended = true;
                Ok(None)
            }
        }
    }

    /// All remaining rows of the current result set.
    pub fn rows(&mut self) -> Result<Vec<Vec<Value>>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Skips the rest of the current result set and moves to the next one.
    ///
    /// Returns `false` once the statement has no further result sets.
    pub fn next_result_set(&mut self) -> Result<bool> {
        while self.next_row()?.is_some() {}
        if self.finished || !self.more {
            return Ok(false);
        }
        self.set_done = false;
        self.more = false;
        self.load_columns()?;
        Ok(true)
    }

    /// Consumes everything left of the statement.
    pub fn drain(&mut self) -> Result<()> {
        while self.next_result_set()? {}
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the rows stopped at a cursor's limit rather than at the end.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Rows affected, known once the statement has finished.
    pub fn rows_affected(&self) -> u64 {
        self.outcome.rows_affected
    }

    pub fn last_insert_id(&self) -> Option<u64> {
        self.outcome.last_insert_id
    }

    pub fn outcome(&self) -> ExecOutcome {
        self.outcome
    }

    fn abort(&mut self, err: Error) -> Error {
        self.finished = true;
        self.set_done = true;
        if let EventSource::Streaming(session) = &mut self.source {
            // the stream position is unknown now, the connection cannot be reused
            return session.abandon(err);
        }
        err
    }
}

impl Drop for QueryResult<'_> {
    fn drop(&mut self) {
        if self.finished || !matches!(self.source, EventSource::Streaming(_)) {
            return;
        }
        if let Err(e) = self.drain() {
            warn!(error = %e, "failed to drain abandoned result stream");
        }
    }
}

impl std::fmt::Debug for QueryResult<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResult")
            .field(
                "buffered",
                &matches!(self.source, EventSource::Buffered(_)),
            )
            .field("columns", &self.columns.len())
            .field("finished", &self.finished)
            .finish()
    }
}
