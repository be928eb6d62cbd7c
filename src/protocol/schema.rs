//! Payload schemas.
//!
//! Each frame payload is a protobuf message. Field numbers follow the X
//! protocol definitions, but the frame type tags come from this crate's own
//! catalog in [`super::message`], so frames are not wire-compatible with a
//! stock server.

use prost::{Enumeration, Message};

// ============================================================================
// Shared value types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum ScalarType {
    VSint = 1,
    VUint = 2,
    VNull = 3,
    VOctets = 4,
    VDouble = 5,
    VFloat = 6,
    VBool = 7,
    VString = 8,
}

#[derive(Clone, PartialEq, Message)]
pub struct Octets {
    #[prost(bytes = "vec", tag = "1")]
    pub value: Vec<u8>,
    #[prost(uint32, optional, tag = "2")]
    pub content_type: Option<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ScalarString {
    #[prost(bytes = "vec", tag = "1")]
    pub value: Vec<u8>,
    #[prost(uint64, optional, tag = "2")]
    pub collation: Option<u64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Scalar {
    #[prost(enumeration = "ScalarType", tag = "1")]
    pub r#type: i32,
    #[prost(sint64, optional, tag = "2")]
    pub v_signed_int: Option<i64>,
    #[prost(uint64, optional, tag = "3")]
    pub v_unsigned_int: Option<u64>,
    #[prost(message, optional, tag = "5")]
    pub v_octets: Option<Octets>,
    #[prost(double, optional, tag = "6")]
    pub v_double: Option<f64>,
    #[prost(float, optional, tag = "7")]
    pub v_float: Option<f32>,
    #[prost(bool, optional, tag = "8")]
    pub v_bool: Option<bool>,
    #[prost(message, optional, tag = "9")]
    pub v_string: Option<ScalarString>,
}

impl Scalar {
    pub fn null() -> Self {
        Self {
            r#type: ScalarType::VNull as i32,
            ..Default::default()
        }
    }

    pub fn bool(value: bool) -> Self {
        Self {
            r#type: ScalarType::VBool as i32,
            v_bool: Some(value),
            ..Default::default()
        }
    }

    pub fn signed(value: i64) -> Self {
        Self {
            r#type: ScalarType::VSint as i32,
            v_signed_int: Some(value),
            ..Default::default()
        }
    }

    pub fn unsigned(value: u64) -> Self {
        Self {
            r#type: ScalarType::VUint as i32,
            v_unsigned_int: Some(value),
            ..Default::default()
        }
    }

    pub fn double(value: f64) -> Self {
        Self {
            r#type: ScalarType::VDouble as i32,
            v_double: Some(value),
            ..Default::default()
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            r#type: ScalarType::VString as i32,
            v_string: Some(ScalarString {
                value: value.into().into_bytes(),
                collation: None,
            }),
            ..Default::default()
        }
    }

    pub fn octets(value: impl Into<Vec<u8>>) -> Self {
        Self {
            r#type: ScalarType::VOctets as i32,
            v_octets: Some(Octets {
                value: value.into(),
                content_type: None,
            }),
            ..Default::default()
        }
    }

    /// Text content of string and octet scalars.
    pub fn as_str(&self) -> Option<&str> {
        match ScalarType::try_from(self.r#type).ok()? {
            ScalarType::VString => self
                .v_string
                .as_ref()
                .and_then(|s| std::str::from_utf8(&s.value).ok()),
            ScalarType::VOctets => self
                .v_octets
                .as_ref()
                .and_then(|o| std::str::from_utf8(&o.value).ok()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match ScalarType::try_from(self.r#type).ok()? {
            ScalarType::VBool => self.v_bool,
            ScalarType::VSint => self.v_signed_int.map(|v| v != 0),
            ScalarType::VUint => self.v_unsigned_int.map(|v| v != 0),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum AnyType {
    Scalar = 1,
    Object = 2,
    Array = 3,
}

#[derive(Clone, PartialEq, Message)]
pub struct AnyArray {
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<Any>,
}

/// Scalar or array value, used for capabilities and statement arguments.
#[derive(Clone, PartialEq, Message)]
pub struct Any {
    #[prost(enumeration = "AnyType", tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub scalar: Option<Scalar>,
    #[prost(message, optional, tag = "4")]
    pub array: Option<AnyArray>,
}

impl Any {
    pub fn scalar(value: Scalar) -> Self {
        Self {
            r#type: AnyType::Scalar as i32,
            scalar: Some(value),
            array: None,
        }
    }

    pub fn array(values: Vec<Any>) -> Self {
        Self {
            r#type: AnyType::Array as i32,
            scalar: None,
            array: Some(AnyArray { value: values }),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        self.scalar.as_ref()
    }

    /// Elements of an array value, or the value itself for a scalar.
    pub fn elements(&self) -> Vec<&Any> {
        match &self.array {
            Some(array) => array.value.iter().collect(),
            None => vec![self],
        }
    }
}

// ============================================================================
// Generic responses
// ============================================================================

#[derive(Clone, PartialEq, Message)]
pub struct OkPayload {
    #[prost(string, optional, tag = "1")]
    pub msg: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum Severity {
    Error = 0,
    Fatal = 1,
}

#[derive(Clone, PartialEq, Message)]
pub struct ErrorPayload {
    #[prost(enumeration = "Severity", tag = "1")]
    pub severity: i32,
    #[prost(uint32, tag = "2")]
    pub code: u32,
    #[prost(string, tag = "3")]
    pub msg: String,
    #[prost(string, tag = "4")]
    pub sql_state: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum NoticeScope {
    Global = 1,
    Local = 2,
}

#[derive(Clone, PartialEq, Message)]
pub struct Notice {
    #[prost(uint32, tag = "1")]
    pub r#type: u32,
    #[prost(enumeration = "NoticeScope", tag = "2")]
    pub scope: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ParameterChanged {
    #[prost(string, tag = "1")]
    pub param: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<Scalar>,
}

// ============================================================================
// Connection
// ============================================================================

#[derive(Clone, PartialEq, Message)]
pub struct Capability {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<Any>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Capabilities {
    #[prost(message, repeated, tag = "1")]
    pub capabilities: Vec<Capability>,
}

impl Capabilities {
    pub fn get(&self, name: &str) -> Option<&Any> {
        self.capabilities
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.value.as_ref())
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct CapabilitiesGet {}

#[derive(Clone, PartialEq, Message)]
pub struct CapabilitiesSet {
    #[prost(message, optional, tag = "1")]
    pub capabilities: Option<Capabilities>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ConnectionClose {}

// ============================================================================
// Session
// ============================================================================

#[derive(Clone, PartialEq, Message)]
pub struct AuthenticateStart {
    #[prost(string, tag = "1")]
    pub mech_name: String,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub auth_data: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub initial_response: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AuthenticateContinue {
    #[prost(bytes = "vec", tag = "1")]
    pub auth_data: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AuthenticateOk {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub auth_data: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AuthenticateFail {
    #[prost(string, tag = "1")]
    pub msg: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct SessionReset {}

#[derive(Clone, PartialEq, Message)]
pub struct SessionClose {}

// ============================================================================
// Statements and result sets
// ============================================================================

#[derive(Clone, PartialEq, Message)]
pub struct StmtExecute {
    #[prost(bytes = "vec", tag = "1")]
    pub stmt: Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub args: Vec<Any>,
    #[prost(string, optional, tag = "3")]
    pub namespace: Option<String>,
    #[prost(bool, optional, tag = "4")]
    pub compact_metadata: Option<bool>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PrepareStmt {
    #[prost(uint32, tag = "1")]
    pub stmt_id: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub stmt: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PrepareStmtOk {}

#[derive(Clone, PartialEq, Message)]
pub struct PreparedStmtExecute {
    #[prost(uint32, tag = "1")]
    pub stmt_id: u32,
    #[prost(uint32, tag = "2")]
    pub cursor_id: u32,
    #[prost(message, repeated, tag = "3")]
    pub args: Vec<Any>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PreparedStmtExecuteOk {
    #[prost(uint64, optional, tag = "1")]
    pub rows_affected: Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    pub last_insert_id: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum ColumnType {
    Sint = 1,
    Uint = 2,
    Double = 5,
    Float = 6,
    Bytes = 7,
    Time = 10,
    Datetime = 12,
    Set = 15,
    Enum = 16,
    Bit = 17,
    Decimal = 18,
}

#[derive(Clone, PartialEq, Message)]
pub struct ColumnMetaData {
    #[prost(enumeration = "ColumnType", tag = "1")]
    pub r#type: i32,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub name: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub original_name: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub table: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub original_table: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "6")]
    pub schema: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "7")]
    pub catalog: Option<Vec<u8>>,
    #[prost(uint64, optional, tag = "8")]
    pub collation: Option<u64>,
    #[prost(uint32, optional, tag = "9")]
    pub fractional_digits: Option<u32>,
    #[prost(uint32, optional, tag = "10")]
    pub length: Option<u32>,
    #[prost(uint32, optional, tag = "11")]
    pub flags: Option<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Row {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub field: Vec<Vec<u8>>,
}

// ============================================================================
// Cursors
// ============================================================================

#[derive(Clone, PartialEq, Message)]
pub struct CursorFetch {
    #[prost(uint32, tag = "1")]
    pub cursor_id: u32,
    #[prost(uint64, optional, tag = "2")]
    pub fetch_rows: Option<u64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CursorFetchDone {}

#[derive(Clone, PartialEq, Message)]
pub struct CursorFetchSuspended {}

#[derive(Clone, PartialEq, Message)]
pub struct CursorFetchDoneMoreResultsets {}

/// Cursor ids: the ones asked about in a request, the ready ones in a reply.
#[derive(Clone, PartialEq, Message)]
pub struct CursorsPoll {
    #[prost(uint32, repeated, tag = "1")]
    pub cursor_id: Vec<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CursorClose {
    #[prost(uint32, tag = "1")]
    pub cursor_id: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct CursorCloseOk {}
