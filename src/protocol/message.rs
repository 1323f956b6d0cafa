//! Payload schema of every client and server message kind
//!
//! Each message borrows from the buffer it was decoded from and is dropped
//! once the dispatcher has handed it to a processor.

use crate::constant::{ClientMessageType, ServerMessageType};
use crate::error::{Error, Result};
use crate::protocol::datatypes::Any;
use crate::protocol::notice::NoticeFrame;
use crate::protocol::primitive::*;

/// A message kind with a fixed type tag and a protobuf payload
pub trait Message<'a>: Sized {
    const TYPE: u8;

    fn write_payload(&self, out: &mut Vec<u8>);

    fn read_payload(payload: &'a [u8]) -> Result<Self>;
}

macro_rules! empty_message {
    ($(#[$meta:meta])* $name:ident = $tag:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name;

        impl<'a> Message<'a> for $name {
            const TYPE: u8 = $tag as u8;

            fn write_payload(&self, _out: &mut Vec<u8>) {}

            fn read_payload(_payload: &'a [u8]) -> Result<Self> {
                Ok(Self)
            }
        }
    };
}

// ============================================================================
// Client messages
// ============================================================================

empty_message!(CapabilitiesGet = ClientMessageType::CapabilitiesGet);
empty_message!(
    /// Ends the connection; the server answers with `Ok`
    Close = ClientMessageType::Close
);
empty_message!(SessionReset = ClientMessageType::SessionReset);
empty_message!(SessionClose = ClientMessageType::SessionClose);

/// `Connection.CapabilitiesSet`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CapabilitiesSet<'a> {
    pub capabilities: Vec<(&'a str, Any<'a>)>,
}

impl<'a> Message<'a> for CapabilitiesSet<'a> {
    const TYPE: u8 = ClientMessageType::CapabilitiesSet as u8;

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_message_field(out, 1, |o| write_capabilities(o, &self.capabilities));
    }

    fn read_payload(payload: &'a [u8]) -> Result<Self> {
        let mut capabilities = Vec::new();
        for field in Fields::new(payload) {
            let (number, value) = field?;
            if number == 1 {
                capabilities = read_capabilities(value.as_bytes()?)?;
            }
        }
        Ok(Self { capabilities })
    }
}

/// `Session.AuthenticateStart`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthenticateStart<'a> {
    pub mech_name: &'a str,
    pub auth_data: &'a [u8],
    pub initial_response: &'a [u8],
}

impl<'a> Message<'a> for AuthenticateStart<'a> {
    const TYPE: u8 = ClientMessageType::AuthenticateStart as u8;

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_string_field(out, 1, self.mech_name);
        if !self.auth_data.is_empty() {
            write_bytes_field(out, 2, self.auth_data);
        }
        if !self.initial_response.is_empty() {
            write_bytes_field(out, 3, self.initial_response);
        }
    }

    fn read_payload(payload: &'a [u8]) -> Result<Self> {
        let mut msg = Self::default();
        for field in Fields::new(payload) {
            match field? {
                (1, v) => msg.mech_name = v.as_str()?,
                (2, v) => msg.auth_data = v.as_bytes()?,
                (3, v) => msg.initial_response = v.as_bytes()?,
                _ => {}
            }
        }
        Ok(msg)
    }
}

/// Client side of `Session.AuthenticateContinue`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthenticateContinue<'a> {
    pub auth_data: &'a [u8],
}

impl<'a> Message<'a> for AuthenticateContinue<'a> {
    const TYPE: u8 = ClientMessageType::AuthenticateContinue as u8;

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_bytes_field(out, 1, self.auth_data);
    }

    fn read_payload(payload: &'a [u8]) -> Result<Self> {
        Ok(Self {
            auth_data: read_auth_data(payload)?,
        })
    }
}

/// `Sql.StmtExecute`
#[derive(Debug, Clone, PartialEq)]
pub struct StmtExecute<'a> {
    pub namespace: &'a str,
    pub stmt: &'a [u8],
    pub args: Vec<Any<'a>>,
    pub compact_metadata: bool,
}

impl<'a> StmtExecute<'a> {
    /// A plain SQL statement in the `sql` namespace
    pub fn sql(stmt: &'a str) -> Self {
        Self {
            namespace: "sql",
            stmt: stmt.as_bytes(),
            args: Vec::new(),
            compact_metadata: false,
        }
    }

    pub fn with_args(mut self, args: Vec<Any<'a>>) -> Self {
        self.args = args;
        self
    }
}

impl<'a> Message<'a> for StmtExecute<'a> {
    const TYPE: u8 = ClientMessageType::StmtExecute as u8;

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_bytes_field(out, 1, self.stmt);
        for arg in &self.args {
            write_message_field(out, 2, |o| arg.write(o));
        }
        if self.namespace != "sql" {
            write_string_field(out, 3, self.namespace);
        }
        if self.compact_metadata {
            write_bool_field(out, 4, true);
        }
    }

    fn read_payload(payload: &'a [u8]) -> Result<Self> {
        let mut msg = Self::sql("");
        for field in Fields::new(payload) {
            match field? {
                (1, v) => msg.stmt = v.as_bytes()?,
                (2, v) => msg.args.push(Any::read(v.as_bytes()?)?),
                (3, v) => msg.namespace = v.as_str()?,
                (4, v) => msg.compact_metadata = v.as_bool()?,
                _ => {}
            }
        }
        Ok(msg)
    }
}

// ============================================================================
// Server messages
// ============================================================================

empty_message!(FetchDone = ServerMessageType::FetchDone);
empty_message!(FetchSuspended = ServerMessageType::FetchSuspended);
empty_message!(FetchDoneMoreResultsets = ServerMessageType::FetchDoneMoreResultsets);
empty_message!(FetchDoneMoreOutParams = ServerMessageType::FetchDoneMoreOutParams);
empty_message!(
    /// Final message of a statement reply
    StmtExecuteOk = ServerMessageType::StmtExecuteOk
);

/// `Mysqlx.Ok`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OkMsg<'a> {
    pub msg: &'a str,
}

impl<'a> Message<'a> for OkMsg<'a> {
    const TYPE: u8 = ServerMessageType::Ok as u8;

    fn write_payload(&self, out: &mut Vec<u8>) {
        if !self.msg.is_empty() {
            write_string_field(out, 1, self.msg);
        }
    }

    fn read_payload(payload: &'a [u8]) -> Result<Self> {
        let mut msg = Self::default();
        for field in Fields::new(payload) {
            if let (1, v) = field? {
                msg.msg = v.as_str()?;
            }
        }
        Ok(msg)
    }
}

/// `Mysqlx.Error`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorMsg<'a> {
    pub severity: u32,
    pub code: u32,
    pub sql_state: &'a str,
    pub msg: &'a str,
}

impl<'a> Message<'a> for ErrorMsg<'a> {
    const TYPE: u8 = ServerMessageType::Error as u8;

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_uint_field(out, 1, u64::from(self.severity));
        write_uint_field(out, 2, u64::from(self.code));
        write_string_field(out, 3, self.msg);
        write_string_field(out, 4, self.sql_state);
    }

    fn read_payload(payload: &'a [u8]) -> Result<Self> {
        let mut msg = Self::default();
        for field in Fields::new(payload) {
            match field? {
                (1, v) => msg.severity = v.as_u32()?,
                (2, v) => msg.code = v.as_u32()?,
                (3, v) => msg.msg = v.as_str()?,
                (4, v) => msg.sql_state = v.as_str()?,
                _ => {}
            }
        }
        Ok(msg)
    }
}

impl From<&ErrorMsg<'_>> for crate::error::ServerError {
    fn from(msg: &ErrorMsg<'_>) -> Self {
        Self::new(msg.code, msg.severity, msg.sql_state, msg.msg)
    }
}

/// `Connection.Capabilities`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Capabilities<'a> {
    pub capabilities: Vec<(&'a str, Any<'a>)>,
}

impl<'a> Capabilities<'a> {
    pub fn get(&self, name: &str) -> Option<&Any<'a>> {
        self.capabilities
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }
}

impl<'a> Message<'a> for Capabilities<'a> {
    const TYPE: u8 = ServerMessageType::Capabilities as u8;

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_capabilities(out, &self.capabilities);
    }

    fn read_payload(payload: &'a [u8]) -> Result<Self> {
        Ok(Self {
            capabilities: read_capabilities(payload)?,
        })
    }
}

/// Server side of `Session.AuthenticateContinue`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthenticateChallenge<'a> {
    pub auth_data: &'a [u8],
}

impl<'a> Message<'a> for AuthenticateChallenge<'a> {
    const TYPE: u8 = ServerMessageType::AuthenticateContinue as u8;

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_bytes_field(out, 1, self.auth_data);
    }

    fn read_payload(payload: &'a [u8]) -> Result<Self> {
        Ok(Self {
            auth_data: read_auth_data(payload)?,
        })
    }
}

/// `Session.AuthenticateOk`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthenticateOk<'a> {
    pub auth_data: &'a [u8],
}

impl<'a> Message<'a> for AuthenticateOk<'a> {
    const TYPE: u8 = ServerMessageType::AuthenticateOk as u8;

    fn write_payload(&self, out: &mut Vec<u8>) {
        if !self.auth_data.is_empty() {
            write_bytes_field(out, 1, self.auth_data);
        }
    }

    fn read_payload(payload: &'a [u8]) -> Result<Self> {
        Ok(Self {
            auth_data: read_auth_data(payload)?,
        })
    }
}

/// `Resultset.ColumnMetaData`
///
/// Text fields are kept as raw bytes; the server sends them in the column's
/// character set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMetaData<'a> {
    pub column_type: u32,
    pub name: &'a [u8],
    pub original_name: &'a [u8],
    pub table: &'a [u8],
    pub original_table: &'a [u8],
    pub schema: &'a [u8],
    pub catalog: &'a [u8],
    pub collation: u64,
    pub fractional_digits: u32,
    pub length: u32,
    pub flags: u32,
    pub content_type: u32,
}

impl<'a> Message<'a> for ColumnMetaData<'a> {
    const TYPE: u8 = ServerMessageType::ColumnMetaData as u8;

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_uint_field(out, 1, u64::from(self.column_type));
        let texts = [
            (2, self.name),
            (3, self.original_name),
            (4, self.table),
            (5, self.original_table),
            (6, self.schema),
            (7, self.catalog),
        ];
        for (number, text) in texts {
            if !text.is_empty() {
                write_bytes_field(out, number, text);
            }
        }
        if self.collation != 0 {
            write_uint_field(out, 8, self.collation);
        }
        if self.fractional_digits != 0 {
            write_uint_field(out, 9, u64::from(self.fractional_digits));
        }
        if self.length != 0 {
            write_uint_field(out, 10, u64::from(self.length));
        }
        if self.flags != 0 {
            write_uint_field(out, 11, u64::from(self.flags));
        }
        if self.content_type != 0 {
            write_uint_field(out, 12, u64::from(self.content_type));
        }
    }

    fn read_payload(payload: &'a [u8]) -> Result<Self> {
        let mut col = Self::default();
        for field in Fields::new(payload) {
            match field? {
                (1, v) => col.column_type = v.as_u32()?,
                (2, v) => col.name = v.as_bytes()?,
                (3, v) => col.original_name = v.as_bytes()?,
                (4, v) => col.table = v.as_bytes()?,
                (5, v) => col.original_table = v.as_bytes()?,
                (6, v) => col.schema = v.as_bytes()?,
                (7, v) => col.catalog = v.as_bytes()?,
                (8, v) => col.collation = v.as_u64()?,
                (9, v) => col.fractional_digits = v.as_u32()?,
                (10, v) => col.length = v.as_u32()?,
                (11, v) => col.flags = v.as_u32()?,
                (12, v) => col.content_type = v.as_u32()?,
                _ => {}
            }
        }
        Ok(col)
    }
}

/// `Resultset.Row`
///
/// An empty field encodes NULL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row<'a> {
    pub fields: Vec<&'a [u8]>,
}

impl<'a> Message<'a> for Row<'a> {
    const TYPE: u8 = ServerMessageType::Row as u8;

    fn write_payload(&self, out: &mut Vec<u8>) {
        for field in &self.fields {
            write_bytes_field(out, 1, field);
        }
    }

    fn read_payload(payload: &'a [u8]) -> Result<Self> {
        let mut fields = Vec::new();
        for field in Fields::new(payload) {
            if let (1, v) = field? {
                fields.push(v.as_bytes()?);
            }
        }
        Ok(Self { fields })
    }
}

// ============================================================================
// Decoding by tag
// ============================================================================

/// A decoded server message
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage<'a> {
    Ok(OkMsg<'a>),
    Error(ErrorMsg<'a>),
    Capabilities(Capabilities<'a>),
    AuthenticateContinue(AuthenticateChallenge<'a>),
    AuthenticateOk(AuthenticateOk<'a>),
    Notice(NoticeFrame<'a>),
    ColumnMetaData(ColumnMetaData<'a>),
    Row(Row<'a>),
    FetchDone,
    FetchSuspended,
    FetchDoneMoreResultsets,
    StmtExecuteOk,
    FetchDoneMoreOutParams,
}

impl<'a> ServerMessage<'a> {
    pub fn decode(msg_type: u8, payload: &'a [u8]) -> Result<Self> {
        let kind =
            ServerMessageType::from_u8(msg_type).ok_or(Error::UnknownMessageType(msg_type))?;
        Ok(match kind {
            ServerMessageType::Ok => Self::Ok(OkMsg::read_payload(payload)?),
            ServerMessageType::Error => Self::Error(ErrorMsg::read_payload(payload)?),
            ServerMessageType::Capabilities => {
                Self::Capabilities(Capabilities::read_payload(payload)?)
            }
            ServerMessageType::AuthenticateContinue => {
                Self::AuthenticateContinue(AuthenticateChallenge::read_payload(payload)?)
            }
            ServerMessageType::AuthenticateOk => {
                Self::AuthenticateOk(AuthenticateOk::read_payload(payload)?)
            }
            ServerMessageType::Notice => Self::Notice(NoticeFrame::read_payload(payload)?),
            ServerMessageType::ColumnMetaData => {
                Self::ColumnMetaData(ColumnMetaData::read_payload(payload)?)
            }
            ServerMessageType::Row => Self::Row(Row::read_payload(payload)?),
            ServerMessageType::FetchDone => Self::FetchDone,
            ServerMessageType::FetchSuspended => Self::FetchSuspended,
            ServerMessageType::FetchDoneMoreResultsets => Self::FetchDoneMoreResultsets,
            ServerMessageType::StmtExecuteOk => Self::StmtExecuteOk,
            ServerMessageType::FetchDoneMoreOutParams => Self::FetchDoneMoreOutParams,
        })
    }

    pub fn kind(&self) -> ServerMessageType {
        match self {
            Self::Ok(_) => ServerMessageType::Ok,
            Self::Error(_) => ServerMessageType::Error,
            Self::Capabilities(_) => ServerMessageType::Capabilities,
            Self::AuthenticateContinue(_) => ServerMessageType::AuthenticateContinue,
            Self::AuthenticateOk(_) => ServerMessageType::AuthenticateOk,
            Self::Notice(_) => ServerMessageType::Notice,
            Self::ColumnMetaData(_) => ServerMessageType::ColumnMetaData,
            Self::Row(_) => ServerMessageType::Row,
            Self::FetchDone => ServerMessageType::FetchDone,
            Self::FetchSuspended => ServerMessageType::FetchSuspended,
            Self::FetchDoneMoreResultsets => ServerMessageType::FetchDoneMoreResultsets,
            Self::StmtExecuteOk => ServerMessageType::StmtExecuteOk,
            Self::FetchDoneMoreOutParams => ServerMessageType::FetchDoneMoreOutParams,
        }
    }
}

/// A decoded client message, as seen by a server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage<'a> {
    CapabilitiesGet,
    CapabilitiesSet(CapabilitiesSet<'a>),
    Close,
    AuthenticateStart(AuthenticateStart<'a>),
    AuthenticateContinue(AuthenticateContinue<'a>),
    SessionReset,
    SessionClose,
    StmtExecute(StmtExecute<'a>),
}

impl<'a> ClientMessage<'a> {
    pub fn decode(msg_type: u8, payload: &'a [u8]) -> Result<Self> {
        let kind =
            ClientMessageType::from_u8(msg_type).ok_or(Error::UnknownMessageType(msg_type))?;
        Ok(match kind {
            ClientMessageType::CapabilitiesGet => Self::CapabilitiesGet,
            ClientMessageType::CapabilitiesSet => {
                Self::CapabilitiesSet(CapabilitiesSet::read_payload(payload)?)
            }
            ClientMessageType::Close => Self::Close,
            ClientMessageType::AuthenticateStart => {
                Self::AuthenticateStart(AuthenticateStart::read_payload(payload)?)
            }
            ClientMessageType::AuthenticateContinue => {
                Self::AuthenticateContinue(AuthenticateContinue::read_payload(payload)?)
            }
            ClientMessageType::SessionReset => Self::SessionReset,
            ClientMessageType::SessionClose => Self::SessionClose,
            ClientMessageType::StmtExecute => {
                Self::StmtExecute(StmtExecute::read_payload(payload)?)
            }
        })
    }
}

// ============================================================================
// Shared field helpers
// ============================================================================

fn read_auth_data(payload: &[u8]) -> Result<&[u8]> {
    let mut auth_data: &[u8] = &[];
    for field in Fields::new(payload) {
        if let (1, v) = field? {
            auth_data = v.as_bytes()?;
        }
    }
    Ok(auth_data)
}

fn write_capabilities(out: &mut Vec<u8>, capabilities: &[(&str, Any<'_>)]) {
    for (name, value) in capabilities {
        write_message_field(out, 1, |o| {
            write_string_field(o, 1, name);
            write_message_field(o, 2, |v| value.write(v));
        });
    }
}

fn read_capabilities(payload: &[u8]) -> Result<Vec<(&str, Any<'_>)>> {
    let mut capabilities = Vec::new();
    for field in Fields::new(payload) {
        let (number, value) = field?;
        if number != 1 {
            continue;
        }
        let mut name = "";
        let mut any = None;
        for inner in Fields::new(value.as_bytes()?) {
            match inner? {
                (1, v) => name = v.as_str()?,
                (2, v) => any = Some(Any::read(v.as_bytes()?)?),
                _ => {}
            }
        }
        let any = any.ok_or(Error::InvalidFrame("capability without value"))?;
        capabilities.push((name, any));
    }
    Ok(capabilities)
}
