/// Client-to-server message type tags
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessageType {
    CapabilitiesGet = 1,
    CapabilitiesSet = 2,
    Close = 3,
    AuthenticateStart = 4,
    AuthenticateContinue = 5,
    SessionReset = 6,
    SessionClose = 7,
    StmtExecute = 12,
}

impl ClientMessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::CapabilitiesGet),
            2 => Some(Self::CapabilitiesSet),
            3 => Some(Self::Close),
            4 => Some(Self::AuthenticateStart),
            5 => Some(Self::AuthenticateContinue),
            6 => Some(Self::SessionReset),
            7 => Some(Self::SessionClose),
            12 => Some(Self::StmtExecute),
            _ => None,
        }
    }
}

/// Server-to-client message type tags
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMessageType {
    Ok = 0,
    Error = 1,
    Capabilities = 2,
    AuthenticateContinue = 3,
    AuthenticateOk = 4,
    Notice = 11,
    ColumnMetaData = 12,
    Row = 13,
    FetchDone = 14,
    FetchSuspended = 15,
    FetchDoneMoreResultsets = 16,
    StmtExecuteOk = 17,
    FetchDoneMoreOutParams = 18,
}

impl ServerMessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::Error),
            2 => Some(Self::Capabilities),
            3 => Some(Self::AuthenticateContinue),
            4 => Some(Self::AuthenticateOk),
            11 => Some(Self::Notice),
            12 => Some(Self::ColumnMetaData),
            13 => Some(Self::Row),
            14 => Some(Self::FetchDone),
            15 => Some(Self::FetchSuspended),
            16 => Some(Self::FetchDoneMoreResultsets),
            17 => Some(Self::StmtExecuteOk),
            18 => Some(Self::FetchDoneMoreOutParams),
            _ => None,
        }
    }
}

/// Column types reported in `ColumnMetaData`
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

impl ColumnType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Sint),
            2 => Some(Self::Uint),
            5 => Some(Self::Double),
            6 => Some(Self::Float),
            7 => Some(Self::Bytes),
            10 => Some(Self::Time),
            12 => Some(Self::Datetime),
            15 => Some(Self::Set),
            16 => Some(Self::Enum),
            17 => Some(Self::Bit),
            18 => Some(Self::Decimal),
            _ => None,
        }
    }
}

/// Content type of a BYTES column
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Geometry = 1,
    Json = 2,
    Xml = 3,
}

impl ContentType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Geometry),
            2 => Some(Self::Json),
            3 => Some(Self::Xml),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    /// Column flags from `ColumnMetaData`
    ///
    /// The lowest bit is type specific: ZEROFILL for UINT, UNSIGNED for
    /// DOUBLE/FLOAT/DECIMAL, RIGHTPAD for BYTES and TIMESTAMP for DATETIME.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ColumnFlags: u32 {
        const TYPE_SPECIFIC = 0x0001;
        const NOT_NULL = 0x0010;
        const PRIMARY_KEY = 0x0020;
        const UNIQUE_KEY = 0x0040;
        const MULTIPLE_KEY = 0x0080;
        const AUTO_INCREMENT = 0x0100;
    }
}

/// Notice frame types
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeType {
    Warning = 1,
    SessionVariableChanged = 2,
    SessionStateChanged = 3,
}

impl NoticeType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Warning),
            2 => Some(Self::SessionVariableChanged),
            3 => Some(Self::SessionStateChanged),
            _ => None,
        }
    }
}

/// Parameters of a `SessionStateChanged` notice
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStateParam {
    CurrentSchema = 1,
    AccountExpired = 2,
    GeneratedInsertId = 3,
    RowsAffected = 4,
    RowsFound = 5,
    RowsMatched = 6,
    TrxCommitted = 7,
    TrxRolledback = 9,
    ProducedMessage = 10,
    ClientIdAssigned = 11,
}

impl SessionStateParam {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::CurrentSchema),
            2 => Some(Self::AccountExpired),
            3 => Some(Self::GeneratedInsertId),
            4 => Some(Self::RowsAffected),
            5 => Some(Self::RowsFound),
            6 => Some(Self::RowsMatched),
            7 => Some(Self::TrxCommitted),
            9 => Some(Self::TrxRolledback),
            10 => Some(Self::ProducedMessage),
            11 => Some(Self::ClientIdAssigned),
            _ => None,
        }
    }
}

/// Collation id of the `binary` character set
pub const BINARY_COLLATION: u64 = 63;

/// Default upper bound for `[type][payload]` of a single frame
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Server answer to a TLS capability request on a server without TLS support
pub const TLS_UNSUPPORTED_CODE: u32 = 5001;
pub const TLS_UNSUPPORTED_SEVERITY: u32 = 2;
pub const TLS_UNSUPPORTED_SQL_STATE: &str = "HY000";
