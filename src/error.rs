use thiserror::Error;

pub use color_eyre::eyre::eyre;

use crate::constant::ServerMessageType;

/// An error reported by the server in an `Error` message or a warning notice
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ERROR {code} ({sql_state}): {message}")]
pub struct ServerError {
    pub code: u32,
    /// Raw severity field of the wire message
    pub severity: u32,
    pub sql_state: String,
    pub message: String,
}

impl ServerError {
    pub fn new(code: u32, severity: u32, sql_state: &str, message: &str) -> Self {
        Self {
            code,
            severity,
            sql_state: sql_state.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Server Error: {0}")]
    ServerError(#[from] ServerError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(&'static str),

    #[error("Frame of {length} bytes exceeds the maximum of {max} bytes")]
    FrameTooLarge { length: usize, max: usize },

    #[error("Unexpected end of frame payload")]
    UnexpectedEof,

    #[error("Reply started with unexpected message kind {actual:?} while {phase}")]
    UnexpectedMessage {
        phase: &'static str,
        actual: ServerMessageType,
    },

    #[error("Unknown server message type: {0}")]
    UnknownMessageType(u8),

    #[error("Usage error: {0}")]
    UsageError(&'static str),

    #[error("No error entry in diagnostic arena")]
    NoErrorEntry,

    #[error("Unsupported authentication mechanism: {0}")]
    UnsupportedAuthMechanism(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(ServerError),

    #[error("TLS error: {0}")]
    TlsError(String),

    #[error("Library bug: {0}")]
    LibraryBug(color_eyre::Report),
}

/// Where an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// Malformed or out-of-sequence data on the wire
    Protocol,
    /// Socket or TLS layer
    Transport,
    /// Reported by the server
    Server,
    /// The caller broke a state invariant
    Usage,
    Unknown,
}

impl Error {
    pub fn origin(&self) -> ErrorOrigin {
        match self {
            Self::ServerError(_) | Self::AuthFailed(_) => ErrorOrigin::Server,
            Self::IoError(_) | Self::TlsError(_) => ErrorOrigin::Transport,
            Self::InvalidFrame(_)
            | Self::FrameTooLarge { .. }
            | Self::UnexpectedEof
            | Self::UnexpectedMessage { .. }
            | Self::UnknownMessageType(_)
            | Self::UnsupportedAuthMechanism(_) => ErrorOrigin::Protocol,
            Self::UsageError(_) | Self::NoErrorEntry | Self::BadConfigError(_) => {
                ErrorOrigin::Usage
            }
            Self::LibraryBug(_) => ErrorOrigin::Unknown,
        }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidFrame("text field is not valid UTF-8")
    }
}

impl From<simdutf8::basic::Utf8Error> for Error {
    fn from(_: simdutf8::basic::Utf8Error) -> Self {
        Error::InvalidFrame("text field is not valid UTF-8")
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

#[cfg(feature = "sync-tls")]
impl From<native_tls::Error> for Error {
    fn from(err: native_tls::Error) -> Self {
        Error::TlsError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
