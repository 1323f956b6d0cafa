//! `Mysqlx.Notice`: out-of-band frames that may arrive in any phase

use crate::constant::{NoticeType, ServerMessageType};
use crate::error::Result;
use crate::protocol::datatypes::Scalar;
use crate::protocol::message::Message;
use crate::protocol::primitive::*;

/// Scope of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeScope {
    Global = 1,
    Local = 2,
}

/// Envelope of a notice: its type, scope and still-encoded payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeFrame<'a> {
    pub notice_type: u32,
    pub scope: NoticeScope,
    pub payload: &'a [u8],
}

impl<'a> Message<'a> for NoticeFrame<'a> {
    const TYPE: u8 = ServerMessageType::Notice as u8;

    fn write_payload(&self, out: &mut Vec<u8>) {
        write_uint_field(out, 1, u64::from(self.notice_type));
        if self.scope != NoticeScope::Global {
            write_uint_field(out, 2, self.scope as u64);
        }
        if !self.payload.is_empty() {
            write_bytes_field(out, 3, self.payload);
        }
    }

    fn read_payload(payload: &'a [u8]) -> Result<Self> {
        let mut frame = Self {
            notice_type: 0,
            scope: NoticeScope::Global,
            payload: &[],
        };
        for field in Fields::new(payload) {
            match field? {
                (1, v) => frame.notice_type = v.as_u32()?,
                (2, v) => {
                    frame.scope = if v.as_u64()? == NoticeScope::Local as u64 {
                        NoticeScope::Local
                    } else {
                        NoticeScope::Global
                    }
                }
                (3, v) => frame.payload = v.as_bytes()?,
                _ => {}
            }
        }
        Ok(frame)
    }
}

/// Decoded notice payload
#[derive(Debug, Clone, PartialEq)]
pub enum Notice<'a> {
    /// `level` is NOTE=1, WARNING=2 or ERROR=3
    Warning { level: u32, code: u32, msg: &'a str },
    SessionVariableChanged {
        param: &'a str,
        value: Option<Scalar<'a>>,
    },
    SessionStateChanged {
        param: u32,
        values: Vec<Scalar<'a>>,
    },
    /// A notice type this client does not interpret
    Other(u32),
}

impl<'a> Notice<'a> {
    pub const WARNING_NOTE: u32 = 1;
    pub const WARNING_WARNING: u32 = 2;
    pub const WARNING_ERROR: u32 = 3;

    pub fn parse(frame: &NoticeFrame<'a>) -> Result<Self> {
        let payload = frame.payload;
        match NoticeType::from_u32(frame.notice_type) {
            Some(NoticeType::Warning) => {
                let mut level = Self::WARNING_WARNING;
                let mut code = 0;
                let mut msg = "";
                for field in Fields::new(payload) {
                    match field? {
                        (1, v) => level = v.as_u32()?,
                        (2, v) => code = v.as_u32()?,
                        (3, v) => msg = v.as_str()?,
                        _ => {}
                    }
                }
                Ok(Self::Warning { level, code, msg })
            }
            Some(NoticeType::SessionVariableChanged) => {
                let mut param = "";
                let mut value = None;
                for field in Fields::new(payload) {
                    match field? {
                        (1, v) => param = v.as_str()?,
                        (2, v) => value = Some(Scalar::read(v.as_bytes()?)?),
                        _ => {}
                    }
                }
                Ok(Self::SessionVariableChanged { param, value })
            }
            Some(NoticeType::SessionStateChanged) => {
                let mut param = 0;
                let mut values = Vec::new();
                for field in Fields::new(payload) {
                    match field? {
                        (1, v) => param = v.as_u32()?,
                        (2, v) => values.push(Scalar::read(v.as_bytes()?)?),
                        _ => {}
                    }
                }
                Ok(Self::SessionStateChanged { param, values })
            }
            None => Ok(Self::Other(frame.notice_type)),
        }
    }

    pub fn notice_type(&self) -> u32 {
        match self {
            Self::Warning { .. } => NoticeType::Warning as u32,
            Self::SessionVariableChanged { .. } => NoticeType::SessionVariableChanged as u32,
            Self::SessionStateChanged { .. } => NoticeType::SessionStateChanged as u32,
            Self::Other(notice_type) => *notice_type,
        }
    }

    /// Encode the inner payload of this notice
    pub fn write_payload(&self, out: &mut Vec<u8>) {
        match self {
            Self::Warning { level, code, msg } => {
                if *level != Self::WARNING_WARNING {
                    write_uint_field(out, 1, u64::from(*level));
                }
                write_uint_field(out, 2, u64::from(*code));
                write_string_field(out, 3, msg);
            }
            Self::SessionVariableChanged { param, value } => {
                write_string_field(out, 1, param);
                if let Some(value) = value {
                    write_message_field(out, 2, |o| value.write(o));
                }
            }
            Self::SessionStateChanged { param, values } => {
                write_uint_field(out, 1, u64::from(*param));
                for value in values {
                    write_message_field(out, 2, |o| value.write(o));
                }
            }
            Self::Other(_) => {}
        }
    }
}
