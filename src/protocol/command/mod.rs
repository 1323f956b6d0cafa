pub mod result;

use crate::protocol::message::{Close, Message, SessionReset, StmtExecute};

/// What the server sends back for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// A single `Ok` or `Error`
    Ok,
    /// Zero or more result sets followed by `StmtExecuteOk`, or an `Error`
    Result,
}

/// A client message that starts a reply
pub trait Command<'a>: Message<'a> {
    const REPLY: ReplyKind;
}

impl<'a> Command<'a> for StmtExecute<'a> {
    const REPLY: ReplyKind = ReplyKind::Result;
}

impl Command<'_> for SessionReset {
    const REPLY: ReplyKind = ReplyKind::Ok;
}

impl Command<'_> for Close {
    const REPLY: ReplyKind = ReplyKind::Ok;
}
