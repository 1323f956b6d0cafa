//! Scripted in-memory server for session tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io::{ErrorKind, Read, Write};
use std::rc::Rc;

use zero_mysqlx::constant::{ClientMessageType, SessionStateParam};
use zero_mysqlx::error::{Error, Result};
use zero_mysqlx::protocol::datatypes::Scalar;
use zero_mysqlx::protocol::frame::{decode_frame, encode_frame};
use zero_mysqlx::protocol::message::{
    AuthenticateChallenge, AuthenticateOk, ClientMessage, ColumnMetaData, ErrorMsg, FetchDone,
    FetchDoneMoreResultsets, Message, OkMsg, Row, StmtExecuteOk,
};
use zero_mysqlx::protocol::notice::{Notice, NoticeFrame, NoticeScope};
use zero_mysqlx::protocol::r#trait::RowProcessor;
use zero_mysqlx::sync::{Session, Transport};
use zero_mysqlx::{AuthMechanism, Opts, SslMode};

pub const SALT: &[u8; 20] = b"01234567890123456789";

/// Column type tags of the X Protocol
pub const SINT: u32 = 1;
pub const BYTES: u32 = 7;

/// Server frames played back in order
#[derive(Debug, Default, Clone)]
pub struct Script {
    bytes: Vec<u8>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<'a, M: Message<'a>>(mut self, msg: &M) -> Self {
        encode_frame(&mut self.bytes, msg);
        self
    }

    /// MYSQL41 challenge followed by success
    pub fn login(self) -> Self {
        self.push(&AuthenticateChallenge { auth_data: SALT })
            .session_state(SessionStateParam::ClientIdAssigned, 7)
            .push(&AuthenticateOk { auth_data: b"" })
    }

    pub fn ok(self) -> Self {
        self.push(&OkMsg { msg: "" })
    }

    pub fn error(self, code: u32, sql_state: &str, msg: &str) -> Self {
        self.push(&ErrorMsg {
            severity: 0,
            code,
            sql_state,
            msg,
        })
    }

    pub fn column(self, name: &str, column_type: u32, content_type: u32, collation: u64) -> Self {
        self.push(&ColumnMetaData {
            column_type,
            name: name.as_bytes(),
            content_type,
            collation,
            ..Default::default()
        })
    }

    /// One single-column row per value, encoded as X Protocol strings
    pub fn string_rows(mut self, values: &[&str]) -> Self {
        for value in values {
            let mut field = value.as_bytes().to_vec();
            field.push(0);
            self = self.push(&Row {
                fields: vec![&field[..]],
            });
        }
        self
    }

    pub fn fetch_done(self) -> Self {
        self.push(&FetchDone)
    }

    pub fn fetch_done_more(self) -> Self {
        self.push(&FetchDoneMoreResultsets)
    }

    pub fn execute_ok(self) -> Self {
        self.push(&StmtExecuteOk)
    }

    pub fn warning(self, level: u32, code: u32, msg: &str) -> Self {
        self.notice(&Notice::Warning { level, code, msg })
    }

    pub fn session_state(self, param: SessionStateParam, value: u64) -> Self {
        self.notice(&Notice::SessionStateChanged {
            param: param as u32,
            values: vec![Scalar::Uint(value)],
        })
    }

    pub fn session_state_text(self, param: SessionStateParam, value: &str) -> Self {
        self.notice(&Notice::SessionStateChanged {
            param: param as u32,
            values: vec![Scalar::String {
                value: value.as_bytes(),
                collation: 0,
            }],
        })
    }

    fn notice(self, notice: &Notice<'_>) -> Self {
        let mut payload = Vec::new();
        notice.write_payload(&mut payload);
        self.push(&NoticeFrame {
            notice_type: notice.notice_type(),
            scope: NoticeScope::Local,
            payload: &payload,
        })
    }

    /// A complete single-column result set of strings
    pub fn string_result(self, name: &str, values: &[&str]) -> Self {
        self.column(name, BYTES, 0, 255)
            .string_rows(values)
            .fetch_done()
            .execute_ok()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// A transport reading from a [`Script`] and recording what the client sends
pub struct MockStream {
    input: Vec<u8>,
    pos: usize,
    /// Largest number of bytes returned by one read
    read_chunk: usize,
    pub sent: Rc<RefCell<Vec<u8>>>,
    tls_supported: bool,
    pub tls: bool,
    nonblocking: Cell<bool>,
    /// In non-blocking mode, reads alternate between `WouldBlock` and data
    would_block: Cell<bool>,
}

impl MockStream {
    pub fn new(script: Script) -> Self {
        Self {
            input: script.into_bytes(),
            pos: 0,
            read_chunk: usize::MAX,
            sent: Rc::new(RefCell::new(Vec::new())),
            tls_supported: false,
            tls: false,
            nonblocking: Cell::new(false),
            would_block: Cell::new(false),
        }
    }

    pub fn with_read_chunk(mut self, read_chunk: usize) -> Self {
        self.read_chunk = read_chunk;
        self
    }

    pub fn with_tls(mut self) -> Self {
        self.tls_supported = true;
        self
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.nonblocking.get() {
            let block = !self.would_block.get();
            self.would_block.set(block);
            if block {
                return Err(ErrorKind::WouldBlock.into());
            }
        }
        let remaining = &self.input[self.pos..];
        let n = remaining.len().min(buf.len()).min(self.read_chunk);
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.sent.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Transport for MockStream {
    fn upgrade_to_tls(mut self, _host: &str) -> Result<Self> {
        if !self.tls_supported {
            return Err(Error::TlsError("no TLS in this script".to_string()));
        }
        self.tls = true;
        Ok(self)
    }

    fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.nonblocking.set(nonblocking);
        Ok(())
    }
}

pub fn opts(ssl_mode: SslMode) -> Opts {
    Opts {
        user: "app".to_string(),
        password: Some("secret".to_string()),
        schema: Some("test".to_string()),
        ssl_mode,
        auth: Some(AuthMechanism::Mysql41),
        ..Opts::default()
    }
}

/// Route library logs to the test harness; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A logged-in session whose server then plays `script`
pub fn session(script: Script) -> (Session<MockStream>, Rc<RefCell<Vec<u8>>>) {
    init_tracing();
    let stream = MockStream::new(Script {
        bytes: [Script::new().login().into_bytes(), script.into_bytes()].concat(),
    });
    let sent = Rc::clone(&stream.sent);
    let session = Session::new_with_stream(stream, &opts(SslMode::Disabled))
        .expect("login against the script");
    (session, sent)
}

/// Kinds of the client messages in `bytes`
pub fn sent_kinds(bytes: &[u8]) -> Vec<ClientMessageType> {
    let mut kinds = Vec::new();
    let mut rest = bytes;
    while let Some((msg_type, payload, consumed)) =
        decode_frame(rest, usize::MAX).expect("valid client frame")
    {
        ClientMessage::decode(msg_type, payload).expect("known client message");
        kinds.push(ClientMessageType::from_u8(msg_type).expect("client tag"));
        rest = &rest[consumed..];
    }
    kinds
}

/// Text of the `StmtExecute` messages in `bytes`
pub fn sent_statements(bytes: &[u8]) -> Vec<String> {
    let mut stmts = Vec::new();
    let mut rest = bytes;
    while let Some((msg_type, payload, consumed)) =
        decode_frame(rest, usize::MAX).expect("valid client frame")
    {
        if let Ok(ClientMessage::StmtExecute(stmt)) = ClientMessage::decode(msg_type, payload) {
            stmts.push(String::from_utf8_lossy(stmt.stmt).into_owned());
        }
        rest = &rest[consumed..];
    }
    stmts
}

/// Records row indices and string values, without the trailing NUL
#[derive(Debug, Default)]
pub struct Rows {
    pub indices: Vec<u64>,
    pub values: Vec<String>,
    pub ended: bool,
    /// Decline rows with an even index
    pub skip_even: bool,
}

impl RowProcessor for Rows {
    fn row_begin(&mut self, row: u64) -> Result<bool> {
        if self.skip_even && row % 2 == 0 {
            return Ok(false);
        }
        self.indices.push(row);
        self.values.push(String::new());
        Ok(true)
    }

    fn col_data(&mut self, _pos: usize, data: &[u8]) -> Result<usize> {
        if let Some(value) = self.values.last_mut() {
            value.push_str(&String::from_utf8_lossy(data));
        }
        Ok(data.len())
    }

    fn col_end(&mut self, _pos: usize, _data_len: usize) -> Result<()> {
        if let Some(value) = self.values.last_mut() {
            if value.ends_with('\0') {
                value.pop();
            }
        }
        Ok(())
    }

    fn end_of_data(&mut self) -> Result<()> {
        self.ended = true;
        Ok(())
    }
}
