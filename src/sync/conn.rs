use std::io::{ErrorKind, Read, Write};

use crate::buffer_pool::PooledBufferSet;
use crate::error::{Error, Result};
use crate::protocol::frame::{decode_frame, encode_frame};
use crate::protocol::message::{Message, ServerMessage};
use crate::sync::stream::Transport;

const READ_CHUNK: usize = 16 * 1024;

/// Frame-level I/O over a [`Transport`]
///
/// Outgoing frames are appended to the write buffer and flushed separately.
/// Incoming bytes accumulate in the read buffer until a complete frame is
/// present; the front frame is decoded in place and stays there until
/// `consume_frame()`.
pub struct Conn<S> {
    stream: S,
    buffer_set: PooledBufferSet,
    max_frame_size: usize,
    /// `WouldBlock` means "not yet" instead of a timeout
    nonblocking: bool,
    /// Length of the complete frame at the front of the read buffer
    front_frame: Option<usize>,
}

impl<S: Transport> Conn<S> {
    pub fn new(stream: S, buffer_set: PooledBufferSet, max_frame_size: usize) -> Self {
        Self {
            stream,
            buffer_set,
            max_frame_size,
            nonblocking: false,
            front_frame: None,
        }
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        self.stream.set_nonblocking(nonblocking)?;
        self.nonblocking = nonblocking;
        Ok(())
    }

    /// Swap the stream for a TLS-wrapped one
    pub fn upgrade_to_tls(self, host: &str) -> Result<Self> {
        if !self.buffer_set.unread().is_empty() {
            return Err(Error::TlsError(
                "server sent data before the TLS handshake".to_string(),
            ));
        }
        let Self {
            stream,
            buffer_set,
            max_frame_size,
            nonblocking,
            front_frame,
        } = self;
        Ok(Self {
            stream: stream.upgrade_to_tls(host)?,
            buffer_set,
            max_frame_size,
            nonblocking,
            front_frame,
        })
    }

    /// Queue a message; nothing is written until `flush_writes()`
    pub fn queue_message<'a, M: Message<'a>>(&mut self, msg: &M) {
        encode_frame(self.buffer_set.write_buffer_mut(), msg);
    }

    /// Queue already encoded frames
    pub fn queue_frames(&mut self, frames: &[u8]) {
        self.buffer_set.write_buffer_mut().extend_from_slice(frames);
    }

    /// Write pending frames
    ///
    /// Returns `Ok(false)` if the stream would block with bytes still pending.
    #[tracing::instrument(skip_all)]
    pub fn flush_writes(&mut self) -> Result<bool> {
        while self.buffer_set.has_pending_writes() {
            match self.stream.write(self.buffer_set.pending_writes()) {
                Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero).into()),
                Ok(n) => self.buffer_set.advance_writes(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock && self.nonblocking => {
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            }
        }
        match self.stream.flush() {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::WouldBlock && self.nonblocking => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Read until a complete frame is at the front of the read buffer
    ///
    /// Returns `Ok(false)` if the stream would block first.
    #[tracing::instrument(skip_all)]
    pub fn fill_frame(&mut self) -> Result<bool> {
        loop {
            if self.front_frame.is_some() {
                return Ok(true);
            }
            if let Some((_, _, consumed)) =
                decode_frame(self.buffer_set.unread(), self.max_frame_size)?
            {
                self.front_frame = Some(consumed);
                return Ok(true);
            }

            self.buffer_set.compact();
            let buffer = &mut self.buffer_set.read_buffer;
            let start = buffer.len();
            buffer.resize(start + READ_CHUNK, 0);
            let read = self.stream.read(&mut buffer[start..]);
            buffer.truncate(start + *read.as_ref().unwrap_or(&0));
            match read {
                Ok(0) => {
                    return Err(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "connection closed by server",
                    )
                    .into());
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock && self.nonblocking => {
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Decode the front frame without consuming it
    pub fn read_message(&mut self) -> Result<Option<ServerMessage<'_>>> {
        if !self.fill_frame()? {
            return Ok(None);
        }
        self.front_message().map(Some)
    }

    /// Block until a frame arrives, then decode it without consuming it
    pub fn wait_message(&mut self) -> Result<ServerMessage<'_>> {
        while !self.fill_frame()? {}
        self.front_message()
    }

    fn front_message(&self) -> Result<ServerMessage<'_>> {
        let (msg_type, payload, _) = decode_frame(self.buffer_set.unread(), self.max_frame_size)?
            .ok_or_else(|| Error::LibraryBug(crate::error::eyre!("no complete frame buffered")))?;
        let msg = ServerMessage::decode(msg_type, payload)?;
        tracing::trace!(kind = ?msg.kind(), "received");
        Ok(msg)
    }

    /// Drop the front frame from the read buffer
    pub fn consume_frame(&mut self) {
        if let Some(len) = self.front_frame.take() {
            self.buffer_set.consume(len);
        }
    }
}
