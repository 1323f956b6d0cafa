/// A set of reusable buffers for X Protocol communication
///
/// A session uses a single `BufferSet` for all its operations. Both buffers
/// keep partial progress so that an operation interrupted by `WouldBlock`
/// resumes where it stopped.
#[derive(Debug, Default)]
pub struct BufferSet {
    /// Bytes received from the server
    /// `read_buffer[read_pos..]` has not been consumed yet.
    pub read_buffer: Vec<u8>,
    read_pos: usize,

    /// Encoded frames waiting to be sent
    /// `write_buffer[write_pos..]` has not been written yet.
    write_buffer: Vec<u8>,
    write_pos: usize,
}

impl BufferSet {
    /// Create a new empty buffer set
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received but not consumed
    #[inline]
    pub fn unread(&self) -> &[u8] {
        &self.read_buffer[self.read_pos..]
    }

    /// Mark `n` unread bytes as consumed
    #[inline]
    pub fn consume(&mut self, n: usize) {
        self.read_pos = (self.read_pos + n).min(self.read_buffer.len());
        if self.read_pos == self.read_buffer.len() {
            self.read_buffer.clear();
            self.read_pos = 0;
        }
    }

    /// Move unread bytes to the front of the read buffer
    pub fn compact(&mut self) {
        if self.read_pos > 0 {
            self.read_buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
    }

    /// Mutable access to the write buffer for appending frames
    #[inline]
    pub fn write_buffer_mut(&mut self) -> &mut Vec<u8> {
        if self.write_pos == self.write_buffer.len() {
            self.write_buffer.clear();
            self.write_pos = 0;
        }
        &mut self.write_buffer
    }

    /// Bytes not yet written to the stream
    #[inline]
    pub fn pending_writes(&self) -> &[u8] {
        &self.write_buffer[self.write_pos..]
    }

    /// Mark `n` pending bytes as written
    #[inline]
    pub fn advance_writes(&mut self, n: usize) {
        self.write_pos = (self.write_pos + n).min(self.write_buffer.len());
    }

    pub fn has_pending_writes(&self) -> bool {
        self.write_pos < self.write_buffer.len()
    }

    /// Drop all buffered bytes, keeping capacity
    pub fn clear(&mut self) {
        self.read_buffer.clear();
        self.read_pos = 0;
        self.write_buffer.clear();
        self.write_pos = 0;
    }
}
