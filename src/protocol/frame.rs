use zerocopy::byteorder::little_endian::U32 as U32LE;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};
use crate::protocol::message::Message;

/// Size of the frame header: 4-byte length + 1-byte type tag
pub const FRAME_HEADER_LEN: usize = 5;

/// X Protocol frame header (zero-copy)
///
/// Layout:
/// - length: 4 bytes (little-endian, counts the type byte and the payload)
/// - msg_type: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct FrameHeader {
    pub length: U32LE,
    pub msg_type: u8,
}

impl FrameHeader {
    pub fn encode(payload_length: usize, msg_type: u8) -> Self {
        Self {
            length: U32LE::new((payload_length + 1) as u32),
            msg_type,
        }
    }

    /// Length of the payload following the header
    pub fn payload_length(&self) -> usize {
        (self.length.get() as usize).saturating_sub(1)
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        if data.len() < FRAME_HEADER_LEN {
            return Err(Error::UnexpectedEof);
        }
        Self::ref_from_bytes(&data[..FRAME_HEADER_LEN])
            .map_err(|_| Error::InvalidFrame("frame header"))
    }

    /// Check that the declared length is plausible
    pub fn validate(&self, max_frame_size: usize) -> Result<()> {
        let length = self.length.get() as usize;
        if length == 0 {
            return Err(Error::InvalidFrame("zero frame length"));
        }
        if length > max_frame_size {
            return Err(Error::FrameTooLarge {
                length,
                max: max_frame_size,
            });
        }
        Ok(())
    }
}

/// Decode one frame from the front of `data`
///
/// # Returns
/// * `Ok(Some((msg_type, payload, consumed)))` - A complete frame
/// * `Ok(None)` - More bytes are needed
/// * `Err(Error)` - The length prefix is implausible
pub fn decode_frame(data: &[u8], max_frame_size: usize) -> Result<Option<(u8, &[u8], usize)>> {
    if data.len() < FRAME_HEADER_LEN {
        return Ok(None);
    }
    let header = FrameHeader::from_bytes(data)?;
    header.validate(max_frame_size)?;

    let end = FRAME_HEADER_LEN + header.payload_length();
    if data.len() < end {
        return Ok(None);
    }
    Ok(Some((header.msg_type, &data[FRAME_HEADER_LEN..end], end)))
}

/// Helper function to write a frame header
#[inline]
pub fn write_frame_header(out: &mut Vec<u8>, msg_type: u8, payload_length: usize) {
    out.extend_from_slice(FrameHeader::encode(payload_length, msg_type).as_bytes());
}

/// Append a complete frame carrying `msg`
///
/// The header space is reserved first and patched once the payload length is known.
pub fn encode_frame<'a, M: Message<'a>>(out: &mut Vec<u8>, msg: &M) {
    let start = out.len();
    out.extend_from_slice(&[0u8; FRAME_HEADER_LEN]);
    msg.write_payload(out);
    let payload_length = out.len() - start - FRAME_HEADER_LEN;
    let header = FrameHeader::encode(payload_length, M::TYPE);
    out[start..start + FRAME_HEADER_LEN].copy_from_slice(header.as_bytes());
}
