//! Protobuf wire-format primitives used by X Protocol payloads

use crate::error::{Error, Result};
use zerocopy::FromBytes;
use zerocopy::byteorder::little_endian::{U32 as U32LE, U64 as U64LE};

/// Wire type of a protobuf field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    Fixed32 = 5,
}

impl WireType {
    fn from_u64(value: u64) -> Result<Self> {
        match value {
            0 => Ok(Self::Varint),
            1 => Ok(Self::Fixed64),
            2 => Ok(Self::LengthDelimited),
            5 => Ok(Self::Fixed32),
            _ => Err(Error::InvalidFrame("unsupported protobuf wire type")),
        }
    }
}

/// Read base-128 varint
pub fn read_varint(data: &[u8]) -> Result<(u64, &[u8])> {
    let mut value = 0u64;
    for (i, &byte) in data.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, &data[i + 1..]));
        }
    }
    if data.len() < 10 {
        Err(Error::UnexpectedEof)
    } else {
        Err(Error::InvalidFrame("varint longer than 10 bytes"))
    }
}

/// Read 4-byte little-endian integer
pub fn read_fixed32(data: &[u8]) -> Result<(u32, &[u8])> {
    if data.len() < 4 {
        return Err(Error::UnexpectedEof);
    }
    let value = U32LE::ref_from_bytes(&data[..4])
        .map_err(|_| Error::InvalidFrame("fixed32"))?
        .get();
    Ok((value, &data[4..]))
}

/// Read 8-byte little-endian integer
pub fn read_fixed64(data: &[u8]) -> Result<(u64, &[u8])> {
    if data.len() < 8 {
        return Err(Error::UnexpectedEof);
    }
    let value = U64LE::ref_from_bytes(&data[..8])
        .map_err(|_| Error::InvalidFrame("fixed64"))?
        .get();
    Ok((value, &data[8..]))
}

/// Read length-delimited bytes
pub fn read_bytes(data: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, rest) = read_varint(data)?;
    let len = usize::try_from(len).map_err(|_| Error::InvalidFrame("length overflow"))?;
    if rest.len() < len {
        return Err(Error::UnexpectedEof);
    }
    Ok((&rest[..len], &rest[len..]))
}

/// Read a field key and split it into field number and wire type
pub fn read_tag(data: &[u8]) -> Result<(u32, WireType, &[u8])> {
    let (key, rest) = read_varint(data)?;
    let field = u32::try_from(key >> 3).map_err(|_| Error::InvalidFrame("field number"))?;
    if field == 0 {
        return Err(Error::InvalidFrame("field number 0"));
    }
    Ok((field, WireType::from_u64(key & 0x7)?, rest))
}

pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// A decoded field value borrowing from the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Bytes(&'a [u8]),
    Fixed32(u32),
}

impl<'a> FieldValue<'a> {
    pub fn as_u64(&self) -> Result<u64> {
        match *self {
            Self::Varint(v) | Self::Fixed64(v) => Ok(v),
            Self::Fixed32(v) => Ok(u64::from(v)),
            Self::Bytes(_) => Err(Error::InvalidFrame("expected integer field")),
        }
    }

    pub fn as_u32(&self) -> Result<u32> {
        u32::try_from(self.as_u64()?).map_err(|_| Error::InvalidFrame("integer field overflow"))
    }

    pub fn as_bool(&self) -> Result<bool> {
        Ok(self.as_u64()? != 0)
    }

    pub fn as_bytes(&self) -> Result<&'a [u8]> {
        match *self {
            Self::Bytes(b) => Ok(b),
            _ => Err(Error::InvalidFrame("expected length-delimited field")),
        }
    }

    pub fn as_str(&self) -> Result<&'a str> {
        Ok(simdutf8::basic::from_utf8(self.as_bytes()?)?)
    }
}

/// Iterator over the fields of a protobuf-encoded payload
///
/// Unknown fields are yielded like any other; callers skip the numbers they do not use.
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    data: &'a [u8],
}

impl<'a> Fields<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn read_field(&mut self) -> Result<(u32, FieldValue<'a>)> {
        let (field, wire_type, rest) = read_tag(self.data)?;
        let (value, rest) = match wire_type {
            WireType::Varint => {
                let (v, rest) = read_varint(rest)?;
                (FieldValue::Varint(v), rest)
            }
            WireType::Fixed64 => {
                let (v, rest) = read_fixed64(rest)?;
                (FieldValue::Fixed64(v), rest)
            }
            WireType::LengthDelimited => {
                let (v, rest) = read_bytes(rest)?;
                (FieldValue::Bytes(v), rest)
            }
            WireType::Fixed32 => {
                let (v, rest) = read_fixed32(rest)?;
                (FieldValue::Fixed32(v), rest)
            }
        };
        self.data = rest;
        Ok((field, value))
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<(u32, FieldValue<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        let item = self.read_field();
        if item.is_err() {
            // Stop after the first malformed field
            self.data = &[];
        }
        Some(item)
    }
}

/// Write base-128 varint
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Write field key
pub fn write_tag(out: &mut Vec<u8>, field: u32, wire_type: WireType) {
    write_varint(out, (u64::from(field) << 3) | wire_type as u64);
}

/// Write varint field
pub fn write_uint_field(out: &mut Vec<u8>, field: u32, value: u64) {
    write_tag(out, field, WireType::Varint);
    write_varint(out, value);
}

/// Write zigzag-encoded signed varint field
pub fn write_sint_field(out: &mut Vec<u8>, field: u32, value: i64) {
    write_uint_field(out, field, zigzag_encode(value));
}

pub fn write_bool_field(out: &mut Vec<u8>, field: u32, value: bool) {
    write_uint_field(out, field, u64::from(value));
}

pub fn write_fixed64_field(out: &mut Vec<u8>, field: u32, value: u64) {
    write_tag(out, field, WireType::Fixed64);
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn write_fixed32_field(out: &mut Vec<u8>, field: u32, value: u32) {
    write_tag(out, field, WireType::Fixed32);
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write length-delimited bytes field
pub fn write_bytes_field(out: &mut Vec<u8>, field: u32, data: &[u8]) {
    write_tag(out, field, WireType::LengthDelimited);
    write_varint(out, data.len() as u64);
    out.extend_from_slice(data);
}

pub fn write_string_field(out: &mut Vec<u8>, field: u32, s: &str) {
    write_bytes_field(out, field, s.as_bytes());
}

/// Write a nested message field, encoding the body with `f`
pub fn write_message_field<F>(out: &mut Vec<u8>, field: u32, f: F)
where
    F: FnOnce(&mut Vec<u8>),
{
    let mut body = Vec::new();
    f(&mut body);
    write_bytes_field(out, field, &body);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_boundaries() {
        for value in [0u64, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let mut out = Vec::new();
            write_varint(&mut out, value);
            let (decoded, rest) = read_varint(&out).unwrap();
            assert_eq!(decoded, value);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn test_varint_known_encoding() {
        let mut out = Vec::new();
        write_varint(&mut out, 300);
        assert_eq!(out, [0xAC, 0x02]);
    }

    #[test]
    fn test_varint_truncated() {
        assert!(matches!(read_varint(&[0x80, 0x80]), Err(Error::UnexpectedEof)));
        assert!(matches!(read_varint(&[]), Err(Error::UnexpectedEof)));
        assert!(matches!(
            read_varint(&[0xFF; 11]),
            Err(Error::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_zigzag() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_decode(zigzag_encode(i64::MIN)), i64::MIN);
        assert_eq!(zigzag_decode(zigzag_encode(-123_456)), -123_456);
    }

    #[test]
    fn test_fields_iterator() {
        let mut out = Vec::new();
        write_uint_field(&mut out, 1, 7);
        write_string_field(&mut out, 2, "name");
        write_fixed32_field(&mut out, 3, 0xDEAD_BEEF);
        write_fixed64_field(&mut out, 4, 42);

        let fields: Vec<_> = Fields::new(&out).collect::<Result<_>>().unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], (1, FieldValue::Varint(7)));
        assert_eq!(fields[1].1.as_str().unwrap(), "name");
        assert_eq!(fields[2], (3, FieldValue::Fixed32(0xDEAD_BEEF)));
        assert_eq!(fields[3].1.as_u64().unwrap(), 42);
    }

    #[test]
    fn test_fields_reject_bad_wire_type() {
        // field 1, wire type 3 (start group)
        let data = [0x0B, 0x00];
        let mut fields = Fields::new(&data);
        assert!(fields.next().unwrap().is_err());
        assert!(fields.next().is_none());
    }

    #[test]
    fn test_bytes_length_past_end() {
        // field 1, length-delimited, declares 5 bytes but carries 2
        let data = [0x0A, 0x05, b'a', b'b'];
        let mut fields = Fields::new(&data);
        assert!(matches!(fields.next(), Some(Err(Error::UnexpectedEof))));
    }
}
