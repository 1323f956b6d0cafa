//! `Mysqlx.Datatypes`: Scalar, Object, Array and Any

use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// A scalar value as carried in statement arguments and notices
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar<'a> {
    Sint(i64),
    Uint(u64),
    Null,
    Octets { value: &'a [u8], content_type: u32 },
    Double(f64),
    Float(f32),
    Bool(bool),
    String { value: &'a [u8], collation: u64 },
}

impl<'a> Scalar<'a> {
    const V_SINT: u64 = 1;
    const V_UINT: u64 = 2;
    const V_NULL: u64 = 3;
    const V_OCTETS: u64 = 4;
    const V_DOUBLE: u64 = 5;
    const V_FLOAT: u64 = 6;
    const V_BOOL: u64 = 7;
    const V_STRING: u64 = 8;

    pub fn string(value: &'a str) -> Self {
        Self::String {
            value: value.as_bytes(),
            collation: 0,
        }
    }

    /// Interpret the value as an unsigned integer, if it is one
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Uint(v) => Some(v),
            Self::Sint(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Interpret the value as text, if it is a string or octets
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match *self {
            Self::String { value, .. } | Self::Octets { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        match *self {
            Self::Sint(v) => {
                write_uint_field(out, 1, Self::V_SINT);
                write_sint_field(out, 2, v);
            }
            Self::Uint(v) => {
                write_uint_field(out, 1, Self::V_UINT);
                write_uint_field(out, 3, v);
            }
            Self::Null => write_uint_field(out, 1, Self::V_NULL),
            Self::Octets {
                value,
                content_type,
            } => {
                write_uint_field(out, 1, Self::V_OCTETS);
                write_message_field(out, 5, |o| {
                    write_bytes_field(o, 1, value);
                    if content_type != 0 {
                        write_uint_field(o, 2, u64::from(content_type));
                    }
                });
            }
            Self::Double(v) => {
                write_uint_field(out, 1, Self::V_DOUBLE);
                write_fixed64_field(out, 6, v.to_bits());
            }
            Self::Float(v) => {
                write_uint_field(out, 1, Self::V_FLOAT);
                write_fixed32_field(out, 7, v.to_bits());
            }
            Self::Bool(v) => {
                write_uint_field(out, 1, Self::V_BOOL);
                write_bool_field(out, 8, v);
            }
            Self::String { value, collation } => {
                write_uint_field(out, 1, Self::V_STRING);
                write_message_field(out, 9, |o| {
                    write_bytes_field(o, 1, value);
                    if collation != 0 {
                        write_uint_field(o, 2, collation);
                    }
                });
            }
        }
    }

    pub fn read(payload: &'a [u8]) -> Result<Self> {
        let mut scalar_type = None;
        let mut sint = 0i64;
        let mut uint = 0u64;
        let mut octets: (&[u8], u32) = (&[], 0);
        let mut double = 0f64;
        let mut float = 0f32;
        let mut boolean = false;
        let mut string: (&[u8], u64) = (&[], 0);

        for field in Fields::new(payload) {
            let (number, value) = field?;
            match number {
                1 => scalar_type = Some(value.as_u64()?),
                2 => sint = zigzag_decode(value.as_u64()?),
                3 => uint = value.as_u64()?,
                5 => {
                    for inner in Fields::new(value.as_bytes()?) {
                        match inner? {
                            (1, v) => octets.0 = v.as_bytes()?,
                            (2, v) => octets.1 = v.as_u32()?,
                            _ => {}
                        }
                    }
                }
                6 => double = f64::from_bits(value.as_u64()?),
                7 => float = f32::from_bits(value.as_u32()?),
                8 => boolean = value.as_bool()?,
                9 => {
                    for inner in Fields::new(value.as_bytes()?) {
                        match inner? {
                            (1, v) => string.0 = v.as_bytes()?,
                            (2, v) => string.1 = v.as_u64()?,
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        match scalar_type {
            Some(Self::V_SINT) => Ok(Self::Sint(sint)),
            Some(Self::V_UINT) => Ok(Self::Uint(uint)),
            Some(Self::V_NULL) => Ok(Self::Null),
            Some(Self::V_OCTETS) => Ok(Self::Octets {
                value: octets.0,
                content_type: octets.1,
            }),
            Some(Self::V_DOUBLE) => Ok(Self::Double(double)),
            Some(Self::V_FLOAT) => Ok(Self::Float(float)),
            Some(Self::V_BOOL) => Ok(Self::Bool(boolean)),
            Some(Self::V_STRING) => Ok(Self::String {
                value: string.0,
                collation: string.1,
            }),
            Some(_) => Err(Error::InvalidFrame("unknown scalar type")),
            None => Err(Error::InvalidFrame("scalar without type")),
        }
    }
}

/// `Mysqlx.Datatypes.Any`
#[derive(Debug, Clone, PartialEq)]
pub enum Any<'a> {
    Scalar(Scalar<'a>),
    Object(Vec<(&'a str, Any<'a>)>),
    Array(Vec<Any<'a>>),
}

impl<'a> Any<'a> {
    const SCALAR: u64 = 1;
    const OBJECT: u64 = 2;
    const ARRAY: u64 = 3;

    pub fn write(&self, out: &mut Vec<u8>) {
        match self {
            Self::Scalar(scalar) => {
                write_uint_field(out, 1, Self::SCALAR);
                write_message_field(out, 2, |o| scalar.write(o));
            }
            Self::Object(fields) => {
                write_uint_field(out, 1, Self::OBJECT);
                write_message_field(out, 3, |o| {
                    for (key, value) in fields {
                        write_message_field(o, 1, |f| {
                            write_string_field(f, 1, key);
                            write_message_field(f, 2, |v| value.write(v));
                        });
                    }
                });
            }
            Self::Array(values) => {
                write_uint_field(out, 1, Self::ARRAY);
                write_message_field(out, 4, |o| {
                    for value in values {
                        write_message_field(o, 1, |v| value.write(v));
                    }
                });
            }
        }
    }

    pub fn read(payload: &'a [u8]) -> Result<Self> {
        let mut any_type = None;
        let mut scalar = None;
        let mut object = Vec::new();
        let mut array = Vec::new();

        for field in Fields::new(payload) {
            let (number, value) = field?;
            match number {
                1 => any_type = Some(value.as_u64()?),
                2 => scalar = Some(Scalar::read(value.as_bytes()?)?),
                3 => {
                    for fld in Fields::new(value.as_bytes()?) {
                        let (n, v) = fld?;
                        if n == 1 {
                            object.push(read_object_field(v.as_bytes()?)?);
                        }
                    }
                }
                4 => {
                    for item in Fields::new(value.as_bytes()?) {
                        let (n, v) = item?;
                        if n == 1 {
                            array.push(Any::read(v.as_bytes()?)?);
                        }
                    }
                }
                _ => {}
            }
        }

        match any_type {
            Some(Self::SCALAR) => scalar
                .map(Self::Scalar)
                .ok_or(Error::InvalidFrame("scalar Any without value")),
            Some(Self::OBJECT) => Ok(Self::Object(object)),
            Some(Self::ARRAY) => Ok(Self::Array(array)),
            _ => Err(Error::InvalidFrame("unknown Any type")),
        }
    }
}

fn read_object_field(payload: &[u8]) -> Result<(&str, Any<'_>)> {
    let mut key = "";
    let mut value = None;
    for field in Fields::new(payload) {
        match field? {
            (1, v) => key = v.as_str()?,
            (2, v) => value = Some(Any::read(v.as_bytes()?)?),
            _ => {}
        }
    }
    Ok((
        key,
        value.ok_or(Error::InvalidFrame("object field without value"))?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_kinds_survive_encoding() {
        let values = [
            Scalar::Sint(-42),
            Scalar::Uint(u64::MAX),
            Scalar::Null,
            Scalar::Octets {
                value: b"{}",
                content_type: 2,
            },
            Scalar::Double(2.5),
            Scalar::Float(-0.5),
            Scalar::Bool(true),
            Scalar::String {
                value: b"abc",
                collation: 255,
            },
        ];
        for value in values {
            let mut out = Vec::new();
            value.write(&mut out);
            assert_eq!(Scalar::read(&out).unwrap(), value);
        }
    }

    #[test]
    fn test_nested_any() {
        let any = Any::Object(vec![
            ("tls", Any::Scalar(Scalar::Bool(true))),
            (
                "list",
                Any::Array(vec![
                    Any::Scalar(Scalar::Uint(1)),
                    Any::Scalar(Scalar::string("two")),
                ]),
            ),
        ]);
        let mut out = Vec::new();
        any.write(&mut out);
        assert_eq!(Any::read(&out).unwrap(), any);
    }

    #[test]
    fn test_scalar_without_type_is_rejected() {
        let mut out = Vec::new();
        write_uint_field(&mut out, 3, 5);
        assert!(Scalar::read(&out).is_err());
    }
}
