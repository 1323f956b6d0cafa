use crate::constant::{BINARY_COLLATION, ColumnFlags, ColumnType, ContentType};
use crate::protocol::message::ColumnMetaData;

/// Column metadata of one result set column, detached from the read buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    /// Raw type from the wire; see [`ColumnMetadata::column_type`]
    pub type_id: u32,
    pub name: String,
    pub original_name: String,
    pub table: String,
    pub original_table: String,
    pub schema: String,
    pub catalog: String,
    pub collation: u64,
    pub fractional_digits: u32,
    pub length: u32,
    pub flags: ColumnFlags,
    pub content_type: u32,
}

impl From<&ColumnMetaData<'_>> for ColumnMetadata {
    fn from(col: &ColumnMetaData<'_>) -> Self {
        let text = |bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned();
        Self {
            type_id: col.column_type,
            name: text(col.name),
            original_name: text(col.original_name),
            table: text(col.table),
            original_table: text(col.original_table),
            schema: text(col.schema),
            catalog: text(col.catalog),
            // a column without collation is binary
            collation: if col.collation == 0 {
                BINARY_COLLATION
            } else {
                col.collation
            },
            fractional_digits: col.fractional_digits,
            length: col.length,
            flags: ColumnFlags::from_bits_truncate(col.flags),
            content_type: col.content_type,
        }
    }
}

/// Type category a column's values belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Integer,
    Float,
    Datetime,
    String,
    Bytes,
    Document,
    Geometry,
    Xml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatKind {
    Float,
    Double,
    Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatetimeKind {
    Time,
    Timestamp,
    Datetime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Plain,
    Set,
    Enum,
}

/// Encoding details of a column within its [`LogicalType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Integer {
        signed: bool,
        length: u32,
    },
    Float {
        kind: FloatKind,
    },
    Datetime {
        kind: DatetimeKind,
        has_time: bool,
    },
    String {
        kind: StringKind,
        collation: u64,
        width: u32,
    },
    Bytes {
        width: u32,
    },
    /// JSON, geometry and XML columns carry no further format data
    Opaque,
}

impl ColumnMetadata {
    pub fn column_type(&self) -> Option<ColumnType> {
        ColumnType::from_u32(self.type_id)
    }

    pub fn content_type(&self) -> Option<ContentType> {
        ContentType::from_u32(self.content_type)
    }

    pub fn is_binary(&self) -> bool {
        self.collation == BINARY_COLLATION
    }

    pub fn logical_type(&self) -> LogicalType {
        match self.column_type() {
            Some(ColumnType::Sint | ColumnType::Uint) => LogicalType::Integer,
            Some(ColumnType::Float | ColumnType::Double | ColumnType::Decimal) => {
                LogicalType::Float
            }
            Some(ColumnType::Time | ColumnType::Datetime) => LogicalType::Datetime,
            Some(ColumnType::Bytes) => match self.content_type() {
                Some(ContentType::Json) => LogicalType::Document,
                Some(ContentType::Geometry) => LogicalType::Geometry,
                Some(ContentType::Xml) => LogicalType::Xml,
                None if self.is_binary() => LogicalType::Bytes,
                None => LogicalType::String,
            },
            Some(ColumnType::Set | ColumnType::Enum) => LogicalType::String,
            // BIT and unknown types
            Some(ColumnType::Bit) | None => LogicalType::Bytes,
        }
    }

    pub fn format(&self) -> Format {
        let column_type = self.column_type();
        match self.logical_type() {
            LogicalType::Integer => Format::Integer {
                signed: column_type == Some(ColumnType::Sint),
                length: self.length,
            },
            LogicalType::Float => Format::Float {
                kind: match column_type {
                    Some(ColumnType::Float) => FloatKind::Float,
                    Some(ColumnType::Double) => FloatKind::Double,
                    _ => FloatKind::Decimal,
                },
            },
            LogicalType::Datetime => {
                if column_type == Some(ColumnType::Time) {
                    Format::Datetime {
                        kind: DatetimeKind::Time,
                        has_time: true,
                    }
                } else if self.flags.contains(ColumnFlags::TYPE_SPECIFIC) {
                    Format::Datetime {
                        kind: DatetimeKind::Timestamp,
                        has_time: true,
                    }
                } else {
                    // DATETIME values longer than a date carry a time part
                    Format::Datetime {
                        kind: DatetimeKind::Datetime,
                        has_time: self.length > 10,
                    }
                }
            }
            LogicalType::String => Format::String {
                kind: match column_type {
                    Some(ColumnType::Set) => StringKind::Set,
                    Some(ColumnType::Enum) => StringKind::Enum,
                    _ => StringKind::Plain,
                },
                collation: self.collation,
                width: if column_type == Some(ColumnType::Bytes) {
                    self.length
                } else {
                    0
                },
            },
            LogicalType::Bytes => Format::Bytes { width: self.length },
            LogicalType::Document | LogicalType::Geometry | LogicalType::Xml => Format::Opaque,
        }
    }
}
