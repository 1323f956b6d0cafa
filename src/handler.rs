use crate::error::Result;
use crate::protocol::r#trait::RowProcessor;

/// A processor that skips every row
///
/// Used when a cursor is closed or a reply is discarded with rows left on the wire.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardRows;

impl RowProcessor for DiscardRows {
    fn row_begin(&mut self, _row: u64) -> Result<bool> {
        Ok(false)
    }

    fn col_data(&mut self, _pos: usize, _data: &[u8]) -> Result<usize> {
        Ok(0)
    }
}

/// Raw field bytes of one row; `None` is SQL NULL
pub type RawRow = Vec<Option<Vec<u8>>>;

/// A processor that copies every field into owned buffers
#[derive(Debug, Default)]
pub struct RowCollector {
    pub rows: Vec<RawRow>,
    /// Set once the result set has no more rows
    pub end_of_data: bool,
}

impl RowCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields as text, with the trailing NUL of X Protocol strings removed
    pub fn strings(&self) -> Vec<Vec<Option<String>>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|field| {
                        field.as_ref().map(|bytes| {
                            let text = bytes.strip_suffix(b"\0").unwrap_or(bytes);
                            String::from_utf8_lossy(text).into_owned()
                        })
                    })
                    .collect()
            })
            .collect()
    }

    fn field_mut(&mut self, pos: usize) -> Option<&mut Option<Vec<u8>>> {
        let row = self.rows.last_mut()?;
        if row.len() <= pos {
            row.resize(pos + 1, None);
        }
        row.get_mut(pos)
    }
}

impl RowProcessor for RowCollector {
    fn row_begin(&mut self, _row: u64) -> Result<bool> {
        self.rows.push(Vec::new());
        Ok(true)
    }

    fn col_null(&mut self, pos: usize) -> Result<()> {
        if let Some(field) = self.field_mut(pos) {
            *field = None;
        }
        Ok(())
    }

    fn col_begin(&mut self, pos: usize, data_len: usize) -> Result<usize> {
        if let Some(field) = self.field_mut(pos) {
            *field = Some(Vec::with_capacity(data_len));
        }
        Ok(data_len)
    }

    fn col_data(&mut self, pos: usize, data: &[u8]) -> Result<usize> {
        if let Some(Some(buf)) = self.field_mut(pos) {
            buf.extend_from_slice(data);
        }
        Ok(data.len())
    }

    fn end_of_data(&mut self) -> Result<()> {
        self.end_of_data = true;
        Ok(())
    }
}
