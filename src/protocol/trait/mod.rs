use auto_impl::auto_impl;

use crate::error::Result;
use crate::protocol::message::{ColumnMetaData, ErrorMsg, Row};
use crate::protocol::notice::NoticeFrame;

/// Callbacks shared by every reply phase
///
/// An `Error` message completes the phase it arrives in. Notices may arrive
/// anywhere and do not change the phase.
#[auto_impl(&mut, Box)]
pub trait Processor {
    fn error(&mut self, err: &ErrorMsg<'_>) -> Result<()>;

    fn notice(&mut self, _frame: &NoticeFrame<'_>) -> Result<()> {
        Ok(())
    }
}

/// Authentication exchange
#[auto_impl(&mut, Box)]
pub trait AuthProcessor: Processor {
    fn auth_continue(&mut self, data: &[u8]) -> Result<()>;
    fn auth_ok(&mut self, data: &[u8]) -> Result<()>;
}

/// Plain `Ok`/`Error` replies such as the answer to `CapabilitiesSet` or `Close`
#[auto_impl(&mut, Box)]
pub trait ReplyProcessor: Processor {
    fn ok(&mut self, msg: &str) -> Result<()>;
}

/// Column metadata of one result set, one call per column in order
#[auto_impl(&mut, Box)]
pub trait MetadataProcessor: Processor {
    fn column(&mut self, col: &ColumnMetaData<'_>) -> Result<()>;
}

/// Raw row messages and the end of a result set
#[auto_impl(&mut, Box)]
pub trait RowsProcessor: Processor {
    fn row(&mut self, row: &Row<'_>) -> Result<()>;

    /// `more_results` is true for `FetchDoneMoreResultsets`
    fn fetch_done(&mut self, more_results: bool) -> Result<()>;
}

/// Final status of a statement
#[auto_impl(&mut, Box)]
pub trait StmtProcessor: Processor {
    fn execute_ok(&mut self) -> Result<()>;
}

/// Per-field row callbacks
///
/// For every row: `row_begin`, then for every column either `col_null` or
/// `col_begin` followed by `col_data` chunks while the returned window is
/// non-zero and then `col_end`, and finally `row_end`. `end_of_data` is called
/// once when the result set has no more rows.
///
/// Row indices restart at 0 on every fetch.
#[auto_impl(&mut, Box)]
pub trait RowProcessor {
    /// Return `false` to skip the fields of this row
    fn row_begin(&mut self, _row: u64) -> Result<bool> {
        Ok(true)
    }

    fn row_end(&mut self, _row: u64) -> Result<()> {
        Ok(())
    }

    fn col_null(&mut self, _pos: usize) -> Result<()> {
        Ok(())
    }

    /// Start of a non-NULL field of `data_len` bytes. Returns how many bytes
    /// the processor wants to receive; 0 skips the data.
    fn col_begin(&mut self, _pos: usize, data_len: usize) -> Result<usize> {
        Ok(data_len)
    }

    /// Returns the size of the window for the next chunk
    fn col_data(&mut self, pos: usize, data: &[u8]) -> Result<usize>;

    fn col_end(&mut self, _pos: usize, _data_len: usize) -> Result<()> {
        Ok(())
    }

    fn end_of_data(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Row statistics reported through `SessionStateChanged` notices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStat {
    Affected,
    Found,
    Matched,
}

/// Transaction events reported through `SessionStateChanged` notices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrxEvent {
    Commit,
    Rollback,
}

/// Session state changes announced by the server
#[auto_impl(&mut, Box)]
pub trait SessionStateProcessor {
    fn client_id(&mut self, _id: u64) -> Result<()> {
        Ok(())
    }

    fn account_expired(&mut self) -> Result<()> {
        Ok(())
    }

    fn current_schema(&mut self, _schema: &[u8]) -> Result<()> {
        Ok(())
    }

    fn row_stats(&mut self, _stat: RowStat, _count: u64) -> Result<()> {
        Ok(())
    }

    fn last_insert_id(&mut self, _id: u64) -> Result<()> {
        Ok(())
    }

    fn trx_event(&mut self, _event: TrxEvent) -> Result<()> {
        Ok(())
    }

    fn produced_message(&mut self, _msg: &[u8]) -> Result<()> {
        Ok(())
    }
}
