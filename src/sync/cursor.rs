use std::cell::RefCell;
use std::rc::Rc;

use crate::async_op::AsyncOp;
use crate::col::{ColumnMetadata, Format, LogicalType};
use crate::error::{Error, Result};
use crate::protocol::command::result::{ReplySink, ReplyState, RowsReader};
use crate::protocol::r#trait::RowProcessor;
use crate::sync::reply::Reply;
use crate::sync::session::{SessionCore, lock};
use crate::sync::stream::Transport;

/// Row reader for one result set of a reply
///
/// Only one cursor can be open per session. Closing or dropping the cursor
/// reads and drops the rows it did not deliver.
pub struct Cursor<S: Transport> {
    core: Rc<RefCell<SessionCore<S>>>,
    id: u64,
    reply: Rc<RefCell<ReplyState>>,
    columns: Vec<ColumnMetadata>,
    closed: bool,
}

impl<S: Transport> Cursor<S> {
    /// Open a cursor on the next result set of `reply`
    ///
    /// Fails with the server error if the reply recorded one instead of a
    /// result set.
    pub fn new(reply: &Reply<S>) -> Result<Self> {
        if lock(&reply.core)?.cursor.is_some() {
            return Err(Error::UsageError(
                "Only one cursor can be open on a session",
            ));
        }
        if !reply.has_results()? {
            if let Ok(entry) = reply.get_error() {
                return Err(entry.error.into());
            }
            return Err(Error::UsageError("No results when creating cursor"));
        }
        let (id, columns) = lock(&reply.core)?.open_cursor()?;
        Ok(Self {
            core: Rc::clone(&reply.core),
            id,
            reply: Rc::clone(&reply.state),
            columns,
            closed: false,
        })
    }

    fn check_open(&self, core: &SessionCore<S>) -> Result<()> {
        if self.closed || core.cursor != Some(self.id) {
            return Err(Error::UsageError("Cursor is closed"));
        }
        Ok(())
    }

    fn fetch<P: RowProcessor>(&mut self, prc: P, limit: Option<u64>) -> Result<RowFetch<'_, S, P>> {
        let more_rows = {
            let core = lock(&self.core)?;
            self.check_open(&core)?;
            core.more_rows
        };
        let mut reader = RowsReader::new(ReplySink(Rc::clone(&self.reply)), prc, limit);
        if !more_rows {
            reader.processor_mut().end_of_data()?;
        }
        Ok(RowFetch {
            cursor: self,
            reader,
            done: !more_rows,
        })
    }

    /// Stream all remaining rows to `prc`
    ///
    /// Nothing is read until the returned operation is advanced.
    pub fn get_rows<P: RowProcessor>(&mut self, prc: P) -> Result<RowFetch<'_, S, P>> {
        self.fetch(prc, None)
    }

    /// Stream at most `limit` rows to `prc`
    ///
    /// Row indices passed to `prc` start at 0 on every fetch.
    pub fn get_rows_limited<P: RowProcessor>(
        &mut self,
        prc: P,
        limit: u64,
    ) -> Result<RowFetch<'_, S, P>> {
        self.fetch(prc, Some(limit))
    }

    /// Read until `prc` accepts a row; `false` if the result set ended first
    pub fn get_row<P: RowProcessor>(&mut self, prc: P) -> Result<bool> {
        let mut fetch = self.fetch(prc, Some(1))?;
        fetch.wait()?;
        Ok(fetch.rows_delivered() == 1)
    }

    /// Drop undelivered rows and release the session for the next result set
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut core = lock(&self.core)?;
        if core.cursor != Some(self.id) {
            return Ok(());
        }
        core.close_cursor()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn column(&self, pos: usize) -> Result<&ColumnMetadata> {
        self.columns
            .get(pos)
            .ok_or(Error::UsageError("column position out of range"))
    }

    pub fn logical_type(&self, pos: usize) -> Result<LogicalType> {
        Ok(self.column(pos)?.logical_type())
    }

    pub fn format(&self, pos: usize) -> Result<Format> {
        Ok(self.column(pos)?.format())
    }
}

impl<S: Transport> Drop for Cursor<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close cursor");
        }
    }
}

/// A pending row fetch started by [`Cursor::get_rows`]
pub struct RowFetch<'c, S: Transport, P: RowProcessor> {
    cursor: &'c mut Cursor<S>,
    reader: RowsReader<P>,
    done: bool,
}

impl<S: Transport, P: RowProcessor> RowFetch<'_, S, P> {
    /// Row messages read so far, including rows `row_begin` declined
    pub fn rows_read(&self) -> u64 {
        self.reader.rows_read()
    }

    /// Rows accepted by the processor so far
    pub fn rows_delivered(&self) -> u64 {
        self.reader.rows_delivered()
    }

    pub fn processor_mut(&mut self) -> &mut P {
        self.reader.processor_mut()
    }
}

impl<S: Transport, P: RowProcessor> AsyncOp for RowFetch<'_, S, P> {
    fn is_completed(&self) -> bool {
        self.done
    }

    #[tracing::instrument(skip_all)]
    fn advance(&mut self) -> Result<bool> {
        if self.done {
            return Ok(true);
        }
        let mut core = lock(&self.cursor.core)?;
        self.cursor.check_open(&core)?;
        self.done = core.fetch_rows(&mut self.reader)?;
        Ok(self.done)
    }

    /// Stops delivering rows and closes the cursor
    fn cancel(&mut self) -> Result<()> {
        self.done = true;
        self.cursor.close()
    }
}
