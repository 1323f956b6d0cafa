use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::async_op::AsyncOp;
use crate::diagnostics::{DiagnosticArena, DiagnosticEntry, Severity};
use crate::error::{Error, Result};
use crate::protocol::command::result::ReplyState;
use crate::protocol::r#trait::TrxEvent;
use crate::sync::session::{SessionCore, lock};
use crate::sync::stream::Transport;

/// The server's answer to one command
///
/// Server errors do not fail the calls that read them; they are recorded in
/// the reply's diagnostics. Dropping a reply discards its unread results
/// unless a cursor is still open on it.
pub struct Reply<S: Transport> {
    pub(crate) core: Rc<RefCell<SessionCore<S>>>,
    pub(crate) id: u64,
    pub(crate) state: Rc<RefCell<ReplyState>>,
}

impl<S: Transport> Reply<S> {
    pub(crate) fn new(core: Rc<RefCell<SessionCore<S>>>, id: u64, state: Rc<RefCell<ReplyState>>) -> Self {
        Self { core, id, state }
    }

    /// Whether the session still reads this reply
    ///
    /// A reply stops being current when it is discarded or a newer command is sent.
    pub fn is_current(&self) -> bool {
        self.core
            .try_borrow()
            .map(|core| core.reply_id == Some(self.id))
            .unwrap_or(false)
    }

    /// Wait for the next result set
    ///
    /// `false` once the server answered with an error or has no further result set.
    pub fn has_results(&self) -> Result<bool> {
        if self.state.borrow().error {
            return Ok(false);
        }
        lock(&self.core)?.has_results(self.id)
    }

    /// Drain the next result set without reading it
    pub fn skip_result(&self) -> Result<()> {
        if lock(&self.core)?.cursor.is_some() {
            return Err(Error::UsageError("Cursor in usage!"));
        }
        if !self.has_results()? {
            return Ok(());
        }
        let mut core = lock(&self.core)?;
        core.open_cursor()?;
        core.close_cursor()
    }

    /// Read and drop everything left of this reply
    pub fn discard(&mut self) -> Result<()> {
        let mut core = lock(&self.core)?;
        if core.reply_id != Some(self.id) {
            return Ok(());
        }
        if core.cursor.is_some() {
            return Err(Error::UsageError("Cursor in usage!"));
        }
        core.discard_reply()
    }

    pub fn diagnostics(&self) -> Ref<'_, DiagnosticArena> {
        Ref::map(self.state.borrow(), |state| &state.diagnostics)
    }

    pub fn entry_count(&self, level: Severity) -> usize {
        self.state.borrow().diagnostics.entry_count(level)
    }

    pub fn entries(&self, level: Severity) -> Vec<DiagnosticEntry> {
        self.state
            .borrow()
            .diagnostics
            .entries(level)
            .cloned()
            .collect()
    }

    /// The first error the server reported for this command
    pub fn get_error(&self) -> Result<DiagnosticEntry> {
        self.state.borrow().diagnostics.get_error().cloned()
    }

    fn completed_state(&self) -> Result<Ref<'_, ReplyState>> {
        let state = self.state.borrow();
        if !state.executed {
            return Err(Error::UsageError(
                "only available after the statement completed",
            ));
        }
        Ok(state)
    }

    pub fn affected_rows(&self) -> Result<u64> {
        Ok(self.completed_state()?.affected_rows)
    }

    /// `AUTO_INCREMENT` value generated by the statement, if any
    pub fn last_insert_id(&self) -> Result<Option<u64>> {
        Ok(self.completed_state()?.last_insert_id)
    }

    /// Informational message of the statement, e.g. `Rows matched: 1  Changed: 1`
    pub fn produced_message(&self) -> Result<Option<String>> {
        Ok(self.completed_state()?.produced_message.clone())
    }

    /// Rows found by the statement, when the server reported it
    pub fn found_rows(&self) -> Result<Option<u64>> {
        Ok(self.completed_state()?.found_rows)
    }

    /// Rows matched by an `UPDATE`, when the server reported it
    pub fn matched_rows(&self) -> Result<Option<u64>> {
        Ok(self.completed_state()?.matched_rows)
    }

    /// Default schema after a `USE` in this command
    pub fn current_schema(&self) -> Option<String> {
        self.state.borrow().current_schema.clone()
    }

    /// The server reported the account password as expired
    pub fn account_expired(&self) -> bool {
        self.state.borrow().account_expired
    }

    /// Transaction commits and rollbacks the command caused, in order
    pub fn trx_events(&self) -> Vec<TrxEvent> {
        self.state.borrow().trx_events.clone()
    }
}

impl<S: Transport> AsyncOp for Reply<S> {
    fn is_completed(&self) -> bool {
        self.core
            .try_borrow()
            .map(|core| core.reply_id != Some(self.id) || core.ops.is_empty())
            .unwrap_or(false)
    }

    fn advance(&mut self) -> Result<bool> {
        let mut core = lock(&self.core)?;
        if core.reply_id != Some(self.id) {
            return Ok(true);
        }
        core.advance_ops()
    }

    /// Replies cannot be stopped on the wire; cancelling reads and drops the rest
    fn cancel(&mut self) -> Result<()> {
        self.discard()
    }
}

impl<S: Transport> Drop for Reply<S> {
    fn drop(&mut self) {
        let Ok(mut core) = lock(&self.core) else {
            return;
        };
        if core.reply_id != Some(self.id) || core.cursor.is_some() {
            return;
        }
        if let Err(e) = core.discard_reply() {
            tracing::warn!(error = %e, "failed to discard reply");
        }
    }
}
