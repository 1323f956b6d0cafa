//! Processors for the phases of a statement reply
//!
//! A reply to `StmtExecute` is read in three phases, each handled by its own
//! processor: column metadata, rows, and the final `StmtExecuteOk`. Errors
//! and notices seen in any phase land in the shared [`ReplyState`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::col::ColumnMetadata;
use crate::diagnostics::{DiagnosticArena, Severity};
use crate::error::{Result, ServerError};
use crate::protocol::dispatch::{deliver_row, dispatch_session_state};
use crate::protocol::message::{ColumnMetaData, ErrorMsg, Row};
use crate::protocol::notice::{Notice, NoticeFrame};
use crate::protocol::r#trait::{
    MetadataProcessor, Processor, ReplyProcessor, RowProcessor, RowStat, RowsProcessor,
    SessionStateProcessor, StmtProcessor, TrxEvent,
};

/// What the server reported about one reply
#[derive(Debug, Default)]
pub struct ReplyState {
    pub diagnostics: DiagnosticArena,
    /// An `Error` message ended the reply
    pub error: bool,
    /// The final `Ok` or `StmtExecuteOk` arrived
    pub executed: bool,
    pub affected_rows: u64,
    pub found_rows: Option<u64>,
    pub matched_rows: Option<u64>,
    pub last_insert_id: Option<u64>,
    pub produced_message: Option<String>,
    pub current_schema: Option<String>,
    /// The account password expired; only password changes are allowed
    pub account_expired: bool,
    pub trx_events: Vec<TrxEvent>,
}

impl ReplyState {
    pub fn record_error(&mut self, err: &ErrorMsg<'_>) {
        tracing::debug!(code = err.code, sql_state = err.sql_state, "server error");
        self.error = true;
        self.diagnostics
            .add_entry(Severity::Error, ServerError::from(err));
    }

    /// Warnings become diagnostic entries, session state changes update the statistics
    pub fn record_notice(&mut self, frame: &NoticeFrame<'_>) -> Result<()> {
        match Notice::parse(frame)? {
            Notice::Warning { level, code, msg } => {
                self.diagnostics.add_entry(
                    Severity::from_warning_level(level),
                    ServerError::new(code, level, "", msg),
                );
            }
            Notice::SessionStateChanged { .. } => {
                dispatch_session_state(frame, self)?;
            }
            Notice::SessionVariableChanged { param, .. } => {
                tracing::trace!(param, "session variable changed");
            }
            Notice::Other(notice_type) => {
                tracing::trace!(notice_type, "ignoring notice");
            }
        }
        Ok(())
    }
}

impl SessionStateProcessor for ReplyState {
    fn account_expired(&mut self) -> Result<()> {
        self.account_expired = true;
        Ok(())
    }

    fn current_schema(&mut self, schema: &[u8]) -> Result<()> {
        self.current_schema = Some(String::from_utf8_lossy(schema).into_owned());
        Ok(())
    }

    fn row_stats(&mut self, stat: RowStat, count: u64) -> Result<()> {
        match stat {
            RowStat::Affected => self.affected_rows = count,
            RowStat::Found => self.found_rows = Some(count),
            RowStat::Matched => self.matched_rows = Some(count),
        }
        Ok(())
    }

    fn last_insert_id(&mut self, id: u64) -> Result<()> {
        self.last_insert_id = Some(id);
        Ok(())
    }

    fn trx_event(&mut self, event: TrxEvent) -> Result<()> {
        self.trx_events.push(event);
        Ok(())
    }

    fn produced_message(&mut self, msg: &[u8]) -> Result<()> {
        self.produced_message = Some(String::from_utf8_lossy(msg).into_owned());
        Ok(())
    }
}

/// Records errors and notices into a shared [`ReplyState`]
///
/// The state is borrowed only for the duration of each callback, so
/// callers may inspect it between messages.
#[derive(Debug, Clone)]
pub struct ReplySink(pub Rc<RefCell<ReplyState>>);

impl Processor for ReplySink {
    fn error(&mut self, err: &ErrorMsg<'_>) -> Result<()> {
        self.0.borrow_mut().record_error(err);
        Ok(())
    }

    fn notice(&mut self, frame: &NoticeFrame<'_>) -> Result<()> {
        self.0.borrow_mut().record_notice(frame)
    }
}

impl ReplyProcessor for ReplySink {
    fn ok(&mut self, _msg: &str) -> Result<()> {
        self.0.borrow_mut().executed = true;
        Ok(())
    }
}

impl StmtProcessor for ReplySink {
    fn execute_ok(&mut self) -> Result<()> {
        self.0.borrow_mut().executed = true;
        Ok(())
    }
}

/// Collects the column metadata of one result set
pub struct MetadataReader<'c> {
    pub sink: ReplySink,
    pub columns: &'c mut Vec<ColumnMetadata>,
}

impl Processor for MetadataReader<'_> {
    fn error(&mut self, err: &ErrorMsg<'_>) -> Result<()> {
        self.sink.error(err)
    }

    fn notice(&mut self, frame: &NoticeFrame<'_>) -> Result<()> {
        self.sink.notice(frame)
    }
}

impl MetadataProcessor for MetadataReader<'_> {
    fn column(&mut self, col: &ColumnMetaData<'_>) -> Result<()> {
        self.columns.push(ColumnMetadata::from(col));
        Ok(())
    }
}

/// Feeds `Row` messages to a [`RowProcessor`], counting down an optional limit
///
/// Only rows the processor accepts in `row_begin` count against the limit.
pub struct RowsReader<P> {
    sink: ReplySink,
    prc: P,
    index: u64,
    delivered: u64,
    remaining: Option<u64>,
    /// Set by the closing `FetchDone*`; `true` when another result set follows
    finished: Option<bool>,
}

impl<P: RowProcessor> RowsReader<P> {
    pub fn new(sink: ReplySink, prc: P, limit: Option<u64>) -> Self {
        Self {
            sink,
            prc,
            index: 0,
            delivered: 0,
            remaining: limit,
            finished: None,
        }
    }

    /// Number of row messages seen so far, accepted or not
    pub fn rows_read(&self) -> u64 {
        self.index
    }

    /// Number of rows the processor accepted
    pub fn rows_delivered(&self) -> u64 {
        self.delivered
    }

    pub fn limit_reached(&self) -> bool {
        self.remaining == Some(0)
    }

    pub fn finished(&self) -> Option<bool> {
        self.finished
    }

    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.prc
    }
}

impl<P: RowProcessor> Processor for RowsReader<P> {
    fn error(&mut self, err: &ErrorMsg<'_>) -> Result<()> {
        self.sink.error(err)
    }

    fn notice(&mut self, frame: &NoticeFrame<'_>) -> Result<()> {
        self.sink.notice(frame)
    }
}

impl<P: RowProcessor> RowsProcessor for RowsReader<P> {
    fn row(&mut self, row: &Row<'_>) -> Result<()> {
        let accepted = deliver_row(row, self.index, &mut self.prc)?;
        self.index += 1;
        if accepted {
            self.delivered += 1;
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining = remaining.saturating_sub(1);
            }
        }
        Ok(())
    }

    fn fetch_done(&mut self, more_results: bool) -> Result<()> {
        self.finished = Some(more_results);
        self.prc.end_of_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::{NoticeType, SessionStateParam};
    use crate::protocol::datatypes::Scalar;
    use crate::protocol::dispatch::{Step, dispatch_metadata, dispatch_rows};
    use crate::protocol::message::ServerMessage;
    use crate::protocol::notice::NoticeScope;

    #[derive(Default)]
    struct Strings {
        rows: Vec<(u64, String)>,
        ended: bool,
    }

    impl RowProcessor for Strings {
        fn col_data(&mut self, _pos: usize, data: &[u8]) -> Result<usize> {
            if let Some((_, text)) = self.rows.last_mut() {
                text.push_str(&String::from_utf8_lossy(data));
            }
            Ok(data.len())
        }

        fn row_begin(&mut self, row: u64) -> Result<bool> {
            self.rows.push((row, String::new()));
            Ok(true)
        }

        fn end_of_data(&mut self) -> Result<()> {
            self.ended = true;
            Ok(())
        }
    }

    fn sink() -> ReplySink {
        ReplySink(Rc::new(RefCell::new(ReplyState::default())))
    }

    fn notice_payload(notice: &Notice<'_>) -> Vec<u8> {
        let mut out = Vec::new();
        notice.write_payload(&mut out);
        out
    }

    #[test]
    fn test_limit_counts_down_per_row() {
        let mut reader = RowsReader::new(sink(), Strings::default(), Some(2));
        let row = ServerMessage::Row(Row {
            fields: vec![&b"x\0"[..]],
        });
        assert_eq!(dispatch_rows(&row, &mut reader).unwrap(), Step::Continue);
        assert!(!reader.limit_reached());
        dispatch_rows(&row, &mut reader).unwrap();
        assert!(reader.limit_reached());
        assert_eq!(reader.rows_read(), 2);
        assert_eq!(reader.processor_mut().rows[1].0, 1);
    }

    #[test]
    fn test_declined_rows_do_not_count_against_limit() {
        struct EveryOther(Strings);
        impl RowProcessor for EveryOther {
            fn row_begin(&mut self, row: u64) -> Result<bool> {
                if row % 2 == 0 {
                    return Ok(false);
                }
                self.0.row_begin(row)
            }

            fn col_data(&mut self, pos: usize, data: &[u8]) -> Result<usize> {
                self.0.col_data(pos, data)
            }
        }

        let mut reader = RowsReader::new(sink(), EveryOther(Strings::default()), Some(1));
        let row = ServerMessage::Row(Row {
            fields: vec![&b"x\x00"[..]],
        });
        dispatch_rows(&row, &mut reader).unwrap();
        assert!(!reader.limit_reached());
        assert_eq!(reader.rows_delivered(), 0);
        dispatch_rows(&row, &mut reader).unwrap();
        assert!(reader.limit_reached());
        assert_eq!(reader.rows_read(), 2);
        assert_eq!(reader.rows_delivered(), 1);
    }

    #[test]
    fn test_fetch_done_ends_data() {
        let mut reader = RowsReader::new(sink(), Strings::default(), None);
        assert_eq!(
            dispatch_rows(&ServerMessage::FetchDoneMoreResultsets, &mut reader).unwrap(),
            Step::Done
        );
        assert_eq!(reader.finished(), Some(true));
        assert!(reader.processor_mut().ended);
    }

    #[test]
    fn test_error_in_rows_is_recorded() {
        let sink = sink();
        let mut reader = RowsReader::new(sink.clone(), Strings::default(), None);
        let err = ServerMessage::Error(ErrorMsg {
            code: 1317,
            sql_state: "70100",
            msg: "Query execution was interrupted",
            ..Default::default()
        });
        assert_eq!(dispatch_rows(&err, &mut reader).unwrap(), Step::Done);
        assert_eq!(reader.finished(), None);

        let state = sink.0.borrow();
        assert!(state.error);
        assert_eq!(state.diagnostics.get_error().unwrap().code(), 1317);
    }

    #[test]
    fn test_metadata_reader_collects_columns() {
        let mut columns = Vec::new();
        let mut reader = MetadataReader {
            sink: sink(),
            columns: &mut columns,
        };
        let col = ServerMessage::ColumnMetaData(ColumnMetaData {
            column_type: 7,
            name: b"title",
            collation: 255,
            ..Default::default()
        });
        dispatch_metadata(&col, &mut reader).unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].name, "title");
    }

    #[test]
    fn test_notices_update_state() {
        let mut state = ReplyState::default();

        let warning = notice_payload(&Notice::Warning {
            level: Notice::WARNING_NOTE,
            code: 1051,
            msg: "Unknown table",
        });
        state
            .record_notice(&NoticeFrame {
                notice_type: NoticeType::Warning as u32,
                scope: NoticeScope::Local,
                payload: &warning,
            })
            .unwrap();

        let affected = notice_payload(&Notice::SessionStateChanged {
            param: SessionStateParam::RowsAffected as u32,
            values: vec![Scalar::Uint(3)],
        });
        state
            .record_notice(&NoticeFrame {
                notice_type: NoticeType::SessionStateChanged as u32,
                scope: NoticeScope::Local,
                payload: &affected,
            })
            .unwrap();

        let insert_id = notice_payload(&Notice::SessionStateChanged {
            param: SessionStateParam::GeneratedInsertId as u32,
            values: vec![Scalar::Uint(42)],
        });
        state
            .record_notice(&NoticeFrame {
                notice_type: NoticeType::SessionStateChanged as u32,
                scope: NoticeScope::Local,
                payload: &insert_id,
            })
            .unwrap();

        assert_eq!(state.affected_rows, 3);
        assert_eq!(state.last_insert_id, Some(42));
        assert!(!state.error);
        assert_eq!(state.diagnostics.entry_count(Severity::Info), 1);
        assert_eq!(state.diagnostics.entry_count(Severity::Warning), 0);
        let entry = state.diagnostics.entries(Severity::Info).next().unwrap();
        assert_eq!(entry.code(), 1051);
    }
}
