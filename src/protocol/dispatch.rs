//! Routing of decoded server messages to processor callbacks
//!
//! Every reply phase accepts a fixed set of message kinds. Notices are
//! accepted everywhere, an `Error` completes the phase, and any other kind
//! fails with [`Error::UnexpectedMessage`].

use crate::constant::SessionStateParam;
use crate::error::{Error, Result};
use crate::protocol::datatypes::Scalar;
use crate::protocol::message::{Row, ServerMessage};
use crate::protocol::notice::{Notice, NoticeFrame};
use crate::protocol::r#trait::{
    AuthProcessor, MetadataProcessor, Processor, ReplyProcessor, RowProcessor, RowStat,
    RowsProcessor, SessionStateProcessor, StmtProcessor, TrxEvent,
};

/// Outcome of dispatching one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Message consumed, the phase goes on
    Continue,
    /// Message consumed, the phase is finished
    Done,
    /// The phase is finished and the message belongs to the next one; do not consume it
    Stop,
}

/// Notice and Error handling common to all phases
fn dispatch_common<P: Processor>(
    phase: &'static str,
    msg: &ServerMessage<'_>,
    prc: &mut P,
) -> Result<Step> {
    match msg {
        ServerMessage::Notice(frame) => {
            prc.notice(frame)?;
            Ok(Step::Continue)
        }
        ServerMessage::Error(err) => {
            prc.error(err)?;
            Ok(Step::Done)
        }
        other => Err(Error::UnexpectedMessage {
            phase,
            actual: other.kind(),
        }),
    }
}

pub fn dispatch_auth<P: AuthProcessor>(msg: &ServerMessage<'_>, prc: &mut P) -> Result<Step> {
    match msg {
        ServerMessage::AuthenticateContinue(challenge) => {
            prc.auth_continue(challenge.auth_data)?;
            Ok(Step::Done)
        }
        ServerMessage::AuthenticateOk(ok) => {
            prc.auth_ok(ok.auth_data)?;
            Ok(Step::Done)
        }
        _ => dispatch_common("authenticating", msg, prc),
    }
}

pub fn dispatch_reply<P: ReplyProcessor>(msg: &ServerMessage<'_>, prc: &mut P) -> Result<Step> {
    match msg {
        ServerMessage::Ok(ok) => {
            prc.ok(ok.msg)?;
            Ok(Step::Done)
        }
        _ => dispatch_common("waiting for Ok", msg, prc),
    }
}

pub fn dispatch_metadata<P: MetadataProcessor>(
    msg: &ServerMessage<'_>,
    prc: &mut P,
) -> Result<Step> {
    match msg {
        ServerMessage::ColumnMetaData(col) => {
            prc.column(col)?;
            Ok(Step::Continue)
        }
        ServerMessage::Row(_)
        | ServerMessage::FetchDone
        | ServerMessage::FetchDoneMoreResultsets
        | ServerMessage::FetchDoneMoreOutParams
        | ServerMessage::StmtExecuteOk => Ok(Step::Stop),
        _ => dispatch_common("reading column metadata", msg, prc),
    }
}

pub fn dispatch_rows<P: RowsProcessor>(msg: &ServerMessage<'_>, prc: &mut P) -> Result<Step> {
    match msg {
        ServerMessage::Row(row) => {
            prc.row(row)?;
            Ok(Step::Continue)
        }
        ServerMessage::FetchDone => {
            prc.fetch_done(false)?;
            Ok(Step::Done)
        }
        ServerMessage::FetchDoneMoreResultsets | ServerMessage::FetchDoneMoreOutParams => {
            prc.fetch_done(true)?;
            Ok(Step::Done)
        }
        _ => dispatch_common("reading rows", msg, prc),
    }
}

pub fn dispatch_stmt_reply<P: StmtProcessor>(
    msg: &ServerMessage<'_>,
    prc: &mut P,
) -> Result<Step> {
    match msg {
        ServerMessage::StmtExecuteOk => {
            prc.execute_ok()?;
            Ok(Step::Done)
        }
        _ => dispatch_common("waiting for StmtExecuteOk", msg, prc),
    }
}

/// Feed the fields of one row through the per-field callbacks
///
/// Returns `false` if the processor declined the row in `row_begin`.
pub fn deliver_row<P: RowProcessor>(row: &Row<'_>, index: u64, prc: &mut P) -> Result<bool> {
    if !prc.row_begin(index)? {
        return Ok(false);
    }
    for (pos, field) in row.fields.iter().enumerate() {
        if field.is_empty() {
            prc.col_null(pos)?;
            continue;
        }
        let len = field.len();
        let mut window = prc.col_begin(pos, len)?;
        let mut offset = 0;
        while window > 0 && offset < len {
            let end = offset.saturating_add(window).min(len);
            window = prc.col_data(pos, &field[offset..end])?;
            offset = end;
        }
        prc.col_end(pos, len)?;
    }
    prc.row_end(index)?;
    Ok(true)
}

/// Route a `SessionStateChanged` notice to `prc`
///
/// Returns `false` when the notice is of another type.
pub fn dispatch_session_state<P: SessionStateProcessor>(
    frame: &NoticeFrame<'_>,
    prc: &mut P,
) -> Result<bool> {
    let Notice::SessionStateChanged { param, values } = Notice::parse(frame)? else {
        return Ok(false);
    };
    let first = values.first();
    let number = first.and_then(Scalar::as_u64).unwrap_or(0);
    let text = first.and_then(Scalar::as_bytes).unwrap_or_default();

    match SessionStateParam::from_u32(param) {
        Some(SessionStateParam::ClientIdAssigned) => prc.client_id(number)?,
        Some(SessionStateParam::AccountExpired) => prc.account_expired()?,
        Some(SessionStateParam::CurrentSchema) => prc.current_schema(text)?,
        Some(SessionStateParam::GeneratedInsertId) => prc.last_insert_id(number)?,
        Some(SessionStateParam::RowsAffected) => prc.row_stats(RowStat::Affected, number)?,
        Some(SessionStateParam::RowsFound) => prc.row_stats(RowStat::Found, number)?,
        Some(SessionStateParam::RowsMatched) => prc.row_stats(RowStat::Matched, number)?,
        Some(SessionStateParam::TrxCommitted) => prc.trx_event(TrxEvent::Commit)?,
        Some(SessionStateParam::TrxRolledback) => prc.trx_event(TrxEvent::Rollback)?,
        Some(SessionStateParam::ProducedMessage) => prc.produced_message(text)?,
        None => tracing::debug!(param, "ignoring unknown session state parameter"),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::ServerMessageType;
    use crate::protocol::message::{ColumnMetaData, ErrorMsg};

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Processor for Recorder {
        fn error(&mut self, err: &ErrorMsg<'_>) -> Result<()> {
            self.events.push(format!("error {}", err.code));
            Ok(())
        }

        fn notice(&mut self, frame: &NoticeFrame<'_>) -> Result<()> {
            self.events.push(format!("notice {}", frame.notice_type));
            Ok(())
        }
    }

    impl MetadataProcessor for Recorder {
        fn column(&mut self, col: &ColumnMetaData<'_>) -> Result<()> {
            self.events.push(format!("column {}", col.column_type));
            Ok(())
        }
    }

    impl RowsProcessor for Recorder {
        fn row(&mut self, row: &Row<'_>) -> Result<()> {
            self.events.push(format!("row {}", row.fields.len()));
            Ok(())
        }

        fn fetch_done(&mut self, more_results: bool) -> Result<()> {
            self.events.push(format!("done {more_results}"));
            Ok(())
        }
    }

    impl RowProcessor for Recorder {
        fn row_begin(&mut self, row: u64) -> Result<bool> {
            self.events.push(format!("begin {row}"));
            Ok(true)
        }

        fn row_end(&mut self, row: u64) -> Result<()> {
            self.events.push(format!("end {row}"));
            Ok(())
        }

        fn col_null(&mut self, pos: usize) -> Result<()> {
            self.events.push(format!("null {pos}"));
            Ok(())
        }

        fn col_begin(&mut self, pos: usize, data_len: usize) -> Result<usize> {
            self.events.push(format!("col {pos} len {data_len}"));
            Ok(2)
        }

        fn col_data(&mut self, pos: usize, data: &[u8]) -> Result<usize> {
            self.events
                .push(format!("data {pos} {}", String::from_utf8_lossy(data)));
            Ok(2)
        }
    }

    #[test]
    fn test_metadata_phase_stops_before_rows() {
        let mut prc = Recorder::default();
        let col = ServerMessage::ColumnMetaData(ColumnMetaData {
            column_type: 7,
            ..Default::default()
        });
        assert_eq!(dispatch_metadata(&col, &mut prc).unwrap(), Step::Continue);
        let row = ServerMessage::Row(Row::default());
        assert_eq!(dispatch_metadata(&row, &mut prc).unwrap(), Step::Stop);
        assert_eq!(
            dispatch_metadata(&ServerMessage::StmtExecuteOk, &mut prc).unwrap(),
            Step::Stop
        );
        assert_eq!(prc.events, vec!["column 7"]);
    }

    #[test]
    fn test_error_completes_phase() {
        let mut prc = Recorder::default();
        let err = ServerMessage::Error(ErrorMsg {
            code: 1146,
            ..Default::default()
        });
        assert_eq!(dispatch_rows(&err, &mut prc).unwrap(), Step::Done);
        assert_eq!(prc.events, vec!["error 1146"]);
    }

    #[test]
    fn test_notice_accepted_in_every_phase() {
        let mut prc = Recorder::default();
        let notice = ServerMessage::Notice(NoticeFrame {
            notice_type: 1,
            scope: crate::protocol::notice::NoticeScope::Local,
            payload: &[],
        });
        assert_eq!(dispatch_metadata(&notice, &mut prc).unwrap(), Step::Continue);
        assert_eq!(dispatch_rows(&notice, &mut prc).unwrap(), Step::Continue);
        assert_eq!(prc.events.len(), 2);
    }

    #[test]
    fn test_out_of_phase_message_is_rejected() {
        let mut prc = Recorder::default();
        let result = dispatch_rows(&ServerMessage::StmtExecuteOk, &mut prc);
        assert!(matches!(
            result,
            Err(Error::UnexpectedMessage {
                actual: ServerMessageType::StmtExecuteOk,
                ..
            })
        ));

        let result = dispatch_metadata(&ServerMessage::FetchSuspended, &mut prc);
        assert!(matches!(result, Err(Error::UnexpectedMessage { .. })));
    }

    #[test]
    fn test_deliver_row_in_windows() {
        let mut prc = Recorder::default();
        let row = Row {
            fields: vec![&b"abcde"[..], &b""[..]],
        };
        assert!(deliver_row(&row, 4, &mut prc).unwrap());
        assert_eq!(
            prc.events,
            vec![
                "begin 4",
                "col 0 len 5",
                "data 0 ab",
                "data 0 cd",
                "data 0 e",
                "null 1",
                "end 4",
            ]
        );
    }

    #[test]
    fn test_session_state_routing() {
        #[derive(Default)]
        struct State {
            client_id: u64,
            affected: u64,
        }
        impl SessionStateProcessor for State {
            fn client_id(&mut self, id: u64) -> Result<()> {
                self.client_id = id;
                Ok(())
            }
            fn row_stats(&mut self, stat: RowStat, count: u64) -> Result<()> {
                if stat == RowStat::Affected {
                    self.affected = count;
                }
                Ok(())
            }
        }

        let mut state = State::default();
        for (param, value) in [(11u32, 17u64), (4, 3)] {
            let notice = Notice::SessionStateChanged {
                param,
                values: vec![Scalar::Uint(value)],
            };
            let mut payload = Vec::new();
            notice.write_payload(&mut payload);
            let frame = NoticeFrame {
                notice_type: 3,
                scope: crate::protocol::notice::NoticeScope::Local,
                payload: &payload,
            };
            assert!(dispatch_session_state(&frame, &mut state).unwrap());
        }
        assert_eq!(state.client_id, 17);
        assert_eq!(state.affected, 3);
    }
}
