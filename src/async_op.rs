//! Resumable operations and the FIFO queue that runs them

use std::collections::VecDeque;

use crate::error::Result;

/// An operation that makes progress in steps
///
/// `advance()` does as much work as possible without blocking on a
/// non-blocking stream. `WouldBlock` leaves partial progress in the session
/// buffers and makes `advance()` return `Ok(false)`.
pub trait AsyncOp {
    fn is_completed(&self) -> bool;

    /// Returns `Ok(true)` once the operation has completed
    fn advance(&mut self) -> Result<bool>;

    /// Drive the operation to completion
    ///
    /// Spins on a non-blocking stream; meant for blocking streams.
    fn wait(&mut self) -> Result<()> {
        while !self.is_completed() {
            if self.advance()? {
                break;
            }
        }
        Ok(())
    }

    /// Abandon the operation, consuming whatever it still expects from the server
    fn cancel(&mut self) -> Result<()>;
}

/// Strict FIFO of pending sub-operations
///
/// Only the front operation is advanced. An error clears the remaining
/// operations, since none of them can make sense of the stream anymore.
#[derive(Debug)]
pub struct OpQueue<T> {
    ops: VecDeque<T>,
}

impl<T> Default for OpQueue<T> {
    fn default() -> Self {
        Self {
            ops: VecDeque::new(),
        }
    }
}

impl<T> OpQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: T) {
        self.ops.push_back(op);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn front(&self) -> Option<&T> {
        self.ops.front()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Advance the front operation with `step`
    ///
    /// `step` returns `Ok(true)` when the operation it was given is finished;
    /// it is then popped. Returns `Ok(true)` when the queue is empty.
    pub fn advance_with<F>(&mut self, step: F) -> Result<bool>
    where
        F: FnOnce(&mut T) -> Result<bool>,
    {
        let Some(front) = self.ops.front_mut() else {
            return Ok(true);
        };
        match step(front) {
            Ok(true) => {
                self.ops.pop_front();
                Ok(self.ops.is_empty())
            }
            Ok(false) => Ok(false),
            Err(e) => {
                self.ops.clear();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Completes after `remaining` steps
    #[derive(Debug)]
    struct Countdown {
        name: &'static str,
        remaining: u32,
    }

    fn countdown(name: &'static str, remaining: u32) -> Countdown {
        Countdown { name, remaining }
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = OpQueue::new();
        queue.push(countdown("send", 1));
        queue.push(countdown("metadata", 2));

        let mut log = Vec::new();
        loop {
            let empty = queue
                .advance_with(|op| {
                    log.push(op.name);
                    op.remaining -= 1;
                    Ok(op.remaining == 0)
                })
                .unwrap();
            if empty {
                break;
            }
        }
        assert_eq!(log, vec!["send", "metadata", "metadata"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_error_clears_queue() {
        let mut queue = OpQueue::new();
        queue.push(countdown("a", 1));
        queue.push(countdown("b", 1));
        let result = queue.advance_with(|_| Err(Error::UsageError("boom")));
        assert!(matches!(result, Err(Error::UsageError("boom"))));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_queue_is_done() {
        let mut queue: OpQueue<Countdown> = OpQueue::new();
        assert!(queue.advance_with(|_| Ok(false)).unwrap());
    }

    struct Steps {
        left: u32,
        cancelled: bool,
    }

    impl AsyncOp for Steps {
        fn is_completed(&self) -> bool {
            self.left == 0
        }

        fn advance(&mut self) -> Result<bool> {
            self.left = self.left.saturating_sub(1);
            Ok(self.left == 0)
        }

        fn cancel(&mut self) -> Result<()> {
            self.cancelled = true;
            self.left = 0;
            Ok(())
        }
    }

    #[test]
    fn test_wait_drives_to_completion() {
        let mut op = Steps {
            left: 3,
            cancelled: false,
        };
        op.wait().unwrap();
        assert!(op.is_completed());

        let mut op = Steps {
            left: 3,
            cancelled: false,
        };
        op.cancel().unwrap();
        assert!(op.cancelled && op.is_completed());
    }
}
