use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use mio::Waker;
use tracing::warn;

use crate::server::buffer::TransferBlock;
use crate::server::connection::Connection;

/// A mutex-guarded FIFO shared between the reactor and worker threads.
///
/// `pop` never blocks; it returns `None` when the queue is empty. FIFO order
/// is preserved among events pushed by the same producer. The queue is
/// unbounded: if the consumer falls behind, memory grows without limit (see
/// the crate-level docs).
pub struct EventQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, value: T) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(value);
    }

    pub fn pop(&self) -> Option<T> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Event kinds carried between the reactor and the workers.
///
/// `Read` flows reactor to worker only and carries no payload: it schedules
/// a drain of the connection's own pending input queue. The other kinds flow
/// worker to reactor (or are generated by the reactor itself during
/// teardown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnEventKind {
    Read,
    Write,
    Close,
    CloseConfirmed,
}

pub struct ConnEvent {
    pub conn: Connection,
    pub kind: ConnEventKind,
    pub block: Option<TransferBlock>,
}

impl ConnEvent {
    pub fn new(conn: Connection, kind: ConnEventKind) -> Self {
        Self {
            conn,
            kind,
            block: None,
        }
    }

    pub fn with_block(conn: Connection, kind: ConnEventKind, block: TransferBlock) -> Self {
        Self {
            conn,
            kind,
            block: Some(block),
        }
    }
}

/// The reactor-bound queue paired with the waker that interrupts the poll,
/// so pushed events are drained on the next idle tick rather than on the
/// next socket event.
pub(crate) struct Outbound {
    queue: EventQueue<ConnEvent>,
    waker: Waker,
}

impl Outbound {
    pub(crate) fn new(waker: Waker) -> Self {
        Self {
            queue: EventQueue::new(),
            waker,
        }
    }

    pub(crate) fn send(&self, event: ConnEvent) {
        self.queue.push(event);
        if let Err(e) = self.waker.wake() {
            warn!("failed to wake reactor: {}", e);
        }
    }

    pub(crate) fn pop(&self) -> Option<ConnEvent> {
        self.queue.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_on_empty_queue_returns_none() {
        let queue: EventQueue<u32> = EventQueue::new();
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn fifo_order_is_preserved() {
        let queue = EventQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert!(queue.pop().is_none());
    }
}
