use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::error;

use crate::server::buffer::TransferBlock;
use crate::server::queue::{ConnEvent, ConnEventKind, EventQueue, Outbound};

/// Per-connection protocol logic the reactor dispatches into.
///
/// Implementations own all protocol state for one socket. `on_bytes` runs on
/// a worker thread (or on the reactor thread in inline mode) with the bytes
/// the reactor read; `on_close` runs on the reactor thread once the socket
/// handle has been released.
pub trait Service: Send {
    fn on_bytes(&mut self, conn: &Connection, data: TransferBlock);

    fn on_close(&mut self) {}
}

/// The narrow write surface handed to response builders: enqueue outbound
/// bytes and request connection close. Implemented by [`Connection`]; tests
/// substitute an in-memory sink.
pub trait ChunkSink {
    fn write_chunk(&self, block: TransferBlock);

    fn close(&self);
}

/// Handle to one accepted socket.
///
/// The socket itself lives on the reactor thread; this handle only carries
/// the connection id, the close state machine and the protocol [`Service`].
/// Cloning is cheap and the clone refers to the same connection.
///
/// State machine: `Open -> Closing -> Closed`. `close()` flips the `closing`
/// flag exactly once and enqueues a single Close event; the transition to
/// `Closed` happens on the reactor thread after the close-flagged write
/// completes and the socket handle is released.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnInner>,
}

struct ConnInner {
    id: usize,
    closing: AtomicBool,
    close_notified: AtomicBool,
    /// Input blocks read but not yet fed to the service, in read order.
    pending: EventQueue<TransferBlock>,
    /// Drain token: true while one thread owns the right to drain `pending`.
    scheduled: AtomicBool,
    outbound: Arc<Outbound>,
    service: Mutex<Box<dyn Service>>,
}

impl Connection {
    pub(crate) fn new(id: usize, outbound: Arc<Outbound>, service: Box<dyn Service>) -> Self {
        Self {
            inner: Arc::new(ConnInner {
                id,
                closing: AtomicBool::new(false),
                close_notified: AtomicBool::new(false),
                pending: EventQueue::new(),
                scheduled: AtomicBool::new(false),
                outbound,
                service: Mutex::new(service),
            }),
        }
    }

    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// Enqueues bytes for transmission. Safe to call from any thread; the
    /// actual write syscall happens on the reactor's idle tick. Empty blocks
    /// are dropped rather than enqueued.
    pub fn write_chunk(&self, block: TransferBlock) {
        if block.is_empty() {
            return;
        }
        self.inner
            .outbound
            .send(ConnEvent::with_block(self.clone(), ConnEventKind::Write, block));
    }

    /// Requests connection close. Idempotent: only the first call enqueues a
    /// Close event, subsequent calls are no-ops.
    pub fn close(&self) {
        if self
            .inner
            .closing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.inner
                .outbound
                .send(ConnEvent::new(self.clone(), ConnEventKind::Close));
        }
    }

    pub fn is_closing(&self) -> bool {
        self.inner.closing.load(Ordering::SeqCst)
    }

    /// Marks the connection closing without enqueueing a Close event. Used by
    /// the reactor when it tears the socket down itself on EOF or I/O error.
    pub(crate) fn mark_closing(&self) {
        self.inner.closing.store(true, Ordering::SeqCst);
    }

    /// Queues one block of input. Returns true when the caller must schedule
    /// a drain; while a drain is already scheduled the block simply joins the
    /// pending queue and keeps its place in line.
    pub(crate) fn enqueue_input(&self, block: TransferBlock) -> bool {
        self.inner.pending.push(block);
        self.inner
            .scheduled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Drains the pending input into the protocol service.
    ///
    /// The `scheduled` flag is a drain token: only the thread whose
    /// `enqueue_input` (or the compare-exchange below) claimed it runs here,
    /// so blocks reach `on_bytes` strictly in the order the reactor read
    /// them, whatever the pool size. A handler panic drops that block only;
    /// the drain continues.
    pub(crate) fn drain_input(&self) {
        loop {
            while let Some(block) = self.inner.pending.pop() {
                let mut service = self
                    .inner
                    .service
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if catch_unwind(AssertUnwindSafe(|| service.on_bytes(self, block))).is_err() {
                    error!("[{}] handler panicked, input block dropped", self.id());
                }
            }
            self.inner.scheduled.store(false, Ordering::SeqCst);
            // A block may have slipped in between the final pop and the token
            // release. Reclaim the token and keep draining, unless the
            // producer already scheduled a new drain for it.
            if self.inner.pending.is_empty()
                || self
                    .inner
                    .scheduled
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
            {
                return;
            }
        }
    }

    /// Called on the reactor thread after the socket handle is released.
    /// Enqueues CloseConfirmed so the live-set mutation still happens on the
    /// idle tick; guarded so teardown races produce exactly one confirmation.
    pub(crate) fn notify_closed(&self) {
        if self
            .inner
            .close_notified
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.inner
                .service
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .on_close();
            self.inner
                .outbound
                .send(ConnEvent::new(self.clone(), ConnEventKind::CloseConfirmed));
        }
    }
}

impl ChunkSink for Connection {
    fn write_chunk(&self, block: TransferBlock) {
        Connection::write_chunk(self, block);
    }

    fn close(&self) {
        Connection::close(self);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("closing", &self.is_closing())
            .finish()
    }
}
