//! Connection/reactor concurrency core.
//!
//! A single reactor thread owns all socket I/O; worker threads drive the
//! protocol layer. The two sides exchange [`TransferBlock`]s through tagged
//! event queues, and a two-phase close protocol guarantees that buffers and
//! sockets are never touched from two threads at once:
//!
//! ```text
//! reactor read ── Read event ──▶ worker: Service::on_bytes
//! worker write_chunk/close ── Write/Close event ──▶ reactor idle tick
//! reactor releases socket ── CloseConfirmed ──▶ reactor removes connection
//! ```
//!
//! [`TransferBlock`]: buffer::TransferBlock

pub mod buffer;
pub mod connection;
pub mod queue;
pub mod reactor;
pub(crate) mod worker;
