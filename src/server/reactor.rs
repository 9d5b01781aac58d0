use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr};
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::server::buffer::TransferBlock;
use crate::server::connection::{Connection, Service};
use crate::server::queue::{ConnEvent, ConnEventKind, EventQueue, Outbound};
use crate::server::worker;

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_CONN_ID: usize = 2;
const READ_CHUNK: usize = 8 * 1024;

/// Creates the protocol service for each accepted socket.
pub type ServiceFactory = Box<dyn Fn() -> Box<dyn Service> + Send>;

struct ConnEntry {
    /// The socket handle. Owned and touched exclusively by the reactor
    /// thread; `None` once the socket has been closed but the connection is
    /// still awaiting CloseConfirmed.
    stream: Option<TcpStream>,
    conn: Connection,
}

/// The event reactor: the single thread that owns the listening socket, all
/// live connection sockets and every socket syscall.
///
/// Workers communicate with it only through the event queues. Once per loop
/// iteration the idle tick drains the outbound queue, performing the queued
/// writes and closes and retiring connections whose close was confirmed.
pub struct Server {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    local_addr: SocketAddr,
    outbound: Arc<Outbound>,
    inbound: Arc<EventQueue<ConnEvent>>,
    conns: HashMap<usize, ConnEntry>,
    next_id: usize,
    worker_threads: usize,
    factory: Option<ServiceFactory>,
}

impl Server {
    /// Binds the listening socket and sets up the readiness loop. Any
    /// failure here is fatal to startup.
    pub fn bind(config: &ServerConfig) -> anyhow::Result<Self> {
        let addr: SocketAddr = config
            .addr()
            .parse()
            .with_context(|| format!("can't parse listen address {:?}", config.addr()))?;

        let mut listener = TcpListener::bind(addr)
            .with_context(|| format!("can't bind tcp port {}", addr))?;
        let local_addr = listener.local_addr().context("can't read bound address")?;

        let poll = Poll::new().context("can't init event loop")?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .context("can't listen on tcp port")?;
        let waker = Waker::new(poll.registry(), WAKER).context("can't create reactor waker")?;

        info!("Listening on {}", local_addr);

        Ok(Self {
            poll,
            events: Events::with_capacity(1024),
            listener,
            local_addr,
            outbound: Arc::new(Outbound::new(waker)),
            inbound: Arc::new(EventQueue::new()),
            conns: HashMap::new(),
            next_id: FIRST_CONN_ID,
            worker_threads: config.worker_threads,
            factory: None,
        })
    }

    /// The address actually bound, useful when the configured port is 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Registers the factory invoked once per accepted socket.
    pub fn service_factory<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn Service> + Send + 'static,
    {
        self.factory = Some(Box::new(factory));
    }

    /// Runs the readiness loop forever. Spawns the worker pool first when
    /// `worker_threads > 0`; with a pool size of zero all protocol work runs
    /// inline on the reactor thread at read time.
    pub fn run(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(self.factory.is_some(), "no service factory registered");

        let _workers = worker::spawn(self.worker_threads, self.inbound.clone())
            .context("can't spawn worker threads")?;

        loop {
            match self.poll.poll(&mut self.events, None) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("event loop poll failed"),
            }

            let ready: Vec<Token> = self.events.iter().map(|event| event.token()).collect();
            for token in ready {
                match token {
                    LISTENER => self.accept_ready(),
                    WAKER => {}
                    Token(id) => self.read_ready(id),
                }
            }

            self.idle_tick();
        }
    }

    fn accept_ready(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    let Some(factory) = self.factory.as_ref() else { return };
                    let id = self.next_id;
                    self.next_id += 1;

                    if let Err(e) =
                        self.poll
                            .registry()
                            .register(&mut stream, Token(id), Interest::READABLE)
                    {
                        warn!("failed to register connection from {}: {}", peer, e);
                        continue;
                    }

                    let conn = Connection::new(id, self.outbound.clone(), factory());
                    debug!("[{}] accepted connection from {}", id, peer);
                    self.conns.insert(
                        id,
                        ConnEntry {
                            stream: Some(stream),
                            conn,
                        },
                    );
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("accept failed: {}", e);
                    break;
                }
            }
        }
    }

    fn read_ready(&mut self, id: usize) {
        let inline = self.worker_threads == 0;
        let inbound = self.inbound.clone();
        let mut teardown = false;

        {
            let Some(entry) = self.conns.get_mut(&id) else { return };
            let Some(stream) = entry.stream.as_mut() else { return };
            let conn = entry.conn.clone();
            let mut buf = [0u8; READ_CHUNK];

            loop {
                match stream.read(&mut buf) {
                    Ok(0) => {
                        debug!("[{}] peer closed", id);
                        teardown = true;
                        break;
                    }
                    Ok(n) => {
                        let block = TransferBlock::copy_from(&buf[..n]);
                        // The block joins the connection's own pending FIFO;
                        // a Read event only schedules the drain, so read
                        // order survives any worker pool size.
                        if conn.enqueue_input(block) {
                            if inline {
                                conn.drain_input();
                            } else {
                                inbound.push(ConnEvent::new(conn.clone(), ConnEventKind::Read));
                            }
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("[{}] read failed: {}", id, e);
                        teardown = true;
                        break;
                    }
                }
            }
        }

        if teardown {
            self.shutdown_connection(id);
        }
    }

    /// EOF/read-error teardown: half-close, release the socket, then let the
    /// connection confirm so the live set is mutated on the idle tick only.
    fn shutdown_connection(&mut self, id: usize) {
        let Some(entry) = self.conns.get_mut(&id) else { return };
        entry.conn.mark_closing();
        if let Some(mut stream) = entry.stream.take() {
            let _ = stream.shutdown(Shutdown::Write);
            if let Err(e) = self.poll.registry().deregister(&mut stream) {
                debug!("[{}] deregister failed: {}", id, e);
            }
        }
        entry.conn.notify_closed();
    }

    /// Drains every pending outbound event: actual writes for Write/Close
    /// (the latter flagged to close the socket once the write is done) and
    /// live-set removal for CloseConfirmed.
    fn idle_tick(&mut self) {
        while let Some(event) = self.outbound.pop() {
            match event.kind {
                ConnEventKind::Write => self.flush_write(event.conn, event.block, false),
                ConnEventKind::Close => self.flush_write(event.conn, event.block, true),
                ConnEventKind::CloseConfirmed => {
                    let id = event.conn.id();
                    if self.conns.remove(&id).is_some() {
                        debug!("[{}] connection removed", id);
                    }
                }
                ConnEventKind::Read => {
                    debug!("ignoring read event on the outbound queue");
                }
            }
        }
    }

    fn flush_write(&mut self, conn: Connection, block: Option<TransferBlock>, close: bool) {
        let id = conn.id();
        let mut failed = false;

        match self.conns.get_mut(&id) {
            Some(entry) => {
                if let (Some(stream), Some(block)) = (entry.stream.as_mut(), block) {
                    match write_block(stream, block.as_ref()) {
                        Ok(()) => debug!("[{}] wrote {} bytes", id, block.len()),
                        Err(e) => {
                            warn!("[{}] write failed: {}", id, e);
                            failed = true;
                        }
                    }
                }
            }
            // Already retired; the buffer is dropped unwritten.
            None => return,
        }

        if close || failed {
            self.close_socket(id);
        }
    }

    fn close_socket(&mut self, id: usize) {
        let Some(entry) = self.conns.get_mut(&id) else { return };
        if let Some(mut stream) = entry.stream.take() {
            if let Err(e) = self.poll.registry().deregister(&mut stream) {
                debug!("[{}] deregister failed: {}", id, e);
            }
        }
        entry.conn.notify_closed();
    }
}

/// Writes a whole block on the reactor thread, retrying short writes. This
/// stands in for an OS-level write queue and shares the framework's
/// no-backpressure stance: a peer that stops reading stalls the reactor.
fn write_block(stream: &mut TcpStream, mut data: &[u8]) -> io::Result<()> {
    while !data.is_empty() {
        match stream.write(data) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "connection closed while writing",
                ))
            }
            Ok(n) => data = &data[n..],
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::yield_now(),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
