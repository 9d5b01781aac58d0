use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::server::queue::{ConnEvent, ConnEventKind, EventQueue};

const BACKOFF: Duration = Duration::from_millis(1);

/// Spawns `count` worker threads draining the inbound queue.
///
/// Each worker loops forever: pop a Read event and drain the connection's
/// pending input, backing off briefly when the queue is empty. The drain
/// token on the connection guarantees that two workers never feed the same
/// connection concurrently and that blocks are consumed in read order; panic
/// containment lives inside the drain.
pub(crate) fn spawn(
    count: usize,
    inbound: Arc<EventQueue<ConnEvent>>,
) -> std::io::Result<Vec<JoinHandle<()>>> {
    let mut workers = Vec::with_capacity(count);
    for n in 0..count {
        let queue = inbound.clone();
        let handle = thread::Builder::new()
            .name(format!("hearth-worker-{}", n))
            .spawn(move || worker_loop(queue))?;
        workers.push(handle);
    }
    Ok(workers)
}

fn worker_loop(inbound: Arc<EventQueue<ConnEvent>>) {
    loop {
        match inbound.pop() {
            Some(event) => {
                if event.kind == ConnEventKind::Read {
                    event.conn.drain_input();
                }
            }
            None => thread::sleep(BACKOFF),
        }
    }
}
