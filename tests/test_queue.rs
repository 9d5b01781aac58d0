use std::sync::Arc;
use std::thread;

use hearth::server::queue::EventQueue;

#[test]
fn test_pop_on_empty_returns_none() {
    let queue: EventQueue<u32> = EventQueue::new();
    assert!(queue.pop().is_none());
    assert!(queue.is_empty());
}

#[test]
fn test_single_producer_fifo() {
    let queue = EventQueue::new();
    for n in 0..100 {
        queue.push(n);
    }
    for n in 0..100 {
        assert_eq!(queue.pop(), Some(n));
    }
    assert!(queue.pop().is_none());
}

#[test]
fn test_is_empty_tracks_contents() {
    let queue = EventQueue::new();
    assert!(queue.is_empty());
    queue.push(1);
    assert!(!queue.is_empty());
    queue.pop();
    assert!(queue.is_empty());
}

#[test]
fn test_per_producer_order_is_preserved() {
    const PRODUCERS: usize = 4;
    const ITEMS: usize = 250;

    let queue: Arc<EventQueue<(usize, usize)>> = Arc::new(EventQueue::new());

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = queue.clone();
            thread::spawn(move || {
                for seq in 0..ITEMS {
                    queue.push((producer, seq));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut last_seen = vec![None; PRODUCERS];
    let mut total = 0;
    while let Some((producer, seq)) = queue.pop() {
        if let Some(previous) = last_seen[producer] {
            assert!(seq > previous, "producer {} reordered", producer);
        }
        last_seen[producer] = Some(seq);
        total += 1;
    }
    assert_eq!(total, PRODUCERS * ITEMS);
}

#[test]
fn test_concurrent_consumers_drain_everything() {
    const ITEMS: usize = 1000;
    let queue: Arc<EventQueue<usize>> = Arc::new(EventQueue::new());
    for n in 0..ITEMS {
        queue.push(n);
    }

    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(n) = queue.pop() {
                    seen.push(n);
                }
                seen
            })
        })
        .collect();

    let mut all: Vec<usize> = consumers
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..ITEMS).collect::<Vec<_>>());
}
