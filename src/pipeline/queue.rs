//! Ordered work queue between the segmenter and the sequential processor.
//!
//! An unbounded crossbeam channel carries the items; a separate counter of
//! unfinished items (enqueued but not yet marked done) backs [`WorkQueue::join`].

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Count of items accepted but not yet marked done.
#[derive(Default)]
struct Unfinished {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Unfinished {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Unbounded FIFO with task-completion tracking.
///
/// Cloning yields another handle to the same queue. Items are dequeued in
/// exactly the order they were enqueued; nothing is dropped or reordered once
/// accepted.
pub struct WorkQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    unfinished: Arc<Unfinished>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            unfinished: Arc::clone(&self.unfinished),
        }
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            unfinished: Arc::new(Unfinished::default()),
        }
    }

    /// Appends an item to the tail. Never blocks, never rejects.
    pub fn enqueue(&self, item: T) {
        // Count first so join() can never observe zero while the item is in flight.
        *self.unfinished.lock() += 1;
        if self.tx.send(item).is_err() {
            // Unreachable while `self` holds a receiver; keep the counter honest anyway.
            self.finish_one();
        }
    }

    /// Removes and returns the head, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` on timeout.
    pub fn dequeue(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Marks one previously dequeued item as fully processed.
    pub fn mark_done(&self) {
        self.finish_one();
    }

    /// Blocks until every enqueued item has been dequeued and marked done, or
    /// until `timeout` elapses.
    ///
    /// Returns `true` when the queue drained within the timeout.
    pub fn join(&self, timeout: Duration) -> bool {
        let guard = self.unfinished.lock();
        let (guard, _) = self
            .unfinished
            .idle
            .wait_timeout_while(guard, timeout, |count| *count > 0)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard == 0
    }

    /// Number of items waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns true if no item is waiting to be dequeued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Number of items enqueued but not yet marked done (waiting or in flight).
    pub fn unfinished(&self) -> usize {
        *self.unfinished.lock()
    }

    fn finish_one(&self) {
        let mut count = self.unfinished.lock();
        if *count == 0 {
            tracing::debug!("mark_done called with no unfinished items");
            return;
        }
        *count -= 1;
        if *count == 0 {
            self.unfinished.idle.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_fifo_order() {
        let queue = WorkQueue::new();
        for i in 0..5 {
            queue.enqueue(i);
        }

        let drained: Vec<i32> = (0..5)
            .filter_map(|_| queue.dequeue(Duration::from_millis(10)))
            .collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_dequeue_times_out_without_error() {
        let queue: WorkQueue<String> = WorkQueue::new();
        let start = Instant::now();

        assert!(queue.dequeue(Duration::from_millis(30)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_join_on_empty_queue_returns_immediately() {
        let queue: WorkQueue<u8> = WorkQueue::new();
        assert!(queue.join(Duration::from_millis(10)));
    }

    #[test]
    fn test_join_waits_for_mark_done() {
        let queue = WorkQueue::new();
        queue.enqueue("a");
        queue.enqueue("b");

        // Dequeued but not marked done: still unfinished
        let _ = queue.dequeue(Duration::from_millis(10));
        let _ = queue.dequeue(Duration::from_millis(10));
        assert!(queue.is_empty());
        assert_eq!(queue.unfinished(), 2);
        assert!(!queue.join(Duration::from_millis(20)));

        queue.mark_done();
        assert!(!queue.join(Duration::from_millis(20)));
        queue.mark_done();
        assert!(queue.join(Duration::from_millis(20)));
    }

    #[test]
    fn test_join_wakes_when_consumer_finishes() {
        let queue = WorkQueue::new();
        for i in 0..3 {
            queue.enqueue(i);
        }

        let consumer = queue.clone();
        let handle = thread::spawn(move || {
            while let Some(_item) = consumer.dequeue(Duration::from_millis(50)) {
                thread::sleep(Duration::from_millis(10));
                consumer.mark_done();
            }
        });

        assert!(queue.join(Duration::from_secs(5)));
        assert_eq!(queue.unfinished(), 0);
        handle.join().unwrap();
    }

    #[test]
    fn test_extra_mark_done_is_ignored() {
        let queue: WorkQueue<u8> = WorkQueue::new();
        queue.mark_done();
        assert_eq!(queue.unfinished(), 0);

        queue.enqueue(1);
        assert_eq!(queue.unfinished(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_concurrent_producers_preserve_per_producer_order() {
        let queue = WorkQueue::new();
        let producers: Vec<_> = (0..2)
            .map(|p: usize| {
                let q = queue.clone();
                thread::spawn(move || {
                    for i in 0..100i32 {
                        q.enqueue((p, i));
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        let mut last = [-1i32; 2];
        while let Some((p, i)) = queue.dequeue(Duration::from_millis(10)) {
            assert!(i > last[p], "producer {} reordered: {} after {}", p, i, last[p]);
            last[p] = i;
        }
        assert_eq!(last, [99, 99]);
    }
}
