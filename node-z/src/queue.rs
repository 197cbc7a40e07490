//! Bounded queue implementing depth-QoS behavior.
//!
//! Drops the OLDEST element when full: a subscriber or server with depth N
//! keeps the most recent N samples, not the first N.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

pub struct BoundedQueue<T> {
    data: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    /// Maximum capacity (usize::MAX = unlimited for KeepAll)
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Push an item, dropping the OLDEST if at capacity.
    ///
    /// Returns `true` if an item was dropped.
    pub fn push(&self, item: T) -> bool {
        let mut data = self.data.lock();
        let dropped = if data.len() >= self.capacity {
            data.pop_front();
            true
        } else {
            false
        };
        data.push_back(item);
        self.not_empty.notify_one();
        dropped
    }

    /// Blocking receive - waits until an item is available.
    pub fn recv(&self) -> T {
        let mut data = self.data.lock();
        while data.is_empty() {
            self.not_empty.wait(&mut data);
        }
        data.pop_front().unwrap()
    }

    /// Receive with a deadline. Returns `None` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = std::time::Instant::now() + timeout;
        let mut data = self.data.lock();
        while data.is_empty() {
            if self.not_empty.wait_until(&mut data, deadline).timed_out() {
                return data.pop_front();
            }
        }
        data.pop_front()
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Option<T> {
        self.data.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_when_full() {
        let queue = BoundedQueue::new(3);
        for i in 0..5 {
            queue.push(i);
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.try_recv(), Some(2));
        assert_eq!(queue.try_recv(), Some(3));
        assert_eq!(queue.try_recv(), Some(4));
        assert_eq!(queue.try_recv(), None);
    }

    #[test]
    fn recv_timeout_expires_when_empty() {
        let queue: BoundedQueue<u8> = BoundedQueue::new(1);
        assert_eq!(queue.recv_timeout(Duration::from_millis(20)), None);
    }

    #[test]
    fn recv_wakes_on_push() {
        let queue = std::sync::Arc::new(BoundedQueue::new(1));
        let q = queue.clone();
        let handle = std::thread::spawn(move || q.recv());
        std::thread::sleep(Duration::from_millis(10));
        queue.push(99u8);
        assert_eq!(handle.join().unwrap(), 99);
    }
}
