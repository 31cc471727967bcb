use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// A fixed-capacity buffer that restarts from the beginning when full.
///
/// Pushing into a full buffer does not evict just the oldest entry: the
/// whole window is discarded and the new value becomes the only valid
/// entry at index 0. Everything after it stays invalid until the next
/// drain or until the window fills again.
#[derive(Debug)]
pub struct RingBuffer<T: Send> {
    slots: Mutex<Vec<T>>,
    capacity: usize,
    overwritten_count: AtomicU64,
}

impl<T: Send> RingBuffer<T> {
    /// Create a new ring buffer with the specified capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            slots: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            overwritten_count: AtomicU64::new(0),
        }
    }

    /// Append an item at the write position, restarting the window if full
    pub fn push(&self, item: T) {
        let mut slots = self.slots.lock();
        if slots.len() == self.capacity {
            self.overwritten_count
                .fetch_add(slots.len() as u64, Ordering::Relaxed);
            slots.clear();
        }
        slots.push(item);
    }

    /// Take every valid item in write order and reset the write position
    pub fn drain(&self) -> Vec<T> {
        let mut slots = self.slots.lock();
        std::mem::replace(&mut *slots, Vec::with_capacity(self.capacity))
    }

    /// Current write position, i.e. the number of valid items
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Check if the buffer holds no valid items
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Get the capacity of the buffer
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items discarded by window restarts
    pub fn overwritten_count(&self) -> u64 {
        self.overwritten_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_push_then_drain_keeps_order() {
        let buffer = RingBuffer::new(10);
        buffer.push(3);
        buffer.push(6);
        buffer.push(9);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.drain(), vec![3, 6, 9]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_overflow_restarts_from_index_zero() {
        let buffer = RingBuffer::new(3);
        for i in 1..=4 {
            buffer.push(i);
        }
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.overwritten_count(), 3);
        assert_eq!(buffer.drain(), vec![4]);
    }

    #[test]
    fn test_drain_empty() {
        let buffer: RingBuffer<i64> = RingBuffer::new(5);
        assert!(buffer.drain().is_empty());
        assert_eq!(buffer.len(), 0);

        buffer.push(1);
        buffer.drain();
        assert!(buffer.drain().is_empty());
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_capacity() {
        let buffer: RingBuffer<i64> = RingBuffer::new(42);
        assert_eq!(buffer.capacity(), 42);
        for i in 0..100 {
            buffer.push(i);
        }
        assert_eq!(buffer.capacity(), 42);
        assert!(buffer.len() <= 42);
    }

    #[test]
    #[should_panic(expected = "capacity must be non-zero")]
    fn test_zero_capacity_panics() {
        let _buffer: RingBuffer<i64> = RingBuffer::new(0);
    }

    #[test]
    fn test_capacity_one_holds_latest() {
        let buffer = RingBuffer::new(1);
        buffer.push(1);
        buffer.push(2);
        assert_eq!(buffer.len(), 1);
        assert!(buffer.len() <= buffer.capacity());
        assert_eq!(buffer.drain(), vec![2]);
    }

    #[test]
    fn test_concurrent_pushes_are_not_lost() {
        let buffer = Arc::new(RingBuffer::new(1000));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..100 {
                        buffer.push(t * 100 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut drained = buffer.drain();
        assert_eq!(drained.len(), 400);
        drained.sort_unstable();
        assert_eq!(drained, (0..400).collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn prop_overflow_keeps_last_k(capacity in 1usize..16, k in 1usize..16) {
            prop_assume!(k <= capacity);
            let buffer = RingBuffer::new(capacity);
            let values: Vec<usize> = (0..capacity + k).collect();
            for v in &values {
                buffer.push(*v);
            }
            prop_assert_eq!(buffer.drain(), values[capacity..].to_vec());
        }

        #[test]
        fn prop_len_never_exceeds_capacity(capacity in 1usize..16, pushes in 0usize..64) {
            let buffer = RingBuffer::new(capacity);
            for i in 0..pushes {
                buffer.push(i);
                prop_assert!(buffer.len() <= capacity);
            }
        }
    }
}
