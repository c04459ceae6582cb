//! Fixed-capacity circular queue shared by every producer/consumer pair.
//!
//! Capacity is a compile-time constant so instances can live in static
//! memory on the target. Push on a full buffer overwrites the oldest element
//! and bumps a diagnostic counter; bounded staleness is preferred over
//! blocking a producer that may be running at interrupt priority.

/// Fixed-capacity ring buffer with overwrite-oldest semantics.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    buf: [Option<T>; N],
    head: usize,
    len: usize,
    overwrites: u64,
}

impl<T, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> RingBuffer<T, N> {
    pub fn new() -> Self {
        const { assert!(N > 0, "ring buffer capacity must be non-zero") };
        Self {
            buf: [const { None }; N],
            head: 0,
            len: 0,
            overwrites: 0,
        }
    }

    /// Append an element. On a full buffer the oldest element is dropped and
    /// the overwrite counter incremented; returns true when that happened.
    pub fn push(&mut self, val: T) -> bool {
        let tail = (self.head + self.len) % N;
        let overwrote = self.len == N;
        self.buf[tail] = Some(val);
        if overwrote {
            self.head = (self.head + 1) % N;
            self.overwrites += 1;
        } else {
            self.len += 1;
        }
        overwrote
    }

    /// Remove and return the oldest element, or None when empty. Never blocks.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let val = self.buf[self.head].take();
        self.head = (self.head + 1) % N;
        self.len -= 1;
        val
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of pushes that evicted an element. Transient-fault diagnostic,
    /// surfaced through telemetry rather than treated as an error.
    #[inline]
    pub fn overwrites(&self) -> u64 {
        self.overwrites
    }

    /// Iterate the held elements oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).filter_map(move |i| self.buf[(self.head + i) % N].as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::RingBuffer;

    #[test]
    fn pop_on_empty_is_none() {
        let mut rb: RingBuffer<u16, 4> = RingBuffer::new();
        assert_eq!(rb.pop(), None);
        assert!(rb.is_empty());
    }

    #[test]
    fn fifo_order_preserved() {
        let mut rb: RingBuffer<u16, 4> = RingBuffer::new();
        for v in [1, 2, 3] {
            assert!(!rb.push(v));
        }
        assert_eq!(rb.pop(), Some(1));
        assert_eq!(rb.pop(), Some(2));
        rb.push(4);
        rb.push(5);
        assert_eq!(rb.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn overfill_evicts_oldest_and_counts() {
        let mut rb: RingBuffer<u16, 3> = RingBuffer::new();
        for v in 0..4 {
            rb.push(v);
        }
        assert_eq!(rb.len(), 3);
        assert!(rb.is_full());
        assert_eq!(rb.overwrites(), 1);
        assert_eq!(rb.pop(), Some(1)); // 0 was evicted
    }

    #[test]
    fn occupancy_never_exceeds_capacity() {
        let mut rb: RingBuffer<u32, 5> = RingBuffer::new();
        for v in 0..1000 {
            rb.push(v);
            assert!(rb.len() <= rb.capacity());
        }
        assert_eq!(rb.len(), 5);
        assert_eq!(rb.overwrites(), 995);
    }
}
