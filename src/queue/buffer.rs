//! Bounded FIFO of accepted items.

use std::collections::VecDeque;

/// Upper bound on up-front allocation; larger buffers grow on demand.
pub(crate) const PREALLOCATE_LIMIT: usize = 1024;

/// Bounded first-in first-out buffer between acceptance and forwarding.
#[derive(Debug)]
pub struct InternalBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> InternalBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` items.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
            capacity,
        }
    }

    /// Appends `item` at the tail.
    ///
    /// # Errors
    ///
    /// Hands the item back if the buffer is full.
    pub fn push_back(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Removes and returns the head item.
    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Returns a reference to the head item.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    /// Returns the number of buffered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if no more items can be accepted.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Returns the maximum number of buffered items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes every item, head first.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.items.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut buffer = InternalBuffer::with_capacity(3);
        for n in 1..=3 {
            buffer.push_back(n).unwrap();
        }

        assert_eq!(buffer.front(), Some(&1));
        assert_eq!(buffer.pop_front(), Some(1));
        assert_eq!(buffer.pop_front(), Some(2));
        assert_eq!(buffer.pop_front(), Some(3));
        assert_eq!(buffer.pop_front(), None);
    }

    #[test]
    fn test_push_when_full_returns_item() {
        let mut buffer = InternalBuffer::with_capacity(1);
        buffer.push_back("a").unwrap();

        assert!(buffer.is_full());
        assert_eq!(buffer.push_back("b"), Err("b"));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_zero_capacity_is_always_full() {
        let mut buffer = InternalBuffer::with_capacity(0);
        assert!(buffer.is_full());
        assert!(buffer.is_empty());
        assert_eq!(buffer.push_back(1), Err(1));
    }

    #[test]
    fn test_drain() {
        let mut buffer = InternalBuffer::with_capacity(4);
        buffer.push_back(1).unwrap();
        buffer.push_back(2).unwrap();

        let drained: Vec<_> = buffer.drain().collect();
        assert_eq!(drained, vec![1, 2]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 4);
    }
}
