//! Buffered items together with their pending keys.

use super::buffer::InternalBuffer;
use super::identity::KeyExtractor;
use super::index::DedupIndex;
use std::fmt;

/// Outcome of offering an item to a [`PendingQueue`].
#[derive(Debug, PartialEq, Eq)]
pub enum Admission<T> {
    /// The key was not pending; the item was appended to the buffer.
    Accepted,
    /// The key is already pending; the item was dropped.
    Duplicate,
    /// The buffer is full; the item is handed back untouched.
    Full(T),
}

impl<T> Admission<T> {
    /// Returns true if the item was accepted.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// The relay's bookkeeping: a bounded FIFO of accepted items and the set of
/// their identity keys.
///
/// The number of pending keys always equals the number of buffered items.
///
/// # Example
///
/// ```rust
/// use unique_queue::{Admission, PendingQueue};
///
/// let mut queue = PendingQueue::new(10, |s: &&str| s.to_string());
///
/// assert_eq!(queue.push_unique("a"), Admission::Accepted);
/// assert_eq!(queue.push_unique("a"), Admission::Duplicate);
/// assert_eq!(queue.pop(), Some("a"));
///
/// // Forwarded keys may be accepted again.
/// assert_eq!(queue.push_unique("a"), Admission::Accepted);
/// ```
pub struct PendingQueue<T> {
    extractor: Box<dyn KeyExtractor<T>>,
    index: DedupIndex,
    buffer: InternalBuffer<T>,
}

impl<T> PendingQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    pub fn new(capacity: usize, extractor: impl KeyExtractor<T> + 'static) -> Self {
        Self::with_boxed_extractor(capacity, Box::new(extractor))
    }

    pub(crate) fn with_boxed_extractor(
        capacity: usize,
        extractor: Box<dyn KeyExtractor<T>>,
    ) -> Self {
        Self {
            extractor,
            index: DedupIndex::with_capacity(capacity),
            buffer: InternalBuffer::with_capacity(capacity),
        }
    }

    /// Returns the identity key of `item`.
    pub fn key_of(&self, item: &T) -> String {
        self.extractor.key(item)
    }

    /// Appends `item` unless its key is already pending.
    pub fn push_unique(&mut self, item: T) -> Admission<T> {
        let key = self.extractor.key(&item);
        self.admit(key, item)
    }

    /// Like [`push_unique`](Self::push_unique) with a key computed by the caller.
    pub(crate) fn admit(&mut self, key: String, item: T) -> Admission<T> {
        if self.index.contains(&key) {
            return Admission::Duplicate;
        }
        if self.buffer.is_full() {
            return Admission::Full(item);
        }
        match self.buffer.push_back(item) {
            Ok(()) => {
                self.index.was_absent_then_mark(key);
                Admission::Accepted
            },
            Err(item) => Admission::Full(item),
        }
    }

    /// Removes the head item and clears its key from the pending set.
    pub fn pop(&mut self) -> Option<T> {
        self.pop_with_key().map(|(_, item)| item)
    }

    /// Removes the head item, returning it with its key.
    pub(crate) fn pop_with_key(&mut self) -> Option<(String, T)> {
        let item = self.buffer.pop_front()?;
        let key = self.extractor.key(&item);
        self.index.remove(&key);
        Some((key, item))
    }

    /// Returns true if `key` is pending.
    #[must_use]
    pub fn is_pending(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// Returns the number of pending keys.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.index.len()
    }

    /// Returns the number of buffered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns true if no more items can be accepted.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.buffer.is_full()
    }

    /// Returns the maximum number of buffered items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Discards every buffered item and pending key, returning how many items
    /// were discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.buffer.drain().count();
        self.index.clear();
        discarded
    }
}

impl<T> fmt::Debug for PendingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingQueue")
            .field("len", &self.buffer.len())
            .field("pending", &self.index.len())
            .field("capacity", &self.buffer.capacity())
            .finish_non_exhaustive()
    }
}
