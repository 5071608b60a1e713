//! Deduplication index of pending identity keys.

use super::buffer::PREALLOCATE_LIMIT;
use std::collections::HashSet;

/// Set of identity keys whose items are buffered but not yet forwarded.
///
/// A key is admitted once, blocks duplicates while its item is pending, and
/// becomes admissible again the moment it is removed on forwarding. The index
/// never remembers keys that have already left the relay.
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    keys: HashSet<String>,
}

impl DedupIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index with room for `capacity` keys.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: HashSet::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
        }
    }

    /// Marks `key` as pending.
    ///
    /// Returns `true` if the key was absent and is now marked, `false` if it was
    /// already pending (the caller should drop the item).
    pub fn was_absent_then_mark(&mut self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    /// Removes `key` from the index, whether or not it was present.
    pub fn remove(&mut self, key: &str) {
        self.keys.remove(key);
    }

    /// Returns true if `key` is pending.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Returns the number of pending keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no key is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
