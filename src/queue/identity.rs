//! Identity key extraction.

use std::fmt::Display;

/// Derives the identity key of an item.
///
/// Two items with equal keys are duplicates while one of them is pending.
/// Implementations must be pure and must not block: they run on the relay's
/// worker task for every incoming item.
///
/// Implemented for every `Fn(&T) -> String + Send + Sync`:
///
/// ```rust
/// use unique_queue::KeyExtractor;
///
/// struct Job {
///     id: u32,
/// }
///
/// let extractor = |job: &Job| job.id.to_string();
/// assert_eq!(extractor.key(&Job { id: 7 }), "7");
/// ```
pub trait KeyExtractor<T>: Send + Sync {
    /// Returns the identity key of `item`.
    fn key(&self, item: &T) -> String;
}

impl<T, F> KeyExtractor<T> for F
where
    F: Fn(&T) -> String + Send + Sync,
{
    fn key(&self, item: &T) -> String {
        self(item)
    }
}

/// Uses an item's `Display` output as its identity key.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayKey;

impl<T: Display> KeyExtractor<T> for DisplayKey {
    fn key(&self, item: &T) -> String {
        item.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        id: String,
        value: String,
    }

    #[test]
    fn test_closure_extractor() {
        let extractor = |fake: &Fake| fake.id.clone();
        let fake = Fake {
            id: "1234".to_string(),
            value: "5678".to_string(),
        };

        assert_eq!(extractor.key(&fake), "1234");
        assert_eq!(fake.value, "5678");
    }

    #[test]
    fn test_display_key() {
        assert_eq!(DisplayKey.key(&42_u64), "42");
        assert_eq!(DisplayKey.key(&"https://example.com"), "https://example.com");
    }

    #[test]
    fn test_boxed_extractor() {
        let extractor: Box<dyn KeyExtractor<u32>> = Box::new(|n: &u32| (n % 10).to_string());
        assert_eq!(extractor.key(&42), "2");
        assert_eq!(extractor.key(&12), extractor.key(&2));
    }
}
