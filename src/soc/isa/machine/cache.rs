use ahash::AHashMap;
use tracing::trace;

/// Memo of per-word decode results.
///
/// There is no eviction and no locking: the owner (one decode stage) decides when entries go
/// stale, typically when the program memory backing a word is rewritten.
#[derive(Debug, Clone)]
pub struct InstructionCache<T> {
    entries: AHashMap<u16, T>,
}

impl<T> Default for InstructionCache<T> {
    fn default() -> Self {
        Self {
            entries: AHashMap::new(),
        }
    }
}

impl<T> InstructionCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, word: u16) -> Option<&T> {
        self.entries.get(&word)
    }

    /// Stores `value` for `word`, returning whatever it replaced.
    pub fn put(&mut self, word: u16, value: T) -> Option<T> {
        self.entries.insert(word, value)
    }

    pub fn get_or_insert_with<F>(&mut self, word: u16, build: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.entries.entry(word).or_insert_with(build)
    }

    pub fn get_or_try_insert_with<F, E>(&mut self, word: u16, build: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if !self.entries.contains_key(&word) {
            let value = build()?;
            self.entries.insert(word, value);
        }
        Ok(&self.entries[&word])
    }

    pub fn invalidate(&mut self, word: u16) -> Option<T> {
        let removed = self.entries.remove(&word);
        if removed.is_some() {
            trace!(word = format_args!("{word:#06x}"), "invalidated cached decode");
        }
        removed
    }

    pub fn invalidate_all(&mut self) {
        trace!(entries = self.entries.len(), "flushed decode cache");
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, word: u16) -> bool {
        self.entries.contains_key(&word)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn put_then_get_returns_the_same_value() {
        let mut cache = InstructionCache::new();
        let payload = Arc::new(vec![1u16, 2, 3]);
        cache.put(0x1234, Arc::clone(&payload));
        let hit = cache.get(0x1234).expect("cached entry");
        assert!(Arc::ptr_eq(hit, &payload), "cache must not copy the payload");
        assert!(cache.get(0x4321).is_none(), "missing keys are soft misses");
    }

    #[test]
    fn invalidate_removes_single_entry() {
        let mut cache = InstructionCache::new();
        cache.put(1, "a");
        cache.put(2, "b");
        assert_eq!(cache.invalidate(1), Some("a"));
        assert!(cache.get(1).is_none());
        assert_eq!(cache.get(2), Some(&"b"));
        assert_eq!(cache.invalidate(1), None, "second invalidation is a no-op");
    }

    #[test]
    fn invalidate_all_empties_cache() {
        let mut cache = InstructionCache::new();
        for word in 0..8u16 {
            cache.put(word, word * 2);
        }
        assert_eq!(cache.len(), 8);
        cache.invalidate_all();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn put_replaces_existing_entry() {
        let mut cache = InstructionCache::new();
        assert_eq!(cache.put(7, 'x'), None);
        assert_eq!(cache.put(7, 'y'), Some('x'));
        assert_eq!(cache.get(7), Some(&'y'));
    }

    #[test]
    fn lazy_insertion_builds_once() {
        let mut cache = InstructionCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            cache.get_or_insert_with(0xA000, || {
                calls += 1;
                "decoded"
            });
        }
        assert_eq!(calls, 1);

        let failed: Result<&&str, &str> = cache.get_or_try_insert_with(0xB000, || Err("bad"));
        assert_eq!(failed, Err("bad"));
        assert!(!cache.contains(0xB000), "failed builds are not cached");
    }
}
