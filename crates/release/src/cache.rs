//! Memoising front-end for the release parser

use crate::parser::parse_release;
use lru::LruCache;
use reseed_core::Release;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::trace;

const DEFAULT_CAPACITY: usize = 10_000;

/// Process-wide memoisation of parsed releases.
///
/// Each entry maps an exact source string to exactly one [`Release`].
/// The cache is bounded with LRU eviction and guarded by a single
/// lock; writes are cheap and reads dominate. Entries are shared as
/// `Arc<Release>` and never mutated.
pub struct ReleaseCache {
    entries: Mutex<LruCache<String, Arc<Release>>>,
}

impl ReleaseCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Parse a release string, memoised. Never fails; unrecognisable
    /// input yields a `Release` with `ReleaseType::Unknown`.
    pub fn parse(&self, input: &str) -> Arc<Release> {
        let mut entries = self.entries.lock().expect("release cache poisoned");
        if let Some(hit) = entries.get(input) {
            trace!(input, "release cache hit");
            return Arc::clone(hit);
        }
        drop(entries);

        let release = Arc::new(parse_release(input));

        let mut entries = self.entries.lock().expect("release cache poisoned");
        entries.put(input.to_string(), Arc::clone(&release));
        release
    }

    /// Remove a single memoised entry
    pub fn clear(&self, input: &str) {
        let mut entries = self.entries.lock().expect("release cache poisoned");
        entries.pop(input);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("release cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReleaseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memoises_and_returns_shared_entries() {
        let cache = ReleaseCache::new();
        let a = cache.parse("Show.S01E02.1080p.WEB-DL.H.264-GRP");
        let b = cache.parse("Show.S01E02.1080p.WEB-DL.H.264-GRP");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_removes_one_entry() {
        let cache = ReleaseCache::new();
        cache.parse("A.2020.1080p.BluRay.x264-ONE");
        cache.parse("B.2021.1080p.BluRay.x264-TWO");
        cache.clear("A.2020.1080p.BluRay.x264-ONE");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = ReleaseCache::with_capacity(2);
        let first = cache.parse("A.2020.1080p.BluRay.x264-ONE");
        cache.parse("B.2021.1080p.BluRay.x264-TWO");
        // Touch A so B becomes the eviction victim
        cache.parse("A.2020.1080p.BluRay.x264-ONE");
        cache.parse("C.2022.1080p.BluRay.x264-THREE");
        assert_eq!(cache.len(), 2);
        let again = cache.parse("A.2020.1080p.BluRay.x264-ONE");
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn parse_is_thread_safe() {
        let cache = std::sync::Arc::new(ReleaseCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = std::sync::Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        cache.parse("Show.S01E02.1080p.WEB-DL.H.264-GRP");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 1);
    }
}
