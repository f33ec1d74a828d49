//! Result Cache Store
//!
//! One mutex around the whole map. `reserve`, `resolve` and `fail` each run
//! their check-and-write under that lock, which is what guarantees a single
//! owner per key. Reads take the same lock briefly and never wait on an
//! in-flight evaluation.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use parking_lot::Mutex;

use super::types::{CacheEntry, CacheError, CacheStatus, EvaluationResult};

/// Process-wide URL -> result store. Construct once, share by `Arc`.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entry for `url`, if any
    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        self.entries.lock().get(url).copied()
    }

    /// Insert a Pending entry if the key is unknown.
    ///
    /// Returns `true` only for the call that created the entry; that caller
    /// must later `resolve` or `fail` the key.
    pub fn reserve(&self, url: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.entry(url.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(CacheEntry::pending());
                log::debug!("Reserved evaluation for {}", url);
                true
            }
        }
    }

    /// Pending -> Ready
    pub fn resolve(&self, url: &str, result: EvaluationResult) -> Result<(), CacheError> {
        self.transition(url, CacheEntry::ready(result))
    }

    /// Pending -> Error (conservative default)
    pub fn fail(&self, url: &str) -> Result<(), CacheError> {
        self.transition(url, CacheEntry::failed())
    }

    /// Number of known URLs (any state)
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Count entries per status: (pending, ready, error)
    pub fn stats(&self) -> (usize, usize, usize) {
        let entries = self.entries.lock();
        entries.values().fold((0, 0, 0), |(p, r, e), entry| match entry.status {
            CacheStatus::Pending => (p + 1, r, e),
            CacheStatus::Ready => (p, r + 1, e),
            CacheStatus::Error => (p, r, e + 1),
        })
    }

    fn transition(&self, url: &str, next: CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(url)
            .ok_or_else(|| CacheError::NotReserved(url.to_string()))?;

        if !entry.is_pending() {
            return Err(CacheError::AlreadyResolved {
                url: url.to_string(),
                status: entry.status,
            });
        }

        *entry = next;
        log::info!(
            "Cached {} as {} (phishing={}, confidence={:.3})",
            url,
            next.status,
            next.result.is_phishing,
            next.result.confidence
        );
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_reserve_only_once() {
        let cache = ResultCache::new();
        assert!(cache.reserve("http://x.com"));
        assert!(!cache.reserve("http://x.com"));
        assert_eq!(cache.get("http://x.com"), Some(CacheEntry::pending()));
    }

    #[test]
    fn test_keys_are_not_normalized() {
        let cache = ResultCache::new();
        assert!(cache.reserve("http://x.com"));
        assert!(cache.reserve("http://x.com/"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_resolve_then_reads_are_stable() {
        let cache = ResultCache::new();
        cache.reserve("https://a.org");
        let result = EvaluationResult::new(false, 0.92);
        cache.resolve("https://a.org", result).unwrap();

        for _ in 0..3 {
            let entry = cache.get("https://a.org").unwrap();
            assert_eq!(entry.status, CacheStatus::Ready);
            assert_eq!(entry.result, result);
        }
        assert!(!cache.reserve("https://a.org"));
    }

    #[test]
    fn test_fail_stores_conservative_default() {
        let cache = ResultCache::new();
        cache.reserve("https://b.org");
        cache.fail("https://b.org").unwrap();

        let entry = cache.get("https://b.org").unwrap();
        assert_eq!(entry.status, CacheStatus::Error);
        assert_eq!(entry.result, EvaluationResult::conservative());
    }

    #[test]
    fn test_transitions_happen_once() {
        let cache = ResultCache::new();
        cache.reserve("https://c.org");
        cache.resolve("https://c.org", EvaluationResult::new(true, 0.8)).unwrap();

        assert!(matches!(
            cache.fail("https://c.org"),
            Err(CacheError::AlreadyResolved { status: CacheStatus::Ready, .. })
        ));
        assert!(cache.resolve("https://c.org", EvaluationResult::new(false, 0.1)).is_err());
        assert_eq!(cache.get("https://c.org").unwrap().result.confidence, 0.8);
    }

    #[test]
    fn test_resolve_unknown_key() {
        let cache = ResultCache::new();
        assert_eq!(
            cache.fail("https://never.org"),
            Err(CacheError::NotReserved("https://never.org".to_string()))
        );
        assert!(cache.get("https://never.org").is_none());
    }

    #[test]
    fn test_concurrent_reserve_single_winner() {
        let cache = Arc::new(ResultCache::new());
        let winners = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|scope| {
            for _ in 0..64 {
                let cache = Arc::clone(&cache);
                let winners = Arc::clone(&winners);
                scope.spawn(move || {
                    if cache.reserve("https://race.example") {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), (1, 0, 0));
    }
}
