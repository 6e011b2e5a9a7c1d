//! # Detection Cache
//!
//! Contracts are classified again on every call and every block that
//! touches them. The cache keys results by the SHA-256 of the bytecode;
//! a cached result is identical to a fresh one, so classification stays
//! deterministic whether or not it hits.

use crate::domain::detector::{detect_format, BytecodeDetectionResult};
use crate::domain::services::sha256;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Default number of cached classifications.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Hit/miss counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that ran the detector.
    pub misses: u64,
    /// Entries currently cached.
    pub entries: usize,
}

/// Memoizing wrapper around [`detect_format`].
#[derive(Debug)]
pub struct CachedDetector {
    cache: Mutex<LruCache<[u8; 32], BytecodeDetectionResult>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedDetector {
    /// Cache holding up to `capacity` results. Zero falls back to
    /// [`DEFAULT_CACHE_CAPACITY`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Classify `bytecode`, consulting the cache first.
    pub fn detect(&self, bytecode: &[u8]) -> BytecodeDetectionResult {
        let key = sha256(bytecode);
        if let Some(hit) = self.cache.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %hex::encode(&key[..8]), "detection cache hit");
            return hit.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = detect_format(bytecode);
        self.cache.lock().put(key, result.clone());
        result
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.lock().len(),
        }
    }

    /// Drop every cached result. Counters are kept.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

impl Default for CachedDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
