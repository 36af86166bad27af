// ─────────────────────────────────────────────────────────────────────
// Solenoid Force Core — Elliptic Cache
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Memoised `(K(m), Π(n, m))` evaluation.
//!
//! Entries are a pure function of their key, so they are never
//! invalidated or evicted; a cache lives as long as the computation that
//! owns it. The same spatial sample recurs across finite-difference
//! offsets, winding layers and current trials, which is where the hit
//! rate comes from.

use crate::elliptic::ellipk_and_pi;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Cached value: complete integrals of the first and third kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipticPair {
    pub k: f64,
    pub pi: f64,
}

impl EllipticPair {
    /// Uncached evaluation.
    pub fn evaluate(m: f64, n: f64) -> Self {
        let (k, pi) = ellipk_and_pi(m, n);
        EllipticPair { k, pi }
    }
}

/// Bitwise key over `(m, n)`. `-0.0` is folded onto `+0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EllipticKey {
    m_bits: u64,
    n_bits: u64,
}

impl EllipticKey {
    pub fn new(m: f64, n: f64) -> Self {
        EllipticKey {
            m_bits: (m + 0.0).to_bits(),
            n_bits: (n + 0.0).to_bits(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Source of memoised elliptic integrals.
pub trait EllipticCache {
    /// `(K(m), Π(n, m))`, computed on first request and stored.
    fn get_or_compute(&self, m: f64, n: f64) -> EllipticPair;

    fn stats(&self) -> CacheStats;
}

/// Cache owned by a single task. Not `Sync`.
#[derive(Debug, Default)]
pub struct LocalEllipticCache {
    entries: RefCell<HashMap<EllipticKey, EllipticPair>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl LocalEllipticCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EllipticCache for LocalEllipticCache {
    fn get_or_compute(&self, m: f64, n: f64) -> EllipticPair {
        let key = EllipticKey::new(m, n);
        if let Some(pair) = self.entries.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            return *pair;
        }
        self.misses.set(self.misses.get() + 1);
        let pair = EllipticPair::evaluate(m, n);
        self.entries.borrow_mut().insert(key, pair);
        pair
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            entries: self.entries.borrow().len(),
        }
    }
}

/// Cache shared between worker threads.
///
/// Misses are computed outside the lock. Two threads racing on the same
/// key both compute the identical value and the second insert is a no-op.
#[derive(Debug, Default)]
pub struct SharedEllipticCache {
    entries: RwLock<HashMap<EllipticKey, EllipticPair>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SharedEllipticCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EllipticCache for SharedEllipticCache {
    fn get_or_compute(&self, m: f64, n: f64) -> EllipticPair {
        let key = EllipticKey::new(m, n);
        // A poisoned map is still consistent: inserts are single idempotent writes.
        let cached = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .copied();
        if let Some(pair) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return pair;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let pair = EllipticPair::evaluate(m, n);
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key)
            .or_insert(pair);
        pair
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().unwrap_or_else(|e| e.into_inner()).len(),
        }
    }
}

impl<C: EllipticCache + ?Sized> EllipticCache for &C {
    fn get_or_compute(&self, m: f64, n: f64) -> EllipticPair {
        (**self).get_or_compute(m, n)
    }

    fn stats(&self) -> CacheStats {
        (**self).stats()
    }
}

impl<C: EllipticCache + ?Sized> EllipticCache for std::sync::Arc<C> {
    fn get_or_compute(&self, m: f64, n: f64) -> EllipticPair {
        (**self).get_or_compute(m, n)
    }

    fn stats(&self) -> CacheStats {
        (**self).stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elliptic::{ellipk, ellippi};
    use std::sync::Arc;

    #[test]
    fn test_local_hit_returns_identical_value() {
        let cache = LocalEllipticCache::new();
        let first = cache.get_or_compute(0.42, 0.37);
        for _ in 0..100 {
            assert_eq!(cache.get_or_compute(0.42, 0.37), first);
        }
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 100);
        assert_eq!(stats.entries, 1);
        assert!(stats.hit_rate() > 0.99);
    }

    #[test]
    fn test_cached_matches_direct() {
        let cache = LocalEllipticCache::new();
        let pair = cache.get_or_compute(0.8, 0.6);
        assert_eq!(pair.k, ellipk(0.8));
        assert_eq!(pair.pi, ellippi(0.6, 0.8));
    }

    #[test]
    fn test_key_order_matters() {
        let cache = LocalEllipticCache::new();
        let a = cache.get_or_compute(0.2, 0.7);
        let b = cache.get_or_compute(0.7, 0.2);
        assert_ne!(a, b);
        assert_eq!(cache.stats().entries, 2);
    }

    #[test]
    fn test_negative_zero_folds() {
        assert_eq!(EllipticKey::new(-0.0, 0.5), EllipticKey::new(0.0, 0.5));
    }

    #[test]
    fn test_shared_cache_concurrent_inserts() {
        let cache = Arc::new(SharedEllipticCache::new());
        let reference = EllipticPair::evaluate(0.55, 0.25);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    (0..200)
                        .map(|_| cache.get_or_compute(0.55, 0.25))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            for pair in handle.join().unwrap() {
                assert_eq!(pair, reference);
            }
        }
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits + stats.misses, 1600);
    }

    fn lookup<C: EllipticCache>(cache: C) -> EllipticPair {
        cache.get_or_compute(0.1, 0.1)
    }

    #[test]
    fn test_borrowed_cache_shares_entries() {
        let local = LocalEllipticCache::new();
        let pair = lookup(&local);
        assert_eq!(pair, local.get_or_compute(0.1, 0.1));
        assert_eq!(local.stats().hits, 1);
        assert_eq!(local.stats().misses, 1);
    }
}
