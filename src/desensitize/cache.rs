// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Bounded cache of compiled regexes, keyed by pattern source

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use regex::Regex;

use super::config::PerformanceConfig;

/// Memoizes pattern compilation so the engine never recompiles per log line.
///
/// LRU-bounded to `max_cache_size`. Patterns that fail to compile are
/// remembered and reported once; afterwards `compile` returns `None` for them
/// silently, so a single bad pattern degrades its rule instead of spamming
/// the log it is supposed to protect.
///
/// Safe for unsynchronized concurrent callers. Two threads racing on the same
/// uncached pattern may both compile it; the loser's insert is harmless.
pub struct PatternCache {
    cache_patterns: bool,
    cache: Mutex<LruCache<String, Arc<Regex>>>,
    failed: Mutex<HashSet<String>>,
}

impl PatternCache {
    pub fn new(performance: &PerformanceConfig) -> Self {
        let capacity =
            NonZeroUsize::new(performance.max_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache_patterns: performance.cache_patterns,
            cache: Mutex::new(LruCache::new(capacity)),
            failed: Mutex::new(HashSet::new()),
        }
    }

    /// Compile `pattern`, memoized when caching is enabled.
    ///
    /// Returns `None` for empty or uncompilable patterns; the owning rule is
    /// then treated as not configured for regex dispatch.
    pub fn compile(&self, pattern: &str) -> Option<Arc<Regex>> {
        if pattern.is_empty() {
            return None;
        }

        if self.cache_patterns {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(regex) = cache.get(pattern) {
                return Some(Arc::clone(regex));
            }
        }

        {
            let failed = self.failed.lock().unwrap_or_else(PoisonError::into_inner);
            if failed.contains(pattern) {
                return None;
            }
        }

        match Regex::new(pattern) {
            Ok(regex) => {
                let regex = Arc::new(regex);
                if self.cache_patterns {
                    let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
                    cache.put(pattern.to_string(), Arc::clone(&regex));
                }
                Some(regex)
            }
            Err(err) => {
                let mut failed = self.failed.lock().unwrap_or_else(PoisonError::into_inner);
                if failed.insert(pattern.to_string()) {
                    tracing::warn!(pattern, %err, "pattern failed to compile, rule degraded");
                }
                None
            }
        }
    }

    /// Number of compiled entries currently held
    pub fn len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
