// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Content-addressed cache of compiled modules.
//!
//! Keys are xxh3 hashes of the module source. Each entry keeps the source it
//! was built from and lookups compare it, so two sources that collide on the
//! hash share a bucket instead of aliasing each other. Entries live as long as
//! the cache.

use crate::errors::EvalResult;
use rhai::{Dynamic, AST};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use xxhash_rust::xxh3::Xxh3;

const MODULE_HASH_SEED: u64 = 0x6d6f_6465_6c73_7263;

/// A module-strategy source compiled and evaluated once.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub source: String,
    pub ast: AST,
    pub default_params: Option<Dynamic>,
    pub default_name: Option<String>,
    pub schema: Option<Dynamic>,
    pub has_build: bool,
    pub has_main: bool,
}

pub fn source_hash(source: &str) -> u64 {
    let mut hasher = Xxh3::with_seed(MODULE_HASH_SEED);
    hasher.update(source.as_bytes());
    hasher.digest()
}

#[derive(Debug, Default)]
pub struct ModuleCache {
    buckets: Mutex<HashMap<u64, Vec<Arc<CompiledModule>>>>,
    compiles: AtomicUsize,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, key: u64, source: &str) -> Option<Arc<CompiledModule>> {
        let buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        buckets
            .get(&key)?
            .iter()
            .find(|module| module.source == source)
            .cloned()
    }

    /// Return the cached module for `source`, building it on a miss.
    ///
    /// The lock is not held while `build` runs. Build failures are not cached.
    pub fn get_or_build<F>(&self, source: &str, build: F) -> EvalResult<Arc<CompiledModule>>
    where
        F: FnOnce(&str) -> EvalResult<CompiledModule>,
    {
        let key = source_hash(source);
        if let Some(module) = self.lookup(key, source) {
            return Ok(module);
        }

        let module = Arc::new(build(source)?);
        self.compiles.fetch_add(1, Ordering::SeqCst);

        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let bucket = buckets.entry(key).or_default();
        bucket.retain(|existing| existing.source != source);
        bucket.push(Arc::clone(&module));
        Ok(module)
    }

    /// Insert under an explicit key. Only used to exercise collisions.
    #[cfg(test)]
    fn insert_with_key(&self, key: u64, module: CompiledModule) -> Arc<CompiledModule> {
        let module = Arc::new(module);
        let mut buckets = self.buckets.lock().unwrap();
        buckets.entry(key).or_default().push(Arc::clone(&module));
        module
    }

    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    /// Number of cached modules across all buckets.
    pub fn len(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EvaluationError;

    fn compiled(source: &str) -> EvalResult<CompiledModule> {
        Ok(CompiledModule {
            source: source.to_string(),
            ast: AST::empty(),
            default_params: None,
            default_name: None,
            schema: None,
            has_build: false,
            has_main: true,
        })
    }

    #[test]
    fn test_get_or_build_is_idempotent() {
        let cache = ModuleCache::new();
        let first = cache.get_or_build("export const a = 1;", compiled).unwrap();
        let second = cache.get_or_build("export const a = 1;", compiled).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.compile_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_sources_get_distinct_entries() {
        let cache = ModuleCache::new();
        cache.get_or_build("export const a = 1;", compiled).unwrap();
        cache.get_or_build("export const a = 2;", compiled).unwrap();
        assert_eq!(cache.compile_count(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_hash_collision_does_not_alias() {
        let cache = ModuleCache::new();
        let source = "export const b = 1;";
        // Occupy the bucket for `source` with a different module.
        let squatter = cache.insert_with_key(source_hash(source), compiled("other").unwrap());

        let module = cache.get_or_build(source, compiled).unwrap();
        assert!(!Arc::ptr_eq(&module, &squatter));
        assert_eq!(module.source, source);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_build_failures_are_not_cached() {
        let cache = ModuleCache::new();
        let failed = cache.get_or_build("broken", |_| Err(EvaluationError::Terminated));
        assert!(failed.is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.compile_count(), 0);
    }
}
