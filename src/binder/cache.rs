// src/binder/cache.rs
//! Construction cache for capability objects.
//!
//! Binding the same subject to the same blueprint (a table, or a whole
//! layered recipe) always produces an equivalent capability object, so the
//! result can be reused. Keys are identities only; nothing is ever
//! invalidated, and entries leave the cache through LRU eviction alone.
//! The cache is a pure optimization: with capacity 0 every lookup misses
//! and every object is built fresh.

use super::capability::Capability;
use crate::error::Result;
use crate::types::{CapabilityId, RecipeId, StateId, TableId};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of whatever a capability object was bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKey {
    State(StateId),
    Capability(CapabilityId),
}

/// Identity of what was bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blueprint {
    Table(TableId),
    Recipe(RecipeId),
}

/// Joint key: subject identity × blueprint identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstructionKey {
    pub subject: SubjectKey,
    pub blueprint: Blueprint,
}

impl ConstructionKey {
    pub fn new(subject: SubjectKey, blueprint: Blueprint) -> Self {
        Self { subject, blueprint }
    }
}

/// Hit/miss counters, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Bounded, thread-safe memo of constructed capability objects.
pub struct ConstructionCache {
    entries: Option<Mutex<LruCache<ConstructionKey, Capability>>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ConstructionCache {
    /// A cache holding up to `capacity` objects; 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// Returns the cached object for `key`, or builds, stores and returns one.
    ///
    /// The factory runs without the lock held, so it may itself bind
    /// (and hit this cache). After building, the key is checked again and an
    /// object inserted meanwhile wins; both are equivalent.
    pub fn get_or_build<F>(&self, key: ConstructionKey, factory: F) -> Result<Capability>
    where
        F: FnOnce() -> Result<Capability>,
    {
        let Some(entries) = &self.entries else {
            return factory();
        };

        if let Some(found) = entries.lock().get(&key).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::trace!("Construction cache hit: {:?}", key);
            return Ok(found);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        log::trace!("Construction cache miss: {:?}", key);
        let built = factory()?;

        let mut guard = entries.lock();
        if let Some(existing) = guard.get(&key) {
            return Ok(existing.clone());
        }
        guard.put(key, built.clone());
        Ok(built)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.as_ref().map_or(0, |entries| entries.lock().len()),
            capacity: self.capacity,
        }
    }

    /// Drops every cached object. Counters are kept.
    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().clear();
        }
    }
}
