// src/binder/mod.rs
//! The state binder: turns a subject and an operation table into a
//! capability object.
//!
//! A [`Binder`] owns the engine configuration and the construction cache.
//! Most callers use the process-wide binder through the free [`bind`]
//! function; tests and embedders that need isolated caches or a different
//! shape policy create their own with [`Binder::new`].

mod cache;

mod capability;

pub use cache::CacheStats;
pub use capability::Capability;

pub(crate) use cache::{Blueprint, ConstructionCache, ConstructionKey, SubjectKey};
pub(crate) use capability::{BoundEntry, Outcome};

use crate::config::{EngineConfig, ShapePolicy};
use crate::error::{EngineError, Result};
use crate::layering::builder::{self, Accumulator};
use crate::layering::recipe::Recipe;
use crate::operations::{normalize, OperationSource, OperationTable};
use crate::types::{State, Value};
use im::OrdMap;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::{Arc, Weak};

static GLOBAL_BINDER: Lazy<Binder> = Lazy::new(|| {
    let config = EngineConfig::from_env().unwrap_or_else(|e| {
        log::warn!("Ignoring engine environment: {}", e);
        EngineConfig::default()
    });
    log::debug!(
        "Process binder: cache capacity {}, shape policy {}",
        config.cache_capacity,
        config.shape_policy
    );
    Binder::new(config)
});

/// Binds subjects to operation tables and memoizes the result.
#[derive(Clone)]
pub struct Binder {
    inner: Arc<BinderInner>,
}

struct BinderInner {
    config: EngineConfig,
    cache: ConstructionCache,
}

/// Non-owning handle kept by capability objects.
///
/// The cache owns capability objects, so they cannot own the binder back.
/// If the binder is gone by the time a mutator runs, rebuilding continues on
/// an uncached binder with the same settings.
#[derive(Clone)]
pub(crate) struct WeakBinder {
    inner: Weak<BinderInner>,
    config: EngineConfig,
}

impl WeakBinder {
    pub(crate) fn upgrade_or_detached(&self) -> Binder {
        match self.inner.upgrade() {
            Some(inner) => Binder { inner },
            None => {
                log::trace!("Binder dropped; rebuilding without a cache");
                Binder::new(self.config.clone().uncached())
            }
        }
    }
}

impl Binder {
    pub fn new(config: EngineConfig) -> Self {
        let cache = ConstructionCache::new(config.cache_capacity);
        if !cache.is_enabled() {
            log::debug!("Construction cache disabled; every bind builds a fresh object");
        }
        Self {
            inner: Arc::new(BinderInner { config, cache }),
        }
    }

    /// The process-wide binder, configured from the environment on first use.
    pub fn global() -> Binder {
        GLOBAL_BINDER.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Drops every cached capability object.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Binds `source`'s operations to `subject`.
    ///
    /// The subject must be a state, a record (promoted to a fresh state) or
    /// another capability object. Readers are returned as-is; mutators of a
    /// mutating table are wrapped so that invoking them yields a new
    /// capability object on the state they return.
    pub fn bind(
        &self,
        subject: impl Into<Value>,
        source: impl Into<OperationSource>,
    ) -> Result<Capability> {
        let table = normalize(source.into())?;
        self.bind_table(subject.into(), &table)
    }

    /// Starts a layered build from `state` and the `base` operations.
    pub fn layer(
        &self,
        state: impl Into<Value>,
        base: impl Into<OperationSource>,
    ) -> Result<Accumulator> {
        builder::start(self, state.into(), base.into())
    }

    pub(crate) fn bind_table(&self, subject: Value, table: &OperationTable) -> Result<Capability> {
        let (subject, subject_key) = admit_subject(subject)?;
        let key = ConstructionKey::new(subject_key, Blueprint::Table(table.id()));
        self.inner
            .cache
            .get_or_build(key, || Ok(self.assemble(subject, table)))
    }

    pub(crate) fn cache(&self) -> &ConstructionCache {
        &self.inner.cache
    }

    pub(crate) fn downgrade(&self) -> WeakBinder {
        WeakBinder {
            inner: Arc::downgrade(&self.inner),
            config: self.inner.config.clone(),
        }
    }

    /// Checks what a mutator produced and turns it into the next state.
    pub(crate) fn validate_transition(
        &self,
        name: &str,
        previous: Option<&State>,
        produced: Value,
    ) -> Result<State> {
        let next = produced
            .into_state()
            .map_err(|other| EngineError::invalid_mutator_result(name, other.kind_name()))?;

        if self.inner.config.shape_policy == ShapePolicy::RejectNarrowing {
            if let Some(previous) = previous {
                let missing = next.missing_from(previous);
                if !missing.is_empty() {
                    return Err(EngineError::shape_narrowed(name, missing));
                }
            }
        }

        log::trace!("Mutator '{}' produced state {}", name, next.id());
        Ok(next)
    }

    fn assemble(&self, subject: Value, table: &OperationTable) -> Capability {
        let entries: OrdMap<String, BoundEntry> = table
            .entries()
            .map(|(name, entry)| {
                (
                    name.to_string(),
                    BoundEntry {
                        subject: subject.clone(),
                        operation: entry.operation.clone(),
                        kind: entry.kind,
                        composed: entry.composed,
                        layer: 0,
                    },
                )
            })
            .collect();

        log::debug!(
            "Bound {} operation(s) of table {} to a {}",
            entries.len(),
            table.id(),
            subject.kind_name()
        );

        Capability::assemble(
            subject.carried_state().cloned(),
            entries,
            Recipe::root(table.clone()),
            self.downgrade(),
        )
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("config", &self.inner.config)
            .field("cache", &self.inner.cache.stats())
            .finish()
    }
}

fn admit_subject(subject: Value) -> Result<(Value, SubjectKey)> {
    match subject {
        Value::State(state) => {
            let key = SubjectKey::State(state.id());
            Ok((Value::State(state), key))
        }
        Value::Capability(capability) => {
            let key = SubjectKey::Capability(capability.id());
            Ok((Value::Capability(capability), key))
        }
        Value::Data(serde_json::Value::Object(fields)) => {
            let state = State::new(fields);
            let key = SubjectKey::State(state.id());
            Ok((Value::State(state), key))
        }
        other => Err(EngineError::invalid_state(other.kind_name())),
    }
}

/// Binds with the process-wide binder. See [`Binder::bind`].
pub fn bind(subject: impl Into<Value>, source: impl Into<OperationSource>) -> Result<Capability> {
    Binder::global().bind(subject, source)
}
