//! Capability objects: bound, callable operation sets.

use super::{Binder, WeakBinder};
use crate::error::{EngineError, ErrorCategory, Result};
use crate::layering::recipe::Recipe;
use crate::operations::{Operation, OperationDescriptor, OperationKind};
use crate::types::{CapabilityId, State, Value};
use im::OrdMap;
use std::fmt;
use std::sync::Arc;

/// One operation fixed to the subject it was bound against.
#[derive(Clone)]
pub(crate) struct BoundEntry {
    pub(crate) subject: Value,
    pub(crate) operation: Operation,
    pub(crate) kind: OperationKind,
    pub(crate) composed: bool,
    pub(crate) layer: usize,
}

/// What invoking an entry amounts to before any rebuilding happens.
pub(crate) enum Outcome {
    /// A reader's result.
    Value(Value),
    /// A mutator's validated replacement state.
    Transition(State),
}

/// A bound API: operation names mapped to callables that receive the bound
/// subject implicitly.
///
/// Capability objects are immutable and cheap to clone. Invoking a mutator
/// never changes the receiver; it returns a new capability object built on
/// the new state, with every layer of the receiver rebuilt on top of it.
#[derive(Clone)]
pub struct Capability {
    inner: Arc<CapabilityInner>,
}

struct CapabilityInner {
    id: CapabilityId,
    state: Option<State>,
    entries: OrdMap<String, BoundEntry>,
    recipe: Arc<Recipe>,
    binder: WeakBinder,
}

impl Capability {
    pub(crate) fn assemble(
        state: Option<State>,
        entries: OrdMap<String, BoundEntry>,
        recipe: Arc<Recipe>,
        binder: WeakBinder,
    ) -> Self {
        Self {
            inner: Arc::new(CapabilityInner {
                id: CapabilityId::fresh(),
                state,
                entries,
                recipe,
                binder,
            }),
        }
    }

    pub fn id(&self) -> CapabilityId {
        self.inner.id
    }

    /// The state this object was bound from, if any. Read-only; it is not
    /// one of the object's operations.
    pub fn state(&self) -> Option<&State> {
        self.inner.state.as_ref()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Number of layers stacked on the base table.
    pub fn layer_count(&self) -> usize {
        self.inner.recipe.depth()
    }

    pub fn descriptor(&self, name: &str) -> Option<OperationDescriptor> {
        self.inner
            .entries
            .get(name)
            .map(|entry| describe(name, entry))
    }

    /// Every operation, sorted by name.
    pub fn descriptors(&self) -> Vec<OperationDescriptor> {
        self.inner
            .entries
            .iter()
            .map(|(name, entry)| describe(name, entry))
            .collect()
    }

    /// Invokes `name` with the bound subject supplied implicitly.
    ///
    /// Readers return their result unchanged. Mutators return
    /// `Value::Capability` holding the object rebuilt on the new state.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        match self.perform(name, args)? {
            Outcome::Value(value) => Ok(value),
            Outcome::Transition(next) => self.advance(next).map(Value::Capability),
        }
    }

    /// Runs an entry without rebuilding anything afterwards.
    pub(crate) fn perform(&self, name: &str, args: &[Value]) -> Result<Outcome> {
        let entry = self
            .inner
            .entries
            .get(name)
            .ok_or_else(|| EngineError::unknown_operation(name))?;

        if let Some(expected) = entry.operation.arity() {
            if args.len() != expected {
                return Err(EngineError::arity_mismatch(name, expected, args.len()));
            }
        }

        match entry.kind {
            OperationKind::Reader => entry.operation.invoke(&entry.subject, args).map(Outcome::Value),
            OperationKind::Mutator => {
                // Only failures raised by the operation itself are wrapped;
                // engine errors from a continuation keep their identity.
                let produced = entry
                    .operation
                    .invoke(&entry.subject, args)
                    .map_err(|cause| match cause.category() {
                        ErrorCategory::Operation => EngineError::mutator_failed(name, cause),
                        _ => cause,
                    })?;
                let next = self.binder().validate_transition(
                    name,
                    entry.subject.carried_state(),
                    produced,
                )?;
                Ok(Outcome::Transition(next))
            }
        }
    }

    /// Rebuilds this object, layers included, on `next`.
    pub(crate) fn advance(&self, next: State) -> Result<Capability> {
        let binder = self.binder();
        self.inner.recipe.replay(&binder, next)
    }

    /// Merges `bound` over this object; names in `bound` win.
    pub(crate) fn extend(&self, bound: &Capability, recipe: Arc<Recipe>, layer: usize) -> Capability {
        let mut entries = self.inner.entries.clone();
        for (name, entry) in bound.inner.entries.iter() {
            let mut entry = entry.clone();
            entry.layer = layer;
            entries.insert(name.clone(), entry);
        }
        Capability::assemble(
            self.inner.state.clone(),
            entries,
            recipe,
            self.inner.binder.clone(),
        )
    }

    pub(crate) fn entry_kind(&self, name: &str) -> Option<OperationKind> {
        self.inner.entries.get(name).map(|entry| entry.kind)
    }

    pub(crate) fn recipe(&self) -> &Arc<Recipe> {
        &self.inner.recipe
    }

    fn binder(&self) -> Binder {
        self.inner.binder.upgrade_or_detached()
    }
}

fn describe(name: &str, entry: &BoundEntry) -> OperationDescriptor {
    OperationDescriptor {
        name: name.to_string(),
        kind: entry.kind,
        arity: entry.operation.arity(),
        composed: entry.composed,
        layer: entry.layer,
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("id", &self.inner.id)
            .field("state", &self.inner.state.as_ref().map(State::id))
            .field("operations", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
