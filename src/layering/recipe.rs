//! Construction recipes: how a layered capability object was assembled, so
//! it can be rebuilt on a new state after a mutation.

use super::builder::{apply_layer, LayerStep};
use crate::binder::{Binder, Blueprint, Capability, ConstructionKey, SubjectKey};
use crate::error::Result;
use crate::operations::OperationTable;
use crate::types::{RecipeId, State, Value};
use std::sync::Arc;

pub(crate) struct Recipe {
    id: RecipeId,
    depth: usize,
    node: RecipeNode,
}

enum RecipeNode {
    Base(OperationTable),
    Layer {
        parent: Arc<Recipe>,
        step: LayerStep,
    },
}

impl Recipe {
    pub(crate) fn root(base: OperationTable) -> Arc<Self> {
        Arc::new(Self {
            id: RecipeId::fresh(),
            depth: 0,
            node: RecipeNode::Base(base),
        })
    }

    pub(crate) fn extend(self: &Arc<Self>, step: LayerStep) -> Arc<Self> {
        Arc::new(Self {
            id: RecipeId::fresh(),
            depth: self.depth + 1,
            node: RecipeNode::Layer {
                parent: Arc::clone(self),
                step,
            },
        })
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Rebuilds the whole stack on `state`, bottom layer first.
    ///
    /// Each level is memoized by (state, recipe), so replaying the same
    /// recipe on the same state twice returns the same object.
    pub(crate) fn replay(self: &Arc<Self>, binder: &Binder, state: State) -> Result<Capability> {
        match &self.node {
            RecipeNode::Base(table) => binder.bind_table(Value::State(state), table),
            RecipeNode::Layer { parent, step } => {
                let key = ConstructionKey::new(
                    SubjectKey::State(state.id()),
                    Blueprint::Recipe(self.id),
                );
                binder.cache().get_or_build(key, || {
                    log::trace!("Replaying layer {} on state {}", self.depth, state.id());
                    let below = parent.replay(binder, state.clone())?;
                    apply_layer(binder, &below, step, Arc::clone(self))
                })
            }
        }
    }
}
