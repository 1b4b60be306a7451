//! The layered builder: stack operation layers over a base capability
//! object, one accepted layer at a time.

use super::compose;
use super::recipe::Recipe;
use crate::binder::{Binder, Capability};
use crate::error::{EngineError, Result};
use crate::operations::{normalize, OperationSource, OperationTable};
use crate::types::Value;
use std::fmt;
use std::sync::Arc;

/// A layer computed from the capability object built so far.
pub type ReflectFn = dyn Fn(&Capability) -> Result<OperationSource> + Send + Sync;

/// One layer offered to an [`Accumulator`].
#[derive(Clone)]
pub enum Layer {
    /// A fixed set of operations.
    Operations(OperationSource),
    /// Operations derived from the current capability object, e.g. readers
    /// that call into operations bound by earlier layers.
    Reflective(Arc<ReflectFn>),
}

impl Layer {
    pub fn operations(source: impl Into<OperationSource>) -> Self {
        Self::Operations(source.into())
    }

    pub fn reflective<F>(reflect: F) -> Self
    where
        F: Fn(&Capability) -> Result<OperationSource> + Send + Sync + 'static,
    {
        Self::Reflective(Arc::new(reflect))
    }
}

impl From<OperationSource> for Layer {
    fn from(source: OperationSource) -> Self {
        Self::Operations(source)
    }
}

impl From<OperationTable> for Layer {
    fn from(table: OperationTable) -> Self {
        Self::Operations(OperationSource::Table(table))
    }
}

impl From<&OperationTable> for Layer {
    fn from(table: &OperationTable) -> Self {
        Self::Operations(OperationSource::Table(table.clone()))
    }
}

/// A layer as remembered by a recipe. Fixed layers are normalized once.
#[derive(Clone)]
pub(crate) enum LayerStep {
    Table(OperationTable),
    Reflective(Arc<ReflectFn>),
}

/// A layered build in progress.
///
/// Each call to [`Accumulator::with`] returns a new accumulator; the
/// receiver stays usable, so one partial stack can branch into several.
#[derive(Clone)]
pub struct Accumulator {
    current: Capability,
    binder: Binder,
}

impl Accumulator {
    /// Accepts one more layer over the current object.
    ///
    /// Operations of the new layer shadow same-named ones below it, unless
    /// the layer is composable, in which case they wrap them.
    pub fn with(&self, layer: impl Into<Layer>) -> Result<Accumulator> {
        let step = match layer.into() {
            Layer::Operations(source) => LayerStep::Table(normalize(source)?),
            Layer::Reflective(reflect) => LayerStep::Reflective(reflect),
        };
        let recipe = self.current.recipe().extend(step.clone());
        let next = apply_layer(&self.binder, &self.current, &step, recipe)?;
        Ok(Accumulator {
            current: next,
            binder: self.binder.clone(),
        })
    }

    /// The capability object built so far.
    pub fn current(&self) -> &Capability {
        &self.current
    }

    /// Ends the build.
    pub fn finish(self) -> Capability {
        self.current
    }
}

impl fmt::Debug for Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("current", &self.current)
            .field("layers", &self.current.layer_count())
            .finish()
    }
}

pub(crate) fn start(binder: &Binder, state: Value, base: OperationSource) -> Result<Accumulator> {
    let table = normalize(base)?;
    let current = binder.bind_table(state, &table)?;
    log::debug!(
        "Layered build started on table {} with {} operation(s)",
        table.id(),
        current.len()
    );
    Ok(Accumulator {
        current,
        binder: binder.clone(),
    })
}

/// Builds the layer described by `step` over `current` and merges it in.
pub(crate) fn apply_layer(
    binder: &Binder,
    current: &Capability,
    step: &LayerStep,
    recipe: Arc<Recipe>,
) -> Result<Capability> {
    let depth = recipe.depth();
    let table = match step {
        LayerStep::Table(table) => table.clone(),
        LayerStep::Reflective(reflect) => reflect(current)
            .and_then(normalize)
            .map_err(|cause| EngineError::invalid_layer_return(depth, cause))?,
    };

    let table = if table.is_composable() {
        compose::resolve(&table, current)?
    } else {
        table
    };

    let bound = binder.bind_table(Value::Capability(current.clone()), &table)?;
    log::debug!(
        "Layer {} contributes {} operation(s) to capability {}",
        depth,
        bound.len(),
        current.id()
    );
    Ok(current.extend(&bound, recipe, depth))
}

/// Starts a layered build with the process-wide binder.
pub fn layer(state: impl Into<Value>, base: impl Into<OperationSource>) -> Result<Accumulator> {
    Binder::global().layer(state, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::{ErrorKind, Primitive};
    use crate::operations::{mutating, Operation};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn binder() -> Binder {
        Binder::new(EngineConfig::default())
    }

    fn value_reader() -> OperationTable {
        OperationTable::builder()
            .operation("value", |subject, _| {
                Ok(subject.field("value").cloned().map_or(Value::Unit, Value::Data))
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_reflective_layer_sees_previous_layers() {
        let acc = binder().layer(json!({ "value": 10 }), value_reader()).unwrap();
        let acc = acc
            .with(Layer::reflective(|_| {
                Ok(vec![Operation::named("doubled", |subject, _| {
                    let cap = subject
                        .as_capability()
                        .ok_or_else(|| EngineError::raised("expected a capability"))?;
                    let value = cap.call("value", &[])?.as_i64().unwrap_or(0);
                    Ok(Value::from(value * 2))
                })]
                .into())
            }))
            .unwrap();

        let cap = acc.finish();
        assert_eq!(cap.call("doubled", &[]).unwrap(), Value::from(20));
        assert_eq!(cap.call("value", &[]).unwrap(), Value::from(10));
        assert_eq!(cap.layer_count(), 1);
    }

    #[test]
    fn test_later_layers_shadow_earlier_ones() {
        let shadow = OperationTable::builder()
            .operation("value", |_, _| Ok(Value::from("shadowed")))
            .build()
            .unwrap();
        let cap = binder()
            .layer(json!({ "value": 10 }), value_reader())
            .and_then(|acc| acc.with(shadow))
            .unwrap()
            .finish();

        assert_eq!(cap.call("value", &[]).unwrap(), Value::from("shadowed"));
        assert_eq!(cap.descriptor("value").unwrap().layer, 1);
    }

    #[test]
    fn test_accumulator_branches_independently() {
        let base = binder().layer(json!({ "value": 1 }), value_reader()).unwrap();
        let extra = OperationTable::builder()
            .operation("extra", |_, _| Ok(Value::Unit))
            .build()
            .unwrap();

        let branched = base.with(extra).unwrap();
        assert!(branched.current().contains("extra"));
        assert!(!base.current().contains("extra"));
    }

    #[test]
    fn test_reflective_failure_is_reported_with_depth() {
        let err = binder()
            .layer(json!({ "value": 1 }), value_reader())
            .unwrap()
            .with(Layer::reflective(|_| Ok(Vec::<Operation>::new().into())))
            .unwrap_err();

        assert_eq!(err.context(), Primitive::LayeredBuilder);
        assert_eq!(err.kind(), &ErrorKind::InvalidLayerReturn { layer: 1 });
        assert_eq!(err.root_kind(), &ErrorKind::EmptyInput);
    }

    #[test]
    fn test_base_mutator_rebuilds_every_layer() {
        let base = mutating(
            &OperationTable::builder()
                .operation("bump", |subject, _| {
                    let value = subject.field("value").and_then(|v| v.as_i64()).unwrap_or(0);
                    Ok(Value::from(json!({ "value": value + 1 })))
                })
                .build()
                .unwrap(),
        );
        let cap = binder()
            .layer(json!({ "value": 1 }), base)
            .and_then(|acc| acc.with(value_reader()))
            .unwrap()
            .finish();

        let bumped = cap.call("bump", &[]).unwrap();
        let bumped = bumped.as_capability().unwrap();
        assert_eq!(bumped.call("value", &[]).unwrap(), Value::from(2));
        assert_eq!(bumped.layer_count(), 1);
        assert_eq!(cap.call("value", &[]).unwrap(), Value::from(1));
    }
}
