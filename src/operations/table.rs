//! Canonical operation tables and the mutation/composition tags.

use super::normalizer::{normalize, Member, OperationSource};
use super::operation::{Operation, OperationDescriptor, OperationKind};
use crate::error::Result;
use crate::types::{TableId, Value};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Table-level flags. Independent of each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TableTags {
    /// Every operation replaces the state instead of returning a value.
    pub mutating: bool,
    /// Same-named operations wrap the ones already bound when layered.
    pub composable: bool,
}

/// One row of a table: the operation plus how the binder treats it.
#[derive(Clone)]
pub(crate) struct TableEntry {
    pub(crate) operation: Operation,
    pub(crate) kind: OperationKind,
    pub(crate) composed: bool,
}

impl TableEntry {
    pub(crate) fn new(operation: Operation, kind: OperationKind) -> Self {
        Self {
            operation,
            kind,
            composed: false,
        }
    }

    pub(crate) fn composed(operation: Operation, kind: OperationKind) -> Self {
        Self {
            operation,
            kind,
            composed: true,
        }
    }
}

/// A validated, immutable, ordered name → operation table.
///
/// Cloning is cheap and preserves identity; tagging produces a new identity
/// exactly once per source table.
#[derive(Clone)]
pub struct OperationTable {
    inner: Arc<TableInner>,
}

struct TableInner {
    id: TableId,
    tags: TableTags,
    entries: IndexMap<String, TableEntry>,
    as_mutating: OnceCell<OperationTable>,
    as_composable: OnceCell<OperationTable>,
}

impl OperationTable {
    /// Starts a map-form table; `build` runs it through the normalizer.
    pub fn builder() -> OperationTableBuilder {
        OperationTableBuilder::default()
    }

    /// Assembles a table from already-validated entries.
    pub(crate) fn from_entries(entries: IndexMap<String, TableEntry>, tags: TableTags) -> Self {
        Self {
            inner: Arc::new(TableInner {
                id: TableId::fresh(),
                tags,
                entries,
                as_mutating: OnceCell::new(),
                as_composable: OnceCell::new(),
            }),
        }
    }

    pub fn id(&self) -> TableId {
        self.inner.id
    }

    pub fn tags(&self) -> TableTags {
        self.inner.tags
    }

    pub fn is_mutating(&self) -> bool {
        self.inner.tags.mutating
    }

    pub fn is_composable(&self) -> bool {
        self.inner.tags.composable
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.entries.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.inner.entries.get(name).map(|entry| &entry.operation)
    }

    pub fn kind_of(&self, name: &str) -> Option<OperationKind> {
        self.inner.entries.get(name).map(|entry| entry.kind)
    }

    /// Whether both handles are the very same table.
    pub fn same_as(&self, other: &OperationTable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Descriptors in table order, all at layer 0.
    pub fn descriptors(&self) -> Vec<OperationDescriptor> {
        self.entries()
            .map(|(name, entry)| OperationDescriptor {
                name: name.to_string(),
                kind: entry.kind,
                arity: entry.operation.arity(),
                composed: entry.composed,
                layer: 0,
            })
            .collect()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&str, &TableEntry)> {
        self.inner
            .entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
    }

    fn retagged(&self, tags: TableTags, kind: Option<OperationKind>) -> OperationTable {
        let entries = self
            .inner
            .entries
            .iter()
            .map(|(name, entry)| {
                let mut entry = entry.clone();
                if let Some(kind) = kind {
                    entry.kind = kind;
                }
                (name.clone(), entry)
            })
            .collect();
        OperationTable::from_entries(entries, tags)
    }
}

impl fmt::Debug for OperationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationTable")
            .field("id", &self.inner.id)
            .field("tags", &self.inner.tags)
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Marks every operation of `table` as a mutator.
///
/// Idempotent: an already-mutating table comes back unchanged, and tagging
/// the same table twice yields the same tagged identity.
pub fn mutating(table: &OperationTable) -> OperationTable {
    if table.is_mutating() {
        return table.clone();
    }
    table
        .inner
        .as_mutating
        .get_or_init(|| {
            log::trace!("Tagging table {} as mutating", table.id());
            let tags = TableTags {
                mutating: true,
                ..table.tags()
            };
            table.retagged(tags, Some(OperationKind::Mutator))
        })
        .clone()
}

/// Marks `table` so that layering composes its operations over the
/// same-named operations already bound. Idempotent like [`mutating`].
pub fn composable(table: &OperationTable) -> OperationTable {
    if table.is_composable() {
        return table.clone();
    }
    table
        .inner
        .as_composable
        .get_or_init(|| {
            log::trace!("Tagging table {} as composable", table.id());
            let tags = TableTags {
                composable: true,
                ..table.tags()
            };
            table.retagged(tags, None)
        })
        .clone()
}

/// Collects map-form entries for a table.
#[derive(Default)]
pub struct OperationTableBuilder {
    entries: Vec<(String, Member)>,
}

impl OperationTableBuilder {
    pub fn operation<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.entries
            .push((name.into(), Member::Operation(Operation::new(func))));
        self
    }

    /// Adds an operation with a declared arity.
    pub fn operation_with_arity<F>(mut self, name: impl Into<String>, arity: usize, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.entries.push((
            name.into(),
            Member::Operation(Operation::new(func).with_arity(arity)),
        ));
        self
    }

    pub fn member(mut self, name: impl Into<String>, member: impl Into<Member>) -> Self {
        self.entries.push((name.into(), member.into()));
        self
    }

    pub fn build(self) -> Result<OperationTable> {
        normalize(OperationSource::Map(self.entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn readers() -> OperationTable {
        OperationTable::builder()
            .operation("get", |subject, _| {
                Ok(subject.field("v").cloned().map_or(Value::Unit, Value::Data))
            })
            .operation("size", |_, _| Ok(Value::from(1)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_preserves_order_and_kinds() {
        let table = readers();
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["get", "size"]);
        assert_eq!(table.kind_of("get"), Some(OperationKind::Reader));
        assert!(!table.is_mutating());
        assert!(!table.is_composable());
    }

    #[test]
    fn test_mutating_is_memoized_and_idempotent() {
        let table = readers();
        let once = mutating(&table);
        let twice = mutating(&table);
        let again = mutating(&once);

        assert!(once.same_as(&twice));
        assert!(once.same_as(&again));
        assert!(!once.same_as(&table));
        assert!(once.is_mutating());
        assert_eq!(once.kind_of("get"), Some(OperationKind::Mutator));
        // The source table keeps its own semantics.
        assert_eq!(table.kind_of("get"), Some(OperationKind::Reader));
    }

    #[test]
    fn test_tags_are_independent() {
        let table = composable(&mutating(&readers()));
        assert!(table.is_mutating());
        assert!(table.is_composable());
        assert_eq!(table.kind_of("size"), Some(OperationKind::Mutator));

        let plain_composable = composable(&readers());
        assert!(!plain_composable.is_mutating());
        assert_eq!(plain_composable.kind_of("size"), Some(OperationKind::Reader));
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let err = OperationTable::builder()
            .operation("get", |_, _| Ok(Value::Unit))
            .operation("get", |_, _| Ok(Value::Unit))
            .build()
            .unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::DuplicateName {
                name: "get".to_string()
            }
        );
    }

    #[test]
    fn test_descriptors_follow_table_order() {
        let table = OperationTable::builder()
            .operation_with_arity("add", 1, |_, _| Ok(Value::Unit))
            .operation("reset", |_, _| Ok(Value::Unit))
            .build()
            .unwrap();
        let descriptors = mutating(&table).descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "add");
        assert_eq!(descriptors[0].arity, Some(1));
        assert_eq!(descriptors[1].kind, OperationKind::Mutator);
    }
}
