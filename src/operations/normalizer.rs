//! Turns heterogeneous operation inputs into one canonical table.

use super::operation::{Operation, OperationKind};
use super::table::{OperationTable, TableEntry, TableTags};
use crate::error::{EngineError, Result};
use crate::types::Value;
use indexmap::IndexMap;

/// One element of an operation source: an operation, or a stray value that
/// the normalizer will reject.
#[derive(Clone)]
pub enum Member {
    Operation(Operation),
    Value(Value),
}

impl From<Operation> for Member {
    fn from(operation: Operation) -> Self {
        Self::Operation(operation)
    }
}

impl From<Value> for Member {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// The shapes an operation table can be supplied in.
#[derive(Clone)]
pub enum OperationSource {
    /// A list of named operations; the names become the keys.
    Functions(Vec<Member>),
    /// Name → member pairs; the key overrides any name the operation has.
    Map(Vec<(String, Member)>),
    /// An already-normalized table, passed through untouched.
    Table(OperationTable),
}

impl From<OperationTable> for OperationSource {
    fn from(table: OperationTable) -> Self {
        Self::Table(table)
    }
}

impl From<&OperationTable> for OperationSource {
    fn from(table: &OperationTable) -> Self {
        Self::Table(table.clone())
    }
}

impl From<Vec<Operation>> for OperationSource {
    fn from(operations: Vec<Operation>) -> Self {
        Self::Functions(operations.into_iter().map(Member::Operation).collect())
    }
}

impl<S: Into<String>> FromIterator<(S, Operation)> for OperationSource {
    fn from_iter<I: IntoIterator<Item = (S, Operation)>>(iter: I) -> Self {
        Self::Map(
            iter.into_iter()
                .map(|(name, operation)| (name.into(), Member::Operation(operation)))
                .collect(),
        )
    }
}

/// Validates `source` and produces a plain (untagged) table.
///
/// Tables pass through unchanged, so a table is validated once no matter
/// how often it is bound.
pub fn normalize(source: OperationSource) -> Result<OperationTable> {
    match source {
        OperationSource::Table(table) => Ok(table),
        OperationSource::Functions(members) => normalize_functions(members),
        OperationSource::Map(pairs) => normalize_map(pairs),
    }
}

fn normalize_functions(members: Vec<Member>) -> Result<OperationTable> {
    if members.is_empty() {
        return Err(EngineError::empty_input());
    }

    let mut entries = IndexMap::with_capacity(members.len());
    for (index, member) in members.into_iter().enumerate() {
        let operation = match member {
            Member::Operation(operation) => operation,
            Member::Value(value) => {
                return Err(EngineError::not_a_function(
                    format!("#{}", index),
                    value.kind_name(),
                ))
            }
        };
        let name = operation
            .name()
            .map(str::to_string)
            .ok_or_else(|| EngineError::anonymous_function(index))?;
        insert_unique(&mut entries, name, operation)?;
    }

    log::trace!("Normalized {} listed operations", entries.len());
    Ok(OperationTable::from_entries(entries, TableTags::default()))
}

fn normalize_map(pairs: Vec<(String, Member)>) -> Result<OperationTable> {
    let mut entries = IndexMap::with_capacity(pairs.len());
    for (name, member) in pairs {
        let operation = match member {
            Member::Operation(operation) => operation.renamed(&name),
            Member::Value(value) => return Err(EngineError::not_a_function(name, value.kind_name())),
        };
        insert_unique(&mut entries, name, operation)?;
    }

    log::trace!("Normalized {} mapped operations", entries.len());
    Ok(OperationTable::from_entries(entries, TableTags::default()))
}

fn insert_unique(
    entries: &mut IndexMap<String, TableEntry>,
    name: String,
    operation: Operation,
) -> Result<()> {
    if entries.contains_key(&name) {
        return Err(EngineError::duplicate_name(name));
    }
    entries.insert(name, TableEntry::new(operation, OperationKind::Reader));
    Ok(())
}
