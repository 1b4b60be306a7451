//! The composition resolver.
//!
//! A composable layer's operations do not replace the same-named operations
//! below them; they receive them. Each resolved operation is called with
//! the caller's arguments followed by one extra [`Value::Function`]: the
//! continuation. Calling the continuation runs the previous operation and
//! hands back its result in bare form:
//!
//! - a previous mutator yields the new state, not a capability object;
//! - a previous reader that returned a capability object yields that
//!   object's state;
//! - anything else comes back unchanged.
//!
//! When nothing of that name exists below, the continuation is still
//! passed but fails when called. Composing over a mutator makes the
//! composed operation a mutator too, so chaining keeps working.

use crate::binder::{Capability, Outcome};
use crate::error::{EngineError, Result};
use crate::operations::{Operation, OperationKind, OperationTable, TableEntry, TableTags};
use crate::types::{Callable, Value};
use indexmap::IndexMap;

/// Wraps every operation of `table` around its same-named predecessor in
/// `current`.
///
/// The result is a plain (no longer composable) table; its mutating tag is
/// kept.
pub fn resolve(table: &OperationTable, current: &Capability) -> Result<OperationTable> {
    let mut entries = IndexMap::with_capacity(table.len());

    for (name, entry) in table.entries() {
        let previous = current.entry_kind(name);
        let next = match previous {
            Some(_) => previous_operation(current, name),
            None => dangling(name),
        };
        let kind = match previous {
            Some(OperationKind::Mutator) => OperationKind::Mutator,
            _ => entry.kind,
        };

        let wrapped = entry.operation.clone();
        let operation = Operation::named(name, move |subject, args| {
            let mut full = Vec::with_capacity(args.len() + 1);
            full.extend_from_slice(args);
            full.push(Value::Function(next.clone()));
            wrapped.invoke(subject, &full)
        })
        .with_declared_arity(entry.operation.arity());

        entries.insert(name.to_string(), TableEntry::composed(operation, kind));
    }

    log::debug!(
        "Resolved {} composed operation(s) over capability {}",
        entries.len(),
        current.id()
    );

    Ok(OperationTable::from_entries(
        entries,
        TableTags {
            mutating: table.is_mutating(),
            composable: false,
        },
    ))
}

/// The continuation passed to a composed operation: the last argument.
pub fn continuation(args: &[Value]) -> Result<&Callable> {
    args.last()
        .and_then(Value::as_callable)
        .ok_or_else(EngineError::missing_continuation)
}

/// Splits a composed operation's arguments into the caller's arguments and
/// the continuation.
pub fn split_continuation(args: &[Value]) -> Result<(&[Value], &Callable)> {
    let next = continuation(args)?;
    Ok((&args[..args.len() - 1], next))
}

/// Reduces a result to its bare form: capability objects become their state.
pub fn bare(value: Value) -> Value {
    match value {
        Value::Capability(capability) => match capability.state() {
            Some(state) => Value::State(state.clone()),
            None => Value::Capability(capability),
        },
        other => other,
    }
}

fn previous_operation(current: &Capability, name: &str) -> Callable {
    let below = current.clone();
    let target = name.to_string();
    Callable::new(format!("previous '{}'", name), move |args| {
        match below.perform(&target, args)? {
            Outcome::Transition(state) => Ok(Value::State(state)),
            Outcome::Value(value) => Ok(bare(value)),
        }
    })
}

fn dangling(name: &str) -> Callable {
    let target = name.to_string();
    Callable::new(format!("missing '{}'", name), move |_| {
        Err(EngineError::no_previous_operation(target.as_str()))
    })
}
