// tests/common/mod.rs
//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use capbind::{
    int_arg, mutating, Binder, EngineConfig, EngineError, OperationTable, State, Value,
};
use serde_json::json;

/// A binder with its own cache, so suites never share hit counters.
pub fn isolated_binder() -> Binder {
    Binder::new(EngineConfig::default())
}

pub fn uncached_binder() -> Binder {
    Binder::new(EngineConfig::default().uncached())
}

pub fn counter_state(count: i64) -> State {
    State::from_json(json!({ "count": count })).expect("record")
}

pub fn count_of(value: &Value) -> Option<i64> {
    value.field("count").and_then(|count| count.as_i64())
}

fn current_count(subject: &Value) -> i64 {
    count_of(subject).unwrap_or(0)
}

/// The subject's state with `key` replaced; every other field is kept.
pub fn updated(subject: &Value, key: &str, value: i64) -> capbind::Result<Value> {
    let state = subject
        .carried_state()
        .ok_or_else(|| EngineError::raised("expected a bound state"))?;
    Ok(Value::from(state.with(key, value)))
}

/// `increment()` and `add(n)` over a `{ count }` record.
pub fn counter_table() -> OperationTable {
    mutating(
        &OperationTable::builder()
            .operation_with_arity("increment", 0, |subject, _| {
                updated(subject, "count", current_count(subject) + 1)
            })
            .operation_with_arity("add", 1, |subject, args| {
                updated(subject, "count", current_count(subject) + int_arg(args, 0)?)
            })
            .build()
            .expect("counter table"),
    )
}

/// `count()` reading the state of whatever it is bound to.
pub fn count_reader() -> OperationTable {
    OperationTable::builder()
        .operation_with_arity("count", 0, |subject, _| {
            Ok(Value::from(current_count(subject)))
        })
        .build()
        .expect("count reader")
}

/// A mutating `withdraw(n)` that refuses to overdraw `{ balance }`.
pub fn account_table() -> OperationTable {
    mutating(
        &OperationTable::builder()
            .operation_with_arity("withdraw", 1, |subject, args| {
                let amount = int_arg(args, 0)?;
                let balance = subject
                    .field("balance")
                    .and_then(|balance| balance.as_i64())
                    .unwrap_or(0);
                if amount > balance {
                    return Err(EngineError::raised(format!(
                        "insufficient funds: balance {}, requested {}",
                        balance, amount
                    )));
                }
                updated(subject, "balance", balance - amount)
            })
            .build()
            .expect("account table"),
    )
}

pub fn balance_of(value: &Value) -> Option<i64> {
    value.field("balance").and_then(|balance| balance.as_i64())
}
