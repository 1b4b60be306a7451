// benches/bind_bench.rs
//! Benchmarks for binding, chaining and layered rebuilds.

use capbind::{
    composable, int_arg, mutating, split_continuation, Binder, Capability, EngineConfig,
    EngineError, InvokeExt, OperationTable, State, Value,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

fn counter_table() -> OperationTable {
    mutating(
        &OperationTable::builder()
            .operation_with_arity("add", 1, |subject, args| {
                let state = subject
                    .carried_state()
                    .ok_or_else(|| EngineError::raised("expected a state"))?;
                let count = state.get_i64("count").unwrap_or(0);
                Ok(Value::from(state.with("count", count + int_arg(args, 0)?)))
            })
            .build()
            .unwrap(),
    )
}

fn reader_table(index: usize) -> OperationTable {
    OperationTable::builder()
        .operation(format!("read_{}", index), |subject, _| {
            Ok(subject.field("count").cloned().map_or(Value::Unit, Value::Data))
        })
        .build()
        .unwrap()
}

fn passthrough() -> OperationTable {
    composable(
        &OperationTable::builder()
            .operation_with_arity("add", 1, |_, args| {
                let (own, previous) = split_continuation(args)?;
                previous.call(own)
            })
            .build()
            .unwrap(),
    )
}

/// A counter with `layers` reader layers and one composed `add` on top.
fn layered(binder: &Binder, layers: usize) -> Capability {
    let mut acc = binder
        .layer(json!({ "count": 0 }), counter_table())
        .unwrap();
    for index in 0..layers {
        acc = acc.with(reader_table(index)).unwrap();
    }
    acc.with(passthrough()).unwrap().finish()
}

fn bench_bind(c: &mut Criterion) {
    let mut group = c.benchmark_group("bind");
    let table = counter_table();
    let state = State::from_json(json!({ "count": 0 })).unwrap();

    for (name, capacity) in [("cached", 1024), ("uncached", 0)] {
        let binder = Binder::new(EngineConfig {
            cache_capacity: capacity,
            ..EngineConfig::default()
        });
        group.bench_with_input(BenchmarkId::new("same_pair", name), &binder, |b, binder| {
            b.iter(|| {
                binder
                    .bind(black_box(state.clone()), black_box(&table))
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    let binder = Binder::new(EngineConfig::default());

    for layers in [0_usize, 4, 16] {
        let cap = layered(&binder, layers);
        group.bench_with_input(BenchmarkId::new("add", layers), &cap, |b, cap| {
            b.iter(|| cap.chain("add", &[Value::from(black_box(1))]).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bind, bench_chain);
criterion_main!(benches);
