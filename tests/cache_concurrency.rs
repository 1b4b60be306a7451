// tests/cache_concurrency.rs
//! The construction cache under parallel use, and its transparency: the
//! same calls behave identically with caching on or off.

mod common;

use capbind::{Binder, EngineConfig, InvokeExt, Value};
use common::{count_reader, counter_state, counter_table, isolated_binder, uncached_binder};
use rayon::prelude::*;

fn run_script(binder: &Binder) -> Vec<i64> {
    let cap = binder
        .layer(counter_state(0), counter_table())
        .and_then(|acc| acc.with(count_reader()))
        .unwrap()
        .finish();

    let mut seen = Vec::new();
    let mut current = cap;
    for step in 1..=5 {
        current = current.chain("add", &[Value::from(step)]).unwrap();
        seen.push(current.read_i64("count", &[]).unwrap());
    }
    seen
}

#[test]
fn caching_is_unobservable() {
    let cached = run_script(&isolated_binder());
    let uncached = run_script(&uncached_binder());
    assert_eq!(cached, vec![1, 3, 6, 10, 15]);
    assert_eq!(cached, uncached);
}

#[test]
fn disabled_cache_builds_fresh_objects() {
    let binder = uncached_binder();
    let state = counter_state(0);
    let table = counter_table();

    let a = binder.bind(state.clone(), table.clone()).unwrap();
    let b = binder.bind(state, table).unwrap();

    assert_ne!(a.id(), b.id());
    assert_eq!(binder.cache_stats().entries, 0);
}

#[test]
fn parallel_binds_of_one_pair_agree() {
    let binder = isolated_binder();
    let state = counter_state(0);
    let table = counter_table();

    let ids: Vec<_> = (0..64)
        .into_par_iter()
        .map(|_| binder.bind(state.clone(), table.clone()).unwrap().id())
        .collect();

    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(binder.cache_stats().entries, 1);
}

#[test]
fn parallel_chains_stay_independent() {
    let binder = Binder::new(EngineConfig {
        cache_capacity: 8,
        ..EngineConfig::default()
    });
    let base = binder.bind(counter_state(0), counter_table()).unwrap();

    let totals: Vec<i64> = (1..=32_i64)
        .into_par_iter()
        .map(|n| {
            let mut cap = base.clone();
            for _ in 0..n {
                cap = cap.chain("increment", &[]).unwrap();
            }
            cap.state().and_then(|s| s.get_i64("count")).unwrap()
        })
        .collect();

    assert_eq!(totals, (1..=32).collect::<Vec<_>>());
    assert!(binder.cache_stats().entries <= 8);
    assert_eq!(base.state().and_then(|s| s.get_i64("count")), Some(0));
}

#[test]
fn builds_started_from_one_state_share_the_base() {
    let binder = isolated_binder();
    let state = counter_state(0);
    let table = counter_table();

    let a = binder.layer(state.clone(), table.clone()).unwrap();
    let b = binder.layer(state, table).unwrap();

    assert_eq!(a.current().id(), b.current().id());
    assert_eq!(binder.cache_stats().hits, 1);
}
