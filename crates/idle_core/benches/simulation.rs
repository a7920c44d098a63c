//! Stepping benchmarks for idle_core.
//!
//! Run with: `cargo bench -p idle_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use idle_core::prelude::{MemoryStore, OfflineReconciler, Session};
use idle_test_utils::fixtures::{sample_catalog, sample_session, session_with, T0};

/// Session with every shipped building unlocked at level 25, boosts running.
fn developed_session() -> Session {
    let mut snapshot = sample_session().snapshot();
    for building in &mut snapshot.buildings {
        building.is_unlocked = true;
        building.level = 25;
    }
    let mut session = session_with(sample_catalog(), MemoryStore::with_snapshot(snapshot), T0);
    let _ = session.activate_module("dojo", "drills");
    let _ = session.activate_module("castle", "couriers");
    session
}

/// Runs stepping benchmarks for the idle_core crate.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("step_60hz_one_minute", |b| {
        b.iter_batched(
            developed_session,
            |mut session| {
                for _ in 0..3_600 {
                    session.step(black_box(1.0 / 60.0));
                }
                session.ledger().gold()
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("offline_reconcile", |b| {
        let session = developed_session();
        let reconciler = OfflineReconciler::default();
        b.iter(|| {
            reconciler.reconcile(
                Some(T0),
                black_box(T0 + 50_000),
                session.buildings().map(|b| (b.config(), b.data())),
                1.0,
            )
        });
    });

    c.bench_function("state_hash", |b| {
        let session = developed_session();
        b.iter(|| black_box(session.state_hash()));
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
