//! Benchmarks for the auto-player and the hot board operations.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use mergeboard::content::{default_catalog, default_config};
use mergeboard::sim::{SimConfig, run_simulation};
use mergeboard::{Coord, GameSession, ItemTypeId, ManualClock};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn bench_simulation(c: &mut Criterion) {
    let catalog = default_catalog().unwrap();
    let config = default_config().unwrap();

    c.bench_function("simulate_1000_steps", |b| {
        b.iter(|| {
            let result = run_simulation(
                black_box(42),
                black_box(&catalog),
                black_box(&config),
                SimConfig::default(),
            );
            black_box(result)
        });
    });
}

fn bench_merge_cluster(c: &mut Criterion) {
    let catalog = default_catalog().unwrap();
    let config = default_config().unwrap();
    let flower = ItemTypeId::new("flower_1");

    c.bench_function("merge_with_absorption", |b| {
        b.iter_batched(
            || {
                let mut session = GameSession::new(
                    catalog.clone(),
                    config.clone(),
                    ManualClock::new(0),
                    StdRng::seed_from_u64(0),
                )
                .unwrap();
                session.place(&flower, Coord::new(1, 5)).unwrap();
                session.place(&flower, Coord::new(2, 5)).unwrap();
                session.place(&flower, Coord::new(2, 6)).unwrap();
                session
            },
            |mut session| {
                let outcome = session.try_merge_at(Coord::new(1, 5), Coord::new(2, 5));
                black_box(outcome)
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let catalog = default_catalog().unwrap();
    let config = default_config().unwrap();
    let session = GameSession::new(
        catalog,
        config,
        ManualClock::new(0),
        StdRng::seed_from_u64(0),
    )
    .unwrap();

    c.bench_function("snapshot_to_json", |b| {
        b.iter(|| black_box(session.snapshot().to_json()));
    });
}

criterion_group!(
    benches,
    bench_simulation,
    bench_merge_cluster,
    bench_snapshot
);
criterion_main!(benches);
