//! # Slot Pool Benchmark
//!
//! Allocation, churn and handle resolution at the default unit pool capacity.
//!
//! Run with: `cargo bench --package tessera_core`

// Benchmarks don't need docs and may have intentionally unused code
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_core::{Kind, PoolRegistry, SlotPool};

/// Default unit pool capacity.
const CAPACITY: usize = 500;

#[derive(Clone, Copy, Default)]
struct Vehicle {
    x: i32,
    y: i32,
    health: u16,
    target: u32,
}

/// Benchmark: Fill an empty pool.
fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_pool");

    for capacity in [CAPACITY, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            let mut pool: SlotPool<Vehicle> = SlotPool::new(Kind::Unit, capacity).unwrap();
            b.iter(|| {
                pool.clear();
                while pool.allocate().is_ok() {}
                black_box(pool.active_count())
            });
        });
    }

    group.finish();
}

/// Benchmark: Free every other slot and refill, the typical combat churn.
fn bench_churn(c: &mut Criterion) {
    let mut pool: SlotPool<Vehicle> = SlotPool::new(Kind::Unit, CAPACITY).unwrap();
    while pool.allocate().is_ok() {}

    c.bench_function("churn_half_pool", |b| {
        b.iter(|| {
            for slot in (0..CAPACITY).step_by(2) {
                pool.free(slot).unwrap();
            }
            for _ in (0..CAPACITY).step_by(2) {
                black_box(pool.allocate().unwrap());
            }
        });
    });
}

/// Benchmark: Address to handle and back for every live slot.
fn bench_resolve(c: &mut Criterion) {
    let mut pool: SlotPool<Vehicle> = SlotPool::new(Kind::Unit, CAPACITY).unwrap();
    while pool.allocate().is_ok() {}
    let mut registry = PoolRegistry::new();
    registry.register(&pool).unwrap();

    c.bench_function("handle_roundtrip_500", |b| {
        b.iter(|| {
            let mut health = 0u32;
            for slot in 0..CAPACITY {
                let address = pool.address_of(slot).unwrap();
                let handle = registry.handle_of(address).unwrap();
                health += u32::from(registry.resolve::<Vehicle>(handle).unwrap().health);
            }
            black_box(health)
        });
    });
}

criterion_group!(benches, bench_fill, bench_churn, bench_resolve);
criterion_main!(benches);
