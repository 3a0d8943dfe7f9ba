//! Microbenchmarks for the three engines.
//!
//! Run with: cargo bench
//!
//! The interesting comparisons are slab vs. pool on the alloc/free cycle
//! (the pool's thread cache should win once warm) and the arena's bump
//! against both.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tierpool::{Arena, Pool, Slab};

const BLOCK_SIZE: usize = 256;
const BLOCKS: usize = 16_384;
const BATCH: usize = 64;

// ============================================================================
// Slab
// ============================================================================

fn bench_slab(c: &mut Criterion) {
    let mut group = c.benchmark_group("slab");

    let slab = Slab::create(BLOCK_SIZE, BLOCKS).unwrap();
    group.bench_function("alloc_free_cycle", |b| {
        b.iter(|| {
            let p = slab.alloc();
            black_box(p);
            slab.free(p).unwrap();
        });
    });

    group.throughput(Throughput::Elements(BATCH as u64));
    group.bench_function("alloc_free_batch", |b| {
        let mut held = Vec::with_capacity(BATCH);
        b.iter(|| {
            for _ in 0..BATCH {
                held.push(slab.alloc());
            }
            for p in held.drain(..) {
                slab.free(black_box(p)).unwrap();
            }
        });
    });

    group.finish();
}

// ============================================================================
// Arena
// ============================================================================

fn bench_arena(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena");

    let arena = Arena::create(BATCH * BLOCK_SIZE).unwrap();
    group.throughput(Throughput::Elements(BATCH as u64));
    group.bench_function("bump_then_reset", |b| {
        b.iter(|| {
            for _ in 0..BATCH {
                black_box(arena.alloc(BLOCK_SIZE));
            }
            arena.reset();
        });
    });

    group.finish();
}

// ============================================================================
// Pool: warm cache vs. forced slab fall-through
// ============================================================================

fn bench_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool");

    // Warm path: cache big enough that a balanced cycle never misses.
    let pool = Pool::create(BLOCK_SIZE, BATCH, BLOCKS).unwrap();
    let p = pool.alloc();
    pool.free(p).unwrap();
    group.bench_function("alloc_free_cached", |b| {
        b.iter(|| {
            let p = pool.alloc();
            black_box(p);
            pool.free(p).unwrap();
        });
    });

    // Spill path: single-slot cache, batches force slab traffic.
    let spill = Pool::create(BLOCK_SIZE, 1, BLOCKS).unwrap();
    group.throughput(Throughput::Elements(BATCH as u64));
    group.bench_function("alloc_free_spill", |b| {
        let mut held = Vec::with_capacity(BATCH);
        b.iter(|| {
            for _ in 0..BATCH {
                held.push(spill.alloc());
            }
            for p in held.drain(..) {
                spill.free(black_box(p)).unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_slab, bench_arena, bench_pool);
criterion_main!(benches);
