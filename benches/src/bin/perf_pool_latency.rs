//! Latency profile for the pool's two tiers.
//!
//! Records per-operation alloc/free latency into HDR histograms, once with
//! a warm thread cache (balanced traffic, every operation a cache hit) and
//! once with a single-slot cache driven at depth two, so every cycle is
//! forced through the shared slab.
//!
//! Run: cargo run --release --bin perf_pool_latency
//! For stable numbers pin to a core: taskset -c 2 ...

use std::time::Instant;

use hdrhistogram::Histogram;
use tierpool::Pool;

const WARMUP: usize = 10_000;
const SAMPLES: usize = 1_000_000;
const BLOCK_SIZE: usize = 256;
const BLOCKS: usize = 16_384;

/// Time `depth` allocations followed by `depth` frees, per sample.
fn profile(pool: &Pool, depth: usize) -> Histogram<u64> {
    let mut hist = Histogram::<u64>::new_with_max(1_000_000, 3).unwrap();
    let mut held = Vec::with_capacity(depth);

    for _ in 0..WARMUP {
        for _ in 0..depth {
            let p = pool.alloc();
            assert!(!p.is_null());
            held.push(p);
        }
        for p in held.drain(..) {
            pool.free(p).unwrap();
        }
    }

    for _ in 0..SAMPLES {
        let start = Instant::now();
        for _ in 0..depth {
            held.push(pool.alloc());
        }
        for p in held.drain(..) {
            pool.free(p).unwrap();
        }
        let elapsed = start.elapsed().as_nanos() as u64 / depth as u64;
        let _ = hist.record(elapsed.min(1_000_000));
    }

    hist
}

fn print_histogram(name: &str, hist: &Histogram<u64>) {
    println!("{}:", name);
    println!("  min:   {:>7} ns", hist.min());
    println!("  p50:   {:>7} ns", hist.value_at_quantile(0.50));
    println!("  p99:   {:>7} ns", hist.value_at_quantile(0.99));
    println!("  p999:  {:>7} ns", hist.value_at_quantile(0.999));
    println!("  max:   {:>7} ns", hist.max());
}

fn main() {
    let cached = Pool::create(BLOCK_SIZE, 64, BLOCKS).unwrap();
    let hist = profile(&cached, 1);
    print_histogram("pool alloc/free pair (warm thread cache)", &hist);

    // One cache slot but two live blocks: the second allocation and the
    // second free of every cycle fall through to the slab.
    let spill = Pool::create(BLOCK_SIZE, 1, BLOCKS).unwrap();
    let hist = profile(&spill, 2);
    print_histogram("pool alloc/free pair (slab fall-through)", &hist);
}
