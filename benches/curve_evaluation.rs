//! Benchmark suite for the schedule calculator
//!
//! Measures creation-time validation and per-query evaluation of segmented
//! schedules at several sizes, using the divan benchmarking framework. The
//! per-query evaluation is the hot path: it runs on every withdrawal, cancel,
//! and status query.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```

use rust_decimal::Decimal;
use rust_streaming_engine::core::curve;
use rust_streaming_engine::types::Segment;

fn main() {
    divan::main();
}

/// Build a schedule of `count` equal linear-ish segments, alternating
/// exponents to mix the integer and fractional power paths.
fn schedule(count: u64) -> Vec<Segment> {
    (1..=count)
        .map(|i| Segment {
            amount: Decimal::new(1000, 0),
            exponent: if i % 2 == 0 {
                Decimal::TWO
            } else {
                Decimal::new(5, 1)
            },
            milestone: i * 100,
        })
        .collect()
}

#[divan::bench(args = [1, 10, 100, 300])]
fn validate_segments(bencher: divan::Bencher, count: u64) {
    let segments = schedule(count);

    bencher.bench_local(|| curve::validate_segments(0, divan::black_box(&segments)));
}

#[divan::bench(args = [1, 10, 100, 300])]
fn unlocked_amount_midway(bencher: divan::Bencher, count: u64) {
    let segments = schedule(count);
    // Query inside the last segment: the whole schedule is scanned.
    let now = count * 100 - 50;

    bencher.bench_local(|| {
        curve::unlocked_amount(divan::black_box(&segments), 0, divan::black_box(now))
    });
}

#[divan::bench(args = [1, 10, 100, 300])]
fn unlocked_amount_past_end(bencher: divan::Bencher, count: u64) {
    let segments = schedule(count);
    let now = count * 100 + 1;

    bencher.bench_local(|| {
        curve::unlocked_amount(divan::black_box(&segments), 0, divan::black_box(now))
    });
}
