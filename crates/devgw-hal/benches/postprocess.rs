//! Benchmarks for result post-processing
//!
//! Run with: cargo bench -p devgw-hal

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use devgw_hal::mitigation::{AssignmentMatrix, nearest_distribution};
use devgw_hal::{ClassicalBitMap, Counts, remap};
use devgw_ir::{ClbitId, QubitId};

/// Every bitstring of `width` bits with a count of 1.
fn uniform_counts(width: usize) -> Counts {
    (0..1usize << width)
        .map(|i| (format!("{i:0width$b}"), 1))
        .collect()
}

fn bench_remap(c: &mut Criterion) {
    let mut group = c.benchmark_group("remap");

    for width in &[4usize, 8, 12] {
        let raw = uniform_counts(*width);
        let mut bits = ClassicalBitMap::new(*width);
        for i in 0..*width {
            // Reverse the qubit order so every bit moves.
            bits.assign(ClbitId(i as u32), QubitId((width - 1 - i) as u32), format!("Q{i:02}"));
        }
        group.bench_with_input(BenchmarkId::new("reverse", width), width, |b, _| {
            b.iter(|| remap(black_box(&raw), black_box(&bits)).unwrap());
        });
    }

    group.finish();
}

fn bench_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_distribution");
    let amat: AssignmentMatrix = [[0.98, 0.03], [0.02, 0.97]];

    for width in &[2usize, 6, 10, 14] {
        let counts = uniform_counts(*width);
        let matrices = vec![amat; *width];
        group.bench_with_input(BenchmarkId::new("bits", width), width, |b, _| {
            b.iter(|| nearest_distribution(black_box(&counts), black_box(&matrices), 10_000).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_remap, bench_nearest);
criterion_main!(benches);
