//! Benchmark: segment analysis and chunked code reads
//!
//! Measures the cost of classifying bytecode and of reading ranges out of chunked code compared
//! to a flat buffer.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use ubt_code::{
    chunkify_code, Address, AddressPoint, CodeBitmap, ContractCode, FlatCode, MemoryTree,
    TreeCode,
};

fn random_code(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..len).map(|_| rng.gen()).collect()
}

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");

    for len in [1_024usize, 24_576] {
        let code = random_code(len);
        group.throughput(Throughput::Bytes(len as u64));

        group.bench_with_input(BenchmarkId::new("bitmap", len), &code, |b, code| {
            b.iter(|| CodeBitmap::new(black_box(code)))
        });
        group.bench_with_input(BenchmarkId::new("chunkify", len), &code, |b, code| {
            b.iter(|| chunkify_code(black_box(code)))
        });
    }

    group.finish();
}

fn bench_range_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_range");
    let address = Address::repeat_byte(0x42);
    let code = random_code(24_576);
    let mut tree = MemoryTree::new();
    tree.insert_code(address, &code);
    let flat = FlatCode::new(address, code.clone(), vec![0..=code.len() as u64 - 1]);

    for width in [1u64, 32, 1_024] {
        group.throughput(Throughput::Bytes(width));

        group.bench_with_input(BenchmarkId::new("flat", width), &width, |b, &width| {
            b.iter(|| flat.get_range(black_box(100), black_box(100 + width - 1)))
        });
        group.bench_with_input(BenchmarkId::new("chunked", width), &width, |b, &width| {
            let reader = TreeCode::new(AddressPoint::new(address), &tree);
            b.iter(|| reader.get_range(black_box(100), black_box(100 + width - 1)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_analysis, bench_range_reads);
criterion_main!(benches);
