use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use flyclient_crypto::{hash_bytes, Digest};
use flyclient_mmr::MmrAccumulator;

fn det_leaves(n: usize) -> Vec<Digest> {
    (0..n as u64).map(|i| hash_bytes(&i.to_le_bytes())).collect()
}

fn bench_mmr(c: &mut Criterion) {
    let mut group = c.benchmark_group("mmr");
    for &n in &[1_000usize, 100_000] {
        let leaves = det_leaves(n);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_function(BenchmarkId::new("build", n), |b| {
            b.iter(|| black_box(MmrAccumulator::build(black_box(&leaves))));
        });

        let acc = MmrAccumulator::build(&leaves);
        let extra = hash_bytes(b"extra");
        group.bench_function(BenchmarkId::new("append", n), |b| {
            b.iter_batched(
                || acc.clone(),
                |a| black_box(a.append(black_box(extra))),
                BatchSize::LargeInput,
            );
        });

        let h = (n as i64) / 3 + 1;
        group.bench_function(BenchmarkId::new("path", n), |b| {
            b.iter(|| black_box(acc.path(black_box(h))));
        });

        let proof = acc.path(h).unwrap_or_default();
        group.bench_function(BenchmarkId::new("verify_proof", n), |b| {
            b.iter(|| black_box(acc.verify_proof(black_box(h), black_box(&proof))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_mmr);
criterion_main!(benches);
