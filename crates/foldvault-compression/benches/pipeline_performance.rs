//! Benchmarks for strategy selection and multi-stage folding

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use foldvault_compression::{analyze, AlgorithmImpl, FoldingPipeline};
use foldvault_types::{CodecConfig, StrategyId};

/// Generate test data with realistic patterns
fn generate_source_text(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut i = 0usize;
    while data.len() < size {
        data.extend_from_slice(
            format!(
                "fn step_{}(state: &mut State) -> Result<()> {{\n    state.advance({})?;\n    Ok(())\n}}\n",
                i % 31,
                i
            )
            .as_bytes(),
        );
        i += 1;
    }
    data.truncate(size);
    data
}

fn generate_noise(size: usize) -> Vec<u8> {
    let mut state = 0x9E37_79B9u32;
    (0..size)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 8) as u8
        })
        .collect()
}

fn bench_codecs(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_encode");
    let data = generate_source_text(64 * 1024);
    let config = CodecConfig::default();
    group.throughput(Throughput::Bytes(data.len() as u64));

    for &strategy in StrategyId::all() {
        let codec = AlgorithmImpl::create(strategy, &config);
        group.bench_with_input(BenchmarkId::new("encode", strategy), &data, |b, data| {
            b.iter(|| codec.encode(black_box(data)));
        });
    }
    group.finish();
}

fn bench_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold");
    let pipeline = FoldingPipeline::default();

    let sizes = [("1KB", 1024), ("16KB", 16 * 1024), ("256KB", 256 * 1024)];
    for (name, size) in sizes {
        let text = generate_source_text(size);
        let noise = generate_noise(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("source_text", name), &text, |b, data| {
            b.iter(|| pipeline.fold(black_box(data), None));
        });
        group.bench_with_input(BenchmarkId::new("noise", name), &noise, |b, data| {
            b.iter(|| pipeline.fold(black_box(data), None));
        });
    }
    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let data = generate_source_text(256 * 1024);
    c.bench_function("analyze_256KB", |b| b.iter(|| analyze(black_box(&data))));
}

criterion_group!(benches, bench_codecs, bench_fold, bench_analyze);
criterion_main!(benches);
