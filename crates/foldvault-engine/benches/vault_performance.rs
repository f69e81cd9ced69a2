//! Benchmarks for store, retrieve and indexed queries

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use foldvault_config::Config;
use foldvault_engine::{StoreRequest, VaultEngine};

fn source_text(size: usize) -> Vec<u8> {
    let mut text = Vec::with_capacity(size);
    let mut i = 0usize;
    while text.len() < size {
        text.extend_from_slice(
            format!(
                "pub fn route_{}(ctx: &Context) -> Reply {{\n    ctx.reply({})\n}}\n",
                i % 23,
                i
            )
            .as_bytes(),
        );
        i += 1;
    }
    text.truncate(size);
    text
}

fn bench_store(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = rt
        .block_on(VaultEngine::with_config(Config::default()))
        .unwrap();

    let mut group = c.benchmark_group("store");
    for (name, size) in [("4KB", 4 * 1024), ("64KB", 64 * 1024), ("1MB", 1024 * 1024)] {
        let content = source_text(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &content, |b, content| {
            b.to_async(&rt).iter(|| async {
                black_box(
                    engine
                        .store(StoreRequest::new("bench", "c", "n", content.clone()))
                        .await
                        .unwrap(),
                );
            });
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (engine, id) = rt.block_on(async {
        let engine = VaultEngine::with_config(Config::default()).await.unwrap();
        let id = engine
            .store(StoreRequest::new("bench", "c", "n", source_text(256 * 1024)))
            .await
            .unwrap()
            .record_id;
        (engine, id)
    });

    c.bench_function("retrieve_256KB", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(engine.retrieve("bench", &id).await.unwrap()) });
    });
    c.bench_function("range_10_lines", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(engine.retrieve_range("bench", &id, 500, 509).await.unwrap())
        });
    });
    c.bench_function("search_indexed", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(engine.search("bench", &id, "route_7", 16).await.unwrap()) });
    });
    c.bench_function("search_scan", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(engine.search("bench", &id, "ctx.reply(9", 16).await.unwrap())
        });
    });
}

criterion_group!(benches, bench_store, bench_queries);
criterion_main!(benches);
