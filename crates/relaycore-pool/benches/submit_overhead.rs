use criterion::{criterion_group, criterion_main, Criterion};
use relaycore_pool::{Pool, PoolConfig};
use std::hint::black_box;

fn submit_nonblocking(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let pool = rt.block_on(async {
        Pool::new(
            PoolConfig::builder()
                .name("bench-nonblocking")
                .capacity(256)
                .blocking(false)
                .build()
                .unwrap(),
        )
    });

    c.bench_function("pool_submit_nonblocking", |b| {
        b.to_async(&rt).iter(|| {
            let pool = pool.clone();
            async move {
                let outcome = pool.submit(async { black_box(1 + 1) }).await.unwrap().await;
                black_box(outcome);
            }
        });
    });
}

fn submit_blocking(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let pool = rt.block_on(async {
        Pool::new(
            PoolConfig::builder()
                .name("bench-blocking")
                .capacity(256)
                .blocking(true)
                .build()
                .unwrap(),
        )
    });

    c.bench_function("pool_submit_blocking", |b| {
        b.to_async(&rt).iter(|| {
            let pool = pool.clone();
            async move {
                let outcome = pool.submit(async { black_box(1 + 1) }).await.unwrap().await;
                black_box(outcome);
            }
        });
    });
}

criterion_group!(benches, submit_nonblocking, submit_blocking);
criterion_main!(benches);
