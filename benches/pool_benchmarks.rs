use bounded_workpool::{Pool, Silent};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::{hint::black_box, sync::Arc};

fn quiet_pool(workers: usize) -> Pool {
    Pool::new(workers).unwrap().with_observer(Arc::new(Silent))
}

fn create_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()
        .unwrap()
}

// Benchmark 1: end-to-end overhead of one blocking run
fn bench_blocking_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("blocking_run");

    for size in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));

        for workers in [1, 4, num_cpus::get()] {
            group.bench_with_input(
                BenchmarkId::new(format!("workers_{workers}"), size),
                &size,
                |b, &size| {
                    b.iter(|| {
                        // A pool runs once, so every iteration builds a new one.
                        let pool = quiet_pool(workers);
                        let mut sum = 0usize;
                        pool.start(
                            0..size,
                            |n: &usize| {
                                black_box(n.wrapping_mul(7));
                                Ok::<(), String>(())
                            },
                            |outcome| {
                                sum += outcome.id();
                                Ok(())
                            },
                        )
                        .unwrap();
                        black_box(sum)
                    });
                },
            );
        }
    }

    group.finish();
}

// Benchmark 2: the same runs on tokio
fn bench_async_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_run");
    let rt = create_runtime();

    for size in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("workers_4", size), &size, |b, &size| {
            b.to_async(&rt).iter(|| async move {
                let pool = quiet_pool(4);
                pool.start_async(
                    0..size,
                    |n: &usize| {
                        black_box(n.wrapping_mul(7));
                        Ok::<(), String>(())
                    },
                    |outcome| {
                        black_box(outcome.id());
                        Ok(())
                    },
                )
                .await
                .unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_blocking_run, bench_async_run);
criterion_main!(benches);
