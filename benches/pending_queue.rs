//! Benchmarks for pending queue admission and relay throughput.
//!
//! Benchmark targets:
//! - Admission of distinct keys: <1us per item
//! - Admission of duplicate keys: <500ns per item
//! - Relay throughput (1000 items, 10% distinct): <5ms

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use unique_queue::{PendingQueue, UniqueQueue, UniqueQueueConfig};

// ============================================================================
// Pending Queue Benchmarks
// ============================================================================

fn bench_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("pending_queue");
    group.measurement_time(Duration::from_secs(5));

    for size in [10_usize, 100, 1000] {
        group.throughput(Throughput::Elements(size as u64));

        // Every key distinct: push everything, then pop everything
        group.bench_with_input(BenchmarkId::new("distinct", size), &size, |b, &size| {
            b.iter(|| {
                let mut queue = PendingQueue::new(size, |n: &usize| n.to_string());
                for n in 0..size {
                    black_box(queue.push_unique(n));
                }
                while let Some(n) = queue.pop() {
                    black_box(n);
                }
            });
        });

        // Every push after the first is a duplicate
        group.bench_with_input(BenchmarkId::new("duplicate", size), &size, |b, &size| {
            b.iter(|| {
                let mut queue = PendingQueue::new(size, |n: &usize| n.to_string());
                for _ in 0..size {
                    black_box(queue.push_unique(7));
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Relay Benchmarks
// ============================================================================

fn bench_relay(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("relay");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Elements(1000));

    group.bench_function("throughput_1000", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut queue =
                    UniqueQueue::init(UniqueQueueConfig::new(|n: &usize| n.to_string())).unwrap();
                let input = queue.take_input_sender().unwrap();
                let mut output = queue.take_output_receiver().unwrap();
                queue.run().unwrap();

                let consumer = tokio::spawn(async move {
                    let mut count = 0_usize;
                    while output.recv().await.is_some() {
                        count += 1;
                    }
                    count
                });

                for n in 0..1000_usize {
                    input.send(n % 100).await.unwrap();
                }
                drop(input);

                queue.close().await.unwrap();
                black_box(consumer.await.unwrap())
            })
        });
    });

    group.finish();
}

criterion_group!(benches, bench_admission, bench_relay);
criterion_main!(benches);
