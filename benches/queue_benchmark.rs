use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use async_queue::queue::{BoxError, PriorityBuffer};
use async_queue::{AsyncQueue, ConcurrencyLimitedTaskQueue, OrderedBuffer, SequentialTaskQueue};
use std::collections::VecDeque;

fn bench_ordered_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("ordered_buffer");

    for size in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("enqueue_dequeue", size), &size, |b, &size| {
            b.iter(|| {
                let mut buffer = OrderedBuffer::new();
                for i in 0..size {
                    buffer.enqueue(black_box(i));
                }
                while let Some(item) = buffer.dequeue() {
                    black_box(item);
                }
            })
        });

        // Baseline
        group.bench_with_input(BenchmarkId::new("vecdeque", size), &size, |b, &size| {
            b.iter(|| {
                let mut buffer = VecDeque::new();
                for i in 0..size {
                    buffer.push_back(black_box(i));
                }
                while let Some(item) = buffer.pop_front() {
                    black_box(item);
                }
            })
        });
    }

    group.bench_function("prequeue_interleaved", |b| {
        b.iter(|| {
            let mut buffer = OrderedBuffer::new();
            for i in 0..1_000 {
                if i % 3 == 0 {
                    buffer.prequeue(black_box(i));
                } else {
                    buffer.enqueue(black_box(i));
                }
            }
            black_box(buffer.iter().count())
        })
    });

    group.finish();
}

fn bench_priority_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("priority_buffer");

    // Linear insert and select, so keep sizes modest
    for size in [10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::new("mixed_priorities", size), &size, |b, &size| {
            b.iter(|| {
                let mut buffer = PriorityBuffer::new();
                for i in 0..size {
                    buffer.insert(black_box(i), (i % 5) as i64);
                }
                while let Some(item) = buffer.dequeue() {
                    black_box(item);
                }
            })
        });
    }

    group.finish();
}

fn bench_queue_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_throughput");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");
    let tasks = 500u64;
    group.throughput(Throughput::Elements(tasks));

    group.bench_function("sequential", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let queue = SequentialTaskQueue::new("bench");
                let handles: Vec<_> = (0..tasks)
                    .map(|i| queue.add_task(move || async move { Ok::<_, BoxError>(i) }))
                    .collect();
                for handle in handles {
                    black_box(handle.await.ok());
                }
            })
        })
    });

    for limit in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::new("concurrent", limit), &limit, |b, &limit| {
            b.iter(|| {
                runtime.block_on(async {
                    let queue = ConcurrencyLimitedTaskQueue::new("bench", limit).expect("valid limit");
                    let handles: Vec<_> = (0..tasks)
                        .map(|i| {
                            queue.add_task(move || async move {
                                tokio::task::yield_now().await;
                                Ok::<_, BoxError>(i)
                            })
                        })
                        .collect();
                    for handle in handles {
                        black_box(handle.await.ok());
                    }
                })
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_ordered_buffer,
    bench_priority_buffer,
    bench_queue_throughput
);
criterion_main!(benches);
