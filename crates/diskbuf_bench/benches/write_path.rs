//! Write path benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use diskbuf_bench::{random_data, random_payloads, Drained};
use diskbuf_core::{Buffer, Config, ProcessContext};
use diskbuf_storage::{FileStore, InMemoryStore};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

/// Rotates rarely enough that most writes take the plain append path.
fn steady(buffer_size: usize) -> Config {
    Config::new()
        .flush_bytes(16 * 1024 * 1024)
        .buffer_size(buffer_size)
        .verbosity(0)
}

fn memory(config: Config) -> Drained {
    let ctx = Arc::new(ProcessContext::new());
    Drained::open(
        Buffer::builder(&ctx, "/bench/buffer").config(config),
        Arc::new(InMemoryStore::new()),
    )
}

fn file(dir: &TempDir, config: Config) -> Drained {
    let ctx = Arc::new(ProcessContext::new());
    Drained::open(
        Buffer::builder(&ctx, dir.path().join("bench")).config(config),
        Arc::new(FileStore::new()),
    )
}

/// Benchmark writes to an in-memory store, buffered and unbuffered.
fn bench_memory_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_write");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));

        for (label, buffer_size) in [("direct", 0), ("buffered", 64 * 1024)] {
            group.bench_with_input(BenchmarkId::new(label, size), size, |b, &size| {
                let drained = memory(steady(buffer_size));
                let data = random_data(size);

                b.iter(|| {
                    let n = drained.buffer.write(black_box(&data)).unwrap();
                    black_box(n);
                });

                drained.finish();
            });
        }
    }

    group.finish();
}

/// Benchmark writes to real files, buffered and unbuffered.
fn bench_file_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_write");

    // Use larger sample size for file operations
    group.sample_size(50);

    for size in [256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));

        for (label, buffer_size) in [("direct", 0), ("buffered", 64 * 1024)] {
            group.bench_with_input(BenchmarkId::new(label, size), size, |b, &size| {
                let temp_dir = TempDir::new().unwrap();
                let drained = file(&temp_dir, steady(buffer_size));
                let data = random_data(size);

                b.iter(|| {
                    let n = drained.buffer.write(black_box(&data)).unwrap();
                    black_box(n);
                });

                drained.finish();
            });
        }
    }

    group.finish();
}

/// Benchmark full rotations: every write closes a segment and opens the
/// next one.
fn bench_rotation(c: &mut Criterion) {
    let mut group = c.benchmark_group("rotation");
    group.sample_size(50);

    group.bench_function("memory", |b| {
        let drained = memory(Config::new().flush_writes(1).verbosity(0));
        let data = random_data(128);

        b.iter(|| {
            drained.buffer.write(black_box(&data)).unwrap();
        });

        drained.finish();
    });

    group.bench_function("file", |b| {
        let temp_dir = TempDir::new().unwrap();
        let drained = file(&temp_dir, Config::new().flush_writes(1).verbosity(0));
        let data = random_data(128);

        b.iter(|| {
            drained.buffer.write(black_box(&data)).unwrap();
        });

        drained.finish();
    });

    group.finish();
}

/// Benchmark contended writes from several threads.
fn bench_concurrent_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_write");
    let per_thread = 256;

    for threads in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements((*threads * per_thread) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            threads,
            |b, &threads| {
                let drained = memory(steady(64 * 1024).flush_writes(4096));
                let payloads = random_payloads(per_thread, 128);

                b.iter(|| {
                    thread::scope(|scope| {
                        for _ in 0..threads {
                            scope.spawn(|| {
                                for payload in &payloads {
                                    drained.buffer.write(payload).unwrap();
                                }
                            });
                        }
                    });
                });

                drained.finish();
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_memory_write,
    bench_file_write,
    bench_rotation,
    bench_concurrent_write,
);
criterion_main!(benches);
