use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use shmap::{AccessMode, Mapping, current_thread_id};
use std::sync::Arc;
use std::thread;
use tempfile::NamedTempFile;

fn mapping(len: usize) -> (NamedTempFile, Mapping) {
    let temp_file = NamedTempFile::new().unwrap();
    temp_file.as_file().set_len(len as u64).unwrap();
    let mapping = Mapping::open(temp_file.as_file(), AccessMode::ReadWrite, len).unwrap();
    (temp_file, mapping)
}

fn benchmark_open_close(c: &mut Criterion) {
    let mut group = c.benchmark_group("open_close");

    let sizes = [
        (4096, "4KB"),
        (1024 * 1024, "1MB"),
        (64 * 1024 * 1024, "64MB"),
    ];

    for (size, label) in sizes.iter() {
        let temp_file = NamedTempFile::new().unwrap();
        temp_file.as_file().set_len(*size as u64).unwrap();

        group.bench_with_input(BenchmarkId::new("read_write", label), size, |b, &size| {
            b.iter(|| {
                let mapping =
                    Mapping::open(temp_file.as_file(), AccessMode::ReadWrite, size).unwrap();
                mapping.close().unwrap();
            });
        });
    }

    group.finish();
}

fn benchmark_read_u64(c: &mut Criterion) {
    let (_file, mapping) = mapping(4096);
    mapping.store_u64(64, 42).unwrap();

    let mut group = c.benchmark_group("read_u64");
    group.bench_function("aligned", |b| {
        b.iter(|| black_box(mapping.read_u64(black_box(64)).unwrap()));
    });
    group.bench_function("unaligned", |b| {
        b.iter(|| black_box(mapping.read_u64(black_box(61)).unwrap()));
    });
    group.finish();
}

fn benchmark_uncontended_cas(c: &mut Criterion) {
    let (_file, mapping) = mapping(4096);

    c.bench_function("cas_uncontended_increment", |b| {
        let mut value = 0u64;
        b.iter(|| {
            let previous = mapping.compare_and_swap(0, value, value + 1).unwrap();
            debug_assert_eq!(previous, value);
            value += 1;
        });
    });

    c.bench_function("cas_failed", |b| {
        b.iter(|| black_box(mapping.compare_and_swap(8, black_box(u64::MAX), 1).unwrap()));
    });
}

fn benchmark_contended_cas(c: &mut Criterion) {
    let mut group = c.benchmark_group("cas_contended");

    for threads in [2usize, 4] {
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            let (_file, mapping) = mapping(4096);
            let mapping = Arc::new(mapping);

            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let mapping = Arc::clone(&mapping);
                        thread::spawn(move || {
                            for _ in 0..1_000 {
                                let mut observed = mapping.read_u64(0).unwrap();
                                loop {
                                    let previous = mapping
                                        .compare_and_swap(0, observed, observed + 1)
                                        .unwrap();
                                    if previous == observed {
                                        break;
                                    }
                                    observed = previous;
                                }
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

fn benchmark_thread_id(c: &mut Criterion) {
    c.bench_function("current_thread_id", |b| {
        b.iter(|| black_box(current_thread_id()));
    });
}

criterion_group!(
    benches,
    benchmark_open_close,
    benchmark_read_u64,
    benchmark_uncontended_cas,
    benchmark_contended_cas,
    benchmark_thread_id
);
criterion_main!(benches);
