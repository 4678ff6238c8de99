use criterion::*;
use std::hint::black_box;

mod common;
use common::*;

use frame_tracer::TableBuilder;

fn build_table_benchmark(c: &mut Criterion) {
    let boundaries = boundaries();
    let mut group = c.benchmark_group("build_table");

    for threads in [1usize, 4, 16] {
        group.bench_with_input(
            BenchmarkId::new("600_frames", threads),
            &threads,
            |b, &threads| {
                b.iter_batched(
                    || synthetic_streams(threads),
                    |streams| {
                        let table = TableBuilder::new(&boundaries)
                            .tick_scale(1.0e-3)
                            .build(&streams);
                        black_box(table.column_count());
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, build_table_benchmark);
criterion_main!(benches);
