use criterion::{Criterion, black_box, criterion_group, criterion_main};

use fractal_field::{
    FieldBackend, FieldRegion, IterationParams, NeverCancel, NoProgress, ParallelBackend,
    ScalarBackend, SeedMode, TileLayout, TileScheduler, VectorizedBackend, ViewWindow,
};

fn bench_field_backends(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();

    let window = ViewWindow::new(-0.5, 0.0, 3.0, 128, 128).unwrap();
    let params = IterationParams::new(256, 4.0, SeedMode::Mandelbrot).unwrap();
    let region = FieldRegion::full(window);

    let mut group = c.benchmark_group("field_backends");

    group.bench_function("scalar", |b| {
        b.iter(|| {
            black_box(
                ScalarBackend::new(true)
                    .compute(region, &params, &NeverCancel, &NoProgress)
                    .unwrap(),
            )
        })
    });

    group.bench_function("vectorized", |b| {
        b.iter(|| {
            black_box(
                VectorizedBackend
                    .compute(region, &params, &NeverCancel, &NoProgress)
                    .unwrap(),
            )
        })
    });

    group.bench_function("parallel_rayon", |b| {
        b.iter(|| {
            black_box(
                ParallelBackend
                    .compute(region, &params, &NeverCancel, &NoProgress)
                    .unwrap(),
            )
        })
    });

    group.bench_function("tiled_5x5_scalar", |b| {
        let scheduler = TileScheduler::new(TileLayout::default(), ScalarBackend::new(true));
        b.iter(|| {
            black_box(
                scheduler
                    .compute(&window, &params, &NeverCancel, &NoProgress)
                    .unwrap(),
            )
        })
    });

    group.finish();
}

criterion_group!(benches, bench_field_backends);
criterion_main!(benches);
