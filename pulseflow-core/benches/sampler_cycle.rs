// Sampler benchmarks: the cost of one gate on the real-time path
//
// Covers the full cycle (drain, convert, smooth, publish), the pure
// conversion, and a snapshot read from the reporting side.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pulseflow_core::{
    config::FlowConfig, convert, counter::SimulatedCounter, time::MockTimeSource, Calibration,
    FlowMeter, Smoother,
};

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampler_cycle");

    for &edges in &[0u32, 264, 5_000] {
        let meter = FlowMeter::new(FlowConfig::default(), SimulatedCounter::new(30_000))
            .expect("default config is valid");
        let clock = MockTimeSource::new(0);
        let mut sampler = meter.sampler(&clock).expect("fresh store");

        group.bench_with_input(BenchmarkId::from_parameter(edges), &edges, |b, &edges| {
            b.iter(|| {
                meter.counter().unit().inject(edges as i32);
                clock.advance(1_000);
                black_box(sampler.cycle().expect("cycle"))
            })
        });
    }
    group.finish();
}

fn bench_convert(c: &mut Criterion) {
    let calibration = Calibration::new(1319.0, 1.02);

    c.bench_function("convert", |b| {
        b.iter(|| convert(black_box(1319), black_box(1.0), &calibration))
    });
}

fn bench_smoother(c: &mut Criterion) {
    let readings: Vec<f32> = (0..64).map(|i| (i % 16) as f32 * 0.75).collect();

    c.bench_function("smoother_update_64", |b| {
        b.iter(|| {
            let mut smoother = Smoother::default();
            for &reading in &readings {
                black_box(smoother.update(reading));
            }
        })
    });
}

fn bench_report(c: &mut Criterion) {
    let meter = FlowMeter::new(FlowConfig::default(), SimulatedCounter::new(30_000))
        .expect("default config is valid");

    c.bench_function("report_read", |b| b.iter(|| black_box(meter.report().expect("read"))));
}

criterion_group!(benches, bench_cycle, bench_convert, bench_smoother, bench_report);
criterion_main!(benches);
