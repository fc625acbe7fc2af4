use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use scope_sim::{Layout, SimConfig, SimulationDriver};

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for (label, clusters, sub_units, lanes) in [
        ("compact", 3u32, 4u32, 32u32),
        ("rtx_4090", 7, 9, 128),
        ("h100", 8, 18, 128),
    ] {
        group.bench_with_input(
            BenchmarkId::new("step_with_dt", label),
            &(clusters, sub_units, lanes),
            |b, &(clusters, sub_units, lanes)| {
                b.iter_batched(
                    || {
                        let layout = Layout::from_spec(label, clusters, sub_units, lanes);
                        SimulationDriver::new(layout, &SimConfig::default())
                    },
                    |mut driver| {
                        driver.step_with_dt(0.016);
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

criterion_group!(tick_benches, bench_tick);
criterion_main!(tick_benches);
