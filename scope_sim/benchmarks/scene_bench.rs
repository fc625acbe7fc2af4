use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use scope_sim::{Layout, SceneCache, SimConfig};

fn bench_scene(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene2d");

    for (label, clusters, sub_units, lanes) in [
        ("small", 3u32, 4u32, 32u32),
        ("medium", 7, 9, 128),
        ("large", 8, 18, 128),
    ] {
        let config = SimConfig::default();
        let layout = Layout::from_spec(label, clusters, sub_units, lanes);

        group.bench_with_input(BenchmarkId::new("rebuild", label), &layout, |b, layout| {
            b.iter_batched(
                || SceneCache::new(&config),
                |mut cache| {
                    cache.refresh(layout);
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("recolor", label), &layout, |b, layout| {
            let mut cache = SceneCache::new(&config);
            cache.refresh(layout);
            b.iter(|| {
                cache.mark_color_dirty();
                cache.refresh(layout);
            })
        });
    }

    group.finish();
}

criterion_group!(scene_benches, bench_scene);
criterion_main!(scene_benches);
