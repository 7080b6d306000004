//! Benchmark for biome region triangulation, stitching and lookups.
//!
//! Run with: cargo bench --package daedalus_procedural --bench region_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use daedalus_procedural::{BiomeConfig, BiomeId, BiomeRegionLoader, DelaunayGraph, NullStore, WorldSeed};
use daedalus_shared::{BiomeRegionOffset, EventBus};
use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn loader(grid_cell_count: u32) -> BiomeRegionLoader {
    let config = BiomeConfig {
        grid_cell_count,
        ..BiomeConfig::default()
    };
    BiomeRegionLoader::new(WorldSeed::new(42), &config, Box::new(NullStore), EventBus::default())
}

fn benchmark_triangulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("delaunay");
    for count in [256usize, 1024, 4096] {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let sites: Vec<_> = (0..count)
            .map(|i| {
                let id = BiomeId::new(BiomeRegionOffset::ZERO, i as u32);
                (id, DVec2::new(rng.gen::<f64>(), rng.gen::<f64>()))
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &sites, |b, sites| {
            b.iter(|| black_box(DelaunayGraph::triangulate(black_box(sites))));
        });
    }
    group.finish();
}

fn benchmark_complete_region(c: &mut Criterion) {
    let mut group = c.benchmark_group("complete_region");
    group.sample_size(10);

    // Generates the 3x3 block and merges all twelve edges and four corners.
    group.bench_function("grid_16", |b| {
        b.iter(|| {
            let mut loader = loader(16);
            black_box(loader.get_biome_region_at(BiomeRegionOffset::ZERO).is_ok())
        });
    });

    group.finish();
}

fn benchmark_queries(c: &mut Criterion) {
    let mut loader = loader(16);
    let _ = loader.get_biome_region_at(BiomeRegionOffset::ZERO);

    c.bench_function("find_nearest_biome_id", |b| {
        let mut t = 0.0f64;
        b.iter(|| {
            t = (t + 0.013) % 1.0;
            black_box(loader.find_nearest_biome_id(DVec2::new(t, 1.0 - t)))
        });
    });

    c.bench_function("find_containing_biome_triangle", |b| {
        let mut t = 0.0f64;
        b.iter(|| {
            t = (t + 0.017) % 1.0;
            black_box(loader.find_containing_biome_triangle(DVec2::new(t, (t * 3.0) % 1.0)))
        });
    });
}

criterion_group!(
    benches,
    benchmark_triangulation,
    benchmark_complete_region,
    benchmark_queries
);
criterion_main!(benches);
