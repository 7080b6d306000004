//! Benchmark for chunk density generation and meshing.
//!
//! Run with: cargo bench --package daedalus_procedural --bench mesher_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use daedalus_procedural::terrain::DensityGenerator;
use daedalus_procedural::{ChunkLoader, ChunkMesher, NullStore, TerrainConfig, WorldSeed};
use daedalus_shared::ChunkOffset;

fn benchmark_density_generation(c: &mut Criterion) {
    let config = TerrainConfig::default();
    let gen = DensityGenerator::new(WorldSeed::new(42), &config);

    c.bench_function("density_field_16", |b| {
        let mut x = 0i64;
        b.iter(|| {
            x = x.wrapping_add(1);
            black_box(gen.generate(ChunkOffset::new(x, x / 2, 0)))
        });
    });
}

fn benchmark_surface_meshing(c: &mut Criterion) {
    let config = TerrainConfig::default();
    let mut loader = ChunkLoader::new(WorldSeed::new(42), &config, Box::new(NullStore));
    let mesher = ChunkMesher::new(config.grid_cell_count, config.chunk_scale);
    let window = loader.get_chunk_data_set(ChunkOffset::ZERO);

    c.bench_function("mesh_surface_chunk", |b| {
        b.iter(|| black_box(mesher.mesh(black_box(&window))));
    });
}

fn benchmark_chunk_window(c: &mut Criterion) {
    let config = TerrainConfig::default();
    let mesher = ChunkMesher::new(config.grid_cell_count, config.chunk_scale);

    let mut group = c.benchmark_group("chunk_window");
    group.sample_size(10);

    // 5x5x5 window at render distance 2
    group.throughput(Throughput::Elements(125));
    group.bench_function("load_and_mesh_5x5x5", |b| {
        b.iter(|| {
            let mut loader = ChunkLoader::new(WorldSeed::new(42), &config, Box::new(NullStore));
            for z in -2..=2i64 {
                for y in -2..=2i64 {
                    for x in -2..=2i64 {
                        let window = loader.get_chunk_data_set(ChunkOffset::new(x, y, z));
                        black_box(mesher.mesh(&window));
                    }
                }
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_density_generation,
    benchmark_surface_meshing,
    benchmark_chunk_window
);
criterion_main!(benches);
