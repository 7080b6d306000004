//! # Terrain Query Integration Tests
//!
//! Drives the chunk window end to end: generation, meshing, placement and
//! raytracing through world coordinates.

use std::sync::Arc;

use daedalus_procedural::{
    ChunkCache, ChunkLoader, ChunkMesher, ChunkPosition, ItemRotation, ItemTemplate, MemoryStore, NullScene,
    NullStore, RaytraceHit, TerrainConfig, WorldSeed,
};
use daedalus_shared::{Aabb, ChunkOffset};
use glam::DVec3;

/// Flat ground: cells with z < 5 are solid, everything above is air.
fn flat_config() -> TerrainConfig {
    TerrainConfig {
        grid_cell_count: 16,
        chunk_scale: 40.0,
        render_distance: 1,
        base_height: 5.5,
        height_amplitude: 0.0,
        detail_amplitude: 0.0,
        ..TerrainConfig::default()
    }
}

/// World position of a chunk-(0,0,0) lattice point with the flat config.
fn world_at(x: f64, y: f64, z: f64) -> DVec3 {
    DVec3::new(x, y, z) * flat_config().chunk_grid_unit_size()
}

fn crate_template() -> Arc<ItemTemplate> {
    Arc::new(ItemTemplate {
        item_type: 7,
        bounds: Aabb::new(DVec3::ZERO, DVec3::ONE),
        pivot: DVec3::splat(0.5),
        rotation_interval: 4,
    })
}

/// Test: Neighbouring chunks share their face samples bit for bit.
#[test]
fn test_chunk_faces_agree_across_boundaries() {
    let config = TerrainConfig::default();
    let mut loader = ChunkLoader::new(WorldSeed::new(77), &config, Box::new(NullStore));
    let n = config.grid_cell_count;

    let centre = loader.get_chunk_at(ChunkOffset::new(2, -1, 0));
    let east = loader.get_chunk_at(ChunkOffset::new(3, -1, 0));
    let north = loader.get_chunk_at(ChunkOffset::new(2, 0, 0));
    let above = loader.get_chunk_at(ChunkOffset::new(2, -1, 1));

    for a in 0..=n {
        for b in 0..=n {
            assert_eq!(centre.density.get(n, a, b).to_bits(), east.density.get(0, a, b).to_bits());
            assert_eq!(centre.density.get(a, n, b).to_bits(), north.density.get(a, 0, b).to_bits());
            assert_eq!(centre.density.get(a, b, n).to_bits(), above.density.get(a, b, 0).to_bits());
        }
    }
}

/// Test: The surface layer meshes; solid bedrock and open sky do not.
#[test]
fn test_only_surface_chunks_have_geometry() {
    let config = flat_config();
    let mut loader = ChunkLoader::new(WorldSeed::new(1), &config, Box::new(NullStore));
    let mesher = ChunkMesher::new(config.grid_cell_count, config.chunk_scale);

    let (surface, solid) = mesher.mesh(&loader.get_chunk_data_set(ChunkOffset::ZERO));
    assert!(!surface.is_empty());
    // 16x16 columns, five solid cells each.
    assert_eq!(solid.solid_count(), 16 * 16 * 5);

    let (sky, _) = mesher.mesh(&loader.get_chunk_data_set(ChunkOffset::new(0, 0, 2)));
    assert!(sky.is_empty());
    let (bedrock, _) = mesher.mesh(&loader.get_chunk_data_set(ChunkOffset::new(0, 0, -2)));
    assert!(bedrock.is_empty());
}

/// Test: A ray cast straight down stops on the ground.
#[test]
fn test_raytrace_down_hits_ground() {
    let mut scene = NullScene::default();
    let mut cache = ChunkCache::new(WorldSeed::new(3), &flat_config(), Box::new(NullStore));
    cache.update_at(world_at(8.0, 8.0, 8.0), &mut scene);

    let hit = cache
        .raytrace(world_at(3.5, 3.5, 12.5), DVec3::NEG_Z, 100.0)
        .expect("ground lies below");
    let entry = ChunkPosition::new(ChunkOffset::ZERO, DVec3::new(3.0, 3.0, 5.0));
    assert_eq!(hit, RaytraceHit::Terrain { entry }, "Entry is the air cell above the ground");

    // Upwards there is nothing inside the chunk.
    assert!(cache.raytrace(world_at(3.5, 3.5, 12.5), DVec3::Z, 100.0).is_none());
}

/// Test: Items block placement, stop rays and can be removed again.
#[test]
fn test_placement_round_trip_through_world_coordinates() {
    let mut scene = NullScene::default();
    let mut cache = ChunkCache::new(WorldSeed::new(3), &flat_config(), Box::new(MemoryStore::default()));
    cache.update_at(world_at(8.0, 8.0, 8.0), &mut scene);
    let meshes = scene.live_count();

    // Sunk into the ground: rejected.
    assert!(cache
        .create_item(crate_template(), ItemRotation::default(), world_at(3.0, 3.0, 4.5), &mut scene)
        .is_none());

    let id = cache
        .create_item(crate_template(), ItemRotation::default(), world_at(3.0, 3.0, 6.0), &mut scene)
        .expect("air above the ground is free");
    assert_eq!(id.chunk, ChunkOffset::ZERO);
    assert_eq!(scene.live_count(), meshes + 1);

    // Same spot twice: rejected.
    assert!(cache
        .create_item(crate_template(), ItemRotation::new(1, 0), world_at(3.0, 3.0, 6.0), &mut scene)
        .is_none());

    match cache.raytrace(world_at(3.5, 3.5, 12.5), DVec3::NEG_Z, 100.0) {
        Some(RaytraceHit::Item { id: hit, entry }) => {
            assert_eq!(hit, id);
            assert_eq!(entry.local, DVec3::new(3.0, 3.0, 7.0));
        }
        other => panic!("expected the item to stop the ray, got {other:?}"),
    }

    let removed = cache.remove_item(id, &mut scene).expect("item was placed");
    assert_eq!(removed.template.item_type, 7);
    assert_eq!(scene.live_count(), meshes);
    assert!(matches!(
        cache.raytrace(world_at(3.5, 3.5, 12.5), DVec3::NEG_Z, 100.0),
        Some(RaytraceHit::Terrain { .. })
    ));
}
