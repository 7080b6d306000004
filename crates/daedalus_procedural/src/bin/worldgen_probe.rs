//! Generates the world around one position and logs what came out.
//!
//! ```text
//! RUST_LOG=info worldgen_probe [config.toml]
//! ```

use daedalus_procedural::{NullScene, RaytraceHit, World, WorldConfig};
use daedalus_shared::WorldEvent;
use glam::DVec3;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    let chunk_span = config.terrain.chunk_scale;
    let mut world = World::new(config, NullScene::default())?;

    let position = DVec3::new(chunk_span * 0.5, chunk_span * 0.5, chunk_span * 0.5);
    world.bus().broadcast(&WorldEvent::PlayerPositionChanged(position));
    let handled = world.pump_events()?;

    let stats = world.stats();
    tracing::info!(
        "{} events: {} chunks, {} region visuals, {} visual refreshes",
        handled,
        stats.chunks_loaded,
        stats.regions_loaded,
        stats.visuals_refreshed
    );

    match world.raytrace(position, DVec3::NEG_Z, chunk_span) {
        Some(RaytraceHit::Terrain { entry }) => tracing::info!("ground below, entry cell {}", entry.local),
        Some(RaytraceHit::Item { id, .. }) => tracing::info!("item {} below", id.id),
        None => tracing::info!("no ground within {} units", chunk_span),
    }

    let nearest = world.find_nearest_biome_id(position)?;
    let triangle = world.find_containing_biome_triangle(position)?;
    tracing::info!("nearest biome {}, containing triangle {} {} {}", nearest, triangle[0], triangle[1], triangle[2]);

    if let Some(biome) = world
        .biomes()
        .loader()
        .region(nearest.region)
        .and_then(|region| region.biome(nearest.local))
    {
        tracing::info!(
            "elevation {:.3}, rainfall {:.3}, {:?} / {:?}",
            biome.elevation,
            biome.rainfall,
            biome.terrain,
            biome.vegetation
        );
    }

    Ok(())
}
