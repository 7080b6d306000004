//! # Daedalus Procedural Generation
//!
//! Deterministic, seed-driven world generation: an infinite voxel terrain
//! split into density chunks, and an overlaid biome map built from tiled
//! Delaunay regions that are stitched at their seams.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed always produces the same world
//! 2. **Chunked**: Terrain and biomes stream in fixed-size tiles
//! 3. **Seamless**: Chunk corners and region seams agree with their neighbours
//! 4. **Explicit ownership**: Caches own their entries; no global state
//!
//! ## Core Components
//!
//! - [`terrain::ChunkLoader`]: density fields from noise (or a store)
//! - [`terrain::ChunkMesher`]: marching cubes over a 3x3x3 chunk window
//! - [`terrain::Chunk`]: collision, placement and raytrace queries
//! - [`terrain::ChunkCache`]: render-distance window around the player
//! - [`biome::BiomeRegionLoader`]: region generation, seam merging, lookups
//! - [`biome::BiomeRegionCache`]: region window and visual refresh
//! - [`World`]: wires both caches to the event bus
//!
//! ## Example
//!
//! ```rust,ignore
//! use daedalus_procedural::{scene::NullScene, World, WorldConfig};
//! use daedalus_shared::WorldEvent;
//! use glam::DVec3;
//!
//! let mut world = World::new(WorldConfig::default(), NullScene::default())?;
//! world.bus().broadcast(&WorldEvent::PlayerPositionChanged(DVec3::ZERO));
//! world.pump_events()?;
//!
//! assert!(world.chunks().chunk_at(glam::I64Vec3::ZERO).is_some());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
// Grid indices are bounded by configuration; casts between them are intended.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]

pub mod biome;
pub mod config;
pub mod error;
pub mod noise;
pub mod scene;
pub mod store;
pub mod terrain;
pub mod world;

pub use biome::{
    BiomeData, BiomeId, BiomeRegionCache, BiomeRegionData, BiomeRegionLoader, DelaunayGraph,
    MergeOutcome, TerrainType, VegetationType,
};
pub use config::{BiomeConfig, TerrainConfig, WorldConfig};
pub use error::{BiomeError, BiomeResult, ConfigError, ConfigResult};
pub use noise::{SimplexNoise, WorldSeed};
pub use scene::{EntityHandle, EntityKind, NullScene, SceneHost};
pub use store::{ChunkStore, MemoryStore, NullStore, RegionStore};
pub use terrain::{
    Chunk, ChunkCache, ChunkData, ChunkDataSet, ChunkLoader, ChunkMesh, ChunkMesher,
    ChunkPosition, DensityField, ItemData, ItemDataId, ItemRotation, ItemTemplate, RaytraceHit,
    VoxelRaytracer,
};
pub use world::{WindowChange, World, WorldStats};
