//! # Voxel Terrain
//!
//! Density chunks, their marching-cubes meshes and the collision,
//! placement and raytrace queries that run against them.
//!
//! ## Units
//!
//! Chunk-local positions are in grid cells, `0..N` per axis. World units
//! are cells times `chunk_scale / N`. `z` is up.

mod cache;
mod chunk;
mod coords;
mod density;
mod generator;
mod item;
mod loader;
mod mesher;
mod raytrace;
mod tables;

pub use cache::ChunkCache;
pub use chunk::Chunk;
pub use coords::{split_cell, ChunkPosition};
pub use density::{DensityField, SolidCache, SOLID_EPSILON};
pub use generator::DensityGenerator;
pub use item::{ItemData, ItemDataId, ItemRotation, ItemTemplate};
pub use loader::{ChunkData, ChunkDataSet, ChunkLoader};
pub use mesher::{ChunkMesh, ChunkMesher, MeshVertex};
pub use raytrace::{RaytraceHit, VoxelRaytracer, CELL_INSET};
