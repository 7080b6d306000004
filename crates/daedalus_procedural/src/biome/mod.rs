//! # Biome Map
//!
//! The biome plane is tiled into regions of `G x G` cells. Each region
//! scatters seeded sites over its cells, triangulates them, and is then
//! stitched to its eight neighbours so the union of region graphs forms one
//! planar triangulation.
//!
//! ## Units
//!
//! Region units: one region is `1 x 1`, so a global point splits into an
//! integer region offset and a local position in `[0, 1)^2`. World
//! positions divide by `BiomeConfig::scale` to get there.

mod cache;
mod data;
mod delaunay;
mod loader;
mod region;

pub use cache::BiomeRegionCache;
pub use data::{BiomeData, BiomeId, ClimateSampler, TerrainType, VegetationType};
pub use delaunay::{in_circle, orient, DelaunayGraph, DelaunayVertex};
pub use loader::{BiomeRegionLoader, MergeOutcome, UpdatedRegions};
pub use region::{BiomeCellField, BiomeRegionData, NearestPoint};
