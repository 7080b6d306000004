//! # World Configuration
//!
//! Read once at construction, never mutated afterwards.
//!
//! ```toml
//! seed = 12345678
//!
//! [terrain]
//! grid_cell_count = 16
//! chunk_scale = 40.0
//! render_distance = 2
//!
//! [biome]
//! grid_cell_count = 16
//! buffer_size = 3
//! min_points_per_cell = 1
//! max_points_per_cell = 1
//! scale = 100000.0
//! ```
//!
//! Missing keys fall back to [`Default`].

use std::path::Path;

use daedalus_shared::BiomeRegionOffset;
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::noise::WorldSeed;
use crate::terrain::ChunkPosition;

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Global seed for every generator.
    pub seed: u64,
    /// Voxel terrain settings.
    pub terrain: TerrainConfig,
    /// Biome map settings.
    pub biome: BiomeConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 12_345_678,
            terrain: TerrainConfig::default(),
            biome: BiomeConfig::default(),
        }
    }
}

/// Voxel terrain settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Cells per chunk edge (N). Each chunk stores (N+1)^3 density samples.
    pub grid_cell_count: u32,
    /// World units per chunk edge.
    pub chunk_scale: f64,
    /// Chebyshev radius of the loaded chunk window.
    pub render_distance: u32,
    /// Ground level, in grid cells above z = 0.
    pub base_height: f64,
    /// Peak deviation of the surface from `base_height`, in grid cells.
    pub height_amplitude: f64,
    /// Horizontal frequency of the surface noise, per grid cell.
    pub surface_frequency: f64,
    /// Weight of the 3D detail noise (overhangs, caves).
    pub detail_amplitude: f64,
    /// Frequency of the 3D detail noise, per grid cell.
    pub detail_frequency: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            grid_cell_count: 16,
            chunk_scale: 40.0,
            render_distance: 2,
            base_height: 8.0,
            height_amplitude: 12.0,
            surface_frequency: 0.02,
            detail_amplitude: 2.0,
            detail_frequency: 0.08,
        }
    }
}

impl TerrainConfig {
    /// World units per grid cell.
    #[inline]
    #[must_use]
    pub fn chunk_grid_unit_size(&self) -> f64 {
        self.chunk_scale / f64::from(self.grid_cell_count)
    }

    /// Converts a world position into a normalized chunk position.
    #[must_use]
    pub fn to_chunk_position(&self, world: DVec3) -> ChunkPosition {
        ChunkPosition::from_world(world, self.grid_cell_count, self.chunk_grid_unit_size())
    }
}

/// Biome map settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeConfig {
    /// Cells per region edge (G).
    pub grid_cell_count: u32,
    /// Ring limit of the seam-corner hull vertex search.
    pub buffer_size: u32,
    /// Fewest sample points drawn per cell.
    pub min_points_per_cell: u32,
    /// Most sample points drawn per cell.
    pub max_points_per_cell: u32,
    /// World units per region edge.
    pub scale: f64,
    /// Radius of the region block generated and merged around a fetch.
    pub fetch_radius: u32,
    /// Chebyshev radius of the cached region window.
    pub render_distance: u32,
}

impl Default for BiomeConfig {
    fn default() -> Self {
        Self {
            grid_cell_count: 16,
            buffer_size: 3,
            min_points_per_cell: 1,
            max_points_per_cell: 1,
            scale: 100_000.0,
            fetch_radius: 1,
            render_distance: 1,
        }
    }
}

impl BiomeConfig {
    /// Splits a world position into its region offset and the local
    /// position inside that region, in `[0, 1)^2`.
    #[must_use]
    pub fn to_region_coordinates(&self, world: DVec3) -> (BiomeRegionOffset, DVec2) {
        split_region_point(DVec2::new(world.x, world.y) / self.scale)
    }
}

/// Splits a point in region units into (offset, local).
#[must_use]
pub fn split_region_point(point: DVec2) -> (BiomeRegionOffset, DVec2) {
    let floor = point.floor();
    let mut offset = floor.as_i64vec2();
    let mut local = point - floor;
    // Rounding can land exactly on 1.0 for tiny negative inputs.
    if local.x >= 1.0 {
        local.x = 0.0;
        offset.x += 1;
    }
    if local.y >= 1.0 {
        local.y = 0.0;
        offset.y += 1;
    }
    (offset, local)
}

impl WorldConfig {
    /// Parses a TOML document and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed input and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise
    /// the same errors as [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The seed as a [`WorldSeed`].
    #[inline]
    #[must_use]
    pub const fn world_seed(&self) -> WorldSeed {
        WorldSeed::new(self.seed)
    }

    /// Checks every range constraint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.terrain.grid_cell_count < 2 {
            return invalid(format!(
                "terrain.grid_cell_count must be at least 2, got {}",
                self.terrain.grid_cell_count
            ));
        }
        if !(self.terrain.chunk_scale > 0.0) {
            return invalid(format!(
                "terrain.chunk_scale must be positive, got {}",
                self.terrain.chunk_scale
            ));
        }
        if self.biome.grid_cell_count < 2 {
            return invalid(format!(
                "biome.grid_cell_count must be at least 2, got {}",
                self.biome.grid_cell_count
            ));
        }
        if self.biome.min_points_per_cell == 0 {
            return invalid("biome.min_points_per_cell must be at least 1".to_string());
        }
        if self.biome.min_points_per_cell > self.biome.max_points_per_cell {
            return invalid(format!(
                "biome.min_points_per_cell ({}) exceeds max_points_per_cell ({})",
                self.biome.min_points_per_cell, self.biome.max_points_per_cell
            ));
        }
        if self.biome.buffer_size == 0 {
            return invalid("biome.buffer_size must be at least 1".to_string());
        }
        if !(self.biome.scale > 0.0) {
            return invalid(format!("biome.scale must be positive, got {}", self.biome.scale));
        }
        if self.biome.fetch_radius == 0 {
            return invalid("biome.fetch_radius must be at least 1".to_string());
        }
        Ok(())
    }
}
