//! Density generation from noise.
//!
//! The density at a lattice corner depends only on the corner's global
//! lattice coordinate `offset * N + local`. Two chunks that share a face
//! therefore sample the shared corners to bit-identical values.
//!
//! z is up. The field is a heightmap surface (octaved simplex blended with
//! ridged simplex) plus a 3D simplex detail term.

use glam::{I64Vec3, UVec3};

use daedalus_shared::ChunkOffset;

use super::density::DensityField;
use crate::config::TerrainConfig;
use crate::noise::{SimplexNoise, WorldSeed};

/// Seed purposes for the terrain noise streams.
const SURFACE_PURPOSE: u64 = 100;
const DETAIL_PURPOSE: u64 = 101;

/// Produces chunk density fields.
pub struct DensityGenerator {
    /// Surface height noise (octaved and ridged).
    surface_noise: SimplexNoise,
    /// 3D detail noise for overhangs.
    detail_noise: SimplexNoise,
    grid_cell_count: u32,
    base_height: f64,
    height_amplitude: f64,
    surface_frequency: f64,
    detail_amplitude: f64,
    detail_frequency: f64,
}

impl DensityGenerator {
    /// Creates a generator for `config`.
    #[must_use]
    pub fn new(seed: WorldSeed, config: &TerrainConfig) -> Self {
        Self {
            surface_noise: SimplexNoise::new(seed.derive(SURFACE_PURPOSE)),
            detail_noise: SimplexNoise::new(seed.derive(DETAIL_PURPOSE)),
            grid_cell_count: config.grid_cell_count,
            base_height: config.base_height,
            height_amplitude: config.height_amplitude,
            surface_frequency: config.surface_frequency,
            detail_amplitude: config.detail_amplitude,
            detail_frequency: config.detail_frequency,
        }
    }

    /// Surface height in grid cells at a global lattice column.
    #[must_use]
    pub fn surface_height(&self, x: f64, y: f64) -> f64 {
        let f = self.surface_frequency;
        let base = self.surface_noise.octaved(x * f, y * f, 4, 0.5, 2.0);
        // Ridges only add relief; blend lightly.
        let ridged = self.surface_noise.ridged(x * f * 1.5, y * f * 1.5, 3, 0.5, 2.0);
        self.base_height + self.height_amplitude * (base * 0.8 + ridged * 0.2)
    }

    /// Density at a global lattice corner.
    #[must_use]
    pub fn density_at(&self, corner: I64Vec3) -> f32 {
        let p = corner.as_dvec3();
        let f = self.detail_frequency;
        let detail = self.detail_noise.sample3(p.x * f, p.y * f, p.z * f);
        (self.surface_height(p.x, p.y) - p.z + self.detail_amplitude * detail) as f32
    }

    /// Samples the full `(N+1)^3` field of one chunk.
    #[must_use]
    pub fn generate(&self, offset: ChunkOffset) -> DensityField {
        let origin = offset * i64::from(self.grid_cell_count);
        DensityField::from_fn(self.grid_cell_count, |local: UVec3| {
            self.density_at(origin + local.as_i64vec3())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> DensityGenerator {
        DensityGenerator::new(WorldSeed::new(12_345_678), &TerrainConfig::default())
    }

    #[test]
    fn test_generation_determinism() {
        let a = generator().generate(ChunkOffset::new(3, -2, 0));
        let b = generator().generate(ChunkOffset::new(3, -2, 0));
        assert_eq!(a, b, "Same seed and offset must give identical fields");
    }

    #[test]
    fn test_shared_face_is_continuous() {
        let gen = generator();
        let n = TerrainConfig::default().grid_cell_count;
        let left = gen.generate(ChunkOffset::new(0, 0, 0));
        let right = gen.generate(ChunkOffset::new(1, 0, 0));
        for z in 0..=n {
            for y in 0..=n {
                assert_eq!(
                    left.get(n, y, z).to_bits(),
                    right.get(0, y, z).to_bits(),
                    "Shared corner ({n}, {y}, {z}) differs"
                );
            }
        }
    }

    #[test]
    fn test_ground_below_air_above() {
        let gen = generator();
        // Far below the lowest possible surface: solid. Far above: air.
        assert!(gen.density_at(I64Vec3::new(5, 5, -100)) > 0.0);
        assert!(gen.density_at(I64Vec3::new(5, 5, 100)) < 0.0);
    }
}
