//! # Biome Sites
//!
//! Every Delaunay vertex is a biome site. Its attributes come from a
//! climate model sampled at the site's global position:
//! - Elevation (octaved simplex)
//! - Rainfall (a separate noise channel)
//!
//! Terrain and vegetation types are classified from those two values.

use std::fmt;

use daedalus_shared::BiomeRegionOffset;
use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::noise::{SimplexNoise, WorldSeed};

/// Global, stable identifier of one biome site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BiomeId {
    /// Region that owns the site.
    pub region: BiomeRegionOffset,
    /// Sequential index inside that region.
    pub local: u32,
}

impl BiomeId {
    /// Creates an id.
    #[inline]
    #[must_use]
    pub const fn new(region: BiomeRegionOffset, local: u32) -> Self {
        Self { region, local }
    }
}

impl fmt::Display for BiomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})#{}", self.region.x, self.region.y, self.local)
    }
}

/// Topology of the terrain around a site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TerrainType {
    /// Low, rolling ground
    #[default]
    Plains = 0,
    /// High ground
    Mountains = 1,
}

/// General vegetation around a site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum VegetationType {
    /// Bare rock or dirt
    #[default]
    Barren = 0,
    /// Grass and shrubs
    Grassy = 1,
    /// Woodland
    Forest = 2,
}

/// Attributes of one biome site.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiomeData {
    /// Site id.
    pub id: BiomeId,
    /// Position inside the owning region, in `[0, 1)^2`.
    pub local_position: DVec2,
    /// Elevation, roughly `[-1, 1]`.
    pub elevation: f64,
    /// Rainfall in `[0, 1]`.
    pub rainfall: f64,
    /// Terrain classification.
    pub terrain: TerrainType,
    /// Vegetation classification.
    pub vegetation: VegetationType,
}

impl BiomeData {
    /// A site with no attributes synthesized yet.
    #[must_use]
    pub fn new(id: BiomeId, local_position: DVec2) -> Self {
        Self {
            id,
            local_position,
            elevation: 0.0,
            rainfall: 0.0,
            terrain: TerrainType::default(),
            vegetation: VegetationType::default(),
        }
    }

    /// Position in region units across the whole map.
    #[inline]
    #[must_use]
    pub fn global_position(&self) -> DVec2 {
        self.id.region.as_dvec2() + self.local_position
    }
}

/// Climate model for biome sites.
pub struct ClimateSampler {
    elevation_noise: SimplexNoise,
    rainfall_noise: SimplexNoise,
}

impl ClimateSampler {
    /// Frequency of the elevation channel, per region.
    const ELEVATION_FREQUENCY: f64 = 0.7;
    /// Frequency of the rainfall channel, per region.
    const RAINFALL_FREQUENCY: f64 = 1.3;
    /// Elevation above which terrain counts as mountains.
    const MOUNTAIN_ELEVATION: f64 = 0.35;
    /// Elevation above which nothing grows.
    const TREE_LINE: f64 = 0.6;

    const ELEVATION_PURPOSE: u64 = 200;
    const RAINFALL_PURPOSE: u64 = 201;

    /// Creates a sampler from the world seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            elevation_noise: SimplexNoise::new(seed.derive(Self::ELEVATION_PURPOSE)),
            rainfall_noise: SimplexNoise::new(seed.derive(Self::RAINFALL_PURPOSE)),
        }
    }

    /// Elevation at a global position in region units.
    #[must_use]
    pub fn elevation(&self, global: DVec2) -> f64 {
        let p = global * Self::ELEVATION_FREQUENCY;
        self.elevation_noise.octaved(p.x, p.y, 6, 0.5, 2.0)
    }

    /// Rainfall at a global position in region units, in `[0, 1]`.
    #[must_use]
    pub fn rainfall(&self, global: DVec2) -> f64 {
        let p = global * Self::RAINFALL_FREQUENCY;
        let raw = self.rainfall_noise.octaved(p.x, p.y, 4, 0.5, 2.0);
        ((raw + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    /// Classifies a site from its climate.
    #[must_use]
    pub fn classify(elevation: f64, rainfall: f64) -> (TerrainType, VegetationType) {
        let terrain = if elevation > Self::MOUNTAIN_ELEVATION {
            TerrainType::Mountains
        } else {
            TerrainType::Plains
        };

        let vegetation = match (elevation, rainfall) {
            (e, _) if e > Self::TREE_LINE => VegetationType::Barren,
            (_, r) if r < 0.3 => VegetationType::Barren,
            (_, r) if r < 0.6 => VegetationType::Grassy,
            _ => VegetationType::Forest,
        };

        (terrain, vegetation)
    }

    /// Fills in every attribute of `biome` from its global position.
    pub fn synthesize(&self, biome: &mut BiomeData) {
        let global = biome.global_position();
        biome.elevation = self.elevation(global);
        biome.rainfall = self.rainfall(global);
        let (terrain, vegetation) = Self::classify(biome.elevation, biome.rainfall);
        biome.terrain = terrain;
        biome.vegetation = vegetation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_biome_id_identity() {
        let a = BiomeId::new(BiomeRegionOffset::new(-1, 2), 7);
        let b = BiomeId::new(BiomeRegionOffset::new(2, -1), 7);
        let ids: HashSet<BiomeId> = [a, b, a].into_iter().collect();
        assert_eq!(ids.len(), 2, "Region and index together identify a site");
        assert_ne!(a, b);
    }

    #[test]
    fn test_classification_bands() {
        assert_eq!(
            ClimateSampler::classify(0.0, 0.8),
            (TerrainType::Plains, VegetationType::Forest)
        );
        assert_eq!(
            ClimateSampler::classify(0.0, 0.45),
            (TerrainType::Plains, VegetationType::Grassy)
        );
        assert_eq!(
            ClimateSampler::classify(0.4, 0.1),
            (TerrainType::Mountains, VegetationType::Barren)
        );
        assert_eq!(
            ClimateSampler::classify(0.9, 0.9),
            (TerrainType::Mountains, VegetationType::Barren),
            "Above the tree line nothing grows"
        );
    }

    #[test]
    fn test_synthesis_uses_global_position() {
        let sampler = ClimateSampler::new(WorldSeed::new(3));
        let local = DVec2::new(0.25, 0.75);
        let mut a = BiomeData::new(BiomeId::new(BiomeRegionOffset::new(0, 0), 0), local);
        let mut b = BiomeData::new(BiomeId::new(BiomeRegionOffset::new(4, -2), 0), local);
        sampler.synthesize(&mut a);
        sampler.synthesize(&mut b);

        assert!((0.0..=1.0).contains(&a.rainfall));
        assert_ne!(a.elevation, b.elevation, "Same local position in different regions");

        let mut again = BiomeData::new(a.id, local);
        sampler.synthesize(&mut again);
        assert_eq!(a, again, "Synthesis is deterministic");
    }

    #[test]
    fn test_id_display() {
        let id = BiomeId::new(BiomeRegionOffset::new(-1, 2), 7);
        assert_eq!(id.to_string(), "(-1, 2)#7");
    }
}
