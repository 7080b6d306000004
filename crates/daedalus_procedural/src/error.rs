//! # Generation Error Types
//!
//! Biome lookups distinguish three outcomes a caller must treat differently:
//! a recoverable miss, a merge that must be retried later, and a broken
//! coverage invariant. Terrain queries never fail; outside the loaded window
//! they answer "solid".

use daedalus_shared::BiomeRegionOffset;
use glam::DVec2;
use thiserror::Error;

use crate::biome::BiomeId;

/// Errors from the biome subsystem.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BiomeError {
    /// Region was never generated.
    #[error("biome region {0} not generated")]
    RegionNotFound(BiomeRegionOffset),

    /// Biome id does not exist in its region.
    #[error("biome {0} not found")]
    BiomeNotFound(BiomeId),

    /// A hull vertex near a seam corner was not found within the search
    /// buffer. Flags are untouched; the merge is retried on next access.
    #[error("merge involving region {region} deferred: no hull vertex near the seam corner")]
    Deferred {
        /// Region whose corner search failed, or whose merge could not proceed.
        region: BiomeRegionOffset,
    },

    /// No generated region has a triangle containing the point.
    #[error("coverage invariant violated: no triangle contains {point} near region {region}")]
    Invariant {
        /// Region the lookup started in.
        region: BiomeRegionOffset,
        /// Point in that region's local frame.
        point: DVec2,
    },

    /// The two regions passed to a merge are not adjacent the right way.
    #[error("regions {0} and {1} are not adjacent")]
    NotAdjacent(BiomeRegionOffset, BiomeRegionOffset),
}

impl BiomeError {
    /// True for the recoverable "not there" family.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RegionNotFound(_) | Self::BiomeNotFound(_))
    }

    /// True when a later call may succeed without any other change.
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}

/// Result type for biome operations.
pub type BiomeResult<T> = Result<T, BiomeError>;

/// Errors from loading or validating a [`crate::WorldConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
