//! Integer addressing for the two streamed grids.

use glam::{I64Vec2, I64Vec3};

/// Offset of a terrain chunk in chunk units.
pub type ChunkOffset = I64Vec3;

/// Offset of a biome region in region units.
pub type BiomeRegionOffset = I64Vec2;

/// The 26 neighbour directions of a chunk followed by the zero offset.
///
/// Ordered x fastest, then y, then z, matching the 3x3x3 window layout
/// (window index = direction + 1).
#[must_use]
pub fn chunk_window_directions() -> [ChunkOffset; 27] {
    let mut out = [ChunkOffset::ZERO; 27];
    let mut i = 0;
    for z in -1..=1 {
        for y in -1..=1 {
            for x in -1..=1 {
                out[i] = ChunkOffset::new(x, y, z);
                i += 1;
            }
        }
    }
    out
}

/// The 8 neighbour directions of a biome region, x fastest.
#[must_use]
pub fn region_neighbour_directions() -> [BiomeRegionOffset; 8] {
    [
        BiomeRegionOffset::new(-1, -1),
        BiomeRegionOffset::new(0, -1),
        BiomeRegionOffset::new(1, -1),
        BiomeRegionOffset::new(-1, 0),
        BiomeRegionOffset::new(1, 0),
        BiomeRegionOffset::new(-1, 1),
        BiomeRegionOffset::new(0, 1),
        BiomeRegionOffset::new(1, 1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_window_layout() {
        let dirs = chunk_window_directions();
        assert_eq!(dirs[0], ChunkOffset::new(-1, -1, -1));
        assert_eq!(dirs[13], ChunkOffset::ZERO, "Centre sits at index 13");
        assert_eq!(dirs[26], ChunkOffset::new(1, 1, 1));
    }

    #[test]
    fn test_region_neighbours_exclude_self() {
        let dirs = region_neighbour_directions();
        assert!(!dirs.contains(&BiomeRegionOffset::ZERO));
        assert_eq!(dirs.len(), 8);
    }
}
