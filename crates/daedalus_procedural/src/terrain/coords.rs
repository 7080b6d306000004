//! Chunk-relative positions.
//!
//! A [`ChunkPosition`] is a chunk offset plus a local position in grid-cell
//! units. After [`ChunkPosition::normalize`] the local part lies in
//! `[0, N)` on every axis, so each world point has exactly one normalized
//! representation.

use daedalus_shared::ChunkOffset;
use glam::{DVec3, I64Vec3};

/// A position inside the chunk grid.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChunkPosition {
    /// Owning chunk.
    pub offset: ChunkOffset,
    /// Position relative to the chunk origin, in grid cells.
    pub local: DVec3,
}

impl ChunkPosition {
    /// Creates a position without normalizing it.
    #[inline]
    #[must_use]
    pub const fn new(offset: ChunkOffset, local: DVec3) -> Self {
        Self { offset, local }
    }

    /// Moves local coordinates that spill outside `[0, N)` into the
    /// neighbouring chunk they belong to.
    #[must_use]
    pub fn normalize(self, grid_cell_count: u32) -> Self {
        let n = f64::from(grid_cell_count);
        let shift = (self.local / n).floor();
        let mut offset = self.offset + shift.as_i64vec3();
        let mut local = self.local - shift * n;

        // `local - shift * n` can round up to exactly n for inputs a hair
        // below a chunk boundary.
        for axis in 0..3 {
            if local[axis] >= n {
                local[axis] -= n;
                offset[axis] += 1;
            }
            if local[axis] < 0.0 {
                local[axis] = 0.0;
            }
        }
        Self { offset, local }
    }

    /// Builds a normalized position from world coordinates.
    #[must_use]
    pub fn from_world(world: DVec3, grid_cell_count: u32, grid_unit_size: f64) -> Self {
        Self::new(ChunkOffset::ZERO, world / grid_unit_size).normalize(grid_cell_count)
    }

    /// World coordinates of this position.
    #[must_use]
    pub fn to_world(self, grid_cell_count: u32, grid_unit_size: f64) -> DVec3 {
        (self.offset.as_dvec3() * f64::from(grid_cell_count) + self.local) * grid_unit_size
    }

    /// Integer cell containing the local position.
    #[inline]
    #[must_use]
    pub fn cell(self) -> I64Vec3 {
        self.local.floor().as_i64vec3()
    }
}

/// Splits a cell index that may lie outside `[0, N)` into the chunk step
/// it falls in and its local index in that chunk.
#[inline]
#[must_use]
pub fn split_cell(cell: I64Vec3, grid_cell_count: u32) -> (I64Vec3, I64Vec3) {
    let n = i64::from(grid_cell_count);
    (
        I64Vec3::new(cell.x.div_euclid(n), cell.y.div_euclid(n), cell.z.div_euclid(n)),
        I64Vec3::new(cell.x.rem_euclid(n), cell.y.rem_euclid(n), cell.z.rem_euclid(n)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: u32 = 16;

    #[test]
    fn test_normalize_wraps_into_neighbours() {
        let p = ChunkPosition::new(ChunkOffset::new(2, 0, -1), DVec3::new(-0.5, 16.0, 33.25));
        let n = p.normalize(N);
        assert_eq!(n.offset, ChunkOffset::new(1, 1, 1));
        assert_eq!(n.local, DVec3::new(15.5, 0.0, 1.25));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            DVec3::new(-1e-17, 0.0, 15.999_999_999_999_998),
            DVec3::new(-33.0, 47.9, 0.001),
            DVec3::new(16.0, -16.0, 160.5),
        ];
        for local in samples {
            let once = ChunkPosition::new(ChunkOffset::new(-3, 4, 0), local).normalize(N);
            let twice = once.normalize(N);
            assert_eq!(once, twice, "normalize must be idempotent for {local:?}");
            for axis in 0..3 {
                assert!(
                    (0.0..f64::from(N)).contains(&once.local[axis]),
                    "local {:?} out of range",
                    once.local
                );
            }
        }
    }

    #[test]
    fn test_world_round_trip() {
        let world = DVec3::new(-123.25, 77.5, 401.0);
        let p = ChunkPosition::from_world(world, N, 2.5);
        assert!((p.to_world(N, 2.5) - world).length() < 1e-9);
    }

    #[test]
    fn test_split_cell_negative() {
        let (step, local) = split_cell(I64Vec3::new(-1, 16, 5), N);
        assert_eq!(step, I64Vec3::new(-1, 1, 0));
        assert_eq!(local, I64Vec3::new(15, 0, 5));
    }
}
