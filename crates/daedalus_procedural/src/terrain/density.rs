//! # Density Fields
//!
//! Each chunk stores `(N+1)^3` density samples at its cell corners, so the
//! last layer on each axis duplicates the first layer of the next chunk.
//! `density > 0` is solid.
//!
//! A cell counts as solid when the sum of its eight corner samples exceeds
//! [`SOLID_EPSILON`]. That rule drives every collision query; the mesher
//! only draws the surface.

use glam::{I64Vec3, UVec3};

/// Threshold above which a cell's corner sum counts as solid.
pub const SOLID_EPSILON: f32 = 1e-4;

/// Corner samples of one chunk. Immutable after generation.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityField {
    grid_cell_count: u32,
    values: Vec<f32>,
}

impl DensityField {
    /// Builds a field by evaluating `sample` at every corner.
    pub fn from_fn(grid_cell_count: u32, mut sample: impl FnMut(UVec3) -> f32) -> Self {
        let side = grid_cell_count + 1;
        let mut values = Vec::with_capacity((side * side * side) as usize);
        for z in 0..side {
            for y in 0..side {
                for x in 0..side {
                    values.push(sample(UVec3::new(x, y, z)));
                }
            }
        }
        Self {
            grid_cell_count,
            values,
        }
    }

    /// A field with the same value everywhere.
    #[must_use]
    pub fn filled(grid_cell_count: u32, value: f32) -> Self {
        Self::from_fn(grid_cell_count, |_| value)
    }

    /// Wraps raw samples (x fastest). `None` if the length is not `(N+1)^3`.
    #[must_use]
    pub fn from_values(grid_cell_count: u32, values: Vec<f32>) -> Option<Self> {
        let side = grid_cell_count as usize + 1;
        (values.len() == side * side * side).then_some(Self {
            grid_cell_count,
            values,
        })
    }

    /// Cells per edge (N).
    #[inline]
    #[must_use]
    pub const fn grid_cell_count(&self) -> u32 {
        self.grid_cell_count
    }

    /// Raw samples, x fastest.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let side = self.grid_cell_count as usize + 1;
        x as usize + side * (y as usize + side * z as usize)
    }

    /// Sample at corner `(x, y, z)`, each in `0..=N`.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32, z: u32) -> f32 {
        self.values[self.index(x, y, z)]
    }

    /// Sum of the eight corners of cell `(x, y, z)`, each in `0..N`.
    #[must_use]
    pub fn cell_corner_sum(&self, x: u32, y: u32, z: u32) -> f32 {
        let mut sum = 0.0;
        for dz in 0..2 {
            for dy in 0..2 {
                for dx in 0..2 {
                    sum += self.get(x + dx, y + dy, z + dz);
                }
            }
        }
        sum
    }

    /// Whether cell `(x, y, z)` is solid.
    #[inline]
    #[must_use]
    pub fn is_cell_solid(&self, x: u32, y: u32, z: u32) -> bool {
        self.cell_corner_sum(x, y, z) > SOLID_EPSILON
    }

    /// [`Self::is_cell_solid`] for a local cell given as a signed vector.
    /// Cells outside `[0, N)` are reported as solid.
    #[must_use]
    pub fn is_local_cell_solid(&self, cell: I64Vec3) -> bool {
        let n = i64::from(self.grid_cell_count);
        if cell.cmplt(I64Vec3::ZERO).any() || cell.cmpge(I64Vec3::splat(n)).any() {
            return true;
        }
        self.is_cell_solid(cell.x as u32, cell.y as u32, cell.z as u32)
    }
}

/// Per-cell solidity of one chunk, computed once while meshing.
#[derive(Clone, Debug, PartialEq)]
pub struct SolidCache {
    grid_cell_count: u32,
    cells: Vec<bool>,
}

impl SolidCache {
    /// Evaluates every cell of `field`.
    #[must_use]
    pub fn from_field(field: &DensityField) -> Self {
        let n = field.grid_cell_count();
        let mut cells = Vec::with_capacity((n * n * n) as usize);
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    cells.push(field.is_cell_solid(x, y, z));
                }
            }
        }
        Self {
            grid_cell_count: n,
            cells,
        }
    }

    /// Whether local cell `(x, y, z)` is solid.
    #[inline]
    #[must_use]
    pub fn is_solid(&self, x: u32, y: u32, z: u32) -> bool {
        let n = self.grid_cell_count as usize;
        self.cells[x as usize + n * (y as usize + n * z as usize)]
    }

    /// Number of solid cells.
    #[must_use]
    pub fn solid_count(&self) -> usize {
        self.cells.iter().filter(|&&solid| solid).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_layout() {
        let field = DensityField::from_fn(4, |c| (c.x + 10 * c.y + 100 * c.z) as f32);
        assert_eq!(field.values().len(), 125);
        assert_eq!(field.get(4, 0, 0), 4.0);
        assert_eq!(field.get(0, 4, 0), 40.0);
        assert_eq!(field.get(1, 2, 3), 321.0);
    }

    #[test]
    fn test_from_values_checks_length() {
        assert!(DensityField::from_values(2, vec![0.0; 27]).is_some());
        assert!(DensityField::from_values(2, vec![0.0; 26]).is_none());
    }

    #[test]
    fn test_cell_solidity_uses_corner_sum() {
        // One solid cell at (1, 1, 1): its eight corners are +1, all else -1.
        let field = DensityField::from_fn(4, |c| {
            if (1..=2).contains(&c.x) && (1..=2).contains(&c.y) && (1..=2).contains(&c.z) {
                1.0
            } else {
                -1.0
            }
        });
        assert!(field.is_cell_solid(1, 1, 1));
        // Face neighbour shares four +1 corners: sum is exactly zero.
        assert!(!field.is_cell_solid(2, 1, 1));
        assert!(!field.is_cell_solid(0, 0, 0));

        let cache = SolidCache::from_field(&field);
        assert_eq!(cache.solid_count(), 1);
        assert!(cache.is_solid(1, 1, 1));
    }

    #[test]
    fn test_local_cell_outside_is_solid() {
        let field = DensityField::filled(4, -1.0);
        assert!(!field.is_local_cell_solid(I64Vec3::new(3, 3, 3)));
        assert!(field.is_local_cell_solid(I64Vec3::new(4, 0, 0)));
        assert!(field.is_local_cell_solid(I64Vec3::new(0, -1, 0)));
    }
}
