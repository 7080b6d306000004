//! Voxel raytracing (Amanatides & Woo fast voxel traversal).
//!
//! The ray walks the cells of one chunk in `[0, N)^3`. At each cell the
//! slightly inset cell box is tested against terrain, then against items.
//! A hit reports the cell the ray occupied just before, which is where a
//! new block or item would go.

use daedalus_shared::Aabb;
use glam::{DVec3, I64Vec3};

use super::chunk::Chunk;
use super::coords::ChunkPosition;
use super::item::ItemDataId;

/// Shrink applied to each probed cell so neighbouring cells do not count.
pub const CELL_INSET: f64 = 0.01;

/// What a ray hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RaytraceHit {
    /// Solid terrain.
    Terrain {
        /// Cell before the hit cell.
        entry: ChunkPosition,
    },
    /// A placed item.
    Item {
        /// The item hit.
        id: ItemDataId,
        /// Cell before the hit cell.
        entry: ChunkPosition,
    },
}

impl RaytraceHit {
    /// Cell before the hit cell.
    #[must_use]
    pub const fn entry(&self) -> ChunkPosition {
        match self {
            Self::Terrain { entry } | Self::Item { entry, .. } => *entry,
        }
    }
}

/// Grid walker for one chunk.
#[derive(Clone, Copy, Debug)]
pub struct VoxelRaytracer {
    grid_cell_count: u32,
    cell_size: f64,
}

impl VoxelRaytracer {
    /// Creates a tracer for chunks of `grid_cell_count` cells of
    /// `cell_size` world units.
    #[must_use]
    pub const fn new(grid_cell_count: u32, cell_size: f64) -> Self {
        Self {
            grid_cell_count,
            cell_size,
        }
    }

    /// Traces from `origin` (chunk-local, grid cells) along `direction`
    /// for at most `max_distance` world units.
    #[must_use]
    pub fn trace(&self, chunk: &Chunk, origin: DVec3, direction: DVec3, max_distance: f64) -> Option<RaytraceHit> {
        let dir = direction.normalize_or_zero();
        if dir == DVec3::ZERO {
            return None;
        }
        let max_t = max_distance / self.cell_size;
        let n = i64::from(self.grid_cell_count);

        let mut cell = origin.floor().as_i64vec3();
        let mut previous = cell;
        let step = I64Vec3::new(sign(dir.x), sign(dir.y), sign(dir.z));
        let mut t_max = DVec3::ZERO;
        let mut t_delta = DVec3::ZERO;
        for axis in 0..3 {
            if dir[axis] == 0.0 {
                t_max[axis] = f64::INFINITY;
                t_delta[axis] = f64::INFINITY;
            } else {
                let boundary = (if step[axis] > 0 { cell[axis] + 1 } else { cell[axis] }) as f64;
                t_max[axis] = (boundary - origin[axis]) / dir[axis];
                t_delta[axis] = (1.0 / dir[axis]).abs();
            }
        }

        loop {
            if cell.cmplt(I64Vec3::ZERO).any() || cell.cmpge(I64Vec3::splat(n)).any() {
                return None;
            }

            let base = cell.as_dvec3();
            let probe = Aabb::new(base, base + DVec3::ONE).inset(CELL_INSET);
            let entry = ChunkPosition::new(chunk.offset(), previous.as_dvec3());
            if chunk.is_solid_terrain_in(&probe) {
                return Some(RaytraceHit::Terrain { entry });
            }
            if let Some(id) = chunk.find_item_collision(&probe) {
                return Some(RaytraceHit::Item { id, entry });
            }

            let axis = if t_max.x < t_max.y {
                if t_max.x < t_max.z { 0 } else { 2 }
            } else if t_max.y < t_max.z {
                1
            } else {
                2
            };
            if t_max[axis] > max_t {
                return None;
            }
            previous = cell;
            cell[axis] += step[axis];
            t_max[axis] += t_delta[axis];
        }
    }
}

#[inline]
fn sign(v: f64) -> i64 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}
