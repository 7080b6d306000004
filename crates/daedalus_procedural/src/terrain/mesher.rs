//! # Marching Cubes Mesher
//!
//! Extracts the `density = 0` surface of one chunk. Corner samples come
//! from the 3x3x3 window, so the last corner layer on each axis is read
//! from the neighbour that owns it.
//!
//! ## Output
//!
//! A flat triangle list in chunk-local world units (cell index times
//! `chunk_scale / N`). Vertices are `Pod` and can be uploaded as-is.

use bytemuck::{Pod, Zeroable};
use glam::DVec3;

use super::density::SolidCache;
use super::loader::ChunkDataSet;
use super::tables::{CORNER_OFFSETS, EDGE_CORNERS, TRIANGLE_TABLE};

/// One mesh vertex.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    /// Chunk-local position in world units.
    pub position: [f32; 3],
}

/// Triangle soup for one chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMesh {
    /// Three vertices per triangle.
    pub vertices: Vec<MeshVertex>,
}

impl ChunkMesh {
    /// Number of triangles.
    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// True when no surface crosses the chunk.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex data as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Marching cubes over a chunk window.
#[derive(Clone, Copy, Debug)]
pub struct ChunkMesher {
    grid_cell_count: u32,
    cell_size: f64,
}

impl ChunkMesher {
    /// Creates a mesher for chunks of `grid_cell_count` cells spanning
    /// `chunk_scale` world units.
    #[must_use]
    pub fn new(grid_cell_count: u32, chunk_scale: f64) -> Self {
        Self {
            grid_cell_count,
            cell_size: chunk_scale / f64::from(grid_cell_count),
        }
    }

    /// Meshes the centre chunk of `window` and evaluates its solid cache.
    #[must_use]
    pub fn mesh(&self, window: &ChunkDataSet) -> (ChunkMesh, SolidCache) {
        let n = self.grid_cell_count;
        let side = n + 1;
        let corners = self.padded_corners(window);
        let at = |x: u32, y: u32, z: u32| corners[(x + side * (y + side * z)) as usize];

        let mut mesh = ChunkMesh::default();
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    let mut values = [0.0f32; 8];
                    let mut case = 0usize;
                    for (i, offset) in CORNER_OFFSETS.iter().enumerate() {
                        let v = at(x + offset[0], y + offset[1], z + offset[2]);
                        values[i] = v;
                        if v > 0.0 {
                            case |= 1 << i;
                        }
                    }
                    if case == 0 || case == 255 {
                        continue;
                    }
                    self.emit_cell(&mut mesh, DVec3::new(f64::from(x), f64::from(y), f64::from(z)), case, &values);
                }
            }
        }

        let solid = SolidCache::from_field(&window.centre().density);
        tracing::debug!(
            "meshed chunk {}: {} triangles, {} solid cells",
            window.centre().offset,
            mesh.triangle_count(),
            solid.solid_count()
        );
        (mesh, solid)
    }

    /// Assembles the `(N+1)^3` corner grid of the centre chunk. Corner
    /// `(x, y, z)` comes from window chunk `(x/N + 1, y/N + 1, z/N + 1)` at
    /// local `(x%N, y%N, z%N)`.
    fn padded_corners(&self, window: &ChunkDataSet) -> Vec<f32> {
        let n = self.grid_cell_count;
        let side = n + 1;
        let mut out = Vec::with_capacity((side * side * side) as usize);
        for z in 0..side {
            for y in 0..side {
                for x in 0..side {
                    let chunk = window.get(x / n + 1, y / n + 1, z / n + 1);
                    out.push(chunk.density.get(x % n, y % n, z % n));
                }
            }
        }
        out
    }

    fn emit_cell(&self, mesh: &mut ChunkMesh, base: DVec3, case: usize, values: &[f32; 8]) {
        let mut edge_points = [DVec3::ZERO; 12];
        for (edge, (a, b)) in EDGE_CORNERS.iter().enumerate() {
            let pa = corner_position(*a);
            let pb = corner_position(*b);
            let da = f64::from(values[*a]);
            let db = f64::from(values[*b]);
            let denom = db - da;
            edge_points[edge] = if denom.abs() < 1e-10 {
                (pa + pb) * 0.5
            } else {
                let t = (-da / denom).clamp(0.0, 1.0);
                pa + (pb - pa) * t
            };
        }

        for &edge in TRIANGLE_TABLE[case].iter().take_while(|&&e| e >= 0) {
            let p = (base + edge_points[edge as usize]) * self.cell_size;
            mesh.vertices.push(MeshVertex {
                position: p.as_vec3().to_array(),
            });
        }
    }
}

#[inline]
fn corner_position(corner: usize) -> DVec3 {
    let o = CORNER_OFFSETS[corner];
    DVec3::new(f64::from(o[0]), f64::from(o[1]), f64::from(o[2]))
}
