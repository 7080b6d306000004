//! # Biome Regions
//!
//! A region is one tile of the biome plane. It owns its sites, a `G x G`
//! cell field indexing them, its Delaunay graph and a 3x3 matrix recording
//! which neighbouring seams have been stitched into that graph.
//!
//! Positions are region-local, `[0, 1)^2`, unless a function says
//! otherwise.

use daedalus_shared::BiomeRegionOffset;
use glam::{DVec2, UVec2};

use super::data::{BiomeData, BiomeId, ClimateSampler};
use super::delaunay::DelaunayGraph;

/// Sites indexed by the cell their point falls in.
#[derive(Clone, Debug, PartialEq)]
pub struct BiomeCellField {
    size: u32,
    cells: Vec<Vec<u32>>,
}

impl BiomeCellField {
    /// An empty `size x size` field.
    #[must_use]
    pub fn new(size: u32) -> Self {
        Self {
            size,
            cells: vec![Vec::new(); (size * size) as usize],
        }
    }

    /// Cells per edge.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Local ids in cell `(x, y)`.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> &[u32] {
        &self.cells[(x + y * self.size) as usize]
    }

    fn add(&mut self, x: u32, y: u32, id: u32) {
        self.cells[(x + y * self.size) as usize].push(id);
    }

    /// Cell of a local point, clamped into the field.
    #[must_use]
    pub fn cell_of(&self, point: DVec2) -> UVec2 {
        let max = f64::from(self.size - 1);
        let cell = (point * f64::from(self.size)).floor().clamp(DVec2::ZERO, DVec2::splat(max));
        cell.as_uvec2()
    }

    /// Cells at Chebyshev distance exactly `ring` from `centre` that lie
    /// inside the field, row by row.
    pub fn ring(&self, centre: UVec2, ring: u32) -> impl Iterator<Item = UVec2> + '_ {
        let ring = i64::from(ring);
        let (cx, cy) = (i64::from(centre.x), i64::from(centre.y));
        let size = i64::from(self.size);
        (cy - ring..=cy + ring).flat_map(move |y| {
            (cx - ring..=cx + ring).filter_map(move |x| {
                let on_ring = (x - cx).abs() == ring || (y - cy).abs() == ring;
                let inside = (0..size).contains(&x) && (0..size).contains(&y);
                (on_ring && inside).then(|| UVec2::new(x as u32, y as u32))
            })
        })
    }
}

/// Result of a nearest-site search inside one region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NearestPoint {
    /// Local id of the site.
    pub local: u32,
    /// Cell holding the site.
    pub cell: UVec2,
    /// Distance from the query point, in region units.
    pub distance: f64,
}

/// One tile of the biome map.
#[derive(Clone, Debug)]
pub struct BiomeRegionData {
    offset: BiomeRegionOffset,
    biomes: Vec<BiomeData>,
    cells: BiomeCellField,
    graph: DelaunayGraph,
    /// `[dx + 1][dy + 1]`; the centre entry is the region itself.
    neighbours_merged: [[bool; 3]; 3],
    graph_generated: bool,
    biome_data_generated: bool,
}

impl BiomeRegionData {
    /// An empty region with a `grid_cell_count` cell field.
    #[must_use]
    pub fn new(offset: BiomeRegionOffset, grid_cell_count: u32) -> Self {
        let mut neighbours_merged = [[false; 3]; 3];
        neighbours_merged[1][1] = true;
        Self {
            offset,
            biomes: Vec::new(),
            cells: BiomeCellField::new(grid_cell_count),
            graph: DelaunayGraph::default(),
            neighbours_merged,
            graph_generated: false,
            biome_data_generated: false,
        }
    }

    /// Region offset.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> BiomeRegionOffset {
        self.offset
    }

    /// Cells per edge (G).
    #[inline]
    #[must_use]
    pub const fn grid_cell_count(&self) -> u32 {
        self.cells.size()
    }

    /// The cell field.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &BiomeCellField {
        &self.cells
    }

    /// All sites, indexed by local id.
    #[inline]
    #[must_use]
    pub fn biomes(&self) -> &[BiomeData] {
        &self.biomes
    }

    /// Site by local id.
    #[must_use]
    pub fn biome(&self, local: u32) -> Option<&BiomeData> {
        self.biomes.get(local as usize)
    }

    /// The region graph.
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &DelaunayGraph {
        &self.graph
    }

    /// True once the standalone triangulation exists.
    #[inline]
    #[must_use]
    pub const fn is_graph_generated(&self) -> bool {
        self.graph_generated
    }

    /// True once site attributes are synthesized.
    #[inline]
    #[must_use]
    pub const fn is_biome_data_generated(&self) -> bool {
        self.biome_data_generated
    }

    /// Registers a site at a local position in cell `(x, y)` and returns
    /// its local id.
    pub fn add_biome(&mut self, x: u32, y: u32, position: DVec2) -> u32 {
        let local = self.biomes.len() as u32;
        self.biomes.push(BiomeData::new(BiomeId::new(self.offset, local), position));
        self.cells.add(x, y, local);
        local
    }

    /// Triangulates the region's own sites.
    pub fn generate_delaunay_graph(&mut self) {
        let sites: Vec<(BiomeId, DVec2)> = self
            .biomes
            .iter()
            .map(|biome| (biome.id, biome.local_position))
            .collect();
        self.graph = DelaunayGraph::triangulate(&sites);
        self.graph_generated = true;
    }

    /// Synthesizes every site's attributes.
    pub fn generate_biome_data(&mut self, climate: &ClimateSampler) {
        for biome in &mut self.biomes {
            climate.synthesize(biome);
        }
        self.biome_data_generated = true;
    }

    /// Whether the seam towards `direction` (each axis in `-1..=1`) is
    /// stitched.
    #[must_use]
    pub fn is_merged_with(&self, direction: BiomeRegionOffset) -> bool {
        let (x, y) = Self::flag_index(direction);
        self.neighbours_merged[x][y]
    }

    pub(crate) fn set_merged_with(&mut self, direction: BiomeRegionOffset) {
        let (x, y) = Self::flag_index(direction);
        self.neighbours_merged[x][y] = true;
    }

    fn flag_index(direction: BiomeRegionOffset) -> (usize, usize) {
        let d = direction.clamp(BiomeRegionOffset::NEG_ONE, BiomeRegionOffset::ONE) + BiomeRegionOffset::ONE;
        (d.x as usize, d.y as usize)
    }

    /// True when all eight seams are stitched.
    #[must_use]
    pub fn is_merged_with_all_neighbours(&self) -> bool {
        self.neighbours_merged.iter().flatten().all(|&merged| merged)
    }

    /// Adds a seam triangle given in global region units.
    pub(crate) fn insert_global_triangle(&mut self, corners: &[(BiomeId, DVec2); 3]) -> bool {
        let origin = self.offset.as_dvec2();
        let local = corners.map(|(id, global)| (id, global - origin));
        self.graph.insert_triangle(&local)
    }

    /// Global position (region units) of graph vertex `index`.
    #[must_use]
    pub fn global_vertex(&self, index: usize) -> Option<(BiomeId, DVec2)> {
        self.graph
            .vertex(index)
            .map(|v| (v.id, v.position + self.offset.as_dvec2()))
    }

    /// Hull vertex nearest the corner `(x_high, y_high)` of the region,
    /// searching at most `buffer_size` rings of cells out from the corner
    /// cell. Stops at the first ring that holds a hull vertex.
    #[must_use]
    pub fn find_corner_hull_vertex(&self, x_high: bool, y_high: bool, buffer_size: u32) -> Option<usize> {
        let last = self.cells.size() - 1;
        let corner_cell = UVec2::new(if x_high { last } else { 0 }, if y_high { last } else { 0 });
        let corner = DVec2::new(f64::from(u8::from(x_high)), f64::from(u8::from(y_high)));

        for ring in 0..=buffer_size {
            let mut best: Option<(usize, f64)> = None;
            for cell in self.cells.ring(corner_cell, ring) {
                for &local in self.cells.get(cell.x, cell.y) {
                    let index = local as usize;
                    if !self.graph.is_hull_vertex(index) {
                        continue;
                    }
                    let distance = self.biomes[index].local_position.distance_squared(corner);
                    if best.map_or(true, |(_, d)| distance < d) {
                        best = Some((index, distance));
                    }
                }
            }
            if let Some((index, _)) = best {
                return Some(index);
            }
        }
        None
    }

    /// Nearest own site to a local point. The point may lie outside
    /// `[0, 1)^2`.
    #[must_use]
    pub fn find_nearest_point(&self, point: DVec2) -> Option<NearestPoint> {
        let size = self.cells.size();
        let start = self.cells.cell_of(point);
        let mut best: Option<(u32, f64)> = None;

        for ring in 0..size {
            for cell in self.cells.ring(start, ring) {
                for &local in self.cells.get(cell.x, cell.y) {
                    let distance = self.biomes[local as usize].local_position.distance(point);
                    if best.map_or(true, |(_, d)| distance < d) {
                        best = Some((local, distance));
                    }
                }
            }
            // Sites in later rings are at least `ring / size` away.
            if let Some((_, d)) = best {
                if d <= f64::from(ring) / f64::from(size) {
                    break;
                }
            }
        }

        best.map(|(local, distance)| NearestPoint {
            local,
            cell: self.cells.cell_of(self.biomes[local as usize].local_position),
            distance,
        })
    }

    /// Ids of the graph triangle containing a local point.
    #[must_use]
    pub fn find_containing_triangle(&self, point: DVec2) -> Option<[BiomeId; 3]> {
        let hint = self.find_nearest_point(point).map(|nearest| nearest.local as usize);
        let t = self.graph.locate(point, hint)?;
        self.graph.triangle_ids(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One site at the centre of every cell.
    fn lattice(size: u32) -> BiomeRegionData {
        let mut region = BiomeRegionData::new(BiomeRegionOffset::ZERO, size);
        for y in 0..size {
            for x in 0..size {
                // Slight jitter so no four sites are cocircular.
                let jitter = f64::from((x * 7 + y * 13) % 5) * 1e-3;
                let p = (DVec2::new(f64::from(x), f64::from(y)) + 0.5 + jitter) / f64::from(size);
                region.add_biome(x, y, p);
            }
        }
        region.generate_delaunay_graph();
        region
    }

    #[test]
    fn test_ring_iteration() {
        let field = BiomeCellField::new(8);
        assert_eq!(field.ring(UVec2::new(3, 3), 0).count(), 1);
        assert_eq!(field.ring(UVec2::new(3, 3), 1).count(), 8);
        assert_eq!(field.ring(UVec2::new(0, 0), 1).count(), 3, "Clipped at the corner");
        assert_eq!(field.cell_of(DVec2::new(-0.2, 1.4)), UVec2::new(0, 7));
    }

    #[test]
    fn test_merge_flags() {
        let mut region = BiomeRegionData::new(BiomeRegionOffset::ZERO, 4);
        assert!(region.is_merged_with(BiomeRegionOffset::ZERO));
        assert!(!region.is_merged_with_all_neighbours());
        for direction in daedalus_shared::coords::region_neighbour_directions() {
            region.set_merged_with(direction);
        }
        assert!(region.is_merged_with_all_neighbours());
    }

    #[test]
    fn test_corner_hull_vertices() {
        let region = lattice(8);
        let last = 8 * 8 - 1;
        assert_eq!(region.find_corner_hull_vertex(false, false, 3), Some(0));
        assert_eq!(region.find_corner_hull_vertex(true, true, 3), Some(last));
        assert_eq!(region.find_corner_hull_vertex(true, false, 3), Some(7));
        assert_eq!(region.find_corner_hull_vertex(false, true, 3), Some(56));
    }

    #[test]
    fn test_corner_search_is_bounded() {
        // Only interior sites: nothing near the corners.
        let mut region = BiomeRegionData::new(BiomeRegionOffset::ZERO, 8);
        region.add_biome(4, 4, DVec2::new(0.55, 0.55));
        region.add_biome(5, 4, DVec2::new(0.7, 0.56));
        region.add_biome(4, 5, DVec2::new(0.56, 0.7));
        region.generate_delaunay_graph();
        assert_eq!(region.find_corner_hull_vertex(false, false, 3), None);
        assert!(region.find_corner_hull_vertex(false, false, 4).is_some());
    }

    #[test]
    fn test_nearest_point_matches_brute_force() {
        let region = lattice(8);
        for i in 0..50 {
            let p = DVec2::new(f64::from(i) * 0.019 - 0.1, f64::from(i * 7 % 50) * 0.021 - 0.02);
            let found = region.find_nearest_point(p).unwrap();
            let brute = region
                .biomes()
                .iter()
                .map(|b| b.local_position.distance(p))
                .fold(f64::INFINITY, f64::min);
            assert!((found.distance - brute).abs() < 1e-12, "point {p:?}");
        }
    }

    #[test]
    fn test_containing_triangle_inside_hull() {
        let region = lattice(8);
        let ids = region
            .find_containing_triangle(DVec2::new(0.5, 0.5))
            .expect("centre lies inside the hull");
        assert!(ids.iter().all(|id| id.region == BiomeRegionOffset::ZERO));
        assert!(region.find_containing_triangle(DVec2::new(0.01, 0.01)).is_none(), "Corner is outside the standalone hull");
    }
}
