//! # Biome Region Loader
//!
//! Generates regions on demand, stitches their seams and answers lookups
//! that may cross region boundaries.
//!
//! ## Seam Stitching
//!
//! ```text
//!   +--------+--------+
//!   |   tl   |   tr   |      edge merges:  bl|br  tl|tr  bl/tl  br/tr
//!   |      BR|BL      |
//!   +--------*--------+      corner merge: quad bl.TR -> br.TL
//!   |      TR|TL      |                         -> tr.BL -> tl.BR
//!   |   bl   |   br   |
//!   +--------+--------+
//! ```
//!
//! Each region is triangulated on its own. An edge merge zips the strip
//! between two facing hull chains; a corner merge fills the quad left
//! where four regions meet. Every seam triangle is written into each
//! participating region whose flag for that direction is still unset, in
//! that region's local frame. Merges only add triangles.

use std::collections::{HashMap, HashSet};

use daedalus_shared::{BiomeRegionOffset, EventBus, WorldEvent};
use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::data::{BiomeData, BiomeId, ClimateSampler};
use super::delaunay::{in_circle, orient};
use super::region::BiomeRegionData;
use crate::config::{split_region_point, BiomeConfig};
use crate::error::{BiomeError, BiomeResult};
use crate::noise::WorldSeed;
use crate::store::RegionStore;

/// Offsets changed by one generation or merge pass.
pub type UpdatedRegions = HashSet<BiomeRegionOffset>;

/// Minimum doubled area of a seam triangle.
const SEAM_EPSILON: f64 = 1e-12;

/// Result of a merge call that did not have to be deferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Seam triangles were written and flags set.
    Merged,
    /// Every flag involved was already set; nothing changed.
    AlreadyMerged,
}

type Site = (BiomeId, DVec2);
type SeamTriangle = [Site; 3];

/// Region generator, merger and query front end.
pub struct BiomeRegionLoader {
    config: BiomeConfig,
    seed: WorldSeed,
    climate: ClimateSampler,
    regions: HashMap<BiomeRegionOffset, BiomeRegionData>,
    store: Box<dyn RegionStore>,
    bus: EventBus,
}

impl BiomeRegionLoader {
    /// Creates a loader. Update notifications go out on `bus`.
    #[must_use]
    pub fn new(seed: WorldSeed, config: &BiomeConfig, store: Box<dyn RegionStore>, bus: EventBus) -> Self {
        Self {
            config: config.clone(),
            seed,
            climate: ClimateSampler::new(seed),
            regions: HashMap::new(),
            store,
            bus,
        }
    }

    /// Biome settings.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BiomeConfig {
        &self.config
    }

    /// True when `offset` is in memory.
    #[inline]
    #[must_use]
    pub fn is_biome_region_generated(&self, offset: BiomeRegionOffset) -> bool {
        self.regions.contains_key(&offset)
    }

    /// Region in memory, whatever its merge state.
    #[inline]
    #[must_use]
    pub fn region(&self, offset: BiomeRegionOffset) -> Option<&BiomeRegionData> {
        self.regions.get(&offset)
    }

    /// Number of regions in memory.
    #[inline]
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Loads or generates `offset` without merging it.
    pub fn generate_biome_region(&mut self, offset: BiomeRegionOffset) -> &BiomeRegionData {
        let mut updated = UpdatedRegions::new();
        self.ensure_region(offset, &mut updated);
        &self.regions[&offset]
    }

    fn ensure_region(&mut self, offset: BiomeRegionOffset, updated: &mut UpdatedRegions) {
        if self.regions.contains_key(&offset) {
            return;
        }

        let region = match self.store.load_region(offset) {
            Some(stored) if stored.grid_cell_count() == self.config.grid_cell_count && stored.is_graph_generated() => {
                tracing::debug!("biome region {} loaded from store", offset);
                stored
            }
            _ => self.sample_region(offset),
        };
        self.regions.insert(offset, region);
        updated.insert(offset);
    }

    /// Draws the sites of a region and triangulates them.
    fn sample_region(&self, offset: BiomeRegionOffset) -> BiomeRegionData {
        let size = self.config.grid_cell_count;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.hash_coords(&[offset.x, offset.y]));
        let mut region = BiomeRegionData::new(offset, size);

        let min = self.config.min_points_per_cell;
        let max = self.config.max_points_per_cell.max(min);
        for y in 0..size {
            for x in 0..size {
                let count = rng.gen_range(min..=max);
                for _ in 0..count {
                    let jitter = DVec2::new(rng.gen_range(0.1..0.9), rng.gen_range(0.1..0.9));
                    let position = (DVec2::new(f64::from(x), f64::from(y)) + jitter) / f64::from(size);
                    region.add_biome(x, y, position);
                }
            }
        }
        region.generate_delaunay_graph();

        tracing::debug!(
            "generated biome region {}: {} sites, {} triangles",
            offset,
            region.biomes().len(),
            region.graph().triangles().len()
        );
        region
    }

    fn pair(
        &self,
        a: BiomeRegionOffset,
        b: BiomeRegionOffset,
    ) -> BiomeResult<(&BiomeRegionData, &BiomeRegionData)> {
        let first = self.regions.get(&a).ok_or(BiomeError::RegionNotFound(a))?;
        let second = self.regions.get(&b).ok_or(BiomeError::RegionNotFound(b))?;
        Ok((first, second))
    }

    /// Stitches the seam between two edge-adjacent regions.
    ///
    /// # Errors
    ///
    /// `NotAdjacent` unless the offsets differ by one on exactly one axis,
    /// `RegionNotFound` if either is not in memory, `Deferred` if a seam
    /// corner has no hull vertex within `buffer_size` rings.
    pub fn merge_region_edge(&mut self, a: BiomeRegionOffset, b: BiomeRegionOffset) -> BiomeResult<MergeOutcome> {
        let (low, high) = match b - a {
            d if d == BiomeRegionOffset::X || d == BiomeRegionOffset::Y => (a, b),
            d if d == BiomeRegionOffset::NEG_X || d == BiomeRegionOffset::NEG_Y => (b, a),
            _ => return Err(BiomeError::NotAdjacent(a, b)),
        };
        let direction = high - low;
        let (r1, r2) = self.pair(low, high)?;
        if r1.is_merged_with(direction) && r2.is_merged_with(-direction) {
            return Ok(MergeOutcome::AlreadyMerged);
        }

        let buffer = self.config.buffer_size;
        let deferred = |region: BiomeRegionOffset| BiomeError::Deferred { region };
        let (lower1, lower2, upper1, upper2) = if direction == BiomeRegionOffset::X {
            (
                r1.find_corner_hull_vertex(true, false, buffer).ok_or_else(|| deferred(low))?,
                r2.find_corner_hull_vertex(false, false, buffer).ok_or_else(|| deferred(high))?,
                r1.find_corner_hull_vertex(true, true, buffer).ok_or_else(|| deferred(low))?,
                r2.find_corner_hull_vertex(false, true, buffer).ok_or_else(|| deferred(high))?,
            )
        } else {
            (
                r1.find_corner_hull_vertex(true, true, buffer).ok_or_else(|| deferred(low))?,
                r2.find_corner_hull_vertex(true, false, buffer).ok_or_else(|| deferred(high))?,
                r1.find_corner_hull_vertex(false, true, buffer).ok_or_else(|| deferred(low))?,
                r2.find_corner_hull_vertex(false, false, buffer).ok_or_else(|| deferred(high))?,
            )
        };

        let chain1 = hull_chain(r1, lower1, upper1, true).ok_or_else(|| deferred(low))?;
        let chain2 = hull_chain(r2, lower2, upper2, false).ok_or_else(|| deferred(high))?;
        let triangles = stitch(&chain1, &chain2);

        tracing::debug!(
            "merged edge {} | {}: chains {} and {}, {} triangles",
            low,
            high,
            chain1.len(),
            chain2.len(),
            triangles.len()
        );
        self.write_seam(&[(low, direction), (high, -direction)], &triangles);
        Ok(MergeOutcome::Merged)
    }

    /// Fills the quad where the four regions around the top-right corner of
    /// `bottom_left` meet. Requires the four edges of the block merged.
    ///
    /// # Errors
    ///
    /// `RegionNotFound` if one of the four is not in memory, `Deferred` if an
    /// edge of the block is unmerged or a corner vertex is missing.
    pub fn merge_region_corner(&mut self, bottom_left: BiomeRegionOffset) -> BiomeResult<MergeOutcome> {
        let bl_offset = bottom_left;
        let br_offset = bottom_left + BiomeRegionOffset::X;
        let tl_offset = bottom_left + BiomeRegionOffset::Y;
        let tr_offset = bottom_left + BiomeRegionOffset::ONE;

        let (bl, br) = self.pair(bl_offset, br_offset)?;
        let (tl, tr) = self.pair(tl_offset, tr_offset)?;

        let towards = [
            (bl_offset, BiomeRegionOffset::new(1, 1)),
            (br_offset, BiomeRegionOffset::new(-1, 1)),
            (tr_offset, BiomeRegionOffset::new(-1, -1)),
            (tl_offset, BiomeRegionOffset::new(1, -1)),
        ];
        if bl.is_merged_with(towards[0].1)
            && br.is_merged_with(towards[1].1)
            && tr.is_merged_with(towards[2].1)
            && tl.is_merged_with(towards[3].1)
        {
            return Ok(MergeOutcome::AlreadyMerged);
        }

        let edges_merged = bl.is_merged_with(BiomeRegionOffset::X)
            && br.is_merged_with(BiomeRegionOffset::NEG_X)
            && tl.is_merged_with(BiomeRegionOffset::X)
            && tr.is_merged_with(BiomeRegionOffset::NEG_X)
            && bl.is_merged_with(BiomeRegionOffset::Y)
            && tl.is_merged_with(BiomeRegionOffset::NEG_Y)
            && br.is_merged_with(BiomeRegionOffset::Y)
            && tr.is_merged_with(BiomeRegionOffset::NEG_Y);
        if !edges_merged {
            return Err(BiomeError::Deferred { region: bl_offset });
        }

        let buffer = self.config.buffer_size;
        let corner = |region: &BiomeRegionData, x_high: bool, y_high: bool| {
            region
                .find_corner_hull_vertex(x_high, y_high, buffer)
                .and_then(|index| region.global_vertex(index))
                .ok_or(BiomeError::Deferred {
                    region: region.offset(),
                })
        };
        let quad = [
            corner(bl, true, true)?,
            corner(br, false, true)?,
            corner(tr, false, false)?,
            corner(tl, true, false)?,
        ];

        let triangles = split_quad(&quad);
        if triangles.is_empty() {
            tracing::warn!("corner quad at {} is degenerate; leaving it open", bl_offset);
        }
        tracing::debug!("merged corner at {}: {} triangles", bl_offset, triangles.len());
        self.write_seam(&towards, &triangles);
        Ok(MergeOutcome::Merged)
    }

    /// Adds seam triangles to each listed region whose flag towards the
    /// seam is unset, then sets the flags.
    fn write_seam(&mut self, sides: &[(BiomeRegionOffset, BiomeRegionOffset)], triangles: &[SeamTriangle]) {
        for &(offset, direction) in sides {
            let Some(region) = self.regions.get_mut(&offset) else {
                continue;
            };
            if region.is_merged_with(direction) {
                continue;
            }
            for triangle in triangles {
                region.insert_global_triangle(triangle);
            }
            region.set_merged_with(direction);
        }
    }

    /// Generates the `(2r+1)^2` block around `centre` and merges every
    /// unmerged edge and corner inside it, edges first.
    pub fn generate_biome_region_area(&mut self, centre: BiomeRegionOffset, radius: u32) -> UpdatedRegions {
        let r = i64::from(radius);
        let mut updated = UpdatedRegions::new();
        for y in -r..=r {
            for x in -r..=r {
                self.ensure_region(centre + BiomeRegionOffset::new(x, y), &mut updated);
            }
        }

        for y in -r..=r {
            for x in -r..=r {
                let here = centre + BiomeRegionOffset::new(x, y);
                for step in [BiomeRegionOffset::X, BiomeRegionOffset::Y] {
                    let there = here + step;
                    if (there - centre).abs().max_element() <= r {
                        record_merge(self.merge_region_edge(here, there), &[here, there], &mut updated);
                    }
                }
            }
        }

        for y in -r..r {
            for x in -r..r {
                let bl = centre + BiomeRegionOffset::new(x, y);
                let block = [
                    bl,
                    bl + BiomeRegionOffset::X,
                    bl + BiomeRegionOffset::Y,
                    bl + BiomeRegionOffset::ONE,
                ];
                record_merge(self.merge_region_corner(bl), &block, &mut updated);
            }
        }

        tracing::debug!(
            "area pass around {} (radius {}): {} regions updated",
            centre,
            radius,
            updated.len()
        );
        updated
    }

    /// Brings the 3x3 block around `offset` to the point where `offset` is
    /// merged with all eight neighbours. No-op for a complete region.
    pub fn merge_region(&mut self, offset: BiomeRegionOffset) -> UpdatedRegions {
        if self.regions.get(&offset).is_some_and(BiomeRegionData::is_merged_with_all_neighbours) {
            return UpdatedRegions::new();
        }
        self.generate_biome_region_area(offset, 1)
    }

    /// Complete region at `offset`: merged with all eight neighbours and
    /// with site attributes synthesized. Broadcasts one
    /// `BiomeRegionsUpdated` with everything the call changed.
    ///
    /// # Errors
    ///
    /// `Deferred` when a seam of the region could not be merged yet.
    pub fn get_biome_region_at(&mut self, offset: BiomeRegionOffset) -> BiomeResult<&BiomeRegionData> {
        let mut updated = UpdatedRegions::new();
        if !self.is_complete(offset) {
            updated = self.generate_biome_region_area(offset, self.config.fetch_radius.max(1));
        }

        if !self.is_complete(offset) {
            self.broadcast_updated(&updated);
            return Err(BiomeError::Deferred { region: offset });
        }

        if let Some(region) = self.regions.get_mut(&offset) {
            if !region.is_biome_data_generated() {
                region.generate_biome_data(&self.climate);
                self.store.save_region(region);
                updated.insert(offset);
            }
        }

        self.broadcast_updated(&updated);
        self.regions.get(&offset).ok_or(BiomeError::RegionNotFound(offset))
    }

    fn is_complete(&self, offset: BiomeRegionOffset) -> bool {
        self.regions
            .get(&offset)
            .is_some_and(BiomeRegionData::is_merged_with_all_neighbours)
    }

    fn broadcast_updated(&self, updated: &UpdatedRegions) {
        if updated.is_empty() {
            return;
        }
        let mut offsets: Vec<BiomeRegionOffset> = updated.iter().copied().collect();
        offsets.sort_by_key(|o| (o.y, o.x));
        let delivered = self.bus.broadcast(&WorldEvent::BiomeRegionsUpdated(offsets));
        tracing::debug!("{} region updates sent to {} subscribers", updated.len(), delivered);
    }

    /// Attributes of one site, completing its region first.
    ///
    /// # Errors
    ///
    /// `Deferred` as for [`Self::get_biome_region_at`], `BiomeNotFound` for
    /// an id past the region's sites.
    pub fn get_biome_at(&mut self, id: BiomeId) -> BiomeResult<&BiomeData> {
        self.get_biome_region_at(id.region)?
            .biome(id.local)
            .ok_or(BiomeError::BiomeNotFound(id))
    }

    /// Site nearest to `point` (region units). Neighbouring regions in
    /// memory are probed when the best own site lies within two cells of
    /// the region edge.
    ///
    /// # Errors
    ///
    /// `Deferred` when the owning region cannot be completed yet,
    /// `Invariant` when no site is found at all.
    pub fn find_nearest_biome_id(&mut self, point: DVec2) -> BiomeResult<BiomeId> {
        let (offset, local) = split_region_point(point);
        let own = self.get_biome_region_at(offset)?.find_nearest_point(local);
        let size = self.config.grid_cell_count;

        let mut best = own.map(|found| (BiomeId::new(offset, found.local), found.distance));
        let (start, end) = match own {
            Some(found) => (
                BiomeRegionOffset::new(
                    if found.cell.x < 2 { -1 } else { 0 },
                    if found.cell.y < 2 { -1 } else { 0 },
                ),
                BiomeRegionOffset::new(
                    i64::from(found.cell.x + 2 >= size),
                    i64::from(found.cell.y + 2 >= size),
                ),
            ),
            None => (BiomeRegionOffset::NEG_ONE, BiomeRegionOffset::ONE),
        };

        for x in start.x..=end.x {
            for y in start.y..=end.y {
                if x == 0 && y == 0 {
                    continue;
                }
                let step = BiomeRegionOffset::new(x, y);
                let Some(neighbour) = self.regions.get(&(offset + step)) else {
                    continue;
                };
                if let Some(found) = neighbour.find_nearest_point(local - step.as_dvec2()) {
                    if best.map_or(true, |(_, distance)| found.distance < distance) {
                        best = Some((BiomeId::new(offset + step, found.local), found.distance));
                    }
                }
            }
        }

        best.map(|(id, _)| id)
            .ok_or(BiomeError::Invariant { region: offset, point: local })
    }

    /// Sites of the triangle containing `point` (region units).
    ///
    /// # Errors
    ///
    /// `Deferred` when the owning region cannot be completed yet,
    /// `Invariant` when neither it nor a neighbour in memory covers the
    /// point.
    pub fn find_containing_biome_triangle(&mut self, point: DVec2) -> BiomeResult<[BiomeId; 3]> {
        let (offset, local) = split_region_point(point);
        if let Some(ids) = self.get_biome_region_at(offset)?.find_containing_triangle(local) {
            return Ok(ids);
        }

        let dx = if local.x < 0.5 { -1 } else { 1 };
        let dy = if local.y < 0.5 { -1 } else { 1 };
        for step in [
            BiomeRegionOffset::new(dx, 0),
            BiomeRegionOffset::new(0, dy),
            BiomeRegionOffset::new(dx, dy),
        ] {
            let found = self
                .regions
                .get(&(offset + step))
                .and_then(|neighbour| neighbour.find_containing_triangle(local - step.as_dvec2()));
            if let Some(ids) = found {
                return Ok(ids);
            }
        }

        tracing::error!("no triangle contains {} in region {} or its neighbours", local, offset);
        Err(BiomeError::Invariant { region: offset, point: local })
    }

    /// Drops regions farther than `radius` from `centre`. Complete regions
    /// were saved when they completed; the rest regenerate on demand.
    pub fn retain_within(&mut self, centre: BiomeRegionOffset, radius: u32) {
        let radius = i64::from(radius);
        let before = self.regions.len();
        self.regions
            .retain(|offset, _| (*offset - centre).abs().max_element() <= radius);
        if before != self.regions.len() {
            tracing::debug!("dropped {} biome regions", before - self.regions.len());
        }
    }
}

fn record_merge(result: BiomeResult<MergeOutcome>, offsets: &[BiomeRegionOffset], updated: &mut UpdatedRegions) {
    match result {
        Ok(MergeOutcome::Merged) => updated.extend(offsets.iter().copied()),
        Ok(MergeOutcome::AlreadyMerged) => {}
        Err(error) => tracing::warn!("seam merge skipped: {}", error),
    }
}

/// Hull vertices of `region` from `from` to `to`, counter-clockwise or
/// clockwise, as global sites.
fn hull_chain(region: &BiomeRegionData, from: usize, to: usize, counter_clockwise: bool) -> Option<Vec<Site>> {
    let hull = region.graph().hull();
    let len = hull.len();
    let mut at = region.graph().hull_position(from)?;
    let mut chain = vec![region.global_vertex(from)?];
    for _ in 0..len {
        if hull[at] == to {
            return Some(chain);
        }
        at = if counter_clockwise { (at + 1) % len } else { (at + len - 1) % len };
        chain.push(region.global_vertex(hull[at])?);
    }
    None
}

/// Zips the strip between two chains walking the same way along a seam,
/// `left` on the left hand. Each step closes a triangle on the current
/// base edge with the next vertex of one chain.
fn stitch(left: &[Site], right: &[Site]) -> Vec<SeamTriangle> {
    let mut triangles = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i + 1 < left.len() || j + 1 < right.len() {
        let l = left[i];
        let r = right[j];
        let next_left = left.get(i + 1).copied();
        let next_right = right.get(j + 1).copied();
        let area = |c: Site| orient(l.1, r.1, c.1);
        let left_ok = next_left.is_some_and(|c| area(c) > SEAM_EPSILON);
        let right_ok = next_right.is_some_and(|c| area(c) > SEAM_EPSILON);

        let advance_left = match (next_left, next_right) {
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some(c1), Some(c2)) => match (left_ok, right_ok) {
                (true, true) => !in_circle(l.1, r.1, c1.1, c2.1),
                (true, false) => true,
                (false, true) => false,
                (false, false) => area(c1) >= area(c2),
            },
            (None, None) => break,
        };

        if advance_left {
            if left_ok {
                triangles.push([l, r, left[i + 1]]);
            }
            i += 1;
        } else {
            if right_ok {
                triangles.push([l, r, right[j + 1]]);
            }
            j += 1;
        }
    }
    triangles
}

/// Splits a counter-clockwise quad into two triangles along the diagonal
/// that keeps both counter-clockwise, preferring the Delaunay one.
fn split_quad(quad: &[Site; 4]) -> Vec<SeamTriangle> {
    let [a, b, c, d] = *quad;
    let ccw = |t: &SeamTriangle| orient(t[0].1, t[1].1, t[2].1) > SEAM_EPSILON;
    let first = [[a, b, c], [a, c, d]];
    let second = [[a, b, d], [b, c, d]];
    let first_ok = first.iter().all(ccw);
    let second_ok = second.iter().all(ccw);

    match (first_ok, second_ok) {
        (true, true) if in_circle(a.1, b.1, c.1, d.1) => second.to_vec(),
        (true, _) => first.to_vec(),
        (false, true) => second.to_vec(),
        (false, false) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NullStore;
    use daedalus_shared::EventKind;

    fn config() -> BiomeConfig {
        BiomeConfig {
            grid_cell_count: 8,
            ..BiomeConfig::default()
        }
    }

    fn loader(bus: &EventBus) -> BiomeRegionLoader {
        BiomeRegionLoader::new(WorldSeed::new(77), &config(), Box::new(NullStore), bus.clone())
    }

    fn site(x: f64, y: f64) -> Site {
        (BiomeId::new(BiomeRegionOffset::ZERO, 0), DVec2::new(x, y))
    }

    #[test]
    fn test_generation_is_deterministic() {
        let bus = EventBus::default();
        let mut a = loader(&bus);
        let mut b = loader(&bus);
        let offset = BiomeRegionOffset::new(3, -5);
        let ra = a.generate_biome_region(offset).biomes().to_vec();
        let rb = b.generate_biome_region(offset).biomes().to_vec();
        assert_eq!(ra, rb);
        assert_eq!(ra.len(), 64, "One site per cell");
        for biome in &ra {
            assert!(biome.local_position.cmpge(DVec2::ZERO).all() && biome.local_position.cmplt(DVec2::ONE).all());
        }
    }

    #[test]
    fn test_edge_merge_sets_flags_once() {
        let bus = EventBus::default();
        let mut loader = loader(&bus);
        let a = BiomeRegionOffset::ZERO;
        let b = BiomeRegionOffset::X;
        loader.generate_biome_region(a);
        loader.generate_biome_region(b);
        let before = loader.region(a).unwrap().graph().triangles().len();

        // Argument order does not matter.
        assert_eq!(loader.merge_region_edge(b, a), Ok(MergeOutcome::Merged));
        let after = loader.region(a).unwrap().graph().triangles().len();
        assert!(after > before, "Seam triangles added");
        assert!(loader.region(a).unwrap().is_merged_with(BiomeRegionOffset::X));
        assert!(loader.region(b).unwrap().is_merged_with(BiomeRegionOffset::NEG_X));

        assert_eq!(loader.merge_region_edge(a, b), Ok(MergeOutcome::AlreadyMerged));
        assert_eq!(loader.region(a).unwrap().graph().triangles().len(), after);

        // Both sides received the same seam.
        let seam_a = loader.region(a).unwrap().graph().triangles().len() - before;
        let b_region = loader.region(b).unwrap();
        let ghosts_in_b = b_region.graph().vertices().iter().filter(|v| v.id.region == a).count();
        assert!(seam_a > 0 && ghosts_in_b > 0);
    }

    #[test]
    fn test_merge_rejects_non_adjacent() {
        let bus = EventBus::default();
        let mut loader = loader(&bus);
        let err = loader.merge_region_edge(BiomeRegionOffset::ZERO, BiomeRegionOffset::ONE);
        assert!(matches!(err, Err(BiomeError::NotAdjacent(..))));
        let err = loader.merge_region_edge(BiomeRegionOffset::ZERO, BiomeRegionOffset::X);
        assert!(err.unwrap_err().is_not_found());
    }

    #[test]
    fn test_corner_merge_waits_for_edges() {
        let bus = EventBus::default();
        let mut loader = loader(&bus);
        for offset in [BiomeRegionOffset::ZERO, BiomeRegionOffset::X, BiomeRegionOffset::Y, BiomeRegionOffset::ONE] {
            loader.generate_biome_region(offset);
        }
        let err = loader.merge_region_corner(BiomeRegionOffset::ZERO).unwrap_err();
        assert!(err.is_deferred());
        assert!(!loader.region(BiomeRegionOffset::ZERO).unwrap().is_merged_with(BiomeRegionOffset::ONE));

        loader.merge_region_edge(BiomeRegionOffset::ZERO, BiomeRegionOffset::X).unwrap();
        loader.merge_region_edge(BiomeRegionOffset::Y, BiomeRegionOffset::ONE).unwrap();
        loader.merge_region_edge(BiomeRegionOffset::ZERO, BiomeRegionOffset::Y).unwrap();
        loader.merge_region_edge(BiomeRegionOffset::X, BiomeRegionOffset::ONE).unwrap();
        assert_eq!(loader.merge_region_corner(BiomeRegionOffset::ZERO), Ok(MergeOutcome::Merged));
        assert_eq!(loader.merge_region_corner(BiomeRegionOffset::ZERO), Ok(MergeOutcome::AlreadyMerged));
        assert!(loader.region(BiomeRegionOffset::ONE).unwrap().is_merged_with(BiomeRegionOffset::NEG_ONE));
    }

    #[test]
    fn test_get_region_completes_and_broadcasts_once() {
        let bus = EventBus::default();
        let events = bus.subscribe(&[EventKind::BiomeRegionsUpdated]);
        let mut loader = loader(&bus);

        let region = loader.get_biome_region_at(BiomeRegionOffset::ZERO).unwrap();
        assert!(region.is_merged_with_all_neighbours());
        assert!(region.is_biome_data_generated());

        let received = events.drain();
        assert_eq!(received.len(), 1, "One notification per fetch");
        match &received[0] {
            WorldEvent::BiomeRegionsUpdated(offsets) => {
                assert_eq!(offsets.len(), 9);
                assert!(offsets.contains(&BiomeRegionOffset::ZERO));
            }
            other => panic!("unexpected event {other:?}"),
        }

        // Second fetch changes nothing and stays quiet.
        let triangles = loader.region(BiomeRegionOffset::ZERO).unwrap().graph().triangles().len();
        loader.get_biome_region_at(BiomeRegionOffset::ZERO).unwrap();
        assert!(events.drain().is_empty());
        assert!(loader.merge_region(BiomeRegionOffset::ZERO).is_empty());
        assert_eq!(loader.region(BiomeRegionOffset::ZERO).unwrap().graph().triangles().len(), triangles);
    }

    #[test]
    fn test_get_biome_at() {
        let bus = EventBus::default();
        let mut loader = loader(&bus);
        let id = BiomeId::new(BiomeRegionOffset::new(-2, 1), 5);
        let biome = loader.get_biome_at(id).unwrap();
        assert_eq!(biome.id, id);
        assert!((0.0..=1.0).contains(&biome.rainfall));

        let missing = BiomeId::new(BiomeRegionOffset::new(-2, 1), 10_000);
        assert_eq!(loader.get_biome_at(missing), Err(BiomeError::BiomeNotFound(missing)));
    }

    #[test]
    fn test_stitch_parallel_chains() {
        // Two straight chains facing each other across x = 1.
        let left = [site(0.9, 0.1), site(0.9, 0.4), site(0.9, 0.7)];
        let right = [site(1.1, 0.2), site(1.1, 0.5), site(1.1, 0.8)];
        let triangles = stitch(&left, &right);
        assert_eq!(triangles.len(), left.len() + right.len() - 2);
        for t in &triangles {
            assert!(orient(t[0].1, t[1].1, t[2].1) > 0.0, "Seam triangles are counter-clockwise");
        }
    }

    #[test]
    fn test_split_quad_prefers_delaunay_diagonal() {
        // Wide, flat quad: the short diagonal is the Delaunay one.
        let quad = [site(0.0, 0.0), site(4.0, -0.5), site(8.0, 0.0), site(4.0, 0.5)];
        let triangles = split_quad(&quad);
        assert_eq!(triangles.len(), 2);
        assert_eq!(triangles[0], [quad[0], quad[1], quad[3]], "Split along b-d");

        let degenerate = [site(0.0, 0.0), site(1.0, 0.0), site(2.0, 0.0), site(3.0, 0.0)];
        assert!(split_quad(&degenerate).is_empty());
    }
}
