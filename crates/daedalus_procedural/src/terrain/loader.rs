//! # Chunk Loading
//!
//! [`ChunkLoader`] hands out immutable [`ChunkData`] behind `Arc`. Data
//! comes from the [`ChunkStore`] when it has a copy, otherwise from the
//! density generator. Results are memoized: building one chunk touches 27
//! offsets, and adjacent chunks share most of them.

use std::collections::HashMap;
use std::sync::Arc;

use daedalus_shared::coords::chunk_window_directions;
use daedalus_shared::ChunkOffset;
use glam::I64Vec3;

use super::density::DensityField;
use super::generator::DensityGenerator;
use super::item::ItemData;
use crate::config::TerrainConfig;
use crate::noise::WorldSeed;
use crate::store::ChunkStore;

/// Persistent contents of one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkData {
    /// Chunk offset.
    pub offset: ChunkOffset,
    /// Corner samples.
    pub density: DensityField,
    /// Items saved with the chunk.
    pub items: Vec<ItemData>,
}

impl ChunkData {
    /// Chunk data without items.
    #[must_use]
    pub fn new(offset: ChunkOffset, density: DensityField) -> Self {
        Self {
            offset,
            density,
            items: Vec::new(),
        }
    }
}

/// The 3x3x3 block of chunk data around a centre chunk.
///
/// Window index `(i, j, k)` in `0..3` holds offset `centre + (i, j, k) - 1`.
#[derive(Clone, Debug)]
pub struct ChunkDataSet {
    chunks: Vec<Arc<ChunkData>>,
}

impl ChunkDataSet {
    /// Collects the window around `centre` by calling `fetch` for each of
    /// the 27 offsets.
    pub fn gather(centre: ChunkOffset, mut fetch: impl FnMut(ChunkOffset) -> Arc<ChunkData>) -> Self {
        let chunks = chunk_window_directions()
            .iter()
            .map(|dir| fetch(centre + *dir))
            .collect();
        Self { chunks }
    }

    /// Chunk at window index `(x, y, z)`, each in `0..3`.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32, z: u32) -> &ChunkData {
        &self.chunks[(x + 3 * y + 9 * z) as usize]
    }

    /// Chunk at a signed window index, `None` outside `0..3`.
    #[must_use]
    pub fn at(&self, index: I64Vec3) -> Option<&ChunkData> {
        if index.cmplt(I64Vec3::ZERO).any() || index.cmpgt(I64Vec3::splat(2)).any() {
            return None;
        }
        Some(self.get(index.x as u32, index.y as u32, index.z as u32))
    }

    /// The centre chunk.
    #[inline]
    #[must_use]
    pub fn centre(&self) -> &ChunkData {
        self.get(1, 1, 1)
    }

    /// Swaps in a newer copy of the chunk at `data.offset`. Returns false
    /// when that offset is not part of the window.
    pub fn replace(&mut self, data: Arc<ChunkData>) -> bool {
        match self.chunks.iter_mut().find(|slot| slot.offset == data.offset) {
            Some(slot) => {
                *slot = data;
                true
            }
            None => false,
        }
    }

    /// The 26 neighbours with their window index.
    pub fn neighbours(&self) -> impl Iterator<Item = (I64Vec3, &ChunkData)> {
        chunk_window_directions()
            .into_iter()
            .zip(self.chunks.iter())
            .filter(|(dir, _)| *dir != I64Vec3::ZERO)
            .map(|(dir, chunk)| (dir + I64Vec3::ONE, chunk.as_ref()))
    }
}

/// Loads and generates chunk data.
pub struct ChunkLoader {
    grid_cell_count: u32,
    generator: DensityGenerator,
    store: Box<dyn ChunkStore>,
    memo: HashMap<ChunkOffset, Arc<ChunkData>>,
}

impl ChunkLoader {
    /// Creates a loader backed by `store`.
    #[must_use]
    pub fn new(seed: WorldSeed, config: &TerrainConfig, store: Box<dyn ChunkStore>) -> Self {
        Self {
            grid_cell_count: config.grid_cell_count,
            generator: DensityGenerator::new(seed, config),
            store,
            memo: HashMap::new(),
        }
    }

    /// Data for `offset`, loading or generating it on first use.
    pub fn get_chunk_at(&mut self, offset: ChunkOffset) -> Arc<ChunkData> {
        if let Some(data) = self.memo.get(&offset) {
            return Arc::clone(data);
        }

        let data = match self.store.load_chunk(offset) {
            Some(stored) if stored.density.grid_cell_count() == self.grid_cell_count => stored,
            Some(stored) => {
                tracing::warn!(
                    "stored chunk {} has {} cells per edge, expected {}; regenerating",
                    offset,
                    stored.density.grid_cell_count(),
                    self.grid_cell_count
                );
                ChunkData::new(offset, self.generator.generate(offset))
            }
            None => ChunkData::new(offset, self.generator.generate(offset)),
        };

        let data = Arc::new(data);
        self.memo.insert(offset, Arc::clone(&data));
        data
    }

    /// The 3x3x3 window around `centre`.
    pub fn get_chunk_data_set(&mut self, centre: ChunkOffset) -> ChunkDataSet {
        ChunkDataSet::gather(centre, |offset| self.get_chunk_at(offset))
    }

    /// Makes `data` the current copy for later loads without persisting it.
    pub fn update_chunk(&mut self, data: ChunkData) -> Arc<ChunkData> {
        let data = Arc::new(data);
        self.memo.insert(data.offset, Arc::clone(&data));
        data
    }

    /// Persists `data` and makes it the current copy for later loads.
    pub fn save_chunk(&mut self, data: ChunkData) {
        self.store.save_chunk(&data);
        self.update_chunk(data);
    }

    /// Drops memoized data farther than `radius` from `centre`.
    pub fn retain_within(&mut self, centre: ChunkOffset, radius: u32) {
        let radius = i64::from(radius);
        self.memo
            .retain(|offset, _| (*offset - centre).abs().max_element() <= radius);
    }

    /// Drops all memoized data.
    pub fn clear_cache(&mut self) {
        self.memo.clear();
    }

    /// Number of memoized chunks.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.memo.len()
    }
}
