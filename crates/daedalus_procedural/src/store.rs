//! Persistence seams.
//!
//! Loaders consult a store before generating and hand finished data back to
//! it. The storage format is the store's business; [`NullStore`] keeps
//! nothing and makes every load a miss, [`MemoryStore`] keeps everything
//! in process.

use std::collections::HashMap;

use daedalus_shared::{BiomeRegionOffset, ChunkOffset};

use crate::biome::BiomeRegionData;
use crate::terrain::ChunkData;

/// Chunk persistence.
pub trait ChunkStore {
    /// Previously saved data for `offset`, if any.
    fn load_chunk(&mut self, offset: ChunkOffset) -> Option<ChunkData>;

    /// Saves a chunk, replacing any earlier copy.
    fn save_chunk(&mut self, data: &ChunkData);
}

/// Biome region persistence.
pub trait RegionStore {
    /// Previously saved region for `offset`, if any.
    fn load_region(&mut self, offset: BiomeRegionOffset) -> Option<BiomeRegionData>;

    /// Saves a region, replacing any earlier copy.
    fn save_region(&mut self, region: &BiomeRegionData);
}

/// Store that persists nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStore;

impl ChunkStore for NullStore {
    fn load_chunk(&mut self, _offset: ChunkOffset) -> Option<ChunkData> {
        None
    }

    fn save_chunk(&mut self, _data: &ChunkData) {}
}

impl RegionStore for NullStore {
    fn load_region(&mut self, _offset: BiomeRegionOffset) -> Option<BiomeRegionData> {
        None
    }

    fn save_region(&mut self, _region: &BiomeRegionData) {}
}

/// Store that keeps saved chunks and regions in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    chunks: HashMap<ChunkOffset, ChunkData>,
    regions: HashMap<BiomeRegionOffset, BiomeRegionData>,
}

impl MemoryStore {
    /// Number of saved chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of saved regions.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

impl ChunkStore for MemoryStore {
    fn load_chunk(&mut self, offset: ChunkOffset) -> Option<ChunkData> {
        self.chunks.get(&offset).cloned()
    }

    fn save_chunk(&mut self, data: &ChunkData) {
        self.chunks.insert(data.offset, data.clone());
    }
}

impl RegionStore for MemoryStore {
    fn load_region(&mut self, offset: BiomeRegionOffset) -> Option<BiomeRegionData> {
        self.regions.get(&offset).cloned()
    }

    fn save_region(&mut self, region: &BiomeRegionData) {
        self.regions.insert(region.offset(), region.clone());
    }
}
