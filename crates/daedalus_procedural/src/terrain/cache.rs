//! # Chunk Cache
//!
//! Keeps every chunk within `render_distance` (Chebyshev) of the tracked
//! position's chunk materialized, meshed and spawned. Chunks that fall out
//! of the window are despawned; chunks whose items changed are handed back
//! to the loader (and its store) first.
//!
//! Every placement or removal is published to the loader and to the windows
//! of the live neighbours, so item collisions across chunk borders see the
//! current item lists.

use std::collections::HashMap;
use std::sync::Arc;

use daedalus_shared::coords::chunk_window_directions;
use daedalus_shared::ChunkOffset;
use glam::DVec3;

use super::chunk::Chunk;
use super::item::{ItemData, ItemDataId, ItemRotation, ItemTemplate};
use super::loader::ChunkLoader;
use super::mesher::ChunkMesher;
use super::raytrace::RaytraceHit;
use crate::config::TerrainConfig;
use crate::noise::WorldSeed;
use crate::scene::SceneHost;
use crate::store::ChunkStore;
use crate::world::WindowChange;

/// Render-distance window of live chunks.
pub struct ChunkCache {
    config: TerrainConfig,
    loader: ChunkLoader,
    mesher: ChunkMesher,
    chunks: HashMap<ChunkOffset, Chunk>,
    centre: Option<ChunkOffset>,
}

impl ChunkCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(seed: WorldSeed, config: &TerrainConfig, store: Box<dyn ChunkStore>) -> Self {
        Self {
            config: config.clone(),
            loader: ChunkLoader::new(seed, config, store),
            mesher: ChunkMesher::new(config.grid_cell_count, config.chunk_scale),
            chunks: HashMap::new(),
            centre: None,
        }
    }

    /// Re-centres the window on the chunk containing `world`.
    pub fn update_at(&mut self, world: DVec3, scene: &mut dyn SceneHost) -> WindowChange<ChunkOffset> {
        let centre = self.config.to_chunk_position(world).offset;
        let mut change = WindowChange::default();
        if self.centre == Some(centre) {
            return change;
        }
        self.centre = Some(centre);
        let radius = i64::from(self.config.render_distance);

        let stale: Vec<ChunkOffset> = self
            .chunks
            .keys()
            .filter(|offset| (**offset - centre).abs().max_element() > radius)
            .copied()
            .collect();
        for offset in stale {
            if let Some(mut chunk) = self.chunks.remove(&offset) {
                chunk.despawn(scene);
                if chunk.is_modified() {
                    self.loader.save_chunk(chunk.to_chunk_data());
                }
                change.evicted.push(offset);
            }
        }

        let mut missing = Vec::new();
        for z in -radius..=radius {
            for y in -radius..=radius {
                for x in -radius..=radius {
                    let offset = centre + ChunkOffset::new(x, y, z);
                    if !self.chunks.contains_key(&offset) {
                        missing.push(offset);
                    }
                }
            }
        }
        // Nearest chunks first.
        missing.sort_by_key(|offset| (*offset - centre).length_squared());

        for offset in missing {
            let window = self.loader.get_chunk_data_set(offset);
            let mut chunk = Chunk::new(window, &self.mesher, self.config.chunk_scale);
            chunk.spawn(scene);
            self.chunks.insert(offset, chunk);
            change.loaded.push(offset);
        }

        self.loader.retain_within(centre, self.config.render_distance + 1);
        tracing::info!(
            "chunk window centred on {}: {} loaded, {} evicted",
            centre,
            change.loaded.len(),
            change.evicted.len()
        );
        change
    }

    /// Live chunk at `offset`.
    #[must_use]
    pub fn chunk_at(&self, offset: ChunkOffset) -> Option<&Chunk> {
        self.chunks.get(&offset)
    }

    /// Number of live chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// True before the first update.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk the window is centred on.
    #[must_use]
    pub const fn centre(&self) -> Option<ChunkOffset> {
        self.centre
    }

    /// Casts a ray from a world position through the chunk containing it.
    #[must_use]
    pub fn raytrace(&self, origin: DVec3, direction: DVec3, max_distance: f64) -> Option<RaytraceHit> {
        let position = self.config.to_chunk_position(origin);
        self.chunks
            .get(&position.offset)?
            .raytrace(position.local, direction, max_distance)
    }

    /// Places an item at a world position. `None` if the owning chunk is
    /// not loaded or the space is occupied.
    pub fn create_item(
        &mut self,
        template: Arc<ItemTemplate>,
        rotation: ItemRotation,
        world: DVec3,
        scene: &mut dyn SceneHost,
    ) -> Option<ItemDataId> {
        let position = self.config.to_chunk_position(world);
        let rotation = rotation.bound(template.rotation_interval);
        let chunk = self.chunks.get_mut(&position.offset)?;
        let id = chunk.create_item(ItemData::new(template, rotation, position), false, scene)?;
        self.publish_items(id.chunk);
        Some(id)
    }

    /// Removes a placed item.
    pub fn remove_item(&mut self, id: ItemDataId, scene: &mut dyn SceneHost) -> Option<ItemData> {
        let removed = self.chunks.get_mut(&id.chunk)?.remove_item(id.id, scene)?;
        self.publish_items(id.chunk);
        Some(removed)
    }

    fn publish_items(&mut self, offset: ChunkOffset) {
        let Some(chunk) = self.chunks.get(&offset) else {
            return;
        };
        let data = self.loader.update_chunk(chunk.to_chunk_data());
        for dir in chunk_window_directions() {
            if let Some(neighbour) = self.chunks.get_mut(&(offset + dir)) {
                neighbour.refresh_window(&data);
            }
        }
    }

    /// The underlying loader.
    #[must_use]
    pub fn loader(&self) -> &ChunkLoader {
        &self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NullScene;
    use crate::store::{MemoryStore, NullStore};
    use daedalus_shared::Aabb;

    fn cache(render_distance: u32) -> ChunkCache {
        cache_with(render_distance, Box::new(NullStore))
    }

    fn cache_with(render_distance: u32, store: Box<dyn ChunkStore>) -> ChunkCache {
        let config = TerrainConfig {
            grid_cell_count: 8,
            render_distance,
            ..TerrainConfig::default()
        };
        ChunkCache::new(WorldSeed::new(5), &config, store)
    }

    #[test]
    fn test_window_fill_and_evict() {
        let mut scene = NullScene::default();
        let mut cache = cache(1);

        let change = cache.update_at(DVec3::new(1.0, 1.0, 1.0), &mut scene);
        assert_eq!(change.loaded.len(), 27);
        assert!(change.evicted.is_empty());
        assert_eq!(cache.len(), 27);
        assert_eq!(change.loaded[0], ChunkOffset::ZERO, "Centre loads first");

        // Same chunk again: nothing to do.
        assert!(cache.update_at(DVec3::new(2.0, 2.0, 2.0), &mut scene).loaded.is_empty());

        // One chunk over along x (40 world units per chunk).
        let change = cache.update_at(DVec3::new(41.0, 1.0, 1.0), &mut scene);
        assert_eq!(change.loaded.len(), 9);
        assert_eq!(change.evicted.len(), 9);
        assert!(change.evicted.iter().all(|o| o.x == -1));
        assert_eq!(cache.len(), 27);
        assert_eq!(scene.live_count(), 27, "Evicted meshes are destroyed");
    }

    fn slab_template() -> Arc<ItemTemplate> {
        Arc::new(ItemTemplate {
            item_type: 2,
            bounds: Aabb::new(DVec3::ZERO, DVec3::new(2.0, 1.0, 1.0)),
            pivot: DVec3::new(1.0, 0.5, 0.5),
            rotation_interval: 4,
        })
    }

    #[test]
    fn test_collision_across_chunk_border() {
        let mut scene = NullScene::default();
        let mut cache = cache(1);
        // 8 cells of 5 world units per chunk; chunk z = 3 is open air.
        let z = 40.0 * 3.0 + 10.0;
        cache.update_at(DVec3::new(20.0, 20.0, z), &mut scene);

        // Cells 0.25..2.25 of chunk (1, 0, 3).
        let east = cache
            .create_item(slab_template(), ItemRotation::default(), DVec3::new(41.25, 20.0, z), &mut scene)
            .expect("open air");
        assert_eq!(east.chunk, ChunkOffset::new(1, 0, 3));

        // Cells 7..9 of chunk (0, 0, 3) reach into the slab above.
        let west = DVec3::new(35.0, 20.0, z);
        assert!(
            cache
                .create_item(slab_template(), ItemRotation::default(), west, &mut scene)
                .is_none(),
            "Overlap with an item owned by the neighbour"
        );

        // Once it is gone the same spot is free.
        assert!(cache.remove_item(east, &mut scene).is_some());
        let placed = cache
            .create_item(slab_template(), ItemRotation::default(), west, &mut scene)
            .expect("no phantom left behind");
        assert_eq!(placed.chunk, ChunkOffset::new(0, 0, 3));
    }

    #[test]
    fn test_emptied_chunk_is_saved_on_eviction() {
        let mut scene = NullScene::default();
        let mut cache = cache_with(0, Box::new(MemoryStore::default()));
        let spot = DVec3::new(10.0, 10.0, 40.0 * 3.0 + 10.0);
        cache.update_at(spot, &mut scene);
        let id = cache
            .create_item(slab_template(), ItemRotation::default(), spot, &mut scene)
            .unwrap();

        // Evict with the item, then remove it after reloading.
        cache.update_at(spot + DVec3::new(400.0, 0.0, 0.0), &mut scene);
        cache.update_at(spot, &mut scene);
        assert!(cache.remove_item(id, &mut scene).is_some());

        cache.update_at(spot + DVec3::new(400.0, 0.0, 0.0), &mut scene);
        cache.update_at(spot, &mut scene);
        assert!(cache.chunk_at(id.chunk).unwrap().items().is_empty(), "Removal was persisted");
    }

    #[test]
    fn test_items_survive_eviction() {
        let mut scene = NullScene::default();
        let mut cache = cache_with(0, Box::new(MemoryStore::default()));
        let template = Arc::new(ItemTemplate {
            item_type: 1,
            bounds: Aabb::new(DVec3::ZERO, DVec3::splat(0.5)),
            pivot: DVec3::ZERO,
            rotation_interval: 4,
        });

        // High above the terrain so the space is free.
        let spot = DVec3::new(10.0, 10.0, 35.0 + 40.0 * 3.0);
        cache.update_at(spot, &mut scene);
        let id = cache
            .create_item(template, ItemRotation::new(5, 0), spot, &mut scene)
            .expect("air above the surface is free");
        let rotation = cache.chunk_at(id.chunk).unwrap().item(id.id).unwrap().rotation;
        assert_eq!(rotation, ItemRotation::new(1, 0), "Rotation is bounded by the interval");

        // Walk away and come back.
        cache.update_at(spot + DVec3::new(400.0, 0.0, 0.0), &mut scene);
        assert!(cache.chunk_at(id.chunk).is_none());
        cache.update_at(spot, &mut scene);

        let chunk = cache.chunk_at(id.chunk).unwrap();
        assert!(chunk.item(id.id).is_some(), "Item reloaded from the store");
        assert_eq!(scene.live_count(), 2, "Mesh plus respawned item");
    }
}
