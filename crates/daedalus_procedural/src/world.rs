//! # World Driver
//!
//! Ties the chunk and biome caches to the event bus and a scene host.
//!
//! ## Event Flow
//!
//! ```text
//! PlayerPositionChanged ──> ChunkCache::update_at
//!                      └──> BiomeRegionCache::update_at ──> BiomeRegionsUpdated
//! BiomeRegionsUpdated   ──> BiomeRegionCache::on_regions_updated
//! ```
//!
//! Events are queued on the bus and handled in [`World::pump_events`], on
//! the caller's thread.

use std::sync::Arc;

use daedalus_shared::{EventBus, EventKind, EventReceiver, WorldEvent};
use glam::DVec3;

use crate::biome::{BiomeId, BiomeRegionCache, BiomeRegionLoader};
use crate::config::WorldConfig;
use crate::error::{BiomeResult, ConfigResult};
use crate::scene::SceneHost;
use crate::store::{ChunkStore, NullStore, RegionStore};
use crate::terrain::{ChunkCache, ItemData, ItemDataId, ItemRotation, ItemTemplate, RaytraceHit};

/// Offsets that entered and left a cache window in one update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowChange<O> {
    /// Newly materialized, nearest first.
    pub loaded: Vec<O>,
    /// Dropped from the window.
    pub evicted: Vec<O>,
}

impl<O> Default for WindowChange<O> {
    fn default() -> Self {
        Self {
            loaded: Vec::new(),
            evicted: Vec::new(),
        }
    }
}

/// Running totals.
#[derive(Clone, Debug, Default)]
pub struct WorldStats {
    /// Events handled by [`World::pump_events`].
    pub events_processed: u64,
    /// Chunks materialized.
    pub chunks_loaded: u64,
    /// Chunks evicted.
    pub chunks_evicted: u64,
    /// Region visuals spawned.
    pub regions_loaded: u64,
    /// Region visuals evicted.
    pub regions_evicted: u64,
    /// Region visuals rebuilt after an update.
    pub visuals_refreshed: u64,
}

/// The generated world around one tracked position.
pub struct World<S: SceneHost> {
    config: WorldConfig,
    scene: S,
    bus: EventBus,
    events: EventReceiver,
    chunks: ChunkCache,
    biomes: BiomeRegionCache,
    stats: WorldStats,
    /// Position whose handling failed; retried first on the next pump.
    pending_move: Option<DVec3>,
}

impl<S: SceneHost> World<S> {
    /// Creates a world that persists nothing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::Invalid`] if `config` fails validation.
    pub fn new(config: WorldConfig, scene: S) -> ConfigResult<Self> {
        Self::with_stores(config, scene, Box::new(NullStore), Box::new(NullStore))
    }

    /// Creates a world backed by the given stores.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::Invalid`] if `config` fails validation.
    pub fn with_stores(
        config: WorldConfig,
        scene: S,
        chunk_store: Box<dyn ChunkStore>,
        region_store: Box<dyn RegionStore>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let seed = config.world_seed();
        let bus = EventBus::default();
        let events = bus.subscribe(&[EventKind::PlayerPositionChanged, EventKind::BiomeRegionsUpdated]);
        let chunks = ChunkCache::new(seed, &config.terrain, chunk_store);
        let loader = BiomeRegionLoader::new(seed, &config.biome, region_store, bus.clone());

        tracing::info!(
            "world created: seed {}, {} cells per chunk, {} cells per region",
            config.seed,
            config.terrain.grid_cell_count,
            config.biome.grid_cell_count
        );

        Ok(Self {
            config,
            scene,
            bus,
            events,
            chunks,
            biomes: BiomeRegionCache::new(loader),
            stats: WorldStats::default(),
            pending_move: None,
        })
    }

    /// Handles every queued event, including the ones raised while
    /// handling. Returns how many were handled.
    ///
    /// # Errors
    ///
    /// Propagates a non-deferred biome error. The position that failed is
    /// kept and handled again at the start of the next call; events after
    /// it stay queued.
    pub fn pump_events(&mut self) -> BiomeResult<usize> {
        let mut handled = 0;
        if let Some(position) = self.pending_move {
            self.on_player_moved(position)?;
            handled += 1;
            self.stats.events_processed += 1;
        }
        while let Some(event) = self.events.try_recv() {
            match event {
                WorldEvent::PlayerPositionChanged(position) => self.on_player_moved(position)?,
                WorldEvent::BiomeRegionsUpdated(offsets) => {
                    let refreshed = self.biomes.on_regions_updated(&offsets, &mut self.scene);
                    self.stats.visuals_refreshed += refreshed as u64;
                }
            }
            handled += 1;
            self.stats.events_processed += 1;
        }
        Ok(handled)
    }

    fn on_player_moved(&mut self, position: DVec3) -> BiomeResult<()> {
        self.pending_move = Some(position);
        let chunks = self.chunks.update_at(position, &mut self.scene);
        self.stats.chunks_loaded += chunks.loaded.len() as u64;
        self.stats.chunks_evicted += chunks.evicted.len() as u64;

        let regions = self.biomes.update_at(position, &mut self.scene)?;
        self.stats.regions_loaded += regions.loaded.len() as u64;
        self.stats.regions_evicted += regions.evicted.len() as u64;
        self.pending_move = None;
        Ok(())
    }

    /// Event bus shared with the host.
    #[inline]
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Configuration the world was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Chunk window.
    #[inline]
    #[must_use]
    pub fn chunks(&self) -> &ChunkCache {
        &self.chunks
    }

    /// Biome window.
    #[inline]
    #[must_use]
    pub fn biomes(&self) -> &BiomeRegionCache {
        &self.biomes
    }

    /// Biome window, mutably.
    #[inline]
    pub fn biomes_mut(&mut self) -> &mut BiomeRegionCache {
        &mut self.biomes
    }

    /// Scene host.
    #[inline]
    #[must_use]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Running totals.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &WorldStats {
        &self.stats
    }

    /// Casts a ray from a world position through the loaded chunk there.
    #[must_use]
    pub fn raytrace(&self, origin: DVec3, direction: DVec3, max_distance: f64) -> Option<RaytraceHit> {
        self.chunks.raytrace(origin, direction, max_distance)
    }

    /// Places an item at a world position.
    pub fn create_item(
        &mut self,
        template: Arc<ItemTemplate>,
        rotation: ItemRotation,
        position: DVec3,
    ) -> Option<ItemDataId> {
        self.chunks.create_item(template, rotation, position, &mut self.scene)
    }

    /// Removes a placed item.
    pub fn remove_item(&mut self, id: ItemDataId) -> Option<ItemData> {
        self.chunks.remove_item(id, &mut self.scene)
    }

    /// Biome site nearest to a world position.
    ///
    /// # Errors
    ///
    /// As [`BiomeRegionLoader::find_nearest_biome_id`].
    pub fn find_nearest_biome_id(&mut self, position: DVec3) -> BiomeResult<BiomeId> {
        self.biomes.find_nearest_biome_id(position)
    }

    /// Biome triangle containing a world position.
    ///
    /// # Errors
    ///
    /// As [`BiomeRegionLoader::find_containing_biome_triangle`].
    pub fn find_containing_biome_triangle(&mut self, position: DVec3) -> BiomeResult<[BiomeId; 3]> {
        self.biomes.find_containing_biome_triangle(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BiomeConfig, TerrainConfig};
    use crate::scene::NullScene;
    use daedalus_shared::BiomeRegionOffset;

    fn small_config() -> WorldConfig {
        WorldConfig {
            seed: 2024,
            terrain: TerrainConfig {
                grid_cell_count: 8,
                render_distance: 1,
                ..TerrainConfig::default()
            },
            biome: BiomeConfig {
                grid_cell_count: 8,
                scale: 1000.0,
                ..BiomeConfig::default()
            },
        }
    }

    #[test]
    fn test_position_event_fills_both_windows() {
        let mut world = World::new(small_config(), NullScene::default()).unwrap();
        world.bus().broadcast(&WorldEvent::PlayerPositionChanged(DVec3::new(5.0, 5.0, 5.0)));
        let handled = world.pump_events().unwrap();

        // The position event plus at least one region update it triggered.
        assert!(handled >= 2, "handled {handled}");
        assert_eq!(world.chunks().len(), 27);
        assert_eq!(world.biomes().len(), 9);
        assert!(world.biomes().contains(BiomeRegionOffset::ZERO));
        assert!(world.stats().visuals_refreshed >= 1);
        assert_eq!(world.scene().live_count(), 27 + 9, "Refreshes replace visuals one for one");

        // Nothing left over.
        assert_eq!(world.pump_events().unwrap(), 0);
    }

    #[test]
    fn test_failed_position_is_retried() {
        let mut world = World::new(small_config(), NullScene::default()).unwrap();
        // As left behind by a position whose biome update failed.
        world.pending_move = Some(DVec3::new(5.0, 5.0, 5.0));

        let handled = world.pump_events().unwrap();
        assert!(handled >= 1, "handled {handled}");
        assert!(world.pending_move.is_none());
        assert_eq!(world.chunks().len(), 27);
        assert_eq!(world.biomes().len(), 9);

        // Handled once only.
        assert_eq!(world.pump_events().unwrap(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config();
        config.terrain.grid_cell_count = 0;
        assert!(World::new(config, NullScene::default()).is_err());
    }

    #[test]
    fn test_window_change_default_is_empty() {
        let change: WindowChange<BiomeRegionOffset> = WindowChange::default();
        assert!(change.loaded.is_empty() && change.evicted.is_empty());
    }
}
