//! Render-distance window of biome region visuals.

use std::collections::HashMap;

use daedalus_shared::BiomeRegionOffset;
use glam::{DQuat, DVec2, DVec3};

use super::data::BiomeId;
use super::loader::BiomeRegionLoader;
use crate::config::BiomeConfig;
use crate::error::BiomeResult;
use crate::scene::{EntityHandle, EntityKind, SceneHost};
use crate::world::WindowChange;

/// Keeps a visual spawned for every complete region within
/// `render_distance` of the tracked position's region.
pub struct BiomeRegionCache {
    config: BiomeConfig,
    loader: BiomeRegionLoader,
    visuals: HashMap<BiomeRegionOffset, EntityHandle>,
    centre: Option<BiomeRegionOffset>,
}

impl BiomeRegionCache {
    /// Wraps a loader.
    #[must_use]
    pub fn new(loader: BiomeRegionLoader) -> Self {
        Self {
            config: loader.config().clone(),
            loader,
            visuals: HashMap::new(),
            centre: None,
        }
    }

    /// Re-centres the window on the region containing `world`. Regions
    /// whose merge is deferred are skipped and retried on the next update.
    ///
    /// # Errors
    ///
    /// Any loader error other than a deferred merge.
    pub fn update_at(
        &mut self,
        world: DVec3,
        scene: &mut dyn SceneHost,
    ) -> BiomeResult<WindowChange<BiomeRegionOffset>> {
        let (centre, _) = self.config.to_region_coordinates(world);
        let radius = i64::from(self.config.render_distance);
        let mut change = WindowChange::default();

        if self.centre != Some(centre) {
            let stale: Vec<BiomeRegionOffset> = self
                .visuals
                .keys()
                .filter(|offset| (**offset - centre).abs().max_element() > radius)
                .copied()
                .collect();
            for offset in stale {
                if let Some(handle) = self.visuals.remove(&offset) {
                    scene.destroy_entity(handle);
                    change.evicted.push(offset);
                }
            }
            self.centre = Some(centre);
        }

        let mut missing = Vec::new();
        for y in -radius..=radius {
            for x in -radius..=radius {
                let offset = centre + BiomeRegionOffset::new(x, y);
                if !self.visuals.contains_key(&offset) {
                    missing.push(offset);
                }
            }
        }
        missing.sort_by_key(|offset| (*offset - centre).length_squared());

        for offset in missing {
            match self.loader.get_biome_region_at(offset) {
                Ok(_) => {
                    self.spawn_visual(offset, scene);
                    change.loaded.push(offset);
                }
                Err(error) if error.is_deferred() => {
                    tracing::warn!("biome region {} not ready: {}", offset, error);
                }
                Err(error) => return Err(error),
            }
        }

        let keep = self.config.render_distance + self.config.fetch_radius + 1;
        self.loader.retain_within(centre, keep);
        if !change.loaded.is_empty() || !change.evicted.is_empty() {
            tracing::info!(
                "biome window centred on {}: {} loaded, {} evicted",
                centre,
                change.loaded.len(),
                change.evicted.len()
            );
        }
        Ok(change)
    }

    fn spawn_visual(&mut self, offset: BiomeRegionOffset, scene: &mut dyn SceneHost) {
        let origin = offset.as_dvec2() * self.config.scale;
        let handle = scene.spawn_entity(
            EntityKind::BiomeRegion(offset),
            DVec3::new(origin.x, origin.y, 0.0),
            DQuat::IDENTITY,
        );
        self.visuals.insert(offset, handle);
    }

    /// Rebuilds the visual of every listed region that is cached. Returns
    /// how many were rebuilt.
    pub fn on_regions_updated(&mut self, offsets: &[BiomeRegionOffset], scene: &mut dyn SceneHost) -> usize {
        let mut refreshed = 0;
        for &offset in offsets {
            if let Some(handle) = self.visuals.remove(&offset) {
                scene.destroy_entity(handle);
                self.spawn_visual(offset, scene);
                refreshed += 1;
            }
        }
        if refreshed > 0 {
            tracing::debug!("refreshed {} biome region visuals", refreshed);
        }
        refreshed
    }

    /// True when `offset` has a live visual.
    #[must_use]
    pub fn contains(&self, offset: BiomeRegionOffset) -> bool {
        self.visuals.contains_key(&offset)
    }

    /// Number of live visuals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    /// True when no visual is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }

    /// The underlying loader.
    #[inline]
    #[must_use]
    pub fn loader(&self) -> &BiomeRegionLoader {
        &self.loader
    }

    /// The underlying loader, mutably.
    #[inline]
    pub fn loader_mut(&mut self) -> &mut BiomeRegionLoader {
        &mut self.loader
    }

    /// Converts a world position into region units.
    #[must_use]
    pub fn to_region_units(&self, world: DVec3) -> DVec2 {
        DVec2::new(world.x, world.y) / self.config.scale
    }

    /// Site nearest to a world position.
    ///
    /// # Errors
    ///
    /// As [`BiomeRegionLoader::find_nearest_biome_id`].
    pub fn find_nearest_biome_id(&mut self, world: DVec3) -> BiomeResult<BiomeId> {
        let point = self.to_region_units(world);
        self.loader.find_nearest_biome_id(point)
    }

    /// Sites of the triangle containing a world position.
    ///
    /// # Errors
    ///
    /// As [`BiomeRegionLoader::find_containing_biome_triangle`].
    pub fn find_containing_biome_triangle(&mut self, world: DVec3) -> BiomeResult<[BiomeId; 3]> {
        let point = self.to_region_units(world);
        self.loader.find_containing_biome_triangle(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::WorldSeed;
    use crate::scene::NullScene;
    use crate::store::NullStore;
    use daedalus_shared::EventBus;

    fn cache() -> BiomeRegionCache {
        let config = BiomeConfig {
            grid_cell_count: 8,
            scale: 1000.0,
            ..BiomeConfig::default()
        };
        let loader = BiomeRegionLoader::new(WorldSeed::new(4), &config, Box::new(NullStore), EventBus::default());
        BiomeRegionCache::new(loader)
    }

    #[test]
    fn test_window_and_eviction() {
        let mut scene = NullScene::default();
        let mut cache = cache();

        let change = cache.update_at(DVec3::new(500.0, 500.0, 0.0), &mut scene).unwrap();
        assert_eq!(change.loaded.len(), 9);
        assert_eq!(change.loaded[0], BiomeRegionOffset::ZERO, "Centre region first");
        assert_eq!(scene.live_count(), 9);

        // Same region: nothing new.
        let change = cache.update_at(DVec3::new(600.0, 400.0, 0.0), &mut scene).unwrap();
        assert!(change.loaded.is_empty() && change.evicted.is_empty());

        let change = cache.update_at(DVec3::new(1500.0, 500.0, 0.0), &mut scene).unwrap();
        assert_eq!(change.evicted.len(), 3);
        assert_eq!(change.loaded.len(), 3);
        assert!(!cache.contains(BiomeRegionOffset::new(-1, 0)));
        assert_eq!(scene.live_count(), 9);
    }

    #[test]
    fn test_updates_refresh_cached_visuals_only() {
        let mut scene = NullScene::default();
        let mut cache = cache();
        cache.update_at(DVec3::new(10.0, 10.0, 0.0), &mut scene).unwrap();

        let refreshed = cache.on_regions_updated(
            &[BiomeRegionOffset::ZERO, BiomeRegionOffset::new(40, 40)],
            &mut scene,
        );
        assert_eq!(refreshed, 1);
        assert_eq!(scene.live_count(), 9, "Destroy and respawn keep the count");
    }

    #[test]
    fn test_world_queries() {
        let mut cache = cache();
        let world = DVec3::new(420.0, 730.0, 0.0);
        let nearest = cache.find_nearest_biome_id(world).unwrap();
        let triangle = cache.find_containing_biome_triangle(world).unwrap();
        assert!(triangle.iter().all(|id| (id.region - nearest.region).abs().max_element() <= 1));
    }
}
