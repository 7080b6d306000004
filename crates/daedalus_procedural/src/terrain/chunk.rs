//! # Chunks
//!
//! A [`Chunk`] is the live form of one chunk: its 3x3x3 data window, mesh,
//! solid cache and placed items. All queries take chunk-local positions in
//! grid-cell units.
//!
//! ## Solidity
//!
//! Cell solidity is resolved through the window. The centre chunk answers
//! from its solid cache; neighbours answer from their own density fields.
//! Anything outside the window is solid.

use std::collections::HashMap;
use std::sync::Arc;

use daedalus_shared::{Aabb, ChunkOffset};
use glam::{DQuat, DVec3, I64Vec3};

use super::coords::{split_cell, ChunkPosition};
use super::density::SolidCache;
use super::item::{ItemData, ItemDataId};
use super::loader::{ChunkData, ChunkDataSet};
use super::mesher::{ChunkMesh, ChunkMesher};
use super::raytrace::{RaytraceHit, VoxelRaytracer};
use crate::scene::{EntityHandle, EntityKind, SceneHost};

/// A materialized chunk.
pub struct Chunk {
    window: ChunkDataSet,
    grid_cell_count: u32,
    cell_size: f64,
    items: Vec<ItemData>,
    /// Next id handed to an item placed without a preserved id.
    next_item_id: u64,
    solid: SolidCache,
    mesh: ChunkMesh,
    mesh_entity: Option<EntityHandle>,
    item_entities: HashMap<u64, EntityHandle>,
    /// Items placed or removed since the chunk was built.
    modified: bool,
}

impl Chunk {
    /// Meshes the centre of `window` and adopts its saved items.
    #[must_use]
    pub fn new(window: ChunkDataSet, mesher: &ChunkMesher, chunk_scale: f64) -> Self {
        let (mesh, solid) = mesher.mesh(&window);
        let centre = window.centre();
        let grid_cell_count = centre.density.grid_cell_count();
        let items = centre.items.clone();
        let next_item_id = items.iter().map(|item| item.id + 1).max().unwrap_or(0);

        Self {
            window,
            grid_cell_count,
            cell_size: chunk_scale / f64::from(grid_cell_count),
            items,
            next_item_id,
            solid,
            mesh,
            mesh_entity: None,
            item_entities: HashMap::new(),
            modified: false,
        }
    }

    /// Chunk offset.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> ChunkOffset {
        self.window.centre().offset
    }

    /// Cells per edge (N).
    #[inline]
    #[must_use]
    pub const fn grid_cell_count(&self) -> u32 {
        self.grid_cell_count
    }

    /// World units per grid cell.
    #[inline]
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// The data window the chunk was built from.
    #[inline]
    #[must_use]
    pub fn window(&self) -> &ChunkDataSet {
        &self.window
    }

    /// Terrain mesh.
    #[inline]
    #[must_use]
    pub fn mesh(&self) -> &ChunkMesh {
        &self.mesh
    }

    /// Per-cell solidity of this chunk.
    #[inline]
    #[must_use]
    pub fn solid_cache(&self) -> &SolidCache {
        &self.solid
    }

    /// Swaps in a newer copy of one chunk in the window, so neighbour
    /// item queries see placements made through other chunks. Density is
    /// never changed by placement, so the mesh stays valid.
    pub fn refresh_window(&mut self, data: &Arc<ChunkData>) -> bool {
        self.window.replace(Arc::clone(data))
    }

    /// True once an item was placed or removed here.
    #[inline]
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    /// Placed items.
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[ItemData] {
        &self.items
    }

    /// Item by id.
    #[must_use]
    pub fn item(&self, id: u64) -> Option<&ItemData> {
        self.items.iter().find(|item| item.id == id)
    }

    /// World position of the chunk origin.
    #[must_use]
    pub fn world_origin(&self) -> DVec3 {
        ChunkPosition::new(self.offset(), DVec3::ZERO).to_world(self.grid_cell_count, self.cell_size)
    }

    /// Spawns the mesh and every item with the scene host.
    pub fn spawn(&mut self, scene: &mut dyn SceneHost) {
        if self.mesh_entity.is_none() {
            let handle = scene.spawn_entity(
                EntityKind::ChunkMesh(self.offset()),
                self.world_origin(),
                DQuat::IDENTITY,
            );
            self.mesh_entity = Some(handle);
        }
        for index in 0..self.items.len() {
            if !self.item_entities.contains_key(&self.items[index].id) {
                self.spawn_item(index, scene);
            }
        }
    }

    /// Destroys every entity this chunk spawned.
    pub fn despawn(&mut self, scene: &mut dyn SceneHost) {
        if let Some(handle) = self.mesh_entity.take() {
            scene.destroy_entity(handle);
        }
        for (_, handle) in self.item_entities.drain() {
            scene.destroy_entity(handle);
        }
    }

    fn spawn_item(&mut self, index: usize, scene: &mut dyn SceneHost) {
        let item = &self.items[index];
        let position = item.position.to_world(self.grid_cell_count, self.cell_size);
        let rotation = item.rotation.to_quat(item.template.rotation_interval);
        let handle = scene.spawn_entity(EntityKind::Item(item.data_id()), position, rotation);
        self.item_entities.insert(item.id, handle);
    }

    /// Solidity of a cell given in this chunk's lattice, which may lie in a
    /// neighbour.
    fn is_cell_solid(&self, cell: I64Vec3) -> bool {
        let n = self.grid_cell_count;
        let (step, local) = split_cell(cell, n);
        if step == I64Vec3::ZERO {
            return self.solid.is_solid(local.x as u32, local.y as u32, local.z as u32);
        }
        match self.window.at(step + I64Vec3::ONE) {
            Some(chunk) => chunk.density.is_local_cell_solid(local),
            None => true,
        }
    }

    /// Whether any of the eight cells `floor(point) + {0,1}^3` is solid.
    #[must_use]
    pub fn is_solid_terrain_at_point(&self, point: DVec3) -> bool {
        let base = point.floor().as_i64vec3();
        for dz in 0..2 {
            for dy in 0..2 {
                for dx in 0..2 {
                    if self.is_cell_solid(base + I64Vec3::new(dx, dy, dz)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Whether any cell in `[floor(min), ceil(max))` is solid.
    #[must_use]
    pub fn is_solid_terrain_in(&self, aabb: &Aabb) -> bool {
        let lo = aabb.min.floor().as_i64vec3();
        // A degenerate box still covers the cell it sits in.
        let hi = aabb.max.ceil().as_i64vec3().max(lo + I64Vec3::ONE);
        for z in lo.z..hi.z {
            for y in lo.y..hi.y {
                for x in lo.x..hi.x {
                    if self.is_cell_solid(I64Vec3::new(x, y, z)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// First placed item whose oriented bounds intersect `aabb`. Own items
    /// are checked before the neighbours' items as of the last window
    /// refresh.
    #[must_use]
    pub fn find_item_collision(&self, aabb: &Aabb) -> Option<ItemDataId> {
        if let Some(item) = self
            .items
            .iter()
            .find(|item| item.oriented_bounds().intersects_aabb(aabb))
        {
            return Some(ItemDataId {
                id: item.id,
                chunk: self.offset(),
            });
        }

        let n = f64::from(self.grid_cell_count);
        for (index, chunk) in self.window.neighbours() {
            let shift = (index - I64Vec3::ONE).as_dvec3() * n;
            let local = aabb.translated(-shift);
            if let Some(item) = chunk
                .items
                .iter()
                .find(|item| item.oriented_bounds().intersects_aabb(&local))
            {
                return Some(ItemDataId {
                    id: item.id,
                    chunk: chunk.offset,
                });
            }
        }
        None
    }

    /// Terrain or item collision.
    #[must_use]
    pub fn is_space_occupied(&self, aabb: &Aabb) -> bool {
        self.is_solid_terrain_in(aabb) || self.find_item_collision(aabb).is_some()
    }

    /// Places `item` in this chunk.
    ///
    /// Returns `None` when the item's enclosing box is occupied, or when
    /// `preserve_id` is set and the id is already taken. Otherwise assigns
    /// an id (unless preserved), marks the item placed and spawns it.
    pub fn create_item(
        &mut self,
        mut item: ItemData,
        preserve_id: bool,
        scene: &mut dyn SceneHost,
    ) -> Option<ItemDataId> {
        let offset = self.offset();
        if item.position.offset != offset {
            let shift = (item.position.offset - offset).as_dvec3() * f64::from(self.grid_cell_count);
            item.position = ChunkPosition::new(offset, item.position.local + shift);
        }

        if preserve_id && self.item(item.id).is_some() {
            tracing::warn!("item id {} already present in chunk {}", item.id, offset);
            return None;
        }

        let bounds = item.enclosing_bounds();
        if self.is_space_occupied(&bounds) {
            tracing::warn!("placement rejected in chunk {}: space occupied", offset);
            return None;
        }

        if preserve_id {
            self.next_item_id = self.next_item_id.max(item.id + 1);
        } else {
            item.id = self.next_item_id;
            self.next_item_id += 1;
        }
        item.is_placed = true;

        let id = item.data_id();
        self.items.push(item);
        self.modified = true;
        self.spawn_item(self.items.len() - 1, scene);
        Some(id)
    }

    /// Removes an item and destroys its entity.
    pub fn remove_item(&mut self, id: u64, scene: &mut dyn SceneHost) -> Option<ItemData> {
        let index = self.items.iter().position(|item| item.id == id)?;
        if let Some(handle) = self.item_entities.remove(&id) {
            scene.destroy_entity(handle);
        }
        self.modified = true;
        Some(self.items.remove(index))
    }

    /// Casts a ray through this chunk. `origin` is chunk-local in grid
    /// cells; `max_distance` is in world units.
    #[must_use]
    pub fn raytrace(&self, origin: DVec3, direction: DVec3, max_distance: f64) -> Option<RaytraceHit> {
        VoxelRaytracer::new(self.grid_cell_count, self.cell_size).trace(self, origin, direction, max_distance)
    }

    /// Snapshot for persistence.
    #[must_use]
    pub fn to_chunk_data(&self) -> ChunkData {
        let centre = self.window.centre();
        ChunkData {
            offset: centre.offset,
            density: centre.density.clone(),
            items: self.items.clone(),
        }
    }
}
