//! Scene host seam.
//!
//! The generator never renders. It asks a [`SceneHost`] to spawn and
//! destroy entities for chunk meshes, placed items and region visuals, and
//! holds on to the returned handles.

use daedalus_shared::{BiomeRegionOffset, ChunkOffset};
use glam::{DQuat, DVec3};

use crate::terrain::ItemDataId;

/// Opaque handle issued by a scene host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub u64);

/// What an entity represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// Terrain mesh of one chunk.
    ChunkMesh(ChunkOffset),
    /// A placed item.
    Item(ItemDataId),
    /// Visual of one biome region.
    BiomeRegion(BiomeRegionOffset),
}

/// Spawns and destroys entities on behalf of the world.
pub trait SceneHost {
    /// Creates an entity at a world position with a rotation.
    fn spawn_entity(&mut self, kind: EntityKind, position: DVec3, rotation: DQuat) -> EntityHandle;

    /// Destroys an entity previously returned by [`Self::spawn_entity`].
    fn destroy_entity(&mut self, handle: EntityHandle);
}

/// Scene host that only counts entities.
#[derive(Debug, Default)]
pub struct NullScene {
    next_handle: u64,
    live: usize,
}

impl NullScene {
    /// Entities spawned and not yet destroyed.
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live
    }
}

impl SceneHost for NullScene {
    fn spawn_entity(&mut self, _kind: EntityKind, _position: DVec3, _rotation: DQuat) -> EntityHandle {
        self.next_handle += 1;
        self.live += 1;
        EntityHandle(self.next_handle)
    }

    fn destroy_entity(&mut self, _handle: EntityHandle) {
        self.live = self.live.saturating_sub(1);
    }
}
