//! # Placed Items
//!
//! Items live in chunk-local grid units. Rotation is quantized: a template
//! declares how many notches make a full turn, and an item stores its yaw
//! (about z) and pitch (about x) in notches. Both rotate about the
//! template's pivot.

use std::sync::Arc;

use daedalus_shared::{Aabb, ChunkOffset, Obb};
use glam::{DMat4, DQuat, DVec3};

use super::coords::ChunkPosition;

/// Quantized rotation in notches of `360 / interval` degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ItemRotation {
    /// Notches about the vertical (z) axis.
    pub yaw: u8,
    /// Notches about the x axis.
    pub pitch: u8,
}

impl ItemRotation {
    /// Creates a rotation.
    #[inline]
    #[must_use]
    pub const fn new(yaw: u8, pitch: u8) -> Self {
        Self { yaw, pitch }
    }

    /// Wraps both components into `[0, interval)`.
    #[must_use]
    pub const fn bound(self, interval: u8) -> Self {
        let interval = if interval == 0 { 1 } else { interval };
        Self {
            yaw: self.yaw % interval,
            pitch: self.pitch % interval,
        }
    }

    /// The rotation as a quaternion, yaw applied after pitch.
    #[must_use]
    pub fn to_quat(self, interval: u8) -> DQuat {
        let step = std::f64::consts::TAU / f64::from(interval.max(1));
        DQuat::from_rotation_z(step * f64::from(self.yaw))
            * DQuat::from_rotation_x(step * f64::from(self.pitch))
    }
}

/// Static description shared by every item of one type.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemTemplate {
    /// Type identifier.
    pub item_type: u32,
    /// Bounds in item-local grid units.
    pub bounds: Aabb,
    /// Rotation pivot in item-local grid units.
    pub pivot: DVec3,
    /// Notches per full turn. Zero is treated as one.
    pub rotation_interval: u8,
}

/// Stable global address of a placed item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemDataId {
    /// Id, unique within the chunk.
    pub id: u64,
    /// Chunk that owns the item.
    pub chunk: ChunkOffset,
}

/// An item instance, placed or about to be.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemData {
    /// Id within the owning chunk. Assigned on placement unless preserved.
    pub id: u64,
    /// Shared template.
    pub template: Arc<ItemTemplate>,
    /// Quantized rotation.
    pub rotation: ItemRotation,
    /// Position of the item origin.
    pub position: ChunkPosition,
    /// Set once a chunk accepted the item.
    pub is_placed: bool,
}

impl ItemData {
    /// An unplaced item.
    #[must_use]
    pub fn new(template: Arc<ItemTemplate>, rotation: ItemRotation, position: ChunkPosition) -> Self {
        Self {
            id: 0,
            template,
            rotation,
            position,
            is_placed: false,
        }
    }

    /// Rotation about the template pivot.
    #[must_use]
    pub fn rotation_matrix(&self) -> DMat4 {
        let pivot = self.template.pivot;
        DMat4::from_translation(pivot)
            * DMat4::from_quat(self.rotation.to_quat(self.template.rotation_interval))
            * DMat4::from_translation(-pivot)
    }

    /// Item-local to chunk-local transform.
    #[must_use]
    pub fn transform(&self) -> DMat4 {
        DMat4::from_translation(self.position.local) * self.rotation_matrix()
    }

    /// Oriented bounds in chunk-local grid units.
    #[must_use]
    pub fn oriented_bounds(&self) -> Obb {
        Obb::from_aabb(&self.template.bounds, &self.transform())
    }

    /// Axis-aligned box enclosing [`Self::oriented_bounds`].
    #[must_use]
    pub fn enclosing_bounds(&self) -> Aabb {
        self.oriented_bounds().enclosing_aabb()
    }

    /// Address of the item once placed.
    #[must_use]
    pub fn data_id(&self) -> ItemDataId {
        ItemDataId {
            id: self.id,
            chunk: self.position.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crate_template() -> Arc<ItemTemplate> {
        Arc::new(ItemTemplate {
            item_type: 7,
            bounds: Aabb::new(DVec3::ZERO, DVec3::new(2.0, 1.0, 1.0)),
            pivot: DVec3::new(0.5, 0.5, 0.0),
            rotation_interval: 4,
        })
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(ItemRotation::new(5, 9).bound(4), ItemRotation::new(1, 1));
        assert_eq!(ItemRotation::new(3, 250).bound(4), ItemRotation::new(3, 2));
        // A zero interval must not divide by zero.
        assert_eq!(ItemRotation::new(3, 3).bound(0), ItemRotation::new(0, 0));
    }

    #[test]
    fn test_quarter_turn_about_pivot() {
        let item = ItemData::new(
            crate_template(),
            ItemRotation::new(1, 0),
            ChunkPosition::new(ChunkOffset::ZERO, DVec3::new(4.0, 4.0, 0.0)),
        );
        let bounds = item.enclosing_bounds();
        // 2x1 footprint turned 90 degrees about (0.5, 0.5) becomes 1x2.
        assert!((bounds.min - DVec3::new(4.0, 4.0, 0.0)).length() < 1e-9, "{bounds:?}");
        assert!((bounds.max - DVec3::new(5.0, 6.0, 1.0)).length() < 1e-9, "{bounds:?}");
    }

    #[test]
    fn test_unrotated_bounds_follow_position() {
        let item = ItemData::new(
            crate_template(),
            ItemRotation::default(),
            ChunkPosition::new(ChunkOffset::new(1, 2, 3), DVec3::new(1.0, 2.0, 3.0)),
        );
        let bounds = item.enclosing_bounds();
        assert!((bounds.min - DVec3::new(1.0, 2.0, 3.0)).length() < 1e-9);
        assert!((bounds.max - DVec3::new(3.0, 3.0, 4.0)).length() < 1e-9);
        assert_eq!(item.data_id().chunk, ChunkOffset::new(1, 2, 3));
    }
}
