//! Geometry primitives for placement and collision.
//!
//! All boxes live in `f64` space. Chunk-local queries use grid-cell units,
//! so the same types serve terrain cells and placed items.

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};

/// Separation tolerance for box tests. Boxes that merely touch do not
/// intersect.
const SEPARATION_EPSILON: f64 = 1e-9;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: DVec3,
    /// Maximum corner
    pub max: DVec3,
}

impl Aabb {
    /// Creates a box from two corners in any order.
    #[must_use]
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box from its centre and half extents.
    #[must_use]
    pub fn from_center_half_extents(center: DVec3, half_extents: DVec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Centre point.
    #[inline]
    #[must_use]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Half extents along each axis.
    #[inline]
    #[must_use]
    pub fn half_extents(&self) -> DVec3 {
        (self.max - self.min) * 0.5
    }

    /// Returns the box moved by `delta`.
    #[inline]
    #[must_use]
    pub fn translated(&self, delta: DVec3) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Returns the box shrunk by `amount` on every side.
    #[must_use]
    pub fn inset(&self, amount: f64) -> Self {
        Self::new(self.min + DVec3::splat(amount), self.max - DVec3::splat(amount))
    }

    /// Checks whether the point is inside (boundary inclusive).
    #[must_use]
    pub fn contains_point(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Checks overlap with another box. Touching faces do not count.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x - SEPARATION_EPSILON
            && self.max.x > other.min.x + SEPARATION_EPSILON
            && self.min.y < other.max.y - SEPARATION_EPSILON
            && self.max.y > other.min.y + SEPARATION_EPSILON
            && self.min.z < other.max.z - SEPARATION_EPSILON
            && self.max.z > other.min.z + SEPARATION_EPSILON
    }

    /// The 8 corners, bit 0 selects x, bit 1 y, bit 2 z.
    #[must_use]
    pub fn corners(&self) -> [DVec3; 8] {
        let mut out = [DVec3::ZERO; 8];
        for (i, corner) in out.iter_mut().enumerate() {
            *corner = DVec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
        }
        out
    }

    /// Smallest box enclosing all `points`. `None` for an empty slice.
    #[must_use]
    pub fn enclosing(points: &[DVec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut out = Self {
            min: *first,
            max: *first,
        };
        for p in rest {
            out.min = out.min.min(*p);
            out.max = out.max.max(*p);
        }
        Some(out)
    }
}

/// Oriented bounding box.
///
/// Produced by pushing an [`Aabb`] through an affine transform. Intersection
/// uses the separating axis theorem over the 15 candidate axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obb {
    /// Centre point
    pub center: DVec3,
    /// Unit axes (columns of the rotation)
    pub axes: [DVec3; 3],
    /// Half extents along each axis
    pub half_extents: DVec3,
}

impl Obb {
    /// Transforms a local box. Scale in `transform` is folded into the
    /// half extents.
    #[must_use]
    pub fn from_aabb(local: &Aabb, transform: &DMat4) -> Self {
        let center = transform.transform_point3(local.center());
        let half = local.half_extents();
        let mut axes = [DVec3::X, DVec3::Y, DVec3::Z];
        let mut extents = [half.x, half.y, half.z];
        for (axis, extent) in axes.iter_mut().zip(extents.iter_mut()) {
            let mapped = transform.transform_vector3(*axis);
            let length = mapped.length();
            if length > f64::EPSILON {
                *axis = mapped / length;
                *extent *= length;
            }
        }
        Self {
            center,
            axes,
            half_extents: DVec3::from_array(extents),
        }
    }

    /// An axis-aligned box viewed as an oriented one.
    #[must_use]
    pub fn from_axis_aligned(aabb: &Aabb) -> Self {
        Self {
            center: aabb.center(),
            axes: [DVec3::X, DVec3::Y, DVec3::Z],
            half_extents: aabb.half_extents(),
        }
    }

    /// The 8 corners.
    #[must_use]
    pub fn corners(&self) -> [DVec3; 8] {
        let mut out = [DVec3::ZERO; 8];
        for (i, corner) in out.iter_mut().enumerate() {
            let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
            let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
            let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
            *corner = self.center
                + self.axes[0] * (sx * self.half_extents.x)
                + self.axes[1] * (sy * self.half_extents.y)
                + self.axes[2] * (sz * self.half_extents.z);
        }
        out
    }

    /// Smallest axis-aligned box containing this one.
    #[must_use]
    pub fn enclosing_aabb(&self) -> Aabb {
        let reach = self.axes[0].abs() * self.half_extents.x
            + self.axes[1].abs() * self.half_extents.y
            + self.axes[2].abs() * self.half_extents.z;
        Aabb::new(self.center - reach, self.center + reach)
    }

    /// Projected radius of the box onto `axis`.
    #[inline]
    fn radius_along(&self, axis: DVec3) -> f64 {
        self.axes[0].dot(axis).abs() * self.half_extents.x
            + self.axes[1].dot(axis).abs() * self.half_extents.y
            + self.axes[2].dot(axis).abs() * self.half_extents.z
    }

    /// Separating-axis test against another oriented box.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let delta = other.center - self.center;
        let separated = |axis: DVec3| {
            let length_sq = axis.length_squared();
            if length_sq < 1e-12 {
                // Parallel edge pair; covered by the face axes.
                return false;
            }
            let axis = axis / length_sq.sqrt();
            delta.dot(axis).abs()
                >= self.radius_along(axis) + other.radius_along(axis) - SEPARATION_EPSILON
        };

        for axis in self.axes.iter().chain(other.axes.iter()) {
            if separated(*axis) {
                return false;
            }
        }
        for a in &self.axes {
            for b in &other.axes {
                if separated(a.cross(*b)) {
                    return false;
                }
            }
        }
        true
    }

    /// Separating-axis test against an axis-aligned box.
    #[must_use]
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.intersects(&Self::from_axis_aligned(aabb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DQuat;

    fn unit_box() -> Aabb {
        Aabb::new(DVec3::ZERO, DVec3::ONE)
    }

    #[test]
    fn test_aabb_touching_is_not_intersecting() {
        let a = unit_box();
        let b = a.translated(DVec3::X);
        assert!(!a.intersects(&b), "Shared face should not count as overlap");
        assert!(a.intersects(&a.translated(DVec3::splat(0.5))));
    }

    #[test]
    fn test_aabb_enclosing_points() {
        let points = [DVec3::new(1.0, -2.0, 0.5), DVec3::new(-1.0, 3.0, 0.0)];
        let aabb = Aabb::enclosing(&points).unwrap();
        assert_eq!(aabb.min, DVec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, DVec3::new(1.0, 3.0, 0.5));
        assert!(Aabb::enclosing(&[]).is_none());
    }

    #[test]
    fn test_obb_identity_matches_aabb() {
        let aabb = Aabb::new(DVec3::new(1.0, 1.0, 1.0), DVec3::new(3.0, 2.0, 5.0));
        let obb = Obb::from_aabb(&aabb, &DMat4::IDENTITY);
        let back = obb.enclosing_aabb();
        assert!((back.min - aabb.min).length() < 1e-12);
        assert!((back.max - aabb.max).length() < 1e-12);
    }

    #[test]
    fn test_rotated_obb_separation() {
        // A long thin bar rotated 45 degrees about z clears a box placed
        // off its diagonal, although their enclosing AABBs overlap.
        let bar = Aabb::new(DVec3::new(-2.0, -0.1, -0.1), DVec3::new(2.0, 0.1, 0.1));
        let rotation = DMat4::from_quat(DQuat::from_rotation_z(std::f64::consts::FRAC_PI_4));
        let obb = Obb::from_aabb(&bar, &rotation);
        let off_diagonal = Aabb::new(DVec3::new(0.8, -1.2, -0.5), DVec3::new(1.2, -0.8, 0.5));

        assert!(obb.enclosing_aabb().intersects(&off_diagonal));
        assert!(!obb.intersects_aabb(&off_diagonal), "SAT should find the gap");

        let on_diagonal = Aabb::new(DVec3::new(0.8, 0.8, -0.5), DVec3::new(1.2, 1.2, 0.5));
        assert!(obb.intersects_aabb(&on_diagonal));
    }
}
