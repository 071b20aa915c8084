//! Rigid transforms between coordinate frames.

use crate::{Quat, Vec3};

/// A rigid transform mapping child-frame coordinates into the parent
/// frame: `parent = orientation * child + position`.
///
/// An object's transform is read off its state vector (position and
/// orientation in the parent frame); chains of these compose up to the
/// root to convert between arbitrary frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTransform {
    /// Origin of the child frame, in parent coordinates.
    pub position: Vec3,
    /// Rotation from child axes to parent axes.
    pub orientation: Quat,
}

impl FrameTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// Construct from a position and orientation.
    #[must_use]
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Map a point from child coordinates to parent coordinates.
    #[must_use]
    pub fn apply_point(&self, p: Vec3) -> Vec3 {
        self.orientation.rotate(p) + self.position
    }

    /// Map a free vector (velocity, angular rate) child → parent.
    /// Rotation only; the translation does not apply.
    #[must_use]
    pub fn apply_direction(&self, v: Vec3) -> Vec3 {
        self.orientation.rotate(v)
    }

    /// Map a point from parent coordinates back into child coordinates.
    #[must_use]
    pub fn unapply_point(&self, p: Vec3) -> Vec3 {
        self.orientation.conjugate().rotate(p - self.position)
    }

    /// Map a free vector parent → child.
    #[must_use]
    pub fn unapply_direction(&self, v: Vec3) -> Vec3 {
        self.orientation.conjugate().rotate(v)
    }

    /// Compose: the transform that first applies `inner`, then `self`.
    ///
    /// If `self` maps frame B → A and `inner` maps C → B, the result
    /// maps C → A.
    #[must_use]
    pub fn then(&self, inner: &Self) -> Self {
        Self {
            position: self.apply_point(inner.position),
            orientation: (self.orientation * inner.orientation).normalized(),
        }
    }
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
