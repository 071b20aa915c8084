//! Frame-tagged kinematic quantities.
//!
//! A [`FrameVector`] or [`FrameQuat`] is a raw value plus the handle of
//! the coordinate-system object it is expressed in. The kernel's frame
//! converter rewrites the tag when a quantity moves between frames;
//! carrying the tag on every value is what makes a mixed-frame state
//! vector well-defined.

use crate::{Quat, Vec3};
use keel_core::ObjectId;

/// A vector expressed in a specific coordinate frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameVector {
    /// Object whose local frame this vector is expressed in.
    pub frame: ObjectId,
    /// Raw components.
    pub v: Vec3,
}

impl FrameVector {
    /// A zero vector in `frame`.
    #[must_use]
    pub fn zero(frame: ObjectId) -> Self {
        Self {
            frame,
            v: Vec3::ZERO,
        }
    }

    /// Tag a raw vector with `frame`.
    #[must_use]
    pub fn new(frame: ObjectId, v: Vec3) -> Self {
        Self { frame, v }
    }

    /// Replace the components, keeping the frame tag.
    #[must_use]
    pub fn with_components(self, v: Vec3) -> Self {
        Self { v, ..self }
    }
}

/// An orientation expressed relative to a specific coordinate frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameQuat {
    /// Object whose local frame this orientation is relative to.
    pub frame: ObjectId,
    /// Raw rotation.
    pub q: Quat,
}

impl FrameQuat {
    /// The identity orientation in `frame`.
    #[must_use]
    pub fn identity(frame: ObjectId) -> Self {
        Self {
            frame,
            q: Quat::IDENTITY,
        }
    }

    /// Tag a raw quaternion with `frame`.
    #[must_use]
    pub fn new(frame: ObjectId, q: Quat) -> Self {
        Self { frame, q }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_keeps_frame() {
        let f = ObjectId::from_raw(3, 1);
        let v = FrameVector::zero(f);
        assert_eq!(v.frame, f);
        assert_eq!(v.v, Vec3::ZERO);
    }

    #[test]
    fn with_components_keeps_frame() {
        let f = ObjectId::from_raw(0, 0);
        let v = FrameVector::zero(f).with_components(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(v.frame, f);
        assert_eq!(v.v.y, 2.0);
    }
}
