//! Frame conversion and tree restructuring.
//!
//! Every entity is a coordinate frame; its state vector places it in
//! its parent's frame. Conversion between two arbitrary frames routes
//! through the root: compose transforms up from the source, then
//! invert the chain down to the target.
//!
//! Frames are treated as static for the duration of a conversion:
//! positions and orientations come from the published states, and
//! directions pick up rotation only (no velocity cross terms).

use crate::system::System;
use crate::KernelResult;
use keel_core::{KernelError, ObjectId};
use keel_math::{FrameQuat, FrameTransform, FrameVector, StateVector};

impl System {
    /// Transform mapping `frame`-local coordinates to root coordinates.
    pub(crate) fn transform_to_root(&self, frame: ObjectId) -> KernelResult<FrameTransform> {
        let mut to_root = FrameTransform::IDENTITY;
        let mut current = frame;
        loop {
            let entity = self.resolve(current)?;
            let Some(parent) = entity.parent() else {
                return Ok(to_root);
            };
            let state = self.published_state(&entity);
            let step = FrameTransform::new(state.position.v, state.orientation.q);
            to_root = step.then(&to_root);
            current = parent;
        }
    }

    /// Re-express a position in `target` coordinates.
    pub fn convert_point(&self, target: ObjectId, p: FrameVector) -> KernelResult<FrameVector> {
        if p.frame == target {
            return Ok(p);
        }
        let from = self.transform_to_root(p.frame)?;
        let to = self.transform_to_root(target)?;
        Ok(FrameVector::new(target, to.unapply_point(from.apply_point(p.v))))
    }

    /// Re-express a free vector (velocity, angular rate) in `target`
    /// coordinates. Rotation only.
    pub fn convert_direction(&self, target: ObjectId, v: FrameVector) -> KernelResult<FrameVector> {
        if v.frame == target {
            return Ok(v);
        }
        let from = self.transform_to_root(v.frame)?;
        let to = self.transform_to_root(target)?;
        Ok(FrameVector::new(
            target,
            to.unapply_direction(from.apply_direction(v.v)),
        ))
    }

    /// Re-express an orientation relative to `target`.
    pub fn convert_quat(&self, target: ObjectId, q: FrameQuat) -> KernelResult<FrameQuat> {
        if q.frame == target {
            return Ok(q);
        }
        let from = self.transform_to_root(q.frame)?;
        let to = self.transform_to_root(target)?;
        let rotated = (to.orientation.conjugate() * from.orientation * q.q).normalized();
        Ok(FrameQuat::new(target, rotated))
    }

    /// Re-express every component of a state vector in `target`
    /// coordinates. Components may start in different frames; each is
    /// converted independently.
    pub fn convert_state(&self, target: ObjectId, state: &StateVector) -> KernelResult<StateVector> {
        Ok(StateVector {
            time: state.time,
            position: self.convert_point(target, state.position)?,
            velocity: self.convert_direction(target, state.velocity)?,
            acceleration: self.convert_direction(target, state.acceleration)?,
            orientation: self.convert_quat(target, state.orientation)?,
            angular_velocity: self.convert_direction(target, state.angular_velocity)?,
            angular_acceleration: self.convert_direction(target, state.angular_acceleration)?,
        })
    }

    /// Move an object under a new parent, preserving its absolute pose:
    /// the state vector is re-expressed in the new parent's frame
    /// before the links change. Fails on the root, on a destroyed
    /// target, and on any reparenting that would create a cycle.
    pub fn set_parent(&self, object: ObjectId, new_parent: ObjectId) -> KernelResult<()> {
        let entity = self.resolve_mutable(object)?;
        let Some(old_parent) = entity.parent() else {
            return Err(KernelError::BadParameter);
        };
        if new_parent == old_parent {
            return Ok(());
        }
        if new_parent == object || self.is_ancestor(object, new_parent)? {
            return Err(KernelError::BadParameter);
        }
        let new_parent_entity = self.resolve_live(new_parent)?;

        // Re-express the pose first, while the old chain is intact.
        let current = *entity.state.read().unwrap();
        let converted = self.convert_state(new_parent, &current)?;

        // Link under the new parent before unlinking from the old one,
        // so a failed destroyed-check leaves the old links intact and
        // the object is never parentless mid-move.
        let new_level = {
            let mut structure = new_parent_entity.structure.lock().unwrap();
            if new_parent_entity.is_destroyed() {
                return Err(KernelError::InvalidObject);
            }
            structure.raw_children.push(object);
            if entity.is_initialized() {
                structure.children.push(object);
            }
            structure.level + 1
        };
        if let Ok(old_entity) = self.resolve(old_parent) {
            let mut structure = old_entity.structure.lock().unwrap();
            structure.raw_children.retain(|id| *id != object);
            structure.children.retain(|id| *id != object);
        }
        {
            let mut structure = entity.structure.lock().unwrap();
            structure.parent = Some(new_parent);
            structure.level = new_level;
        }
        {
            let mut state = entity.state.write().unwrap();
            *entity.previous_state.write().unwrap() = *state;
            *state = converted;
        }
        self.fix_levels(object, new_level);
        self.make_name_unique(&entity);
        Ok(())
    }

    /// Reorder an object within its parent's child lists, clamping the
    /// requested index to the list length.
    pub fn move_in_list(&self, object: ObjectId, index: usize) -> KernelResult<()> {
        let entity = self.resolve_live(object)?;
        let Some(parent) = entity.parent() else {
            return Err(KernelError::BadParameter);
        };
        let parent_entity = self.resolve(parent)?;
        let mut structure = parent_entity.structure.lock().unwrap();
        reposition(&mut structure.raw_children, object, index);
        reposition(&mut structure.children, object, index);
        Ok(())
    }

    /// Whether `ancestor` appears on `node`'s path to the root.
    fn is_ancestor(&self, ancestor: ObjectId, node: ObjectId) -> KernelResult<bool> {
        let mut current = node;
        while let Some(parent) = self.resolve(current)?.parent() {
            if parent == ancestor {
                return Ok(true);
            }
            current = parent;
        }
        Ok(false)
    }

    /// Recompute depth for a reparented subtree.
    fn fix_levels(&self, object: ObjectId, level: u32) {
        let Ok(entity) = self.resolve(object) else {
            return;
        };
        entity.structure.lock().unwrap().level = level;
        for child in entity.raw_children_snapshot() {
            self.fix_levels(child, level + 1);
        }
    }
}

fn reposition(list: &mut smallvec::SmallVec<[ObjectId; 8]>, object: ObjectId, index: usize) {
    if let Some(at) = list.iter().position(|&id| id == object) {
        list.remove(at);
        let index = index.min(list.len());
        list.insert(index, object);
    }
}
