//! Object state vectors and their derivatives.

use crate::{FrameQuat, FrameVector};
use keel_core::ObjectId;

/// The bundle of kinematic quantities describing an object's motion.
///
/// Each component carries the frame it is expressed in; components of
/// one state vector normally share the object's parent frame, but the
/// converter tolerates mixed tags.
///
/// The previous state vector is snapshotted on every write so renderers
/// can interpolate between simulation steps; see
/// [`StateVector::interpolate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateVector {
    /// Simulation time (MJD) at which this state was recorded.
    pub time: f64,
    /// Position of the object's origin.
    pub position: FrameVector,
    /// Linear velocity.
    pub velocity: FrameVector,
    /// Linear acceleration.
    pub acceleration: FrameVector,
    /// Orientation of the object's axes.
    pub orientation: FrameQuat,
    /// Angular velocity.
    pub angular_velocity: FrameVector,
    /// Angular acceleration.
    pub angular_acceleration: FrameVector,
}

impl StateVector {
    /// An identity state (origin, at rest, identity orientation)
    /// expressed in `frame`.
    #[must_use]
    pub fn identity(frame: ObjectId) -> Self {
        Self {
            time: 0.0,
            position: FrameVector::zero(frame),
            velocity: FrameVector::zero(frame),
            acceleration: FrameVector::zero(frame),
            orientation: FrameQuat::identity(frame),
            angular_velocity: FrameVector::zero(frame),
            angular_acceleration: FrameVector::zero(frame),
        }
    }

    /// Interpolate between two states: `prev` at `t = 0`, `self` at
    /// `t = 1`. Positions and rates lerp; orientation slerps. The frame
    /// tags of `self` are kept.
    #[must_use]
    pub fn interpolate(&self, prev: &Self, t: f64) -> Self {
        Self {
            time: prev.time + (self.time - prev.time) * t,
            position: self.position.with_components(prev.position.v.lerp(self.position.v, t)),
            velocity: self.velocity.with_components(prev.velocity.v.lerp(self.velocity.v, t)),
            acceleration: self
                .acceleration
                .with_components(prev.acceleration.v.lerp(self.acceleration.v, t)),
            orientation: FrameQuat::new(
                self.orientation.frame,
                prev.orientation.q.slerp(self.orientation.q, t),
            ),
            angular_velocity: self
                .angular_velocity
                .with_components(prev.angular_velocity.v.lerp(self.angular_velocity.v, t)),
            angular_acceleration: self.angular_acceleration.with_components(
                prev.angular_acceleration
                    .v
                    .lerp(self.angular_acceleration.v, t),
            ),
        }
    }
}

/// Derivative of a state vector, as produced by `integrate`.
///
/// Propagators consume the kinematic terms; parent objects additionally
/// read accumulated `force` and `torque` from children that produce
/// them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateDerivative {
    /// d(position)/dt.
    pub velocity: FrameVector,
    /// d(velocity)/dt.
    pub acceleration: FrameVector,
    /// d(orientation)/dt expressed as an angular rate.
    pub angular_velocity: FrameVector,
    /// d(angular velocity)/dt.
    pub angular_acceleration: FrameVector,
    /// Net force produced by the object, for the parent to consume.
    pub force: FrameVector,
    /// Net torque produced by the object, for the parent to consume.
    pub torque: FrameVector,
}

impl StateDerivative {
    /// A zero derivative expressed in `frame`.
    #[must_use]
    pub fn zero(frame: ObjectId) -> Self {
        Self {
            velocity: FrameVector::zero(frame),
            acceleration: FrameVector::zero(frame),
            angular_velocity: FrameVector::zero(frame),
            angular_acceleration: FrameVector::zero(frame),
            force: FrameVector::zero(frame),
            torque: FrameVector::zero(frame),
        }
    }
}
