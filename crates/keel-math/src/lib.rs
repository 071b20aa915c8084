//! Frame-tagged vector math for the Keel simulation kernel.
//!
//! Every kinematic quantity in Keel carries the coordinate frame it is
//! expressed in; this crate provides the plain math ([`Vec3`], [`Quat`]),
//! the frame-tagged wrappers ([`FrameVector`], [`FrameQuat`]), rigid
//! transforms between frames ([`FrameTransform`]), the per-object
//! [`StateVector`] / [`StateDerivative`] bundles, and the triangle-mesh
//! accumulation used to estimate mass properties from geometry.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod frame;
pub mod mesh;
pub mod quat;
pub mod state;
pub mod transform;
pub mod vec3;

pub use frame::{FrameQuat, FrameVector};
pub use mesh::TriMesh;
pub use quat::Quat;
pub use state::{StateDerivative, StateVector};
pub use transform::FrameTransform;
pub use vec3::Vec3;
