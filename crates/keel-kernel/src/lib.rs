//! Entity lifecycle, solver claim protocol, and system registry for the
//! Keel simulation kernel.
//!
//! The kernel manages a tree of simulation objects. Each object carries
//! a frame-tagged state vector, an insertion-ordered variable store, and
//! optionally a claimed [`Solver`] providing its behavior. The hard part
//! is not the physics but the lifecycle and concurrency model:
//!
//! - objects move through `Created → Initializing → Active → Destroyed →
//!   Reclaimed`, with a bounded grace period in which a destroyed object
//!   is still readable;
//! - structural mutation (variables, name, type, uid) is gated to the
//!   creating or initializing thread by identity comparison, which is
//!   what lets initialization be handed to a worker thread without a
//!   lock;
//! - each object is offered to every registered solver exactly once
//!   during initialization; the first to claim becomes its sole
//!   behavior owner.
//!
//! Objects are addressed by generation-checked [`ObjectId`] handles, so
//! a handle held across destruction and reclamation degrades to an
//! [`KernelError::InvalidObject`] error instead of dangling.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod entity;
pub mod frames;
pub mod lifecycle;
pub mod mass;
pub mod metrics;
pub mod query;
pub mod solver;
pub mod system;
pub mod variable;

pub use config::SystemConfig;
pub use entity::{AttachedData, Claim, IntegrateOverride, SolveOverride};
pub use mass::MASS_EPSILON;
pub use metrics::{SweepMetrics, SystemMetrics};
pub use query::QueryResult;
pub use solver::{ClaimOutcome, PreCheck, Solver, SolverError};
pub use system::{
    Callbacks, MeshProviderFn, PostInitializeFn, PreDeinitializeFn, PreInitializeFn, System,
};
pub use variable::{
    CallbackPayload, DataPayload, TableData, Variable, VariableKind, VariableOwner, VariableValue,
};

pub use keel_core::{type_matches, KernelError, ObjectId, ObjectUid, SolverId};
pub use keel_math::{
    FrameQuat, FrameTransform, FrameVector, Quat, StateDerivative, StateVector, TriMesh, Vec3,
};

/// Convenience result alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
