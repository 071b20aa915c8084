//! Keel: a simulation object kernel.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Keel sub-crates. For most users, adding `keel` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use keel::prelude::*;
//! use std::sync::Arc;
//!
//! // A solver that claims every object typed "tank*".
//! struct TankSolver;
//! impl Solver for TankSolver {
//!     fn name(&self) -> &str { "tank" }
//!     fn on_initialize(
//!         &self,
//!         system: &System,
//!         object: ObjectId,
//!     ) -> Result<ClaimOutcome, SolverError> {
//!         let ty = system.type_name(object).map_err(|e| SolverError::new(e.to_string()))?;
//!         if keel::types::type_matches("tank*", &ty) {
//!             Ok(ClaimOutcome::Claim)
//!         } else {
//!             Ok(ClaimOutcome::Ignore)
//!         }
//!     }
//! }
//!
//! let system = System::new(SystemConfig::default()).unwrap();
//! system.register_solver(Arc::new(TankSolver)).unwrap();
//!
//! let vessel = system.create(system.root()).unwrap();
//! system.set_name(vessel, "vessel").unwrap();
//! let tank = system.create(vessel).unwrap();
//! system.set_name(tank, "fuel_tank").unwrap();
//! system.set_type(tank, "tank.fuel").unwrap();
//! system.add_real_variable(tank, "mass", 250.0).unwrap();
//!
//! system.initialize(vessel).unwrap();
//! assert!(matches!(system.claim(tank).unwrap(), Claim::ClaimedBy(_)));
//!
//! // Objects and variables share one path syntax.
//! match system.query_by_reference("/vessel/fuel_tank/mass").unwrap() {
//!     QueryResult::Variable(mass) => assert_eq!(mass.as_real().unwrap(), 250.0),
//!     QueryResult::Object(_) => unreachable!(),
//! }
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `keel-core` | Handles, uids, error types, type patterns |
//! | [`math`] | `keel-math` | Vectors, quaternions, frame-tagged state, transforms, mesh math |
//! | [`arena`] | `keel-arena` | Generational slot arena backing object storage |
//! | [`kernel`] | `keel-kernel` | The [`kernel::System`]: lifecycle, solvers, variables, queries |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Handles, uids, and error types (`keel-core`).
///
/// [`types::ObjectId`] is the generation-checked handle every kernel
/// operation takes; [`types::KernelError`] is the shared error enum.
pub use keel_core as types;

/// Math primitives (`keel-math`).
///
/// Frame-tagged vectors and quaternions, [`math::StateVector`] and its
/// derivative, rigid [`math::FrameTransform`]s, and triangle-mesh mass
/// math.
pub use keel_math as math;

/// Generational slot arena (`keel-arena`).
///
/// The storage behind object handles; exposed for reuse, but kernel
/// users never touch it directly.
pub use keel_arena as arena;

/// The simulation kernel (`keel-kernel`).
///
/// [`kernel::System`] owns the object tree, the solver registry, and
/// every lifecycle operation.
pub use keel_kernel as kernel;

/// Common imports for typical Keel usage.
///
/// ```rust
/// use keel::prelude::*;
/// ```
///
/// This imports the system itself, its configuration, the solver
/// trait, and the handle/state types nearly every caller needs.
pub mod prelude {
    // Handles and errors
    pub use keel_core::{KernelError, ObjectId, ObjectUid, SolverId};

    // Math
    pub use keel_math::{
        FrameQuat, FrameVector, Quat, StateDerivative, StateVector, Vec3,
    };

    // Kernel
    pub use keel_kernel::{
        Claim, ClaimOutcome, PreCheck, QueryResult, Solver, SolverError, System, SystemConfig,
        Variable, VariableKind,
    };
}
