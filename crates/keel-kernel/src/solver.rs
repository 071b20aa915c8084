//! The [`Solver`] trait and claim protocol types.
//!
//! Solvers are behavior providers registered with a [`System`]. During
//! object initialization the kernel offers the object to every solver in
//! registration order; the first to return [`ClaimOutcome::Claim`]
//! becomes the sole behavior owner and all subsequent `solve`/`integrate`
//! dispatch goes through it (unless overridden per object).

use crate::System;
use keel_core::ObjectId;
use keel_math::{StateDerivative, StateVector};
use std::error::Error;
use std::fmt;

/// Outcome of a solver's claim check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The solver takes exclusive behavioral ownership of the object.
    /// Scanning stops; no later solver is consulted.
    Claim,
    /// The solver is not interested; the next registered solver is
    /// offered the object.
    Ignore,
}

/// Outcome of the system-wide pre-check callback consulted before each
/// solver's own claim check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreCheck {
    /// Proceed to the solver's own claim check.
    Consult,
    /// Skip this solver without consulting it.
    Skip,
    /// Claim the object for this solver without consulting it.
    Claim,
}

/// Error reported by a solver callback.
///
/// A `SolverError` returned from the claim check destroys the
/// partially-initialized object and aborts its initialization — claim
/// rejection must be signalled with [`ClaimOutcome::Ignore`] instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverError {
    /// Human-readable description of the failure.
    pub reason: String,
}

impl SolverError {
    /// Construct from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl Error for SolverError {}

/// A behavior provider for simulation objects.
///
/// All callbacks are optional except the claim check; defaults are
/// no-ops. The `provides_*` capability flags replace the null callback
/// pointers of a C-style descriptor: the kernel only dispatches
/// `on_solve`/`on_integrate` to solvers that declare them, and falls
/// back to the default behavior otherwise.
///
/// # Object safety
///
/// The trait is object-safe; the system stores solvers as
/// `Arc<dyn Solver>` in an append-only registry.
///
/// # Examples
///
/// A minimal solver claiming every object of type `"ballast"`:
///
/// ```
/// use keel_kernel::{ClaimOutcome, Solver, SolverError, System};
/// use keel_kernel::type_matches;
/// use keel_core::ObjectId;
///
/// struct Ballast;
///
/// impl Solver for Ballast {
///     fn name(&self) -> &str { "ballast" }
///
///     fn on_initialize(
///         &self,
///         system: &System,
///         object: ObjectId,
///     ) -> Result<ClaimOutcome, SolverError> {
///         let ty = system.type_name(object).map_err(|e| SolverError::new(e.to_string()))?;
///         if type_matches("ballast*", &ty) {
///             Ok(ClaimOutcome::Claim)
///         } else {
///             Ok(ClaimOutcome::Ignore)
///         }
///     }
/// }
///
/// let system = System::new(keel_kernel::SystemConfig::default()).unwrap();
/// system.register_solver(std::sync::Arc::new(Ballast)).unwrap();
/// ```
pub trait Solver: Send + Sync + 'static {
    /// Human-readable name for error reporting and metrics.
    fn name(&self) -> &str;

    /// Called once when the solver is registered with a system.
    fn on_startup(&self, system: &System) -> Result<(), SolverError> {
        let _ = system;
        Ok(())
    }

    /// Called once during system shutdown.
    fn on_shutdown(&self, system: &System) -> Result<(), SolverError> {
        let _ = system;
        Ok(())
    }

    /// Claim check, run during object initialization.
    ///
    /// May inspect the object, add variables (the calling thread is the
    /// initializing thread, so structural mutation is still permitted),
    /// and attach solver-private data before claiming.
    fn on_initialize(
        &self,
        system: &System,
        object: ObjectId,
    ) -> Result<ClaimOutcome, SolverError>;

    /// Called while a claimed object is being destroyed.
    fn on_deinitialize(&self, system: &System, object: ObjectId) -> Result<(), SolverError> {
        let _ = (system, object);
        Ok(())
    }

    /// Whether this solver implements [`Solver::on_solve`].
    fn provides_solve(&self) -> bool {
        false
    }

    /// Advance the object's internal state by `dt`.
    ///
    /// Only dispatched when [`Solver::provides_solve`] is true;
    /// otherwise the kernel recursively solves the object's active
    /// children.
    fn on_solve(&self, system: &System, object: ObjectId, dt: f64) -> Result<(), SolverError> {
        let _ = (system, object, dt);
        Ok(())
    }

    /// Whether this solver implements [`Solver::on_integrate`].
    fn provides_integrate(&self) -> bool {
        false
    }

    /// Compute the state-vector derivative for a propagator step.
    ///
    /// Only dispatched when [`Solver::provides_integrate`] is true;
    /// otherwise the kernel passes the object's current kinematic terms
    /// through as the derivative.
    fn on_integrate(
        &self,
        system: &System,
        object: ObjectId,
        dt: f64,
        state: &StateVector,
    ) -> Result<StateDerivative, SolverError> {
        let _ = (system, dt, state);
        let _ = object;
        Err(SolverError::new("integrate not implemented"))
    }

    /// Persistence hook: record solver-private state for `object`.
    fn on_state_save(&self, system: &System, object: ObjectId) -> Result<(), SolverError> {
        let _ = (system, object);
        Ok(())
    }

    /// Persistence hook: restore solver-private state for `object`.
    fn on_state_load(&self, system: &System, object: ObjectId) -> Result<(), SolverError> {
        let _ = (system, object);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;

    impl Solver for Inert {
        fn name(&self) -> &str {
            "inert"
        }

        fn on_initialize(
            &self,
            _system: &System,
            _object: ObjectId,
        ) -> Result<ClaimOutcome, SolverError> {
            Ok(ClaimOutcome::Ignore)
        }
    }

    #[test]
    fn defaults_are_noops() {
        let s = Inert;
        assert!(!s.provides_solve());
        assert!(!s.provides_integrate());
        assert_eq!(s.name(), "inert");
    }

    #[test]
    fn solver_error_display() {
        assert_eq!(SolverError::new("boom").to_string(), "boom");
    }
}
