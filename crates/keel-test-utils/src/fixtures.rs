//! Reusable solver test fixtures.
//!
//! Three standard solvers for claim-protocol and lifecycle testing:
//!
//! - [`TypeClaimSolver`] — claims objects whose type matches a pattern,
//!   counting claims and deinitializations.
//! - [`RejectingSolver`] — never claims, counting offers.
//! - [`FailingSolver`] — errors out of the claim check for a matching
//!   type, which destroys the object under initialization.

use keel_core::{type_matches, ObjectId};
use keel_kernel::{ClaimOutcome, Solver, SolverError, System};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Claims every object whose type matches a trailing-`*` pattern.
pub struct TypeClaimSolver {
    pub name: String,
    pub pattern: String,
    pub claims: AtomicUsize,
    pub deinits: AtomicUsize,
}

impl TypeClaimSolver {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            claims: AtomicUsize::new(0),
            deinits: AtomicUsize::new(0),
        }
    }

    pub fn claim_count(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }

    pub fn deinit_count(&self) -> usize {
        self.deinits.load(Ordering::SeqCst)
    }
}

impl Solver for TypeClaimSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_initialize(
        &self,
        system: &System,
        object: ObjectId,
    ) -> Result<ClaimOutcome, SolverError> {
        let type_name = system
            .type_name(object)
            .map_err(|e| SolverError::new(e.to_string()))?;
        if type_matches(&self.pattern, &type_name) {
            self.claims.fetch_add(1, Ordering::SeqCst);
            Ok(ClaimOutcome::Claim)
        } else {
            Ok(ClaimOutcome::Ignore)
        }
    }

    fn on_deinitialize(&self, _system: &System, _object: ObjectId) -> Result<(), SolverError> {
        self.deinits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Ignores every object, counting how many were offered.
pub struct RejectingSolver {
    pub offers: AtomicUsize,
}

impl RejectingSolver {
    pub fn new() -> Self {
        Self {
            offers: AtomicUsize::new(0),
        }
    }

    pub fn offer_count(&self) -> usize {
        self.offers.load(Ordering::SeqCst)
    }
}

impl Default for RejectingSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for RejectingSolver {
    fn name(&self) -> &str {
        "rejecting"
    }

    fn on_initialize(
        &self,
        _system: &System,
        _object: ObjectId,
    ) -> Result<ClaimOutcome, SolverError> {
        self.offers.fetch_add(1, Ordering::SeqCst);
        Ok(ClaimOutcome::Ignore)
    }
}

/// Fails the claim check for objects of a matching type.
///
/// Initialization of such an object must destroy it and surface
/// `SolverFailed`.
pub struct FailingSolver {
    pub pattern: String,
}

impl FailingSolver {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl Solver for FailingSolver {
    fn name(&self) -> &str {
        "failing"
    }

    fn on_initialize(
        &self,
        system: &System,
        object: ObjectId,
    ) -> Result<ClaimOutcome, SolverError> {
        let type_name = system
            .type_name(object)
            .map_err(|e| SolverError::new(e.to_string()))?;
        if type_matches(&self.pattern, &type_name) {
            Err(SolverError::new("deterministic failure"))
        } else {
            Ok(ClaimOutcome::Ignore)
        }
    }
}
