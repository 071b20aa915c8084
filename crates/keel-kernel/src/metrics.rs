//! Lifecycle counters for telemetry.
//!
//! The kernel exposes hand-rolled counter structs rather than a logging
//! layer; consumers poll [`System::metrics`](crate::System::metrics)
//! and the per-sweep [`SweepMetrics`] return value.

/// Cumulative lifecycle counters for one system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemMetrics {
    /// Objects created.
    pub created: u64,
    /// Objects successfully destroyed (marked, not yet reclaimed).
    pub destroyed: u64,
    /// Objects physically reclaimed by the cleanup sweep.
    pub reclaimed: u64,
    /// Solver claim checks performed during initialization.
    pub claim_offers: u64,
    /// Objects claimed by a solver.
    pub claims: u64,
    /// Initializations aborted by a solver or callback error.
    pub claim_failures: u64,
    /// Cleanup sweeps executed.
    pub sweeps: u64,
}

/// Result of one cleanup sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepMetrics {
    /// Deferred-list entries examined.
    pub examined: u64,
    /// Entities physically reclaimed.
    pub reclaimed: u64,
    /// Entities left queued (still referenced or still initializing).
    pub retained: u64,
}
