//! Error types for the Keel simulation kernel.
//!
//! Every kernel operation returns an explicit result code; there are no
//! panicking paths in non-test code. [`KernelError`] is the uniform
//! taxonomy shared by all sub-crates.

use std::error::Error;
use std::fmt;

/// Uniform error taxonomy for kernel operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// An argument was null-equivalent or out of range
    /// (empty name, negative time step, oversized key).
    BadParameter,
    /// The operation is invalid for the object's current lifecycle
    /// state (double-initialize, structural mutation after initialize).
    BadState,
    /// The object handle is stale or the object was destroyed.
    InvalidObject,
    /// The object was not initialized yet and the operation requires
    /// an active object.
    NotInitialized,
    /// A type check failed (payload kind mismatch on a variable read).
    InvalidType,
    /// A lookup by uid, name, or reference path found nothing.
    NotFound,
    /// A structural mutation was attempted from a thread that is
    /// neither the creating nor the initializing thread of the object.
    InterThreadCall,
    /// A solver callback failed. Carries the solver's name and its
    /// reported reason.
    SolverFailed {
        /// Name of the failing solver, or the callback site.
        name: String,
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadParameter => write!(f, "bad parameter"),
            Self::BadState => write!(f, "operation invalid for current lifecycle state"),
            Self::InvalidObject => write!(f, "object is destroyed or the handle is stale"),
            Self::NotInitialized => write!(f, "object is not initialized"),
            Self::InvalidType => write!(f, "type check failed"),
            Self::NotFound => write!(f, "not found"),
            Self::InterThreadCall => {
                write!(f, "structural mutation attempted from a non-owning thread")
            }
            Self::SolverFailed { name, reason } => {
                write!(f, "solver '{name}' failed: {reason}")
            }
        }
    }
}

impl Error for KernelError {}
