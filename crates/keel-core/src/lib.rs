//! Core identifiers and error types for the Keel simulation kernel.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the handle and uid types used to address simulation objects, the
//! kernel-wide error taxonomy, and the type-pattern matcher used by
//! solvers to recognize object types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod pattern;

pub use error::KernelError;
pub use id::{ObjectId, ObjectUid, SolverId};
pub use pattern::type_matches;
