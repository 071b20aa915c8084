//! Strongly-typed identifiers for simulation objects and solvers.

use std::fmt;

/// Generation-checked handle to a simulation object.
///
/// An `ObjectId` is an index into the object arena plus the generation
/// the slot had when the object was created. Resolving a handle after
/// the slot has been reclaimed and reused fails the generation check,
/// so a stale handle degrades to [`KernelError::InvalidObject`] instead
/// of aliasing an unrelated object.
///
/// [`KernelError::InvalidObject`]: crate::KernelError::InvalidObject
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    /// Create a handle from its raw parts.
    ///
    /// Only the arena hands out live handles; constructing one manually
    /// is useful for tests and serialization shims.
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index within the arena.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Arena generation this handle was issued under.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// User-visible unique identifier of a simulation object.
///
/// Assigned automatically from a monotonic counter at creation; may be
/// overridden before the object is initialized. Unlike [`ObjectId`],
/// uids survive serialization and are what cross-object references in
/// loaded documents resolve against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectUid(pub u32);

impl fmt::Display for ObjectUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ObjectUid {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Index of a solver in the system's registration order.
///
/// The registry is append-only, so a `SolverId` stays valid for the
/// lifetime of the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolverId(pub u32);

impl fmt::Display for SolverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SolverId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
