//! Generational slot arena backing the Keel object lifecycle.
//!
//! Objects in Keel are addressed by [`ObjectId`] handles — a slot index
//! plus the generation the slot had when the object was created. The
//! arena owns each object's payload behind an `Arc`; a slot keeps its
//! payload alive through the destroyed-but-not-reclaimed grace period,
//! and reclaiming bumps the slot generation so every outstanding handle
//! goes stale at once.
//!
//! Threads that already cloned the payload `Arc` out of a slot keep a
//! valid (read-only, by kernel convention) view even across reclaim;
//! the memory is freed when the last clone drops. This is the arena
//! half of the "arena of generation-checked slots + tombstone flag"
//! ownership model; the tombstone itself (the `destroyed` flag) lives
//! in the payload because the kernel consults it on every mutation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod slot;

pub use error::ArenaError;
pub use slot::SlotArena;

use keel_core::ObjectId;

/// Convenience result alias for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;

/// Check a handle against a slot generation.
pub(crate) fn check_generation(handle: ObjectId, slot_generation: u32) -> ArenaResult<()> {
    if handle.generation() == slot_generation {
        Ok(())
    } else {
        Err(ArenaError::StaleHandle {
            handle,
            slot_generation,
        })
    }
}
