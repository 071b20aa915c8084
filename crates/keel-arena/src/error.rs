//! Arena-specific error types.

use keel_core::ObjectId;
use std::error::Error;
use std::fmt;

/// Errors that can occur during slot arena operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// A handle whose generation does not match its slot — the object
    /// was reclaimed (and the slot possibly reused) after the handle
    /// was obtained.
    StaleHandle {
        /// The offending handle.
        handle: ObjectId,
        /// The slot's current generation.
        slot_generation: u32,
    },
    /// A handle whose index lies outside the arena.
    OutOfBounds {
        /// The offending handle.
        handle: ObjectId,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleHandle {
                handle,
                slot_generation,
            } => write!(
                f,
                "stale handle {handle}: slot is at generation {slot_generation}"
            ),
            Self::OutOfBounds { handle } => {
                write!(f, "handle {handle} is outside the arena")
            }
        }
    }
}

impl Error for ArenaError {}
