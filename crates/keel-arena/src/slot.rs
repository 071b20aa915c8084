//! The generational slot arena.

use crate::{check_generation, ArenaError, ArenaResult};
use keel_core::ObjectId;
use std::sync::{Arc, Mutex, RwLock};

/// One arena slot: a generation counter plus the payload, if occupied.
#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    payload: Option<Arc<T>>,
}

/// A thread-safe arena of `Arc`-owned payloads addressed by
/// generation-checked [`ObjectId`] handles.
///
/// Insertion reuses reclaimed slots from a free list; reclaiming a slot
/// bumps its generation, invalidating every handle issued for the
/// previous occupant. Accessors clone the payload `Arc` under a short
/// read lock, so no lock is held while the caller works with the
/// payload.
#[derive(Debug)]
pub struct SlotArena<T> {
    slots: RwLock<Vec<Slot<T>>>,
    free: Mutex<Vec<u32>>,
}

impl<T> SlotArena<T> {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
            free: Mutex::new(Vec::new()),
        }
    }

    /// Insert a payload, returning its handle and the owning `Arc`.
    pub fn insert(&self, payload: T) -> (ObjectId, Arc<T>) {
        let payload = Arc::new(payload);
        let reused = self.free.lock().expect("arena free list poisoned").pop();
        let mut slots = self.slots.write().expect("arena slots poisoned");
        let index = match reused {
            Some(index) => {
                let slot = &mut slots[index as usize];
                debug_assert!(slot.payload.is_none());
                slot.payload = Some(Arc::clone(&payload));
                index
            }
            None => {
                let index = u32::try_from(slots.len()).expect("arena slot count exceeds u32");
                slots.push(Slot {
                    generation: 0,
                    payload: Some(Arc::clone(&payload)),
                });
                index
            }
        };
        let generation = slots[index as usize].generation;
        (ObjectId::from_raw(index, generation), payload)
    }

    /// Resolve a handle to its payload.
    ///
    /// Succeeds for any occupant whose slot has not been reclaimed,
    /// including payloads the kernel has marked destroyed; the
    /// destroyed-but-readable grace period depends on that.
    pub fn get(&self, handle: ObjectId) -> ArenaResult<Arc<T>> {
        let slots = self.slots.read().expect("arena slots poisoned");
        let slot = slots
            .get(handle.index() as usize)
            .ok_or(ArenaError::OutOfBounds { handle })?;
        check_generation(handle, slot.generation)?;
        slot.payload
            .as_ref()
            .map(Arc::clone)
            .ok_or(ArenaError::StaleHandle {
                handle,
                slot_generation: slot.generation,
            })
    }

    /// Whether the handle currently resolves.
    #[must_use]
    pub fn contains(&self, handle: ObjectId) -> bool {
        self.get(handle).is_ok()
    }

    /// Reclaim a slot: remove the payload, bump the generation, and
    /// return the slot to the free list.
    ///
    /// Returns the payload `Arc` so the caller can finish tearing it
    /// down; memory is freed when the last outstanding clone drops.
    pub fn remove(&self, handle: ObjectId) -> ArenaResult<Arc<T>> {
        let mut slots = self.slots.write().expect("arena slots poisoned");
        let slot = slots
            .get_mut(handle.index() as usize)
            .ok_or(ArenaError::OutOfBounds { handle })?;
        check_generation(handle, slot.generation)?;
        let payload = slot.payload.take().ok_or(ArenaError::StaleHandle {
            handle,
            slot_generation: slot.generation,
        })?;
        slot.generation = slot.generation.wrapping_add(1);
        drop(slots);
        self.free
            .lock()
            .expect("arena free list poisoned")
            .push(handle.index());
        Ok(payload)
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .expect("arena slots poisoned")
            .iter()
            .filter(|s| s.payload.is_some())
            .count()
    }

    /// Whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every occupied slot, in index order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ObjectId, Arc<T>)> {
        let slots = self.slots.read().expect("arena slots poisoned");
        slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let payload = slot.payload.as_ref()?;
                Some((
                    ObjectId::from_raw(i as u32, slot.generation),
                    Arc::clone(payload),
                ))
            })
            .collect()
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn insert_get_round_trip() {
        let arena = SlotArena::new();
        let (id, _) = arena.insert("alpha");
        assert_eq!(*arena.get(id).unwrap(), "alpha");
        assert!(arena.contains(id));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn remove_invalidates_handle() {
        let arena = SlotArena::new();
        let (id, _) = arena.insert(1u32);
        arena.remove(id).unwrap();
        assert_eq!(
            arena.get(id),
            Err(ArenaError::StaleHandle {
                handle: id,
                slot_generation: 1,
            })
        );
        assert!(arena.is_empty());
    }

    #[test]
    fn reuse_bumps_generation() {
        let arena = SlotArena::new();
        let (a, _) = arena.insert(1u32);
        arena.remove(a).unwrap();
        let (b, _) = arena.insert(2u32);
        assert_eq!(b.index(), a.index());
        assert_ne!(b.generation(), a.generation());
        assert!(arena.get(a).is_err());
        assert_eq!(*arena.get(b).unwrap(), 2);
    }

    #[test]
    fn payload_survives_remove_through_clone() {
        let arena = SlotArena::new();
        let (id, held) = arena.insert(String::from("grace"));
        let removed = arena.remove(id).unwrap();
        assert_eq!(*held, "grace");
        assert_eq!(*removed, "grace");
    }

    #[test]
    fn out_of_bounds_handle() {
        let arena: SlotArena<u32> = SlotArena::new();
        let bogus = ObjectId::from_raw(99, 0);
        assert_eq!(arena.get(bogus), Err(ArenaError::OutOfBounds { handle: bogus }));
    }

    proptest! {
        /// Insert n payloads, remove a subset; the survivors resolve to
        /// their payloads and the removed handles are all stale.
        #[test]
        fn survivors_resolve(n in 1usize..32, remove_mask in proptest::collection::vec(any::<bool>(), 32)) {
            let arena = SlotArena::new();
            let ids: Vec<_> = (0..n).map(|i| arena.insert(i).0).collect();
            for (i, id) in ids.iter().enumerate() {
                if remove_mask[i] {
                    arena.remove(*id).unwrap();
                }
            }
            for (i, id) in ids.iter().enumerate() {
                if remove_mask[i] {
                    prop_assert!(arena.get(*id).is_err());
                } else {
                    prop_assert_eq!(*arena.get(*id).unwrap(), i);
                }
            }
        }
    }
}
