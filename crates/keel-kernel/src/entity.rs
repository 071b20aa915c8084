//! The entity: one node of the simulation tree.
//!
//! `Entity` is the arena slot payload. It is crate-internal; the public
//! API addresses entities through [`ObjectId`] handles on
//! [`System`](crate::System) methods. Locks are per concern — state
//! vector, previous state, name, type, structure — so readers of one
//! never contend with writers of another.

use crate::solver::SolverError;
use crate::variable::Variable;
use indexmap::IndexMap;
use keel_core::{ObjectId, ObjectUid, SolverId};
use keel_math::{StateDerivative, StateVector};
use smallvec::SmallVec;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::thread::{self, ThreadId};

/// Longest accepted object name, in bytes.
pub const MAX_OBJECT_NAME_LEN: usize = 256;

/// Which solver, if any, owns an entity's behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Claim {
    /// No solver claimed the entity; `solve` falls back to recursing
    /// over active children and `integrate` to a pass-through.
    Unclaimed,
    /// Exactly one solver owns the behavior.
    ClaimedBy(SolverId),
}

/// Thread-identity stamps gating structural mutation.
///
/// A mutation is permitted when the calling thread matches either
/// stamp. Handing initialization to another thread re-stamps both,
/// which mechanically locks the previous owner out without a lock.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Affinity {
    pub create: Option<ThreadId>,
    pub init: Option<ThreadId>,
}

impl Affinity {
    pub fn permits_current(&self) -> bool {
        let current = thread::current().id();
        self.create == Some(current) || self.init == Some(current)
    }
}

/// Tree-position fields, guarded by one mutex so unlink/relink during
/// reparenting and destruction cannot interleave per entity.
#[derive(Debug, Default)]
pub(crate) struct Structure {
    pub parent: Option<ObjectId>,
    /// Depth below the root; the root is level 0.
    pub level: u32,
    /// All direct children, including not-yet-initialized ones.
    pub raw_children: SmallVec<[ObjectId; 8]>,
    /// Only children that completed initialization; iteration and
    /// default solving use this list.
    pub children: SmallVec<[ObjectId; 8]>,
}

/// Per-entity dispatch overrides, taking precedence over the claimed
/// solver.
#[derive(Clone, Default)]
pub(crate) struct Overrides {
    pub solve: Option<SolveOverride>,
    pub integrate: Option<IntegrateOverride>,
}

/// Per-entity solve callback override.
pub type SolveOverride =
    Arc<dyn Fn(&crate::System, ObjectId, f64) -> Result<(), SolverError> + Send + Sync>;

/// Per-entity integrate callback override.
pub type IntegrateOverride = Arc<
    dyn Fn(&crate::System, ObjectId, f64, &StateVector) -> Result<StateDerivative, SolverError>
        + Send
        + Sync,
>;

/// Opaque user or solver payload attached to an entity.
pub type AttachedData = Arc<dyn Any + Send + Sync>;

pub(crate) struct Entity {
    /// Own handle; set immediately after arena insertion.
    pub self_id: OnceLock<ObjectId>,
    pub uid: Mutex<ObjectUid>,
    pub name: RwLock<String>,
    pub type_name: RwLock<String>,

    pub state: RwLock<StateVector>,
    pub previous_state: RwLock<StateVector>,
    /// In-flight state visible only to the integrating thread.
    pub private_state: Mutex<Option<StateVector>>,
    pub integrate_thread: Mutex<Option<ThreadId>>,

    pub initialized: AtomicBool,
    /// Set while an initialization routine is running; a destroyed
    /// entity is not reclaimable until this clears.
    pub initializing: AtomicBool,
    /// Claimed once by the first successful `destroy` call; later calls
    /// fail without touching any list.
    pub destroying: AtomicBool,
    /// Monotonic: set after teardown, never cleared.
    pub destroyed: AtomicBool,
    /// Explicit reference count; starts at 1 (the creator's implicit
    /// reference, released by `destroy`).
    pub stored: AtomicU32,

    pub affinity: Mutex<Affinity>,
    pub structure: Mutex<Structure>,
    pub variables: Mutex<IndexMap<String, Arc<Variable>>>,
    pub claim: Mutex<Claim>,
    pub overrides: Mutex<Overrides>,
    pub user_data: Mutex<Option<AttachedData>>,
    pub solver_data: Mutex<Option<AttachedData>>,
}

impl Entity {
    /// A fresh entity under `parent` (or none, for the root), with its
    /// state vector at identity in `state_frame`.
    pub fn new(uid: ObjectUid, parent: Option<ObjectId>, level: u32, state_frame: ObjectId) -> Self {
        let state = StateVector::identity(state_frame);
        Self {
            self_id: OnceLock::new(),
            uid: Mutex::new(uid),
            name: RwLock::new(String::new()),
            type_name: RwLock::new(String::new()),
            state: RwLock::new(state),
            previous_state: RwLock::new(state),
            private_state: Mutex::new(None),
            integrate_thread: Mutex::new(None),
            initialized: AtomicBool::new(false),
            initializing: AtomicBool::new(false),
            destroying: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            stored: AtomicU32::new(1),
            affinity: Mutex::new(Affinity {
                create: Some(thread::current().id()),
                init: None,
            }),
            structure: Mutex::new(Structure {
                parent,
                level,
                raw_children: SmallVec::new(),
                children: SmallVec::new(),
            }),
            variables: Mutex::new(IndexMap::new()),
            claim: Mutex::new(Claim::Unclaimed),
            overrides: Mutex::new(Overrides::default()),
            user_data: Mutex::new(None),
            solver_data: Mutex::new(None),
        }
    }

    pub fn id(&self) -> ObjectId {
        *self
            .self_id
            .get()
            .expect("entity used before arena insertion completed")
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_destroyed(&self) -> bool {
        // `destroying` covers the teardown window before the final
        // `destroyed` store, so `store()` cannot sneak a reference onto
        // an entity that is mid-destruction.
        self.destroying.load(Ordering::Acquire) || self.destroyed.load(Ordering::Acquire)
    }

    /// Whether the calling thread may mutate this entity's structure.
    pub fn affinity_permits_current(&self) -> bool {
        self.affinity.lock().unwrap().permits_current()
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.structure.lock().unwrap().parent
    }

    pub fn level(&self) -> u32 {
        self.structure.lock().unwrap().level
    }

    pub fn raw_children_snapshot(&self) -> Vec<ObjectId> {
        self.structure.lock().unwrap().raw_children.to_vec()
    }

    pub fn children_snapshot(&self) -> Vec<ObjectId> {
        self.structure.lock().unwrap().children.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> Entity {
        Entity::new(ObjectUid(1), None, 0, ObjectId::from_raw(0, 0))
    }

    #[test]
    fn starts_with_one_reference_and_clean_flags() {
        let e = entity();
        assert_eq!(e.stored.load(Ordering::Relaxed), 1);
        assert!(!e.is_initialized());
        assert!(!e.is_destroyed());
        assert_eq!(*e.claim.lock().unwrap(), Claim::Unclaimed);
    }

    #[test]
    fn creator_thread_has_affinity() {
        let e = entity();
        assert!(e.affinity_permits_current());
    }

    #[test]
    fn other_thread_lacks_affinity() {
        let e = Arc::new(entity());
        let e2 = Arc::clone(&e);
        std::thread::spawn(move || {
            assert!(!e2.affinity_permits_current());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn previous_state_starts_equal_to_state() {
        let e = entity();
        assert_eq!(
            *e.state.read().unwrap(),
            *e.previous_state.read().unwrap()
        );
    }
}
