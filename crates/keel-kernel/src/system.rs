//! The universe container.
//!
//! A [`System`] owns the object arena, the global entity list, the
//! type-indexed lookup, the solver registry, the deferred-deletion
//! list, the database registry, and the global callback table. It is
//! the single context object every operation goes through; there are
//! no ambient globals.

use crate::config::SystemConfig;
use crate::entity::{
    AttachedData, Claim, Entity, IntegrateOverride, SolveOverride, MAX_OBJECT_NAME_LEN,
};
use crate::metrics::SystemMetrics;
use crate::solver::{PreCheck, Solver, SolverError};
use crate::variable::{Variable, VariableKind, VariableOwner, VariableValue};
use crate::KernelResult;
use indexmap::IndexMap;
use keel_arena::SlotArena;
use keel_core::{type_matches, KernelError, ObjectId, ObjectUid, SolverId};
use keel_math::{StateVector, TriMesh};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

/// Global pre-initialize callback, consulted before each solver's own
/// claim check; can veto or short-circuit claiming uniformly.
pub type PreInitializeFn =
    Arc<dyn Fn(&System, &Arc<dyn Solver>, ObjectId) -> Result<PreCheck, SolverError> + Send + Sync>;

/// Global post-initialize callback; an error destroys the object.
pub type PostInitializeFn =
    Arc<dyn Fn(&System, ObjectId) -> Result<(), SolverError> + Send + Sync>;

/// Global pre-deinitialize callback, run before the claimed solver's
/// own `on_deinitialize` during destruction.
pub type PreDeinitializeFn =
    Arc<dyn Fn(&System, &Arc<dyn Solver>, ObjectId) -> Result<(), SolverError> + Send + Sync>;

/// Tessellation source consulted by mass-property derivation. The mesh
/// generator itself is an external collaborator.
pub type MeshProviderFn = Arc<dyn Fn(&System, ObjectId) -> Option<TriMesh> + Send + Sync>;

/// The system-wide callback table.
#[derive(Clone, Default)]
pub struct Callbacks {
    /// See [`PreInitializeFn`].
    pub pre_initialize: Option<PreInitializeFn>,
    /// See [`PostInitializeFn`].
    pub post_initialize: Option<PostInitializeFn>,
    /// See [`PreDeinitializeFn`].
    pub pre_deinitialize: Option<PreDeinitializeFn>,
    /// See [`MeshProviderFn`].
    pub mesh_provider: Option<MeshProviderFn>,
}

/// The universe container; see the [crate docs](crate) for the model.
pub struct System {
    pub(crate) arena: SlotArena<Entity>,
    root: OnceLock<ObjectId>,
    /// All live entities, in creation order.
    pub(crate) entities: Mutex<Vec<ObjectId>>,
    /// Lazily created per distinct type string; holds initialized
    /// entities only.
    pub(crate) type_index: Mutex<IndexMap<String, Vec<ObjectId>>>,
    /// Append-only after startup.
    pub(crate) solvers: RwLock<Vec<Arc<dyn Solver>>>,
    /// Destroyed entities awaiting reclamation.
    pub(crate) deferred: Mutex<Vec<ObjectId>>,
    pub(crate) databases: Mutex<IndexMap<String, Arc<Variable>>>,
    time: RwLock<f64>,
    pub(crate) callbacks: RwLock<Callbacks>,
    next_uid: AtomicU32,
    /// Shared by the cleanup sweep and shutdown so they cannot race.
    pub(crate) cleanup_gate: Mutex<()>,
    pub(crate) shutting_down: AtomicBool,
    pub(crate) metrics: Mutex<SystemMetrics>,
}

impl System {
    /// Create a system with its root inertial-space object.
    pub fn new(config: SystemConfig) -> KernelResult<Arc<Self>> {
        config.validate()?;
        let system = Arc::new(Self {
            arena: SlotArena::new(),
            root: OnceLock::new(),
            entities: Mutex::new(Vec::new()),
            type_index: Mutex::new(IndexMap::new()),
            solvers: RwLock::new(Vec::new()),
            deferred: Mutex::new(Vec::new()),
            databases: Mutex::new(IndexMap::new()),
            time: RwLock::new(config.initial_time),
            callbacks: RwLock::new(Callbacks::default()),
            next_uid: AtomicU32::new(config.first_uid),
            cleanup_gate: Mutex::new(()),
            shutting_down: AtomicBool::new(false),
            metrics: Mutex::new(SystemMetrics::default()),
        });

        // The root is its own coordinate frame; the frame tag is
        // rewritten to the real handle right after insertion.
        let placeholder = ObjectId::from_raw(0, 0);
        let uid = ObjectUid(system.next_uid.fetch_add(1, Ordering::Relaxed));
        let (root_id, root) = system.arena.insert(Entity::new(uid, None, 0, placeholder));
        root.self_id.set(root_id).ok();
        *root.name.write().unwrap() = config.root_name;
        *root.type_name.write().unwrap() = config.root_type;
        let identity = StateVector::identity(root_id);
        *root.state.write().unwrap() = identity;
        *root.previous_state.write().unwrap() = identity;
        // The root never goes through initialize(); it is active from
        // birth and claimable by nothing.
        root.initialized.store(true, Ordering::Release);
        system.entities.lock().unwrap().push(root_id);
        system.root.set(root_id).ok();
        system.metrics.lock().unwrap().created += 1;
        Ok(system)
    }

    /// Handle of the root inertial-space object.
    pub fn root(&self) -> ObjectId {
        *self.root.get().expect("system constructed without root")
    }

    // ── Resolution helpers ───────────────────────────────────────────

    /// Resolve a handle; succeeds for destroyed-but-unreclaimed
    /// entities (reads stay legal through the grace period).
    pub(crate) fn resolve(&self, object: ObjectId) -> KernelResult<Arc<Entity>> {
        self.arena.get(object).map_err(|_| KernelError::InvalidObject)
    }

    /// Resolve a handle, rejecting destroyed entities.
    pub(crate) fn resolve_live(&self, object: ObjectId) -> KernelResult<Arc<Entity>> {
        let entity = self.resolve(object)?;
        if entity.is_destroyed() {
            return Err(KernelError::InvalidObject);
        }
        Ok(entity)
    }

    /// Resolve for structural mutation: live and affinity-checked.
    pub(crate) fn resolve_mutable(&self, object: ObjectId) -> KernelResult<Arc<Entity>> {
        let entity = self.resolve_live(object)?;
        if !entity.affinity_permits_current() {
            return Err(KernelError::InterThreadCall);
        }
        Ok(entity)
    }

    // ── Identity ─────────────────────────────────────────────────────

    /// The object's name.
    pub fn name(&self, object: ObjectId) -> KernelResult<String> {
        Ok(self.resolve(object)?.name.read().unwrap().clone())
    }

    /// Name the object. Only before initialization, and gated to the
    /// creating/initializing thread. The path metacharacters `*`, `/`,
    /// `[`, `]` are replaced with `_` so every name stays addressable
    /// by [`System::query_by_reference`]; sibling uniqueness is
    /// enforced at initialization and reparenting, not here.
    pub fn set_name(&self, object: ObjectId, name: &str) -> KernelResult<()> {
        if name.len() > MAX_OBJECT_NAME_LEN {
            return Err(KernelError::BadParameter);
        }
        let entity = self.resolve_mutable(object)?;
        if entity.is_initialized() {
            return Err(KernelError::BadState);
        }
        let clean: String = name
            .chars()
            .map(|c| match c {
                '*' | '/' | '[' | ']' => '_',
                other => other,
            })
            .collect();
        *entity.name.write().unwrap() = clean;
        Ok(())
    }

    /// The object's type string.
    pub fn type_name(&self, object: ObjectId) -> KernelResult<String> {
        Ok(self.resolve(object)?.type_name.read().unwrap().clone())
    }

    /// Set the type string. Only before initialization (the type index
    /// registers the entity under its type at that point).
    pub fn set_type(&self, object: ObjectId, type_name: &str) -> KernelResult<()> {
        if type_name.len() > MAX_OBJECT_NAME_LEN {
            return Err(KernelError::BadParameter);
        }
        let entity = self.resolve_mutable(object)?;
        if entity.is_initialized() {
            return Err(KernelError::BadState);
        }
        *entity.type_name.write().unwrap() = type_name.to_owned();
        Ok(())
    }

    /// Whether the object's type matches a pattern; a trailing `*`
    /// matches any suffix.
    pub fn check_type(&self, object: ObjectId, pattern: &str) -> KernelResult<bool> {
        Ok(type_matches(
            pattern,
            &self.resolve(object)?.type_name.read().unwrap(),
        ))
    }

    /// The object's uid.
    pub fn uid(&self, object: ObjectId) -> KernelResult<ObjectUid> {
        Ok(*self.resolve(object)?.uid.lock().unwrap())
    }

    /// Override the auto-assigned uid. Only before initialization.
    pub fn set_uid(&self, object: ObjectId, uid: ObjectUid) -> KernelResult<()> {
        let entity = self.resolve_mutable(object)?;
        if entity.is_initialized() {
            return Err(KernelError::BadState);
        }
        *entity.uid.lock().unwrap() = uid;
        Ok(())
    }

    /// Allocate the next automatic uid.
    pub(crate) fn fresh_uid(&self) -> ObjectUid {
        ObjectUid(self.next_uid.fetch_add(1, Ordering::Relaxed))
    }

    // ── Lifecycle queries ────────────────────────────────────────────

    /// Whether the object completed initialization.
    pub fn is_initialized(&self, object: ObjectId) -> KernelResult<bool> {
        Ok(self.resolve(object)?.is_initialized())
    }

    /// Whether the object was destroyed. A stale (already reclaimed)
    /// handle reports `true`.
    pub fn is_destroyed(&self, object: ObjectId) -> bool {
        match self.resolve(object) {
            Ok(entity) => entity.is_destroyed(),
            Err(_) => true,
        }
    }

    /// Current explicit reference count.
    pub fn stored_count(&self, object: ObjectId) -> KernelResult<u32> {
        Ok(self.resolve(object)?.stored.load(Ordering::Acquire))
    }

    // ── State vectors ────────────────────────────────────────────────

    /// The current (last published) state vector.
    pub fn state_vector(&self, object: ObjectId) -> KernelResult<StateVector> {
        Ok(*self.resolve(object)?.state.read().unwrap())
    }

    /// Publish a new state vector; the previous one is snapshotted for
    /// interpolation first.
    pub fn set_state_vector(&self, object: ObjectId, state: StateVector) -> KernelResult<()> {
        let entity = self.resolve_live(object)?;
        let mut current = entity.state.write().unwrap();
        *entity.previous_state.write().unwrap() = *current;
        *current = state;
        Ok(())
    }

    /// The snapshot taken by the previous `set_state_vector` call.
    pub fn previous_state_vector(&self, object: ObjectId) -> KernelResult<StateVector> {
        Ok(*self.resolve(object)?.previous_state.read().unwrap())
    }

    /// State interpolated between the previous and current snapshots;
    /// `t = 0` is the previous state, `t = 1` the current.
    pub fn interpolated_state_vector(&self, object: ObjectId, t: f64) -> KernelResult<StateVector> {
        if !t.is_finite() {
            return Err(KernelError::BadParameter);
        }
        let entity = self.resolve(object)?;
        let current = *entity.state.read().unwrap();
        let previous = *entity.previous_state.read().unwrap();
        Ok(current.interpolate(&previous, t))
    }

    /// State as seen by frame conversions: threads other than the
    /// integrating one keep reading the last published state while an
    /// integration is in flight.
    pub(crate) fn published_state(&self, entity: &Entity) -> StateVector {
        let integrating = *entity.integrate_thread.lock().unwrap();
        if integrating == Some(std::thread::current().id()) {
            if let Some(private) = *entity.private_state.lock().unwrap() {
                return private;
            }
        }
        *entity.state.read().unwrap()
    }

    // ── Tree accessors ───────────────────────────────────────────────

    /// Parent handle; `None` only for the root.
    pub fn parent(&self, object: ObjectId) -> KernelResult<Option<ObjectId>> {
        Ok(self.resolve(object)?.parent())
    }

    /// Depth below the root (the root is level 0).
    pub fn level(&self, object: ObjectId) -> KernelResult<u32> {
        Ok(self.resolve(object)?.level())
    }

    /// Snapshot of initialized children, in sibling order.
    pub fn children(&self, object: ObjectId) -> KernelResult<Vec<ObjectId>> {
        Ok(self.resolve(object)?.children_snapshot())
    }

    /// Snapshot of all children including uninitialized ones.
    pub fn raw_children(&self, object: ObjectId) -> KernelResult<Vec<ObjectId>> {
        Ok(self.resolve(object)?.raw_children_snapshot())
    }

    /// Snapshot of every live entity handle, in creation order.
    pub fn entities(&self) -> Vec<ObjectId> {
        self.entities.lock().unwrap().clone()
    }

    /// Initialized entities of a type, in initialization order. The
    /// index entry is created lazily on first use of the type string.
    pub fn entities_of_type(&self, type_name: &str) -> Vec<ObjectId> {
        self.type_index
            .lock()
            .unwrap()
            .get(type_name)
            .cloned()
            .unwrap_or_default()
    }

    // ── Attached data and overrides ──────────────────────────────────

    /// Opaque user payload.
    pub fn user_data(&self, object: ObjectId) -> KernelResult<Option<AttachedData>> {
        Ok(self.resolve(object)?.user_data.lock().unwrap().clone())
    }

    /// Attach an opaque user payload.
    pub fn set_user_data(&self, object: ObjectId, data: Option<AttachedData>) -> KernelResult<()> {
        *self.resolve_live(object)?.user_data.lock().unwrap() = data;
        Ok(())
    }

    /// Solver-private payload.
    pub fn solver_data(&self, object: ObjectId) -> KernelResult<Option<AttachedData>> {
        Ok(self.resolve(object)?.solver_data.lock().unwrap().clone())
    }

    /// Attach a solver-private payload (normally done by the claiming
    /// solver inside its claim check).
    pub fn set_solver_data(
        &self,
        object: ObjectId,
        data: Option<AttachedData>,
    ) -> KernelResult<()> {
        *self.resolve_live(object)?.solver_data.lock().unwrap() = data;
        Ok(())
    }

    /// Install or clear a per-object solve override, which takes
    /// precedence over the claimed solver.
    pub fn set_solve_override(
        &self,
        object: ObjectId,
        callback: Option<SolveOverride>,
    ) -> KernelResult<()> {
        self.resolve_live(object)?.overrides.lock().unwrap().solve = callback;
        Ok(())
    }

    /// Install or clear a per-object integrate override.
    pub fn set_integrate_override(
        &self,
        object: ObjectId,
        callback: Option<IntegrateOverride>,
    ) -> KernelResult<()> {
        self.resolve_live(object)?.overrides.lock().unwrap().integrate = callback;
        Ok(())
    }

    /// Which solver, if any, claimed the object.
    pub fn claim(&self, object: ObjectId) -> KernelResult<Claim> {
        Ok(*self.resolve(object)?.claim.lock().unwrap())
    }

    /// The claimed solver itself.
    pub fn claimed_solver(&self, object: ObjectId) -> KernelResult<Option<Arc<dyn Solver>>> {
        match self.claim(object)? {
            Claim::Unclaimed => Ok(None),
            Claim::ClaimedBy(id) => Ok(self.solver(id)),
        }
    }

    // ── Solver registry ──────────────────────────────────────────────

    /// Register a solver. The registry is append-only; the solver's
    /// `on_startup` runs immediately and a failure unregisters it.
    pub fn register_solver(&self, solver: Arc<dyn Solver>) -> KernelResult<SolverId> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(KernelError::BadState);
        }
        let id = {
            let mut solvers = self.solvers.write().unwrap();
            solvers.push(Arc::clone(&solver));
            SolverId((solvers.len() - 1) as u32)
        };
        if let Err(err) = solver.on_startup(self) {
            self.solvers.write().unwrap().pop();
            return Err(KernelError::SolverFailed {
                name: solver.name().to_owned(),
                reason: err.reason,
            });
        }
        Ok(id)
    }

    /// Solver by registration id.
    pub fn solver(&self, id: SolverId) -> Option<Arc<dyn Solver>> {
        self.solvers.read().unwrap().get(id.0 as usize).map(Arc::clone)
    }

    /// Number of registered solvers.
    pub fn solver_count(&self) -> usize {
        self.solvers.read().unwrap().len()
    }

    /// Snapshot of the registry in registration order.
    pub(crate) fn solvers_snapshot(&self) -> Vec<Arc<dyn Solver>> {
        self.solvers.read().unwrap().clone()
    }

    // ── Global time ──────────────────────────────────────────────────

    /// Global simulation time (MJD).
    pub fn time(&self) -> f64 {
        *self.time.read().unwrap()
    }

    /// Set the global simulation time.
    pub fn set_time(&self, time: f64) -> KernelResult<()> {
        if !time.is_finite() {
            return Err(KernelError::BadParameter);
        }
        *self.time.write().unwrap() = time;
        Ok(())
    }

    // ── Callbacks ────────────────────────────────────────────────────

    /// Install or clear the global pre-initialize callback.
    pub fn set_pre_initialize_callback(&self, callback: Option<PreInitializeFn>) {
        self.callbacks.write().unwrap().pre_initialize = callback;
    }

    /// Install or clear the global post-initialize callback.
    pub fn set_post_initialize_callback(&self, callback: Option<PostInitializeFn>) {
        self.callbacks.write().unwrap().post_initialize = callback;
    }

    /// Install or clear the global pre-deinitialize callback.
    pub fn set_pre_deinitialize_callback(&self, callback: Option<PreDeinitializeFn>) {
        self.callbacks.write().unwrap().pre_deinitialize = callback;
    }

    /// Install or clear the tessellation provider used by mass-property
    /// estimation.
    pub fn set_mesh_provider(&self, callback: Option<MeshProviderFn>) {
        self.callbacks.write().unwrap().mesh_provider = callback;
    }

    // ── Variables ────────────────────────────────────────────────────

    /// Add a variable to an object, or return the existing one of the
    /// same name. Structural: requires the affine thread and an
    /// uninitialized object.
    pub fn add_variable(
        &self,
        object: ObjectId,
        name: &str,
        kind: VariableKind,
    ) -> KernelResult<Arc<Variable>> {
        let entity = self.resolve_mutable(object)?;
        if entity.is_initialized() {
            return Err(KernelError::BadState);
        }
        let mut variables = entity.variables.lock().unwrap();
        if let Some(existing) = variables.get(name) {
            return Ok(Arc::clone(existing));
        }
        let frame = entity.parent().unwrap_or(object);
        let variable = Variable::new(
            name,
            VariableOwner::Object(object),
            VariableValue::empty(kind, frame),
        )?;
        variables.insert(name.to_owned(), Arc::clone(&variable));
        Ok(variable)
    }

    /// Convenience: add a scalar variable with an initial value.
    pub fn add_real_variable(
        &self,
        object: ObjectId,
        name: &str,
        value: f64,
    ) -> KernelResult<Arc<Variable>> {
        let variable = self.add_variable(object, name, VariableKind::Real)?;
        variable.set_real(value)?;
        Ok(variable)
    }

    /// Remove a variable by name. Structural, like `add_variable`.
    pub fn remove_variable(&self, object: ObjectId, name: &str) -> KernelResult<()> {
        let entity = self.resolve_mutable(object)?;
        if entity.is_initialized() {
            return Err(KernelError::BadState);
        }
        let removed = entity.variables.lock().unwrap().shift_remove(name);
        removed.map(|_| ()).ok_or(KernelError::NotFound)
    }

    /// Look up a top-level variable by name.
    pub fn variable(&self, object: ObjectId, name: &str) -> KernelResult<Arc<Variable>> {
        self.resolve(object)?
            .variables
            .lock()
            .unwrap()
            .get(name)
            .map(Arc::clone)
            .ok_or(KernelError::NotFound)
    }

    /// Snapshot of an object's variables in insertion order.
    pub fn variables(&self, object: ObjectId) -> KernelResult<Vec<Arc<Variable>>> {
        Ok(self
            .resolve(object)?
            .variables
            .lock()
            .unwrap()
            .values()
            .map(Arc::clone)
            .collect())
    }

    /// Add a nested variable under `parent`. Checks the owning object's
    /// affinity and lifecycle; database variables are always mutable.
    pub fn variable_add_nested(
        &self,
        parent: &Arc<Variable>,
        name: &str,
        kind: VariableKind,
    ) -> KernelResult<Arc<Variable>> {
        let frame = self.check_variable_mutable(parent)?;
        let child = Variable::new(name, parent.owner(), VariableValue::empty(kind, frame))?;
        parent.push_nested(Arc::clone(&child))?;
        Ok(child)
    }

    /// Add (or replace) an attribute on a variable, under the same
    /// rules as `variable_add_nested`.
    pub fn variable_add_attribute(
        &self,
        variable: &Arc<Variable>,
        name: &str,
        kind: VariableKind,
    ) -> KernelResult<Arc<Variable>> {
        let frame = self.check_variable_mutable(variable)?;
        let attribute = Variable::new(name, variable.owner(), VariableValue::empty(kind, frame))?;
        variable.push_attribute(Arc::clone(&attribute));
        Ok(attribute)
    }

    /// Shared gate for structural variable mutation; returns the frame
    /// handle new payloads should be tagged with.
    fn check_variable_mutable(&self, variable: &Arc<Variable>) -> KernelResult<ObjectId> {
        match variable.owner() {
            VariableOwner::Object(object) => {
                let entity = self.resolve_mutable(object)?;
                if entity.is_initialized() {
                    return Err(KernelError::BadState);
                }
                Ok(entity.parent().unwrap_or(object))
            }
            VariableOwner::Database => Ok(self.root()),
        }
    }

    // ── Databases ────────────────────────────────────────────────────

    /// Create a named database (a free-standing variable tree), or
    /// return the existing one.
    pub fn add_database(&self, name: &str) -> KernelResult<Arc<Variable>> {
        let mut databases = self.databases.lock().unwrap();
        if let Some(existing) = databases.get(name) {
            return Ok(Arc::clone(existing));
        }
        let root = Variable::new(
            name,
            VariableOwner::Database,
            VariableValue::Nested(Vec::new()),
        )?;
        databases.insert(name.to_owned(), Arc::clone(&root));
        Ok(root)
    }

    /// Look up a database by name.
    pub fn database(&self, name: &str) -> KernelResult<Arc<Variable>> {
        self.databases
            .lock()
            .unwrap()
            .get(name)
            .map(Arc::clone)
            .ok_or(KernelError::NotFound)
    }

    /// Registered database names, in registration order.
    pub fn database_names(&self) -> Vec<String> {
        self.databases.lock().unwrap().keys().cloned().collect()
    }

    // ── Metrics ──────────────────────────────────────────────────────

    /// Snapshot of the cumulative lifecycle counters.
    pub fn metrics(&self) -> SystemMetrics {
        *self.metrics.lock().unwrap()
    }
}
