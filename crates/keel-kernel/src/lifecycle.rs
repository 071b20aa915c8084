//! Entity lifecycle: creation, initialization with the solver claim
//! protocol, destruction, reference counting, and the deferred
//! reclamation sweep.
//!
//! The lifecycle is a one-way street: created → initializing →
//! initialized → destroyed → reclaimed. Destruction unlinks the entity
//! from every list immediately but keeps the slot alive until a sweep
//! observes a zero reference count, so handles held by other threads
//! degrade to read-only views instead of dangling.

use crate::entity::{Claim, Entity};
use crate::mass;
use crate::metrics::SweepMetrics;
use crate::solver::{ClaimOutcome, PreCheck};
use crate::system::System;
use crate::KernelResult;
use crossbeam_channel::{bounded, Receiver};
use keel_core::{KernelError, ObjectId, SolverId};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

impl System {
    /// Create an uninitialized entity under `parent`. The new entity
    /// starts with one implicit reference, an auto-assigned uid, an
    /// identity state vector in the parent's frame, and is usable only
    /// from the creating thread until initialized.
    pub fn create(&self, parent: ObjectId) -> KernelResult<ObjectId> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(KernelError::BadState);
        }
        let parent_entity = self.resolve_live(parent)?;
        let level = parent_entity.level() + 1;
        let (id, entity) = self
            .arena
            .insert(Entity::new(self.fresh_uid(), Some(parent), level, parent));
        entity.self_id.set(id).ok();

        // Link under the parent's structure lock so a concurrent
        // destroy of the parent either sees this child or rejects us.
        {
            let mut structure = parent_entity.structure.lock().unwrap();
            if parent_entity.is_destroyed() {
                drop(structure);
                self.arena.remove(id).ok();
                return Err(KernelError::InvalidObject);
            }
            structure.raw_children.push(id);
        }
        self.entities.lock().unwrap().push(id);
        self.metrics.lock().unwrap().created += 1;
        Ok(id)
    }

    /// Initialize an entity and its whole subtree, blocking until
    /// done. Must be called from the thread that created the entity.
    pub fn initialize(&self, object: ObjectId) -> KernelResult<()> {
        let entity = self.resolve_live(object)?;
        if !entity.affinity_permits_current() {
            return Err(KernelError::InterThreadCall);
        }
        self.initialize_inner(object)
    }

    /// Initialize on a background thread. The creating thread hands
    /// the entity off; the returned channel yields the outcome once.
    /// Dropping the receiver turns the call into fire-and-forget.
    pub fn initialize_detached(
        self: &Arc<Self>,
        object: ObjectId,
    ) -> KernelResult<Receiver<KernelResult<()>>> {
        let entity = self.resolve_live(object)?;
        if !entity.affinity_permits_current() {
            return Err(KernelError::InterThreadCall);
        }
        // Release the creating thread's hold before the handoff; the
        // worker becomes the affine thread when it starts.
        entity.affinity.lock().unwrap().create = None;

        let (tx, rx) = bounded(1);
        let system = Arc::clone(self);
        thread::Builder::new()
            .name(format!("keel-init-{object}"))
            .spawn(move || {
                let result = system.initialize_inner(object);
                let _ = tx.send(result);
            })
            .map_err(|_| KernelError::BadState)?;
        Ok(rx)
    }

    /// Take structural ownership of an uninitialized entity for the
    /// calling thread: both affinity stamps are rewritten to it, which
    /// locks the previous owner out by identity comparison alone. Must
    /// happen before `initialize`; an initialized entity is rejected.
    pub fn transfer_initialization(&self, object: ObjectId) -> KernelResult<()> {
        let entity = self.resolve_live(object)?;
        if entity.is_initialized() {
            return Err(KernelError::BadState);
        }
        let current = thread::current().id();
        let mut affinity = entity.affinity.lock().unwrap();
        affinity.create = Some(current);
        affinity.init = Some(current);
        Ok(())
    }

    /// The initialization sequence proper. Runs on whichever thread
    /// owns the entity for the duration; recursion keeps children on
    /// the same thread.
    fn initialize_inner(&self, object: ObjectId) -> KernelResult<()> {
        let entity = self.resolve_live(object)?;
        if entity.is_initialized() || entity.initializing.swap(true, Ordering::AcqRel) {
            return Err(KernelError::BadState);
        }
        entity.affinity.lock().unwrap().init = Some(thread::current().id());

        let result = self.run_initialization(&entity, object);
        if result.is_err() {
            // The entity was destroyed on the way out; clearing the
            // flag makes it reclaimable by the sweep.
            entity.initializing.store(false, Ordering::Release);
        }
        result
    }

    fn run_initialization(&self, entity: &Arc<Entity>, object: ObjectId) -> KernelResult<()> {
        self.make_name_unique(entity);

        // Children first, bottom-up. A solver initializing a child may
        // create more children, so rescan until a pass makes no
        // progress. A failing child destroys itself; the parent keeps
        // going without it.
        loop {
            let mut progressed = false;
            for child in entity.raw_children_snapshot() {
                let Ok(child_entity) = self.resolve(child) else {
                    continue;
                };
                if child_entity.is_destroyed()
                    || child_entity.is_initialized()
                    || child_entity.initializing.load(Ordering::Acquire)
                {
                    continue;
                }
                self.initialize_inner(child).ok();
                progressed = true;
            }
            if !progressed {
                break;
            }
        }

        self.offer_to_solvers(entity, object)?;

        // Mass parameters are derived opportunistically; entities with
        // no mass variable are simply massless.
        mass::compute_mass_parameters(self, object);

        entity.initialized.store(true, Ordering::Release);

        {
            let type_name = entity.type_name.read().unwrap().clone();
            self.type_index
                .lock()
                .unwrap()
                .entry(type_name)
                .or_default()
                .push(object);
        }
        if let Some(parent) = entity.parent() {
            if let Ok(parent_entity) = self.resolve(parent) {
                let mut structure = parent_entity.structure.lock().unwrap();
                if !structure.children.contains(&object) {
                    structure.children.push(object);
                }
            }
        }

        let post = self.callbacks.read().unwrap().post_initialize.clone();
        if let Some(callback) = post {
            if let Err(err) = callback(self, object) {
                self.destroy(object).ok();
                return Err(KernelError::SolverFailed {
                    name: "post_initialize".to_owned(),
                    reason: err.reason,
                });
            }
        }
        Ok(())
    }

    /// Offer the entity to each registered solver in registration
    /// order until one claims it. A solver error is fatal to the
    /// entity: it is destroyed and the error propagated.
    fn offer_to_solvers(&self, entity: &Arc<Entity>, object: ObjectId) -> KernelResult<()> {
        let pre = self.callbacks.read().unwrap().pre_initialize.clone();
        for (index, solver) in self.solvers_snapshot().into_iter().enumerate() {
            let check = match &pre {
                Some(callback) => match callback(self, &solver, object) {
                    Ok(check) => check,
                    Err(err) => {
                        self.metrics.lock().unwrap().claim_failures += 1;
                        self.destroy(object).ok();
                        return Err(KernelError::SolverFailed {
                            name: solver.name().to_owned(),
                            reason: err.reason,
                        });
                    }
                },
                None => PreCheck::Consult,
            };
            let outcome = match check {
                PreCheck::Skip => continue,
                PreCheck::Claim => ClaimOutcome::Claim,
                PreCheck::Consult => {
                    self.metrics.lock().unwrap().claim_offers += 1;
                    match solver.on_initialize(self, object) {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            self.metrics.lock().unwrap().claim_failures += 1;
                            self.destroy(object).ok();
                            return Err(KernelError::SolverFailed {
                                name: solver.name().to_owned(),
                                reason: err.reason,
                            });
                        }
                    }
                }
            };
            if let ClaimOutcome::Claim = outcome {
                *entity.claim.lock().unwrap() = Claim::ClaimedBy(SolverId(index as u32));
                self.metrics.lock().unwrap().claims += 1;
                return Ok(());
            }
        }
        Ok(())
    }

    /// Rename `"name"` to `"name (N)"` if a sibling already carries
    /// it, searching upward for the first free suffix.
    pub(crate) fn make_name_unique(&self, entity: &Arc<Entity>) {
        let Some(parent) = entity.parent() else {
            return;
        };
        let Ok(parent_entity) = self.resolve(parent) else {
            return;
        };
        let own_id = entity.id();
        let siblings: Vec<String> = parent_entity
            .raw_children_snapshot()
            .into_iter()
            .filter(|&child| child != own_id)
            .filter_map(|child| self.resolve(child).ok())
            .map(|sibling| sibling.name.read().unwrap().clone())
            .collect();

        let base = entity.name.read().unwrap().clone();
        if !siblings.iter().any(|name| *name == base) {
            return;
        }
        for n in 1..u32::MAX {
            let candidate = format!("{base} ({n})");
            if !siblings.iter().any(|name| *name == candidate) {
                *entity.name.write().unwrap() = candidate;
                return;
            }
        }
    }

    /// Destroy an entity and its subtree. The entity is unlinked from
    /// every list immediately and queued for deferred reclamation; the
    /// slot itself survives until a sweep observes no references.
    /// Destruction is one-way: a second call fails with
    /// `InvalidObject`.
    pub fn destroy(&self, object: ObjectId) -> KernelResult<()> {
        let entity = self.resolve(object)?;
        if entity.destroying.swap(true, Ordering::AcqRel) {
            return Err(KernelError::InvalidObject);
        }

        // Unlink before teardown so queries stop seeing the entity at
        // once, even though the slot lingers.
        self.entities.lock().unwrap().retain(|&id| id != object);
        if entity.is_initialized() {
            let type_name = entity.type_name.read().unwrap().clone();
            if let Some(list) = self.type_index.lock().unwrap().get_mut(&type_name) {
                list.retain(|&id| id != object);
            }
        }
        if let Some(parent) = entity.parent() {
            if let Ok(parent_entity) = self.resolve(parent) {
                let mut structure = parent_entity.structure.lock().unwrap();
                structure.raw_children.retain(|id| *id != object);
                structure.children.retain(|id| *id != object);
            }
        }

        // Children go down with the parent; individual failures do not
        // stop the teardown.
        for child in entity.raw_children_snapshot() {
            self.destroy(child).ok();
        }

        let claimed = self.claimed_solver(object)?;
        if let Some(solver) = &claimed {
            let pre = self.callbacks.read().unwrap().pre_deinitialize.clone();
            if let Some(callback) = pre {
                callback(self, solver, object).ok();
            }
            solver.on_deinitialize(self, object).ok();
        }

        // Drop the implicit reference held since creation.
        let _ = entity
            .stored
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        entity.destroyed.store(true, Ordering::Release);
        self.metrics.lock().unwrap().destroyed += 1;
        self.deferred.lock().unwrap().push(object);
        Ok(())
    }

    /// Take an explicit reference, pinning the entity across its own
    /// destruction until a matching `release`.
    pub fn store(&self, object: ObjectId) -> KernelResult<()> {
        let entity = self.resolve(object)?;
        if entity.is_destroyed() {
            return Err(KernelError::InvalidObject);
        }
        entity.stored.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Drop an explicit reference. Releasing below zero is an error
    /// and leaves the count untouched.
    pub fn release(&self, object: ObjectId) -> KernelResult<()> {
        let entity = self.resolve(object)?;
        entity
            .stored
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map(|_| ())
            .map_err(|_| KernelError::InvalidObject)
    }

    /// Sweep the deferred-deletion list, reclaiming every destroyed
    /// entity whose reference count reached zero and which is not in
    /// the middle of initializing. Reclamation frees the slot; stale
    /// handles fail from then on.
    pub fn cleanup(&self) -> SweepMetrics {
        let _gate = self.cleanup_gate.lock().unwrap();
        self.sweep_deferred()
    }

    fn sweep_deferred(&self) -> SweepMetrics {
        let pending = std::mem::take(&mut *self.deferred.lock().unwrap());
        let mut sweep = SweepMetrics::default();
        let mut retained = Vec::new();

        for object in pending {
            sweep.examined += 1;
            let Ok(entity) = self.resolve(object) else {
                continue;
            };
            let idle = entity.is_initialized() || !entity.initializing.load(Ordering::Acquire);
            if entity.stored.load(Ordering::Acquire) == 0 && idle {
                // Break payload cycles before the slot goes away.
                entity.variables.lock().unwrap().clear();
                *entity.user_data.lock().unwrap() = None;
                *entity.solver_data.lock().unwrap() = None;
                let mut overrides = entity.overrides.lock().unwrap();
                overrides.solve = None;
                overrides.integrate = None;
                drop(overrides);
                self.arena.remove(object).ok();
                sweep.reclaimed += 1;
            } else {
                retained.push(object);
            }
        }
        sweep.retained = retained.len() as u64;
        self.deferred.lock().unwrap().extend(retained);

        let mut metrics = self.metrics.lock().unwrap();
        metrics.reclaimed += sweep.reclaimed;
        metrics.sweeps += 1;
        sweep
    }

    /// Tear the whole system down: destroy the tree from the root,
    /// sweep, then notify every solver. Further creation fails. Holds
    /// the sweep gate for the duration, so a concurrent `cleanup`
    /// cannot interleave with the teardown.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        let _gate = self.cleanup_gate.lock().unwrap();
        let root = self.root();
        self.destroy(root).ok();
        self.sweep_deferred();
        for solver in self.solvers_snapshot() {
            solver.on_shutdown(self).ok();
        }
    }
}
