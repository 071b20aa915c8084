//! Solve and integrate dispatch.
//!
//! Both operations resolve a handler in the same precedence order:
//! per-object override, then the claimed solver (when it opts in),
//! then a kernel default. The default `solve` recurses into active
//! children; the default `integrate` passes the object's current
//! kinematic terms through as the derivative.

use crate::system::System;
use crate::KernelResult;
use keel_core::{KernelError, ObjectId};
use keel_math::{StateDerivative, StateVector};
use std::thread;

impl System {
    /// Advance an object by `dt` seconds.
    pub fn solve(&self, object: ObjectId, dt: f64) -> KernelResult<()> {
        if !dt.is_finite() {
            return Err(KernelError::BadParameter);
        }
        let entity = self.resolve_live(object)?;
        if !entity.is_initialized() {
            return Err(KernelError::NotInitialized);
        }

        let override_cb = entity.overrides.lock().unwrap().solve.clone();
        if let Some(callback) = override_cb {
            return callback(self, object, dt).map_err(|err| KernelError::SolverFailed {
                name: "solve override".to_owned(),
                reason: err.reason,
            });
        }
        if let Some(solver) = self.claimed_solver(object)? {
            if solver.provides_solve() {
                return solver
                    .on_solve(self, object, dt)
                    .map_err(|err| KernelError::SolverFailed {
                        name: solver.name().to_owned(),
                        reason: err.reason,
                    });
            }
        }

        // Default: recurse into initialized children. A child destroyed
        // between the snapshot and its turn is skipped, not an error.
        for child in entity.children_snapshot() {
            match self.solve(child, dt) {
                Ok(()) | Err(KernelError::InvalidObject) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Compute the derivative of `state` for a propagator step.
    ///
    /// For the duration of the call, frame conversions performed on
    /// this thread see `state` as the object's position, while other
    /// threads keep reading the last published state.
    pub fn integrate(
        &self,
        object: ObjectId,
        dt: f64,
        state: &StateVector,
    ) -> KernelResult<StateDerivative> {
        if !dt.is_finite() {
            return Err(KernelError::BadParameter);
        }
        let entity = self.resolve_live(object)?;
        if !entity.is_initialized() {
            return Err(KernelError::NotInitialized);
        }

        *entity.private_state.lock().unwrap() = Some(*state);
        *entity.integrate_thread.lock().unwrap() = Some(thread::current().id());
        let result = self.integrate_dispatch(object, dt, state);
        *entity.integrate_thread.lock().unwrap() = None;
        *entity.private_state.lock().unwrap() = None;
        result
    }

    fn integrate_dispatch(
        &self,
        object: ObjectId,
        dt: f64,
        state: &StateVector,
    ) -> KernelResult<StateDerivative> {
        let entity = self.resolve_live(object)?;

        let override_cb = entity.overrides.lock().unwrap().integrate.clone();
        if let Some(callback) = override_cb {
            return callback(self, object, dt, state).map_err(|err| KernelError::SolverFailed {
                name: "integrate override".to_owned(),
                reason: err.reason,
            });
        }
        if let Some(solver) = self.claimed_solver(object)? {
            if solver.provides_integrate() {
                return solver.on_integrate(self, object, dt, state).map_err(|err| {
                    KernelError::SolverFailed {
                        name: solver.name().to_owned(),
                        reason: err.reason,
                    }
                });
            }
        }

        // Default: the object moves on its published trajectory. Rates
        // come from the current public state, not the probe state the
        // propagator passed in.
        let current = *entity.state.read().unwrap();
        let mut derivative = StateDerivative::zero(current.position.frame);
        derivative.velocity = current.velocity;
        derivative.acceleration = current.acceleration;
        derivative.angular_velocity = current.angular_velocity;
        derivative.angular_acceleration = current.angular_acceleration;
        Ok(derivative)
    }

    /// Give every claimed solver in the subtree a chance to persist
    /// its private state, depth-first. The first failure aborts.
    pub fn save_state(&self, object: ObjectId) -> KernelResult<()> {
        self.state_walk(object, true)
    }

    /// Counterpart of [`System::save_state`] for restoring.
    pub fn load_state(&self, object: ObjectId) -> KernelResult<()> {
        self.state_walk(object, false)
    }

    fn state_walk(&self, object: ObjectId, saving: bool) -> KernelResult<()> {
        let entity = self.resolve_live(object)?;
        if let Some(solver) = self.claimed_solver(object)? {
            let result = if saving {
                solver.on_state_save(self, object)
            } else {
                solver.on_state_load(self, object)
            };
            result.map_err(|err| KernelError::SolverFailed {
                name: solver.name().to_owned(),
                reason: err.reason,
            })?;
        }
        for child in entity.children_snapshot() {
            match self.state_walk(child, saving) {
                Ok(()) | Err(KernelError::InvalidObject) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}
