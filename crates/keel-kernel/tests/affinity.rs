//! Integration test: thread-affinity gates and detached
//! initialization.
//!
//! Structural mutation (name, type, uid, variables, reparenting) is
//! gated by thread identity, not by locks: only the creating thread,
//! or the thread running the object's initialization, may mutate.

use keel_kernel::{KernelError, VariableKind};
use keel_test_utils::{spawn, test_system};
use std::thread;

#[test]
fn structural_mutation_from_a_foreign_thread_is_rejected() {
    let system = test_system();
    let object = spawn(&system, system.root(), "probe", "probe");

    let sys = system.clone();
    thread::spawn(move || {
        assert_eq!(sys.set_name(object, "intruder"), Err(KernelError::InterThreadCall));
        assert_eq!(sys.set_type(object, "intruder"), Err(KernelError::InterThreadCall));
        assert_eq!(
            sys.add_variable(object, "mass", VariableKind::Real).unwrap_err(),
            KernelError::InterThreadCall
        );
        assert_eq!(sys.initialize(object), Err(KernelError::InterThreadCall));
    })
    .join()
    .unwrap();

    // The creating thread still owns the object.
    system.set_name(object, "probe_b").unwrap();
}

#[test]
fn reads_are_not_affinity_gated() {
    let system = test_system();
    let object = spawn(&system, system.root(), "probe", "probe");

    let sys = system.clone();
    thread::spawn(move || {
        assert_eq!(sys.name(object).unwrap(), "probe");
        assert!(sys.state_vector(object).is_ok());
        assert!(sys.children(object).unwrap().is_empty());
    })
    .join()
    .unwrap();
}

#[test]
fn detached_initialization_reports_through_the_channel() {
    let system = test_system();
    let vessel = spawn(&system, system.root(), "vessel", "vessel");
    spawn(&system, vessel, "engine", "engine");

    let done = system.initialize_detached(vessel).unwrap();
    done.recv().unwrap().unwrap();
    assert!(system.is_initialized(vessel).unwrap());
    assert_eq!(system.children(vessel).unwrap().len(), 1);
}

#[test]
fn detached_initialization_surfaces_failures() {
    let system = test_system();
    system.set_post_initialize_callback(Some(std::sync::Arc::new(|_, _| {
        Err(keel_kernel::SolverError::new("refused"))
    })));

    let vessel = spawn(&system, system.root(), "vessel", "vessel");
    let done = system.initialize_detached(vessel).unwrap();
    let result = done.recv().unwrap();
    assert!(matches!(result, Err(KernelError::SolverFailed { .. })));
    assert!(system.is_destroyed(vessel));
}

#[test]
fn transferred_ownership_moves_to_the_calling_thread() {
    let system = test_system();
    let object = spawn(&system, system.root(), "probe", "probe");

    let sys = system.clone();
    thread::spawn(move || {
        // Without the handoff the worker has no rights at all.
        assert_eq!(sys.set_name(object, "early"), Err(KernelError::InterThreadCall));

        sys.transfer_initialization(object).unwrap();
        sys.set_name(object, "worker_probe").unwrap();
        sys.add_variable(object, "mass", VariableKind::Real).unwrap();
        sys.initialize(object).unwrap();
    })
    .join()
    .unwrap();

    assert!(system.is_initialized(object).unwrap());
    assert_eq!(system.name(object).unwrap(), "worker_probe");
    // Completed initialization closes the handoff window.
    assert_eq!(
        system.transfer_initialization(object),
        Err(KernelError::BadState)
    );
}

#[test]
fn initializing_thread_gains_structural_rights() {
    let system = test_system();
    let vessel = spawn(&system, system.root(), "vessel", "vessel");

    // A solver-style callback running on the initializing thread may
    // still add variables; this models solvers doing setup during
    // their claim check.
    system.set_pre_initialize_callback(Some(std::sync::Arc::new(|sys, _, object| {
        sys.add_variable(object, "configured", VariableKind::Real)
            .map_err(|e| keel_kernel::SolverError::new(e.to_string()))?;
        Ok(keel_kernel::PreCheck::Skip)
    })));
    // A solver must be registered for the callback to run at all.
    system
        .register_solver(std::sync::Arc::new(
            keel_test_utils::fixtures::RejectingSolver::new(),
        ))
        .unwrap();

    let done = system.initialize_detached(vessel).unwrap();
    done.recv().unwrap().unwrap();
    assert!(system.variable(vessel, "configured").is_ok());
}
