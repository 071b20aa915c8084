//! Integration test: the solver claim protocol.
//!
//! Every object is offered to registered solvers in registration order
//! exactly once, during its initialization. The first claim wins and
//! is exclusive; a solver error aborts the initialization and destroys
//! the object.

use keel_kernel::{Claim, KernelError, PreCheck, SolverId};
use keel_test_utils::fixtures::{FailingSolver, RejectingSolver, TypeClaimSolver};
use keel_test_utils::{spawn, test_system};
use std::sync::Arc;

#[test]
fn first_matching_solver_claims_exclusively() {
    let system = test_system();
    let first = Arc::new(TypeClaimSolver::new("first", "tank*"));
    let second = Arc::new(TypeClaimSolver::new("second", "tank*"));
    system.register_solver(first.clone()).unwrap();
    system.register_solver(second.clone()).unwrap();

    let tank = spawn(&system, system.root(), "tank", "tank.fuel");
    system.initialize(tank).unwrap();

    assert_eq!(system.claim(tank).unwrap(), Claim::ClaimedBy(SolverId(0)));
    assert_eq!(first.claim_count(), 1);
    assert_eq!(second.claim_count(), 0);
}

#[test]
fn unmatched_objects_stay_unclaimed_after_full_offer_round() {
    let system = test_system();
    let rejecting = Arc::new(RejectingSolver::new());
    system.register_solver(rejecting.clone()).unwrap();

    let probe = spawn(&system, system.root(), "probe", "probe");
    system.initialize(probe).unwrap();

    assert_eq!(system.claim(probe).unwrap(), Claim::Unclaimed);
    assert_eq!(rejecting.offer_count(), 1);
    assert_eq!(system.metrics().claim_offers, 1);
}

#[test]
fn solver_error_during_claim_destroys_the_object() {
    let system = test_system();
    system
        .register_solver(Arc::new(FailingSolver::new("cursed*")))
        .unwrap();

    let object = spawn(&system, system.root(), "doomed", "cursed.artifact");
    let err = system.initialize(object).unwrap_err();
    assert!(matches!(err, KernelError::SolverFailed { .. }));
    assert!(system.is_destroyed(object));
    assert_eq!(system.metrics().claim_failures, 1);
}

#[test]
fn failing_child_is_destroyed_but_the_parent_still_initializes() {
    let system = test_system();
    system
        .register_solver(Arc::new(FailingSolver::new("cursed*")))
        .unwrap();

    let vessel = spawn(&system, system.root(), "vessel", "vessel");
    let relic = spawn(&system, vessel, "relic", "cursed.relic");
    system.initialize(vessel).unwrap();

    assert!(system.is_initialized(vessel).unwrap());
    assert!(system.is_destroyed(relic));
    // The aborted initialization does not pin the slot.
    assert_eq!(system.cleanup().reclaimed, 1);
}

#[test]
fn claimed_solver_is_notified_on_destroy() {
    let system = test_system();
    let solver = Arc::new(TypeClaimSolver::new("tank", "tank*"));
    system.register_solver(solver.clone()).unwrap();

    let tank = spawn(&system, system.root(), "tank", "tank.fuel");
    system.initialize(tank).unwrap();
    system.destroy(tank).unwrap();
    assert_eq!(solver.deinit_count(), 1);
}

#[test]
fn pre_initialize_skip_suppresses_an_offer() {
    let system = test_system();
    let solver = Arc::new(TypeClaimSolver::new("tank", "tank*"));
    system.register_solver(solver.clone()).unwrap();
    system.set_pre_initialize_callback(Some(Arc::new(|_, _, _| Ok(PreCheck::Skip))));

    let tank = spawn(&system, system.root(), "tank", "tank.fuel");
    system.initialize(tank).unwrap();

    assert_eq!(system.claim(tank).unwrap(), Claim::Unclaimed);
    assert_eq!(solver.claim_count(), 0);
    assert_eq!(system.metrics().claim_offers, 0);
}

#[test]
fn pre_initialize_can_force_a_claim() {
    let system = test_system();
    // The solver itself would ignore the probe; the callback overrides.
    let solver = Arc::new(TypeClaimSolver::new("tank", "tank*"));
    system.register_solver(solver.clone()).unwrap();
    system.set_pre_initialize_callback(Some(Arc::new(|_, _, _| Ok(PreCheck::Claim))));

    let probe = spawn(&system, system.root(), "probe", "probe");
    system.initialize(probe).unwrap();

    assert_eq!(system.claim(probe).unwrap(), Claim::ClaimedBy(SolverId(0)));
    // The solver's own check never ran.
    assert_eq!(solver.claim_count(), 0);
}

#[test]
fn post_initialize_error_destroys_the_object() {
    let system = test_system();
    system.set_post_initialize_callback(Some(Arc::new(|_, _| {
        Err(keel_kernel::SolverError::new("veto"))
    })));

    let probe = spawn(&system, system.root(), "probe", "probe");
    let err = system.initialize(probe).unwrap_err();
    assert!(matches!(err, KernelError::SolverFailed { .. }));
    assert!(system.is_destroyed(probe));
}

#[test]
fn startup_failure_unregisters_the_solver() {
    struct BadStartup;
    impl keel_kernel::Solver for BadStartup {
        fn name(&self) -> &str {
            "bad_startup"
        }
        fn on_startup(
            &self,
            _system: &keel_kernel::System,
        ) -> Result<(), keel_kernel::SolverError> {
            Err(keel_kernel::SolverError::new("no capacity"))
        }
        fn on_initialize(
            &self,
            _system: &keel_kernel::System,
            _object: keel_kernel::ObjectId,
        ) -> Result<keel_kernel::ClaimOutcome, keel_kernel::SolverError> {
            Ok(keel_kernel::ClaimOutcome::Ignore)
        }
    }

    let system = test_system();
    assert!(system.register_solver(Arc::new(BadStartup)).is_err());
    assert_eq!(system.solver_count(), 0);
}

#[test]
fn children_are_offered_before_their_parent() {
    let system = test_system();
    let solver = Arc::new(TypeClaimSolver::new("any", "*"));
    system.register_solver(solver.clone()).unwrap();

    let vessel = spawn(&system, system.root(), "vessel", "vessel");
    let engine = spawn(&system, vessel, "engine", "engine");
    system.initialize(vessel).unwrap();

    // Both were claimed in one pass, child first.
    assert!(system.is_initialized(engine).unwrap());
    assert_eq!(solver.claim_count(), 2);
    assert!(matches!(
        system.claim(engine).unwrap(),
        Claim::ClaimedBy(_)
    ));
}
