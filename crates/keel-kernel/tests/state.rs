//! Integration test: frame conversion, state-vector bookkeeping,
//! solve/integrate dispatch, and mass-property derivation.

use keel_kernel::{
    ClaimOutcome, FrameVector, KernelError, ObjectId, Quat, Solver, SolverError, StateDerivative,
    StateVector, System, TriMesh, Vec3, MASS_EPSILON,
};
use keel_test_utils::{spawn, spawn_initialized, test_system};
use std::f64::consts::FRAC_PI_2;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A station at (10,0,0), yawed 90° about z, in the root frame.
fn rotated_station(system: &System) -> ObjectId {
    let root = system.root();
    let station = spawn_initialized(system, root, "station", "station");
    let mut pose = StateVector::identity(root);
    pose.position = FrameVector::new(root, Vec3::new(10.0, 0.0, 0.0));
    pose.orientation.q = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2);
    system.set_state_vector(station, pose).unwrap();
    station
}

#[test]
fn point_conversion_round_trips_through_root() {
    let system = test_system();
    let root = system.root();
    let station = rotated_station(&system);

    let p = FrameVector::new(root, Vec3::new(11.0, 0.0, 0.0));
    let local = system.convert_point(station, p).unwrap();
    assert_eq!(local.frame, station);
    assert!(local.v.approx_eq(Vec3::new(0.0, -1.0, 0.0), 1e-9));

    let back = system.convert_point(root, local).unwrap();
    assert!(back.v.approx_eq(p.v, 1e-9));
}

#[test]
fn direction_conversion_ignores_translation() {
    let system = test_system();
    let root = system.root();
    let station = rotated_station(&system);

    let v = FrameVector::new(root, Vec3::new(1.0, 0.0, 0.0));
    let local = system.convert_direction(station, v).unwrap();
    assert!(local.v.approx_eq(Vec3::new(0.0, -1.0, 0.0), 1e-9));
    assert!((local.v.length() - 1.0).abs() < 1e-12);
}

#[test]
fn state_conversion_rewrites_every_component_frame() {
    let system = test_system();
    let root = system.root();
    let station = rotated_station(&system);

    let mut state = StateVector::identity(root);
    state.position = FrameVector::new(root, Vec3::new(10.0, 1.0, 0.0));
    state.velocity = FrameVector::new(root, Vec3::new(0.0, 2.0, 0.0));
    let local = system.convert_state(station, &state).unwrap();
    assert_eq!(local.position.frame, station);
    assert_eq!(local.orientation.frame, station);
    assert!(local.position.v.approx_eq(Vec3::new(1.0, 0.0, 0.0), 1e-9));
    assert!(local.velocity.v.approx_eq(Vec3::new(2.0, 0.0, 0.0), 1e-9));
}

#[test]
fn state_writes_snapshot_the_previous_state() {
    let system = test_system();
    let probe = spawn_initialized(&system, system.root(), "probe", "probe");
    let root = system.root();

    let mut first = StateVector::identity(root);
    first.time = 1.0;
    first.position = FrameVector::new(root, Vec3::new(0.0, 0.0, 0.0));
    system.set_state_vector(probe, first).unwrap();

    let mut second = first;
    second.time = 2.0;
    second.position = FrameVector::new(root, Vec3::new(4.0, 0.0, 0.0));
    system.set_state_vector(probe, second).unwrap();

    assert_eq!(system.previous_state_vector(probe).unwrap().time, 1.0);
    let mid = system.interpolated_state_vector(probe, 0.5).unwrap();
    assert!(mid.position.v.approx_eq(Vec3::new(2.0, 0.0, 0.0), 1e-12));
    assert_eq!(mid.time, 1.5);
    assert!(system.interpolated_state_vector(probe, f64::NAN).is_err());
}

#[test]
fn default_integrate_passes_current_rates_through() {
    let system = test_system();
    let root = system.root();
    let probe = spawn_initialized(&system, root, "probe", "probe");

    let mut state = StateVector::identity(root);
    state.velocity = FrameVector::new(root, Vec3::new(5.0, 0.0, 0.0));
    system.set_state_vector(probe, state).unwrap();

    let derivative = system.integrate(probe, 0.1, &state).unwrap();
    assert!(derivative.velocity.v.approx_eq(Vec3::new(5.0, 0.0, 0.0), 1e-12));
    assert_eq!(derivative.force.v, Vec3::ZERO);
}

#[test]
fn integrate_override_takes_precedence() {
    let system = test_system();
    let root = system.root();
    let probe = spawn_initialized(&system, root, "probe", "probe");
    system
        .set_integrate_override(
            probe,
            Some(Arc::new(|_, _, _, state: &StateVector| {
                let mut d = StateDerivative::zero(state.position.frame);
                d.acceleration = state.acceleration.with_components(Vec3::new(0.0, 0.0, -9.81));
                Ok(d)
            })),
        )
        .unwrap();

    let state = StateVector::identity(root);
    let derivative = system.integrate(probe, 0.1, &state).unwrap();
    assert!(derivative
        .acceleration
        .v
        .approx_eq(Vec3::new(0.0, 0.0, -9.81), 1e-12));
}

#[test]
fn integrate_requires_initialization() {
    let system = test_system();
    let probe = spawn(&system, system.root(), "probe", "probe");
    let state = StateVector::identity(system.root());
    assert_eq!(
        system.integrate(probe, 0.1, &state),
        Err(KernelError::NotInitialized)
    );
}

struct SolveCounter {
    calls: AtomicUsize,
}

impl Solver for SolveCounter {
    fn name(&self) -> &str {
        "counter"
    }
    fn on_initialize(
        &self,
        system: &System,
        object: ObjectId,
    ) -> Result<ClaimOutcome, SolverError> {
        let ty = system
            .type_name(object)
            .map_err(|e| SolverError::new(e.to_string()))?;
        if ty == "drone" {
            Ok(ClaimOutcome::Claim)
        } else {
            Ok(ClaimOutcome::Ignore)
        }
    }
    fn provides_solve(&self) -> bool {
        true
    }
    fn on_solve(&self, _system: &System, _object: ObjectId, _dt: f64) -> Result<(), SolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn solve_dispatches_to_the_claimed_solver() {
    let system = test_system();
    let solver = Arc::new(SolveCounter {
        calls: AtomicUsize::new(0),
    });
    system.register_solver(solver.clone()).unwrap();

    let drone = spawn(&system, system.root(), "drone", "drone");
    system.initialize(drone).unwrap();
    system.solve(drone, 0.1).unwrap();
    assert_eq!(solver.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn default_solve_recurses_into_active_children() {
    let system = test_system();
    let solver = Arc::new(SolveCounter {
        calls: AtomicUsize::new(0),
    });
    system.register_solver(solver.clone()).unwrap();

    // The carrier is unclaimed; its drone children are claimed.
    let carrier = spawn(&system, system.root(), "carrier", "carrier");
    spawn(&system, carrier, "drone_a", "drone");
    spawn(&system, carrier, "drone_b", "drone");
    system.initialize(carrier).unwrap();

    system.solve(carrier, 0.1).unwrap();
    assert_eq!(solver.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn solve_override_shadows_the_claimed_solver() {
    let system = test_system();
    let solver = Arc::new(SolveCounter {
        calls: AtomicUsize::new(0),
    });
    system.register_solver(solver.clone()).unwrap();

    let drone = spawn(&system, system.root(), "drone", "drone");
    system.initialize(drone).unwrap();

    let overridden = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&overridden);
    system
        .set_solve_override(
            drone,
            Some(Arc::new(move |_, _, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })),
        )
        .unwrap();

    system.solve(drone, 0.1).unwrap();
    assert_eq!(overridden.load(Ordering::SeqCst), 1);
    assert_eq!(solver.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn zero_mass_reads_back_as_epsilon() {
    let system = test_system();
    let tank = spawn(&system, system.root(), "tank", "tank");
    system.add_real_variable(tank, "mass", 0.0).unwrap();
    system.initialize(tank).unwrap();

    let mass = system.variable(tank, "mass").unwrap().as_real().unwrap();
    assert_eq!(mass, MASS_EPSILON);
    // The derivation also fills in cm and gyration rows.
    assert!(system.variable(tank, "cm").is_ok());
    assert!(system.variable(tank, "jx").is_ok());
}

#[test]
fn gyration_rows_derive_from_inertia_scalars() {
    let system = test_system();
    let tank = spawn(&system, system.root(), "tank", "tank");
    system.add_real_variable(tank, "mass", 100.0).unwrap();
    system.add_real_variable(tank, "ixx", 200.0).unwrap();
    system.add_real_variable(tank, "iyy", 400.0).unwrap();
    system.add_real_variable(tank, "izz", 600.0).unwrap();
    system.initialize(tank).unwrap();

    let jx = system.variable(tank, "jx").unwrap().as_vector().unwrap();
    let jy = system.variable(tank, "jy").unwrap().as_vector().unwrap();
    let jz = system.variable(tank, "jz").unwrap().as_vector().unwrap();
    assert!(jx.v.approx_eq(Vec3::new(2.0, 0.0, 0.0), 1e-12));
    assert!(jy.v.approx_eq(Vec3::new(0.0, 4.0, 0.0), 1e-12));
    assert!(jz.v.approx_eq(Vec3::new(0.0, 0.0, 6.0), 1e-12));
}

#[test]
fn mesh_provider_supplies_the_center_of_mass() {
    let system = test_system();
    system.set_mesh_provider(Some(Arc::new(|_, _| {
        Some(TriMesh {
            vertices: vec![
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
            ],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        })
    })));

    let hull = spawn(&system, system.root(), "hull", "hull");
    system.add_real_variable(hull, "mass", 50.0).unwrap();
    system.initialize(hull).unwrap();

    let cm = system.variable(hull, "cm").unwrap().as_vector().unwrap();
    assert!(cm.v.approx_eq(Vec3::new(1.5, 0.5, 0.0), 1e-9));
}

#[test]
fn massless_objects_skip_derivation() {
    let system = test_system();
    let marker = spawn(&system, system.root(), "marker", "marker");
    system.initialize(marker).unwrap();
    assert!(system.variable(marker, "cm").is_err());
    assert!(system.variable(marker, "jx").is_err());
}

#[test]
fn global_time_is_validated() {
    let system = test_system();
    assert_eq!(system.time(), 0.0);
    system.set_time(59_000.5).unwrap();
    assert_eq!(system.time(), 59_000.5);
    assert!(system.set_time(f64::INFINITY).is_err());
}
