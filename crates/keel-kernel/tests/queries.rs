//! Integration test: uid/name lookup and path-reference resolution.

use keel_kernel::{KernelError, ObjectUid, QueryResult, VariableKind};
use keel_test_utils::{spawn, test_system};

#[test]
fn object_lookup_by_uid() {
    let system = test_system();
    let vessel = spawn(&system, system.root(), "vessel", "vessel");
    let engine = spawn(&system, vessel, "engine", "engine");
    system.initialize(vessel).unwrap();

    let uid = system.uid(engine).unwrap();
    assert_eq!(system.object_by_uid(uid, None).unwrap(), engine);
    assert_eq!(system.object_by_uid(uid, Some(vessel)).unwrap(), engine);
    assert_eq!(
        system.object_by_uid(ObjectUid(123_456), None),
        Err(KernelError::NotFound)
    );

    // Scoped search does not escape the subtree.
    let other = spawn(&system, system.root(), "other", "vessel");
    system.initialize(other).unwrap();
    assert_eq!(
        system.object_by_uid(uid, Some(other)),
        Err(KernelError::NotFound)
    );
}

#[test]
fn object_lookup_by_name_prefers_direct_children() {
    let system = test_system();
    let vessel = spawn(&system, system.root(), "vessel", "vessel");
    let engine = spawn(&system, vessel, "engine", "engine");
    let nested = spawn(&system, engine, "vessel", "vessel");
    system.initialize(vessel).unwrap();

    // Direct child of the root wins over the deeper "vessel".
    assert_eq!(system.object_by_name("vessel", None).unwrap(), vessel);
    assert_eq!(
        system.object_by_name("vessel", Some(engine)).unwrap(),
        nested
    );
    assert_eq!(
        system.object_by_name("missing", None),
        Err(KernelError::NotFound)
    );
}

#[test]
fn reference_paths_resolve_objects_and_variables() {
    let system = test_system();
    let vessel = spawn(&system, system.root(), "vessel", "vessel");
    let engine = spawn(&system, vessel, "engine", "engine");
    system.add_real_variable(engine, "thrust", 42_000.0).unwrap();
    system.initialize(vessel).unwrap();

    match system.query_by_reference("/vessel/engine").unwrap() {
        QueryResult::Object(found) => assert_eq!(found, engine),
        QueryResult::Variable(_) => panic!("expected an object"),
    }
    match system.query_by_reference("vessel/engine/thrust").unwrap() {
        QueryResult::Variable(thrust) => assert_eq!(thrust.as_real().unwrap(), 42_000.0),
        QueryResult::Object(_) => panic!("expected a variable"),
    }
    assert!(system.query_by_reference("/vessel/reactor").is_err());
    assert!(system.query_by_reference("").is_err());
}

#[test]
fn wildcard_tries_each_child_in_order() {
    let system = test_system();
    let tug = spawn(&system, system.root(), "tug", "vessel");
    let vessel = spawn(&system, system.root(), "vessel", "vessel");
    let engine = spawn(&system, vessel, "engine", "engine");
    system.initialize(tug).unwrap();
    system.initialize(vessel).unwrap();

    // Only "vessel" has an engine; the wildcard must keep trying past
    // "tug".
    match system.query_by_reference("/*/engine").unwrap() {
        QueryResult::Object(found) => assert_eq!(found, engine),
        QueryResult::Variable(_) => panic!("expected an object"),
    }
    assert!(system.query_by_reference("/*/reactor").is_err());
}

#[test]
fn bracket_indices_select_among_repeated_nested_names() {
    let system = test_system();
    let vessel = spawn(&system, system.root(), "vessel", "vessel");
    let geometry = system
        .add_variable(vessel, "geometry", VariableKind::Nested)
        .unwrap();
    for offset in 0..3 {
        let section = system
            .variable_add_nested(&geometry, "section", VariableKind::Real)
            .unwrap();
        section.set_real(f64::from(offset)).unwrap();
    }
    system.initialize(vessel).unwrap();

    match system
        .query_by_reference("/vessel/geometry/section[2]")
        .unwrap()
    {
        QueryResult::Variable(section) => assert_eq!(section.as_real().unwrap(), 2.0),
        QueryResult::Object(_) => panic!("expected a variable"),
    }
    // A unique name with an index steps into its nested list instead.
    match system.query_by_reference("/vessel/geometry[1]").unwrap() {
        QueryResult::Variable(section) => assert_eq!(section.as_real().unwrap(), 1.0),
        QueryResult::Object(_) => panic!("expected a variable"),
    }
    assert!(system
        .query_by_reference("/vessel/geometry/section[7]")
        .is_err());
}

#[test]
fn database_namespaces_resolve_with_bracket_prefix() {
    let system = test_system();
    let materials = system.add_database("materials").unwrap();
    let steel = system
        .variable_add_nested(&materials, "steel", VariableKind::Nested)
        .unwrap();
    let density = system
        .variable_add_nested(&steel, "density", VariableKind::Real)
        .unwrap();
    density.set_real(7850.0).unwrap();

    match system.query_by_reference("[materials]/steel/density").unwrap() {
        QueryResult::Variable(found) => assert_eq!(found.as_real().unwrap(), 7850.0),
        QueryResult::Object(_) => panic!("expected a variable"),
    }
    assert!(system.query_by_reference("[alloys]/steel").is_err());
    assert_eq!(system.database_names(), vec!["materials"]);
}

#[test]
fn destroyed_objects_disappear_from_queries() {
    let system = test_system();
    let vessel = spawn(&system, system.root(), "vessel", "vessel");
    system.initialize(vessel).unwrap();
    let uid = system.uid(vessel).unwrap();

    system.destroy(vessel).unwrap();
    assert!(system.object_by_name("vessel", None).is_err());
    assert!(system.object_by_uid(uid, None).is_err());
    assert!(system.query_by_reference("/vessel").is_err());
}
