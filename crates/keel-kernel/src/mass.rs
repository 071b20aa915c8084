//! Mass-property derivation, run once while an entity initializes.
//!
//! Entities without a `mass` variable are massless and skipped. For
//! the rest, the radius-of-gyration-squared tensor rows `jx`/`jy`/`jz`
//! and the center-of-mass vector `cm` are filled in from whatever the
//! entity's variables provide, falling back to a tessellation of the
//! entity when a mesh provider is installed. Derivation is
//! best-effort: missing inputs yield zeros, never an error.

use crate::system::System;
use crate::variable::VariableKind;
use keel_core::ObjectId;
use keel_math::{FrameVector, TriMesh, Vec3};

/// Smallest accepted mass. Declared masses at or below zero clamp here
/// so divisions by mass stay finite.
pub const MASS_EPSILON: f64 = 1e-15;

/// Per-axis input names, in derivation priority order: explicit
/// gyration scalar, inertia scalar (divided by mass), inertia tensor
/// row (divided by mass).
const AXES: [(&str, &str, &str, &str); 3] = [
    ("jx", "jxx", "ixx", "ix"),
    ("jy", "jyy", "iyy", "iy"),
    ("jz", "jzz", "izz", "iz"),
];

pub(crate) fn compute_mass_parameters(system: &System, object: ObjectId) {
    let Ok(mass_var) = system.variable(object, "mass") else {
        return;
    };
    let mut mass = mass_var.as_real().unwrap_or(0.0);
    if mass < MASS_EPSILON {
        mass = MASS_EPSILON;
        mass_var.set_real(mass).ok();
    }

    let needs_rows = AXES
        .iter()
        .any(|(row, _, _, _)| system.variable(object, row).is_err());
    let needs_cm = system.variable(object, "cm").is_err();
    let mesh = if needs_rows || needs_cm {
        fetch_mesh(system, object)
    } else {
        None
    };

    let center = match system.variable(object, "cm") {
        Ok(var) => var.as_vector().map(|v| v.v).unwrap_or(Vec3::ZERO),
        Err(_) => {
            let centroid = mesh
                .as_ref()
                .map(TriMesh::area_weighted_centroid)
                .unwrap_or(Vec3::ZERO);
            if let Ok(var) = system.add_variable(object, "cm", VariableKind::Vector) {
                var.set_vector(FrameVector::new(object, centroid)).ok();
            }
            centroid
        }
    };

    if !needs_rows {
        return;
    }
    let mesh_rows = mesh
        .as_ref()
        .map(|m| m.gyration_tensor(center))
        .unwrap_or((Vec3::ZERO, Vec3::ZERO, Vec3::ZERO));

    for (axis, (row_name, gyration_scalar, inertia_scalar, inertia_row)) in
        AXES.into_iter().enumerate()
    {
        if system.variable(object, row_name).is_ok() {
            continue;
        }
        let row = if let Some(j) = scalar(system, object, gyration_scalar) {
            principal(axis, j)
        } else if let Some(i) = scalar(system, object, inertia_scalar) {
            principal(axis, i / mass)
        } else if let Some(v) = vector(system, object, inertia_row) {
            v.scaled(1.0 / mass)
        } else {
            match axis {
                0 => mesh_rows.0,
                1 => mesh_rows.1,
                _ => mesh_rows.2,
            }
        };
        if let Ok(var) = system.add_variable(object, row_name, VariableKind::Vector) {
            var.set_vector(FrameVector::new(object, row)).ok();
        }
    }
}

fn fetch_mesh(system: &System, object: ObjectId) -> Option<TriMesh> {
    let provider = system.callbacks.read().unwrap().mesh_provider.clone()?;
    let mesh = provider(system, object)?;
    if mesh.is_degenerate() {
        None
    } else {
        Some(mesh)
    }
}

fn scalar(system: &System, object: ObjectId, name: &str) -> Option<f64> {
    system
        .variable(object, name)
        .ok()
        .and_then(|var| var.as_real().ok())
}

fn vector(system: &System, object: ObjectId, name: &str) -> Option<Vec3> {
    system
        .variable(object, name)
        .ok()
        .and_then(|var| var.as_vector().ok())
        .map(|v| v.v)
}

fn principal(axis: usize, value: f64) -> Vec3 {
    match axis {
        0 => Vec3::new(value, 0.0, 0.0),
        1 => Vec3::new(0.0, value, 0.0),
        _ => Vec3::new(0.0, 0.0, value),
    }
}
