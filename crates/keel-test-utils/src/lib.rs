//! Test utilities and solver fixtures for Keel development.
//!
//! Provides canned [`Solver`] implementations for exercising the claim
//! protocol and lifecycle, plus small helpers for building test object
//! trees.
//!
//! [`Solver`]: keel_kernel::Solver

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use keel_core::ObjectId;
use keel_kernel::{System, SystemConfig};
use std::sync::Arc;

/// A fresh system with the default configuration.
pub fn test_system() -> Arc<System> {
    System::new(SystemConfig::default()).expect("default config must be valid")
}

/// Create a named, typed child of `parent`, not yet initialized.
pub fn spawn(system: &System, parent: ObjectId, name: &str, type_name: &str) -> ObjectId {
    let object = system.create(parent).expect("create failed");
    system.set_name(object, name).expect("set_name failed");
    system.set_type(object, type_name).expect("set_type failed");
    object
}

/// Create and initialize a named, typed child of `parent`.
pub fn spawn_initialized(
    system: &System,
    parent: ObjectId,
    name: &str,
    type_name: &str,
) -> ObjectId {
    let object = spawn(system, parent, name, type_name);
    system.initialize(object).expect("initialize failed");
    object
}
