//! Type-string matching with trailing-wildcard support.
//!
//! Object type strings are free-form; solvers recognize the objects they
//! want to claim by comparing types against a pattern. A pattern ending
//! in `*` matches any type sharing the prefix, so `"fuel_tank*"` claims
//! `"fuel_tank"`, `"fuel_tank.spherical"`, and so on.

/// Check whether `type_name` matches `pattern`.
///
/// An exact comparison unless `pattern` ends with `*`, in which case the
/// prefix before the `*` is matched. A bare `"*"` matches every type,
/// including the empty one.
///
/// # Examples
///
/// ```
/// use keel_core::type_matches;
///
/// assert!(type_matches("fuel_tank", "fuel_tank"));
/// assert!(type_matches("fuel_tank*", "fuel_tank.spherical"));
/// assert!(!type_matches("fuel_tank", "fuel_tank.spherical"));
/// assert!(type_matches("*", ""));
/// ```
#[must_use]
pub fn type_matches(pattern: &str, type_name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => type_name.starts_with(prefix),
        None => pattern == type_name,
    }
}
