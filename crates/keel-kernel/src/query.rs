//! Lookups: by uid, by name, and by path reference.
//!
//! Path references address both objects and variables with one
//! syntax:
//!
//! ```text
//! /vessel/engine/nozzle        object by nested name, from the root
//! /vessel/geometry/section[4]  fifth "section" nested variable
//! /*/engine                    any first-level object with an "engine" child
//! [materials]/steel/density    variable inside the "materials" database
//! ```
//!
//! Name components resolve against child objects first, then against
//! the current object's variables. A `*` component tries every child
//! in order and commits to the first one under which the rest of the
//! path resolves. Indices are zero-based; `name[i]` selects among
//! same-named entries, or indexes into the single entry's nested list
//! when only one entry carries the name.

use crate::system::System;
use crate::variable::Variable;
use crate::KernelResult;
use keel_core::{KernelError, ObjectId, ObjectUid};
use std::sync::Arc;

/// What a path reference resolved to.
#[derive(Clone, Debug)]
pub enum QueryResult {
    /// The path named an object.
    Object(ObjectId),
    /// The path named a variable (top-level or nested).
    Variable(Arc<Variable>),
}

/// Resolution cursor while walking path components.
#[derive(Clone)]
enum Cursor {
    Object(ObjectId),
    Variable(Arc<Variable>),
}

impl System {
    /// Find an entity by uid. With a scope, searches that subtree
    /// (scope included); without, scans every live entity in creation
    /// order.
    pub fn object_by_uid(
        &self,
        uid: ObjectUid,
        scope: Option<ObjectId>,
    ) -> KernelResult<ObjectId> {
        match scope {
            None => {
                for object in self.entities() {
                    if let Ok(entity) = self.resolve_live(object) {
                        if *entity.uid.lock().unwrap() == uid {
                            return Ok(object);
                        }
                    }
                }
                Err(KernelError::NotFound)
            }
            Some(scope) => self.uid_in_subtree(uid, scope),
        }
    }

    fn uid_in_subtree(&self, uid: ObjectUid, object: ObjectId) -> KernelResult<ObjectId> {
        let entity = self.resolve_live(object)?;
        if *entity.uid.lock().unwrap() == uid {
            return Ok(object);
        }
        for child in entity.raw_children_snapshot() {
            if let Ok(found) = self.uid_in_subtree(uid, child) {
                return Ok(found);
            }
        }
        Err(KernelError::NotFound)
    }

    /// Find an entity by name. Direct children of the scope (the root
    /// when unscoped) are preferred over deeper matches.
    pub fn object_by_name(
        &self,
        name: &str,
        scope: Option<ObjectId>,
    ) -> KernelResult<ObjectId> {
        let scope = scope.unwrap_or_else(|| self.root());
        let entity = self.resolve_live(scope)?;
        let children = entity.raw_children_snapshot();
        for &child in &children {
            if let Ok(child_entity) = self.resolve_live(child) {
                if *child_entity.name.read().unwrap() == name {
                    return Ok(child);
                }
            }
        }
        for child in children {
            if let Ok(found) = self.object_by_name(name, Some(child)) {
                return Ok(found);
            }
        }
        Err(KernelError::NotFound)
    }

    /// Resolve a path reference to an object or variable.
    pub fn query_by_reference(&self, reference: &str) -> KernelResult<QueryResult> {
        let mut rest = reference.trim();
        if rest.is_empty() {
            return Err(KernelError::BadParameter);
        }
        let cursor = if let Some(after) = rest.strip_prefix('[') {
            let end = after.find(']').ok_or(KernelError::BadParameter)?;
            let database = self.database(&after[..end])?;
            rest = &after[end + 1..];
            Cursor::Variable(database)
        } else {
            Cursor::Object(self.root())
        };
        let components: Vec<&str> = rest.split('/').filter(|c| !c.is_empty()).collect();
        self.walk(cursor, &components)
    }

    fn walk(&self, cursor: Cursor, components: &[&str]) -> KernelResult<QueryResult> {
        let Some((&head, tail)) = components.split_first() else {
            return Ok(match cursor {
                Cursor::Object(object) => QueryResult::Object(object),
                Cursor::Variable(variable) => QueryResult::Variable(variable),
            });
        };

        if head == "*" {
            for candidate in self.wildcard_candidates(&cursor)? {
                if let Ok(result) = self.walk(candidate, tail) {
                    return Ok(result);
                }
            }
            return Err(KernelError::NotFound);
        }

        let (name, index) = parse_component(head)?;
        match cursor {
            Cursor::Object(object) => {
                let entity = self.resolve_live(object)?;
                let matches: Vec<ObjectId> = entity
                    .raw_children_snapshot()
                    .into_iter()
                    .filter(|&child| {
                        self.resolve_live(child)
                            .map(|c| *c.name.read().unwrap() == name)
                            .unwrap_or(false)
                    })
                    .collect();
                if !matches.is_empty() {
                    let chosen = *matches.get(index.unwrap_or(0)).ok_or(KernelError::NotFound)?;
                    return self.walk(Cursor::Object(chosen), tail);
                }
                let variable = self.variable(object, name)?;
                let next = match index {
                    None => variable,
                    Some(i) => variable.nested_at(i)?,
                };
                self.walk(Cursor::Variable(next), tail)
            }
            Cursor::Variable(variable) => {
                let matches = variable.nested_all(name);
                let next = match (matches.len(), index) {
                    (0, _) => return Err(KernelError::NotFound),
                    (_, None) => Arc::clone(&matches[0]),
                    (1, Some(i)) => matches[0].nested_at(i)?,
                    (_, Some(i)) => {
                        Arc::clone(matches.get(i).ok_or(KernelError::NotFound)?)
                    }
                };
                self.walk(Cursor::Variable(next), tail)
            }
        }
    }

    /// What a `*` component can step into: child objects, then the
    /// object's variables; for a variable cursor, its nested list.
    fn wildcard_candidates(&self, cursor: &Cursor) -> KernelResult<Vec<Cursor>> {
        match cursor {
            Cursor::Object(object) => {
                let entity = self.resolve_live(*object)?;
                let mut candidates: Vec<Cursor> = entity
                    .raw_children_snapshot()
                    .into_iter()
                    .map(Cursor::Object)
                    .collect();
                candidates.extend(self.variables(*object)?.into_iter().map(Cursor::Variable));
                Ok(candidates)
            }
            Cursor::Variable(variable) => {
                Ok(variable.nested_list().into_iter().map(Cursor::Variable).collect())
            }
        }
    }
}

/// Split `name[3]` into `("name", Some(3))`; plain names pass through.
fn parse_component(component: &str) -> KernelResult<(&str, Option<usize>)> {
    let Some(open) = component.find('[') else {
        return Ok((component, None));
    };
    let inner = component[open..]
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or(KernelError::BadParameter)?;
    let index = inner.parse().map_err(|_| KernelError::BadParameter)?;
    Ok((&component[..open], Some(index)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_parsing() {
        assert_eq!(parse_component("engine").unwrap(), ("engine", None));
        assert_eq!(parse_component("section[4]").unwrap(), ("section", Some(4)));
        assert!(parse_component("section[").is_err());
        assert!(parse_component("section[x]").is_err());
    }
}
