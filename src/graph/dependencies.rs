//! Dependency extraction from field defaults

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ResourceError;
use crate::model::{ResourceName, ResourceType};
use crate::registry::TypeLookup;

/// Names of the types `ty` references directly, in first-occurrence order
///
/// A reference from a type to itself is kept; it is reported as a cycle by
/// [`get_all_dependencies`].
pub fn direct_dependencies(ty: &ResourceType) -> Vec<ResourceName> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for field in ty.fields() {
        for reference in field.default.references() {
            let target = reference.target();
            if seen.insert(target) {
                out.push(target.clone());
            }
        }
    }
    out
}

/// Every type `ty` depends on, directly or transitively
///
/// Results are deduplicated and listed in discovery order. Shared transitive
/// dependencies are visited once. Fails with `CyclicDependency` when a type
/// is reached again while still on the exploration path, and with
/// `UnknownReference` when a target cannot be found through `lookup`.
pub fn get_all_dependencies(
    ty: &ResourceType,
    lookup: &impl TypeLookup,
) -> Result<Vec<Arc<ResourceType>>, ResourceError> {
    let mut walk = Walk {
        lookup,
        path: vec![ty.name().clone()],
        done: HashSet::new(),
        found: Vec::new(),
    };
    walk.visit(ty)?;
    Ok(walk.found)
}

struct Walk<'l, L> {
    lookup: &'l L,
    /// Types currently being explored, root first
    path: Vec<ResourceName>,
    /// Types whose dependencies are fully explored
    done: HashSet<ResourceName>,
    found: Vec<Arc<ResourceType>>,
}

impl<L: TypeLookup> Walk<'_, L> {
    fn visit(&mut self, ty: &ResourceType) -> Result<(), ResourceError> {
        for target in direct_dependencies(ty) {
            if let Some(pos) = self.path.iter().position(|n| *n == target) {
                let mut cycle: Vec<String> = self.path[pos..].iter().map(|n| n.to_string()).collect();
                cycle.push(target.to_string());
                return Err(ResourceError::cyclic(cycle));
            }
            if self.done.contains(&target) {
                continue;
            }

            let dep = self
                .lookup
                .lookup(&target)
                .ok_or_else(|| ResourceError::unknown_reference(target.as_str(), ty.name().as_str()))?;

            tracing::trace!(from = %ty.name(), to = %target, "dependency edge");
            self.path.push(target.clone());
            self.visit(&dep)?;
            self.path.pop();

            self.done.insert(target);
            self.found.push(dep);
        }
        Ok(())
    }
}
