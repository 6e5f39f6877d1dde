//! Creation and deletion ordering

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::ResourceError;
use crate::model::{ResourceName, ResourceType};
use crate::registry::TypeLookup;

use super::dependencies::get_all_dependencies;

/// Order `types` so that every type comes after everything it depends on
///
/// Only the given types appear in the result, but dependencies reached
/// through types outside the set still constrain the order. Types without an
/// ordering constraint between them keep their input order. Repeated input
/// entries are collapsed to the first occurrence.
pub fn get_creation_order(
    types: &[Arc<ResourceType>],
    lookup: &impl TypeLookup,
) -> Result<Vec<Arc<ResourceType>>, ResourceError> {
    let mut nodes: Vec<&Arc<ResourceType>> = Vec::with_capacity(types.len());
    let mut index: HashMap<&ResourceName, usize> = HashMap::new();
    for ty in types {
        if index.contains_key(ty.name()) {
            tracing::warn!(resource = %ty.name(), "duplicate entry ignored while ordering");
            continue;
        }
        index.insert(ty.name(), nodes.len());
        nodes.push(ty);
    }

    let n = nodes.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (i, ty) in nodes.iter().enumerate() {
        for dep in get_all_dependencies(ty, lookup)? {
            if let Some(&dep_idx) = index.get(dep.name()) {
                dependents[dep_idx].push(i);
                in_degree[i] += 1;
            }
        }
    }

    // Kahn's algorithm; the ready set always yields the lowest input index
    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, deg)| **deg == 0)
        .map(|(i, _)| i)
        .collect();

    let mut sorted: Vec<Arc<ResourceType>> = Vec::with_capacity(n);
    while let Some(idx) = ready.pop_first() {
        sorted.push(Arc::clone(nodes[idx]));
        for &dependent in &dependents[idx] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if sorted.len() != n {
        let remaining: Vec<bool> = in_degree.iter().map(|deg| *deg > 0).collect();
        let in_cycle: Vec<String> = cycle_members(&dependents, &remaining)
            .into_iter()
            .map(|i| nodes[i].name().to_string())
            .collect();
        return Err(ResourceError::cyclic(in_cycle));
    }

    tracing::debug!(
        order = ?sorted.iter().map(|t| t.name().as_str()).collect::<Vec<_>>(),
        "computed creation order"
    );
    Ok(sorted)
}

/// The exact reverse of [`get_creation_order`]
pub fn get_deletion_order(
    types: &[Arc<ResourceType>],
    lookup: &impl TypeLookup,
) -> Result<Vec<Arc<ResourceType>>, ResourceError> {
    let mut order = get_creation_order(types, lookup)?;
    order.reverse();
    Ok(order)
}

/// Unplaced nodes that lie on a cycle
///
/// Nodes left over by Kahn's algorithm include everything downstream of a
/// cycle; only those that can reach themselves are reported.
fn cycle_members(dependents: &[Vec<usize>], remaining: &[bool]) -> Vec<usize> {
    (0..dependents.len())
        .filter(|&start| remaining[start] && reaches_itself(dependents, remaining, start))
        .collect()
}

fn reaches_itself(dependents: &[Vec<usize>], remaining: &[bool], start: usize) -> bool {
    let mut seen = vec![false; dependents.len()];
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        for &next in &dependents[node] {
            if next == start {
                return true;
            }
            if remaining[next] && !seen[next] {
                seen[next] = true;
                stack.push(next);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassRef, ResourceDefinition};
    use crate::registry::{create_decorator, ResourceRegistry};

    fn names(types: &[Arc<ResourceType>]) -> Vec<&str> {
        types.iter().map(|t| t.name().as_str()).collect()
    }

    /// A (no deps), B -> A, C -> B
    fn chain(registry: &ResourceRegistry) -> (Arc<ResourceType>, Arc<ResourceType>, Arc<ResourceType>) {
        let mark = create_decorator(registry);
        let a = mark.mark(ResourceDefinition::new("A").field("name", "a")).expect("register");
        let b = mark
            .mark(ResourceDefinition::new("B").field("parent", &a).field("parent_id", a.id()))
            .expect("register");
        let c = mark
            .mark(ResourceDefinition::new("C").field("source", &b).field("source_id", b.id()))
            .expect("register");
        (a, b, c)
    }

    #[test]
    fn test_creation_order_puts_dependencies_first() {
        let registry = ResourceRegistry::new();
        let (a, b, c) = chain(&registry);

        let order = get_creation_order(&[c, a, b], &registry).expect("acyclic");
        assert_eq!(names(&order), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_deletion_order_is_reverse() {
        let registry = ResourceRegistry::new();
        let (a, b, c) = chain(&registry);
        let input = [c, a, b];

        let creation = get_creation_order(&input, &registry).expect("acyclic");
        let deletion = get_deletion_order(&input, &registry).expect("acyclic");
        assert_eq!(names(&deletion), vec!["C", "B", "A"]);

        let mut reversed = creation;
        reversed.reverse();
        assert_eq!(names(&deletion), names(&reversed));
    }

    #[test]
    fn test_unconstrained_types_keep_input_order() {
        let registry = ResourceRegistry::new();
        let mark = create_decorator(&registry);
        let x = mark.mark(ResourceDefinition::new("X")).expect("register");
        let y = mark.mark(ResourceDefinition::new("Y")).expect("register");
        let z = mark.mark(ResourceDefinition::new("Z")).expect("register");

        let order = get_creation_order(&[z.clone(), x.clone(), y.clone()], &registry).expect("acyclic");
        assert_eq!(names(&order), vec!["Z", "X", "Y"]);
        let order = get_creation_order(&[y, z, x], &registry).expect("acyclic");
        assert_eq!(names(&order), vec!["Y", "Z", "X"]);
    }

    #[test]
    fn test_transitive_constraint_through_excluded_type() {
        let registry = ResourceRegistry::new();
        let (a, _b, c) = chain(&registry);

        let order = get_creation_order(&[c, a], &registry).expect("acyclic");
        assert_eq!(names(&order), vec!["A", "C"]);
    }

    #[test]
    fn test_duplicate_inputs_collapse() {
        let registry = ResourceRegistry::new();
        let (a, b, _c) = chain(&registry);

        let order = get_creation_order(&[b.clone(), a, b], &registry).expect("acyclic");
        assert_eq!(names(&order), vec!["A", "B"]);
    }

    #[test]
    fn test_cycle_fails_without_partial_order() {
        let registry = ResourceRegistry::new();
        let mark = create_decorator(&registry);
        let free = mark.mark(ResourceDefinition::new("Free")).expect("register");
        let a = mark
            .mark(ResourceDefinition::new("A").field("b", ClassRef::new("B")))
            .expect("register");
        let b = mark
            .mark(ResourceDefinition::new("B").field("a", ClassRef::new("A")))
            .expect("register");

        let err = get_creation_order(&[free, a, b], &registry).unwrap_err();
        match err {
            ResourceError::CyclicDependency { cycle } => {
                assert!(cycle.contains(&"A".to_string()));
                assert!(cycle.contains(&"B".to_string()));
            }
            other => panic!("Expected CyclicDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_stalled_downstream_nodes_are_not_cycle_members() {
        // 0 <-> 1 form a cycle, 2 depends on 1, 3 was already placed
        let dependents = vec![vec![1], vec![0, 2], vec![], vec![2]];
        let remaining = vec![true, true, true, false];
        assert_eq!(cycle_members(&dependents, &remaining), vec![0, 1]);

        // 4 sits between two cycles without being on either
        let dependents = vec![vec![1], vec![0, 4], vec![3], vec![2], vec![2]];
        let remaining = vec![true; 5];
        assert_eq!(cycle_members(&dependents, &remaining), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_input() {
        let registry = ResourceRegistry::new();
        assert!(get_creation_order(&[], &registry).expect("empty").is_empty());
        assert!(get_deletion_order(&[], &registry).expect("empty").is_empty());
    }
}
