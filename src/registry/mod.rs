//! Registry of resource types
//!
//! The registry is append-only during a load phase and read-only afterwards.
//! Registration takes an exclusive lock; analysis, ordering and rendering
//! work on a [`RegistrySnapshot`] so they never observe a partially populated
//! graph.

mod decorator;

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::ResourceError;
use crate::model::{ResourceName, ResourceType};

pub use decorator::{create_decorator, Decorator};

/// Name-based access to resource types
pub trait TypeLookup {
    /// Find a type by name
    fn lookup(&self, name: &ResourceName) -> Option<Arc<ResourceType>>;
}

/// Insertion-ordered collection of registered resource types
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    types: RwLock<IndexMap<ResourceName, Arc<ResourceType>>>,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, failing if its name is already taken
    ///
    /// A failed registration leaves the registry unchanged.
    pub fn register(&self, ty: Arc<ResourceType>) -> Result<(), ResourceError> {
        let mut types = self.types.write();
        if types.contains_key(ty.name()) {
            return Err(ResourceError::duplicate(ty.name().as_str()));
        }
        tracing::debug!(resource = %ty.name(), unit = ?ty.unit(), "registered resource type");
        types.insert(ty.name().clone(), ty);
        Ok(())
    }

    /// Register several types at once; either all are added or none
    pub fn register_all(&self, batch: Vec<Arc<ResourceType>>) -> Result<(), ResourceError> {
        let mut types = self.types.write();
        let mut seen = std::collections::HashSet::new();
        for ty in &batch {
            if types.contains_key(ty.name()) || !seen.insert(ty.name()) {
                return Err(ResourceError::duplicate(ty.name().as_str()));
            }
        }
        for ty in batch {
            tracing::debug!(resource = %ty.name(), unit = ?ty.unit(), "registered resource type");
            types.insert(ty.name().clone(), ty);
        }
        Ok(())
    }

    /// Check whether a type with this name is registered
    pub fn contains(&self, name: &ResourceName) -> bool {
        self.types.read().contains_key(name)
    }

    /// Get a type by name
    pub fn get(&self, name: &ResourceName) -> Option<Arc<ResourceType>> {
        self.types.read().get(name).cloned()
    }

    /// All registered types in insertion order
    pub fn all(&self) -> Vec<Arc<ResourceType>> {
        self.types.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Take a consistent copy of the current contents
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            types: self.types.read().clone(),
        }
    }

    /// Drop every registration, returning the registry to its initial state
    pub fn reset(&self) {
        self.types.write().clear();
    }
}

impl TypeLookup for ResourceRegistry {
    fn lookup(&self, name: &ResourceName) -> Option<Arc<ResourceType>> {
        self.get(name)
    }
}

/// Point-in-time copy of a registry's contents
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    types: IndexMap<ResourceName, Arc<ResourceType>>,
}

impl RegistrySnapshot {
    /// Types in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceType>> {
        self.types.values()
    }

    pub fn contains(&self, name: &ResourceName) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeLookup for RegistrySnapshot {
    fn lookup(&self, name: &ResourceName) -> Option<Arc<ResourceType>> {
        self.types.get(name).cloned()
    }
}

impl FromIterator<Arc<ResourceType>> for RegistrySnapshot {
    fn from_iter<I: IntoIterator<Item = Arc<ResourceType>>>(iter: I) -> Self {
        Self {
            types: iter
                .into_iter()
                .map(|ty| (ty.name().clone(), ty))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceDefinition;

    fn make_type(name: &str) -> Arc<ResourceType> {
        Arc::new(ResourceType::from_definition(ResourceDefinition::new(name)))
    }

    #[test]
    fn test_registry_register_and_get() {
        let registry = ResourceRegistry::new();
        registry.register(make_type("Bucket")).expect("Should register");

        assert!(registry.contains(&"Bucket".into()));
        assert!(registry.get(&"Bucket".into()).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_duplicate_error() {
        let registry = ResourceRegistry::new();
        registry
            .register(make_type("Bucket"))
            .expect("First register should succeed");

        let result = registry.register(make_type("Bucket"));
        assert!(matches!(result, Err(ResourceError::DuplicateName { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_preserves_insertion_order() {
        let registry = ResourceRegistry::new();
        for name in ["C", "A", "B"] {
            registry.register(make_type(name)).expect("Should register");
        }

        let names: Vec<String> = registry.all().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        // restartable
        assert_eq!(registry.all().len(), 3);
    }

    #[test]
    fn test_register_all_is_atomic() {
        let registry = ResourceRegistry::new();
        registry.register(make_type("A")).expect("Should register");

        let result = registry.register_all(vec![make_type("B"), make_type("A")]);
        assert!(matches!(result, Err(ResourceError::DuplicateName { ref name }) if name == "A"));
        assert!(!registry.contains(&"B".into()));

        let result = registry.register_all(vec![make_type("C"), make_type("C")]);
        assert!(result.is_err());
        assert!(!registry.contains(&"C".into()));
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_registration() {
        let registry = ResourceRegistry::new();
        registry.register(make_type("A")).expect("Should register");
        let snapshot = registry.snapshot();
        registry.register(make_type("B")).expect("Should register");

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.lookup(&"B".into()).is_none());
        assert!(registry.lookup(&"B".into()).is_some());
    }

    #[test]
    fn test_reset_clears_registry() {
        let registry = ResourceRegistry::new();
        registry.register(make_type("A")).expect("Should register");
        registry.reset();
        assert!(registry.is_empty());
    }
}
