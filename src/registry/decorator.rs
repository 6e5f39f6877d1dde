//! Registration factory: marks resource definitions into a registry

use std::sync::Arc;

use super::ResourceRegistry;
use crate::error::ResourceError;
use crate::model::{ResourceDefinition, ResourceType};

/// Create a marking operation bound to `registry`
pub fn create_decorator(registry: &ResourceRegistry) -> Decorator<'_> {
    Decorator { registry }
}

/// Marks definitions: normalizes their fields and registers the result
#[derive(Debug, Clone, Copy)]
pub struct Decorator<'r> {
    registry: &'r ResourceRegistry,
}

impl<'r> Decorator<'r> {
    /// The registry this decorator enrolls types in
    pub fn registry(&self) -> &'r ResourceRegistry {
        self.registry
    }

    /// Normalize and register a definition
    ///
    /// Returns the registered type, which is the handle used to build
    /// references (`class_ref`, `id`, `attr`) and instances. A default that
    /// contradicts its kind annotation is rejected before registration.
    pub fn mark(&self, definition: ResourceDefinition) -> Result<Arc<ResourceType>, ResourceError> {
        definition.validate()?;
        let ty = Arc::new(ResourceType::from_definition(definition));
        self.registry.register(Arc::clone(&ty))?;
        Ok(ty)
    }

    /// Normalize and register a batch of definitions atomically
    pub fn mark_all(
        &self,
        definitions: Vec<ResourceDefinition>,
    ) -> Result<Vec<Arc<ResourceType>>, ResourceError> {
        for definition in &definitions {
            definition.validate()?;
        }
        let types: Vec<Arc<ResourceType>> = definitions
            .into_iter()
            .map(|d| Arc::new(ResourceType::from_definition(d)))
            .collect();
        self.registry.register_all(types.clone())?;
        Ok(types)
    }
}
