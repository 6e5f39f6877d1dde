//! Definition units and the namespace they are evaluated against

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::error::{ParseError, ResourceError};
use crate::model::{ResourceDefinition, ResourceName, ResourceType};

/// Errors a unit reports while evaluating
#[derive(Debug, Error)]
pub enum UnitError {
    /// Names the unit needs that are not loaded yet; the loader may retry
    #[error("unresolved names: {}", names.join(", "))]
    Unresolved { names: Vec<String> },

    /// The unit's source could not be parsed
    #[error("{} syntax error(s)", errors.len())]
    Parse { errors: Vec<ParseError> },

    /// A definition the unit produced was rejected
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Any other failure; not retried
    #[error("{0}")]
    Custom(String),
}

impl UnitError {
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::Unresolved {
            names: vec![name.into()],
        }
    }
}

/// Resource types visible by name to units being loaded
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    entries: IndexMap<ResourceName, Arc<ResourceType>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry under the type's own name
    pub fn insert(&mut self, ty: Arc<ResourceType>) {
        self.entries.insert(ty.name().clone(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ResourceType>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names in the order they became visible
    pub fn names(&self) -> impl Iterator<Item = &ResourceName> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceType>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<Arc<ResourceType>> for Namespace {
    fn extend<I: IntoIterator<Item = Arc<ResourceType>>>(&mut self, iter: I) {
        for ty in iter {
            self.insert(ty);
        }
    }
}

/// What a unit sees while it is evaluated
#[derive(Debug)]
pub struct UnitScope<'s> {
    unit: &'s str,
    namespace: &'s Namespace,
}

impl<'s> UnitScope<'s> {
    pub fn new(unit: &'s str, namespace: &'s Namespace) -> Self {
        Self { unit, namespace }
    }

    /// Name of the unit being evaluated
    pub fn unit(&self) -> &str {
        self.unit
    }

    pub fn contains(&self, name: &str) -> bool {
        self.namespace.contains(name)
    }

    /// Look up a previously loaded type by name
    pub fn resolve(&self, name: &str) -> Result<Arc<ResourceType>, UnitError> {
        self.namespace
            .get(name)
            .cloned()
            .ok_or_else(|| UnitError::unresolved(name))
    }

    /// Names from `wanted` that are not visible, deduplicated in order
    pub fn missing<'n>(&self, wanted: impl IntoIterator<Item = &'n str>) -> Vec<String> {
        let mut seen = HashSet::new();
        wanted
            .into_iter()
            .filter(|name| !self.contains(name) && seen.insert(*name))
            .map(str::to_string)
            .collect()
    }
}

/// A unit of resource definitions, such as one source file
pub trait DefinitionUnit {
    /// Unit name; recorded as the defining unit of every type it produces
    fn name(&self) -> &str;

    /// Produce this unit's definitions
    ///
    /// Returning [`UnitError::Unresolved`] defers the unit until more names
    /// are available.
    fn evaluate(&self, scope: &UnitScope<'_>) -> Result<Vec<ResourceDefinition>, UnitError>;

    /// Source text, when the unit has one, for error reports
    fn source_text(&self) -> Option<&str> {
        None
    }
}

/// A unit backed by a closure
pub struct FnUnit<F> {
    name: String,
    f: F,
}

impl<F> FnUnit<F>
where
    F: Fn(&UnitScope<'_>) -> Result<Vec<ResourceDefinition>, UnitError>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> DefinitionUnit for FnUnit<F>
where
    F: Fn(&UnitScope<'_>) -> Result<Vec<ResourceDefinition>, UnitError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, scope: &UnitScope<'_>) -> Result<Vec<ResourceDefinition>, UnitError> {
        (self.f)(scope)
    }
}

impl<F> std::fmt::Debug for FnUnit<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnUnit").field("name", &self.name).finish()
    }
}
