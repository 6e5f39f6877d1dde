//! Template aggregation and rendering
//!
//! A [`Template`] holds one instance per resource type together with a
//! description, and renders them through a [`Provider`] into a document of
//! the shape:
//!
//! ```text
//! {
//!   "Description": "...",
//!   "Resources": { "<TypeName>": <serialize_resource output>, ... }
//! }
//! ```
//!
//! `Resources` is emitted in creation order.

mod provider;

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ResourceError;
use crate::graph::get_creation_order;
use crate::model::{ResourceInstance, ResourceType};
use crate::registry::{RegistrySnapshot, ResourceRegistry};

pub use provider::{provider_by_name, IntrinsicProvider, JsonProvider, Provider};

/// Errors that can occur while rendering a template
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("failed to serialize template: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Rendered output document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedDocument {
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Resources")]
    pub resources: IndexMap<String, serde_json::Value>,
}

/// All resource instances for one render
#[derive(Debug, Clone, Default)]
pub struct Template {
    description: String,
    resources: Vec<ResourceInstance>,
    types: RegistrySnapshot,
}

impl Template {
    /// Create an empty template
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Collect one default instance per registered type
    ///
    /// With a `scope`, only types whose defining unit is `scope` or lies
    /// under it (`scope/...`) are included. Every registered type stays
    /// available for dependency lookup either way.
    pub fn from_registry(
        registry: &ResourceRegistry,
        description: impl Into<String>,
        scope: Option<&str>,
    ) -> Self {
        let types = registry.snapshot();
        let resources: Vec<ResourceInstance> = types
            .iter()
            .filter(|ty| scope.map_or(true, |scope| in_scope(ty, scope)))
            .map(ResourceType::instantiate)
            .collect();

        tracing::debug!(
            resources = resources.len(),
            scope = ?scope,
            "collected template from registry"
        );

        Self {
            description: description.into(),
            resources,
            types,
        }
    }

    /// Add an instance; at most one instance per type
    pub fn add_resource(&mut self, instance: ResourceInstance) -> Result<(), ResourceError> {
        if self
            .resources
            .iter()
            .any(|r| r.type_name() == instance.type_name())
        {
            return Err(ResourceError::duplicate(instance.type_name().as_str()));
        }
        if !self.types.contains(instance.type_name()) {
            self.types = self
                .types
                .iter()
                .cloned()
                .chain(std::iter::once(Arc::clone(instance.resource_type())))
                .collect();
        }
        self.resources.push(instance);
        Ok(())
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Instances in collection order
    pub fn resources(&self) -> &[ResourceInstance] {
        &self.resources
    }

    /// Instances in creation order
    pub fn get_dependency_order(&self) -> Result<Vec<&ResourceInstance>, ResourceError> {
        let types: Vec<Arc<ResourceType>> = self
            .resources
            .iter()
            .map(|r| Arc::clone(r.resource_type()))
            .collect();
        let order = get_creation_order(&types, &self.types)?;

        let by_name: IndexMap<&str, &ResourceInstance> = self
            .resources
            .iter()
            .map(|r| (r.type_name().as_str(), r))
            .collect();
        Ok(order
            .iter()
            .filter_map(|ty| by_name.get(ty.name().as_str()).copied())
            .collect())
    }

    /// Render through `provider`
    pub fn render(&self, provider: &dyn Provider) -> Result<RenderedDocument, ResourceError> {
        let resources = self
            .get_dependency_order()?
            .into_iter()
            .map(|r| (r.type_name().to_string(), provider.serialize_resource(r)))
            .collect();

        tracing::debug!(provider = provider.name(), "rendered template");
        Ok(RenderedDocument {
            description: self.description.clone(),
            resources,
        })
    }

    /// Render through `provider` and serialize as JSON
    ///
    /// An `indent` of zero produces compact output.
    pub fn to_json(&self, provider: &dyn Provider, indent: usize) -> Result<String, TemplateError> {
        let document = self.render(provider)?;
        if indent == 0 {
            return Ok(serde_json::to_string(&document)?);
        }

        let pad = " ".repeat(indent);
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(pad.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        document.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn in_scope(ty: &ResourceType, scope: &str) -> bool {
    match ty.unit() {
        Some(unit) => {
            unit == scope
                || unit
                    .strip_prefix(scope)
                    .is_some_and(|rest| rest.starts_with('/'))
        }
        None => false,
    }
}
