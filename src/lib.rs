//! Resource Template - declarative resource definitions rendered in dependency order
//!
//! Resource types are declared once, registered in a [`ResourceRegistry`], and
//! refer to each other through [`ClassRef`] and [`AttrRef`] field values. The
//! references form a dependency graph that yields a creation order (and its
//! reverse, the deletion order). A [`Template`] renders one instance per type
//! through a pluggable [`Provider`].
//!
//! # Example
//!
//! ```rust
//! use resource_template::{create_decorator, JsonProvider, ResourceDefinition, ResourceRegistry, Template};
//!
//! let registry = ResourceRegistry::new();
//! let mark = create_decorator(&registry);
//! let bucket = mark
//!     .mark(ResourceDefinition::new("Bucket").field("name", "logs"))
//!     .unwrap();
//! mark.mark(ResourceDefinition::new("Policy").field("bucket", bucket.id()))
//!     .unwrap();
//!
//! let json = Template::from_registry(&registry, "logging", None)
//!     .to_json(&JsonProvider, 0)
//!     .unwrap();
//! assert!(json.starts_with(r#"{"Description":"logging","Resources":{"Bucket""#));
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod loader;
pub mod model;
pub mod parser;
pub mod registry;
pub mod template;

use std::path::Path;

use thiserror::Error;

pub use config::{ConfigError, LoaderConfig, ProjectConfig};
pub use error::{ParseError, ResourceError};
pub use graph::{direct_dependencies, get_all_dependencies, get_creation_order, get_deletion_order};
pub use loader::{
    DefinitionUnit, FnUnit, LoadError, LoadMode, LoadReport, Loader, Namespace, SourceUnit,
    UnitError, UnitScope,
};
pub use model::{
    AttrRef, ClassRef, FieldDef, FieldKind, ResourceDefinition, ResourceInstance, ResourceName,
    ResourceType, Value, ID_ATTRIBUTE,
};
pub use registry::{create_decorator, Decorator, RegistrySnapshot, ResourceRegistry, TypeLookup};
pub use template::{
    provider_by_name, IntrinsicProvider, JsonProvider, Provider, RenderedDocument, Template,
    TemplateError,
};

/// Errors that can occur during the load-and-render pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Error while loading units
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// Error in the resource graph
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Error in the project configuration
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Error while serializing the rendered document
    #[error("failed to serialize template: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<TemplateError> for PipelineError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::Resource(e) => PipelineError::Resource(e),
            TemplateError::Serialize(e) => PipelineError::Serialize(e),
        }
    }
}

impl PipelineError {
    /// Human-readable report, with source excerpts for syntax errors
    pub fn report(&self) -> String {
        match self {
            PipelineError::Load(err) => err.report(),
            other => other.to_string(),
        }
    }
}

/// Load the units of a project directory into `registry`
///
/// Uses the explicit unit list from `config` when it has one, otherwise every
/// `*.rdl` file directly inside `dir`.
pub fn load_project(
    registry: &ResourceRegistry,
    dir: &Path,
    config: &ProjectConfig,
) -> Result<LoadReport, PipelineError> {
    let units = if config.loader.units.is_empty() {
        loader::read_dir_units(dir)?
    } else {
        loader::read_units(dir, &config.loader.units)?
    };
    let report = Loader::new(registry)
        .with_mode(config.loader.mode)
        .load_sources(&units)?;
    Ok(report)
}

/// Load a project directory and render it as JSON
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use resource_template::{render_dir, ProjectConfig};
///
/// let config = ProjectConfig::new().with_description("sample stack");
/// let json = render_dir(Path::new("stack/things"), &config).unwrap();
/// println!("{}", json);
/// ```
pub fn render_dir(dir: &Path, config: &ProjectConfig) -> Result<String, PipelineError> {
    let provider = config.provider()?;
    let registry = ResourceRegistry::new();
    load_project(&registry, dir, config)?;

    let template = Template::from_registry(
        &registry,
        config.description.as_str(),
        config.scope.as_deref(),
    );
    Ok(template.to_json(provider.as_ref(), config.indent)?)
}
