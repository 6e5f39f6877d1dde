//! Resource Template CLI
//!
//! Usage:
//!   resource-template [OPTIONS] [DIR]
//!
//! Options:
//!   -c, --config <FILE>        Project configuration (TOML format)
//!   -d, --description <TEXT>   Template description
//!   -s, --scope <UNIT>         Render only types defined in this unit or below it
//!   -p, --provider <NAME>      Output provider (json, intrinsic)
//!   -o, --order <ORDER>        Print the creation or deletion order instead
//!       --deps <NAME>          Print the transitive dependencies of a type instead
//!   -h, --help                 Print help

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use resource_template::{
    get_all_dependencies, get_creation_order, get_deletion_order, load_project, PipelineError,
    ProjectConfig, ResourceError, ResourceName, ResourceRegistry, ResourceType, Template,
};

#[derive(Parser)]
#[command(name = "resource-template")]
#[command(about = "Render declarative resource definitions in dependency order")]
struct Cli {
    /// Directory of *.rdl units (defaults to the current directory)
    dir: Option<PathBuf>,

    /// Project configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template description
    #[arg(short, long)]
    description: Option<String>,

    /// Render only types whose defining unit is this one or lies under it
    #[arg(short, long)]
    scope: Option<String>,

    /// Output provider
    #[arg(short, long)]
    provider: Option<String>,

    /// Print an order listing instead of rendering
    #[arg(short, long, value_enum)]
    order: Option<Order>,

    /// Print the transitive dependencies of one type instead of rendering
    #[arg(long, value_name = "NAME")]
    deps: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    Creation,
    Deletion,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match ProjectConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ProjectConfig::default(),
    };
    if let Some(description) = &cli.description {
        config = config.with_description(description.as_str());
    }
    if let Some(scope) = &cli.scope {
        config = config.with_scope(scope.as_str());
    }
    if let Some(provider) = &cli.provider {
        config = config.with_provider(provider.as_str());
    }

    match run(&cli, &config) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e.report());
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli, config: &ProjectConfig) -> Result<String, PipelineError> {
    let provider = config.provider()?;
    let dir = cli.dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let registry = ResourceRegistry::new();
    load_project(&registry, &dir, config)?;

    if let Some(name) = &cli.deps {
        let snapshot = registry.snapshot();
        let ty = registry
            .get(&ResourceName::new(name.as_str()))
            .ok_or_else(|| ResourceError::unknown_reference(name.as_str(), "command line"))?;
        let deps = get_all_dependencies(&ty, &snapshot)?;
        return Ok(names(&deps));
    }

    let template = Template::from_registry(
        &registry,
        config.description.as_str(),
        config.scope.as_deref(),
    );

    match cli.order {
        Some(order) => {
            let snapshot = registry.snapshot();
            let types: Vec<_> = template
                .resources()
                .iter()
                .map(|r| Arc::clone(r.resource_type()))
                .collect();
            let ordered = match order {
                Order::Creation => get_creation_order(&types, &snapshot)?,
                Order::Deletion => get_deletion_order(&types, &snapshot)?,
            };
            Ok(names(&ordered))
        }
        None => Ok(template.to_json(provider.as_ref(), config.indent)?),
    }
}

fn names(types: &[Arc<ResourceType>]) -> String {
    types
        .iter()
        .map(|t| t.name().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
