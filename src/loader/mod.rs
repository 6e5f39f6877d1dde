//! Dependency-ordered loading of definition units
//!
//! Units are evaluated against a [`Namespace`] of previously loaded types. A
//! unit that needs a name nobody has produced yet reports
//! [`UnitError::Unresolved`]; in [`LoadMode::FixedPoint`] it is retried on the
//! next pass, so units may be given in any order as long as their
//! dependencies form no cross-unit cycle.

mod source;
mod unit;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ParseError, ResourceError};
use crate::registry::{create_decorator, ResourceRegistry};

pub use source::{read_dir_units, read_units, SourceUnit, UNIT_EXTENSION};
pub use unit::{DefinitionUnit, FnUnit, Namespace, UnitError, UnitScope};

/// How unit order is determined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadMode {
    /// Evaluate units exactly in the given order
    Ordered,
    /// Retry deferred units until a pass makes no progress
    #[default]
    FixedPoint,
}

/// Errors that can occur while loading units
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax errors in unit '{unit}': {}", format_parse_errors(errors))]
    Parse {
        unit: String,
        source_text: Option<String>,
        errors: Vec<ParseError>,
    },

    #[error("unit '{unit}' failed: {message}")]
    Unit { unit: String, message: String },

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl LoadError {
    /// Human-readable report, with source excerpts for syntax errors
    pub fn report(&self) -> String {
        match self {
            LoadError::Parse {
                unit,
                source_text: Some(source),
                errors,
            } => errors
                .iter()
                .map(|e| e.format(source, unit))
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        }
    }
}

/// Outcome of a successful load
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Unit names in the order they were evaluated successfully
    pub units: Vec<String>,
    /// Every name visible after the load
    pub namespace: Namespace,
}

enum Step {
    Loaded,
    Deferred(Vec<String>),
}

/// Loads definition units into a registry
pub struct Loader<'r> {
    registry: &'r ResourceRegistry,
    mode: LoadMode,
    namespace: Namespace,
    after_load: Vec<Box<dyn FnMut(&LoadReport) + 'r>>,
}

impl<'r> Loader<'r> {
    /// Create a loader; types already in `registry` are visible to units
    pub fn new(registry: &'r ResourceRegistry) -> Self {
        let mut namespace = Namespace::new();
        namespace.extend(registry.all());
        Self {
            registry,
            mode: LoadMode::default(),
            namespace,
            after_load: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Make extra entries visible to every unit
    pub fn with_namespace(mut self, extra: Namespace) -> Self {
        self.namespace.extend(extra.iter().cloned());
        self
    }

    /// Run `hook` after every fully successful load
    pub fn after_load(mut self, hook: impl FnMut(&LoadReport) + 'r) -> Self {
        self.after_load.push(Box::new(hook));
        self
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Evaluate and register `units`
    ///
    /// Every type in the registry at the time of the call is visible, including
    /// types registered after the loader was created. Each unit registers
    /// atomically. On failure, units that were already loaded stay registered.
    pub fn load(&mut self, units: &[&dyn DefinitionUnit]) -> Result<LoadReport, LoadError> {
        self.namespace.extend(self.registry.all());

        let loaded = match self.mode {
            LoadMode::Ordered => self.load_ordered(units)?,
            LoadMode::FixedPoint => self.load_fixed_point(units)?,
        };

        let report = LoadReport {
            units: loaded,
            namespace: self.namespace.clone(),
        };
        for hook in &mut self.after_load {
            hook(&report);
        }
        Ok(report)
    }

    /// Load every `*.rdl` unit in `dir`
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<LoadReport, LoadError> {
        let units = read_dir_units(dir.as_ref())?;
        self.load_sources(&units)
    }

    /// Load already constructed source units
    pub fn load_sources(&mut self, units: &[SourceUnit]) -> Result<LoadReport, LoadError> {
        let units: Vec<&dyn DefinitionUnit> =
            units.iter().map(|u| u as &dyn DefinitionUnit).collect();
        self.load(&units)
    }

    fn load_ordered(&mut self, units: &[&dyn DefinitionUnit]) -> Result<Vec<String>, LoadError> {
        let mut loaded = Vec::with_capacity(units.len());
        for unit in units {
            match self.try_unit(*unit)? {
                Step::Loaded => loaded.push(unit.name().to_string()),
                Step::Deferred(names) => {
                    return Err(ResourceError::unknown_reference(names.join(", "), unit.name()).into())
                }
            }
        }
        Ok(loaded)
    }

    fn load_fixed_point(
        &mut self,
        units: &[&dyn DefinitionUnit],
    ) -> Result<Vec<String>, LoadError> {
        let mut loaded = Vec::with_capacity(units.len());
        let mut pending: Vec<&dyn DefinitionUnit> = units.to_vec();
        let mut pass = 0;

        while !pending.is_empty() {
            pass += 1;
            let before = pending.len();
            let mut deferred = Vec::new();
            let mut missing: Vec<String> = Vec::new();

            for unit in pending {
                match self.try_unit(unit)? {
                    Step::Loaded => loaded.push(unit.name().to_string()),
                    Step::Deferred(names) => {
                        tracing::debug!(unit = unit.name(), pass, missing = ?names, "deferred unit");
                        for name in names {
                            if !missing.contains(&name) {
                                missing.push(name);
                            }
                        }
                        deferred.push(unit);
                    }
                }
            }

            if deferred.len() == before {
                return Err(ResourceError::UnresolvableLoadOrder {
                    stalled: deferred.iter().map(|u| u.name().to_string()).collect(),
                    missing,
                }
                .into());
            }
            pending = deferred;
        }

        tracing::debug!(units = loaded.len(), passes = pass, "load reached fixed point");
        Ok(loaded)
    }

    fn try_unit(&mut self, unit: &dyn DefinitionUnit) -> Result<Step, LoadError> {
        let scope = UnitScope::new(unit.name(), &self.namespace);
        let definitions = match unit.evaluate(&scope) {
            Ok(definitions) => definitions,
            Err(UnitError::Unresolved { names }) => return Ok(Step::Deferred(names)),
            Err(UnitError::Parse { errors }) => {
                return Err(LoadError::Parse {
                    unit: unit.name().to_string(),
                    source_text: unit.source_text().map(str::to_string),
                    errors,
                })
            }
            Err(UnitError::Resource(err)) => return Err(err.into()),
            Err(UnitError::Custom(message)) => {
                return Err(LoadError::Unit {
                    unit: unit.name().to_string(),
                    message,
                })
            }
        };

        let definitions = definitions
            .into_iter()
            .map(|d| match d.unit {
                Some(_) => d,
                None => d.unit(unit.name()),
            })
            .collect();
        let types = create_decorator(self.registry).mark_all(definitions)?;
        tracing::debug!(unit = unit.name(), types = types.len(), "loaded unit");
        self.namespace.extend(types);
        Ok(Step::Loaded)
    }
}

impl std::fmt::Debug for Loader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("mode", &self.mode)
            .field("namespace", &self.namespace)
            .field("after_load", &self.after_load.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::model::{ResourceDefinition, ResourceName};

    fn things() -> Vec<SourceUnit> {
        vec![
            SourceUnit::new(
                "things/thing1",
                r#"resource Thing1 { name = "thing1-default" value = 100 tags = [] }"#,
            ),
            SourceUnit::new(
                "things/thing2",
                r#"resource Thing2 { name = "thing2-default" parent = Thing1 parent_id = Thing1.Id }"#,
            ),
            SourceUnit::new(
                "things/thing3",
                r#"resource Thing3 { source = Thing2 source_id = Thing2.Id }"#,
            ),
        ]
    }

    #[test]
    fn test_fixed_point_loads_units_in_any_order() {
        let registry = ResourceRegistry::new();
        let mut units = things();
        units.reverse();

        let report = Loader::new(&registry).load_sources(&units).expect("loads");

        assert_eq!(
            report.units,
            vec!["things/thing1", "things/thing2", "things/thing3"]
        );
        assert_eq!(registry.len(), 3);
        let thing2 = registry.get(&ResourceName::new("Thing2")).expect("registered");
        assert_eq!(thing2.unit(), Some("things/thing2"));
    }

    #[test]
    fn test_ordered_mode_trusts_input_order() {
        let registry = ResourceRegistry::new();
        let mut units = things();
        units.swap(0, 1);

        let err = Loader::new(&registry)
            .with_mode(LoadMode::Ordered)
            .load_sources(&units)
            .unwrap_err();

        match err {
            LoadError::Resource(err) => {
                assert_eq!(err, ResourceError::unknown_reference("Thing1", "things/thing2"))
            }
            other => panic!("Expected Resource error, got {:?}", other),
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stalled_units_are_named() {
        let registry = ResourceRegistry::new();
        let units = vec![
            SourceUnit::new("a", "resource A { b = B }"),
            SourceUnit::new("b", "resource B { c = Missing.Arn }"),
            SourceUnit::new("ok", "resource Ok { }"),
        ];

        let err = Loader::new(&registry).load_sources(&units).unwrap_err();

        match err {
            LoadError::Resource(ResourceError::UnresolvableLoadOrder { stalled, missing }) => {
                assert_eq!(stalled, vec!["a", "b"]);
                assert_eq!(missing, vec!["B", "Missing"]);
            }
            other => panic!("Expected UnresolvableLoadOrder, got {:?}", other),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unit_registers_atomically() {
        let registry = ResourceRegistry::new();
        create_decorator(&registry)
            .mark(ResourceDefinition::new("B"))
            .expect("registers");

        let units = vec![SourceUnit::new("u", "resource A { } resource B { }")];
        let err = Loader::new(&registry).load_sources(&units).unwrap_err();

        assert!(matches!(
            err,
            LoadError::Resource(ResourceError::DuplicateName { .. })
        ));
        assert!(!registry.contains(&ResourceName::new("A")));
    }

    #[test]
    fn test_previously_registered_types_are_visible() {
        let registry = ResourceRegistry::new();
        create_decorator(&registry)
            .mark(ResourceDefinition::new("Base"))
            .expect("registers");

        let units = vec![SourceUnit::new("child", "resource Child { base = Base }")];
        let report = Loader::new(&registry).load_sources(&units).expect("loads");

        assert_eq!(report.namespace.len(), 2);
    }

    #[test]
    fn test_types_registered_after_loader_creation_are_visible() {
        let registry = ResourceRegistry::new();
        let mut loader = Loader::new(&registry);
        create_decorator(&registry)
            .mark(ResourceDefinition::new("Base"))
            .expect("registers");

        let units = vec![SourceUnit::new("child", "resource Child { base = Base }")];
        let report = loader.load_sources(&units).expect("loads");

        assert_eq!(report.units, vec!["child"]);
        assert!(report.namespace.contains("Base"));
        assert!(registry.contains(&ResourceName::new("Child")));
    }

    #[test]
    fn test_annotation_mismatch_fails_the_unit() {
        let registry = ResourceRegistry::new();
        let units = vec![SourceUnit::new(
            "cargo",
            r#"resource Crate { weight: float = "heavy" }"#,
        )];
        let err = Loader::new(&registry).load_sources(&units).unwrap_err();

        assert!(matches!(
            err,
            LoadError::Resource(ResourceError::FieldKindMismatch { ref declared, ref found, .. })
                if declared == "float" && found == "string"
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_fn_unit_gets_default_unit_name() {
        let registry = ResourceRegistry::new();
        let base = FnUnit::new("programmatic", |_: &UnitScope<'_>| {
            Ok(vec![ResourceDefinition::new("Base").field("size", 1)])
        });
        let child = FnUnit::new("child", |scope: &UnitScope<'_>| {
            let base = scope.resolve("Base")?;
            Ok(vec![ResourceDefinition::new("Child").field("base", &base)])
        });

        let units: [&dyn DefinitionUnit; 2] = [&child, &base];
        let report = Loader::new(&registry).load(&units).expect("loads");

        assert_eq!(report.units, vec!["programmatic", "child"]);
        let base = registry.get(&ResourceName::new("Base")).expect("registered");
        assert_eq!(base.unit(), Some("programmatic"));
    }

    #[test]
    fn test_after_load_runs_only_on_success() {
        let calls = Cell::new(0);
        let registry = ResourceRegistry::new();

        let mut loader = Loader::new(&registry).after_load(|report| {
            assert_eq!(report.units.len(), 3);
            calls.set(calls.get() + 1);
        });
        loader.load_sources(&things()).expect("loads");
        assert_eq!(calls.get(), 1);

        let broken = vec![SourceUnit::new("broken", "resource X { y = Nowhere }")];
        assert!(loader.load_sources(&broken).is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_parse_error_report_includes_unit_source() {
        let registry = ResourceRegistry::new();
        let units = vec![SourceUnit::new("bad", "resource = { }")];

        let err = Loader::new(&registry).load_sources(&units).unwrap_err();

        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(err.report().contains("bad"));
    }

    #[test]
    fn test_load_mode_from_toml_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: LoadMode,
        }
        let w: Wrapper = toml::from_str(r#"mode = "fixed-point""#).expect("parses");
        assert_eq!(w.mode, LoadMode::FixedPoint);
        let w: Wrapper = toml::from_str(r#"mode = "ordered""#).expect("parses");
        assert_eq!(w.mode, LoadMode::Ordered);
    }
}
