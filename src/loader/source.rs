//! Definition units written in the resource definition language

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::unit::{DefinitionUnit, UnitError, UnitScope};
use super::LoadError;
use crate::model::{AttrRef, ClassRef, ResourceDefinition, Value};
use crate::parser::{self, FieldDecl, ResourceDecl, ValueExpr};

/// File extension of source units
pub const UNIT_EXTENSION: &str = "rdl";

/// A unit parsed from source text
#[derive(Debug, Clone)]
pub struct SourceUnit {
    name: String,
    path: Option<PathBuf>,
    source: String,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            source: source.into(),
        }
    }

    /// Read a unit from disk
    pub fn from_file(path: impl AsRef<Path>, name: impl Into<String>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            name: name.into(),
            path: Some(path.to_path_buf()),
            source,
        })
    }

    /// Path the unit was read from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn definition(&self, decl: ResourceDecl) -> ResourceDefinition {
        let base = ResourceDefinition::new(decl.name.node.0).unit(self.name.as_str());
        decl.fields.into_iter().fold(base, |definition, field| {
            let FieldDecl {
                name,
                annotation,
                value,
            } = field.node;
            let value = to_value(value.node);
            match annotation {
                Some(kind) => definition.typed_field(name.node.0, kind.node, value),
                None => definition.field(name.node.0, value),
            }
        })
    }
}

impl DefinitionUnit for SourceUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, scope: &UnitScope<'_>) -> Result<Vec<ResourceDefinition>, UnitError> {
        let document = parser::parse(&self.source).map_err(|errors| UnitError::Parse { errors })?;

        // Names declared in this unit are visible to every declaration in it
        let declared: HashSet<&str> = document
            .resources
            .iter()
            .map(|r| r.node.name.node.as_str())
            .collect();

        let mut referenced = Vec::new();
        for decl in &document.resources {
            for field in &decl.node.fields {
                ValueExpr::referenced_names(&field.node.value, &mut referenced);
            }
        }

        let missing = scope.missing(
            referenced
                .iter()
                .map(|(id, _)| id.as_str())
                .filter(|name| !declared.contains(name)),
        );
        if !missing.is_empty() {
            return Err(UnitError::Unresolved { names: missing });
        }

        Ok(document
            .resources
            .into_iter()
            .map(|decl| self.definition(decl.node))
            .collect())
    }

    fn source_text(&self) -> Option<&str> {
        Some(&self.source)
    }
}

fn to_value(expr: ValueExpr) -> Value {
    match expr {
        ValueExpr::Null => Value::Null,
        ValueExpr::Bool(b) => Value::Bool(b),
        ValueExpr::Integer(n) => Value::Int(n),
        ValueExpr::Float(f) => Value::Float(f),
        ValueExpr::String(s) => Value::String(s),
        ValueExpr::List(items) => Value::List(items.into_iter().map(|i| to_value(i.node)).collect()),
        ValueExpr::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.node.0, to_value(value.node)))
                .collect(),
        ),
        ValueExpr::Name(target) => Value::Ref(ClassRef::new(target.0)),
        ValueExpr::Attribute { target, attribute } => {
            Value::Attr(AttrRef::new(target.0, attribute.0))
        }
    }
}

/// Unit name for a file: `<prefix>/<stem>`, or just the stem
fn unit_name(prefix: Option<&str>, path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, stem),
        _ => stem,
    }
}

/// Discover the source units of a directory
///
/// Only `*.rdl` files directly inside `dir` are read, sorted by file name.
/// Each unit is named `<dir name>/<file stem>`.
pub fn read_dir_units(dir: &Path) -> Result<Vec<SourceUnit>, LoadError> {
    let io_err = |source: std::io::Error| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == UNIT_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();

    let prefix = dir.file_name().map(|n| n.to_string_lossy().into_owned());
    paths
        .into_iter()
        .map(|path| {
            let name = unit_name(prefix.as_deref(), &path);
            SourceUnit::from_file(&path, name)
        })
        .collect()
}

/// Read an explicit list of unit files relative to `base`
///
/// Units are named after their relative path without the extension.
pub fn read_units(base: &Path, files: &[PathBuf]) -> Result<Vec<SourceUnit>, LoadError> {
    files
        .iter()
        .map(|file| {
            let prefix = file
                .parent()
                .map(|p| p.to_string_lossy().replace('\\', "/"));
            let name = unit_name(prefix.as_deref(), file);
            SourceUnit::from_file(base.join(file), name)
        })
        .collect()
}
