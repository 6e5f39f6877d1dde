//! Resource definitions, registered resource types and their instances

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;

use super::reference::{AttrRef, ClassRef, ResourceName, Value};
use crate::error::ResourceError;

/// Declared kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    List,
    Map,
    Ref,
    Attr,
}

impl FieldKind {
    /// Infer the kind of a field from its default value
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Null => FieldKind::Null,
            Value::Bool(_) => FieldKind::Bool,
            Value::Int(_) => FieldKind::Int,
            Value::Float(_) => FieldKind::Float,
            Value::String(_) => FieldKind::String,
            Value::List(_) => FieldKind::List,
            Value::Map(_) => FieldKind::Map,
            Value::Ref(_) => FieldKind::Ref,
            Value::Attr(_) => FieldKind::Attr,
        }
    }

    /// Whether `value` may be the default of a field annotated with this kind
    ///
    /// Integers are accepted for `float`, and `null` for any kind.
    pub fn accepts(&self, value: &Value) -> bool {
        let found = FieldKind::infer(value);
        found == *self
            || found == FieldKind::Null
            || (*self == FieldKind::Float && found == FieldKind::Int)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Null => "null",
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::String => "string",
            FieldKind::List => "list",
            FieldKind::Map => "map",
            FieldKind::Ref => "ref",
            FieldKind::Attr => "attr",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(FieldKind::Null),
            "bool" => Ok(FieldKind::Bool),
            "int" => Ok(FieldKind::Int),
            "float" => Ok(FieldKind::Float),
            "string" | "str" => Ok(FieldKind::String),
            "list" => Ok(FieldKind::List),
            "map" => Ok(FieldKind::Map),
            "ref" => Ok(FieldKind::Ref),
            "attr" => Ok(FieldKind::Attr),
            other => Err(format!("unknown field kind '{}'", other)),
        }
    }
}

/// One normalized field: name, declared kind and default value
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub default: Value,
}

/// Declared, not yet registered resource definition
///
/// This is the input to [`Decorator::mark`](crate::registry::Decorator::mark).
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    pub name: ResourceName,
    /// Defining unit, used by template scoping
    pub unit: Option<String>,
    pub doc: Option<String>,
    /// Declared attributes: (name, explicit kind, default)
    pub attributes: Vec<(String, Option<FieldKind>, Value)>,
}

impl ResourceDefinition {
    pub fn new(name: impl Into<ResourceName>) -> Self {
        Self {
            name: name.into(),
            unit: None,
            doc: None,
            attributes: Vec::new(),
        }
    }

    /// Declare a field whose kind is inferred from its default
    pub fn field(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.declare(name.into(), None, default.into())
    }

    /// Declare a field with an explicit kind annotation
    ///
    /// The default is checked against `kind` when the definition is marked.
    pub fn typed_field(
        self,
        name: impl Into<String>,
        kind: FieldKind,
        default: impl Into<Value>,
    ) -> Self {
        self.declare(name.into(), Some(kind), default.into())
    }

    /// Set the defining unit
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attach a description
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    // A later declaration of the same attribute replaces the earlier one in place.
    fn declare(mut self, name: String, kind: Option<FieldKind>, default: Value) -> Self {
        match self.attributes.iter_mut().find(|(n, _, _)| *n == name) {
            Some(slot) => *slot = (name, kind, default),
            None => self.attributes.push((name, kind, default)),
        }
        self
    }

    /// Check every annotated default against its annotation
    pub fn validate(&self) -> Result<(), ResourceError> {
        for (field, kind, default) in &self.attributes {
            if let Some(kind) = kind {
                if !kind.accepts(default) {
                    return Err(ResourceError::FieldKindMismatch {
                        resource: self.name.to_string(),
                        field: field.clone(),
                        declared: kind.to_string(),
                        found: FieldKind::infer(default).to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Normalize declared attributes into an ordered field list
    pub(crate) fn into_fields(self) -> (ResourceName, Option<String>, Option<String>, Vec<FieldDef>) {
        let fields = self
            .attributes
            .into_iter()
            .map(|(name, kind, default)| FieldDef {
                kind: kind.unwrap_or_else(|| FieldKind::infer(&default)),
                name,
                default,
            })
            .collect();
        (self.name, self.unit, self.doc, fields)
    }
}

/// A registered resource type
///
/// Immutable once registered; shared as `Arc<ResourceType>` between the
/// registry and whoever marked it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceType {
    name: ResourceName,
    unit: Option<String>,
    doc: Option<String>,
    fields: Vec<FieldDef>,
}

impl ResourceType {
    pub(crate) fn from_definition(definition: ResourceDefinition) -> Self {
        let (name, unit, doc, fields) = definition.into_fields();
        Self {
            name,
            unit,
            doc,
            fields,
        }
    }

    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Defining unit, if the type was loaded from one
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Ordered field descriptors
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Reference to this type as a whole
    pub fn class_ref(&self) -> ClassRef {
        ClassRef::new(self.name.clone())
    }

    /// Reference to this type's generated identifier
    pub fn id(&self) -> AttrRef {
        AttrRef::id(self.name.clone())
    }

    /// Reference to any other synthetic attribute of this type
    pub fn attr(&self, attribute: impl Into<String>) -> AttrRef {
        AttrRef::new(self.name.clone(), attribute)
    }

    /// Build an instance from the declared defaults
    pub fn instantiate(self: &Arc<Self>) -> ResourceInstance {
        ResourceInstance {
            resource_type: Arc::clone(self),
            values: self
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.default.clone()))
                .collect(),
        }
    }

    /// Build an instance, overriding some defaults
    pub fn instantiate_with<K, V>(
        self: &Arc<Self>,
        overrides: impl IntoIterator<Item = (K, V)>,
    ) -> Result<ResourceInstance, ResourceError>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut instance = self.instantiate();
        for (field, value) in overrides {
            instance.set(field, value)?;
        }
        Ok(instance)
    }
}

impl From<&ResourceType> for Value {
    fn from(ty: &ResourceType) -> Self {
        Value::Ref(ty.class_ref())
    }
}

impl From<&Arc<ResourceType>> for Value {
    fn from(ty: &Arc<ResourceType>) -> Self {
        Value::Ref(ty.class_ref())
    }
}

/// A concrete value of a resource type
#[derive(Debug, Clone)]
pub struct ResourceInstance {
    resource_type: Arc<ResourceType>,
    values: IndexMap<String, Value>,
}

impl ResourceInstance {
    /// The backing type
    pub fn resource_type(&self) -> &Arc<ResourceType> {
        &self.resource_type
    }

    pub fn type_name(&self) -> &ResourceName {
        self.resource_type.name()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Assign a field; only declared fields may be set
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Result<(), ResourceError> {
        let field = field.into();
        match self.values.get_mut(&field) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(ResourceError::UnknownField {
                resource: self.resource_type.name().to_string(),
                field,
            }),
        }
    }

    /// Field values in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl PartialEq for ResourceInstance {
    fn eq(&self, other: &Self) -> bool {
        self.resource_type.name() == other.resource_type.name() && self.values == other.values
    }
}
