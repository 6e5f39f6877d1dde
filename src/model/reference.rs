//! Reference values embedded in field defaults
//!
//! A reference never holds the target type itself, only its name. Targets are
//! resolved through a [`TypeLookup`](crate::registry::TypeLookup) when the
//! dependency graph is built, which is what lets self references and
//! cross-unit cycles be reported instead of being unconstructible.

use std::borrow::Borrow;
use std::fmt;

use indexmap::IndexMap;

/// Attribute name of the synthetic generated identifier
pub const ID_ATTRIBUTE: &str = "Id";

/// Identity of a resource type (unique within a registry)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceName(pub String);

impl ResourceName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for ResourceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Reference to a resource type as a whole
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassRef {
    pub target: ResourceName,
}

impl ClassRef {
    pub fn new(target: impl Into<ResourceName>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)
    }
}

/// Reference to a synthetic attribute of a resource type
///
/// The attribute may not have a concrete value until the target is
/// provisioned, so it is rendered as an attribute-of-reference rather than a
/// value. Attribute names are not restricted to [`ID_ATTRIBUTE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrRef {
    pub target: ResourceName,
    pub attribute: String,
}

impl AttrRef {
    pub fn new(target: impl Into<ResourceName>, attribute: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            attribute: attribute.into(),
        }
    }

    /// Reference to the generated identifier of `target`
    pub fn id(target: impl Into<ResourceName>) -> Self {
        Self::new(target, ID_ATTRIBUTE)
    }
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.attribute)
    }
}

/// Either kind of reference, as yielded by [`Value::references`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference<'a> {
    Class(&'a ClassRef),
    Attr(&'a AttrRef),
}

impl<'a> Reference<'a> {
    /// Name of the referenced resource type
    pub fn target(&self) -> &'a ResourceName {
        match self {
            Reference::Class(r) => &r.target,
            Reference::Attr(r) => &r.target,
        }
    }
}

/// A field value: plain data or a reference to another resource type
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Ref(ClassRef),
    Attr(AttrRef),
}

impl Value {
    /// Whether this value is a reference (at the top level)
    pub fn is_reference(&self) -> bool {
        matches!(self, Value::Ref(_) | Value::Attr(_))
    }

    /// Whether this value or anything nested inside it is a reference
    pub fn contains_reference(&self) -> bool {
        self.references().next().is_some()
    }

    /// Every reference embedded in this value, depth first
    pub fn references(&self) -> impl Iterator<Item = Reference<'_>> + '_ {
        let mut out = Vec::new();
        collect_references(self, &mut out);
        out.into_iter()
    }

    /// Short lowercase name of the variant, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Ref(_) => "ref",
            Value::Attr(_) => "attr",
        }
    }

    /// Convert a plain value to JSON
    ///
    /// References are rendered by a [`Provider`](crate::template::Provider);
    /// here they fall back to their textual form so that callers outside a
    /// render still get something readable.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => items.iter().map(Value::to_json).collect(),
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Ref(r) => serde_json::Value::String(r.to_string()),
            Value::Attr(r) => serde_json::Value::String(r.to_string()),
        }
    }
}

fn collect_references<'a>(value: &'a Value, out: &mut Vec<Reference<'a>>) {
    match value {
        Value::Ref(r) => out.push(Reference::Class(r)),
        Value::Attr(r) => out.push(Reference::Attr(r)),
        Value::List(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        Value::Map(entries) => {
            for item in entries.values() {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

impl From<ClassRef> for Value {
    fn from(r: ClassRef) -> Self {
        Value::Ref(r)
    }
}

impl From<AttrRef> for Value {
    fn from(r: AttrRef) -> Self {
        Value::Attr(r)
    }
}
