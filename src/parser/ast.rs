//! Abstract Syntax Tree types for the resource definition language

use crate::model::FieldKind;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Valid identifier (alphanumeric + underscore, starts with letter/_)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Root AST node - one definition unit
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub resources: Vec<Spanned<ResourceDecl>>,
}

/// `resource Name { field = value ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDecl {
    pub name: Spanned<Identifier>,
    pub fields: Vec<Spanned<FieldDecl>>,
}

/// `name = value` or `name: kind = value`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: Spanned<Identifier>,
    pub annotation: Option<Spanned<FieldKind>>,
    pub value: Spanned<ValueExpr>,
}

/// Field value as written
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Spanned<ValueExpr>>),
    Map(Vec<(Spanned<Identifier>, Spanned<ValueExpr>)>),
    /// Bare name: reference to a resource type as a whole
    Name(Identifier),
    /// `Name.attribute`: reference to an attribute of a resource type
    Attribute {
        target: Identifier,
        attribute: Identifier,
    },
}

impl ValueExpr {
    /// Every resource name this expression refers to, with its span
    pub fn referenced_names<'a>(expr: &'a Spanned<ValueExpr>, out: &mut Vec<(&'a Identifier, Span)>) {
        match &expr.node {
            ValueExpr::Name(id) => out.push((id, expr.span.clone())),
            ValueExpr::Attribute { target, .. } => out.push((target, expr.span.clone())),
            ValueExpr::List(items) => {
                for item in items {
                    Self::referenced_names(item, out);
                }
            }
            ValueExpr::Map(entries) => {
                for (_, value) in entries {
                    Self::referenced_names(value, out);
                }
            }
            _ => {}
        }
    }
}
