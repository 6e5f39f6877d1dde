//! Data model: references, field values, resource types and instances

mod reference;
mod resource;

pub use reference::{AttrRef, ClassRef, Reference, ResourceName, Value, ID_ATTRIBUTE};
pub use resource::{FieldDef, FieldKind, ResourceDefinition, ResourceInstance, ResourceType};
