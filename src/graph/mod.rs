//! Dependency graph over resource types
//!
//! An edge `A -> B` exists when some field default of `A` (possibly nested in
//! a list or map) is a [`ClassRef`](crate::model::ClassRef) or
//! [`AttrRef`](crate::model::AttrRef) naming `B`. The graph over any set that
//! is successfully ordered is acyclic; cycles are always reported, never
//! broken.

mod dependencies;
mod order;

pub use dependencies::{direct_dependencies, get_all_dependencies};
pub use order::{get_creation_order, get_deletion_order};
