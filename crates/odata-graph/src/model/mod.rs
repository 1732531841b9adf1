//! Typed model for the resource graph.
//!
//! This module contains the schema and the in-flight graph items:
//! - Structured types (entity and complex) and their members
//! - The entity container, entity sets and navigation bindings
//! - The immutable [`Model`] with its lookups
//! - Builders (ergonomic construction)
//! - Resources, nested resource infos and resource sets

pub mod builder;
pub mod container;
pub mod resource;
pub mod schema;
pub mod types;

pub use builder::{ModelBuilder, TypeBuilder};
pub use container::{
    BindingPath, BindingSegment, EntityContainer, EntitySet, NavigationBinding, NavigationRef,
    SegmentKind,
};
pub use resource::{NestedResourceInfo, Property, Resource, ResourceSet, Value};
pub use schema::{BaseChain, Model};
pub use types::{
    Member, Multiplicity, NavigationProperty, PrimitiveKind, PropertyType, StructuralProperty,
    StructuredType, TypeKind,
};
