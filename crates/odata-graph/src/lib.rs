//! odata-graph: Multi-binding aware reader and writer for OData JSON resource graphs.
//!
//! This crate resolves which entity set a navigation property targets when
//! the same navigation is reachable over several paths (through different
//! complex properties, containment navigations or type casts), and uses that
//! resolution to stream resource graphs to and from JSON with correct
//! identifiers and context URLs.
//!
//! # Overview
//!
//! - **Typed model**: entity and complex types, entity sets and navigation
//!   bindings keyed by binding path, validated once at build time
//! - **Most specific binding wins**: resolution matches the concrete path of
//!   the current resource against every binding and picks the longest match
//! - **Streaming**: the writer and reader walk the graph depth-first with
//!   paired start/end events and an explicit path stack
//!
//! # Quick Start
//!
//! ```rust
//! use odata_graph::{ModelBuilder, Multiplicity, NestedResourceInfo, PrimitiveKind, Resource};
//! use odata_graph::codec::{ReadEvent, ReaderSettings, ResourceReader, ResourceWriter, WriterSettings};
//!
//! let model = ModelBuilder::new()
//!     .entity_type("NS.Order", |t| {
//!         t.key("ID", PrimitiveKind::Int32)
//!             .navigation("Customer", "NS.Customer", Multiplicity::One)
//!     })
//!     .entity_type("NS.Customer", |t| t.key("ID", PrimitiveKind::String))
//!     .container("Container")
//!     .entity_set("Orders", "NS.Order")
//!     .entity_set("Customers", "NS.Customer")
//!     .bind("Orders", "Customer", "Customers")
//!     .build()?;
//!
//! // Write an order with its customer inlined
//! let mut writer = ResourceWriter::new(&model, "Orders", Vec::new(), WriterSettings::new("http://host"))?;
//! writer.start_resource(&Resource::new().property("ID", 1))?;
//! writer.start_nested_info(&NestedResourceInfo::single("Customer"))?;
//! writer.start_resource(&Resource::new().property("ID", "alice"))?;
//! writer.end_resource()?;
//! writer.end_nested_info()?;
//! writer.end_resource()?;
//! let payload = String::from_utf8(writer.into_inner()?)?;
//!
//! // Read it back; identifiers come from the resolved entity sets
//! let reader = ResourceReader::new(&model, "Orders", payload, ReaderSettings::new("http://host"))?;
//! let mut ids = Vec::new();
//! for event in reader {
//!     if let ReadEvent::ResourceEnd(resource) = event? {
//!         ids.extend(resource.id);
//!     }
//! }
//! assert_eq!(ids, ["http://host/Customers('alice')", "http://host/Orders(1)"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! - [`model`]: Types, entity sets, bindings, resources and the model builder
//! - [`resolve`]: Path stack and binding resolution
//! - [`codec`]: JSON writer and reader, identifiers and context URLs
//! - [`uri`]: Resource path parsing
//! - [`validate`]: Build-time model validation
//! - [`error`]: Error types
//! - [`limits`]: Limits applied to untrusted input
//!
//! # Security
//!
//! The reader is designed to handle untrusted input:
//! - Document size and nesting depth are bounded
//! - Undeclared members are skipped (or rejected in strict mode), never guessed
//! - Invalid data is rejected with a JSON pointer to the offending value

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod resolve;
pub mod uri;
pub mod validate;

#[cfg(test)]
mod fixtures;

// Re-export commonly used types at crate root
pub use codec::{
    MetadataLevel, PayloadKind, ReadEvent, ReaderSettings, ReaderState, ResourceReader,
    ResourceWriter, WriterSettings,
};
pub use error::{
    ConfigurationError, ErrorKind, ParseError, ReadError, StructuralError, UriError, WriteError,
};
pub use model::{
    EntitySet, Model, ModelBuilder, Multiplicity, NavigationProperty, NestedResourceInfo,
    PrimitiveKind, Resource, ResourceSet, StructuredType, Value,
};
pub use resolve::{BindingResolver, PathFrame, PathStack, ResolvedTarget};
pub use uri::{parse_path, UriSegment};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
