//! JSON wire format for resource graphs.
//!
//! The writer and reader share identifier computation ([`id`]), context
//! URLs ([`context`]) and primitive value handling ([`value`]), so a payload
//! written by one is read back by the other with identical identifiers.

pub mod context;
pub mod id;
pub mod json;
pub mod reader;
pub mod value;
pub mod writer;

pub use id::{format_key, format_key_value, parse_key, Identifiers, ParentEntity};
pub use json::JsonWriter;
pub use reader::{PayloadKind, ReadEvent, ReaderSettings, ReaderState, ResourceReader};
pub use writer::{MetadataLevel, ResourceWriter, WriterSettings};
