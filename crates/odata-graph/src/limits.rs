//! Limits applied when reading untrusted payloads.
//!
//! The reader rejects input exceeding these bounds before doing any work
//! proportional to it.

/// Maximum document length in bytes (64 MiB).
pub const MAX_DOCUMENT_SIZE: usize = 64 * 1024 * 1024;

/// Default maximum nesting depth of resources, resource sets and nested
/// infos. Each level of JSON object or array counts once.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Maximum number of properties in a composite key literal.
pub const MAX_KEY_PROPERTIES: usize = 16;

/// Maximum number of segments in a resource path.
pub const MAX_PATH_SEGMENTS: usize = 128;
