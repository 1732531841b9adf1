//! Error types for model construction, writing, reading and path parsing.

use thiserror::Error;

use crate::model::{PrimitiveKind, TypeKind};

/// Coarse error taxonomy shared by all error enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The model is malformed or ambiguous, or a lookup missed.
    Configuration,
    /// A writer or reader call sequence violated the nesting rules.
    Structural,
    /// The input document is malformed or truncated.
    Parse,
    /// A property value does not fit its declared type.
    Value,
    /// The underlying sink failed.
    Io,
}

/// Error detected while building or querying the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{what} {name:?} not found")]
    NotFound { what: &'static str, name: String },

    #[error("duplicate type {name:?}")]
    DuplicateType { name: String },

    #[error("duplicate entity set {name:?}")]
    DuplicateEntitySet { name: String },

    #[error("type {type_name:?} declares member {member:?} more than once (including inherited members)")]
    DuplicateMember { type_name: String, member: String },

    #[error("{context} references unknown type {name:?}")]
    DanglingType { context: String, name: String },

    #[error("{context}: type {name:?} is not {expected} type")]
    KindMismatch {
        context: String,
        name: String,
        expected: TypeKind,
    },

    #[error("base type chain of {type_name:?} contains a cycle")]
    BaseChainCycle { type_name: String },

    #[error("entity type {type_name:?} has no key")]
    MissingKey { type_name: String },

    #[error("key property {property:?} of {type_name:?} must be a declared scalar primitive property")]
    InvalidKey { type_name: String, property: String },

    #[error("entity sets declared without a named entity container")]
    MissingContainer,

    #[error("invalid binding path {path:?} on entity set {source_set:?}: {reason}")]
    InvalidBindingPath {
        source_set: String,
        path: String,
        reason: String,
    },

    #[error("binding {path:?} on {source_set:?} targets {target:?} whose entity type does not match the navigation target {expected:?}")]
    IncompatibleBindingTarget {
        source_set: String,
        path: String,
        target: String,
        expected: String,
    },

    #[error("entity set {source_set:?} binds navigation {navigation:?} twice via path {path:?}")]
    DuplicateBinding {
        source_set: String,
        navigation: String,
        path: String,
    },

    #[error("entity set {source_set:?} has equally specific bindings {first:?} and {second:?} for navigation {navigation:?}")]
    AmbiguousBinding {
        source_set: String,
        navigation: String,
        first: String,
        second: String,
    },
}

impl ConfigurationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Error raised when a writer or reader call sequence is not well nested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("cannot start {found} inside {scope}")]
    UnexpectedStart {
        scope: &'static str,
        found: &'static str,
    },

    #[error("end of {found} does not match the open {scope}")]
    UnexpectedEnd {
        scope: &'static str,
        found: &'static str,
    },

    #[error("type {type_name:?} has no navigation or complex property {name:?}")]
    UnknownMember { type_name: String, name: String },

    #[error("type {type_name:?} has no primitive property {name:?}")]
    UnknownProperty { type_name: String, name: String },

    #[error("property {name:?} of {type_name:?} is given more than once")]
    DuplicateProperty { type_name: String, name: String },

    #[error("nested resource info {name:?} declared is_collection={declared}, got is_collection={requested}")]
    CollectionMismatch {
        name: String,
        declared: bool,
        requested: bool,
    },

    #[error("single-valued nested resource info {name:?} already has content")]
    DuplicateContent { name: String },

    #[error("type {type_name:?} is not {expected:?} or derived from it")]
    TypeNotDerived { type_name: String, expected: String },

    #[error("the payload has already been completed")]
    Completed,

    #[error("session aborted by an earlier error")]
    Aborted,
}

impl StructuralError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Structural
    }
}

/// Error raised for malformed input documents.
///
/// Syntax errors carry a line/column; structural errors carry the JSON
/// pointer of the offending value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("document length {len} exceeds maximum {max}")]
    TooLarge { len: usize, max: usize },

    #[error("at {pointer:?}: expected {expected}, found {found}")]
    UnexpectedValue {
        pointer: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("at {pointer:?}: property {name:?} is not declared on the expected type")]
    UnknownProperty { pointer: String, name: String },

    #[error("at {pointer:?}: value of {property:?} is not a valid {expected}")]
    InvalidValue {
        pointer: String,
        property: String,
        expected: PrimitiveKind,
    },

    #[error("at {pointer:?}: invalid annotation {annotation:?}: {reason}")]
    InvalidAnnotation {
        pointer: String,
        annotation: String,
        reason: &'static str,
    },

    #[error("at {pointer:?}: unknown type {type_name:?}")]
    UnknownType { pointer: String, type_name: String },

    #[error("at {pointer:?}: type {type_name:?} is not {expected:?} or derived from it")]
    TypeNotDerived {
        pointer: String,
        type_name: String,
        expected: String,
    },

    #[error("context URL {found:?} does not describe {expected:?}")]
    ContextMismatch { expected: String, found: String },

    #[error("at {pointer:?}: nesting depth exceeds maximum {max}")]
    DepthExceeded { pointer: String, max: usize },
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Parse
    }

    /// Returns a human-readable position of the offending token, if known.
    pub fn position(&self) -> Option<String> {
        match self {
            ParseError::Syntax { line, column, .. } => Some(format!("{line}:{column}")),
            ParseError::UnexpectedValue { pointer, .. }
            | ParseError::UnknownProperty { pointer, .. }
            | ParseError::InvalidValue { pointer, .. }
            | ParseError::InvalidAnnotation { pointer, .. }
            | ParseError::UnknownType { pointer, .. }
            | ParseError::TypeNotDerived { pointer, .. }
            | ParseError::DepthExceeded { pointer, .. } => Some(pointer.clone()),
            ParseError::TooLarge { .. } | ParseError::ContextMismatch { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::Syntax {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        }
    }
}

/// Error during writing.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("value of property {property:?} does not fit declared type {expected}")]
    InvalidValue { property: String, expected: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl WriteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WriteError::Structural(_) => ErrorKind::Structural,
            WriteError::Configuration(_) => ErrorKind::Configuration,
            WriteError::InvalidValue { .. } => ErrorKind::Value,
            WriteError::Io(_) | WriteError::Json(_) => ErrorKind::Io,
        }
    }
}

/// Error during reading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl ReadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReadError::Parse(_) => ErrorKind::Parse,
            ReadError::Structural(_) => ErrorKind::Structural,
            ReadError::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

/// Error while parsing or resolving a resource path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("{uri:?} is not under service root {service_root:?}")]
    NotUnderServiceRoot { uri: String, service_root: String },

    #[error("resource path is empty")]
    EmptyPath,

    #[error("segment {segment:?} cannot be resolved")]
    UnknownSegment { segment: String },

    #[error("key {segment:?} is not allowed here")]
    UnexpectedKey { segment: String },

    #[error("segment {segment:?} follows a collection and needs a key")]
    KeyRequired { segment: String },

    #[error("resource path has {count} segments, maximum is {max}")]
    TooManySegments { count: usize, max: usize },

    #[error("invalid key {segment:?}: {reason}")]
    InvalidKey {
        segment: String,
        reason: &'static str,
    },

    #[error("type {type_name:?} is not derived from {expected:?}")]
    TypeNotDerived { type_name: String, expected: String },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl UriError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UriError::Configuration(_) => ErrorKind::Configuration,
            _ => ErrorKind::Parse,
        }
    }
}
