//! In-flight resource graph items exchanged with the writer and reader.

use std::fmt;

use uuid::Uuid;

use crate::model::PrimitiveKind;

/// A primitive (or primitive collection) property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    Guid(Uuid),
    Collection(Vec<Value>),
}

impl Value {
    /// Returns the primitive kind of a scalar value, `None` for null and collections.
    pub fn kind(&self) -> Option<PrimitiveKind> {
        match self {
            Value::Bool(_) => Some(PrimitiveKind::Boolean),
            Value::Int32(_) => Some(PrimitiveKind::Int32),
            Value::Int64(_) => Some(PrimitiveKind::Int64),
            Value::Double(_) => Some(PrimitiveKind::Double),
            Value::String(_) => Some(PrimitiveKind::String),
            Value::Guid(_) => Some(PrimitiveKind::Guid),
            Value::Null | Value::Collection(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this scalar can be stored in a property of `kind`.
    ///
    /// Kinds must match exactly; integers do not widen.
    pub fn fits(&self, kind: PrimitiveKind) -> bool {
        self.kind() == Some(kind)
    }

    /// Returns the string slice of a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Guid(g) => write!(f, "{g}"),
            Value::Collection(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Uuid> for Value {
    fn from(g: Uuid) -> Self {
        Value::Guid(g)
    }
}

/// A named property value on a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: Value,
}

/// An entity or complex instance.
///
/// The writer reads `type_name` and `properties`; the reader additionally
/// fills in `id` with the computed (or explicitly annotated) identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    /// Explicit type name; a type cast when more specific than expected.
    pub type_name: Option<String>,
    pub id: Option<String>,
    pub properties: Vec<Property>,
}

impl Resource {
    /// An untyped resource with no properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the explicit type name.
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Appends a property.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.push(Property {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Finds a property value by name.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

/// Marker for a navigation or complex-valued property being written or read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedResourceInfo {
    pub name: String,
    pub is_collection: bool,
}

impl NestedResourceInfo {
    /// Marker for a single-valued property.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_collection: false,
        }
    }

    /// Marker for a collection-valued property.
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_collection: true,
        }
    }
}

/// A collection of resources (feed or collection-valued nested property).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
    /// Optional `@odata.count` carried by top-level feeds.
    pub count: Option<i64>,
}

impl ResourceSet {
    /// A resource set without a count.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_fits_exact_kind() {
        assert!(Value::Int32(1).fits(PrimitiveKind::Int32));
        assert!(!Value::Int32(1).fits(PrimitiveKind::Int64));
        assert!(!Value::Int32(1).fits(PrimitiveKind::Double));
        assert!(!Value::Int64(1).fits(PrimitiveKind::Double));
        assert!(!Value::Int64(1).fits(PrimitiveKind::Int32));
        assert!(!Value::from("x").fits(PrimitiveKind::Guid));
        assert!(Value::Guid(Uuid::nil()).fits(PrimitiveKind::Guid));
    }

    #[test]
    fn test_resource_builder() {
        let r = Resource::new()
            .with_type("NS.Derived")
            .property("ID", "a")
            .property("Count", 3);
        assert_eq!(r.type_name.as_deref(), Some("NS.Derived"));
        assert_eq!(r.value("ID"), Some(&Value::from("a")));
        assert_eq!(r.value("Count"), Some(&Value::Int32(3)));
        assert_eq!(r.value("Missing"), None);
    }
}
