//! Structured type descriptors.
//!
//! Entity and complex types share one record tagged with [`TypeKind`]; the
//! inheritance chain is an explicit base-type name resolved through the
//! [`Model`](crate::model::Model), never language-level inheritance.

use std::fmt;

/// Primitive value kinds understood by the reader and writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Boolean,
    Int32,
    Int64,
    Double,
    Guid,
}

impl PrimitiveKind {
    /// Returns the qualified EDM name (e.g. `Edm.String`).
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::String => "Edm.String",
            PrimitiveKind::Boolean => "Edm.Boolean",
            PrimitiveKind::Int32 => "Edm.Int32",
            PrimitiveKind::Int64 => "Edm.Int64",
            PrimitiveKind::Double => "Edm.Double",
            PrimitiveKind::Guid => "Edm.Guid",
        }
    }

    /// Looks up a kind by its qualified EDM name.
    pub fn from_name(name: &str) -> Option<PrimitiveKind> {
        match name {
            "Edm.String" => Some(PrimitiveKind::String),
            "Edm.Boolean" => Some(PrimitiveKind::Boolean),
            "Edm.Int32" => Some(PrimitiveKind::Int32),
            "Edm.Int64" => Some(PrimitiveKind::Int64),
            "Edm.Double" => Some(PrimitiveKind::Double),
            "Edm.Guid" => Some(PrimitiveKind::Guid),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The declared type of a structural property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    Primitive(PrimitiveKind),
    /// Qualified name of a complex type.
    Complex(String),
}

/// A structural (non-navigation) property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralProperty {
    pub name: String,
    pub ty: PropertyType,
    pub is_collection: bool,
    pub nullable: bool,
}

impl StructuralProperty {
    /// Returns the complex type name if this property is complex-typed.
    pub fn complex_type(&self) -> Option<&str> {
        match &self.ty {
            PropertyType::Complex(name) => Some(name),
            PropertyType::Primitive(_) => None,
        }
    }

    /// Returns the primitive kind if this property is primitive-typed.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match &self.ty {
            PropertyType::Primitive(kind) => Some(*kind),
            PropertyType::Complex(_) => None,
        }
    }
}

/// Target multiplicity of a navigation property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    ZeroOrOne,
    One,
    Many,
}

/// A navigation property declared on an entity or complex type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationProperty {
    pub name: String,
    /// Qualified name of the type that declares this property.
    pub declaring_type: String,
    /// Qualified name of the target entity type.
    pub target_type: String,
    pub multiplicity: Multiplicity,
    /// The target has no identity outside its parent.
    pub contains_target: bool,
}

impl NavigationProperty {
    /// Returns true for to-many navigations.
    pub fn is_collection(&self) -> bool {
        self.multiplicity == Multiplicity::Many
    }
}

/// Discriminates entity types from complex types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Entity,
    Complex,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Entity => f.write_str("entity"),
            TypeKind::Complex => f.write_str("complex"),
        }
    }
}

/// An entity or complex type with its declared (not inherited) members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredType {
    pub qualified_name: String,
    pub kind: TypeKind,
    /// Qualified name of the base type, if any.
    pub base_type: Option<String>,
    /// Declared key property names. Derived entity types inherit their key.
    pub key: Vec<String>,
    pub properties: Vec<StructuralProperty>,
    pub navigation_properties: Vec<NavigationProperty>,
}

impl StructuredType {
    /// Returns the namespace part of the qualified name.
    pub fn namespace(&self) -> &str {
        self.qualified_name
            .rsplit_once('.')
            .map(|(ns, _)| ns)
            .unwrap_or("")
    }

    /// Returns the unqualified type name.
    pub fn name(&self) -> &str {
        self.qualified_name
            .rsplit_once('.')
            .map(|(_, name)| name)
            .unwrap_or(&self.qualified_name)
    }

    /// Returns true for entity types.
    pub fn is_entity(&self) -> bool {
        self.kind == TypeKind::Entity
    }

    /// Finds a structural property declared directly on this type.
    pub fn declared_property(&self, name: &str) -> Option<&StructuralProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Finds a navigation property declared directly on this type.
    pub fn declared_navigation(&self, name: &str) -> Option<&NavigationProperty> {
        self.navigation_properties.iter().find(|p| p.name == name)
    }
}

/// A member found by name on a type or one of its bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member<'m> {
    Structural(&'m StructuralProperty),
    Navigation(&'m NavigationProperty),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_names_roundtrip() {
        for kind in [
            PrimitiveKind::String,
            PrimitiveKind::Boolean,
            PrimitiveKind::Int32,
            PrimitiveKind::Int64,
            PrimitiveKind::Double,
            PrimitiveKind::Guid,
        ] {
            assert_eq!(PrimitiveKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_name("Edm.Decimal"), None);
    }

    #[test]
    fn test_qualified_name_parts() {
        let ty = StructuredType {
            qualified_name: "Sales.Orders.Order".to_string(),
            kind: TypeKind::Entity,
            base_type: None,
            key: vec![],
            properties: vec![],
            navigation_properties: vec![],
        };
        assert_eq!(ty.namespace(), "Sales.Orders");
        assert_eq!(ty.name(), "Order");
    }
}
