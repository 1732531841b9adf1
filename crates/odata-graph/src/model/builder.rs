//! Builder API for ergonomic Model construction.
//!
//! Provides a fluent interface for declaring types, entity sets and
//! navigation bindings. All consistency checks run in [`ModelBuilder::build`].
//!
//! # Example
//!
//! ```rust
//! use odata_graph::model::{ModelBuilder, Multiplicity, PrimitiveKind};
//!
//! let model = ModelBuilder::new()
//!     .entity_type("NS.Order", |t| t
//!         .key("ID", PrimitiveKind::Int32)
//!         .complex_property("Shipping", "NS.Address")
//!     )
//!     .complex_type("NS.Address", |t| t
//!         .property("City", PrimitiveKind::String)
//!         .navigation("Warehouse", "NS.Warehouse", Multiplicity::ZeroOrOne)
//!     )
//!     .entity_type("NS.Warehouse", |t| t.key("Code", PrimitiveKind::String))
//!     .container("Container")
//!     .entity_set("Orders", "NS.Order")
//!     .entity_set("Warehouses", "NS.Warehouse")
//!     .bind("Orders", "Shipping/Warehouse", "Warehouses")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(model.bindings("Orders").len(), 1);
//! ```

use rustc_hash::FxHashMap;

use crate::error::ConfigurationError;
use crate::model::{
    EntityContainer, EntitySet, Model, Multiplicity, NavigationBinding, NavigationProperty,
    PrimitiveKind, PropertyType, StructuralProperty, StructuredType, TypeKind,
};
use crate::validate::{parse_binding_path, validate_bindings, validate_schema};

/// Builder for constructing a [`Model`].
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    types: Vec<StructuredType>,
    container: EntityContainer,
    /// (source set, binding path, target set) as declared.
    bindings: Vec<(String, String, String)>,
}

impl ModelBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an entity type using a builder function.
    pub fn entity_type<F>(self, qualified_name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(TypeBuilder) -> TypeBuilder,
    {
        self.structured_type(qualified_name.into(), TypeKind::Entity, f)
    }

    /// Declares a complex type using a builder function.
    pub fn complex_type<F>(self, qualified_name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(TypeBuilder) -> TypeBuilder,
    {
        self.structured_type(qualified_name.into(), TypeKind::Complex, f)
    }

    fn structured_type<F>(mut self, qualified_name: String, kind: TypeKind, f: F) -> Self
    where
        F: FnOnce(TypeBuilder) -> TypeBuilder,
    {
        let builder = f(TypeBuilder::new(qualified_name, kind));
        self.types.push(builder.ty);
        self
    }

    /// Names the entity container.
    pub fn container(mut self, name: impl Into<String>) -> Self {
        self.container.name = name.into();
        self
    }

    /// Adds an entity set of the given entity type.
    pub fn entity_set(mut self, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.container.entity_sets.push(EntitySet {
            name: name.into(),
            entity_type: entity_type.into(),
        });
        self
    }

    /// Binds a navigation reached via `path` from `source_set` to `target_set`.
    ///
    /// The path is `/`-separated: complex property names, qualified cast
    /// names and contained navigation names, ending with the navigation.
    pub fn bind(
        mut self,
        source_set: impl Into<String>,
        path: impl Into<String>,
        target_set: impl Into<String>,
    ) -> Self {
        self.bindings
            .push((source_set.into(), path.into(), target_set.into()));
        self
    }

    /// Validates the declarations and builds the model.
    pub fn build(self) -> Result<Model, ConfigurationError> {
        validate_schema(&self.types, &self.container)?;

        // Binding paths are resolved against the type graph itself.
        let mut model = Model::from_parts(self.types, self.container, FxHashMap::default());

        let mut table: FxHashMap<String, Vec<NavigationBinding>> = FxHashMap::default();
        for (source, path, target) in &self.bindings {
            model.entity_set(target)?;
            let (navigation, binding_path) = parse_binding_path(&model, source, path)?;
            table
                .entry(source.clone())
                .or_default()
                .push(NavigationBinding {
                    navigation,
                    path: binding_path,
                    target: target.clone(),
                });
        }
        validate_bindings(&model, &table)?;

        model.set_bindings(table);
        Ok(model)
    }
}

/// Builder for one structured type's members.
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    ty: StructuredType,
}

impl TypeBuilder {
    fn new(qualified_name: String, kind: TypeKind) -> Self {
        Self {
            ty: StructuredType {
                qualified_name,
                kind,
                base_type: None,
                key: Vec::new(),
                properties: Vec::new(),
                navigation_properties: Vec::new(),
            },
        }
    }

    /// Sets the base type (qualified name).
    pub fn base(mut self, base_type: impl Into<String>) -> Self {
        self.ty.base_type = Some(base_type.into());
        self
    }

    /// Adds a non-nullable primitive property and makes it part of the key.
    pub fn key(mut self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        let name = name.into();
        self.ty.key.push(name.clone());
        self.push_property(name, PropertyType::Primitive(kind), false, false)
    }

    /// Adds a nullable primitive property.
    pub fn property(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.push_property(name.into(), PropertyType::Primitive(kind), false, true)
    }

    /// Adds a non-nullable primitive property.
    pub fn required_property(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.push_property(name.into(), PropertyType::Primitive(kind), false, false)
    }

    /// Adds a collection of primitives.
    pub fn collection_property(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.push_property(name.into(), PropertyType::Primitive(kind), true, false)
    }

    /// Adds a complex-valued property.
    pub fn complex_property(self, name: impl Into<String>, complex_type: impl Into<String>) -> Self {
        self.push_property(name.into(), PropertyType::Complex(complex_type.into()), false, true)
    }

    /// Adds a collection of complex values.
    pub fn complex_collection(
        self,
        name: impl Into<String>,
        complex_type: impl Into<String>,
    ) -> Self {
        self.push_property(name.into(), PropertyType::Complex(complex_type.into()), true, false)
    }

    /// Adds a non-containment navigation property.
    pub fn navigation(
        self,
        name: impl Into<String>,
        target_type: impl Into<String>,
        multiplicity: Multiplicity,
    ) -> Self {
        self.push_navigation(name.into(), target_type.into(), multiplicity, false)
    }

    /// Adds a containment navigation property.
    pub fn contained(
        self,
        name: impl Into<String>,
        target_type: impl Into<String>,
        multiplicity: Multiplicity,
    ) -> Self {
        self.push_navigation(name.into(), target_type.into(), multiplicity, true)
    }

    fn push_property(
        mut self,
        name: String,
        ty: PropertyType,
        is_collection: bool,
        nullable: bool,
    ) -> Self {
        self.ty.properties.push(StructuralProperty {
            name,
            ty,
            is_collection,
            nullable,
        });
        self
    }

    fn push_navigation(
        mut self,
        name: String,
        target_type: String,
        multiplicity: Multiplicity,
        contains_target: bool,
    ) -> Self {
        let declaring_type = self.ty.qualified_name.clone();
        self.ty.navigation_properties.push(NavigationProperty {
            name,
            declaring_type,
            target_type,
            multiplicity,
            contains_target,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> ModelBuilder {
        ModelBuilder::new()
            .entity_type("NS.Person", |t| {
                t.key("ID", PrimitiveKind::Int32)
                    .complex_property("Home", "NS.Address")
                    .complex_property("Work", "NS.Address")
            })
            .complex_type("NS.Address", |t| {
                t.property("City", PrimitiveKind::String).navigation(
                    "Country",
                    "NS.Country",
                    Multiplicity::ZeroOrOne,
                )
            })
            .entity_type("NS.Country", |t| t.key("Code", PrimitiveKind::String))
            .container("Container")
            .entity_set("People", "NS.Person")
            .entity_set("Countries", "NS.Country")
            .entity_set("OtherCountries", "NS.Country")
    }

    #[test]
    fn test_build_multi_binding() {
        let model = base_builder()
            .bind("People", "Home/Country", "Countries")
            .bind("People", "Work/Country", "OtherCountries")
            .build()
            .unwrap();

        let bindings = model.bindings("People");
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].path.to_string(), "Home/Country");
        assert_eq!(bindings[0].navigation.declaring_type, "NS.Address");
        assert_eq!(bindings[1].target, "OtherCountries");
    }

    #[test]
    fn test_duplicate_binding_path_rejected() {
        let err = base_builder()
            .bind("People", "Home/Country", "Countries")
            .bind("People", "Home/Country", "OtherCountries")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateBinding { .. }));
    }

    #[test]
    fn test_unknown_target_set_rejected() {
        let err = base_builder()
            .bind("People", "Home/Country", "Nowhere")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::NotFound {
                what: "entity set",
                ..
            }
        ));
    }

    #[test]
    fn test_dangling_complex_type_rejected() {
        let err = ModelBuilder::new()
            .entity_type("NS.Person", |t| {
                t.key("ID", PrimitiveKind::Int32)
                    .complex_property("Home", "NS.Missing")
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DanglingType { .. }));
    }
}
