//! Shared test models.

use lazy_static::lazy_static;

use crate::model::{Model, ModelBuilder, Multiplicity, PrimitiveKind};

pub const SERVICE_ROOT: &str = "http://host";

lazy_static! {
    /// Navigation bound per complex property, per containment and per cast.
    pub static ref MODEL: Model = multi_binding_model();
    /// Navigation declared only on a derived entity type.
    pub static ref DERIVED_MODEL: Model = derived_model();
}

pub fn multi_binding_model() -> Model {
    ModelBuilder::new()
        .entity_type("NS.EntityType", |t| {
            t.key("ID", PrimitiveKind::String)
                .contained("ContainedNav1", "NS.ContainedEntityType", Multiplicity::One)
                .contained("ContainedNav2", "NS.ContainedEntityType", Multiplicity::One)
                .contained("ContainedMany", "NS.ContainedEntityType", Multiplicity::Many)
                .complex_property("complexProp1", "NS.ComplexType")
                .complex_property("complexProp2", "NS.ComplexType")
                .navigation("UnboundNav", "NS.NavEntityType", Multiplicity::ZeroOrOne)
        })
        .entity_type("NS.DerivedEntityType", |t| {
            t.base("NS.EntityType")
                .navigation("NavOnDerived", "NS.NavEntityType", Multiplicity::One)
        })
        .entity_type("NS.ContainedEntityType", |t| {
            t.key("ID", PrimitiveKind::String).navigation(
                "NavOnContained",
                "NS.NavEntityType",
                Multiplicity::One,
            )
        })
        .entity_type("NS.NavEntityType", |t| {
            t.key("ID", PrimitiveKind::String)
                .property("Rank", PrimitiveKind::Int32)
                .property("Total", PrimitiveKind::Int64)
                .property("Ratio", PrimitiveKind::Double)
        })
        .complex_type("NS.ComplexType", |t| {
            t.property("Prop1", PrimitiveKind::String).navigation(
                "CollectionOfNavOnComplex",
                "NS.NavEntityType",
                Multiplicity::Many,
            )
        })
        .complex_type("NS.DerivedComplexType", |t| {
            t.base("NS.ComplexType")
                .property("DerivedProp", PrimitiveKind::String)
        })
        .container("Container")
        .entity_set("EntitySet", "NS.EntityType")
        .entity_set("NavEntitySet1", "NS.NavEntityType")
        .entity_set("NavEntitySet2", "NS.NavEntityType")
        .bind("EntitySet", "NS.DerivedEntityType/NavOnDerived", "NavEntitySet1")
        .bind("EntitySet", "complexProp1/CollectionOfNavOnComplex", "NavEntitySet1")
        .bind("EntitySet", "complexProp2/CollectionOfNavOnComplex", "NavEntitySet2")
        .bind("EntitySet", "ContainedNav1/NavOnContained", "NavEntitySet1")
        .bind("EntitySet", "ContainedNav2/NavOnContained", "NavEntitySet2")
        .build()
        .expect("multi-binding model is valid")
}

pub fn derived_model() -> Model {
    ModelBuilder::new()
        .entity_type("NS.EntityType", |t| t.key("ID", PrimitiveKind::String))
        .entity_type("NS.DerivedEntityType", |t| {
            t.base("NS.EntityType")
                .navigation("Nav", "NS.NavEntityType", Multiplicity::Many)
        })
        .entity_type("NS.NavEntityType", |t| t.key("ID", PrimitiveKind::String))
        .container("Container")
        .entity_set("EntitySet", "NS.EntityType")
        .entity_set("NavEntitySet", "NS.NavEntityType")
        .bind("EntitySet", "NS.DerivedEntityType/Nav", "NavEntitySet")
        .build()
        .expect("derived model is valid")
}
