//! Build-time validation of model declarations.
//!
//! Everything that could make the graph walk ill-defined is rejected here,
//! before any writer or reader exists: dangling type references, base-chain
//! cycles, missing keys, malformed binding paths, duplicate bindings and
//! bindings whose paths could match the same concrete path with equal
//! specificity. Resolution therefore never has to break a tie at runtime.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ConfigurationError;
use crate::model::{
    BindingPath, BindingSegment, EntityContainer, Member, Model, NavigationBinding,
    NavigationRef, SegmentKind, StructuredType, TypeKind,
};

type TypeIndex<'a> = FxHashMap<&'a str, &'a StructuredType>;

/// Validates type and container declarations.
pub fn validate_schema(
    types: &[StructuredType],
    container: &EntityContainer,
) -> Result<(), ConfigurationError> {
    let mut index: TypeIndex<'_> = FxHashMap::default();
    for ty in types {
        if index.insert(ty.qualified_name.as_str(), ty).is_some() {
            return Err(ConfigurationError::DuplicateType {
                name: ty.qualified_name.clone(),
            });
        }
    }

    for ty in types {
        validate_base_chain(ty, &index)?;
    }
    for ty in types {
        validate_members(ty, &index)?;
        if ty.kind == TypeKind::Entity {
            validate_key(ty, &index)?;
        }
    }
    validate_container(container, &index)
}

fn validate_base_chain(ty: &StructuredType, index: &TypeIndex<'_>) -> Result<(), ConfigurationError> {
    let mut current = ty;
    let mut steps = 0;
    while let Some(base_name) = current.base_type.as_deref() {
        let base = index
            .get(base_name)
            .copied()
            .ok_or_else(|| ConfigurationError::DanglingType {
                context: format!("base type of {}", current.qualified_name),
                name: base_name.to_string(),
            })?;
        if base.kind != current.kind {
            return Err(ConfigurationError::KindMismatch {
                context: format!("base type of {}", current.qualified_name),
                name: base_name.to_string(),
                expected: current.kind,
            });
        }
        steps += 1;
        if steps > index.len() {
            return Err(ConfigurationError::BaseChainCycle {
                type_name: ty.qualified_name.clone(),
            });
        }
        current = base;
    }
    Ok(())
}

/// The base chain of an acyclic type, most derived first.
fn chain<'a>(ty: &'a StructuredType, index: &TypeIndex<'a>) -> Vec<&'a StructuredType> {
    let mut out = vec![ty];
    let mut current = ty;
    while let Some(base) = current
        .base_type
        .as_deref()
        .and_then(|name| index.get(name).copied())
    {
        out.push(base);
        current = base;
    }
    out
}

fn expect_type<'a>(
    index: &TypeIndex<'a>,
    context: String,
    name: &str,
    expected: TypeKind,
) -> Result<&'a StructuredType, ConfigurationError> {
    let ty = index
        .get(name)
        .copied()
        .ok_or_else(|| ConfigurationError::DanglingType {
            context: context.clone(),
            name: name.to_string(),
        })?;
    if ty.kind != expected {
        return Err(ConfigurationError::KindMismatch {
            context,
            name: name.to_string(),
            expected,
        });
    }
    Ok(ty)
}

fn validate_members(ty: &StructuredType, index: &TypeIndex<'_>) -> Result<(), ConfigurationError> {
    let mut seen = FxHashSet::default();
    for t in chain(ty, index) {
        let names = t
            .properties
            .iter()
            .map(|p| p.name.as_str())
            .chain(t.navigation_properties.iter().map(|n| n.name.as_str()));
        for name in names {
            if !seen.insert(name) {
                return Err(ConfigurationError::DuplicateMember {
                    type_name: ty.qualified_name.clone(),
                    member: name.to_string(),
                });
            }
        }
    }

    for property in &ty.properties {
        if let Some(complex) = property.complex_type() {
            expect_type(
                index,
                format!("property {}.{}", ty.qualified_name, property.name),
                complex,
                TypeKind::Complex,
            )?;
        }
    }
    for navigation in &ty.navigation_properties {
        expect_type(
            index,
            format!("navigation {}.{}", ty.qualified_name, navigation.name),
            &navigation.target_type,
            TypeKind::Entity,
        )?;
    }
    Ok(())
}

fn validate_key(ty: &StructuredType, index: &TypeIndex<'_>) -> Result<(), ConfigurationError> {
    let types = chain(ty, index);
    let Some(position) = types.iter().position(|t| !t.key.is_empty()) else {
        return Err(ConfigurationError::MissingKey {
            type_name: ty.qualified_name.clone(),
        });
    };
    let declaring = types[position];
    for name in &declaring.key {
        let property = types[position..]
            .iter()
            .find_map(|t| t.declared_property(name));
        let valid = property
            .map(|p| p.primitive_kind().is_some() && !p.is_collection)
            .unwrap_or(false);
        if !valid {
            return Err(ConfigurationError::InvalidKey {
                type_name: declaring.qualified_name.clone(),
                property: name.clone(),
            });
        }
    }
    Ok(())
}

fn validate_container(
    container: &EntityContainer,
    index: &TypeIndex<'_>,
) -> Result<(), ConfigurationError> {
    if !container.entity_sets.is_empty() && container.name.is_empty() {
        return Err(ConfigurationError::MissingContainer);
    }
    let mut seen = FxHashSet::default();
    for set in &container.entity_sets {
        if !seen.insert(set.name.as_str()) {
            return Err(ConfigurationError::DuplicateEntitySet {
                name: set.name.clone(),
            });
        }
        expect_type(
            index,
            format!("entity set {}", set.name),
            &set.entity_type,
            TypeKind::Entity,
        )?;
    }
    Ok(())
}

/// Parses a `/`-separated binding path declared on `source_set`.
///
/// Segments are resolved against the type graph starting at the set's
/// entity type: qualified names are casts (which must derive from the
/// current type), complex properties and containment navigations are
/// traversed, and the final segment must be a navigation property.
pub fn parse_binding_path(
    model: &Model,
    source_set: &str,
    path: &str,
) -> Result<(NavigationRef, BindingPath), ConfigurationError> {
    let set = model.entity_set(source_set)?;
    let mut current = model.entity_set_type(set)?;

    let invalid = |reason: String| ConfigurationError::InvalidBindingPath {
        source_set: source_set.to_string(),
        path: path.to_string(),
        reason,
    };

    let raw: Vec<&str> = path.split('/').collect();
    if raw.iter().any(|s| s.is_empty()) {
        return Err(invalid("empty segment".to_string()));
    }

    let mut segments = Vec::with_capacity(raw.len());
    for (i, name) in raw.iter().copied().enumerate() {
        let last = i + 1 == raw.len();

        if name.contains('.') {
            if last {
                return Err(invalid("path must end with a navigation property".to_string()));
            }
            let cast = model
                .find_type(name)
                .map_err(|_| invalid(format!("unknown type {name:?}")))?;
            // A payload never carries a cast to the type already in effect.
            if cast.qualified_name == current.qualified_name {
                return Err(invalid(format!("{name:?} casts to the current type")));
            }
            if !model.is_derived_from(cast, current) {
                return Err(invalid(format!(
                    "{name:?} does not derive from {:?}",
                    current.qualified_name
                )));
            }
            segments.push(BindingSegment::new(SegmentKind::TypeCast, name));
            current = cast;
            continue;
        }

        match model.find_member(current, name) {
            None => {
                return Err(invalid(format!(
                    "{name:?} is not a member of {:?}",
                    current.qualified_name
                )));
            }
            Some(Member::Structural(property)) => {
                if last {
                    return Err(invalid("path must end with a navigation property".to_string()));
                }
                let Some(complex) = property.complex_type() else {
                    return Err(invalid(format!("cannot traverse primitive property {name:?}")));
                };
                segments.push(BindingSegment::new(SegmentKind::Property, name));
                current = model.find_type(complex)?;
            }
            Some(Member::Navigation(navigation)) => {
                segments.push(BindingSegment::new(SegmentKind::Navigation, name));
                if last {
                    let reference = NavigationRef {
                        declaring_type: navigation.declaring_type.clone(),
                        name: navigation.name.clone(),
                    };
                    return Ok((reference, BindingPath(segments)));
                }
                if !navigation.contains_target {
                    return Err(invalid(format!(
                        "cannot traverse non-containment navigation {name:?}"
                    )));
                }
                current = model.find_type(&navigation.target_type)?;
            }
        }
    }

    Err(invalid("path must end with a navigation property".to_string()))
}

/// Validates a binding table: target compatibility, duplicates and ambiguity.
pub fn validate_bindings(
    model: &Model,
    table: &FxHashMap<String, Vec<NavigationBinding>>,
) -> Result<(), ConfigurationError> {
    for (source_set, bindings) in table {
        for binding in bindings {
            validate_binding_target(model, source_set, binding)?;
        }

        for (i, first) in bindings.iter().enumerate() {
            for second in &bindings[i + 1..] {
                if first.navigation != second.navigation {
                    continue;
                }
                if first.path == second.path {
                    return Err(ConfigurationError::DuplicateBinding {
                        source_set: source_set.clone(),
                        navigation: first.navigation.to_string(),
                        path: first.path.to_string(),
                    });
                }
                if could_match_equally(&first.path, &second.path) {
                    return Err(ConfigurationError::AmbiguousBinding {
                        source_set: source_set.clone(),
                        navigation: first.navigation.to_string(),
                        first: first.path.to_string(),
                        second: second.path.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn validate_binding_target(
    model: &Model,
    source_set: &str,
    binding: &NavigationBinding,
) -> Result<(), ConfigurationError> {
    let declaring = model.find_type(&binding.navigation.declaring_type)?;
    let navigation = declaring
        .declared_navigation(&binding.navigation.name)
        .ok_or_else(|| ConfigurationError::NotFound {
            what: "navigation property",
            name: binding.navigation.to_string(),
        })?;
    let expected = model.find_type(&navigation.target_type)?;
    let target_set = model.entity_set(&binding.target)?;
    let actual = model.entity_set_type(target_set)?;
    if !model.is_derived_from(actual, expected) {
        return Err(ConfigurationError::IncompatibleBindingTarget {
            source_set: source_set.to_string(),
            path: binding.path.to_string(),
            target: binding.target.clone(),
            expected: navigation.target_type.clone(),
        });
    }
    Ok(())
}

/// Two distinct paths can match one concrete path with the same specificity
/// when they share their cast-free skeleton and cast count but place the
/// casts at different positions. Casts at identical positions with
/// different names can never both match, since a concrete path carries at
/// most one cast between two skeleton hops.
fn could_match_equally(a: &BindingPath, b: &BindingPath) -> bool {
    a.skeleton().eq(b.skeleton())
        && a.cast_count() == b.cast_count()
        && a.cast_positions() != b.cast_positions()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::MODEL;
    use crate::model::{ModelBuilder, Multiplicity, PrimitiveKind};

    fn shapes() -> ModelBuilder {
        ModelBuilder::new()
            .entity_type("NS.Shape", |t| {
                t.key("ID", PrimitiveKind::String)
                    .complex_property("Style", "NS.Style")
            })
            .entity_type("NS.Circle", |t| t.base("NS.Shape"))
            .complex_type("NS.Style", |t| {
                t.property("Color", PrimitiveKind::String)
            })
            .complex_type("NS.FancyStyle", |t| {
                t.base("NS.Style")
                    .navigation("Palette", "NS.Palette", Multiplicity::One)
            })
            .entity_type("NS.Palette", |t| t.key("ID", PrimitiveKind::String))
            .container("Container")
            .entity_set("Shapes", "NS.Shape")
            .entity_set("Palettes", "NS.Palette")
            .entity_set("OtherPalettes", "NS.Palette")
    }

    #[test]
    fn test_parse_paths_of_fixture() {
        let (nav, path) =
            parse_binding_path(&MODEL, "EntitySet", "ContainedNav1/NavOnContained").unwrap();
        assert_eq!(nav.declaring_type, "NS.ContainedEntityType");
        assert_eq!(path.segments()[0].kind, SegmentKind::Navigation);

        let (nav, path) =
            parse_binding_path(&MODEL, "EntitySet", "NS.DerivedEntityType/NavOnDerived").unwrap();
        assert_eq!(nav.name, "NavOnDerived");
        assert_eq!(path.segments()[0].kind, SegmentKind::TypeCast);
    }

    #[test]
    fn test_path_through_non_containment_rejected() {
        let model = ModelBuilder::new()
            .entity_type("NS.A", |t| {
                t.key("ID", PrimitiveKind::Int32)
                    .navigation("ToB", "NS.B", Multiplicity::One)
            })
            .entity_type("NS.B", |t| {
                t.key("ID", PrimitiveKind::Int32)
                    .navigation("ToA", "NS.A", Multiplicity::One)
            })
            .container("C")
            .entity_set("As", "NS.A")
            .entity_set("Bs", "NS.B")
            .bind("As", "ToB/ToA", "As")
            .build();
        assert!(matches!(
            model,
            Err(ConfigurationError::InvalidBindingPath { .. })
        ));
    }

    #[test]
    fn test_path_must_end_with_navigation() {
        let err = ModelBuilder::new()
            .entity_type("NS.A", |t| {
                t.key("ID", PrimitiveKind::Int32)
                    .property("Name", PrimitiveKind::String)
            })
            .container("C")
            .entity_set("As", "NS.A")
            .bind("As", "Name", "As")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidBindingPath { .. }));
    }

    #[test]
    fn test_cast_to_unrelated_type_rejected() {
        let err = shapes()
            .bind("Shapes", "NS.Palette/Style", "Palettes")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidBindingPath { .. }));
    }

    #[test]
    fn test_cast_to_current_type_rejected() {
        for path in [
            "NS.EntityType/ContainedNav1/NavOnContained",
            "NS.DerivedEntityType/NS.DerivedEntityType/NavOnDerived",
        ] {
            assert!(
                matches!(
                    parse_binding_path(&MODEL, "EntitySet", path),
                    Err(ConfigurationError::InvalidBindingPath { .. })
                ),
                "{path}"
            );
        }
    }

    #[test]
    fn test_incompatible_target_rejected() {
        let err = shapes()
            .bind("Shapes", "Style/NS.FancyStyle/Palette", "Shapes")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::IncompatibleBindingTarget { .. }
        ));
    }

    #[test]
    fn test_cast_position_ambiguity() {
        let err = shapes()
            .bind("Shapes", "NS.Circle/Style/NS.FancyStyle/Palette", "Palettes")
            .bind("Shapes", "Style/NS.FancyStyle/Palette", "OtherPalettes")
            .build();
        // Different cast counts: the more specific path wins at runtime.
        assert!(err.is_ok());

        let skeleton_a = BindingPath(vec![
            BindingSegment::new(SegmentKind::TypeCast, "NS.Circle"),
            BindingSegment::new(SegmentKind::Property, "Style"),
            BindingSegment::new(SegmentKind::Navigation, "Palette"),
        ]);
        let skeleton_b = BindingPath(vec![
            BindingSegment::new(SegmentKind::Property, "Style"),
            BindingSegment::new(SegmentKind::TypeCast, "NS.FancyStyle"),
            BindingSegment::new(SegmentKind::Navigation, "Palette"),
        ]);
        assert!(could_match_equally(&skeleton_a, &skeleton_b));

        let same_position = BindingPath(vec![
            BindingSegment::new(SegmentKind::Property, "Style"),
            BindingSegment::new(SegmentKind::TypeCast, "NS.OtherStyle"),
            BindingSegment::new(SegmentKind::Navigation, "Palette"),
        ]);
        assert!(!could_match_equally(&skeleton_b, &same_position));
    }

    #[test]
    fn test_base_chain_cycle_rejected() {
        let err = ModelBuilder::new()
            .entity_type("NS.A", |t| t.base("NS.B").key("ID", PrimitiveKind::Int32))
            .entity_type("NS.B", |t| t.base("NS.A"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::BaseChainCycle { .. }));
    }

    #[test]
    fn test_missing_key_rejected() {
        let err = ModelBuilder::new()
            .entity_type("NS.A", |t| t.property("Name", PrimitiveKind::String))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingKey { .. }));
    }

    #[test]
    fn test_entity_deriving_from_complex_rejected() {
        let err = ModelBuilder::new()
            .complex_type("NS.C", |t| t.property("Name", PrimitiveKind::String))
            .entity_type("NS.E", |t| t.base("NS.C").key("ID", PrimitiveKind::Int32))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::KindMismatch { .. }));
    }

    #[test]
    fn test_duplicate_inherited_member_rejected() {
        let err = ModelBuilder::new()
            .entity_type("NS.A", |t| t.key("ID", PrimitiveKind::Int32))
            .entity_type("NS.B", |t| t.base("NS.A").property("ID", PrimitiveKind::String))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateMember { .. }));
    }

    #[test]
    fn test_sets_require_container_name() {
        let err = ModelBuilder::new()
            .entity_type("NS.A", |t| t.key("ID", PrimitiveKind::Int32))
            .entity_set("As", "NS.A")
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigurationError::MissingContainer);
    }
}
