//! Entity container, entity sets and navigation bindings.

use std::fmt;

use crate::model::NavigationProperty;

/// A named top-level collection of entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySet {
    pub name: String,
    /// Qualified name of the entity type of the set's members.
    pub entity_type: String,
}

/// The single entity container of a model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityContainer {
    pub name: String,
    pub entity_sets: Vec<EntitySet>,
}

/// Kind of one step in a binding path or a path stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Complex-valued structural property hop.
    Property,
    /// Cast to a derived type (qualified type name).
    TypeCast,
    /// Navigation property hop.
    Navigation,
}

/// One step of a declared binding path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingSegment {
    pub kind: SegmentKind,
    pub name: String,
}

impl BindingSegment {
    /// Creates a segment of `kind` named `name`.
    pub fn new(kind: SegmentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// The ordered segments of a binding path, ending with the navigation itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingPath(pub Vec<BindingSegment>);

impl BindingPath {
    /// Segments from the source set outwards, ending with the navigation.
    pub fn segments(&self) -> &[BindingSegment] {
        &self.0
    }

    /// Number of segments; the specificity of the binding.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of type-cast segments.
    pub fn cast_count(&self) -> usize {
        self.0
            .iter()
            .filter(|s| s.kind == SegmentKind::TypeCast)
            .count()
    }

    /// The path with its cast segments removed.
    pub fn skeleton(&self) -> impl Iterator<Item = &BindingSegment> {
        self.0.iter().filter(|s| s.kind != SegmentKind::TypeCast)
    }

    /// Positions of casts relative to the skeleton (cast before skeleton item `i`).
    pub fn cast_positions(&self) -> Vec<usize> {
        let mut positions = Vec::new();
        let mut skeleton_index = 0;
        for segment in &self.0 {
            if segment.kind == SegmentKind::TypeCast {
                positions.push(skeleton_index);
            } else {
                skeleton_index += 1;
            }
        }
        positions
    }
}

impl fmt::Display for BindingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(&segment.name)?;
        }
        Ok(())
    }
}

/// Identifies a navigation property by declaring type and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationRef {
    pub declaring_type: String,
    pub name: String,
}

impl NavigationRef {
    /// Returns true if this reference names `navigation`.
    pub fn refers_to(&self, navigation: &NavigationProperty) -> bool {
        self.name == navigation.name && self.declaring_type == navigation.declaring_type
    }
}

impl fmt::Display for NavigationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.declaring_type, self.name)
    }
}

/// A declared (source set, navigation via path) -> target set mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationBinding {
    pub navigation: NavigationRef,
    pub path: BindingPath,
    /// Name of the target entity set.
    pub target: String,
}
