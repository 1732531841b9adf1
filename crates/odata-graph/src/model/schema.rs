//! The immutable typed model and its lookups.

use rustc_hash::FxHashMap;

use crate::error::ConfigurationError;
use crate::model::{
    EntityContainer, EntitySet, Member, NavigationBinding, NavigationProperty,
    StructuralProperty, StructuredType,
};

/// An immutable schema: types, one entity container and the binding table.
///
/// Built once by [`ModelBuilder`](crate::model::ModelBuilder) and shared by
/// reference between any number of writers, readers and path parsers.
#[derive(Debug, Clone)]
pub struct Model {
    types: Vec<StructuredType>,
    type_index: FxHashMap<String, usize>,
    container: EntityContainer,
    set_index: FxHashMap<String, usize>,
    /// Source set name -> declared bindings, in declaration order.
    bindings: FxHashMap<String, Vec<NavigationBinding>>,
}

impl Model {
    /// Assembles a model from already-validated parts.
    pub(crate) fn from_parts(
        types: Vec<StructuredType>,
        container: EntityContainer,
        bindings: FxHashMap<String, Vec<NavigationBinding>>,
    ) -> Self {
        let type_index = types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.qualified_name.clone(), i))
            .collect();
        let set_index = container
            .entity_sets
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        Self {
            types,
            type_index,
            container,
            set_index,
            bindings,
        }
    }

    pub(crate) fn set_bindings(&mut self, bindings: FxHashMap<String, Vec<NavigationBinding>>) {
        self.bindings = bindings;
    }

    /// All declared types, in declaration order.
    pub fn types(&self) -> &[StructuredType] {
        &self.types
    }

    /// The entity container.
    pub fn container(&self) -> &EntityContainer {
        &self.container
    }

    /// Looks up a type by qualified name.
    pub fn find_type(&self, qualified_name: &str) -> Result<&StructuredType, ConfigurationError> {
        self.type_index
            .get(qualified_name)
            .map(|&i| &self.types[i])
            .ok_or_else(|| ConfigurationError::NotFound {
                what: "type",
                name: qualified_name.to_string(),
            })
    }

    /// Looks up an entity set by name.
    pub fn entity_set(&self, name: &str) -> Result<&EntitySet, ConfigurationError> {
        self.set_index
            .get(name)
            .map(|&i| &self.container.entity_sets[i])
            .ok_or_else(|| ConfigurationError::NotFound {
                what: "entity set",
                name: name.to_string(),
            })
    }

    /// Returns the entity type of a set's members.
    pub fn entity_set_type(&self, set: &EntitySet) -> Result<&StructuredType, ConfigurationError> {
        self.find_type(&set.entity_type)
    }

    /// Iterates `ty` followed by its base types, most derived first.
    pub fn base_chain<'m>(&'m self, ty: &'m StructuredType) -> BaseChain<'m> {
        BaseChain {
            model: self,
            next: Some(ty),
        }
    }

    /// Returns true if `ty` is `base` or derives from it.
    pub fn is_derived_from(&self, ty: &StructuredType, base: &StructuredType) -> bool {
        self.base_chain(ty)
            .any(|t| t.qualified_name == base.qualified_name)
    }

    /// Finds a structural or navigation member on `ty` or its bases.
    pub fn find_member<'m>(&'m self, ty: &'m StructuredType, name: &str) -> Option<Member<'m>> {
        for t in self.base_chain(ty) {
            if let Some(p) = t.declared_property(name) {
                return Some(Member::Structural(p));
            }
            if let Some(n) = t.declared_navigation(name) {
                return Some(Member::Navigation(n));
            }
        }
        None
    }

    /// Finds a structural property on `ty` or its bases.
    pub fn find_property<'m>(
        &'m self,
        ty: &'m StructuredType,
        name: &str,
    ) -> Option<&'m StructuralProperty> {
        self.base_chain(ty).find_map(|t| t.declared_property(name))
    }

    /// Finds a navigation property on `ty` or its bases.
    pub fn find_navigation<'m>(
        &'m self,
        ty: &'m StructuredType,
        name: &str,
    ) -> Option<&'m NavigationProperty> {
        self.base_chain(ty).find_map(|t| t.declared_navigation(name))
    }

    /// All structural properties of `ty`, inherited ones first.
    pub fn properties<'m>(&'m self, ty: &'m StructuredType) -> Vec<&'m StructuralProperty> {
        let chain: Vec<_> = self.base_chain(ty).collect();
        chain
            .into_iter()
            .rev()
            .flat_map(|t| t.properties.iter())
            .collect()
    }

    /// The key properties of an entity type, taken from the nearest type in
    /// the base chain that declares a key.
    pub fn key_properties<'m>(&'m self, ty: &'m StructuredType) -> Vec<&'m StructuralProperty> {
        let Some(declaring) = self.base_chain(ty).find(|t| !t.key.is_empty()) else {
            return Vec::new();
        };
        declaring
            .key
            .iter()
            .filter_map(|name| self.find_property(declaring, name))
            .collect()
    }

    /// All bindings declared on a source set.
    pub fn bindings(&self, source_set: &str) -> &[NavigationBinding] {
        self.bindings
            .get(source_set)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Bindings declared on a source set for one navigation property.
    pub fn bindings_for<'m>(
        &'m self,
        source_set: &str,
        navigation: &'m NavigationProperty,
    ) -> impl Iterator<Item = &'m NavigationBinding> + 'm {
        self.bindings(source_set)
            .iter()
            .filter(move |b| b.navigation.refers_to(navigation))
    }
}

/// Iterator over a type and its bases, most derived first.
#[derive(Debug, Clone)]
pub struct BaseChain<'m> {
    model: &'m Model,
    next: Option<&'m StructuredType>,
}

impl<'m> Iterator for BaseChain<'m> {
    type Item = &'m StructuredType;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current
            .base_type
            .as_deref()
            .and_then(|base| self.model.type_index.get(base))
            .map(|&i| &self.model.types[i]);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use crate::fixtures::MODEL;
    use crate::model::Member;

    #[test]
    fn test_find_type_not_found() {
        let err = MODEL.find_type("NS.Missing").unwrap_err();
        assert!(matches!(
            err,
            crate::error::ConfigurationError::NotFound { what: "type", .. }
        ));
    }

    #[test]
    fn test_base_chain_order() {
        let derived = MODEL.find_type("NS.DerivedEntityType").unwrap();
        let names: Vec<_> = MODEL
            .base_chain(derived)
            .map(|t| t.qualified_name.as_str())
            .collect();
        assert_eq!(names, vec!["NS.DerivedEntityType", "NS.EntityType"]);
    }

    #[test]
    fn test_inherited_members() {
        let derived = MODEL.find_type("NS.DerivedEntityType").unwrap();
        let base = MODEL.find_type("NS.EntityType").unwrap();

        assert!(matches!(
            MODEL.find_member(derived, "complexProp1"),
            Some(Member::Structural(_))
        ));
        assert!(matches!(
            MODEL.find_member(derived, "NavOnDerived"),
            Some(Member::Navigation(_))
        ));
        assert!(MODEL.find_member(base, "NavOnDerived").is_none());

        let keys: Vec<_> = MODEL
            .key_properties(derived)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(keys, vec!["ID"]);
        assert!(MODEL.is_derived_from(derived, base));
        assert!(!MODEL.is_derived_from(base, derived));
    }

    #[test]
    fn test_bindings_for_navigation() {
        let complex = MODEL.find_type("NS.ComplexType").unwrap();
        let nav = complex
            .declared_navigation("CollectionOfNavOnComplex")
            .unwrap();
        let targets: Vec<_> = MODEL
            .bindings_for("EntitySet", nav)
            .map(|b| b.target.as_str())
            .collect();
        assert_eq!(targets, vec!["NavEntitySet1", "NavEntitySet2"]);
        assert!(MODEL.bindings("NavEntitySet1").is_empty());
    }
}
