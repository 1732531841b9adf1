//! Streaming resource graph writer.
//!
//! The caller drives a depth-first walk with paired start/end calls:
//!
//! ```text
//! start_resource            top-level entity
//!   start_nested_info       navigation or complex property
//!     start_resource_set    only for collection-valued infos
//!       start_resource ...
//!     end_resource_set
//!   end_nested_info
//! end_resource
//! ```
//!
//! Every call is checked against the model before anything is written. The
//! first error aborts the session: later calls fail with
//! [`StructuralError::Aborted`].

use std::io;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::codec::context;
use crate::codec::id::{Identifiers, ParentEntity};
use crate::codec::json::JsonWriter;
use crate::codec::value::{declared_type_name, encode_value, value_fits};
use crate::error::{ConfigurationError, StructuralError, WriteError};
use crate::model::{
    EntitySet, Member, Model, NestedResourceInfo, Resource, ResourceSet, StructuredType,
};
use crate::resolve::{PathFrame, PathStack};

/// How much control information is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetadataLevel {
    /// Only type casts are annotated.
    None,
    /// Context URLs and type casts.
    #[default]
    Minimal,
    /// Additionally every resource's type and every entity's identifier.
    Full,
}

/// Writer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterSettings {
    /// Base URL identifiers and context URLs are built from.
    pub service_root: String,
    pub metadata: MetadataLevel,
}

impl WriterSettings {
    /// Settings for `service_root` with minimal metadata.
    pub fn new(service_root: impl Into<String>) -> Self {
        Self {
            service_root: service_root.into(),
            metadata: MetadataLevel::Minimal,
        }
    }

    /// Sets the metadata level.
    pub fn with_metadata(mut self, metadata: MetadataLevel) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Ready,
    Writing,
    Completed,
    Aborted,
}

#[derive(Debug)]
struct ResourceScope<'m> {
    ty: &'m StructuredType,
    id: Option<String>,
    /// Path depth before the resource's own cast frame.
    depth: usize,
}

#[derive(Debug)]
struct SetScope<'m> {
    item_type: &'m StructuredType,
    depth: usize,
    top: bool,
}

#[derive(Debug)]
struct NestedScope<'m> {
    info: NestedResourceInfo,
    target: &'m StructuredType,
    has_content: bool,
    depth: usize,
}

#[derive(Debug)]
enum Scope<'m> {
    Resource(ResourceScope<'m>),
    ResourceSet(SetScope<'m>),
    NestedInfo(NestedScope<'m>),
}

impl Scope<'_> {
    fn name(&self) -> &'static str {
        match self {
            Scope::Resource(_) => "resource",
            Scope::ResourceSet(_) => "resource set",
            Scope::NestedInfo(n) if n.info.is_collection => "collection nested resource info",
            Scope::NestedInfo(_) => "single nested resource info",
        }
    }
}

/// Writes one payload (a single entity or a feed) rooted at an entity set.
pub struct ResourceWriter<'m, W: io::Write> {
    model: &'m Model,
    ids: Identifiers<'m>,
    settings: WriterSettings,
    sink: W,
    out: JsonWriter,
    path: PathStack<'m>,
    scopes: Vec<Scope<'m>>,
    session: Session,
}

impl<'m, W: io::Write> ResourceWriter<'m, W> {
    /// Creates a writer for a payload taken from `entity_set`.
    pub fn new(
        model: &'m Model,
        entity_set: &str,
        sink: W,
        settings: WriterSettings,
    ) -> Result<Self, ConfigurationError> {
        let root = model.entity_set(entity_set)?;
        model.entity_set_type(root)?;
        Ok(Self {
            model,
            ids: Identifiers::new(model, &settings.service_root, root),
            settings,
            sink,
            out: JsonWriter::with_capacity(1024),
            path: PathStack::new(),
            scopes: Vec::new(),
            session: Session::Ready,
        })
    }

    /// The entity set the payload is taken from.
    pub fn entity_set(&self) -> &'m EntitySet {
        self.ids.root()
    }

    /// The current path from the entity set root.
    pub fn path(&self) -> &PathStack<'m> {
        &self.path
    }

    /// Returns true once the top-level resource or resource set has ended.
    pub fn is_completed(&self) -> bool {
        self.session == Session::Completed
    }

    /// Starts an entity or complex resource and writes its primitive properties.
    ///
    /// Allowed at the top level, inside a resource set, or as the single
    /// content of a nested info. `resource.type_name` must name the expected
    /// type or a type derived from it; property values must match their
    /// declared kinds exactly and each name may appear once.
    pub fn start_resource(&mut self, resource: &Resource) -> Result<(), WriteError> {
        self.ensure_open()?;
        let result = self.write_resource_start(resource);
        self.guard(result)
    }

    /// Closes the innermost open resource.
    pub fn end_resource(&mut self) -> Result<(), WriteError> {
        self.ensure_open()?;
        let result = self.write_resource_end();
        self.guard(result)
    }

    /// Opens a navigation or complex-valued property of the current resource.
    ///
    /// Nothing is written until content starts, so an info left empty
    /// produces no member.
    pub fn start_nested_info(&mut self, info: &NestedResourceInfo) -> Result<(), WriteError> {
        self.ensure_open()?;
        let result = self.write_nested_info_start(info);
        self.guard(result)
    }

    /// Closes the innermost nested info.
    pub fn end_nested_info(&mut self) -> Result<(), WriteError> {
        self.ensure_open()?;
        let result = self.write_nested_info_end();
        self.guard(result)
    }

    /// Starts a feed at the top level or the content of a collection-valued
    /// nested info. Only a top-level feed writes `@odata.count`.
    pub fn start_resource_set(&mut self, set: &ResourceSet) -> Result<(), WriteError> {
        self.ensure_open()?;
        let result = self.write_resource_set_start(set);
        self.guard(result)
    }

    /// Closes the innermost resource set.
    pub fn end_resource_set(&mut self) -> Result<(), WriteError> {
        self.ensure_open()?;
        let result = self.write_resource_set_end();
        self.guard(result)
    }

    /// Writes everything buffered so far to the sink.
    pub fn flush(&mut self) -> Result<(), WriteError> {
        self.out.drain_into(&mut self.sink)?;
        self.sink.flush()?;
        Ok(())
    }

    /// Flushes and returns the sink.
    pub fn into_inner(mut self) -> Result<W, WriteError> {
        self.flush()?;
        Ok(self.sink)
    }

    fn ensure_open(&self) -> Result<(), StructuralError> {
        match self.session {
            Session::Ready | Session::Writing => Ok(()),
            Session::Completed => Err(StructuralError::Completed),
            Session::Aborted => Err(StructuralError::Aborted),
        }
    }

    fn guard<T>(&mut self, result: Result<T, WriteError>) -> Result<T, WriteError> {
        if let Err(e) = &result {
            debug!(error = %e, path = %self.path, "writer aborted");
            self.session = Session::Aborted;
        }
        result
    }

    fn scope_name(&self) -> &'static str {
        self.scopes.last().map_or("top level", Scope::name)
    }

    /// The nearest enclosing entity, if it has an identifier.
    fn parent_entity(&self) -> Option<ParentEntity<'_>> {
        let parent = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| match scope {
                Scope::Resource(r) if r.ty.is_entity() => Some(r),
                _ => None,
            })?;
        let id = parent.id.as_deref()?;
        Some(ParentEntity {
            depth: parent.depth,
            id,
        })
    }

    fn close_scope(&mut self, depth: usize) {
        self.path.truncate(depth);
        if self.scopes.is_empty() {
            self.session = Session::Completed;
            debug!(entity_set = %self.ids.root().name, "payload completed");
        }
    }

    // =========================================================================
    // RESOURCES
    // =========================================================================

    fn write_resource_start(&mut self, resource: &Resource) -> Result<(), WriteError> {
        let top = self.scopes.is_empty();
        let expected = match self.scopes.last() {
            None => self.model.entity_set_type(self.ids.root())?,
            Some(Scope::ResourceSet(set)) => set.item_type,
            Some(Scope::NestedInfo(nested)) if !nested.info.is_collection => {
                if nested.has_content {
                    return Err(StructuralError::DuplicateContent {
                        name: nested.info.name.clone(),
                    }
                    .into());
                }
                nested.target
            }
            Some(scope) => {
                return Err(StructuralError::UnexpectedStart {
                    scope: scope.name(),
                    found: "resource",
                }
                .into());
            }
        };

        let ty = self.effective_type(resource, expected)?;
        self.check_properties(resource, ty)?;
        if !top {
            self.begin_nested_content(false)?;
        }

        let depth = self.path.len();
        let cast = ty.qualified_name != expected.qualified_name;
        if cast {
            self.path.push(PathFrame::TypeCast(ty));
        }
        let id = self
            .ids
            .entity_id(self.path.frames(), self.parent_entity(), ty, resource)?;

        self.out.begin_object();
        if top && self.settings.metadata != MetadataLevel::None {
            let url = context::entity_context(self.ids.service_root(), &self.ids.root().name);
            self.out.write_string_member("@odata.context", &url)?;
        }
        if cast || self.settings.metadata == MetadataLevel::Full {
            self.out
                .write_string_member("@odata.type", &format!("#{}", ty.qualified_name))?;
        }
        if self.settings.metadata == MetadataLevel::Full {
            if let Some(id) = &id {
                self.out.write_string_member("@odata.id", id)?;
            }
        }
        for property in &resource.properties {
            self.out.write_name(&property.name)?;
            encode_value(&mut self.out, &property.value)?;
        }

        debug!(type_name = %ty.qualified_name, id = ?id, path = %self.path, "resource start");
        self.session = Session::Writing;
        self.scopes.push(Scope::Resource(ResourceScope { ty, id, depth }));
        Ok(())
    }

    fn write_resource_end(&mut self) -> Result<(), WriteError> {
        let Some(Scope::Resource(resource)) = self.scopes.last() else {
            return Err(StructuralError::UnexpectedEnd {
                scope: self.scope_name(),
                found: "resource",
            }
            .into());
        };
        let depth = resource.depth;
        self.out.end_object();
        self.scopes.pop();
        self.close_scope(depth);
        Ok(())
    }

    /// The type a resource is written as: its explicit type if it names one,
    /// otherwise the type the position expects.
    fn effective_type(
        &self,
        resource: &Resource,
        expected: &'m StructuredType,
    ) -> Result<&'m StructuredType, WriteError> {
        let Some(name) = resource.type_name.as_deref() else {
            return Ok(expected);
        };
        let ty = self.model.find_type(name)?;
        if ty.kind != expected.kind || !self.model.is_derived_from(ty, expected) {
            return Err(StructuralError::TypeNotDerived {
                type_name: name.to_string(),
                expected: expected.qualified_name.clone(),
            }
            .into());
        }
        Ok(ty)
    }

    fn check_properties(&self, resource: &Resource, ty: &'m StructuredType) -> Result<(), WriteError> {
        let mut seen = FxHashSet::default();
        for property in &resource.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(StructuralError::DuplicateProperty {
                    type_name: ty.qualified_name.clone(),
                    name: property.name.clone(),
                }
                .into());
            }
            let declared = self
                .model
                .find_property(ty, &property.name)
                .filter(|p| p.primitive_kind().is_some())
                .ok_or_else(|| StructuralError::UnknownProperty {
                    type_name: ty.qualified_name.clone(),
                    name: property.name.clone(),
                })?;
            if !value_fits(declared, &property.value) {
                return Err(WriteError::InvalidValue {
                    property: property.name.clone(),
                    expected: declared_type_name(declared),
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // NESTED RESOURCE INFOS
    // =========================================================================

    fn write_nested_info_start(&mut self, info: &NestedResourceInfo) -> Result<(), WriteError> {
        let ty = match self.scopes.last() {
            Some(Scope::Resource(resource)) => resource.ty,
            _ => {
                return Err(StructuralError::UnexpectedStart {
                    scope: self.scope_name(),
                    found: "nested resource info",
                }
                .into());
            }
        };

        let unknown = || StructuralError::UnknownMember {
            type_name: ty.qualified_name.clone(),
            name: info.name.clone(),
        };
        let (frame, declared_collection, target) = match self.model.find_member(ty, &info.name) {
            Some(Member::Navigation(navigation)) => (
                PathFrame::Navigation(navigation),
                navigation.is_collection(),
                navigation.target_type.as_str(),
            ),
            Some(Member::Structural(property)) => {
                let complex = property.complex_type().ok_or_else(unknown)?;
                (PathFrame::Property(property), property.is_collection, complex)
            }
            None => return Err(unknown().into()),
        };
        let target = self.model.find_type(target)?;
        if declared_collection != info.is_collection {
            return Err(StructuralError::CollectionMismatch {
                name: info.name.clone(),
                declared: declared_collection,
                requested: info.is_collection,
            }
            .into());
        }

        let depth = self.path.len();
        self.path.push(frame);
        self.scopes.push(Scope::NestedInfo(NestedScope {
            info: info.clone(),
            target,
            has_content: false,
            depth,
        }));
        Ok(())
    }

    fn write_nested_info_end(&mut self) -> Result<(), WriteError> {
        let Some(Scope::NestedInfo(nested)) = self.scopes.last() else {
            return Err(StructuralError::UnexpectedEnd {
                scope: self.scope_name(),
                found: "nested resource info",
            }
            .into());
        };
        let depth = nested.depth;
        self.scopes.pop();
        self.close_scope(depth);
        Ok(())
    }

    /// Writes the member name (and containment context) of the open nested
    /// info once its content starts.
    fn begin_nested_content(&mut self, is_set: bool) -> Result<(), WriteError> {
        let Some(Scope::NestedInfo(nested)) = self.scopes.last_mut() else {
            return Ok(());
        };
        nested.has_content = true;
        let name = nested.info.name.clone();

        if self.settings.metadata != MetadataLevel::None {
            let url = self
                .ids
                .contained_context(self.path.frames(), self.parent_entity(), is_set)?;
            if let Some(url) = url {
                self.out
                    .write_string_member(&format!("{name}@odata.context"), &url)?;
            }
        }
        self.out.write_name(&name)?;
        Ok(())
    }

    // =========================================================================
    // RESOURCE SETS
    // =========================================================================

    fn write_resource_set_start(&mut self, set: &ResourceSet) -> Result<(), WriteError> {
        let top = self.scopes.is_empty();
        let item_type = match self.scopes.last() {
            None => self.model.entity_set_type(self.ids.root())?,
            Some(Scope::NestedInfo(nested)) if nested.info.is_collection => {
                if nested.has_content {
                    return Err(StructuralError::DuplicateContent {
                        name: nested.info.name.clone(),
                    }
                    .into());
                }
                nested.target
            }
            Some(scope) => {
                return Err(StructuralError::UnexpectedStart {
                    scope: scope.name(),
                    found: "resource set",
                }
                .into());
            }
        };

        if top {
            self.out.begin_object();
            if self.settings.metadata != MetadataLevel::None {
                let url = context::feed_context(self.ids.service_root(), &self.ids.root().name);
                self.out.write_string_member("@odata.context", &url)?;
            }
            if let Some(count) = set.count {
                self.out.write_name("@odata.count")?;
                self.out.write_i64(count)?;
            }
            self.out.write_name("value")?;
        } else {
            self.begin_nested_content(true)?;
        }
        self.out.begin_array();

        debug!(item_type = %item_type.qualified_name, path = %self.path, "resource set start");
        self.session = Session::Writing;
        self.scopes.push(Scope::ResourceSet(SetScope {
            item_type,
            depth: self.path.len(),
            top,
        }));
        Ok(())
    }

    fn write_resource_set_end(&mut self) -> Result<(), WriteError> {
        let Some(Scope::ResourceSet(set)) = self.scopes.last() else {
            return Err(StructuralError::UnexpectedEnd {
                scope: self.scope_name(),
                found: "resource set",
            }
            .into());
        };
        let (depth, top) = (set.depth, set.top);
        self.out.end_array();
        if top {
            self.out.end_object();
        }
        self.scopes.pop();
        self.close_scope(depth);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures::{MODEL, SERVICE_ROOT};
    use crate::model::Value;

    fn writer(metadata: MetadataLevel) -> ResourceWriter<'static, Vec<u8>> {
        ResourceWriter::new(
            &MODEL,
            "EntitySet",
            Vec::new(),
            WriterSettings::new(SERVICE_ROOT).with_metadata(metadata),
        )
        .unwrap()
    }

    fn finish(w: ResourceWriter<'static, Vec<u8>>) -> String {
        String::from_utf8(w.into_inner().unwrap()).unwrap()
    }

    fn entity(id: &str) -> Resource {
        Resource::new().property("ID", id)
    }

    fn write_nav_items(w: &mut ResourceWriter<'static, Vec<u8>>, ids: &[&str]) {
        w.start_nested_info(&NestedResourceInfo::collection("CollectionOfNavOnComplex"))
            .unwrap();
        w.start_resource_set(&ResourceSet::new()).unwrap();
        for id in ids {
            w.start_resource(&entity(id)).unwrap();
            w.end_resource().unwrap();
        }
        w.end_resource_set().unwrap();
        w.end_nested_info().unwrap();
    }

    #[test]
    fn test_write_multi_binding_complex() {
        let mut w = writer(MetadataLevel::Minimal);
        w.start_resource(&entity("TopEntity")).unwrap();
        for (prop, ids) in [
            ("complexProp1", ["NavEntity1", "NavEntity2"]),
            ("complexProp2", ["NavEntity2", "NavEntity1"]),
        ] {
            w.start_nested_info(&NestedResourceInfo::single(prop)).unwrap();
            w.start_resource(&Resource::new().property("Prop1", prop))
                .unwrap();
            write_nav_items(&mut w, &ids);
            w.end_resource().unwrap();
            w.end_nested_info().unwrap();
        }
        w.end_resource().unwrap();
        assert!(w.is_completed());

        assert_eq!(
            finish(w),
            concat!(
                r#"{"@odata.context":"http://host/$metadata#EntitySet/$entity","ID":"TopEntity","#,
                r#""complexProp1":{"Prop1":"complexProp1","CollectionOfNavOnComplex":[{"ID":"NavEntity1"},{"ID":"NavEntity2"}]},"#,
                r#""complexProp2":{"Prop1":"complexProp2","CollectionOfNavOnComplex":[{"ID":"NavEntity2"},{"ID":"NavEntity1"}]}}"#
            )
        );
    }

    #[test]
    fn test_write_complex_with_cast() {
        let mut w = writer(MetadataLevel::Minimal);
        w.start_resource(&entity("TopEntity")).unwrap();
        w.start_nested_info(&NestedResourceInfo::single("complexProp1"))
            .unwrap();
        w.start_resource(
            &Resource::new()
                .with_type("NS.DerivedComplexType")
                .property("Prop1", "complexProp1")
                .property("DerivedProp", "DerivedComplexProp"),
        )
        .unwrap();
        assert_eq!(w.path().to_string(), "complexProp1/NS.DerivedComplexType");
        write_nav_items(&mut w, &["NavEntity1", "NavEntity2"]);
        w.end_resource().unwrap();
        w.end_nested_info().unwrap();
        assert!(w.path().is_empty());
        w.end_resource().unwrap();

        assert_eq!(
            finish(w),
            concat!(
                r#"{"@odata.context":"http://host/$metadata#EntitySet/$entity","ID":"TopEntity","#,
                r##""complexProp1":{"@odata.type":"#NS.DerivedComplexType","Prop1":"complexProp1","DerivedProp":"DerivedComplexProp","##,
                r#""CollectionOfNavOnComplex":[{"ID":"NavEntity1"},{"ID":"NavEntity2"}]}}"#
            )
        );
    }

    #[test]
    fn test_write_containment() {
        let mut w = writer(MetadataLevel::Minimal);
        w.start_resource(&entity("TopEntity")).unwrap();
        for (contained, target) in [("ContainedNav1", "NavEntity1"), ("ContainedNav2", "NavEntity2")] {
            w.start_nested_info(&NestedResourceInfo::single(contained))
                .unwrap();
            w.start_resource(&entity(contained)).unwrap();
            w.start_nested_info(&NestedResourceInfo::single("NavOnContained"))
                .unwrap();
            w.start_resource(&entity(target)).unwrap();
            w.end_resource().unwrap();
            w.end_nested_info().unwrap();
            w.end_resource().unwrap();
            w.end_nested_info().unwrap();
        }
        w.end_resource().unwrap();

        assert_eq!(
            finish(w),
            concat!(
                r#"{"@odata.context":"http://host/$metadata#EntitySet/$entity","ID":"TopEntity","#,
                r#""ContainedNav1@odata.context":"http://host/$metadata#EntitySet('TopEntity')/ContainedNav1/$entity","#,
                r#""ContainedNav1":{"ID":"ContainedNav1","NavOnContained":{"ID":"NavEntity1"}},"#,
                r#""ContainedNav2@odata.context":"http://host/$metadata#EntitySet('TopEntity')/ContainedNav2/$entity","#,
                r#""ContainedNav2":{"ID":"ContainedNav2","NavOnContained":{"ID":"NavEntity2"}}}"#
            )
        );
    }

    #[test]
    fn test_write_derived_top() {
        let mut w = writer(MetadataLevel::Minimal);
        w.start_resource(&entity("TopEntity").with_type("NS.DerivedEntityType"))
            .unwrap();
        w.start_nested_info(&NestedResourceInfo::single("NavOnDerived"))
            .unwrap();
        w.start_resource(&entity("NavEntity1")).unwrap();
        w.end_resource().unwrap();
        w.end_nested_info().unwrap();
        w.end_resource().unwrap();

        assert_eq!(
            finish(w),
            concat!(
                r##"{"@odata.context":"http://host/$metadata#EntitySet/$entity","@odata.type":"#NS.DerivedEntityType","##,
                r#""ID":"TopEntity","NavOnDerived":{"ID":"NavEntity1"}}"#
            )
        );
    }

    #[test]
    fn test_write_feed_full_metadata() {
        let mut w = writer(MetadataLevel::Full);
        w.start_resource_set(&ResourceSet { count: Some(1) }).unwrap();
        w.start_resource(&entity("a")).unwrap();
        w.start_nested_info(&NestedResourceInfo::single("UnboundNav"))
            .unwrap();
        w.start_resource(&entity("n")).unwrap();
        w.end_resource().unwrap();
        w.end_nested_info().unwrap();
        w.end_resource().unwrap();
        w.end_resource_set().unwrap();

        assert_eq!(
            finish(w),
            concat!(
                r#"{"@odata.context":"http://host/$metadata#EntitySet","@odata.count":1,"value":["#,
                r##"{"@odata.type":"#NS.EntityType","@odata.id":"http://host/EntitySet('a')","ID":"a","##,
                r##""UnboundNav":{"@odata.type":"#NS.NavEntityType","ID":"n"}}]}"##
            )
        );
    }

    #[test]
    fn test_write_no_metadata() {
        let mut w = writer(MetadataLevel::None);
        w.start_resource(&entity("TopEntity")).unwrap();
        w.start_nested_info(&NestedResourceInfo::single("ContainedNav1"))
            .unwrap();
        w.start_resource(&entity("c")).unwrap();
        w.end_resource().unwrap();
        w.end_nested_info().unwrap();
        // Empty nested info writes nothing.
        w.start_nested_info(&NestedResourceInfo::single("UnboundNav"))
            .unwrap();
        w.end_nested_info().unwrap();
        w.end_resource().unwrap();

        assert_eq!(
            finish(w),
            r#"{"ID":"TopEntity","ContainedNav1":{"ID":"c"}}"#
        );
    }

    #[test]
    fn test_nesting_violations_abort() {
        let mut w = writer(MetadataLevel::Minimal);
        assert!(matches!(
            w.end_resource(),
            Err(WriteError::Structural(StructuralError::UnexpectedEnd {
                scope: "top level",
                found: "resource"
            }))
        ));

        let mut w = writer(MetadataLevel::Minimal);
        let err = w.start_nested_info(&NestedResourceInfo::single("ContainedNav1"));
        assert!(matches!(
            err,
            Err(WriteError::Structural(StructuralError::UnexpectedStart { scope: "top level", .. }))
        ));
        assert!(matches!(
            w.start_resource(&entity("a")),
            Err(WriteError::Structural(StructuralError::Aborted))
        ));

        let mut w = writer(MetadataLevel::Minimal);
        w.start_resource(&entity("a")).unwrap();
        assert!(matches!(
            w.end_resource_set(),
            Err(WriteError::Structural(StructuralError::UnexpectedEnd { .. }))
        ));

        let mut w = writer(MetadataLevel::Minimal);
        w.start_resource(&entity("a")).unwrap();
        w.start_nested_info(&NestedResourceInfo::collection("ContainedMany"))
            .unwrap();
        let err = w.start_resource(&entity("b")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);

        let mut w = writer(MetadataLevel::Minimal);
        w.start_resource(&entity("a")).unwrap();
        w.start_nested_info(&NestedResourceInfo::single("ContainedNav1"))
            .unwrap();
        w.start_resource(&entity("b")).unwrap();
        w.end_resource().unwrap();
        assert!(matches!(
            w.start_resource(&entity("c")),
            Err(WriteError::Structural(StructuralError::DuplicateContent { .. }))
        ));
    }

    #[test]
    fn test_model_checks() {
        let mut w = writer(MetadataLevel::Minimal);
        w.start_resource(&entity("a")).unwrap();
        assert!(matches!(
            w.start_nested_info(&NestedResourceInfo::collection("ContainedNav1")),
            Err(WriteError::Structural(StructuralError::CollectionMismatch { .. }))
        ));

        let mut w = writer(MetadataLevel::Minimal);
        w.start_resource(&entity("a")).unwrap();
        assert!(matches!(
            w.start_nested_info(&NestedResourceInfo::single("NavOnDerived")),
            Err(WriteError::Structural(StructuralError::UnknownMember { .. }))
        ));

        let mut w = writer(MetadataLevel::Minimal);
        assert!(matches!(
            w.start_resource(&entity("a").property("Missing", 1)),
            Err(WriteError::Structural(StructuralError::UnknownProperty { .. }))
        ));

        let mut w = writer(MetadataLevel::Minimal);
        let err = w
            .start_resource(&Resource::new().property("ID", 5))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);

        let mut w = writer(MetadataLevel::Minimal);
        assert!(matches!(
            w.start_resource(&entity("a").property("ID", "b")),
            Err(WriteError::Structural(StructuralError::DuplicateProperty { .. }))
        ));

        // Integers do not widen into Edm.Int64 or Edm.Double.
        for (name, value) in [("Total", Value::Int32(5)), ("Ratio", Value::Int64(2))] {
            let mut w = writer(MetadataLevel::Minimal);
            w.start_resource(&entity("a")).unwrap();
            w.start_nested_info(&NestedResourceInfo::single("UnboundNav"))
                .unwrap();
            let err = w
                .start_resource(&entity("n").property(name, value))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Value);
        }

        let mut w = writer(MetadataLevel::Minimal);
        assert!(matches!(
            w.start_resource(&entity("a").with_type("NS.NavEntityType")),
            Err(WriteError::Structural(StructuralError::TypeNotDerived { .. }))
        ));
    }

    #[test]
    fn test_completed_rejects_more() {
        let mut w = writer(MetadataLevel::Minimal);
        w.start_resource(&entity("a")).unwrap();
        w.end_resource().unwrap();
        assert!(matches!(
            w.start_resource(&entity("b")),
            Err(WriteError::Structural(StructuralError::Completed))
        ));
    }

    #[test]
    fn test_special_values() {
        let mut w = writer(MetadataLevel::None);
        w.start_resource(&entity("TopEntity")).unwrap();
        w.start_nested_info(&NestedResourceInfo::single("UnboundNav"))
            .unwrap();
        w.start_resource(&entity("n").property("Rank", Value::Null))
            .unwrap();
        w.end_resource().unwrap();
        w.end_nested_info().unwrap();
        w.end_resource().unwrap();
        assert_eq!(
            finish(w),
            r#"{"ID":"TopEntity","UnboundNav":{"ID":"n","Rank":null}}"#
        );
    }
}
