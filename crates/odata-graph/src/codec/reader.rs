//! Pull-based resource graph reader.
//!
//! The document is tokenized by `serde_json` (member order preserved) and
//! then walked depth-first with an explicit scope stack. Each call to
//! [`ResourceReader::read`] yields one [`ReadEvent`], in the same order a
//! writer would have been driven to produce the document.
//!
//! Resources are reported complete at start: primitive properties are
//! collected up front and nested members (navigations and complex
//! properties) follow as nested infos in document order.

use std::vec;

use tracing::debug;

use crate::codec::context::{self, parse_context};
use crate::codec::id::{Identifiers, ParentEntity};
use crate::codec::value::{decode_property, json_kind};
use crate::error::{ConfigurationError, ParseError, ReadError, StructuralError};
use crate::limits::{MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH};
use crate::model::{
    EntitySet, Member, Model, NestedResourceInfo, Property, Resource, ResourceSet, StructuredType,
};
use crate::resolve::{PathFrame, PathStack};

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Shape of the top-level payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadKind {
    /// A single entity object.
    #[default]
    Resource,
    /// A feed: `{"value":[...]}`.
    ResourceSet,
}

/// Reader configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderSettings {
    pub service_root: String,
    pub payload: PayloadKind,
    /// Reject undeclared properties instead of skipping them.
    pub strict: bool,
    pub max_depth: usize,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            service_root: String::new(),
            payload: PayloadKind::Resource,
            strict: false,
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

impl ReaderSettings {
    /// Lenient settings for a single-resource payload under `service_root`.
    pub fn new(service_root: impl Into<String>) -> Self {
        Self {
            service_root: service_root.into(),
            ..Self::default()
        }
    }

    /// Sets the expected payload shape.
    pub fn with_payload(mut self, payload: PayloadKind) -> Self {
        self.payload = payload;
        self
    }

    /// Rejects undeclared members instead of skipping them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// One step of the depth-first walk.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadEvent {
    ResourceStart(Resource),
    ResourceEnd(Resource),
    ResourceSetStart(ResourceSet),
    ResourceSetEnd(ResourceSet),
    NestedInfoStart(NestedResourceInfo),
    NestedInfoEnd(NestedResourceInfo),
    EndOfInput,
}

/// Where the reader stands after the last [`ResourceReader::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Start,
    ResourceStart,
    ResourceEnd,
    ResourceSetStart,
    ResourceSetEnd,
    NestedInfoStart,
    NestedInfoEnd,
    Completed,
    Exception,
}

impl ReadEvent {
    fn state(&self) -> ReaderState {
        match self {
            ReadEvent::ResourceStart(_) => ReaderState::ResourceStart,
            ReadEvent::ResourceEnd(_) => ReaderState::ResourceEnd,
            ReadEvent::ResourceSetStart(_) => ReaderState::ResourceSetStart,
            ReadEvent::ResourceSetEnd(_) => ReaderState::ResourceSetEnd,
            ReadEvent::NestedInfoStart(_) => ReaderState::NestedInfoStart,
            ReadEvent::NestedInfoEnd(_) => ReaderState::NestedInfoEnd,
            ReadEvent::EndOfInput => ReaderState::Completed,
        }
    }
}

#[derive(Debug)]
struct ResourceFrame<'m> {
    resource: Resource,
    ty: &'m StructuredType,
    /// Nested members still to be reported, in document order.
    nested: vec::IntoIter<(Member<'m>, serde_json::Value)>,
    pointer: String,
    depth: usize,
}

#[derive(Debug)]
struct SetFrame<'m> {
    set: ResourceSet,
    item_type: &'m StructuredType,
    items: vec::IntoIter<serde_json::Value>,
    index: usize,
    pointer: String,
    depth: usize,
}

#[derive(Debug)]
struct NestedFrame<'m> {
    info: NestedResourceInfo,
    target: &'m StructuredType,
    content: Option<serde_json::Value>,
    pointer: String,
    depth: usize,
}

#[derive(Debug)]
enum Frame<'m> {
    Resource(ResourceFrame<'m>),
    ResourceSet(SetFrame<'m>),
    NestedInfo(NestedFrame<'m>),
}

/// Reads one payload rooted at an entity set.
#[derive(Debug)]
pub struct ResourceReader<'m> {
    model: &'m Model,
    ids: Identifiers<'m>,
    settings: ReaderSettings,
    input: Option<String>,
    path: PathStack<'m>,
    frames: Vec<Frame<'m>>,
    state: ReaderState,
    event: Option<ReadEvent>,
    skipped: Vec<String>,
}

impl<'m> ResourceReader<'m> {
    /// Creates a reader over `input`, a payload taken from `entity_set`.
    ///
    /// The document is not parsed until the first [`read`](Self::read).
    pub fn new(
        model: &'m Model,
        entity_set: &str,
        input: impl Into<String>,
        settings: ReaderSettings,
    ) -> Result<Self, ConfigurationError> {
        let root = model.entity_set(entity_set)?;
        model.entity_set_type(root)?;
        Ok(Self {
            model,
            ids: Identifiers::new(model, &settings.service_root, root),
            settings,
            input: Some(input.into()),
            path: PathStack::new(),
            frames: Vec::new(),
            state: ReaderState::Start,
            event: None,
            skipped: Vec::new(),
        })
    }

    /// The entity set the payload is taken from.
    pub fn entity_set(&self) -> &'m EntitySet {
        self.ids.root()
    }

    /// State after the last [`read`](Self::read); `Exception` once a read failed.
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// The event produced by the last successful [`read`](Self::read).
    pub fn event(&self) -> Option<&ReadEvent> {
        self.event.as_ref()
    }

    /// The current path from the entity set root.
    pub fn path(&self) -> &PathStack<'m> {
        &self.path
    }

    /// JSON pointers of undeclared members skipped so far.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Advances to the next event. Returns false once the input is exhausted.
    pub fn read(&mut self) -> Result<bool, ReadError> {
        match self.state {
            ReaderState::Exception => return Err(StructuralError::Aborted.into()),
            ReaderState::Completed => return Ok(false),
            _ => {}
        }
        match self.advance() {
            Ok(event) => {
                self.state = event.state();
                let more = !matches!(event, ReadEvent::EndOfInput);
                self.event = Some(event);
                Ok(more)
            }
            Err(e) => {
                debug!(error = %e, path = %self.path, "reader aborted");
                self.state = ReaderState::Exception;
                self.event = None;
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Result<ReadEvent, ReadError> {
        if let Some(input) = self.input.take() {
            return self.start_document(input);
        }

        let Some(frame) = self.frames.last_mut() else {
            return Ok(ReadEvent::EndOfInput);
        };
        match frame {
            Frame::Resource(resource) => {
                if let Some((member, value)) = resource.nested.next() {
                    let pointer = resource.pointer.clone();
                    return self.start_nested(member, value, &pointer);
                }
            }
            Frame::ResourceSet(set) => {
                if let Some(item) = set.items.next() {
                    let pointer = format!("{}/{}", set.pointer, set.index);
                    set.index += 1;
                    let item_type = set.item_type;
                    return self.start_resource(item, item_type, pointer, false);
                }
            }
            Frame::NestedInfo(nested) => {
                if let Some(content) = nested.content.take() {
                    let (target, pointer) = (nested.target, nested.pointer.clone());
                    let is_collection = nested.info.is_collection;
                    return if is_collection {
                        self.start_set(content, target, pointer)
                    } else {
                        self.start_resource(content, target, pointer, false)
                    };
                }
            }
        }
        Ok(self.end_frame())
    }

    /// Pops the top frame and produces its end event.
    fn end_frame(&mut self) -> ReadEvent {
        match self.frames.pop() {
            Some(Frame::Resource(frame)) => {
                self.path.truncate(frame.depth);
                ReadEvent::ResourceEnd(frame.resource)
            }
            Some(Frame::ResourceSet(frame)) => {
                self.path.truncate(frame.depth);
                ReadEvent::ResourceSetEnd(frame.set)
            }
            Some(Frame::NestedInfo(frame)) => {
                self.path.truncate(frame.depth);
                ReadEvent::NestedInfoEnd(frame.info)
            }
            None => ReadEvent::EndOfInput,
        }
    }

    fn check_depth(&self, pointer: &str) -> Result<(), ParseError> {
        if self.frames.len() >= self.settings.max_depth {
            return Err(ParseError::DepthExceeded {
                pointer: pointer.to_string(),
                max: self.settings.max_depth,
            });
        }
        Ok(())
    }

    fn parent_entity(&self) -> Option<ParentEntity<'_>> {
        let parent = self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Resource(r) if r.ty.is_entity() => Some(r),
            _ => None,
        })?;
        let id = parent.resource.id.as_deref()?;
        Some(ParentEntity {
            depth: parent.depth,
            id,
        })
    }

    fn skip(&mut self, pointer: String, name: &str) -> Result<(), ParseError> {
        if self.settings.strict {
            return Err(ParseError::UnknownProperty {
                pointer,
                name: name.to_string(),
            });
        }
        debug!(pointer = %pointer, "skipping undeclared member");
        self.skipped.push(pointer);
        Ok(())
    }

    // =========================================================================
    // DOCUMENT
    // =========================================================================

    fn start_document(&mut self, input: String) -> Result<ReadEvent, ReadError> {
        if input.len() > MAX_DOCUMENT_SIZE {
            return Err(ParseError::TooLarge {
                len: input.len(),
                max: MAX_DOCUMENT_SIZE,
            }
            .into());
        }
        let document: serde_json::Value = serde_json::from_str(&input).map_err(ParseError::from)?;
        let root_type = self.model.entity_set_type(self.ids.root())?;

        match self.settings.payload {
            PayloadKind::Resource => self.start_resource(document, root_type, String::new(), true),
            PayloadKind::ResourceSet => self.start_feed(document, root_type),
        }
    }

    fn check_context(&self, url: &serde_json::Value, expect_entity: bool) -> Result<(), ParseError> {
        let root = &self.ids.root().name;
        let expected = if expect_entity {
            context::entity_context(self.ids.service_root(), root)
        } else {
            context::feed_context(self.ids.service_root(), root)
        };
        let found = url.as_str().ok_or_else(|| ParseError::InvalidAnnotation {
            pointer: "/@odata.context".to_string(),
            annotation: "@odata.context".to_string(),
            reason: "expected a string",
        })?;
        let matches = parse_context(self.ids.service_root(), found)
            .is_some_and(|ctx| ctx.entity_set() == root && ctx.is_entity == expect_entity);
        if !matches {
            return Err(ParseError::ContextMismatch {
                expected,
                found: found.to_string(),
            });
        }
        Ok(())
    }

    fn start_feed(
        &mut self,
        document: serde_json::Value,
        item_type: &'m StructuredType,
    ) -> Result<ReadEvent, ReadError> {
        let serde_json::Value::Object(map) = document else {
            return Err(ParseError::UnexpectedValue {
                pointer: String::new(),
                expected: "object",
                found: json_kind(&document),
            }
            .into());
        };

        let mut set = ResourceSet::new();
        let mut items = None;
        for (name, value) in map {
            match name.as_str() {
                "value" => items = Some(value),
                "@odata.context" => self.check_context(&value, false)?,
                "@odata.count" => {
                    set.count = Some(value.as_i64().ok_or_else(|| ParseError::InvalidAnnotation {
                        pointer: "/@odata.count".to_string(),
                        annotation: name.clone(),
                        reason: "expected an integer",
                    })?);
                }
                _ if name.starts_with('@') => {}
                _ => self.skip(format!("/{}", escape_pointer(&name)), &name)?,
            }
        }

        let items = match items {
            Some(serde_json::Value::Array(items)) => items,
            other => {
                return Err(ParseError::UnexpectedValue {
                    pointer: "/value".to_string(),
                    expected: "array",
                    found: other.as_ref().map_or("nothing", json_kind),
                }
                .into());
            }
        };

        debug!(entity_set = %self.ids.root().name, items = items.len(), "feed start");
        self.frames.push(Frame::ResourceSet(SetFrame {
            set: set.clone(),
            item_type,
            items: items.into_iter(),
            index: 0,
            pointer: "/value".to_string(),
            depth: self.path.len(),
        }));
        Ok(ReadEvent::ResourceSetStart(set))
    }

    // =========================================================================
    // RESOURCES
    // =========================================================================

    fn start_resource(
        &mut self,
        value: serde_json::Value,
        expected: &'m StructuredType,
        pointer: String,
        top: bool,
    ) -> Result<ReadEvent, ReadError> {
        self.check_depth(&pointer)?;
        let serde_json::Value::Object(map) = value else {
            return Err(ParseError::UnexpectedValue {
                pointer,
                expected: "object",
                found: json_kind(&value),
            }
            .into());
        };

        let ty = self.annotated_type(&map, expected, &pointer)?;
        let explicit_id = match map.get("@odata.id") {
            None => None,
            Some(serde_json::Value::String(id)) => Some(id.clone()),
            Some(_) => {
                return Err(ParseError::InvalidAnnotation {
                    pointer: format!("{pointer}/@odata.id"),
                    annotation: "@odata.id".to_string(),
                    reason: "expected a string",
                }
                .into());
            }
        };
        if top {
            if let Some(url) = map.get("@odata.context") {
                self.check_context(url, true)?;
            }
        }

        let mut resource = Resource::new().with_type(ty.qualified_name.clone());
        let mut nested = Vec::new();
        for (name, json) in map {
            if name.contains('@') {
                continue;
            }
            let member_pointer = format!("{pointer}/{}", escape_pointer(&name));
            match self.model.find_member(ty, &name) {
                Some(Member::Structural(property)) => match property.primitive_kind() {
                    Some(kind) => {
                        let value = decode_property(&json, property).ok_or_else(|| {
                            ParseError::InvalidValue {
                                pointer: member_pointer.clone(),
                                property: name.clone(),
                                expected: kind,
                            }
                        })?;
                        resource.properties.push(Property { name, value });
                    }
                    None => nested.push((Member::Structural(property), json)),
                },
                Some(member) => nested.push((member, json)),
                None => self.skip(member_pointer, &name)?,
            }
        }

        let depth = self.path.len();
        if ty.qualified_name != expected.qualified_name {
            self.path.push(PathFrame::TypeCast(ty));
        }
        resource.id = match explicit_id {
            Some(id) => Some(id),
            None => self
                .ids
                .entity_id(self.path.frames(), self.parent_entity(), ty, &resource)?,
        };

        debug!(type_name = %ty.qualified_name, id = ?resource.id, path = %self.path, "resource start");
        self.frames.push(Frame::Resource(ResourceFrame {
            resource: resource.clone(),
            ty,
            nested: nested.into_iter(),
            pointer,
            depth,
        }));
        Ok(ReadEvent::ResourceStart(resource))
    }

    /// Resolves `@odata.type`, which must name `expected` or a type derived
    /// from it.
    fn annotated_type(
        &self,
        map: &JsonMap,
        expected: &'m StructuredType,
        pointer: &str,
    ) -> Result<&'m StructuredType, ParseError> {
        let Some(annotation) = map.get("@odata.type") else {
            return Ok(expected);
        };
        let annotation_pointer = format!("{pointer}/@odata.type");
        let name = annotation
            .as_str()
            .ok_or_else(|| ParseError::InvalidAnnotation {
                pointer: annotation_pointer.clone(),
                annotation: "@odata.type".to_string(),
                reason: "expected a string",
            })?;
        let name = name.strip_prefix('#').unwrap_or(name);
        let ty = self
            .model
            .find_type(name)
            .map_err(|_| ParseError::UnknownType {
                pointer: annotation_pointer.clone(),
                type_name: name.to_string(),
            })?;
        if ty.kind != expected.kind || !self.model.is_derived_from(ty, expected) {
            return Err(ParseError::TypeNotDerived {
                pointer: annotation_pointer,
                type_name: name.to_string(),
                expected: expected.qualified_name.clone(),
            });
        }
        Ok(ty)
    }

    // =========================================================================
    // NESTED MEMBERS
    // =========================================================================

    fn start_nested(
        &mut self,
        member: Member<'m>,
        content: serde_json::Value,
        parent_pointer: &str,
    ) -> Result<ReadEvent, ReadError> {
        let (frame, name, is_collection, target) = match member {
            Member::Navigation(navigation) => (
                PathFrame::Navigation(navigation),
                &navigation.name,
                navigation.is_collection(),
                navigation.target_type.as_str(),
            ),
            Member::Structural(property) => (
                PathFrame::Property(property),
                &property.name,
                property.is_collection,
                property.complex_type().unwrap_or_default(),
            ),
        };
        let target = self.model.find_type(target)?;

        let info = NestedResourceInfo {
            name: name.clone(),
            is_collection,
        };
        let pointer = format!("{parent_pointer}/{}", escape_pointer(name));
        let depth = self.path.len();
        self.path.push(frame);
        self.frames.push(Frame::NestedInfo(NestedFrame {
            info: info.clone(),
            target,
            content: (!content.is_null()).then_some(content),
            pointer,
            depth,
        }));
        Ok(ReadEvent::NestedInfoStart(info))
    }

    fn start_set(
        &mut self,
        value: serde_json::Value,
        item_type: &'m StructuredType,
        pointer: String,
    ) -> Result<ReadEvent, ReadError> {
        self.check_depth(&pointer)?;
        let serde_json::Value::Array(items) = value else {
            return Err(ParseError::UnexpectedValue {
                pointer,
                expected: "array",
                found: json_kind(&value),
            }
            .into());
        };
        let set = ResourceSet::new();
        self.frames.push(Frame::ResourceSet(SetFrame {
            set: set.clone(),
            item_type,
            items: items.into_iter(),
            index: 0,
            pointer,
            depth: self.path.len(),
        }));
        Ok(ReadEvent::ResourceSetStart(set))
    }
}

impl Iterator for ResourceReader<'_> {
    type Item = Result<ReadEvent, ReadError>;

    /// Yields events up to (not including) `EndOfInput`, then `None`. An
    /// error is yielded once.
    fn next(&mut self) -> Option<Self::Item> {
        if self.state == ReaderState::Exception {
            return None;
        }
        match self.read() {
            Ok(true) => self.event.clone().map(Ok),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Escapes a member name for use in a JSON pointer.
fn escape_pointer(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}
