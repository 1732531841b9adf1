//! Resource identifiers and key literals.
//!
//! Identifiers take one of three shapes depending on how the resource's
//! navigation resolved:
//! - bound to a set: `<root>/<Set>(<key>)`
//! - contained: `<parent id>/<segments>` plus `(<key>)` for collections
//! - unbound: no identifier
//!
//! Key literals quote strings (doubling embedded quotes) and percent-encode
//! their content; integers, booleans and guids are written bare. Composite
//! keys name each part: `(K1='a',K2=1)`.

use uuid::Uuid;

use crate::codec::context;
use crate::error::ConfigurationError;
use crate::limits::MAX_KEY_PROPERTIES;
use crate::model::{EntitySet, Model, PrimitiveKind, Resource, StructuralProperty, StructuredType, Value};
use crate::resolve::{BindingResolver, PathFrame, ResolvedTarget};

// =============================================================================
// KEY LITERALS
// =============================================================================

/// Formats one key value, or `None` if the value cannot be a key.
pub fn format_key_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(format!("'{}'", encode_string_literal(s))),
        Value::Int32(v) => Some(v.to_string()),
        Value::Int64(v) => Some(v.to_string()),
        Value::Bool(v) => Some(v.to_string()),
        Value::Guid(g) => Some(g.hyphenated().to_string()),
        Value::Double(v) if v.is_finite() => Some(v.to_string()),
        Value::Double(_) | Value::Null | Value::Collection(_) => None,
    }
}

fn encode_string_literal(s: &str) -> String {
    s.split('\'')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("''")
}

/// Formats the parenthesized key of an entity, or `None` if a key property
/// is missing or not key-typed.
pub fn format_key(model: &Model, ty: &StructuredType, resource: &Resource) -> Option<String> {
    let keys = model.key_properties(ty);
    match keys.as_slice() {
        [] => None,
        [single] => {
            let literal = format_key_value(resource.value(&single.name)?)?;
            Some(format!("({literal})"))
        }
        composite => {
            let mut parts = Vec::with_capacity(composite.len());
            for key in composite {
                let literal = format_key_value(resource.value(&key.name)?)?;
                parts.push(format!("{}={}", key.name, literal));
            }
            Some(format!("({})", parts.join(",")))
        }
    }
}

/// Parses the (already percent-decoded) content between the parentheses of
/// a key segment against the declared key properties.
pub fn parse_key(
    literal: &str,
    keys: &[&StructuralProperty],
) -> Result<Vec<(String, Value)>, &'static str> {
    let items = split_key_items(literal)?;
    if items.len() > MAX_KEY_PROPERTIES {
        return Err("too many key properties");
    }
    if items.len() != keys.len() {
        return Err("key property count does not match the entity key");
    }

    if let [item] = items.as_slice() {
        if named_part(item).is_none() {
            let key = keys[0];
            return Ok(vec![(key.name.clone(), parse_key_value(item, key)?)]);
        }
    }

    let mut out: Vec<(String, Value)> = Vec::with_capacity(items.len());
    for item in items {
        let (name, raw) = named_part(item).ok_or("composite key parts must be named")?;
        let key = keys
            .iter()
            .find(|k| k.name == name)
            .ok_or("unknown key property")?;
        if out.iter().any(|(n, _)| n == name) {
            return Err("duplicate key property");
        }
        out.push((key.name.clone(), parse_key_value(raw, key)?));
    }
    Ok(out)
}

/// Splits `a,b,c` on commas outside string literals.
fn split_key_items(literal: &str) -> Result<Vec<&str>, &'static str> {
    if literal.is_empty() {
        return Err("empty key");
    }
    let mut items = Vec::new();
    let mut in_string = false;
    let mut start = 0;
    for (i, c) in literal.char_indices() {
        match c {
            '\'' => in_string = !in_string,
            ',' if !in_string => {
                items.push(&literal[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_string {
        return Err("unterminated string literal");
    }
    items.push(&literal[start..]);
    if items.iter().any(|item| item.is_empty()) {
        return Err("empty key part");
    }
    Ok(items)
}

/// Splits `Name=value` when the `=` precedes any string literal.
fn named_part(item: &str) -> Option<(&str, &str)> {
    let eq = item.find('=')?;
    match item.find('\'') {
        Some(quote) if quote < eq => None,
        _ => Some((&item[..eq], &item[eq + 1..])),
    }
}

fn parse_key_value(raw: &str, key: &StructuralProperty) -> Result<Value, &'static str> {
    let kind = key.primitive_kind().ok_or("key property is not primitive")?;
    let invalid = "key literal does not match the key property type";
    match kind {
        PrimitiveKind::String => {
            let inner = raw
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .ok_or(invalid)?;
            Ok(Value::String(inner.replace("''", "'")))
        }
        PrimitiveKind::Int32 => raw.parse().map(Value::Int32).map_err(|_| invalid),
        PrimitiveKind::Int64 => raw.parse().map(Value::Int64).map_err(|_| invalid),
        PrimitiveKind::Double => raw.parse().map(Value::Double).map_err(|_| invalid),
        PrimitiveKind::Boolean => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid),
        },
        PrimitiveKind::Guid => Uuid::parse_str(raw).map(Value::Guid).map_err(|_| invalid),
    }
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// The nearest enclosing entity that has an identifier, and the path depth
/// at which it was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentEntity<'a> {
    pub depth: usize,
    pub id: &'a str,
}

/// Computes identifiers and containment context URLs for one payload.
///
/// Shared by the writer and the reader so both sides agree byte for byte.
#[derive(Debug, Clone)]
pub struct Identifiers<'m> {
    model: &'m Model,
    resolver: BindingResolver<'m>,
    service_root: String,
    root: &'m EntitySet,
}

impl<'m> Identifiers<'m> {
    /// Identifiers for a payload taken from `root`.
    pub fn new(model: &'m Model, service_root: &str, root: &'m EntitySet) -> Self {
        Self {
            model,
            resolver: BindingResolver::new(model),
            service_root: service_root.trim_end_matches('/').to_string(),
            root,
        }
    }

    /// The service root without a trailing slash.
    pub fn service_root(&self) -> &str {
        &self.service_root
    }

    /// The entity set the payload is taken from.
    pub fn root(&self) -> &'m EntitySet {
        self.root
    }

    /// Resolves the target of the position `frames` describes.
    pub fn resolve(&self, frames: &[PathFrame<'m>]) -> Result<ResolvedTarget<'m>, ConfigurationError> {
        self.resolver.resolve_stack(self.root, frames)
    }

    /// Identifier of a resource of type `ty` positioned at `frames`.
    ///
    /// Complex resources, unbound entities and entities whose key is
    /// incomplete have no identifier.
    pub fn entity_id(
        &self,
        frames: &[PathFrame<'m>],
        parent: Option<ParentEntity<'_>>,
        ty: &'m StructuredType,
        resource: &Resource,
    ) -> Result<Option<String>, ConfigurationError> {
        if !ty.is_entity() {
            return Ok(None);
        }
        let id = match self.resolve(frames)? {
            ResolvedTarget::Set(set) => format_key(self.model, ty, resource)
                .map(|key| format!("{}/{}{}", self.service_root, set.name, key)),
            ResolvedTarget::Contained => match parent {
                None => None,
                Some(parent) => {
                    let path = contained_path(frames, parent);
                    let collection = frames
                        .iter()
                        .rev()
                        .find_map(|f| match *f {
                            PathFrame::Navigation(n) => Some(n.is_collection()),
                            _ => None,
                        })
                        .unwrap_or(false);
                    if collection {
                        format_key(self.model, ty, resource).map(|key| format!("{path}{key}"))
                    } else {
                        Some(path)
                    }
                }
            },
            ResolvedTarget::Unbound => None,
        };
        Ok(id)
    }

    /// Context URL announced before the content of a contained navigation.
    ///
    /// `frames` must end with the navigation frame. Returns `None` for
    /// navigations that are not contained or whose parent has no identifier.
    pub fn contained_context(
        &self,
        frames: &[PathFrame<'m>],
        parent: Option<ParentEntity<'_>>,
        is_collection: bool,
    ) -> Result<Option<String>, ConfigurationError> {
        if !matches!(frames.last(), Some(PathFrame::Navigation(_))) {
            return Ok(None);
        }
        if self.resolve(frames)? != ResolvedTarget::Contained {
            return Ok(None);
        }
        Ok(parent.map(|parent| {
            let path = contained_path(frames, parent);
            context::contained_context(&self.service_root, &path, is_collection)
        }))
    }
}

/// `<parent id>/<name>/<name>`, naming every non-cast frame since the parent.
fn contained_path(frames: &[PathFrame<'_>], parent: ParentEntity<'_>) -> String {
    let mut path = parent.id.to_string();
    for frame in frames.get(parent.depth..).unwrap_or(&[]) {
        if !frame.is_cast() {
            path.push('/');
            path.push_str(frame.name());
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{MODEL, SERVICE_ROOT};
    use crate::model::{ModelBuilder, NavigationProperty};

    fn identifiers() -> Identifiers<'static> {
        Identifiers::new(&MODEL, SERVICE_ROOT, MODEL.entity_set("EntitySet").unwrap())
    }

    fn nav(type_name: &str, name: &str) -> &'static NavigationProperty {
        MODEL
            .find_type(type_name)
            .unwrap()
            .declared_navigation(name)
            .unwrap()
    }

    fn entity(id: &str) -> Resource {
        Resource::new().property("ID", id)
    }

    #[test]
    fn test_string_key_literal() {
        assert_eq!(format_key_value(&Value::from("abc")).unwrap(), "'abc'");
        assert_eq!(format_key_value(&Value::from("O'Neil")).unwrap(), "'O''Neil'");
        assert_eq!(format_key_value(&Value::from("a b/c")).unwrap(), "'a%20b%2Fc'");
        assert_eq!(format_key_value(&Value::Int64(-7)).unwrap(), "-7");
        assert_eq!(format_key_value(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(format_key_value(&Value::Null), None);
        assert_eq!(format_key_value(&Value::Double(f64::NAN)), None);
    }

    #[test]
    fn test_composite_key() {
        let model = ModelBuilder::new()
            .entity_type("NS.Line", |t| {
                t.key("Order", PrimitiveKind::Int32)
                    .key("Name", PrimitiveKind::String)
            })
            .build()
            .unwrap();
        let ty = model.find_type("NS.Line").unwrap();
        let resource = Resource::new().property("Name", "x").property("Order", 4);
        assert_eq!(
            format_key(&model, ty, &resource).unwrap(),
            "(Order=4,Name='x')"
        );

        let keys = model.key_properties(ty);
        let parsed = parse_key("Name='a,b',Order=2", &keys).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("Name".to_string(), Value::from("a,b")),
                ("Order".to_string(), Value::Int32(2)),
            ]
        );
        assert!(parse_key("Order=2", &keys).is_err());
        assert!(parse_key("Order=2,Order=3", &keys).is_err());
    }

    #[test]
    fn test_parse_single_key() {
        let ty = MODEL.find_type("NS.EntityType").unwrap();
        let keys = MODEL.key_properties(ty);
        assert_eq!(
            parse_key("'it''s'", &keys).unwrap(),
            vec![("ID".to_string(), Value::from("it's"))]
        );
        assert_eq!(
            parse_key("ID='x'", &keys).unwrap(),
            vec![("ID".to_string(), Value::from("x"))]
        );
        assert!(parse_key("42", &keys).is_err());
        assert!(parse_key("'open", &keys).is_err());
        assert!(parse_key("", &keys).is_err());
    }

    #[test]
    fn test_missing_key_has_no_id() {
        let ids = identifiers();
        let ty = MODEL.find_type("NS.EntityType").unwrap();
        assert_eq!(ids.entity_id(&[], None, ty, &Resource::new()).unwrap(), None);
    }

    #[test]
    fn test_top_and_bound_ids() {
        let ids = identifiers();
        let top = MODEL.find_type("NS.EntityType").unwrap();
        assert_eq!(
            ids.entity_id(&[], None, top, &entity("TopEntity")).unwrap().unwrap(),
            "http://host/EntitySet('TopEntity')"
        );

        let nav_type = MODEL.find_type("NS.NavEntityType").unwrap();
        let complex2 = MODEL.find_property(top, "complexProp2").unwrap();
        let frames = [
            PathFrame::Property(complex2),
            PathFrame::Navigation(nav("NS.ComplexType", "CollectionOfNavOnComplex")),
        ];
        assert_eq!(
            ids.entity_id(&frames, None, nav_type, &entity("NavEntity2"))
                .unwrap()
                .unwrap(),
            "http://host/NavEntitySet2('NavEntity2')"
        );
    }

    #[test]
    fn test_contained_ids_and_context() {
        let ids = identifiers();
        let contained = MODEL.find_type("NS.ContainedEntityType").unwrap();
        let parent = ParentEntity {
            depth: 0,
            id: "http://host/EntitySet('TopEntity')",
        };

        let single = [PathFrame::Navigation(nav("NS.EntityType", "ContainedNav1"))];
        assert_eq!(
            ids.entity_id(&single, Some(parent), contained, &entity("ContainedNav1"))
                .unwrap()
                .unwrap(),
            "http://host/EntitySet('TopEntity')/ContainedNav1"
        );
        assert_eq!(
            ids.contained_context(&single, Some(parent), false).unwrap().unwrap(),
            "http://host/$metadata#EntitySet('TopEntity')/ContainedNav1/$entity"
        );

        let many = [PathFrame::Navigation(nav("NS.EntityType", "ContainedMany"))];
        assert_eq!(
            ids.entity_id(&many, Some(parent), contained, &entity("c1"))
                .unwrap()
                .unwrap(),
            "http://host/EntitySet('TopEntity')/ContainedMany('c1')"
        );
        assert_eq!(
            ids.contained_context(&many, Some(parent), true).unwrap().unwrap(),
            "http://host/$metadata#EntitySet('TopEntity')/ContainedMany"
        );

        // Without an identified parent there is nothing to be relative to.
        assert_eq!(ids.entity_id(&single, None, contained, &entity("x")).unwrap(), None);
    }

    #[test]
    fn test_unbound_has_no_id_or_context() {
        let ids = identifiers();
        let nav_type = MODEL.find_type("NS.NavEntityType").unwrap();
        let frames = [PathFrame::Navigation(nav("NS.EntityType", "UnboundNav"))];
        let parent = ParentEntity { depth: 0, id: "http://host/EntitySet('a')" };
        assert_eq!(
            ids.entity_id(&frames, Some(parent), nav_type, &entity("n")).unwrap(),
            None
        );
        assert_eq!(ids.contained_context(&frames, Some(parent), false).unwrap(), None);
    }
}
