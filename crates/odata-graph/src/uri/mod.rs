//! Resource path parsing.
//!
//! Splits a request URI such as
//! `http://host/EntitySet('abc')/NS.DerivedEntityType/Nav` into typed
//! segments and resolves the target entity set of every navigation segment
//! with the same binding rules the writer and reader use.

use std::borrow::Cow;
use std::fmt;

use crate::codec::id::{format_key_value, parse_key};
use crate::error::UriError;
use crate::limits::MAX_PATH_SEGMENTS;
use crate::model::{
    EntitySet, Member, Model, NavigationProperty, StructuralProperty, StructuredType, Value,
};
use crate::resolve::{BindingResolver, PathFrame, ResolvedTarget};

/// One classified segment of a resource path.
#[derive(Debug, Clone, PartialEq)]
pub enum UriSegment<'m> {
    EntitySet(&'m EntitySet),
    /// Key values in declaration order of the parsed literal.
    Key(Vec<(String, Value)>),
    TypeCast(&'m StructuredType),
    Property(&'m StructuralProperty),
    Navigation {
        property: &'m NavigationProperty,
        target: ResolvedTarget<'m>,
    },
}

impl<'m> UriSegment<'m> {
    /// The entity set this segment addresses, if it is bound to one.
    pub fn target_set(&self) -> Option<&'m EntitySet> {
        match self {
            UriSegment::EntitySet(set) => Some(*set),
            UriSegment::Navigation { target, .. } => target.entity_set(),
            UriSegment::Key(_) | UriSegment::TypeCast(_) | UriSegment::Property(_) => None,
        }
    }
}

impl fmt::Display for UriSegment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UriSegment::EntitySet(set) => f.write_str(&set.name),
            UriSegment::Key(values) => {
                f.write_str("(")?;
                for (i, (name, value)) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    let literal = format_key_value(value).unwrap_or_default();
                    if values.len() == 1 {
                        f.write_str(&literal)?;
                    } else {
                        write!(f, "{name}={literal}")?;
                    }
                }
                f.write_str(")")
            }
            UriSegment::TypeCast(ty) => f.write_str(&ty.qualified_name),
            UriSegment::Property(p) => f.write_str(&p.name),
            UriSegment::Navigation { property, .. } => f.write_str(&property.name),
        }
    }
}

/// Parses `uri` (which must start with `service_root`) into segments.
///
/// Query and fragment parts are ignored. Navigation targets are resolved
/// over the frames accumulated since the last segment bound to a set, so a
/// cast counts whether it appears before or after the key.
pub fn parse_path<'m>(
    model: &'m Model,
    service_root: &str,
    uri: &str,
) -> Result<Vec<UriSegment<'m>>, UriError> {
    let root = service_root.trim_end_matches('/');
    let rest = uri
        .strip_prefix(root)
        .filter(|rest| rest.is_empty() || rest.starts_with(|c: char| c == '/' || c == '?'))
        .ok_or_else(|| UriError::NotUnderServiceRoot {
            uri: uri.to_string(),
            service_root: service_root.to_string(),
        })?;
    let path = rest.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();

    let raw: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((first, following)) = raw.split_first() else {
        return Err(UriError::EmptyPath);
    };
    if raw.len() > MAX_PATH_SEGMENTS {
        return Err(UriError::TooManySegments {
            count: raw.len(),
            max: MAX_PATH_SEGMENTS,
        });
    }

    let resolver = BindingResolver::new(model);
    let mut out = Vec::with_capacity(raw.len() + 2);

    let (name, key) = split_segment(first)?;
    let set = model
        .entity_set(&name)
        .map_err(|_| UriError::UnknownSegment { segment: name })?;
    out.push(UriSegment::EntitySet(set));

    let mut source = set;
    let mut current = model.entity_set_type(set)?;
    let mut frames: Vec<PathFrame<'m>> = Vec::new();
    let mut collection = true;
    let mut unbound = false;
    let mut terminal = false;

    if let Some(literal) = key {
        out.push(key_segment(model, current, first, &literal)?);
        collection = false;
    }

    for segment in following {
        if terminal {
            return Err(UriError::UnknownSegment {
                segment: segment.to_string(),
            });
        }
        let (name, key) = split_segment(segment)?;

        if name.contains('.') {
            let cast = model
                .find_type(&name)
                .map_err(|_| UriError::UnknownSegment {
                    segment: name.clone(),
                })?;
            if cast.kind != current.kind || !model.is_derived_from(cast, current) {
                return Err(UriError::TypeNotDerived {
                    type_name: name,
                    expected: current.qualified_name.clone(),
                });
            }
            // Payloads carry no frame for a cast to the type in effect.
            if cast.qualified_name != current.qualified_name {
                frames.push(PathFrame::TypeCast(cast));
            }
            current = cast;
            out.push(UriSegment::TypeCast(cast));
        } else {
            if collection {
                return Err(UriError::KeyRequired { segment: name });
            }
            match model.find_member(current, &name) {
                Some(Member::Navigation(navigation)) => {
                    let target = if unbound {
                        ResolvedTarget::Unbound
                    } else {
                        resolver.resolve(source, &frames, navigation)?
                    };
                    match target {
                        ResolvedTarget::Set(target_set) => {
                            source = target_set;
                            frames.clear();
                        }
                        ResolvedTarget::Contained => frames.push(PathFrame::Navigation(navigation)),
                        ResolvedTarget::Unbound => unbound = true,
                    }
                    current = model.find_type(&navigation.target_type)?;
                    collection = navigation.is_collection();
                    out.push(UriSegment::Navigation {
                        property: navigation,
                        target,
                    });
                }
                Some(Member::Structural(property)) => {
                    match property.complex_type() {
                        Some(complex) => {
                            frames.push(PathFrame::Property(property));
                            current = model.find_type(complex)?;
                        }
                        None => terminal = true,
                    }
                    collection = property.is_collection;
                    out.push(UriSegment::Property(property));
                }
                None => return Err(UriError::UnknownSegment { segment: name }),
            }
        }

        if let Some(literal) = key {
            if !collection || terminal {
                return Err(UriError::UnexpectedKey {
                    segment: segment.to_string(),
                });
            }
            out.push(key_segment(model, current, segment, &literal)?);
            collection = false;
        }
    }
    Ok(out)
}

/// Splits `Name(key)` and percent-decodes both parts.
fn split_segment(raw: &str) -> Result<(String, Option<String>), UriError> {
    let (name, key) = match raw.find('(') {
        Some(open) => {
            let inner = raw[open + 1..]
                .strip_suffix(')')
                .ok_or_else(|| UriError::InvalidKey {
                    segment: raw.to_string(),
                    reason: "missing closing parenthesis",
                })?;
            (&raw[..open], Some(inner))
        }
        None => (raw, None),
    };
    let decode = |s: &str| {
        urlencoding::decode(s)
            .map(Cow::into_owned)
            .map_err(|_| UriError::UnknownSegment {
                segment: raw.to_string(),
            })
    };
    Ok((decode(name)?, key.map(decode).transpose()?))
}

fn key_segment<'m>(
    model: &'m Model,
    ty: &'m StructuredType,
    segment: &str,
    literal: &str,
) -> Result<UriSegment<'m>, UriError> {
    let keys = model.key_properties(ty);
    if keys.is_empty() {
        return Err(UriError::UnexpectedKey {
            segment: segment.to_string(),
        });
    }
    let values = parse_key(literal, &keys).map_err(|reason| UriError::InvalidKey {
        segment: segment.to_string(),
        reason,
    })?;
    Ok(UriSegment::Key(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DERIVED_MODEL, MODEL, SERVICE_ROOT};

    fn target(segment: &UriSegment<'_>) -> Option<String> {
        segment.target_set().map(|s| s.name.clone())
    }

    #[test]
    fn test_cast_before_and_after_key() {
        for uri in [
            "http://host/EntitySet/NS.DerivedEntityType('abc')/Nav",
            "http://host/EntitySet('abc')/NS.DerivedEntityType/Nav",
        ] {
            let path = parse_path(&DERIVED_MODEL, SERVICE_ROOT, uri).unwrap();
            assert_eq!(path.len(), 4, "{uri}");
            assert!(matches!(path[3], UriSegment::Navigation { .. }));
            assert_eq!(target(&path[3]).as_deref(), Some("NavEntitySet"));
        }
    }

    #[test]
    fn test_derived_navigation_requires_cast() {
        let err = parse_path(&DERIVED_MODEL, SERVICE_ROOT, "http://host/EntitySet('abc')/Nav");
        // Nav is declared on the derived type only.
        assert!(matches!(err, Err(UriError::UnknownSegment { .. })));
    }

    #[test]
    fn test_cast_to_current_type_is_transparent() {
        let path = parse_path(
            &MODEL,
            SERVICE_ROOT,
            "http://host/EntitySet('a')/NS.EntityType/ContainedNav2/NavOnContained",
        )
        .unwrap();
        assert!(matches!(path[2], UriSegment::TypeCast(_)));
        assert_eq!(target(&path[4]).as_deref(), Some("NavEntitySet2"));
    }

    #[test]
    fn test_multi_binding_paths() {
        let path = parse_path(
            &MODEL,
            SERVICE_ROOT,
            "http://host/EntitySet('a')/ContainedNav2/NavOnContained",
        )
        .unwrap();
        assert!(matches!(
            path[2],
            UriSegment::Navigation {
                target: ResolvedTarget::Contained,
                ..
            }
        ));
        assert_eq!(target(&path[3]).as_deref(), Some("NavEntitySet2"));

        let path = parse_path(
            &MODEL,
            SERVICE_ROOT,
            "http://host/EntitySet('a')/complexProp1/CollectionOfNavOnComplex('n')?$select=ID",
        )
        .unwrap();
        assert_eq!(target(&path[3]).as_deref(), Some("NavEntitySet1"));
        assert_eq!(
            path[4],
            UriSegment::Key(vec![("ID".to_string(), Value::from("n"))])
        );
    }

    #[test]
    fn test_key_decoding_and_display() {
        let path = parse_path(&MODEL, "http://host/", "http://host/EntitySet('a%20''b')").unwrap();
        assert_eq!(
            path[1],
            UriSegment::Key(vec![("ID".to_string(), Value::from("a 'b"))])
        );
        let rendered: Vec<_> = path.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["EntitySet", "('a%20''b')"]);
    }

    #[test]
    fn test_errors() {
        let parse = |uri| parse_path(&MODEL, SERVICE_ROOT, uri);
        assert!(matches!(
            parse("http://other/EntitySet"),
            Err(UriError::NotUnderServiceRoot { .. })
        ));
        assert!(matches!(
            parse("http://hostname/EntitySet"),
            Err(UriError::NotUnderServiceRoot { .. })
        ));
        assert_eq!(parse("http://host/"), Err(UriError::EmptyPath));
        assert!(matches!(
            parse("http://host/Missing"),
            Err(UriError::UnknownSegment { .. })
        ));
        assert!(matches!(
            parse("http://host/EntitySet/ContainedNav1"),
            Err(UriError::KeyRequired { .. })
        ));
        assert!(matches!(
            parse("http://host/EntitySet('a')/ContainedNav1('x')"),
            Err(UriError::UnexpectedKey { .. })
        ));
        assert!(matches!(
            parse("http://host/EntitySet/NS.NavEntityType"),
            Err(UriError::TypeNotDerived { .. })
        ));
        assert!(matches!(
            parse("http://host/EntitySet('a'"),
            Err(UriError::InvalidKey { .. })
        ));
        assert!(matches!(
            parse("http://host/EntitySet('a')/complexProp1/Prop1/More"),
            Err(UriError::UnknownSegment { .. })
        ));
    }
}
