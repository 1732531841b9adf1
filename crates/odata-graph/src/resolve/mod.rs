//! Navigation binding resolution.
//!
//! Given the entity set a walk started from and the frames crossed since,
//! decides which bound entity set (if any) a navigation property targets.
//! One navigation may be bound several times under the same source set,
//! distinguished only by the path used to reach it (multi-binding).
//!
//! # Matching
//!
//! A binding matches when its segments equal the accumulated frames
//! followed by the navigation itself:
//! - names compare exactly and case-sensitively
//! - a cast named by the binding must be present with the same qualified
//!   name (no matching across base and derived types)
//! - a cast frame the binding does not name is skipped
//!
//! Among matching bindings the one naming more segments wins. Equal
//! specificity is rejected when the model is built; if it shows up anyway
//! it is reported as [`ConfigurationError::AmbiguousBinding`].

pub mod path;

use tracing::trace;

use crate::error::ConfigurationError;
use crate::model::{BindingSegment, EntitySet, Model, NavigationBinding, NavigationProperty, SegmentKind};

pub use path::{PathFrame, PathStack};

/// Where a navigation leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTarget<'m> {
    /// A top-level entity set; members are identified as `Set('key')`.
    Set(&'m EntitySet),
    /// Contained target; identified relative to its parent.
    Contained,
    /// No matching binding; no identifier can be computed.
    Unbound,
}

impl<'m> ResolvedTarget<'m> {
    /// The target set, if the navigation is bound to one.
    pub fn entity_set(&self) -> Option<&'m EntitySet> {
        match *self {
            ResolvedTarget::Set(set) => Some(set),
            ResolvedTarget::Contained | ResolvedTarget::Unbound => None,
        }
    }
}

/// Resolves navigation targets against a model's binding table.
///
/// Stateless and side-effect free: calling it again with the same inputs
/// returns the same answer.
#[derive(Debug, Clone, Copy)]
pub struct BindingResolver<'m> {
    model: &'m Model,
}

impl<'m> BindingResolver<'m> {
    /// Creates a resolver over `model`.
    pub fn new(model: &'m Model) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    /// Resolves `navigation` reached from `source` via `path`.
    ///
    /// `path` holds the frames accumulated since `source` became the current
    /// navigation source, excluding the navigation itself.
    pub fn resolve(
        &self,
        source: &EntitySet,
        path: &[PathFrame<'m>],
        navigation: &'m NavigationProperty,
    ) -> Result<ResolvedTarget<'m>, ConfigurationError> {
        let mut best: Option<(&'m NavigationBinding, usize)> = None;
        let mut tie: Option<&'m NavigationBinding> = None;

        for binding in self.model.bindings_for(&source.name, navigation) {
            let Some(score) = match_binding(binding.path.segments(), path, navigation) else {
                continue;
            };
            match best {
                Some((_, best_score)) if best_score > score => {}
                Some((_, best_score)) if best_score == score => tie = Some(binding),
                _ => {
                    best = Some((binding, score));
                    tie = None;
                }
            }
        }

        if let (Some((first, _)), Some(second)) = (best, tie) {
            return Err(ConfigurationError::AmbiguousBinding {
                source_set: source.name.clone(),
                navigation: first.navigation.to_string(),
                first: first.path.to_string(),
                second: second.path.to_string(),
            });
        }

        let target = match best {
            Some((binding, _)) => ResolvedTarget::Set(self.model.entity_set(&binding.target)?),
            None if navigation.contains_target => ResolvedTarget::Contained,
            None => ResolvedTarget::Unbound,
        };

        trace!(
            source = %source.name,
            navigation = %navigation.name,
            target = ?target.entity_set().map(|s| s.name.as_str()),
            contained = matches!(target, ResolvedTarget::Contained),
            "resolved navigation binding"
        );
        Ok(target)
    }

    /// Walks a full path stack from `root` and resolves its last navigation.
    ///
    /// Navigations that resolve to a set make that set the new source and
    /// restart path accumulation. Contained navigations keep the source and
    /// stay in the accumulated path. Anything below an unbound navigation is
    /// unbound. A stack without navigation frames resolves to `root`.
    pub fn resolve_stack(
        &self,
        root: &'m EntitySet,
        frames: &[PathFrame<'m>],
    ) -> Result<ResolvedTarget<'m>, ConfigurationError> {
        let mut source = root;
        let mut start = 0;
        let mut result = ResolvedTarget::Set(root);

        for (i, frame) in frames.iter().enumerate() {
            let PathFrame::Navigation(navigation) = *frame else {
                continue;
            };
            match self.resolve(source, &frames[start..i], navigation)? {
                ResolvedTarget::Set(target) => {
                    source = target;
                    start = i + 1;
                    result = ResolvedTarget::Set(target);
                }
                ResolvedTarget::Contained => result = ResolvedTarget::Contained,
                ResolvedTarget::Unbound => return Ok(ResolvedTarget::Unbound),
            }
        }
        Ok(result)
    }
}

/// Returns the specificity (segment count) of a matching binding.
fn match_binding(
    segments: &[BindingSegment],
    path: &[PathFrame<'_>],
    navigation: &NavigationProperty,
) -> Option<usize> {
    let (last, prefix) = segments.split_last()?;
    if last.kind != SegmentKind::Navigation || last.name != navigation.name {
        return None;
    }

    let mut expected = prefix.iter().peekable();
    for frame in path {
        match expected.peek() {
            Some(segment) if frame.matches(segment) => {
                expected.next();
            }
            _ if frame.is_cast() => {}
            _ => return None,
        }
    }
    if expected.next().is_some() {
        return None;
    }
    Some(segments.len())
}
