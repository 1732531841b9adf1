//! The path stack threaded through the graph walk.

use std::fmt;

use crate::model::{BindingSegment, NavigationProperty, SegmentKind, StructuralProperty, StructuredType};

/// One frame of the path from the entity set root to the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFrame<'m> {
    /// Complex-valued structural property hop.
    Property(&'m StructuralProperty),
    /// Cast to a more derived type than the position expects.
    TypeCast(&'m StructuredType),
    /// Navigation property hop.
    Navigation(&'m NavigationProperty),
}

impl<'m> PathFrame<'m> {
    /// The binding segment kind this frame corresponds to.
    pub fn kind(&self) -> SegmentKind {
        match self {
            PathFrame::Property(_) => SegmentKind::Property,
            PathFrame::TypeCast(_) => SegmentKind::TypeCast,
            PathFrame::Navigation(_) => SegmentKind::Navigation,
        }
    }

    /// The segment name: property or navigation name, or qualified type name.
    pub fn name(&self) -> &'m str {
        match *self {
            PathFrame::Property(p) => &p.name,
            PathFrame::TypeCast(t) => &t.qualified_name,
            PathFrame::Navigation(n) => &n.name,
        }
    }

    /// Returns true if this frame is the step a binding segment names.
    pub fn matches(&self, segment: &BindingSegment) -> bool {
        self.kind() == segment.kind && self.name() == segment.name
    }

    pub fn is_cast(&self) -> bool {
        matches!(self, PathFrame::TypeCast(_))
    }
}

impl fmt::Display for PathFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Owned stack of path frames, indexed by depth.
///
/// Each writer and reader owns one. Scopes remember the depth at which they
/// opened and truncate back to it when they close.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathStack<'m> {
    frames: Vec<PathFrame<'m>>,
}

impl<'m> PathStack<'m> {
    /// An empty stack, positioned at the entity set root.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Pushes a frame for the hop just taken.
    pub fn push(&mut self, frame: PathFrame<'m>) {
        self.frames.push(frame);
    }

    /// Pops the innermost frame.
    pub fn pop(&mut self) -> Option<PathFrame<'m>> {
        self.frames.pop()
    }

    /// Drops every frame above `depth`.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    /// Number of frames, i.e. the current depth.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames from the root outwards.
    pub fn frames(&self) -> &[PathFrame<'m>] {
        &self.frames
    }
}

impl fmt::Display for PathStack<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{frame}")?;
        }
        Ok(())
    }
}
