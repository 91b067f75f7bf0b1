//! # Caret Locator
//!
//! Resolves the live selection to a logical [`CaretPosition`]. The answer is
//! always re-derived from the surface, because a re-render may have replaced
//! every node since the last read.

use notesync_model::{char_len, CaretPosition};

use crate::surface::{NodeContent, NodeRef, Surface, SurfaceNode};

/// Where the caret is, together with the fragment element that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedCaret {
    pub element: NodeRef,
    pub position: CaretPosition,
}

pub fn locate<S: Surface + ?Sized>(surface: &S) -> Option<CaretPosition> {
    locate_element(surface).map(|located| located.position)
}

/// Resolve the selection anchor to its owning element.
///
/// A raw text anchor resolves to its parent. When the anchor is the element
/// itself, offset 0 means "before the text" and anything else "after it".
pub fn locate_element<S: Surface + ?Sized>(surface: &S) -> Option<LocatedCaret> {
    let selection = surface.selection()?;

    let (element, anchored_on_text) = match surface.node(selection.anchor)? {
        SurfaceNode::Text { parent, .. } => (parent?, true),
        SurfaceNode::Element { .. } => (selection.anchor, false),
    };

    let SurfaceNode::Element { tag, content, .. } = surface.node(element)? else {
        return None;
    };
    let tag = tag?;

    let char_offset = match (&content, anchored_on_text) {
        (_, true) => selection.offset,
        (_, false) if selection.offset == 0 => 0,
        (NodeContent::Text(text), false) => char_len(text),
        (NodeContent::Image { .. }, false) => 0,
    };

    Some(LocatedCaret {
        element,
        position: CaretPosition::new(tag.note_id, tag.fragment_index, char_offset),
    })
}
