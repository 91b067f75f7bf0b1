//! # Caret Relocation
//!
//! Selection engines may "correct" a placement right after it is made,
//! especially a caret placed on an empty element. Every relocation therefore
//! arms a one-shot latch: the next selection-change event re-asserts the
//! placement once, then the latch disarms.

use crate::surface::{NodeRef, Selection, Surface, SurfaceNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionLatch {
    #[default]
    Disarmed,
    Armed(Selection),
}

impl SelectionLatch {
    pub fn arm(&mut self, selection: Selection) {
        *self = SelectionLatch::Armed(selection);
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, SelectionLatch::Armed(_))
    }

    /// Selection to re-assert for this event, if armed. Always disarms.
    pub fn on_selection_change(&mut self) -> Option<Selection> {
        match std::mem::take(self) {
            SelectionLatch::Armed(selection) => Some(selection),
            SelectionLatch::Disarmed => None,
        }
    }
}

/// Place a collapsed caret at `char_offset` inside a fragment element.
///
/// An element without text gets the caret on the element itself; otherwise
/// the caret goes inside its text node. Returns the placement made.
pub fn relocate<S: Surface + ?Sized>(
    surface: &mut S,
    latch: &mut SelectionLatch,
    element: NodeRef,
    char_offset: usize,
) -> Option<Selection> {
    let selection = match surface.node(element)? {
        SurfaceNode::Element {
            text_child: Some(text),
            ..
        } => Selection {
            anchor: text,
            offset: char_offset,
        },
        SurfaceNode::Element {
            text_child: None, ..
        } => Selection {
            anchor: element,
            offset: 0,
        },
        SurfaceNode::Text { .. } => return None,
    };

    surface.set_selection(selection);
    latch.arm(selection);
    Some(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{FragmentTag, MemorySurface, NodeContent, NodeSpec, RenderedNote};

    fn surface(texts: &[&str]) -> MemorySurface {
        let mut surface = MemorySurface::new();
        surface.render(vec![RenderedNote {
            note_id: 1,
            nodes: texts
                .iter()
                .enumerate()
                .map(|(i, text)| NodeSpec {
                    tag: FragmentTag {
                        note_id: 1,
                        fragment_index: i,
                    },
                    content: NodeContent::Text(text.to_string()),
                })
                .collect(),
        }]);
        surface
    }

    #[test]
    fn test_latch_fires_exactly_once() {
        let placement = Selection {
            anchor: NodeRef(7),
            offset: 2,
        };
        let mut latch = SelectionLatch::default();
        latch.arm(placement);

        assert_eq!(latch.on_selection_change(), Some(placement));
        assert!(!latch.is_armed());
        assert_eq!(latch.on_selection_change(), None);
    }

    #[test]
    fn test_rearming_replaces_pending_placement() {
        let mut latch = SelectionLatch::default();
        latch.arm(Selection {
            anchor: NodeRef(1),
            offset: 0,
        });
        latch.arm(Selection {
            anchor: NodeRef(2),
            offset: 5,
        });

        assert_eq!(
            latch.on_selection_change().map(|s| s.anchor),
            Some(NodeRef(2))
        );
    }

    #[test]
    fn test_relocate_into_text_node() {
        let mut surface = surface(&["abc"]);
        let mut latch = SelectionLatch::default();
        let element = surface.fragment_node(1, 0).unwrap();

        let placed = relocate(&mut surface, &mut latch, element, 3).unwrap();

        assert_ne!(placed.anchor, element);
        assert_eq!(placed.offset, 3);
        assert_eq!(surface.selection(), Some(placed));
        assert_eq!(latch, SelectionLatch::Armed(placed));
    }

    #[test]
    fn test_relocate_onto_empty_element() {
        let mut surface = surface(&[""]);
        let mut latch = SelectionLatch::default();
        let element = surface.fragment_node(1, 0).unwrap();

        let placed = relocate(&mut surface, &mut latch, element, 0).unwrap();

        assert_eq!(
            placed,
            Selection {
                anchor: element,
                offset: 0
            }
        );
        assert!(latch.is_armed());
    }
}
