//! In-memory surface for tests and headless sessions

use std::collections::HashMap;

use notesync_model::{char_len, split_text_at, NoteId};

use super::{
    fragment_node, Listener, NodeContent, NodeRef, NoteContainer, RenderedNote, Selection, Surface,
    SurfaceNode,
};

#[derive(Debug, Clone)]
struct MemoryContainer {
    note_id: NoteId,
    identity: Option<NoteId>,
    children: Vec<NodeRef>,
}

/// Node tree kept in plain maps. Node handles are never reused, so a handle
/// from before a re-render never aliases a new node.
#[derive(Debug, Default)]
pub struct MemorySurface {
    next_node: u64,
    nodes: HashMap<NodeRef, SurfaceNode>,
    containers: Vec<MemoryContainer>,
    selection: Option<Selection>,
    listeners: HashMap<NodeRef, Vec<Listener>>,
    selection_writes: usize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_node(&mut self, node: SurfaceNode) -> NodeRef {
        self.next_node += 1;
        let node_ref = NodeRef(self.next_node);
        self.nodes.insert(node_ref, node);
        node_ref
    }

    fn container_mut(&mut self, note_id: NoteId) -> Option<&mut MemoryContainer> {
        self.containers.iter_mut().find(|c| c.note_id == note_id)
    }

    /// Element that owns `node` (itself if it is an element)
    fn owning_element(&self, node: NodeRef) -> Option<NodeRef> {
        match self.nodes.get(&node)? {
            SurfaceNode::Element { .. } => Some(node),
            SurfaceNode::Text { parent, .. } => *parent,
        }
    }

    /// Notes in the order they were rendered
    pub fn note_order(&self) -> Vec<NoteId> {
        self.containers.iter().map(|c| c.note_id).collect()
    }

    pub fn fragment_node(&self, note_id: NoteId, fragment_index: usize) -> Option<NodeRef> {
        fragment_node(self, note_id, fragment_index)
    }

    pub fn text_of(&self, note_id: NoteId, fragment_index: usize) -> Option<String> {
        let node = self.fragment_node(note_id, fragment_index)?;
        super::element_text(self, node)
    }

    /// Put a collapsed caret inside a fragment, the way a user click would
    pub fn place_caret(&mut self, note_id: NoteId, fragment_index: usize, offset: usize) -> bool {
        let Some(node) = self.fragment_node(note_id, fragment_index) else {
            return false;
        };

        let anchor = match self.nodes.get(&node) {
            Some(SurfaceNode::Element {
                text_child: Some(child),
                ..
            }) => *child,
            _ => node,
        };

        self.selection = Some(Selection { anchor, offset });
        true
    }

    /// Simulate the user typing at the caret. Returns the edited element,
    /// which is the target of the resulting input event.
    pub fn type_at_caret(&mut self, typed: &str) -> Option<NodeRef> {
        let selection = self.selection?;
        let element = self.owning_element(selection.anchor)?;
        let current = super::element_text(self, element)?;

        let offset = if selection.anchor == element {
            if selection.offset == 0 {
                0
            } else {
                char_len(&current)
            }
        } else {
            selection.offset.min(char_len(&current))
        };

        let (before, after) = split_text_at(&current, offset);
        let updated = format!("{before}{typed}{after}");
        self.set_text(element, &updated);

        let anchor = match self.nodes.get(&element) {
            Some(SurfaceNode::Element {
                text_child: Some(child),
                ..
            }) => *child,
            _ => element,
        };
        self.selection = Some(Selection {
            anchor,
            offset: offset + char_len(typed),
        });

        Some(element)
    }

    /// Append a raw text node straight into a note's container
    pub fn append_raw_text(&mut self, note_id: NoteId, text: &str) -> Option<NodeRef> {
        self.container_mut(note_id)?;
        let node = self.insert_node(SurfaceNode::Text {
            parent: None,
            text: text.to_string(),
        });
        self.container_mut(note_id)?.children.push(node);
        Some(node)
    }

    /// Drop the identity tag from a note's container
    pub fn clear_identity(&mut self, note_id: NoteId) {
        if let Some(container) = self.container_mut(note_id) {
            container.identity = None;
        }
    }

    /// Remove a note's container and everything in it
    pub fn remove_note(&mut self, note_id: NoteId) {
        let Some(position) = self.containers.iter().position(|c| c.note_id == note_id) else {
            return;
        };

        let container = self.containers.remove(position);
        for child in container.children {
            if let Some(SurfaceNode::Element {
                text_child: Some(text),
                ..
            }) = self.nodes.remove(&child)
            {
                self.nodes.remove(&text);
            }
        }

        if let Some(selection) = self.selection {
            if !self.nodes.contains_key(&selection.anchor) {
                self.selection = None;
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn listener_count(&self, node: NodeRef, listener: Listener) -> usize {
        self.listeners
            .get(&node)
            .map(|bound| bound.iter().filter(|l| **l == listener).count())
            .unwrap_or(0)
    }

    /// Number of nodes with at least one listener attached
    pub fn listened_nodes(&self) -> usize {
        self.listeners.len()
    }

    /// Number of `set_selection` calls made so far
    pub fn selection_writes(&self) -> usize {
        self.selection_writes
    }
}

impl Surface for MemorySurface {
    fn render(&mut self, notes: Vec<RenderedNote>) {
        self.nodes.clear();
        self.containers.clear();
        self.selection = None;

        for note in notes {
            let mut children = Vec::with_capacity(note.nodes.len());

            for spec in note.nodes {
                let text = match &spec.content {
                    NodeContent::Text(text) if !text.is_empty() => Some(text.clone()),
                    _ => None,
                };

                let element = self.insert_node(SurfaceNode::Element {
                    tag: Some(spec.tag),
                    content: spec.content,
                    text_child: None,
                });

                if let Some(text) = text {
                    let child = self.insert_node(SurfaceNode::Text {
                        parent: Some(element),
                        text,
                    });
                    if let Some(SurfaceNode::Element { text_child, .. }) =
                        self.nodes.get_mut(&element)
                    {
                        *text_child = Some(child);
                    }
                }

                children.push(element);
            }

            self.containers.push(MemoryContainer {
                note_id: note.note_id,
                identity: Some(note.note_id),
                children,
            });
        }
    }

    fn fragment_nodes(&self, note_id: NoteId) -> Option<NoteContainer> {
        self.containers
            .iter()
            .find(|c| c.note_id == note_id)
            .map(|c| NoteContainer {
                identity: c.identity,
                children: c.children.clone(),
            })
    }

    fn node(&self, node: NodeRef) -> Option<SurfaceNode> {
        self.nodes.get(&node).cloned()
    }

    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) {
        self.selection_writes += 1;
        self.selection = Some(selection);
    }

    fn set_text(&mut self, node: NodeRef, text: &str) {
        let existing_child = match self.nodes.get_mut(&node) {
            Some(SurfaceNode::Element {
                content: NodeContent::Text(current),
                text_child,
                ..
            }) => {
                *current = text.to_string();
                *text_child
            }
            _ => return,
        };

        let new_child = match existing_child {
            Some(child) if !text.is_empty() => {
                if let Some(SurfaceNode::Text { text: current, .. }) = self.nodes.get_mut(&child) {
                    *current = text.to_string();
                }
                if let Some(selection) = self.selection.as_mut() {
                    if selection.anchor == child {
                        selection.offset = selection.offset.min(char_len(text));
                    }
                }
                Some(child)
            }
            Some(child) => {
                self.nodes.remove(&child);
                if self.selection.map(|s| s.anchor) == Some(child) {
                    self.selection = Some(Selection {
                        anchor: node,
                        offset: 0,
                    });
                }
                None
            }
            None if !text.is_empty() => Some(self.insert_node(SurfaceNode::Text {
                parent: Some(node),
                text: text.to_string(),
            })),
            None => None,
        };

        if let Some(SurfaceNode::Element { text_child, .. }) = self.nodes.get_mut(&node) {
            *text_child = new_child;
        }
    }

    fn listen(&mut self, node: NodeRef, listener: Listener) {
        self.listeners.entry(node).or_default().push(listener);
    }

    fn unlisten(&mut self, node: NodeRef, listener: Listener) {
        if let Some(bound) = self.listeners.get_mut(&node) {
            bound.retain(|l| *l != listener);
            if bound.is_empty() {
                self.listeners.remove(&node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{FragmentTag, NodeSpec};

    fn text_spec(note_id: NoteId, fragment_index: usize, text: &str) -> NodeSpec {
        NodeSpec {
            tag: FragmentTag {
                note_id,
                fragment_index,
            },
            content: NodeContent::Text(text.to_string()),
        }
    }

    fn surface_with(texts: &[&str]) -> MemorySurface {
        let mut surface = MemorySurface::new();
        surface.render(vec![RenderedNote {
            note_id: 1,
            nodes: texts
                .iter()
                .enumerate()
                .map(|(i, t)| text_spec(1, i, t))
                .collect(),
        }]);
        surface
    }

    #[test]
    fn test_empty_text_has_no_text_child() {
        let surface = surface_with(&["", "x"]);

        let empty = surface.fragment_node(1, 0).unwrap();
        let full = surface.fragment_node(1, 1).unwrap();

        assert!(matches!(
            surface.node(empty),
            Some(SurfaceNode::Element { text_child: None, .. })
        ));
        assert!(matches!(
            surface.node(full),
            Some(SurfaceNode::Element { text_child: Some(_), .. })
        ));
    }

    #[test]
    fn test_type_at_caret_inserts_and_advances() {
        let mut surface = surface_with(&["held"]);
        surface.place_caret(1, 0, 3);

        let edited = surface.type_at_caret("lo wor").unwrap();

        assert_eq!(Some(edited), surface.fragment_node(1, 0));
        assert_eq!(surface.text_of(1, 0).as_deref(), Some("hello word"));
        assert_eq!(surface.selection().unwrap().offset, 9);
    }

    #[test]
    fn test_typing_into_empty_fragment_creates_text_child() {
        let mut surface = surface_with(&[""]);
        surface.place_caret(1, 0, 0);

        surface.type_at_caret("a");

        let element = surface.fragment_node(1, 0).unwrap();
        let selection = surface.selection().unwrap();
        assert_ne!(selection.anchor, element);
        assert_eq!(selection.offset, 1);
    }

    #[test]
    fn test_clearing_text_moves_caret_to_element() {
        let mut surface = surface_with(&["abc"]);
        surface.place_caret(1, 0, 2);
        let element = surface.fragment_node(1, 0).unwrap();

        surface.set_text(element, "");

        assert_eq!(
            surface.selection(),
            Some(Selection {
                anchor: element,
                offset: 0
            })
        );
    }

    #[test]
    fn test_unlisten_forgets_node_once_unbound() {
        let mut surface = surface_with(&["a"]);
        let node = surface.fragment_node(1, 0).unwrap();

        surface.listen(node, Listener::Input);
        surface.listen(node, Listener::KeyDown);
        surface.unlisten(node, Listener::Input);
        assert_eq!(surface.listened_nodes(), 1);

        surface.unlisten(node, Listener::KeyDown);
        assert_eq!(surface.listened_nodes(), 0);
        assert_eq!(surface.listener_count(node, Listener::KeyDown), 0);
    }

    #[test]
    fn test_rerender_never_reuses_handles() {
        let mut surface = surface_with(&["a"]);
        let before = surface.fragment_node(1, 0).unwrap();

        surface.render(vec![RenderedNote {
            note_id: 1,
            nodes: vec![text_spec(1, 0, "a")],
        }]);

        assert!(surface.node(before).is_none());
        assert_ne!(surface.fragment_node(1, 0), Some(before));
    }
}
