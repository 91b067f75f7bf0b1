//! # Editable Surface
//!
//! Capability interface over whatever UI toolkit hosts the editable notes.
//! The synchronization engine only talks to this trait, never to a concrete
//! node tree.
//!
//! The surface is modelled like a document tree: each note owns a container
//! whose children are fragment elements; a text element holds (at most) one
//! raw text node, which is where a selection usually anchors.

mod memory;

pub use memory::MemorySurface;

use notesync_model::NoteId;

/// Opaque handle to a live surface node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub u64);

/// Identity tags carried by a rendered fragment element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentTag {
    pub note_id: NoteId,
    pub fragment_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeContent {
    /// Editable block holding a text run
    Text(String),

    /// Fixed, non-editable image reference
    Image { src: String },
}

/// Element the renderer asks the surface to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub tag: FragmentTag,
    pub content: NodeContent,
}

/// Everything rendered for one note, in fragment order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNote {
    pub note_id: NoteId,
    pub nodes: Vec<NodeSpec>,
}

/// A note's container as it currently exists on the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteContainer {
    /// Note identity tag on the container (may have been lost)
    pub identity: Option<NoteId>,

    /// Child nodes in document order
    pub children: Vec<NodeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceNode {
    Element {
        tag: Option<FragmentTag>,
        content: NodeContent,
        text_child: Option<NodeRef>,
    },
    Text {
        parent: Option<NodeRef>,
        text: String,
    },
}

/// Collapsed selection: anchor node plus offset inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: NodeRef,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    Input,
    KeyDown,
}

pub trait Surface: Send {
    /// Replace everything on the surface with `notes`, in the given order
    fn render(&mut self, notes: Vec<RenderedNote>);

    /// Container and children for a note, `None` if it is not on the surface
    fn fragment_nodes(&self, note_id: NoteId) -> Option<NoteContainer>;

    fn node(&self, node: NodeRef) -> Option<SurfaceNode>;

    fn selection(&self) -> Option<Selection>;

    fn set_selection(&mut self, selection: Selection);

    /// Programmatically replace the text of an editable element
    fn set_text(&mut self, node: NodeRef, text: &str);

    fn listen(&mut self, node: NodeRef, listener: Listener);

    fn unlisten(&mut self, node: NodeRef, listener: Listener);
}

/// Element node for a fragment of a note, looked up by its tags
pub fn fragment_node<S: Surface + ?Sized>(
    surface: &S,
    note_id: NoteId,
    fragment_index: usize,
) -> Option<NodeRef> {
    surface
        .fragment_nodes(note_id)?
        .children
        .into_iter()
        .find(|child| {
            matches!(
                surface.node(*child),
                Some(SurfaceNode::Element { tag: Some(tag), .. })
                    if tag.note_id == note_id && tag.fragment_index == fragment_index
            )
        })
}

/// Text of an editable element, `None` for images and raw text nodes
pub fn element_text<S: Surface + ?Sized>(surface: &S, node: NodeRef) -> Option<String> {
    match surface.node(node)? {
        SurfaceNode::Element {
            content: NodeContent::Text(text),
            ..
        } => Some(text),
        _ => None,
    }
}
