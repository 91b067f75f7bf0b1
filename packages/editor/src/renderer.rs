//! # Surface Renderer
//!
//! Projects a [`NoteCollection`] onto the surface: one element per fragment,
//! tagged with `(note, fragment index)`. Text elements get input and key-down
//! listeners; images are fixed and never listened to.
//!
//! Every render first detaches the listeners it attached last time, then
//! re-attaches remove-then-add, so a node is never bound twice.

use notesync_model::{Fragment, NoteCollection};

use crate::config::EditorConfig;
use crate::surface::{
    FragmentTag, Listener, NodeContent, NodeRef, NodeSpec, RenderedNote, Surface, SurfaceNode,
};

const LISTENERS: [Listener; 2] = [Listener::Input, Listener::KeyDown];

#[derive(Debug, Default)]
pub struct SurfaceRenderer {
    /// Nodes currently carrying our listeners
    bound: Vec<NodeRef>,
}

impl SurfaceRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node specs for every note, in ascending id order
    pub fn project(notes: &NoteCollection, config: &EditorConfig) -> Vec<RenderedNote> {
        notes
            .iter()
            .map(|(note_id, note)| RenderedNote {
                note_id,
                nodes: note
                    .fragments
                    .iter()
                    .enumerate()
                    .map(|(fragment_index, fragment)| NodeSpec {
                        tag: FragmentTag {
                            note_id,
                            fragment_index,
                        },
                        content: match fragment {
                            Fragment::Text(text) => NodeContent::Text(text.clone()),
                            Fragment::Image(image_ref) => NodeContent::Image {
                                src: config.image_src(image_ref),
                            },
                        },
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn render<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        notes: &NoteCollection,
        config: &EditorConfig,
    ) {
        for node in self.bound.drain(..) {
            for listener in LISTENERS {
                surface.unlisten(node, listener);
            }
        }

        surface.render(Self::project(notes, config));

        for (note_id, _) in notes.iter() {
            let Some(container) = surface.fragment_nodes(note_id) else {
                continue;
            };

            for child in container.children {
                let editable = matches!(
                    surface.node(child),
                    Some(SurfaceNode::Element {
                        tag: Some(_),
                        content: NodeContent::Text(_),
                        ..
                    })
                );
                if !editable {
                    continue;
                }

                for listener in LISTENERS {
                    surface.unlisten(child, listener);
                    surface.listen(child, listener);
                }
                self.bound.push(child);
            }
        }

        tracing::debug!(
            notes = notes.len(),
            bound = self.bound.len(),
            "rendered note collection"
        );
    }

    pub fn bound(&self) -> &[NodeRef] {
        &self.bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use notesync_model::Note;

    fn collection() -> NoteCollection {
        NoteCollection::new(vec![
            (
                4,
                Note::new(vec![
                    Fragment::text("a"),
                    Fragment::image("cat.png"),
                    Fragment::text(""),
                ]),
            ),
            (2, Note::new(vec![Fragment::text("first")])),
        ])
    }

    #[test]
    fn test_renders_one_tagged_node_per_fragment_in_id_order() {
        let mut surface = MemorySurface::new();
        let mut renderer = SurfaceRenderer::new();

        renderer.render(&mut surface, &collection(), &EditorConfig::default());

        assert_eq!(surface.note_order(), vec![2, 4]);
        let container = surface.fragment_nodes(4).unwrap();
        assert_eq!(container.identity, Some(4));
        assert_eq!(container.children.len(), 3);

        match surface.node(container.children[1]) {
            Some(SurfaceNode::Element { tag, content, .. }) => {
                assert_eq!(
                    tag,
                    Some(FragmentTag {
                        note_id: 4,
                        fragment_index: 1
                    })
                );
                assert_eq!(
                    content,
                    NodeContent::Image {
                        src: "images/cat.png".to_string()
                    }
                );
            }
            other => panic!("expected image element, got {:?}", other),
        }
    }

    #[test]
    fn test_only_text_nodes_are_bound() {
        let mut surface = MemorySurface::new();
        let mut renderer = SurfaceRenderer::new();

        renderer.render(&mut surface, &collection(), &EditorConfig::default());

        let image = surface.fragment_node(4, 1).unwrap();
        let text = surface.fragment_node(4, 0).unwrap();
        assert_eq!(surface.listener_count(image, Listener::Input), 0);
        assert_eq!(surface.listener_count(text, Listener::Input), 1);
        assert_eq!(surface.listener_count(text, Listener::KeyDown), 1);
        assert_eq!(renderer.bound().len(), 3);
    }

    #[test]
    fn test_rerender_detaches_stale_listeners_and_never_double_binds() {
        let mut surface = MemorySurface::new();
        let mut renderer = SurfaceRenderer::new();
        let notes = collection();
        let config = EditorConfig::default();

        renderer.render(&mut surface, &notes, &config);
        let stale = surface.fragment_node(2, 0).unwrap();

        renderer.render(&mut surface, &notes, &config);
        renderer.render(&mut surface, &notes, &config);

        let fresh = surface.fragment_node(2, 0).unwrap();
        assert_eq!(surface.listener_count(stale, Listener::Input), 0);
        assert_eq!(surface.listener_count(fresh, Listener::Input), 1);
        assert_eq!(surface.listener_count(fresh, Listener::KeyDown), 1);
    }

    #[test]
    fn test_repeated_renders_do_not_accumulate_listener_entries() {
        let mut surface = MemorySurface::new();
        let mut renderer = SurfaceRenderer::new();
        let notes = collection();
        let config = EditorConfig::default();

        for _ in 0..10 {
            renderer.render(&mut surface, &notes, &config);
        }

        assert_eq!(surface.listened_nodes(), renderer.bound().len());
        assert_eq!(surface.listened_nodes(), 3);
    }
}
