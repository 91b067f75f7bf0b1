//! # Flush Coordinator (surface side)
//!
//! Rebuilds a note's fragment list from what is currently on the surface.
//! The write itself happens in [`crate::EditorSession::flush`].

use notesync_model::{Fragment, NoteId};

use crate::config::EditorConfig;
use crate::surface::{NodeContent, Surface, SurfaceNode};

/// Walk a note's container in document order and rebuild its fragments.
///
/// Returns `None` when the container is gone or no longer carries the note's
/// identity tag; there is nothing trustworthy to persist in that case.
pub fn extract_fragments<S: Surface + ?Sized>(
    surface: &S,
    note_id: NoteId,
    config: &EditorConfig,
) -> Option<Vec<Fragment>> {
    let container = surface.fragment_nodes(note_id)?;
    if container.identity != Some(note_id) {
        return None;
    }

    let fragments = container
        .children
        .iter()
        .filter_map(|child| match surface.node(*child)? {
            SurfaceNode::Element {
                content: NodeContent::Text(text),
                ..
            } => Some(Fragment::Text(text)),
            SurfaceNode::Element {
                content: NodeContent::Image { src },
                ..
            } => Some(Fragment::image(config.image_ref(&src))),
            // Stray text typed straight into the container
            SurfaceNode::Text { text, .. } => Some(Fragment::Text(text)),
        })
        .collect();

    Some(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::SurfaceRenderer;
    use crate::surface::MemorySurface;
    use notesync_model::{Note, NoteCollection};

    fn rendered(fragments: Vec<Fragment>) -> MemorySurface {
        let notes = NoteCollection::new(vec![(5, Note::new(fragments))]);
        let mut surface = MemorySurface::new();
        SurfaceRenderer::new().render(&mut surface, &notes, &EditorConfig::default());
        surface
    }

    #[test]
    fn test_reconstructs_text_and_images_in_order() {
        let fragments = vec![
            Fragment::text("before"),
            Fragment::image("cat.png"),
            Fragment::text(""),
        ];
        let surface = rendered(fragments.clone());

        assert_eq!(
            extract_fragments(&surface, 5, &EditorConfig::default()),
            Some(fragments)
        );
    }

    #[test]
    fn test_picks_up_live_edits() {
        let mut surface = rendered(vec![Fragment::text("hel")]);
        surface.place_caret(5, 0, 3);
        surface.type_at_caret("lo");

        assert_eq!(
            extract_fragments(&surface, 5, &EditorConfig::default()),
            Some(vec![Fragment::text("hello")])
        );
    }

    #[test]
    fn test_raw_text_children_become_text_fragments() {
        let mut surface = rendered(vec![Fragment::text("a")]);
        surface.append_raw_text(5, "typed");

        assert_eq!(
            extract_fragments(&surface, 5, &EditorConfig::default()),
            Some(vec![Fragment::text("a"), Fragment::text("typed")])
        );
    }

    #[test]
    fn test_missing_or_untagged_container_yields_nothing() {
        let mut surface = rendered(vec![Fragment::text("a")]);
        let config = EditorConfig::default();

        assert_eq!(extract_fragments(&surface, 6, &config), None);

        surface.clear_identity(5);
        assert_eq!(extract_fragments(&surface, 5, &config), None);
    }
}
