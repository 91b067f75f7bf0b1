//! # Fragment Navigator
//!
//! Key-down handling on text fragments:
//!
//! - **Enter** embeds a literal newline in the current fragment instead of
//!   letting the surface insert its own line break, then puts the caret
//!   right after the newline.
//! - **ArrowUp** at offset 0 jumps to the end of the nearest earlier text
//!   fragment. An empty target is left alone.
//! - **ArrowDown** at the end of a fragment jumps to the start of the nearest
//!   later text fragment.
//!
//! Fragment kinds come from the note snapshot; texts and lengths are read
//! from the live surface.

use notesync_model::{char_len, split_text_at, CaretPosition, Note, NoteCollection};

use crate::caret::locate_element;
use crate::selection::{relocate, SelectionLatch};
use crate::surface::{element_text, fragment_node, Surface};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    ArrowUp,
    ArrowDown,
    Other(String),
}

impl Key {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Enter" => Key::Enter,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            other => Key::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not ours; the surface's default behaviour applies
    Ignored,

    /// Caret moved to another fragment
    Moved(CaretPosition),

    /// Fragment text was split around a newline; the note has changed
    Split(CaretPosition),
}

impl KeyOutcome {
    pub fn prevents_default(&self) -> bool {
        !matches!(self, KeyOutcome::Ignored)
    }
}

pub struct FragmentNavigator<'a, S: Surface + ?Sized> {
    surface: &'a mut S,
    notes: &'a NoteCollection,
    latch: &'a mut SelectionLatch,
}

impl<'a, S: Surface + ?Sized> FragmentNavigator<'a, S> {
    pub fn new(surface: &'a mut S, notes: &'a NoteCollection, latch: &'a mut SelectionLatch) -> Self {
        Self {
            surface,
            notes,
            latch,
        }
    }

    pub fn handle_key(&mut self, key: &Key) -> KeyOutcome {
        match key {
            Key::Enter => self.split_at_caret(),
            Key::ArrowUp => self.move_up(),
            Key::ArrowDown => self.move_down(),
            Key::Other(_) => KeyOutcome::Ignored,
        }
    }

    fn split_at_caret(&mut self) -> KeyOutcome {
        let Some(caret) = locate_element(&*self.surface) else {
            return KeyOutcome::Ignored;
        };
        let Some(text) = element_text(&*self.surface, caret.element) else {
            return KeyOutcome::Ignored;
        };

        let offset = caret.position.char_offset.min(char_len(&text));
        let (before, after) = split_text_at(&text, offset);
        let split = format!("{before}\n{after}");

        self.surface.set_text(caret.element, &split);
        relocate(self.surface, self.latch, caret.element, offset + 1);

        KeyOutcome::Split(CaretPosition {
            char_offset: offset + 1,
            ..caret.position
        })
    }

    fn move_up(&mut self) -> KeyOutcome {
        let Some(caret) = locate_element(&*self.surface) else {
            return KeyOutcome::Ignored;
        };
        if caret.position.char_offset != 0 {
            return KeyOutcome::Ignored;
        }
        let Some(note) = self.notes.get(caret.position.note_id) else {
            return KeyOutcome::Ignored;
        };

        let current = caret.position.fragment_index.min(note.len());
        let Some(target) = (0..current).rev().find(|i| is_text(note, *i)) else {
            return KeyOutcome::Ignored;
        };

        let Some((element, len)) = self.live_text(caret.position.note_id, target) else {
            return KeyOutcome::Ignored;
        };
        // Moving into an empty earlier fragment is deliberately a no-op
        if len == 0 {
            return KeyOutcome::Ignored;
        }

        self.relocate_to(element, CaretPosition::new(caret.position.note_id, target, len))
    }

    fn move_down(&mut self) -> KeyOutcome {
        let Some(caret) = locate_element(&*self.surface) else {
            return KeyOutcome::Ignored;
        };
        let Some(text) = element_text(&*self.surface, caret.element) else {
            return KeyOutcome::Ignored;
        };
        if caret.position.char_offset != char_len(&text) {
            return KeyOutcome::Ignored;
        }
        let Some(note) = self.notes.get(caret.position.note_id) else {
            return KeyOutcome::Ignored;
        };

        // Scan from the end back toward the caret; the last hit is the nearest
        let mut target = None;
        for i in (caret.position.fragment_index + 1..note.len()).rev() {
            if is_text(note, i) {
                target = Some(i);
            }
        }
        let Some(target) = target else {
            return KeyOutcome::Ignored;
        };

        let Some((element, _)) = self.live_text(caret.position.note_id, target) else {
            return KeyOutcome::Ignored;
        };

        self.relocate_to(element, CaretPosition::new(caret.position.note_id, target, 0))
    }

    fn live_text(
        &self,
        note_id: notesync_model::NoteId,
        fragment_index: usize,
    ) -> Option<(crate::surface::NodeRef, usize)> {
        let element = fragment_node(&*self.surface, note_id, fragment_index)?;
        let text = element_text(&*self.surface, element)?;
        Some((element, char_len(&text)))
    }

    fn relocate_to(&mut self, element: crate::surface::NodeRef, target: CaretPosition) -> KeyOutcome {
        match relocate(self.surface, self.latch, element, target.char_offset) {
            Some(_) => KeyOutcome::Moved(target),
            None => KeyOutcome::Ignored,
        }
    }
}

fn is_text(note: &Note, index: usize) -> bool {
    note.fragment(index).map(|f| f.is_text()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::renderer::SurfaceRenderer;
    use crate::surface::MemorySurface;
    use notesync_model::Fragment;

    struct Fixture {
        surface: MemorySurface,
        notes: NoteCollection,
        latch: SelectionLatch,
    }

    impl Fixture {
        fn new(fragments: Vec<Fragment>) -> Self {
            let notes = NoteCollection::new(vec![(1, Note::new(fragments))]);
            let mut surface = MemorySurface::new();
            SurfaceRenderer::new().render(&mut surface, &notes, &EditorConfig::default());

            Self {
                surface,
                notes,
                latch: SelectionLatch::default(),
            }
        }

        fn press(&mut self, key: Key) -> KeyOutcome {
            FragmentNavigator::new(&mut self.surface, &self.notes, &mut self.latch).handle_key(&key)
        }

        fn caret(&self) -> Option<CaretPosition> {
            crate::caret::locate(&self.surface)
        }
    }

    #[test]
    fn test_enter_splits_within_fragment() {
        let mut f = Fixture::new(vec![Fragment::text("ab")]);
        f.surface.place_caret(1, 0, 1);

        let outcome = f.press(Key::Enter);

        assert_eq!(outcome, KeyOutcome::Split(CaretPosition::new(1, 0, 2)));
        assert!(outcome.prevents_default());
        assert_eq!(f.surface.text_of(1, 0).as_deref(), Some("a\nb"));
        assert_eq!(f.caret(), Some(CaretPosition::new(1, 0, 2)));
        assert!(f.latch.is_armed());
    }

    #[test]
    fn test_enter_on_empty_fragment() {
        let mut f = Fixture::new(vec![Fragment::text("")]);
        f.surface.place_caret(1, 0, 0);

        let outcome = f.press(Key::Enter);

        assert_eq!(outcome, KeyOutcome::Split(CaretPosition::new(1, 0, 1)));
        assert_eq!(f.surface.text_of(1, 0).as_deref(), Some("\n"));
        assert_eq!(f.caret(), Some(CaretPosition::new(1, 0, 1)));
    }

    #[test]
    fn test_arrow_up_skips_images_to_end_of_earlier_text() {
        let mut f = Fixture::new(vec![
            Fragment::text("first"),
            Fragment::image("cat.png"),
            Fragment::text("second"),
        ]);
        f.surface.place_caret(1, 2, 0);

        let outcome = f.press(Key::ArrowUp);

        assert_eq!(outcome, KeyOutcome::Moved(CaretPosition::new(1, 0, 5)));
        assert_eq!(f.caret(), Some(CaretPosition::new(1, 0, 5)));
    }

    #[test]
    fn test_arrow_up_away_from_start_is_ignored() {
        let mut f = Fixture::new(vec![Fragment::text("a"), Fragment::text("bc")]);
        f.surface.place_caret(1, 1, 1);

        assert_eq!(f.press(Key::ArrowUp), KeyOutcome::Ignored);
        assert_eq!(f.caret(), Some(CaretPosition::new(1, 1, 1)));
    }

    #[test]
    fn test_arrow_up_into_empty_fragment_is_noop() {
        let mut f = Fixture::new(vec![Fragment::text(""), Fragment::text("x")]);
        f.surface.place_caret(1, 1, 0);

        assert_eq!(f.press(Key::ArrowUp), KeyOutcome::Ignored);
        assert_eq!(f.caret(), Some(CaretPosition::new(1, 1, 0)));
    }

    #[test]
    fn test_arrow_up_from_first_fragment_is_ignored() {
        let mut f = Fixture::new(vec![Fragment::text("x")]);
        f.surface.place_caret(1, 0, 0);

        assert_eq!(f.press(Key::ArrowUp), KeyOutcome::Ignored);
    }

    #[test]
    fn test_arrow_down_targets_nearest_later_text() {
        let mut f = Fixture::new(vec![
            Fragment::text("ab"),
            Fragment::image("cat.png"),
            Fragment::text("cd"),
            Fragment::text("ef"),
        ]);
        f.surface.place_caret(1, 0, 2);

        let outcome = f.press(Key::ArrowDown);

        assert_eq!(outcome, KeyOutcome::Moved(CaretPosition::new(1, 2, 0)));
        assert_eq!(f.caret(), Some(CaretPosition::new(1, 2, 0)));
    }

    #[test]
    fn test_arrow_down_into_empty_fragment_places_caret_on_element() {
        let mut f = Fixture::new(vec![
            Fragment::text("ab"),
            Fragment::image("cat.png"),
            Fragment::text(""),
        ]);
        f.surface.place_caret(1, 0, 2);

        assert_eq!(
            f.press(Key::ArrowDown),
            KeyOutcome::Moved(CaretPosition::new(1, 2, 0))
        );
        let element = f.surface.fragment_node(1, 2).unwrap();
        assert_eq!(f.surface.selection().map(|s| s.anchor), Some(element));
    }

    #[test]
    fn test_arrow_down_before_end_is_ignored() {
        let mut f = Fixture::new(vec![Fragment::text("ab"), Fragment::text("cd")]);
        f.surface.place_caret(1, 0, 1);

        assert_eq!(f.press(Key::ArrowDown), KeyOutcome::Ignored);
    }

    #[test]
    fn test_down_then_up_returns_to_origin() {
        let mut f = Fixture::new(vec![
            Fragment::text("hello"),
            Fragment::text("world"),
            Fragment::text("!"),
        ]);
        f.surface.place_caret(1, 0, 5);

        f.press(Key::ArrowDown);
        assert_eq!(f.caret(), Some(CaretPosition::new(1, 1, 0)));

        f.press(Key::ArrowUp);
        assert_eq!(f.caret(), Some(CaretPosition::new(1, 0, 5)));
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let mut f = Fixture::new(vec![Fragment::text("ab")]);
        f.surface.place_caret(1, 0, 1);

        assert_eq!(f.press(Key::from_name("a")), KeyOutcome::Ignored);
        assert_eq!(Key::from_name("Enter"), Key::Enter);
    }
}
