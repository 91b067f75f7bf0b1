//! # Note Collection
//!
//! Immutable snapshot of every note as last fetched from the store. A refresh
//! replaces the snapshot wholesale; nothing edits it in place.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{deserialize, ModelError, Note, NoteId, WireNote};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteCollection {
    /// Keyed by id so iteration is always in ascending `NoteId` order
    notes: BTreeMap<NoteId, Note>,
}

impl NoteCollection {
    pub fn new(notes: impl IntoIterator<Item = (NoteId, Note)>) -> Self {
        Self {
            notes: notes.into_iter().collect(),
        }
    }

    /// Build a snapshot from the store's unordered listing.
    ///
    /// A single malformed note fails the whole snapshot.
    pub fn from_wire(notes: Vec<(NoteId, WireNote)>) -> Result<Self, ModelError> {
        let notes = notes
            .iter()
            .map(|(id, wire)| deserialize(wire).map(|note| (*id, note)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self { notes })
    }

    pub fn get(&self, note_id: NoteId) -> Option<&Note> {
        self.notes.get(&note_id)
    }

    pub fn contains(&self, note_id: NoteId) -> bool {
        self.notes.contains_key(&note_id)
    }

    pub fn ids(&self) -> BTreeSet<NoteId> {
        self.notes.keys().copied().collect()
    }

    /// Notes in render order
    pub fn iter(&self) -> impl Iterator<Item = (NoteId, &Note)> {
        self.notes.iter().map(|(id, note)| (*id, note))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Logical caret location: which note, which fragment, which character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaretPosition {
    pub note_id: NoteId,
    pub fragment_index: usize,
    pub char_offset: usize,
}

impl CaretPosition {
    pub fn new(note_id: NoteId, fragment_index: usize, char_offset: usize) -> Self {
        Self {
            note_id,
            fragment_index,
            char_offset,
        }
    }
}
