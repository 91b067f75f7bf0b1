//! # Note Mutations
//!
//! Structural operations the remote store applies to a stored note.
//!
//! ## Mutation Semantics
//!
//! ### InsertImage
//! - Target must be a text fragment
//! - Text is split at the character offset
//! - Result is always `[before, Image, after]`, `after` may be empty
//!
//! ### RemoveFragment
//! - Removes one fragment
//! - If text now sits on both sides of the gap, the two runs are merged

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{char_len, split_text_at, Fragment, Note};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteMutation {
    /// Splice an image into a text fragment at a character offset
    InsertImage {
        fragment_index: usize,
        char_offset: usize,
        image_ref: String,
    },

    /// Remove one fragment, merging neighbouring text runs
    RemoveFragment { fragment_index: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Fragment {index} out of range (note has {len})")]
    FragmentOutOfRange { index: usize, len: usize },

    #[error("Offset {offset} out of range (fragment has {len} characters)")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("Fragment {0} is not text")]
    NotText(usize),
}

impl NoteMutation {
    /// Apply mutation to a note with validation
    pub fn apply(&self, note: &mut Note) -> Result<(), MutationError> {
        self.validate(note)?;

        match self {
            NoteMutation::InsertImage {
                fragment_index,
                char_offset,
                image_ref,
            } => Self::apply_insert_image(note, *fragment_index, *char_offset, image_ref),

            NoteMutation::RemoveFragment { fragment_index } => {
                Self::apply_remove(note, *fragment_index);
                Ok(())
            }
        }
    }

    fn validate(&self, note: &Note) -> Result<(), MutationError> {
        match self {
            NoteMutation::InsertImage {
                fragment_index,
                char_offset,
                ..
            } => {
                let text = Self::fragment_at(note, *fragment_index)?
                    .as_text()
                    .ok_or(MutationError::NotText(*fragment_index))?;

                let len = char_len(text);
                if *char_offset > len {
                    return Err(MutationError::OffsetOutOfRange {
                        offset: *char_offset,
                        len,
                    });
                }
                Ok(())
            }

            NoteMutation::RemoveFragment { fragment_index } => {
                Self::fragment_at(note, *fragment_index).map(|_| ())
            }
        }
    }

    fn fragment_at(note: &Note, index: usize) -> Result<&Fragment, MutationError> {
        note.fragment(index)
            .ok_or(MutationError::FragmentOutOfRange {
                index,
                len: note.len(),
            })
    }

    fn apply_insert_image(
        note: &mut Note,
        index: usize,
        offset: usize,
        image_ref: &str,
    ) -> Result<(), MutationError> {
        let (before, after) = match &note.fragments[index] {
            Fragment::Text(text) => {
                let (before, after) = split_text_at(text, offset);
                (before.to_string(), after.to_string())
            }
            Fragment::Image(_) => return Err(MutationError::NotText(index)),
        };

        note.fragments[index] = Fragment::Text(before);
        note.fragments.insert(index + 1, Fragment::image(image_ref));
        note.fragments.insert(index + 2, Fragment::Text(after));
        Ok(())
    }

    fn apply_remove(note: &mut Note, index: usize) {
        note.fragments.remove(index);

        if index == 0 || index >= note.fragments.len() {
            return;
        }

        let merged = match (&note.fragments[index - 1], &note.fragments[index]) {
            (Fragment::Text(prev), Fragment::Text(next)) => format!("{prev}{next}"),
            _ => return,
        };

        note.fragments[index - 1] = Fragment::Text(merged);
        note.fragments.remove(index);
    }
}
