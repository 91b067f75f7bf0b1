//! # Notesync Model
//!
//! Data representation of rich notes: ordered fragment lists, the wire shape
//! the remote store speaks, and the note mutations the store applies.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ store: WireNote { content: [{Tag: ..}] }    │
//! └─────────────────────────────────────────────┘
//!                     ↕ serialize / deserialize
//! ┌─────────────────────────────────────────────┐
//! │ model: Note { fragments, last_modified }    │
//! │  - NoteCollection snapshot (sorted by id)   │
//! │  - CaretPosition (note, fragment, offset)   │
//! │  - NoteMutation (store-side splices)        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use notesync_model::{deserialize, serialize, Fragment, Note};
//!
//! let note = Note::new(vec![Fragment::text("hello"), Fragment::image("cat.png")]);
//! let wire = serialize(&note);
//! assert_eq!(deserialize(&wire).unwrap(), note);
//! ```

mod collection;
mod errors;
mod fragment;
mod mutations;
mod wire;

pub use collection::{CaretPosition, NoteCollection};
pub use errors::ModelError;
pub use fragment::{char_len, split_text_at, Fragment, Note, NoteId};
pub use mutations::{MutationError, NoteMutation};
pub use wire::{deserialize, serialize, WireFragment, WireNote, IMAGE_TAG, TEXT_TAG};
