//! # Note Store
//!
//! Contract of the remote store the editor persists into. Transport details
//! (HTTP routes, JSON bodies) live behind this trait; production code plugs
//! in a network client while tests use [`MemoryStore`].

mod memory;

pub use memory::{MemoryStore, StoreCall, StoreOp};

use async_trait::async_trait;
use notesync_model::{MutationError, NoteId, WireNote};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Note not found: {0}")]
    NoteNotFound(NoteId),

    #[error("Invalid image name: {0:?}")]
    InvalidImageName(String),

    #[error("Rejected mutation: {0}")]
    Mutation(#[from] MutationError),

    #[error("Stored note is unreadable: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Every stored note, in no particular order
    async fn fetch_notes(&self) -> Result<Vec<(NoteId, WireNote)>, StoreError>;

    async fn create_note(&self, note: WireNote) -> Result<NoteId, StoreError>;

    /// Replace the whole content of a note
    async fn update_note(&self, note_id: NoteId, note: WireNote) -> Result<(), StoreError>;

    async fn delete_note(&self, note_id: NoteId) -> Result<(), StoreError>;

    /// Splice an image into a text fragment at a character offset
    async fn insert_image_fragment(
        &self,
        note_id: NoteId,
        fragment_index: usize,
        char_offset: usize,
        image_ref: &str,
    ) -> Result<(), StoreError>;

    /// Remove one fragment, merging the text runs around it
    async fn delete_fragment(&self, note_id: NoteId, fragment_index: usize)
        -> Result<(), StoreError>;

    async fn list_stored_images(&self) -> Result<Vec<String>, StoreError>;

    async fn upload_image(&self, name: &str, bytes: Vec<u8>) -> Result<(), StoreError>;
}
