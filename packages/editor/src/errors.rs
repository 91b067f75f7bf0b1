//! Error types for the editor

use notesync_model::{ModelError, NoteId};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Malformed note data: {0}")]
    Model(#[from] ModelError),

    #[error("No caret position on the surface")]
    CaretUnresolved,

    #[error("Flush skipped: note {0} has no tagged surface node")]
    FlushSkipped(NoteId),

    #[error("Remote write failed during {operation}: {source}")]
    RemoteWriteFailed {
        operation: &'static str,
        source: StoreError,
    },

    #[error("Remote read failed: {0}")]
    Store(#[from] StoreError),
}

impl EditorError {
    /// Missing preconditions that callers treat as a no-op
    pub fn is_benign(&self) -> bool {
        matches!(self, EditorError::CaretUnresolved | EditorError::FlushSkipped(_))
    }

    pub(crate) fn write_failed(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| EditorError::RemoteWriteFailed { operation, source }
    }
}
