//! In-memory note store with call recording and failure injection

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use notesync_model::{deserialize, serialize, Note, NoteId, NoteMutation, WireNote};
use parking_lot::Mutex;

use super::{NoteStore, StoreError};

/// Store operation, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FetchNotes,
    CreateNote,
    UpdateNote,
    DeleteNote,
    InsertImageFragment,
    DeleteFragment,
    ListStoredImages,
    UploadImage,
}

/// One recorded call, in the order the store received it
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    FetchNotes,
    CreateNote(WireNote),
    UpdateNote {
        note_id: NoteId,
        note: WireNote,
    },
    DeleteNote(NoteId),
    InsertImageFragment {
        note_id: NoteId,
        fragment_index: usize,
        char_offset: usize,
        image_ref: String,
    },
    DeleteFragment {
        note_id: NoteId,
        fragment_index: usize,
    },
    ListStoredImages,
    UploadImage(String),
}

impl StoreCall {
    pub fn op(&self) -> StoreOp {
        match self {
            StoreCall::FetchNotes => StoreOp::FetchNotes,
            StoreCall::CreateNote(_) => StoreOp::CreateNote,
            StoreCall::UpdateNote { .. } => StoreOp::UpdateNote,
            StoreCall::DeleteNote(_) => StoreOp::DeleteNote,
            StoreCall::InsertImageFragment { .. } => StoreOp::InsertImageFragment,
            StoreCall::DeleteFragment { .. } => StoreOp::DeleteFragment,
            StoreCall::ListStoredImages => StoreOp::ListStoredImages,
            StoreCall::UploadImage(_) => StoreOp::UploadImage,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    last_id: NoteId,
    notes: BTreeMap<NoteId, WireNote>,
    images: BTreeMap<String, Vec<u8>>,
    calls: Vec<StoreCall>,
    failures: HashSet<StoreOp>,
    write_delay: Option<Duration>,
    fetch_delay: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `notes`, assigned ids 1, 2, ...
    pub fn with_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            for note in notes {
                state.last_id += 1;
                let id = state.last_id;
                state.notes.insert(id, serialize(&note));
            }
        }
        store
    }

    /// Put a raw wire note in place, bypassing validation
    pub fn insert_raw(&self, note_id: NoteId, note: WireNote) {
        let mut state = self.state.lock();
        state.last_id = state.last_id.max(note_id);
        state.notes.insert(note_id, note);
    }

    pub fn note(&self, note_id: NoteId) -> Option<Note> {
        let state = self.state.lock();
        state.notes.get(&note_id).and_then(|wire| deserialize(wire).ok())
    }

    pub fn note_ids(&self) -> Vec<NoteId> {
        self.state.lock().notes.keys().copied().collect()
    }

    pub fn image(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().images.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().calls.clone()
    }

    /// Recorded operations, without their payloads
    pub fn ops(&self) -> Vec<StoreOp> {
        self.state.lock().calls.iter().map(StoreCall::op).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Make the next call of `op` fail with [`StoreError::Unavailable`]
    pub fn fail_next(&self, op: StoreOp) {
        self.state.lock().failures.insert(op);
    }

    /// Delay applied to every `update_note` before it lands
    pub fn set_write_delay(&self, delay: Duration) {
        self.state.lock().write_delay = Some(delay);
    }

    /// Hold the next `fetch_notes` response for `delay` after it has been read
    pub fn delay_next_fetch(&self, delay: Duration) {
        self.state.lock().fetch_delay = Some(delay);
    }

    /// Record the call and consume any injected failure for it
    fn begin(&self, call: StoreCall) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let op = call.op();
        state.calls.push(call);

        if state.failures.remove(&op) {
            return Err(StoreError::Unavailable(format!("{:?} failed", op)));
        }
        Ok(())
    }

    fn mutate(&self, note_id: NoteId, mutation: NoteMutation) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let wire = state
            .notes
            .get(&note_id)
            .ok_or(StoreError::NoteNotFound(note_id))?;

        let mut note = deserialize(wire).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        mutation.apply(&mut note)?;

        state.notes.insert(note_id, serialize(&note));
        Ok(())
    }
}

fn validate_image_name(name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');

    if invalid {
        Err(StoreError::InvalidImageName(name.to_string()))
    } else {
        Ok(())
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn fetch_notes(&self) -> Result<Vec<(NoteId, WireNote)>, StoreError> {
        self.begin(StoreCall::FetchNotes)?;

        let (notes, delay) = {
            let mut state = self.state.lock();
            // Newest first, so callers cannot rely on store order
            let notes: Vec<_> = state
                .notes
                .iter()
                .rev()
                .map(|(id, note)| (*id, note.clone()))
                .collect();
            (notes, state.fetch_delay.take())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(notes)
    }

    async fn create_note(&self, note: WireNote) -> Result<NoteId, StoreError> {
        self.begin(StoreCall::CreateNote(note.clone()))?;

        let mut state = self.state.lock();
        state.last_id += 1;
        let id = state.last_id;
        state.notes.insert(id, note);
        Ok(id)
    }

    async fn update_note(&self, note_id: NoteId, note: WireNote) -> Result<(), StoreError> {
        self.begin(StoreCall::UpdateNote {
            note_id,
            note: note.clone(),
        })?;

        let delay = self.state.lock().write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        match state.notes.get_mut(&note_id) {
            Some(stored) => {
                *stored = note;
                Ok(())
            }
            None => Err(StoreError::NoteNotFound(note_id)),
        }
    }

    async fn delete_note(&self, note_id: NoteId) -> Result<(), StoreError> {
        self.begin(StoreCall::DeleteNote(note_id))?;

        let mut state = self.state.lock();
        state
            .notes
            .remove(&note_id)
            .map(|_| ())
            .ok_or(StoreError::NoteNotFound(note_id))
    }

    async fn insert_image_fragment(
        &self,
        note_id: NoteId,
        fragment_index: usize,
        char_offset: usize,
        image_ref: &str,
    ) -> Result<(), StoreError> {
        self.begin(StoreCall::InsertImageFragment {
            note_id,
            fragment_index,
            char_offset,
            image_ref: image_ref.to_string(),
        })?;

        self.mutate(
            note_id,
            NoteMutation::InsertImage {
                fragment_index,
                char_offset,
                image_ref: image_ref.to_string(),
            },
        )
    }

    async fn delete_fragment(
        &self,
        note_id: NoteId,
        fragment_index: usize,
    ) -> Result<(), StoreError> {
        self.begin(StoreCall::DeleteFragment {
            note_id,
            fragment_index,
        })?;

        self.mutate(note_id, NoteMutation::RemoveFragment { fragment_index })
    }

    async fn list_stored_images(&self) -> Result<Vec<String>, StoreError> {
        self.begin(StoreCall::ListStoredImages)?;

        Ok(self.state.lock().images.keys().cloned().collect())
    }

    async fn upload_image(&self, name: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.begin(StoreCall::UploadImage(name.to_string()))?;
        validate_image_name(name)?;

        self.state.lock().images.insert(name.to_string(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notesync_model::Fragment;

    #[tokio::test]
    async fn test_ids_are_assigned_in_order() {
        let store = MemoryStore::new();

        let first = store
            .create_note(serialize(&Note::new(vec![Fragment::text("a")])))
            .await
            .unwrap();
        let second = store
            .create_note(serialize(&Note::new(vec![Fragment::text("b")])))
            .await
            .unwrap();

        assert_eq!((first, second), (1, 2));
    }

    #[tokio::test]
    async fn test_insert_image_splices_stored_note() {
        let store = MemoryStore::with_notes(vec![Note::new(vec![Fragment::text("hello")])]);

        store.insert_image_fragment(1, 0, 3, "cat.png").await.unwrap();

        assert_eq!(
            store.note(1).unwrap().fragments,
            vec![
                Fragment::text("hel"),
                Fragment::image("cat.png"),
                Fragment::text("lo"),
            ]
        );
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let store = MemoryStore::with_notes(vec![Note::new(vec![])]);
        store.fail_next(StoreOp::DeleteNote);

        assert!(matches!(
            store.delete_note(1).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.delete_note(1).await.is_ok());
        assert_eq!(store.ops(), vec![StoreOp::DeleteNote, StoreOp::DeleteNote]);
    }

    #[tokio::test]
    async fn test_upload_rejects_path_like_names() {
        let store = MemoryStore::new();

        for name in ["", "..", "../etc/passwd", "a\\b.png"] {
            assert_eq!(
                store.upload_image(name, vec![1]).await,
                Err(StoreError::InvalidImageName(name.to_string()))
            );
        }

        store.upload_image("ok.png", vec![1, 2]).await.unwrap();
        assert_eq!(store.list_stored_images().await.unwrap(), vec!["ok.png"]);
        assert_eq!(store.image("ok.png"), Some(vec![1, 2]));
    }
}
