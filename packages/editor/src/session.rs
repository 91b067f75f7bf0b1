//! # Editor Session
//!
//! Owns everything the synchronization engine mutates: the surface, the note
//! snapshot, the change timers, the selection latch and the modal state. The
//! state sits behind one lock that is only ever held between suspension
//! points, so every synchronous step (caret lookup, navigation, timer
//! bookkeeping) runs to completion while store round trips interleave freely.
//!
//! Writes to one note are serialized through a per-note write gate. A flush
//! holds it while it reads the surface and writes; image insertion and
//! fragment deletion hold it from their flush until the refresh has
//! re-rendered the note, so no flush can read the surface in between.
//!
//! Clones share the same session.

use std::collections::HashMap;
use std::sync::Arc;

use notesync_model::{serialize, CaretPosition, Fragment, Note, NoteCollection, NoteId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as WriteGate;

use crate::caret::locate;
use crate::config::EditorConfig;
use crate::errors::EditorError;
use crate::flush::extract_fragments;
use crate::navigator::{FragmentNavigator, Key, KeyOutcome};
use crate::renderer::SurfaceRenderer;
use crate::scheduler::TickScheduler;
use crate::selection::SelectionLatch;
use crate::store::NoteStore;
use crate::surface::{NodeRef, Surface, SurfaceNode};
use crate::timers::{ChangeTimer, ChangeTimers};

/// Image picker / upload flow shown by the surrounding chrome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ModalState {
    #[default]
    Closed,

    /// Picking a stored image to insert into a note
    #[serde(rename_all = "camelCase")]
    ImagePicker { note_id: NoteId },

    ImageUpload,
}

pub(crate) struct EditorState<S> {
    surface: S,
    notes: NoteCollection,
    timers: ChangeTimers,
    renderer: SurfaceRenderer,
    latch: SelectionLatch,
    modal: ModalState,
    write_gates: HashMap<NoteId, Arc<WriteGate<()>>>,
    /// Last refresh started / last refresh whose snapshot was applied
    refresh_requested: u64,
    refresh_applied: u64,
}

pub(crate) struct SessionInner<S, T> {
    config: EditorConfig,
    store: T,
    state: Mutex<EditorState<S>>,
}

pub struct EditorSession<S, T> {
    pub(crate) inner: Arc<SessionInner<S, T>>,
}

impl<S, T> Clone for EditorSession<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, T> EditorSession<S, T>
where
    S: Surface + 'static,
    T: NoteStore + 'static,
{
    /// Session with an empty snapshot; call [`Self::request_refresh`] to load
    pub fn new(surface: S, store: T, config: EditorConfig) -> Self {
        let timers = ChangeTimers::new(config.max_ticks);

        Self {
            inner: Arc::new(SessionInner {
                config,
                store,
                state: Mutex::new(EditorState {
                    surface,
                    notes: NoteCollection::default(),
                    timers,
                    renderer: SurfaceRenderer::new(),
                    latch: SelectionLatch::default(),
                    modal: ModalState::default(),
                    write_gates: HashMap::new(),
                    refresh_requested: 0,
                    refresh_applied: 0,
                }),
            }),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &T {
        &self.inner.store
    }

    /// The note snapshot as of the last successful refresh
    pub fn snapshot(&self) -> NoteCollection {
        self.inner.state.lock().notes.clone()
    }

    /// Run `f` against the live surface
    pub fn with_surface<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.inner.state.lock().surface)
    }

    pub fn timer(&self, note_id: NoteId) -> Option<ChangeTimer> {
        self.inner.state.lock().timers.get(note_id)
    }

    pub fn timer_ids(&self) -> Vec<NoteId> {
        self.inner.state.lock().timers.ids().into_iter().collect()
    }

    pub fn modal_state(&self) -> ModalState {
        self.inner.state.lock().modal
    }

    pub fn set_modal_state(&self, modal: ModalState) {
        tracing::debug!(?modal, "modal state changed");
        self.inner.state.lock().modal = modal;
    }

    /// Owned tick scheduler for this session (not yet started)
    pub fn scheduler(&self) -> TickScheduler<S, T> {
        TickScheduler::new(self)
    }

    /// Re-fetch every note, replace the snapshot, reconcile timers, re-render.
    ///
    /// A malformed note fails the refresh and leaves the previous snapshot
    /// (and surface) untouched. When refreshes overlap, a listing older than
    /// the one already applied is discarded.
    pub async fn request_refresh(&self) -> Result<(), EditorError> {
        let generation = {
            let mut state = self.inner.state.lock();
            state.refresh_requested += 1;
            state.refresh_requested
        };

        let fetched = self.inner.store.fetch_notes().await?;

        let notes = match NoteCollection::from_wire(fetched) {
            Ok(notes) => notes,
            Err(e) => {
                tracing::warn!("Refresh rejected: {}", e);
                return Err(e.into());
            }
        };

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        if generation < state.refresh_applied {
            tracing::debug!(
                "Discarding refresh #{} (#{} already applied)",
                generation,
                state.refresh_applied
            );
            return Ok(());
        }
        state.refresh_applied = generation;

        state.notes = notes;
        state.timers.reconcile(&state.notes.ids());
        let notes = &state.notes;
        state.write_gates.retain(|id, _| notes.contains(*id));
        state
            .renderer
            .render(&mut state.surface, &state.notes, &self.inner.config);

        tracing::info!("Refreshed {} notes", state.notes.len());
        Ok(())
    }

    pub async fn add_note(&self) -> Result<NoteId, EditorError> {
        let note = Note::new(vec![Fragment::text(self.inner.config.new_note_text.as_str())]);

        let note_id = self
            .inner
            .store
            .create_note(serialize(&note))
            .await
            .map_err(EditorError::write_failed("create note"))?;

        tracing::info!("Created note {}", note_id);
        self.request_refresh().await?;
        Ok(note_id)
    }

    pub async fn delete_note(&self, note_id: NoteId) -> Result<(), EditorError> {
        self.inner
            .store
            .delete_note(note_id)
            .await
            .map_err(EditorError::write_failed("delete note"))?;

        tracing::info!("Deleted note {}", note_id);
        self.request_refresh().await
    }

    /// Input event on a surface node: arm that note's debounce
    pub fn handle_input(&self, node: NodeRef) -> Option<NoteId> {
        let mut state = self.inner.state.lock();

        let element = match state.surface.node(node)? {
            SurfaceNode::Text { parent, .. } => parent?,
            SurfaceNode::Element { .. } => node,
        };
        let SurfaceNode::Element { tag: Some(tag), .. } = state.surface.node(element)? else {
            return None;
        };

        state
            .timers
            .reset_on_edit(tag.note_id)
            .then_some(tag.note_id)
    }

    /// Key-down on a text fragment. A split edits the note, so it arms the
    /// debounce like any other input.
    pub fn handle_key_down(&self, key: &Key) -> KeyOutcome {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        let outcome =
            FragmentNavigator::new(&mut state.surface, &state.notes, &mut state.latch).handle_key(key);

        if let KeyOutcome::Split(caret) = outcome {
            state.timers.reset_on_edit(caret.note_id);
        }

        tracing::debug!(?key, ?outcome, "key down");
        outcome
    }

    /// Selection-change event: re-assert the last relocation once.
    /// Returns whether a placement was re-asserted.
    pub fn handle_selection_change(&self) -> bool {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        match state.latch.on_selection_change() {
            Some(selection) => {
                state.surface.set_selection(selection);
                true
            }
            None => false,
        }
    }

    pub fn locate_caret(&self) -> Option<CaretPosition> {
        locate(&self.inner.state.lock().surface)
    }

    /// One debounce tick: advance timers and flush every note that just
    /// became due. Returns the notes that were due.
    pub async fn tick(&self) -> Vec<NoteId> {
        let due = self.inner.state.lock().timers.tick();

        for note_id in &due {
            match self.flush(*note_id).await {
                Ok(()) => {}
                Err(e) if e.is_benign() => tracing::debug!("{}", e),
                Err(e) => tracing::warn!("Debounced flush of note {} failed: {}", note_id, e),
            }
        }

        due
    }

    /// Persist what the surface currently shows for a note.
    ///
    /// Waits for any write already in progress on the note, so a timer-driven
    /// flush and an out-of-band flush never overlap. Reading the surface
    /// settles the note's timer: the edits it was waiting for are in this
    /// write.
    pub async fn flush(&self, note_id: NoteId) -> Result<(), EditorError> {
        let gate = self.write_gate(note_id);
        let _writing = gate.lock().await;

        self.flush_gated(note_id).await
    }

    fn write_gate(&self, note_id: NoteId) -> Arc<WriteGate<()>> {
        let mut state = self.inner.state.lock();
        Arc::clone(state.write_gates.entry(note_id).or_default())
    }

    /// Flush body; the caller holds the note's write gate
    async fn flush_gated(&self, note_id: NoteId) -> Result<(), EditorError> {
        let fragments = {
            let mut state = self.inner.state.lock();
            state.timers.settle(note_id);
            extract_fragments(&state.surface, note_id, &self.inner.config)
        };

        let Some(fragments) = fragments else {
            return Err(EditorError::FlushSkipped(note_id));
        };

        let note = Note::new(fragments);
        self.inner
            .store
            .update_note(note_id, serialize(&note))
            .await
            .map_err(EditorError::write_failed("flush"))?;

        tracing::debug!("Flushed note {} ({} fragments)", note_id, note.len());
        Ok(())
    }

    /// Flush every note with an armed timer. Every note is attempted; the
    /// first failure is returned afterwards.
    pub async fn flush_all_pending(&self) -> Result<usize, EditorError> {
        let pending = self.inner.state.lock().timers.armed();

        let mut flushed = 0;
        let mut failure = None;

        for note_id in pending {
            match self.flush(note_id).await {
                Ok(()) => flushed += 1,
                Err(e) if e.is_benign() => tracing::debug!("{}", e),
                Err(e) => {
                    tracing::warn!("Flush of note {} failed: {}", note_id, e);
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(flushed),
        }
    }

    /// Insert a stored image at the caret.
    ///
    /// The caret is captured before anything changes, the note is flushed,
    /// and only once that write has landed is the store asked to splice the
    /// image in. A refresh then re-renders the note and closes the modal.
    /// The note's write gate is held throughout, so a debounced flush cannot
    /// write pre-splice surface content over the spliced note.
    pub async fn insert_image_at_caret(&self, image_ref: &str) -> Result<CaretPosition, EditorError> {
        let caret = self.locate_caret().ok_or(EditorError::CaretUnresolved)?;

        let gate = self.write_gate(caret.note_id);
        let _writing = gate.lock().await;

        self.flush_gated(caret.note_id).await?;

        self.inner
            .store
            .insert_image_fragment(
                caret.note_id,
                caret.fragment_index,
                caret.char_offset,
                image_ref,
            )
            .await
            .map_err(EditorError::write_failed("insert image"))?;

        tracing::info!(
            "Inserted image {} into note {} at {}:{}",
            image_ref,
            caret.note_id,
            caret.fragment_index,
            caret.char_offset
        );

        self.set_modal_state(ModalState::Closed);
        self.request_refresh().await?;
        Ok(caret)
    }

    /// Delete the fragment the caret is in
    pub async fn delete_fragment_at_caret(&self) -> Result<CaretPosition, EditorError> {
        let caret = self.locate_caret().ok_or(EditorError::CaretUnresolved)?;
        self.delete_fragment(caret.note_id, caret.fragment_index)
            .await?;
        Ok(caret)
    }

    /// Delete one fragment, flushing pending edits to the note first
    pub async fn delete_fragment(
        &self,
        note_id: NoteId,
        fragment_index: usize,
    ) -> Result<(), EditorError> {
        let gate = self.write_gate(note_id);
        let _writing = gate.lock().await;

        self.flush_gated(note_id).await?;

        self.inner
            .store
            .delete_fragment(note_id, fragment_index)
            .await
            .map_err(EditorError::write_failed("delete fragment"))?;

        tracing::info!("Deleted fragment {} of note {}", fragment_index, note_id);
        self.request_refresh().await
    }

    pub async fn list_images(&self) -> Result<Vec<String>, EditorError> {
        Ok(self.inner.store.list_stored_images().await?)
    }

    pub async fn upload_image(&self, name: &str, bytes: Vec<u8>) -> Result<(), EditorError> {
        self.inner
            .store
            .upload_image(name, bytes)
            .await
            .map_err(EditorError::write_failed("upload image"))?;

        tracing::info!("Uploaded image {}", name);
        Ok(())
    }
}
