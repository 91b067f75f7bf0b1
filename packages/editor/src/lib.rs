//! # Notesync Editor
//!
//! Synchronization engine between an editable note surface and the remote
//! note store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ store: NoteStore (fetch / update / splice)  │
//! └─────────────────────────────────────────────┘
//!              ↓ refresh          ↑ flush
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditorSession                       │
//! │  - NoteCollection snapshot + renderer       │
//! │  - Change timers driven by TickScheduler    │
//! │  - Caret locator + fragment navigator       │
//! │  - Flush-then-splice image insertion        │
//! └─────────────────────────────────────────────┘
//!              ↓ render           ↑ input / keys
//! ┌─────────────────────────────────────────────┐
//! │ surface: Surface (any UI toolkit)           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The surface holds unsaved content**: flushes read it back, the
//!    snapshot only reflects what the store last returned
//! 2. **Snapshots are replaced, never patched**: every refresh re-renders
//! 3. **Caret positions are never cached**: they are re-derived from the
//!    live selection whenever they are needed
//! 4. **Flush before splice**: store-side edits only run once pending
//!    surface edits have been written
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notesync_editor::{EditorConfig, EditorSession, MemoryStore, MemorySurface};
//!
//! let session = EditorSession::new(MemorySurface::new(), MemoryStore::new(), EditorConfig::default());
//! session.request_refresh().await?;
//!
//! let mut scheduler = session.scheduler();
//! scheduler.start();
//!
//! // route surface events into the session
//! session.handle_input(node);
//! session.handle_key_down(&Key::from_name("Enter"));
//!
//! session.insert_image_at_caret("cat.png").await?;
//! ```

mod caret;
mod config;
mod errors;
mod flush;
mod navigator;
mod renderer;
mod scheduler;
mod selection;
mod session;
mod store;
mod surface;
mod timers;

pub use caret::{locate, locate_element, LocatedCaret};
pub use config::{ConfigError, EditorConfig, DEFAULT_CONFIG_NAME};
pub use errors::EditorError;
pub use flush::extract_fragments;
pub use navigator::{FragmentNavigator, Key, KeyOutcome};
pub use renderer::SurfaceRenderer;
pub use scheduler::TickScheduler;
pub use selection::{relocate, SelectionLatch};
pub use session::{EditorSession, ModalState};
pub use store::{MemoryStore, NoteStore, StoreCall, StoreError, StoreOp};
pub use surface::{
    element_text, fragment_node, FragmentTag, Listener, MemorySurface, NodeContent, NodeRef,
    NodeSpec, NoteContainer, RenderedNote, Selection, Surface, SurfaceNode,
};
pub use timers::{ChangeTimer, ChangeTimers};

// Re-export model types for convenience
pub use notesync_model::{CaretPosition, Fragment, Note, NoteCollection, NoteId};
