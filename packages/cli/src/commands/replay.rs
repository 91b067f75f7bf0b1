use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use notesync_editor::{
    EditorConfig, EditorError, EditorSession, Key, KeyOutcome, MemoryStore, MemorySurface, NoteId,
    NoteStore,
};
use notesync_model::WireNote;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

type Session = EditorSession<MemorySurface, MemoryStore>;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Script to replay (JSON)
    pub script: PathBuf,

    /// Drive debounce ticks with the real scheduler instead of stepping them
    #[arg(long)]
    pub live: bool,

    /// Print every store call after the final notes
    #[arg(long)]
    pub calls: bool,
}

/// Seed notes plus the editing steps to run against them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Stored before the first refresh, with ids 1, 2, ...
    #[serde(default)]
    pub notes: Vec<WireNote>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
    Refresh,
    AddNote,
    #[serde(rename_all = "camelCase")]
    DeleteNote {
        note_id: NoteId,
    },
    /// Place the caret, as a click would
    #[serde(rename_all = "camelCase")]
    Caret {
        note_id: NoteId,
        fragment_index: usize,
        char_offset: usize,
    },
    /// Type at the caret
    Type {
        text: String,
    },
    Key {
        key: String,
    },
    SelectionChange,
    Tick {
        #[serde(default = "one")]
        count: u32,
    },
    #[serde(rename_all = "camelCase")]
    InsertImage {
        image_ref: String,
    },
    /// Delete the given fragment, or the one under the caret
    #[serde(rename_all = "camelCase")]
    DeleteFragment {
        note_id: Option<NoteId>,
        fragment_index: Option<usize>,
    },
    Upload {
        name: String,
        #[serde(default)]
        bytes: Vec<u8>,
    },
}

fn one() -> u32 {
    1
}

pub async fn replay(args: ReplayArgs, cwd: &Path) -> Result<()> {
    let config = EditorConfig::load(cwd)?;

    let source = fs::read_to_string(&args.script)
        .with_context(|| format!("Cannot read script {}", args.script.display()))?;
    let script: Script = serde_json::from_str(&source)
        .with_context(|| format!("Invalid script {}", args.script.display()))?;

    eprintln!(
        "{}",
        format!("▶ Replaying {} steps...", script.steps.len())
            .bright_blue()
            .bold()
    );

    let session = run_script(&script, config, args.live).await?;

    let notes = stored_notes(session.store()).await?;
    println!("{}", serde_json::to_string_pretty(&notes)?);

    if args.calls {
        eprintln!();
        for call in session.store().calls() {
            eprintln!("  {:?}", call);
        }
    }

    Ok(())
}

/// Seed a store, run every step and flush whatever is still pending.
///
/// Failing steps are reported and the replay carries on, the way the editor
/// itself keeps running after a failed write.
pub async fn run_script(script: &Script, config: EditorConfig, live: bool) -> Result<Session> {
    let store = MemoryStore::new();
    for (index, note) in script.notes.iter().enumerate() {
        store.insert_raw(index as NoteId + 1, note.clone());
    }

    let session = EditorSession::new(MemorySurface::new(), store, config);
    session
        .request_refresh()
        .await
        .context("Seed notes could not be loaded")?;

    let mut scheduler = session.scheduler();
    if live {
        scheduler.start();
    }

    for (index, step) in script.steps.iter().enumerate() {
        match run_step(&session, step, live).await {
            Ok(summary) => eprintln!("  {} {:>3} {}", "✓".green(), index + 1, summary),
            Err(e) => eprintln!("  {} {:>3} {:?}: {}", "✗".red(), index + 1, step, e),
        }
    }

    scheduler.stop();

    let flushed = session.flush_all_pending().await?;
    if flushed > 0 {
        eprintln!("  {} flushed {} pending notes", "✓".green(), flushed);
    }

    Ok(session)
}

async fn run_step(session: &Session, step: &Step, live: bool) -> Result<String> {
    let summary = match step {
        Step::Refresh => {
            session.request_refresh().await?;
            "refresh".to_string()
        }
        Step::AddNote => format!("added note {}", session.add_note().await?),
        Step::DeleteNote { note_id } => {
            session.delete_note(*note_id).await?;
            format!("deleted note {}", note_id)
        }
        Step::Caret {
            note_id,
            fragment_index,
            char_offset,
        } => {
            let placed =
                session.with_surface(|s| s.place_caret(*note_id, *fragment_index, *char_offset));
            if !placed {
                return Err(anyhow!("no fragment {}:{}", note_id, fragment_index));
            }
            format!("caret at {}:{}:{}", note_id, fragment_index, char_offset)
        }
        Step::Type { text } => {
            let node = session
                .with_surface(|s| s.type_at_caret(text))
                .ok_or(EditorError::CaretUnresolved)?;
            session.handle_input(node);
            format!("typed {:?}", text)
        }
        Step::Key { key } => match session.handle_key_down(&Key::from_name(key)) {
            KeyOutcome::Ignored => format!("{} (default)", key),
            KeyOutcome::Moved(caret) | KeyOutcome::Split(caret) => format!(
                "{} -> {}:{}:{}",
                key, caret.note_id, caret.fragment_index, caret.char_offset
            ),
        },
        Step::SelectionChange => {
            if session.handle_selection_change() {
                "selection re-asserted".to_string()
            } else {
                "selection change".to_string()
            }
        }
        Step::Tick { count } => {
            if live {
                let period = session.config().tick_period() * *count;
                tokio::time::sleep(period).await;
                format!("waited {:?}", period)
            } else {
                let mut flushed = Vec::new();
                for _ in 0..*count {
                    flushed.extend(session.tick().await);
                }
                format!("{} ticks, due {:?}", count, flushed)
            }
        }
        Step::InsertImage { image_ref } => {
            let caret = session.insert_image_at_caret(image_ref).await?;
            format!(
                "inserted {} at {}:{}:{}",
                image_ref, caret.note_id, caret.fragment_index, caret.char_offset
            )
        }
        Step::DeleteFragment {
            note_id: Some(note_id),
            fragment_index: Some(fragment_index),
        } => {
            session.delete_fragment(*note_id, *fragment_index).await?;
            format!("deleted fragment {}:{}", note_id, fragment_index)
        }
        Step::DeleteFragment { .. } => {
            let caret = session.delete_fragment_at_caret().await?;
            format!(
                "deleted fragment {}:{}",
                caret.note_id, caret.fragment_index
            )
        }
        Step::Upload { name, bytes } => {
            session.upload_image(name, bytes.clone()).await?;
            format!("uploaded {} ({} bytes)", name, bytes.len())
        }
    };

    Ok(summary)
}

async fn stored_notes(store: &MemoryStore) -> Result<BTreeMap<NoteId, WireNote>> {
    Ok(store.fetch_notes().await?.into_iter().collect())
}
