//! # Tick Scheduler
//!
//! Explicitly owned driver for the debounce ticks. It only holds a weak
//! reference to its session: once the session is gone the loop ends on its
//! next tick, and stopping or dropping the scheduler aborts it immediately.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::session::{EditorSession, SessionInner};
use crate::store::NoteStore;
use crate::surface::Surface;

pub struct TickScheduler<S, T> {
    session: Weak<SessionInner<S, T>>,
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl<S, T> TickScheduler<S, T>
where
    S: Surface + 'static,
    T: NoteStore + 'static,
{
    pub fn new(session: &EditorSession<S, T>) -> Self {
        Self {
            session: std::sync::Arc::downgrade(&session.inner),
            // tokio intervals reject a zero period
            period: session.config().tick_period().max(Duration::from_millis(1)),
            handle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start ticking; the first tick fires one period from now.
    /// Starting a running scheduler does nothing.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let session = self.session.clone();
        let period = self.period;

        self.handle = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let Some(inner) = session.upgrade() else {
                    tracing::debug!("Session dropped, tick scheduler exiting");
                    break;
                };

                // Flushes run on their own task so a stalled write never
                // holds up the next tick
                let session = EditorSession { inner };
                tokio::spawn(async move {
                    session.tick().await;
                });
            }
        }));

        tracing::debug!("Tick scheduler started ({:?} period)", period);
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Tick scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl<S, T> Drop for TickScheduler<S, T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::store::{MemoryStore, StoreOp};
    use crate::surface::MemorySurface;
    use notesync_model::{Fragment, Note};

    async fn edited_session() -> EditorSession<MemorySurface, MemoryStore> {
        let session = EditorSession::new(
            MemorySurface::new(),
            MemoryStore::with_notes(vec![Note::new(vec![Fragment::text("a")])]),
            EditorConfig::default(),
        );
        session.request_refresh().await.unwrap();
        session.store().clear_calls();

        let node = session
            .with_surface(|s| {
                s.place_caret(1, 0, 1);
                s.type_at_caret("b")
            })
            .unwrap();
        session.handle_input(node);
        session
    }

    fn updates(session: &EditorSession<MemorySurface, MemoryStore>) -> usize {
        session
            .store()
            .ops()
            .into_iter()
            .filter(|op| *op == StoreOp::UpdateNote)
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_flushes_after_max_ticks() {
        let session = edited_session().await;
        let mut scheduler = session.scheduler();
        scheduler.start();
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;
        assert_eq!(updates(&session), 0);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        tokio::task::yield_now().await;
        assert_eq!(updates(&session), 1);

        tokio::time::sleep(Duration::from_millis(5000)).await;
        tokio::task::yield_now().await;
        assert_eq!(updates(&session), 1);
        assert_eq!(
            session.store().note(1).unwrap().fragments,
            vec![Fragment::text("ab")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_scheduler_never_flushes() {
        let session = edited_session().await;
        let mut scheduler = session.scheduler();
        scheduler.start();
        scheduler.stop();
        assert!(!scheduler.is_running());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(updates(&session), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_exits_when_session_is_dropped() {
        let session = edited_session().await;
        let mut scheduler = session.scheduler();
        scheduler.start();

        drop(session);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;

        assert!(!scheduler.is_running());
    }
}
