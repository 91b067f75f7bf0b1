//! # Change Timer Registry
//!
//! Per-note debounce state. An edit arms a note's timer; every tick advances
//! armed timers; the tick on which a timer reaches `max_ticks` makes the note
//! due for a flush. The timer then idles at `max_ticks` until the next edit,
//! so a burst of typing becomes a single write.
//!
//! The registry is mutated in place by `reconcile`, `reset_on_edit` and
//! `tick`; it is never swapped for a new map.

use std::collections::{BTreeMap, BTreeSet};

use notesync_model::NoteId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeTimer {
    pub max_ticks: u32,
    pub ticks_since_edit: u32,
}

impl ChangeTimer {
    /// Timer with nothing pending
    pub fn idle(max_ticks: u32) -> Self {
        Self {
            max_ticks,
            ticks_since_edit: max_ticks,
        }
    }

    /// Whether an edit is waiting for its flush
    pub fn is_armed(&self) -> bool {
        self.ticks_since_edit < self.max_ticks
    }
}

#[derive(Debug, Clone)]
pub struct ChangeTimers {
    max_ticks: u32,
    timers: BTreeMap<NoteId, ChangeTimer>,
}

impl ChangeTimers {
    /// A zero `max_ticks` would never fire, so it is raised to one
    pub fn new(max_ticks: u32) -> Self {
        Self {
            max_ticks: max_ticks.max(1),
            timers: BTreeMap::new(),
        }
    }

    /// Add idle timers for new notes and drop timers of vanished ones
    pub fn reconcile(&mut self, current: &BTreeSet<NoteId>) {
        let max_ticks = self.max_ticks;
        self.timers.retain(|id, _| current.contains(id));

        for id in current {
            self.timers
                .entry(*id)
                .or_insert_with(|| ChangeTimer::idle(max_ticks));
        }
    }

    /// Arm the debounce for a note. Returns `false` if the note has no timer.
    pub fn reset_on_edit(&mut self, note_id: NoteId) -> bool {
        match self.timers.get_mut(&note_id) {
            Some(timer) => {
                timer.ticks_since_edit = 0;
                true
            }
            None => false,
        }
    }

    /// Advance every armed timer; returns the notes that just became due
    pub fn tick(&mut self) -> Vec<NoteId> {
        let mut due = Vec::new();

        for (id, timer) in self.timers.iter_mut() {
            if timer.ticks_since_edit >= timer.max_ticks {
                continue;
            }

            timer.ticks_since_edit += 1;
            if timer.ticks_since_edit == timer.max_ticks {
                due.push(*id);
            }
        }

        due
    }

    /// Return a timer to idle without waiting for it to run out
    pub fn settle(&mut self, note_id: NoteId) {
        if let Some(timer) = self.timers.get_mut(&note_id) {
            timer.ticks_since_edit = timer.max_ticks;
        }
    }

    pub fn armed(&self) -> Vec<NoteId> {
        self.timers
            .iter()
            .filter(|(_, timer)| timer.is_armed())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn get(&self, note_id: NoteId) -> Option<ChangeTimer> {
        self.timers.get(&note_id).copied()
    }

    pub fn ids(&self) -> BTreeSet<NoteId> {
        self.timers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
