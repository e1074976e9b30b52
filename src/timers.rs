//! One-shot timers driven by the event loop.

use std::time::Instant;

use crate::launcher::LaunchHandle;
use crate::pane::{PaneId, WindowRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer {
    /// Fires [`crate::constants::LAUNCH_TIMEOUT`] after a spawn; only acts if
    /// `launch` is still the pane's current attempt.
    LaunchTimeout { pane: PaneId, launch: LaunchHandle },
    /// Post-match geometry restore for `window`.
    SettleGeometry { pane: PaneId, window: WindowRef },
}

impl Timer {
    pub fn pane(&self) -> &PaneId {
        match self {
            Timer::LaunchTimeout { pane, .. } | Timer::SettleGeometry { pane, .. } => pane,
        }
    }
}

#[derive(Debug)]
struct Entry {
    deadline: Instant,
    seq: u64,
    timer: Timer,
}

/// Deadline-ordered queue; timers with equal deadlines fire in scheduling
/// order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: Instant, timer: Timer) {
        let seq = self.next_seq;
        self.next_seq = seq.wrapping_add(1);
        self.entries.push(Entry {
            deadline,
            seq,
            timer,
        });
    }

    /// Remove and return every timer whose deadline is at or before `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<Timer> {
        let (mut due, pending): (Vec<Entry>, Vec<Entry>) = self
            .entries
            .drain(..)
            .partition(|entry| entry.deadline <= now);
        self.entries = pending;
        due.sort_by_key(|entry| (entry.deadline, entry.seq));
        due.into_iter().map(|entry| entry.timer).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|entry| entry.deadline).min()
    }

    pub fn cancel_pane(&mut self, pane: &PaneId) {
        self.entries.retain(|entry| entry.timer.pane() != pane);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
