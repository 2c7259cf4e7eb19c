//! In-RAM history of recent runs.
//!
//! Keeps the last [`HISTORY_LEN`] runs.  The newest entry decides whether
//! the membrane still counts as rinsed (see [`RunHistory::membrane_rinsed`]).
//! Nothing here is persisted; a reboot starts with an empty history.

use heapless::Deque;

use crate::fsm::context::{FinishedRun, RunEnd, RunKind};

pub const HISTORY_LEN: usize = 10;

/// One finished run, timestamped on the service clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRecord {
    pub kind: RunKind,
    pub end: RunEnd,
    pub started_ms: u64,
    pub ended_ms: u64,
    pub filtered_secs: u32,
}

impl RunRecord {
    pub fn new(run: FinishedRun, started_ms: u64, ended_ms: u64) -> Self {
        Self {
            kind: run.kind,
            end: run.end,
            started_ms,
            ended_ms,
            filtered_secs: run.filtered_secs,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.ended_ms.saturating_sub(self.started_ms)
    }
}

#[derive(Debug, Default)]
pub struct RunHistory {
    runs: Deque<RunRecord, HISTORY_LEN>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self { runs: Deque::new() }
    }

    /// Append a run, evicting the oldest when full.
    pub fn record(&mut self, rec: RunRecord) {
        if self.runs.is_full() {
            self.runs.pop_front();
        }
        let pushed = self.runs.push_back(rec);
        debug_assert!(pushed.is_ok(), "history has a free slot after eviction");
    }

    pub fn last(&self) -> Option<&RunRecord> {
        self.runs.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &RunRecord> {
        self.runs.iter()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// True if the newest run moved water and ended less than
    /// `window_secs` before `now_ms`.  Faulted runs never count.
    pub fn membrane_rinsed(&self, now_ms: u64, window_secs: u32) -> bool {
        self.last().is_some_and(|r| {
            r.end != RunEnd::Faulted
                && now_ms.saturating_sub(r.ended_ms) < u64::from(window_secs) * 1000
        })
    }
}
