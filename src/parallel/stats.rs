use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts gathered by a single task before they are merged.
///
/// Built without any synchronization since one task owns one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileTally {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// 1-based line numbers of invalid strands, in file order
    pub invalid_lines: Vec<usize>,
}

impl FileTally {
    pub fn record_valid(&mut self) {
        self.total += 1;
        self.valid += 1;
    }

    pub fn record_invalid(&mut self, line_number: usize) {
        self.total += 1;
        self.invalid += 1;
        self.invalid_lines.push(line_number);
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Strand counters shared by every task of a run.
///
/// Counters are lock-free atomics. The invalid line collection sits behind a
/// mutex so that appends from different tasks never interleave. [`absorb`]
/// and [`snapshot`] both hold that mutex, so a snapshot never sees half of a
/// merged tally even while stragglers are still finishing.
///
/// [`absorb`]: AggregateStats::absorb
/// [`snapshot`]: AggregateStats::snapshot
#[derive(Debug, Default)]
pub struct AggregateStats {
    total: AtomicUsize,
    valid: AtomicUsize,
    invalid: AtomicUsize,
    invalid_lines: Mutex<Vec<usize>>,
}

/// Point-in-time copy of [`AggregateStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub invalid_lines: Vec<usize>,
}

impl AggregateStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_total(&self, count: usize) {
        self.total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_valid(&self, count: usize) {
        self.valid.fetch_add(count, Ordering::Relaxed);
    }

    /// Append invalid line numbers and bump the invalid counter by the same amount.
    pub fn record_invalid(&self, line_numbers: &[usize]) {
        if line_numbers.is_empty() {
            return;
        }
        let mut lines = self.lock_lines();
        lines.extend_from_slice(line_numbers);
        self.invalid.fetch_add(line_numbers.len(), Ordering::Relaxed);
    }

    /// Fold one task's tally into the shared counters as a single update.
    pub fn absorb(&self, tally: &FileTally) {
        let mut lines = self.lock_lines();
        lines.extend_from_slice(&tally.invalid_lines);
        self.invalid.fetch_add(tally.invalid_lines.len(), Ordering::Relaxed);
        self.valid.fetch_add(tally.valid, Ordering::Relaxed);
        self.total.fetch_add(tally.total, Ordering::Relaxed);
    }

    /// Read the counters.
    ///
    /// Tallies merged with [`AggregateStats::absorb`] are seen whole or not at
    /// all. Bare `record_*` calls made concurrently may be seen partially.
    pub fn snapshot(&self) -> StatsSnapshot {
        let lines = self.lock_lines();
        StatsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            valid: self.valid.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            invalid_lines: lines.clone(),
        }
    }

    fn lock_lines(&self) -> MutexGuard<'_, Vec<usize>> {
        self.invalid_lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StatsSnapshot {
    /// `total == valid + invalid` and one line number per invalid strand
    pub fn is_consistent(&self) -> bool {
        self.total == self.valid + self.invalid && self.invalid_lines.len() == self.invalid
    }
}
