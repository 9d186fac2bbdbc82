//! Run Compactor - Variable-length payloads attached to sparse slots.
//!
//! Every owner slot has at most one run: a contiguous span of a shared,
//! growable payload array. Runs are never edited in place.
//!
//! ```text
//! runs:    [ {off 0, 3, owner 2} | Unused | {off 5, 1, owner 0} ]
//! payload: [ a a a | x x | b ]
//! ```
//!
//! Reassigning an owner appends the new payload at the tail and marks the old
//! run unused. Removal only flips the run state. The space is reclaimed in a
//! single stable pass by [`RunCompactor::compact()`], which the owner calls
//! from its update cycle.

use tracing::debug;

/// Owner has no run.
const NO_RUN: u32 = u32::MAX;

// =============================================================================
// Run
// =============================================================================

/// Whether a run still holds payload for its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Payload starts at `offset` in the payload array.
    Live { offset: u32 },
    /// Logically removed, the span is reclaimed on the next compaction.
    Unused,
}

/// Descriptor of one payload span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub state: RunState,
    pub count: u32,
    /// Id of the owning slot.
    pub owner: u32,
}

impl Run {
    /// Payload offset, `None` if the run is unused.
    pub fn offset(&self) -> Option<u32> {
        match self.state {
            RunState::Live { offset } => Some(offset),
            RunState::Unused => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, RunState::Live { .. })
    }
}

/// What a compaction pass reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompactStats {
    pub runs_removed: usize,
    pub payload_removed: usize,
}

// =============================================================================
// Compactor
// =============================================================================

/// Payload array plus run descriptors plus the owner -> run back-references.
#[derive(Debug, Clone)]
pub struct RunCompactor<T> {
    payload: Vec<T>,
    runs: Vec<Run>,
    /// Indexed by owner id.
    owner_runs: Vec<u32>,
    unused: usize,
}

impl<T: Copy> RunCompactor<T> {
    pub fn new() -> Self {
        Self {
            payload: Vec::new(),
            runs: Vec::new(),
            owner_runs: Vec::new(),
            unused: 0,
        }
    }

    /// Append `payload` as the run of `owner`.
    ///
    /// A previous run of the same owner is marked unused, so the owner's
    /// payload always moves to the tail.
    ///
    /// # Returns
    ///
    /// Index of the new run.
    pub fn assign(&mut self, owner: u32, payload: &[T]) -> usize {
        let offset = self.payload.len();
        assert!(
            u32::try_from(offset + payload.len()).is_ok(),
            "RunCompactor::assign(): payload size exceeds 32 bits"
        );

        self.mark_unused(owner);

        self.payload.extend_from_slice(payload);
        let index = self.runs.len();
        self.runs.push(Run {
            state: RunState::Live {
                offset: offset as u32,
            },
            count: payload.len() as u32,
            owner,
        });

        if self.owner_runs.len() <= owner as usize {
            self.owner_runs.resize(owner as usize + 1, NO_RUN);
        }
        self.owner_runs[owner as usize] = index as u32;
        index
    }

    /// Mark the run of `owner` unused without touching the payload array.
    ///
    /// # Returns
    ///
    /// Whether the owner had a run.
    pub fn mark_unused(&mut self, owner: u32) -> bool {
        let Some(index) = self.run_of(owner) else {
            return false;
        };
        self.runs[index].state = RunState::Unused;
        self.owner_runs[owner as usize] = NO_RUN;
        self.unused += 1;
        true
    }

    /// Drop all unused runs and close the gaps they leave.
    ///
    /// One linear pass in run order. Retained runs keep their relative order
    /// and their payload only ever moves left. A no-op if nothing is unused.
    pub fn compact(&mut self) -> CompactStats {
        if self.unused == 0 {
            return CompactStats::default();
        }

        let payload_before = self.payload.len();
        let runs_before = self.runs.len();
        let mut out_run = 0;
        let mut out_offset = 0usize;

        for index in 0..self.runs.len() {
            let run = self.runs[index];
            let RunState::Live { offset } = run.state else {
                continue;
            };

            let offset = offset as usize;
            let count = run.count as usize;
            if offset != out_offset {
                self.payload.copy_within(offset..offset + count, out_offset);
            }

            self.runs[out_run] = Run {
                state: RunState::Live {
                    offset: out_offset as u32,
                },
                ..run
            };
            if index != out_run {
                self.owner_runs[run.owner as usize] = out_run as u32;
            }

            out_run += 1;
            out_offset += count;
        }

        self.runs.truncate(out_run);
        self.payload.truncate(out_offset);
        self.unused = 0;

        let stats = CompactStats {
            runs_removed: runs_before - out_run,
            payload_removed: payload_before - out_offset,
        };
        debug!(
            runs_removed = stats.runs_removed,
            payload_removed = stats.payload_removed,
            runs = out_run,
            payload = out_offset,
            "compacted runs"
        );
        stats
    }
}

impl<T> RunCompactor<T> {
    /// Index of the run of `owner`.
    pub fn run_of(&self, owner: u32) -> Option<usize> {
        match self.owner_runs.get(owner as usize) {
            Some(&index) if index != NO_RUN => Some(index as usize),
            _ => None,
        }
    }

    /// Payload of `owner`, `None` if it has no run.
    pub fn get(&self, owner: u32) -> Option<&[T]> {
        let run = self.runs[self.run_of(owner)?];
        let offset = run.offset()? as usize;
        Some(&self.payload[offset..offset + run.count as usize])
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// The whole payload array, unused spans included.
    pub fn payload(&self) -> &[T] {
        &self.payload
    }

    /// Number of unused runs waiting for compaction.
    pub fn unused_count(&self) -> usize {
        self.unused
    }

    pub fn needs_compaction(&self) -> bool {
        self.unused != 0
    }
}

impl<T: Copy> Default for RunCompactor<T> {
    fn default() -> Self {
        Self::new()
    }
}
