//! # Scheduler State
//!
//! ```text
//!          tick
//!   Idle ────────→ Syncing
//!    ↑                │
//!    └──── done / error
//! ```

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    Syncing,
}

/// Result of one sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The confirmed head was already ingested.
    UpToDate,
    /// `[from, to]` was ingested.
    Advanced { from: u64, to: u64, events: usize },
    /// The authoritative address changed mid-cycle; nothing was committed.
    Superseded,
}

/// An inclusive block range ingested as one atomic batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

/// Newest block considered confirmed at `head`.
pub fn confirmed_target(head: u64, confirmations: u64) -> u64 {
    head.saturating_sub(confirmations)
}

/// Split the unprocessed confirmed range into batches of at most
/// `batch_size` blocks.
///
/// `last = None` means nothing has been ingested yet, so the walk starts at
/// block 0.
pub fn plan_batches(last: Option<u64>, target: u64, batch_size: u64) -> Vec<BlockRange> {
    let start = match last {
        Some(last) if target <= last => return Vec::new(),
        Some(last) => last + 1,
        None => 0,
    };
    let step = batch_size.max(1);

    let mut batches = Vec::new();
    let mut from = start;
    loop {
        let to = from.saturating_add(step - 1).min(target);
        batches.push(BlockRange { from, to });
        if to >= target {
            break;
        }
        from = to + 1;
    }
    batches
}
