//! State machine behind share-sheet style submissions.
//!
//! ```text
//! Idle ──submit──▶ Loading ──▶ Success(preview) | Error(reason)
//!   ▲                                   │
//!   └────────────── reset ──────────────┘
//! ```
//!
//! A submission that arrives while another is `Loading` is ignored. Terminal
//! states do not block: a new submission simply goes back to `Loading`.

use std::sync::atomic::{AtomicBool, Ordering};

use pt_core::{ContentError, ProcessedContent};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
pub enum SharedPinProcessingState {
    Idle,
    Loading,
    Success { preview: ProcessedContent },
    Error(ContentError),
}

impl SharedPinProcessingState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Error(_))
    }

    pub fn preview(&self) -> Option<&ProcessedContent> {
        match self {
            Self::Success { preview } => Some(preview),
            _ => None,
        }
    }
}

/// Single-slot reentrancy guard.
#[derive(Debug, Default)]
pub struct SubmissionSlot {
    busy: AtomicBool,
}

impl SubmissionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot. Returns `None` when a submission is already in flight.
    pub fn try_acquire(&self) -> Option<SubmissionGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmissionGuard { slot: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the slot when dropped, including when the submission is cancelled.
#[derive(Debug)]
pub struct SubmissionGuard<'a> {
    slot: &'a SubmissionSlot,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
    }
}

pub(crate) struct SharedProcessing {
    slot: SubmissionSlot,
    state_tx: watch::Sender<SharedPinProcessingState>,
}

impl SharedProcessing {
    pub(crate) fn new() -> Self {
        let (state_tx, _) = watch::channel(SharedPinProcessingState::Idle);
        Self {
            slot: SubmissionSlot::new(),
            state_tx,
        }
    }

    /// Claims the slot and publishes `Loading`.
    pub(crate) fn try_begin(&self) -> Option<SubmissionGuard<'_>> {
        let guard = self.slot.try_acquire()?;
        self.state_tx.send_replace(SharedPinProcessingState::Loading);
        Some(guard)
    }

    pub(crate) fn finish(&self, outcome: SharedPinProcessingState) {
        self.state_tx.send_replace(outcome);
    }

    /// Back to `Idle`. An in-flight submission still owns the slot and will
    /// publish its own outcome when it completes.
    pub(crate) fn reset(&self) {
        self.state_tx.send_replace(SharedPinProcessingState::Idle);
    }

    pub(crate) fn state(&self) -> SharedPinProcessingState {
        self.state_tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SharedPinProcessingState> {
        self.state_tx.subscribe()
    }
}
