//! Shared flags of the rebuild loop.

use std::sync::atomic::{AtomicBool, Ordering};

/// Change-pending and running flags shared by the watcher and the coordinator.
///
/// Starts with a change pending so the first tick performs the initial build.
#[derive(Debug)]
pub struct RebuildState {
    change_pending: AtomicBool,
    running: AtomicBool,
}

impl RebuildState {
    /// Create state with a pending change and no running cycle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            change_pending: AtomicBool::new(true),
            running: AtomicBool::new(false),
        }
    }

    /// Record that something changed since the last cycle started.
    pub fn mark_changed(&self) {
        self.change_pending.store(true, Ordering::Release);
    }

    /// Whether a change is waiting for the next cycle.
    pub fn is_change_pending(&self) -> bool {
        self.change_pending.load(Ordering::Acquire)
    }

    /// Whether a cycle is currently executing.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Claim the running flag and consume the pending change.
    ///
    /// Returns `None` if another cycle holds the flag. Changes recorded after
    /// this call re-arm the flag for the next cycle.
    pub(crate) fn try_start(&self) -> Option<CycleGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.change_pending.store(false, Ordering::Release);
        Some(CycleGuard { state: self })
    }
}

impl Default for RebuildState {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the running flag when dropped.
pub(crate) struct CycleGuard<'a> {
    state: &'a RebuildState,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Release);
    }
}
