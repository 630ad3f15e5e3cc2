//! Rebuild coordinator.
//!
//! Turns bursts of change notifications into single rebuild cycles. A cycle
//! runs the bundler, then the checker, announces the listening address, and
//! signals every connected client to reload. At most one cycle runs at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::flags::RebuildState;
use super::registry::ConnectionRegistry;
use crate::Address;
use crate::pipeline::{Bundler, PipelineError, TypeChecker};
use crate::terminal::Console;

/// Result of one completed cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// Whether the bundler succeeded.
    pub bundled: bool,
    /// Check outcome, `None` if the checker could not run.
    pub checked: Option<bool>,
    /// Number of clients the reload signal reached.
    pub notified: usize,
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No change was pending.
    Idle,
    /// Another cycle was still running.
    Busy,
    /// A cycle ran to completion.
    Completed(CycleReport),
}

/// Drives rebuild cycles from the shared [`RebuildState`].
pub struct RebuildCoordinator {
    state: Arc<RebuildState>,
    registry: Arc<ConnectionRegistry>,
    bundler: Arc<dyn Bundler>,
    checker: Arc<dyn TypeChecker>,
    address: Address,
    console: Console,
}

impl RebuildCoordinator {
    /// Create a coordinator.
    ///
    /// # Arguments
    ///
    /// * `state` - Flags shared with the change watcher
    /// * `registry` - Connections notified after each cycle
    /// * `bundler` - Produces the build output
    /// * `checker` - Reports diagnostics after bundling
    /// * `address` - Announced after each cycle
    #[must_use]
    pub fn new(
        state: Arc<RebuildState>,
        registry: Arc<ConnectionRegistry>,
        bundler: Arc<dyn Bundler>,
        checker: Arc<dyn TypeChecker>,
        address: Address,
    ) -> Self {
        Self {
            state,
            registry,
            bundler,
            checker,
            address,
            console: Console::new(),
        }
    }

    /// Stop writing cycle output to the terminal. Tracing events are unaffected.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.console = Console::silent();
        self
    }

    /// Run a cycle if a change is pending and no cycle is running.
    pub async fn tick(&self) -> TickOutcome {
        if !self.state.is_change_pending() {
            return TickOutcome::Idle;
        }
        let Some(_guard) = self.state.try_start() else {
            return TickOutcome::Busy;
        };

        TickOutcome::Completed(self.run_cycle().await)
    }

    async fn run_cycle(&self) -> CycleReport {
        let start = Instant::now();
        self.console.clear();

        let bundler = Arc::clone(&self.bundler);
        let bundled = match run_blocking("bundle", move || bundler.bundle()).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "Bundle failed");
                self.console.error(&format!("bundle: {err}"));
                false
            }
        };

        let checker = Arc::clone(&self.checker);
        let checked = match run_blocking("check", move || checker.check()).await {
            Ok(report) => {
                self.console.diagnostics(&report.output);
                Some(report.passed)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Check could not run");
                self.console.warning(&format!("check: {err}"));
                None
            }
        };

        self.console.listening(&self.address);
        let notified = self.registry.broadcast_reload();

        tracing::info!(
            bundled,
            checked = ?checked,
            notified,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Rebuild cycle completed"
        );

        CycleReport {
            bundled,
            checked,
            notified,
        }
    }
}

/// Run a collaborator on the blocking pool, reporting panics as errors.
async fn run_blocking<T, F>(step: &'static str, f: F) -> Result<T, PipelineError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| {
            Err(PipelineError::Aborted {
                step,
                message: e.to_string(),
            })
        })
}

/// Tick the coordinator every `interval`.
///
/// Each tick runs as its own task, so a long cycle never delays the timer;
/// ticks that land while a cycle is running are no-ops.
pub fn spawn_poll_loop(coordinator: Arc<RebuildCoordinator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator.tick().await;
            });
        }
    })
}
